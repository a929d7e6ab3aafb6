//! Admission gate bounding the number of simultaneously open files

use parking_lot::{Condvar, Mutex};

/// Counting semaphore for OS threads.
///
/// Worker count and open-file count are configured separately; every
/// directory listing and file read in the thread-based walkers happens while
/// holding a [`GatePermit`].
#[derive(Debug)]
pub struct OpenFileGate {
    available: Mutex<usize>,
    released: Condvar,
    capacity: usize,
}

impl OpenFileGate {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            available: Mutex::new(capacity),
            released: Condvar::new(),
            capacity,
        }
    }

    /// Block until a slot is free
    pub fn acquire(&self) -> GatePermit<'_> {
        let mut available = self.available.lock();
        while *available == 0 {
            self.released.wait(&mut available);
        }
        *available -= 1;
        GatePermit { gate: self }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots not currently held
    pub fn available(&self) -> usize {
        *self.available.lock()
    }
}

/// Held slot; released on drop
#[derive(Debug)]
pub struct GatePermit<'a> {
    gate: &'a OpenFileGate,
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        let mut available = self.gate.available.lock();
        *available += 1;
        self.gate.released.notify_one();
    }
}

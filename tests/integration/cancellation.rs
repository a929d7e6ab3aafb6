//! Integration tests for cancelling a checksum in flight

use crate::integration::{checksummer, nested_tree, DelayLister};
use dirdigest::{ChecksumError, Strategy};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[test]
fn test_cancel_during_slow_walk() {
    let tree = nested_tree();
    let lister = Arc::new(DelayLister {
        delay: Duration::from_millis(40),
    });

    for strategy in Strategy::ALL {
        let checksummer = checksummer(strategy, 2).with_lister(lister.clone());
        let cancel = checksummer.cancellation();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(60));
            cancel.cancel();
        });

        let started = Instant::now();
        let result = checksummer.checksum(tree.path());
        canceller.join().unwrap();

        assert!(
            matches!(result, Err(ChecksumError::Cancelled)),
            "{}: {:?}",
            strategy,
            result
        );
        assert!(started.elapsed() < Duration::from_secs(5), "{}", strategy);
    }
}

#[test]
fn test_cancelled_checksummer_stays_cancelled() {
    let tree = nested_tree();
    let checksummer = checksummer(Strategy::Pool, 4);
    checksummer.cancellation().cancel();
    for _ in 0..2 {
        assert!(matches!(
            checksummer.checksum(tree.path()),
            Err(ChecksumError::Cancelled)
        ));
    }
}

#[test]
fn test_dropping_a_stream_stops_workers() {
    use dirdigest::walk::WalkContext;
    use dirdigest::digest::{DigestAlgorithm, LeafDigester};

    let tree = nested_tree();
    for strategy in Strategy::ALL {
        let ctx = WalkContext::new(Arc::new(LeafDigester::new(DigestAlgorithm::Md5)))
            .with_lister(Arc::new(DelayLister {
                delay: Duration::from_millis(10),
            }))
            .with_parallelism(4);
        let Some(walker) = strategy.walker(ctx) else {
            continue;
        };
        let mut stream = walker.digest_walk(tree.path());
        assert!(stream.next().is_some(), "{}", strategy);
        let started = Instant::now();
        drop(stream);
        assert!(started.elapsed() < Duration::from_secs(5), "{}", strategy);
    }
}

//! Shared test utilities for integration tests
//!
//! Tree builders, instrumented listers and digest sources, and isolated XDG
//! environment setup.

use dirdigest::digest::{Combiner, DigestAlgorithm, DigestMap, DigestSource, LeafDigester, ListingCombiner};
use dirdigest::walk::listing::{DirEntry, DirectoryLister, FsLister};
use dirdigest::{Checksummer, Strategy};
use proptest::prelude::Rng;
use proptest::test_runner::{RngAlgorithm, TestRng};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Global mutex to serialize XDG environment variable access across all tests
static XDG_ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Write `(relative path, contents)` pairs under `root`, creating parents
pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (relpath, contents) in files {
        let path = root.join(relpath);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }
}

/// `a.txt = "x"`, `d/b.txt = "y"`
pub fn example_tree() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    write_files(temp_dir.path(), &[("a.txt", "x"), ("d/b.txt", "y")]);
    temp_dir
}

/// Nested tree with several levels, some wide directories, and an empty file
pub fn nested_tree() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let mut files = Vec::new();
    for i in 0..4 {
        for j in 0..3 {
            files.push((format!("top{}/mid{}/leaf.txt", i, j), format!("{}-{}", i, j)));
        }
        files.push((format!("top{}/side.bin", i), "s".repeat(i * 1000)));
    }
    files.push(("root.txt".to_string(), String::new()));
    let refs: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
    write_files(temp_dir.path(), &refs);
    temp_dir
}

pub fn md5(data: &str) -> String {
    DigestAlgorithm::Md5.hex_digest(data.as_bytes())
}

pub fn digest_map(pairs: &[(&str, &str)]) -> DigestMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn md5_combine(files: &[(&str, &str)], dirs: &[(&str, &str)]) -> String {
    ListingCombiner::new(DigestAlgorithm::Md5).combine(&digest_map(files), &digest_map(dirs))
}

pub fn checksummer(strategy: Strategy, parallelism: usize) -> Checksummer {
    Checksummer::new(strategy, DigestAlgorithm::Md5).with_parallelism(parallelism)
}

pub fn checksum(strategy: Strategy, parallelism: usize, root: &Path) -> String {
    checksummer(strategy, parallelism).checksum(root).unwrap()
}

/// Filesystem lister that sleeps before every listing
pub struct DelayLister {
    pub delay: Duration,
}

impl DirectoryLister for DelayLister {
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        std::thread::sleep(self.delay);
        FsLister.list(dir)
    }
}

/// Filesystem lister that refuses to list directories with a given name
pub struct FailingLister {
    pub name: String,
}

impl DirectoryLister for FailingLister {
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        if dir.file_name().map_or(false, |n| n == self.name.as_str()) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "listing refused"));
        }
        FsLister.list(dir)
    }
}

/// Leaf digester that counts calls and can refuse one file name
pub struct CountingSource {
    pub calls: AtomicUsize,
    pub refuse: Option<String>,
    inner: LeafDigester,
}

impl CountingSource {
    pub fn new(refuse: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            refuse: refuse.map(str::to_string),
            inner: LeafDigester::new(DigestAlgorithm::Md5),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DigestSource for CountingSource {
    fn digest_file(&self, path: &Path) -> io::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(refuse) = &self.refuse {
            if path.file_name().map_or(false, |n| n == refuse.as_str()) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read refused"));
            }
        }
        self.inner.digest_file(path)
    }
}

/// Sleeps drawn from a seeded generator, different on every call
pub struct Jitter {
    rng: Mutex<TestRng>,
    max_micros: u64,
}

impl Jitter {
    pub fn new(seed: u8, max: Duration) -> Arc<Self> {
        Arc::new(Self {
            rng: Mutex::new(TestRng::from_seed(RngAlgorithm::ChaCha, &[seed; 32])),
            max_micros: max.as_micros() as u64,
        })
    }

    pub fn sleep(&self) {
        let draw = self.rng.lock().unwrap_or_else(|e| e.into_inner()).next_u64();
        std::thread::sleep(Duration::from_micros(draw % (self.max_micros + 1)));
    }
}

/// Filesystem lister with a random delay before each listing
pub struct JitterLister(pub Arc<Jitter>);

impl DirectoryLister for JitterLister {
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        self.0.sleep();
        FsLister.list(dir)
    }
}

/// MD5 leaf digester with a random delay before each file
pub struct JitterSource {
    jitter: Arc<Jitter>,
    inner: LeafDigester,
}

impl JitterSource {
    pub fn new(jitter: Arc<Jitter>) -> Arc<Self> {
        Arc::new(Self {
            jitter,
            inner: LeafDigester::new(DigestAlgorithm::Md5),
        })
    }
}

impl DigestSource for JitterSource {
    fn digest_file(&self, path: &Path) -> io::Result<String> {
        self.jitter.sleep();
        self.inner.digest_file(path)
    }
}

/// Lister and digest source that records how many listings and reads are in
/// flight at once
pub struct HandleTracker {
    inside: AtomicUsize,
    peak: AtomicUsize,
    dwell: Duration,
    inner: LeafDigester,
}

impl HandleTracker {
    pub fn new(dwell: Duration) -> Arc<Self> {
        Arc::new(Self {
            inside: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            dwell,
            inner: LeafDigester::new(DigestAlgorithm::Md5),
        })
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn hold<T>(&self, f: impl FnOnce() -> T) -> T {
        let now = self.inside.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.dwell);
        let result = f();
        self.inside.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl DirectoryLister for HandleTracker {
    fn list(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        self.hold(|| FsLister.list(dir))
    }
}

impl DigestSource for HandleTracker {
    fn digest_file(&self, path: &Path) -> io::Result<String> {
        self.hold(|| self.inner.digest_file(path))
    }
}

/// Environment variable state to restore after test
struct EnvState {
    vars: Vec<(&'static str, Option<String>)>,
}

const ISOLATED_VARS: [&str; 3] = ["HOME", "XDG_CONFIG_HOME", "XDG_DATA_HOME"];

impl EnvState {
    fn capture(extra: &[&'static str]) -> Self {
        let vars = ISOLATED_VARS
            .iter()
            .chain(extra)
            .map(|&name| (name, std::env::var(name).ok()))
            .collect();
        Self { vars }
    }

    fn restore(self) {
        for (name, value) in self.vars {
            match value {
                Some(orig) => std::env::set_var(name, orig),
                None => std::env::remove_var(name),
            }
        }
    }
}

/// Run `f` with HOME, XDG_CONFIG_HOME, and XDG_DATA_HOME inside `test_dir`.
///
/// Variables named in `extra` are also restored afterwards, so `f` may set
/// them freely. Returns the config home (where `dirdigest/config.toml` is read
/// from) to `f`.
pub fn with_xdg_env<F, R>(test_dir: &TempDir, extra: &[&'static str], f: F) -> R
where
    F: FnOnce(&Path) -> R,
{
    let _guard = XDG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture(extra);

    let test_config_home: PathBuf = test_dir.path().join("config");
    let test_data_home = test_dir.path().join("data");
    let test_home = test_dir.path().join("home");
    for dir in [&test_config_home, &test_data_home, &test_home] {
        fs::create_dir_all(dir).unwrap();
    }

    std::env::set_var("HOME", &test_home);
    std::env::set_var("XDG_CONFIG_HOME", &test_config_home);
    std::env::set_var("XDG_DATA_HOME", &test_data_home);
    for name in extra {
        std::env::remove_var(name);
    }

    let result = f(&test_config_home);

    env_state.restore();

    result
}

//! Recursive discovery and decoding of resource files.
//!
//! The pipeline has three stages connected by bounded channels:
//!
//! 1. a walker thread enumerates candidate files (`ignore` + `globset`),
//! 2. a `rayon` pool reads, classifies and parses them,
//! 3. the caller drains [`ScanStream`] as an iterator of [`ClassifiedRecord`]s.
//!
//! Per-file failures are logged and counted, never propagated. Cancellation is
//! checked at every file boundary.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread::{self, JoinHandle},
};

use crossbeam_channel::{Receiver, Sender, bounded};
use encoding_rs::Encoding;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    classify::Classifier,
    config::ScanConfig,
    error::Error,
    formats,
    types::ClassifiedRecord,
};

/// Depth below the resources directory covered by a non-recursive scan
/// (`xx.lproj/File.strings`).
const SHALLOW_DEPTH: usize = 2;

/// Shared flag used to abort a scan between files.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counts collected while scanning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Files whose name matched a resource pattern.
    pub files_seen: usize,
    pub files_parsed: usize,
    /// Unreadable or undecodable files, plus walk errors.
    pub files_skipped: usize,
    /// Individual entries dropped by the parsers.
    pub entries_skipped: usize,
    /// Records emitted.
    pub records: usize,
}

#[derive(Default)]
struct Counters {
    files_seen: AtomicUsize,
    files_parsed: AtomicUsize,
    files_skipped: AtomicUsize,
    entries_skipped: AtomicUsize,
    records: AtomicUsize,
}

impl Counters {
    fn bump(counter: &AtomicUsize, by: usize) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    fn report(&self) -> ScanReport {
        ScanReport {
            files_seen: self.files_seen.load(Ordering::Relaxed),
            files_parsed: self.files_parsed.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            entries_skipped: self.entries_skipped.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
        }
    }
}

struct Shared {
    cancel: CancelToken,
    /// Set when the consumer drops the stream early.
    abandoned: AtomicBool,
    counters: Counters,
}

impl Shared {
    fn should_stop(&self) -> bool {
        self.cancel.is_cancelled() || self.abandoned.load(Ordering::SeqCst)
    }
}

/// Reads, classifies and parses single files.
struct FileWorker {
    classifier: Classifier,
    fallback: Option<&'static Encoding>,
    shared: Arc<Shared>,
}

impl FileWorker {
    fn process(&self, path: &Path, tx: &Sender<ClassifiedRecord>) {
        if self.shared.should_stop() {
            return;
        }
        let counters = &self.shared.counters;

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable file");
                Counters::bump(&counters.files_skipped, 1);
                return;
            }
        };

        let decoded = match formats::parse(&bytes, self.fallback) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping undecodable file");
                Counters::bump(&counters.files_skipped, 1);
                return;
            }
        };

        for warning in &decoded.warnings {
            warn!(path = %path.display(), offset = warning.offset, "skipped entry: {}", warning.message);
        }
        Counters::bump(&counters.entries_skipped, decoded.warnings.len());
        Counters::bump(&counters.files_parsed, 1);

        let class = self.classifier.classify(path);
        debug!(
            path = %path.display(),
            format = %decoded.format,
            language = %class.language,
            pairs = decoded.pairs.len(),
            "parsed resource file"
        );

        for pair in decoded.pairs {
            let record = ClassifiedRecord {
                bundle: class.bundle.clone(),
                language: class.language.clone(),
                table: class.table.clone(),
                key: pair.key,
                value: pair.value,
                source: path.to_path_buf(),
            };
            if tx.send(record).is_err() {
                return;
            }
            Counters::bump(&counters.records, 1);
        }
    }
}

/// Builds scans from a [`ScanConfig`].
pub struct Scanner {
    config: ScanConfig,
    matcher: GlobSet,
    cancel: CancelToken,
}

impl Scanner {
    pub fn new(config: &ScanConfig, cancel: CancelToken) -> Result<Self, Error> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &config.resource_patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .case_insensitive(true)
                .build()
                .map_err(|e| Error::config(format!("invalid resource pattern '{}': {}", pattern, e)))?;
            builder.add(glob);
        }
        let matcher = builder
            .build()
            .map_err(|e| Error::config(format!("failed to build resource patterns: {}", e)))?;

        Ok(Scanner {
            config: config.clone(),
            matcher,
            cancel,
        })
    }

    /// Starts scanning `root` and returns the record stream.
    ///
    /// Without `recursive`, `root` is treated as a single bundle: its
    /// `Contents/Resources` (or `Resources`) directory is scanned two levels deep.
    pub fn scan<P: AsRef<Path>>(&self, root: P, recursive: bool) -> Result<ScanStream, Error> {
        let root = fs::canonicalize(root.as_ref())?;
        let (start, max_depth) = resolve_start(&root, recursive);
        info!(root = %start.display(), recursive, "scanning");

        let capacity = self.config.channel_capacity.max(1);
        let (record_tx, record_rx) = bounded::<ClassifiedRecord>(capacity);
        let shared = Arc::new(Shared {
            cancel: self.cancel.clone(),
            abandoned: AtomicBool::new(false),
            counters: Counters::default(),
        });
        let worker = Arc::new(FileWorker {
            classifier: Classifier::new(&self.config.bundle_suffixes),
            fallback: self.config.fallback_encoding(),
            shared: Arc::clone(&shared),
        });
        let matcher = self.matcher.clone();
        let workers = self.config.workers;

        let producer_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("stringdex-scan".to_string())
            .spawn(move || {
                let (path_tx, path_rx) = bounded::<PathBuf>(capacity);
                let walker_shared = Arc::clone(&producer_shared);
                let walker = thread::Builder::new()
                    .name("stringdex-walk".to_string())
                    .spawn(move || walk(&start, max_depth, &matcher, &walker_shared, path_tx));

                parse_all(path_rx, record_tx, &worker, workers);

                match walker {
                    Ok(walker) => {
                        if walker.join().is_err() {
                            warn!("directory walker panicked");
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to start directory walker");
                        Counters::bump(&producer_shared.counters.files_skipped, 1);
                    }
                }
            })?;

        Ok(ScanStream {
            root,
            records: Some(record_rx),
            handle: Some(handle),
            shared,
        })
    }
}

fn resolve_start(root: &Path, recursive: bool) -> (PathBuf, Option<usize>) {
    if recursive {
        return (root.to_path_buf(), None);
    }
    let resources = [root.join("Contents").join("Resources"), root.join("Resources")]
        .into_iter()
        .find(|candidate| candidate.is_dir())
        .unwrap_or_else(|| root.to_path_buf());
    (resources, Some(SHALLOW_DEPTH))
}

fn walk(
    start: &Path,
    max_depth: Option<usize>,
    matcher: &GlobSet,
    shared: &Shared,
    tx: Sender<PathBuf>,
) {
    let visited: Arc<Mutex<HashSet<PathBuf>>> = Arc::default();
    let walker = WalkBuilder::new(start)
        .standard_filters(false)
        .follow_links(true)
        .max_depth(max_depth)
        .filter_entry(move |entry| {
            if !entry.file_type().is_some_and(|t| t.is_dir()) {
                return true;
            }
            // A directory reachable through several links is entered once.
            match fs::canonicalize(entry.path()) {
                Ok(canonical) => visited
                    .lock()
                    .map(|mut seen| seen.insert(canonical))
                    .unwrap_or(true),
                Err(_) => true,
            }
        })
        .build();

    for result in walker {
        if shared.should_stop() {
            break;
        }
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable path");
                Counters::bump(&shared.counters.files_skipped, 1);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) || !matcher.is_match(entry.file_name()) {
            continue;
        }
        Counters::bump(&shared.counters.files_seen, 1);
        if tx.send(entry.into_path()).is_err() {
            break;
        }
    }
}

fn parse_all(
    paths: Receiver<PathBuf>,
    records: Sender<ClassifiedRecord>,
    worker: &FileWorker,
    workers: usize,
) {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("stringdex-parse-{}", i))
        .build();

    match pool {
        Ok(pool) => pool.install(|| {
            paths
                .into_iter()
                .par_bridge()
                .for_each_with(records, |tx, path| worker.process(&path, tx));
        }),
        Err(err) => {
            warn!(error = %err, "falling back to a single parse worker");
            for path in paths {
                worker.process(&path, &records);
            }
        }
    }
}

/// A running scan. Iterate it to receive records, then call [`ScanStream::finish`].
pub struct ScanStream {
    root: PathBuf,
    records: Option<Receiver<ClassifiedRecord>>,
    handle: Option<JoinHandle<()>>,
    shared: Arc<Shared>,
}

impl ScanStream {
    /// The canonical root that was scanned.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Waits for the pipeline to wind down and returns the counts.
    ///
    /// Fails with [`Error::Cancelled`] if the scan was cancelled, in which case
    /// the records received so far are incomplete.
    pub fn finish(mut self) -> Result<ScanReport, Error> {
        self.shutdown();
        if self.shared.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(self.shared.counters.report())
    }

    fn shutdown(&mut self) {
        self.records.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("scan pipeline panicked");
            }
        }
    }
}

impl Iterator for ScanStream {
    type Item = ClassifiedRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.records.as_ref()?.recv().ok()
    }
}

impl Drop for ScanStream {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shared.abandoned.store(true, Ordering::SeqCst);
            self.shutdown();
        }
    }
}

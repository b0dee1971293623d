use dupfinder::duplicates::{DuplicateFinder, FinderConfig, ScanMode, ScanRequest};
use dupfinder::progress::ScanListener;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, Weak};
use tempfile::tempdir;

#[derive(Default)]
struct Recorder {
    total: AtomicU64,
    processed: Mutex<Vec<u64>>,
    duplicates: Mutex<Vec<(PathBuf, PathBuf)>>,
    finished: Mutex<Vec<u64>>,
}

impl ScanListener for Recorder {
    fn total_count(&self, total: u64) {
        self.total.store(total, Ordering::SeqCst);
    }

    fn process(&self, processed: u64) {
        self.processed.lock().unwrap().push(processed);
    }

    fn duplicate(&self, original: &Path, duplicate: &Path) {
        self.duplicates
            .lock()
            .unwrap()
            .push((original.to_path_buf(), duplicate.to_path_buf()));
    }

    fn finish(&self, processed: u64) {
        self.finished.lock().unwrap().push(processed);
    }
}

fn finder() -> (DuplicateFinder, Arc<Recorder>) {
    let finder = DuplicateFinder::new(FinderConfig::default()).unwrap();
    let recorder = Arc::new(Recorder::default());
    finder.add_listener(recorder.clone());
    (finder, recorder)
}

fn all_files(root: &Path) -> ScanRequest {
    ScanRequest::new([root], Vec::<String>::new())
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let (finder, recorder) = finder();

    assert!(finder.scan(&all_files(dir.path()), ScanMode::Sync));

    assert_eq!(recorder.total.load(Ordering::SeqCst), 0);
    assert!(recorder.processed.lock().unwrap().is_empty());
    assert_eq!(*recorder.finished.lock().unwrap(), vec![0]);
    assert!(finder.duplicate_groups().is_empty());
}

#[test]
fn test_every_file_is_processed_once() {
    let dir = tempdir().unwrap();
    for i in 0..25 {
        let sub = dir.path().join(format!("d{}", i % 5));
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join(format!("f{i}.dat")), format!("content {i}")).unwrap();
    }
    let (finder, recorder) = finder();

    finder.scan(&all_files(dir.path()), ScanMode::Sync);

    assert_eq!(recorder.total.load(Ordering::SeqCst), 25);
    let processed = recorder.processed.lock().unwrap();
    assert_eq!(processed.len(), 25);
    assert!(processed.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(*recorder.finished.lock().unwrap(), vec![25]);
    assert!(recorder.duplicates.lock().unwrap().is_empty());
}

#[test]
fn test_three_copies_report_two_duplicates_of_first() {
    let dir = tempdir().unwrap();
    for name in ["a.jpg", "b.jpg", "c.jpg"] {
        fs::write(dir.path().join(name), b"same picture").unwrap();
    }
    let (finder, recorder) = finder();

    finder.scan(&all_files(dir.path()), ScanMode::Sync);

    let duplicates = recorder.duplicates.lock().unwrap();
    assert_eq!(duplicates.len(), 2);
    assert!(duplicates.iter().all(|(original, _)| original.ends_with("a.jpg")));

    let groups = finder.duplicate_groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 3);
    assert!(groups[0].original().unwrap().path.ends_with("a.jpg"));
}

#[test]
fn test_same_bytes_different_suffix_are_not_duplicates() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("notes.txt"), b"identical").unwrap();
    fs::write(dir.path().join("notes.md"), b"identical").unwrap();
    fs::write(dir.path().join("notes"), b"identical").unwrap();
    let (finder, recorder) = finder();

    finder.scan(&all_files(dir.path()), ScanMode::Sync);

    assert!(recorder.duplicates.lock().unwrap().is_empty());
    assert_eq!(*recorder.finished.lock().unwrap(), vec![3]);
}

#[test]
fn test_suffix_filter_is_case_insensitive() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("one.JPG"), b"img").unwrap();
    fs::write(dir.path().join("two.jpg"), b"img").unwrap();
    fs::write(dir.path().join("three.png"), b"img").unwrap();
    let (finder, recorder) = finder();

    finder.scan(&ScanRequest::new([dir.path()], [" .Jpg "]), ScanMode::Sync);

    assert_eq!(recorder.total.load(Ordering::SeqCst), 2);
    assert_eq!(*recorder.finished.lock().unwrap(), vec![2]);
    assert_eq!(recorder.duplicates.lock().unwrap().len(), 1);
}

#[test]
fn test_rescan_yields_same_pairs() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("a.txt"), b"twice").unwrap();
    fs::write(dir.path().join("nested").join("a.txt"), b"twice").unwrap();
    fs::write(dir.path().join("b.txt"), b"once").unwrap();
    let (finder, recorder) = finder();
    let request = all_files(dir.path());

    finder.scan(&request, ScanMode::Sync);
    let first: Vec<_> = recorder.duplicates.lock().unwrap().drain(..).collect();
    finder.scan(&request, ScanMode::Sync);
    let second: Vec<_> = recorder.duplicates.lock().unwrap().drain(..).collect();

    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
    assert_eq!(*recorder.finished.lock().unwrap(), vec![3, 3]);
}

/// Stops the finder from inside the first `process` callback.
struct StopAfterFirst {
    finder: Mutex<Weak<DuplicateFinder>>,
}

impl ScanListener for StopAfterFirst {
    fn process(&self, _processed: u64) {
        if let Some(finder) = self.finder.lock().unwrap().upgrade() {
            finder.stop();
        }
    }
}

#[test]
fn test_stop_halts_within_a_file_and_still_finishes() {
    let dir = tempdir().unwrap();
    for i in 0..50 {
        fs::write(dir.path().join(format!("{i:03}.bin")), vec![i as u8; 64]).unwrap();
    }
    let finder = Arc::new(DuplicateFinder::new(FinderConfig::default()).unwrap());
    let recorder = Arc::new(Recorder::default());
    let stopper = Arc::new(StopAfterFirst {
        finder: Mutex::new(Arc::downgrade(&finder)),
    });
    finder.add_listener(recorder.clone());
    finder.add_listener(stopper);

    finder.scan(&all_files(dir.path()), ScanMode::Sync);

    let finished = recorder.finished.lock().unwrap().clone();
    assert_eq!(finished.len(), 1);
    assert!(finished[0] >= 1 && finished[0] < 50);
    assert!(finder.summary().interrupted);
    assert!(!finder.is_running());
}

/// Blocks the first `process` callback until released.
struct Gate {
    entered: Mutex<Option<mpsc::Sender<()>>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl ScanListener for Gate {
    fn process(&self, _processed: u64) {
        if let Some(entered) = self.entered.lock().unwrap().take() {
            entered.send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
        }
    }
}

#[test]
fn test_second_start_is_ignored_while_running() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"a").unwrap();
    fs::write(dir.path().join("b.txt"), b"b").unwrap();

    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let (finder, recorder) = finder();
    finder.add_listener(Arc::new(Gate {
        entered: Mutex::new(Some(entered_tx)),
        release: Mutex::new(release_rx),
    }));
    let request = all_files(dir.path());

    assert!(finder.start(&request, ScanMode::Async));
    entered_rx.recv().unwrap();
    assert!(finder.is_running());
    assert!(!finder.start(&request, ScanMode::Async));
    assert!(!finder.scan(&request, ScanMode::Sync));

    release_tx.send(()).unwrap();
    finder.wait();

    assert_eq!(*recorder.finished.lock().unwrap(), vec![2]);
    assert!(!finder.is_running());
}

#[cfg(unix)]
#[test]
fn test_unreadable_subdirectory_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("hidden.txt"), b"x").unwrap();
    fs::write(dir.path().join("visible.txt"), b"x").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Running as root bypasses permission checks.
    let readable = fs::read_dir(&locked).is_ok();
    let (finder, recorder) = finder();
    finder.scan(&all_files(dir.path()), ScanMode::Sync);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let expected = if readable { 2 } else { 1 };
    assert_eq!(*recorder.finished.lock().unwrap(), vec![expected]);
}

use dupfinder::duplicates::{DuplicateFinder, FinderConfig, ScanMode, ScanRequest};
use dupfinder::progress::ScanListener;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

#[derive(Default)]
struct Pairs {
    total: AtomicU64,
    finished: AtomicU64,
    finish_calls: AtomicU64,
    pairs: Mutex<Vec<(PathBuf, PathBuf)>>,
}

impl ScanListener for Pairs {
    fn total_count(&self, total: u64) {
        self.total.store(total, Ordering::SeqCst);
    }

    fn duplicate(&self, original: &Path, duplicate: &Path) {
        self.pairs
            .lock()
            .unwrap()
            .push((original.to_path_buf(), duplicate.to_path_buf()));
    }

    fn finish(&self, processed: u64) {
        self.finish_calls.fetch_add(1, Ordering::SeqCst);
        self.finished.store(processed, Ordering::SeqCst);
    }
}

fn finder_with(pool_size: usize) -> (DuplicateFinder, Arc<Pairs>) {
    let finder = DuplicateFinder::new(FinderConfig::default().with_pool_size(pool_size)).unwrap();
    let pairs = Arc::new(Pairs::default());
    finder.add_listener(pairs.clone());
    (finder, pairs)
}

#[test]
fn test_duplicate_across_two_roots() {
    let dir1 = tempdir().unwrap();
    let dir2 = tempdir().unwrap();
    fs::write(dir1.path().join("a.txt"), b"dup").unwrap();
    fs::write(dir2.path().join("b.txt"), b"dup").unwrap();
    let (finder, pairs) = finder_with(4);

    finder.scan(
        &ScanRequest::new([dir1.path(), dir2.path()], Vec::<String>::new()),
        ScanMode::Sync,
    );

    assert_eq!(pairs.total.load(Ordering::SeqCst), 2);
    assert_eq!(pairs.finished.load(Ordering::SeqCst), 2);
    assert_eq!(pairs.pairs.lock().unwrap().len(), 1);
    assert_eq!(finder.duplicate_groups().len(), 1);
}

#[test]
fn test_more_roots_than_workers_all_complete() {
    let roots: Vec<_> = (0..8).map(|_| tempdir().unwrap()).collect();
    for (i, root) in roots.iter().enumerate() {
        fs::write(root.path().join("shared.bin"), b"everywhere").unwrap();
        fs::write(root.path().join(format!("own{i}.bin")), format!("root {i}")).unwrap();
    }
    let (finder, pairs) = finder_with(2);
    let request = ScanRequest::new(roots.iter().map(|r| r.path()), Vec::<String>::new());

    assert!(finder.start(&request, ScanMode::Async));
    finder.wait();

    assert_eq!(pairs.finish_calls.load(Ordering::SeqCst), 1);
    assert_eq!(pairs.finished.load(Ordering::SeqCst), 16);
    // Eight identical copies: seven duplicates, one group.
    assert_eq!(pairs.pairs.lock().unwrap().len(), 7);
    let groups = finder.duplicate_groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].len(), 8);
    assert_eq!(finder.summary().reclaimable_space, 7 * b"everywhere".len() as u64);
}

#[test]
fn test_concurrent_roots_report_each_copy_once() {
    let roots: Vec<_> = (0..6).map(|_| tempdir().unwrap()).collect();
    for root in &roots {
        for j in 0..20 {
            fs::write(root.path().join(format!("f{j:02}.dat")), format!("payload {j}")).unwrap();
        }
    }
    let (finder, pairs) = finder_with(6);
    let request = ScanRequest::new(roots.iter().map(|r| r.path()), Vec::<String>::new());

    finder.scan(&request, ScanMode::Sync);

    // 20 distinct contents, each present in 6 roots.
    assert_eq!(pairs.finished.load(Ordering::SeqCst), 120);
    assert_eq!(pairs.pairs.lock().unwrap().len(), 100);
    let groups = finder.duplicate_groups();
    assert_eq!(groups.len(), 20);
    assert!(groups.iter().all(|g| g.len() == 6));
}

#[test]
fn test_overlapping_roots_never_pair_a_file_with_itself() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    fs::write(dir.path().join("a.txt"), b"content").unwrap();
    fs::write(sub.join("b.txt"), b"content").unwrap();
    let (finder, pairs) = finder_with(4);

    finder.scan(
        &ScanRequest::new([dir.path().to_path_buf(), sub.clone()], Vec::<String>::new()),
        ScanMode::Sync,
    );

    // Roots are not merged, so sub/b.txt is walked twice.
    assert_eq!(pairs.total.load(Ordering::SeqCst), 3);
    assert_eq!(pairs.finished.load(Ordering::SeqCst), 3);
    let found = pairs.pairs.lock().unwrap();
    assert_eq!(found.len(), 1);
    assert_ne!(found[0].0, found[0].1);
    assert_eq!(finder.duplicate_groups()[0].len(), 2);
}

#[test]
fn test_missing_root_counts_as_empty() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("only.txt"), b"x").unwrap();
    let missing = dir.path().join("does-not-exist");
    let (finder, pairs) = finder_with(2);

    finder.scan(
        &ScanRequest::new([missing, dir.path().to_path_buf()], Vec::<String>::new()),
        ScanMode::Sync,
    );

    assert_eq!(pairs.total.load(Ordering::SeqCst), 1);
    assert_eq!(pairs.finished.load(Ordering::SeqCst), 1);
    assert_eq!(pairs.finish_calls.load(Ordering::SeqCst), 1);
}

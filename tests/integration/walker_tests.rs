use deldup::diagnostics::{MemorySink, WarningKind};
use deldup::duplicates::{Indexer, IndexerConfig};
use deldup::scanner::{NodeKind, TreeWalker};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn test_deep_tree_indexes_leaf() {
    let dir = tempdir().unwrap();
    let mut path = dir.path().to_path_buf();
    for _ in 0..400 {
        path.push("d");
    }
    fs::create_dir_all(&path).unwrap();
    fs::write(path.join("leaf.txt"), b"at the bottom").unwrap();

    // A small stack proves the walk does not recurse
    let root = dir.path().to_path_buf();
    let handle = std::thread::Builder::new()
        .stack_size(256 * 1024)
        .spawn(move || Indexer::with_defaults().index(&root).map(|(index, stats)| (index.len(), stats)))
        .unwrap();
    let (entries, stats) = handle.join().unwrap().unwrap();

    assert_eq!(entries, 1);
    assert_eq!(stats.directories, 401);
}

#[test]
fn test_every_file_visited_once() {
    let dir = tempdir().unwrap();
    let mut expected = Vec::new();
    for d in 0..5 {
        let sub = dir.path().join(format!("dir{d}"));
        fs::create_dir(&sub).unwrap();
        for f in 0..4 {
            let file = sub.join(format!("file{f}.txt"));
            fs::write(&file, format!("{d}-{f}")).unwrap();
            expected.push(file);
        }
    }

    let mut files: Vec<PathBuf> = TreeWalker::new(dir.path(), false)
        .filter(|n| n.kind == NodeKind::File)
        .map(|n| n.path)
        .collect();
    files.sort();
    expected.sort();
    assert_eq!(files, expected);
}

#[test]
fn test_directories_reported_to_sink() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("a").join("b")).unwrap();

    let sink = Arc::new(MemorySink::new());
    let config = IndexerConfig::default().with_sink(sink.clone());
    let (index, stats) = Indexer::new(config).index(dir.path()).unwrap();

    assert!(index.is_empty());
    assert_eq!(stats.directories, 3);
    assert_eq!(sink.len(), 3);
    assert_eq!(sink.warning_count(), 0);
}

#[cfg(unix)]
#[test]
fn test_symlinked_directory_only_followed_on_request() {
    let dir = tempdir().unwrap();
    let real = dir.path().join("real");
    fs::create_dir(&real).unwrap();
    fs::write(real.join("inside.txt"), b"inside").unwrap();
    std::os::unix::fs::symlink(&real, dir.path().join("link")).unwrap();

    let sink = Arc::new(MemorySink::new());
    let config = IndexerConfig::default().with_sink(sink.clone());
    let (index, _) = Indexer::new(config).index(dir.path()).unwrap();
    assert_eq!(index.len(), 1);
    assert_eq!(sink.warnings(WarningKind::UnfollowedSymlink).len(), 1);

    let config = IndexerConfig::default().with_follow_symlinks(true);
    let (index, _) = Indexer::new(config).index(dir.path()).unwrap();
    assert_eq!(index.len(), 2);
}

#[cfg(unix)]
#[test]
fn test_symlink_cycle_terminates() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("file.txt"), b"data").unwrap();
    std::os::unix::fs::symlink(dir.path(), sub.join("back")).unwrap();

    let sink = Arc::new(MemorySink::new());
    let config = IndexerConfig::default()
        .with_follow_symlinks(true)
        .with_sink(sink.clone());
    let (index, _) = Indexer::new(config).index(dir.path()).unwrap();

    assert_eq!(index.len(), 1);
    assert_eq!(sink.warnings(WarningKind::SymlinkCycle).len(), 1);
}

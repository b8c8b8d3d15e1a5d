use deldup::duplicates::{ContentIndex, DuplicateMatcher, Indexer, MatchOutcome};
use deldup::scanner::{CompositeKey, FileIdentity};
use std::fs;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

const PARTIAL: usize = 64 * 1024;

/// Two files sharing the first 64 KiB and the size, differing afterwards.
fn colliding_pair(dir: &TempDir) -> (PathBuf, PathBuf) {
    let mut first = vec![7u8; PARTIAL + 10];
    let mut second = first.clone();
    first[PARTIAL + 5] = 1;
    second[PARTIAL + 5] = 2;

    let a = dir.path().join("first.bin");
    let b = dir.path().join("second.bin");
    fs::write(&a, &first).unwrap();
    fs::write(&b, &second).unwrap();
    (a, b)
}

#[test]
fn test_fast_key_collision_is_anomalous() {
    let official = tempdir().unwrap();
    let new = tempdir().unwrap();
    let (a, b) = colliding_pair(&official);
    fs::rename(&b, new.path().join("second.bin")).unwrap();

    let (official_index, _) = Indexer::with_defaults().index(official.path()).unwrap();
    let candidate = FileIdentity::plain(new.path().join("second.bin"));

    let original = official_index.entries().next().unwrap();
    assert_eq!(original.path(), fs::canonicalize(&a).unwrap());
    assert_eq!(
        original.composite_key().unwrap(),
        candidate.composite_key().unwrap()
    );
    assert_ne!(
        original.full_fingerprint().unwrap(),
        candidate.full_fingerprint().unwrap()
    );

    let decision = DuplicateMatcher::new(&official_index).match_entry(&candidate);
    assert!(decision.is_anomalous());
    assert!(!decision.is_duplicate());
    match decision.outcome {
        MatchOutcome::FastKeyCollision(others) => assert_eq!(others.len(), 1),
        other => panic!("expected a collision, got {other:?}"),
    }
}

#[test]
fn test_collision_inside_one_index() {
    let dir = tempdir().unwrap();
    let (a, b) = colliding_pair(&dir);

    let (index, _) = Indexer::with_defaults().index(dir.path()).unwrap();

    assert_eq!(index.len(), 2);
    assert_eq!(index.bucket_count(), 1);
    let (key, bucket) = index.collisions().next().unwrap();
    assert_eq!(key.size, (PARTIAL + 10) as u64);
    let mut paths: Vec<PathBuf> = bucket.iter().map(|i| i.path().to_path_buf()).collect();
    paths.sort();
    let mut expected = vec![fs::canonicalize(a).unwrap(), fs::canonicalize(b).unwrap()];
    expected.sort();
    assert_eq!(paths, expected);
}

#[test]
fn test_duplicate_reports_every_confirmed_original() {
    let official = tempdir().unwrap();
    let new = tempdir().unwrap();
    fs::create_dir(official.path().join("2019")).unwrap();
    fs::write(official.path().join("one.txt"), b"same bytes").unwrap();
    fs::write(official.path().join("2019").join("two.txt"), b"same bytes").unwrap();
    fs::write(new.path().join("copy.txt"), b"same bytes").unwrap();

    let (official_index, _) = Indexer::with_defaults().index(official.path()).unwrap();
    let (new_index, _) = Indexer::with_defaults().index(new.path()).unwrap();
    let (decisions, stats) = DuplicateMatcher::new(&official_index).match_index(&new_index);

    assert_eq!(stats.candidates, 1);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(decisions[0].matches().len(), 2);
}

#[test]
fn test_decisions_follow_new_tree_order() {
    let official = tempdir().unwrap();
    let new = tempdir().unwrap();
    fs::write(official.path().join("kept.txt"), b"kept").unwrap();
    for name in ["c.txt", "a.txt", "b.txt"] {
        fs::write(new.path().join(name), name.as_bytes()).unwrap();
    }
    fs::write(new.path().join("dup.txt"), b"kept").unwrap();

    let (official_index, _) = Indexer::with_defaults().index(official.path()).unwrap();
    let (new_index, _) = Indexer::with_defaults().index(new.path()).unwrap();

    let expected: Vec<PathBuf> = new_index.entries().map(|i| i.path().to_path_buf()).collect();
    let seen: Vec<PathBuf> = DuplicateMatcher::new(&official_index)
        .decisions(new_index.entries())
        .map(|d| d.candidate.path().to_path_buf())
        .collect();
    assert_eq!(seen, expected);
}

#[test]
fn test_same_tree_as_official_and_new() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"twin").unwrap();
    fs::write(dir.path().join("b.txt"), b"twin").unwrap();
    fs::write(dir.path().join("c.txt"), b"single").unwrap();

    let (index, _) = Indexer::with_defaults().index(dir.path()).unwrap();
    let (decisions, stats) = DuplicateMatcher::new(&index).match_index(&index);

    // Each twin matches the other, never itself
    assert_eq!(stats.duplicates, 2);
    assert_eq!(stats.unique, 1);
    for decision in decisions.iter().filter(|d| d.is_duplicate()) {
        assert_eq!(decision.matches().len(), 1);
        assert_ne!(decision.matches()[0].path(), decision.candidate.path());
    }
}

#[test]
fn test_empty_official_index() {
    let new = tempdir().unwrap();
    fs::write(new.path().join("a.txt"), b"anything").unwrap();

    let official = ContentIndex::new();
    let (new_index, _) = Indexer::with_defaults().index(new.path()).unwrap();
    let (_, stats) = DuplicateMatcher::new(&official).match_index(&new_index);

    assert_eq!(stats.unique, 1);
    assert!(!official.contains_key(&CompositeKey::new(0, 0)));
}

use deldup::diagnostics::{MemorySink, WarningKind};
use deldup::duplicates::{DuplicateMatcher, Indexer, IndexerConfig, MatchOutcome};
use deldup::scanner::FileIdentity;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;

fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
    let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.add_directory("nested/", options).unwrap();
    for (name, data) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
}

fn image_bytes() -> Vec<u8> {
    (0..200_000u32).map(|i| (i % 251) as u8).collect()
}

#[test]
fn test_loose_file_matches_archived_entry() {
    let official = tempdir().unwrap();
    let new = tempdir().unwrap();
    let image = image_bytes();
    write_zip(&official.path().join("photo.zip"), &[("img.jpg", &image)]);
    fs::write(new.path().join("img.jpg"), &image).unwrap();

    let config = IndexerConfig::default().with_enter_archives(true);
    let (official_index, stats) = Indexer::new(config).index(official.path()).unwrap();
    assert_eq!(stats.archive_entries, 1);

    let (new_index, _) = Indexer::with_defaults().index(new.path()).unwrap();
    let (decisions, match_stats) = DuplicateMatcher::new(&official_index).match_index(&new_index);

    assert_eq!(match_stats.duplicates, 1);
    let matches = decisions[0].matches();
    assert_eq!(matches.len(), 1);
    assert!(matches[0].is_archived());
    assert!(matches[0].to_string().ends_with("photo.zip|img.jpg"));
    assert_eq!(matches[0].deletion_target(), None);
}

#[test]
fn test_archives_ignored_when_disabled() {
    let official = tempdir().unwrap();
    let new = tempdir().unwrap();
    let image = image_bytes();
    write_zip(&official.path().join("photo.zip"), &[("img.jpg", &image)]);
    fs::write(new.path().join("img.jpg"), &image).unwrap();

    let (official_index, _) = Indexer::with_defaults().index(official.path()).unwrap();
    let (new_index, _) = Indexer::with_defaults().index(new.path()).unwrap();
    let (decisions, stats) = DuplicateMatcher::new(&official_index).match_index(&new_index);

    assert_eq!(stats.duplicates, 0);
    assert!(matches!(decisions[0].outcome, MatchOutcome::Unique));
}

#[test]
fn test_archived_fingerprints_come_from_metadata() {
    let dir = tempdir().unwrap();
    let data = b"stored in the archive".to_vec();
    write_zip(&dir.path().join("a.zip"), &[("doc.txt", &data)]);

    let config = IndexerConfig::default().with_enter_archives(true);
    let (index, _) = Indexer::new(config).index(dir.path()).unwrap();
    let entry = index.entries().find(|i| i.is_archived()).unwrap();

    // The container is gone; size and full fingerprint need no read
    fs::remove_file(dir.path().join("a.zip")).unwrap();
    let loose = FileIdentity::plain({
        let path = dir.path().join("doc.txt");
        fs::write(&path, &data).unwrap();
        path
    });

    assert_eq!(entry.size().unwrap(), data.len() as u64);
    assert_eq!(
        entry.full_fingerprint().unwrap(),
        loose.full_fingerprint().unwrap()
    );
    assert_eq!(
        entry.composite_key().unwrap(),
        loose.composite_key().unwrap()
    );
}

#[test]
fn test_directories_inside_archive_are_not_indexed() {
    let dir = tempdir().unwrap();
    write_zip(
        &dir.path().join("mixed.ZIP"),
        &[("nested/a.txt", b"a"), ("b.txt", b"b")],
    );

    let config = IndexerConfig::default().with_enter_archives(true);
    let (index, stats) = Indexer::new(config).index(dir.path()).unwrap();

    assert_eq!(stats.archive_entries, 2);
    let mut names: Vec<String> = index
        .entries()
        .filter_map(|i| i.entry().map(|e| e.name.clone()))
        .collect();
    names.sort();
    assert_eq!(names, vec!["b.txt", "nested/a.txt"]);
}

#[test]
fn test_corrupt_archive_container_still_indexed() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("broken.zip"), b"PK\x03\x04 truncated").unwrap();
    fs::write(dir.path().join("other.txt"), b"fine").unwrap();

    let sink = Arc::new(MemorySink::new());
    let config = IndexerConfig::default()
        .with_enter_archives(true)
        .with_sink(sink.clone());
    let (index, stats) = Indexer::new(config).index(dir.path()).unwrap();

    assert_eq!(index.len(), 2);
    assert_eq!(stats.archives_failed, 1);
    assert_eq!(stats.archive_entries, 0);
    assert_eq!(sink.warnings(WarningKind::ArchiveOpen).len(), 1);
}

#[test]
fn test_archived_copy_of_official_loose_file() {
    // The reverse direction: official holds the loose file, the new tree an archive
    let official = tempdir().unwrap();
    let new = tempdir().unwrap();
    fs::write(official.path().join("notes.txt"), b"meeting notes").unwrap();
    write_zip(&new.path().join("backup.zip"), &[("notes.txt", b"meeting notes")]);

    let (official_index, _) = Indexer::with_defaults().index(official.path()).unwrap();
    let config = IndexerConfig::default().with_enter_archives(true);
    let (new_index, _) = Indexer::new(config).index(new.path()).unwrap();

    let (decisions, stats) = DuplicateMatcher::new(&official_index).match_index(&new_index);

    assert_eq!(stats.duplicates, 1);
    let duplicate = decisions.iter().find(|d| d.is_duplicate()).unwrap();
    assert!(duplicate.candidate.is_archived());
}

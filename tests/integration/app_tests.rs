use deldup::app::{dedupe, dump, RunContext};
use deldup::cli::{DedupeArgs, DumpArgs, IndexArgs};
use deldup::config::Config;
use deldup::error::ExitCode;
use deldup::signal::ShutdownHandler;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

fn context() -> RunContext {
    RunContext::new(Config::default(), ShutdownHandler::new(), true)
}

fn dedupe_args(official: &Path, new: &Path) -> DedupeArgs {
    DedupeArgs {
        official: official.to_path_buf(),
        new: new.to_path_buf(),
        index: IndexArgs::default(),
        yes: false,
        dry_run: false,
        permanent: true,
        no_permanent: false,
    }
}

fn trees() -> (TempDir, TempDir) {
    let official = tempdir().unwrap();
    let new = tempdir().unwrap();
    fs::write(official.path().join("a.txt"), b"hello").unwrap();
    fs::write(new.path().join("copy.txt"), b"hello").unwrap();
    fs::write(new.path().join("fresh.txt"), b"world").unwrap();
    (official, new)
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap()
}

fn run(args: &DedupeArgs, answers: &str) -> (ExitCode, String) {
    let mut input = Cursor::new(answers.as_bytes().to_vec());
    let mut output = Vec::new();
    let code = dedupe(args, &context(), &mut input, &mut output).unwrap();
    (code, String::from_utf8(output).unwrap())
}

#[test]
fn test_dedupe_deletes_confirmed_duplicate() {
    let (official, new) = trees();
    let args = dedupe_args(official.path(), new.path());

    let (code, output) = run(&args, "y\n");

    assert_eq!(code, ExitCode::Success);
    assert!(!new.path().join("copy.txt").exists());
    assert!(new.path().join("fresh.txt").exists());
    assert!(official.path().join("a.txt").exists());
    let copy = canonical(new.path()).join("copy.txt");
    let original = canonical(official.path()).join("a.txt");
    assert!(output.contains(&format!("File {}", copy.display())));
    assert!(output.contains("is duplicated at:"));
    assert!(output.contains(&format!(" => {}", original.display())));
    assert!(output.contains("Delete? (y/Y/n/N) :"));
    assert!(output.contains("deleted 1"));
}

#[test]
fn test_dedupe_declined_keeps_file() {
    let (official, new) = trees();
    let args = dedupe_args(official.path(), new.path());

    let (code, output) = run(&args, "n\n");

    assert_eq!(code, ExitCode::Success);
    assert!(new.path().join("copy.txt").exists());
    assert!(output.contains("1 kept"));
}

#[test]
fn test_dedupe_end_of_input_stops() {
    let (official, new) = trees();
    let args = dedupe_args(official.path(), new.path());

    let (code, output) = run(&args, "");

    assert_eq!(code, ExitCode::Success);
    assert!(new.path().join("copy.txt").exists());
    assert!(output.contains("deleted 0"));
}

#[test]
fn test_dedupe_yes_to_all() {
    let official = tempdir().unwrap();
    let new = tempdir().unwrap();
    for i in 0..3 {
        let content = format!("content {i}");
        fs::write(official.path().join(format!("o{i}")), &content).unwrap();
        fs::write(new.path().join(format!("n{i}")), &content).unwrap();
    }
    let args = dedupe_args(official.path(), new.path());

    // One capital Y answers every later prompt
    let (code, output) = run(&args, "Y\n");

    assert_eq!(code, ExitCode::Success);
    assert_eq!(fs::read_dir(new.path()).unwrap().count(), 0);
    assert_eq!(output.matches("Delete? (y/Y/n/N) :").count(), 1);
}

#[test]
fn test_dedupe_dry_run() {
    let (official, new) = trees();
    let mut args = dedupe_args(official.path(), new.path());
    args.dry_run = true;

    let (code, output) = run(&args, "");

    assert_eq!(code, ExitCode::Success);
    assert!(new.path().join("copy.txt").exists());
    assert!(output.contains("Would delete"));
    assert!(!output.contains("Delete? (y/Y/n/N) :"));
}

#[test]
fn test_dedupe_no_duplicates() {
    let official = tempdir().unwrap();
    let new = tempdir().unwrap();
    fs::write(official.path().join("a.txt"), b"one").unwrap();
    fs::write(new.path().join("b.txt"), b"two").unwrap();
    let args = dedupe_args(official.path(), new.path());

    let (code, output) = run(&args, "");

    assert_eq!(code, ExitCode::NoDuplicates);
    assert!(output.starts_with("0 duplicate(s)"));
}

#[test]
fn test_dedupe_archived_original_is_reported_not_deleted() {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let official = tempdir().unwrap();
    let new = tempdir().unwrap();
    let archive = official.path().join("photo.zip");
    let mut writer = zip::ZipWriter::new(fs::File::create(&archive).unwrap());
    writer
        .start_file("img.jpg", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"jpeg bytes").unwrap();
    writer.finish().unwrap();
    fs::write(new.path().join("img.jpg"), b"jpeg bytes").unwrap();

    let mut args = dedupe_args(official.path(), new.path());
    args.yes = true;
    args.index.enter_archives = true;

    let (code, output) = run(&args, "");

    assert_eq!(code, ExitCode::Success);
    let archive_path = canonical(official.path()).join("photo.zip");
    assert!(output.contains(&format!(" => {}|img.jpg", archive_path.display())));
    assert!(!new.path().join("img.jpg").exists());
    assert!(archive.exists());
}

#[test]
fn test_dedupe_missing_official_tree() {
    let new = tempdir().unwrap();
    let args = dedupe_args(&new.path().join("absent"), new.path());

    let mut output = Vec::new();
    let err = dedupe(&args, &context(), &mut Cursor::new(Vec::new()), &mut output).unwrap_err();

    assert!(format!("{err:#}").contains("Path not found"));
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
}

#[test]
fn test_dedupe_interrupted_before_indexing() {
    let (official, new) = trees();
    let args = dedupe_args(official.path(), new.path());
    let shutdown = ShutdownHandler::new();
    shutdown.request_shutdown();
    let context = RunContext::new(Config::default(), shutdown, true);

    let mut output = Vec::new();
    let err = dedupe(&args, &context, &mut Cursor::new(Vec::new()), &mut output).unwrap_err();

    assert_eq!(ExitCode::for_error(&err), ExitCode::Interrupted);
    assert!(new.path().join("copy.txt").exists());
}

#[test]
fn test_dump_writes_csv_rows() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("digits.txt"), b"123456789").unwrap();
    fs::write(dir.path().join("empty.txt"), b"").unwrap();

    let args = DumpArgs {
        official: dir.path().to_path_buf(),
        index: IndexArgs::default(),
        header: true,
        no_header: false,
        output: None,
    };
    let mut output = Vec::new();
    let code = dump(&args, &context(), &mut output).unwrap();
    let csv = String::from_utf8(output).unwrap();

    assert_eq!(code, ExitCode::Success);
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "name,size,partial,modified");
    assert!(csv.contains("digits.txt,9,3421780262,"));
    assert!(csv.contains("empty.txt,0,0,"));
}

#[test]
fn test_dump_uses_config_defaults() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"a").unwrap();

    let config = Config {
        csv_header: true,
        ..Config::default()
    };
    let context = RunContext::new(config, ShutdownHandler::new(), true);
    let args = DumpArgs {
        official: dir.path().to_path_buf(),
        index: IndexArgs::default(),
        header: false,
        no_header: false,
        output: None,
    };
    let mut output = Vec::new();
    dump(&args, &context, &mut output).unwrap();

    assert!(String::from_utf8(output).unwrap().starts_with("name,size,partial,modified\n"));
}

fn survivors(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_dedupe_same_tree_keeps_one_copy() {
    let dir = tempdir().unwrap();
    for name in ["a.txt", "b.txt", "c.txt"] {
        fs::write(dir.path().join(name), b"triplet").unwrap();
    }
    let mut args = dedupe_args(dir.path(), dir.path());
    args.yes = true;

    let (code, output) = run(&args, "");

    assert_eq!(code, ExitCode::Success);
    assert_eq!(survivors(dir.path()).len(), 1);
    assert!(output.contains("deleted 2"));
    assert!(output.contains("No original left in place"));
}

#[test]
fn test_dedupe_same_tree_spelled_differently() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("only.txt"), b"single copy").unwrap();
    let mut args = dedupe_args(dir.path(), &dir.path().join("sub").join(".."));
    args.yes = true;

    let (code, output) = run(&args, "");

    assert_eq!(code, ExitCode::NoDuplicates);
    assert!(dir.path().join("only.txt").exists());
    assert!(output.starts_with("0 duplicate(s)"));
}

#[cfg(unix)]
#[test]
fn test_dedupe_same_tree_through_symlinked_parent() {
    let dir = tempdir().unwrap();
    let real = dir.path().join("real");
    fs::create_dir(&real).unwrap();
    fs::write(real.join("only.txt"), b"single copy").unwrap();
    let alias = dir.path().join("alias");
    std::os::unix::fs::symlink(&real, &alias).unwrap();
    let mut args = dedupe_args(&real, &alias);
    args.yes = true;

    let (code, _) = run(&args, "");

    assert_eq!(code, ExitCode::NoDuplicates);
    assert!(real.join("only.txt").exists());
}

#[test]
fn test_dedupe_new_tree_nested_in_official() {
    let official = tempdir().unwrap();
    let nested = official.path().join("incoming");
    fs::create_dir(&nested).unwrap();
    fs::write(official.path().join("other.txt"), b"unrelated").unwrap();
    fs::write(nested.join("x.txt"), b"twin").unwrap();
    fs::write(nested.join("y.txt"), b"twin").unwrap();
    fs::write(nested.join("solo.txt"), b"alone").unwrap();
    let mut args = dedupe_args(official.path(), &nested);
    args.yes = true;

    run(&args, "");

    let left = survivors(&nested);
    assert!(left.contains(&"solo.txt".to_string()));
    assert_eq!(left.iter().filter(|name| name.as_str() != "solo.txt").count(), 1);
    assert!(official.path().join("other.txt").exists());
}

#[test]
fn test_dedupe_flag_turns_off_configured_archives() {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let official = tempdir().unwrap();
    let new = tempdir().unwrap();
    let mut writer =
        zip::ZipWriter::new(fs::File::create(official.path().join("bundle.zip")).unwrap());
    writer
        .start_file("doc.txt", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"archived text").unwrap();
    writer.finish().unwrap();
    fs::write(new.path().join("doc.txt"), b"archived text").unwrap();

    let config = Config {
        enter_archives: true,
        ..Config::default()
    };
    let context = RunContext::new(config, ShutdownHandler::new(), true);
    let mut args = dedupe_args(official.path(), new.path());
    args.yes = true;
    args.index.no_enter_archives = true;

    let mut output = Vec::new();
    let code = dedupe(&args, &context, &mut Cursor::new(Vec::new()), &mut output).unwrap();

    assert_eq!(code, ExitCode::NoDuplicates);
    assert!(new.path().join("doc.txt").exists());
}

#[test]
fn test_dump_flag_turns_off_configured_header() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"a").unwrap();

    let config = Config {
        csv_header: true,
        ..Config::default()
    };
    let context = RunContext::new(config, ShutdownHandler::new(), true);
    let args = DumpArgs {
        official: dir.path().to_path_buf(),
        index: IndexArgs::default(),
        header: false,
        no_header: true,
        output: None,
    };
    let mut output = Vec::new();
    dump(&args, &context, &mut output).unwrap();

    let csv = String::from_utf8(output).unwrap();
    assert!(!csv.starts_with("name,"));
    assert!(csv.contains("a.txt,1,"));
}

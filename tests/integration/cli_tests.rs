use clap::Parser;
use dupfinder::actions::journal::read_entries;
use dupfinder::cli::Cli;
use dupfinder::config::Config;
use dupfinder::error::ExitCode;
use dupfinder::run_app;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// A data tree plus an empty settings file and journal root.
struct Workspace {
    root: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let root = tempdir().unwrap();
        fs::create_dir(root.path().join("data")).unwrap();
        fs::create_dir(root.path().join("store")).unwrap();
        fs::write(root.path().join("settings.toml"), "").unwrap();
        Self { root }
    }

    fn data(&self) -> PathBuf {
        self.root.path().join("data")
    }

    fn store(&self) -> PathBuf {
        self.root.path().join("store")
    }

    fn settings(&self) -> PathBuf {
        self.root.path().join("settings.toml")
    }

    fn write(&self, name: &str, content: &[u8]) {
        let path = self.data().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn run(&self, extra: &[&str]) -> anyhow::Result<ExitCode> {
        let settings = self.settings();
        let store = self.store();
        let mut argv = vec![
            "dupfinder".to_string(),
            "-q".to_string(),
            "scan".to_string(),
            "--config".to_string(),
            settings.display().to_string(),
            "--journal-root".to_string(),
            store.display().to_string(),
        ];
        argv.extend(extra.iter().map(|s| (*s).to_string()));
        run_app(Cli::try_parse_from(argv).unwrap())
    }
}

fn journal_in(store: &Path) -> PathBuf {
    fs::read_dir(store.join("finder"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| p.is_file())
        .unwrap()
}

#[test]
fn test_run_app_reports_duplicates() {
    let ws = Workspace::new();
    ws.write("a.txt", b"dup");
    ws.write("nested/b.txt", b"dup");
    let data = ws.data();

    let code = ws.run(&[data.to_str().unwrap()]).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(ws.data().join("nested/b.txt").exists());
    assert_eq!(read_entries(&journal_in(&ws.store())).unwrap().len(), 2);
}

#[test]
fn test_run_app_without_duplicates() {
    let ws = Workspace::new();
    ws.write("a.txt", b"one");
    ws.write("b.txt", b"two");
    let data = ws.data();

    let code = ws.run(&[data.to_str().unwrap()]).unwrap();

    assert_eq!(code, ExitCode::NoDuplicates);
}

#[test]
fn test_run_app_ext_filter_excludes_other_types() {
    let ws = Workspace::new();
    ws.write("a.log", b"dup");
    ws.write("b.log", b"dup");
    ws.write("c.txt", b"other");
    let data = ws.data();

    let code = ws.run(&[data.to_str().unwrap(), "--ext", "txt"]).unwrap();

    assert_eq!(code, ExitCode::NoDuplicates);
}

#[test]
fn test_run_app_move_action() {
    let ws = Workspace::new();
    ws.write("a.txt", b"dup");
    ws.write("b.txt", b"dup");
    let data = ws.data();

    let code = ws
        .run(&[data.to_str().unwrap(), "--action", "move"])
        .unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(ws.data().join("a.txt").exists());
    assert!(!ws.data().join("b.txt").exists());
    let quarantined = fs::read_dir(ws.store().join("finder"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| p.is_dir())
        .unwrap();
    assert!(quarantined.join("b.txt").exists());
}

#[test]
fn test_run_app_uses_configured_folders() {
    let ws = Workspace::new();
    ws.write("x.bin", b"same");
    ws.write("y.bin", b"same");
    let config = Config {
        scan_folders: vec![ws.data()],
        ..Config::default()
    };
    config.save_to(&ws.settings()).unwrap();

    let code = ws.run(&[]).unwrap();

    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_run_app_save_config_persists_overrides() {
    let ws = Workspace::new();
    ws.write("only.txt", b"x");
    let data = ws.data();

    ws.run(&[data.to_str().unwrap(), "--ext", "jpg", "--save-config"])
        .unwrap();

    let saved = Config::load_from(&ws.settings()).unwrap();
    assert_eq!(saved.scan_folders, vec![ws.data()]);
    assert_eq!(saved.normal_suffixes, vec!["jpg"]);
    assert_eq!(saved.journal_root, Some(ws.store()));
}

#[test]
fn test_run_app_without_folders_is_an_error() {
    let ws = Workspace::new();

    let err = ws.run(&[]).unwrap_err();

    assert!(err.to_string().contains("No directories to scan"));
}

#[test]
fn test_run_app_malformed_settings_is_an_error() {
    let ws = Workspace::new();
    fs::write(ws.settings(), "threads = \"many\"").unwrap();
    let data = ws.data();

    assert!(ws.run(&[data.to_str().unwrap()]).is_err());
}

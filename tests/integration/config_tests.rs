use dupfinder::actions::ActionPolicy;
use dupfinder::config::{Config, FileTypeMode};
use figment::providers::{Format, Serialized, Toml};
use figment::Figment;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Figment directly, without Env, so the process environment cannot interfere.
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .extract()
        .unwrap();

    assert_eq!(config, Config::default());
    assert_eq!(config.threads, 20);
    assert_eq!(
        config.normal_suffixes,
        vec!["jpeg", "mov", "mp3", "mp4", "txt", "docx", "xlsx"]
    );
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    let toml_content = r#"
scan_folders = ["/photos", "/backup"]
file_types = "normal"
normal_suffixes = ["jpg", "png"]
action = "delete"
journal_root = "/var/dupfinder"
threads = 4
"#;
    fs::write(&config_path, toml_content).unwrap();

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .extract()
        .unwrap();

    assert_eq!(
        config.scan_folders,
        vec![PathBuf::from("/photos"), PathBuf::from("/backup")]
    );
    assert_eq!(config.file_types, FileTypeMode::Normal);
    assert_eq!(config.action, ActionPolicy::Delete);
    assert_eq!(config.journal_root(), PathBuf::from("/var/dupfinder"));
    assert_eq!(config.threads, 4);
    assert!(!config.follow_symlinks);

    let request = config.scan_request();
    assert_eq!(request.roots.len(), 2);
    assert_eq!(request.filter.iter().collect::<Vec<_>>(), vec!["jpg", "png"]);
}

#[test]
fn test_config_partial_file_keeps_defaults() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    fs::write(&config_path, "action = \"move\"\n").unwrap();

    let config = Config::load_from(&config_path).unwrap();

    assert_eq!(config.action, ActionPolicy::Move);
    assert_eq!(config.file_types, FileTypeMode::All);
    assert!(config.scan_request().filter.is_unrestricted());
}

#[test]
fn test_config_missing_file_yields_defaults() {
    let temp_dir = tempdir().unwrap();

    let config = Config::load_from(&temp_dir.path().join("absent.toml")).unwrap();

    assert!(config.scan_folders.is_empty());
    assert_eq!(config.action, ActionPolicy::Scan);
}

#[test]
fn test_config_malformed_file_is_an_error() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    fs::write(&config_path, "action = [[[").unwrap();

    assert!(Config::load_from(&config_path).is_err());
}

#[test]
fn test_config_unknown_action_is_an_error() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    fs::write(&config_path, "action = \"shred\"\n").unwrap();

    let err = Config::load_from(&config_path).unwrap_err();
    assert!(format!("{err:#}").contains("Invalid configuration"));
}

#[test]
fn test_config_save_then_load() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("conf").join("settings.toml");
    let config = Config {
        scan_folders: vec![PathBuf::from("/music")],
        file_types: FileTypeMode::Normal,
        action: ActionPolicy::Move,
        follow_symlinks: true,
        ..Config::default()
    };

    config.save_to(&config_path).unwrap();
    let loaded = Config::load_from(&config_path).unwrap();

    assert_eq!(loaded, config);
}

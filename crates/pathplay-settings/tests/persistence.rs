use pathplay_settings::{Config, SettingsError, SettingsStore};
use tempfile::TempDir;

#[test]
fn test_toml_and_json_files_load_back() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.playback.default_speed = 42.0;
    config.stock.tool_radius = 3.0;

    for name in ["config.toml", "config.json"] {
        let path = dir.path().join(name);
        config.save_to_file(&path).unwrap();
        assert_eq!(Config::load_from_file(&path).unwrap(), config);
    }
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_invalid_file_is_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[interpreter]\narc_step_degrees = 0.0\n").unwrap();
    assert!(matches!(
        Config::load_from_file(&path),
        Err(SettingsError::InvalidSetting { .. })
    ));

    std::fs::write(&path, "[playback\n").unwrap();
    assert!(matches!(
        Config::load_from_file(&path),
        Err(SettingsError::TomlError(_))
    ));
}

#[test]
fn test_store_creates_directory_and_reloads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("pathplay").join("config.toml");

    let mut store = SettingsStore::open(&path).unwrap();
    assert_eq!(store.config(), &Config::default());

    store.config_mut().interpreter.max_repeat_depth = 8;
    store.save().unwrap();
    assert!(path.exists());

    store.config_mut().interpreter.max_repeat_depth = 99;
    store.reload().unwrap();
    assert_eq!(store.config().interpreter.max_repeat_depth, 8);
    assert_eq!(store.path(), path.as_path());
}

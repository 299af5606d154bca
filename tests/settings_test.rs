use nunit_socket_runner::settings::{load_settings, save_settings, PersistentSettings};
use tempfile::TempDir;

#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().unwrap();
    let settings = load_settings(&dir.path().join("nonexistent.json"));
    assert!(settings.last_host.is_none());
}

#[test]
fn test_load_invalid_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "not json at all {{{").unwrap();
    // Should return defaults instead of panicking
    assert!(load_settings(&path).last_host.is_none());
}

#[test]
fn test_save_and_load_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("runner-settings.json");

    let settings = PersistentSettings {
        last_host: Some("10.1.2.3".to_string()),
    };
    save_settings(&path, &settings);

    assert_eq!(load_settings(&path).last_host.as_deref(), Some("10.1.2.3"));
}

#[test]
fn test_unknown_fields_are_ignored() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("runner-settings.json");
    std::fs::write(&path, r#"{"last_host": "build-agent", "theme": "dark"}"#).unwrap();
    assert_eq!(load_settings(&path).last_host.as_deref(), Some("build-agent"));
}

#[test]
fn test_remember_host_reports_changes() {
    let mut settings = PersistentSettings::default();
    assert!(settings.remember_host("10.0.0.1"));
    assert!(!settings.remember_host("10.0.0.1"));
    assert!(settings.remember_host("10.0.0.2"));
    assert_eq!(settings.last_host.as_deref(), Some("10.0.0.2"));
}

#[test]
fn test_save_to_missing_directory_does_not_panic() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing").join("runner-settings.json");
    save_settings(&path, &PersistentSettings::default());
    assert!(!path.exists());
}

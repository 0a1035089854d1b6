//! End-to-end manager scenarios against a real on-disk store.

use std::path::PathBuf;
use weblet_app::manager::WebAppManager;
use weblet_core::types::WebAppSettings;
use weblet_core::{Paths, WebletError};

fn manager(root: &std::path::Path) -> WebAppManager {
    WebAppManager::new(Paths::with_root(root), PathBuf::from("/usr/bin/weblet")).unwrap()
}

#[test]
fn test_create_trims_name_and_defaults_scheme() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager(dir.path());

    let webapp = manager
        .create_webapp("Example ", "example.com", None, None)
        .unwrap();
    assert_eq!(webapp.name, "Example");
    assert_eq!(webapp.url, "https://example.com");

    // Survives the store round trip unchanged.
    let stored = manager.get_webapp(&webapp.id).unwrap().unwrap();
    assert_eq!(stored.name, "Example");
    assert_eq!(stored.url, "https://example.com");
}

#[test]
fn test_create_rejects_bad_name_and_url() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager(dir.path());

    let err = manager
        .create_webapp("A", "https://a.example", None, None)
        .unwrap_err();
    match err {
        WebletError::Validation(msg) => assert!(msg.contains("name"), "{msg}"),
        other => panic!("expected validation error, got {other}"),
    }

    let err = manager
        .create_webapp("Mail", "not a url", None, None)
        .unwrap_err();
    match err {
        WebletError::Validation(msg) => assert!(msg.contains("url"), "{msg}"),
        other => panic!("expected validation error, got {other}"),
    }

    assert!(manager.list_webapps().unwrap().is_empty());
}

#[test]
fn test_settings_validation_and_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = manager(dir.path());

    let webapp = manager
        .create_webapp("Mail", "https://mail.example", None, None)
        .unwrap();

    let mut settings = manager.settings(&webapp.id).unwrap();
    settings.zoom_level = 0.0;
    assert!(settings.clone().checked().is_err());

    settings.zoom_level = 2.5;
    let settings = settings.checked().unwrap();
    manager.update_settings(&settings).unwrap();
    assert_eq!(manager.settings(&webapp.id).unwrap().zoom_level, 2.5);

    // Defaults for an id the store has never seen stay at 1.0.
    assert_eq!(WebAppSettings::new("other").zoom_level, 1.0);
}

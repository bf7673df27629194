use std::io::Write;

use governed_agents::domain::models::{LogFormat, RotationPolicy};
use governed_agents::ConfigLoader;
use tempfile::NamedTempFile;

fn yaml_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write yaml");
    file.flush().expect("flush yaml");
    file
}

#[test]
fn test_env_overrides_nested_values() {
    temp_env::with_vars(
        [
            ("GOVERNED_LEDGER__ALPHA", Some("0.25")),
            ("GOVERNED_VERIFICATION__REVIEWER_TIMEOUT_SECS", Some("45")),
            ("GOVERNED_DATABASE__PATH", Some("/tmp/governed-test.db")),
        ],
        || {
            let config = ConfigLoader::load().expect("config should load");
            assert!((config.ledger.alpha - 0.25).abs() < f64::EPSILON);
            assert_eq!(config.verification.reviewer_timeout_secs, 45);
            assert_eq!(config.database.path, "/tmp/governed-test.db");
            assert_eq!(config.verification.url_timeout_secs, 3);
        },
    );
}

#[test]
fn test_invalid_env_alpha_is_rejected() {
    temp_env::with_var("GOVERNED_LEDGER__ALPHA", Some("0"), || {
        let err = ConfigLoader::load().unwrap_err();
        assert!(err.to_string().contains("alpha"), "{err}");
    });
}

#[test]
fn test_file_values_and_defaults_merge() {
    let file = yaml_file(
        "logging:\n  format: pretty\n  rotation: hourly\n  log_dir: /var/log/governed\nverification:\n  max_urls: 2\n",
    );

    temp_env::with_vars_unset(
        ["GOVERNED_LOGGING__FORMAT", "GOVERNED_VERIFICATION__MAX_URLS"],
        || {
            let config = ConfigLoader::load_from_file(file.path()).unwrap();
            assert_eq!(config.logging.format, LogFormat::Pretty);
            assert_eq!(config.logging.rotation, RotationPolicy::Hourly);
            assert_eq!(
                config.logging.log_dir.as_deref(),
                Some(std::path::Path::new("/var/log/governed"))
            );
            assert_eq!(config.verification.max_urls, 2);
            assert_eq!(config.logging.level, "info");
        },
    );
}

#[test]
fn test_unknown_log_format_fails_to_load() {
    let file = yaml_file("logging:\n  format: xml\n");
    assert!(ConfigLoader::load_from_file(file.path()).is_err());
}

#[test]
fn test_zero_command_timeout_fails_validation() {
    let file = yaml_file("verification:\n  command_timeout_secs: 0\n");
    let err = ConfigLoader::load_from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("command_timeout_secs"), "{err}");
}

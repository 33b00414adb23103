use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::PathBuf;
use std::time::Duration;
use tableau_plumber::load_config::{
    load_config, ENV_EMAIL, ENV_PASSWORD, ENV_SERVER, ENV_SITENAME, ENV_USERNAME,
};
use tempfile::{tempdir, NamedTempFile};

const CREDENTIALS_JSON: &str = r#"{
    "username": "analyst",
    "password": "from-file",
    "server": "https://tableau.example.com",
    "email": "analyst@example.com",
    "sitename": "finance"
}"#;

fn clear_env() {
    for key in [ENV_USERNAME, ENV_PASSWORD, ENV_SERVER, ENV_EMAIL, ENV_SITENAME] {
        env::remove_var(key);
    }
}

fn credential_file() -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), CREDENTIALS_JSON).unwrap();
    file
}

/// A full settings file maps onto every typed section.
#[tokio::test]
#[serial]
async fn test_load_config_full_settings_file() {
    clear_env();
    let dir = tempdir().unwrap();
    write(dir.path().join("credential.json"), CREDENTIALS_JSON).unwrap();
    let config_yaml = r#"
credentials_path: credential.json
server:
  api_version: "3.19"
  page_size: 25
  chunk_threshold_bytes: 1048576
pacing:
  after_sign_in_ms: 0
  before_query_ms: 10
  between_downloads_ms: 20
  after_job_ms: 30
hyper:
  host: 127.0.0.1
  port: 7999
  user: extract_user
  hyperd_path: /opt/hyper/hyperd
  startup_timeout_ms: 500
"#;
    let config_path = dir.path().join("plumber.yaml");
    write(&config_path, config_yaml).unwrap();

    let config = load_config(Some(&config_path), None).expect("Config should load");

    assert_eq!(config.credentials.username, "analyst");
    assert_eq!(config.credentials.site, "finance");
    assert_eq!(config.client.api_version.as_deref(), Some("3.19"));
    assert_eq!(config.client.chunk_threshold_bytes, 1_048_576);
    assert_eq!(config.session.page_size, 25);
    assert_eq!(config.session.pacing.after_sign_in, Duration::ZERO);
    assert_eq!(config.session.pacing.after_job, Duration::from_millis(30));
    assert_eq!(config.hyper.host, "127.0.0.1");
    assert_eq!(config.hyper.port, 7999);
    assert_eq!(config.hyper.user, "extract_user");
    assert_eq!(
        config.hyper.hyperd_path,
        Some(PathBuf::from("/opt/hyper/hyperd"))
    );
    assert_eq!(config.hyper.startup_timeout, Duration::from_millis(500));
}

/// Without a settings file every value takes its default.
#[tokio::test]
#[serial]
async fn test_load_config_defaults_without_settings_file() {
    clear_env();
    let credentials = credential_file();

    let config = load_config(None, Some(credentials.path())).expect("Config should load");

    assert_eq!(config.client.api_version, None);
    assert_eq!(config.client.chunk_threshold_bytes, 64 * 1024 * 1024);
    assert_eq!(config.session.page_size, 100);
    assert_eq!(config.session.pacing.after_sign_in, Duration::from_secs(2));
    assert_eq!(config.session.pacing.between_downloads, Duration::from_secs(2));
    assert_eq!(config.hyper.port, 7483);
    assert_eq!(config.hyper.user, "tableau_internal_user");
    assert_eq!(config.hyper.hyperd_path, None);
}

/// Environment values win over the credential file.
#[tokio::test]
#[serial]
async fn test_load_config_env_overrides_credentials() {
    clear_env();
    let credentials = credential_file();
    env::set_var(ENV_PASSWORD, "from-env");
    env::set_var(ENV_SERVER, "https://other.example.com");
    env::set_var(ENV_SITENAME, "");

    let config = load_config(None, Some(credentials.path())).expect("Config should load");
    clear_env();

    assert_eq!(config.credentials.password, "from-env");
    assert_eq!(config.credentials.server, "https://other.example.com");
    // Empty variables do not blank out file values.
    assert_eq!(config.credentials.site, "finance");
    assert_eq!(config.credentials.username, "analyst");
}

/// A named credential file that does not exist is an error.
#[tokio::test]
#[serial]
async fn test_load_config_missing_named_credentials_fails() {
    clear_env();
    let result = load_config(None, Some(std::path::Path::new("/no/such/credential.json")));
    assert!(result.is_err());
}

#[tokio::test]
#[serial]
async fn test_load_config_missing_file_fails() {
    clear_env();
    let result = load_config(Some(std::path::Path::new("/no/such/plumber.yaml")), None);
    let err = result.expect_err("missing config must fail");
    assert!(err.to_string().contains("Failed to read config file"));
}

#[tokio::test]
#[serial]
async fn test_load_config_rejects_unknown_keys() {
    clear_env();
    let credentials = credential_file();
    let config_file = NamedTempFile::new().unwrap();
    write(config_file.path(), "server:\n  page_sise: 10\n").unwrap();

    let result = load_config(Some(config_file.path()), Some(credentials.path()));

    let err = result.expect_err("typo must be reported");
    assert!(err.to_string().contains("Failed to parse config YAML"));
}

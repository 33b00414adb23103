/// `load_config` module: Loads the optional YAML settings file and the JSON credential file, applies
/// environment overrides, and produces the [`PlumberConfig`] every CLI command runs with.
///
/// This module is the only place where user-supplied YAML is parsed and mapped to the strongly-typed
/// settings of the core crate and the transports.
///
/// # Responsibilities
/// - Parse the YAML settings file (every key optional) into intermediate structs
/// - Resolve the credential file: `--credentials`, then `credentials_path`, then `credential.json`
/// - Override credential values from `TABLEAU_*` environment variables
/// - Map millisecond pacing values and Hyper options onto their typed settings
///
/// # Errors
/// All errors in this module use `anyhow::Error` for context-rich diagnostics, and are surfaced at the
/// CLI boundary. Incomplete credentials are not an error here; `Session::login` rejects them.
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::hyper::HyperSettings;
use crate::rest::ClientSettings;
use tableau_plumber_core::config::{Credentials, Pacing, DEFAULT_CREDENTIAL_PATH};
use tableau_plumber_core::session::SessionSettings;

pub const ENV_USERNAME: &str = "TABLEAU_USERNAME";
pub const ENV_PASSWORD: &str = "TABLEAU_PASSWORD";
pub const ENV_SERVER: &str = "TABLEAU_SERVER";
pub const ENV_EMAIL: &str = "TABLEAU_EMAIL";
pub const ENV_SITENAME: &str = "TABLEAU_SITENAME";

#[derive(Debug, Clone)]
pub struct PlumberConfig {
    pub credentials: Credentials,
    pub client: ClientSettings,
    pub session: SessionSettings,
    pub hyper: HyperSettings,
}

impl PlumberConfig {
    pub fn trace_loaded(&self) {
        self.credentials.trace_loaded();
        info!(
            api_version = ?self.client.api_version,
            chunk_threshold_bytes = self.client.chunk_threshold_bytes,
            page_size = self.session.page_size,
            hyper_port = self.hyper.port,
            hyperd = ?self.hyper.hyperd_path,
            "Loaded settings"
        );
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    credentials_path: Option<PathBuf>,
    server: ServerSection,
    pacing: PacingSection,
    hyper: HyperSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ServerSection {
    api_version: Option<String>,
    page_size: Option<u32>,
    chunk_threshold_bytes: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PacingSection {
    after_sign_in_ms: Option<u64>,
    before_query_ms: Option<u64>,
    between_downloads_ms: Option<u64>,
    after_job_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct HyperSection {
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    hyperd_path: Option<PathBuf>,
    startup_timeout_ms: Option<u64>,
}

impl PacingSection {
    fn into_pacing(self) -> Pacing {
        let defaults = Pacing::default();
        let ms = |value: Option<u64>, default: Duration| value.map(Duration::from_millis).unwrap_or(default);
        Pacing {
            after_sign_in: ms(self.after_sign_in_ms, defaults.after_sign_in),
            before_query: ms(self.before_query_ms, defaults.before_query),
            between_downloads: ms(self.between_downloads_ms, defaults.between_downloads),
            after_job: ms(self.after_job_ms, defaults.after_job),
        }
    }
}

impl HyperSection {
    fn into_settings(self) -> HyperSettings {
        let defaults = HyperSettings::default();
        HyperSettings {
            host: self.host.unwrap_or(defaults.host),
            port: self.port.unwrap_or(defaults.port),
            user: self.user.unwrap_or(defaults.user),
            hyperd_path: self.hyperd_path,
            startup_timeout: self
                .startup_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.startup_timeout),
        }
    }
}

fn read_raw_config(path: &Path) -> Result<RawConfig> {
    info!(config_path = ?path, "Loading configuration from file");
    let content = match fs::read_to_string(path) {
        Ok(content) => {
            info!(config_path = ?path, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path, e));
        }
    };
    if content.trim().is_empty() {
        return Ok(RawConfig::default());
    }
    match serde_yaml::from_str(&content) {
        Ok(raw) => {
            info!(config_path = ?path, "Parsed config YAML successfully");
            Ok(raw)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
            Err(anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}

/// Replaces credential values with non-empty `TABLEAU_*` environment variables.
pub fn apply_env_overrides(credentials: &mut Credentials) {
    let fields: [(&str, &mut String); 5] = [
        (ENV_USERNAME, &mut credentials.username),
        (ENV_PASSWORD, &mut credentials.password),
        (ENV_SERVER, &mut credentials.server),
        (ENV_EMAIL, &mut credentials.email),
        (ENV_SITENAME, &mut credentials.site),
    ];
    for (key, field) in fields {
        if let Ok(value) = env::var(key) {
            if !value.is_empty() {
                info!(env = key, "Credential value taken from environment");
                *field = value;
            }
        }
    }
}

/// Loads settings and credentials for one CLI invocation.
///
/// `config_path` is optional; without it every setting takes its default.
/// A credential file named explicitly (flag or YAML) must exist; the default
/// `credential.json` may be absent when the environment supplies the values.
pub fn load_config(config_path: Option<&Path>, credentials_path: Option<&Path>) -> Result<PlumberConfig> {
    let raw = match config_path {
        Some(path) => read_raw_config(path)?,
        None => {
            info!("No config file given, using default settings");
            RawConfig::default()
        }
    };

    // YAML paths are relative to the file that names them.
    let yaml_credentials = raw.credentials_path.as_ref().map(|p| {
        match config_path.and_then(Path::parent) {
            Some(dir) if p.is_relative() => dir.join(p),
            _ => p.clone(),
        }
    });
    let (path, explicit) = match (credentials_path, yaml_credentials) {
        (Some(path), _) => (path.to_path_buf(), true),
        (None, Some(path)) => (path, true),
        (None, None) => (PathBuf::from(DEFAULT_CREDENTIAL_PATH), false),
    };

    let mut credentials = if path.exists() || explicit {
        Credentials::from_file(&path)
            .with_context(|| format!("Failed to load credentials from {}", path.display()))?
    } else {
        warn!(path = %path.display(), "No credential file found, relying on environment");
        Credentials::default()
    };
    apply_env_overrides(&mut credentials);

    let defaults = ClientSettings::default();
    let session = SessionSettings {
        pacing: raw.pacing.into_pacing(),
        page_size: raw
            .server
            .page_size
            .unwrap_or(SessionSettings::default().page_size)
            .max(1),
    };
    let config = PlumberConfig {
        credentials,
        client: ClientSettings {
            api_version: raw.server.api_version,
            chunk_threshold_bytes: raw
                .server
                .chunk_threshold_bytes
                .unwrap_or(defaults.chunk_threshold_bytes),
        },
        session,
        hyper: raw.hyper.into_settings(),
    };
    config.trace_loaded();
    Ok(config)
}

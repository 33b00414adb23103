//! Extract engine backed by a Hyper database server.
//!
//! Hyper speaks the PostgreSQL wire protocol, so [`HyperEngine`] drives it
//! with `tokio-postgres`. Each script recreates its database file from scratch
//! (`DROP DATABASE IF EXISTS` + `CREATE DATABASE`) and then runs the commands
//! over the simple query protocol, which reports affected row counts for
//! `COPY`.
//!
//! With `hyperd_path` set, the engine starts its own `hyperd` for the duration
//! of one script and stops it afterwards; otherwise it expects a server to be
//! listening on `host:port` already.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};
use tracing::{debug, error, info};

use tableau_plumber_core::contract::ExtractEngine;
use tableau_plumber_core::extract::escape_name;
use tableau_plumber_core::PlumberError;

pub const DEFAULT_HYPER_PORT: u16 = 7483;
pub const DEFAULT_HYPER_USER: &str = "tableau_internal_user";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HyperSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// When set, this binary is launched for every script.
    pub hyperd_path: Option<PathBuf>,
    pub startup_timeout: Duration,
}

impl Default for HyperSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_HYPER_PORT,
            user: DEFAULT_HYPER_USER.to_string(),
            hyperd_path: None,
            startup_timeout: Duration::from_secs(10),
        }
    }
}

impl HyperSettings {
    /// Connection settings for `database`, or for no database at all.
    pub fn connection_config(&self, database: Option<&str>) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .user(&self.user)
            .application_name("tableau-plumber");
        if let Some(database) = database {
            config.dbname(database);
        }
        config
    }

    /// Command line for a private `hyperd` logging into `log_dir`.
    pub fn hyperd_args(&self, log_dir: &Path) -> Vec<String> {
        vec![
            "run".to_string(),
            "--skip-license".to_string(),
            "--no-password".to_string(),
            format!("--init-user={}", self.user),
            format!("--listen-connection=tab.tcp://{}:{}", self.host, self.port),
            format!("--log-dir={}", log_dir.display()),
        ]
    }
}

/// A launched `hyperd`; killed when dropped.
struct HyperProcess {
    child: Child,
    _log_dir: TempDir,
}

pub struct HyperEngine {
    settings: HyperSettings,
}

fn engine_error(e: tokio_postgres::Error) -> PlumberError {
    PlumberError::Extract(e.to_string())
}

impl HyperEngine {
    pub fn new(settings: HyperSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &HyperSettings {
        &self.settings
    }

    async fn connect(&self, database: Option<&str>) -> Result<Client, PlumberError> {
        let (client, connection) = self
            .settings
            .connection_config(database)
            .connect(NoTls)
            .await
            .map_err(engine_error)?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "Hyper connection error");
            }
        });
        Ok(client)
    }

    async fn launch(&self) -> Result<Option<HyperProcess>, PlumberError> {
        let Some(hyperd) = &self.settings.hyperd_path else {
            return Ok(None);
        };

        let log_dir = tempfile::Builder::new().prefix("hyperd-log").tempdir()?;
        let child = Command::new(hyperd)
            .args(self.settings.hyperd_args(log_dir.path()))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                error!(error = ?e, hyperd = %hyperd.display(), "Failed to start hyperd");
                e
            })?;
        let mut process = HyperProcess {
            child,
            _log_dir: log_dir,
        };
        info!(hyperd = %hyperd.display(), port = self.settings.port, "Started hyperd");

        let deadline = Instant::now() + self.settings.startup_timeout;
        loop {
            match self.connect(None).await {
                Ok(_) => break,
                Err(e) if Instant::now() >= deadline => {
                    return Err(PlumberError::Extract(format!(
                        "hyperd did not accept connections within {:?}: {e}",
                        self.settings.startup_timeout
                    )));
                }
                Err(_) => {}
            }
            if let Some(status) = process.child.try_wait()? {
                return Err(PlumberError::Extract(format!(
                    "hyperd exited during startup with {status}"
                )));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        debug!("hyperd is accepting connections");
        Ok(Some(process))
    }
}

#[async_trait]
impl ExtractEngine for HyperEngine {
    async fn execute_script(
        &self,
        database: &Path,
        commands: &[String],
    ) -> Result<Vec<u64>, PlumberError> {
        let _server = self.launch().await?;
        let database = database.to_string_lossy().into_owned();

        let admin = self.connect(None).await?;
        admin
            .batch_execute(&format!("DROP DATABASE IF EXISTS {}", escape_name(&database)))
            .await
            .map_err(engine_error)?;
        admin
            .batch_execute(&format!("CREATE DATABASE {}", escape_name(&database)))
            .await
            .map_err(engine_error)?;
        drop(admin);
        info!(database = %database, "Created extract database");

        let client = self.connect(Some(&database)).await?;
        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            debug!(command = %command, "Executing");
            let messages = client.simple_query(command).await.map_err(engine_error)?;
            let affected = messages
                .iter()
                .rev()
                .find_map(|m| match m {
                    SimpleQueryMessage::CommandComplete(rows) => Some(*rows),
                    _ => None,
                })
                .unwrap_or(0);
            results.push(affected);
        }
        Ok(results)
    }
}

//! # contract: the two seams between orchestration and the outside world
//!
//! Everything this crate does to a server goes through [`ServerClient`], and
//! everything it does to a local extract file goes through [`ExtractEngine`].
//! Orchestration modules (`session`, `query`, `search`, `download`, `extract`,
//! `publish`) are generic over these traits and never see HTTP or SQL sessions.
//!
//! ## Implementations
//! - The `tableau-plumber` crate ships a REST client and a Hyper engine.
//! - Both traits are annotated for `mockall`; `MockServerClient` and
//!   `MockExtractEngine` are exported under the default `test-export-mocks`
//!   feature so integration tests in dependent crates can script them.
//!
//! ## Contract notes
//! - `sign_in` / `sign_out` bracket every operation; implementors keep the auth
//!   token internally between the two calls.
//! - `list_*` calls return a single page; callers walk pages with
//!   [`RequestOptions::page`].
//! - `execute_script` always starts from a fresh database file (replace semantics).

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::config::Credentials;
use crate::error::PlumberError;
use crate::items::{
    DatasourceItem, JobItem, Page, ProjectItem, RequestOptions, ViewItem, WorkbookItem,
};

/// Rendering requested for a view download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    Image,
    Pdf,
    Csv,
}

impl MediaFormat {
    /// File extension written for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            MediaFormat::Image => "png",
            MediaFormat::Pdf => "pdf",
            MediaFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            MediaFormat::Image => "image",
            MediaFormat::Pdf => "pdf",
            MediaFormat::Csv => "csv",
        };
        f.write_str(tag)
    }
}

impl FromStr for MediaFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "image" => Ok(MediaFormat::Image),
            "pdf" => Ok(MediaFormat::Pdf),
            "csv" => Ok(MediaFormat::Csv),
            other => Err(format!("unsupported format '{other}'")),
        }
    }
}

/// How a publish call treats an existing data source of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    CreateNew,
    Overwrite,
    Append,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriteMode::CreateNew => "CreateNew",
            WriteMode::Overwrite => "Overwrite",
            WriteMode::Append => "Append",
        };
        f.write_str(name)
    }
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "createnew" | "create_new" | "create" => Ok(WriteMode::CreateNew),
            "overwrite" => Ok(WriteMode::Overwrite),
            "append" => Ok(WriteMode::Append),
            other => Err(format!("unknown write mode '{other}'")),
        }
    }
}

/// Metadata for a data source about to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDatasource {
    pub project_id: String,
    pub name: String,
}

/// Remote calls against a Tableau server.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ServerClient: Send + Sync {
    /// Authenticate and keep the session token for the following calls.
    async fn sign_in(&self, credentials: &Credentials) -> Result<(), PlumberError>;

    /// Invalidate the current session token.
    async fn sign_out(&self) -> Result<(), PlumberError>;

    async fn list_projects(
        &self,
        options: &RequestOptions,
    ) -> Result<Page<ProjectItem>, PlumberError>;

    async fn list_workbooks(
        &self,
        options: &RequestOptions,
    ) -> Result<Page<WorkbookItem>, PlumberError>;

    async fn list_views(&self, options: &RequestOptions) -> Result<Page<ViewItem>, PlumberError>;

    async fn list_datasources(
        &self,
        options: &RequestOptions,
    ) -> Result<Page<DatasourceItem>, PlumberError>;

    async fn list_jobs(&self, options: &RequestOptions) -> Result<Page<JobItem>, PlumberError>;

    async fn get_workbook(&self, workbook_id: &str) -> Result<WorkbookItem, PlumberError>;

    /// Views contained in a workbook (the listing endpoints do not include them).
    async fn workbook_views(&self, workbook_id: &str) -> Result<Vec<ViewItem>, PlumberError>;

    /// Rendered bytes of a view in the requested format.
    async fn view_media(&self, view_id: &str, format: MediaFormat)
        -> Result<Vec<u8>, PlumberError>;

    async fn refresh_datasource(&self, datasource_id: &str) -> Result<JobItem, PlumberError>;

    async fn refresh_workbook(&self, workbook_id: &str) -> Result<JobItem, PlumberError>;

    async fn delete_datasource(&self, datasource_id: &str) -> Result<(), PlumberError>;

    /// Upload an extract file as a data source.
    async fn publish_datasource(
        &self,
        datasource: &NewDatasource,
        file: &Path,
        mode: WriteMode,
    ) -> Result<DatasourceItem, PlumberError>;

    async fn get_job(&self, job_id: &str) -> Result<JobItem, PlumberError>;
}

/// Local analytic-file engine.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ExtractEngine: Send + Sync {
    /// Create `database` (replacing any existing file), run `commands` against it
    /// in order, and return the affected-row count of each command.
    async fn execute_script(
        &self,
        database: &Path,
        commands: &[String],
    ) -> Result<Vec<u64>, PlumberError>;
}

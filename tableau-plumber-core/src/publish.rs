//! Data source publishing and job-producing operations.
//!
//! Each operation resolves its target by name first (see [`crate::search`])
//! and then issues exactly one remote call inside its own scoped session.
//! Targets that cannot be found are logged and reported as `Ok(None)`.

use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::pause;
use crate::contract::{NewDatasource, ServerClient, WriteMode};
use crate::error::PlumberError;
use crate::items::{DatasourceItem, ItemType, JobItem, RemoteItem};
use crate::search::find_typed;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub project_name: String,
    pub extract_path: PathBuf,
    /// Name for the published source; `None` uses the extract file stem.
    pub data_source_name: Option<String>,
    pub write_mode: WriteMode,
}

impl PublishRequest {
    pub fn new(project_name: impl Into<String>, extract_path: impl Into<PathBuf>) -> Self {
        Self {
            project_name: project_name.into(),
            extract_path: extract_path.into(),
            data_source_name: None,
            write_mode: WriteMode::CreateNew,
        }
    }
}

/// Picks the write mode actually sent for a named publish.
///
/// An existing source turns `CreateNew` into `Overwrite`; a missing source
/// always means `CreateNew`.
pub fn effective_write_mode(requested: WriteMode, source_exists: bool) -> WriteMode {
    match (source_exists, requested) {
        (true, WriteMode::CreateNew) => WriteMode::Overwrite,
        (true, mode) => mode,
        (false, _) => WriteMode::CreateNew,
    }
}

fn file_stem(path: &Path) -> Result<String, PlumberError> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            PlumberError::InvalidArgument(format!("{} has no file name", path.display()))
        })
}

/// Publishes an extract file as a data source in the named project.
pub async fn publish_datasource<C: ServerClient>(
    session: &Session<C>,
    request: &PublishRequest,
) -> Result<DatasourceItem, PlumberError> {
    if request.project_name.trim().is_empty() {
        error!("No project specified");
        return Err(PlumberError::InvalidArgument(
            "no project specified".to_string(),
        ));
    }

    let project_id = match find_typed(session, ItemType::Project, &request.project_name, None)
        .await?
    {
        Some(RemoteItem::Project(p)) => p.id,
        _ => {
            error!(project = %request.project_name, "No project found");
            return Err(PlumberError::not_found(
                ItemType::Project,
                request.project_name.clone(),
            ));
        }
    };

    let (name, mode) = match &request.data_source_name {
        Some(name) => {
            let exists = find_typed(session, ItemType::Datasource, name, None)
                .await?
                .is_some();
            let mode = effective_write_mode(request.write_mode, exists);
            info!(data_source = %name, exists, mode = %mode, "New datasource item created");
            (name.clone(), mode)
        }
        None => (file_stem(&request.extract_path)?, request.write_mode),
    };

    let datasource = NewDatasource { project_id, name };
    let client = session.client();
    let result = session
        .scoped(client.publish_datasource(&datasource, &request.extract_path, mode))
        .await;

    match &result {
        Ok(published) => info!(
            data_source = %published.name,
            id = %published.id,
            mode = %mode,
            "Data Source has been successfully published"
        ),
        Err(e) => error!(error = %e, "Data Source publishing failed"),
    }
    result
}

/// Starts an extract refresh of the named data source.
pub async fn refresh_datasource<C: ServerClient>(
    session: &Session<C>,
    source_name: &str,
) -> Result<Option<JobItem>, PlumberError> {
    let Some(RemoteItem::Datasource(source)) =
        find_typed(session, ItemType::Datasource, source_name, None).await?
    else {
        warn!(source = %source_name, "No datasources found. Please enter a valid source name");
        return Ok(None);
    };

    let client = session.client();
    let job = session
        .scoped(client.refresh_datasource(&source.id))
        .await
        .map_err(|e| {
            error!(error = %e, source = %source_name, "Source refresh failed");
            e
        })?;
    pause(session.pacing().after_job).await;
    log_job(&job);
    Ok(Some(job))
}

/// Starts a refresh of the named workbook's extracts.
pub async fn refresh_workbook<C: ServerClient>(
    session: &Session<C>,
    workbook_name: &str,
) -> Result<Option<JobItem>, PlumberError> {
    let Some(RemoteItem::Workbook(workbook)) =
        find_typed(session, ItemType::Workbook, workbook_name, None).await?
    else {
        warn!(workbook = %workbook_name, "No workbooks found. Please enter a valid workbook name");
        return Ok(None);
    };

    let client = session.client();
    let job = session
        .scoped(client.refresh_workbook(&workbook.id))
        .await
        .map_err(|e| {
            error!(error = %e, workbook = %workbook_name, "Workbook refresh failed");
            e
        })?;
    pause(session.pacing().after_job).await;
    info!(workbook = %workbook_name.to_uppercase(), job_id = %job.id, "Workbook has been refreshed");
    Ok(Some(job))
}

/// Deletes the named data source and returns what was deleted.
pub async fn delete_datasource<C: ServerClient>(
    session: &Session<C>,
    source_name: &str,
) -> Result<Option<DatasourceItem>, PlumberError> {
    let Some(RemoteItem::Datasource(source)) =
        find_typed(session, ItemType::Datasource, source_name, None).await?
    else {
        warn!(source = %source_name, "No datasources found. Please enter a valid source name");
        return Ok(None);
    };
    info!(source = %source.name, id = %source.id, "Deleting data source");

    let client = session.client();
    session
        .scoped(client.delete_datasource(&source.id))
        .await
        .map_err(|e| {
            error!(error = %e, source = %source_name, "Source deletion failed");
            e
        })?;
    pause(session.pacing().after_job).await;
    info!(source = %source.name, "Data source has been deleted successfully");
    Ok(Some(source))
}

/// Current state of a job, e.g. one returned by a refresh.
pub async fn job_status<C: ServerClient>(
    session: &Session<C>,
    job_id: &str,
) -> Result<JobItem, PlumberError> {
    if job_id.trim().is_empty() {
        return Err(PlumberError::InvalidArgument("empty job id".to_string()));
    }
    let client = session.client();
    let job = session.scoped(client.get_job(job_id)).await?;
    log_job(&job);
    Ok(job)
}

fn log_job(job: &JobItem) {
    info!(
        job_id = %job.id,
        created_at = ?job.created_at,
        completed_at = ?job.completed_at,
        finish_code = ?job.finish_code,
        "Job state"
    );
}

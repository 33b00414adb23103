//! # download: rendered views of a workbook onto the local filesystem
//!
//! Resolves a workbook by name, walks its views and writes each requested
//! rendering to `<directory>/<workbook>/<view>.<ext>`, with both path segments
//! passed through [`sanitize_name`].
//!
//! ## Walk rules
//! - No view requested: every view is downloaded in server order, pausing
//!   between views. A failed view is logged and recorded; the walk continues.
//! - View requested: views are walked in order while their names match the
//!   request. The first non-matching view, or the first failure, ends the walk.
//!
//! ## No-op outcomes
//! An unsupported format is detected before any remote call and nothing is
//! written. Missing workbooks and views are logged and reported through
//! [`DownloadOutcome`] rather than as errors.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::pause;
use crate::contract::{MediaFormat, ServerClient};
use crate::error::PlumberError;
use crate::items::{ItemType, RemoteItem, ViewItem};
use crate::search::find_typed;
use crate::session::Session;

/// Characters replaced by `_` when a server name becomes a path segment.
pub const DISALLOWED_CHARS: &str = "!@#$%^&*(){};:',./\\`~?+-| ";

/// Replaces every disallowed character with an underscore.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if DISALLOWED_CHARS.contains(c) { '_' } else { c })
        .collect()
}

/// Builds `<base>/<sanitized workbook>/<filename>`, creating directories as needed.
///
/// An absent or empty `base` means the current working directory.
pub fn resolve_directory(
    workbook_name: &str,
    base: Option<&Path>,
    filename: &str,
) -> io::Result<PathBuf> {
    let base = match base {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::env::current_dir()?,
    };

    if base.exists() {
        info!(path = %base.display(), "Directory exists. Generating fullpath...");
    } else {
        info!(path = %base.display(), "Directory doesn't exist. Creating it...");
        fs::create_dir_all(&base)?;
    }

    let workbook_dir = base.join(sanitize_name(workbook_name));
    if !workbook_dir.exists() {
        fs::create_dir_all(&workbook_dir)?;
    }

    let fullpath = workbook_dir.join(filename);
    info!(path = %fullpath.display(), "Resolved download path");
    Ok(fullpath)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub workbook_name: String,
    /// `None` downloads every view of the workbook.
    pub view_name: Option<String>,
    /// `None` downloads into the current working directory.
    pub directory: Option<PathBuf>,
    /// `image`, `pdf` or `csv`, case-insensitive.
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDownload {
    pub view_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<FailedDownload>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The format tag was not recognised; nothing was requested or written.
    UnsupportedFormat(String),
    WorkbookNotFound,
    ViewNotFound,
    Completed(DownloadReport),
}

/// Downloads one or all views of a workbook.
pub async fn download_views<C: ServerClient>(
    session: &Session<C>,
    request: &DownloadRequest,
) -> Result<DownloadOutcome, PlumberError> {
    let format: MediaFormat = match request.format.parse() {
        Ok(f) => f,
        Err(_) => {
            warn!(format = %request.format, "File Format Not Supported");
            return Ok(DownloadOutcome::UnsupportedFormat(request.format.clone()));
        }
    };

    pause(session.pacing().between_downloads).await;

    let workbook_id = match find_typed(session, ItemType::Workbook, &request.workbook_name, None)
        .await?
    {
        Some(RemoteItem::Workbook(w)) => w.id,
        _ => {
            warn!(workbook = %request.workbook_name, "No workbook found. Exiting...");
            return Ok(DownloadOutcome::WorkbookNotFound);
        }
    };
    info!(workbook_id = %workbook_id, "Workbook ID for the workbook");

    let client = session.client();
    let directory = request.directory.as_deref();
    session
        .scoped(async {
            let workbook = client.get_workbook(&workbook_id).await?;
            let views = client.workbook_views(&workbook.id).await?;
            let mut report = DownloadReport::default();

            match &request.view_name {
                Some(wanted) => {
                    for view in &views {
                        if &view.name != wanted {
                            warn!(view = %wanted, "No view found. Exiting...");
                            break;
                        }
                        match fetch_view(client, view, format, &request.workbook_name, directory)
                            .await
                        {
                            Ok(path) => report.written.push(path),
                            Err(e) => {
                                error!(error = %e, view = %view.name, "Download failed");
                                report.failed.push(FailedDownload {
                                    view_name: view.name.clone(),
                                    error: e.to_string(),
                                });
                                break;
                            }
                        }
                    }
                    if report.written.is_empty() && report.failed.is_empty() {
                        return Ok(DownloadOutcome::ViewNotFound);
                    }
                }
                None => {
                    for view in &views {
                        pause(session.pacing().between_downloads).await;
                        info!(view = %view.name, format = %format, "Downloading view");
                        match fetch_view(client, view, format, &request.workbook_name, directory)
                            .await
                        {
                            Ok(path) => report.written.push(path),
                            Err(e) => {
                                error!(error = %e, view = %view.name, "Download failed");
                                report.failed.push(FailedDownload {
                                    view_name: view.name.clone(),
                                    error: e.to_string(),
                                });
                            }
                        }
                    }
                }
            }

            info!(
                written = report.written.len(),
                failed = report.failed.len(),
                "Download finished"
            );
            Ok(DownloadOutcome::Completed(report))
        })
        .await
}

async fn fetch_view<C: ServerClient>(
    client: &C,
    view: &ViewItem,
    format: MediaFormat,
    workbook_name: &str,
    directory: Option<&Path>,
) -> Result<PathBuf, PlumberError> {
    info!(
        view = %view.name.to_uppercase(),
        workbook = %workbook_name.to_uppercase(),
        "Requesting media for the view"
    );
    let bytes = client.view_media(&view.id, format).await?;

    let filename = format!("{}.{}", sanitize_name(&view.name), format.extension());
    let fullpath = resolve_directory(workbook_name, directory, &filename)?;
    info!(format = %format, "Writing media...");
    fs::write(&fullpath, &bytes)?;
    info!(format = %format, path = %fullpath.display(), bytes = bytes.len(), "Download completed");
    Ok(fullpath)
}

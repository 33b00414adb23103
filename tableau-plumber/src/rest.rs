#![doc = "REST transport: implements the core `ServerClient` contract against a live Tableau server."]
//
//! # REST client (CLI <-> Core)
//!
//! This module bridges the orchestration code in [`tableau_plumber_core`] to the
//! Tableau Server REST API. [`TableauRestClient`] speaks JSON (`Accept:
//! application/json`) and keeps the auth token of the current sign-in.
//!
//! ## Client Usage
//!
//! - Build the client with [`TableauRestClient::connect`]. Without a pinned
//!   `api_version` the server is asked which REST version it speaks.
//! - Hand the client to `Session::login`; every call after that runs between a
//!   sign-in and a sign-out, as the core session enforces.
//! - Data sources up to `chunk_threshold_bytes` are published in one
//!   `multipart/mixed` request; larger files go through a chunked file upload
//!   session first.
//!
//! Server error bodies (`{"error": {"summary", "detail", "code"}}`) surface as
//! [`PlumberError::Server`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tokio::io::AsyncReadExt;
use tracing::{debug, error, info, warn};

use tableau_plumber_core::config::Credentials;
use tableau_plumber_core::contract::{MediaFormat, NewDatasource, ServerClient, WriteMode};
use tableau_plumber_core::items::{
    DatasourceItem, JobItem, Page, Pagination, ProjectItem, RequestOptions, ViewItem,
    WorkbookItem,
};
use tableau_plumber_core::PlumberError;

pub const AUTH_HEADER: &str = "X-Tableau-Auth";
/// Oldest REST version that serves `serverinfo`; used only for the version probe.
pub const PROBE_API_VERSION: &str = "2.4";
/// Used when the probe fails and no version is pinned.
pub const DEFAULT_API_VERSION: &str = "3.4";
pub const DEFAULT_CHUNK_THRESHOLD: u64 = 64 * 1024 * 1024;
pub const UPLOAD_CHUNK_SIZE: usize = 5 * 1024 * 1024;

const JSON: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Pinned REST API version; `None` asks the server.
    pub api_version: Option<String>,
    /// Files larger than this are uploaded in chunks.
    pub chunk_threshold_bytes: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_version: None,
            chunk_threshold_bytes: DEFAULT_CHUNK_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone)]
struct AuthState {
    token: String,
    site_id: String,
    user_id: Option<String>,
}

pub struct TableauRestClient {
    http: reqwest::Client,
    server: String,
    api_version: String,
    chunk_threshold_bytes: u64,
    auth: Mutex<Option<AuthState>>,
}

fn network(e: reqwest::Error) -> PlumberError {
    PlumberError::Network(e.to_string())
}

fn server_error(status: StatusCode, body: &str) -> PlumberError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope { error }) => {
            let mut message = error.summary.unwrap_or_else(|| status.to_string());
            if let Some(detail) = error.detail {
                message = format!("{message}: {detail}");
            }
            if let Some(code) = error.code {
                message = format!("{message} ({code})");
            }
            message
        }
        Err(_) if body.trim().is_empty() => status.to_string(),
        Err(_) => body.trim().to_string(),
    };
    PlumberError::Server {
        status: status.as_u16(),
        message,
    }
}

async fn send(request: RequestBuilder) -> Result<Response, PlumberError> {
    let response = request.send().await.map_err(network)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let err = server_error(status, &body);
    error!(status = status.as_u16(), error = %err, "Server rejected request");
    Err(err)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, PlumberError> {
    let bytes = response.bytes().await.map_err(network)?;
    serde_json::from_slice(&bytes).map_err(|e| {
        error!(error = ?e, "Response body did not match the expected shape");
        PlumberError::Decode(e.to_string())
    })
}

async fn probe_api_version(http: &reqwest::Client, server: &str) -> Result<String, PlumberError> {
    let url = format!("{server}/api/{PROBE_API_VERSION}/serverinfo");
    let envelope: ServerInfoEnvelope = decode(send(http.get(url).header(ACCEPT, JSON)).await?).await?;
    Ok(envelope.server_info.rest_api_version)
}

impl TableauRestClient {
    /// Builds a client for `server` and settles the REST API version.
    pub async fn connect(server: &str, settings: &ClientSettings) -> Result<Self, PlumberError> {
        let server = server.trim().trim_end_matches('/').to_string();
        if server.is_empty() {
            return Err(PlumberError::InvalidArgument(
                "server url is empty".to_string(),
            ));
        }
        let http = reqwest::Client::builder().build().map_err(network)?;

        let api_version = match &settings.api_version {
            Some(version) => version.clone(),
            None => match probe_api_version(&http, &server).await {
                Ok(version) => {
                    info!(server = %server, api_version = %version, "Server REST version detected");
                    version
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        fallback = DEFAULT_API_VERSION,
                        "Could not detect server REST version"
                    );
                    DEFAULT_API_VERSION.to_string()
                }
            },
        };

        info!(server = %server, api_version = %api_version, "Initialized TableauRestClient");
        Ok(Self {
            http,
            server,
            api_version,
            chunk_threshold_bytes: settings.chunk_threshold_bytes,
            auth: Mutex::new(None),
        })
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn is_signed_in(&self) -> bool {
        self.auth_state().is_some()
    }

    fn auth_state(&self) -> Option<AuthState> {
        self.auth
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_auth(&self, state: Option<AuthState>) {
        *self.auth.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}/{}", self.server, self.api_version, path)
    }

    /// Authenticated request against `sites/{site}/{path}`.
    fn site_request(&self, method: Method, path: &str) -> Result<RequestBuilder, PlumberError> {
        let auth = self.auth_state().ok_or(PlumberError::NotSignedIn)?;
        let url = self.endpoint(&format!("sites/{}/{}", auth.site_id, path));
        Ok(self.http.request(method, url).header(AUTH_HEADER, auth.token))
    }

    fn json_request(&self, method: Method, path: &str) -> Result<RequestBuilder, PlumberError> {
        Ok(self.site_request(method, path)?.header(ACCEPT, JSON))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PlumberError> {
        decode(send(self.json_request(Method::GET, path)?.query(query)).await?).await
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, PlumberError> {
        let request = self
            .json_request(Method::POST, path)?
            .header(CONTENT_TYPE, JSON)
            .body("{}");
        decode(send(request).await?).await
    }

    /// Uploads `path` through a file upload session and returns the session id.
    async fn upload_in_chunks(&self, path: &Path) -> Result<String, PlumberError> {
        let initiated: FileUploadEnvelope = self.post_json("fileUploads").await?;
        let upload_id = initiated.file_upload.upload_session_id;
        info!(upload_id = %upload_id, path = %path.display(), "Initiated chunked upload");

        let mut file = tokio::fs::File::open(path).await?;
        let mut buffer = vec![0u8; UPLOAD_CHUNK_SIZE];
        let mut chunks = 0usize;
        loop {
            let read = file.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            let (content_type, body) = MultipartMixed::new()
                .json_part("request_payload", &json!({}))
                .file_part("tableau_file", "file", &buffer[..read])
                .finish();
            let request = self
                .json_request(Method::PUT, &format!("fileUploads/{upload_id}"))?
                .header(CONTENT_TYPE, content_type)
                .body(body);
            send(request).await?;
            chunks += 1;
            debug!(upload_id = %upload_id, chunk = chunks, bytes = read, "Uploaded chunk");
        }
        info!(upload_id = %upload_id, chunks, "Chunked upload finished");
        Ok(upload_id)
    }
}

/// Query parameters shared by every listing call.
pub fn page_query(options: &RequestOptions) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("pageSize", options.page_size.to_string()),
        ("pageNumber", options.page_number.to_string()),
    ];
    if let Some(filter) = options.filter_expression() {
        query.push(("filter", filter));
    }
    query
}

pub fn write_mode_query(mode: WriteMode) -> Vec<(&'static str, String)> {
    match mode {
        WriteMode::CreateNew => vec![("overwrite", "false".to_string())],
        WriteMode::Overwrite => vec![("overwrite", "true".to_string())],
        WriteMode::Append => vec![("append", "true".to_string())],
    }
}

fn media_path(view_id: &str, format: MediaFormat) -> String {
    let suffix = match format {
        MediaFormat::Image => "image",
        MediaFormat::Pdf => "pdf",
        MediaFormat::Csv => "data",
    };
    format!("views/{view_id}/{suffix}")
}

/// Hand-built `multipart/mixed` body, the only multipart flavour publish accepts.
pub struct MultipartMixed {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartMixed {
    pub fn new() -> Self {
        Self {
            boundary: uuid::Uuid::new_v4().simple().to_string(),
            body: Vec::new(),
        }
    }

    fn part_header(&mut self, disposition: &str, content_type: &str) {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: {disposition}\r\nContent-Type: {content_type}\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
    }

    pub fn json_part(mut self, name: &str, value: &serde_json::Value) -> Self {
        self.part_header(&format!("name=\"{name}\""), JSON);
        self.body.extend_from_slice(value.to_string().as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn file_part(mut self, name: &str, filename: &str, bytes: &[u8]) -> Self {
        self.part_header(
            &format!("name=\"{name}\"; filename=\"{filename}\""),
            "application/octet-stream",
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Content-Type header value and the finished body.
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/mixed; boundary={}", self.boundary),
            self.body,
        )
    }
}

impl Default for MultipartMixed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServerClient for TableauRestClient {
    async fn sign_in(&self, credentials: &Credentials) -> Result<(), PlumberError> {
        let body = json!({
            "credentials": {
                "name": credentials.username,
                "password": credentials.password,
                "site": { "contentUrl": credentials.site },
            }
        });
        let request = self
            .http
            .post(self.endpoint("auth/signin"))
            .header(ACCEPT, JSON)
            .json(&body);
        let envelope: SignInEnvelope = decode(send(request).await?).await?;
        let signed_in = envelope.credentials;

        let state = AuthState {
            token: signed_in.token,
            site_id: signed_in.site.id,
            user_id: signed_in.user.map(|u| u.id),
        };
        debug!(site_id = %state.site_id, user_id = ?state.user_id, "Signed in");
        self.set_auth(Some(state));
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), PlumberError> {
        let Some(auth) = self.auth_state() else {
            return Ok(());
        };
        // The local token is dropped even when the server call fails.
        self.set_auth(None);
        let request = self
            .http
            .post(self.endpoint("auth/signout"))
            .header(AUTH_HEADER, auth.token);
        send(request).await?;
        debug!(site_id = %auth.site_id, "Signed out");
        Ok(())
    }

    async fn list_projects(
        &self,
        options: &RequestOptions,
    ) -> Result<Page<ProjectItem>, PlumberError> {
        let list: ProjectList = self.get_json("projects", &page_query(options)).await?;
        into_page(list.pagination, list.projects.project)
    }

    async fn list_workbooks(
        &self,
        options: &RequestOptions,
    ) -> Result<Page<WorkbookItem>, PlumberError> {
        let list: WorkbookList = self.get_json("workbooks", &page_query(options)).await?;
        into_page(list.pagination, list.workbooks.workbook)
    }

    async fn list_views(&self, options: &RequestOptions) -> Result<Page<ViewItem>, PlumberError> {
        let list: ViewList = self.get_json("views", &page_query(options)).await?;
        into_page(list.pagination, list.views.view)
    }

    async fn list_datasources(
        &self,
        options: &RequestOptions,
    ) -> Result<Page<DatasourceItem>, PlumberError> {
        let list: DatasourceList = self.get_json("datasources", &page_query(options)).await?;
        into_page(list.pagination, list.datasources.datasource)
    }

    async fn list_jobs(&self, options: &RequestOptions) -> Result<Page<JobItem>, PlumberError> {
        let list: JobList = self.get_json("jobs", &page_query(options)).await?;
        into_page(list.pagination, list.background_jobs.background_job)
    }

    async fn get_workbook(&self, workbook_id: &str) -> Result<WorkbookItem, PlumberError> {
        let envelope: WorkbookEnvelope =
            self.get_json(&format!("workbooks/{workbook_id}"), &[]).await?;
        Ok(envelope.workbook.into())
    }

    async fn workbook_views(&self, workbook_id: &str) -> Result<Vec<ViewItem>, PlumberError> {
        let list: ViewList = self
            .get_json(&format!("workbooks/{workbook_id}/views"), &[])
            .await?;
        Ok(list
            .views
            .view
            .into_iter()
            .map(|v| {
                let mut view = ViewItem::from(v);
                view.workbook_id.get_or_insert_with(|| workbook_id.to_string());
                view
            })
            .collect())
    }

    async fn view_media(
        &self,
        view_id: &str,
        format: MediaFormat,
    ) -> Result<Vec<u8>, PlumberError> {
        let request = self.site_request(Method::GET, &media_path(view_id, format))?;
        let bytes = send(request).await?.bytes().await.map_err(network)?;
        Ok(bytes.to_vec())
    }

    async fn refresh_datasource(&self, datasource_id: &str) -> Result<JobItem, PlumberError> {
        let envelope: JobEnvelope = self
            .post_json(&format!("datasources/{datasource_id}/refresh"))
            .await?;
        Ok(envelope.job.into())
    }

    async fn refresh_workbook(&self, workbook_id: &str) -> Result<JobItem, PlumberError> {
        let envelope: JobEnvelope = self
            .post_json(&format!("workbooks/{workbook_id}/refresh"))
            .await?;
        Ok(envelope.job.into())
    }

    async fn delete_datasource(&self, datasource_id: &str) -> Result<(), PlumberError> {
        send(self.json_request(Method::DELETE, &format!("datasources/{datasource_id}"))?).await?;
        Ok(())
    }

    async fn publish_datasource(
        &self,
        datasource: &NewDatasource,
        file: &Path,
        mode: WriteMode,
    ) -> Result<DatasourceItem, PlumberError> {
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                PlumberError::InvalidArgument(format!("{} has no file name", file.display()))
            })?;
        let size = tokio::fs::metadata(file).await?.len();
        let payload = json!({
            "datasource": {
                "name": datasource.name,
                "project": { "id": datasource.project_id },
            }
        });

        let mut query = write_mode_query(mode);
        let multipart = if size > self.chunk_threshold_bytes {
            let upload_id = self.upload_in_chunks(file).await?;
            let datasource_type = file
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_else(|| "hyper".to_string());
            query.push(("uploadSessionId", upload_id));
            query.push(("datasourceType", datasource_type));
            MultipartMixed::new().json_part("request_payload", &payload)
        } else {
            let bytes = tokio::fs::read(file).await?;
            MultipartMixed::new()
                .json_part("request_payload", &payload)
                .file_part("tableau_datasource", &filename, &bytes)
        };
        info!(
            file = %filename,
            bytes = size,
            chunked = size > self.chunk_threshold_bytes,
            mode = %mode,
            "Publishing data source"
        );

        let (content_type, body) = multipart.finish();
        let request = self
            .json_request(Method::POST, "datasources")?
            .query(&query)
            .header(CONTENT_TYPE, content_type)
            .body(body);
        let envelope: DatasourceEnvelope = decode(send(request).await?).await?;
        Ok(envelope.datasource.into())
    }

    async fn get_job(&self, job_id: &str) -> Result<JobItem, PlumberError> {
        let envelope: JobEnvelope = self.get_json(&format!("jobs/{job_id}"), &[]).await?;
        Ok(envelope.job.into())
    }
}

// Wire models. Counts and codes arrive as strings on most server versions.

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Count {
    Number(i64),
    Text(String),
}

impl Count {
    fn value(&self) -> Result<i64, PlumberError> {
        match self {
            Count::Number(n) => Ok(*n),
            Count::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| PlumberError::Decode(format!("'{s}' is not a number"))),
        }
    }

    fn as_u32(&self) -> Result<u32, PlumberError> {
        let value = self.value()?;
        u32::try_from(value).map_err(|_| PlumberError::Decode(format!("{value} out of range")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaginationWire {
    page_number: Count,
    page_size: Count,
    total_available: Count,
}

impl TryFrom<PaginationWire> for Pagination {
    type Error = PlumberError;

    fn try_from(wire: PaginationWire) -> Result<Self, Self::Error> {
        Ok(Pagination {
            page_number: wire.page_number.as_u32()?,
            page_size: wire.page_size.as_u32()?,
            total_available: wire.total_available.as_u32()?,
        })
    }
}

fn into_page<W, T>(pagination: Option<PaginationWire>, items: Vec<W>) -> Result<Page<T>, PlumberError>
where
    W: Into<T>,
{
    let items: Vec<T> = items.into_iter().map(Into::into).collect();
    match pagination {
        Some(wire) => Ok(Page {
            items,
            pagination: wire.try_into()?,
        }),
        None => Ok(Page::single(items)),
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorWire,
}

#[derive(Debug, Deserialize)]
struct ErrorWire {
    summary: Option<String>,
    detail: Option<String>,
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfoEnvelope {
    server_info: ServerInfoWire,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfoWire {
    rest_api_version: String,
}

#[derive(Debug, Deserialize)]
struct SignInEnvelope {
    credentials: SignInWire,
}

#[derive(Debug, Deserialize)]
struct SignInWire {
    token: String,
    site: IdRef,
    user: Option<IdRef>,
}

#[derive(Debug, Clone, Deserialize)]
struct IdRef {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileUploadEnvelope {
    file_upload: FileUploadWire,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileUploadWire {
    upload_session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectWire {
    id: String,
    name: String,
    description: Option<String>,
    parent_project_id: Option<String>,
}

impl From<ProjectWire> for ProjectItem {
    fn from(w: ProjectWire) -> Self {
        ProjectItem {
            id: w.id,
            name: w.name,
            description: w.description.filter(|d| !d.is_empty()),
            parent_id: w.parent_project_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkbookWire {
    id: String,
    name: String,
    project: Option<IdRef>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<WorkbookWire> for WorkbookItem {
    fn from(w: WorkbookWire) -> Self {
        WorkbookItem {
            id: w.id,
            name: w.name,
            project_id: w.project.as_ref().map(|p| p.id.clone()),
            project_name: w.project.and_then(|p| p.name),
            created_at: w.created_at,
            updated_at: w.updated_at,
            views: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewWire {
    id: String,
    name: String,
    content_url: Option<String>,
    workbook: Option<IdRef>,
}

impl From<ViewWire> for ViewItem {
    fn from(w: ViewWire) -> Self {
        ViewItem {
            id: w.id,
            name: w.name,
            workbook_id: w.workbook.map(|wb| wb.id),
            content_url: w.content_url,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasourceWire {
    id: String,
    name: String,
    project: Option<IdRef>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<DatasourceWire> for DatasourceItem {
    fn from(w: DatasourceWire) -> Self {
        DatasourceItem {
            id: w.id,
            name: w.name,
            project_id: w.project.as_ref().map(|p| p.id.clone()),
            project_name: w.project.and_then(|p| p.name),
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

/// Both `job` (refresh, jobs/{id}) and `backgroundJob` (listing) shapes.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobWire {
    id: String,
    title: Option<String>,
    #[serde(rename = "type", alias = "jobType")]
    job_type: Option<String>,
    status: Option<String>,
    created_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    #[serde(alias = "endedAt")]
    completed_at: Option<DateTime<Utc>>,
    finish_code: Option<Count>,
}

impl From<JobWire> for JobItem {
    fn from(w: JobWire) -> Self {
        JobItem {
            id: w.id,
            name: w.title.or_else(|| w.job_type.clone()).unwrap_or_default(),
            job_type: w.job_type,
            status: w.status,
            created_at: w.created_at,
            started_at: w.started_at,
            completed_at: w.completed_at,
            finish_code: w
                .finish_code
                .and_then(|c| c.value().ok())
                .and_then(|c| i32::try_from(c).ok()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WorkbookEnvelope {
    workbook: WorkbookWire,
}

#[derive(Debug, Deserialize)]
struct DatasourceEnvelope {
    datasource: DatasourceWire,
}

#[derive(Debug, Deserialize)]
struct JobEnvelope {
    job: JobWire,
}

#[derive(Debug, Deserialize)]
struct ProjectList {
    pagination: Option<PaginationWire>,
    #[serde(default)]
    projects: Projects,
}

#[derive(Debug, Default, Deserialize)]
struct Projects {
    #[serde(default)]
    project: Vec<ProjectWire>,
}

#[derive(Debug, Deserialize)]
struct WorkbookList {
    pagination: Option<PaginationWire>,
    #[serde(default)]
    workbooks: Workbooks,
}

#[derive(Debug, Default, Deserialize)]
struct Workbooks {
    #[serde(default)]
    workbook: Vec<WorkbookWire>,
}

#[derive(Debug, Deserialize)]
struct ViewList {
    pagination: Option<PaginationWire>,
    #[serde(default)]
    views: Views,
}

#[derive(Debug, Default, Deserialize)]
struct Views {
    #[serde(default)]
    view: Vec<ViewWire>,
}

#[derive(Debug, Deserialize)]
struct DatasourceList {
    pagination: Option<PaginationWire>,
    #[serde(default)]
    datasources: Datasources,
}

#[derive(Debug, Default, Deserialize)]
struct Datasources {
    #[serde(default)]
    datasource: Vec<DatasourceWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobList {
    pagination: Option<PaginationWire>,
    #[serde(default)]
    background_jobs: BackgroundJobs,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackgroundJobs {
    #[serde(default)]
    background_job: Vec<JobWire>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tableau_plumber_core::items::Filter;

    #[test]
    fn listing_query_carries_paging_and_filter() {
        let options = RequestOptions::default()
            .with_page_size(50)
            .with_filter(Filter::owner_email("a@example.com"))
            .page(3);
        assert_eq!(
            page_query(&options),
            vec![
                ("pageSize", "50".to_string()),
                ("pageNumber", "3".to_string()),
                ("filter", "ownerEmail:eq:a@example.com".to_string()),
            ]
        );
        assert_eq!(page_query(&RequestOptions::default()).len(), 2);
    }

    #[test]
    fn string_pagination_is_parsed() {
        let list: ProjectList = serde_json::from_str(
            r#"{"pagination":{"pageNumber":"2","pageSize":"100","totalAvailable":"250"},
                "projects":{"project":[{"id":"p-1","name":"Finance","description":""}]}}"#,
        )
        .unwrap();
        let page: Page<ProjectItem> = into_page(list.pagination, list.projects.project).unwrap();
        assert_eq!(page.pagination.total_available, 250);
        assert!(page.pagination.has_more());
        assert_eq!(page.items[0].description, None);
    }

    #[test]
    fn empty_collections_decode() {
        let list: WorkbookList = serde_json::from_str(
            r#"{"pagination":{"pageNumber":"1","pageSize":"100","totalAvailable":"0"},"workbooks":{}}"#,
        )
        .unwrap();
        assert!(list.workbooks.workbook.is_empty());
    }

    #[test]
    fn job_shapes_map_to_items() {
        let refresh: JobEnvelope = serde_json::from_str(
            r#"{"job":{"id":"j-1","mode":"Asynchronous","type":"RefreshExtract","createdAt":"2024-03-01T10:00:00Z"}}"#,
        )
        .unwrap();
        let job = JobItem::from(refresh.job);
        assert_eq!(job.name, "RefreshExtract");
        assert!(job.created_at.is_some());

        let listed: JobList = serde_json::from_str(
            r#"{"backgroundJobs":{"backgroundJob":[{"id":"j-2","status":"Success","jobType":"refresh_extracts","title":"Orders","endedAt":"2024-03-01T10:05:00Z"}]}}"#,
        )
        .unwrap();
        let job = JobItem::from(listed.background_jobs.background_job.into_iter().next().unwrap());
        assert_eq!(job.name, "Orders");
        assert_eq!(job.job_type.as_deref(), Some("refresh_extracts"));
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn server_errors_use_summary_and_detail() {
        let err = server_error(
            StatusCode::NOT_FOUND,
            r#"{"error":{"summary":"Resource Not Found","detail":"Datasource 'x' could not be found.","code":"404011"}}"#,
        );
        match err {
            PlumberError::Server { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(
                    message,
                    "Resource Not Found: Datasource 'x' could not be found. (404011)"
                );
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn multipart_body_has_payload_and_file_parts() {
        let (content_type, body) = MultipartMixed::new()
            .json_part("request_payload", &json!({"datasource": {"name": "Orders"}}))
            .file_part("tableau_datasource", "orders.hyper", b"HYPER")
            .finish();
        let boundary = content_type
            .strip_prefix("multipart/mixed; boundary=")
            .unwrap()
            .to_string();
        let body = String::from_utf8(body).unwrap();

        assert!(body.starts_with(&format!("--{boundary}\r\n")));
        assert!(body.contains("name=\"request_payload\"\r\nContent-Type: application/json"));
        assert!(body.contains("filename=\"orders.hyper\"\r\nContent-Type: application/octet-stream\r\n\r\nHYPER\r\n"));
        assert!(body.ends_with(&format!("--{boundary}--\r\n")));
    }
}

#![allow(dead_code)]

use tableau_plumber_core::config::{Credentials, Pacing};
use tableau_plumber_core::contract::MockServerClient;
use tableau_plumber_core::items::{DatasourceItem, JobItem, ProjectItem, ViewItem, WorkbookItem};
use tableau_plumber_core::session::{Session, SessionSettings};

pub fn credentials() -> Credentials {
    Credentials::new(
        "analyst",
        "secret",
        "https://tableau.example.com",
        "analyst@example.com",
        "finance",
    )
}

pub fn settings() -> SessionSettings {
    SessionSettings {
        pacing: Pacing::none(),
        page_size: 100,
    }
}

/// Accepts any number of sign-in/sign-out brackets.
pub fn allow_auth(client: &mut MockServerClient) {
    client.expect_sign_in().returning(|_| Ok(()));
    client.expect_sign_out().returning(|| Ok(()));
}

pub async fn session(mut client: MockServerClient) -> Session<MockServerClient> {
    allow_auth(&mut client);
    Session::login(client, credentials(), settings())
        .await
        .expect("login against mock should succeed")
}

pub fn project(id: &str, name: &str) -> ProjectItem {
    ProjectItem {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        parent_id: None,
    }
}

pub fn workbook(id: &str, name: &str) -> WorkbookItem {
    WorkbookItem {
        id: id.to_string(),
        name: name.to_string(),
        project_id: Some("p-1".to_string()),
        project_name: Some("Finance".to_string()),
        created_at: None,
        updated_at: None,
        views: Vec::new(),
    }
}

pub fn view(id: &str, name: &str, workbook_id: &str) -> ViewItem {
    ViewItem {
        id: id.to_string(),
        name: name.to_string(),
        workbook_id: Some(workbook_id.to_string()),
        content_url: None,
    }
}

pub fn datasource(id: &str, name: &str) -> DatasourceItem {
    DatasourceItem {
        id: id.to_string(),
        name: name.to_string(),
        project_id: Some("p-1".to_string()),
        project_name: Some("Finance".to_string()),
        created_at: None,
        updated_at: None,
    }
}

pub fn job(id: &str) -> JobItem {
    JobItem {
        id: id.to_string(),
        name: "Refresh Extracts".to_string(),
        job_type: Some("RefreshExtract".to_string()),
        status: None,
        created_at: None,
        started_at: None,
        completed_at: None,
        finish_code: None,
    }
}

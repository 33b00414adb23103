mod common;

use common::*;
use std::fs;
use tableau_plumber_core::contract::{MediaFormat, MockServerClient};
use tableau_plumber_core::download::{download_views, DownloadOutcome, DownloadRequest};
use tableau_plumber_core::items::Page;
use tableau_plumber_core::session::Session;
use tableau_plumber_core::PlumberError;
use tempfile::tempdir;

fn request(dir: &std::path::Path, view: Option<&str>, format: &str) -> DownloadRequest {
    DownloadRequest {
        workbook_name: "Sales Q1".to_string(),
        view_name: view.map(str::to_string),
        directory: Some(dir.to_path_buf()),
        format: format.to_string(),
    }
}

/// Client serving one workbook with the given views; media bytes are the view id.
fn serving(views: &'static [(&'static str, &'static str)]) -> MockServerClient {
    let mut client = MockServerClient::new();
    client
        .expect_list_workbooks()
        .returning(|_| Ok(Page::single(vec![workbook("w-1", "Sales Q1")])));
    client
        .expect_get_workbook()
        .returning(|id| Ok(workbook(id, "Sales Q1")));
    client.expect_workbook_views().returning(move |wb| {
        Ok(views
            .iter()
            .map(|(id, name)| view(id, name, wb))
            .collect())
    });
    client
}

#[tokio::test]
async fn unsupported_format_does_nothing() {
    let dir = tempdir().unwrap();
    let mut client = MockServerClient::new();
    // Only the login bracket is allowed.
    client.expect_sign_in().times(1).returning(|_| Ok(()));
    client.expect_sign_out().times(1).returning(|| Ok(()));
    let session = Session::login(client, credentials(), settings()).await.unwrap();

    let outcome = download_views(&session, &request(dir.path(), None, "docx"))
        .await
        .unwrap();

    assert_eq!(outcome, DownloadOutcome::UnsupportedFormat("docx".to_string()));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn every_view_is_written_under_the_sanitised_workbook() {
    let dir = tempdir().unwrap();
    let mut client = serving(&[("v-1", "Overview"), ("v-2", "By Region")]);
    client
        .expect_view_media()
        .withf(|_, format| *format == MediaFormat::Pdf)
        .times(2)
        .returning(|id, _| Ok(id.as_bytes().to_vec()));
    let session = session(client).await;

    let outcome = download_views(&session, &request(dir.path(), None, "PDF"))
        .await
        .unwrap();

    let DownloadOutcome::Completed(report) = outcome else {
        panic!("expected a completed download, got {outcome:?}");
    };
    let book = dir.path().join("Sales_Q1");
    assert_eq!(
        report.written,
        vec![book.join("Overview.pdf"), book.join("By_Region.pdf")]
    );
    assert_eq!(fs::read(book.join("By_Region.pdf")).unwrap(), b"v-2");
    assert!(report.failed.is_empty());
}

#[tokio::test]
async fn a_failed_view_does_not_stop_its_siblings() {
    let dir = tempdir().unwrap();
    let mut client = serving(&[("v-1", "Overview"), ("v-2", "Detail")]);
    client.expect_view_media().returning(|id, _| match id {
        "v-1" => Err(PlumberError::Server {
            status: 500,
            message: "render failed".to_string(),
        }),
        _ => Ok(b"a,b\n1,2\n".to_vec()),
    });
    let session = session(client).await;

    let outcome = download_views(&session, &request(dir.path(), None, "csv"))
        .await
        .unwrap();

    let DownloadOutcome::Completed(report) = outcome else {
        panic!("expected a completed download, got {outcome:?}");
    };
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].view_name, "Overview");
    assert_eq!(report.written, vec![dir.path().join("Sales_Q1").join("Detail.csv")]);
}

#[tokio::test]
async fn requested_view_is_downloaded_alone() {
    let dir = tempdir().unwrap();
    let mut client = serving(&[("v-1", "Overview"), ("v-2", "Detail")]);
    client
        .expect_view_media()
        .withf(|id, _| id.to_string() == "v-1")
        .times(1)
        .returning(|_, _| Ok(vec![0x89, b'P', b'N', b'G']));
    let session = session(client).await;

    let outcome = download_views(&session, &request(dir.path(), Some("Overview"), "image"))
        .await
        .unwrap();

    let DownloadOutcome::Completed(report) = outcome else {
        panic!("expected a completed download, got {outcome:?}");
    };
    assert_eq!(
        report.written,
        vec![dir.path().join("Sales_Q1").join("Overview.png")]
    );
}

#[tokio::test]
async fn failed_requested_view_ends_the_walk() {
    let dir = tempdir().unwrap();
    let mut client = serving(&[("v-1", "Overview"), ("v-2", "Overview")]);
    client.expect_view_media().times(1).returning(|_, _| {
        Err(PlumberError::Server {
            status: 500,
            message: "render failed".to_string(),
        })
    });
    let session = session(client).await;

    let outcome = download_views(&session, &request(dir.path(), Some("Overview"), "image"))
        .await
        .unwrap();

    let DownloadOutcome::Completed(report) = outcome else {
        panic!("expected a completed download, got {outcome:?}");
    };
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].view_name, "Overview");
    assert!(report.written.is_empty());
}

#[tokio::test]
async fn walk_stops_at_the_first_non_matching_view() {
    let dir = tempdir().unwrap();
    // "Detail" sits behind "Overview", so the walk never reaches it.
    let client = serving(&[("v-1", "Overview"), ("v-2", "Detail")]);
    let session = session(client).await;

    let outcome = download_views(&session, &request(dir.path(), Some("Detail"), "image"))
        .await
        .unwrap();

    assert_eq!(outcome, DownloadOutcome::ViewNotFound);
    assert!(!dir.path().join("Sales_Q1").join("Detail.png").exists());
}

#[tokio::test]
async fn unknown_workbook_is_reported() {
    let dir = tempdir().unwrap();
    let mut client = MockServerClient::new();
    client
        .expect_list_workbooks()
        .returning(|_| Ok(Page::single(vec![workbook("w-9", "Other")])));
    let session = session(client).await;

    let outcome = download_views(&session, &request(dir.path(), None, "pdf"))
        .await
        .unwrap();

    assert_eq!(outcome, DownloadOutcome::WorkbookNotFound);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

mod common;

use common::*;
use tableau_plumber_core::contract::{MockServerClient, WriteMode};
use tableau_plumber_core::items::{ItemType, Page};
use tableau_plumber_core::publish::{
    delete_datasource, job_status, publish_datasource, refresh_datasource, refresh_workbook,
    PublishRequest,
};
use tableau_plumber_core::PlumberError;

fn with_projects(client: &mut MockServerClient) {
    client
        .expect_list_projects()
        .returning(|_| Ok(Page::single(vec![project("p-1", "Finance")])));
}

fn with_datasources(client: &mut MockServerClient, names: &'static [&'static str]) {
    client.expect_list_datasources().returning(move |_| {
        Ok(Page::single(
            names
                .iter()
                .enumerate()
                .map(|(i, name)| datasource(&format!("d-{i}"), name))
                .collect(),
        ))
    });
}

fn named(name: &str, mode: WriteMode) -> PublishRequest {
    PublishRequest {
        data_source_name: Some(name.to_string()),
        write_mode: mode,
        ..PublishRequest::new("Finance", "/tmp/orders.hyper")
    }
}

#[tokio::test]
async fn existing_name_with_create_new_overwrites() {
    let mut client = MockServerClient::new();
    with_projects(&mut client);
    with_datasources(&mut client, &["Orders"]);
    client
        .expect_publish_datasource()
        .withf(|ds, path, mode| {
            ds.project_id == "p-1"
                && ds.name == "Orders"
                && path.ends_with("orders.hyper")
                && *mode == WriteMode::Overwrite
        })
        .times(1)
        .returning(|ds, _, _| Ok(datasource("d-0", &ds.name)));
    let session = session(client).await;

    let published = publish_datasource(&session, &named("Orders", WriteMode::CreateNew))
        .await
        .unwrap();

    assert_eq!(published.id, "d-0");
}

#[tokio::test]
async fn append_to_an_existing_source_is_kept() {
    let mut client = MockServerClient::new();
    with_projects(&mut client);
    with_datasources(&mut client, &["Orders"]);
    client
        .expect_publish_datasource()
        .withf(|_, _, mode| *mode == WriteMode::Append)
        .times(1)
        .returning(|ds, _, _| Ok(datasource("d-0", &ds.name)));
    let session = session(client).await;

    publish_datasource(&session, &named("Orders", WriteMode::Append))
        .await
        .unwrap();
}

#[tokio::test]
async fn missing_name_always_creates() {
    let mut client = MockServerClient::new();
    with_projects(&mut client);
    with_datasources(&mut client, &["Returns"]);
    client
        .expect_publish_datasource()
        .withf(|_, _, mode| *mode == WriteMode::CreateNew)
        .times(1)
        .returning(|ds, _, _| Ok(datasource("d-7", &ds.name)));
    let session = session(client).await;

    let published = publish_datasource(&session, &named("Orders", WriteMode::Overwrite))
        .await
        .unwrap();

    assert_eq!(published.name, "Orders");
}

#[tokio::test]
async fn unnamed_publish_uses_the_file_stem_without_lookup() {
    let mut client = MockServerClient::new();
    with_projects(&mut client);
    client
        .expect_publish_datasource()
        .withf(|ds, _, mode| ds.name == "orders" && *mode == WriteMode::Append)
        .times(1)
        .returning(|ds, _, _| Ok(datasource("d-1", &ds.name)));
    let session = session(client).await;
    let request = PublishRequest {
        write_mode: WriteMode::Append,
        ..PublishRequest::new("Finance", "/tmp/orders.hyper")
    };

    publish_datasource(&session, &request).await.unwrap();
}

#[tokio::test]
async fn unknown_project_is_not_found() {
    let mut client = MockServerClient::new();
    with_projects(&mut client);
    let session = session(client).await;

    let result = publish_datasource(&session, &PublishRequest::new("Marketing", "/tmp/x.hyper")).await;

    assert!(matches!(
        result,
        Err(PlumberError::NotFound { item_type: ItemType::Project, ref name }) if name == "Marketing"
    ));
}

#[tokio::test]
async fn empty_project_is_rejected_before_any_lookup() {
    let session = session(MockServerClient::new()).await;

    let result = publish_datasource(&session, &PublishRequest::new("  ", "/tmp/x.hyper")).await;

    assert!(matches!(result, Err(PlumberError::InvalidArgument(_))));
}

#[tokio::test]
async fn refresh_of_unknown_source_is_none() {
    let mut client = MockServerClient::new();
    with_datasources(&mut client, &["Orders"]);
    let session = session(client).await;

    assert!(refresh_datasource(&session, "Returns").await.unwrap().is_none());
}

#[tokio::test]
async fn refresh_returns_the_started_job() {
    let mut client = MockServerClient::new();
    with_datasources(&mut client, &["Returns", "Orders"]);
    client
        .expect_refresh_datasource()
        .withf(|id| id.to_string() == "d-1")
        .times(1)
        .returning(|_| Ok(job("j-42")));
    let session = session(client).await;

    let job = refresh_datasource(&session, "Orders").await.unwrap();

    assert_eq!(job.map(|j| j.id), Some("j-42".to_string()));
}

#[tokio::test]
async fn workbook_refresh_targets_the_named_workbook() {
    let mut client = MockServerClient::new();
    client
        .expect_list_workbooks()
        .returning(|_| Ok(Page::single(vec![workbook("w-3", "Revenue")])));
    client
        .expect_refresh_workbook()
        .withf(|id| id.to_string() == "w-3")
        .times(1)
        .returning(|_| Ok(job("j-7")));
    let session = session(client).await;

    let job = refresh_workbook(&session, "Revenue").await.unwrap();

    assert_eq!(job.map(|j| j.id), Some("j-7".to_string()));
    assert!(refresh_workbook(&session, "Costs").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_returns_the_removed_source() {
    let mut client = MockServerClient::new();
    with_datasources(&mut client, &["Orders"]);
    client
        .expect_delete_datasource()
        .withf(|id| id.to_string() == "d-0")
        .times(1)
        .returning(|_| Ok(()));
    let session = session(client).await;

    let deleted = delete_datasource(&session, "Orders").await.unwrap();

    assert_eq!(deleted.map(|d| d.name), Some("Orders".to_string()));
}

#[tokio::test]
async fn delete_failure_is_propagated() {
    let mut client = MockServerClient::new();
    with_datasources(&mut client, &["Orders"]);
    client.expect_delete_datasource().returning(|_| {
        Err(PlumberError::Server {
            status: 403,
            message: "forbidden".to_string(),
        })
    });
    let session = session(client).await;

    let result = delete_datasource(&session, "Orders").await;

    assert!(matches!(result, Err(PlumberError::Server { status: 403, .. })));
}

#[tokio::test]
async fn job_status_fetches_by_id() {
    let mut client = MockServerClient::new();
    client
        .expect_get_job()
        .returning(|id| {
            let mut job = job(id);
            job.finish_code = Some(0);
            Ok(job)
        });
    let session = session(client).await;

    let job = job_status(&session, "j-42").await.unwrap();

    assert_eq!(job.finish_code, Some(0));
    assert!(job_status(&session, "").await.is_err());
}

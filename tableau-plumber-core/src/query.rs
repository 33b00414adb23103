//! Item enumeration and flattening into listing tables.

use std::future::Future;
use tracing::{debug, error, info};

use crate::config::pause;
use crate::contract::ServerClient;
use crate::error::PlumberError;
use crate::items::{
    DatasourceItem, ItemType, Page, ProjectItem, RemoteItem, RequestOptions, ViewItem,
    WorkbookItem,
};
use crate::session::Session;
use crate::table::Table;

/// Fetches every page of an enumeration, starting from `options`' page.
pub async fn collect_pages<T, F, Fut>(
    options: &RequestOptions,
    mut fetch: F,
) -> Result<Vec<T>, PlumberError>
where
    F: FnMut(RequestOptions) -> Fut,
    Fut: Future<Output = Result<Page<T>, PlumberError>>,
{
    let mut items = Vec::new();
    let mut page_number = options.page_number.max(1);
    loop {
        let page = fetch(options.page(page_number)).await?;
        let fetched = page.items.len();
        items.extend(page.items);
        debug!(
            page_number,
            fetched,
            total_available = page.pagination.total_available,
            "Fetched page"
        );
        // An empty page ends the walk even if the server's total disagrees.
        if fetched == 0 || !page.pagination.has_more() {
            break;
        }
        page_number += 1;
    }
    Ok(items)
}

/// Enumerates all items of one type. Must run inside [`Session::scoped`].
///
/// Projects ignore `options`' filters: they are listed unfiltered with the
/// same page size.
pub async fn list_items<C: ServerClient>(
    client: &C,
    item_type: ItemType,
    options: &RequestOptions,
) -> Result<Vec<RemoteItem>, PlumberError> {
    let items = match item_type {
        ItemType::Project => {
            let unfiltered = RequestOptions {
                filters: Vec::new(),
                ..options.clone()
            };
            collect_pages(&unfiltered, move |o| async move { client.list_projects(&o).await })
                .await?
                .into_iter()
                .map(RemoteItem::Project)
                .collect()
        }
        ItemType::Workbook => {
            collect_pages(options, move |o| async move { client.list_workbooks(&o).await })
                .await?
                .into_iter()
                .map(RemoteItem::Workbook)
                .collect()
        }
        ItemType::View => collect_pages(options, move |o| async move { client.list_views(&o).await })
            .await?
            .into_iter()
            .map(RemoteItem::View)
            .collect(),
        ItemType::Datasource => {
            collect_pages(options, move |o| async move { client.list_datasources(&o).await })
                .await?
                .into_iter()
                .map(RemoteItem::Datasource)
                .collect()
        }
        ItemType::Job => collect_pages(options, move |o| async move { client.list_jobs(&o).await })
            .await?
            .into_iter()
            .map(RemoteItem::Job)
            .collect(),
    };
    Ok(items)
}

/// Lists the items of a type as a flat table.
///
/// Unknown tags, and `Job`, which has no listing layout, yield an empty table.
/// Workbooks expand to one row per contained view, which costs one extra
/// populate call per workbook.
pub async fn item_details<C: ServerClient>(
    session: &Session<C>,
    tag: &str,
) -> Result<Table, PlumberError> {
    info!(item_type = %tag, "Data requested for the tableau server item");
    pause(session.pacing().before_query).await;

    let item_type = match ItemType::from_tag(tag) {
        Some(t) if t != ItemType::Job => t,
        _ => {
            info!(item_type = %tag, "No listing layout for item type, returning empty table");
            return Ok(Table::default());
        }
    };

    info!("Fetching data...");
    let client = session.client();
    let result = session
        .scoped(async {
            match item_type {
                ItemType::Project => {
                    let items = collect_pages(&session.unfiltered_options(), move |o| async move {
                        client.list_projects(&o).await
                    })
                    .await?;
                    Ok(project_table(&items))
                }
                ItemType::Workbook => {
                    let mut items = collect_pages(session.default_options(), move |o| async move {
                        client.list_workbooks(&o).await
                    })
                    .await?;
                    for workbook in items.iter_mut() {
                        workbook.views = client.workbook_views(&workbook.id).await?;
                    }
                    Ok(workbook_table(&items))
                }
                ItemType::View => {
                    let items = collect_pages(session.default_options(), move |o| async move {
                        client.list_views(&o).await
                    })
                    .await?;
                    Ok(view_table(&items))
                }
                ItemType::Datasource => {
                    let items = collect_pages(session.default_options(), move |o| async move {
                        client.list_datasources(&o).await
                    })
                    .await?;
                    Ok(datasource_table(&items))
                }
                ItemType::Job => unreachable!("jobs are rejected above"),
            }
        })
        .await;

    match &result {
        Ok(table) => info!(rows = table.len(), "Data Fetch completed"),
        Err(e) => error!(error = %e, item_type = %item_type, "Operation failed"),
    }
    result
}

pub fn project_table(items: &[ProjectItem]) -> Table {
    let mut table = Table::new(&["Item Name", "Item ID"]);
    for item in items {
        table.push_row(vec![item.name.clone(), item.id.clone()]);
    }
    table
}

pub fn view_table(items: &[ViewItem]) -> Table {
    let mut table = Table::new(&["Item Name", "Item ID", "Workbook ID"]);
    for item in items {
        table.push_row(vec![
            item.name.clone(),
            item.id.clone(),
            item.workbook_id.clone().unwrap_or_default(),
        ]);
    }
    table
}

pub fn datasource_table(items: &[DatasourceItem]) -> Table {
    let mut table = Table::new(&[
        "Item Name",
        "Item ID",
        "Creation Date",
        "Update Date",
        "Project Name",
    ]);
    for item in items {
        table.push_row(vec![
            item.name.clone(),
            item.id.clone(),
            item.created_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            item.updated_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            item.project_name.clone().unwrap_or_default(),
        ]);
    }
    table
}

/// One row per (workbook, view) pair; workbooks without views contribute no rows.
pub fn workbook_table(items: &[WorkbookItem]) -> Table {
    let mut table = Table::new(&["Item Name", "Item ID", "View Name", "View ID"]);
    for item in items {
        for view in &item.views {
            table.push_row(vec![
                item.name.clone(),
                item.id.clone(),
                view.name.clone(),
                view.id.clone(),
            ]);
        }
    }
    table
}

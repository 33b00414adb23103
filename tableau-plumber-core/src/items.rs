//! Published server content as seen by this crate.
//!
//! The server enumerates five kinds of item. They share a display name (which
//! the server does not keep unique) and an opaque id, and otherwise carry
//! whatever linkage the listing endpoints report.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Kind of server item an operation works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ItemType {
    Project,
    Workbook,
    View,
    Datasource,
    Job,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Project => "project",
            ItemType::Workbook => "workbook",
            ItemType::View => "view",
            ItemType::Datasource => "datasource",
            ItemType::Job => "job",
        }
    }

    /// Parses a tag case-insensitively. Unknown tags yield `None` so callers can
    /// treat them as an empty result instead of an error.
    pub fn from_tag(tag: &str) -> Option<Self> {
        tag.parse().ok()
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "project" => Ok(ItemType::Project),
            "workbook" => Ok(ItemType::Workbook),
            "view" => Ok(ItemType::View),
            "datasource" => Ok(ItemType::Datasource),
            "job" => Ok(ItemType::Job),
            other => Err(format!("unknown item type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectItem {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkbookItem {
    pub id: String,
    pub name: String,
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Filled in by a separate populate call; listing endpoints leave it empty.
    pub views: Vec<ViewItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewItem {
    pub id: String,
    pub name: String,
    pub workbook_id: Option<String>,
    pub content_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasourceItem {
    pub id: String,
    pub name: String,
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// An asynchronous server-side task, e.g. an extract refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobItem {
    pub id: String,
    /// The job title; listing endpoints report it, single-job lookups may not.
    pub name: String,
    pub job_type: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub finish_code: Option<i32>,
}

/// Any enumerable server item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RemoteItem {
    Project(ProjectItem),
    Workbook(WorkbookItem),
    View(ViewItem),
    Datasource(DatasourceItem),
    Job(JobItem),
}

impl RemoteItem {
    pub fn name(&self) -> &str {
        match self {
            RemoteItem::Project(p) => &p.name,
            RemoteItem::Workbook(w) => &w.name,
            RemoteItem::View(v) => &v.name,
            RemoteItem::Datasource(d) => &d.name,
            RemoteItem::Job(j) => &j.name,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            RemoteItem::Project(p) => &p.id,
            RemoteItem::Workbook(w) => &w.id,
            RemoteItem::View(v) => &v.id,
            RemoteItem::Datasource(d) => &d.id,
            RemoteItem::Job(j) => &j.id,
        }
    }

    pub fn item_type(&self) -> ItemType {
        match self {
            RemoteItem::Project(_) => ItemType::Project,
            RemoteItem::Workbook(_) => ItemType::Workbook,
            RemoteItem::View(_) => ItemType::View,
            RemoteItem::Datasource(_) => ItemType::Datasource,
            RemoteItem::Job(_) => ItemType::Job,
        }
    }
}

/// Comparison operator of a server-side filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Equals,
    GreaterThan,
    LessThan,
    In,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equals => "eq",
            FilterOperator::GreaterThan => "gt",
            FilterOperator::LessThan => "lt",
            FilterOperator::In => "in",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub operator: FilterOperator,
    pub value: String,
}

impl Filter {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Filter matching items owned by the user with this email.
    pub fn owner_email(email: impl Into<String>) -> Self {
        Self::new("ownerEmail", FilterOperator::Equals, email)
    }

    /// Renders the `field:operator:value` expression used in query strings.
    pub fn expression(&self) -> String {
        format!("{}:{}:{}", self.field, self.operator.as_str(), self.value)
    }
}

pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Paging and filtering for an enumeration call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    pub page_number: u32,
    pub page_size: u32,
    pub filters: Vec<Filter>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
            filters: Vec::new(),
        }
    }
}

impl RequestOptions {
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Same filters and page size, pointed at another page.
    pub fn page(&self, page_number: u32) -> Self {
        Self {
            page_number,
            ..self.clone()
        }
    }

    /// Comma-joined filter expressions, or `None` when unfiltered.
    pub fn filter_expression(&self) -> Option<String> {
        if self.filters.is_empty() {
            return None;
        }
        Some(
            self.filters
                .iter()
                .map(Filter::expression)
                .collect::<Vec<_>>()
                .join(","),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page_number: u32,
    pub page_size: u32,
    pub total_available: u32,
}

impl Pagination {
    pub fn has_more(&self) -> bool {
        (self.page_number as u64) * (self.page_size as u64) < self.total_available as u64
    }
}

/// One page of an enumeration call.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    /// A page holding every item, as returned by endpoints without paging.
    pub fn single(items: Vec<T>) -> Self {
        let total = items.len() as u32;
        Self {
            items,
            pagination: Pagination {
                page_number: 1,
                page_size: total.max(1),
                total_available: total,
            },
        }
    }
}

//! Dashboard listing, used by the read-only data source
//!
//! The listing is marker-paginated; the walk follows `next_marker` until
//! the server stops returning one.

use serde::Deserialize;

use super::client::Client;
use super::error::ApiError;
use super::query::{collect_marker_pages, ApiQueryParams};

const LIST_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct Dashboard {
    pub id: String,
    pub title: Option<String>,
    pub group_name: Option<String>,
    pub last_update_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ListDashboardsResponse {
    dashboards: Option<Vec<Dashboard>>,
    next_marker: Option<String>,
}

impl Client {
    pub async fn list_dashboards(&self) -> Result<Vec<Dashboard>, ApiError> {
        collect_marker_pages(|marker| async move {
            let query = ApiQueryParams::new()
                .add("limit", LIST_PAGE_SIZE)
                .add_optional("marker", marker)
                .to_query_string();
            let path = format!("/v2/{{project_id}}/dashboards{}", query);
            let response: ListDashboardsResponse = self.get(&path).await?;
            Ok((response.dashboards.unwrap_or_default(), response.next_marker))
        })
        .await
    }
}

//! Log group operations

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::client::Client;
use super::error::ApiError;

#[derive(Debug, Clone, Serialize)]
pub struct CreateLogGroupRequest {
    pub log_group_name: String,
    pub ttl_in_days: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct CreateLogGroupResponse {
    log_group_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateLogGroupRequest {
    pub ttl_in_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogGroup {
    pub log_group_id: String,
    pub log_group_name: String,
    pub ttl_in_days: Option<i64>,
    pub creation_time: Option<i64>,
    pub tag: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct ListLogGroupsResponse {
    log_groups: Option<Vec<LogGroup>>,
}

impl Client {
    pub async fn create_log_group(
        &self,
        request: &CreateLogGroupRequest,
    ) -> Result<String, ApiError> {
        let response: CreateLogGroupResponse =
            self.post("/v2/{project_id}/groups", request).await?;
        Ok(response.log_group_id)
    }

    pub async fn list_log_groups(&self) -> Result<Vec<LogGroup>, ApiError> {
        let response: ListLogGroupsResponse = self.get("/v2/{project_id}/groups").await?;
        Ok(response.log_groups.unwrap_or_default())
    }

    /// The API has no per-group GET, so reads list and filter by id
    pub async fn get_log_group(&self, group_id: &str) -> Result<Option<LogGroup>, ApiError> {
        let groups = self.list_log_groups().await?;
        Ok(groups.into_iter().find(|g| g.log_group_id == group_id))
    }

    pub async fn update_log_group(
        &self,
        group_id: &str,
        request: &UpdateLogGroupRequest,
    ) -> Result<(), ApiError> {
        let path = format!("/v2/{{project_id}}/groups/{}", group_id);
        let _: serde_json::Value = self.put(&path, request).await?;
        Ok(())
    }

    pub async fn delete_log_group(&self, group_id: &str) -> Result<(), ApiError> {
        let path = format!("/v2/{{project_id}}/groups/{}", group_id);
        self.delete(&path).await
    }
}

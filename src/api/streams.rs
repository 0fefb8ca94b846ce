//! Log stream operations, scoped to their parent log group

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::client::Client;
use super::error::ApiError;

#[derive(Debug, Clone, Serialize)]
pub struct CreateLogStreamRequest {
    pub log_stream_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_in_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct CreateLogStreamResponse {
    log_stream_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogStream {
    pub log_stream_id: String,
    pub log_stream_name: String,
    pub ttl_in_days: Option<i64>,
    pub creation_time: Option<i64>,
    pub filter_count: Option<i64>,
    pub tag: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct ListLogStreamsResponse {
    log_streams: Option<Vec<LogStream>>,
}

impl Client {
    pub async fn create_log_stream(
        &self,
        group_id: &str,
        request: &CreateLogStreamRequest,
    ) -> Result<String, ApiError> {
        let path = format!("/v2/{{project_id}}/groups/{}/streams", group_id);
        let response: CreateLogStreamResponse = self.post(&path, request).await?;
        Ok(response.log_stream_id)
    }

    pub async fn list_log_streams(&self, group_id: &str) -> Result<Vec<LogStream>, ApiError> {
        let path = format!("/v2/{{project_id}}/groups/{}/streams", group_id);
        let response: ListLogStreamsResponse = self.get(&path).await?;
        Ok(response.log_streams.unwrap_or_default())
    }

    /// Streams have no per-stream GET either; list the group and filter
    pub async fn get_log_stream(
        &self,
        group_id: &str,
        stream_id: &str,
    ) -> Result<Option<LogStream>, ApiError> {
        let streams = self.list_log_streams(group_id).await?;
        Ok(streams.into_iter().find(|s| s.log_stream_id == stream_id))
    }

    pub async fn delete_log_stream(&self, group_id: &str, stream_id: &str) -> Result<(), ApiError> {
        let path = format!("/v2/{{project_id}}/groups/{}/streams/{}", group_id, stream_id);
        self.delete(&path).await
    }
}

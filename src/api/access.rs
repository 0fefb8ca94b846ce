//! Access configuration operations (host agent and CCE collection)
//!
//! Host and CCE access configs share the same endpoints and most of the
//! detail struct; the CCE variant adds container selectors and carries a
//! cluster id.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::client::Client;
use super::error::ApiError;
use super::Tag;

pub const ACCESS_TYPE_AGENT: &str = "AGENT";
pub const ACCESS_TYPE_CCE: &str = "K8S_CCE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogFormatRule {
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single: Option<LogFormatRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi: Option<LogFormatRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeOffset {
    pub offset: i64,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowsLogInfo {
    pub categorys: Vec<String>,
    pub event_level: Vec<String>,
    pub time_offset: TimeOffset,
}

/// Collection detail shared by host and CCE configs. Everything is
/// optional so absent fields stay out of the request body entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessConfigDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub black_paths: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<LogFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows_log_info: Option<WindowsLogInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_key_value: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_collect: Option<bool>,
    // CCE container selectors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_space_regex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_name_regex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name_regex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_labels_logical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_labels: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_labels_logical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_labels: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_envs_logical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_envs: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_envs_logical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_envs: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_k8s_labels_logical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_k8s_labels: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_k8s_labels_logical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_k8s_labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogInfo {
    pub log_group_id: String,
    pub log_stream_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_stream_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostGroupInfo {
    pub host_group_id_list: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Processor {
    #[serde(rename = "type")]
    pub processor_type: String,
    pub detail: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoField {
    pub field_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_value: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateAccessConfigRequest {
    pub access_config_type: String,
    pub access_config_name: String,
    pub access_config_detail: AccessConfigDetail,
    pub log_info: AccessLogInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_group_info: Option<HostGroupInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_config_tag: Option<Vec<Tag>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_collect: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incremental_collect: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_split: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processors: Option<Vec<Processor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_log: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_fields: Option<Vec<DemoField>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateAccessConfigRequest {
    pub access_config_id: String,
    pub access_config_detail: AccessConfigDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_group_info: Option<HostGroupInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_config_tag: Option<Vec<Tag>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_collect: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incremental_collect: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_split: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processors: Option<Vec<Processor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_log: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_fields: Option<Vec<DemoField>>,
}

#[derive(Debug, Deserialize)]
struct CreateAccessConfigResponse {
    access_config_id: String,
}

/// Filters for the list endpoint; reads filter by name with an exact match
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListAccessConfigsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_config_name_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_group_name_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_stream_name_list: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_config_tag_list: Option<Vec<Tag>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfigInfo {
    pub access_config_id: String,
    pub access_config_name: String,
    pub access_config_type: Option<String>,
    pub access_config_detail: Option<AccessConfigDetail>,
    pub log_info: Option<AccessLogInfo>,
    pub host_group_info: Option<HostGroupInfo>,
    pub access_config_tag: Option<Vec<Tag>>,
    pub cluster_id: Option<String>,
    pub binary_collect: Option<bool>,
    pub encoding_format: Option<String>,
    pub incremental_collect: Option<bool>,
    pub log_split: Option<bool>,
    pub processor_type: Option<String>,
    pub processors: Option<Vec<Processor>>,
    pub demo_log: Option<String>,
    pub demo_fields: Option<Vec<DemoField>>,
    pub create_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ListAccessConfigsResponse {
    result: Option<Vec<AccessConfigInfo>>,
}

#[derive(Debug, Serialize)]
struct DeleteAccessConfigRequest<'a> {
    access_config_id_list: Vec<&'a str>,
}

impl Client {
    pub async fn create_access_config(
        &self,
        request: &CreateAccessConfigRequest,
    ) -> Result<String, ApiError> {
        let response: CreateAccessConfigResponse = self
            .post("/v3/{project_id}/lts/access-config", request)
            .await?;
        Ok(response.access_config_id)
    }

    pub async fn update_access_config(
        &self,
        request: &UpdateAccessConfigRequest,
    ) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .put("/v3/{project_id}/lts/access-config", request)
            .await?;
        Ok(())
    }

    pub async fn list_access_configs(
        &self,
        request: &ListAccessConfigsRequest,
    ) -> Result<Vec<AccessConfigInfo>, ApiError> {
        let response: ListAccessConfigsResponse = self
            .post("/v3/{project_id}/lts/access-config-list", request)
            .await?;
        Ok(response.result.unwrap_or_default())
    }

    /// Reads go through the list endpoint filtered by name; the filter is
    /// fuzzy on the server side so the exact match happens here
    pub async fn get_access_config_by_name(
        &self,
        name: &str,
    ) -> Result<Option<AccessConfigInfo>, ApiError> {
        let request = ListAccessConfigsRequest {
            access_config_name_list: Some(vec![name.to_string()]),
            ..Default::default()
        };
        let configs = self.list_access_configs(&request).await?;
        Ok(configs.into_iter().find(|c| c.access_config_name == name))
    }

    pub async fn delete_access_config(&self, access_config_id: &str) -> Result<(), ApiError> {
        let request = DeleteAccessConfigRequest {
            access_config_id_list: vec![access_config_id],
        };
        self.delete_with_body("/v3/{project_id}/lts/access-config", &request)
            .await
    }
}

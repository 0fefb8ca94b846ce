//! Log transfer operations (OBS, DIS and DMS delivery)

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::error::ApiError;
use super::query::ApiQueryParams;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferStream {
    pub log_stream_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_stream_name: Option<String>,
}

/// Delegated-account grant for cross-account transfers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferAgency {
    pub agency_domain_id: String,
    pub agency_domain_name: String,
    pub agency_name: String,
    pub agency_project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub be_agency_domain_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub be_agency_project_id: Option<String>,
}

/// Sink-specific settings. The wire name for the OBS directory prefix is
/// `obs_dir_pre_fix_name`, kept behind a rename so the field reads sanely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obs_period: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obs_period_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obs_bucket_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obs_transfer_path: Option<String>,
    #[serde(
        rename = "obs_dir_pre_fix_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub obs_dir_prefix_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obs_prefix_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obs_eps_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obs_encrypted_enable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obs_encrypted_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obs_time_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obs_time_zone_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dis_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dis_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kafka_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kafka_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lts_tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub struct_fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_field_value: Option<String>,
    #[serde(rename = "tags", skip_serializing_if = "Option::is_none")]
    pub delivery_tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_project_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferInfo {
    pub log_transfer_type: String,
    pub log_transfer_mode: String,
    pub log_storage_format: String,
    pub log_transfer_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_agency_transfer: Option<TransferAgency>,
    pub log_transfer_detail: TransferDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_create_time: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTransferRequest {
    pub log_group_id: String,
    pub log_streams: Vec<TransferStream>,
    pub log_transfer_info: TransferInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateTransferInfo {
    pub log_storage_format: String,
    pub log_transfer_status: String,
    pub log_transfer_detail: TransferDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateTransferRequest {
    pub log_transfer_id: String,
    pub log_transfer_info: UpdateTransferInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transfer {
    pub log_transfer_id: String,
    pub log_group_id: Option<String>,
    pub log_group_name: Option<String>,
    pub log_streams: Option<Vec<TransferStream>>,
    pub log_transfer_info: Option<TransferInfo>,
}

#[derive(Debug, Deserialize)]
struct CreateTransferResponse {
    log_transfer_id: String,
}

#[derive(Debug, Deserialize)]
struct ListTransfersResponse {
    log_transfers: Option<Vec<Transfer>>,
}

impl Client {
    pub async fn create_transfer(
        &self,
        request: &CreateTransferRequest,
    ) -> Result<String, ApiError> {
        let response: CreateTransferResponse =
            self.post("/v2/{project_id}/transfers", request).await?;
        Ok(response.log_transfer_id)
    }

    pub async fn list_transfers(&self) -> Result<Vec<Transfer>, ApiError> {
        let response: ListTransfersResponse = self.get("/v2/{project_id}/transfers").await?;
        Ok(response.log_transfers.unwrap_or_default())
    }

    /// No per-transfer GET in the API, list and filter by id
    pub async fn get_transfer(&self, transfer_id: &str) -> Result<Option<Transfer>, ApiError> {
        let transfers = self.list_transfers().await?;
        Ok(transfers
            .into_iter()
            .find(|t| t.log_transfer_id == transfer_id))
    }

    pub async fn update_transfer(&self, request: &UpdateTransferRequest) -> Result<(), ApiError> {
        let _: serde_json::Value = self.put("/v2/{project_id}/transfers", request).await?;
        Ok(())
    }

    pub async fn delete_transfer(&self, transfer_id: &str) -> Result<(), ApiError> {
        let query = ApiQueryParams::new()
            .add("log_transfer_id", transfer_id)
            .to_query_string();
        let path = format!("/v2/{{project_id}}/transfers{}", query);
        self.delete(&path).await
    }
}

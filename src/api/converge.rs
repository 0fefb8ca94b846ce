//! Cross-account log converge configuration
//!
//! A single PUT endpoint handles create, update and delete; deletion is a
//! PUT with an empty mapping list. The configuration is applied
//! asynchronously, so mutations are followed by a fixed-interval poll on
//! the member account until the reported status settles.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::client::Client;
use super::error::ApiError;

/// The GET endpoint reports a missing config as a 500 with this code
pub const CONVERGE_NOT_FOUND_CODE: &str = "LTS.2504";

pub const CONVERGE_STATUS_DONE: &str = "done";

const POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogStreamMapping {
    pub source_log_stream_id: String,
    pub target_log_stream_name: String,
    pub target_log_stream_ttl: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_log_stream_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_log_stream_eps_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogMappingConfig {
    pub source_log_group_id: String,
    pub target_log_group_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_log_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_stream_config: Option<Vec<LogStreamMapping>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModifyLogConvergeRequest {
    pub organization_id: String,
    pub management_account_id: String,
    pub member_account_id: String,
    /// Empty list removes the whole configuration
    pub log_mapping_config: Vec<LogMappingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub management_project_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConvergeConfig {
    pub organization_id: Option<String>,
    pub management_account_id: Option<String>,
    pub member_account_id: Option<String>,
    pub management_project_id: Option<String>,
    pub log_mapping_config: Option<Vec<LogMappingConfig>>,
    pub status: Option<String>,
    pub create_time: Option<i64>,
    pub update_time: Option<i64>,
}

impl LogConvergeConfig {
    fn has_mappings(&self) -> bool {
        self.log_mapping_config
            .as_ref()
            .map(|m| !m.is_empty())
            .unwrap_or(false)
    }
}

impl Client {
    pub async fn modify_log_converge(
        &self,
        request: &ModifyLogConvergeRequest,
    ) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .put("/v1/{project_id}/lts/log-converge-config", request)
            .await?;
        Ok(())
    }

    /// `None` when the member account has no converge configuration, which
    /// the API reports either as `LTS.2504` or as a config with an empty
    /// mapping list
    pub async fn get_log_converge(
        &self,
        member_account_id: &str,
    ) -> Result<Option<LogConvergeConfig>, ApiError> {
        let path = format!(
            "/v1/{{project_id}}/lts/log-converge-config/{}",
            member_account_id
        );
        match self.get::<LogConvergeConfig>(&path).await {
            Ok(config) if config.has_mappings() => Ok(Some(config)),
            Ok(_) => Ok(None),
            Err(e) if e.is_not_found(&[CONVERGE_NOT_FOUND_CODE]) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Poll every 10 seconds until the configuration reaches one of the
    /// target statuses. With no targets the goal is disappearance, used
    /// after a delete.
    pub async fn wait_for_log_converge(
        &self,
        member_account_id: &str,
        targets: &[&str],
        timeout: Duration,
    ) -> Result<(), ApiError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.get_log_converge(member_account_id).await? {
                Some(config) => {
                    let status = config.status.as_deref().unwrap_or("");
                    tracing::debug!(
                        "log converge config for {} is in status {:?}",
                        member_account_id,
                        status
                    );
                    if targets.contains(&status) {
                        return Ok(());
                    }
                }
                None => {
                    if targets.is_empty() {
                        return Ok(());
                    }
                    return Err(ApiError::Api {
                        status: 404,
                        code: None,
                        message: format!(
                            "log converge config for {} disappeared while waiting",
                            member_account_id
                        ),
                    });
                }
            }

            if Instant::now() >= deadline {
                return Err(ApiError::Timeout(format!(
                    "log converge config for {}",
                    member_account_id
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

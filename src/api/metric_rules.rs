//! Log-to-metric rule operations
//!
//! Rules sample matching log entries, aggregate a field over a time window
//! and report the result as an AOM metric. Unlike the alarm rules, the API
//! serves a direct GET by rule id.

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSampler {
    #[serde(rename = "type")]
    pub sampler_type: String,
    pub ratio: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSink {
    #[serde(rename = "type")]
    pub sink_type: String,
    pub metric_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// AOM Prometheus instance id, `instance` on the wire
    #[serde(rename = "instance", skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricAggregator {
    #[serde(rename = "type")]
    pub aggregator_type: String,
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricFilterCondition {
    pub key: String,
    #[serde(rename = "type")]
    pub condition_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lower: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricFilterGroup {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub group_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<MetricFilterCondition>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricFilter {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub filter_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<MetricFilterGroup>>,
}

/// Create and update share the full body; the rule id travels in the path
#[derive(Debug, Clone, Serialize)]
pub struct MetricRuleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<String>,
    pub project_id: String,
    pub name: String,
    pub status: String,
    pub log_group_id: String,
    pub log_stream_id: String,
    pub sampler: MetricSampler,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<bool>,
    pub sinks: Vec<MetricSink>,
    pub aggregator: MetricAggregator,
    pub window_size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<MetricFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricRule {
    pub name: Option<String>,
    pub status: Option<String>,
    pub log_group_id: Option<String>,
    pub log_stream_id: Option<String>,
    pub sampler: Option<MetricSampler>,
    pub report: Option<bool>,
    pub sinks: Option<Vec<MetricSink>>,
    pub aggregator: Option<MetricAggregator>,
    pub window_size: Option<String>,
    pub filter: Option<MetricFilter>,
    pub description: Option<String>,
    pub create_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CreateMetricRuleResponse {
    rule_id: String,
}

impl Client {
    pub async fn create_metric_rule(&self, request: &MetricRuleRequest) -> Result<String, ApiError> {
        let response: CreateMetricRuleResponse = self
            .post("/v2/{project_id}/lts/log2metric/rules", request)
            .await?;
        Ok(response.rule_id)
    }

    pub async fn get_metric_rule(&self, rule_id: &str) -> Result<Option<MetricRule>, ApiError> {
        let path = format!("/v2/{{project_id}}/lts/log2metric/rules/{}", rule_id);
        match self.get(&path).await {
            Ok(rule) => Ok(Some(rule)),
            Err(e) if e.is_not_found(&[]) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn update_metric_rule(
        &self,
        rule_id: &str,
        request: &MetricRuleRequest,
    ) -> Result<(), ApiError> {
        let path = format!("/v2/{{project_id}}/lts/log2metric/rules/{}", rule_id);
        let _: serde_json::Value = self.put(&path, request).await?;
        Ok(())
    }

    pub async fn delete_metric_rule(&self, rule_id: &str) -> Result<(), ApiError> {
        let path = format!("/v2/{{project_id}}/lts/log2metric/rules/{}", rule_id);
        self.delete(&path).await
    }
}

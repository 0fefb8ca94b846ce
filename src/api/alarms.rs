//! Keywords and SQL alarm rule operations
//!
//! The two rule families share the frequency, notification and status
//! plumbing but use family-prefixed field names on the wire. Listings are
//! offset-paginated; reads walk all pages and filter by rule id.

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::error::ApiError;
use super::query::{collect_offset_pages, ApiQueryParams};

pub const ALARM_TYPE_KEYWORDS: &str = "keywords";
pub const ALARM_TYPE_SQL: &str = "sql";

pub const ALARM_STATUS_RUNNING: &str = "RUNNING";
pub const ALARM_STATUS_STOPPING: &str = "STOPPING";

const LIST_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frequency {
    #[serde(rename = "type")]
    pub frequency_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron_expr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour_of_day: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_rate_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_rate: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    pub topic_urn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_policy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRule {
    pub template_name: String,
    pub user_name: String,
    pub topics: Vec<Topic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordsRequest {
    pub keywords: String,
    pub condition: String,
    pub number: i64,
    pub log_group_id: String,
    pub log_stream_id: String,
    pub search_time_range_unit: String,
    pub search_time_range: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlRequest {
    pub sql_request_title: String,
    pub sql: String,
    pub log_group_id: String,
    pub log_stream_id: String,
    pub search_time_range_unit: String,
    pub search_time_range: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_time_range_relative: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateKeywordsAlarmRuleRequest {
    pub keywords_alarm_rule_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords_alarm_rule_description: Option<String>,
    pub keywords_requests: Vec<KeywordsRequest>,
    pub frequency: Frequency,
    pub keywords_alarm_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords_alarm_send: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_rule: Option<NotificationRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_condition_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_condition_frequency: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whether_recovery_policy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_policy: Option<i64>,
}

/// Update reuses the create fields plus the rule id; the API also expects
/// `keywords_alarm_send_code` 0 to keep the send setting unchanged
#[derive(Debug, Clone, Serialize)]
pub struct UpdateKeywordsAlarmRuleRequest {
    pub keywords_alarm_rule_id: String,
    pub keywords_alarm_send_code: i64,
    #[serde(flatten)]
    pub rule: CreateKeywordsAlarmRuleRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordsAlarmRule {
    pub keywords_alarm_rule_id: String,
    pub keywords_alarm_rule_name: Option<String>,
    pub keywords_alarm_rule_description: Option<String>,
    pub keywords_requests: Option<Vec<KeywordsRequest>>,
    pub frequency: Option<Frequency>,
    pub keywords_alarm_level: Option<String>,
    pub keywords_alarm_send: Option<bool>,
    pub domain_id: Option<String>,
    pub notification_rule: Option<NotificationRule>,
    pub trigger_condition_count: Option<i64>,
    pub trigger_condition_frequency: Option<i64>,
    pub whether_recovery_policy: Option<bool>,
    pub recovery_policy: Option<i64>,
    pub status: Option<String>,
    pub create_time: Option<i64>,
    pub update_time: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSqlAlarmRuleRequest {
    pub sql_alarm_rule_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_alarm_rule_description: Option<String>,
    pub sql_requests: Vec<SqlRequest>,
    pub frequency: Frequency,
    pub condition_expression: String,
    pub sql_alarm_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_alarm_send: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_rule: Option<NotificationRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_condition_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_condition_frequency: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whether_recovery_policy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_policy: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateSqlAlarmRuleRequest {
    pub sql_alarm_rule_id: String,
    pub sql_alarm_send_code: i64,
    #[serde(flatten)]
    pub rule: CreateSqlAlarmRuleRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SqlAlarmRule {
    pub sql_alarm_rule_id: String,
    pub sql_alarm_rule_name: Option<String>,
    pub sql_alarm_rule_description: Option<String>,
    pub sql_requests: Option<Vec<SqlRequest>>,
    pub frequency: Option<Frequency>,
    pub condition_expression: Option<String>,
    pub sql_alarm_level: Option<String>,
    pub sql_alarm_send: Option<bool>,
    pub domain_id: Option<String>,
    pub notification_rule: Option<NotificationRule>,
    pub trigger_condition_count: Option<i64>,
    pub trigger_condition_frequency: Option<i64>,
    pub whether_recovery_policy: Option<bool>,
    pub recovery_policy: Option<i64>,
    pub status: Option<String>,
    pub create_time: Option<i64>,
    pub update_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CreateKeywordsAlarmRuleResponse {
    keywords_alarm_rule_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateSqlAlarmRuleResponse {
    sql_alarm_rule_id: String,
}

#[derive(Debug, Deserialize)]
struct ListKeywordsAlarmRulesResponse {
    keywords_alarm_rules: Option<Vec<KeywordsAlarmRule>>,
}

#[derive(Debug, Deserialize)]
struct ListSqlAlarmRulesResponse {
    sql_alarm_rules: Option<Vec<SqlAlarmRule>>,
}

/// Body of the shared status toggle endpoint
#[derive(Debug, Clone, Serialize)]
pub struct AlarmRuleStatusRequest {
    pub alarm_rule_id: String,
    #[serde(rename = "type")]
    pub alarm_type: String,
    pub status: String,
}

impl Client {
    pub async fn create_keywords_alarm_rule(
        &self,
        request: &CreateKeywordsAlarmRuleRequest,
    ) -> Result<String, ApiError> {
        let response: CreateKeywordsAlarmRuleResponse = self
            .post("/v2/{project_id}/lts/alarms/keywords-alarm-rule", request)
            .await?;
        Ok(response.keywords_alarm_rule_id)
    }

    pub async fn list_keywords_alarm_rules(&self) -> Result<Vec<KeywordsAlarmRule>, ApiError> {
        collect_offset_pages(LIST_PAGE_SIZE, |offset, limit| async move {
            let query = ApiQueryParams::new()
                .add("offset", offset)
                .add("limit", limit)
                .to_query_string();
            let path = format!("/v2/{{project_id}}/lts/alarms/keywords-alarm-rule{}", query);
            let response: ListKeywordsAlarmRulesResponse = self.get(&path).await?;
            Ok(response.keywords_alarm_rules.unwrap_or_default())
        })
        .await
    }

    pub async fn get_keywords_alarm_rule(
        &self,
        rule_id: &str,
    ) -> Result<Option<KeywordsAlarmRule>, ApiError> {
        let rules = self.list_keywords_alarm_rules().await?;
        Ok(rules
            .into_iter()
            .find(|r| r.keywords_alarm_rule_id == rule_id))
    }

    pub async fn update_keywords_alarm_rule(
        &self,
        request: &UpdateKeywordsAlarmRuleRequest,
    ) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .put("/v2/{project_id}/lts/alarms/keywords-alarm-rule", request)
            .await?;
        Ok(())
    }

    pub async fn delete_keywords_alarm_rule(&self, rule_id: &str) -> Result<(), ApiError> {
        let path = format!(
            "/v2/{{project_id}}/lts/alarms/keywords-alarm-rule/{}",
            rule_id
        );
        self.delete(&path).await
    }

    pub async fn create_sql_alarm_rule(
        &self,
        request: &CreateSqlAlarmRuleRequest,
    ) -> Result<String, ApiError> {
        let response: CreateSqlAlarmRuleResponse = self
            .post("/v2/{project_id}/lts/alarms/sql-alarm-rule", request)
            .await?;
        Ok(response.sql_alarm_rule_id)
    }

    pub async fn list_sql_alarm_rules(&self) -> Result<Vec<SqlAlarmRule>, ApiError> {
        collect_offset_pages(LIST_PAGE_SIZE, |offset, limit| async move {
            let query = ApiQueryParams::new()
                .add("offset", offset)
                .add("limit", limit)
                .to_query_string();
            let path = format!("/v2/{{project_id}}/lts/alarms/sql-alarm-rule{}", query);
            let response: ListSqlAlarmRulesResponse = self.get(&path).await?;
            Ok(response.sql_alarm_rules.unwrap_or_default())
        })
        .await
    }

    pub async fn get_sql_alarm_rule(&self, rule_id: &str) -> Result<Option<SqlAlarmRule>, ApiError> {
        let rules = self.list_sql_alarm_rules().await?;
        Ok(rules.into_iter().find(|r| r.sql_alarm_rule_id == rule_id))
    }

    pub async fn update_sql_alarm_rule(
        &self,
        request: &UpdateSqlAlarmRuleRequest,
    ) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .put("/v2/{project_id}/lts/alarms/sql-alarm-rule", request)
            .await?;
        Ok(())
    }

    pub async fn delete_sql_alarm_rule(&self, rule_id: &str) -> Result<(), ApiError> {
        let path = format!("/v2/{{project_id}}/lts/alarms/sql-alarm-rule/{}", rule_id);
        self.delete(&path).await
    }

    /// Toggle a rule between RUNNING and STOPPING after creation; the
    /// create endpoints always start rules in the running state
    pub async fn update_alarm_rule_status(
        &self,
        request: &AlarmRuleStatusRequest,
    ) -> Result<(), ApiError> {
        let _: serde_json::Value = self.put("/v2/{project_id}/lts/alarms/status", request).await?;
        Ok(())
    }
}

use std::collections::HashMap;

use crate::api::alarms::{
    AlarmRuleStatusRequest, CreateSqlAlarmRuleRequest, SqlAlarmRule, SqlRequest,
    UpdateSqlAlarmRuleRequest, ALARM_STATUS_STOPPING, ALARM_TYPE_SQL,
};
use crate::api::Client;
use crate::schema::{AttributeBuilder, NestedSchemaBuilder, ResourceSchema, SchemaBuilder};
use crate::types::{Config, Diagnostics, Dynamic, State};
use crate::utils::{block_on, format_timestamp_utc};
use crate::Resource;

use super::keywords_alarm_rule::{
    expand_frequency, expand_notification_rule, flatten_frequency, flatten_notification_rule,
    frequency_schema, notification_schema,
};

/// SQL query alarm rule, triggered when the configured condition
/// expression holds over the query results
pub struct SqlAlarmRuleResource {
    client: Client,
    domain_id: Option<String>,
}

impl SqlAlarmRuleResource {
    pub fn new(client: Client, domain_id: Option<String>) -> Self {
        Self { client, domain_id }
    }

    pub fn schema_static() -> ResourceSchema {
        let requests_block = NestedSchemaBuilder::new()
            .attribute("title", AttributeBuilder::string("title").required())
            .attribute("sql", AttributeBuilder::string("sql").required())
            .attribute(
                "log_group_id",
                AttributeBuilder::string("log_group_id").required(),
            )
            .attribute(
                "log_stream_id",
                AttributeBuilder::string("log_stream_id").required(),
            )
            .attribute(
                "search_time_range_unit",
                AttributeBuilder::string("search_time_range_unit").required(),
            )
            .attribute(
                "search_time_range",
                AttributeBuilder::number("search_time_range").required(),
            )
            .attribute(
                "is_time_range_relative",
                AttributeBuilder::bool("is_time_range_relative").optional(),
            )
            .build();

        SchemaBuilder::new()
            .attribute(
                "name",
                AttributeBuilder::string("name").required().force_new(),
            )
            .attribute(
                "description",
                AttributeBuilder::string("description").optional(),
            )
            .attribute(
                "alarm_level",
                AttributeBuilder::string("alarm_level").required(),
            )
            .attribute(
                "condition_expression",
                AttributeBuilder::string("condition_expression").required(),
            )
            .attribute(
                "sql_requests",
                AttributeBuilder::block("sql_requests", requests_block).required(),
            )
            .attribute(
                "frequency",
                AttributeBuilder::block("frequency", frequency_schema())
                    .required()
                    .max_items(1),
            )
            .attribute(
                "send_notifications",
                AttributeBuilder::bool("send_notifications").optional().force_new(),
            )
            .attribute(
                "notification_rule",
                AttributeBuilder::block("notification_rule", notification_schema())
                    .optional()
                    .force_new()
                    .max_items(1),
            )
            .attribute(
                "trigger_condition_count",
                AttributeBuilder::number("trigger_condition_count").optional(),
            )
            .attribute(
                "trigger_condition_frequency",
                AttributeBuilder::number("trigger_condition_frequency").optional(),
            )
            .attribute(
                "send_recovery_notifications",
                AttributeBuilder::bool("send_recovery_notifications").optional(),
            )
            .attribute(
                "recovery_frequency",
                AttributeBuilder::number("recovery_frequency").optional(),
            )
            .attribute("status", AttributeBuilder::string("status").optional())
            .attribute("id", AttributeBuilder::string("id").computed())
            .attribute("created_at", AttributeBuilder::string("created_at").computed())
            .attribute("updated_at", AttributeBuilder::string("updated_at").computed())
            .build_resource(0)
    }

    fn build_request(&self, config: &Config) -> crate::Result<CreateSqlAlarmRuleRequest> {
        let name = config.require_string("name")?;
        let alarm_level = config.require_string("alarm_level")?;
        let condition_expression = config.require_string("condition_expression")?;
        let frequency = expand_frequency(&config.values)?;

        Ok(CreateSqlAlarmRuleRequest {
            sql_alarm_rule_name: name.to_string(),
            sql_alarm_rule_description: super::get_string(&config.values, "description"),
            sql_requests: expand_requests(&config.values),
            frequency,
            condition_expression: condition_expression.to_string(),
            sql_alarm_level: alarm_level.to_string(),
            sql_alarm_send: super::get_bool(&config.values, "send_notifications"),
            domain_id: self.domain_id.clone(),
            notification_rule: expand_notification_rule(&config.values),
            trigger_condition_count: super::get_i64(&config.values, "trigger_condition_count"),
            trigger_condition_frequency: super::get_i64(
                &config.values,
                "trigger_condition_frequency",
            ),
            whether_recovery_policy: super::get_bool(&config.values, "send_recovery_notifications"),
            recovery_policy: super::get_i64(&config.values, "recovery_frequency"),
        })
    }

    fn set_status(&self, rule_id: &str, status: &str) -> crate::Result<()> {
        let request = AlarmRuleStatusRequest {
            alarm_rule_id: rule_id.to_string(),
            alarm_type: ALARM_TYPE_SQL.to_string(),
            status: status.to_string(),
        };
        let client = self.client.clone();
        block_on(async move { client.update_alarm_rule_status(&request).await })
            .map_err(|e| format!("Failed to update alarm rule status: {}", e))?;
        Ok(())
    }
}

fn expand_requests(values: &HashMap<String, Dynamic>) -> Vec<SqlRequest> {
    super::get_block_list(values, "sql_requests")
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_map())
                .map(|block| SqlRequest {
                    sql_request_title: super::get_string(block, "title").unwrap_or_default(),
                    sql: super::get_string(block, "sql").unwrap_or_default(),
                    log_group_id: super::get_string(block, "log_group_id").unwrap_or_default(),
                    log_stream_id: super::get_string(block, "log_stream_id").unwrap_or_default(),
                    search_time_range_unit: super::get_string(block, "search_time_range_unit")
                        .unwrap_or_default(),
                    search_time_range: super::get_i64(block, "search_time_range").unwrap_or(0),
                    is_time_range_relative: super::get_bool(block, "is_time_range_relative"),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn flatten_rule(rule: &SqlAlarmRule) -> State {
    let mut values = HashMap::new();
    values.insert(
        "id".to_string(),
        Dynamic::String(rule.sql_alarm_rule_id.clone()),
    );
    if let Some(name) = &rule.sql_alarm_rule_name {
        values.insert("name".to_string(), Dynamic::String(name.clone()));
    }
    if let Some(description) = &rule.sql_alarm_rule_description {
        values.insert(
            "description".to_string(),
            Dynamic::String(description.clone()),
        );
    }
    if let Some(level) = &rule.sql_alarm_level {
        values.insert("alarm_level".to_string(), Dynamic::String(level.clone()));
    }
    if let Some(expression) = &rule.condition_expression {
        values.insert(
            "condition_expression".to_string(),
            Dynamic::String(expression.clone()),
        );
    }
    if let Some(requests) = &rule.sql_requests {
        let items = requests
            .iter()
            .map(|r| {
                let mut block = HashMap::new();
                block.insert(
                    "title".to_string(),
                    Dynamic::String(r.sql_request_title.clone()),
                );
                block.insert("sql".to_string(), Dynamic::String(r.sql.clone()));
                block.insert(
                    "log_group_id".to_string(),
                    Dynamic::String(r.log_group_id.clone()),
                );
                block.insert(
                    "log_stream_id".to_string(),
                    Dynamic::String(r.log_stream_id.clone()),
                );
                block.insert(
                    "search_time_range_unit".to_string(),
                    Dynamic::String(r.search_time_range_unit.clone()),
                );
                block.insert(
                    "search_time_range".to_string(),
                    Dynamic::Number(r.search_time_range as f64),
                );
                if let Some(relative) = r.is_time_range_relative {
                    block.insert(
                        "is_time_range_relative".to_string(),
                        Dynamic::Bool(relative),
                    );
                }
                Dynamic::Map(block)
            })
            .collect();
        values.insert("sql_requests".to_string(), Dynamic::List(items));
    }
    if let Some(frequency) = &rule.frequency {
        values.insert("frequency".to_string(), flatten_frequency(frequency));
    }
    if let Some(send) = rule.sql_alarm_send {
        values.insert("send_notifications".to_string(), Dynamic::Bool(send));
    }
    if let Some(notification) = &rule.notification_rule {
        values.insert(
            "notification_rule".to_string(),
            flatten_notification_rule(notification),
        );
    }
    if let Some(count) = rule.trigger_condition_count {
        values.insert(
            "trigger_condition_count".to_string(),
            Dynamic::Number(count as f64),
        );
    }
    if let Some(frequency) = rule.trigger_condition_frequency {
        values.insert(
            "trigger_condition_frequency".to_string(),
            Dynamic::Number(frequency as f64),
        );
    }
    if let Some(recovery) = rule.whether_recovery_policy {
        values.insert(
            "send_recovery_notifications".to_string(),
            Dynamic::Bool(recovery),
        );
    }
    if let Some(policy) = rule.recovery_policy {
        values.insert(
            "recovery_frequency".to_string(),
            Dynamic::Number(policy as f64),
        );
    }
    if let Some(status) = &rule.status {
        values.insert("status".to_string(), Dynamic::String(status.clone()));
    }
    if let Some(created) = rule.create_time.and_then(format_timestamp_utc) {
        values.insert("created_at".to_string(), Dynamic::String(created));
    }
    if let Some(updated) = rule.update_time.and_then(format_timestamp_utc) {
        values.insert("updated_at".to_string(), Dynamic::String(updated));
    }
    State { values }
}

impl Resource for SqlAlarmRuleResource {
    fn schema(&self) -> ResourceSchema {
        Self::schema_static()
    }

    fn create(&self, config: Config) -> crate::Result<(State, Diagnostics)> {
        let diags = Diagnostics::new();

        let request = self.build_request(&config)?;

        let client = self.client.clone();
        let rule_id = block_on(async move { client.create_sql_alarm_rule(&request).await })
            .map_err(|e| format!("Failed to create SQL alarm rule: {}", e))?;

        if super::get_string(&config.values, "status").as_deref() == Some(ALARM_STATUS_STOPPING) {
            self.set_status(&rule_id, ALARM_STATUS_STOPPING)?;
        }

        let mut values = config.values;
        values.insert("id".to_string(), Dynamic::String(rule_id));
        Ok((State { values }, diags))
    }

    fn read(&self, state: State) -> crate::Result<(Option<State>, Diagnostics)> {
        let diags = Diagnostics::new();

        let rule_id = state.require_string("id")?.to_string();

        let client = self.client.clone();
        let rule = block_on(async move { client.get_sql_alarm_rule(&rule_id).await })
            .map_err(|e| format!("Failed to read SQL alarm rule: {}", e))?;

        Ok((rule.as_ref().map(flatten_rule), diags))
    }

    fn update(&self, state: State, config: Config) -> crate::Result<(State, Diagnostics)> {
        let diags = Diagnostics::new();

        let rule_id = state.require_string("id")?.to_string();

        let request = UpdateSqlAlarmRuleRequest {
            sql_alarm_rule_id: rule_id.clone(),
            sql_alarm_send_code: 0,
            rule: self.build_request(&config)?,
        };

        let client = self.client.clone();
        block_on(async move { client.update_sql_alarm_rule(&request).await })
            .map_err(|e| format!("Failed to update SQL alarm rule: {}", e))?;

        let old_status = super::get_string(&state.values, "status");
        let new_status = super::get_string(&config.values, "status");
        if let Some(status) = &new_status {
            if old_status.as_deref() != Some(status) {
                self.set_status(&rule_id, status)?;
            }
        }

        let mut values = config.values;
        values.insert("id".to_string(), Dynamic::String(rule_id));
        Ok((State { values }, diags))
    }

    fn delete(&self, state: State) -> crate::Result<Diagnostics> {
        let diags = Diagnostics::new();

        let rule_id = state.require_string("id")?.to_string();

        let client = self.client.clone();
        block_on(async move { client.delete_sql_alarm_rule(&rule_id).await })
            .map_err(|e| format!("Failed to delete SQL alarm rule: {}", e))?;

        Ok(diags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn create_test_client(server: &Server) -> Client {
        Client::new(&server.url(), "test-project", "test-token", true).unwrap()
    }

    fn create_test_config() -> Config {
        let mut request = HashMap::new();
        request.insert(
            "title".to_string(),
            Dynamic::String("error count".to_string()),
        );
        request.insert(
            "sql".to_string(),
            Dynamic::String("select count(*) as cnt".to_string()),
        );
        request.insert(
            "log_group_id".to_string(),
            Dynamic::String("lg-1".to_string()),
        );
        request.insert(
            "log_stream_id".to_string(),
            Dynamic::String("ls-1".to_string()),
        );
        request.insert(
            "search_time_range_unit".to_string(),
            Dynamic::String("minute".to_string()),
        );
        request.insert("search_time_range".to_string(), Dynamic::Number(15.0));

        let mut frequency = HashMap::new();
        frequency.insert(
            "type".to_string(),
            Dynamic::String("FIXED_RATE".to_string()),
        );
        frequency.insert(
            "fixed_rate_unit".to_string(),
            Dynamic::String("minute".to_string()),
        );
        frequency.insert("fixed_rate".to_string(), Dynamic::Number(15.0));

        let mut values = HashMap::new();
        values.insert(
            "name".to_string(),
            Dynamic::String("high-error-rate".to_string()),
        );
        values.insert(
            "alarm_level".to_string(),
            Dynamic::String("Critical".to_string()),
        );
        values.insert(
            "condition_expression".to_string(),
            Dynamic::String("cnt > 100".to_string()),
        );
        values.insert(
            "sql_requests".to_string(),
            Dynamic::List(vec![Dynamic::Map(request)]),
        );
        values.insert(
            "frequency".to_string(),
            Dynamic::List(vec![Dynamic::Map(frequency)]),
        );
        Config { values }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_creates_sql_rule() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/test-project/lts/alarms/sql-alarm-rule")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "sql_alarm_rule_name": "high-error-rate",
                "condition_expression": "cnt > 100",
                "sql_requests": [{"sql_request_title": "error count"}],
                "frequency": {"type": "FIXED_RATE", "fixed_rate": 15}
            })))
            .with_status(201)
            .with_body(r#"{"sql_alarm_rule_id":"sr-1"}"#)
            .create_async()
            .await;

        let resource = SqlAlarmRuleResource::new(create_test_client(&server), None);
        let (state, diags) = resource.create(create_test_config()).unwrap();

        mock.assert_async().await;
        assert!(diags.errors.is_empty());
        assert_eq!(state.values["id"].as_string(), Some("sr-1"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_read_walks_pages_until_short_page() {
        let mut server = Server::new_async().await;
        // a full first page forces a second request
        let mut first_page = Vec::new();
        for i in 0..100 {
            first_page.push(serde_json::json!({
                "sql_alarm_rule_id": format!("sr-other-{}", i)
            }));
        }
        let _page1 = server
            .mock("GET", "/v2/test-project/lts/alarms/sql-alarm-rule?offset=0&limit=100")
            .with_status(200)
            .with_body(
                serde_json::json!({"sql_alarm_rules": first_page}).to_string(),
            )
            .create_async()
            .await;
        let page2 = server
            .mock("GET", "/v2/test-project/lts/alarms/sql-alarm-rule?offset=100&limit=100")
            .with_status(200)
            .with_body(
                r#"{"sql_alarm_rules":[{"sql_alarm_rule_id":"sr-1","sql_alarm_rule_name":"high-error-rate","status":"RUNNING"}]}"#,
            )
            .create_async()
            .await;

        let resource = SqlAlarmRuleResource::new(create_test_client(&server), None);
        let mut values = HashMap::new();
        values.insert("id".to_string(), Dynamic::String("sr-1".to_string()));

        let (state, _) = resource.read(State { values }).unwrap();
        page2.assert_async().await;
        let state = state.unwrap();
        assert_eq!(state.values["name"].as_string(), Some("high-error-rate"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_update_toggles_status_on_change() {
        let mut server = Server::new_async().await;
        let _update = server
            .mock("PUT", "/v2/test-project/lts/alarms/sql-alarm-rule")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        let status = server
            .mock("PUT", "/v2/test-project/lts/alarms/status")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "alarm_rule_id": "sr-1",
                "type": "sql",
                "status": "STOPPING"
            })))
            .with_status(200)
            .create_async()
            .await;

        let resource = SqlAlarmRuleResource::new(create_test_client(&server), None);
        let mut state_values = HashMap::new();
        state_values.insert("id".to_string(), Dynamic::String("sr-1".to_string()));
        state_values.insert(
            "status".to_string(),
            Dynamic::String("RUNNING".to_string()),
        );
        let mut config = create_test_config();
        config
            .values
            .insert("status".to_string(), Dynamic::String("STOPPING".to_string()));

        let result = resource.update(
            State {
                values: state_values,
            },
            config,
        );
        assert!(result.is_ok());
        status.assert_async().await;
    }
}

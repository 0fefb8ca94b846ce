use std::collections::HashMap;

use crate::api::alarms::{
    AlarmRuleStatusRequest, CreateKeywordsAlarmRuleRequest, Frequency, KeywordsAlarmRule,
    KeywordsRequest, NotificationRule, Topic, UpdateKeywordsAlarmRuleRequest,
    ALARM_STATUS_STOPPING, ALARM_TYPE_KEYWORDS,
};
use crate::api::Client;
use crate::schema::{
    AttributeBuilder, NestedSchema, NestedSchemaBuilder, ResourceSchema, SchemaBuilder,
};
use crate::types::{Config, Diagnostics, Dynamic, State};
use crate::utils::{block_on, format_timestamp_utc};
use crate::Resource;

/// Keyword match alarm rule. Rules are created in the running state; a
/// STOPPING status in the configuration is applied with a follow-up call
/// to the status endpoint.
pub struct KeywordsAlarmRuleResource {
    client: Client,
    domain_id: Option<String>,
}

impl KeywordsAlarmRuleResource {
    pub fn new(client: Client, domain_id: Option<String>) -> Self {
        Self { client, domain_id }
    }

    pub fn schema_static() -> ResourceSchema {
        let requests_block = NestedSchemaBuilder::new()
            .attribute("keywords", AttributeBuilder::string("keywords").required())
            .attribute(
                "condition",
                AttributeBuilder::string("condition")
                    .required()
                    .description(">, <, >= or <="),
            )
            .attribute("number", AttributeBuilder::number("number").required())
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
                AttributeBuilder::string("alarm_level")
                    .required()
                    .description("Info, Minor, Major or Critical"),
            )
            .attribute(
                "keywords_requests",
                AttributeBuilder::block("keywords_requests", requests_block).required(),
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

    fn build_request(&self, config: &Config) -> crate::Result<CreateKeywordsAlarmRuleRequest> {
        let name = config.require_string("name")?;
        let alarm_level = config.require_string("alarm_level")?;
        let frequency = expand_frequency(&config.values)?;

        Ok(CreateKeywordsAlarmRuleRequest {
            keywords_alarm_rule_name: name.to_string(),
            keywords_alarm_rule_description: super::get_string(&config.values, "description"),
            keywords_requests: expand_requests(&config.values),
            frequency,
            keywords_alarm_level: alarm_level.to_string(),
            keywords_alarm_send: super::get_bool(&config.values, "send_notifications"),
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
            alarm_type: ALARM_TYPE_KEYWORDS.to_string(),
            status: status.to_string(),
        };
        let client = self.client.clone();
        block_on(async move { client.update_alarm_rule_status(&request).await })
            .map_err(|e| format!("Failed to update alarm rule status: {}", e))?;
        Ok(())
    }
}

pub(super) fn frequency_schema() -> NestedSchema {
    NestedSchemaBuilder::new()
        .attribute(
            "type",
            AttributeBuilder::string("type")
                .required()
                .description("CRON, HOURLY, DAILY, WEEKLY or FIXED_RATE"),
        )
        .attribute("cron_expression", AttributeBuilder::string("cron_expression").optional())
        .attribute("hour_of_day", AttributeBuilder::number("hour_of_day").optional())
        .attribute("day_of_week", AttributeBuilder::number("day_of_week").optional())
        .attribute(
            "fixed_rate_unit",
            AttributeBuilder::string("fixed_rate_unit").optional(),
        )
        .attribute("fixed_rate", AttributeBuilder::number("fixed_rate").optional())
        .build()
}

pub(super) fn notification_schema() -> NestedSchema {
    let topics_block = NestedSchemaBuilder::new()
        .attribute("name", AttributeBuilder::string("name").required())
        .attribute("topic_urn", AttributeBuilder::string("topic_urn").required())
        .attribute(
            "display_name",
            AttributeBuilder::string("display_name").optional(),
        )
        .attribute(
            "push_policy",
            AttributeBuilder::string("push_policy").optional(),
        )
        .build();
    NestedSchemaBuilder::new()
        .attribute(
            "template_name",
            AttributeBuilder::string("template_name").required(),
        )
        .attribute("user_name", AttributeBuilder::string("user_name").required())
        .attribute(
            "topics",
            AttributeBuilder::block("topics", topics_block).required(),
        )
        .attribute("timezone", AttributeBuilder::string("timezone").optional())
        .attribute("language", AttributeBuilder::string("language").optional())
        .build()
}

pub(super) fn expand_frequency(values: &HashMap<String, Dynamic>) -> crate::Result<Frequency> {
    let block = super::get_block(values, "frequency").ok_or("frequency is required")?;
    let frequency_type =
        super::get_string(block, "type").ok_or("frequency type is required")?;
    Ok(Frequency {
        frequency_type,
        cron_expr: super::get_string(block, "cron_expression"),
        hour_of_day: super::get_i64(block, "hour_of_day"),
        day_of_week: super::get_i64(block, "day_of_week"),
        fixed_rate_unit: super::get_string(block, "fixed_rate_unit"),
        fixed_rate: super::get_i64(block, "fixed_rate"),
    })
}

pub(super) fn expand_notification_rule(
    values: &HashMap<String, Dynamic>,
) -> Option<NotificationRule> {
    super::get_block(values, "notification_rule").map(|block| NotificationRule {
        template_name: super::get_string(block, "template_name").unwrap_or_default(),
        user_name: super::get_string(block, "user_name").unwrap_or_default(),
        topics: super::get_block_list(block, "topics")
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_map())
                    .map(|topic| Topic {
                        name: super::get_string(topic, "name").unwrap_or_default(),
                        topic_urn: super::get_string(topic, "topic_urn").unwrap_or_default(),
                        display_name: super::get_string(topic, "display_name"),
                        push_policy: super::get_string(topic, "push_policy"),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        timezone: super::get_string(block, "timezone"),
        language: super::get_string(block, "language"),
    })
}

pub(super) fn flatten_frequency(frequency: &Frequency) -> Dynamic {
    let mut block = HashMap::new();
    block.insert(
        "type".to_string(),
        Dynamic::String(frequency.frequency_type.clone()),
    );
    if let Some(expr) = &frequency.cron_expr {
        block.insert("cron_expression".to_string(), Dynamic::String(expr.clone()));
    }
    if let Some(hour) = frequency.hour_of_day {
        block.insert("hour_of_day".to_string(), Dynamic::Number(hour as f64));
    }
    if let Some(day) = frequency.day_of_week {
        block.insert("day_of_week".to_string(), Dynamic::Number(day as f64));
    }
    if let Some(unit) = &frequency.fixed_rate_unit {
        block.insert("fixed_rate_unit".to_string(), Dynamic::String(unit.clone()));
    }
    if let Some(rate) = frequency.fixed_rate {
        block.insert("fixed_rate".to_string(), Dynamic::Number(rate as f64));
    }
    Dynamic::List(vec![Dynamic::Map(block)])
}

pub(super) fn flatten_notification_rule(rule: &NotificationRule) -> Dynamic {
    let mut block = HashMap::new();
    block.insert(
        "template_name".to_string(),
        Dynamic::String(rule.template_name.clone()),
    );
    block.insert(
        "user_name".to_string(),
        Dynamic::String(rule.user_name.clone()),
    );
    let topics = rule
        .topics
        .iter()
        .map(|topic| {
            let mut t = HashMap::new();
            t.insert("name".to_string(), Dynamic::String(topic.name.clone()));
            t.insert(
                "topic_urn".to_string(),
                Dynamic::String(topic.topic_urn.clone()),
            );
            if let Some(display_name) = &topic.display_name {
                t.insert(
                    "display_name".to_string(),
                    Dynamic::String(display_name.clone()),
                );
            }
            if let Some(policy) = &topic.push_policy {
                t.insert("push_policy".to_string(), Dynamic::String(policy.clone()));
            }
            Dynamic::Map(t)
        })
        .collect();
    block.insert("topics".to_string(), Dynamic::List(topics));
    if let Some(timezone) = &rule.timezone {
        block.insert("timezone".to_string(), Dynamic::String(timezone.clone()));
    }
    if let Some(language) = &rule.language {
        block.insert("language".to_string(), Dynamic::String(language.clone()));
    }
    Dynamic::List(vec![Dynamic::Map(block)])
}

fn expand_requests(values: &HashMap<String, Dynamic>) -> Vec<KeywordsRequest> {
    super::get_block_list(values, "keywords_requests")
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_map())
                .map(|block| KeywordsRequest {
                    keywords: super::get_string(block, "keywords").unwrap_or_default(),
                    condition: super::get_string(block, "condition").unwrap_or_default(),
                    number: super::get_i64(block, "number").unwrap_or(0),
                    log_group_id: super::get_string(block, "log_group_id").unwrap_or_default(),
                    log_stream_id: super::get_string(block, "log_stream_id").unwrap_or_default(),
                    search_time_range_unit: super::get_string(block, "search_time_range_unit")
                        .unwrap_or_default(),
                    search_time_range: super::get_i64(block, "search_time_range").unwrap_or(0),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn flatten_rule(rule: &KeywordsAlarmRule) -> State {
    let mut values = HashMap::new();
    values.insert(
        "id".to_string(),
        Dynamic::String(rule.keywords_alarm_rule_id.clone()),
    );
    if let Some(name) = &rule.keywords_alarm_rule_name {
        values.insert("name".to_string(), Dynamic::String(name.clone()));
    }
    if let Some(description) = &rule.keywords_alarm_rule_description {
        values.insert(
            "description".to_string(),
            Dynamic::String(description.clone()),
        );
    }
    if let Some(level) = &rule.keywords_alarm_level {
        values.insert("alarm_level".to_string(), Dynamic::String(level.clone()));
    }
    if let Some(requests) = &rule.keywords_requests {
        let items = requests
            .iter()
            .map(|r| {
                let mut block = HashMap::new();
                block.insert("keywords".to_string(), Dynamic::String(r.keywords.clone()));
                block.insert(
                    "condition".to_string(),
                    Dynamic::String(r.condition.clone()),
                );
                block.insert("number".to_string(), Dynamic::Number(r.number as f64));
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
                Dynamic::Map(block)
            })
            .collect();
        values.insert("keywords_requests".to_string(), Dynamic::List(items));
    }
    if let Some(frequency) = &rule.frequency {
        values.insert("frequency".to_string(), flatten_frequency(frequency));
    }
    if let Some(send) = rule.keywords_alarm_send {
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

impl Resource for KeywordsAlarmRuleResource {
    fn schema(&self) -> ResourceSchema {
        Self::schema_static()
    }

    fn create(&self, config: Config) -> crate::Result<(State, Diagnostics)> {
        let diags = Diagnostics::new();

        let request = self.build_request(&config)?;

        let client = self.client.clone();
        let rule_id = block_on(async move { client.create_keywords_alarm_rule(&request).await })
            .map_err(|e| format!("Failed to create keywords alarm rule: {}", e))?;

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
        let rule = block_on(async move { client.get_keywords_alarm_rule(&rule_id).await })
            .map_err(|e| format!("Failed to read keywords alarm rule: {}", e))?;

        Ok((rule.as_ref().map(flatten_rule), diags))
    }

    fn update(&self, state: State, config: Config) -> crate::Result<(State, Diagnostics)> {
        let diags = Diagnostics::new();

        let rule_id = state.require_string("id")?.to_string();

        let request = UpdateKeywordsAlarmRuleRequest {
            keywords_alarm_rule_id: rule_id.clone(),
            keywords_alarm_send_code: 0,
            rule: self.build_request(&config)?,
        };

        let client = self.client.clone();
        block_on(async move { client.update_keywords_alarm_rule(&request).await })
            .map_err(|e| format!("Failed to update keywords alarm rule: {}", e))?;

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
        block_on(async move { client.delete_keywords_alarm_rule(&rule_id).await })
            .map_err(|e| format!("Failed to delete keywords alarm rule: {}", e))?;

        Ok(diags)
    }
}

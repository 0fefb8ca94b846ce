use std::collections::HashMap;

use crate::api::metric_rules::{
    MetricAggregator, MetricFilter, MetricFilterCondition, MetricFilterGroup, MetricRule,
    MetricRuleRequest, MetricSampler, MetricSink,
};
use crate::api::Client;
use crate::schema::{
    AttributeBuilder, AttributeType, NestedSchemaBuilder, ResourceSchema, SchemaBuilder,
};
use crate::types::{Config, Diagnostics, Dynamic, State};
use crate::utils::{block_on, format_timestamp_rfc3339};
use crate::{ProviderError, Resource};

/// Log-to-metric rule. Sampler, aggregator and the optional filter arrive
/// as nested blocks; the whole body is resent on update.
pub struct MetricRuleResource {
    client: Client,
    domain_id: Option<String>,
}

impl MetricRuleResource {
    pub fn new(client: Client, domain_id: Option<String>) -> Self {
        Self { client, domain_id }
    }

    pub fn schema_static() -> ResourceSchema {
        let sampler_block = NestedSchemaBuilder::new()
            .attribute(
                "type",
                AttributeBuilder::string("type")
                    .required()
                    .description("random or none"),
            )
            .attribute("ratio", AttributeBuilder::string("ratio").required())
            .build();
        let sinks_block = NestedSchemaBuilder::new()
            .attribute("type", AttributeBuilder::string("type").required())
            .attribute(
                "metric_name",
                AttributeBuilder::string("metric_name").required(),
            )
            .attribute("name", AttributeBuilder::string("name").optional())
            .attribute(
                "instance_id",
                AttributeBuilder::string("instance_id").optional(),
            )
            .build();
        let aggregator_block = NestedSchemaBuilder::new()
            .attribute(
                "type",
                AttributeBuilder::string("type")
                    .required()
                    .description("count, sum, avg, min, max or countKeyword"),
            )
            .attribute("field", AttributeBuilder::string("field").required())
            .attribute(
                "group_by",
                AttributeBuilder::list("group_by", AttributeType::String).optional(),
            )
            .attribute("keyword", AttributeBuilder::string("keyword").optional())
            .build();
        let condition_block = NestedSchemaBuilder::new()
            .attribute("key", AttributeBuilder::string("key").required())
            .attribute(
                "type",
                AttributeBuilder::string("type")
                    .required()
                    .description("fieldEqual, fieldExist, between and the like"),
            )
            .attribute("value", AttributeBuilder::string("value").optional())
            .attribute("lower", AttributeBuilder::string("lower").optional())
            .attribute("upper", AttributeBuilder::string("upper").optional())
            .build();
        let group_block = NestedSchemaBuilder::new()
            .attribute("type", AttributeBuilder::string("type").optional())
            .attribute(
                "filters",
                AttributeBuilder::block("filters", condition_block).optional(),
            )
            .build();
        let filter_block = NestedSchemaBuilder::new()
            .attribute(
                "type",
                AttributeBuilder::string("type")
                    .optional()
                    .description("Logical operator joining the filter groups"),
            )
            .attribute(
                "filters",
                AttributeBuilder::block("filters", group_block).optional(),
            )
            .build();

        SchemaBuilder::new()
            .attribute("name", AttributeBuilder::string("name").required())
            .attribute("status", AttributeBuilder::string("status").required())
            .attribute(
                "log_group_id",
                AttributeBuilder::string("log_group_id").required(),
            )
            .attribute(
                "log_stream_id",
                AttributeBuilder::string("log_stream_id").required(),
            )
            .attribute(
                "sampler",
                AttributeBuilder::block("sampler", sampler_block)
                    .required()
                    .max_items(1),
            )
            .attribute(
                "sinks",
                AttributeBuilder::block("sinks", sinks_block).required(),
            )
            .attribute(
                "aggregator",
                AttributeBuilder::block("aggregator", aggregator_block)
                    .required()
                    .max_items(1),
            )
            .attribute(
                "window_size",
                AttributeBuilder::string("window_size").required(),
            )
            .attribute("report", AttributeBuilder::bool("report").optional())
            .attribute(
                "filter",
                AttributeBuilder::block("filter", filter_block)
                    .optional()
                    .max_items(1),
            )
            .attribute(
                "description",
                AttributeBuilder::string("description").optional(),
            )
            .attribute("id", AttributeBuilder::string("id").computed())
            .attribute("created_at", AttributeBuilder::string("created_at").computed())
            .build_resource(0)
    }

    fn build_request(&self, config: &Config) -> crate::Result<MetricRuleRequest> {
        Ok(MetricRuleRequest {
            domain_id: self.domain_id.clone(),
            project_id: self.client.project_id().to_string(),
            name: config.require_string("name")?.to_string(),
            status: config.require_string("status")?.to_string(),
            log_group_id: config.require_string("log_group_id")?.to_string(),
            log_stream_id: config.require_string("log_stream_id")?.to_string(),
            sampler: expand_sampler(&config.values)?,
            report: super::get_bool(&config.values, "report"),
            sinks: expand_sinks(&config.values)?,
            aggregator: expand_aggregator(&config.values)?,
            window_size: config.require_string("window_size")?.to_string(),
            filter: expand_filter(&config.values),
            description: super::get_string(&config.values, "description"),
        })
    }
}

fn expand_sampler(values: &HashMap<String, Dynamic>) -> crate::Result<MetricSampler> {
    let block = super::get_block(values, "sampler").ok_or_else(|| {
        ProviderError::InvalidConfiguration("a sampler block is required".to_string())
    })?;
    Ok(MetricSampler {
        sampler_type: super::get_string(block, "type").ok_or("sampler type is required")?,
        ratio: super::get_string(block, "ratio").ok_or("sampler ratio is required")?,
    })
}

fn expand_sinks(values: &HashMap<String, Dynamic>) -> crate::Result<Vec<MetricSink>> {
    let items = super::get_block_list(values, "sinks").ok_or_else(|| {
        ProviderError::InvalidConfiguration("at least one sinks block is required".to_string())
    })?;
    items
        .iter()
        .filter_map(|v| v.as_map())
        .map(|block| {
            Ok(MetricSink {
                sink_type: super::get_string(block, "type").ok_or("sink type is required")?,
                metric_name: super::get_string(block, "metric_name")
                    .ok_or("sink metric_name is required")?,
                name: super::get_string(block, "name"),
                instance_id: super::get_string(block, "instance_id"),
            })
        })
        .collect()
}

fn expand_aggregator(values: &HashMap<String, Dynamic>) -> crate::Result<MetricAggregator> {
    let block = super::get_block(values, "aggregator").ok_or_else(|| {
        ProviderError::InvalidConfiguration("an aggregator block is required".to_string())
    })?;
    Ok(MetricAggregator {
        aggregator_type: super::get_string(block, "type").ok_or("aggregator type is required")?,
        field: super::get_string(block, "field").ok_or("aggregator field is required")?,
        group_by: super::get_string_list(block, "group_by"),
        keyword: super::get_string(block, "keyword"),
    })
}

fn expand_filter(values: &HashMap<String, Dynamic>) -> Option<MetricFilter> {
    let block = super::get_block(values, "filter")?;
    let groups = super::get_block_list(block, "filters").map(|items| {
        items
            .iter()
            .filter_map(|v| v.as_map())
            .filter_map(expand_filter_group)
            .collect()
    });
    Some(MetricFilter {
        filter_type: super::get_string(block, "type"),
        filters: groups,
    })
}

/// Groups without conditions are dropped, the API rejects them
fn expand_filter_group(group: &HashMap<String, Dynamic>) -> Option<MetricFilterGroup> {
    let conditions: Vec<MetricFilterCondition> = super::get_block_list(group, "filters")?
        .iter()
        .filter_map(|v| v.as_map())
        .map(|block| MetricFilterCondition {
            key: super::get_string(block, "key").unwrap_or_default(),
            condition_type: super::get_string(block, "type").unwrap_or_default(),
            value: super::get_string(block, "value"),
            lower: super::get_string(block, "lower"),
            upper: super::get_string(block, "upper"),
        })
        .collect();
    if conditions.is_empty() {
        return None;
    }
    Some(MetricFilterGroup {
        group_type: super::get_string(group, "type"),
        filters: Some(conditions),
    })
}

fn flatten_filter(filter: &MetricFilter) -> Dynamic {
    let mut block = HashMap::new();
    if let Some(filter_type) = &filter.filter_type {
        block.insert("type".to_string(), Dynamic::String(filter_type.clone()));
    }
    if let Some(groups) = &filter.filters {
        let items = groups
            .iter()
            .map(|group| {
                let mut entry = HashMap::new();
                if let Some(group_type) = &group.group_type {
                    entry.insert("type".to_string(), Dynamic::String(group_type.clone()));
                }
                if let Some(conditions) = &group.filters {
                    let conditions = conditions
                        .iter()
                        .map(|c| {
                            let mut condition = HashMap::new();
                            condition.insert("key".to_string(), Dynamic::String(c.key.clone()));
                            condition.insert(
                                "type".to_string(),
                                Dynamic::String(c.condition_type.clone()),
                            );
                            let optionals =
                                [("value", &c.value), ("lower", &c.lower), ("upper", &c.upper)];
                            for (name, value) in optionals {
                                if let Some(value) = value {
                                    condition.insert(
                                        name.to_string(),
                                        Dynamic::String(value.clone()),
                                    );
                                }
                            }
                            Dynamic::Map(condition)
                        })
                        .collect();
                    entry.insert("filters".to_string(), Dynamic::List(conditions));
                }
                Dynamic::Map(entry)
            })
            .collect();
        block.insert("filters".to_string(), Dynamic::List(items));
    }
    Dynamic::List(vec![Dynamic::Map(block)])
}

fn flatten_rule(rule: &MetricRule, rule_id: &str) -> State {
    let mut values = HashMap::new();
    values.insert("id".to_string(), Dynamic::String(rule_id.to_string()));
    let strings = [
        ("name", &rule.name),
        ("status", &rule.status),
        ("log_group_id", &rule.log_group_id),
        ("log_stream_id", &rule.log_stream_id),
        ("window_size", &rule.window_size),
        ("description", &rule.description),
    ];
    for (name, value) in strings {
        if let Some(value) = value {
            values.insert(name.to_string(), Dynamic::String(value.clone()));
        }
    }
    if let Some(report) = rule.report {
        values.insert("report".to_string(), Dynamic::Bool(report));
    }
    if let Some(sampler) = &rule.sampler {
        let mut block = HashMap::new();
        block.insert(
            "type".to_string(),
            Dynamic::String(sampler.sampler_type.clone()),
        );
        block.insert("ratio".to_string(), Dynamic::String(sampler.ratio.clone()));
        values.insert(
            "sampler".to_string(),
            Dynamic::List(vec![Dynamic::Map(block)]),
        );
    }
    if let Some(sinks) = &rule.sinks {
        let items = sinks
            .iter()
            .map(|sink| {
                let mut block = HashMap::new();
                block.insert("type".to_string(), Dynamic::String(sink.sink_type.clone()));
                block.insert(
                    "metric_name".to_string(),
                    Dynamic::String(sink.metric_name.clone()),
                );
                if let Some(name) = &sink.name {
                    block.insert("name".to_string(), Dynamic::String(name.clone()));
                }
                if let Some(instance_id) = &sink.instance_id {
                    block.insert(
                        "instance_id".to_string(),
                        Dynamic::String(instance_id.clone()),
                    );
                }
                Dynamic::Map(block)
            })
            .collect();
        values.insert("sinks".to_string(), Dynamic::List(items));
    }
    if let Some(aggregator) = &rule.aggregator {
        let mut block = HashMap::new();
        block.insert(
            "type".to_string(),
            Dynamic::String(aggregator.aggregator_type.clone()),
        );
        block.insert(
            "field".to_string(),
            Dynamic::String(aggregator.field.clone()),
        );
        if let Some(group_by) = &aggregator.group_by {
            block.insert("group_by".to_string(), super::string_list(group_by));
        }
        if let Some(keyword) = &aggregator.keyword {
            block.insert("keyword".to_string(), Dynamic::String(keyword.clone()));
        }
        values.insert(
            "aggregator".to_string(),
            Dynamic::List(vec![Dynamic::Map(block)]),
        );
    }
    if let Some(filter) = &rule.filter {
        values.insert("filter".to_string(), flatten_filter(filter));
    }
    if let Some(created) = rule.create_time.and_then(format_timestamp_rfc3339) {
        values.insert("created_at".to_string(), Dynamic::String(created));
    }
    State { values }
}

impl Resource for MetricRuleResource {
    fn schema(&self) -> ResourceSchema {
        Self::schema_static()
    }

    fn create(&self, config: Config) -> crate::Result<(State, Diagnostics)> {
        let diags = Diagnostics::new();

        let request = self.build_request(&config)?;

        let client = self.client.clone();
        let rule_id = block_on(async move { client.create_metric_rule(&request).await })
            .map_err(|e| format!("Failed to create metric rule: {}", e))?;

        let mut values = config.values;
        values.insert("id".to_string(), Dynamic::String(rule_id));
        Ok((State { values }, diags))
    }

    fn read(&self, state: State) -> crate::Result<(Option<State>, Diagnostics)> {
        let diags = Diagnostics::new();

        let rule_id = state.require_string("id")?.to_string();

        let client = self.client.clone();
        let id = rule_id.clone();
        let rule = block_on(async move { client.get_metric_rule(&id).await })
            .map_err(|e| format!("Failed to read metric rule: {}", e))?;

        Ok((rule.map(|rule| flatten_rule(&rule, &rule_id)), diags))
    }

    fn update(&self, state: State, config: Config) -> crate::Result<(State, Diagnostics)> {
        let diags = Diagnostics::new();

        let rule_id = state.require_string("id")?.to_string();
        let request = self.build_request(&config)?;

        let client = self.client.clone();
        let id = rule_id.clone();
        block_on(async move { client.update_metric_rule(&id, &request).await })
            .map_err(|e| format!("Failed to update metric rule: {}", e))?;

        let mut values = config.values;
        values.insert("id".to_string(), Dynamic::String(rule_id));
        if let Some(created) = state.values.get("created_at") {
            values.insert("created_at".to_string(), created.clone());
        }
        Ok((State { values }, diags))
    }

    fn delete(&self, state: State) -> crate::Result<Diagnostics> {
        let diags = Diagnostics::new();

        let rule_id = state.require_string("id")?.to_string();

        let client = self.client.clone();
        block_on(async move { client.delete_metric_rule(&rule_id).await })
            .map_err(|e| format!("Failed to delete metric rule: {}", e))?;

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
        let mut sampler = HashMap::new();
        sampler.insert("type".to_string(), Dynamic::String("random".to_string()));
        sampler.insert("ratio".to_string(), Dynamic::String("0.5".to_string()));

        let mut sink = HashMap::new();
        sink.insert("type".to_string(), Dynamic::String("aom".to_string()));
        sink.insert(
            "metric_name".to_string(),
            Dynamic::String("error_count".to_string()),
        );
        sink.insert(
            "instance_id".to_string(),
            Dynamic::String("prom-1".to_string()),
        );

        let mut aggregator = HashMap::new();
        aggregator.insert("type".to_string(), Dynamic::String("count".to_string()));
        aggregator.insert("field".to_string(), Dynamic::String("level".to_string()));

        let mut values = HashMap::new();
        values.insert("name".to_string(), Dynamic::String("errors".to_string()));
        values.insert("status".to_string(), Dynamic::String("RUNNING".to_string()));
        values.insert(
            "log_group_id".to_string(),
            Dynamic::String("lg-1".to_string()),
        );
        values.insert(
            "log_stream_id".to_string(),
            Dynamic::String("ls-1".to_string()),
        );
        values.insert(
            "sampler".to_string(),
            Dynamic::List(vec![Dynamic::Map(sampler)]),
        );
        values.insert("sinks".to_string(), Dynamic::List(vec![Dynamic::Map(sink)]));
        values.insert(
            "aggregator".to_string(),
            Dynamic::List(vec![Dynamic::Map(aggregator)]),
        );
        values.insert("window_size".to_string(), Dynamic::String("1m".to_string()));
        Config { values }
    }

    fn state_with_id(id: &str) -> State {
        let mut values = HashMap::new();
        values.insert("id".to_string(), Dynamic::String(id.to_string()));
        State { values }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_creates_metric_rule() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/test-project/lts/log2metric/rules")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "project_id": "test-project",
                "name": "errors",
                "status": "RUNNING",
                "sampler": {"type": "random", "ratio": "0.5"},
                "sinks": [{"type": "aom", "metric_name": "error_count", "instance": "prom-1"}],
                "aggregator": {"type": "count", "field": "level"},
                "window_size": "1m"
            })))
            .with_status(201)
            .with_body(r#"{"rule_id":"mr-1"}"#)
            .create_async()
            .await;

        let resource = MetricRuleResource::new(create_test_client(&server), None);
        let (state, diags) = resource.create(create_test_config()).unwrap();

        mock.assert_async().await;
        assert!(diags.errors.is_empty());
        assert_eq!(state.values["id"].as_string(), Some("mr-1"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_reads_rule_detail() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v2/test-project/lts/log2metric/rules/mr-1")
            .with_status(200)
            .with_body(
                r#"{
                    "name":"errors",
                    "status":"RUNNING",
                    "log_group_id":"lg-1",
                    "log_stream_id":"ls-1",
                    "sampler":{"type":"random","ratio":"0.5"},
                    "sinks":[{"type":"aom","metric_name":"error_count","instance":"prom-1"}],
                    "aggregator":{"type":"count","field":"level","group_by":["host"]},
                    "window_size":"1m",
                    "create_time":1700000000000
                }"#,
            )
            .create_async()
            .await;

        let resource = MetricRuleResource::new(create_test_client(&server), None);
        let (state, _) = resource.read(state_with_id("mr-1")).unwrap();
        let state = state.unwrap();

        assert_eq!(state.values["name"].as_string(), Some("errors"));
        assert_eq!(
            state.values["created_at"].as_string(),
            Some("2023-11-14T22:13:20Z")
        );
        let sink = state.values["sinks"].as_list().unwrap()[0].as_map().unwrap();
        assert_eq!(sink["instance_id"].as_string(), Some("prom-1"));
        let aggregator = state.values["aggregator"].as_list().unwrap()[0]
            .as_map()
            .unwrap();
        assert_eq!(
            aggregator["group_by"].as_list().unwrap()[0].as_string(),
            Some("host")
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_read_reports_gone_rule_as_none() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v2/test-project/lts/log2metric/rules/mr-1")
            .with_status(404)
            .with_body(r#"{"error_code":"LTS.0208","error_msg":"rule not found"}"#)
            .create_async()
            .await;

        let resource = MetricRuleResource::new(create_test_client(&server), None);
        let (state, _) = resource.read(state_with_id("mr-1")).unwrap();
        assert!(state.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_create_requires_sampler_block() {
        let server = Server::new_async().await;
        let resource = MetricRuleResource::new(create_test_client(&server), None);

        let mut config = create_test_config();
        config.values.remove("sampler");

        let err = resource.create(config).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidConfiguration(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_deletes_rule() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/v2/test-project/lts/log2metric/rules/mr-1")
            .with_status(200)
            .create_async()
            .await;

        let resource = MetricRuleResource::new(create_test_client(&server), None);
        let diags = resource.delete(state_with_id("mr-1")).unwrap();
        mock.assert_async().await;
        assert!(diags.errors.is_empty());
    }

    #[test]
    fn filter_groups_without_conditions_are_dropped() {
        let mut condition = HashMap::new();
        condition.insert("key".to_string(), Dynamic::String("level".to_string()));
        condition.insert("type".to_string(), Dynamic::String("fieldEqual".to_string()));
        condition.insert("value".to_string(), Dynamic::String("ERROR".to_string()));

        let mut full_group = HashMap::new();
        full_group.insert("type".to_string(), Dynamic::String("and".to_string()));
        full_group.insert(
            "filters".to_string(),
            Dynamic::List(vec![Dynamic::Map(condition)]),
        );
        let mut empty_group = HashMap::new();
        empty_group.insert("type".to_string(), Dynamic::String("or".to_string()));
        empty_group.insert("filters".to_string(), Dynamic::List(vec![]));

        let mut filter = HashMap::new();
        filter.insert("type".to_string(), Dynamic::String("or".to_string()));
        filter.insert(
            "filters".to_string(),
            Dynamic::List(vec![Dynamic::Map(full_group), Dynamic::Map(empty_group)]),
        );
        let mut values = HashMap::new();
        values.insert(
            "filter".to_string(),
            Dynamic::List(vec![Dynamic::Map(filter)]),
        );

        let expanded = expand_filter(&values).unwrap();
        assert_eq!(expanded.filter_type.as_deref(), Some("or"));
        let groups = expanded.filters.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].filters.as_ref().unwrap()[0].key, "level");
    }
}

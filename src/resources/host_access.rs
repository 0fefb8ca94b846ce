use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::api::access::{
    AccessConfigDetail, AccessLogInfo, CreateAccessConfigRequest, DemoField, HostGroupInfo,
    LogFormat, LogFormatRule, Processor, TimeOffset, UpdateAccessConfigRequest, WindowsLogInfo,
    ACCESS_TYPE_AGENT,
};
use crate::api::Client;
use crate::schema::{
    AttributeBuilder, AttributeType, NestedSchemaBuilder, ResourceSchema, SchemaBuilder,
};
use crate::types::{Config, Diagnostics, Dynamic, State};
use crate::utils::{block_on, format_timestamp_rfc3339};
use crate::Resource;

/// Host (agent) access configuration, identified by its unique name.
/// Reads go through the name-filtered list endpoint.
pub struct HostAccessResource {
    client: Client,
}

impl HostAccessResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> ResourceSchema {
        let format_block = || {
            NestedSchemaBuilder::new()
                .attribute("mode", AttributeBuilder::string("mode").required())
                .attribute("value", AttributeBuilder::string("value").optional())
                .build()
        };
        let windows_block = NestedSchemaBuilder::new()
            .attribute(
                "categorys",
                AttributeBuilder::list("categorys", AttributeType::String).required(),
            )
            .attribute(
                "event_level",
                AttributeBuilder::list("event_level", AttributeType::String).required(),
            )
            .attribute(
                "time_offset",
                AttributeBuilder::number("time_offset").required(),
            )
            .attribute(
                "time_offset_unit",
                AttributeBuilder::string("time_offset_unit").required(),
            )
            .build();
        let demo_fields_block = NestedSchemaBuilder::new()
            .attribute(
                "field_name",
                AttributeBuilder::string("field_name").required(),
            )
            .attribute(
                "field_value",
                AttributeBuilder::string("field_value").optional(),
            )
            .build();

        SchemaBuilder::new()
            .attribute(
                "name",
                AttributeBuilder::string("name")
                    .required()
                    .force_new()
                    .description("Access configuration name"),
            )
            .attribute(
                "log_group_id",
                AttributeBuilder::string("log_group_id").required().force_new(),
            )
            .attribute(
                "log_stream_id",
                AttributeBuilder::string("log_stream_id").required().force_new(),
            )
            .attribute(
                "paths",
                AttributeBuilder::list("paths", AttributeType::String)
                    .required()
                    .description("Collection paths"),
            )
            .attribute(
                "black_paths",
                AttributeBuilder::list("black_paths", AttributeType::String).optional(),
            )
            .attribute(
                "single_log_format",
                AttributeBuilder::block("single_log_format", format_block())
                    .optional()
                    .max_items(1),
            )
            .attribute(
                "multi_log_format",
                AttributeBuilder::block("multi_log_format", format_block())
                    .optional()
                    .max_items(1),
            )
            .attribute(
                "windows_log_info",
                AttributeBuilder::block("windows_log_info", windows_block)
                    .optional()
                    .max_items(1),
            )
            .attribute(
                "host_group_ids",
                AttributeBuilder::list("host_group_ids", AttributeType::String).optional(),
            )
            .attribute(
                "tags",
                AttributeBuilder::map("tags", AttributeType::String).optional(),
            )
            .attribute(
                "custom_key_value",
                AttributeBuilder::map("custom_key_value", AttributeType::String).optional(),
            )
            .attribute(
                "system_fields",
                AttributeBuilder::list("system_fields", AttributeType::String).optional(),
            )
            .attribute(
                "repeat_collect",
                AttributeBuilder::bool("repeat_collect").optional(),
            )
            .attribute(
                "binary_collect",
                AttributeBuilder::bool("binary_collect").optional().force_new(),
            )
            .attribute(
                "encoding_format",
                AttributeBuilder::string("encoding_format").optional(),
            )
            .attribute(
                "incremental_collect",
                AttributeBuilder::bool("incremental_collect").optional(),
            )
            .attribute("log_split", AttributeBuilder::bool("log_split").optional())
            .attribute(
                "processor_type",
                AttributeBuilder::string("processor_type").optional(),
            )
            .attribute(
                "processors",
                AttributeBuilder::block(
                    "processors",
                    NestedSchemaBuilder::new()
                        .attribute("type", AttributeBuilder::string("type").required())
                        .attribute("detail", AttributeBuilder::string("detail").optional())
                        .build(),
                )
                .optional(),
            )
            .attribute("demo_log", AttributeBuilder::string("demo_log").optional())
            .attribute(
                "demo_fields",
                AttributeBuilder::block("demo_fields", demo_fields_block).optional(),
            )
            .attribute("id", AttributeBuilder::string("id").computed())
            .attribute("access_type", AttributeBuilder::string("access_type").computed())
            .attribute(
                "log_group_name",
                AttributeBuilder::string("log_group_name").computed(),
            )
            .attribute(
                "log_stream_name",
                AttributeBuilder::string("log_stream_name").computed(),
            )
            .attribute("created_at", AttributeBuilder::string("created_at").computed())
            .build_resource(0)
    }
}

fn expand_format_rule(block: &HashMap<String, Dynamic>) -> LogFormatRule {
    let mode = super::get_string(block, "mode").unwrap_or_default();
    let value = super::get_string(block, "value").filter(|v| !v.is_empty());
    // system mode without an explicit value defaults to the current time
    let value = if mode == "system" && value.is_none() {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .map(|d| d.as_millis().to_string())
    } else {
        value
    };
    LogFormatRule { mode, value }
}

fn expand_format(values: &HashMap<String, Dynamic>) -> Option<LogFormat> {
    let single = super::get_block(values, "single_log_format").map(expand_format_rule);
    let multi = super::get_block(values, "multi_log_format").map(expand_format_rule);
    if single.is_none() && multi.is_none() {
        return None;
    }
    Some(LogFormat { single, multi })
}

fn expand_windows_log_info(values: &HashMap<String, Dynamic>) -> Option<WindowsLogInfo> {
    super::get_block(values, "windows_log_info").map(|block| WindowsLogInfo {
        categorys: super::get_string_list(block, "categorys").unwrap_or_default(),
        event_level: super::get_string_list(block, "event_level").unwrap_or_default(),
        time_offset: TimeOffset {
            offset: super::get_i64(block, "time_offset").unwrap_or(0),
            unit: super::get_string(block, "time_offset_unit").unwrap_or_default(),
        },
    })
}

pub(super) fn expand_processors(values: &HashMap<String, Dynamic>) -> Option<Vec<Processor>> {
    super::get_block_list(values, "processors").map(|items| {
        items
            .iter()
            .filter_map(|v| v.as_map())
            .map(|block| Processor {
                processor_type: super::get_string(block, "type").unwrap_or_default(),
                detail: super::get_string(block, "detail")
                    .and_then(|d| serde_json::from_str(&d).ok())
                    .unwrap_or(serde_json::Value::Null),
            })
            .collect()
    })
}

pub(super) fn expand_demo_fields(values: &HashMap<String, Dynamic>) -> Option<Vec<DemoField>> {
    super::get_block_list(values, "demo_fields").map(|items| {
        items
            .iter()
            .filter_map(|v| v.as_map())
            .map(|block| DemoField {
                field_name: super::get_string(block, "field_name").unwrap_or_default(),
                field_value: super::get_string(block, "field_value"),
            })
            .collect()
    })
}

fn expand_detail(values: &HashMap<String, Dynamic>) -> AccessConfigDetail {
    AccessConfigDetail {
        paths: super::get_string_list(values, "paths"),
        black_paths: super::get_string_list(values, "black_paths"),
        format: expand_format(values),
        windows_log_info: expand_windows_log_info(values),
        custom_key_value: super::get_string_map(values, "custom_key_value"),
        system_fields: super::get_string_list(values, "system_fields"),
        repeat_collect: super::get_bool(values, "repeat_collect"),
        ..Default::default()
    }
}

fn flatten_format_rule(rule: &LogFormatRule) -> Dynamic {
    let mut block = HashMap::new();
    block.insert("mode".to_string(), Dynamic::String(rule.mode.clone()));
    if let Some(value) = &rule.value {
        block.insert("value".to_string(), Dynamic::String(value.clone()));
    }
    Dynamic::List(vec![Dynamic::Map(block)])
}

fn flatten_detail(detail: &AccessConfigDetail, values: &mut HashMap<String, Dynamic>) {
    if let Some(paths) = &detail.paths {
        values.insert("paths".to_string(), super::string_list(paths));
    }
    if let Some(black_paths) = &detail.black_paths {
        values.insert("black_paths".to_string(), super::string_list(black_paths));
    }
    if let Some(format) = &detail.format {
        if let Some(single) = &format.single {
            values.insert("single_log_format".to_string(), flatten_format_rule(single));
        }
        if let Some(multi) = &format.multi {
            values.insert("multi_log_format".to_string(), flatten_format_rule(multi));
        }
    }
    if let Some(windows) = &detail.windows_log_info {
        let mut block = HashMap::new();
        block.insert("categorys".to_string(), super::string_list(&windows.categorys));
        block.insert(
            "event_level".to_string(),
            super::string_list(&windows.event_level),
        );
        block.insert(
            "time_offset".to_string(),
            Dynamic::Number(windows.time_offset.offset as f64),
        );
        block.insert(
            "time_offset_unit".to_string(),
            Dynamic::String(windows.time_offset.unit.clone()),
        );
        values.insert(
            "windows_log_info".to_string(),
            Dynamic::List(vec![Dynamic::Map(block)]),
        );
    }
    if let Some(custom) = &detail.custom_key_value {
        values.insert("custom_key_value".to_string(), super::string_map(custom));
    }
    if let Some(fields) = &detail.system_fields {
        values.insert("system_fields".to_string(), super::string_list(fields));
    }
    if let Some(repeat) = detail.repeat_collect {
        values.insert("repeat_collect".to_string(), Dynamic::Bool(repeat));
    }
}

pub(super) fn flatten_common(
    info: &crate::api::access::AccessConfigInfo,
    values: &mut HashMap<String, Dynamic>,
) {
    values.insert(
        "id".to_string(),
        Dynamic::String(info.access_config_id.clone()),
    );
    values.insert(
        "name".to_string(),
        Dynamic::String(info.access_config_name.clone()),
    );
    if let Some(access_type) = &info.access_config_type {
        values.insert(
            "access_type".to_string(),
            Dynamic::String(access_type.clone()),
        );
    }
    if let Some(log_info) = &info.log_info {
        values.insert(
            "log_group_id".to_string(),
            Dynamic::String(log_info.log_group_id.clone()),
        );
        values.insert(
            "log_stream_id".to_string(),
            Dynamic::String(log_info.log_stream_id.clone()),
        );
        if let Some(name) = &log_info.log_group_name {
            values.insert("log_group_name".to_string(), Dynamic::String(name.clone()));
        }
        if let Some(name) = &log_info.log_stream_name {
            values.insert("log_stream_name".to_string(), Dynamic::String(name.clone()));
        }
    }
    if let Some(host_groups) = &info.host_group_info {
        values.insert(
            "host_group_ids".to_string(),
            super::string_list(&host_groups.host_group_id_list),
        );
    }
    if let Some(tags) = &info.access_config_tag {
        values.insert("tags".to_string(), super::flatten_tags(tags));
    }
    if let Some(binary) = info.binary_collect {
        values.insert("binary_collect".to_string(), Dynamic::Bool(binary));
    }
    if let Some(encoding) = &info.encoding_format {
        values.insert(
            "encoding_format".to_string(),
            Dynamic::String(encoding.clone()),
        );
    }
    if let Some(incremental) = info.incremental_collect {
        values.insert(
            "incremental_collect".to_string(),
            Dynamic::Bool(incremental),
        );
    }
    if let Some(split) = info.log_split {
        values.insert("log_split".to_string(), Dynamic::Bool(split));
    }
    if let Some(processor_type) = &info.processor_type {
        values.insert(
            "processor_type".to_string(),
            Dynamic::String(processor_type.clone()),
        );
    }
    if let Some(demo_log) = &info.demo_log {
        values.insert("demo_log".to_string(), Dynamic::String(demo_log.clone()));
    }
    if let Some(created) = info.create_time.and_then(format_timestamp_rfc3339) {
        values.insert("created_at".to_string(), Dynamic::String(created));
    }
}

fn host_group_info(values: &HashMap<String, Dynamic>) -> Option<HostGroupInfo> {
    super::get_string_list(values, "host_group_ids").map(|ids| HostGroupInfo {
        host_group_id_list: ids,
    })
}

impl Resource for HostAccessResource {
    fn schema(&self) -> ResourceSchema {
        Self::schema_static()
    }

    fn create(&self, config: Config) -> crate::Result<(State, Diagnostics)> {
        let diags = Diagnostics::new();

        let name = config.require_string("name")?;
        let log_group_id = config.require_string("log_group_id")?;
        let log_stream_id = config.require_string("log_stream_id")?;

        let request = CreateAccessConfigRequest {
            access_config_type: ACCESS_TYPE_AGENT.to_string(),
            access_config_name: name.to_string(),
            access_config_detail: expand_detail(&config.values),
            log_info: AccessLogInfo {
                log_group_id: log_group_id.to_string(),
                log_stream_id: log_stream_id.to_string(),
                log_group_name: None,
                log_stream_name: None,
            },
            host_group_info: host_group_info(&config.values),
            access_config_tag: super::expand_tags(&config.values, "tags"),
            cluster_id: None,
            binary_collect: super::get_bool(&config.values, "binary_collect"),
            encoding_format: super::get_string(&config.values, "encoding_format"),
            incremental_collect: super::get_bool(&config.values, "incremental_collect"),
            log_split: super::get_bool(&config.values, "log_split"),
            processor_type: super::get_string(&config.values, "processor_type"),
            processors: expand_processors(&config.values),
            demo_log: super::get_string(&config.values, "demo_log"),
            demo_fields: expand_demo_fields(&config.values),
        };

        let client = self.client.clone();
        let access_id = block_on(async move { client.create_access_config(&request).await })
            .map_err(|e| format!("Failed to create host access config: {}", e))?;

        let mut values = config.values;
        values.insert("id".to_string(), Dynamic::String(access_id));
        values.insert(
            "access_type".to_string(),
            Dynamic::String(ACCESS_TYPE_AGENT.to_string()),
        );
        Ok((State { values }, diags))
    }

    fn read(&self, state: State) -> crate::Result<(Option<State>, Diagnostics)> {
        let diags = Diagnostics::new();

        let name = state.require_string("name")?.to_string();

        let client = self.client.clone();
        let info = block_on(async move { client.get_access_config_by_name(&name).await })
            .map_err(|e| format!("Failed to read host access config: {}", e))?;

        let info = match info {
            Some(info) => info,
            None => return Ok((None, diags)),
        };

        let mut values = HashMap::new();
        flatten_common(&info, &mut values);
        if let Some(detail) = &info.access_config_detail {
            flatten_detail(detail, &mut values);
        }

        Ok((Some(State { values }), diags))
    }

    fn update(&self, state: State, config: Config) -> crate::Result<(State, Diagnostics)> {
        let diags = Diagnostics::new();

        let access_id = state.require_string("id")?.to_string();

        let request = UpdateAccessConfigRequest {
            access_config_id: access_id.clone(),
            access_config_detail: expand_detail(&config.values),
            host_group_info: host_group_info(&config.values),
            access_config_tag: super::expand_tags(&config.values, "tags"),
            binary_collect: super::get_bool(&config.values, "binary_collect"),
            encoding_format: super::get_string(&config.values, "encoding_format"),
            incremental_collect: super::get_bool(&config.values, "incremental_collect"),
            log_split: super::get_bool(&config.values, "log_split"),
            processor_type: super::get_string(&config.values, "processor_type"),
            processors: expand_processors(&config.values),
            demo_log: super::get_string(&config.values, "demo_log"),
            demo_fields: expand_demo_fields(&config.values),
        };

        let client = self.client.clone();
        block_on(async move { client.update_access_config(&request).await })
            .map_err(|e| format!("Failed to update host access config: {}", e))?;

        let mut values = config.values;
        values.insert("id".to_string(), Dynamic::String(access_id));
        if let Some(access_type) = state.values.get("access_type") {
            values.insert("access_type".to_string(), access_type.clone());
        }
        Ok((State { values }, diags))
    }

    fn delete(&self, state: State) -> crate::Result<Diagnostics> {
        let diags = Diagnostics::new();

        let access_id = state.require_string("id")?.to_string();

        let client = self.client.clone();
        block_on(async move { client.delete_access_config(&access_id).await })
            .map_err(|e| format!("Failed to delete host access config: {}", e))?;

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
        let mut values = HashMap::new();
        values.insert("name".to_string(), Dynamic::String("web-logs".to_string()));
        values.insert(
            "log_group_id".to_string(),
            Dynamic::String("lg-1".to_string()),
        );
        values.insert(
            "log_stream_id".to_string(),
            Dynamic::String("ls-1".to_string()),
        );
        values.insert(
            "paths".to_string(),
            Dynamic::List(vec![Dynamic::String("/var/log/nginx/*.log".to_string())]),
        );
        Config { values }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_creates_agent_access() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v3/test-project/lts/access-config")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "access_config_type": "AGENT",
                "access_config_name": "web-logs",
                "access_config_detail": {"paths": ["/var/log/nginx/*.log"]},
                "log_info": {"log_group_id": "lg-1", "log_stream_id": "ls-1"}
            })))
            .with_status(201)
            .with_body(r#"{"access_config_id":"ac-1"}"#)
            .create_async()
            .await;

        let resource = HostAccessResource::new(create_test_client(&server));
        let (state, diags) = resource.create(create_test_config()).unwrap();

        mock.assert_async().await;
        assert!(diags.errors.is_empty());
        assert_eq!(state.values["id"].as_string(), Some("ac-1"));
        assert_eq!(state.values["access_type"].as_string(), Some("AGENT"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_reads_by_name_filter() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v3/test-project/lts/access-config-list")
            .with_status(200)
            .with_body(
                r#"{"result":[{
                    "access_config_id":"ac-1",
                    "access_config_name":"web-logs",
                    "access_config_type":"AGENT",
                    "access_config_detail":{"paths":["/var/log/nginx/*.log"],"repeat_collect":true},
                    "log_info":{"log_group_id":"lg-1","log_stream_id":"ls-1","log_group_name":"app","log_stream_name":"web"},
                    "create_time":1700000000000
                }]}"#,
            )
            .create_async()
            .await;

        let resource = HostAccessResource::new(create_test_client(&server));
        let mut values = HashMap::new();
        values.insert("name".to_string(), Dynamic::String("web-logs".to_string()));

        let (state, _) = resource.read(State { values }).unwrap();
        let state = state.unwrap();
        assert_eq!(state.values["id"].as_string(), Some("ac-1"));
        assert_eq!(state.values["log_group_name"].as_string(), Some("app"));
        assert_eq!(state.values["repeat_collect"].as_bool(), Some(true));
        assert_eq!(
            state.values["created_at"].as_string(),
            Some("2023-11-14T22:13:20Z")
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_read_ignores_fuzzy_name_matches() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v3/test-project/lts/access-config-list")
            .with_status(200)
            .with_body(
                r#"{"result":[{"access_config_id":"ac-2","access_config_name":"web-logs-other"}]}"#,
            )
            .create_async()
            .await;

        let resource = HostAccessResource::new(create_test_client(&server));
        let mut values = HashMap::new();
        values.insert("name".to_string(), Dynamic::String("web-logs".to_string()));

        let (state, _) = resource.read(State { values }).unwrap();
        assert!(state.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_deletes_by_id_list() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/v3/test-project/lts/access-config")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "access_config_id_list": ["ac-1"]
            })))
            .with_status(200)
            .create_async()
            .await;

        let resource = HostAccessResource::new(create_test_client(&server));
        let mut values = HashMap::new();
        values.insert("id".to_string(), Dynamic::String("ac-1".to_string()));

        let diags = resource.delete(State { values }).unwrap();
        mock.assert_async().await;
        assert!(diags.errors.is_empty());
    }
}

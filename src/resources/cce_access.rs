use std::collections::HashMap;

use crate::api::access::{
    AccessConfigDetail, AccessLogInfo, CreateAccessConfigRequest, HostGroupInfo, LogFormat,
    LogFormatRule, UpdateAccessConfigRequest, ACCESS_TYPE_CCE,
};
use crate::api::Client;
use crate::schema::{
    AttributeBuilder, AttributeType, NestedSchemaBuilder, ResourceSchema, SchemaBuilder,
};
use crate::types::{Config, Diagnostics, Dynamic, State};
use crate::utils::block_on;
use crate::Resource;

use super::host_access::{expand_demo_fields, expand_processors, flatten_common};

/// CCE (container) access configuration. Shares the agent endpoints with
/// host access but selects container output by namespace, pod and label.
pub struct CceAccessResource {
    client: Client,
}

impl CceAccessResource {
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

        SchemaBuilder::new()
            .attribute(
                "name",
                AttributeBuilder::string("name").required().force_new(),
            )
            .attribute(
                "cluster_id",
                AttributeBuilder::string("cluster_id").required().force_new(),
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
                "path_type",
                AttributeBuilder::string("path_type")
                    .required()
                    .description("container_stdout, container_file or host_file"),
            )
            .attribute(
                "paths",
                AttributeBuilder::list("paths", AttributeType::String).optional(),
            )
            .attribute(
                "black_paths",
                AttributeBuilder::list("black_paths", AttributeType::String).optional(),
            )
            .attribute("stdout", AttributeBuilder::bool("stdout").optional())
            .attribute("stderr", AttributeBuilder::bool("stderr").optional())
            .attribute(
                "name_space_regex",
                AttributeBuilder::string("name_space_regex").optional(),
            )
            .attribute(
                "pod_name_regex",
                AttributeBuilder::string("pod_name_regex").optional(),
            )
            .attribute(
                "container_name_regex",
                AttributeBuilder::string("container_name_regex").optional(),
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
                "include_labels_logical",
                AttributeBuilder::string("include_labels_logical").optional(),
            )
            .attribute(
                "include_labels",
                AttributeBuilder::map("include_labels", AttributeType::String).optional(),
            )
            .attribute(
                "exclude_labels_logical",
                AttributeBuilder::string("exclude_labels_logical").optional(),
            )
            .attribute(
                "exclude_labels",
                AttributeBuilder::map("exclude_labels", AttributeType::String).optional(),
            )
            .attribute(
                "include_envs_logical",
                AttributeBuilder::string("include_envs_logical").optional(),
            )
            .attribute(
                "include_envs",
                AttributeBuilder::map("include_envs", AttributeType::String).optional(),
            )
            .attribute(
                "exclude_envs_logical",
                AttributeBuilder::string("exclude_envs_logical").optional(),
            )
            .attribute(
                "exclude_envs",
                AttributeBuilder::map("exclude_envs", AttributeType::String).optional(),
            )
            .attribute(
                "include_k8s_labels_logical",
                AttributeBuilder::string("include_k8s_labels_logical").optional(),
            )
            .attribute(
                "include_k8s_labels",
                AttributeBuilder::map("include_k8s_labels", AttributeType::String).optional(),
            )
            .attribute(
                "exclude_k8s_labels_logical",
                AttributeBuilder::string("exclude_k8s_labels_logical").optional(),
            )
            .attribute(
                "exclude_k8s_labels",
                AttributeBuilder::map("exclude_k8s_labels", AttributeType::String).optional(),
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
                "host_group_ids",
                AttributeBuilder::list("host_group_ids", AttributeType::String).optional(),
            )
            .attribute(
                "tags",
                AttributeBuilder::map("tags", AttributeType::String).optional(),
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
                AttributeBuilder::block(
                    "demo_fields",
                    NestedSchemaBuilder::new()
                        .attribute("field_name", AttributeBuilder::string("field_name").required())
                        .attribute("field_value", AttributeBuilder::string("field_value").optional())
                        .build(),
                )
                .optional(),
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

fn expand_format(values: &HashMap<String, Dynamic>) -> Option<LogFormat> {
    let rule = |name: &str| {
        super::get_block(values, name).map(|block| LogFormatRule {
            mode: super::get_string(block, "mode").unwrap_or_default(),
            value: super::get_string(block, "value").filter(|v| !v.is_empty()),
        })
    };
    let single = rule("single_log_format");
    let multi = rule("multi_log_format");
    if single.is_none() && multi.is_none() {
        return None;
    }
    Some(LogFormat { single, multi })
}

fn expand_detail(values: &HashMap<String, Dynamic>) -> AccessConfigDetail {
    AccessConfigDetail {
        path_type: super::get_string(values, "path_type"),
        paths: super::get_string_list(values, "paths"),
        black_paths: super::get_string_list(values, "black_paths"),
        stdout: super::get_bool(values, "stdout"),
        stderr: super::get_bool(values, "stderr"),
        name_space_regex: super::get_string(values, "name_space_regex"),
        pod_name_regex: super::get_string(values, "pod_name_regex"),
        container_name_regex: super::get_string(values, "container_name_regex"),
        format: expand_format(values),
        include_labels_logical: super::get_string(values, "include_labels_logical"),
        include_labels: super::get_string_map(values, "include_labels"),
        exclude_labels_logical: super::get_string(values, "exclude_labels_logical"),
        exclude_labels: super::get_string_map(values, "exclude_labels"),
        include_envs_logical: super::get_string(values, "include_envs_logical"),
        include_envs: super::get_string_map(values, "include_envs"),
        exclude_envs_logical: super::get_string(values, "exclude_envs_logical"),
        exclude_envs: super::get_string_map(values, "exclude_envs"),
        include_k8s_labels_logical: super::get_string(values, "include_k8s_labels_logical"),
        include_k8s_labels: super::get_string_map(values, "include_k8s_labels"),
        exclude_k8s_labels_logical: super::get_string(values, "exclude_k8s_labels_logical"),
        exclude_k8s_labels: super::get_string_map(values, "exclude_k8s_labels"),
        custom_key_value: super::get_string_map(values, "custom_key_value"),
        system_fields: super::get_string_list(values, "system_fields"),
        repeat_collect: super::get_bool(values, "repeat_collect"),
        ..Default::default()
    }
}

fn flatten_detail(detail: &AccessConfigDetail, values: &mut HashMap<String, Dynamic>) {
    if let Some(path_type) = &detail.path_type {
        values.insert("path_type".to_string(), Dynamic::String(path_type.clone()));
    }
    if let Some(paths) = &detail.paths {
        values.insert("paths".to_string(), super::string_list(paths));
    }
    if let Some(black_paths) = &detail.black_paths {
        values.insert("black_paths".to_string(), super::string_list(black_paths));
    }
    if let Some(stdout) = detail.stdout {
        values.insert("stdout".to_string(), Dynamic::Bool(stdout));
    }
    if let Some(stderr) = detail.stderr {
        values.insert("stderr".to_string(), Dynamic::Bool(stderr));
    }
    if let Some(regex) = &detail.name_space_regex {
        values.insert("name_space_regex".to_string(), Dynamic::String(regex.clone()));
    }
    if let Some(regex) = &detail.pod_name_regex {
        values.insert("pod_name_regex".to_string(), Dynamic::String(regex.clone()));
    }
    if let Some(regex) = &detail.container_name_regex {
        values.insert(
            "container_name_regex".to_string(),
            Dynamic::String(regex.clone()),
        );
    }
    if let Some(format) = &detail.format {
        let flatten_rule = |rule: &LogFormatRule| {
            let mut block = HashMap::new();
            block.insert("mode".to_string(), Dynamic::String(rule.mode.clone()));
            if let Some(value) = &rule.value {
                block.insert("value".to_string(), Dynamic::String(value.clone()));
            }
            Dynamic::List(vec![Dynamic::Map(block)])
        };
        if let Some(single) = &format.single {
            values.insert("single_log_format".to_string(), flatten_rule(single));
        }
        if let Some(multi) = &format.multi {
            values.insert("multi_log_format".to_string(), flatten_rule(multi));
        }
    }

    let selectors = [
        ("include_labels", &detail.include_labels),
        ("exclude_labels", &detail.exclude_labels),
        ("include_envs", &detail.include_envs),
        ("exclude_envs", &detail.exclude_envs),
        ("include_k8s_labels", &detail.include_k8s_labels),
        ("exclude_k8s_labels", &detail.exclude_k8s_labels),
    ];
    for (name, selector) in selectors {
        if let Some(entries) = selector {
            values.insert(name.to_string(), super::string_map(entries));
        }
    }
    let logicals = [
        ("include_labels_logical", &detail.include_labels_logical),
        ("exclude_labels_logical", &detail.exclude_labels_logical),
        ("include_envs_logical", &detail.include_envs_logical),
        ("exclude_envs_logical", &detail.exclude_envs_logical),
        (
            "include_k8s_labels_logical",
            &detail.include_k8s_labels_logical,
        ),
        (
            "exclude_k8s_labels_logical",
            &detail.exclude_k8s_labels_logical,
        ),
    ];
    for (name, logical) in logicals {
        if let Some(value) = logical {
            values.insert(name.to_string(), Dynamic::String(value.clone()));
        }
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

impl Resource for CceAccessResource {
    fn schema(&self) -> ResourceSchema {
        Self::schema_static()
    }

    fn create(&self, config: Config) -> crate::Result<(State, Diagnostics)> {
        let diags = Diagnostics::new();

        let name = config.require_string("name")?;
        let cluster_id = config.require_string("cluster_id")?;
        let log_group_id = config.require_string("log_group_id")?;
        let log_stream_id = config.require_string("log_stream_id")?;

        let request = CreateAccessConfigRequest {
            access_config_type: ACCESS_TYPE_CCE.to_string(),
            access_config_name: name.to_string(),
            access_config_detail: expand_detail(&config.values),
            log_info: AccessLogInfo {
                log_group_id: log_group_id.to_string(),
                log_stream_id: log_stream_id.to_string(),
                log_group_name: None,
                log_stream_name: None,
            },
            host_group_info: super::get_string_list(&config.values, "host_group_ids")
                .map(|ids| HostGroupInfo {
                    host_group_id_list: ids,
                }),
            access_config_tag: super::expand_tags(&config.values, "tags"),
            cluster_id: Some(cluster_id.to_string()),
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
            .map_err(|e| format!("Failed to create CCE access config: {}", e))?;

        let mut values = config.values;
        values.insert("id".to_string(), Dynamic::String(access_id));
        values.insert(
            "access_type".to_string(),
            Dynamic::String(ACCESS_TYPE_CCE.to_string()),
        );
        Ok((State { values }, diags))
    }

    fn read(&self, state: State) -> crate::Result<(Option<State>, Diagnostics)> {
        let diags = Diagnostics::new();

        let name = state.require_string("name")?.to_string();

        let client = self.client.clone();
        let info = block_on(async move { client.get_access_config_by_name(&name).await })
            .map_err(|e| format!("Failed to read CCE access config: {}", e))?;

        let info = match info {
            Some(info) => info,
            None => return Ok((None, diags)),
        };

        let mut values = HashMap::new();
        flatten_common(&info, &mut values);
        if let Some(cluster_id) = &info.cluster_id {
            values.insert("cluster_id".to_string(), Dynamic::String(cluster_id.clone()));
        }
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
            host_group_info: super::get_string_list(&config.values, "host_group_ids")
                .map(|ids| HostGroupInfo {
                    host_group_id_list: ids,
                }),
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
            .map_err(|e| format!("Failed to update CCE access config: {}", e))?;

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
            .map_err(|e| format!("Failed to delete CCE access config: {}", e))?;

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
        values.insert("name".to_string(), Dynamic::String("cce-logs".to_string()));
        values.insert(
            "cluster_id".to_string(),
            Dynamic::String("cluster-1".to_string()),
        );
        values.insert(
            "log_group_id".to_string(),
            Dynamic::String("lg-1".to_string()),
        );
        values.insert(
            "log_stream_id".to_string(),
            Dynamic::String("ls-1".to_string()),
        );
        values.insert(
            "path_type".to_string(),
            Dynamic::String("container_stdout".to_string()),
        );
        values.insert("stdout".to_string(), Dynamic::Bool(true));
        Config { values }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_creates_cce_access_with_cluster() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v3/test-project/lts/access-config")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "access_config_type": "K8S_CCE",
                "cluster_id": "cluster-1",
                "access_config_detail": {"path_type": "container_stdout", "stdout": true}
            })))
            .with_status(201)
            .with_body(r#"{"access_config_id":"ac-9"}"#)
            .create_async()
            .await;

        let resource = CceAccessResource::new(create_test_client(&server));
        let (state, diags) = resource.create(create_test_config()).unwrap();

        mock.assert_async().await;
        assert!(diags.errors.is_empty());
        assert_eq!(state.values["id"].as_string(), Some("ac-9"));
        assert_eq!(state.values["access_type"].as_string(), Some("K8S_CCE"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_reads_container_selectors() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v3/test-project/lts/access-config-list")
            .with_status(200)
            .with_body(
                r#"{"result":[{
                    "access_config_id":"ac-9",
                    "access_config_name":"cce-logs",
                    "access_config_type":"K8S_CCE",
                    "cluster_id":"cluster-1",
                    "access_config_detail":{
                        "path_type":"container_stdout",
                        "stdout":true,
                        "name_space_regex":"prod-.*",
                        "include_labels_logical":"and",
                        "include_labels":{"app":"web"}
                    }
                }]}"#,
            )
            .create_async()
            .await;

        let resource = CceAccessResource::new(create_test_client(&server));
        let mut values = HashMap::new();
        values.insert("name".to_string(), Dynamic::String("cce-logs".to_string()));

        let (state, _) = resource.read(State { values }).unwrap();
        let state = state.unwrap();
        assert_eq!(state.values["cluster_id"].as_string(), Some("cluster-1"));
        assert_eq!(state.values["name_space_regex"].as_string(), Some("prod-.*"));
        assert_eq!(
            state.values["include_labels"].as_map().unwrap()["app"].as_string(),
            Some("web")
        );
        assert!(!state.values.contains_key("exclude_labels"));
    }
}

use std::collections::HashMap;
use std::time::Duration;

use crate::api::converge::{
    LogConvergeConfig, LogMappingConfig, LogStreamMapping, ModifyLogConvergeRequest,
    CONVERGE_STATUS_DONE,
};
use crate::api::Client;
use crate::schema::{AttributeBuilder, NestedSchemaBuilder, ResourceSchema, SchemaBuilder};
use crate::types::{Config, Diagnostics, Dynamic, State};
use crate::utils::{block_on, format_timestamp_rfc3339};
use crate::Resource;

const WAIT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Cross-account log converge configuration for one member account. A
/// single endpoint applies the whole mapping set, so create, update and
/// delete all go through the same modify call; delete submits an empty
/// mapping list. The API applies changes asynchronously and every
/// mutation waits for the configuration to settle.
pub struct LogConvergeResource {
    client: Client,
}

impl LogConvergeResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> ResourceSchema {
        let stream_block = NestedSchemaBuilder::new()
            .attribute(
                "source_log_stream_id",
                AttributeBuilder::string("source_log_stream_id").required(),
            )
            .attribute(
                "target_log_stream_name",
                AttributeBuilder::string("target_log_stream_name").required(),
            )
            .attribute(
                "target_log_stream_ttl",
                AttributeBuilder::number("target_log_stream_ttl").required(),
            )
            .attribute(
                "target_log_stream_id",
                AttributeBuilder::string("target_log_stream_id")
                    .optional()
                    .computed(),
            )
            .attribute(
                "target_log_stream_eps_id",
                AttributeBuilder::string("target_log_stream_eps_id").computed(),
            )
            .build();
        let mapping_block = NestedSchemaBuilder::new()
            .attribute(
                "source_log_group_id",
                AttributeBuilder::string("source_log_group_id").required(),
            )
            .attribute(
                "target_log_group_name",
                AttributeBuilder::string("target_log_group_name").required(),
            )
            .attribute(
                "target_log_group_id",
                AttributeBuilder::string("target_log_group_id")
                    .optional()
                    .computed(),
            )
            .attribute(
                "log_stream_config",
                AttributeBuilder::block("log_stream_config", stream_block).optional(),
            )
            .build();

        SchemaBuilder::new()
            .attribute(
                "organization_id",
                AttributeBuilder::string("organization_id").required().force_new(),
            )
            .attribute(
                "management_account_id",
                AttributeBuilder::string("management_account_id")
                    .required()
                    .force_new(),
            )
            .attribute(
                "member_account_id",
                AttributeBuilder::string("member_account_id")
                    .required()
                    .force_new(),
            )
            .attribute(
                "log_mapping_config",
                AttributeBuilder::block("log_mapping_config", mapping_block).required(),
            )
            .attribute(
                "management_project_id",
                AttributeBuilder::string("management_project_id").optional().computed(),
            )
            .attribute("id", AttributeBuilder::string("id").computed())
            .attribute("status", AttributeBuilder::string("status").computed())
            .attribute("created_at", AttributeBuilder::string("created_at").computed())
            .attribute("updated_at", AttributeBuilder::string("updated_at").computed())
            .build_resource(0)
    }

    fn build_request(
        config: &Config,
        mappings: Vec<LogMappingConfig>,
    ) -> crate::Result<ModifyLogConvergeRequest> {
        Ok(ModifyLogConvergeRequest {
            organization_id: config.require_string("organization_id")?.to_string(),
            management_account_id: config.require_string("management_account_id")?.to_string(),
            member_account_id: config.require_string("member_account_id")?.to_string(),
            log_mapping_config: mappings,
            management_project_id: super::get_string(&config.values, "management_project_id"),
        })
    }

    fn apply_and_wait(
        &self,
        request: ModifyLogConvergeRequest,
        targets: &'static [&'static str],
    ) -> crate::Result<()> {
        let client = self.client.clone();
        let member_account_id = request.member_account_id.clone();
        block_on(async move {
            client.modify_log_converge(&request).await?;
            client
                .wait_for_log_converge(&member_account_id, targets, WAIT_TIMEOUT)
                .await
        })
        .map_err(|e| format!("Failed to apply log converge config: {}", e))?;
        Ok(())
    }
}

fn expand_mappings(values: &HashMap<String, Dynamic>) -> Vec<LogMappingConfig> {
    super::get_block_list(values, "log_mapping_config")
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_map())
                .map(|block| LogMappingConfig {
                    source_log_group_id: super::get_string(block, "source_log_group_id")
                        .unwrap_or_default(),
                    target_log_group_name: super::get_string(block, "target_log_group_name")
                        .unwrap_or_default(),
                    target_log_group_id: super::get_string(block, "target_log_group_id"),
                    log_stream_config: super::get_block_list(block, "log_stream_config").map(
                        |streams| {
                            streams
                                .iter()
                                .filter_map(|v| v.as_map())
                                .map(|stream| LogStreamMapping {
                                    source_log_stream_id: super::get_string(
                                        stream,
                                        "source_log_stream_id",
                                    )
                                    .unwrap_or_default(),
                                    target_log_stream_name: super::get_string(
                                        stream,
                                        "target_log_stream_name",
                                    )
                                    .unwrap_or_default(),
                                    target_log_stream_ttl: super::get_i64(
                                        stream,
                                        "target_log_stream_ttl",
                                    )
                                    .unwrap_or(0),
                                    target_log_stream_id: super::get_string(
                                        stream,
                                        "target_log_stream_id",
                                    ),
                                    target_log_stream_eps_id: None,
                                })
                                .collect()
                        },
                    ),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn flatten_mappings(mappings: &[LogMappingConfig]) -> Dynamic {
    let items = mappings
        .iter()
        .map(|mapping| {
            let mut block = HashMap::new();
            block.insert(
                "source_log_group_id".to_string(),
                Dynamic::String(mapping.source_log_group_id.clone()),
            );
            block.insert(
                "target_log_group_name".to_string(),
                Dynamic::String(mapping.target_log_group_name.clone()),
            );
            if let Some(id) = &mapping.target_log_group_id {
                block.insert("target_log_group_id".to_string(), Dynamic::String(id.clone()));
            }
            if let Some(streams) = &mapping.log_stream_config {
                let stream_items = streams
                    .iter()
                    .map(|stream| {
                        let mut s = HashMap::new();
                        s.insert(
                            "source_log_stream_id".to_string(),
                            Dynamic::String(stream.source_log_stream_id.clone()),
                        );
                        s.insert(
                            "target_log_stream_name".to_string(),
                            Dynamic::String(stream.target_log_stream_name.clone()),
                        );
                        s.insert(
                            "target_log_stream_ttl".to_string(),
                            Dynamic::Number(stream.target_log_stream_ttl as f64),
                        );
                        if let Some(id) = &stream.target_log_stream_id {
                            s.insert(
                                "target_log_stream_id".to_string(),
                                Dynamic::String(id.clone()),
                            );
                        }
                        if let Some(eps) = &stream.target_log_stream_eps_id {
                            s.insert(
                                "target_log_stream_eps_id".to_string(),
                                Dynamic::String(eps.clone()),
                            );
                        }
                        Dynamic::Map(s)
                    })
                    .collect();
                block.insert("log_stream_config".to_string(), Dynamic::List(stream_items));
            }
            Dynamic::Map(block)
        })
        .collect();
    Dynamic::List(items)
}

fn flatten_config(config: &LogConvergeConfig) -> State {
    let mut values = HashMap::new();
    if let (Some(organization_id), Some(member_account_id)) =
        (&config.organization_id, &config.member_account_id)
    {
        values.insert(
            "id".to_string(),
            Dynamic::String(format!("{}/{}", organization_id, member_account_id)),
        );
    }
    if let Some(organization_id) = &config.organization_id {
        values.insert(
            "organization_id".to_string(),
            Dynamic::String(organization_id.clone()),
        );
    }
    if let Some(management_account_id) = &config.management_account_id {
        values.insert(
            "management_account_id".to_string(),
            Dynamic::String(management_account_id.clone()),
        );
    }
    if let Some(member_account_id) = &config.member_account_id {
        values.insert(
            "member_account_id".to_string(),
            Dynamic::String(member_account_id.clone()),
        );
    }
    if let Some(management_project_id) = &config.management_project_id {
        values.insert(
            "management_project_id".to_string(),
            Dynamic::String(management_project_id.clone()),
        );
    }
    if let Some(mappings) = &config.log_mapping_config {
        values.insert(
            "log_mapping_config".to_string(),
            flatten_mappings(mappings),
        );
    }
    if let Some(status) = &config.status {
        values.insert("status".to_string(), Dynamic::String(status.clone()));
    }
    if let Some(created) = config.create_time.and_then(format_timestamp_rfc3339) {
        values.insert("created_at".to_string(), Dynamic::String(created));
    }
    if let Some(updated) = config.update_time.and_then(format_timestamp_rfc3339) {
        values.insert("updated_at".to_string(), Dynamic::String(updated));
    }
    State { values }
}

impl Resource for LogConvergeResource {
    fn schema(&self) -> ResourceSchema {
        Self::schema_static()
    }

    fn create(&self, config: Config) -> crate::Result<(State, Diagnostics)> {
        let diags = Diagnostics::new();

        let mappings = expand_mappings(&config.values);
        if mappings.is_empty() {
            return Err("log_mapping_config is required".into());
        }
        let request = Self::build_request(&config, mappings)?;
        let id = format!(
            "{}/{}",
            request.organization_id, request.member_account_id
        );

        self.apply_and_wait(request, &[CONVERGE_STATUS_DONE])?;

        let mut values = config.values;
        values.insert("id".to_string(), Dynamic::String(id));
        Ok((State { values }, diags))
    }

    fn read(&self, state: State) -> crate::Result<(Option<State>, Diagnostics)> {
        let diags = Diagnostics::new();

        let member_account_id = state.require_string("member_account_id")?.to_string();

        let client = self.client.clone();
        let config = block_on(async move { client.get_log_converge(&member_account_id).await })
            .map_err(|e| format!("Failed to read log converge config: {}", e))?;

        Ok((config.as_ref().map(flatten_config), diags))
    }

    fn update(&self, state: State, config: Config) -> crate::Result<(State, Diagnostics)> {
        let diags = Diagnostics::new();

        let id = state.require_string("id")?.to_string();
        let mappings = expand_mappings(&config.values);
        if mappings.is_empty() {
            return Err("log_mapping_config is required".into());
        }
        let request = Self::build_request(&config, mappings)?;

        self.apply_and_wait(request, &[CONVERGE_STATUS_DONE])?;

        let mut values = config.values;
        values.insert("id".to_string(), Dynamic::String(id));
        Ok((State { values }, diags))
    }

    fn delete(&self, state: State) -> crate::Result<Diagnostics> {
        let diags = Diagnostics::new();

        let config = Config {
            values: state.values,
        };
        let request = Self::build_request(&config, Vec::new())?;

        self.apply_and_wait(request, &[])?;

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
        let mut stream = HashMap::new();
        stream.insert(
            "source_log_stream_id".to_string(),
            Dynamic::String("ls-src".to_string()),
        );
        stream.insert(
            "target_log_stream_name".to_string(),
            Dynamic::String("converged".to_string()),
        );
        stream.insert("target_log_stream_ttl".to_string(), Dynamic::Number(30.0));

        let mut mapping = HashMap::new();
        mapping.insert(
            "source_log_group_id".to_string(),
            Dynamic::String("lg-src".to_string()),
        );
        mapping.insert(
            "target_log_group_name".to_string(),
            Dynamic::String("converged-group".to_string()),
        );
        mapping.insert(
            "log_stream_config".to_string(),
            Dynamic::List(vec![Dynamic::Map(stream)]),
        );

        let mut values = HashMap::new();
        values.insert(
            "organization_id".to_string(),
            Dynamic::String("org-1".to_string()),
        );
        values.insert(
            "management_account_id".to_string(),
            Dynamic::String("mgmt-1".to_string()),
        );
        values.insert(
            "member_account_id".to_string(),
            Dynamic::String("member-1".to_string()),
        );
        values.insert(
            "log_mapping_config".to_string(),
            Dynamic::List(vec![Dynamic::Map(mapping)]),
        );
        Config { values }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_creates_and_waits_for_done() {
        let mut server = Server::new_async().await;
        let modify = server
            .mock("PUT", "/v1/test-project/lts/log-converge-config")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "organization_id": "org-1",
                "member_account_id": "member-1",
                "log_mapping_config": [{"source_log_group_id": "lg-src"}]
            })))
            .with_status(200)
            .create_async()
            .await;
        let _get = server
            .mock("GET", "/v1/test-project/lts/log-converge-config/member-1")
            .with_status(200)
            .with_body(
                r#"{"organization_id":"org-1","member_account_id":"member-1","status":"done",
                    "log_mapping_config":[{"source_log_group_id":"lg-src","target_log_group_name":"converged-group"}]}"#,
            )
            .create_async()
            .await;

        let resource = LogConvergeResource::new(create_test_client(&server));
        let (state, diags) = resource.create(create_test_config()).unwrap();

        modify.assert_async().await;
        assert!(diags.errors.is_empty());
        assert_eq!(state.values["id"].as_string(), Some("org-1/member-1"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_read_treats_service_code_as_gone() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/v1/test-project/lts/log-converge-config/member-1")
            .with_status(500)
            .with_body(r#"{"error_code":"LTS.2504","error_msg":"config not found"}"#)
            .create_async()
            .await;

        let resource = LogConvergeResource::new(create_test_client(&server));
        let mut values = HashMap::new();
        values.insert(
            "member_account_id".to_string(),
            Dynamic::String("member-1".to_string()),
        );

        let (state, _) = resource.read(State { values }).unwrap();
        assert!(state.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_read_treats_empty_mappings_as_gone() {
        let mut server = Server::new_async().await;
        let _get = server
            .mock("GET", "/v1/test-project/lts/log-converge-config/member-1")
            .with_status(200)
            .with_body(r#"{"member_account_id":"member-1","log_mapping_config":[]}"#)
            .create_async()
            .await;

        let resource = LogConvergeResource::new(create_test_client(&server));
        let mut values = HashMap::new();
        values.insert(
            "member_account_id".to_string(),
            Dynamic::String("member-1".to_string()),
        );

        let (state, _) = resource.read(State { values }).unwrap();
        assert!(state.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_delete_sends_empty_mapping_list() {
        let mut server = Server::new_async().await;
        let modify = server
            .mock("PUT", "/v1/test-project/lts/log-converge-config")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "member_account_id": "member-1",
                "log_mapping_config": []
            })))
            .with_status(200)
            .create_async()
            .await;
        let _get = server
            .mock("GET", "/v1/test-project/lts/log-converge-config/member-1")
            .with_status(500)
            .with_body(r#"{"error_code":"LTS.2504","error_msg":"config not found"}"#)
            .create_async()
            .await;

        let resource = LogConvergeResource::new(create_test_client(&server));
        let diags = resource.delete(State {
            values: create_test_config().values,
        });

        modify.assert_async().await;
        assert!(diags.unwrap().errors.is_empty());
    }
}

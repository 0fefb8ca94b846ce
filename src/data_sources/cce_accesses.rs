use std::collections::HashMap;

use crate::api::access::{ListAccessConfigsRequest, ACCESS_TYPE_CCE};
use crate::api::Client;
use crate::resources::{expand_tags, flatten_tags, string_list};
use crate::schema::{AttributeBuilder, AttributeType, DataSourceSchema, SchemaBuilder};
use crate::types::{Config, Diagnostics, Dynamic, State};
use crate::utils::{block_on, format_timestamp_rfc3339};
use crate::DataSource;

/// Lists CCE access configurations, optionally filtered by name, log
/// group name, log stream name or tags
pub struct CceAccessesDataSource {
    client: Client,
}

impl CceAccessesDataSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> DataSourceSchema {
        SchemaBuilder::new()
            .attribute("name", AttributeBuilder::string("name").optional())
            .attribute(
                "log_group_name",
                AttributeBuilder::string("log_group_name").optional(),
            )
            .attribute(
                "log_stream_name",
                AttributeBuilder::string("log_stream_name").optional(),
            )
            .attribute(
                "tags",
                AttributeBuilder::map("tags", AttributeType::String).optional(),
            )
            .attribute("id", AttributeBuilder::string("id").computed())
            .attribute(
                "accesses",
                AttributeBuilder::list("accesses", AttributeType::Object).computed(),
            )
            .build_data_source(0)
    }
}

impl DataSource for CceAccessesDataSource {
    fn schema(&self) -> DataSourceSchema {
        Self::schema_static()
    }

    fn read(&self, config: Config) -> crate::Result<(State, Diagnostics)> {
        let diags = Diagnostics::new();

        let one = |name: &str| {
            config
                .values
                .get(name)
                .and_then(|v| v.as_string())
                .map(|s| vec![s.to_string()])
        };
        let request = ListAccessConfigsRequest {
            access_config_name_list: one("name"),
            log_group_name_list: one("log_group_name"),
            log_stream_name_list: one("log_stream_name"),
            access_config_tag_list: expand_tags(&config.values, "tags"),
        };

        let client = self.client.clone();
        let configs = block_on(async move { client.list_access_configs(&request).await })
            .map_err(|e| format!("Failed to list CCE access configs: {}", e))?;

        let accesses: Vec<Dynamic> = configs
            .iter()
            .filter(|c| c.access_config_type.as_deref() == Some(ACCESS_TYPE_CCE))
            .map(|info| {
                let mut entry = HashMap::new();
                entry.insert(
                    "id".to_string(),
                    Dynamic::String(info.access_config_id.clone()),
                );
                entry.insert(
                    "name".to_string(),
                    Dynamic::String(info.access_config_name.clone()),
                );
                if let Some(cluster_id) = &info.cluster_id {
                    entry.insert(
                        "cluster_id".to_string(),
                        Dynamic::String(cluster_id.clone()),
                    );
                }
                if let Some(log_info) = &info.log_info {
                    entry.insert(
                        "log_group_id".to_string(),
                        Dynamic::String(log_info.log_group_id.clone()),
                    );
                    entry.insert(
                        "log_stream_id".to_string(),
                        Dynamic::String(log_info.log_stream_id.clone()),
                    );
                    if let Some(name) = &log_info.log_group_name {
                        entry.insert(
                            "log_group_name".to_string(),
                            Dynamic::String(name.clone()),
                        );
                    }
                    if let Some(name) = &log_info.log_stream_name {
                        entry.insert(
                            "log_stream_name".to_string(),
                            Dynamic::String(name.clone()),
                        );
                    }
                }
                if let Some(host_groups) = &info.host_group_info {
                    entry.insert(
                        "host_group_ids".to_string(),
                        string_list(&host_groups.host_group_id_list),
                    );
                }
                if let Some(tags) = &info.access_config_tag {
                    entry.insert("tags".to_string(), flatten_tags(tags));
                }
                if let Some(detail) = &info.access_config_detail {
                    if let Some(path_type) = &detail.path_type {
                        entry.insert(
                            "path_type".to_string(),
                            Dynamic::String(path_type.clone()),
                        );
                    }
                    if let Some(stdout) = detail.stdout {
                        entry.insert("stdout".to_string(), Dynamic::Bool(stdout));
                    }
                    if let Some(stderr) = detail.stderr {
                        entry.insert("stderr".to_string(), Dynamic::Bool(stderr));
                    }
                }
                if let Some(created) = info.create_time.and_then(format_timestamp_rfc3339) {
                    entry.insert("created_at".to_string(), Dynamic::String(created));
                }
                Dynamic::Map(entry)
            })
            .collect();

        let mut values = config.values;
        values.insert(
            "id".to_string(),
            Dynamic::String(self.client.project_id().to_string()),
        );
        values.insert("accesses".to_string(), Dynamic::List(accesses));
        Ok((State { values }, diags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn create_test_client(server: &Server) -> Client {
        Client::new(&server.url(), "test-project", "test-token", true).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn data_source_filters_to_cce_configs() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v3/test-project/lts/access-config-list")
            .with_status(200)
            .with_body(
                r#"{"result":[
                    {"access_config_id":"ac-1","access_config_name":"host","access_config_type":"AGENT"},
                    {"access_config_id":"ac-2","access_config_name":"cce","access_config_type":"K8S_CCE",
                     "cluster_id":"cluster-1",
                     "log_info":{"log_group_id":"lg-1","log_stream_id":"ls-1"},
                     "access_config_detail":{"path_type":"container_stdout","stdout":true}}
                ]}"#,
            )
            .create_async()
            .await;

        let data_source = CceAccessesDataSource::new(create_test_client(&server));
        let (state, diags) = data_source.read(Config::new()).unwrap();

        assert!(diags.errors.is_empty());
        let accesses = state.values["accesses"].as_list().unwrap();
        assert_eq!(accesses.len(), 1);
        let entry = accesses[0].as_map().unwrap();
        assert_eq!(entry["name"].as_string(), Some("cce"));
        assert_eq!(entry["cluster_id"].as_string(), Some("cluster-1"));
        assert_eq!(entry["stdout"].as_bool(), Some(true));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn data_source_passes_name_filter_to_api() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v3/test-project/lts/access-config-list")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "access_config_name_list": ["cce"]
            })))
            .with_status(200)
            .with_body(r#"{"result":[]}"#)
            .create_async()
            .await;

        let data_source = CceAccessesDataSource::new(create_test_client(&server));
        let mut values = HashMap::new();
        values.insert("name".to_string(), Dynamic::String("cce".to_string()));

        let (state, _) = data_source.read(Config { values }).unwrap();
        mock.assert_async().await;
        assert!(state.values["accesses"].as_list().unwrap().is_empty());
    }
}

use std::collections::HashMap;

use crate::api::transfers::{
    CreateTransferRequest, Transfer, TransferAgency, TransferDetail, TransferInfo, TransferStream,
    UpdateTransferInfo, UpdateTransferRequest,
};
use crate::api::Client;
use crate::schema::{
    AttributeBuilder, AttributeType, NestedSchemaBuilder, ResourceSchema, SchemaBuilder,
};
use crate::types::{Config, Diagnostics, Dynamic, State};
use crate::utils::{block_on, format_timestamp_rfc3339};
use crate::Resource;

/// Log transfer to OBS, DIS or DMS. Only the storage format, status and
/// sink detail can change in place; everything else forces replacement.
pub struct TransferResource {
    client: Client,
}

impl TransferResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> ResourceSchema {
        let streams_block = NestedSchemaBuilder::new()
            .attribute(
                "log_stream_id",
                AttributeBuilder::string("log_stream_id").required(),
            )
            .attribute(
                "log_stream_name",
                AttributeBuilder::string("log_stream_name").optional(),
            )
            .build();
        let agency_block = NestedSchemaBuilder::new()
            .attribute(
                "agency_domain_id",
                AttributeBuilder::string("agency_domain_id").required(),
            )
            .attribute(
                "agency_domain_name",
                AttributeBuilder::string("agency_domain_name").required(),
            )
            .attribute(
                "agency_name",
                AttributeBuilder::string("agency_name").required(),
            )
            .attribute(
                "agency_project_id",
                AttributeBuilder::string("agency_project_id").required(),
            )
            .build();
        let detail_block = NestedSchemaBuilder::new()
            .attribute("obs_period", AttributeBuilder::number("obs_period").optional())
            .attribute(
                "obs_period_unit",
                AttributeBuilder::string("obs_period_unit").optional(),
            )
            .attribute(
                "obs_bucket_name",
                AttributeBuilder::string("obs_bucket_name").optional(),
            )
            .attribute(
                "obs_transfer_path",
                AttributeBuilder::string("obs_transfer_path").optional(),
            )
            .attribute(
                "obs_dir_prefix_name",
                AttributeBuilder::string("obs_dir_prefix_name").optional(),
            )
            .attribute(
                "obs_prefix_name",
                AttributeBuilder::string("obs_prefix_name").optional(),
            )
            .attribute("obs_eps_id", AttributeBuilder::string("obs_eps_id").optional())
            .attribute(
                "obs_encrypted_enable",
                AttributeBuilder::bool("obs_encrypted_enable").optional(),
            )
            .attribute(
                "obs_encrypted_id",
                AttributeBuilder::string("obs_encrypted_id").optional(),
            )
            .attribute(
                "obs_time_zone",
                AttributeBuilder::string("obs_time_zone").optional(),
            )
            .attribute(
                "obs_time_zone_id",
                AttributeBuilder::string("obs_time_zone_id").optional(),
            )
            .attribute("dis_id", AttributeBuilder::string("dis_id").optional())
            .attribute("dis_name", AttributeBuilder::string("dis_name").optional())
            .attribute("kafka_id", AttributeBuilder::string("kafka_id").optional())
            .attribute("kafka_topic", AttributeBuilder::string("kafka_topic").optional())
            .attribute(
                "lts_tags",
                AttributeBuilder::list("lts_tags", AttributeType::String).optional(),
            )
            .attribute(
                "stream_tags",
                AttributeBuilder::list("stream_tags", AttributeType::String).optional(),
            )
            .attribute(
                "struct_fields",
                AttributeBuilder::list("struct_fields", AttributeType::String).optional(),
            )
            .attribute(
                "invalid_field_value",
                AttributeBuilder::string("invalid_field_value").optional(),
            )
            .attribute(
                "delivery_tags",
                AttributeBuilder::list("delivery_tags", AttributeType::String).optional(),
            )
            .build();
        let info_block = NestedSchemaBuilder::new()
            .attribute(
                "log_transfer_type",
                AttributeBuilder::string("log_transfer_type")
                    .required()
                    .description("OBS, DIS or DMS"),
            )
            .attribute(
                "log_transfer_mode",
                AttributeBuilder::string("log_transfer_mode")
                    .required()
                    .description("cycle or realTime"),
            )
            .attribute(
                "log_storage_format",
                AttributeBuilder::string("log_storage_format").required(),
            )
            .attribute(
                "log_transfer_status",
                AttributeBuilder::string("log_transfer_status").required(),
            )
            .attribute(
                "log_agency_transfer",
                AttributeBuilder::block("log_agency_transfer", agency_block)
                    .optional()
                    .max_items(1),
            )
            .attribute(
                "log_transfer_detail",
                AttributeBuilder::block("log_transfer_detail", detail_block)
                    .required()
                    .max_items(1),
            )
            .build();

        SchemaBuilder::new()
            .attribute(
                "log_group_id",
                AttributeBuilder::string("log_group_id").required().force_new(),
            )
            .attribute(
                "log_streams",
                AttributeBuilder::block("log_streams", streams_block)
                    .required()
                    .force_new(),
            )
            .attribute(
                "log_transfer_info",
                AttributeBuilder::block("log_transfer_info", info_block)
                    .required()
                    .max_items(1),
            )
            .attribute("id", AttributeBuilder::string("id").computed())
            .attribute(
                "log_group_name",
                AttributeBuilder::string("log_group_name").computed(),
            )
            .attribute("created_at", AttributeBuilder::string("created_at").computed())
            .build_resource(0)
    }
}

fn expand_streams(values: &HashMap<String, Dynamic>) -> Vec<TransferStream> {
    super::get_block_list(values, "log_streams")
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_map())
                .map(|block| TransferStream {
                    log_stream_id: super::get_string(block, "log_stream_id").unwrap_or_default(),
                    log_stream_name: super::get_string(block, "log_stream_name"),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn expand_agency(block: &HashMap<String, Dynamic>) -> Option<TransferAgency> {
    super::get_block(block, "log_agency_transfer").map(|agency| TransferAgency {
        agency_domain_id: super::get_string(agency, "agency_domain_id").unwrap_or_default(),
        agency_domain_name: super::get_string(agency, "agency_domain_name").unwrap_or_default(),
        agency_name: super::get_string(agency, "agency_name").unwrap_or_default(),
        agency_project_id: super::get_string(agency, "agency_project_id").unwrap_or_default(),
        be_agency_domain_id: None,
        be_agency_project_id: None,
    })
}

fn expand_detail(info: &HashMap<String, Dynamic>) -> TransferDetail {
    let block = match super::get_block(info, "log_transfer_detail") {
        Some(block) => block,
        None => return TransferDetail::default(),
    };
    TransferDetail {
        obs_period: super::get_i64(block, "obs_period"),
        obs_period_unit: super::get_string(block, "obs_period_unit"),
        obs_bucket_name: super::get_string(block, "obs_bucket_name"),
        obs_transfer_path: super::get_string(block, "obs_transfer_path"),
        obs_dir_prefix_name: super::get_string(block, "obs_dir_prefix_name"),
        obs_prefix_name: super::get_string(block, "obs_prefix_name"),
        obs_eps_id: super::get_string(block, "obs_eps_id"),
        obs_encrypted_enable: super::get_bool(block, "obs_encrypted_enable"),
        obs_encrypted_id: super::get_string(block, "obs_encrypted_id"),
        obs_time_zone: super::get_string(block, "obs_time_zone"),
        obs_time_zone_id: super::get_string(block, "obs_time_zone_id"),
        dis_id: super::get_string(block, "dis_id"),
        dis_name: super::get_string(block, "dis_name"),
        kafka_id: super::get_string(block, "kafka_id"),
        kafka_topic: super::get_string(block, "kafka_topic"),
        lts_tags: super::get_string_list(block, "lts_tags"),
        stream_tags: super::get_string_list(block, "stream_tags"),
        struct_fields: super::get_string_list(block, "struct_fields"),
        invalid_field_value: super::get_string(block, "invalid_field_value"),
        delivery_tags: super::get_string_list(block, "delivery_tags"),
        cloud_project_id: None,
    }
}

fn require_info(config: &Config) -> crate::Result<&HashMap<String, Dynamic>> {
    super::get_block(&config.values, "log_transfer_info")
        .ok_or_else(|| "log_transfer_info is required".into())
}

fn info_string(info: &HashMap<String, Dynamic>, name: &str) -> crate::Result<String> {
    super::get_string(info, name).ok_or_else(|| format!("{} is required", name).into())
}

fn flatten_detail(detail: &TransferDetail) -> Dynamic {
    let mut block = HashMap::new();
    if let Some(period) = detail.obs_period {
        block.insert("obs_period".to_string(), Dynamic::Number(period as f64));
    }
    let strings = [
        ("obs_period_unit", &detail.obs_period_unit),
        ("obs_bucket_name", &detail.obs_bucket_name),
        ("obs_transfer_path", &detail.obs_transfer_path),
        ("obs_dir_prefix_name", &detail.obs_dir_prefix_name),
        ("obs_prefix_name", &detail.obs_prefix_name),
        ("obs_eps_id", &detail.obs_eps_id),
        ("obs_encrypted_id", &detail.obs_encrypted_id),
        ("obs_time_zone", &detail.obs_time_zone),
        ("obs_time_zone_id", &detail.obs_time_zone_id),
        ("dis_id", &detail.dis_id),
        ("dis_name", &detail.dis_name),
        ("kafka_id", &detail.kafka_id),
        ("kafka_topic", &detail.kafka_topic),
        ("invalid_field_value", &detail.invalid_field_value),
    ];
    for (name, value) in strings {
        if let Some(value) = value {
            block.insert(name.to_string(), Dynamic::String(value.clone()));
        }
    }
    if let Some(enabled) = detail.obs_encrypted_enable {
        block.insert("obs_encrypted_enable".to_string(), Dynamic::Bool(enabled));
    }
    let lists = [
        ("lts_tags", &detail.lts_tags),
        ("stream_tags", &detail.stream_tags),
        ("struct_fields", &detail.struct_fields),
        ("delivery_tags", &detail.delivery_tags),
    ];
    for (name, list) in lists {
        if let Some(items) = list {
            block.insert(name.to_string(), super::string_list(items));
        }
    }
    Dynamic::List(vec![Dynamic::Map(block)])
}

fn flatten_transfer(transfer: &Transfer) -> State {
    let mut values = HashMap::new();
    values.insert(
        "id".to_string(),
        Dynamic::String(transfer.log_transfer_id.clone()),
    );
    if let Some(group_id) = &transfer.log_group_id {
        values.insert("log_group_id".to_string(), Dynamic::String(group_id.clone()));
    }
    if let Some(group_name) = &transfer.log_group_name {
        values.insert(
            "log_group_name".to_string(),
            Dynamic::String(group_name.clone()),
        );
    }
    if let Some(streams) = &transfer.log_streams {
        let items = streams
            .iter()
            .map(|s| {
                let mut block = HashMap::new();
                block.insert(
                    "log_stream_id".to_string(),
                    Dynamic::String(s.log_stream_id.clone()),
                );
                if let Some(name) = &s.log_stream_name {
                    block.insert("log_stream_name".to_string(), Dynamic::String(name.clone()));
                }
                Dynamic::Map(block)
            })
            .collect();
        values.insert("log_streams".to_string(), Dynamic::List(items));
    }
    if let Some(info) = &transfer.log_transfer_info {
        let mut block = HashMap::new();
        block.insert(
            "log_transfer_type".to_string(),
            Dynamic::String(info.log_transfer_type.clone()),
        );
        block.insert(
            "log_transfer_mode".to_string(),
            Dynamic::String(info.log_transfer_mode.clone()),
        );
        block.insert(
            "log_storage_format".to_string(),
            Dynamic::String(info.log_storage_format.clone()),
        );
        block.insert(
            "log_transfer_status".to_string(),
            Dynamic::String(info.log_transfer_status.clone()),
        );
        if let Some(agency) = &info.log_agency_transfer {
            let mut agency_block = HashMap::new();
            agency_block.insert(
                "agency_domain_id".to_string(),
                Dynamic::String(agency.agency_domain_id.clone()),
            );
            agency_block.insert(
                "agency_domain_name".to_string(),
                Dynamic::String(agency.agency_domain_name.clone()),
            );
            agency_block.insert(
                "agency_name".to_string(),
                Dynamic::String(agency.agency_name.clone()),
            );
            agency_block.insert(
                "agency_project_id".to_string(),
                Dynamic::String(agency.agency_project_id.clone()),
            );
            block.insert(
                "log_agency_transfer".to_string(),
                Dynamic::List(vec![Dynamic::Map(agency_block)]),
            );
        }
        block.insert(
            "log_transfer_detail".to_string(),
            flatten_detail(&info.log_transfer_detail),
        );
        values.insert(
            "log_transfer_info".to_string(),
            Dynamic::List(vec![Dynamic::Map(block)]),
        );
        if let Some(created) = info.log_create_time.and_then(format_timestamp_rfc3339) {
            values.insert("created_at".to_string(), Dynamic::String(created));
        }
    }
    State { values }
}

impl Resource for TransferResource {
    fn schema(&self) -> ResourceSchema {
        Self::schema_static()
    }

    fn create(&self, config: Config) -> crate::Result<(State, Diagnostics)> {
        let diags = Diagnostics::new();

        let log_group_id = config.require_string("log_group_id")?.to_string();
        let info = require_info(&config)?;

        let request = CreateTransferRequest {
            log_group_id,
            log_streams: expand_streams(&config.values),
            log_transfer_info: TransferInfo {
                log_transfer_type: info_string(info, "log_transfer_type")?,
                log_transfer_mode: info_string(info, "log_transfer_mode")?,
                log_storage_format: info_string(info, "log_storage_format")?,
                log_transfer_status: info_string(info, "log_transfer_status")?,
                log_agency_transfer: expand_agency(info),
                log_transfer_detail: expand_detail(info),
                log_create_time: None,
            },
        };

        let client = self.client.clone();
        let transfer_id = block_on(async move { client.create_transfer(&request).await })
            .map_err(|e| format!("Failed to create log transfer: {}", e))?;

        let mut values = config.values;
        values.insert("id".to_string(), Dynamic::String(transfer_id));
        Ok((State { values }, diags))
    }

    fn read(&self, state: State) -> crate::Result<(Option<State>, Diagnostics)> {
        let diags = Diagnostics::new();

        let transfer_id = state.require_string("id")?.to_string();

        let client = self.client.clone();
        let transfer = block_on(async move { client.get_transfer(&transfer_id).await })
            .map_err(|e| format!("Failed to read log transfer: {}", e))?;

        Ok((transfer.as_ref().map(flatten_transfer), diags))
    }

    fn update(&self, state: State, config: Config) -> crate::Result<(State, Diagnostics)> {
        let diags = Diagnostics::new();

        let transfer_id = state.require_string("id")?.to_string();
        let info = require_info(&config)?;

        let request = UpdateTransferRequest {
            log_transfer_id: transfer_id.clone(),
            log_transfer_info: UpdateTransferInfo {
                log_storage_format: info_string(info, "log_storage_format")?,
                log_transfer_status: info_string(info, "log_transfer_status")?,
                log_transfer_detail: expand_detail(info),
            },
        };

        let client = self.client.clone();
        block_on(async move { client.update_transfer(&request).await })
            .map_err(|e| format!("Failed to update log transfer: {}", e))?;

        let mut values = config.values;
        values.insert("id".to_string(), Dynamic::String(transfer_id));
        if let Some(created) = state.values.get("created_at") {
            values.insert("created_at".to_string(), created.clone());
        }
        Ok((State { values }, diags))
    }

    fn delete(&self, state: State) -> crate::Result<Diagnostics> {
        let diags = Diagnostics::new();

        let transfer_id = state.require_string("id")?.to_string();

        let client = self.client.clone();
        block_on(async move { client.delete_transfer(&transfer_id).await })
            .map_err(|e| format!("Failed to delete log transfer: {}", e))?;

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
            "log_stream_id".to_string(),
            Dynamic::String("ls-1".to_string()),
        );

        let mut detail = HashMap::new();
        detail.insert("obs_period".to_string(), Dynamic::Number(3.0));
        detail.insert(
            "obs_period_unit".to_string(),
            Dynamic::String("hour".to_string()),
        );
        detail.insert(
            "obs_bucket_name".to_string(),
            Dynamic::String("log-archive".to_string()),
        );

        let mut info = HashMap::new();
        info.insert(
            "log_transfer_type".to_string(),
            Dynamic::String("OBS".to_string()),
        );
        info.insert(
            "log_transfer_mode".to_string(),
            Dynamic::String("cycle".to_string()),
        );
        info.insert(
            "log_storage_format".to_string(),
            Dynamic::String("RAW".to_string()),
        );
        info.insert(
            "log_transfer_status".to_string(),
            Dynamic::String("ENABLE".to_string()),
        );
        info.insert(
            "log_transfer_detail".to_string(),
            Dynamic::List(vec![Dynamic::Map(detail)]),
        );

        let mut values = HashMap::new();
        values.insert(
            "log_group_id".to_string(),
            Dynamic::String("lg-1".to_string()),
        );
        values.insert(
            "log_streams".to_string(),
            Dynamic::List(vec![Dynamic::Map(stream)]),
        );
        values.insert(
            "log_transfer_info".to_string(),
            Dynamic::List(vec![Dynamic::Map(info)]),
        );
        Config { values }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_creates_obs_transfer() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/test-project/transfers")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "log_group_id": "lg-1",
                "log_streams": [{"log_stream_id": "ls-1"}],
                "log_transfer_info": {
                    "log_transfer_type": "OBS",
                    "log_transfer_detail": {"obs_period": 3, "obs_bucket_name": "log-archive"}
                }
            })))
            .with_status(201)
            .with_body(r#"{"log_transfer_id":"lt-1"}"#)
            .create_async()
            .await;

        let resource = TransferResource::new(create_test_client(&server));
        let (state, diags) = resource.create(create_test_config()).unwrap();

        mock.assert_async().await;
        assert!(diags.errors.is_empty());
        assert_eq!(state.values["id"].as_string(), Some("lt-1"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_reads_transfer_from_listing() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v2/test-project/transfers")
            .with_status(200)
            .with_body(
                r#"{"log_transfers":[{
                    "log_transfer_id":"lt-1",
                    "log_group_id":"lg-1",
                    "log_group_name":"app",
                    "log_streams":[{"log_stream_id":"ls-1","log_stream_name":"web"}],
                    "log_transfer_info":{
                        "log_transfer_type":"OBS",
                        "log_transfer_mode":"cycle",
                        "log_storage_format":"RAW",
                        "log_transfer_status":"ENABLE",
                        "log_create_time":1700000000000,
                        "log_transfer_detail":{"obs_period":3,"obs_period_unit":"hour","obs_bucket_name":"log-archive"}
                    }
                }]}"#,
            )
            .create_async()
            .await;

        let resource = TransferResource::new(create_test_client(&server));
        let mut values = HashMap::new();
        values.insert("id".to_string(), Dynamic::String("lt-1".to_string()));

        let (state, _) = resource.read(State { values }).unwrap();
        let state = state.unwrap();
        assert_eq!(state.values["log_group_name"].as_string(), Some("app"));
        assert_eq!(
            state.values["created_at"].as_string(),
            Some("2023-11-14T22:13:20Z")
        );

        let info = state.values["log_transfer_info"].as_list().unwrap()[0]
            .as_map()
            .unwrap();
        assert_eq!(info["log_transfer_type"].as_string(), Some("OBS"));
        let detail = info["log_transfer_detail"].as_list().unwrap()[0]
            .as_map()
            .unwrap();
        assert_eq!(detail["obs_bucket_name"].as_string(), Some("log-archive"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_read_reports_gone_transfer_as_none() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v2/test-project/transfers")
            .with_status(200)
            .with_body(r#"{"log_transfers":[]}"#)
            .create_async()
            .await;

        let resource = TransferResource::new(create_test_client(&server));
        let mut values = HashMap::new();
        values.insert("id".to_string(), Dynamic::String("lt-1".to_string()));

        let (state, _) = resource.read(State { values }).unwrap();
        assert!(state.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_deletes_with_query_param() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/v2/test-project/transfers?log_transfer_id=lt-1")
            .with_status(200)
            .create_async()
            .await;

        let resource = TransferResource::new(create_test_client(&server));
        let mut values = HashMap::new();
        values.insert("id".to_string(), Dynamic::String("lt-1".to_string()));

        let diags = resource.delete(State { values }).unwrap();
        mock.assert_async().await;
        assert!(diags.errors.is_empty());
    }
}

use std::collections::HashMap;

use crate::api::streams::CreateLogStreamRequest;
use crate::api::Client;
use crate::schema::{AttributeBuilder, AttributeType, ResourceSchema, SchemaBuilder};
use crate::types::{Config, Diagnostics, Dynamic, State};
use crate::utils::{block_on, format_timestamp_rfc3339};
use crate::Resource;

/// Log streams have no update endpoint; every attribute forces replacement
pub struct LogStreamResource {
    client: Client,
}

impl LogStreamResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .attribute(
                "group_id",
                AttributeBuilder::string("group_id")
                    .required()
                    .force_new()
                    .description("Id of the parent log group"),
            )
            .attribute(
                "stream_name",
                AttributeBuilder::string("stream_name")
                    .required()
                    .force_new()
                    .description("Log stream name"),
            )
            .attribute(
                "ttl_in_days",
                AttributeBuilder::number("ttl_in_days")
                    .optional()
                    .force_new()
                    .description("Retention in days, inherits the group setting when absent"),
            )
            .attribute(
                "tags",
                AttributeBuilder::map("tags", AttributeType::String)
                    .optional()
                    .force_new(),
            )
            .attribute("id", AttributeBuilder::string("id").computed())
            .attribute("filter_count", AttributeBuilder::number("filter_count").computed())
            .attribute("created_at", AttributeBuilder::string("created_at").computed())
            .build_resource(0)
    }
}

impl Resource for LogStreamResource {
    fn schema(&self) -> ResourceSchema {
        Self::schema_static()
    }

    fn create(&self, config: Config) -> crate::Result<(State, Diagnostics)> {
        let diags = Diagnostics::new();

        let group_id = config.require_string("group_id")?.to_string();
        let name = config.require_string("stream_name")?;

        let request = CreateLogStreamRequest {
            log_stream_name: name.to_string(),
            ttl_in_days: super::get_i64(&config.values, "ttl_in_days"),
            tags: super::get_string_map(&config.values, "tags"),
        };

        let client = self.client.clone();
        let gid = group_id.clone();
        let stream_id = block_on(async move { client.create_log_stream(&gid, &request).await })
            .map_err(|e| format!("Failed to create log stream: {}", e))?;

        let mut values = config.values;
        values.insert("id".to_string(), Dynamic::String(stream_id));
        Ok((State { values }, diags))
    }

    fn read(&self, state: State) -> crate::Result<(Option<State>, Diagnostics)> {
        let diags = Diagnostics::new();

        let group_id = state.require_string("group_id")?.to_string();
        let stream_id = state.require_string("id")?.to_string();

        let client = self.client.clone();
        let gid = group_id.clone();
        let stream = block_on(async move { client.get_log_stream(&gid, &stream_id).await })
            .map_err(|e| format!("Failed to read log stream: {}", e))?;

        let stream = match stream {
            Some(stream) => stream,
            None => return Ok((None, diags)),
        };

        let mut values = HashMap::new();
        values.insert("id".to_string(), Dynamic::String(stream.log_stream_id));
        values.insert("group_id".to_string(), Dynamic::String(group_id));
        values.insert(
            "stream_name".to_string(),
            Dynamic::String(stream.log_stream_name),
        );
        if let Some(ttl) = stream.ttl_in_days {
            values.insert("ttl_in_days".to_string(), Dynamic::Number(ttl as f64));
        }
        if let Some(count) = stream.filter_count {
            values.insert("filter_count".to_string(), Dynamic::Number(count as f64));
        }
        if let Some(created) = stream.creation_time.and_then(format_timestamp_rfc3339) {
            values.insert("created_at".to_string(), Dynamic::String(created));
        }
        if let Some(tags) = &stream.tag {
            values.insert("tags".to_string(), super::string_map(tags));
        }

        Ok((Some(State { values }), diags))
    }

    fn update(&self, _state: State, _config: Config) -> crate::Result<(State, Diagnostics)> {
        Err(crate::ProviderError::InvalidState(
            "log streams cannot be updated in place".to_string(),
        ))
    }

    fn delete(&self, state: State) -> crate::Result<Diagnostics> {
        let diags = Diagnostics::new();

        let group_id = state.require_string("group_id")?.to_string();
        let stream_id = state.require_string("id")?.to_string();

        let client = self.client.clone();
        block_on(async move { client.delete_log_stream(&group_id, &stream_id).await })
            .map_err(|e| format!("Failed to delete log stream: {}", e))?;

        Ok(diags)
    }
}

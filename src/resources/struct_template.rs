use std::collections::HashMap;

use crate::api::templates::{CreateStructTemplateRequest, UpdateStructTemplateRequest};
use crate::api::Client;
use crate::schema::{AttributeBuilder, ResourceSchema, SchemaBuilder};
use crate::types::{Config, Diagnostics, Dynamic, State};
use crate::utils::block_on;
use crate::Resource;

const DEFAULT_TEMPLATE_TYPE: &str = "custom";

/// Structuring template of a log stream. A stream holds at most one
/// template, so reads address it by group and stream rather than by id.
pub struct StructTemplateResource {
    client: Client,
}

impl StructTemplateResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .attribute(
                "log_group_id",
                AttributeBuilder::string("log_group_id").required().force_new(),
            )
            .attribute(
                "log_stream_id",
                AttributeBuilder::string("log_stream_id").required().force_new(),
            )
            .attribute(
                "demo_log",
                AttributeBuilder::string("demo_log")
                    .required()
                    .description("Sample log line the parse rule is derived from"),
            )
            .attribute(
                "parse_type",
                AttributeBuilder::string("parse_type")
                    .required()
                    .description("split, json or custom_regex"),
            )
            .attribute("tokenizer", AttributeBuilder::string("tokenizer").optional())
            .attribute(
                "regex_rules",
                AttributeBuilder::string("regex_rules").optional(),
            )
            .attribute("layers", AttributeBuilder::number("layers").optional())
            .attribute("log_format", AttributeBuilder::string("log_format").optional())
            .attribute(
                "template_type",
                AttributeBuilder::string("template_type").optional(),
            )
            .attribute("id", AttributeBuilder::string("id").computed())
            .build_resource(0)
    }

    fn build_request(config: &Config) -> crate::Result<CreateStructTemplateRequest> {
        Ok(CreateStructTemplateRequest {
            log_group_id: config.require_string("log_group_id")?.to_string(),
            log_stream_id: config.require_string("log_stream_id")?.to_string(),
            template_type: super::get_string(&config.values, "template_type")
                .unwrap_or_else(|| DEFAULT_TEMPLATE_TYPE.to_string()),
            demo_log: config.require_string("demo_log")?.to_string(),
            parse_type: config.require_string("parse_type")?.to_string(),
            tokenizer: super::get_string(&config.values, "tokenizer"),
            regex_rules: super::get_string(&config.values, "regex_rules"),
            layers: super::get_i64(&config.values, "layers"),
            log_format: super::get_string(&config.values, "log_format"),
        })
    }
}

impl Resource for StructTemplateResource {
    fn schema(&self) -> ResourceSchema {
        Self::schema_static()
    }

    fn create(&self, config: Config) -> crate::Result<(State, Diagnostics)> {
        let diags = Diagnostics::new();

        let request = Self::build_request(&config)?;

        let client = self.client.clone();
        let template_id = block_on(async move { client.create_struct_template(&request).await })
            .map_err(|e| format!("Failed to create struct template: {}", e))?;

        let mut values = config.values;
        values.insert("id".to_string(), Dynamic::String(template_id));
        Ok((State { values }, diags))
    }

    fn read(&self, state: State) -> crate::Result<(Option<State>, Diagnostics)> {
        let diags = Diagnostics::new();

        let log_group_id = state.require_string("log_group_id")?.to_string();
        let log_stream_id = state.require_string("log_stream_id")?.to_string();

        let client = self.client.clone();
        let gid = log_group_id.clone();
        let sid = log_stream_id.clone();
        let template = block_on(async move { client.get_struct_template(&gid, &sid).await })
            .map_err(|e| format!("Failed to read struct template: {}", e))?;

        let template = match template {
            Some(template) => template,
            None => return Ok((None, diags)),
        };

        let mut values = HashMap::new();
        values.insert("id".to_string(), Dynamic::String(template.id));
        values.insert("log_group_id".to_string(), Dynamic::String(log_group_id));
        values.insert("log_stream_id".to_string(), Dynamic::String(log_stream_id));
        if let Some(demo_log) = template.demo_log {
            values.insert("demo_log".to_string(), Dynamic::String(demo_log));
        }
        if let Some(parse_type) = template.parse_type {
            values.insert("parse_type".to_string(), Dynamic::String(parse_type));
        }
        if let Some(tokenizer) = template.tokenizer {
            values.insert("tokenizer".to_string(), Dynamic::String(tokenizer));
        }
        if let Some(regex_rules) = template.regex_rules {
            values.insert("regex_rules".to_string(), Dynamic::String(regex_rules));
        }
        if let Some(template_type) = template.template_type {
            values.insert("template_type".to_string(), Dynamic::String(template_type));
        }

        Ok((Some(State { values }), diags))
    }

    fn update(&self, state: State, config: Config) -> crate::Result<(State, Diagnostics)> {
        let diags = Diagnostics::new();

        let template_id = state.require_string("id")?.to_string();

        let request = UpdateStructTemplateRequest {
            id: template_id.clone(),
            template: Self::build_request(&config)?,
        };

        let client = self.client.clone();
        block_on(async move { client.update_struct_template(&request).await })
            .map_err(|e| format!("Failed to update struct template: {}", e))?;

        let mut values = config.values;
        values.insert("id".to_string(), Dynamic::String(template_id));
        Ok((State { values }, diags))
    }

    fn delete(&self, state: State) -> crate::Result<Diagnostics> {
        let diags = Diagnostics::new();

        let template_id = state.require_string("id")?.to_string();

        let client = self.client.clone();
        block_on(async move { client.delete_struct_template(&template_id).await })
            .map_err(|e| format!("Failed to delete struct template: {}", e))?;

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
        values.insert(
            "log_group_id".to_string(),
            Dynamic::String("lg-1".to_string()),
        );
        values.insert(
            "log_stream_id".to_string(),
            Dynamic::String("ls-1".to_string()),
        );
        values.insert(
            "demo_log".to_string(),
            Dynamic::String("2023-11-14 22:13:20 ERROR boom".to_string()),
        );
        values.insert("parse_type".to_string(), Dynamic::String("split".to_string()));
        values.insert("tokenizer".to_string(), Dynamic::String(" ".to_string()));
        Config { values }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_creates_template_from_string_response() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v2/test-project/lts/struct/template")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "log_group_id": "lg-1",
                "log_stream_id": "ls-1",
                "template_type": "custom",
                "parse_type": "split"
            })))
            .with_status(201)
            .with_body(r#""tpl-1""#)
            .create_async()
            .await;

        let resource = StructTemplateResource::new(create_test_client(&server));
        let (state, diags) = resource.create(create_test_config()).unwrap();

        mock.assert_async().await;
        assert!(diags.errors.is_empty());
        assert_eq!(state.values["id"].as_string(), Some("tpl-1"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_reads_template_by_stream() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock(
                "GET",
                "/v2/test-project/lts/struct/template?logGroupId=lg-1&logStreamId=ls-1",
            )
            .with_status(200)
            .with_body(
                r#"{"id":"tpl-1","logGroupId":"lg-1","logStreamId":"ls-1","parseType":"split","tokenizer":" "}"#,
            )
            .create_async()
            .await;

        let resource = StructTemplateResource::new(create_test_client(&server));
        let mut values = HashMap::new();
        values.insert(
            "log_group_id".to_string(),
            Dynamic::String("lg-1".to_string()),
        );
        values.insert(
            "log_stream_id".to_string(),
            Dynamic::String("ls-1".to_string()),
        );

        let (state, _) = resource.read(State { values }).unwrap();
        let state = state.unwrap();
        assert_eq!(state.values["id"].as_string(), Some("tpl-1"));
        assert_eq!(state.values["parse_type"].as_string(), Some("split"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_read_treats_empty_body_as_gone() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock(
                "GET",
                "/v2/test-project/lts/struct/template?logGroupId=lg-1&logStreamId=ls-1",
            )
            .with_status(200)
            .with_body("")
            .create_async()
            .await;

        let resource = StructTemplateResource::new(create_test_client(&server));
        let mut values = HashMap::new();
        values.insert(
            "log_group_id".to_string(),
            Dynamic::String("lg-1".to_string()),
        );
        values.insert(
            "log_stream_id".to_string(),
            Dynamic::String("ls-1".to_string()),
        );

        let (state, _) = resource.read(State { values }).unwrap();
        assert!(state.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_deletes_template_with_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/v2/test-project/lts/struct/template")
            .match_body(mockito::Matcher::Json(serde_json::json!({"id": "tpl-1"})))
            .with_status(200)
            .create_async()
            .await;

        let resource = StructTemplateResource::new(create_test_client(&server));
        let mut values = HashMap::new();
        values.insert("id".to_string(), Dynamic::String("tpl-1".to_string()));

        let diags = resource.delete(State { values }).unwrap();
        mock.assert_async().await;
        assert!(diags.errors.is_empty());
    }
}

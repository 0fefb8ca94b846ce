use std::collections::HashMap;

use crate::api::groups::{CreateLogGroupRequest, UpdateLogGroupRequest};
use crate::api::Client;
use crate::schema::{AttributeBuilder, AttributeType, ResourceSchema, SchemaBuilder};
use crate::types::{Config, Diagnostics, Dynamic, State};
use crate::utils::{block_on, format_timestamp_rfc3339};
use crate::Resource;

pub struct LogGroupResource {
    client: Client,
}

impl LogGroupResource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .attribute(
                "group_name",
                AttributeBuilder::string("group_name")
                    .required()
                    .force_new()
                    .description("Log group name"),
            )
            .attribute(
                "ttl_in_days",
                AttributeBuilder::number("ttl_in_days")
                    .required()
                    .description("Log retention in days"),
            )
            .attribute(
                "tags",
                AttributeBuilder::map("tags", AttributeType::String).optional(),
            )
            .attribute("id", AttributeBuilder::string("id").computed())
            .attribute("created_at", AttributeBuilder::string("created_at").computed())
            .build_resource(0)
    }

    fn flatten(group: &crate::api::groups::LogGroup) -> State {
        let mut values = HashMap::new();
        values.insert(
            "id".to_string(),
            Dynamic::String(group.log_group_id.clone()),
        );
        values.insert(
            "group_name".to_string(),
            Dynamic::String(group.log_group_name.clone()),
        );
        if let Some(ttl) = group.ttl_in_days {
            values.insert("ttl_in_days".to_string(), Dynamic::Number(ttl as f64));
        }
        if let Some(created) = group.creation_time.and_then(format_timestamp_rfc3339) {
            values.insert("created_at".to_string(), Dynamic::String(created));
        }
        if let Some(tags) = &group.tag {
            values.insert("tags".to_string(), super::string_map(tags));
        }
        State { values }
    }
}

impl Resource for LogGroupResource {
    fn schema(&self) -> ResourceSchema {
        Self::schema_static()
    }

    fn create(&self, config: Config) -> crate::Result<(State, Diagnostics)> {
        let diags = Diagnostics::new();

        let name = config.require_string("group_name")?;
        let ttl = super::get_i64(&config.values, "ttl_in_days").ok_or("ttl_in_days is required")?;

        let request = CreateLogGroupRequest {
            log_group_name: name.to_string(),
            ttl_in_days: ttl,
            tags: super::get_string_map(&config.values, "tags"),
        };

        let client = self.client.clone();
        let group_id = block_on(async move { client.create_log_group(&request).await })
            .map_err(|e| format!("Failed to create log group: {}", e))?;

        tracing::debug!("Created log group {}", group_id);

        let mut values = config.values;
        values.insert("id".to_string(), Dynamic::String(group_id));
        Ok((State { values }, diags))
    }

    fn read(&self, state: State) -> crate::Result<(Option<State>, Diagnostics)> {
        let diags = Diagnostics::new();

        let group_id = state.require_string("id")?.to_string();

        let client = self.client.clone();
        let group = block_on(async move { client.get_log_group(&group_id).await })
            .map_err(|e| format!("Failed to read log group: {}", e))?;

        Ok((group.as_ref().map(Self::flatten), diags))
    }

    fn update(&self, state: State, config: Config) -> crate::Result<(State, Diagnostics)> {
        let diags = Diagnostics::new();

        let group_id = state.require_string("id")?.to_string();
        let ttl = super::get_i64(&config.values, "ttl_in_days").ok_or("ttl_in_days is required")?;

        let request = UpdateLogGroupRequest { ttl_in_days: ttl };
        let client = self.client.clone();
        let id = group_id.clone();
        block_on(async move { client.update_log_group(&id, &request).await })
            .map_err(|e| format!("Failed to update log group: {}", e))?;

        let mut values = config.values;
        values.insert("id".to_string(), Dynamic::String(group_id));
        if let Some(created) = state.values.get("created_at") {
            values.insert("created_at".to_string(), created.clone());
        }
        Ok((State { values }, diags))
    }

    fn delete(&self, state: State) -> crate::Result<Diagnostics> {
        let mut diags = Diagnostics::new();

        let group_id = state.require_string("id")?.to_string();

        let client = self.client.clone();
        let id = group_id.clone();
        // A group deleted out of band is the outcome we wanted anyway
        if let Err(e) = block_on(async move { client.delete_log_group(&id).await }) {
            if !e.is_not_found(&[]) {
                return Err(format!("Failed to delete log group: {}", e).into());
            }
            tracing::warn!("Log group {} was already deleted: {}", group_id, e);
            diags.add_warning(
                "Log group was already deleted",
                Some(format!("{}: {}", group_id, e)),
            );
        }

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
            "group_name".to_string(),
            Dynamic::String("app-logs".to_string()),
        );
        values.insert("ttl_in_days".to_string(), Dynamic::Number(30.0));
        Config { values }
    }

    fn state_with_id(id: &str) -> State {
        let mut values = HashMap::new();
        values.insert("id".to_string(), Dynamic::String(id.to_string()));
        State { values }
    }

    #[test]
    fn resource_has_correct_schema() {
        let schema = LogGroupResource::schema_static();

        assert!(schema.attributes["group_name"].required);
        assert!(schema.attributes["group_name"].force_new);
        assert!(schema.attributes["ttl_in_days"].required);
        assert!(schema.attributes["tags"].optional);
        assert!(schema.attributes["id"].computed);
        assert!(schema.attributes["created_at"].computed);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_creates_log_group() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v2/test-project/groups")
            .with_status(201)
            .with_body(r#"{"log_group_id":"lg-1"}"#)
            .create_async()
            .await;

        let resource = LogGroupResource::new(create_test_client(&server));
        let (state, diags) = resource.create(create_test_config()).unwrap();

        assert!(diags.errors.is_empty());
        assert_eq!(state.values["id"].as_string(), Some("lg-1"));
        assert_eq!(state.values["group_name"].as_string(), Some("app-logs"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_reads_group_from_listing() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v2/test-project/groups")
            .with_status(200)
            .with_body(
                r#"{"log_groups":[
                    {"log_group_id":"lg-0","log_group_name":"other","ttl_in_days":7,"creation_time":1700000000000},
                    {"log_group_id":"lg-1","log_group_name":"app-logs","ttl_in_days":30,"creation_time":1700000000000}
                ]}"#,
            )
            .create_async()
            .await;

        let resource = LogGroupResource::new(create_test_client(&server));
        let (state, diags) = resource.read(state_with_id("lg-1")).unwrap();

        assert!(diags.errors.is_empty());
        let state = state.unwrap();
        assert_eq!(state.values["group_name"].as_string(), Some("app-logs"));
        assert_eq!(state.values["ttl_in_days"].as_i64(), Some(30));
        assert_eq!(
            state.values["created_at"].as_string(),
            Some("2023-11-14T22:13:20Z")
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_read_reports_gone_group_as_none() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v2/test-project/groups")
            .with_status(200)
            .with_body(r#"{"log_groups":[]}"#)
            .create_async()
            .await;

        let resource = LogGroupResource::new(create_test_client(&server));
        let (state, _) = resource.read(state_with_id("lg-1")).unwrap();
        assert!(state.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_updates_retention() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("PUT", "/v2/test-project/groups/lg-1")
            .with_status(200)
            .with_body(r#"{"log_group_id":"lg-1","ttl_in_days":60}"#)
            .create_async()
            .await;

        let resource = LogGroupResource::new(create_test_client(&server));
        let mut config = create_test_config();
        config
            .values
            .insert("ttl_in_days".to_string(), Dynamic::Number(60.0));

        let (state, diags) = resource.update(state_with_id("lg-1"), config).unwrap();
        assert!(diags.errors.is_empty());
        assert_eq!(state.values["ttl_in_days"].as_i64(), Some(60));
        assert_eq!(state.values["id"].as_string(), Some("lg-1"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_deletes_log_group() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/v2/test-project/groups/lg-1")
            .with_status(200)
            .create_async()
            .await;

        let resource = LogGroupResource::new(create_test_client(&server));
        let diags = resource.delete(state_with_id("lg-1")).unwrap();
        assert!(diags.errors.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_delete_tolerates_missing_group() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/v2/test-project/groups/lg-1")
            .with_status(404)
            .with_body(r#"{"error_code":"LTS.0201","error_msg":"log group not existed"}"#)
            .create_async()
            .await;

        let resource = LogGroupResource::new(create_test_client(&server));
        let diags = resource.delete(state_with_id("lg-1")).unwrap();
        assert!(diags.errors.is_empty());
        assert_eq!(diags.warnings.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resource_delete_propagates_other_errors() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/v2/test-project/groups/lg-1")
            .with_status(500)
            .with_body(r#"{"error_code":"LTS.0010","error_msg":"internal error"}"#)
            .create_async()
            .await;

        let resource = LogGroupResource::new(create_test_client(&server));
        let err = resource.delete(state_with_id("lg-1")).unwrap_err();
        assert!(err.to_string().contains("Failed to delete log group"));
    }
}

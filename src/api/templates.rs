//! Log structuring template operations
//!
//! A stream has at most one structuring template, so reads address it by
//! group and stream id. The create endpoint answers with the bare template
//! id as a JSON string.

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::error::ApiError;
use super::query::ApiQueryParams;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegexRule {
    #[serde(rename = "type")]
    pub rule_type: String,
    pub rule: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateStructTemplateRequest {
    pub log_group_id: String,
    pub log_stream_id: String,
    pub template_type: String,
    pub demo_log: String,
    pub parse_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokenizer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex_rules: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layers: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_format: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateStructTemplateRequest {
    pub id: String,
    #[serde(flatten)]
    pub template: CreateStructTemplateRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StructTemplate {
    pub id: String,
    #[serde(rename = "logGroupId")]
    pub log_group_id: Option<String>,
    #[serde(rename = "logStreamId")]
    pub log_stream_id: Option<String>,
    #[serde(rename = "demoLog")]
    pub demo_log: Option<String>,
    #[serde(rename = "parseType")]
    pub parse_type: Option<String>,
    pub tokenizer: Option<String>,
    #[serde(rename = "regexRules")]
    pub regex_rules: Option<String>,
    #[serde(rename = "templateType")]
    pub template_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct DeleteStructTemplateRequest<'a> {
    id: &'a str,
}

impl Client {
    pub async fn create_struct_template(
        &self,
        request: &CreateStructTemplateRequest,
    ) -> Result<String, ApiError> {
        // the response body is the template id as a quoted JSON string
        self.post("/v2/{project_id}/lts/struct/template", request)
            .await
    }

    pub async fn update_struct_template(
        &self,
        request: &UpdateStructTemplateRequest,
    ) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .put("/v2/{project_id}/lts/struct/template", request)
            .await?;
        Ok(())
    }

    /// `None` when the stream has no template; the endpoint answers an
    /// empty body in that case
    pub async fn get_struct_template(
        &self,
        log_group_id: &str,
        log_stream_id: &str,
    ) -> Result<Option<StructTemplate>, ApiError> {
        let query = ApiQueryParams::new()
            .add("logGroupId", log_group_id)
            .add("logStreamId", log_stream_id)
            .to_query_string();
        let path = format!("/v2/{{project_id}}/lts/struct/template{}", query);
        self.get(&path).await
    }

    pub async fn delete_struct_template(&self, template_id: &str) -> Result<(), ApiError> {
        let request = DeleteStructTemplateRequest { id: template_id };
        self.delete_with_body("/v2/{project_id}/lts/struct/template", &request)
            .await
    }
}

//! HTTP client for the LTS API
//!
//! One client per configured provider, cheap to clone. Paths may contain a
//! `{project_id}` placeholder which is substituted with the configured
//! project before the request goes out.

use reqwest::header::CONTENT_TYPE;
use reqwest::{ClientBuilder, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::error::ApiError;

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    endpoint: String,
    project_id: String,
    token: String,
}

/// Error body shape used by all LTS endpoints
#[derive(Deserialize)]
struct ErrorBody {
    error_code: Option<String>,
    error_msg: Option<String>,
}

impl Client {
    pub fn new(
        endpoint: &str,
        project_id: &str,
        token: &str,
        insecure: bool,
    ) -> Result<Self, ApiError> {
        let http = ClientBuilder::new()
            .danger_accept_invalid_certs(insecure)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                endpoint: endpoint.trim_end_matches('/').to_string(),
                project_id: project_id.to_string(),
                token: token.to_string(),
            }),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.inner.project_id
    }

    fn url(&self, path: &str) -> String {
        let path = path.replace("{project_id}", &self.inner.project_id);
        format!("{}/{}", self.inner.endpoint, path.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, None::<&()>).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let _: serde_json::Value = self.request(Method::DELETE, path, None::<&()>).await?;
        Ok(())
    }

    /// Some endpoints take the ids to remove in a DELETE body
    pub async fn delete_with_body<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let _: serde_json::Value = self.request(Method::DELETE, path, Some(body)).await?;
        Ok(())
    }

    async fn request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        tracing::debug!("{} request to: {}", method, url);

        let mut request = self
            .inner
            .http
            .request(method, &url)
            .header("X-Auth-Token", &self.inner.token)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Auth);
        }

        let text = response.text().await?;

        if !status.is_success() {
            return Err(parse_error(status.as_u16(), &text));
        }

        tracing::debug!("API response body: {}", text);

        // Several endpoints answer 200/201 with an empty body; decode that
        // as JSON null so `()` and `Option<T>` targets work unchanged
        let payload = if text.trim().is_empty() { "null" } else { &text };
        serde_json::from_str(payload).map_err(|e| {
            tracing::error!("Failed to parse API response: {}", e);
            ApiError::Parse(format!("{}: {}", e, text))
        })
    }
}

fn parse_error(status: u16, text: &str) -> ApiError {
    match serde_json::from_str::<ErrorBody>(text) {
        Ok(body) => ApiError::Api {
            status,
            code: body.error_code,
            message: body.error_msg.unwrap_or_else(|| text.to_string()),
        },
        Err(_) => ApiError::Api {
            status,
            code: None,
            message: text.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn test_client(server: &Server) -> Client {
        Client::new(&server.url(), "project-1", "test-token", false).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn substitutes_project_id_and_sends_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v2/project-1/groups")
            .match_header("x-auth-token", "test-token")
            .with_status(200)
            .with_body(r#"{"log_groups":[]}"#)
            .create_async()
            .await;

        let client = test_client(&server);
        let _: serde_json::Value = client.get("/v2/{project_id}/groups").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn parses_service_error_body() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/v2/project-1/transfers")
            .with_status(500)
            .with_body(r#"{"error_code":"LTS.0403","error_msg":"no permission"}"#)
            .create_async()
            .await;

        let client = test_client(&server);
        let err = client
            .get::<serde_json::Value>("/v2/{project_id}/transfers")
            .await
            .unwrap_err();

        match err {
            ApiError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 500);
                assert_eq!(code.as_deref(), Some("LTS.0403"));
                assert_eq!(message, "no permission");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unauthorized_maps_to_auth_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/v2/project-1/groups")
            .with_status(401)
            .create_async()
            .await;

        let client = test_client(&server);
        let err = client
            .get::<serde_json::Value>("/v2/{project_id}/groups")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Auth));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_body_decodes_as_unit() {
        let mut server = Server::new_async().await;
        server
            .mock("DELETE", "/v2/project-1/groups/g-1")
            .with_status(200)
            .create_async()
            .await;

        let client = test_client(&server);
        client.delete("/v2/{project_id}/groups/g-1").await.unwrap();
    }
}

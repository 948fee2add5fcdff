//! Remote capabilities backed by an HTTP tool server.
//!
//! The server exposes two endpoints:
//!
//! - `POST {base}/list_tools` returns `{"tools": [{"name", "description", "inputSchema"}]}`
//! - `POST {base}/execute_tool` takes `{"tool", "parameters"}` and returns
//!   `{"result", "metadata"?}` on success or `{"error"}` on failure. A 404
//!   means the tool does not exist.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capability::{Capability, CapabilityOutput, CapabilityRegistry};
use crate::error::{ExplorerError, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 60;

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

/// One tool as advertised by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ListToolsResponse {
    #[serde(default)]
    tools: Vec<RemoteToolInfo>,
}

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    tool: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    metadata: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl ExecuteResponse {
    fn into_output(self) -> CapabilityOutput {
        if let Some(error) = self.error {
            return CapabilityOutput::error(error);
        }
        let content = match self.result {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let output = CapabilityOutput::text(content);
        match self.metadata {
            Some(metadata) => output.with_metadata(metadata),
            None => output,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP client for a tool server.
#[derive(Debug, Clone)]
pub struct RemoteToolClient {
    client: Client,
    base_url: String,
}

impl RemoteToolClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExplorerError::internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Tools the server advertises.
    pub async fn list_tools(&self) -> Result<Vec<RemoteToolInfo>> {
        let response = self
            .client
            .post(format!("{}/list_tools", self.base_url))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| ExplorerError::capability(format!("Tool server unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(ExplorerError::capability(format!(
                "Tool server returned {} listing tools",
                response.status()
            )));
        }

        let body: ListToolsResponse = response
            .json()
            .await
            .map_err(|e| ExplorerError::capability(format!("Invalid tool list: {}", e)))?;
        Ok(body.tools)
    }

    /// Run one tool on the server.
    pub async fn execute_tool(&self, tool: &str, parameters: &Value) -> Result<CapabilityOutput> {
        tracing::debug!(tool, base_url = %self.base_url, "Executing remote tool");

        let response = self
            .client
            .post(format!("{}/execute_tool", self.base_url))
            .json(&ExecuteRequest { tool, parameters })
            .send()
            .await
            .map_err(|e| ExplorerError::capability(format!("Tool server unreachable: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ExplorerError::CapabilityNotFound(tool.to_string()));
        }

        // Error bodies still carry `{"error"}` when the server can say why.
        let text = response
            .text()
            .await
            .map_err(|e| ExplorerError::capability(format!("Failed to read response: {}", e)))?;
        if !status.is_success() {
            if let Ok(ExecuteResponse {
                error: Some(error), ..
            }) = serde_json::from_str(&text)
            {
                return Ok(CapabilityOutput::error(error));
            }
            return Err(ExplorerError::capability(format!(
                "Tool server returned {}: {}",
                status, text
            )));
        }

        let body: ExecuteResponse = serde_json::from_str(&text)
            .map_err(|e| ExplorerError::capability(format!("Invalid tool response: {}", e)))?;
        Ok(body.into_output())
    }

    /// Registry holding an adapter for every advertised tool.
    pub async fn registry(self) -> Result<CapabilityRegistry> {
        let client = Arc::new(self);
        let tools = client.list_tools().await?;
        tracing::info!(base_url = %client.base_url, count = tools.len(), "Loaded remote tools");

        let mut registry = CapabilityRegistry::new();
        for info in &tools {
            registry.register(RemoteCapability::new(Arc::clone(&client), info));
        }
        Ok(registry)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Adapter
// ─────────────────────────────────────────────────────────────────────────────

/// One remote tool exposed as a [`Capability`].
#[derive(Debug, Clone)]
pub struct RemoteCapability {
    name: String,
    description: String,
    parameters: Value,
    client: Arc<RemoteToolClient>,
}

impl RemoteCapability {
    pub fn new(client: Arc<RemoteToolClient>, info: &RemoteToolInfo) -> Self {
        let description = info
            .description
            .clone()
            .unwrap_or_else(|| format!("Remote tool: {}", info.name));
        let parameters = info.input_schema.clone().unwrap_or_else(|| {
            serde_json::json!({
                "type": "object",
                "properties": {}
            })
        });

        Self {
            name: info.name.clone(),
            description,
            parameters,
            client,
        }
    }
}

#[async_trait]
impl Capability for RemoteCapability {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.parameters.clone()
    }

    async fn execute(&self, params: Value) -> Result<CapabilityOutput> {
        self.client.execute_tool(&self.name, &params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/list_tools"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tools": [
                    {
                        "name": "find_callers",
                        "description": "Find callers of a method",
                        "inputSchema": {"type": "object", "properties": {"methodId": {"type": "string"}}}
                    },
                    {"name": "get_class_info"}
                ]
            })))
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn test_execute_response_into_output() {
        let ok: ExecuteResponse =
            serde_json::from_value(json!({"result": "- **A#b**", "metadata": {"count": 1}})).unwrap();
        let output = ok.into_output();
        assert!(output.success);
        assert_eq!(output.content, "- **A#b**");
        assert_eq!(output.metadata, Some(json!({"count": 1})));

        let structured: ExecuteResponse =
            serde_json::from_value(json!({"result": {"n": 2}})).unwrap();
        assert_eq!(structured.into_output().content, r#"{"n":2}"#);

        let failed: ExecuteResponse = serde_json::from_value(json!({"error": "boom"})).unwrap();
        let output = failed.into_output();
        assert!(!output.success);
        assert_eq!(output.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_registry_from_server() {
        let server = server().await;
        let registry = RemoteToolClient::new(format!("{}/", server.uri()))
            .unwrap()
            .registry()
            .await
            .unwrap();

        assert_eq!(registry.names(), vec!["find_callers", "get_class_info"]);
        let callers = registry.get("find_callers").unwrap();
        assert_eq!(callers.description(), "Find callers of a method");
        assert_eq!(callers.parameters()["properties"]["methodId"]["type"], "string");

        let info = registry.get("get_class_info").unwrap();
        assert_eq!(info.description(), "Remote tool: get_class_info");
        assert_eq!(info.parameters(), json!({"type": "object", "properties": {}}));
    }

    #[tokio::test]
    async fn test_execute_tool() {
        let server = server().await;
        Mock::given(method("POST"))
            .and(path("/execute_tool"))
            .and(body_json(json!({"tool": "find_callers", "parameters": {"methodId": "A#b"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "- **C#d**"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/execute_tool"))
            .and(body_json(json!({"tool": "ghost", "parameters": {}})))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/execute_tool"))
            .and(body_json(json!({"tool": "get_class_info", "parameters": {}})))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"error": "index not built"})),
            )
            .mount(&server)
            .await;

        let client = RemoteToolClient::new(server.uri()).unwrap();

        let output = client
            .execute_tool("find_callers", &json!({"methodId": "A#b"}))
            .await
            .unwrap();
        assert_eq!(output.content, "- **C#d**");

        let err = client.execute_tool("ghost", &json!({})).await.unwrap_err();
        assert!(matches!(err, ExplorerError::CapabilityNotFound(ref n) if n == "ghost"));

        let output = client.execute_tool("get_class_info", &json!({})).await.unwrap();
        assert!(!output.success);
        assert_eq!(output.error.as_deref(), Some("index not built"));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let client =
            RemoteToolClient::with_timeout("http://127.0.0.1:9", Duration::from_millis(200))
                .unwrap();
        assert!(client.list_tools().await.is_err());
    }
}

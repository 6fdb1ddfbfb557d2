//! Request/response transport over HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{OutboundRequest, Route, Transport};
use crate::config::{ClientConfig, RouteStyle};
use crate::error::ChannelError;

/// A resolved backend endpoint with its JSON body.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    /// `POST /main_query` - backend routes the query.
    MainQuery { query: String },
    /// `POST /ask` - a specific agent answers.
    Ask {
        user_query: String,
        topic: String,
        conversation_id: Option<String>,
    },
    /// `POST /tools/{agent}/run` - legacy per-agent tool call.
    ToolRun {
        agent: String,
        command: String,
        params: Value,
    },
}

impl Endpoint {
    /// Pick the endpoint for a request under the given configuration.
    pub fn resolve(config: &ClientConfig, request: &OutboundRequest) -> Self {
        match (config.route_style, &request.route) {
            (RouteStyle::Routed, Route::Auto) => Endpoint::MainQuery {
                query: request.text.clone(),
            },
            (RouteStyle::Routed, Route::Pinned(agent)) => Endpoint::Ask {
                user_query: request.text.clone(),
                topic: agent.to_string(),
                conversation_id: request.conversation_id.clone(),
            },
            (RouteStyle::LegacyTool, route) => {
                let agent = match route {
                    Route::Pinned(agent) => agent.to_string(),
                    Route::Auto => config.legacy.default_agent.clone(),
                };
                let mut params = serde_json::Map::new();
                params.insert(
                    config.legacy.param_key.clone(),
                    Value::String(request.text.clone()),
                );
                Endpoint::ToolRun {
                    agent,
                    command: config.legacy.command.clone(),
                    params: Value::Object(params),
                }
            }
        }
    }

    pub fn path(&self) -> String {
        match self {
            Endpoint::MainQuery { .. } => "main_query".to_string(),
            Endpoint::Ask { .. } => "ask".to_string(),
            Endpoint::ToolRun { agent, .. } => format!("tools/{agent}/run"),
        }
    }

    pub fn body(&self) -> Value {
        match self {
            Endpoint::MainQuery { query } => json!({ "query": query }),
            Endpoint::Ask {
                user_query,
                topic,
                conversation_id,
            } => {
                let mut body = json!({ "user_query": user_query, "topic": topic });
                if let Some(id) = conversation_id {
                    body["conversation_id"] = Value::String(id.clone());
                }
                body
            }
            Endpoint::ToolRun {
                command, params, ..
            } => json!({ "command": command, "params": params }),
        }
    }
}

/// HTTP transport: one POST per message.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl HttpTransport {
    /// Build a transport with its own connection pool.
    pub fn new(config: Arc<ClientConfig>) -> Result<Self, ChannelError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `GET` a JSON document relative to the base URL.
    pub async fn get_json(&self, path: &str) -> Result<Value, ChannelError> {
        let url = self.config.endpoint_url(path);
        log::debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        read_payload(response).await
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn deliver(&self, request: &OutboundRequest) -> Result<Value, ChannelError> {
        let endpoint = Endpoint::resolve(&self.config, request);
        let url = self.config.endpoint_url(&endpoint.path());
        log::debug!("POST {}", url);

        let response = self.client.post(&url).json(&endpoint.body()).send().await?;
        read_payload(response).await
    }
}

/// Turn a response into a payload, mapping non-2xx and undecodable bodies to errors.
///
/// The status text is the standard reason phrase for the code, not whatever
/// phrase the server put on the wire (HTTP/2 carries none).
async fn read_payload(response: reqwest::Response) -> Result<Value, ChannelError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ChannelError::Status {
            status: status.as_u16(),
            status_text: status.canonical_reason().map(str::to_string),
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ChannelError::Body(e.to_string()))
}

// ============================================================================
// TESTS
// ============================================================================

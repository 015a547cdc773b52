use crate::mapping::Response;
use async_trait::async_trait;
use miniflow_core::{keys, Config, Node, NodeContext, NodeError, NodeKind, Value};
use miniflow_runtime::{ConfigKey, NodeFactory, NodeMetadata};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use std::time::Duration;

const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// HTTP request node with per-URL retries, fallback URLs and output mapping
pub struct HttpRequestNode {
    client: reqwest::Client,
}

impl HttpRequestNode {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpRequestNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything read from the node config, validated before the first request
struct RequestSpec<'a> {
    urls: Vec<&'a str>,
    method: Method,
    timeout: Duration,
    attempts: u64,
    headers: HeaderMap,
    body: Option<String>,
    mapping: Vec<(&'a str, &'a str)>,
    tolerate_errors: bool,
}

impl<'a> RequestSpec<'a> {
    fn from_config(config: Config<'a>) -> Result<Self, NodeError> {
        let url = config.require_str("url")?;

        let mut urls = vec![url];
        urls.extend(config.string_list("fallbackUrls")?);

        let method_name = config
            .str_opt("method")?
            .map(|m| m.trim().to_uppercase())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "GET".to_string());
        let method = Method::from_bytes(method_name.as_bytes()).map_err(|_| {
            NodeError::Configuration(format!("Unsupported method: {}", method_name))
        })?;

        let timeout = Duration::from_millis(config.u64_or("timeoutMs", DEFAULT_TIMEOUT_MS)?);
        let attempts = config.u64_or("retries", 0)?.saturating_add(1);

        let mut headers = HeaderMap::new();
        for (name, value) in config.string_map("headers")? {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                NodeError::Configuration(format!("Invalid header name: {}", name))
            })?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                NodeError::Configuration(format!("Invalid value for header {}", name))
            })?;
            headers.insert(name, value);
        }

        let sends_body = matches!(method, Method::POST | Method::PUT | Method::PATCH);
        let body = match config.get("body") {
            Some(_) if !sends_body => None,
            None => sends_body.then(String::new),
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        };

        let mapping_key = if config.get("outputMapping").is_some() {
            "outputMapping"
        } else {
            "map"
        };
        let mapping = config.string_map(mapping_key)?;

        // Any policy other than STOP_ON_FAIL / STOP accepts error statuses
        let tolerate_errors = config
            .first_str(&["errorPolicy", "onError"])?
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| !(p.eq_ignore_ascii_case("STOP_ON_FAIL") || p.eq_ignore_ascii_case("STOP")))
            .unwrap_or(false);

        Ok(Self {
            urls,
            method,
            timeout,
            attempts,
            headers,
            body,
            mapping,
            tolerate_errors,
        })
    }
}

#[async_trait]
impl Node for HttpRequestNode {
    fn kind(&self) -> NodeKind {
        NodeKind::HttpRequest
    }

    async fn execute(&self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        let spec = RequestSpec::from_config(ctx.config())?;
        let mut last_error = None;

        for url in &spec.urls {
            for attempt in 1..=spec.attempts {
                ctx.events.info(format!("{} {} (attempt {})", spec.method, url, attempt));

                let (status, body) = match self.send(&spec, url).await {
                    Ok(received) => received,
                    Err(e) => {
                        tracing::warn!(node = %ctx.node_id(), url, attempt, "HTTP attempt failed: {}", e.message());
                        last_error = Some(e);
                        continue;
                    }
                };

                ctx.variables.set(keys::HTTP_STATUS, status);
                ctx.variables.set(keys::STATUS, status);
                ctx.variables.set(keys::HTTP_BODY, body.clone());

                if status >= 400 && !spec.tolerate_errors {
                    let e = NodeError::HttpStatus {
                        status,
                        url: url.to_string(),
                    };
                    tracing::warn!(node = %ctx.node_id(), url, attempt, "HTTP attempt failed: {}", e.message());
                    last_error = Some(e);
                    continue;
                }

                ctx.events.info(format!("Response status: {}", status));

                let response = Response::new(status, &body);
                for (key, path) in &spec.mapping {
                    let value = response.resolve(path).unwrap_or(Value::Null);
                    ctx.variables.set(*key, value);
                }

                return Ok(());
            }
        }

        if !ctx.variables.contains(keys::STATUS) {
            ctx.variables.set(keys::STATUS, 0i64);
        }

        Err(last_error.unwrap_or_else(|| NodeError::Transport("HTTP request failed".into())))
    }
}

impl HttpRequestNode {
    /// One attempt against one URL
    async fn send(&self, spec: &RequestSpec<'_>, url: &str) -> Result<(u16, String), NodeError> {
        let mut request = self
            .client
            .request(spec.method.clone(), url)
            .timeout(spec.timeout)
            .headers(spec.headers.clone());

        if let Some(body) = &spec.body {
            request = request.body(body.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|e| NodeError::Transport(format!("HTTP request to {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| NodeError::Transport(format!("Failed to read response from {}: {}", url, e)))?;

        Ok((status, body))
    }
}

pub struct HttpRequestNodeFactory;

impl NodeFactory for HttpRequestNodeFactory {
    fn create(&self) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(HttpRequestNode::new()))
    }

    fn kind(&self) -> NodeKind {
        NodeKind::HttpRequest
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Make HTTP requests with retries and fallback URLs".to_string(),
            category: "http".to_string(),
            config_keys: vec![
                ConfigKey::required("url", "Primary URL"),
                ConfigKey::optional("method", "HTTP method (default GET)"),
                ConfigKey::optional("fallbackUrls", "URLs tried in order after the primary fails"),
                ConfigKey::optional("timeoutMs", "Per-attempt timeout (default 5000)"),
                ConfigKey::optional("retries", "Extra attempts per URL (default 0)"),
                ConfigKey::optional("headers", "Request headers"),
                ConfigKey::optional("body", "Request body for POST/PUT/PATCH"),
                ConfigKey::optional("outputMapping", "Variable -> path expression (alias: map)"),
                ConfigKey::optional("errorPolicy", "Anything but STOP_ON_FAIL accepts error statuses"),
            ],
        }
    }
}

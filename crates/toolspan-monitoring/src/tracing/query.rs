//! Phoenix metrics read-back.
//!
//! After a benchmark the driver asks the Phoenix GraphQL API for the most
//! recent spans of every project and aggregates the LLM spans of the
//! `benchmark-*` projects per model.

use error_stack::{Report, ResultExt};
use reqwest::Client;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const BENCHMARK_PROJECT_PREFIX: &str = "benchmark-";

const PROJECT_SPANS_QUERY: &str = r#"{
  projects {
    edges {
      node {
        name
        traceCount
        recordCount
        spans(first: 50, sort: { col: startTime, dir: desc }) {
          edges {
            node {
              name
              spanKind
              startTime
              latencyMs
              statusCode
              attributes
              context {
                spanId
                traceId
              }
            }
          }
        }
      }
    }
  }
}"#;

/// Error-stack–backed result alias for metrics queries.
pub type QueryResult<T> = ::std::result::Result<T, Report<QueryError>>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QueryError {
    #[error("GraphQL request failed")]
    Request,

    #[error("GraphQL endpoint returned status {0}")]
    Status(u16),

    #[error("GraphQL response is not valid JSON")]
    Decode,

    #[error("GraphQL response has no project list")]
    MissingProjects,
}

/// Aggregates of one model's LLM spans
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTraceMetrics {
    pub span_count: usize,
    pub avg_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub total_tokens: u64,
}

/// GraphQL client for a Phoenix instance
#[derive(Debug, Clone)]
pub struct PhoenixMetricsClient {
    endpoint: String,
    client: Client,
}

impl PhoenixMetricsClient {
    pub fn new(graphql_endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: graphql_endpoint.into(),
            client: Client::new(),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST the project/span query and return the raw response body
    pub async fn fetch_projects(&self) -> QueryResult<Value> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(Duration::from_secs(10))
            .json(&json!({ "query": PROJECT_SPANS_QUERY }))
            .send()
            .await
            .change_context(QueryError::Request)
            .attach(format!("endpoint: {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Report::new(QueryError::Status(status.as_u16()))
                .attach(format!("endpoint: {}", self.endpoint)));
        }

        response
            .json::<Value>()
            .await
            .change_context(QueryError::Decode)
            .attach(format!("endpoint: {}", self.endpoint))
    }

    /// Fetch and analyze; failures are logged and yield `None`
    pub async fn model_metrics(&self) -> Option<BTreeMap<String, ModelTraceMetrics>> {
        let body = match self.fetch_projects().await {
            Ok(body) => body,
            Err(report) => {
                warn!(error = ?report, "Failed to fetch Phoenix metrics");
                return None;
            }
        };

        match analyze_projects(&body) {
            Ok(metrics) => Some(metrics),
            Err(report) => {
                warn!(error = ?report, "Unexpected Phoenix metrics payload");
                None
            }
        }
    }
}

/// Look up `key` either as a flat dotted attribute or as a nested path
fn lookup<'a>(attributes: &'a Value, key: &str) -> Option<&'a Value> {
    if let Some(value) = attributes.get(key) {
        return Some(value);
    }
    key.split('.')
        .try_fold(attributes, |node, part| node.get(part))
}

/// Span attributes arrive as a JSON-encoded string
fn parse_attributes(span: &Value) -> Option<Value> {
    match span.get("attributes")? {
        Value::String(raw) => serde_json::from_str(raw).ok(),
        obj @ Value::Object(_) => Some(obj.clone()),
        _ => None,
    }
}

fn total_tokens(attributes: &Value) -> u64 {
    lookup(attributes, "ai.usage.totalTokens")
        .or_else(|| lookup(attributes, "ai.usage").and_then(|usage| usage.get("totalTokens")))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

/// Group LLM spans of `benchmark-*` projects by their `ai.model.id`.
///
/// Benchmark runs share one tracer provider, so every model's spans may land
/// in the project of the first model; the project name is only a filter.
pub fn analyze_projects(body: &Value) -> QueryResult<BTreeMap<String, ModelTraceMetrics>> {
    let projects = body
        .pointer("/data/projects/edges")
        .and_then(Value::as_array)
        .ok_or_else(|| Report::new(QueryError::MissingProjects))?;

    let mut samples: BTreeMap<String, (Vec<f64>, u64)> = BTreeMap::new();
    for project in projects {
        let Some(name) = project.pointer("/node/name").and_then(Value::as_str) else {
            continue;
        };
        if !name.starts_with(BENCHMARK_PROJECT_PREFIX) {
            continue;
        }

        let spans = project
            .pointer("/node/spans/edges")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let mut llm_spans = 0;
        for span in spans {
            let Some(node) = span.get("node") else {
                continue;
            };
            let Some(attributes) = parse_attributes(node) else {
                continue;
            };
            let Some(model_id) = lookup(&attributes, "ai.model.id").and_then(Value::as_str) else {
                continue;
            };
            let (latencies, tokens) = samples.entry(model_id.to_string()).or_default();
            latencies.push(node.get("latencyMs").and_then(Value::as_f64).unwrap_or(0.0));
            *tokens += total_tokens(&attributes);
            llm_spans += 1;
        }
        debug!(project = name, llm_spans, "Analyzed benchmark project");
    }

    Ok(samples
        .into_iter()
        .map(|(model_id, (latencies, total_tokens))| {
            let count = latencies.len();
            let metrics = ModelTraceMetrics {
                span_count: count,
                avg_latency_ms: latencies.iter().sum::<f64>() / count as f64,
                min_latency_ms: latencies.iter().copied().fold(f64::INFINITY, f64::min),
                max_latency_ms: latencies.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                total_tokens,
            };
            (model_id, metrics)
        })
        .collect())
}

use crate::error::{
    Error,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
use serde_json::Value;
use std::{
    fmt,
    time::Duration,
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Executes a single GraphQL request and yields the `data` payload.
pub trait ChainQuery {
    fn query(
        &self,
        query: &str,
        variables: Option<Value>,
    ) -> impl Future<Output = Result<Value>> + Send;
}

#[derive(Clone)]
pub struct GraphQlClient {
    endpoint: String,
    timeout: Duration,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<Value>,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlErrorDto>>,
}

#[derive(Deserialize)]
struct GraphQlErrorDto {
    message: String,
}

impl GraphQlClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::transport(None, format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            timeout,
            http,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.timeout)
        } else {
            Error::transport(err.status().map(|s| s.as_u16()), err.to_string())
        }
    }
}

impl ChainQuery for GraphQlClient {
    async fn query(&self, query: &str, variables: Option<Value>) -> Result<Value> {
        let res = self
            .http
            .post(&self.endpoint)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await
            .map_err(|e| self.request_error(e))?;
        let status = res.status();
        let bytes = res.bytes().await.map_err(|e| self.request_error(e))?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            return Err(Error::transport(Some(status.as_u16()), body.into_owned()));
        }
        let envelope: GraphQlResponse = serde_json::from_slice(&bytes)?;
        if let Some(errors) = envelope.errors
            && !errors.is_empty()
        {
            tracing::warn!(count = errors.len(), "graphql endpoint reported errors");
            return Err(Error::Query(errors.into_iter().map(|e| e.message).collect()));
        }
        Ok(envelope.data.unwrap_or(Value::Null))
    }
}

impl fmt::Display for GraphQlClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoint)
    }
}

//! Remote package-registry lookups.
//!
//! [`PackageRegistry`] is the boundary the package provider talks to.  The
//! production implementation, [`HttpRegistry`], issues one blocking `ureq`
//! request per lookup on tokio's blocking pool and bounds it with a
//! timeout.  Endpoints answer with `{"data": [...]}` (NuGet autocomplete
//! style) or a bare JSON array of strings.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::RegistryConfig;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("registry returned status {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("malformed registry response from {url}: {source}")]
    Malformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("registry request timed out after {0:?}")]
    Timeout(Duration),
    #[error("registry request task failed: {0}")]
    Task(String),
}

/// Package identifier and version lookups.
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Up to `take` package identifiers matching `query`.
    async fn search(&self, query: &str, take: usize) -> Result<Vec<String>, RegistryError>;

    /// Published versions of package `id`.
    async fn versions(&self, id: &str) -> Result<Vec<String>, RegistryError>;
}

/// Either accepted response shape.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListResponse {
    Wrapped { data: Vec<String> },
    Bare(Vec<String>),
}

impl ListResponse {
    fn into_vec(self) -> Vec<String> {
        match self {
            ListResponse::Wrapped { data } => data,
            ListResponse::Bare(data) => data,
        }
    }
}

/// Parse a registry response body.
pub fn parse_list(url: &str, body: &str) -> Result<Vec<String>, RegistryError> {
    serde_json::from_str::<ListResponse>(body)
        .map(ListResponse::into_vec)
        .map_err(|source| RegistryError::Malformed {
            url: url.to_string(),
            source,
        })
}

/// HTTP registry client built from `[registry]` settings.
#[derive(Clone)]
pub struct HttpRegistry {
    agent: ureq::Agent,
    search_endpoint: String,
    versions_endpoint: String,
    query_parameter: String,
    include_prerelease: bool,
    timeout: Duration,
}

impl HttpRegistry {
    pub fn new(config: &RegistryConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .build()
            .into();
        Self {
            agent,
            search_endpoint: config.search_endpoint.clone(),
            versions_endpoint: config.versions_endpoint.clone(),
            query_parameter: config.query_parameter.clone(),
            include_prerelease: config.include_prerelease,
            timeout: config.timeout(),
        }
    }

    /// Issue `GET endpoint?k=v&...` on the blocking pool.
    async fn get_list(
        &self,
        endpoint: &str,
        mut query: Vec<(String, String)>,
    ) -> Result<Vec<String>, RegistryError> {
        if self.include_prerelease {
            query.push(("prerelease".to_string(), "true".to_string()));
        }
        let agent = self.agent.clone();
        let url = endpoint.to_string();
        trace!(%url, ?query, "registry request");

        let request = tokio::task::spawn_blocking(move || fetch(&agent, &url, &query));
        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(RegistryError::Task(join_err.to_string())),
            Err(_) => Err(RegistryError::Timeout(self.timeout)),
        }
    }
}

fn fetch(
    agent: &ureq::Agent,
    url: &str,
    query: &[(String, String)],
) -> Result<Vec<String>, RegistryError> {
    let mut request = agent.get(url);
    for (key, value) in query {
        request = request.query(key, value);
    }
    let mut response = request.call().map_err(|err| match err {
        ureq::Error::StatusCode(status) => RegistryError::Status {
            url: url.to_string(),
            status,
        },
        other => RegistryError::Transport {
            url: url.to_string(),
            message: other.to_string(),
        },
    })?;
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|err| RegistryError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        })?;
    let list = parse_list(url, &body)?;
    debug!(url, count = list.len(), "registry response");
    Ok(list)
}

#[async_trait]
impl PackageRegistry for HttpRegistry {
    async fn search(&self, query: &str, take: usize) -> Result<Vec<String>, RegistryError> {
        let params = vec![
            (self.query_parameter.clone(), query.to_string()),
            ("take".to_string(), take.to_string()),
        ];
        self.get_list(&self.search_endpoint, params).await
    }

    async fn versions(&self, id: &str) -> Result<Vec<String>, RegistryError> {
        let params = vec![("id".to_string(), id.to_string())];
        self.get_list(&self.versions_endpoint, params).await
    }
}

//! HTTP implementation of [`RemoteStore`].
//!
//! Every request carries the configured namespace header. Find requests are
//! JSON, batch writes are Turtle bodies.

use crate::error::{SyncError, SyncResult};
use crate::store::{FindResult, RemoteStore, StoreStatus};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const FIND_ENTRY: &str = "projections/find/";
const BATCH_ENTRY: &str = "batch/projections/";
const UPDATE_REPLACE_ENTRY: &str = "update/replace/";

const NAMESPACE_HEADER: &str = "namespace";
const HIDE_DEFAULT_NAMESPACE_HEADER: &str = "Hide-Default-Namespace";
const JSON: &str = "application/json";
const TURTLE: &str = "text/turtle";

/// Connection settings for [`HttpStoreClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpStoreConfig {
    /// Base URL of the store API.
    pub endpoint: String,
    /// Namespace all records live in.
    pub namespace: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Hide records of the default namespace from find results.
    pub hide_default_namespace: bool,
}

impl Default for HttpStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/".to_string(),
            namespace: String::new(),
            timeout_secs: 60,
            hide_default_namespace: true,
        }
    }
}

/// A [`RemoteStore`] over the projection REST API.
pub struct HttpStoreClient {
    config: HttpStoreConfig,
    client: Client,
    find_url: String,
    batch_url: String,
    update_replace_url: String,
}

impl HttpStoreClient {
    /// Creates a client. A missing trailing slash on the endpoint is added,
    /// since the API redirects otherwise.
    pub fn new(config: HttpStoreConfig) -> SyncResult<Self> {
        if config.namespace.is_empty() {
            return Err(SyncError::Config("store namespace must be set".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let mut endpoint = config.endpoint.clone();
        if !endpoint.ends_with('/') {
            endpoint.push('/');
        }
        let batch_url = format!("{endpoint}{BATCH_ENTRY}");

        Ok(Self {
            find_url: format!("{endpoint}{FIND_ENTRY}"),
            update_replace_url: format!("{batch_url}{UPDATE_REPLACE_ENTRY}"),
            batch_url,
            config,
            client,
        })
    }

    pub fn config(&self) -> &HttpStoreConfig {
        &self.config
    }

    fn find_request(&self, url: &str) -> RequestBuilder {
        self.client
            .post(url)
            .header(NAMESPACE_HEADER, &self.config.namespace)
            .header(CONTENT_TYPE, JSON)
            .header(ACCEPT, JSON)
            .header(
                HIDE_DEFAULT_NAMESPACE_HEADER,
                if self.config.hide_default_namespace { "true" } else { "false" },
            )
    }

    async fn find(&self, url: &str, query: serde_json::Value, operation: &'static str) -> SyncResult<FindResult> {
        debug!("POST - url : {}, query : {}", url, query);
        let body = serde_json::to_string(&query)?;
        let response = self.find_request(url).body(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::RemoteStatus {
                operation,
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn write(&self, request: RequestBuilder, operation: &'static str) -> SyncResult<StoreStatus> {
        let response = request.header(NAMESPACE_HEADER, &self.config.namespace).send().await?;
        let status = StoreStatus(response.status().as_u16());
        debug!("{} answered with status {}", operation, status);
        Ok(status)
    }
}

#[async_trait]
impl RemoteStore for HttpStoreClient {
    async fn find_by_identifier(&self, identifier: &str) -> SyncResult<FindResult> {
        self.find(&self.find_url, json!({ "query": { "$ori": identifier } }), "find")
            .await
    }

    async fn find_by_identifiers(&self, identifiers: &[String], page_size: usize) -> SyncResult<FindResult> {
        let url = format!("{}?size={page_size}", self.find_url);
        self.find(&url, json!({ "query": { "$ori": { "$in": identifiers } } }), "find")
            .await
    }

    async fn create_batch(&self, statements: &str) -> SyncResult<StoreStatus> {
        debug!("POST - url : {}", self.batch_url);
        let request = self
            .client
            .post(&self.batch_url)
            .header(CONTENT_TYPE, TURTLE)
            .body(statements.to_string());
        self.write(request, "create batch").await
    }

    async fn update_replace_batch(&self, statements: &str) -> SyncResult<StoreStatus> {
        debug!("PUT - url : {}", self.update_replace_url);
        let request = self
            .client
            .put(&self.update_replace_url)
            .header(CONTENT_TYPE, TURTLE)
            .body(statements.to_string());
        self.write(request, "update batch").await
    }

    async fn delete_batch(&self, storage_keys: &[String]) -> SyncResult<StoreStatus> {
        debug!("DELETE - url : {}, {} keys", self.batch_url, storage_keys.len());
        let request = self
            .client
            .delete(&self.batch_url)
            .header(CONTENT_TYPE, JSON)
            .header(ACCEPT, JSON)
            .body(serde_json::to_string(storage_keys)?);
        self.write(request, "delete batch").await
    }

    async fn find_in_namespace(&self, page_size: usize, page_index: usize) -> SyncResult<FindResult> {
        let url = format!("{}?size={page_size}&index={page_index}", self.find_url);
        self.find(&url, json!({ "query": {} }), "namespace find").await
    }
}

//! HTTP client for the ZeroEntropy search service.
//!
//! Thin REST wrapper; embedding and ranking happen service-side. Conflict on
//! collection creation and not-found on deletion are mapped to success per
//! the idempotency contract.

use super::SearchIndex;
use crate::error::{Result, ViddexError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{debug, instrument};
use url::Url;

/// Client for the ZeroEntropy REST API.
pub struct ZeroEntropyClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct DocumentInfo {
    path: String,
}

#[derive(Debug, Deserialize)]
struct DocumentInfoList {
    documents: Vec<DocumentInfo>,
}

impl ZeroEntropyClient {
    /// Create a new client for a service base URL.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ViddexError::Config(format!("Invalid search index URL: {}", e)))?;

        // A trailing slash keeps Url::join from eating the last path segment
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            api_key: api_key.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ViddexError::Config(format!("Invalid endpoint '{}': {}", path, e)))
    }

    /// POST a JSON body and return the response status with its body text.
    async fn post(&self, path: &str, body: serde_json::Value) -> Result<(StatusCode, String)> {
        let url = self.endpoint(path)?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        Ok((status, text))
    }

    fn unexpected(path: &str, status: StatusCode, body: &str) -> ViddexError {
        ViddexError::SearchIndex(format!(
            "{} returned {}: {}",
            path,
            status,
            body.chars().take(200).collect::<String>()
        ))
    }
}

#[async_trait]
impl SearchIndex for ZeroEntropyClient {
    #[instrument(skip(self))]
    async fn ensure_collection(&self, name: &str) -> Result<()> {
        let (status, body) = self
            .post("collections/add-collection", json!({ "collection_name": name }))
            .await?;

        // Conflict means the collection already exists
        if status.is_success() || status == StatusCode::CONFLICT {
            debug!(collection = name, existed = status == StatusCode::CONFLICT, "Collection ready");
            return Ok(());
        }
        Err(Self::unexpected("collections/add-collection", status, &body))
    }

    #[instrument(skip(self, text, metadata), fields(chars = text.len()))]
    async fn add_document(
        &self,
        collection: &str,
        path: &str,
        text: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<()> {
        let (status, body) = self
            .post(
                "documents/add-document",
                json!({
                    "collection_name": collection,
                    "path": path,
                    "content": { "type": "text", "text": text },
                    "metadata": metadata,
                    "overwrite": true,
                }),
            )
            .await?;

        if status.is_success() {
            return Ok(());
        }
        Err(Self::unexpected("documents/add-document", status, &body))
    }

    #[instrument(skip(self))]
    async fn delete_document(&self, collection: &str, path: &str) -> Result<()> {
        let (status, body) = self
            .post(
                "documents/delete-document",
                json!({ "collection_name": collection, "path": path }),
            )
            .await?;

        // Already absent is the end state we wanted
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(Self::unexpected("documents/delete-document", status, &body))
    }

    #[instrument(skip(self))]
    async fn list_documents(&self, collection: &str) -> Result<Vec<String>> {
        let (status, body) = self
            .post(
                "documents/get-document-info-list",
                json!({ "collection_name": collection }),
            )
            .await?;

        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(Self::unexpected(
                "documents/get-document-info-list",
                status,
                &body,
            ));
        }

        let list: DocumentInfoList = serde_json::from_str(&body)?;
        Ok(list.documents.into_iter().map(|d| d.path).collect())
    }

    #[instrument(skip(self))]
    async fn delete_collection(&self, name: &str) -> Result<()> {
        let (status, body) = self
            .post(
                "collections/delete-collection",
                json!({ "collection_name": name }),
            )
            .await?;

        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(Self::unexpected("collections/delete-collection", status, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_rejects_invalid_url() {
        assert!(ZeroEntropyClient::new("not a url", "key").is_err());
        assert!(ZeroEntropyClient::new("https://api.zeroentropy.dev/v1/", "key").is_ok());
    }

    #[test]
    fn test_document_info_list_parsing() {
        let body = r#"{ "documents": [
            { "path": "vid1-chunk0", "index_status": "indexed" },
            { "path": "vid1-chunk1" }
        ]}"#;
        let list: DocumentInfoList = serde_json::from_str(body).unwrap();
        let paths: Vec<String> = list.documents.into_iter().map(|d| d.path).collect();
        assert_eq!(paths, vec!["vid1-chunk0", "vid1-chunk1"]);
    }
}

use super::{Attributes, Record, Store};
use crate::auth::Session;
use crate::config::ApiConfig;
use crate::errors::StoreError;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

/// A JSON:API resource object.
#[derive(Debug, Serialize, Deserialize)]
struct Resource {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default)]
    attributes: Attributes,
}

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    data: Resource,
}

/// Store backed by the tracker's JSON:API endpoints.
///
/// Resources live under `<host>/api/v<version>/<singular type>`. Requests
/// carry the session's access token as a bearer credential when one exists.
pub struct JsonApiStore {
    client: reqwest::Client,
    namespace: String,
    session: Option<Arc<Session>>,
}

impl JsonApiStore {
    pub fn new(api: &ApiConfig, session: Option<Arc<Session>>) -> Self {
        Self {
            client: reqwest::Client::new(),
            namespace: api.namespace_url(),
            session,
        }
    }

    fn collection_url(&self, model: &str) -> String {
        format!("{}/{}", self.namespace, path_for_type(model))
    }

    fn member_url(&self, model: &str, id: &str) -> String {
        format!("{}/{}", self.collection_url(model), id)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.as_ref().and_then(|s| s.access_token()) {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => request,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Store for JsonApiStore {
    async fn save(&self, record: Record) -> Result<Record, StoreError> {
        let document = Document {
            data: Resource {
                kind: record.model().to_string(),
                id: record.id().map(str::to_string),
                attributes: record.attributes().clone(),
            },
        };
        let body = serde_json::to_vec(&document).map_err(|e| StoreError::Decode(e.to_string()))?;

        let request = match record.id() {
            Some(id) => self.client.patch(self.member_url(record.model(), id)),
            None => self.client.post(self.collection_url(record.model())),
        };
        tracing::debug!(model = record.model(), id = ?record.id(), "saving record");

        let response = self
            .authorize(request)
            .header(CONTENT_TYPE, JSON_API_MEDIA_TYPE)
            .header(ACCEPT, JSON_API_MEDIA_TYPE)
            .body(body)
            .send()
            .await
            .map_err(StoreError::Http)?;
        let response = Self::check(response).await?;

        let bytes = response.bytes().await.map_err(StoreError::Http)?;
        let saved: Document =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Decode(e.to_string()))?;
        let id = saved
            .data
            .id
            .or_else(|| record.id().map(str::to_string))
            .ok_or_else(|| StoreError::MissingId {
                model: record.model().to_string(),
            })?;

        Ok(Record::loaded(record.model(), id, saved.data.attributes))
    }

    async fn destroy(&self, record: &Record) -> Result<(), StoreError> {
        let id = record.id().ok_or_else(|| StoreError::MissingId {
            model: record.model().to_string(),
        })?;
        let response = self
            .authorize(self.client.delete(self.member_url(record.model(), id)))
            .header(ACCEPT, JSON_API_MEDIA_TYPE)
            .send()
            .await
            .map_err(StoreError::Http)?;
        Self::check(response).await?;
        Ok(())
    }
}

/// The API addresses resources by their singular name (`issues` -> `issue`).
pub fn path_for_type(model: &str) -> String {
    let lower = model.to_lowercase();
    if let Some(stem) = lower.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    for suffix in ["ches", "shes", "sses", "xes"] {
        if lower.ends_with(suffix) {
            return lower[..lower.len() - 2].to_string();
        }
    }
    if lower.ends_with('s') && !lower.ends_with("ss") {
        return lower[..lower.len() - 1].to_string();
    }
    lower
}

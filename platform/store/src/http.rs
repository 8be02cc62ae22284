use std::time::Duration;

use async_trait::async_trait;
use entity::{ID_KEY, Record, RecordId};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{instrument, warn};

use crate::{RecordStore, StoreError, StoreResult};

const PROJECT_HEADER: &str = "X-Project-Id";

/// Client for the hosted table API.
#[derive(Clone, Debug)]
pub struct HttpRecordStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    results: Vec<ItemResult>,
}

#[derive(Debug, Deserialize)]
struct ItemResult {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

impl HttpRecordStore {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> StoreResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(StoreError::MissingUrl);
        }
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url,
            api_key: None,
            project_id: None,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    fn records_url(&self, table: &str) -> String {
        format!("{}/tables/{table}/records", self.base_url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = match &self.project_id {
            Some(project) => request.header(PROJECT_HEADER, project),
            None => request,
        };
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> StoreResult<(StatusCode, Envelope)> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok((status, Envelope::not_found()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Envelope>(&body)
                .ok()
                .and_then(|envelope| envelope.message)
                .unwrap_or(body);
            warn!(status = status.as_u16(), %message, "store rejected request");
            return Err(StoreError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        let envelope: Envelope = response.json().await?;
        if !envelope.success {
            return Err(rejected(status, envelope.message));
        }
        Ok((status, envelope))
    }

    /// Unwraps the single item of a batch write.
    fn single_result(status: StatusCode, envelope: Envelope) -> StoreResult<Option<Value>> {
        let item = envelope
            .results
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Protocol("batch response carried no results".into()))?;
        if !item.success {
            return Err(rejected(status, item.message));
        }
        Ok(item.data)
    }
}

impl Envelope {
    fn not_found() -> Self {
        Self {
            success: false,
            message: None,
            data: None,
            results: Vec::new(),
        }
    }
}

fn rejected(status: StatusCode, message: Option<String>) -> StoreError {
    StoreError::Rejected {
        status: status.as_u16(),
        message: message.unwrap_or_else(|| "request rejected".into()),
    }
}

fn into_record(value: Value) -> StoreResult<Record> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Protocol(format!(
            "expected a record object, got {other}"
        ))),
    }
}

fn not_found(table: &str, id: RecordId) -> StoreError {
    StoreError::NotFound {
        table: table.to_string(),
        id,
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    #[instrument(skip(self), fields(base = %self.base_url))]
    async fn list(&self, table: &str) -> StoreResult<Vec<Record>> {
        let (status, envelope) = self.send(self.client.get(self.records_url(table))).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(rejected(status, Some(format!("table {table} not found"))));
        }
        match envelope.data {
            Some(Value::Array(rows)) => rows.into_iter().map(into_record).collect(),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(StoreError::Protocol(format!(
                "expected a record list, got {other}"
            ))),
        }
    }

    #[instrument(skip(self), fields(base = %self.base_url))]
    async fn get(&self, table: &str, id: RecordId) -> StoreResult<Record> {
        let url = format!("{}/{id}", self.records_url(table));
        let (status, envelope) = self.send(self.client.get(url)).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(not_found(table, id));
        }
        match envelope.data {
            Some(Value::Null) | None => Err(not_found(table, id)),
            Some(value) => into_record(value),
        }
    }

    #[instrument(skip(self, fields), fields(base = %self.base_url))]
    async fn create(&self, table: &str, fields: Record) -> StoreResult<Record> {
        let request = self
            .client
            .post(self.records_url(table))
            .json(&json!({ "records": [fields] }));
        let (status, envelope) = self.send(request).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(rejected(status, Some(format!("table {table} not found"))));
        }
        let data = Self::single_result(status, envelope)?
            .ok_or_else(|| StoreError::Protocol("created record missing from response".into()))?;
        into_record(data)
    }

    #[instrument(skip(self, fields), fields(base = %self.base_url))]
    async fn update(&self, table: &str, id: RecordId, mut fields: Record) -> StoreResult<Record> {
        fields.insert(ID_KEY.into(), Value::from(id));
        let request = self
            .client
            .put(self.records_url(table))
            .json(&json!({ "records": [fields] }));
        let (status, envelope) = self.send(request).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(not_found(table, id));
        }
        match Self::single_result(status, envelope)? {
            Some(Value::Null) | None => Err(not_found(table, id)),
            Some(value) => into_record(value),
        }
    }

    #[instrument(skip(self), fields(base = %self.base_url))]
    async fn delete(&self, table: &str, id: RecordId) -> StoreResult<()> {
        let request = self
            .client
            .delete(self.records_url(table))
            .json(&json!({ "RecordIds": [id] }));
        let (status, envelope) = self.send(request).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(not_found(table, id));
        }
        Self::single_result(status, envelope).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn store(server: &MockServer) -> HttpRecordStore {
        HttpRecordStore::new(server.uri(), None)
            .unwrap()
            .with_api_key("secret")
            .with_project_id("proj-1")
    }

    #[tokio::test]
    async fn list_sends_credentials_and_unwraps_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tables/deals/records"))
            .and(header("X-Project-Id", "proj-1"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": [{ "Id": 1, "title": "A" }, { "Id": 2, "title": "B" }]
            })))
            .mount(&server)
            .await;

        let rows = store(&server).await.list("deals").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("title"), Some(&json!("B")));
    }

    #[tokio::test]
    async fn get_maps_404_and_null_data_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tables/deals/records/4"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tables/deals/records/5"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": null })),
            )
            .mount(&server)
            .await;

        let client = store(&server).await;
        assert!(matches!(
            client.get("deals", 4).await,
            Err(StoreError::NotFound { id: 4, .. })
        ));
        assert!(matches!(
            client.get("deals", 5).await,
            Err(StoreError::NotFound { id: 5, .. })
        ));
    }

    #[tokio::test]
    async fn update_sends_id_with_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/tables/deals/records"))
            .and(body_json(json!({ "records": [{ "Id": 3, "stage": "Closed" }] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "results": [{ "success": true, "data": { "Id": 3, "stage": "Closed" } }]
            })))
            .mount(&server)
            .await;

        let mut fields = Record::new();
        fields.insert("stage".into(), json!("Closed"));
        let updated = store(&server).await.update("deals", 3, fields).await.unwrap();
        assert_eq!(updated.get("Id"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn unsuccessful_results_become_rejections() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tables/contacts/records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "results": [{ "success": false, "message": "email already exists" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/tables/contacts/records"))
            .and(body_json(json!({ "RecordIds": [9] })))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({ "success": false, "message": "boom" })),
            )
            .mount(&server)
            .await;

        let client = store(&server).await;
        match client.create("contacts", Record::new()).await {
            Err(StoreError::Rejected { status, message }) => {
                assert_eq!(status, 200);
                assert_eq!(message, "email already exists");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        match client.delete("contacts", 9).await {
            Err(StoreError::Rejected { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn blank_base_url_is_rejected() {
        assert!(matches!(
            HttpRecordStore::new("/", None),
            Err(StoreError::MissingUrl)
        ));
    }
}

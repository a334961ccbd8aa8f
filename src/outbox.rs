use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{Span, info, instrument, warn};
use uuid::Uuid;

use crate::clients::setup_http_client;
use crate::config::GatewayConfig;
use crate::error::TransportError;
use crate::models::OutboxMessage;
use crate::query::{ListFilter, ListQuery, ListRequest, Page, RetryRequest};

const LIST_PATH: &str = "/local_msg/list";
const RETRY_PATH: &str = "/local_msg/retry";
const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// One page of outbox rows, in the order the backend returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePage {
    pub rows: Vec<OutboxMessage>,
    pub success: bool,
}

impl MessagePage {
    pub fn loaded(rows: Vec<OutboxMessage>) -> Self {
        Self {
            rows,
            success: true,
        }
    }

    /// What the operator sees after a failed load: nothing, flagged as failed.
    pub fn failed() -> Self {
        Self {
            rows: Vec::new(),
            success: false,
        }
    }
}

/// The backend took a retry request.
///
/// This says nothing about whether the message was delivered. Delivery can
/// only be observed by listing again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestAccepted {
    pub id: i64,
    pub code: i64,
    pub msg: String,
}

/// The `{code, msg, data}` wrapper around every backend answer.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

/// Rows are double-wrapped as `data.data` by some backends and sit directly
/// under `data` in others.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListData {
    Flat(Vec<serde_json::Value>),
    Nested {
        #[serde(default)]
        data: Option<Vec<serde_json::Value>>,
    },
}

impl ListData {
    fn into_rows(self) -> Vec<serde_json::Value> {
        match self {
            ListData::Flat(rows) => rows,
            ListData::Nested { data } => data.unwrap_or_default(),
        }
    }
}

/// Client side of the backend's outbox admin endpoints.
pub struct OutboxGateway {
    client: Client,
    config: GatewayConfig,
}

impl OutboxGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let client = setup_http_client(&config)?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: GatewayConfig) -> Self {
        Self { client, config }
    }

    /// Fetches one page of outbox rows for `biz`/`db` matching `filter`.
    ///
    /// A 2xx answer without the expected `data.data` array is an empty page,
    /// not an error.
    #[instrument(skip_all, fields(%biz, %db, page = page.number(), rows_found = 0))]
    pub async fn list_messages(
        &self,
        biz: &str,
        db: &str,
        filter: &ListFilter,
        page: Page,
    ) -> Result<MessagePage, TransportError> {
        let request = ListRequest {
            biz,
            db,
            query: ListQuery::build(filter, page),
        };

        let body = self.post(LIST_PATH, &request).await?;
        let rows = parse_rows(&body);

        Span::current().record("rows_found", rows.len());
        info!(rows_found = rows.len(), "Listed outbox messages.");

        Ok(MessagePage::loaded(rows))
    }

    /// Asks the backend to send one message again.
    ///
    /// Any 2xx answer counts as accepted, whatever the payload says.
    #[instrument(skip_all, fields(%biz, %db, %table, id = id))]
    pub async fn retry_message(
        &self,
        biz: &str,
        db: &str,
        table: &str,
        id: i64,
    ) -> Result<RequestAccepted, TransportError> {
        let request = RetryRequest { biz, db, table, id };

        let body = self.post(RETRY_PATH, &request).await?;
        let accepted = parse_ack(id, &body);

        if accepted.code != 0 {
            warn!(
                code = accepted.code,
                msg = %accepted.msg,
                "Retry accepted with a non-zero backend code."
            );
        } else {
            info!("Retry request accepted.");
        }

        Ok(accepted)
    }

    #[instrument(skip(self, body), fields(request_id))]
    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Vec<u8>, TransportError> {
        let request_id = Uuid::new_v4().to_string();
        Span::current().record("request_id", request_id.as_str());

        let response = self
            .client
            .post(self.config.endpoint(path))
            .header(REQUEST_ID_HEADER, request_id.as_str())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "Backend answered with a non-success status.");
            return Err(TransportError::from_status(status));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

fn parse_rows(body: &[u8]) -> Vec<OutboxMessage> {
    let raw_rows = match serde_json::from_slice::<Envelope<ListData>>(body) {
        Ok(envelope) => envelope
            .data
            .map(ListData::into_rows)
            .unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "Unreadable list envelope, treating it as no rows.");
            return Vec::new();
        }
    };

    // One bad row must not hide the rest of the page
    raw_rows
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<OutboxMessage>(raw) {
            Ok(row) => Some(row),
            Err(e) => {
                warn!(error = %e, "Skipping an unreadable outbox row.");
                None
            }
        })
        .collect()
}

fn parse_ack(id: i64, body: &[u8]) -> RequestAccepted {
    let envelope = serde_json::from_slice::<Envelope<serde_json::Value>>(body).ok();
    let (code, msg) = envelope
        .map(|envelope| (envelope.code, envelope.msg))
        .unwrap_or_default();

    RequestAccepted { id, code, msg }
}

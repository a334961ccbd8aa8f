//! An in-process stand-in for the outbox admin backend.

use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use actix_web::dev::ServerHandle;
use actix_web::http::StatusCode;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use reqwest::Url;
use serde_json::{Value, json};

use crate::models::{MessageStatus, Msg, OutboxMessage};

/// A canned answer.
#[derive(Debug, Clone)]
pub struct StubReply {
    status: u16,
    body: String,
}

impl StubReply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    pub fn raw(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
        }
    }

    fn respond(&self) -> HttpResponse {
        let status = StatusCode::from_u16(self.status).unwrap();
        HttpResponse::build(status)
            .content_type("application/json")
            .body(self.body.clone())
    }
}

/// A request the stub saw.
#[derive(Debug, Clone)]
pub struct Received {
    pub path: String,
    pub request_id: Option<String>,
    pub body: Value,
}

enum ListMode {
    Fixed(StubReply),
    /// Answers like the backend's DAO: filter, newest id first, then offset/limit.
    Table(Vec<OutboxMessage>),
}

struct StubState {
    list: ListMode,
    retry: StubReply,
    received: Mutex<Vec<Received>>,
}

impl StubState {
    fn record(&self, req: &HttpRequest, body: Value) {
        let request_id = req
            .headers()
            .get("X-Request-Id")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.received.lock().unwrap().push(Received {
            path: req.path().to_string(),
            request_id,
            body,
        });
    }
}

pub struct StubBackend {
    pub base_url: Url,
    state: Arc<StubState>,
    handle: ServerHandle,
}

impl StubBackend {
    pub async fn start_fixed(list: StubReply) -> Self {
        Self::start(ListMode::Fixed(list), ok_reply()).await
    }

    pub async fn start_table(rows: Vec<OutboxMessage>) -> Self {
        Self::start(ListMode::Table(rows), ok_reply()).await
    }

    pub async fn start_retry(retry: StubReply) -> Self {
        Self::start(ListMode::Fixed(empty_list_reply()), retry).await
    }

    pub async fn start_with(rows: Vec<OutboxMessage>, retry: StubReply) -> Self {
        Self::start(ListMode::Table(rows), retry).await
    }

    async fn start(list: ListMode, retry: StubReply) -> Self {
        let state = Arc::new(StubState {
            list,
            retry,
            received: Mutex::new(Vec::new()),
        });
        let data = web::Data::from(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .route("/local_msg/list", web::post().to(list_handler))
                .route("/local_msg/retry", web::post().to(retry_handler))
        })
        .workers(1)
        .listen(listener)
        .unwrap()
        .run();

        let handle = server.handle();
        actix_web::rt::spawn(server);

        Self {
            base_url: Url::parse(&format!("http://{addr}")).unwrap(),
            state,
            handle,
        }
    }

    pub fn received(&self) -> Vec<Received> {
        self.state.received.lock().unwrap().clone()
    }

    pub async fn stop(self) {
        self.handle.stop(true).await;
    }
}

async fn list_handler(
    req: HttpRequest,
    state: web::Data<StubState>,
    body: web::Json<Value>,
) -> HttpResponse {
    let body = body.into_inner();
    state.record(&req, body.clone());

    match &state.list {
        ListMode::Fixed(reply) => reply.respond(),
        ListMode::Table(rows) => {
            let page = query_rows(rows, &body["query"]);
            HttpResponse::Ok().json(json!({"code": 0, "msg": "OK", "data": {"data": page}}))
        }
    }
}

async fn retry_handler(
    req: HttpRequest,
    state: web::Data<StubState>,
    body: web::Json<Value>,
) -> HttpResponse {
    state.record(&req, body.into_inner());
    state.retry.respond()
}

fn query_rows(rows: &[OutboxMessage], query: &Value) -> Vec<OutboxMessage> {
    let status = query["status"].as_i64().unwrap_or(0);
    let key = query["key"].as_str().unwrap_or("");
    let start = query["startTime"].as_i64().unwrap_or(0);
    let end = query["endTime"].as_i64().unwrap_or(0);
    let offset = query["offset"].as_u64().unwrap_or(0) as usize;
    let limit = query["limit"].as_u64().unwrap_or(0) as usize;

    let mut matched: Vec<OutboxMessage> = rows
        .iter()
        .filter(|row| status < 0 || i64::from(row.status.code()) == status)
        .filter(|row| key.is_empty() || row.key == key)
        .filter(|row| start <= 0 || row.ctime >= start)
        .filter(|row| end <= 0 || row.ctime <= end)
        .cloned()
        .collect();
    matched.sort_by(|a, b| b.id.cmp(&a.id));
    matched.into_iter().skip(offset).take(limit).collect()
}

fn ok_reply() -> StubReply {
    StubReply::json(200, json!({"code": 0, "msg": "OK"}))
}

fn empty_list_reply() -> StubReply {
    StubReply::json(200, json!({"code": 0, "msg": "OK", "data": {"data": []}}))
}

pub fn row(id: i64, status: MessageStatus, ctime: i64) -> OutboxMessage {
    OutboxMessage {
        id,
        biz: "orders".to_string(),
        db: "shard1".to_string(),
        table: "outbox".to_string(),
        key: format!("order-{id}"),
        msg: Msg {
            topic: "order_created".to_string(),
            partition: (id % 4) as u32,
            content: format!("{{\"order\":{id}}}"),
        },
        status,
        ctime,
        utime: ctime + 1_000,
        send_times: match status {
            MessageStatus::Initialized => 0,
            _ => 1,
        },
    }
}

pub fn sample_rows() -> Vec<OutboxMessage> {
    vec![
        row(1, MessageStatus::Success, 1_700_000_000_000),
        row(2, MessageStatus::Failure, 1_700_000_060_000),
        row(3, MessageStatus::Initialized, 1_700_000_120_000),
        row(4, MessageStatus::Failure, 1_700_000_180_000),
        row(5, MessageStatus::Success, 1_700_000_240_000),
    ]
}

/// A base URL nothing is listening on.
pub fn unreachable_base_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{addr}")).unwrap()
}

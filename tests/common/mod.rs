//! Shared helpers for the integration tests

#![allow(dead_code)]

use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use upload_request::{UploadConfig, UploadError, UploadProgress, UploadResponse};

/// Everything a callback reported, in delivery order
#[derive(Debug, Clone)]
pub enum Event {
    Progress(UploadProgress),
    Success(UploadResponse),
    Error(UploadError),
}

#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Event>>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire all three callbacks of `config` into this recorder
    pub fn attach(&self, config: UploadConfig) -> UploadConfig {
        let (p, s, e) = (self.clone(), self.clone(), self.clone());
        config
            .on_progress(move |progress| p.push(Event::Progress(progress)))
            .on_success(move |response| s.push(Event::Success(response)))
            .on_error(move |err| e.push(Event::Error(err)))
    }

    fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn progress(&self) -> Vec<UploadProgress> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Progress(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn successes(&self) -> Vec<UploadResponse> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Success(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<UploadError> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Error(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    /// Exactly one terminal event, and it is the last one
    pub fn assert_single_terminal_last(&self) {
        let events = self.events();
        let terminals = events
            .iter()
            .filter(|event| !matches!(event, Event::Progress(_)))
            .count();
        assert_eq!(terminals, 1, "expected exactly one terminal event: {:?}", events);
        assert!(
            !matches!(events.last(), Some(Event::Progress(_))),
            "terminal event must come last: {:?}",
            events
        );
    }

    pub fn assert_progress_consistent(&self) {
        let progress = self.progress();
        for event in &progress {
            assert_eq!(
                event.percent,
                event.loaded as f64 / event.total as f64 * 100.0
            );
        }
        for pair in progress.windows(2) {
            assert!(pair[0].loaded <= pair[1].loaded, "loaded went backwards");
        }
    }
}

/// One multipart field as decoded by the test server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedField {
    pub name: Option<String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl ReceivedField {
    pub fn file(name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        Self {
            name: Some(name.to_string()),
            file_name: Some(file_name.to_string()),
            content_type: Some(content_type.to_string()),
            data: data.to_vec(),
        }
    }

    pub fn text(name: &str, value: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            file_name: None,
            content_type: None,
            data: value.as_bytes().to_vec(),
        }
    }
}

/// Request as seen by the test server
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub method: Method,
    pub path: String,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub fields: Vec<ReceivedField>,
}

/// Canned answer to `POST /upload`
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    body: &'static [u8],
    location: Option<&'static str>,
}

impl Reply {
    pub fn new(status: u16, body: &'static [u8]) -> Self {
        Self {
            status: StatusCode::from_u16(status).expect("Invalid status code"),
            body,
            location: None,
        }
    }

    pub fn redirect(status: u16, location: &'static str) -> Self {
        Self {
            location: Some(location),
            ..Self::new(status, b"")
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        if let Some(location) = self.location {
            response
                .headers_mut()
                .insert(header::LOCATION, HeaderValue::from_static(location));
        }
        response
    }
}

#[derive(Clone)]
struct ServerState {
    reply: Reply,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl ServerState {
    fn record(&self, request: ReceivedRequest) {
        self.received.lock().unwrap().push(request);
    }
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn receive_upload(
    State(state): State<ServerState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut fields = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return (err.status(), err.body_text()).into_response(),
        };

        let name = field.name().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = match field.bytes().await {
            Ok(data) => data.to_vec(),
            Err(err) => return (err.status(), err.body_text()).into_response(),
        };
        fields.push(ReceivedField {
            name,
            file_name,
            content_type,
            data,
        });
    }

    state.record(ReceivedRequest {
        method: Method::POST,
        path: "/upload".to_string(),
        content_type: header_value(&headers, header::CONTENT_TYPE),
        content_length: header_value(&headers, header::CONTENT_LENGTH)
            .and_then(|value| value.parse().ok()),
        fields,
    });
    state.reply.into_response()
}

/// Any request that is not the upload itself, e.g. a followed redirect
async fn receive_other(
    State(state): State<ServerState>,
    method: Method,
    uri: Uri,
) -> &'static str {
    state.record(ReceivedRequest {
        method,
        path: uri.path().to_string(),
        content_type: None,
        content_length: None,
        fields: Vec::new(),
    });
    "unexpected request"
}

/// Local axum server answering `POST /upload` with a canned reply
pub struct TestServer {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(reply: Reply) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/upload", post(receive_upload))
            .fallback(receive_other)
            .with_state(ServerState {
                reply,
                received: received.clone(),
            });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            received,
            task,
        }
    }

    pub fn upload_url(&self) -> String {
        format!("http://{}/upload", self.addr)
    }

    /// Requests seen so far, in arrival order
    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.received.lock().unwrap().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Address of a port nothing is listening on
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/upload", addr)
}

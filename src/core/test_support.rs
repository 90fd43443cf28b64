//! In-process chat-completions server for tests

use axum::{
    extract::{Json, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::core::config::TranslatorConfig;

/// Scripted reply for one request
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Fixed status, optional `Retry-After`, fixed JSON body
    Fixed {
        status: u16,
        retry_after: Option<String>,
        body: Value,
    },
    /// Answer with the chunk from the prompt upper-cased
    Uppercase,
}

impl MockReply {
    pub fn translation(content: &str) -> Self {
        MockReply::Fixed {
            status: 200,
            retry_after: None,
            body: completion_body(content),
        }
    }

    pub fn status(status: u16) -> Self {
        MockReply::Fixed {
            status,
            retry_after: None,
            body: json!({ "error": { "message": format!("mock status {}", status) } }),
        }
    }

    pub fn rate_limited(retry_after: Option<&str>) -> Self {
        MockReply::Fixed {
            status: 429,
            retry_after: retry_after.map(str::to_string),
            body: json!({ "error": { "message": "rate limited" } }),
        }
    }

    pub fn raw(body: Value) -> Self {
        MockReply::Fixed {
            status: 200,
            retry_after: None,
            body,
        }
    }
}

/// A request as the server saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub headers: HeaderMap,
    pub body: Value,
}

#[derive(Clone, Default)]
struct MockState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Mock of `<endpoint>/chat/completions`. Once the script runs out every
/// request gets [`MockReply::Uppercase`].
pub struct MockServer {
    pub endpoint: String,
    state: MockState,
}

impl MockServer {
    pub async fn start(replies: Vec<MockReply>) -> Self {
        let state = MockState {
            replies: Arc::new(Mutex::new(replies.into())),
            ..Default::default()
        };

        let app = Router::new()
            .route("/v1/chat/completions", post(handle_completion))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            endpoint: format!("http://{}/v1", addr),
            state,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }

    /// Config pointing at this server with short backoff
    pub fn config(&self) -> TranslatorConfig {
        test_config(&self.endpoint)
    }
}

pub fn test_config(endpoint: &str) -> TranslatorConfig {
    TranslatorConfig {
        api_endpoint: endpoint.to_string(),
        retry_delay_ms: 10,
        timeout_ms: 5000,
        ..TranslatorConfig::new("test-key", "spanish", "english")
    }
}

pub fn completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

async fn handle_completion(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.requests.lock().unwrap().push(RecordedRequest {
        headers,
        body: body.clone(),
    });

    let reply = state
        .replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or(MockReply::Uppercase);

    match reply {
        MockReply::Fixed {
            status,
            retry_after,
            body,
        } => {
            let mut response = (StatusCode::from_u16(status).unwrap(), Json(body)).into_response();
            if let Some(value) = retry_after {
                response
                    .headers_mut()
                    .insert("retry-after", HeaderValue::from_str(&value).unwrap());
            }
            response
        }
        MockReply::Uppercase => {
            let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
            // The prompt is two instruction paragraphs followed by the chunk
            let chunk = prompt.splitn(3, "\n\n").nth(2).unwrap_or_default();
            Json(completion_body(&chunk.to_uppercase())).into_response()
        }
    }
}

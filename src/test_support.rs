//! Throwaway upstream servers for exercising the HTTP clients.

use actix_web::{http::StatusCode, web, App, HttpRequest, HttpResponse, HttpServer};
use serde_json::Value;
use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Reply {
    Json(u16, Value),
    Text(u16, String),
}

impl Reply {
    fn into_response(self) -> HttpResponse {
        match self {
            Reply::Json(status, body) => {
                HttpResponse::build(StatusCode::from_u16(status).unwrap()).json(body)
            }
            Reply::Text(status, body) => HttpResponse::build(StatusCode::from_u16(status).unwrap())
                .content_type("text/plain")
                .body(body),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub headers: HashMap<String, String>,
    pub body: Value,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// An HTTP server on `127.0.0.1` that answers every request with the same
/// reply and records what it received.
pub struct FakeUpstream {
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeUpstream {
    pub async fn start(reply: Reply) -> Self {
        Self::start_with_delay(reply, Duration::ZERO).await
    }

    pub async fn start_with_delay(reply: Reply, delay: Duration) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();

        let server = HttpServer::new(move || {
            let reply = reply.clone();
            let recorded = recorded.clone();
            App::new().default_service(web::to(move |req: HttpRequest, body: web::Bytes| {
                let reply = reply.clone();
                let recorded = recorded.clone();
                async move {
                    let headers = req
                        .headers()
                        .iter()
                        .map(|(name, value)| {
                            (
                                name.as_str().to_string(),
                                value.to_str().unwrap_or_default().to_string(),
                            )
                        })
                        .collect();
                    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
                    recorded
                        .lock()
                        .unwrap()
                        .push(RecordedRequest { headers, body });

                    if !delay.is_zero() {
                        actix_web::rt::time::sleep(delay).await;
                    }
                    reply.into_response()
                }
            }))
        })
        .workers(1)
        .disable_signals()
        .bind(("127.0.0.1", 0))
        .expect("bind fake upstream");

        let url = format!("http://{}/generate", server.addrs()[0]);
        actix_web::rt::spawn(server.run());

        Self { url, requests }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// A URL on which nothing is listening.
pub fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe listener");
    let addr = listener.local_addr().expect("probe address");
    drop(listener);
    format!("http://{}/generate", addr)
}

//! In-memory transport for tests and local development.
//!
//! Routes are keyed by method and exact path. Each route holds a queue of
//! canned responses: they are served in order and the last one keeps being
//! replayed, which is how a polled endpoint is scripted. Every request is
//! recorded so tests can count exchanges.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method};
use crate::ApsResult;

struct Route {
    method: Method,
    path: String,
    responses: VecDeque<HttpResponse>,
}

#[derive(Default)]
pub struct StubTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `method path`
    pub fn on(&self, method: Method, path: impl Into<String>, response: HttpResponse) -> &Self {
        let path = path.into();
        let mut routes = self.routes.lock();
        match routes.iter_mut().find(|r| r.method == method && r.path == path) {
            Some(route) => route.responses.push_back(response),
            None => routes.push(Route {
                method,
                path,
                responses: VecDeque::from([response]),
            }),
        }
        self
    }

    /// Queue a JSON response for `method path`
    pub fn on_json(&self, method: Method, path: impl Into<String>, status: u16, body: serde_json::Value) -> &Self {
        self.on(method, path, HttpResponse::json_body(status, &body))
    }

    /// Every request seen so far, oldest first
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Requests matching `method path`
    pub fn requests_to(&self, method: Method, path: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path() == path)
            .cloned()
            .collect()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path() == path)
            .count()
    }

    fn next_response(&self, request: &HttpRequest) -> HttpResponse {
        let mut routes = self.routes.lock();
        let route = routes
            .iter_mut()
            .find(|r| r.method == request.method && r.path == request.path());

        match route {
            Some(route) if route.responses.len() > 1 => route.responses.pop_front().unwrap_or_else(not_found),
            Some(route) => route.responses.front().cloned().unwrap_or_else(not_found),
            None => HttpResponse::json_body(
                404,
                &json!({ "reason": format!("No stub route for {} {}", request.method, request.path()) }),
            ),
        }
    }
}

fn not_found() -> HttpResponse {
    HttpResponse::json_body(404, &json!({ "reason": "Stub route exhausted" }))
}

#[async_trait]
impl HttpTransport for StubTransport {
    async fn send(&self, request: HttpRequest) -> ApsResult<HttpResponse> {
        let response = self.next_response(&request);
        self.requests.lock().push(request);
        Ok(response)
    }
}

//! Shared test doubles for the crate's unit tests.

use async_trait::async_trait;
use lib_providers::error::{Error, Result as ProviderResult};
use lib_providers::transport::{HttpExecute, HttpRequest, HttpResponse};
use std::sync::{Arc, Mutex};

/// Executor that routes scripted responses by URL substring and records
/// every request URL it sees.
pub struct RoutedExecutor {
    routes: Vec<(&'static str, ProviderResult<HttpResponse>)>,
    pub requests: Mutex<Vec<String>>,
}

impl RoutedExecutor {
    pub fn new(routes: Vec<(&'static str, ProviderResult<HttpResponse>)>) -> Arc<Self> {
        Arc::new(Self {
            routes,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpExecute for RoutedExecutor {
    async fn execute(&self, request: HttpRequest) -> ProviderResult<HttpResponse> {
        self.requests.lock().unwrap().push(request.url.clone());
        for (pattern, result) in &self.routes {
            if request.url.contains(pattern) {
                return match result {
                    Ok(response) => Ok(response.clone()),
                    Err(err) => Err(Error::Transport(err.to_string())),
                };
            }
        }
        Err(Error::Transport(format!("unrouted url: {}", request.url)))
    }
}

/// A 200 response with the given JSON body.
pub fn ok(body: &str) -> ProviderResult<HttpResponse> {
    Ok(HttpResponse {
        status: 200,
        body: body.as_bytes().to_vec(),
    })
}

/// A transport-level failure.
pub fn failing() -> ProviderResult<HttpResponse> {
    Err(Error::Transport("connection reset".to_string()))
}

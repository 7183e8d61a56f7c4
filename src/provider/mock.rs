use std::{fmt, sync::Mutex};

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::Error;

use super::{HttpRequest, Transport};

type Responder = Box<
    dyn Fn(HttpRequest) -> BoxFuture<'static, Result<Value, Error>>
        + Send
        + Sync,
>;

/// Transport double that records every request it receives.
pub struct MockTransport {
    responder: Responder,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new<F>(responder: F) -> MockTransport
    where
        F: Fn(HttpRequest) -> BoxFuture<'static, Result<Value, Error>>
            + Send
            + Sync
            + 'static,
    {
        MockTransport {
            responder: Box::new(responder),
            requests: Mutex::new(vec![]),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("calls", &self.calls())
            .finish()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<Value, Error> {
        self.requests.lock().unwrap().push(request.clone());
        (self.responder)(request).await
    }
}

use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Method};
use serde_json::Value;

use crate::{configuration::Config, error::Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    GET,
    POST,
    PUT,
    DELETE,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HttpMethod::GET => write!(f, "GET"),
            HttpMethod::POST => write!(f, "POST"),
            HttpMethod::PUT => write!(f, "PUT"),
            HttpMethod::DELETE => write!(f, "DELETE"),
        }
    }
}

impl From<HttpMethod> for Method {
    fn from(value: HttpMethod) -> Self {
        match value {
            HttpMethod::GET => Method::GET,
            HttpMethod::POST => Method::POST,
            HttpMethod::PUT => Method::PUT,
            HttpMethod::DELETE => Method::DELETE,
        }
    }
}

/// A fully resolved request as handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<Value>,
}

/// Sends JSON requests and returns the parsed JSON body.
#[async_trait]
pub trait Transport: fmt::Debug + Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<Value, Error>;
}

#[derive(Debug)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new(config: &Config) -> Result<ReqwestTransport, Error> {
        let http = match Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .cookie_store(true)
            .build()
        {
            Ok(c) => c,
            Err(e) => {
                return Err(Error::ReqwestError(e));
            },
        };

        Ok(ReqwestTransport { http })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<Value, Error> {
        let mut builder = self
            .http
            .request(request.method.into(), &request.url)
            .header(CONTENT_TYPE, "application/json");

        if request.method != HttpMethod::GET {
            if let Some(body) = &request.body {
                builder = builder.body(body.to_string());
            }
        }

        let json = builder.send().await?.json::<Value>().await?;
        Ok(json)
    }
}

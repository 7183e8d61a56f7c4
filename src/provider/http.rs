use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::{
    cache::{cache_key, Clock, ResponseCache, SystemClock, TimedCache},
    configuration::Config,
    error::Error,
    types::{GraphQLRequest, GraphQLResponse},
};

use super::{HttpMethod, HttpRequest, ReqwestTransport, Transport};

/// One call against the configured API.
#[derive(Debug, Clone)]
pub struct FetchParams {
    pub path: String,
    pub method: HttpMethod,
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
    pub cache_result: bool,
}

impl FetchParams {
    pub fn get(path: &str) -> Self {
        Self {
            path: path.to_owned(),
            method: HttpMethod::GET,
            body: None,
            query: vec![],
            cache_result: true,
        }
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn no_cache(mut self) -> Self {
        self.cache_result = false;
        self
    }
}

#[derive(Debug)]
pub struct HTTP {
    pub config: Config,
    transport: Arc<dyn Transport>,
    cache: Arc<ResponseCache>,
}

impl HTTP {
    pub fn new(config: Config) -> Result<HTTP, Error> {
        let transport = ReqwestTransport::new(&config)?;
        let cache =
            TimedCache::new(config.cache_ttl, Arc::new(SystemClock) as Arc<dyn Clock>);

        Ok(HTTP::with_transport(
            config,
            Arc::new(transport),
            Arc::new(cache),
        ))
    }

    pub fn with_transport(
        config: Config,
        transport: Arc<dyn Transport>,
        cache: Arc<ResponseCache>,
    ) -> HTTP {
        HTTP {
            config,
            transport,
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Returns the JSON body for `params`, from the cache when a live entry
    /// exists for the same method, path and body.
    pub async fn fetch_json(
        &self,
        params: FetchParams,
    ) -> Result<Arc<Value>, Error> {
        let url = self.build_url(&params)?;
        let path = match url.query() {
            Some(query) => format!("{}?{}", params.path, query),
            None => params.path.to_owned(),
        };
        let key = cache_key(
            &params.method.to_string(),
            &path,
            params.body.as_ref(),
        );

        if let Some(cached) = self.cache.get(&key).await {
            debug!("cache hit: {}", &key);
            return Ok(cached);
        }

        debug!("{} {}", params.method, url);
        let res = self
            .transport
            .send(HttpRequest {
                method: params.method,
                url: url.to_string(),
                body: params.body,
            })
            .await?;

        if is_falsy(&res) {
            return Err(Error::FetchError(format!(
                "empty response from {}",
                path
            )));
        }

        let res = Arc::new(res);
        if params.cache_result {
            self.cache.set(&key, res.clone()).await;
        }

        Ok(res)
    }

    pub async fn fetch_data<T: DeserializeOwned>(
        &self,
        params: FetchParams,
    ) -> Result<T, Error> {
        let json = self.fetch_json(params).await?;
        let data = T::deserialize(&*json)?;
        Ok(data)
    }

    /// Posts a static GraphQL query to an absolute endpoint. Never cached.
    pub async fn post_graphql<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &str,
    ) -> Result<T, Error> {
        let url = Url::parse(url)?;
        let body = serde_json::to_value(GraphQLRequest { query })?;

        let json = self
            .transport
            .send(HttpRequest {
                method: HttpMethod::POST,
                url: url.to_string(),
                body: Some(body),
            })
            .await?;

        let response = GraphQLResponse::<T>::deserialize(json)?;
        match response.data {
            Some(data) => Ok(data),
            None => {
                let message = response
                    .errors
                    .iter()
                    .map(|e| e.message.to_owned())
                    .collect::<Vec<String>>()
                    .join("; ");
                Err(Error::GraphQLError(format!("{}: {}", url, message)))
            },
        }
    }

    fn build_url(&self, params: &FetchParams) -> Result<Url, Error> {
        let mut url = Url::parse(&self.config.get_url(&params.path))?;
        if !params.query.is_empty() {
            url.query_pairs_mut().extend_pairs(params.query.iter());
        }
        Ok(url)
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cache::ManualClock, provider::MockTransport};
    use chrono::{TimeZone, Utc};
    use futures::FutureExt;
    use serde_json::json;
    use std::time::Duration;

    fn http_with(
        transport: Arc<MockTransport>,
        clock: Arc<ManualClock>,
    ) -> HTTP {
        let config = Config::with_base_url("https://api.example.com");
        let cache = Arc::new(TimedCache::new(config.cache_ttl, clock));
        HTTP::with_transport(config, transport, cache)
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ))
    }

    fn echo_transport() -> Arc<MockTransport> {
        Arc::new(MockTransport::new(|request| {
            async move { Ok(json!({ "url": request.url, "body": request.body })) }
                .boxed()
        }))
    }

    #[tokio::test]
    async fn test_second_call_within_ttl_is_served_from_cache() {
        let transport = echo_transport();
        let http = http_with(transport.clone(), clock());

        let first = http.fetch_json(FetchParams::get("stats")).await.unwrap();
        let second = http.fetch_json(FetchParams::get("stats")).await.unwrap();

        assert_eq!(transport.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_call_after_ttl_hits_network_again() {
        let transport = echo_transport();
        let clock = clock();
        let http = http_with(transport.clone(), clock.clone());

        http.fetch_json(FetchParams::get("stats")).await.unwrap();
        clock.advance(Duration::from_secs(120));
        http.fetch_json(FetchParams::get("stats")).await.unwrap();

        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_body_is_part_of_the_key() {
        let transport = echo_transport();
        let http = http_with(transport.clone(), clock());

        let params = FetchParams::get("search").with_method(HttpMethod::POST);
        let a = http
            .fetch_json(params.clone().with_body(json!({ "q": "a" })))
            .await
            .unwrap();
        let b = http
            .fetch_json(params.clone().with_body(json!({ "q": "b" })))
            .await
            .unwrap();

        assert_eq!(transport.calls(), 2);
        assert_ne!(a, b);

        http.fetch_json(params.with_body(json!({ "q": "a" })))
            .await
            .unwrap();
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_no_cache_always_fetches() {
        let transport = echo_transport();
        let http = http_with(transport.clone(), clock());

        http.fetch_json(FetchParams::get("stats").no_cache())
            .await
            .unwrap();
        http.fetch_json(FetchParams::get("stats").no_cache())
            .await
            .unwrap();

        assert_eq!(transport.calls(), 2);
        assert!(http.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_request_shape() {
        let transport = echo_transport();
        let http = http_with(transport.clone(), clock());

        let query = vec![(String::from("startDate"), String::from("2024-01-01"))];
        http.fetch_json(FetchParams::get("dashboard/tvl").with_query(query))
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].method, HttpMethod::GET);
        assert_eq!(
            requests[0].url,
            "https://api.example.com/dashboard/tvl?startDate=2024-01-01"
        );
        assert_eq!(requests[0].body, None);
    }

    #[tokio::test]
    async fn test_falsy_body_is_an_error_and_not_cached() {
        for body in [json!(null), json!(false), json!(0), json!("")] {
            let transport = Arc::new(MockTransport::new(move |_| {
                let body = body.clone();
                async move { Ok(body) }.boxed()
            }));
            let http = http_with(transport.clone(), clock());

            let result = http.fetch_json(FetchParams::get("stats")).await;

            assert!(matches!(result, Err(Error::FetchError(_))));
            assert!(http.cache().is_empty().await);
        }
    }

    #[tokio::test]
    async fn test_empty_array_is_a_valid_body() {
        let transport = Arc::new(MockTransport::new(|_| {
            async move { Ok(json!([])) }.boxed()
        }));
        let http = http_with(transport, clock());

        let data: Vec<u32> =
            http.fetch_data(FetchParams::get("list")).await.unwrap();
        assert!(data.is_empty());
    }

    #[tokio::test]
    async fn test_post_graphql() {
        let transport = Arc::new(MockTransport::new(|request| {
            async move {
                assert_eq!(request.method, HttpMethod::POST);
                assert_eq!(request.body, Some(json!({ "query": "{ users { id } }" })));
                Ok(json!({ "data": { "users": [{ "id": "0x1" }] } }))
            }
            .boxed()
        }));
        let http = http_with(transport.clone(), clock());

        let data: crate::types::UsersData = http
            .post_graphql("https://graph.example.com/subgraph", "{ users { id } }")
            .await
            .unwrap();

        assert_eq!(data.users.len(), 1);
        assert_eq!(data.users[0].id, "0x1");
    }

    #[tokio::test]
    async fn test_post_graphql_errors() {
        let transport = Arc::new(MockTransport::new(|_| {
            async move { Ok(json!({ "errors": [{ "message": "indexer down" }] })) }
                .boxed()
        }));
        let http = http_with(transport, clock());

        let result: Result<crate::types::UsersData, Error> = http
            .post_graphql("https://graph.example.com/subgraph", "{ users { id } }")
            .await;

        match result {
            Err(Error::GraphQLError(message)) => {
                assert!(message.contains("indexer down"))
            },
            other => panic!("unexpected result: {:?}", other),
        }
    }
}

use crate::errors::FetchError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::trace;

/// Shared HTTP client for every source adapter.
///
/// Wraps one `reqwest::Client` (connection pool included) and folds
/// transport, status and decode failures into [`FetchError`] under the
/// caller's source label.
#[derive(Clone, Debug)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Self {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .expect("Failed to create HTTP client");
        Self { inner }
    }

    /// GET `url` with query parameters and decode the JSON body into `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        source_name: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        trace!(source = source_name, url, "GET");
        let response = self
            .inner
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(source_name, e))?;
        Self::decode(source_name, response).await
    }

    /// POST a JSON body to `url` and decode the JSON response into `T`.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        source_name: &'static str,
        url: &str,
        body: &B,
    ) -> Result<T, FetchError> {
        trace!(source = source_name, url, "POST");
        let response = self
            .inner
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(source_name, e))?;
        Self::decode(source_name, response).await
    }

    async fn decode<T: DeserializeOwned>(
        source_name: &'static str,
        response: reqwest::Response,
    ) -> Result<T, FetchError> {
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::upstream(
                source_name,
                Some(status.as_u16()),
                format!("http status {status}"),
            ));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::from_reqwest(source_name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize)]
    struct Payload {
        value: u64,
    }

    #[tokio::test]
    async fn test_get_json_decodes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .and(query_param("limit", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"value": 7})))
            .mount(&server)
            .await;

        let client = HttpClient::new(Duration::from_secs(2));
        let url = format!("{}/data", server.uri());
        let payload: Payload = client
            .get_json("test-source", &url, &[("limit", "3".to_owned())])
            .await
            .unwrap();
        assert_eq!(payload.value, 7);
    }

    #[tokio::test]
    async fn test_non_success_status_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HttpClient::new(Duration::from_secs(2));
        let err = client
            .get_json::<Payload>("test-source", &server.uri(), &[])
            .await
            .unwrap_err();
        match err {
            FetchError::Upstream { status, source_name, .. } => {
                assert_eq!(status, Some(503));
                assert_eq!(source_name, "test-source");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = HttpClient::new(Duration::from_secs(2));
        let err = client
            .get_json::<Payload>("test-source", &server.uri(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
    }
}

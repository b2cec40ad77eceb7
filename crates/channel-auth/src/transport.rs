//! HTTP transport seam
//!
//! The auth core never talks to the network directly; it goes through
//! `HttpTransport`, an opaque collaborator the host supplies. The trait
//! uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
//! (`Arc<dyn HttpTransport>`), and its error mapping is the contract the
//! rest of the SDK branches on: transport faults become `Network`, non-2xx
//! statuses become `Server { status, message }`, nothing else.
//!
//! `ReqwestTransport` is the production adapter. Timeouts and connection
//! pooling belong to the `reqwest::Client` it is built from; the SDK adds
//! no timers of its own.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use common::{ApiError, ApiResult};

/// Opaque HTTP collaborator.
///
/// `params` are sent as query parameters for `get`/`delete` and as a form
/// body for `post`. A `Null` body is returned for empty 2xx responses.
pub trait HttpTransport: Send + Sync {
    fn get<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(String, String)],
        params: &'a [(String, String)],
    ) -> Pin<Box<dyn Future<Output = ApiResult<Value>> + Send + 'a>>;

    fn post<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(String, String)],
        params: &'a [(String, String)],
    ) -> Pin<Box<dyn Future<Output = ApiResult<Value>> + Send + 'a>>;

    fn delete<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(String, String)],
        params: &'a [(String, String)],
    ) -> Pin<Box<dyn Future<Output = ApiResult<Value>> + Send + 'a>>;
}

/// Production transport backed by a shared `reqwest::Client`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn dispatch(request: reqwest::RequestBuilder) -> ApiResult<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::Server {
                status: status.as_u16(),
                message: body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| ApiError::Internal(format!("invalid JSON response: {e}")))
    }

    fn apply_headers(
        mut request: reqwest::RequestBuilder,
        headers: &[(String, String)],
    ) -> reqwest::RequestBuilder {
        for (name, value) in headers {
            request = request.header(name, value);
        }
        request
    }
}

impl HttpTransport for ReqwestTransport {
    fn get<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(String, String)],
        params: &'a [(String, String)],
    ) -> Pin<Box<dyn Future<Output = ApiResult<Value>> + Send + 'a>> {
        Box::pin(async move {
            let request = Self::apply_headers(self.client.get(url).query(params), headers);
            Self::dispatch(request).await
        })
    }

    fn post<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(String, String)],
        params: &'a [(String, String)],
    ) -> Pin<Box<dyn Future<Output = ApiResult<Value>> + Send + 'a>> {
        Box::pin(async move {
            let request = Self::apply_headers(self.client.post(url).form(params), headers);
            Self::dispatch(request).await
        })
    }

    fn delete<'a>(
        &'a self,
        url: &'a str,
        headers: &'a [(String, String)],
        params: &'a [(String, String)],
    ) -> Pin<Box<dyn Future<Output = ApiResult<Value>> + Send + 'a>> {
        Box::pin(async move {
            let request = Self::apply_headers(self.client.delete(url).query(params), headers);
            Self::dispatch(request).await
        })
    }
}

use crate::request::{errors::RequestError, types::PreparedRequest};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::instrument;

/// Sends a prepared request on a fresh, non-pooled client.
///
/// The caller owns the returned response and must read or drop its body
/// before the call that issued it returns.
#[instrument(skip_all, fields(method = %request.method, url = %request.url))]
pub async fn send(request: PreparedRequest, timeout: Duration) -> Result<Response, RequestError> {
    let url = url::Url::parse(&request.url).map_err(|source| RequestError::InvalidUrl {
        url: request.url.clone(),
        source,
    })?;

    let client = Client::builder()
        .pool_max_idle_per_host(0)
        .timeout(timeout)
        .build()
        .map_err(RequestError::from_reqwest_error)?;

    let mut builder = client.request(request.method, url).headers(request.headers);
    if let Some(body) = request.body {
        builder = builder.body(body.into_bytes());
    }

    builder.send().await.map_err(RequestError::from_reqwest_error)
}

//! Shared HTTP plumbing for upstream services.
//!
//! Maps transport failures and non-success statuses onto `AppError` so that
//! `RetryPolicy` can tell transient failures from permanent ones.

use luxas_core::{AppError, AppResult, Service};

/// Error for `service` carrying a non-transient message.
pub fn service_error(service: Service, message: impl Into<String>) -> AppError {
    let message = message.into();
    match service {
        Service::Embedding => AppError::Embedding(message),
        Service::LanguageModel => AppError::Llm(message),
        Service::VectorStore => AppError::VectorStore(message),
        Service::NewsSearch => AppError::Search(message),
    }
}

/// Classify a `reqwest` failure.
///
/// Connection, timeout and body transfer problems are transient; malformed
/// payloads and request construction errors are not.
pub fn transport_error(service: Service, err: reqwest::Error) -> AppError {
    if err.is_decode() || err.is_builder() {
        return service_error(service, format!("Invalid response: {}", err));
    }
    AppError::Unavailable {
        service,
        message: err.to_string(),
    }
}

/// Pass successful responses through; turn anything else into an error.
pub async fn ensure_success(
    service: Service,
    response: reqwest::Response,
) -> AppResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::upstream(service, status.as_u16(), &body))
}

/// Send a request and decode its JSON body.
pub async fn send_json<T: serde::de::DeserializeOwned>(
    service: Service,
    request: reqwest::RequestBuilder,
) -> AppResult<T> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(service, e))?;
    let response = ensure_success(service, response).await?;
    response
        .json()
        .await
        .map_err(|e| transport_error(service, e))
}

/// Join a base URL and a path without doubling slashes.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

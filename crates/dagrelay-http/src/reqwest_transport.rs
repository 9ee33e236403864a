use async_trait::async_trait;
use reqwest::Client;

use crate::Transport;
use crate::error::TransportError;
use crate::request::{HttpRequest, HttpResponse, Method};

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
  client: Client,
}

impl ReqwestTransport {
  pub fn new() -> Self {
    Self::default()
  }

  /// Use a preconfigured client (proxies, TLS roots, connection pool limits).
  pub fn with_client(client: Client) -> Self {
    Self { client }
  }

  fn map_error(request: &HttpRequest, e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
      TransportError::Timeout {
        url: request.url.clone(),
        timeout_ms: request.timeout.as_millis() as u64,
      }
    } else if e.is_builder() {
      TransportError::InvalidRequest {
        url: request.url.clone(),
        message: e.to_string(),
      }
    } else {
      TransportError::Request {
        url: request.url.clone(),
        message: e.to_string(),
      }
    }
  }
}

#[async_trait]
impl Transport for ReqwestTransport {
  async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
    let method = match request.method {
      Method::Get => reqwest::Method::GET,
      Method::Post => reqwest::Method::POST,
    };

    let mut builder = self
      .client
      .request(method, &request.url)
      .timeout(request.timeout);

    for (key, value) in &request.headers {
      builder = builder.header(key, value);
    }

    if let Some((username, password)) = &request.basic_auth {
      builder = builder.basic_auth(username, Some(password));
    }

    if let Some(body) = &request.body {
      builder = builder.json(body);
    }

    let response = builder
      .send()
      .await
      .map_err(|e| Self::map_error(&request, e))?;

    let status = response.status().as_u16();
    let body = response
      .text()
      .await
      .map_err(|e| Self::map_error(&request, e))?;

    Ok(HttpResponse { status, body })
  }
}

use std::time::Duration;

use dagrelay_config::Credentials;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
}

/// A transport-agnostic HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
  pub method: Method,
  pub url: String,
  pub headers: Vec<(String, String)>,
  /// HTTP basic auth as `(username, password)`.
  pub basic_auth: Option<(String, String)>,
  /// JSON body; sent with `Content-Type: application/json`.
  pub body: Option<serde_json::Value>,
  pub timeout: Duration,
}

impl HttpRequest {
  const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

  pub fn get(url: impl Into<String>) -> Self {
    Self {
      method: Method::Get,
      url: url.into(),
      headers: Vec::new(),
      basic_auth: None,
      body: None,
      timeout: Self::DEFAULT_TIMEOUT,
    }
  }

  pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
    let mut request = Self::get(url);
    request.method = Method::Post;
    request.body = Some(body);
    request.header("Content-Type", "application/json")
  }

  pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.push((name.into(), value.into()));
    self
  }

  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Attach credentials: a bearer token becomes an `Authorization` header,
  /// basic credentials are carried in [`HttpRequest::basic_auth`].
  pub fn credentials(self, credentials: &Credentials) -> Self {
    match credentials {
      Credentials::None => self,
      Credentials::Bearer(token) => self.header("Authorization", format!("Bearer {}", token)),
      Credentials::Basic { username, password } => Self {
        basic_auth: Some((username.clone(), password.clone())),
        ..self
      },
    }
  }

  /// First header value with the given name (case-insensitive).
  pub fn header_value(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }
}

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
  pub status: u16,
  pub body: String,
}

impl HttpResponse {
  pub fn new(status: u16, body: impl Into<String>) -> Self {
    Self {
      status,
      body: body.into(),
    }
  }

  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

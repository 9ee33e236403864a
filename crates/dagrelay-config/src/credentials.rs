/// Credentials presented to the orchestrator's REST API.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Credentials {
  #[default]
  None,
  /// `Authorization: Bearer <token>`
  Bearer(String),
  /// HTTP basic auth.
  Basic { username: String, password: String },
}

impl Credentials {
  /// Pick credentials from optional parts.
  ///
  /// A token takes precedence over basic auth. Basic auth is only used when
  /// both username and password are present and non-empty.
  pub fn from_parts(
    token: Option<String>,
    username: Option<String>,
    password: Option<String>,
  ) -> Self {
    if let Some(token) = token.filter(|t| !t.is_empty()) {
      return Self::Bearer(token);
    }

    match (username, password) {
      (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
        Self::Basic { username, password }
      }
      _ => Self::None,
    }
  }
}

// Secrets never reach log output.
impl std::fmt::Debug for Credentials {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::None => write!(f, "None"),
      Self::Bearer(_) => write!(f, "Bearer(***)"),
      Self::Basic { username, .. } => write!(f, "Basic({username}:***)"),
    }
  }
}

//! Dagrelay HTTP
//!
//! The trigger engine never talks to `reqwest` directly. It builds an
//! [`HttpRequest`] and hands it to a [`Transport`], so tests (and embedders
//! with their own client stack) can substitute the network layer.
//!
//! [`ReqwestTransport`] is the production implementation.

mod error;
mod request;
mod reqwest_transport;

pub use error::TransportError;
pub use request::{HttpRequest, HttpResponse, Method};
pub use reqwest_transport::ReqwestTransport;

use async_trait::async_trait;

/// Performs HTTP requests on behalf of the trigger engine.
///
/// Implementations must honor [`HttpRequest::timeout`] and report it as
/// [`TransportError::Timeout`]. Any response that arrives, whatever its
/// status, is returned as `Ok`; status handling is the caller's concern.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

//! Transport layer and typed endpoint functions for the pipeline platform API.
//!
//! Every request goes through `ApiClient`, which injects the session's bearer
//! credential, normalises the response envelope and turns HTTP failures into
//! `ApiError`s. A 401 on an authenticated request ends the session and sends
//! the user back to the login page before the error reaches the caller.
//!
//! Endpoint functions are grouped by resource:
//! - `auth`: login, logout, profile, password, registration
//! - `pipelines`: pipeline CRUD, triggering and run history
//! - `resources`: artifacts, dashboard, HPA policies, clusters, system

pub mod auth;
pub mod client;
pub mod error;
pub mod pipelines;
pub mod resources;
pub mod transport;

pub use client::{ApiClient, ApiRequest};
pub use error::{ApiError, ErrorKind};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};

#[cfg(test)]
pub(crate) mod test_support;

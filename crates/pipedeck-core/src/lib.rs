//! Core library for pipedeck.
//!
//! This crate is the client side of the pipeline platform console:
//!
//! - `api`: the transport layer (`ApiClient`) and the typed endpoint functions
//! - `auth`: the session store, its shared context and durable client storage
//! - `stores`: client-side mirrors of server resources (pipelines, HPA policies)
//! - `router`: the route table and the authentication gate
//! - `config`: persisted configuration with environment overrides
//!
//! The session is an explicitly constructed `Arc<SessionContext>` shared by the
//! transport and the session store; nothing here is a global.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod notify;
pub mod router;
pub mod stores;

pub use api::{ApiClient, ApiError, ErrorKind};
pub use auth::{SessionContext, SessionError, SessionStatus, SessionStore};
pub use config::{ApiRevision, Config, Envelope};
pub use router::{Navigation, Navigator, RouteDecision, Router};

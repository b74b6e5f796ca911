//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionContext`: the shared credential/profile state, written through
//!   to durable storage
//! - `SessionStore`: login, logout, profile and password operations
//! - `DurableStorage`: file, keychain and in-memory persistence backends
//!
//! There is no client-side expiry: a session is valid until the server
//! answers 401.

pub mod context;
pub mod error;
pub mod session;
pub mod storage;

pub use context::{SessionContext, SessionStatus, TOKEN_KEY, USER_KEY};
pub use error::SessionError;
pub use session::SessionStore;
pub use storage::{DurableStorage, FileStorage, KeyringStorage, MemoryStorage, StorageError};

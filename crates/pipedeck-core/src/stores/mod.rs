//! Client-side mirrors of server resources.
//!
//! Each store keeps the last fetched listing plus a `loading` flag that is
//! set for the duration of an action and cleared on every exit path, and
//! records the user-facing message of the last failure.

pub mod hpa;
pub mod pipeline;

pub use hpa::{HpaState, HpaStore};
pub use pipeline::{PipelineState, PipelineStore};

use std::sync::{Mutex, MutexGuard, PoisonError};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Raises a store's `loading` flag and lowers it again when dropped.
pub(crate) struct LoadingGuard<'a, T> {
    state: &'a Mutex<T>,
    flag: fn(&mut T) -> &mut bool,
}

impl<'a, T> LoadingGuard<'a, T> {
    pub(crate) fn start(state: &'a Mutex<T>, flag: fn(&mut T) -> &mut bool) -> Self {
        *flag(&mut *lock(state)) = true;
        Self { state, flag }
    }
}

impl<T> Drop for LoadingGuard<'_, T> {
    fn drop(&mut self) {
        *(self.flag)(&mut *lock(self.state)) = false;
    }
}

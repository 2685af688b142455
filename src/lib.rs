//! Client library for the VM ordering portal.
//!
//! The portal backend answers every call with a `{status_code, message,
//! data}` envelope whose `data` is either absent, a single entity, or a full
//! collection. This crate gives that contract a typed surface: an
//! [`client::ApiClient`] covering the REST endpoints, a pure
//! [`reconcile::reconcile`] function that folds responses into locally held
//! entity lists, and a [`poller::StatusPoller`] that keeps individual
//! machines fresh on a fixed interval.

pub mod client;
pub mod config;
pub mod error;
pub mod poller;
pub mod reconcile;
pub mod session;
pub mod types;

pub use client::{ApiClient, VmAction};
pub use error::ApiError;
pub use poller::{StatusPoller, StatusSource};
pub use reconcile::{reconcile, ListResponse};
pub use session::Session;

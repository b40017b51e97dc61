#![warn(clippy::all, missing_docs)]

//! Core logic for the campus records console.
//!
//! This crate hosts the session store, the typed HTTP clients for the
//! school records backend, the notification bus, and the renderer-free
//! state behind every list, detail and form screen. The terminal UI
//! drives these types; any future frontend can do the same.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod notifications;
pub mod routes;
pub mod session;
pub mod views;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, Resource, ResourceClient};
pub use config::AppConfig;
pub use error::{ApiError, FormError};
pub use models::{Course, Entity, EntityId, EntityKind, Lecturer, Student, Subject};
pub use notifications::{ConfirmListener, ConfirmRequest, Notice, NoticeKind, NotificationBus, Toast};
pub use routes::{guard, Route};
pub use session::SessionStore;

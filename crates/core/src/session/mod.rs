//! Persistent login session.

mod store;

pub use store::SessionStore;

//! HTTP access to the school records backend.

/// Authenticated client and login.
pub mod client;
/// Per-collection CRUD clients and request bodies.
pub mod resource;

pub use client::ApiClient;
pub use resource::{
    CourseRequest, LecturerRequest, Resource, ResourceClient, StudentRequest, SubjectRequest,
};

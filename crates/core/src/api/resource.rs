use std::marker::PhantomData;

use chrono::NaiveDate;
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::{
    error::ApiError,
    models::{
        Course, CourseDetail, Entity, EntityId, Lecturer, LecturerDetail, Student, StudentDetail,
        Subject, SubjectDetail,
    },
};

use super::client::ApiClient;

/// An entity with a REST collection on the backend.
pub trait Resource: Entity {
    /// Shape returned by `GET /<collection>/<id>/`.
    type Detail: DeserializeOwned + Send + 'static;
    /// Body sent on create and update.
    type Request: Serialize + Send + Sync + 'static;
}

impl Resource for Student {
    type Detail = StudentDetail;
    type Request = StudentRequest;
}

impl Resource for Course {
    type Detail = CourseDetail;
    type Request = CourseRequest;
}

impl Resource for Lecturer {
    type Detail = LecturerDetail;
    type Request = LecturerRequest;
}

impl Resource for Subject {
    type Detail = SubjectDetail;
    type Request = SubjectRequest;
}

/// Create/update body for students.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRequest {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Must be unique across students.
    pub email: String,
    /// Birth date, sent as `YYYY-MM-DD`.
    pub date_of_birth: NaiveDate,
    /// Owning course id.
    pub course: EntityId,
    /// Subject ids; the backend rejects any outside `course`.
    pub subjects: Vec<EntityId>,
}

/// Create/update body for courses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseRequest {
    /// Course title.
    pub name: String,
    /// Optional summary, sent empty when blank.
    pub description: String,
}

/// Create/update body for lecturers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LecturerRequest {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Must be unique across lecturers.
    pub email: String,
}

/// Create/update body for subjects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectRequest {
    /// Subject title.
    pub name: String,
    /// Optional summary.
    pub description: String,
    /// Owning course id.
    pub course: EntityId,
    /// Teaching lecturer id.
    pub lecturer: EntityId,
    /// Student ids, all enrolled in `course`.
    pub students: Vec<EntityId>,
}

/// Stateless request builder for one collection. Every call is a single
/// round trip: no retries, no caching.
pub struct ResourceClient<R> {
    api: ApiClient,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for ResourceClient<R> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> ResourceClient<R> {
    pub(crate) fn new(api: ApiClient) -> Self {
        Self {
            api,
            _resource: PhantomData,
        }
    }

    fn collection_path() -> String {
        format!("{}/", R::KIND.segment())
    }

    fn item_path(id: EntityId) -> String {
        format!("{}/{id}/", R::KIND.segment())
    }

    /// `GET /<collection>/`.
    pub async fn list(&self) -> Result<Vec<R>, ApiError> {
        let items: Vec<R> = self.api.get_json(&Self::collection_path()).await?;
        info!(kind = R::KIND.label(), total = items.len(), "Fetched collection");
        Ok(items)
    }

    /// `GET /<collection>/<id>/`, returning the expanded detail shape.
    pub async fn get(&self, id: EntityId) -> Result<R::Detail, ApiError> {
        self.api.get_json(&Self::item_path(id)).await
    }

    /// `POST /<collection>/`.
    pub async fn create(&self, request: &R::Request) -> Result<R, ApiError> {
        let created: R = self
            .api
            .send_json(Method::POST, &Self::collection_path(), request)
            .await?;
        info!(kind = R::KIND.label(), id = created.id(), "Created record");
        Ok(created)
    }

    /// `PUT /<collection>/<id>/`.
    pub async fn update(&self, id: EntityId, request: &R::Request) -> Result<R, ApiError> {
        let updated: R = self
            .api
            .send_json(Method::PUT, &Self::item_path(id), request)
            .await?;
        info!(kind = R::KIND.label(), id, "Updated record");
        Ok(updated)
    }

    /// `DELETE /<collection>/<id>/`.
    pub async fn delete(&self, id: EntityId) -> Result<(), ApiError> {
        self.api.delete(&Self::item_path(id)).await?;
        info!(kind = R::KIND.label(), id, "Deleted record");
        Ok(())
    }
}

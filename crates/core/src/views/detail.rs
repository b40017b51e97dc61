use tracing::error;

use crate::{
    api::{Resource, ResourceClient},
    error::ApiError,
    models::{EntityId, EntityKind},
};

use super::LoadState;

/// One expanded record, fetched on activation.
#[derive(Debug, Clone)]
pub struct DetailView<D> {
    kind: EntityKind,
    id: EntityId,
    state: LoadState,
    detail: Option<D>,
}

impl<D> DetailView<D> {
    /// View for record `id` of `kind`, waiting for its fetch.
    pub fn new(kind: EntityKind, id: EntityId) -> Self {
        Self {
            kind,
            id,
            state: LoadState::Loading,
            detail: None,
        }
    }

    /// Collection of the record.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Identifier of the record.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Current fetch state.
    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// The record once loaded.
    pub fn detail(&self) -> Option<&D> {
        self.detail.as_ref()
    }

    /// Apply the outcome of the fetch.
    pub fn apply_loaded(&mut self, result: Result<D, ApiError>) {
        match result {
            Ok(detail) => {
                self.detail = Some(detail);
                self.state = LoadState::Ready;
            }
            Err(err) => {
                error!(kind = self.kind.label(), id = self.id, ?err, "Failed to load record");
                self.detail = None;
                self.state =
                    LoadState::Failed(err.user_message(&format!("Failed to load {}.", self.kind)));
            }
        }
    }
}

/// Fetch the expanded detail of record `id`.
pub async fn load_detail<R: Resource>(
    client: &ResourceClient<R>,
    id: EntityId,
) -> DetailView<R::Detail> {
    let mut view = DetailView::new(R::KIND, id);
    view.apply_loaded(client.get(id).await);
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{api::ApiClient, session::SessionStore, testing::MockBackend};
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn loads_expanded_lecturer() {
        let backend = MockBackend::start().await;
        backend.respond(
            "GET",
            "/lecturers/4/",
            200,
            json!({
                "id": 4,
                "first_name": "Ada",
                "last_name": "Lovelace",
                "email": "ada@example.com",
                "subjects": [{"id": 1, "name": "Analysis", "description": ""}],
                "courses": [{"id": 2, "name": "Mathematics"}]
            }),
        );
        let api = ApiClient::new(
            backend.base_url(),
            Duration::from_secs(5),
            SessionStore::in_memory(),
        )
        .unwrap();

        let view = load_detail(&api.lecturers(), 4).await;
        assert_eq!(view.state(), &LoadState::Ready);
        let detail = view.detail().unwrap();
        assert_eq!(detail.subjects[0].name, "Analysis");
        assert_eq!(detail.courses[0].name, "Mathematics");
    }

    #[tokio::test]
    async fn missing_record_fails_with_backend_detail() {
        let backend = MockBackend::start().await;
        let api = ApiClient::new(
            backend.base_url(),
            Duration::from_secs(5),
            SessionStore::in_memory(),
        )
        .unwrap();

        let view = load_detail(&api.courses(), 8).await;
        assert!(view.detail().is_none());
        assert_eq!(view.state(), &LoadState::Failed("Not found.".to_string()));
        assert_eq!(view.kind(), EntityKind::Course);
        assert_eq!(view.id(), 8);
    }
}

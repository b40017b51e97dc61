use tracing::{error, info, warn};

use crate::{
    api::{Resource, ResourceClient},
    error::ApiError,
    models::{Entity, EntityKind},
    notifications::NotificationBus,
};

use super::LoadState;

/// Client-side search, sort and pagination over one fetched collection.
///
/// Pages are 1-based. The page returns to 1 whenever the filtered set's
/// inputs change: a new search term or a (re)loaded collection.
#[derive(Debug, Clone)]
pub struct ListView<T> {
    state: LoadState,
    items: Vec<T>,
    search: String,
    page: usize,
    page_size: usize,
}

impl<T: Entity> ListView<T> {
    /// Empty view in the loading state.
    pub fn new(page_size: usize) -> Self {
        Self {
            state: LoadState::Loading,
            items: Vec::new(),
            search: String::new(),
            page: 1,
            page_size: page_size.max(1),
        }
    }

    /// Current fetch state.
    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Mark a fetch as started.
    pub fn begin_load(&mut self) {
        self.state = LoadState::Loading;
    }

    /// Apply the outcome of a fetch. Failures leave the list empty.
    pub fn apply_loaded(&mut self, result: Result<Vec<T>, ApiError>) {
        match result {
            Ok(mut items) => {
                items.sort_by_cached_key(|item| item.display_name().to_lowercase());
                info!(kind = T::KIND.label(), total = items.len(), "List ready");
                self.items = items;
                self.state = LoadState::Ready;
            }
            Err(err) => {
                error!(kind = T::KIND.label(), ?err, "Failed to load list");
                self.items.clear();
                self.state = LoadState::Failed(err.user_message(&format!(
                    "Failed to load {}.",
                    T::KIND.title().to_lowercase()
                )));
            }
        }
        self.page = 1;
    }

    /// Every fetched record, sorted by display name.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Active search term.
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Change the search term and go back to the first page.
    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
        self.page = 1;
    }

    /// Records matching the search term case-insensitively; all records when blank.
    pub fn filtered(&self) -> Vec<&T> {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return self.items.iter().collect();
        }
        self.items
            .iter()
            .filter(|item| {
                item.search_fields()
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Rows per page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Current 1-based page.
    pub fn page(&self) -> usize {
        self.page
    }

    /// Number of pages for the filtered set; at least 1.
    pub fn page_count(&self) -> usize {
        self.filtered().len().div_ceil(self.page_size).max(1)
    }

    /// Jump to `page`, clamped to the valid range.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.clamp(1, self.page_count());
    }

    /// Advance one page if possible.
    pub fn next_page(&mut self) {
        self.set_page(self.page + 1);
    }

    /// Go back one page if possible.
    pub fn prev_page(&mut self) {
        self.set_page(self.page.saturating_sub(1));
    }

    /// Filtered records on the current page.
    pub fn page_items(&self) -> Vec<&T> {
        let start = (self.page - 1) * self.page_size;
        self.filtered()
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .collect()
    }
}

/// Result of a confirm-then-delete action.
#[derive(Debug)]
pub enum DeleteOutcome<T> {
    /// The user answered no; nothing was sent.
    Cancelled,
    /// The record is gone; carries the re-fetched collection.
    Deleted(Result<Vec<T>, ApiError>),
    /// The backend refused or the request failed.
    Failed(ApiError),
}

/// Message shown when a delete fails without a backend explanation.
pub fn delete_fallback(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Student => "Failed to delete student. Please try again.",
        EntityKind::Course => "Failed to delete course. It may have enrolled students.",
        EntityKind::Lecturer => "Failed to delete lecturer. They may be assigned to subjects.",
        EntityKind::Subject => "Failed to delete subject. Please try again.",
    }
}

/// Ask for confirmation, delete `item`, report the outcome, then re-fetch.
pub async fn delete_with_confirmation<R: Resource>(
    bus: &NotificationBus,
    client: &ResourceClient<R>,
    item: &R,
) -> DeleteOutcome<R> {
    let kind = R::KIND;
    let question = format!(
        "Are you sure you want to delete this {kind} ({})?",
        item.display_name()
    );
    if !bus.confirm(question).await {
        info!(kind = kind.label(), id = item.id(), "Delete cancelled");
        return DeleteOutcome::Cancelled;
    }

    match client.delete(item.id()).await {
        Ok(()) => {
            bus.success(format!("{} deleted successfully", kind.name()));
            DeleteOutcome::Deleted(client.list().await)
        }
        Err(err) => {
            warn!(kind = kind.label(), id = item.id(), ?err, "Delete failed");
            if !err.is_unauthorized() {
                bus.error(err.user_message(delete_fallback(kind)));
            }
            DeleteOutcome::Failed(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::ApiClient,
        models::Course,
        notifications::NoticeKind,
        session::SessionStore,
        testing::MockBackend,
    };
    use proptest::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn course(id: i64, name: &str, description: &str) -> Course {
        Course {
            id,
            name: name.to_string(),
            description: description.to_string(),
        }
    }

    fn ready(items: Vec<Course>, page_size: usize) -> ListView<Course> {
        let mut view = ListView::new(page_size);
        view.apply_loaded(Ok(items));
        view
    }

    #[test]
    fn sorts_once_per_fetch_by_display_name() {
        let view = ready(
            vec![
                course(1, "physics", ""),
                course(2, "Art", ""),
                course(3, "Biology", ""),
            ],
            10,
        );
        let names: Vec<&str> = view.items().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Art", "Biology", "physics"]);
        assert_eq!(view.state(), &LoadState::Ready);
    }

    #[test]
    fn search_matches_description_case_insensitively_and_resets_page() {
        let mut view = ready(
            (1..=25)
                .map(|i| course(i, &format!("Course {i:02}"), "general"))
                .chain([course(99, "Zoology", "Animal SCIENCE")])
                .collect(),
            10,
        );
        view.set_page(3);
        assert_eq!(view.page(), 3);

        view.set_search("science");
        assert_eq!(view.page(), 1);
        let hits: Vec<i64> = view.filtered().iter().map(|c| c.id).collect();
        assert_eq!(hits, vec![99]);
        assert_eq!(view.page_count(), 1);
    }

    #[test]
    fn failed_fetch_leaves_list_empty() {
        let mut view = ready(vec![course(1, "A", "")], 10);
        view.begin_load();
        assert_eq!(view.state(), &LoadState::Loading);
        view.apply_loaded(Err(ApiError::Rejected {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            body: serde_json::Value::Null,
        }));
        assert!(view.items().is_empty());
        assert_eq!(
            view.state(),
            &LoadState::Failed("Failed to load courses.".to_string())
        );
    }

    #[test]
    fn reload_resets_page_and_paging_is_clamped() {
        let mut view = ready((1..=30).map(|i| course(i, &format!("C{i:02}"), "")).collect(), 10);
        view.set_page(99);
        assert_eq!(view.page(), 3);
        view.next_page();
        assert_eq!(view.page(), 3);
        view.apply_loaded(Ok((1..=30).map(|i| course(i, &format!("C{i:02}"), "")).collect()));
        assert_eq!(view.page(), 1);
        view.prev_page();
        assert_eq!(view.page(), 1);
    }

    fn arb_courses() -> impl Strategy<Value = Vec<Course>> {
        prop::collection::vec(("[a-zA-Z ]{0,12}", "[a-zA-Z ]{0,12}"), 0..40).prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(idx, (name, description))| course(idx as i64, &name, &description))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn filtered_is_subset_whose_members_match(items in arb_courses(), term in "[a-zA-Z]{0,3}") {
            let mut view = ready(items, 10);
            view.set_search(term.clone());
            let filtered = view.filtered();
            let needle = term.to_lowercase();

            if needle.is_empty() {
                prop_assert_eq!(filtered.len(), view.items().len());
            }
            for item in &filtered {
                prop_assert!(view.items().iter().any(|candidate| candidate.id == item.id));
                prop_assert!(item
                    .search_fields()
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle)));
            }
        }

        #[test]
        fn pages_concatenate_to_filtered(items in arb_courses(), page_size in 1usize..8, term in "[a-c]{0,1}") {
            let mut view = ready(items, page_size);
            view.set_search(term);
            let expected: Vec<i64> = view.filtered().iter().map(|c| c.id).collect();

            let mut collected = Vec::new();
            for page in 1..=view.page_count() {
                view.set_page(page);
                let window = view.page_items();
                prop_assert!(window.len() <= page_size);
                collected.extend(window.iter().map(|c| c.id));
            }
            prop_assert_eq!(collected, expected);
        }
    }

    async fn setup() -> (MockBackend, ApiClient) {
        let backend = MockBackend::start().await;
        backend.respond("DELETE", "/courses/1/", 204, serde_json::Value::Null);
        backend.respond("GET", "/courses/", 200, json!([]));
        let session = SessionStore::in_memory();
        session.set_token("t").unwrap();
        let api = ApiClient::new(backend.base_url(), Duration::from_secs(5), session).unwrap();
        (backend, api)
    }

    #[tokio::test]
    async fn declined_confirmation_never_deletes() {
        let (backend, api) = setup().await;
        let (bus, mut listener) = NotificationBus::new();
        let item = course(1, "Maths", "");

        let task = tokio::spawn({
            let bus = bus.clone();
            let client = api.courses();
            async move { delete_with_confirmation(&bus, &client, &item).await }
        });

        let request = listener.recv().await.unwrap();
        assert!(request.message().contains("Maths"));
        request.resolve(false);

        assert!(matches!(task.await.unwrap(), DeleteOutcome::Cancelled));
        assert!(listener.try_recv().is_none());
        assert_eq!(backend.count("DELETE", "/courses/1/"), 0);
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn accepted_confirmation_deletes_once_then_refetches() {
        let (backend, api) = setup().await;
        let (bus, mut listener) = NotificationBus::new();
        let mut notices = bus.subscribe();
        let item = course(1, "Maths", "");

        let task = tokio::spawn({
            let bus = bus.clone();
            let client = api.courses();
            async move { delete_with_confirmation(&bus, &client, &item).await }
        });
        listener.recv().await.unwrap().resolve(true);

        match task.await.unwrap() {
            DeleteOutcome::Deleted(Ok(items)) => assert!(items.is_empty()),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(listener.try_recv().is_none());
        let calls: Vec<(String, String)> = backend
            .requests()
            .into_iter()
            .map(|r| (r.method, r.path))
            .collect();
        assert_eq!(
            calls,
            vec![
                ("DELETE".to_string(), "/courses/1/".to_string()),
                ("GET".to_string(), "/courses/".to_string()),
            ]
        );
        let notice = notices.recv().await.unwrap();
        assert_eq!(notice.kind, NoticeKind::Success);
        assert_eq!(notice.text, "Course deleted successfully");
    }

    #[tokio::test]
    async fn refused_delete_reports_backend_detail() {
        let (backend, api) = setup().await;
        backend.respond(
            "DELETE",
            "/courses/1/",
            400,
            json!({"detail": "Cannot delete course while students exist. Remove/reassign students first."}),
        );
        let (bus, mut listener) = NotificationBus::new();
        let mut notices = bus.subscribe();
        let item = course(1, "Maths", "");

        let task = tokio::spawn({
            let bus = bus.clone();
            let client = api.courses();
            async move { delete_with_confirmation(&bus, &client, &item).await }
        });
        listener.recv().await.unwrap().resolve(true);

        assert!(matches!(task.await.unwrap(), DeleteOutcome::Failed(_)));
        let notice = notices.recv().await.unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert!(notice.text.starts_with("Cannot delete course"));
        assert_eq!(backend.count("GET", "/courses/"), 0);
    }

    #[tokio::test]
    async fn rapid_overlapping_deletes_each_get_their_own_confirmation() {
        let (backend, api) = setup().await;
        backend.respond("DELETE", "/courses/2/", 204, serde_json::Value::Null);
        let (bus, mut listener) = NotificationBus::new();

        let spawn_delete = |item: Course| {
            let bus = bus.clone();
            let client = api.courses();
            tokio::spawn(async move { delete_with_confirmation(&bus, &client, &item).await })
        };
        let first = spawn_delete(course(1, "Maths", ""));
        let first_request = listener.recv().await.unwrap();
        let second = spawn_delete(course(2, "Physics", ""));
        let second_request = listener.recv().await.unwrap();

        assert!(first_request.message().contains("Maths"));
        assert!(second_request.message().contains("Physics"));

        // Answer in reverse order: neither request overwrites the other.
        second_request.resolve(true);
        first_request.resolve(false);

        assert!(matches!(first.await.unwrap(), DeleteOutcome::Cancelled));
        assert!(matches!(second.await.unwrap(), DeleteOutcome::Deleted(_)));
        assert_eq!(backend.count("DELETE", "/courses/1/"), 0);
        assert_eq!(backend.count("DELETE", "/courses/2/"), 1);
    }
}

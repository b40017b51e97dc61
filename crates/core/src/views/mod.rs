//! Screen state for lists, details and forms, independent of any renderer.

/// Single-record view with its relations expanded.
pub mod detail;
pub mod form;
/// Generation tickets that let a closed view ignore late responses.
pub mod lifecycle;
/// Sorted, searchable, paged collections and the delete flow.
pub mod list;
/// Course-scoped multi-select used by the student and subject forms.
pub mod relation;

pub use detail::{load_detail, DetailView};
pub use form::{
    cycle_option, save_fallback, submit_form, CourseForm, EntityForm, FormMode, LecturerForm,
    LoginForm, StudentForm, SubjectForm, SubmitGate, TextField, LOGIN_FALLBACK,
};
pub use lifecycle::{ViewLifecycle, ViewTicket};
pub use list::{delete_fallback, delete_with_confirmation, DeleteOutcome, ListView};
pub use relation::RelationPicker;

/// Fetch state shared by list and detail views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Request in flight.
    Loading,
    /// Data applied.
    Ready,
    /// The fetch failed; carries the message to show.
    Failed(String),
}

//! Create/edit forms and their submission.
//!
//! Forms only hold transient input. Requests are typed DTOs assembled field
//! by field in `build_request`, after presence and format checks.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info};

use crate::{
    api::{CourseRequest, LecturerRequest, Resource, ResourceClient, StudentRequest, SubjectRequest},
    error::{ApiError, FormError},
    models::{
        Course, CourseDetail, EntityId, EntityKind, Lecturer, LecturerDetail, Student,
        StudentDetail, Subject, SubjectDetail,
    },
    notifications::NotificationBus,
};

use super::relation::RelationPicker;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles")
});

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Whether a form creates a record or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    /// Nothing to pre-fetch; submit creates.
    New,
    /// Pre-fill from the record with this id; submit updates it.
    Edit(EntityId),
}

impl FormMode {
    /// Identifier being edited.
    pub fn id(self) -> Option<EntityId> {
        match self {
            FormMode::New => None,
            FormMode::Edit(id) => Some(id),
        }
    }

    /// True when editing an existing record.
    pub fn is_edit(self) -> bool {
        matches!(self, FormMode::Edit(_))
    }
}

/// Single-line text input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextField {
    /// Caption, also used in validation messages.
    pub label: &'static str,
    /// Current input.
    pub value: String,
    /// Render the value masked.
    pub secret: bool,
}

impl TextField {
    /// Empty visible field.
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            value: String::new(),
            secret: false,
        }
    }

    /// Empty field rendered masked, for passwords.
    pub fn secret(label: &'static str) -> Self {
        Self {
            secret: true,
            ..Self::new(label)
        }
    }

    /// Append a typed character.
    pub fn push(&mut self, ch: char) {
        self.value.push(ch);
    }

    /// Remove the last character.
    pub fn pop(&mut self) {
        self.value.pop();
    }

    /// Replace the whole value, e.g. when pre-filling from a fetched record.
    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// Trimmed value, or `Missing` when blank.
    pub fn required(&self) -> Result<String, FormError> {
        let value = self.value.trim();
        if value.is_empty() {
            return Err(FormError::Missing(self.label));
        }
        Ok(value.to_string())
    }

    /// Trimmed value; blank is allowed.
    pub fn optional(&self) -> String {
        self.value.trim().to_string()
    }

    fn email(&self) -> Result<String, FormError> {
        let value = self.required()?;
        if !EMAIL.is_match(&value) {
            return Err(FormError::InvalidEmail);
        }
        Ok(value)
    }

    fn date(&self) -> Result<NaiveDate, FormError> {
        let value = self.required()?;
        NaiveDate::parse_from_str(&value, DATE_FORMAT).map_err(|_| FormError::InvalidDate(self.label))
    }
}

/// Shared surface the console drives every form through.
pub trait EntityForm {
    /// Collection the form writes to.
    type Target: Resource;

    /// Create or edit.
    fn mode(&self) -> FormMode;

    /// Text inputs in tab order.
    fn text_fields(&self) -> Vec<&TextField>;

    /// Same fields as `text_fields`, for key input.
    fn text_fields_mut(&mut self) -> Vec<&mut TextField>;

    /// Validate the inputs and assemble the request body.
    fn build_request(&self) -> Result<<Self::Target as Resource>::Request, FormError>;
}

/// Prevents a second submission while one is in flight.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmitGate {
    in_flight: bool,
}

impl SubmitGate {
    /// Mark a submission as started.
    ///
    /// Fails with [`FormError::Busy`] if one is already running.
    pub fn begin(&mut self) -> Result<(), FormError> {
        if self.in_flight {
            return Err(FormError::Busy);
        }
        self.in_flight = true;
        Ok(())
    }

    /// Release the gate once the response has arrived.
    pub fn finish(&mut self) {
        self.in_flight = false;
    }

    /// Whether a submission is running.
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }
}

/// Step through `options` from `current`, wrapping at both ends.
pub fn cycle_option(
    options: &[EntityId],
    current: Option<EntityId>,
    forward: bool,
) -> Option<EntityId> {
    if options.is_empty() {
        return None;
    }
    let last = options.len() - 1;
    let index = match current.and_then(|id| options.iter().position(|option| *option == id)) {
        None if forward => 0,
        None => last,
        Some(index) if forward => (index + 1) % options.len(),
        Some(0) => last,
        Some(index) => index - 1,
    };
    Some(options[index])
}

/// Student form: personal fields, owning course and subjects within it.
#[derive(Debug, Clone)]
pub struct StudentForm {
    mode: FormMode,
    /// Given name.
    pub first_name: TextField,
    /// Family name.
    pub last_name: TextField,
    /// Validated as an address.
    pub email: TextField,
    /// `YYYY-MM-DD`.
    pub date_of_birth: TextField,
    courses: Vec<Course>,
    course: Option<EntityId>,
    /// Subject candidates filtered by the selected course.
    pub subjects: RelationPicker<Subject>,
}

impl StudentForm {
    /// Blank form; relation candidates arrive separately.
    pub fn new(mode: FormMode) -> Self {
        Self {
            mode,
            first_name: TextField::new("First name"),
            last_name: TextField::new("Last name"),
            email: TextField::new("Email"),
            date_of_birth: TextField::new("Date of birth"),
            courses: Vec::new(),
            course: None,
            subjects: RelationPicker::new(),
        }
    }

    /// Courses offered by the course selector.
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    /// Install the fetched course list.
    pub fn set_courses(&mut self, courses: Vec<Course>) {
        self.courses = courses;
    }

    /// Selected course.
    pub fn course(&self) -> Option<EntityId> {
        self.course
    }

    /// Change the owning course, pruning subjects outside it.
    pub fn select_course(&mut self, course: Option<EntityId>) {
        self.course = course;
        self.subjects.select_course(course);
    }

    /// Step the course selector, pruning the subject selection.
    pub fn cycle_course(&mut self, forward: bool) {
        let options: Vec<EntityId> = self.courses.iter().map(|course| course.id).collect();
        self.select_course(cycle_option(&options, self.course, forward));
    }

    /// Populate from the record being edited.
    pub fn apply_detail(&mut self, detail: &StudentDetail) {
        self.first_name.set(detail.first_name.as_str());
        self.last_name.set(detail.last_name.as_str());
        self.email.set(detail.email.as_str());
        self.date_of_birth
            .set(detail.date_of_birth.format(DATE_FORMAT).to_string());
        self.course = Some(detail.course.id);
        self.subjects.seed(
            self.course,
            detail.subjects.iter().map(|subject| subject.id),
        );
    }
}

impl EntityForm for StudentForm {
    type Target = Student;

    fn mode(&self) -> FormMode {
        self.mode
    }

    fn text_fields(&self) -> Vec<&TextField> {
        vec![&self.first_name, &self.last_name, &self.email, &self.date_of_birth]
    }

    fn text_fields_mut(&mut self) -> Vec<&mut TextField> {
        vec![
            &mut self.first_name,
            &mut self.last_name,
            &mut self.email,
            &mut self.date_of_birth,
        ]
    }

    fn build_request(&self) -> Result<StudentRequest, FormError> {
        Ok(StudentRequest {
            first_name: self.first_name.required()?,
            last_name: self.last_name.required()?,
            email: self.email.email()?,
            date_of_birth: self.date_of_birth.date()?,
            course: self.course.ok_or(FormError::Missing("Course"))?,
            subjects: self.subjects.selected().to_vec(),
        })
    }
}

/// Subject form: owning course and lecturer, plus students within the course.
#[derive(Debug, Clone)]
pub struct SubjectForm {
    mode: FormMode,
    /// Subject title.
    pub name: TextField,
    /// Optional.
    pub description: TextField,
    courses: Vec<Course>,
    lecturers: Vec<Lecturer>,
    course: Option<EntityId>,
    lecturer: Option<EntityId>,
    /// Student candidates filtered by the selected course.
    pub students: RelationPicker<Student>,
}

impl SubjectForm {
    /// Blank form; relation candidates arrive separately.
    pub fn new(mode: FormMode) -> Self {
        Self {
            mode,
            name: TextField::new("Name"),
            description: TextField::new("Description"),
            courses: Vec::new(),
            lecturers: Vec::new(),
            course: None,
            lecturer: None,
            students: RelationPicker::new(),
        }
    }

    /// Courses offered by the course selector.
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    /// Install the fetched course list.
    pub fn set_courses(&mut self, courses: Vec<Course>) {
        self.courses = courses;
    }

    /// Lecturers offered by the lecturer selector.
    pub fn lecturers(&self) -> &[Lecturer] {
        &self.lecturers
    }

    /// Install the fetched lecturer list.
    pub fn set_lecturers(&mut self, lecturers: Vec<Lecturer>) {
        self.lecturers = lecturers;
    }

    /// Selected course.
    pub fn course(&self) -> Option<EntityId> {
        self.course
    }

    /// Selected lecturer.
    pub fn lecturer(&self) -> Option<EntityId> {
        self.lecturer
    }

    /// Change the owning course, pruning students outside it.
    pub fn select_course(&mut self, course: Option<EntityId>) {
        self.course = course;
        self.students.select_course(course);
    }

    /// Step the course selector, pruning the student selection.
    pub fn cycle_course(&mut self, forward: bool) {
        let options: Vec<EntityId> = self.courses.iter().map(|course| course.id).collect();
        self.select_course(cycle_option(&options, self.course, forward));
    }

    /// Pick a lecturer. Has no effect on the student picker.
    pub fn select_lecturer(&mut self, lecturer: Option<EntityId>) {
        self.lecturer = lecturer;
    }

    /// Step the lecturer selector.
    pub fn cycle_lecturer(&mut self, forward: bool) {
        let options: Vec<EntityId> = self.lecturers.iter().map(|lecturer| lecturer.id).collect();
        self.lecturer = cycle_option(&options, self.lecturer, forward);
    }

    /// Populate from the record being edited.
    pub fn apply_detail(&mut self, detail: &SubjectDetail) {
        self.name.set(detail.name.as_str());
        self.description.set(detail.description.as_str());
        self.lecturer = Some(detail.lecturer.id);
        self.course = Some(detail.course.id);
        self.students.seed(
            self.course,
            detail.students.iter().map(|student| student.id),
        );
    }
}

impl EntityForm for SubjectForm {
    type Target = Subject;

    fn mode(&self) -> FormMode {
        self.mode
    }

    fn text_fields(&self) -> Vec<&TextField> {
        vec![&self.name, &self.description]
    }

    fn text_fields_mut(&mut self) -> Vec<&mut TextField> {
        vec![&mut self.name, &mut self.description]
    }

    fn build_request(&self) -> Result<SubjectRequest, FormError> {
        Ok(SubjectRequest {
            name: self.name.required()?,
            description: self.description.optional(),
            course: self.course.ok_or(FormError::Missing("Course"))?,
            lecturer: self.lecturer.ok_or(FormError::Missing("Lecturer"))?,
            students: self.students.selected().to_vec(),
        })
    }
}

/// Course form: name and description only.
#[derive(Debug, Clone)]
pub struct CourseForm {
    mode: FormMode,
    /// Course title.
    pub name: TextField,
    /// Optional.
    pub description: TextField,
}

impl CourseForm {
    /// Blank form.
    pub fn new(mode: FormMode) -> Self {
        Self {
            mode,
            name: TextField::new("Name"),
            description: TextField::new("Description"),
        }
    }

    /// Pre-fill from a fetched course.
    pub fn apply_detail(&mut self, detail: &CourseDetail) {
        self.name.set(detail.name.as_str());
        self.description.set(detail.description.as_str());
    }
}

impl EntityForm for CourseForm {
    type Target = Course;

    fn mode(&self) -> FormMode {
        self.mode
    }

    fn text_fields(&self) -> Vec<&TextField> {
        vec![&self.name, &self.description]
    }

    fn text_fields_mut(&mut self) -> Vec<&mut TextField> {
        vec![&mut self.name, &mut self.description]
    }

    fn build_request(&self) -> Result<CourseRequest, FormError> {
        Ok(CourseRequest {
            name: self.name.required()?,
            description: self.description.optional(),
        })
    }
}

/// Lecturer form.
#[derive(Debug, Clone)]
pub struct LecturerForm {
    mode: FormMode,
    /// Given name.
    pub first_name: TextField,
    /// Family name.
    pub last_name: TextField,
    /// Validated as an address.
    pub email: TextField,
}

impl LecturerForm {
    /// Blank form.
    pub fn new(mode: FormMode) -> Self {
        Self {
            mode,
            first_name: TextField::new("First name"),
            last_name: TextField::new("Last name"),
            email: TextField::new("Email"),
        }
    }

    /// Pre-fill from a fetched lecturer.
    pub fn apply_detail(&mut self, detail: &LecturerDetail) {
        self.first_name.set(detail.first_name.as_str());
        self.last_name.set(detail.last_name.as_str());
        self.email.set(detail.email.as_str());
    }
}

impl EntityForm for LecturerForm {
    type Target = Lecturer;

    fn mode(&self) -> FormMode {
        self.mode
    }

    fn text_fields(&self) -> Vec<&TextField> {
        vec![&self.first_name, &self.last_name, &self.email]
    }

    fn text_fields_mut(&mut self) -> Vec<&mut TextField> {
        vec![&mut self.first_name, &mut self.last_name, &mut self.email]
    }

    fn build_request(&self) -> Result<LecturerRequest, FormError> {
        Ok(LecturerRequest {
            first_name: self.first_name.required()?,
            last_name: self.last_name.required()?,
            email: self.email.email()?,
        })
    }
}

/// Message shown when login fails without a backend explanation.
pub const LOGIN_FALLBACK: &str = "Invalid credentials. Please try again.";

/// Credential entry.
#[derive(Debug, Clone)]
pub struct LoginForm {
    /// Validated as an address.
    pub email: TextField,
    /// Masked.
    pub password: TextField,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            email: TextField::new("Email"),
            password: TextField::secret("Password"),
        }
    }
}

impl LoginForm {
    /// Email then password.
    pub fn text_fields(&self) -> Vec<&TextField> {
        vec![&self.email, &self.password]
    }

    /// Mutable access for key input.
    pub fn text_fields_mut(&mut self) -> Vec<&mut TextField> {
        vec![&mut self.email, &mut self.password]
    }

    /// Email and password, checked for presence and email format.
    /// The password is sent exactly as typed.
    pub fn credentials(&self) -> Result<(String, String), FormError> {
        let email = self.email.email()?;
        if self.password.value.is_empty() {
            return Err(FormError::Missing(self.password.label));
        }
        Ok((email, self.password.value.clone()))
    }
}

/// Message shown when a save fails without a backend explanation.
pub fn save_fallback(kind: EntityKind) -> String {
    format!("Failed to save {kind}. Please try again.")
}

/// Send a create or update depending on `mode` and report the outcome.
///
/// On failure the backend detail (or the fallback) is published and the
/// caller keeps its form populated for a retry. A 401 is not reported here;
/// the session is already cleared and the route guard takes over.
pub async fn submit_form<R: Resource>(
    bus: &NotificationBus,
    client: &ResourceClient<R>,
    mode: FormMode,
    request: &R::Request,
) -> Result<R, ApiError> {
    let kind = R::KIND;
    let result = match mode {
        FormMode::New => client.create(request).await,
        FormMode::Edit(id) => client.update(id, request).await,
    };

    match &result {
        Ok(record) => {
            let verb = if mode.is_edit() { "updated" } else { "created" };
            info!(kind = kind.label(), id = record.id(), verb, "Form saved");
            bus.success(format!("{} {verb} successfully", kind.name()));
        }
        Err(err) => {
            error!(kind = kind.label(), ?err, "Failed to save");
            if !err.is_unauthorized() {
                bus.error(err.user_message(&save_fallback(kind)));
            }
        }
    }
    result
}

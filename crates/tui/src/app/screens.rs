use campus_core::{
    models::{
        Course, CourseDetail, Entity, EntityId, EntityKind, Lecturer, LecturerDetail, Student,
        StudentDetail, Subject, SubjectDetail,
    },
    views::{
        CourseForm, DetailView, EntityForm, FormMode, LecturerForm, ListView, LoginForm,
        StudentForm, SubjectForm, SubmitGate, TextField,
    },
    Resource,
};

/// What the main area is currently showing.
pub(super) enum Screen {
    Login(LoginScreen),
    List(ListPane),
    Detail(DetailPane),
    Form(FormPane),
}

#[derive(Default)]
pub(super) struct LoginScreen {
    pub form: LoginForm,
    pub focus: usize,
    pub error: Option<String>,
    pub busy: bool,
}

pub(super) enum EntityList {
    Students(ListView<Student>),
    Courses(ListView<Course>),
    Lecturers(ListView<Lecturer>),
    Subjects(ListView<Subject>),
}

/// Run `$body` against whichever typed list view is active.
macro_rules! each_list {
    ($list:expr, $view:ident => $body:expr) => {
        match $list {
            EntityList::Students($view) => $body,
            EntityList::Courses($view) => $body,
            EntityList::Lecturers($view) => $body,
            EntityList::Subjects($view) => $body,
        }
    };
}
pub(super) use each_list;

impl EntityList {
    pub fn new(kind: EntityKind, page_size: usize) -> Self {
        match kind {
            EntityKind::Student => EntityList::Students(ListView::new(page_size)),
            EntityKind::Course => EntityList::Courses(ListView::new(page_size)),
            EntityKind::Lecturer => EntityList::Lecturers(ListView::new(page_size)),
            EntityKind::Subject => EntityList::Subjects(ListView::new(page_size)),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityList::Students(_) => EntityKind::Student,
            EntityList::Courses(_) => EntityKind::Course,
            EntityList::Lecturers(_) => EntityKind::Lecturer,
            EntityList::Subjects(_) => EntityKind::Subject,
        }
    }
}

/// Maps a record type to its slot in [`EntityList`].
pub(super) trait Listed: Resource {
    fn view_mut(list: &mut EntityList) -> Option<&mut ListView<Self>>;
}

impl Listed for Student {
    fn view_mut(list: &mut EntityList) -> Option<&mut ListView<Self>> {
        match list {
            EntityList::Students(view) => Some(view),
            _ => None,
        }
    }
}

impl Listed for Course {
    fn view_mut(list: &mut EntityList) -> Option<&mut ListView<Self>> {
        match list {
            EntityList::Courses(view) => Some(view),
            _ => None,
        }
    }
}

impl Listed for Lecturer {
    fn view_mut(list: &mut EntityList) -> Option<&mut ListView<Self>> {
        match list {
            EntityList::Lecturers(view) => Some(view),
            _ => None,
        }
    }
}

impl Listed for Subject {
    fn view_mut(list: &mut EntityList) -> Option<&mut ListView<Self>> {
        match list {
            EntityList::Subjects(view) => Some(view),
            _ => None,
        }
    }
}

/// A list screen: the typed view plus the row cursor within the page.
pub(super) struct ListPane {
    pub list: EntityList,
    pub cursor: usize,
    pub searching: bool,
}

impl ListPane {
    pub fn new(kind: EntityKind, page_size: usize) -> Self {
        Self {
            list: EntityList::new(kind, page_size),
            cursor: 0,
            searching: false,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.list.kind()
    }

    pub fn page_len(&self) -> usize {
        each_list!(&self.list, view => view.page_items().len())
    }

    pub fn clamp_cursor(&mut self) {
        let len = self.page_len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.page_len() as isize;
        if len == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = (self.cursor as isize + delta).clamp(0, len - 1) as usize;
    }

    pub fn selected_id(&self) -> Option<EntityId> {
        each_list!(&self.list, view => view.page_items().get(self.cursor).map(|item| item.id()))
    }
}

/// Typed record under the cursor, if the pane holds `R`.
pub(super) fn selected_record<R: Listed>(pane: &mut ListPane) -> Option<R> {
    let cursor = pane.cursor;
    R::view_mut(&mut pane.list)?
        .page_items()
        .get(cursor)
        .map(|item| (*item).clone())
}

pub(super) enum DetailPane {
    Student(DetailView<StudentDetail>),
    Course(DetailView<CourseDetail>),
    Lecturer(DetailView<LecturerDetail>),
    Subject(DetailView<SubjectDetail>),
}

impl DetailPane {
    pub fn new(kind: EntityKind, id: EntityId) -> Self {
        match kind {
            EntityKind::Student => DetailPane::Student(DetailView::new(kind, id)),
            EntityKind::Course => DetailPane::Course(DetailView::new(kind, id)),
            EntityKind::Lecturer => DetailPane::Lecturer(DetailView::new(kind, id)),
            EntityKind::Subject => DetailPane::Subject(DetailView::new(kind, id)),
        }
    }

    pub fn kind_and_id(&self) -> (EntityKind, EntityId) {
        match self {
            DetailPane::Student(view) => (view.kind(), view.id()),
            DetailPane::Course(view) => (view.kind(), view.id()),
            DetailPane::Lecturer(view) => (view.kind(), view.id()),
            DetailPane::Subject(view) => (view.kind(), view.id()),
        }
    }
}

pub(super) enum EntityFormKind {
    Student(StudentForm),
    Course(CourseForm),
    Lecturer(LecturerForm),
    Subject(SubjectForm),
}

/// Focusable parts of a form, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum FormSlot {
    Text(usize),
    Course,
    Lecturer,
    Picker,
}

pub(super) struct FormPane {
    pub form: EntityFormKind,
    pub focus: usize,
    pub picker_cursor: usize,
    pub gate: SubmitGate,
}

impl FormPane {
    pub fn new(kind: EntityKind, mode: FormMode) -> Self {
        let form = match kind {
            EntityKind::Student => EntityFormKind::Student(StudentForm::new(mode)),
            EntityKind::Course => EntityFormKind::Course(CourseForm::new(mode)),
            EntityKind::Lecturer => EntityFormKind::Lecturer(LecturerForm::new(mode)),
            EntityKind::Subject => EntityFormKind::Subject(SubjectForm::new(mode)),
        };
        Self {
            form,
            focus: 0,
            picker_cursor: 0,
            gate: SubmitGate::default(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self.form {
            EntityFormKind::Student(_) => EntityKind::Student,
            EntityFormKind::Course(_) => EntityKind::Course,
            EntityFormKind::Lecturer(_) => EntityKind::Lecturer,
            EntityFormKind::Subject(_) => EntityKind::Subject,
        }
    }

    pub fn mode(&self) -> FormMode {
        match &self.form {
            EntityFormKind::Student(form) => form.mode(),
            EntityFormKind::Course(form) => form.mode(),
            EntityFormKind::Lecturer(form) => form.mode(),
            EntityFormKind::Subject(form) => form.mode(),
        }
    }

    pub fn slots(&self) -> Vec<FormSlot> {
        let text = self.text_fields().len();
        let mut slots: Vec<FormSlot> = (0..text).map(FormSlot::Text).collect();
        match self.form {
            EntityFormKind::Student(_) => slots.extend([FormSlot::Course, FormSlot::Picker]),
            EntityFormKind::Subject(_) => {
                slots.extend([FormSlot::Course, FormSlot::Lecturer, FormSlot::Picker])
            }
            EntityFormKind::Course(_) | EntityFormKind::Lecturer(_) => {}
        }
        slots
    }

    pub fn focused(&self) -> FormSlot {
        let slots = self.slots();
        slots
            .get(self.focus.min(slots.len().saturating_sub(1)))
            .copied()
            .unwrap_or(FormSlot::Text(0))
    }

    pub fn cycle_focus(&mut self, forward: bool) {
        let len = self.slots().len().max(1);
        self.focus = if forward {
            (self.focus + 1) % len
        } else {
            (self.focus + len - 1) % len
        };
    }

    pub fn text_fields(&self) -> Vec<&TextField> {
        match &self.form {
            EntityFormKind::Student(form) => form.text_fields(),
            EntityFormKind::Course(form) => form.text_fields(),
            EntityFormKind::Lecturer(form) => form.text_fields(),
            EntityFormKind::Subject(form) => form.text_fields(),
        }
    }

    pub fn text_field_mut(&mut self, index: usize) -> Option<&mut TextField> {
        let fields = match &mut self.form {
            EntityFormKind::Student(form) => form.text_fields_mut(),
            EntityFormKind::Course(form) => form.text_fields_mut(),
            EntityFormKind::Lecturer(form) => form.text_fields_mut(),
            EntityFormKind::Subject(form) => form.text_fields_mut(),
        };
        fields.into_iter().nth(index)
    }

    /// Identifiers shown in the relation picker, in display order.
    pub fn picker_ids(&self) -> Vec<EntityId> {
        match &self.form {
            EntityFormKind::Student(form) => {
                form.subjects.filtered().iter().map(|subject| subject.id).collect()
            }
            EntityFormKind::Subject(form) => {
                form.students.filtered().iter().map(|student| student.id).collect()
            }
            EntityFormKind::Course(_) | EntityFormKind::Lecturer(_) => Vec::new(),
        }
    }

    pub fn move_picker(&mut self, delta: isize) {
        let len = self.picker_ids().len() as isize;
        if len == 0 {
            self.picker_cursor = 0;
            return;
        }
        self.picker_cursor = (self.picker_cursor as isize + delta).clamp(0, len - 1) as usize;
    }

    pub fn toggle_picker(&mut self) {
        let Some(id) = self.picker_ids().get(self.picker_cursor).copied() else {
            return;
        };
        match &mut self.form {
            EntityFormKind::Student(form) => form.subjects.toggle(id),
            EntityFormKind::Subject(form) => form.students.toggle(id),
            EntityFormKind::Course(_) | EntityFormKind::Lecturer(_) => {}
        }
    }

    pub fn cycle_course(&mut self, forward: bool) {
        match &mut self.form {
            EntityFormKind::Student(form) => form.cycle_course(forward),
            EntityFormKind::Subject(form) => form.cycle_course(forward),
            EntityFormKind::Course(_) | EntityFormKind::Lecturer(_) => {}
        }
        self.picker_cursor = 0;
    }

    pub fn cycle_lecturer(&mut self, forward: bool) {
        if let EntityFormKind::Subject(form) = &mut self.form {
            form.cycle_lecturer(forward);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn subject(id: EntityId, course: EntityId) -> Subject {
        Subject {
            id,
            name: format!("Subject {id}"),
            description: String::new(),
            course,
            lecturer: 1,
            students: Vec::new(),
        }
    }

    #[test]
    fn student_form_tab_order_ends_with_picker() {
        let mut pane = FormPane::new(EntityKind::Student, FormMode::New);
        assert_eq!(pane.slots().len(), 6);
        assert_eq!(pane.focused(), FormSlot::Text(0));
        pane.cycle_focus(false);
        assert_eq!(pane.focused(), FormSlot::Picker);
        pane.cycle_focus(true);
        assert_eq!(pane.focused(), FormSlot::Text(0));
    }

    #[test]
    fn picker_toggles_only_visible_candidates() {
        let mut pane = FormPane::new(EntityKind::Student, FormMode::New);
        let EntityFormKind::Student(form) = &mut pane.form else {
            unreachable!();
        };
        form.set_courses(vec![Course {
            id: 1,
            name: "Maths".to_string(),
            description: String::new(),
        }]);
        form.subjects
            .set_candidates(vec![subject(10, 1), subject(11, 2), subject(12, 1)]);

        pane.cycle_course(true);
        assert_eq!(pane.picker_ids(), vec![10, 12]);
        pane.move_picker(5);
        pane.toggle_picker();

        let EntityFormKind::Student(form) = &pane.form else {
            unreachable!();
        };
        assert_eq!(form.subjects.selected(), &[12]);
    }

    #[test]
    fn list_cursor_stays_within_page() {
        let mut pane = ListPane::new(EntityKind::Student, 2);
        if let EntityList::Students(view) = &mut pane.list {
            view.apply_loaded(Ok((1..=3)
                .map(|id| Student {
                    id,
                    first_name: format!("S{id}"),
                    last_name: "Test".to_string(),
                    email: format!("s{id}@example.com"),
                    date_of_birth: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
                    course: 1,
                    subjects: Vec::new(),
                })
                .collect()));
        }
        pane.move_cursor(10);
        assert_eq!(pane.cursor, 1);
        assert_eq!(pane.selected_id(), Some(2));

        each_list!(&mut pane.list, view => view.next_page());
        pane.clamp_cursor();
        assert_eq!(pane.cursor, 0);
        assert_eq!(pane.selected_id(), Some(3));
        assert!(selected_record::<Course>(&mut pane).is_none());
        assert_eq!(selected_record::<Student>(&mut pane).map(|s| s.id), Some(3));
    }
}

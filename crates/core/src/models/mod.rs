//! Shared domain models, mirroring what the school records API serializes.
//!
//! Each entity has a summary shape (returned by list/create/update) and a
//! detail shape (returned by a single GET) with its relations expanded.

use std::fmt;

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Backend primary key.
pub type EntityId = i64;

/// The four record types managed by the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Enrolled students.
    Student,
    /// Courses; every student and subject belongs to exactly one.
    Course,
    /// Teaching staff.
    Lecturer,
    /// Subjects taught within a course.
    Subject,
}

impl EntityKind {
    /// Every kind in navigation order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Student,
        EntityKind::Course,
        EntityKind::Lecturer,
        EntityKind::Subject,
    ];

    /// Collection segment used both in API URLs and console routes.
    pub fn segment(self) -> &'static str {
        match self {
            EntityKind::Student => "students",
            EntityKind::Course => "courses",
            EntityKind::Lecturer => "lecturers",
            EntityKind::Subject => "subjects",
        }
    }

    /// Parse a collection segment back into a kind.
    pub fn from_segment(segment: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.segment() == segment)
    }

    /// Singular, lower-case label for messages.
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Student => "student",
            EntityKind::Course => "course",
            EntityKind::Lecturer => "lecturer",
            EntityKind::Subject => "subject",
        }
    }

    /// Capitalised singular for headings and success messages.
    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Student => "Student",
            EntityKind::Course => "Course",
            EntityKind::Lecturer => "Lecturer",
            EntityKind::Subject => "Subject",
        }
    }

    /// Capitalised plural used for screen titles.
    pub fn title(self) -> &'static str {
        match self {
            EntityKind::Student => "Students",
            EntityKind::Course => "Courses",
            EntityKind::Lecturer => "Lecturers",
            EntityKind::Subject => "Subjects",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Behaviour shared by every record shown in a list.
pub trait Entity: DeserializeOwned + Clone + Send + Sync + 'static {
    /// Which collection the record belongs to.
    const KIND: EntityKind;

    /// Backend identifier.
    fn id(&self) -> EntityId;

    /// Label used for sorting and headings.
    fn display_name(&self) -> String;

    /// Fields matched by the list search box.
    fn search_fields(&self) -> Vec<String>;

    /// Cells rendered in a list row, in column order.
    fn columns(&self) -> Vec<String>;
}

/// Records that are partitioned by their owning course.
pub trait CourseMember {
    /// Identifier of this record.
    fn member_id(&self) -> EntityId;

    /// Identifier of the owning course.
    fn course_id(&self) -> EntityId;
}

/// Course as returned by list/create/update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// Backend primary key.
    pub id: EntityId,
    /// Course title, e.g. `Computer Science`.
    pub name: String,
    /// Free-text summary; empty when the backend omits it.
    #[serde(default)]
    pub description: String,
}

/// Lecturer as returned by list/create/update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lecturer {
    /// Backend primary key.
    pub id: EntityId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact address, unique per lecturer.
    pub email: String,
}

impl Lecturer {
    /// "First Last".
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Student as returned by list/create/update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    /// Backend primary key.
    pub id: EntityId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact address, unique per student.
    pub email: String,
    /// Serialized as `YYYY-MM-DD`.
    pub date_of_birth: NaiveDate,
    /// Owning course.
    pub course: EntityId,
    /// Enrolled subjects, all within `course`.
    #[serde(default)]
    pub subjects: Vec<EntityId>,
}

impl Student {
    /// "First Last".
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Subject as returned by list/create/update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    /// Backend primary key.
    pub id: EntityId,
    /// Subject title.
    pub name: String,
    /// Free-text summary.
    #[serde(default)]
    pub description: String,
    /// Course the subject is taught in.
    pub course: EntityId,
    /// Lecturer teaching it.
    pub lecturer: EntityId,
    /// Enrolled students, all within `course`.
    #[serde(default)]
    pub students: Vec<EntityId>,
}

/// Minimal course reference embedded in detail payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRef {
    /// Course id.
    pub id: EntityId,
    /// Course title.
    pub name: String,
}

/// Minimal lecturer reference embedded in detail payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LecturerRef {
    /// Lecturer id.
    pub id: EntityId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
}

/// Student row embedded in course and subject details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSummary {
    /// Student id.
    pub id: EntityId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact address; some embeddings leave it out.
    #[serde(default)]
    pub email: String,
}

/// Subject row embedded in course, lecturer and student details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectSummary {
    /// Subject id.
    pub id: EntityId,
    /// Subject title.
    pub name: String,
    /// Free-text summary.
    #[serde(default)]
    pub description: String,
    /// Owning course, present in lecturer and student details.
    #[serde(default)]
    pub course: Option<CourseRef>,
}

/// Course with its enrolled students and subjects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseDetail {
    /// Backend primary key.
    pub id: EntityId,
    /// Course title.
    pub name: String,
    /// Free-text summary.
    #[serde(default)]
    pub description: String,
    /// Students enrolled in the course.
    #[serde(default)]
    pub students: Vec<StudentSummary>,
    /// Subjects taught in the course.
    #[serde(default)]
    pub subjects: Vec<SubjectSummary>,
}

/// Lecturer with the subjects taught and the distinct courses those span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LecturerDetail {
    /// Backend primary key.
    pub id: EntityId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact address.
    pub email: String,
    /// Subjects this lecturer teaches.
    #[serde(default)]
    pub subjects: Vec<SubjectSummary>,
    /// Distinct courses derived from `subjects`.
    #[serde(default)]
    pub courses: Vec<CourseRef>,
}

/// Student with course and subjects expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentDetail {
    /// Backend primary key.
    pub id: EntityId,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact address.
    pub email: String,
    /// Date of birth.
    pub date_of_birth: NaiveDate,
    /// Owning course.
    pub course: CourseRef,
    /// Enrolled subjects.
    #[serde(default)]
    pub subjects: Vec<SubjectSummary>,
}

/// Subject with course, lecturer and enrolled students expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectDetail {
    /// Backend primary key.
    pub id: EntityId,
    /// Subject title.
    pub name: String,
    /// Free-text summary.
    #[serde(default)]
    pub description: String,
    /// Course the subject is taught in.
    pub course: CourseRef,
    /// Lecturer teaching it.
    pub lecturer: LecturerRef,
    /// Enrolled students.
    #[serde(default)]
    pub students: Vec<StudentSummary>,
}

impl Entity for Course {
    const KIND: EntityKind = EntityKind::Course;

    fn id(&self) -> EntityId {
        self.id
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }

    fn search_fields(&self) -> Vec<String> {
        vec![self.name.clone(), self.description.clone()]
    }

    fn columns(&self) -> Vec<String> {
        vec![self.name.clone(), self.description.clone()]
    }
}

impl Entity for Lecturer {
    const KIND: EntityKind = EntityKind::Lecturer;

    fn id(&self) -> EntityId {
        self.id
    }

    fn display_name(&self) -> String {
        self.full_name()
    }

    fn search_fields(&self) -> Vec<String> {
        vec![
            self.full_name(),
            self.first_name.clone(),
            self.last_name.clone(),
            self.email.clone(),
        ]
    }

    fn columns(&self) -> Vec<String> {
        vec![self.full_name(), self.email.clone()]
    }
}

impl Entity for Student {
    const KIND: EntityKind = EntityKind::Student;

    fn id(&self) -> EntityId {
        self.id
    }

    fn display_name(&self) -> String {
        self.full_name()
    }

    fn search_fields(&self) -> Vec<String> {
        vec![
            self.full_name(),
            self.first_name.clone(),
            self.last_name.clone(),
            self.email.clone(),
        ]
    }

    fn columns(&self) -> Vec<String> {
        vec![
            self.full_name(),
            self.email.clone(),
            self.date_of_birth.format("%Y-%m-%d").to_string(),
        ]
    }
}

impl Entity for Subject {
    const KIND: EntityKind = EntityKind::Subject;

    fn id(&self) -> EntityId {
        self.id
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }

    fn search_fields(&self) -> Vec<String> {
        vec![self.name.clone(), self.description.clone()]
    }

    fn columns(&self) -> Vec<String> {
        vec![self.name.clone(), self.description.clone()]
    }
}

impl CourseMember for Student {
    fn member_id(&self) -> EntityId {
        self.id
    }

    fn course_id(&self) -> EntityId {
        self.course
    }
}

impl CourseMember for Subject {
    fn member_id(&self) -> EntityId {
        self.id
    }

    fn course_id(&self) -> EntityId {
        self.course
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_names_agree_with_labels() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.name().to_lowercase(), kind.label());
            assert_eq!(EntityKind::from_segment(kind.segment()), Some(kind));
        }
        assert_eq!(EntityKind::Lecturer.name(), "Lecturer");
    }

    #[test]
    fn decodes_backend_student_detail() {
        let raw = json!({
            "id": 7,
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@example.com",
            "date_of_birth": "1815-12-10",
            "course": {"id": 1, "name": "Mathematics", "description": "Pure"},
            "subjects": [
                {
                    "id": 3,
                    "name": "Analysis",
                    "description": "",
                    "course": {"id": 1, "name": "Mathematics", "description": "Pure"},
                    "lecturer": {"id": 2, "first_name": "C", "last_name": "B", "email": "c@b"},
                    "students": []
                }
            ]
        });

        let detail: StudentDetail = serde_json::from_value(raw).unwrap();
        assert_eq!(detail.course.id, 1);
        assert_eq!(detail.subjects.len(), 1);
        assert_eq!(detail.subjects[0].course.as_ref().map(|c| c.id), Some(1));
        assert_eq!(
            detail.date_of_birth,
            NaiveDate::from_ymd_opt(1815, 12, 10).unwrap()
        );
    }

    #[test]
    fn kinds_round_trip_through_segments() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_segment(kind.segment()), Some(kind));
        }
        assert_eq!(EntityKind::from_segment("games"), None);
    }

    #[test]
    fn student_search_fields_include_full_name() {
        let student = Student {
            id: 1,
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: "grace@navy.mil".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1906, 12, 9).unwrap(),
            course: 4,
            subjects: vec![],
        };
        assert!(student
            .search_fields()
            .iter()
            .any(|field| field == "Grace Hopper"));
        assert_eq!(student.course_id(), 4);
    }
}

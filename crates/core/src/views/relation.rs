use tracing::debug;

use crate::models::{CourseMember, EntityId};

/// Multi-select over records that belong to a course, restricted to the
/// course currently chosen in the surrounding form.
///
/// The selection is pruned to the chosen course on every course change,
/// including the initial seeding from an existing record. If the seed
/// arrives before the candidate collection, the prune waits for it.
#[derive(Debug, Clone)]
pub struct RelationPicker<C> {
    candidates: Option<Vec<C>>,
    course: Option<EntityId>,
    selected: Vec<EntityId>,
    prune_pending: bool,
}

impl<C> Default for RelationPicker<C> {
    fn default() -> Self {
        Self {
            candidates: None,
            course: None,
            selected: Vec::new(),
            prune_pending: false,
        }
    }
}

impl<C: CourseMember + Clone> RelationPicker<C> {
    /// Picker with no candidates, no course and nothing selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the full candidate collection, fetched once per form.
    pub fn set_candidates(&mut self, candidates: Vec<C>) {
        self.candidates = Some(candidates);
        if self.prune_pending {
            self.prune();
        }
    }

    /// Whether the candidate collection has arrived.
    pub fn has_candidates(&self) -> bool {
        self.candidates.is_some()
    }

    /// Course driving the filter.
    pub fn course(&self) -> Option<EntityId> {
        self.course
    }

    /// Change the course and drop selections that no longer belong to it.
    pub fn select_course(&mut self, course: Option<EntityId>) {
        self.course = course;
        self.prune();
    }

    /// Populate from an existing record, validated as if the user had just
    /// picked `course`.
    pub fn seed(&mut self, course: Option<EntityId>, selected: impl IntoIterator<Item = EntityId>) {
        self.selected.clear();
        for id in selected {
            if !self.selected.contains(&id) {
                self.selected.push(id);
            }
        }
        self.select_course(course);
    }

    /// Candidates sharing the chosen course. Empty when no course is chosen.
    pub fn filtered(&self) -> Vec<&C> {
        let (Some(course), Some(candidates)) = (self.course, self.candidates.as_ref()) else {
            return Vec::new();
        };
        candidates
            .iter()
            .filter(|candidate| candidate.course_id() == course)
            .collect()
    }

    /// Add `id` if absent, remove it otherwise.
    pub fn toggle(&mut self, id: EntityId) {
        match self.selected.iter().position(|selected| *selected == id) {
            Some(index) => {
                self.selected.remove(index);
            }
            None => self.selected.push(id),
        }
    }

    /// Whether `id` is currently selected.
    pub fn is_selected(&self, id: EntityId) -> bool {
        self.selected.contains(&id)
    }

    /// Selected identifiers, in the order they were added.
    pub fn selected(&self) -> &[EntityId] {
        &self.selected
    }

    fn prune(&mut self) {
        let Some(candidates) = self.candidates.as_ref() else {
            self.prune_pending = true;
            return;
        };
        self.prune_pending = false;

        let before = self.selected.len();
        let course = self.course;
        self.selected.retain(|id| {
            candidates.iter().any(|candidate| {
                candidate.member_id() == *id && Some(candidate.course_id()) == course
            })
        });
        if self.selected.len() != before {
            debug!(
                course = ?course,
                dropped = before - self.selected.len(),
                "Pruned selections outside the chosen course"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[derive(Debug, Clone)]
    struct Member {
        id: EntityId,
        course: EntityId,
    }

    impl CourseMember for Member {
        fn member_id(&self) -> EntityId {
            self.id
        }

        fn course_id(&self) -> EntityId {
            self.course
        }
    }

    fn member(id: EntityId, course: EntityId) -> Member {
        Member { id, course }
    }

    const COURSE_A: EntityId = 1;
    const COURSE_B: EntityId = 2;

    #[test]
    fn changing_course_clears_foreign_selections() {
        let mut picker = RelationPicker::new();
        picker.set_candidates(vec![member(10, COURSE_A), member(11, COURSE_A)]);
        picker.seed(Some(COURSE_A), [10, 11]);
        assert_eq!(picker.selected(), &[10, 11]);
        assert_eq!(picker.filtered().len(), 2);

        picker.select_course(Some(COURSE_B));
        assert!(picker.selected().is_empty());
        assert!(picker.filtered().is_empty());
    }

    #[test]
    fn seed_is_validated_against_its_own_course() {
        let mut picker = RelationPicker::new();
        picker.set_candidates(vec![member(10, COURSE_A), member(20, COURSE_B)]);
        picker.seed(Some(COURSE_A), [10, 20, 10]);
        assert_eq!(picker.selected(), &[10]);
    }

    #[test]
    fn seed_before_candidates_is_pruned_on_arrival() {
        let mut early = RelationPicker::new();
        early.seed(Some(COURSE_A), [10, 20, 99]);
        assert_eq!(early.selected(), &[10, 20, 99]);
        early.set_candidates(vec![member(10, COURSE_A), member(20, COURSE_B)]);

        let mut late = RelationPicker::new();
        late.set_candidates(vec![member(10, COURSE_A), member(20, COURSE_B)]);
        late.seed(Some(COURSE_A), [10, 20, 99]);

        assert_eq!(early.selected(), late.selected());
        assert_eq!(early.selected(), &[10]);
    }

    #[test]
    fn clearing_the_course_clears_everything() {
        let mut picker = RelationPicker::new();
        picker.set_candidates(vec![member(10, COURSE_A)]);
        picker.seed(Some(COURSE_A), [10]);
        picker.select_course(None);
        assert!(picker.selected().is_empty());
        assert!(picker.filtered().is_empty());
    }

    fn arb_candidates() -> impl Strategy<Value = Vec<Member>> {
        prop::collection::vec(1i64..4, 0..20).prop_map(|courses| {
            courses
                .into_iter()
                .enumerate()
                .map(|(idx, course)| member(idx as EntityId, course))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn course_change_intersects_selection(
            candidates in arb_candidates(),
            initial in prop::collection::vec(0i64..25, 0..10),
            first in 1i64..4,
            next in prop::option::of(1i64..4),
        ) {
            let mut picker = RelationPicker::new();
            picker.set_candidates(candidates.clone());
            picker.select_course(Some(first));
            for id in &initial {
                if !picker.is_selected(*id) {
                    picker.toggle(*id);
                }
            }
            let before: BTreeSet<EntityId> = picker.selected().iter().copied().collect();

            picker.select_course(next);

            let allowed: BTreeSet<EntityId> = candidates
                .iter()
                .filter(|c| Some(c.course) == next)
                .map(|c| c.id)
                .collect();
            let after: BTreeSet<EntityId> = picker.selected().iter().copied().collect();
            let expected: BTreeSet<EntityId> = before.intersection(&allowed).copied().collect();
            prop_assert_eq!(after, expected);
        }

        #[test]
        fn double_toggle_restores_selection(
            seed in prop::collection::vec(0i64..10, 0..6),
            id in 0i64..12,
        ) {
            let mut picker: RelationPicker<Member> = RelationPicker::new();
            for value in seed {
                if !picker.is_selected(value) {
                    picker.toggle(value);
                }
            }
            let before: BTreeSet<EntityId> = picker.selected().iter().copied().collect();
            picker.toggle(id);
            picker.toggle(id);
            let after: BTreeSet<EntityId> = picker.selected().iter().copied().collect();
            prop_assert_eq!(before, after);
        }
    }
}

//! Onboarding state machine: tracks which step the user is on and what
//! they have entered so far.
//!
//! Pure and synchronous: timers, events and storage live in the controller.

use serde::Serialize;

use crate::error::{ConfigError, WizardError};

use super::model::{Goal, Mood, ProfileDraft};
use super::step::{Cardinality, ProfileField, StepKind, WizardStep, default_steps, validate_steps};

/// Result of a selection on a select step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// Multi-select membership flipped; `selected` is the new membership.
    Toggled { selected: bool },
    /// Single-select value committed; the step should move on shortly.
    Chosen,
}

/// Result of one auto-advance tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Progress moved but has not reached 100.
    Progress(u8),
    /// This tick brought progress to 100; the step is ready to move on.
    Reached,
    /// Not an auto step, or already at 100.
    Ignored,
}

/// Position of a step relative to the current one, for step indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Done,
    Current,
    Upcoming,
}

/// In-progress wizard state. Created fresh each time the flow starts.
#[derive(Debug, Clone)]
pub struct WizardState {
    steps: &'static [WizardStep],
    step_index: usize,
    draft: ProfileDraft,
    /// 0–100, reset to 0 on entering an auto step.
    auto_progress: u8,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            step_index: 0,
            draft: ProfileDraft::default(),
            auto_progress: 0,
        }
    }
}

impl WizardState {
    /// Start on the first step of the reference catalogue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start on the first step of a custom catalogue.
    pub fn with_steps(steps: &'static [WizardStep]) -> Result<Self, ConfigError> {
        validate_steps(steps)?;
        Ok(Self {
            steps,
            ..Self::default()
        })
    }

    pub fn steps(&self) -> &'static [WizardStep] {
        self.steps
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn index(&self) -> usize {
        self.step_index
    }

    pub fn draft(&self) -> &ProfileDraft {
        &self.draft
    }

    pub fn auto_progress(&self) -> u8 {
        self.auto_progress
    }

    /// The step at the current index.
    pub fn current_step(&self) -> &'static WizardStep {
        &self.steps[self.step_index]
    }

    /// Whether the current step is the last one.
    pub fn is_terminal(&self) -> bool {
        self.step_index + 1 == self.steps.len()
    }

    /// Gate for manual forward moves.
    ///
    /// Free-text steps need a non-blank value, multi-select steps need at
    /// least one option on. Auto and single-select steps gate themselves.
    pub fn can_proceed(&self) -> bool {
        match self.current_step().kind {
            StepKind::FreeText { field } => self.draft.is_filled(field),
            StepKind::Select {
                field,
                cardinality: Cardinality::AtLeastOne,
                ..
            } => self.draft.is_filled(field),
            StepKind::Select {
                cardinality: Cardinality::ExactlyOne,
                ..
            }
            | StepKind::AutoAdvance => true,
        }
    }

    /// Back to the first step with an empty draft. The only way backwards.
    pub fn reset(&mut self) {
        self.step_index = 0;
        self.draft = ProfileDraft::default();
        self.auto_progress = 0;
    }

    /// Move to the next step. Returns the new index.
    pub fn advance(&mut self) -> Result<usize, WizardError> {
        let step = self.current_step();
        if self.is_terminal() {
            return Err(WizardError::AtTerminal { step: step.id });
        }
        if !self.can_proceed() {
            return Err(WizardError::Gated { step: step.id });
        }
        self.step_index += 1;
        if self.current_step().kind.is_auto_advance() {
            self.auto_progress = 0;
        }
        Ok(self.step_index)
    }

    /// Set the text field bound to the current free-text step.
    pub fn set_field_value(
        &mut self,
        field: ProfileField,
        value: impl Into<String>,
    ) -> Result<(), WizardError> {
        let step = self.current_step();
        match step.kind {
            StepKind::FreeText { field: bound } if bound == field => {
                // Only `name` is text-shaped; validate_steps enforces this.
                self.draft.name = value.into();
                Ok(())
            }
            _ => Err(WizardError::FieldMismatch {
                step: step.id,
                field,
            }),
        }
    }

    /// Select an option on the current select step.
    ///
    /// Multi-select flips membership. Single-select overwrites the field and
    /// reports [`SelectionOutcome::Chosen`]; moving on is the caller's job.
    pub fn toggle_selection(
        &mut self,
        field: ProfileField,
        option: &str,
    ) -> Result<SelectionOutcome, WizardError> {
        let step = self.current_step();
        let StepKind::Select {
            field: bound,
            options,
            cardinality,
        } = step.kind
        else {
            return Err(WizardError::FieldMismatch {
                step: step.id,
                field,
            });
        };
        if bound != field {
            return Err(WizardError::FieldMismatch {
                step: step.id,
                field,
            });
        }

        let unknown = || WizardError::UnknownOption {
            step: step.id,
            option: option.to_string(),
        };
        if !options.contains(&option) {
            return Err(unknown());
        }

        match (field, cardinality) {
            (ProfileField::Mood, Cardinality::ExactlyOne) => {
                let mood: Mood = option.parse().map_err(|_| unknown())?;
                self.draft.mood = Some(mood);
                Ok(SelectionOutcome::Chosen)
            }
            (ProfileField::Goals, Cardinality::AtLeastOne) => {
                let goal: Goal = option.parse().map_err(|_| unknown())?;
                let selected = self.draft.toggle_goal(goal);
                Ok(SelectionOutcome::Toggled { selected })
            }
            _ => Err(WizardError::FieldMismatch {
                step: step.id,
                field,
            }),
        }
    }

    /// Add `increment` points of simulated progress on an auto step.
    pub fn tick_auto_advance(&mut self, increment: u8) -> TickOutcome {
        if !self.current_step().kind.is_auto_advance() || self.auto_progress >= 100 {
            return TickOutcome::Ignored;
        }
        self.auto_progress = self.auto_progress.saturating_add(increment).min(100);
        if self.auto_progress == 100 {
            TickOutcome::Reached
        } else {
            TickOutcome::Progress(self.auto_progress)
        }
    }

    /// Whole-wizard progress as a percentage of steps passed.
    pub fn overall_progress(&self) -> u8 {
        let last = self.steps.len().saturating_sub(1);
        if last == 0 {
            return 100;
        }
        (self.step_index * 100 / last) as u8
    }

    /// Indicator status for every step, in order.
    pub fn step_statuses(&self) -> Vec<StepStatus> {
        (0..self.steps.len())
            .map(|i| match i.cmp(&self.step_index) {
                std::cmp::Ordering::Less => StepStatus::Done,
                std::cmp::Ordering::Equal => StepStatus::Current,
                std::cmp::Ordering::Greater => StepStatus::Upcoming,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::step::StepId;

    /// Run ticks until the current auto step reports it is done.
    fn fill(state: &mut WizardState) {
        for _ in 0..50 {
            if state.tick_auto_advance(2) == TickOutcome::Reached {
                return;
            }
        }
        panic!("auto step never reached 100");
    }

    fn at_step(id: StepId) -> WizardState {
        let mut state = WizardState::new();
        while state.current_step().id != id {
            match state.current_step().id {
                StepId::Name => state.set_field_value(ProfileField::Name, "Ava").unwrap(),
                StepId::Emotional => {
                    state.toggle_selection(ProfileField::Mood, "Calm").unwrap();
                }
                StepId::Goals => {
                    state.toggle_selection(ProfileField::Goals, "Productivity").unwrap();
                }
                _ => {}
            }
            state.advance().unwrap();
        }
        state
    }

    #[test]
    fn starts_at_boot() {
        let state = WizardState::new();
        assert_eq!(state.index(), 0);
        assert_eq!(state.current_step().id, StepId::Boot);
        assert_eq!(state.step_count(), 6);
        assert_eq!(state.auto_progress(), 0);
        assert!(state.can_proceed());
    }

    #[test]
    fn free_text_gate() {
        let mut state = at_step(StepId::Name);
        assert!(!state.can_proceed());
        assert_eq!(
            state.advance(),
            Err(WizardError::Gated { step: StepId::Name })
        );
        assert_eq!(state.index(), 1);

        state.set_field_value(ProfileField::Name, "  ").unwrap();
        assert!(!state.can_proceed());

        state.set_field_value(ProfileField::Name, "Ava").unwrap();
        assert!(state.can_proceed());

        state.set_field_value(ProfileField::Name, "").unwrap();
        assert!(!state.can_proceed());
    }

    #[test]
    fn multi_select_gate_and_toggle() {
        let mut state = at_step(StepId::Goals);
        assert!(!state.can_proceed());

        assert_eq!(
            state.toggle_selection(ProfileField::Goals, "Better Focus"),
            Ok(SelectionOutcome::Toggled { selected: true })
        );
        assert!(state.can_proceed());

        assert_eq!(
            state.toggle_selection(ProfileField::Goals, "Better Focus"),
            Ok(SelectionOutcome::Toggled { selected: false })
        );
        assert!(!state.can_proceed());
        assert!(state.draft().goals.is_empty());
    }

    #[test]
    fn single_select_sets_field_and_reports_choice() {
        let mut state = at_step(StepId::Emotional);
        assert!(state.can_proceed());
        assert_eq!(
            state.toggle_selection(ProfileField::Mood, "Calm"),
            Ok(SelectionOutcome::Chosen)
        );
        assert_eq!(
            state.toggle_selection(ProfileField::Mood, "Focused"),
            Ok(SelectionOutcome::Chosen)
        );
        assert_eq!(state.draft().mood, Some(Mood::Focused));
        // Selecting does not move by itself at this level.
        assert_eq!(state.current_step().id, StepId::Emotional);
    }

    #[test]
    fn mismatched_bindings_are_rejected_without_change() {
        let mut state = at_step(StepId::Emotional);
        let before = state.draft().clone();

        assert_eq!(
            state.set_field_value(ProfileField::Name, "Ava"),
            Err(WizardError::FieldMismatch {
                step: StepId::Emotional,
                field: ProfileField::Name
            })
        );
        assert!(matches!(
            state.toggle_selection(ProfileField::Goals, "Productivity"),
            Err(WizardError::FieldMismatch { .. })
        ));
        assert!(matches!(
            state.toggle_selection(ProfileField::Mood, "Grumpy"),
            Err(WizardError::UnknownOption { .. })
        ));
        assert_eq!(state.draft(), &before);

        let mut boot = WizardState::new();
        assert!(matches!(
            boot.toggle_selection(ProfileField::Mood, "Calm"),
            Err(WizardError::FieldMismatch { .. })
        ));
    }

    #[test]
    fn ticks_reach_100_once() {
        let mut state = WizardState::new();
        for i in 1..50u8 {
            assert_eq!(state.tick_auto_advance(2), TickOutcome::Progress(i * 2));
        }
        assert_eq!(state.tick_auto_advance(2), TickOutcome::Reached);
        assert_eq!(state.auto_progress(), 100);
        assert_eq!(state.tick_auto_advance(2), TickOutcome::Ignored);
        assert_eq!(state.auto_progress(), 100);
    }

    #[test]
    fn uneven_increment_caps_at_100() {
        let mut state = WizardState::new();
        for _ in 0..3 {
            state.tick_auto_advance(30);
        }
        assert_eq!(state.tick_auto_advance(30), TickOutcome::Reached);
        assert_eq!(state.auto_progress(), 100);
    }

    #[test]
    fn ticks_ignored_on_input_steps() {
        let mut state = at_step(StepId::Name);
        assert_eq!(state.tick_auto_advance(2), TickOutcome::Ignored);
        assert_eq!(state.auto_progress(), 0);
    }

    #[test]
    fn entering_auto_step_resets_progress() {
        let mut state = WizardState::new();
        fill(&mut state);
        state.advance().unwrap();
        assert_eq!(state.current_step().id, StepId::Name);
        state.set_field_value(ProfileField::Name, "Ava").unwrap();
        state.advance().unwrap();
        assert_eq!(state.current_step().id, StepId::Cognitive);
        assert_eq!(state.auto_progress(), 0);
    }

    #[test]
    fn advance_rejected_on_terminal() {
        let mut state = at_step(StepId::Complete);
        assert!(state.is_terminal());
        assert_eq!(
            state.advance(),
            Err(WizardError::AtTerminal {
                step: StepId::Complete
            })
        );
        assert_eq!(state.index(), 5);
    }

    #[test]
    fn walks_all_steps_in_order() {
        let mut state = WizardState::new();
        let mut visited = vec![state.current_step().id];
        while !state.is_terminal() {
            match state.current_step().kind {
                StepKind::AutoAdvance => fill(&mut state),
                StepKind::FreeText { field } => state.set_field_value(field, "Ava").unwrap(),
                StepKind::Select { field, options, .. } => {
                    state.toggle_selection(field, options[0]).unwrap();
                }
            }
            state.advance().unwrap();
            visited.push(state.current_step().id);
        }
        let expected: Vec<StepId> = default_steps().iter().map(|s| s.id).collect();
        assert_eq!(visited, expected);
    }

    #[test]
    fn overall_progress_and_statuses() {
        let state = WizardState::new();
        assert_eq!(state.overall_progress(), 0);

        let state = at_step(StepId::Cognitive);
        assert_eq!(state.overall_progress(), 40);
        assert_eq!(
            state.step_statuses(),
            vec![
                StepStatus::Done,
                StepStatus::Done,
                StepStatus::Current,
                StepStatus::Upcoming,
                StepStatus::Upcoming,
                StepStatus::Upcoming,
            ]
        );

        let state = at_step(StepId::Complete);
        assert_eq!(state.overall_progress(), 100);
    }

    #[test]
    fn custom_catalogue() {
        static SHORT: [WizardStep; 2] = [
            WizardStep {
                id: StepId::Name,
                title: "Name",
                subtitle: "",
                icon: crate::onboarding::step::StepIcon::Sparkles,
                kind: StepKind::FreeText {
                    field: ProfileField::Name,
                },
            },
            WizardStep {
                id: StepId::Complete,
                title: "Done",
                subtitle: "",
                icon: crate::onboarding::step::StepIcon::Brain,
                kind: StepKind::AutoAdvance,
            },
        ];
        let mut state = WizardState::with_steps(&SHORT).unwrap();
        assert_eq!(state.step_count(), 2);
        state.set_field_value(ProfileField::Name, "Ava").unwrap();
        assert_eq!(state.advance(), Ok(1));
        assert!(state.is_terminal());

        assert!(WizardState::with_steps(&[]).is_err());
    }
}

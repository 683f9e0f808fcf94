//! Onboarding system: the first-launch setup wizard.
//!
//! A fixed, linear sequence of steps collects a name, a mood and a set of
//! goals. Some steps fill a progress bar and move on by themselves, a
//! single-select step moves on shortly after a choice, and the rest wait for
//! the user. The final step seals a `UserProfile` into storage.

pub mod controller;
pub mod model;
pub mod state;
pub mod step;
pub mod timer;

pub use controller::{Completion, OnboardingController, WizardEvent, WizardSnapshot};
pub use model::{Goal, Mood, ProfileDraft, UserProfile};
pub use state::{SelectionOutcome, StepStatus, TickOutcome, WizardState};
pub use step::{Cardinality, ProfileField, StepIcon, StepId, StepKind, WizardStep, default_steps};
pub use timer::ScheduledTask;

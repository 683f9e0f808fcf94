//! Step catalogue: the static, ordered pages of the onboarding wizard.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::model::{Goal, Mood};

/// Identifier of a wizard step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    Boot,
    Name,
    Cognitive,
    Emotional,
    Goals,
    Complete,
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Boot => "boot",
            Self::Name => "name",
            Self::Cognitive => "cognitive",
            Self::Emotional => "emotional",
            Self::Goals => "goals",
            Self::Complete => "complete",
        };
        write!(f, "{s}")
    }
}

/// Icon tag a renderer shows for a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepIcon {
    Brain,
    Sparkles,
    Zap,
    Heart,
    Target,
}

/// A profile field a step can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Name,
    Mood,
    Goals,
}

impl ProfileField {
    /// Label options a select step bound to this field may offer.
    pub fn known_options(&self) -> &'static [&'static str] {
        match self {
            Self::Name => &[],
            Self::Mood => Mood::LABELS,
            Self::Goals => Goal::LABELS,
        }
    }
}

impl std::fmt::Display for ProfileField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Mood => write!(f, "mood"),
            Self::Goals => write!(f, "goals"),
        }
    }
}

/// How many options a select step takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Choosing an option commits it and moves on.
    ExactlyOne,
    /// Options toggle; at least one must be on to continue.
    AtLeastOne,
}

/// What a step asks of the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    /// Fills a progress bar, then moves on by itself.
    AutoAdvance,
    /// Text entry bound to a scalar field.
    FreeText { field: ProfileField },
    /// Choice from a fixed option set.
    Select {
        field: ProfileField,
        options: &'static [&'static str],
        cardinality: Cardinality,
    },
}

impl StepKind {
    /// The field this step writes, if any.
    pub fn field(&self) -> Option<ProfileField> {
        match self {
            Self::AutoAdvance => None,
            Self::FreeText { field } | Self::Select { field, .. } => Some(*field),
        }
    }

    pub fn is_auto_advance(&self) -> bool {
        matches!(self, Self::AutoAdvance)
    }
}

/// One page of the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WizardStep {
    pub id: StepId,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub icon: StepIcon,
    #[serde(flatten)]
    pub kind: StepKind,
}

static DEFAULT_STEPS: [WizardStep; 6] = [
    WizardStep {
        id: StepId::Boot,
        title: "Initializing MindOS",
        subtitle: "Booting cognitive kernel...",
        icon: StepIcon::Brain,
        kind: StepKind::AutoAdvance,
    },
    WizardStep {
        id: StepId::Name,
        title: "Identity Recognition",
        subtitle: "What should we call you?",
        icon: StepIcon::Sparkles,
        kind: StepKind::FreeText {
            field: ProfileField::Name,
        },
    },
    WizardStep {
        id: StepId::Cognitive,
        title: "Cognitive Calibration",
        subtitle: "Mapping neural preferences...",
        icon: StepIcon::Zap,
        kind: StepKind::AutoAdvance,
    },
    WizardStep {
        id: StepId::Emotional,
        title: "Emotional Scan",
        subtitle: "How are you feeling today?",
        icon: StepIcon::Heart,
        kind: StepKind::Select {
            field: ProfileField::Mood,
            options: Mood::LABELS,
            cardinality: Cardinality::ExactlyOne,
        },
    },
    WizardStep {
        id: StepId::Goals,
        title: "Objective Alignment",
        subtitle: "What do you want to achieve?",
        icon: StepIcon::Target,
        kind: StepKind::Select {
            field: ProfileField::Goals,
            options: Goal::LABELS,
            cardinality: Cardinality::AtLeastOne,
        },
    },
    WizardStep {
        id: StepId::Complete,
        title: "Digital Twin Created",
        subtitle: "Your cognitive OS is ready",
        icon: StepIcon::Brain,
        kind: StepKind::AutoAdvance,
    },
];

/// The reference six-step flow:
/// boot → name → calibration → mood → goals → complete.
pub fn default_steps() -> &'static [WizardStep] {
    &DEFAULT_STEPS
}

/// Check a step catalogue is something the wizard can run.
///
/// Steps must be non-empty with unique ids, and every binding must suit its
/// field: `name` takes free text, `mood` exactly one option, `goals` a set.
pub fn validate_steps(steps: &[WizardStep]) -> Result<(), ConfigError> {
    if steps.is_empty() {
        return Err(invalid("steps", "catalogue is empty".to_string()));
    }

    let mut seen = HashSet::new();
    for step in steps {
        if !seen.insert(step.id) {
            return Err(invalid("steps", format!("duplicate step id {}", step.id)));
        }

        match step.kind {
            StepKind::AutoAdvance => {}
            StepKind::FreeText { field } => {
                if field != ProfileField::Name {
                    return Err(invalid(
                        "steps",
                        format!("step {} binds free text to {field}", step.id),
                    ));
                }
            }
            StepKind::Select {
                field,
                options,
                cardinality,
            } => {
                let expected = match field {
                    ProfileField::Mood => Cardinality::ExactlyOne,
                    ProfileField::Goals => Cardinality::AtLeastOne,
                    ProfileField::Name => {
                        return Err(invalid(
                            "steps",
                            format!("step {} offers options for name", step.id),
                        ));
                    }
                };
                if cardinality != expected {
                    return Err(invalid(
                        "steps",
                        format!("step {} has the wrong cardinality for {field}", step.id),
                    ));
                }
                if options.is_empty() {
                    return Err(invalid("steps", format!("step {} has no options", step.id)));
                }
                if let Some(unknown) = options
                    .iter()
                    .find(|o| !field.known_options().contains(*o))
                {
                    return Err(invalid(
                        "steps",
                        format!("step {} offers unknown {field} option {unknown:?}", step.id),
                    ));
                }
            }
        }
    }
    Ok(())
}

fn invalid(key: &str, message: String) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message,
    }
}

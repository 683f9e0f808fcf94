//! User profile and onboarding data models.

use serde::{Deserialize, Serialize};

use crate::error::WizardError;

use super::step::ProfileField;

/// How the user feels at setup time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    Motivated,
    Calm,
    Energetic,
    Reflective,
    Focused,
}

impl Mood {
    pub const ALL: [Mood; 5] = [
        Self::Motivated,
        Self::Calm,
        Self::Energetic,
        Self::Reflective,
        Self::Focused,
    ];

    pub const LABELS: &'static [&'static str] = &Self::LABEL_TABLE;

    const LABEL_TABLE: [&'static str; 5] = {
        let mut out = [""; 5];
        let mut i = 0;
        while i < out.len() {
            out[i] = Mood::ALL[i].label();
            i += 1;
        }
        out
    };

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Motivated => "Motivated",
            Self::Calm => "Calm",
            Self::Energetic => "Energetic",
            Self::Reflective => "Reflective",
            Self::Focused => "Focused",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.label() == s)
            .ok_or_else(|| format!("unknown mood {s:?}"))
    }
}

/// Something the user wants MindOS to help with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Goal {
    #[serde(rename = "Better Focus")]
    BetterFocus,
    #[serde(rename = "Emotional Control")]
    EmotionalControl,
    #[serde(rename = "Decision Making")]
    DecisionMaking,
    #[serde(rename = "Memory Enhancement")]
    MemoryEnhancement,
    #[serde(rename = "Productivity")]
    Productivity,
}

impl Goal {
    pub const ALL: [Goal; 5] = [
        Self::BetterFocus,
        Self::EmotionalControl,
        Self::DecisionMaking,
        Self::MemoryEnhancement,
        Self::Productivity,
    ];

    pub const LABELS: &'static [&'static str] = &Self::LABEL_TABLE;

    const LABEL_TABLE: [&'static str; 5] = {
        let mut out = [""; 5];
        let mut i = 0;
        while i < out.len() {
            out[i] = Goal::ALL[i].label();
            i += 1;
        }
        out
    };

    pub const fn label(&self) -> &'static str {
        match self {
            Self::BetterFocus => "Better Focus",
            Self::EmotionalControl => "Emotional Control",
            Self::DecisionMaking => "Decision Making",
            Self::MemoryEnhancement => "Memory Enhancement",
            Self::Productivity => "Productivity",
        }
    }
}

impl std::fmt::Display for Goal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Goal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|g| g.label() == s)
            .ok_or_else(|| format!("unknown goal {s:?}"))
    }
}

/// Profile being filled in while the wizard runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileDraft {
    pub name: String,
    pub mood: Option<Mood>,
    /// Toggle order, no duplicates.
    pub goals: Vec<Goal>,
}

impl ProfileDraft {
    /// Whether the bound field holds something that lets its step proceed.
    pub fn is_filled(&self, field: ProfileField) -> bool {
        match field {
            ProfileField::Name => !self.name.trim().is_empty(),
            ProfileField::Mood => self.mood.is_some(),
            ProfileField::Goals => !self.goals.is_empty(),
        }
    }

    /// Add the goal if absent, remove it if present. Returns whether it is
    /// now selected.
    pub fn toggle_goal(&mut self, goal: Goal) -> bool {
        if let Some(pos) = self.goals.iter().position(|g| *g == goal) {
            self.goals.remove(pos);
            false
        } else {
            self.goals.push(goal);
            true
        }
    }

    /// Seal the draft into a finished profile.
    ///
    /// Only the name is required. The mood step can be passed without a
    /// choice, which seals as no mood.
    pub fn seal(&self) -> Result<UserProfile, WizardError> {
        if !self.is_filled(ProfileField::Name) {
            return Err(WizardError::IncompleteProfile {
                missing: ProfileField::Name,
            });
        }
        Ok(UserProfile {
            name: self.name.trim().to_string(),
            mood: self.mood,
            goals: self.goals.clone(),
        })
    }
}

/// The finalized onboarding result that the dashboard and module pages read.
///
/// Stored as JSON under [`storage_keys::USER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    /// `null` when the mood step was passed without a choice.
    #[serde(default)]
    pub mood: Option<Mood>,
    pub goals: Vec<Goal>,
}

/// Keys written to the key-value store.
pub mod storage_keys {
    /// Serialized [`super::UserProfile`].
    pub const USER: &str = "user";
    /// `"true"` once onboarding has finished.
    pub const ONBOARDING_COMPLETE: &str = "onboarding_complete";
    /// RFC 3339 timestamp of completion.
    pub const ONBOARDING_COMPLETED_AT: &str = "onboarding_completed_at";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_variants() {
        for (mood, label) in Mood::ALL.iter().zip(Mood::LABELS) {
            assert_eq!(mood.label(), *label);
            assert_eq!(label.parse::<Mood>().unwrap(), *mood);
            assert_eq!(serde_json::to_string(mood).unwrap(), format!("\"{label}\""));
        }
        for (goal, label) in Goal::ALL.iter().zip(Goal::LABELS) {
            assert_eq!(goal.label(), *label);
            assert_eq!(label.parse::<Goal>().unwrap(), *goal);
            assert_eq!(serde_json::to_string(goal).unwrap(), format!("\"{label}\""));
        }
    }

    #[test]
    fn parse_is_exact() {
        assert!("calm".parse::<Mood>().is_err());
        assert!("BetterFocus".parse::<Goal>().is_err());
    }

    #[test]
    fn toggle_goal_twice_restores() {
        let mut draft = ProfileDraft::default();
        assert!(draft.toggle_goal(Goal::Productivity));
        assert!(draft.toggle_goal(Goal::BetterFocus));
        assert_eq!(draft.goals, vec![Goal::Productivity, Goal::BetterFocus]);

        assert!(!draft.toggle_goal(Goal::Productivity));
        assert_eq!(draft.goals, vec![Goal::BetterFocus]);
        assert!(draft.toggle_goal(Goal::Productivity));
        assert!(!draft.toggle_goal(Goal::Productivity));
        assert_eq!(draft.goals, vec![Goal::BetterFocus]);
    }

    #[test]
    fn blank_name_is_not_filled() {
        let mut draft = ProfileDraft::default();
        assert!(!draft.is_filled(ProfileField::Name));
        draft.name = "   ".to_string();
        assert!(!draft.is_filled(ProfileField::Name));
        draft.name = "Ava".to_string();
        assert!(draft.is_filled(ProfileField::Name));
    }

    #[test]
    fn seal_requires_only_a_name() {
        let mut draft = ProfileDraft::default();
        assert_eq!(
            draft.seal(),
            Err(WizardError::IncompleteProfile {
                missing: ProfileField::Name
            })
        );

        draft.name = " Ava ".to_string();
        let profile = draft.seal().unwrap();
        assert_eq!(profile.name, "Ava");
        assert_eq!(profile.mood, None);
        assert!(profile.goals.is_empty());

        draft.mood = Some(Mood::Calm);
        assert_eq!(draft.seal().unwrap().mood, Some(Mood::Calm));
    }

    #[test]
    fn profile_json_shape() {
        let profile = UserProfile {
            name: "Ava".to_string(),
            mood: Some(Mood::Calm),
            goals: vec![Goal::BetterFocus, Goal::Productivity],
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "Ava",
                "mood": "Calm",
                "goals": ["Better Focus", "Productivity"]
            })
        );

        let parsed: UserProfile = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, profile);
    }

    #[test]
    fn missing_mood_is_null() {
        let profile = UserProfile {
            name: "Ava".to_string(),
            mood: None,
            goals: vec![Goal::Productivity],
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["mood"], serde_json::Value::Null);

        let parsed: UserProfile =
            serde_json::from_str(r#"{"name":"Ava","goals":["Productivity"]}"#).unwrap();
        assert_eq!(parsed, profile);
    }
}

//! Serialized unified-session-state types.
//!
//! One document per project at `state/unified_session_state.json`. Created
//! on first session start, mutated only through [`super::store::StateStore`],
//! never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The DAIC workflow mode. Two live states; the Alignment and Check phases
/// of the discipline are conversational, not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DaicMode {
    #[default]
    Discussion,
    Implementation,
}

impl DaicMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DaicMode::Discussion => "discussion",
            DaicMode::Implementation => "implementation",
        }
    }

    pub fn flipped(&self) -> Self {
        match self {
            DaicMode::Discussion => DaicMode::Implementation,
            DaicMode::Implementation => DaicMode::Discussion,
        }
    }
}

impl std::str::FromStr for DaicMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discussion" => Ok(DaicMode::Discussion),
            "implementation" => Ok(DaicMode::Implementation),
            other => Err(format!("unknown DAIC mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Developer {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// The unified session state document.
///
/// Invariants enforced by the store:
/// - at most one task active at a time
/// - a non-null `current_task` implies a non-null `current_branch`
/// - `session_id` and `correlation_id` change together on task switch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UnifiedState {
    #[serde(default)]
    pub daic_mode: DaicMode,

    #[serde(default)]
    pub current_task: Option<String>,

    #[serde(default)]
    pub current_branch: Option<String>,

    #[serde(default)]
    pub task_services: Vec<String>,

    #[serde(default)]
    pub session_id: Option<String>,

    #[serde(default)]
    pub correlation_id: Option<String>,

    #[serde(default)]
    pub developer: Developer,

    /// When the mode last changed.
    #[serde(default)]
    pub daic_timestamp: Option<DateTime<Utc>>,

    /// Mode before the most recent change.
    #[serde(default)]
    pub previous_daic_mode: Option<DaicMode>,
}

impl UnifiedState {
    pub fn has_active_task(&self) -> bool {
        self.current_task.is_some()
    }
}

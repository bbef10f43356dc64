use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One inbound mention, reduced to the four fields the orchestrator needs.
/// Built by the channel adapter and discarded after the turn completes.
#[derive(Debug, Clone)]
pub struct StandupRequest {
    pub user: String,
    pub text: String,
    pub channel: String,
    pub ts: String,
}

/// Per-user persisted record of previously fetched GitHub activity.
/// At most one snapshot per user; overwritten wholesale on each store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedSnapshot {
    #[serde(default)]
    pub issues: Vec<Value>,
    #[serde(default)]
    pub pull_requests: Vec<Value>,
    #[serde(default)]
    pub comments: Vec<Value>,
}

impl CachedSnapshot {
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty() && self.pull_requests.is_empty() && self.comments.is_empty()
    }
}

/// Auxiliary signals assembled fresh per turn: recent channel messages as
/// text plus structured GitHub collections. Never mutated, only replaced.
#[derive(Debug, Clone, Default)]
pub struct ExternalContext {
    pub history: Vec<String>,
    pub issues: Vec<Value>,
    pub pull_requests: Vec<Value>,
    pub comments: Vec<Value>,
}

impl ExternalContext {
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
            && self.issues.is_empty()
            && self.pull_requests.is_empty()
            && self.comments.is_empty()
    }

    /// Fold another source's result into this one.
    pub fn merge(&mut self, other: ExternalContext) {
        self.history.extend(other.history);
        self.issues.extend(other.issues);
        self.pull_requests.extend(other.pull_requests);
        self.comments.extend(other.comments);
    }
}

/// Which standup slot the bot is currently collecting for a user.
///
/// Persisted per user alongside the snapshot; a `Complete` record is read
/// back as the start of a fresh round on the next mention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandupPhase {
    #[default]
    AwaitingAccomplishments,
    AwaitingPlans,
    AwaitingBlockers,
    Complete,
}

impl StandupPhase {
    pub fn next(self) -> Self {
        match self {
            StandupPhase::AwaitingAccomplishments => StandupPhase::AwaitingPlans,
            StandupPhase::AwaitingPlans => StandupPhase::AwaitingBlockers,
            StandupPhase::AwaitingBlockers => StandupPhase::Complete,
            StandupPhase::Complete => StandupPhase::Complete,
        }
    }

    /// The slot this phase is collecting, phrased for the model.
    pub fn slot_request(self) -> &'static str {
        match self {
            StandupPhase::AwaitingAccomplishments => {
                "their accomplishments since the last standup"
            }
            StandupPhase::AwaitingPlans => "their plans for today",
            StandupPhase::AwaitingBlockers => "any blockers or challenges they currently face",
            StandupPhase::Complete => "a wrap-up; the standup is complete",
        }
    }
}

/// Outcome of one standup turn, returned by value.
#[derive(Debug, Clone)]
pub enum StandupResponse {
    /// The model answered in text only.
    Plain(String),
    /// The model invoked GitHub tools; the extracted data becomes the
    /// user's next cached snapshot.
    ToolAugmented {
        text: String,
        snapshot: CachedSnapshot,
    },
}

impl StandupResponse {
    pub fn text(&self) -> &str {
        match self {
            StandupResponse::Plain(text) => text,
            StandupResponse::ToolAugmented { text, .. } => text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_empty_detection() {
        let mut snap = CachedSnapshot::default();
        assert!(snap.is_empty());
        snap.comments.push(json!({"id": 1}));
        assert!(!snap.is_empty());
    }

    #[test]
    fn snapshot_json_shape() {
        let snap = CachedSnapshot {
            issues: vec![json!({"id": 7})],
            pull_requests: vec![],
            comments: vec![],
        };
        let raw = serde_json::to_string(&snap).unwrap();
        assert!(raw.contains("\"issues\""));
        assert!(raw.contains("\"pull_requests\""));
        assert!(raw.contains("\"comments\""));
        let back: CachedSnapshot = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn phase_progression() {
        let mut phase = StandupPhase::default();
        assert_eq!(phase, StandupPhase::AwaitingAccomplishments);
        phase = phase.next();
        assert_eq!(phase, StandupPhase::AwaitingPlans);
        phase = phase.next();
        assert_eq!(phase, StandupPhase::AwaitingBlockers);
        phase = phase.next();
        assert_eq!(phase, StandupPhase::Complete);
        // Terminal state stays put until a new round resets it.
        assert_eq!(phase.next(), StandupPhase::Complete);
    }

    #[test]
    fn phase_serializes_snake_case() {
        let raw = serde_json::to_string(&StandupPhase::AwaitingPlans).unwrap();
        assert_eq!(raw, "\"awaiting_plans\"");
    }

    #[test]
    fn context_merge_accumulates() {
        let mut ctx = ExternalContext::default();
        ctx.merge(ExternalContext {
            history: vec!["a".into()],
            ..Default::default()
        });
        ctx.merge(ExternalContext {
            issues: vec![json!({"id": 1})],
            ..Default::default()
        });
        assert_eq!(ctx.history.len(), 1);
        assert_eq!(ctx.issues.len(), 1);
        assert!(!ctx.is_empty());
    }
}

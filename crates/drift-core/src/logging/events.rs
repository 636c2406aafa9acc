//! Pipeline stages and event names used as tracing targets.

use serde::{Deserialize, Serialize};

/// Stages of an audit run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    /// Package database queries.
    Index,
    /// Orphan manifest reconstruction.
    Manifest,
    Classify,
    Redact,
    Snapshot,
    /// Residual-secret scan of rendered output.
    Gate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Index => "index",
            Stage::Manifest => "manifest",
            Stage::Classify => "classify",
            Stage::Redact => "redact",
            Stage::Snapshot => "snapshot",
            Stage::Gate => "gate",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard event names.
pub mod event_names {
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    pub const INDEX_BUILT: &str = "index.built";
    pub const MANIFEST_BUILT: &str = "manifest.built";
    pub const CLASSIFY_FINISHED: &str = "classify.finished";
    pub const REDACT_FINISHED: &str = "redact.finished";
    pub const SNAPSHOT_WRITTEN: &str = "snapshot.written";

    pub const GATE_CLEAN: &str = "gate.clean";
    pub const GATE_BLOCKED: &str = "gate.blocked";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_serialization_matches_display() {
        for stage in [Stage::Init, Stage::Classify, Stage::Gate] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage));
        }
    }
}

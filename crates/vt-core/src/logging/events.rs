//! Stable stage and event names used as structured log fields.

use serde::{Deserialize, Serialize};

/// Pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup, configuration and path resolution.
    Init,
    /// Reading CSV inputs and building the merged table.
    Load,
    Filter,
    Aggregate,
    Ecospectrum,
    /// Rendering the result to stdout.
    Output,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Load => "load",
            Stage::Filter => "filter",
            Stage::Aggregate => "aggregate",
            Stage::Ecospectrum => "ecospectrum",
            Stage::Output => "output",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names.
pub mod event_names {
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const PATHS_RESOLVED: &str = "config.paths_resolved";

    pub const LOAD_FINISHED: &str = "load.finished";
    pub const SCENARIO_STARTED: &str = "scenario.started";
    pub const SCENARIO_FINISHED: &str = "scenario.finished";

    pub const OUTPUT_WRITTEN: &str = "output.written";
    pub const RUN_FAILED: &str = "run.failed";
}

/// Correlation fields shared by every event of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogContext {
    pub run_id: String,
    /// Scenario name when running one.
    pub scenario: Option<String>,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            scenario: None,
        }
    }

    pub fn with_scenario(mut self, name: impl Into<String>) -> Self {
        self.scenario = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_serialization_matches_display() {
        for stage in [Stage::Load, Stage::Ecospectrum, Stage::Output] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage));
        }
    }

    #[test]
    fn context_builder() {
        let ctx = LogContext::new("run-123").with_scenario("cover_trend");
        assert_eq!(ctx.run_id, "run-123");
        assert_eq!(ctx.scenario.as_deref(), Some("cover_trend"));
    }
}

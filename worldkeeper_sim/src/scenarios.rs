//! Lifecycle and choreography scenarios for DST.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// DST-001: Pursuer and quarry meet, dwell, and the quarry's coin moves once
    EncounterDwell,

    /// DST-002: Participants never arrive; the safety cap forces resolution
    SafetyCap,

    /// DST-003: An unobserved world is stopped, then revived by a heartbeat
    IdleShutdown,

    /// DST-004: A stalled engine is kicked by the dead-engine sweep
    DeadEngine,

    /// DST-005: A developer-stopped world ignores heartbeats and sweeps
    DeveloperStop,

    /// DST-006: Many random credits and encounters; money is conserved
    LedgerConservation,

    /// DST-007: Humans join, get accounts, and leave
    JoinBackfill,

    /// DST-008: A burst of inputs is applied exactly once, in order
    InputOrdering,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::EncounterDwell,
            ScenarioId::SafetyCap,
            ScenarioId::IdleShutdown,
            ScenarioId::DeadEngine,
            ScenarioId::DeveloperStop,
            ScenarioId::LedgerConservation,
            ScenarioId::JoinBackfill,
            ScenarioId::InputOrdering,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::EncounterDwell => "encounter_dwell",
            ScenarioId::SafetyCap => "safety_cap",
            ScenarioId::IdleShutdown => "idle_shutdown",
            ScenarioId::DeadEngine => "dead_engine",
            ScenarioId::DeveloperStop => "developer_stop",
            ScenarioId::LedgerConservation => "ledger_conservation",
            ScenarioId::JoinBackfill => "join_backfill",
            ScenarioId::InputOrdering => "input_ordering",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::EncounterDwell => "Pursuit to a shared tile, 10s dwell, one transfer, relocation",
            ScenarioId::SafetyCap => "Unreachable destination, forced resolution after 60 checks",
            ScenarioId::IdleShutdown => "No heartbeats past the idle timeout, then one heartbeat",
            ScenarioId::DeadEngine => "Engine clock frozen past twice the step period",
            ScenarioId::DeveloperStop => "stoppedByDeveloper survives heartbeats and sweeps",
            ScenarioId::LedgerConservation => "Random credits and back-to-back encounters",
            ScenarioId::JoinBackfill => "Human join, join fee, leave",
            ScenarioId::InputOrdering => "Hundreds of inputs from interleaved submitters",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "encounter_dwell" | "encounter" | "dst-001" => Ok(ScenarioId::EncounterDwell),
            "safety_cap" | "safetycap" | "dst-002" => Ok(ScenarioId::SafetyCap),
            "idle_shutdown" | "idle" | "dst-003" => Ok(ScenarioId::IdleShutdown),
            "dead_engine" | "deadengine" | "dst-004" => Ok(ScenarioId::DeadEngine),
            "developer_stop" | "developerstop" | "dst-005" => Ok(ScenarioId::DeveloperStop),
            "ledger_conservation" | "ledger" | "dst-006" => Ok(ScenarioId::LedgerConservation),
            "join_backfill" | "join" | "dst-007" => Ok(ScenarioId::JoinBackfill),
            "input_ordering" | "inputs" | "dst-008" => Ok(ScenarioId::InputOrdering),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
            assert_eq!(scenario.to_string(), scenario.name());
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!("DST-004".parse::<ScenarioId>(), Ok(ScenarioId::DeadEngine));
        assert_eq!("ledger".parse::<ScenarioId>(), Ok(ScenarioId::LedgerConservation));
        assert!("time_warp".parse::<ScenarioId>().is_err());
    }
}

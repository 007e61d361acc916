use thiserror::Error;

use crate::state::BotState;

/// Everything the core can report. None of these are fatal: each variant is
/// logged where it is produced and the caller falls back to a safe state.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("config: {0}")]
    Config(String),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("world query `{query}` failed: {source:#}")]
    Query {
        query: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("runtime anomaly: {0}")]
    Anomaly(#[from] AnomalyKind),
}

/// A state-machine request that was rejected. The state is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("bot is already running")]
    AlreadyRunning,
    #[error("cannot start outside of {zone} (current area: {area})")]
    OutsideZone { zone: String, area: String },
    #[error("cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: BotState,
    },
}

/// What a watchdog checker saw when it tripped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnomalyKind {
    #[error("inventory unchanged for {stalled_ms}ms")]
    InventoryStalled { stalled_ms: u128 },
    #[error("tool changed: started with {expected:?}, now holding {found:?}")]
    ToolChanged { expected: String, found: String },
    #[error("orientation jumped: yaw={yaw:.2} pitch={pitch:.2} (delta yaw={delta_yaw:.2} pitch={delta_pitch:.2})")]
    OrientationJump {
        yaw: f32,
        pitch: f32,
        delta_yaw: f32,
        delta_pitch: f32,
    },
}

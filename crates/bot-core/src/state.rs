use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum BotState {
    Stopped,
    Paused,
    Running,
}

impl fmt::Display for BotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BotState::Stopped => "Stopped",
            BotState::Paused => "Paused",
            BotState::Running => "Running",
        };
        f.write_str(name)
    }
}

/// Counters that scope scheduled actions.
///
/// `generation` moves on every state transition; `run` moves only when a new
/// run begins (entering Running from anything other than a resume).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Epoch {
    pub generation: u64,
    pub run: u64,
}

/// How the machine entered its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// A fresh run: FollowState and ArmState must be rebuilt.
    NewRun,
    Resumed,
    Left,
}

#[derive(Debug, Clone)]
pub struct StateMachine {
    state: BotState,
    previous: BotState,
    epoch: Epoch,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self {
            state: BotState::Stopped,
            previous: BotState::Stopped,
            epoch: Epoch::default(),
        }
    }
}

impl StateMachine {
    pub fn state(&self) -> BotState {
        self.state
    }

    pub fn previous(&self) -> BotState {
        self.previous
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn is_running(&self) -> bool {
        self.state == BotState::Running
    }

    /// Moves to `next`, bumping the epoch. Returns how the new state was entered.
    ///
    /// Self-transitions still bump the generation so that anything scheduled
    /// against the old state is dropped.
    pub fn transition(&mut self, next: BotState) -> Entry {
        self.previous = self.state;
        self.state = next;
        self.epoch.generation = self.epoch.generation.wrapping_add(1);

        let entry = match (self.previous, next) {
            (BotState::Paused, BotState::Running) => Entry::Resumed,
            (_, BotState::Running) => Entry::NewRun,
            _ => Entry::Left,
        };
        if entry == Entry::NewRun {
            self.epoch.run = self.epoch.run.wrapping_add(1);
        }
        entry
    }

    /// Starts a new run even when coming from Paused (an explicit `start`).
    pub fn begin_run(&mut self) {
        self.previous = self.state;
        self.state = BotState::Running;
        self.epoch.generation = self.epoch.generation.wrapping_add(1);
        self.epoch.run = self.epoch.run.wrapping_add(1);
    }
}

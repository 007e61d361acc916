use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::input::Key;
use crate::maintenance::MaintenanceStep;
use crate::path::geometry::Direction;
use crate::path::route::RouteName;
use crate::state::Epoch;

/// One-shot work the bot has promised to do later.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduledAction {
    ReleaseKey(Key),
    PressDirection(Direction),
    ReleaseDirection(Direction),
    /// Follower settle delay elapsed: reposition and tap crouch.
    SettleFollow,
    /// Follower may start ticking again.
    ResumeTicking,
    /// Route exhausted: reposition before looping.
    RestartRoute,
    StartFollowing(RouteName),
    FinishStop,
    BeginEvacuation,
    PostEvacuationAttack,
    Disconnect,
    CaptureBaselines,
    EnableReapply,
    StopBot,
    Maintenance(MaintenanceStep),
}

/// Lifetime of a scheduled action relative to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Dropped as soon as the state changes.
    Generation(u64),
    /// Dropped when a new run starts; survives pause/resume.
    Run(u64),
    /// Always fires.
    Detached,
}

impl Scope {
    pub fn is_live(&self, epoch: Epoch) -> bool {
        match *self {
            Scope::Generation(g) => g == epoch.generation,
            Scope::Run(r) => r == epoch.run,
            Scope::Detached => true,
        }
    }
}

#[derive(Debug, Clone)]
struct Pending {
    scope: Scope,
    action: ScheduledAction,
}

/// Delay queue ordered by due time, then by insertion order.
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BTreeMap<(Instant, u64), Pending>,
    seq: u64,
}

impl Scheduler {
    pub fn schedule(&mut self, now: Instant, delay: Duration, scope: Scope, action: ScheduledAction) {
        let key = (now + delay, self.seq);
        self.seq = self.seq.wrapping_add(1);
        self.queue.insert(key, Pending { scope, action });
    }

    /// Pops the earliest due action that is still live under `epoch`.
    ///
    /// Stale entries met on the way are discarded. The epoch is passed per call
    /// because an action fired earlier in the same drain may have changed it.
    pub fn pop_due(&mut self, now: Instant, epoch: Epoch) -> Option<ScheduledAction> {
        loop {
            let (&key, _) = self.queue.first_key_value()?;
            if key.0 > now {
                return None;
            }
            let pending = self.queue.remove(&key)?;
            if pending.scope.is_live(epoch) {
                return Some(pending.action);
            }
            debug!("scheduler.dropped_stale action={:?}", pending.action);
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.queue.first_key_value().map(|(k, _)| k.0)
    }

    pub fn contains(&self, action: &ScheduledAction) -> bool {
        self.queue.values().any(|p| &p.action == action)
    }
}

//! Consumable upkeep: when the status timer reads depleted, pause, swap to the
//! consumable, use it, swap back and resume.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::context::BotContext;
use crate::input::Key;

const USE_HOLD: Duration = Duration::from_millis(500);

/// Steps of one reapply sequence. `return_slot` is the hotbar slot held when
/// the sequence began.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceStep {
    SwitchToConsumable { return_slot: u8 },
    Apply { return_slot: u8 },
    SwitchBack { return_slot: u8 },
    Resume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Next(MaintenanceStep, Duration),
    /// Sequence over (finished or aborted); resume the bot.
    Resume,
}

/// Whether a reapply is due now. Does not touch any state.
pub fn should_reapply(ctx: &BotContext, now: Instant) -> bool {
    let hazard = &ctx.hazard;
    if !hazard.reapply_enabled || !ctx.machine.is_running() || !ctx.in_zone() {
        return false;
    }
    if hazard.consumable_timer != ctx.config.status.depleted_sentinel {
        return false;
    }
    let interval = Duration::from_millis(ctx.config.reapply_interval_ms);
    hazard
        .last_reapply
        .is_none_or(|at| now.saturating_duration_since(at) >= interval)
}

/// Starts a sequence if one is due. Returns the first step and its delay; the
/// caller pauses the bot and schedules it.
pub fn begin(ctx: &mut BotContext, now: Instant) -> Option<(MaintenanceStep, Duration)> {
    if !should_reapply(ctx, now) {
        return None;
    }

    let item = ctx.config.consumable_item.clone();
    if ctx.find_in_hotbar(&item).is_none() {
        info!("maintenance.disabled reason=not_in_hotbar item={item:?}");
        ctx.hazard.reapply_enabled = false;
        return None;
    }

    ctx.hazard.last_reapply = Some(now);
    let return_slot = ctx.held_slot();
    let delay = ctx.jitter.between(200, 500);
    info!("maintenance.begin item={item:?} return_slot={return_slot}");
    Some((MaintenanceStep::SwitchToConsumable { return_slot }, delay))
}

/// Performs `step` and says what comes next.
pub fn advance(step: MaintenanceStep, ctx: &mut BotContext, now: Instant) -> Outcome {
    match step {
        MaintenanceStep::SwitchToConsumable { return_slot } => {
            let item = ctx.config.consumable_item.clone();
            let Some(slot) = ctx.find_in_hotbar(&item) else {
                warn!("maintenance.abort reason=item_vanished item={item:?}");
                ctx.hazard.reapply_enabled = false;
                return Outcome::Resume;
            };
            ctx.input.set_held_slot(slot);
            debug!("maintenance.switched slot={slot}");
            Outcome::Next(MaintenanceStep::Apply { return_slot }, ctx.jitter.between(543, 843))
        }
        MaintenanceStep::Apply { return_slot } => {
            ctx.input.tap(Key::Use, USE_HOLD, now, &mut ctx.scheduler);
            info!("maintenance.applied");
            Outcome::Next(
                MaintenanceStep::SwitchBack { return_slot },
                ctx.jitter.between(552, 852),
            )
        }
        MaintenanceStep::SwitchBack { return_slot } => {
            ctx.input.set_held_slot(return_slot);
            Outcome::Next(MaintenanceStep::Resume, ctx.jitter.between(452, 752))
        }
        MaintenanceStep::Resume => Outcome::Resume,
    }
}

//! Anomaly watchdog: two-phase arming plus four checkers sharing one latch.
//!
//! On entering Running the phase is `Idle`. The first watch tick moves it to
//! `Resetting` and schedules the baseline capture; the capture arms the
//! checkers. Nothing is compared before that, and leaving Running drops the
//! phase back to `Idle` at once.

pub mod hazard;
pub mod inventory;
pub mod orientation;
pub mod tool;

use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::context::BotContext;
use crate::error::{AnomalyKind, BotError};
use crate::scheduler::ScheduledAction;

use hazard::HazardChecker;
use inventory::InventoryChecker;
use orientation::OrientationChecker;
use tool::{ToolChecker, tool_label};

const REAPPLY_AFTER_ARM: Duration = Duration::from_millis(2_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmPhase {
    Idle,
    Resetting,
    Armed,
}

/// How the bot should react to a tripped checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Schedule a stop (500–2000ms).
    Stop,
    /// Stop following and run the evacuation route.
    Evacuate,
}

#[derive(Debug, Clone)]
pub struct Watchdog {
    phase: ArmPhase,
    latch: bool,
    inventory: InventoryChecker,
    tool: ToolChecker,
    orientation: OrientationChecker,
    hazard: HazardChecker,
}

impl Watchdog {
    pub fn new(ctx: &BotContext) -> Self {
        let cfg = &ctx.config;
        Self {
            phase: ArmPhase::Idle,
            latch: false,
            inventory: InventoryChecker::new(Duration::from_millis(cfg.inventory_stall_ms)),
            tool: ToolChecker::default(),
            orientation: OrientationChecker::new(cfg.orientation_tolerance_deg),
            hazard: HazardChecker::new(Duration::from_millis(cfg.hazard_alarm_cooldown_ms)),
        }
    }

    pub fn phase(&self) -> ArmPhase {
        self.phase
    }

    pub fn is_armed(&self) -> bool {
        self.phase == ArmPhase::Armed
    }

    pub fn latch_raised(&self) -> bool {
        self.latch
    }

    pub fn tool_baseline(&self) -> Option<&str> {
        self.tool.baseline()
    }

    /// Fresh run: record the starting tool. The hazard cooldown carries over.
    pub fn begin_run(&mut self, ctx: &BotContext) {
        self.phase = ArmPhase::Idle;
        self.latch = false;
        let label = ctx
            .try_held_item_name()
            .map(|held| tool_label(held.as_deref()));
        self.tool.reset(label);
    }

    pub fn disarm(&mut self) {
        if self.phase != ArmPhase::Idle {
            debug!("watchdog.disarm from={:?}", self.phase);
        }
        self.phase = ArmPhase::Idle;
    }

    /// One watchdog tick. Returns a verdict when a checker trips.
    pub fn tick(&mut self, ctx: &mut BotContext, now: Instant) -> Option<Verdict> {
        if !ctx.machine.is_running() {
            self.disarm();
            return None;
        }

        match self.phase {
            ArmPhase::Idle => {
                self.phase = ArmPhase::Resetting;
                let delay = ctx.jitter.between(3_000, 5_000);
                let scope = ctx.generation_scope();
                ctx.schedule(now, delay, scope, ScheduledAction::CaptureBaselines);
                debug!("watchdog.resetting capture_in_ms={}", delay.as_millis());
                None
            }
            ArmPhase::Resetting => None,
            ArmPhase::Armed => self.run_checks(ctx, now),
        }
    }

    /// Captures every baseline and arms the checkers.
    pub fn capture_baselines(&mut self, ctx: &mut BotContext, now: Instant) {
        self.inventory.reset(ctx.inventory(), now);
        let label = ctx
            .try_held_item_name()
            .map(|held| tool_label(held.as_deref()));
        self.tool.reset(label);
        self.orientation.reset(ctx.facing());
        self.latch = false;
        self.phase = ArmPhase::Armed;

        let scope = ctx.generation_scope();
        ctx.schedule(now, REAPPLY_AFTER_ARM, scope, ScheduledAction::EnableReapply);
        info!("watchdog.armed tool={}", self.tool.baseline().unwrap_or("?"));
    }

    fn gate(&self, ctx: &BotContext) -> bool {
        ctx.in_zone() && !self.latch && self.is_armed()
    }

    fn run_checks(&mut self, ctx: &mut BotContext, now: Instant) -> Option<Verdict> {
        if self.gate(ctx)
            && let Some(kind) = self.inventory.check(ctx.inventory(), now)
        {
            return Some(self.trip(ctx, kind, Verdict::Stop));
        }

        if self.gate(ctx) {
            let current = tool_label(ctx.held_item_name().as_deref());
            if let Some(kind) = self.tool.check(current) {
                let verdict = if ctx.evacuate_on_failure {
                    Verdict::Evacuate
                } else {
                    Verdict::Stop
                };
                return Some(self.trip(ctx, kind, verdict));
            }
        }

        if self.gate(ctx)
            && let Some(kind) = self.orientation.check(ctx.facing())
        {
            return Some(self.trip(ctx, kind, Verdict::Stop));
        }

        if self.gate(ctx) {
            let count = ctx.hazard.count;
            let threshold = ctx.hazard.min_threshold;
            if self.hazard.check(count, threshold, now) {
                warn!("watchdog.hazard count={count} threshold={threshold}");
                ctx.play_hazard_alarm();
            }
        }
        None
    }

    fn trip(&mut self, ctx: &mut BotContext, kind: AnomalyKind, verdict: Verdict) -> Verdict {
        self.latch = true;
        let err = BotError::from(kind);
        error!("watchdog.tripped verdict={verdict:?} {err}");
        ctx.play_stop_alarm();
        verdict
    }
}

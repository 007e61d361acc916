//! start / pause / resume / stop.
//!
//! Each request has a `try_*` form that reports why it was refused and a
//! plain form that logs the refusal and returns `false`. Refused requests
//! never change state.

use std::time::Instant;

use tracing::{info, warn};

use crate::bot::Bot;
use crate::error::{BotError, TransitionError};
use crate::path::follower::PathFollower;
use crate::path::route::RouteName;
use crate::state::BotState;

fn report(result: Result<(), TransitionError>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            warn!("bot.request_rejected {}", BotError::from(err));
            false
        }
    }
}

impl Bot {
    pub fn start(&mut self, route: RouteName, now: Instant) -> bool {
        report(self.try_start(route, now))
    }

    pub fn pause(&mut self, now: Instant) -> bool {
        report(self.try_pause(now))
    }

    pub fn resume(&mut self, now: Instant) -> bool {
        report(self.try_resume(now))
    }

    pub fn stop(&mut self, now: Instant) -> bool {
        report(self.try_stop(now))
    }

    /// Begins a new run on `route`. From Paused this discards the paused run.
    pub fn try_start(&mut self, route: RouteName, _now: Instant) -> Result<(), TransitionError> {
        if self.ctx.machine.is_running() {
            return Err(TransitionError::AlreadyRunning);
        }
        self.ctx.refresh_status();
        if !self.ctx.in_zone() {
            return Err(TransitionError::OutsideZone {
                zone: self.ctx.config.zone_name.clone(),
                area: self.ctx.readings.area_label().to_string(),
            });
        }

        self.follower = PathFollower::new(route);
        self.watchdog.begin_run(&self.ctx);

        let from = self.ctx.machine.state();
        if from == BotState::Paused {
            self.ctx.input.release_all();
            self.ctx.machine.begin_run();
        } else {
            self.ctx.machine.transition(BotState::Running);
        }
        info!(
            "bot.state from={from} to={} route={route} tool={}",
            BotState::Running,
            self.watchdog.tool_baseline().unwrap_or("?")
        );
        Ok(())
    }

    pub fn try_pause(&mut self, _now: Instant) -> Result<(), TransitionError> {
        let state = self.ctx.machine.state();
        if state != BotState::Running {
            return Err(TransitionError::InvalidState {
                action: "pause",
                state,
            });
        }
        self.leave_running();
        self.enter(BotState::Paused);
        Ok(())
    }

    /// Continues the paused run where it left off.
    pub fn try_resume(&mut self, now: Instant) -> Result<(), TransitionError> {
        let state = self.ctx.machine.state();
        if state != BotState::Paused {
            return Err(TransitionError::InvalidState {
                action: "resume",
                state,
            });
        }
        self.enter(BotState::Running);
        self.follower.rearm(&mut self.ctx, now);
        Ok(())
    }

    pub fn try_stop(&mut self, now: Instant) -> Result<(), TransitionError> {
        let state = self.ctx.machine.state();
        if state == BotState::Stopped {
            return Err(TransitionError::InvalidState {
                action: "stop",
                state,
            });
        }
        self.leave_running();
        self.ctx.hazard.reapply_enabled = false;
        self.enter(BotState::Stopped);
        self.follower.stop(&mut self.ctx, now);
        self.ctx.set_overlay(false);
        Ok(())
    }
}

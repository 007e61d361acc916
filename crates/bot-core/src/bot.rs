use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::command::{Command, HELP};
use crate::config::BotConfig;
use crate::context::BotContext;
use crate::input::Key;
use crate::jitter::Jitter;
use crate::maintenance::{self, Outcome};
use crate::path::follower::{FollowerSignal, PathFollower};
use crate::path::route::{RouteName, RouteSource};
use crate::scheduler::ScheduledAction;
use crate::state::BotState;
use crate::watchdog::{Verdict, Watchdog};
use crate::world::Clients;

const POST_EVACUATION_ATTACK_HOLD: Duration = Duration::from_millis(100);

/// The automation core. The host calls [`Bot::tick`] at its own cadence and
/// forwards operator commands through [`Bot::execute`].
pub struct Bot {
    pub(crate) ctx: BotContext,
    pub(crate) follower: PathFollower,
    pub(crate) watchdog: Watchdog,
    pub(crate) routes: Box<dyn RouteSource>,
    last_watch: Option<Instant>,
}

impl Bot {
    pub fn new(config: BotConfig, clients: Clients, routes: Box<dyn RouteSource>) -> Self {
        let ctx = BotContext::new(config, clients, Jitter::default());
        let watchdog = Watchdog::new(&ctx);
        Self {
            ctx,
            follower: PathFollower::new(RouteName::Primary),
            watchdog,
            routes,
            last_watch: None,
        }
    }

    /// Replaces the delay source, e.g. with a seeded one.
    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.ctx.jitter = jitter;
        self
    }

    pub fn state(&self) -> BotState {
        self.ctx.machine.state()
    }

    pub fn previous_state(&self) -> BotState {
        self.ctx.machine.previous()
    }

    pub fn context(&self) -> &BotContext {
        &self.ctx
    }

    pub fn follower(&self) -> &PathFollower {
        &self.follower
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    pub fn is_armed(&self) -> bool {
        self.watchdog.is_armed()
    }

    pub fn latch_raised(&self) -> bool {
        self.watchdog.latch_raised()
    }

    pub fn held_keys(&self) -> Vec<Key> {
        self.ctx.input.held().collect()
    }

    pub fn reapply_enabled(&self) -> bool {
        self.ctx.hazard.reapply_enabled
    }

    pub fn scheduled(&self, action: &ScheduledAction) -> bool {
        self.ctx.scheduler.contains(action)
    }

    /// One host tick: due actions, status refresh, follower step, then the
    /// watchdog tick when its interval has elapsed.
    pub fn tick(&mut self, now: Instant) {
        self.run_due(now);
        self.ctx.refresh_status();

        if self.ctx.machine.is_running() {
            if self.follower.is_idle() {
                self.follower.start_following(&mut self.ctx, self.routes.as_ref(), now);
            } else if let Some(signal) = self.follower.step(&mut self.ctx, now) {
                self.on_follower_signal(signal, now);
            }
        }

        let interval = Duration::from_millis(self.ctx.config.watch_interval_ms);
        let due = self
            .last_watch
            .is_none_or(|at| now.saturating_duration_since(at) >= interval);
        if due {
            self.last_watch = Some(now);
            self.watch_tick(now);
        }
    }

    fn watch_tick(&mut self, now: Instant) {
        if self.ctx.machine.is_running()
            && let Some((step, delay)) = maintenance::begin(&mut self.ctx, now)
        {
            self.pause(now);
            let scope = self.ctx.generation_scope();
            self.ctx.schedule(now, delay, scope, ScheduledAction::Maintenance(step));
        }

        match self.watchdog.tick(&mut self.ctx, now) {
            Some(Verdict::Stop) => {
                let delay = self.ctx.jitter.between(500, 2_000);
                let scope = self.ctx.run_scope();
                self.ctx.schedule(now, delay, scope, ScheduledAction::StopBot);
            }
            Some(Verdict::Evacuate) => {
                self.follower.request_evacuation();
                self.follower.stop(&mut self.ctx, now);
            }
            None => {}
        }
    }

    fn run_due(&mut self, now: Instant) {
        while let Some(action) = self.ctx.scheduler.pop_due(now, self.ctx.machine.epoch()) {
            self.dispatch(action, now);
        }
    }

    fn dispatch(&mut self, action: ScheduledAction, now: Instant) {
        debug!("scheduler.fire action={action:?}");
        match action {
            ScheduledAction::ReleaseKey(key) => self.ctx.input.release(key),
            ScheduledAction::PostEvacuationAttack => {
                self.ctx
                    .input
                    .tap(Key::Attack, POST_EVACUATION_ATTACK_HOLD, now, &mut self.ctx.scheduler);
            }
            ScheduledAction::Disconnect => {
                info!("bot.disconnect");
                self.ctx.input.disconnect();
            }
            ScheduledAction::CaptureBaselines => {
                if self.ctx.machine.is_running() {
                    self.watchdog.capture_baselines(&mut self.ctx, now);
                }
            }
            ScheduledAction::EnableReapply => {
                debug!("maintenance.reapply_enabled");
                self.ctx.hazard.reapply_enabled = true;
            }
            ScheduledAction::StopBot => {
                self.stop(now);
            }
            ScheduledAction::Maintenance(step) => match maintenance::advance(step, &mut self.ctx, now) {
                Outcome::Next(next, delay) => {
                    let scope = self.ctx.generation_scope();
                    self.ctx.schedule(now, delay, scope, ScheduledAction::Maintenance(next));
                }
                Outcome::Resume => {
                    self.resume(now);
                }
            },
            follower_action => {
                if let Some(signal) =
                    self.follower
                        .handle(follower_action, &mut self.ctx, self.routes.as_ref(), now)
                {
                    self.on_follower_signal(signal, now);
                }
            }
        }
    }

    fn on_follower_signal(&mut self, signal: FollowerSignal, now: Instant) {
        match signal {
            FollowerSignal::Finished => {
                if self.state() != BotState::Stopped {
                    self.leave_running();
                    self.enter(BotState::Stopped);
                }
            }
            FollowerSignal::EvacuationComplete => self.post_evacuation(now),
        }
    }

    /// Teardown after the evacuation route: stop, one stray swing, and
    /// optionally drop the connection a while later.
    fn post_evacuation(&mut self, now: Instant) {
        self.leave_running();
        self.ctx.set_overlay(false);
        self.enter(BotState::Stopped);

        // Run-scoped: a new start drops both.
        let scope = self.ctx.run_scope();
        let attack = self.ctx.jitter.between(300, 1_000);
        self.ctx.schedule(now, attack, scope, ScheduledAction::PostEvacuationAttack);
        if self.ctx.config.disconnect_after_evacuation {
            let disconnect = self.ctx.jitter.between(17_000, 29_000);
            self.ctx.schedule(now, disconnect, scope, ScheduledAction::Disconnect);
            info!("bot.post_evacuation disconnect_in_ms={}", disconnect.as_millis());
        }
    }

    /// First, synchronous part of any pause or stop.
    pub(crate) fn leave_running(&mut self) {
        self.ctx.input.release_all();
        self.follower.halt_input();
        self.watchdog.disarm();
    }

    pub(crate) fn enter(&mut self, next: BotState) {
        let from = self.ctx.machine.state();
        self.ctx.machine.transition(next);
        info!("bot.state from={from} to={next}");
    }

    /// Runs one operator command. Returns whether it took effect.
    pub fn execute(&mut self, command: Command, now: Instant) -> bool {
        info!("bot.command {command:?}");
        match command {
            Command::Start(route) => self.start(route, now),
            Command::Pause => self.pause(now),
            Command::Resume => self.resume(now),
            Command::Stop => self.stop(now),
            Command::SetMinHazardCount(n) => {
                self.ctx.hazard.min_threshold = n;
                info!("bot.min_hazard_count value={n}");
                true
            }
            Command::ToggleOverlay => {
                let visible = !self.ctx.overlay_visible;
                self.ctx.set_overlay(visible);
                true
            }
            Command::ToggleRouteEditor => {
                let visible = !self.ctx.route_editor_visible;
                self.ctx.set_route_editor(visible);
                true
            }
            Command::ToggleEvacuation => {
                self.ctx.evacuate_on_failure = !self.ctx.evacuate_on_failure;
                info!("bot.evacuate_on_failure value={}", self.ctx.evacuate_on_failure);
                true
            }
            Command::Help => {
                for line in HELP.lines() {
                    info!("{line}");
                }
                true
            }
        }
    }

    /// Parses and runs a text command; parse errors are logged.
    pub fn execute_line(&mut self, line: &str, now: Instant) -> bool {
        match line.parse::<Command>() {
            Ok(command) => self.execute(command, now),
            Err(err) => {
                warn!("bot.command_rejected {err}");
                false
            }
        }
    }
}

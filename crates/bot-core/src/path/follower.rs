use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::geometry::{Direction, has_arrived, select_directions};
use super::route::{Route, RouteName, RouteSource, Waypoint};
use crate::context::BotContext;
use crate::input::Key;
use crate::scheduler::{ScheduledAction, Scope};
use crate::world::Vec3;

const TICKING_AFTER_SETTLE: Duration = Duration::from_millis(300);

/// What the bot has to do after a follower step or action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowerSignal {
    /// Follow ended; move the bot to Stopped.
    Finished,
    /// Last evacuation waypoint reached; run the post-evacuation teardown.
    EvacuationComplete,
}

/// Replays one route at a time and turns position error into key presses.
///
/// Every field here is per run: the bot builds a fresh follower on each new
/// run and drops it on stop.
#[derive(Debug, Clone)]
pub struct PathFollower {
    route_name: RouteName,
    route: Route,
    index: usize,
    held: BTreeSet<Direction>,
    waiting: bool,
    evacuating: bool,
    following: bool,
    stop_pending: bool,
    restart_pending: bool,
    evacuation_requested: bool,
    /// Our outstanding generation-scoped action, re-armed on resume.
    pending: Option<(ScheduledAction, Duration)>,
}

impl PathFollower {
    pub fn new(route_name: RouteName) -> Self {
        Self {
            route_name,
            route: Route::new(),
            index: 0,
            held: BTreeSet::new(),
            waiting: true,
            evacuating: false,
            following: false,
            stop_pending: false,
            restart_pending: false,
            evacuation_requested: false,
            pending: None,
        }
    }

    pub fn route_name(&self) -> RouteName {
        self.route_name
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn held_directions(&self) -> &BTreeSet<Direction> {
        &self.held
    }

    pub fn is_following(&self) -> bool {
        self.following
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    pub fn is_evacuating(&self) -> bool {
        self.evacuating
    }

    pub fn is_stop_pending(&self) -> bool {
        self.stop_pending
    }

    /// Not following, no loop restart in flight and no evacuation underway.
    pub fn is_idle(&self) -> bool {
        !self.following && !self.restart_pending && !self.evacuating
    }

    fn restart_live(&self) -> bool {
        self.restart_pending && !self.evacuating && !self.evacuation_requested
    }

    fn schedule_own(&mut self, ctx: &mut BotContext, now: Instant, delay: Duration, action: ScheduledAction) {
        let scope = ctx.generation_scope();
        ctx.schedule(now, delay, scope, action.clone());
        self.pending = Some((action, delay));
    }

    pub fn start_following(&mut self, ctx: &mut BotContext, routes: &dyn RouteSource, now: Instant) -> bool {
        if !ctx.machine.is_running() || self.following || !ctx.in_zone() {
            debug!(
                "follower.start_skipped running={} following={} area={}",
                ctx.machine.is_running(),
                self.following,
                ctx.readings.area_label()
            );
            return false;
        }

        self.route = routes.load_route(self.route_name);
        self.index = 0;
        self.held.clear();
        self.following = true;
        self.waiting = true;
        self.restart_pending = false;

        let base = ctx.jitter.between(400, 600);
        let settle = ctx.jitter.with_occasional_pause(base, 0.5);
        self.schedule_own(ctx, now, settle, ScheduledAction::SettleFollow);
        info!(
            "follower.start route={} points={} settle_ms={}",
            self.route_name,
            self.route.len(),
            settle.as_millis()
        );
        true
    }

    /// One movement tick. Only called while the bot is Running.
    pub fn step(&mut self, ctx: &mut BotContext, now: Instant) -> Option<FollowerSignal> {
        if !self.following || self.waiting {
            return None;
        }

        if self.index >= self.route.len() {
            if self.route.is_empty() {
                warn!("follower.empty_route route={}", self.route_name);
            }
            self.stop(ctx, now);
            return None;
        }

        if !ctx.in_zone() && !self.evacuating {
            warn!(
                "follower.left_zone area={} zone={}",
                ctx.readings.area_label(),
                ctx.config.zone_name
            );
            self.stop(ctx, now);
            ctx.play_stop_alarm();
            return None;
        }

        let position = ctx.position();
        let mut target = self.route[self.index];
        if has_arrived(position, target, ctx.config.arrival_tolerance) {
            self.index += 1;
            info!("follower.arrived index={}/{}", self.index, self.route.len());

            if self.index >= self.route.len() {
                return self.finish_route(ctx, now);
            }
            target = self.route[self.index];
        }

        ctx.input.hold(Key::Attack);
        ctx.input.hold(Key::Sprint);
        self.steer(ctx, now, position, target);
        None
    }

    fn finish_route(&mut self, ctx: &mut BotContext, now: Instant) -> Option<FollowerSignal> {
        self.following = false;
        self.held.clear();

        if self.evacuating {
            self.evacuating = false;
            ctx.input.release_all();
            info!("follower.evacuation_complete");
            return Some(FollowerSignal::EvacuationComplete);
        }

        self.route_name = RouteName::Primary;
        self.restart_pending = true;
        self.waiting = true;
        let base = ctx.jitter.between(400, 600);
        let delay = ctx.jitter.with_occasional_pause(base, 0.2);
        self.schedule_own(ctx, now, delay, ScheduledAction::RestartRoute);
        info!("follower.loop route={} restart_ms={}", self.route_name, delay.as_millis());
        None
    }

    fn steer(&mut self, ctx: &mut BotContext, now: Instant, position: Vec3, target: Waypoint) {
        let facing = ctx.facing();
        let dx = f64::from(target.x) - position.x;
        let dz = f64::from(target.z) - position.z;
        let wanted = select_directions(facing.yaw, dx, dz);

        for dir in Direction::ALL {
            match (self.held.contains(&dir), wanted.contains(&dir)) {
                (true, false) => {
                    if self.evacuating {
                        ctx.input.release(dir.key());
                    } else {
                        let delay = ctx.jitter.between(50, 150);
                        ctx.schedule(now, delay, Scope::Detached, ScheduledAction::ReleaseDirection(dir));
                    }
                }
                (false, true) => {
                    if self.evacuating {
                        ctx.input.press(dir.key());
                    } else {
                        let delay = ctx.jitter.between(100, 260);
                        let scope = ctx.generation_scope();
                        ctx.schedule(now, delay, scope, ScheduledAction::PressDirection(dir));
                    }
                }
                _ => {}
            }
        }
        self.held = wanted;
    }

    /// Asks the next stop to launch the evacuation route instead of stopping.
    pub fn request_evacuation(&mut self) {
        self.evacuation_requested = true;
    }

    /// Winds the follow down after a short delay. A second call while one is
    /// already in flight is ignored.
    pub fn stop(&mut self, ctx: &mut BotContext, now: Instant) {
        if self.stop_pending {
            debug!("follower.stop_already_pending");
            return;
        }
        self.stop_pending = true;
        self.waiting = true;
        let delay = ctx.jitter.between(400, 1_400);
        self.schedule_own(ctx, now, delay, ScheduledAction::FinishStop);
        debug!("follower.stop_scheduled delay_ms={}", delay.as_millis());
    }

    /// Forgets held directions. The caller has already released the keys.
    pub fn halt_input(&mut self) {
        self.held.clear();
    }

    /// Re-schedules the outstanding action dropped by a pause.
    pub fn rearm(&mut self, ctx: &mut BotContext, now: Instant) {
        if let Some((action, delay)) = self.pending.take() {
            debug!("follower.rearm action={action:?}");
            self.schedule_own(ctx, now, delay, action);
        }
    }

    /// Handles a fired follower action.
    pub fn handle(
        &mut self,
        action: ScheduledAction,
        ctx: &mut BotContext,
        routes: &dyn RouteSource,
        now: Instant,
    ) -> Option<FollowerSignal> {
        if self.pending.as_ref().is_some_and(|(a, _)| *a == action) {
            self.pending = None;
        }

        match action {
            ScheduledAction::PressDirection(dir) => {
                if self.following && !self.waiting && self.held.contains(&dir) {
                    ctx.input.press(dir.key());
                } else {
                    debug!("follower.press_dropped dir={dir:?}");
                }
            }
            ScheduledAction::ReleaseDirection(dir) => {
                if !self.held.contains(&dir) {
                    ctx.input.release(dir.key());
                }
            }
            ScheduledAction::SettleFollow => {
                ctx.reposition_to_zone();
                self.held.clear();
                let hold = ctx.jitter.between(200, 700);
                ctx.input.tap(Key::Sneak, hold, now, &mut ctx.scheduler);
                self.schedule_own(ctx, now, TICKING_AFTER_SETTLE, ScheduledAction::ResumeTicking);
                if self.route.is_empty() {
                    warn!("follower.empty_route route={}", self.route_name);
                } else {
                    info!("follower.following route={} points={}", self.route_name, self.route.len());
                }
            }
            ScheduledAction::ResumeTicking => {
                self.waiting = false;
            }
            ScheduledAction::RestartRoute => {
                if !self.restart_live() {
                    debug!("follower.restart_dropped");
                    return None;
                }
                ctx.reposition_to_zone();
                self.held.clear();
                let delay = ctx.jitter.between(1_000, 1_400);
                self.schedule_own(ctx, now, delay, ScheduledAction::StartFollowing(self.route_name));
            }
            ScheduledAction::StartFollowing(name) => {
                if !self.restart_live() {
                    debug!("follower.restart_dropped route={name}");
                    return None;
                }
                self.restart_pending = false;
                self.route_name = name;
                self.start_following(ctx, routes, now);
            }
            ScheduledAction::FinishStop => return self.finish_stop(ctx, now),
            ScheduledAction::BeginEvacuation => {
                self.route_name = RouteName::Evacuation;
                self.route = routes.load_route(RouteName::Evacuation);
                self.index = 0;
                self.held.clear();
                self.evacuating = true;
                self.following = true;
                self.waiting = false;
                info!("follower.evacuating points={}", self.route.len());
            }
            other => warn!("follower.unexpected_action action={other:?}"),
        }
        None
    }

    fn finish_stop(&mut self, ctx: &mut BotContext, now: Instant) -> Option<FollowerSignal> {
        self.stop_pending = false;
        ctx.input.release_all();
        self.held.clear();

        if self.evacuation_requested && ctx.machine.is_running() {
            self.evacuation_requested = false;
            self.restart_pending = false;
            // Owns the follower from here; a queued loop restart must not fire.
            self.evacuating = true;
            ctx.evacuate_on_failure = false;
            ctx.reposition_to_hub();
            let delay = ctx.jitter.between(300, 500);
            self.schedule_own(ctx, now, delay, ScheduledAction::BeginEvacuation);
            info!("follower.evacuation_launch delay_ms={}", delay.as_millis());
            return None;
        }

        if !self.following {
            warn!("follower.stop_without_route");
            return None;
        }
        self.following = false;
        info!("follower.stopped route={} index={}", self.route_name, self.index);
        Some(FollowerSignal::Finished)
    }
}

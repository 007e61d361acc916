use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::BotConfig;
use crate::error::BotError;
use crate::input::InputLayer;
use crate::jitter::Jitter;
use crate::scheduler::{ScheduledAction, Scheduler, Scope};
use crate::state::StateMachine;
use crate::world::status::{StatusReadings, parse_status_lines, strip_formatting};
use crate::world::{AlarmClient, Clients, DisplayClient, Facing, ItemStack, Vec3, WorldClient};

/// Hazard readings plus the consumable reapply switches.
#[derive(Debug, Clone)]
pub struct HazardState {
    pub count: u32,
    pub min_threshold: u32,
    pub consumable_timer: String,
    pub reapply_enabled: bool,
    pub last_reapply: Option<Instant>,
}

/// Shared state every component reads and mutates during a tick.
pub struct BotContext {
    pub config: BotConfig,
    pub machine: StateMachine,
    pub input: InputLayer,
    pub scheduler: Scheduler,
    pub jitter: Jitter,
    pub readings: StatusReadings,
    pub hazard: HazardState,
    /// Operator switch: reroute through the evacuation route when the tool
    /// checker trips. Consumed once the evacuation launches.
    pub evacuate_on_failure: bool,
    pub overlay_visible: bool,
    pub route_editor_visible: bool,
    world: Box<dyn WorldClient>,
    display: Box<dyn DisplayClient>,
    alarm: Box<dyn AlarmClient>,
}

impl BotContext {
    pub fn new(config: BotConfig, clients: Clients, jitter: Jitter) -> Self {
        let hazard = HazardState {
            count: 0,
            min_threshold: config.min_hazard_count,
            consumable_timer: StatusReadings::default().consumable_timer,
            reapply_enabled: false,
            last_reapply: None,
        };
        Self {
            evacuate_on_failure: config.evacuate_on_failure,
            config,
            machine: StateMachine::default(),
            input: InputLayer::new(clients.input),
            scheduler: Scheduler::default(),
            jitter,
            readings: StatusReadings::default(),
            hazard,
            overlay_visible: false,
            route_editor_visible: false,
            world: clients.world,
            display: clients.display,
            alarm: clients.alarm,
        }
    }

    pub fn schedule(&mut self, now: Instant, delay: Duration, scope: Scope, action: ScheduledAction) {
        debug!("scheduler.add action={action:?} delay_ms={}", delay.as_millis());
        self.scheduler.schedule(now, delay, scope, action);
    }

    /// Cancelled by the next state transition.
    pub fn generation_scope(&self) -> Scope {
        Scope::Generation(self.machine.epoch().generation)
    }

    /// Cancelled only when a new run starts.
    pub fn run_scope(&self) -> Scope {
        Scope::Run(self.machine.epoch().run)
    }

    pub fn in_zone(&self) -> bool {
        self.readings.in_zone(&self.config.zone_name)
    }

    fn query<T>(&self, name: &'static str, result: anyhow::Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(source) => {
                let err = BotError::Query { query: name, source };
                warn!("world.query_failed {err}");
                None
            }
        }
    }

    /// Position rounded to whole blocks; origin if the query fails.
    pub fn position(&self) -> Vec3 {
        self.query("position", self.world.position())
            .map(|p| Vec3 {
                x: p.x.round(),
                y: p.y.round(),
                z: p.z.round(),
            })
            .unwrap_or_default()
    }

    pub fn facing(&self) -> Facing {
        self.query("facing", self.world.facing()).unwrap_or_default()
    }

    pub fn inventory(&self) -> Vec<Option<ItemStack>> {
        self.query("inventory", self.world.inventory()).unwrap_or_default()
    }

    /// `None` when the query itself failed; `Some(None)` for an empty hand.
    pub fn try_held_item_name(&self) -> Option<Option<String>> {
        self.query("held_item_name", self.world.held_item_name())
    }

    pub fn held_item_name(&self) -> Option<String> {
        self.try_held_item_name().flatten()
    }

    pub fn held_slot(&self) -> u8 {
        self.query("held_slot", self.world.held_slot()).unwrap_or(0)
    }

    /// Re-reads the status lines into `readings` and the hazard fields.
    pub fn refresh_status(&mut self) {
        let lines = self
            .query("status_lines", self.world.status_lines())
            .unwrap_or_default();
        let readings = parse_status_lines(&lines, &self.config.status);
        if readings.area != self.readings.area {
            info!(
                "world.area from={} to={}",
                self.readings.area_label(),
                readings.area_label()
            );
        }
        self.hazard.count = readings.hazard_count;
        self.hazard.consumable_timer = readings.consumable_timer.clone();
        self.readings = readings;
    }

    /// Hotbar slot (0–8) holding an item whose plain name contains `needle`.
    pub fn find_in_hotbar(&self, needle: &str) -> Option<u8> {
        self.inventory()
            .iter()
            .take(9)
            .position(|slot| {
                slot.as_ref()
                    .is_some_and(|item| strip_formatting(&item.name).contains(needle))
            })
            .and_then(|i| u8::try_from(i).ok())
    }

    /// Releases everything and warps back to the route's start anchor.
    pub fn reposition_to_zone(&mut self) {
        self.input.force_release_all();
        let command = self.config.zone_warp_command.clone();
        self.input.run_command(&command);
    }

    pub fn reposition_to_hub(&mut self) {
        self.input.force_release_all();
        let command = self.config.hub_warp_command.clone();
        self.input.run_command(&command);
    }

    pub fn play_stop_alarm(&mut self) {
        let sound = self.config.alarm_sound.clone();
        self.play_alarm(&sound);
    }

    pub fn play_hazard_alarm(&mut self) {
        let sound = self.config.hazard_sound.clone();
        self.play_alarm(&sound);
    }

    fn play_alarm(&mut self, sound: &str) {
        let repeats = self.config.alarm_repeats;
        info!("alarm.play sound={sound} repeats={repeats}");
        if let Err(err) = self.alarm.play_alarm(sound, repeats) {
            warn!("alarm.failed sound={sound} err={err:#}");
        }
    }

    pub fn set_overlay(&mut self, visible: bool) {
        self.overlay_visible = visible;
        if let Err(err) = self.display.set_overlay_visible(visible) {
            warn!("display.overlay_failed visible={visible} err={err:#}");
        }
    }

    pub fn set_route_editor(&mut self, visible: bool) {
        self.route_editor_visible = visible;
        if let Err(err) = self.display.set_route_editor_visible(visible) {
            warn!("display.route_editor_failed visible={visible} err={err:#}");
        }
    }
}

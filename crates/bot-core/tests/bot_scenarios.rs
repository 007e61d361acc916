use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use farmbot_core::world::{
    AlarmClient, Clients, DisplayClient, Facing, InputClient, ItemStack, Vec3, WorldClient,
};
use farmbot_core::{Bot, BotConfig, BotState, Command, Jitter, RouteName, RouteSet, Waypoint};

const TICK: Duration = Duration::from_millis(50);

#[derive(Default)]
struct HostState {
    position: Vec3,
    facing: Facing,
    inventory: Vec<Option<ItemStack>>,
    held_item: Option<String>,
    held_slot: u8,
    lines: Vec<String>,
    fail_queries: bool,
    pressed: BTreeSet<String>,
    overlay: bool,
    events: Vec<String>,
    alarms: Vec<String>,
}

/// One shared fake standing in for every host capability.
#[derive(Clone, Default)]
struct FakeHost(Arc<Mutex<HostState>>);

impl FakeHost {
    fn in_garden() -> Self {
        let host = FakeHost::default();
        {
            let mut s = host.0.lock().unwrap();
            s.lines = vec!["§bArea: §aGarden".to_string(), " Alive: 0".to_string()];
            s.held_item = Some("§6Euclid's Wheat Hoe".to_string());
            s.inventory = vec![Some(item(1, "Euclid's Wheat Hoe", 1)), None, None];
        }
        host
    }

    fn clients(&self) -> Clients {
        Clients {
            world: Box::new(self.clone()),
            input: Box::new(self.clone()),
            display: Box::new(self.clone()),
            alarm: Box::new(self.clone()),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut HostState) -> R) -> R {
        f(&mut self.0.lock().unwrap())
    }

    fn events(&self) -> Vec<String> {
        self.with(|s| s.events.clone())
    }

    fn alarms(&self) -> Vec<String> {
        self.with(|s| s.alarms.clone())
    }

    /// Bumps the last slot so the inventory checker sees progress.
    fn harvest(&self) {
        self.with(|s| {
            let next = match s.inventory.last().cloned().flatten() {
                Some(stack) => stack.stack_size % 64 + 1,
                None => 1,
            };
            if let Some(last) = s.inventory.last_mut() {
                *last = Some(item(296, "Wheat", next));
            }
        });
    }

    fn read<T>(&self, f: impl FnOnce(&HostState) -> T) -> anyhow::Result<T> {
        let s = self.0.lock().unwrap();
        if s.fail_queries {
            anyhow::bail!("host not ready");
        }
        Ok(f(&s))
    }
}

fn item(id: u32, name: &str, stack_size: u32) -> ItemStack {
    ItemStack {
        id,
        name: name.to_string(),
        stack_size,
    }
}

impl WorldClient for FakeHost {
    fn position(&self) -> anyhow::Result<Vec3> {
        self.read(|s| s.position)
    }
    fn facing(&self) -> anyhow::Result<Facing> {
        self.read(|s| s.facing)
    }
    fn inventory(&self) -> anyhow::Result<Vec<Option<ItemStack>>> {
        self.read(|s| s.inventory.clone())
    }
    fn held_item_name(&self) -> anyhow::Result<Option<String>> {
        self.read(|s| s.held_item.clone())
    }
    fn status_lines(&self) -> anyhow::Result<Vec<String>> {
        self.read(|s| s.lines.clone())
    }
    fn held_slot(&self) -> anyhow::Result<u8> {
        self.read(|s| s.held_slot)
    }
}

impl InputClient for FakeHost {
    fn press(&mut self, key: &str) -> anyhow::Result<()> {
        self.with(|s| {
            s.pressed.insert(key.to_string());
            s.events.push(format!("press {key}"));
        });
        Ok(())
    }
    fn release(&mut self, key: &str) -> anyhow::Result<()> {
        self.with(|s| {
            if s.pressed.remove(key) {
                s.events.push(format!("release {key}"));
            }
        });
        Ok(())
    }
    fn set_held_slot(&mut self, slot: u8) -> anyhow::Result<()> {
        self.with(|s| {
            s.held_slot = slot;
            s.events.push(format!("slot {slot}"));
        });
        Ok(())
    }
    fn run_command(&mut self, command: &str) -> anyhow::Result<()> {
        self.with(|s| s.events.push(format!("cmd {command}")));
        Ok(())
    }
    fn disconnect(&mut self) -> anyhow::Result<()> {
        self.with(|s| s.events.push("disconnect".to_string()));
        Ok(())
    }
}

impl DisplayClient for FakeHost {
    fn set_overlay_visible(&mut self, visible: bool) -> anyhow::Result<()> {
        self.with(|s| s.overlay = visible);
        Ok(())
    }
    fn set_route_editor_visible(&mut self, _visible: bool) -> anyhow::Result<()> {
        Ok(())
    }
}

impl AlarmClient for FakeHost {
    fn play_alarm(&mut self, sound: &str, _max_repeats: u32) -> anyhow::Result<()> {
        self.with(|s| s.alarms.push(sound.to_string()));
        Ok(())
    }
}

struct Sim {
    host: FakeHost,
    bot: Bot,
    now: Instant,
    harvesting: bool,
}

impl Sim {
    fn new(host: FakeHost, routes: RouteSet) -> Self {
        let bot = Bot::new(BotConfig::default(), host.clients(), Box::new(routes))
            .with_jitter(Jitter::seeded(7));
        Self {
            host,
            bot,
            now: Instant::now(),
            harvesting: true,
        }
    }

    fn far_route() -> RouteSet {
        RouteSet {
            primary: vec![Waypoint::new(0, 4, 40), Waypoint::new(20, 4, 40)],
            evacuation: vec![Waypoint::new(-30, 70, 0)],
            ..RouteSet::default()
        }
    }

    fn tick(&mut self) {
        self.now += TICK;
        if self.harvesting {
            self.host.harvest();
        }
        self.bot.tick(self.now);
    }

    fn run_for(&mut self, duration: Duration) {
        let end = self.now + duration;
        while self.now < end {
            self.tick();
        }
    }

    /// Ticks until `pred` holds; returns the elapsed time.
    fn run_until(&mut self, limit: Duration, mut pred: impl FnMut(&Bot) -> bool) -> Option<Duration> {
        let start = self.now;
        while self.now.duration_since(start) < limit {
            self.tick();
            if pred(&self.bot) {
                return Some(self.now.duration_since(start));
            }
        }
        None
    }

    fn start(&mut self) {
        let now = self.now;
        assert!(self.bot.start(RouteName::Primary, now));
    }

    fn arm(&mut self) {
        self.run_until(Duration::from_secs(8), |b| b.is_armed())
            .expect("watchdog never armed");
    }
}

#[test]
fn stop_while_stopped_is_rejected() {
    let mut sim = Sim::new(FakeHost::in_garden(), Sim::far_route());
    let now = sim.now;
    assert!(!sim.bot.stop(now));
    assert_eq!(sim.bot.state(), BotState::Stopped);
    assert!(!sim.bot.pause(now));
    assert!(!sim.bot.resume(now));
}

#[test]
fn start_outside_zone_is_rejected() {
    let host = FakeHost::in_garden();
    host.with(|s| s.lines = vec!["Area: Hub".to_string()]);
    let mut sim = Sim::new(host, Sim::far_route());
    let now = sim.now;
    assert!(!sim.bot.start(RouteName::Primary, now));
    assert_eq!(sim.bot.state(), BotState::Stopped);

    sim.run_for(Duration::from_secs(2));
    assert!(sim.host.events().is_empty());
}

#[test]
fn second_start_reports_already_running() {
    let mut sim = Sim::new(FakeHost::in_garden(), Sim::far_route());
    sim.start();
    let now = sim.now;
    assert!(!sim.bot.start(RouteName::Secondary, now));
    assert_eq!(sim.bot.follower().route_name(), RouteName::Primary);
}

#[test]
fn follows_route_holding_attack_and_sprint() {
    let mut sim = Sim::new(FakeHost::in_garden(), Sim::far_route());
    sim.start();
    sim.run_for(Duration::from_secs(4));

    let events = sim.host.events();
    assert!(events.contains(&"cmd warp garden".to_string()));
    assert!(events.contains(&"press key.sneak".to_string()));
    let pressed = sim.host.with(|s| s.pressed.clone());
    assert!(pressed.contains("key.attack"));
    assert!(pressed.contains("key.sprint"));
    // Facing yaw 0, target straight ahead in +z.
    assert!(pressed.contains("key.forward"));
    assert!(!pressed.contains("key.back"));
}

#[test]
fn pause_releases_keys_before_returning() {
    let mut sim = Sim::new(FakeHost::in_garden(), Sim::far_route());
    sim.start();
    sim.run_for(Duration::from_secs(4));
    assert!(!sim.bot.held_keys().is_empty());

    let now = sim.now;
    assert!(sim.bot.pause(now));
    assert_eq!(sim.bot.state(), BotState::Paused);
    assert!(sim.bot.held_keys().is_empty());
    assert!(sim.host.with(|s| s.pressed.is_empty()));
    assert!(!sim.bot.is_armed());

    // Nothing presses while paused.
    sim.run_for(Duration::from_secs(3));
    assert!(sim.host.with(|s| s.pressed.is_empty()));

    let now = sim.now;
    assert!(sim.bot.resume(now));
    assert_eq!(sim.bot.previous_state(), BotState::Paused);
    sim.run_for(Duration::from_secs(1));
    assert!(sim.host.with(|s| s.pressed.contains("key.forward")));
}

#[test]
fn resume_keeps_route_progress() {
    let host = FakeHost::in_garden();
    let mut sim = Sim::new(host, Sim::far_route());
    sim.start();
    sim.run_for(Duration::from_secs(4));
    sim.host.with(|s| s.position = Vec3 { x: 0.0, y: 4.0, z: 40.0 });
    sim.run_for(Duration::from_millis(200));
    assert_eq!(sim.bot.follower().index(), 1);

    let now = sim.now;
    sim.bot.pause(now);
    sim.bot.resume(now);
    sim.run_for(Duration::from_millis(200));
    assert_eq!(sim.bot.follower().index(), 1);
}

#[test]
fn checks_wait_for_baselines() {
    let mut sim = Sim::new(FakeHost::in_garden(), Sim::far_route());
    sim.start();

    // Spin the camera every tick during the first three seconds.
    for i in 0..60 {
        sim.host.with(|s| s.facing.yaw = (i * 37 % 360) as f32);
        sim.tick();
        assert!(!sim.bot.is_armed());
    }
    assert!(!sim.bot.latch_raised());
    assert!(sim.host.alarms().is_empty());

    sim.arm();
    sim.run_for(Duration::from_secs(2));
    assert!(!sim.bot.latch_raised());
    assert_eq!(sim.bot.state(), BotState::Running);
}

#[test]
fn stalled_inventory_latches_once_and_stops() {
    let mut sim = Sim::new(FakeHost::in_garden(), Sim::far_route());
    sim.start();
    sim.arm();
    sim.harvesting = false;

    sim.run_until(Duration::from_secs(6), |b| b.latch_raised())
        .expect("stall never detected");
    let stopped_after = sim
        .run_until(Duration::from_secs(3), |b| {
            assert!(b.latch_raised() || b.state() == BotState::Stopped);
            b.state() == BotState::Stopped
        })
        .expect("bot never stopped");
    assert!(stopped_after <= Duration::from_millis(2_000) + TICK);
    assert_eq!(sim.host.alarms(), vec!["levelUp.ogg".to_string()]);
    assert!(sim.host.with(|s| s.pressed.is_empty()));
    assert!(!sim.bot.reapply_enabled());
}

#[test]
fn hazard_alarm_rings_once_per_window() {
    let mut sim = Sim::new(FakeHost::in_garden(), Sim::far_route());
    sim.start();
    sim.arm();

    sim.host.with(|s| s.lines[1] = " Alive: 5".to_string());
    sim.run_for(Duration::from_secs(3));
    sim.host.with(|s| s.lines[1] = " Alive: 0".to_string());
    sim.run_for(Duration::from_secs(2));
    sim.host.with(|s| s.lines[1] = " Alive: 7".to_string());
    sim.run_for(Duration::from_secs(3));

    assert_eq!(sim.host.alarms(), vec!["softAlert.ogg".to_string()]);
    assert!(!sim.bot.latch_raised());
    assert_eq!(sim.bot.state(), BotState::Running);
}

#[test]
fn threshold_is_adjustable() {
    let mut sim = Sim::new(FakeHost::in_garden(), Sim::far_route());
    let now = sim.now;
    assert!(sim.bot.execute(Command::SetMinHazardCount(9), now));
    sim.start();
    sim.arm();
    sim.host.with(|s| s.lines[1] = " Alive: 5".to_string());
    sim.run_for(Duration::from_secs(3));
    assert!(sim.host.alarms().is_empty());
}

#[test]
fn tool_swap_with_evacuation_runs_the_evacuation_route() {
    let mut sim = Sim::new(FakeHost::in_garden(), Sim::far_route());
    let now = sim.now;
    assert!(sim.bot.execute_line("toggle-evacuation", now));
    sim.start();
    sim.arm();

    sim.host.with(|s| s.held_item = Some("Stick".to_string()));
    sim.run_until(Duration::from_secs(2), |b| b.latch_raised())
        .expect("tool swap never detected");
    assert_eq!(sim.host.alarms(), vec!["levelUp.ogg".to_string()]);

    sim.run_until(Duration::from_secs(3), |b| b.follower().is_evacuating())
        .expect("evacuation never started");
    assert!(sim.host.events().contains(&"cmd warp hub".to_string()));
    assert_eq!(sim.bot.state(), BotState::Running);

    sim.host.with(|s| {
        s.lines[0] = "Area: Hub".to_string();
        s.position = Vec3 { x: -30.0, y: 70.0, z: 0.0 };
    });
    sim.run_until(Duration::from_secs(1), |b| b.state() == BotState::Stopped)
        .expect("evacuation never finished");
    assert!(!sim.host.with(|s| s.overlay));

    sim.run_for(Duration::from_secs(30));
    let events = sim.host.events();
    assert_eq!(events.last().map(String::as_str), Some("disconnect"));
    assert!(sim.host.with(|s| s.pressed.is_empty()));
}

#[test]
fn restart_after_evacuation_cancels_the_pending_disconnect() {
    let mut sim = Sim::new(FakeHost::in_garden(), Sim::far_route());
    let now = sim.now;
    assert!(sim.bot.execute_line("toggle-evacuation", now));
    sim.start();
    sim.arm();

    sim.host.with(|s| s.held_item = Some("Stick".to_string()));
    sim.run_until(Duration::from_secs(5), |b| b.follower().is_evacuating())
        .expect("evacuation never started");
    sim.host.with(|s| {
        s.lines[0] = "Area: Hub".to_string();
        s.position = Vec3 { x: -30.0, y: 70.0, z: 0.0 };
    });
    sim.run_until(Duration::from_secs(1), |b| b.state() == BotState::Stopped)
        .expect("evacuation never finished");

    // Back in the garden well inside the disconnect window.
    sim.host.with(|s| {
        s.lines[0] = "Area: Garden".to_string();
        s.held_item = Some("Euclid's Wheat Hoe".to_string());
    });
    sim.run_for(Duration::from_secs(2));
    sim.start();
    sim.run_for(Duration::from_secs(30));

    assert!(!sim.host.events().contains(&"disconnect".to_string()));
    assert_eq!(sim.bot.state(), BotState::Running);
}

#[test]
fn tool_swap_without_evacuation_stops() {
    let mut sim = Sim::new(FakeHost::in_garden(), Sim::far_route());
    sim.start();
    sim.arm();
    sim.host.with(|s| s.held_item = None);
    sim.run_until(Duration::from_secs(4), |b| b.state() == BotState::Stopped)
        .expect("bot never stopped");
    assert!(!sim.host.events().contains(&"cmd warp hub".to_string()));
}

#[test]
fn depleted_consumable_is_reapplied() {
    let host = FakeHost::in_garden();
    host.with(|s| {
        s.lines.push(" Repellent: §cNone".to_string());
        s.inventory = vec![
            Some(item(1, "Euclid's Wheat Hoe", 1)),
            None,
            Some(item(399, "§aPest Repellent", 3)),
            None,
        ];
    });
    let mut sim = Sim::new(host, Sim::far_route());
    sim.start();
    sim.arm();

    sim.run_until(Duration::from_secs(4), |b| b.state() == BotState::Paused)
        .expect("maintenance never paused the bot");
    sim.run_until(Duration::from_secs(4), |b| b.state() == BotState::Running)
        .expect("maintenance never resumed the bot");

    let events = sim.host.events();
    let seq: Vec<&str> = events
        .iter()
        .map(String::as_str)
        .filter(|e| e.starts_with("slot") || e.ends_with("key.use"))
        .collect();
    assert_eq!(seq, vec!["slot 2", "press key.use", "release key.use", "slot 0"]);

    // Not again within the interval, even though the timer still reads None.
    sim.run_for(Duration::from_secs(10));
    assert_eq!(
        sim.host.events().iter().filter(|e| *e == "press key.use").count(),
        1
    );
}

#[test]
fn missing_consumable_disables_reapply() {
    let host = FakeHost::in_garden();
    host.with(|s| s.lines.push(" Repellent: None".to_string()));
    let mut sim = Sim::new(host, Sim::far_route());
    sim.start();
    sim.arm();
    sim.run_for(Duration::from_secs(4));

    assert_eq!(sim.bot.state(), BotState::Running);
    assert!(!sim.bot.reapply_enabled());
    assert!(!sim.host.events().iter().any(|e| e.starts_with("slot")));
}

#[test]
fn stop_hides_overlay_and_releases_everything() {
    let mut sim = Sim::new(FakeHost::in_garden(), Sim::far_route());
    let now = sim.now;
    sim.bot.execute(Command::ToggleOverlay, now);
    assert!(sim.host.with(|s| s.overlay));

    sim.start();
    sim.run_for(Duration::from_secs(4));
    let now = sim.now;
    assert!(sim.bot.stop(now));
    assert!(sim.host.with(|s| s.pressed.is_empty()));
    assert!(!sim.host.with(|s| s.overlay));

    sim.run_for(Duration::from_secs(3));
    assert_eq!(sim.bot.state(), BotState::Stopped);
    assert!(sim.host.with(|s| s.pressed.is_empty()));

    // A fresh run starts from the first waypoint again.
    sim.start();
    assert_eq!(sim.bot.follower().index(), 0);
}

#[test]
fn failed_queries_fall_back_without_panicking() {
    let mut sim = Sim::new(FakeHost::in_garden(), Sim::far_route());
    sim.start();
    sim.run_for(Duration::from_secs(1));
    sim.host.with(|s| s.fail_queries = true);
    sim.run_for(Duration::from_secs(2));
    // Status lines are gone, so the bot considers itself out of the zone.
    assert!(!sim.bot.context().in_zone());
}

use std::collections::BTreeSet;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::scheduler::{ScheduledAction, Scheduler, Scope};
use crate::world::InputClient;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Forward,
    Back,
    Left,
    Right,
    Attack,
    Sprint,
    Sneak,
    Use,
}

impl Key {
    pub const ALL: [Key; 8] = [
        Key::Forward,
        Key::Back,
        Key::Left,
        Key::Right,
        Key::Attack,
        Key::Sprint,
        Key::Sneak,
        Key::Use,
    ];

    /// Binding name understood by the host.
    pub fn name(self) -> &'static str {
        match self {
            Key::Forward => "key.forward",
            Key::Back => "key.back",
            Key::Left => "key.left",
            Key::Right => "key.right",
            Key::Attack => "key.attack",
            Key::Sprint => "key.sprint",
            Key::Sneak => "key.sneak",
            Key::Use => "key.use",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Owns every simulated key press. Host errors are logged and swallowed; the
/// held set always reflects what we asked for, so `release_all` still covers a
/// key whose press failed halfway.
pub struct InputLayer {
    client: Box<dyn InputClient>,
    held: BTreeSet<Key>,
}

impl InputLayer {
    pub fn new(client: Box<dyn InputClient>) -> Self {
        Self {
            client,
            held: BTreeSet::new(),
        }
    }

    pub fn press(&mut self, key: Key) {
        if let Err(err) = self.client.press(key.name()) {
            warn!("input.press_failed key={key} err={err:#}");
        }
        self.held.insert(key);
    }

    /// Presses `key` unless it is already held.
    pub fn hold(&mut self, key: Key) {
        if !self.held.contains(&key) {
            self.press(key);
        }
    }

    pub fn release(&mut self, key: Key) {
        self.held.remove(&key);
        if let Err(err) = self.client.release(key.name()) {
            warn!("input.release_failed key={key} err={err:#}");
        }
    }

    /// Presses now and schedules the release. The release is detached so it
    /// fires even if the bot stops in between.
    pub fn tap(&mut self, key: Key, hold: Duration, now: Instant, scheduler: &mut Scheduler) {
        self.press(key);
        scheduler.schedule(now, hold, Scope::Detached, ScheduledAction::ReleaseKey(key));
    }

    /// Releases every key we believe is held.
    pub fn release_all(&mut self) {
        let held = std::mem::take(&mut self.held);
        if !held.is_empty() {
            debug!("input.release_all count={}", held.len());
        }
        for key in held {
            if let Err(err) = self.client.release(key.name()) {
                warn!("input.release_failed key={key} err={err:#}");
            }
        }
    }

    /// Releases every known binding, held or not.
    pub fn force_release_all(&mut self) {
        self.held.clear();
        for key in Key::ALL {
            if let Err(err) = self.client.release(key.name()) {
                warn!("input.release_failed key={key} err={err:#}");
            }
        }
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn held(&self) -> impl Iterator<Item = Key> + '_ {
        self.held.iter().copied()
    }

    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    pub fn set_held_slot(&mut self, slot: u8) {
        if let Err(err) = self.client.set_held_slot(slot) {
            warn!("input.set_held_slot_failed slot={slot} err={err:#}");
        }
    }

    pub fn run_command(&mut self, command: &str) {
        debug!("input.command {command:?}");
        if let Err(err) = self.client.run_command(command) {
            warn!("input.command_failed command={command:?} err={err:#}");
        }
    }

    pub fn disconnect(&mut self) {
        if let Err(err) = self.client.disconnect() {
            warn!("input.disconnect_failed err={err:#}");
        }
    }
}

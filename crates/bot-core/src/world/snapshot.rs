use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use super::client::WorldClient;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Camera orientation in degrees, host convention (yaw 0 faces +z).
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Default)]
pub struct Facing {
    pub yaw: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ItemStack {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    pub stack_size: u32,
}

impl ItemStack {
    /// Identity used by the inventory checker; the display name is ignored.
    pub fn same_stack(&self, other: &ItemStack) -> bool {
        self.id == other.id && self.stack_size == other.stack_size
    }
}

/// Everything the core reads from the host in one tick.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct WorldSnapshot {
    pub position: Vec3,
    #[serde(default)]
    pub facing: Facing,
    #[serde(default)]
    pub inventory: Vec<Option<ItemStack>>,
    #[serde(default)]
    pub held_item: Option<String>,
    #[serde(default)]
    pub held_slot: u8,
    #[serde(default)]
    pub status_lines: Vec<String>,
}

/// `WorldClient` over the most recent snapshot pushed by the host.
///
/// Queries fail until the first snapshot arrives, and again whenever the host
/// clears it (e.g. after a failed fetch).
#[derive(Debug, Clone, Default)]
pub struct SnapshotWorld {
    latest: Arc<Mutex<Option<WorldSnapshot>>>,
}

impl SnapshotWorld {
    pub fn replace(&self, snapshot: Option<WorldSnapshot>) {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = snapshot;
        }
    }

    fn read<T>(&self, f: impl FnOnce(&WorldSnapshot) -> T) -> anyhow::Result<T> {
        let latest = self
            .latest
            .lock()
            .map_err(|_| anyhow::anyhow!("snapshot lock poisoned"))?;
        let snapshot = latest
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no snapshot received"))?;
        Ok(f(snapshot))
    }
}

impl WorldClient for SnapshotWorld {
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
        self.read(|s| s.status_lines.clone())
    }

    fn held_slot(&self) -> anyhow::Result<u8> {
        self.read(|s| s.held_slot)
    }
}

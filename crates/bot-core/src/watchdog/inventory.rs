use std::time::{Duration, Instant};

use crate::error::AnomalyKind;
use crate::world::ItemStack;

/// Trips when the inventory stops changing, which means nothing is being
/// harvested anymore.
#[derive(Debug, Clone)]
pub struct InventoryChecker {
    baseline: Vec<Option<ItemStack>>,
    last_change: Option<Instant>,
    stall: Duration,
}

impl InventoryChecker {
    pub fn new(stall: Duration) -> Self {
        Self {
            baseline: Vec::new(),
            last_change: None,
            stall,
        }
    }

    pub fn reset(&mut self, inventory: Vec<Option<ItemStack>>, now: Instant) {
        self.baseline = inventory;
        self.last_change = Some(now);
    }

    pub fn check(&mut self, inventory: Vec<Option<ItemStack>>, now: Instant) -> Option<AnomalyKind> {
        if differs(&self.baseline, &inventory) {
            self.baseline = inventory;
            self.last_change = Some(now);
            return None;
        }

        let since = *self.last_change.get_or_insert(now);
        let stalled = now.saturating_duration_since(since);
        (stalled > self.stall).then(|| AnomalyKind::InventoryStalled {
            stalled_ms: stalled.as_millis(),
        })
    }
}

fn differs(before: &[Option<ItemStack>], after: &[Option<ItemStack>]) -> bool {
    before.len() != after.len()
        || before.iter().zip(after).any(|pair| match pair {
            (Some(a), Some(b)) => !a.same_stack(b),
            (None, None) => false,
            _ => true,
        })
}

use super::snapshot::{Facing, ItemStack, Vec3};

/// Read side of the game host. Every call may fail; the bot substitutes a
/// safe default for the tick and carries on.
pub trait WorldClient: Send {
    fn position(&self) -> anyhow::Result<Vec3>;
    fn facing(&self) -> anyhow::Result<Facing>;
    /// Inventory slots in host order; the first nine are the hotbar.
    fn inventory(&self) -> anyhow::Result<Vec<Option<ItemStack>>>;
    /// Display name of the held item, `None` for an empty hand.
    fn held_item_name(&self) -> anyhow::Result<Option<String>>;
    /// Tab-list style status lines (area, hazard count, consumable timer).
    fn status_lines(&self) -> anyhow::Result<Vec<String>>;
    fn held_slot(&self) -> anyhow::Result<u8>;
}

/// Write side of the game host: virtual keys and a few session actions.
pub trait InputClient: Send {
    fn press(&mut self, key: &str) -> anyhow::Result<()>;
    fn release(&mut self, key: &str) -> anyhow::Result<()>;
    fn set_held_slot(&mut self, slot: u8) -> anyhow::Result<()>;
    /// Sends a chat command, e.g. a warp to reposition the agent.
    fn run_command(&mut self, command: &str) -> anyhow::Result<()>;
    fn disconnect(&mut self) -> anyhow::Result<()>;
}

pub trait DisplayClient: Send {
    fn set_overlay_visible(&mut self, visible: bool) -> anyhow::Result<()>;
    fn set_route_editor_visible(&mut self, visible: bool) -> anyhow::Result<()>;
}

pub trait AlarmClient: Send {
    fn play_alarm(&mut self, sound: &str, max_repeats: u32) -> anyhow::Result<()>;
}

/// The four host capabilities the core depends on.
pub struct Clients {
    pub world: Box<dyn WorldClient>,
    pub input: Box<dyn InputClient>,
    pub display: Box<dyn DisplayClient>,
    pub alarm: Box<dyn AlarmClient>,
}

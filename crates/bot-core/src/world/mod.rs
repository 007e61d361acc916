pub mod client;
pub mod snapshot;
pub mod status;

pub use client::{AlarmClient, Clients, DisplayClient, InputClient, WorldClient};
pub use snapshot::{Facing, ItemStack, SnapshotWorld, Vec3, WorldSnapshot};
pub use status::{StatusReadings, parse_status_lines, strip_formatting};

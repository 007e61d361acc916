//! Automation control core for the farming bot: state controller, route
//! follower, anomaly watchdog and consumable maintenance, all driven by one
//! cooperative tick and a delay queue.
//!
//! The host side (game client bridge, overlay, alarms) is reached only through
//! the narrow traits in [`world::client`], so the whole core runs against fakes
//! in tests.

pub mod bot;
pub mod command;
pub mod config;
pub mod context;
mod controller;
pub mod error;
pub mod input;
pub mod jitter;
pub mod maintenance;
pub mod path;
pub mod scheduler;
pub mod state;
pub mod watchdog;
pub mod world;

pub use bot::Bot;
pub use command::{Command, CommandParseError};
pub use config::{BotConfig, ConfigLoader};
pub use error::{AnomalyKind, BotError, TransitionError};
pub use jitter::Jitter;
pub use path::route::{RouteName, RouteSet, RouteSource, RouteStore, Waypoint};
pub use state::BotState;

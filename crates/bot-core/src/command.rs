use std::str::FromStr;

use thiserror::Error;

use crate::path::route::RouteName;

pub const HELP: &str = "\
commands:
  start [primary|secondary|evacuation]  start following a route (default primary)
  pause                                 pause and release all keys
  resume                                resume a paused run
  stop                                  stop the bot
  set-min-hazard-count <n>              hazard count that sounds the alarm
  toggle-overlay                        show/hide the status overlay
  toggle-route-editor                   show/hide the route editor
  toggle-evacuation                     reroute through the evacuation route on tool failure
  help                                  this text";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start(RouteName),
    Pause,
    Resume,
    Stop,
    SetMinHazardCount(u32),
    ToggleOverlay,
    ToggleRouteEditor,
    ToggleEvacuation,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0:?} (try `help`)")]
    Unknown(String),
    #[error("{command}: {reason}")]
    BadArgument { command: &'static str, reason: String },
}

impl FromStr for Command {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let verb = parts.next().ok_or(CommandParseError::Empty)?;
        let arg = parts.next();

        let cmd = match verb.to_ascii_lowercase().as_str() {
            "start" => {
                let route = match arg {
                    Some(raw) => raw.parse::<RouteName>().map_err(|reason| CommandParseError::BadArgument {
                        command: "start",
                        reason,
                    })?,
                    None => RouteName::Primary,
                };
                Command::Start(route)
            }
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "stop" => Command::Stop,
            "set-min-hazard-count" => {
                let raw = arg.ok_or_else(|| CommandParseError::BadArgument {
                    command: "set-min-hazard-count",
                    reason: "missing count".to_string(),
                })?;
                let n = raw.parse::<u32>().map_err(|_| CommandParseError::BadArgument {
                    command: "set-min-hazard-count",
                    reason: format!("not a count: {raw:?}"),
                })?;
                Command::SetMinHazardCount(n)
            }
            "toggle-overlay" => Command::ToggleOverlay,
            "toggle-route-editor" => Command::ToggleRouteEditor,
            "toggle-evacuation" => Command::ToggleEvacuation,
            "help" => Command::Help,
            other => return Err(CommandParseError::Unknown(other.to_string())),
        };
        Ok(cmd)
    }
}

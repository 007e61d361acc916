use crate::config::StatusConfig;

/// Timer text reported when the consumable line is missing entirely.
pub const NOT_ENABLED: &str = "Not Enabled";

/// Removes `§x` formatting codes.
pub fn strip_formatting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '§' {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

/// What the status lines say this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReadings {
    pub area: Option<String>,
    pub hazard_count: u32,
    pub consumable_timer: String,
}

impl Default for StatusReadings {
    fn default() -> Self {
        Self {
            area: None,
            hazard_count: 0,
            consumable_timer: NOT_ENABLED.to_string(),
        }
    }
}

impl StatusReadings {
    pub fn in_zone(&self, zone: &str) -> bool {
        self.area.as_deref() == Some(zone)
    }

    pub fn area_label(&self) -> &str {
        self.area.as_deref().unwrap_or("unknown")
    }
}

pub fn parse_status_lines(lines: &[String], cfg: &StatusConfig) -> StatusReadings {
    let mut readings = StatusReadings::default();
    for raw in lines {
        let line = strip_formatting(raw);
        let line = line.trim_start();

        if let Some(rest) = line.strip_prefix(cfg.area_prefix.as_str()) {
            readings.area = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix(cfg.hazard_prefix.as_str()) {
            // Unparseable counts read as zero rather than tripping the alarm.
            readings.hazard_count = rest.trim().parse().unwrap_or(0);
        } else if let Some(rest) = line.strip_prefix(cfg.consumable_prefix.as_str()) {
            readings.consumable_timer = rest.trim().to_string();
        }
    }
    readings
}

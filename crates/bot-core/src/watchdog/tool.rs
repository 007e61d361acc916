use crate::error::AnomalyKind;
use crate::world::strip_formatting;

/// Plain label for whatever is in hand.
pub fn tool_label(held: Option<&str>) -> String {
    held.map(strip_formatting)
        .unwrap_or_else(|| "None".to_string())
}

#[derive(Debug, Clone, Default)]
pub struct ToolChecker {
    baseline: Option<String>,
}

impl ToolChecker {
    /// `None` leaves the checker to capture on its next call.
    pub fn reset(&mut self, label: Option<String>) {
        self.baseline = label;
    }

    pub fn baseline(&self) -> Option<&str> {
        self.baseline.as_deref()
    }

    pub fn check(&mut self, current: String) -> Option<AnomalyKind> {
        match &self.baseline {
            None => {
                self.baseline = Some(current);
                None
            }
            Some(expected) if *expected != current => Some(AnomalyKind::ToolChanged {
                expected: expected.clone(),
                found: current,
            }),
            Some(_) => None,
        }
    }
}

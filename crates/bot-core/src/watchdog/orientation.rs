use crate::error::AnomalyKind;
use crate::world::Facing;

/// Catches camera jumps between consecutive readings (e.g. a server-side
/// teleport or someone grabbing the mouse).
#[derive(Debug, Clone)]
pub struct OrientationChecker {
    last: Facing,
    tolerance_deg: f32,
}

impl OrientationChecker {
    pub fn new(tolerance_deg: f32) -> Self {
        Self {
            last: Facing::default(),
            tolerance_deg,
        }
    }

    pub fn reset(&mut self, facing: Facing) {
        self.last = facing;
    }

    pub fn check(&mut self, facing: Facing) -> Option<AnomalyKind> {
        let delta_yaw = (facing.yaw - self.last.yaw).abs();
        let delta_pitch = (facing.pitch - self.last.pitch).abs();
        self.last = facing;

        (delta_yaw > self.tolerance_deg || delta_pitch > self.tolerance_deg).then_some(
            AnomalyKind::OrientationJump {
                yaw: facing.yaw,
                pitch: facing.pitch,
                delta_yaw,
                delta_pitch,
            },
        )
    }
}

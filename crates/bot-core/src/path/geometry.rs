use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::route::Waypoint;
use crate::input::Key;
use crate::world::Vec3;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Back,
    Left,
    Right,
}

impl Direction {
    /// Also the tie-break order for `select_directions`: later entries win.
    pub const ALL: [Direction; 4] = [
        Direction::Forward,
        Direction::Back,
        Direction::Left,
        Direction::Right,
    ];

    pub fn key(self) -> Key {
        match self {
            Direction::Forward => Key::Forward,
            Direction::Back => Key::Back,
            Direction::Left => Key::Left,
            Direction::Right => Key::Right,
        }
    }
}

/// World x/z unit vector each direction key moves along at `yaw` degrees.
pub fn direction_vectors(yaw: f32) -> [(Direction, f64, f64); 4] {
    let yaw = f64::from(yaw).rem_euclid(360.0);
    let r = (yaw + 90.0).to_radians();
    let (fx, fz) = (r.cos(), r.sin());
    let (lx, lz) = (-(r + std::f64::consts::FRAC_PI_2).cos(), -(r + std::f64::consts::FRAC_PI_2).sin());
    [
        (Direction::Forward, fx, fz),
        (Direction::Back, -fx, -fz),
        (Direction::Left, lx, lz),
        (Direction::Right, -lx, -lz),
    ]
}

/// Components closer than this count as tied; the later direction wins.
const TIE_EPSILON: f64 = 1e-9;

fn extreme(components: impl Iterator<Item = (Direction, f64)>, want_max: bool) -> Option<Direction> {
    let mut best: Option<(Direction, f64)> = None;
    for (dir, value) in components {
        let better = match best {
            None => true,
            Some((_, b)) if want_max => value >= b - TIE_EPSILON,
            Some((_, b)) => value <= b + TIE_EPSILON,
        };
        if better {
            best = Some((dir, value));
        }
    }
    best.map(|(dir, _)| dir)
}

/// Keys to hold to close the offset `(dx, dz)`: at most one per axis.
pub fn select_directions(yaw: f32, dx: f64, dz: f64) -> BTreeSet<Direction> {
    let vectors = direction_vectors(yaw);
    let mut out = BTreeSet::new();

    if dx != 0.0
        && let Some(dir) = extreme(vectors.iter().map(|&(d, x, _)| (d, x)), dx > 0.0)
    {
        out.insert(dir);
    }
    if dz != 0.0
        && let Some(dir) = extreme(vectors.iter().map(|&(d, _, z)| (d, z)), dz > 0.0)
    {
        out.insert(dir);
    }
    out
}

pub fn distance_2d(position: Vec3, target: Waypoint) -> f64 {
    let dx = f64::from(target.x) - position.x;
    let dz = f64::from(target.z) - position.z;
    (dx * dx + dz * dz).sqrt()
}

pub fn has_arrived(position: Vec3, target: Waypoint, tolerance: f64) -> bool {
    distance_2d(position, target) <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(x: f64, z: f64) -> Vec3 {
        Vec3 { x, y: 4.0, z }
    }

    #[test]
    fn yaw_zero_positive_x_is_left() {
        let dirs = select_directions(0.0, 5.0, 0.0);
        assert_eq!(dirs.into_iter().collect::<Vec<_>>(), vec![Direction::Left]);
    }

    #[test]
    fn yaw_zero_forward_is_positive_z() {
        assert_eq!(
            select_directions(0.0, 0.0, 3.0).into_iter().collect::<Vec<_>>(),
            vec![Direction::Forward]
        );
        assert_eq!(
            select_directions(0.0, -1.0, -1.0),
            BTreeSet::from([Direction::Back, Direction::Right])
        );
    }

    #[test]
    fn facing_west_maps_positive_x_to_back() {
        // Yaw 90 faces -x.
        assert_eq!(
            select_directions(90.0, 2.0, 0.0).into_iter().collect::<Vec<_>>(),
            vec![Direction::Back]
        );
        // Negative yaw normalizes the same as its positive twin.
        assert_eq!(select_directions(-270.0, 2.0, 0.0), select_directions(90.0, 2.0, 0.0));
    }

    #[test]
    fn diagonal_yaw_ties_go_to_the_later_direction() {
        // At yaw 45 back and left share the +x component, forward and left the +z one.
        assert_eq!(
            select_directions(45.0, 1.0, 0.0).into_iter().collect::<Vec<_>>(),
            vec![Direction::Left]
        );
        assert_eq!(
            select_directions(45.0, 0.0, 1.0).into_iter().collect::<Vec<_>>(),
            vec![Direction::Left]
        );
        // A target straight along the diagonal needs a single key, whichever way rounding falls.
        for yaw in [-315.0, 45.0, 405.0] {
            assert_eq!(select_directions(yaw, 1.0, 1.0), BTreeSet::from([Direction::Left]), "yaw={yaw}");
        }
    }

    #[test]
    fn zero_delta_selects_nothing() {
        assert!(select_directions(37.0, 0.0, 0.0).is_empty());
    }

    #[test]
    fn at_most_two_directions() {
        for yaw in (0..360).step_by(15) {
            for (dx, dz) in [(1.0, 1.0), (-1.0, 1.0), (1.0, -1.0), (-1.0, -1.0)] {
                let dirs = select_directions(yaw as f32, dx, dz);
                assert!(!dirs.is_empty() && dirs.len() <= 2, "yaw={yaw} got {dirs:?}");
            }
        }
    }

    #[test]
    fn arrival_is_inclusive_at_half_a_block() {
        let target = Waypoint::new(10, 4, 10);
        assert!(has_arrived(pos(10.5, 10.0), target, 0.5));
        assert!(has_arrived(pos(10.0, 10.0), target, 0.5));
        assert!(!has_arrived(pos(11.0, 10.0), target, 0.5));
        // y is ignored
        assert!(has_arrived(Vec3 { x: 10.0, y: 90.0, z: 10.0 }, target, 0.5));
    }
}

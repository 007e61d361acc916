pub mod follower;
pub mod geometry;
pub mod route;

pub use follower::{FollowerSignal, PathFollower};
pub use geometry::{Direction, select_directions};

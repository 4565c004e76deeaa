use crate::LaneId;
use thiserror::Error;

/// A failure to set up a vehicle's driving agent.
///
/// A vehicle whose setup fails never starts driving.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("lane {0:?} does not exist")]
    UnknownLane(LaneId),
    #[error("lane index {index} is out of range for a lane of {len} nodes")]
    InvalidLaneIndex { index: usize, len: usize },
    #[error("lane {0:?} has no nodes")]
    EmptyLane(LaneId),
}

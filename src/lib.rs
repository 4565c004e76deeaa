pub use autodrive::{
    AutoDrive, AutoDriveContext, AutoDriveSetting, DriveStatus, DrivingMode, DrivingState,
    EndBehaviour, Hazard, NavigationEvent, NavigationMode, StartLocation, Tunables, VehicleType,
};
pub use cgmath;
pub use error::SetupError;
pub use graph::{
    GuideLane, Intersection, Lane, LaneGraph, LaneNode, LaneSide, NodeType, Occupancy, RoadEdge,
    TurnDirection, YieldNode,
};
pub use light::{LightState, TrafficLight};
pub use simulation::{Simulation, Vehicle};
use slotmap::new_key_type;
pub use slotmap::{Key, KeyData};
pub use vehicle::{KinematicVehicle, VehicleAttributes, VehicleControl};

pub mod autodrive;
mod debug;
mod error;
pub mod graph;
mod light;
pub mod math;
mod simulation;
mod vehicle;

new_key_type! {
    /// Unique ID of a [LaneNode].
    pub struct NodeId;
    /// Unique ID of a [Lane].
    pub struct LaneId;
    /// Unique ID of a road, which groups one or more lanes.
    pub struct RoadId;
    /// Unique ID of an [Intersection].
    pub struct IntersectionId;
    /// Unique ID of a [TrafficLight].
    pub struct TrafficLightId;
    /// Unique ID of a vehicle.
    pub struct VehicleId;
}

use super::context::NavigationMode;

/// How much effort a driver spends on smooth braking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DrivingMode {
    /// Cheap kinematic braking distances.
    #[default]
    Performance,
    /// Friction-aware braking distances with a wider safety margin.
    Quality,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VehicleType {
    #[default]
    Car,
    Bus,
    Truck,
}

/// What a driver does upon reaching the end of a road.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EndBehaviour {
    /// Wrap around onto the start of the paired lane.
    #[default]
    Loop,
    /// Stop at the end of the road.
    Stop,
}

/// Tunable parameters of the driving agent.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tunables {
    /// The distance in m to stop short of a hazard.
    pub brake_offset: f64,
    /// The top speed in m/s while recovering from an overshoot.
    pub max_repositioning_speed: f64,
    /// The furthest a vehicle will reverse in m before giving up on its missed target.
    pub max_reverse_distance: f64,
    /// The steering lookahead distance at low speed, in m.
    pub base_lookahead_distance: f64,
    /// The speed in m/s at which the lookahead distance starts growing.
    pub lookahead_speed_divider: f64,
    /// Extra length in m claimed beyond each end of the vehicle.
    pub vehicle_occupancy_offset: f64,
    /// How quickly the steering input follows its target, per second.
    pub rotation_speed: f64,
    /// The top speed in m/s inside intersections.
    pub intersection_speed: f64,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            brake_offset: 2.0,
            max_repositioning_speed: 3.0,
            max_reverse_distance: 15.0,
            base_lookahead_distance: 5.0,
            lookahead_speed_divider: 5.0,
            vehicle_occupancy_offset: 1.0,
            rotation_speed: 8.0,
            intersection_speed: 8.0,
        }
    }
}

/// The fixed configuration of a driving agent.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AutoDriveSetting {
    pub mode: DrivingMode,
    pub vehicle_type: VehicleType,
    pub end_behaviour: EndBehaviour,
    pub navigation_mode: NavigationMode,
    /// The nominal cruising speed in m/s.
    pub speed: f64,
    /// The nominal acceleration in m/s^2, also used as the planning deceleration.
    pub acceleration: f64,
    /// Seeds the agent's random choices; drawn from entropy when absent.
    pub seed: Option<u64>,
    pub tunables: Tunables,
}

impl Default for AutoDriveSetting {
    fn default() -> Self {
        Self {
            mode: DrivingMode::default(),
            vehicle_type: VehicleType::default(),
            end_behaviour: EndBehaviour::default(),
            navigation_mode: NavigationMode::Random,
            speed: 14.0,
            acceleration: 3.0,
            seed: None,
            tunables: Tunables::default(),
        }
    }
}

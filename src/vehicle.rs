pub use self::dynamics::KinematicVehicle;
pub(crate) use self::dynamics::GRAVITY;
use crate::autodrive::VehicleType;
use crate::math::{Point2d, Vector2d};

mod dynamics;

/// The controls and sensors of a vehicle, as seen by a driver.
///
/// Inputs are normalised: steering in `[-1, 1]` (positive turns left),
/// throttle in `[-1, 1]` (negative reverses) and brake in `[0, 1]`.
pub trait VehicleControl {
    /// The world space coordinates of the centre of the vehicle.
    fn position(&self) -> Point2d;
    /// A unit vector aligned with the vehicle's heading.
    fn forward(&self) -> Vector2d;
    /// The signed longitudinal speed in m/s; negative when reversing.
    fn speed(&self) -> f64;
    fn max_speed_forward(&self) -> f64;
    fn max_speed_reverse(&self) -> f64;
    /// The tyre friction coefficient.
    fn tire_friction(&self) -> f64;
    /// The vehicle's length in m.
    fn length(&self) -> f64;

    fn steer_input(&self) -> f64;
    fn set_steer_input(&mut self, steer: f64);
    fn set_throttle_input(&mut self, throttle: f64);
    fn set_brake_input(&mut self, brake: f64);
    fn set_max_speed_forward(&mut self, speed: f64);
    fn set_max_speed_reverse(&mut self, speed: f64);

    /// Instantly moves the vehicle, keeping its speed.
    fn teleport(&mut self, position: Point2d, forward: Vector2d);
}

/// The attributes of a simulated vehicle.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleAttributes {
    /// The vehicle width in m.
    pub width: f64,
    /// The vehicle length in m.
    pub length: f64,
    /// Distance between the front and rear axles in m.
    pub wheel_base: f64,
    /// The maximum acceleration of the vehicle, in m/s^2.
    pub max_acc: f64,
    /// The tyre friction coefficient, which bounds braking.
    pub tire_friction: f64,
    /// The top reversing speed in m/s.
    pub max_speed_reverse: f64,
}

impl Default for VehicleAttributes {
    fn default() -> Self {
        Self {
            width: 2.0,
            length: 4.5,
            wheel_base: 2.7,
            max_acc: 3.0,
            tire_friction: 0.8,
            max_speed_reverse: 5.0,
        }
    }
}

impl VehicleAttributes {
    /// Typical attributes for each kind of vehicle.
    pub fn for_type(vehicle_type: VehicleType) -> Self {
        match vehicle_type {
            VehicleType::Car => Self::default(),
            VehicleType::Bus => Self {
                width: 2.5,
                length: 12.0,
                wheel_base: 6.0,
                max_acc: 1.5,
                tire_friction: 0.7,
                max_speed_reverse: 3.0,
            },
            VehicleType::Truck => Self {
                width: 2.5,
                length: 9.0,
                wheel_base: 5.0,
                max_acc: 1.2,
                tire_friction: 0.7,
                max_speed_reverse: 3.0,
            },
        }
    }
}

use super::{VehicleAttributes, VehicleControl};
use crate::math::{normalize_or, rotate, Point2d, Vector2d};

/// Acceleration due to gravity in m/s^2.
pub(crate) const GRAVITY: f64 = 9.81;

/// The steering angle at full lock, in radians.
const MAX_STEER_ANGLE: f64 = 0.6;

/// Deceleration from rolling resistance when coasting, in m/s^2.
const ROLLING_DECEL: f64 = 0.3;

/// A kinematic bicycle-model vehicle.
///
/// Stands in for a full physics integrator: it honours the driver's inputs
/// and speed limits, and nothing else.
#[derive(Clone, Debug)]
pub struct KinematicVehicle {
    attributes: VehicleAttributes,
    position: Point2d,
    forward: Vector2d,
    /// The signed speed in m/s.
    speed: f64,
    max_speed_forward: f64,
    max_speed_reverse: f64,
    steer: f64,
    throttle: f64,
    brake: f64,
}

impl KinematicVehicle {
    /// Creates a stationary vehicle.
    pub fn new(attributes: &VehicleAttributes, position: Point2d, forward: Vector2d) -> Self {
        Self {
            attributes: *attributes,
            position,
            forward: normalize_or(forward, Vector2d::new(1.0, 0.0)),
            speed: 0.0,
            max_speed_forward: f64::INFINITY,
            max_speed_reverse: attributes.max_speed_reverse,
            steer: 0.0,
            throttle: 0.0,
            brake: 0.0,
        }
    }

    pub fn attributes(&self) -> &VehicleAttributes {
        &self.attributes
    }

    pub fn throttle_input(&self) -> f64 {
        self.throttle
    }

    pub fn brake_input(&self) -> f64 {
        self.brake
    }

    /// Sets the signed speed directly.
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    /// Integrates the vehicle's speed, heading and position.
    ///
    /// # Parameters
    /// * `dt` - The time step in seconds
    pub fn integrate(&mut self, dt: f64) {
        let max_dec = self.attributes.tire_friction * GRAVITY;
        let drive = self.throttle * self.attributes.max_acc;
        let resist = self.brake * max_dec + ROLLING_DECEL;

        // Resistance opposes motion but never reverses it
        let vel = self.speed + dt * drive;
        let slowed = f64::max(vel.abs() - dt * resist, 0.0);
        let vel = if self.throttle.abs() > 0.0 && self.brake == 0.0 {
            vel
        } else {
            slowed.copysign(vel)
        };
        let vel = vel.clamp(-self.max_speed_reverse, self.max_speed_forward);

        // Yaw rate of a kinematic bicycle
        let steer_angle = self.steer.clamp(-1.0, 1.0) * MAX_STEER_ANGLE;
        let avg_vel = 0.5 * (self.speed + vel);
        let yaw_rate = avg_vel * steer_angle.tan() / self.attributes.wheel_base;
        self.forward = rotate(self.forward, yaw_rate * dt);
        self.position += self.forward * (avg_vel * dt);
        self.speed = vel;
    }
}

impl VehicleControl for KinematicVehicle {
    fn position(&self) -> Point2d {
        self.position
    }

    fn forward(&self) -> Vector2d {
        self.forward
    }

    fn speed(&self) -> f64 {
        self.speed
    }

    fn max_speed_forward(&self) -> f64 {
        self.max_speed_forward
    }

    fn max_speed_reverse(&self) -> f64 {
        self.max_speed_reverse
    }

    fn tire_friction(&self) -> f64 {
        self.attributes.tire_friction
    }

    fn length(&self) -> f64 {
        self.attributes.length
    }

    fn steer_input(&self) -> f64 {
        self.steer
    }

    fn set_steer_input(&mut self, steer: f64) {
        self.steer = steer.clamp(-1.0, 1.0);
    }

    fn set_throttle_input(&mut self, throttle: f64) {
        self.throttle = throttle.clamp(-1.0, 1.0);
    }

    fn set_brake_input(&mut self, brake: f64) {
        self.brake = brake.clamp(0.0, 1.0);
    }

    fn set_max_speed_forward(&mut self, speed: f64) {
        self.max_speed_forward = f64::max(speed, 0.0);
    }

    fn set_max_speed_reverse(&mut self, speed: f64) {
        self.max_speed_reverse = f64::max(speed, 0.0);
    }

    fn teleport(&mut self, position: Point2d, forward: Vector2d) {
        self.position = position;
        self.forward = normalize_or(forward, self.forward);
    }
}

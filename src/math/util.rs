use super::{Point2d, Vector2d};
use cgmath::prelude::*;

/// Rotates a vector by `angle` radians, counter-clockwise.
pub fn rotate(vec: Vector2d, angle: f64) -> Vector2d {
    let (sin, cos) = angle.sin_cos();
    Vector2d::new(cos * vec.x - sin * vec.y, sin * vec.x + cos * vec.y)
}

/// The signed angle in degrees needed to rotate `from` onto `to`,
/// in the range `[-180, 180]`. Positive values are counter-clockwise.
pub fn signed_angle(from: Vector2d, to: Vector2d) -> f64 {
    from.perp_dot(to).atan2(from.dot(to)).to_degrees()
}

/// Normalises a vector, returning `fallback` for vectors too short to have a direction.
pub fn normalize_or(vec: Vector2d, fallback: Vector2d) -> Vector2d {
    let mag = vec.magnitude();
    if mag > 1e-9 {
        vec / mag
    } else {
        fallback
    }
}

/// The unit vector pointing from `from` towards `to`, or `fallback` if the points coincide.
pub fn direction_between(from: Point2d, to: Point2d, fallback: Vector2d) -> Vector2d {
    normalize_or(to - from, fallback)
}

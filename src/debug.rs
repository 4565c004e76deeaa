use crate::math::Point2d;
use crate::VehicleId;
#[cfg(feature = "debug")]
use serde_json::{json, Value};

#[cfg(feature = "debug")]
thread_local!(
    static DEBUG_FRAME: std::cell::RefCell<Vec<Value>> = Default::default();
);

/// Records a vehicle's polyline, such as its planned route, for the current frame.
///
/// Paths with fewer than two points draw nothing and are dropped.
#[allow(unused)]
pub fn debug_path(name: &str, vehicle: VehicleId, points: &[Point2d]) {
    #[cfg(feature = "debug")]
    if points.len() >= 2 {
        let points = points.iter().map(|p| [p.x, p.y]).collect::<Vec<_>>();
        DEBUG_FRAME.with(|frame| {
            frame.borrow_mut().push(json!({
                "type": "path",
                "name": name,
                "vehicle": format!("{:?}", vehicle),
                "points": points,
            }))
        })
    }
}

/// Takes the paths recorded since the last call, as a JSON array.
#[cfg(feature = "debug")]
pub fn take_debug_frame() -> Value {
    Value::Array(DEBUG_FRAME.with(|frame| frame.take()))
}

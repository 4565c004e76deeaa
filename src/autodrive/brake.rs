use super::agent::AutoDriveAgent;
use super::context::{AutoDriveContext, DrivingState};
use super::setting::{AutoDriveSetting, DrivingMode, EndBehaviour};
use crate::graph::{LaneGraph, LaneNode, NodeType};
use crate::light::LightState;
use crate::vehicle::{VehicleControl, GRAVITY};
use crate::{NodeId, VehicleId};
use cgmath::prelude::*;
use log::trace;

/// The most nodes inspected by a single hazard scan.
const MAX_SCAN_NODES: usize = 256;

/// Extra margin in m added to the stopping distance in [DrivingMode::Quality].
const QUALITY_OFFSET: f64 = 1.0;

/// Extra margin in m added to the stopping distance once already braking.
const QUALITY_BRAKING_OFFSET: f64 = 2.0;
const PERFORMANCE_BRAKING_OFFSET: f64 = 10.0;

/// How far back along a conflicting lane to look for approaching traffic,
/// expressed as a time horizon at a reference speed.
const YIELD_HORIZON_TIME: f64 = 2.0; // s
const YIELD_HORIZON_SPEED: f64 = 20.0; // m/s

/// The speed floor in m/s used when estimating arrival times.
const YIELD_MIN_SPEED: f64 = 1.0;

/// A reason to stop short of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Hazard {
    /// Another vehicle occupies the node.
    VehicleAhead,
    /// The road ends here, and the vehicle is set to stop at road ends.
    RoadEnd,
    /// The node has a traffic light which isn't green.
    RedLight,
    /// Traffic on a conflicting approach will reach the crossing first.
    Yield,
    /// A node which must be clear before proceeding is occupied.
    YieldBlocking,
}

/// What a hazard check knows about the node being inspected.
pub(crate) struct HazardProbe<'a> {
    pub graph: &'a LaneGraph,
    pub context: &'a AutoDriveContext,
    pub setting: &'a AutoDriveSetting,
    pub vehicle: VehicleId,
    pub speed: f64,
    pub node: &'a LaneNode,
    /// The distance along the lane from the vehicle to this node, in m.
    pub distance: f64,
}

impl Hazard {
    /// Every hazard, in the order they are checked.
    pub const ORDER: [Hazard; 5] = [
        Hazard::VehicleAhead,
        Hazard::RoadEnd,
        Hazard::RedLight,
        Hazard::Yield,
        Hazard::YieldBlocking,
    ];

    pub(crate) fn is_present(self, probe: &HazardProbe) -> bool {
        match self {
            Hazard::VehicleAhead => probe.occupied_by_other(probe.node.id()),
            Hazard::RoadEnd => {
                let ctx = probe.context;
                let own_entry = ctx.is_entering_network && probe.node.id() == ctx.entry_node;
                probe.setting.end_behaviour == EndBehaviour::Stop
                    && probe.node.kind() == NodeType::End
                    && probe.graph.next(probe.node.id()).is_none()
                    && !own_entry
            }
            Hazard::RedLight => {
                let not_green = probe
                    .graph
                    .light_state(probe.node.id())
                    .map_or(false, |state| state != LightState::Green);
                // A light at the intersection being crossed has already been passed
                let fresh = probe
                    .node
                    .intersection()
                    .map_or(true, |i| Some(i) != probe.context.prev_intersection);
                not_green && fresh
            }
            Hazard::Yield => probe
                .node
                .yield_nodes()
                .iter()
                .any(|y| probe.must_yield(y.start, y.transition)),
            Hazard::YieldBlocking => probe
                .node
                .yield_blocking_nodes()
                .iter()
                .any(|node| probe.occupied_by_other(*node)),
        }
    }
}

impl HazardProbe<'_> {
    fn occupied_by_other(&self, node: NodeId) -> bool {
        self.graph
            .vehicle(node)
            .map_or(false, |other| other != self.vehicle)
    }

    /// Whether traffic approaching `start` would reach `transition` before this vehicle.
    fn must_yield(&self, start: NodeId, transition: NodeId) -> bool {
        let graph = self.graph;
        let crossing = graph.position(transition);
        let own_time = (self.distance.max(0.0) + self.node.position().distance(crossing))
            / self.speed.abs().max(YIELD_MIN_SPEED);
        let approach = graph.position(start).distance(crossing);

        let horizon = YIELD_HORIZON_TIME * YIELD_HORIZON_SPEED;
        let mut node = start;
        let mut back = 0.0;
        for _ in 0..MAX_SCAN_NODES {
            if back > horizon {
                break;
            }
            if let Some(other) = graph.vehicle(node).filter(|v| *v != self.vehicle) {
                let their_speed = graph.vehicle_speed(other).abs().max(YIELD_MIN_SPEED);
                if (back + approach) / their_speed < own_time {
                    return true;
                }
            }
            let Some(prev) = graph.prev(node) else { break };
            back += graph.distance_between(prev, node);
            node = prev;
        }
        false
    }
}

/// The distance in m within which hazards must be reacted to.
///
/// # Parameters
/// * `speed` - The vehicle's current speed in m/s
/// * `friction` - The tyre friction coefficient
/// * `braking` - Whether the vehicle is already braking or stopped
pub fn brake_distance(setting: &AutoDriveSetting, speed: f64, friction: f64, braking: bool) -> f64 {
    let v = speed.abs();
    let offset = setting.tunables.brake_offset;
    match setting.mode {
        DrivingMode::Quality => {
            let stopping = v + v * v / (friction.max(0.1) * GRAVITY);
            let extra = if braking { QUALITY_BRAKING_OFFSET } else { 0.0 };
            offset + QUALITY_OFFSET + stopping + extra
        }
        DrivingMode::Performance => {
            let coeff = if braking { 2.0 } else { 1.0 };
            let stopping = coeff * v * v / (2.0 * setting.acceleration.max(0.1));
            let extra = if braking { PERFORMANCE_BRAKING_OFFSET } else { 0.0 };
            offset + stopping + extra
        }
    }
}

/// Scans ahead of the vehicle for the nearest hazard within braking distance.
///
/// Distances are measured from the vehicle along its lane. The last node inspected
/// becomes the context's brake target. If a hazard is found there, the brake undershoot
/// is set to the distance left before the vehicle must have stopped; otherwise it is infinite.
pub fn scan(agent: &mut AutoDriveAgent, vehicle: &impl VehicleControl) -> Option<Hazard> {
    let speed = vehicle.speed();
    let braking = matches!(
        agent.context.driving_state,
        DrivingState::Braking | DrivingState::Stopped
    );
    let reach = brake_distance(agent.setting, speed, vehicle.tire_friction(), braking);
    let graph = agent.graph;

    let mut node = agent.context.current_node;
    let mut distance = (graph.position(node) - vehicle.position()).dot(vehicle.forward());
    agent.context.brake_undershoot = f64::INFINITY;
    for _ in 0..MAX_SCAN_NODES {
        agent.context.brake_target = Some(node);
        let Some(lane_node) = graph.node(node) else { break };
        let probe = HazardProbe {
            graph,
            context: &*agent.context,
            setting: agent.setting,
            vehicle: agent.vehicle,
            speed,
            node: lane_node,
            distance,
        };
        if let Some(hazard) = Hazard::ORDER.into_iter().find(|h| h.is_present(&probe)) {
            let undershoot = distance - agent.setting.tunables.brake_offset;
            trace!(
                "Vehicle {:?} braking for {:?} at {:?}, {:.2}m to spare",
                agent.vehicle,
                hazard,
                node,
                undershoot
            );
            agent.context.brake_undershoot = undershoot;
            return Some(hazard);
        }

        let Some(next) = agent.next(node, None) else { break };
        let step = graph.distance_between(node, next);
        if distance + step > reach {
            break;
        }
        distance += step;
        node = next;
    }
    None
}

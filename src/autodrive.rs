//! The driving agent: follows lanes, crosses intersections, stops for hazards
//! and recovers from overshooting its steering target.

pub use agent::AutoDriveAgent;
pub use brake::{brake_distance, Hazard};
pub use context::{AutoDriveContext, DrivingState, NavigationMode};
pub use navigation::NavigationEvent;
pub use setting::{AutoDriveSetting, DrivingMode, EndBehaviour, Tunables, VehicleType};

use self::context::TransitionKey;
use crate::debug::debug_path;
use crate::error::SetupError;
use crate::graph::{LaneGraph, NodeType, TurnDirection};
use crate::math::{normalize_or, signed_angle, Point2d};
use crate::vehicle::{VehicleControl, GRAVITY};
use crate::{LaneId, NodeId, VehicleId};
use cgmath::prelude::*;
use log::{debug, error, warn};
use smallvec::SmallVec;

mod agent;
mod brake;
mod context;
mod navigation;
mod pathfinding;
mod setting;

/// The most graph steps the target or current node may advance in one tick.
const MAX_TARGET_STEPS: usize = 16;

/// The steering lookahead distance inside intersections, in m.
const INTERSECTION_LOOKAHEAD: f64 = 1.5;

/// Targets within this many degrees of directly behind get a steering nudge.
const BEHIND_TOLERANCE: f64 = 0.5;

/// How close in m the vehicle must come to a road end before looping.
const LOOP_SNAP_DISTANCE: f64 = 0.5;

/// How far in m to search for a node to resume from after giving up on reversing.
const REACQUIRE_RADIUS: f64 = 30.0;

/// The smallest distance in m within which a missed target counts as recovered.
const MIN_RECOVERY_RADIUS: f64 = 1.0;

/// How close in m the brake undershoot may get before the vehicle holds still.
const STOP_MARGIN: f64 = 0.5;

/// The most points drawn for a navigation path.
const MAX_PATH_POINTS: usize = 1024;

/// What the agent is currently doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DriveStatus {
    /// Following the lane towards the target.
    Driving,
    /// The target was overshot; slowing down before heading back to it.
    RepositioningInitiated,
    /// Driving or reversing back to the overshot target.
    Repositioning,
}

/// Where on the network a vehicle starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StartLocation {
    pub lane: LaneId,
    /// The index of the starting node within the lane.
    pub index: usize,
}

/// The autonomous driver of a single vehicle.
#[derive(Clone, Debug)]
pub struct AutoDrive {
    vehicle: VehicleId,
    setting: AutoDriveSetting,
    context: AutoDriveContext,
    status: DriveStatus,
    /// The odometer, in m.
    total_distance: f64,
    /// The distance reversed during the current repositioning, in m.
    reverse_distance: f64,
    /// The vehicle's reversing speed limit from before repositioning.
    saved_max_speed_reverse: Option<f64>,
    /// The nodes claimed for this vehicle on the previous tick.
    occupied: SmallVec<[NodeId; 16]>,
    /// The hazard found by the most recent scan.
    hazard: Option<Hazard>,
    show_navigation_path: bool,
}

impl AutoDrive {
    /// Creates a driver for `vehicle`, starting at the given lane node.
    pub fn new(
        vehicle: VehicleId,
        setting: AutoDriveSetting,
        graph: &LaneGraph,
        start: StartLocation,
    ) -> Result<Self, SetupError> {
        let node = start_node(graph, start).map_err(|err| {
            error!("Vehicle {:?} failed to start: {}", vehicle, err);
            err
        })?;

        let mut context = AutoDriveContext::new(node, node, setting.navigation_mode, setting.seed);
        context.loop_node = graph.paired_start(start.lane);
        let mut this = Self {
            vehicle,
            setting,
            context,
            status: DriveStatus::Driving,
            total_distance: 0.0,
            reverse_distance: 0.0,
            saved_max_speed_reverse: None,
            occupied: SmallVec::new(),
            hazard: None,
            show_navigation_path: false,
        };
        let target = this
            .agent(graph)
            .next(node, Some(EndBehaviour::Stop))
            .unwrap_or(node);
        this.context.target = target;
        Ok(this)
    }

    pub fn vehicle(&self) -> VehicleId {
        self.vehicle
    }

    pub fn setting(&self) -> &AutoDriveSetting {
        &self.setting
    }

    pub fn context(&self) -> &AutoDriveContext {
        &self.context
    }

    pub fn status(&self) -> DriveStatus {
        self.status
    }

    /// The node the vehicle is currently at.
    pub fn current_node(&self) -> NodeId {
        self.context.current_node
    }

    /// The total distance driven along the network, in m.
    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    /// The hazard the vehicle was braking for as of the last tick.
    pub fn hazard(&self) -> Option<Hazard> {
        self.hazard
    }

    /// The nodes claimed by this vehicle as of the last tick.
    pub fn occupied_nodes(&self) -> &[NodeId] {
        &self.occupied
    }

    /// Sets whether the vehicle's navigation path is drawn each tick.
    pub fn set_navigation_path_visibility(&mut self, visible: bool) {
        self.show_navigation_path = visible;
    }

    pub fn navigation_path_visible(&self) -> bool {
        self.show_navigation_path
    }

    /// Plans a route to `destination` and follows it. Returns `false` if no route was found.
    pub fn set_destination(&mut self, graph: &LaneGraph, destination: NodeId) -> bool {
        self.agent(graph).set_destination(destination)
    }

    /// Changes how the vehicle chooses its way through intersections.
    /// Any planned route is dropped.
    pub fn set_navigation_mode(&mut self, mode: NavigationMode) {
        self.context.navigation_mode = mode;
        self.context.navigation_path.clear();
        self.context.navigation_end = None;
    }

    /// Borrows a traversal agent over this driver's context.
    pub fn agent<'a>(&'a mut self, graph: &'a LaneGraph) -> AutoDriveAgent<'a> {
        AutoDriveAgent {
            context: &mut self.context,
            setting: &self.setting,
            graph,
            vehicle: self.vehicle,
        }
    }

    /// Runs one decision step, setting the vehicle's inputs and updating its node claims.
    ///
    /// # Parameters
    /// * `graph` - The lane graph the vehicle drives on
    /// * `vehicle` - The vehicle's controls
    /// * `dt` - The time step in seconds
    pub fn tick(&mut self, graph: &mut LaneGraph, vehicle: &mut impl VehicleControl, dt: f64) {
        let speed = vehicle.speed();
        let hazard = brake::scan(&mut self.agent(graph), &*vehicle);
        self.hazard = hazard;
        self.handle_navigation_event(graph, vehicle);

        match self.status {
            DriveStatus::Driving => {
                self.apply_pedals(vehicle, hazard, dt);
                let lookahead = self.lookahead_distance(graph, speed);
                self.update_target(graph, vehicle, lookahead);
                if self.target_overshot(graph, &*vehicle, lookahead) {
                    self.initiate_repositioning(vehicle);
                } else {
                    self.steer(graph, vehicle, false, dt);
                    self.advance_current_node(graph, vehicle, hazard.is_some());
                }
            }
            DriveStatus::RepositioningInitiated => {
                vehicle.set_throttle_input(0.0);
                vehicle.set_brake_input(1.0);
                if speed <= vehicle.max_speed_forward() {
                    debug!("Vehicle {:?} repositioning", self.vehicle);
                    self.status = DriveStatus::Repositioning;
                    self.saved_max_speed_reverse = Some(vehicle.max_speed_reverse());
                    let cap = self.setting.tunables.max_repositioning_speed;
                    vehicle.set_max_speed_reverse(vehicle.max_speed_reverse().min(cap));
                }
            }
            DriveStatus::Repositioning => self.reposition(graph, vehicle, dt),
        }

        self.update_occupancy(graph, &*vehicle);
        graph.publish_speed(self.vehicle, vehicle.speed());

        if self.show_navigation_path {
            if let Some(points) = self.navigation_path_points(graph) {
                debug_path("navigation_path", self.vehicle, &points);
            }
        }
    }

    /// The points along the vehicle's planned route, from its current node to its destination.
    ///
    /// Returns `None` when the vehicle isn't navigating to a destination.
    pub fn navigation_path_points(&self, graph: &LaneGraph) -> Option<Vec<Point2d>> {
        let end = self.context.navigation_end?;
        if graph.node(end).is_none() {
            warn!("Navigation path end {:?} is missing", end);
            return None;
        }

        let mut edges = self.context.navigation_path.iter();
        let mut node = self.context.current_node;
        let mut points = vec![graph.position(node)];
        while node != end && points.len() < MAX_PATH_POINTS {
            let next = if graph.is_junction_entry(node) {
                let Some(intersection) = graph.node(node).and_then(|n| n.intersection()) else {
                    break;
                };
                let key = TransitionKey {
                    intersection,
                    entry: node,
                };
                match self.context.transitions.get(&key) {
                    Some(guide) => Some(guide.start),
                    None => edges.next().and_then(|edge| {
                        let mut turn = TurnDirection::default();
                        graph
                            .intersection(intersection)?
                            .get_new_lane_node(graph, edge, node, &mut turn)
                            .map(|(_, guide)| guide.start)
                    }),
                }
            } else {
                graph.next(node)
            };
            let Some(next) = next else { break };
            node = next;
            points.push(graph.position(node));
        }
        Some(points)
    }

    fn handle_navigation_event(&mut self, graph: &LaneGraph, vehicle: &mut impl VehicleControl) {
        match navigation::update(&mut self.agent(graph)) {
            Some(NavigationEvent::IntersectionEntry(id)) => {
                debug!("Vehicle {:?} entering intersection {:?}", self.vehicle, id);
                self.context.prev_intersection = Some(id);
            }
            Some(NavigationEvent::IntersectionExit(id)) => {
                debug!("Vehicle {:?} leaving intersection {:?}", self.vehicle, id);
                if self.status == DriveStatus::Driving {
                    vehicle.set_max_speed_forward(self.setting.speed);
                }
            }
            None => {}
        }
    }

    /// Sets throttle and brake for the current hazard, if any.
    fn apply_pedals(&mut self, vehicle: &mut impl VehicleControl, hazard: Option<Hazard>, dt: f64) {
        let speed = vehicle.speed();
        let cruise = self.setting.speed.min(vehicle.max_speed_forward());
        let undershoot = self.context.brake_undershoot;
        let allowed = match hazard {
            Some(_) => (2.0 * self.setting.acceleration * undershoot.max(0.0))
                .sqrt()
                .min(cruise),
            None => cruise,
        };

        let (throttle, brake) = if speed > allowed + 0.1 {
            let decel = match hazard {
                Some(_) if undershoot > 0.1 => speed * speed / (2.0 * undershoot),
                Some(_) => f64::INFINITY,
                None => self.setting.acceleration,
            };
            (0.0, decel / (vehicle.tire_friction().max(0.1) * GRAVITY))
        } else {
            (throttle_for(speed, allowed), 0.0)
        };

        let braking = brake > 0.0 || (hazard.is_some() && undershoot <= STOP_MARGIN);
        if self.context.update_driving_state(speed, braking, cruise, dt) {
            vehicle.set_throttle_input(throttle);
            vehicle.set_brake_input(brake);
        } else {
            vehicle.set_throttle_input(0.0);
            vehicle.set_brake_input(1.0);
        }
    }

    fn lookahead_distance(&self, graph: &LaneGraph, speed: f64) -> f64 {
        let inside = graph
            .node(self.context.current_node)
            .map_or(false, |n| n.is_intersection());
        if inside {
            return INTERSECTION_LOOKAHEAD;
        }
        let t = &self.setting.tunables;
        let scaled = t.base_lookahead_distance * speed.abs() / t.lookahead_speed_divider;
        f64::max(scaled, t.base_lookahead_distance)
    }

    /// Moves the steering target along while it is ahead and within the lookahead distance.
    fn update_target(
        &mut self,
        graph: &LaneGraph,
        vehicle: &mut impl VehicleControl,
        lookahead: f64,
    ) {
        for _ in 0..MAX_TARGET_STEPS {
            let target = self.context.target;
            let to_target = graph.position(target) - vehicle.position();
            // A target left behind stays put until it counts as overshot
            if to_target.dot(vehicle.forward()) < 0.0 || to_target.magnitude() > lookahead {
                break;
            }

            // Hold at a brake target at the edge of an intersection not yet entered
            if self.context.brake_target == Some(target) {
                let crossing = graph.node(target).and_then(|n| n.intersection());
                if crossing.is_some() && crossing != self.context.prev_intersection {
                    break;
                }
            }

            let Some(next) = self.agent(graph).next(target, Some(EndBehaviour::Stop)) else {
                break;
            };
            self.context.prev_target = Some(target);
            self.context.target = next;
            if graph.node(next).map_or(false, |n| n.is_intersection()) {
                let cap = self.setting.tunables.intersection_speed;
                vehicle.set_max_speed_forward(vehicle.max_speed_forward().min(cap));
            }
        }
    }

    fn target_overshot(
        &self,
        graph: &LaneGraph,
        vehicle: &impl VehicleControl,
        lookahead: f64,
    ) -> bool {
        let to_target = graph.position(self.context.target) - vehicle.position();
        to_target.dot(vehicle.forward()) < 0.0 && to_target.magnitude() > lookahead + 1.0
    }

    fn initiate_repositioning(&mut self, vehicle: &mut impl VehicleControl) {
        debug!(
            "Vehicle {:?} overshot {:?}, initiating repositioning",
            self.vehicle, self.context.target
        );
        self.status = DriveStatus::RepositioningInitiated;
        self.context.repositioning_target = Some(self.context.target);
        self.reverse_distance = 0.0;
        vehicle.set_throttle_input(0.0);
        vehicle.set_brake_input(1.0);
        let cap = self.setting.tunables.max_repositioning_speed;
        vehicle.set_max_speed_forward(vehicle.max_speed_forward().min(cap));
    }

    /// Heads back to the overshot target, reversing if it is behind.
    fn reposition(&mut self, graph: &LaneGraph, vehicle: &mut impl VehicleControl, dt: f64) {
        let target = self.context.repositioning_target.unwrap_or(self.context.target);
        let to_target = graph.position(target) - vehicle.position();
        let ahead = to_target.dot(vehicle.forward()) >= 0.0;
        let lookahead = self.lookahead_distance(graph, vehicle.speed());

        if ahead && to_target.magnitude() <= recovery_radius(lookahead) {
            self.context.current_node = target;
            self.context.target = self
                .agent(graph)
                .next(target, Some(EndBehaviour::Stop))
                .unwrap_or(target);
            self.finish_repositioning(vehicle);
            return;
        }

        vehicle.set_brake_input(0.0);
        if ahead {
            vehicle.set_throttle_input(throttle_for(vehicle.speed(), vehicle.max_speed_forward()));
            self.steer(graph, vehicle, false, dt);
        } else {
            let reverse_speed = -vehicle.speed();
            vehicle.set_throttle_input(-throttle_for(reverse_speed, vehicle.max_speed_reverse()));
            self.steer(graph, vehicle, true, dt);
            self.reverse_distance += reverse_speed.max(0.0) * dt;
            if self.reverse_distance > self.setting.tunables.max_reverse_distance {
                self.reacquire(graph, vehicle);
            }
        }
    }

    /// Gives up on the overshot target and resumes from the nearest node ahead.
    fn reacquire(&mut self, graph: &LaneGraph, vehicle: &mut impl VehicleControl) {
        let current = self.context.current_node;
        let mut nodes = vec![current];
        nodes.extend(self.agent(graph).walk(current, REACQUIRE_RADIUS, true));

        let position = vehicle.position();
        let forward = vehicle.forward();
        let distance = |node: &NodeId| graph.position(*node).distance(position);
        let Some((nearest, _)) = nodes
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| distance(a).total_cmp(&distance(b)))
        else {
            return;
        };
        let target = nodes[nearest..]
            .iter()
            .copied()
            .find(|node| (graph.position(*node) - position).dot(forward) >= 0.0)
            .or_else(|| nodes.last().copied())
            .unwrap_or(current);

        warn!(
            "Vehicle {:?} reversed too far, resuming from {:?}",
            self.vehicle, target
        );
        self.context.current_node = nodes[nearest];
        self.context.target = target;
        self.finish_repositioning(vehicle);
    }

    fn finish_repositioning(&mut self, vehicle: &mut impl VehicleControl) {
        debug!("Vehicle {:?} finished repositioning", self.vehicle);
        self.status = DriveStatus::Driving;
        self.context.repositioning_target = None;
        self.reverse_distance = 0.0;
        vehicle.set_max_speed_forward(self.setting.speed);
        if let Some(speed) = self.saved_max_speed_reverse.take() {
            vehicle.set_max_speed_reverse(speed);
        }
        vehicle.set_throttle_input(0.0);
        vehicle.set_brake_input(0.0);
    }

    /// Steers towards the target, smoothing the input over time.
    fn steer(&self, graph: &LaneGraph, vehicle: &mut impl VehicleControl, reverse: bool, dt: f64) {
        let forward = vehicle.forward();
        let to_target = graph.position(self.context.target) - vehicle.position();
        let to_target = normalize_or(to_target, forward);
        let desired = if reverse {
            -signed_angle(-forward, to_target) / 90.0
        } else {
            let angle = signed_angle(forward, to_target);
            if 180.0 - angle.abs() < BEHIND_TOLERANCE {
                angle.abs() / 90.0 + 0.1
            } else {
                angle / 90.0
            }
        };
        let desired = desired.clamp(-1.0, 1.0);
        let rate = f64::min(self.setting.tunables.rotation_speed * dt, 1.0);
        let steer = vehicle.steer_input();
        vehicle.set_steer_input(steer + (desired - steer) * rate);
    }

    /// Moves the current node forward while the vehicle is nearer to a following node.
    fn advance_current_node(
        &mut self,
        graph: &LaneGraph,
        vehicle: &mut impl VehicleControl,
        hazard: bool,
    ) {
        let position = vehicle.position();
        for _ in 0..MAX_TARGET_STEPS {
            let current = self.context.current_node;
            let here = graph.position(current).distance(position);
            let Some(next) = self.agent(graph).next(current, Some(EndBehaviour::Stop)) else {
                self.try_loop(graph, vehicle);
                return;
            };
            let after = self.agent(graph).next(next, Some(EndBehaviour::Stop));

            let to = if graph.position(next).distance(position) < here {
                next
            } else if let Some(after) =
                after.filter(|n| graph.position(*n).distance(position) < here)
            {
                after
            } else {
                return;
            };

            // Never move onto the node being braked for
            let brake_target = self.context.brake_target;
            if hazard && (brake_target == Some(next) || brake_target == Some(to)) {
                return;
            }

            let mut passed = SmallVec::<[NodeId; 2]>::new();
            passed.push(current);
            self.total_distance += graph.distance_between(current, next);
            if to != next {
                passed.push(next);
                self.total_distance += graph.distance_between(next, to);
            }
            for node in passed {
                if graph.is_junction_exit(node) {
                    if let Some(intersection) = graph.node(node).and_then(|n| n.intersection()) {
                        self.agent(graph).unset_intersection_transition(intersection, node);
                    }
                }
            }
            self.context.current_node = to;
            self.context.is_entering_network = false;
        }
    }

    /// Wraps around to the paired lane once the end of the road is reached.
    fn try_loop(&mut self, graph: &LaneGraph, vehicle: &mut impl VehicleControl) {
        if self.setting.end_behaviour != EndBehaviour::Loop {
            return;
        }
        let current = self.context.current_node;
        let at_end = graph.node(current).map(|n| n.kind()) == Some(NodeType::End);
        if graph.next(current).is_some() || !at_end {
            return;
        }
        let to_end = graph.position(current) - vehicle.position();
        if to_end.dot(vehicle.forward()) >= 0.0 && to_end.magnitude() >= LOOP_SNAP_DISTANCE {
            return;
        }
        let Some(anchor) = self.agent(graph).next(current, Some(EndBehaviour::Loop)) else {
            return;
        };
        let Some(node) = graph.node(anchor) else { return };

        debug!("Vehicle {:?} looping from {:?} to {:?}", self.vehicle, current, anchor);
        vehicle.teleport(node.position(), node.direction());
        self.context.reset();
        self.context.current_node = anchor;
        self.context.target = self
            .agent(graph)
            .next(anchor, Some(EndBehaviour::Stop))
            .unwrap_or(anchor);
        self.context.loop_node = node.lane().and_then(|lane| graph.paired_start(lane));
    }

    /// Claims the nodes under and around the vehicle, releasing any no longer needed.
    fn update_occupancy(&mut self, graph: &mut LaneGraph, vehicle: &impl VehicleControl) {
        let reach = vehicle.length() / 2.0 + self.setting.tunables.vehicle_occupancy_offset;
        let current = self.context.current_node;
        let (ahead, behind) = {
            let mut agent = self.agent(graph);
            (agent.walk(current, reach, true), agent.walk(current, reach, false))
        };

        let mut claimed = SmallVec::<[NodeId; 16]>::new();
        if graph.set_vehicle(current, self.vehicle) {
            claimed.push(current);
            // Stop at the first refusal so no claim lies beyond another vehicle
            for nodes in [ahead, behind] {
                for node in nodes {
                    if !graph.set_vehicle(node, self.vehicle) {
                        break;
                    }
                    claimed.push(node);
                }
            }
        }

        let kept = claimed
            .iter()
            .map(|node| graph.identity(*node))
            .collect::<SmallVec<[_; 16]>>();
        for node in std::mem::take(&mut self.occupied) {
            if !kept.contains(&graph.identity(node)) {
                graph.unset_vehicle(node, self.vehicle);
            }
        }
        self.occupied = claimed;
    }
}

/// Resolves a start location to a node.
fn start_node(graph: &LaneGraph, start: StartLocation) -> Result<NodeId, SetupError> {
    let lane = graph.lane(start.lane).ok_or(SetupError::UnknownLane(start.lane))?;
    let nodes = lane.nodes();
    if nodes.is_empty() {
        return Err(SetupError::EmptyLane(start.lane));
    }
    nodes
        .get(start.index)
        .copied()
        .ok_or(SetupError::InvalidLaneIndex {
            index: start.index,
            len: nodes.len(),
        })
}

/// How close a repositioning vehicle must come to its missed target.
/// Inside intersections the lookahead is short enough that the floor applies.
fn recovery_radius(lookahead: f64) -> f64 {
    f64::max(lookahead - 1.0, MIN_RECOVERY_RADIUS)
}

/// The throttle needed to approach `max_speed`, easing off close to it.
fn throttle_for(speed: f64, max_speed: f64) -> f64 {
    if max_speed <= 0.0 {
        return 0.0;
    }
    (1.0 - (speed.max(0.0) / max_speed).powi(4)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph::LaneSide;
    use crate::math::Vector2d;
    use crate::vehicle::{KinematicVehicle, VehicleAttributes};
    use assert_approx_eq::assert_approx_eq;
    use slotmap::SlotMap;

    fn vehicle_id() -> VehicleId {
        SlotMap::<VehicleId, ()>::with_key().insert(())
    }

    fn straight(graph: &mut LaneGraph, n: usize) -> LaneId {
        let road = graph.add_road();
        let points = (0..n)
            .map(|i| Point2d::new(5.0 * i as f64, 0.0))
            .collect::<Vec<_>>();
        graph.add_lane(road, LaneSide::Right, 0, &points)
    }

    #[test]
    fn rejects_bad_start_index() {
        let mut graph = LaneGraph::new();
        let lane = straight(&mut graph, 3);
        let setting = AutoDriveSetting::default();
        let err = AutoDrive::new(vehicle_id(), setting, &graph, StartLocation { lane, index: 3 });
        assert_eq!(
            err.err(),
            Some(SetupError::InvalidLaneIndex { index: 3, len: 3 })
        );
    }

    #[test]
    fn throttle_eases_off_near_max_speed() {
        assert_approx_eq!(throttle_for(0.0, 10.0), 1.0);
        assert_approx_eq!(throttle_for(5.0, 10.0), 1.0 - 0.0625);
        assert_approx_eq!(throttle_for(12.0, 10.0), 0.0);
        assert_approx_eq!(throttle_for(3.0, 0.0), 0.0);
    }

    #[test]
    fn recovery_radius_has_a_floor() {
        assert_approx_eq!(recovery_radius(5.0), 4.0);
        assert_approx_eq!(recovery_radius(12.0), 11.0);
        assert_approx_eq!(recovery_radius(INTERSECTION_LOOKAHEAD), MIN_RECOVERY_RADIUS);
    }

    #[test]
    fn overshoot_initiates_repositioning() {
        let mut graph = LaneGraph::new();
        let lane = straight(&mut graph, 10);
        let nodes = graph.lane(lane).unwrap().nodes().to_vec();
        let mut setting = AutoDriveSetting::default();
        setting.seed = Some(5);
        let mut driver =
            AutoDrive::new(vehicle_id(), setting, &graph, StartLocation { lane, index: 0 })
                .unwrap();
        assert_eq!(driver.context().target(), nodes[1]);

        // Heading away from a target 15m behind at 10m/s, so the lookahead is 10m
        let mut vehicle = KinematicVehicle::new(
            &VehicleAttributes::default(),
            Point2d::new(20.0, 0.0),
            Vector2d::new(1.0, 0.0),
        );
        vehicle.set_speed(10.0);
        driver.tick(&mut graph, &mut vehicle, 0.05);

        assert_eq!(driver.status(), DriveStatus::RepositioningInitiated);
        assert_approx_eq!(vehicle.brake_input(), 1.0);
        assert_approx_eq!(vehicle.max_speed_forward(), 3.0);
    }
}

//! The lane graph: nodes along directional lanes, joined by intersections.

pub use intersection::{GuideLane, Intersection, LaneChoice, RoadEdge, TurnDirection};
pub use node::{LaneNode, NodeType, Occupancy, YieldNode};

use crate::light::{LightState, TrafficLight};
use crate::math::{direction_between, Point2d, Vector2d};
use crate::{IntersectionId, LaneId, NodeId, RoadId, TrafficLightId, VehicleId};
use cgmath::prelude::*;
use itertools::Itertools;
use log::{error, trace};
use slotmap::{SecondaryMap, SlotMap};

mod intersection;
mod node;

/// Which side of its road a lane runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LaneSide {
    Left,
    Right,
}

/// An ordered sequence of nodes along one direction of a road.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Lane {
    id: LaneId,
    road: RoadId,
    side: LaneSide,
    index: usize,
    nodes: Vec<NodeId>,
    /// The lane running the opposite way on the same road.
    paired: Option<LaneId>,
    /// The intersection the lane starts at.
    from: Option<IntersectionId>,
    /// The intersection the lane leads into.
    to: Option<IntersectionId>,
}

impl Lane {
    pub fn id(&self) -> LaneId {
        self.id
    }

    pub fn road(&self) -> RoadId {
        self.road
    }

    pub fn side(&self) -> LaneSide {
        self.side
    }

    /// The index of the lane on its side of the road.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn first(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn last(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    pub fn paired(&self) -> Option<LaneId> {
        self.paired
    }

    pub fn from(&self) -> Option<IntersectionId> {
        self.from
    }

    pub fn to(&self) -> Option<IntersectionId> {
        self.to
    }
}

/// A road network expressed as linked lane nodes.
///
/// The graph owns every node, and is the only place vehicle occupancy is stored.
#[derive(Clone, Default)]
pub struct LaneGraph {
    nodes: SlotMap<NodeId, LaneNode>,
    lanes: SlotMap<LaneId, Lane>,
    roads: SlotMap<RoadId, Vec<LaneId>>,
    intersections: SlotMap<IntersectionId, Intersection>,
    lights: SlotMap<TrafficLightId, TrafficLight>,
    /// The most recently published speed of each driving vehicle.
    speeds: SecondaryMap<VehicleId, f64>,
}

impl LaneGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a road, to which lanes can then be added.
    pub fn add_road(&mut self) -> RoadId {
        self.roads.insert(vec![])
    }

    /// Adds a lane running through the given points, in order.
    /// The first and last nodes are [NodeType::End] until connected to something.
    pub fn add_lane(
        &mut self,
        road: RoadId,
        side: LaneSide,
        index: usize,
        points: &[Point2d],
    ) -> LaneId {
        let lane_id = self.lanes.insert_with_key(|id| Lane {
            id,
            road,
            side,
            index,
            nodes: Vec::with_capacity(points.len()),
            paired: None,
            from: None,
            to: None,
        });

        let last = points.len().saturating_sub(1);
        let nodes = points
            .iter()
            .enumerate()
            .map(|(i, point)| {
                let kind = if i == 0 || i == last {
                    NodeType::End
                } else {
                    NodeType::Default
                };
                self.nodes.insert_with_key(|id| {
                    let mut node = LaneNode::new(id, *point, kind);
                    node.lane = Some((lane_id, i));
                    node
                })
            })
            .collect::<Vec<_>>();

        for (a, b) in nodes.iter().copied().tuple_windows() {
            self.link(a, b);
        }
        for (id, dir) in nodes.iter().zip(self.path_directions(&nodes)) {
            self.nodes[*id].direction = dir;
        }

        if let Some(lanes) = self.roads.get_mut(road) {
            lanes.push(lane_id);
        }
        self.lanes[lane_id].nodes = nodes;
        lane_id
    }

    /// Marks two lanes as running in opposite directions along the same road.
    pub fn pair_lanes(&mut self, a: LaneId, b: LaneId) {
        self.lanes[a].paired = Some(b);
        self.lanes[b].paired = Some(a);
    }

    /// Adds an intersection.
    pub fn add_intersection(&mut self, position: Point2d) -> IntersectionId {
        self.intersections
            .insert_with_key(|id| Intersection::new(id, position))
    }

    /// Specifies that the end of `lane` leads into `intersection`.
    pub fn connect_lane_end(&mut self, lane: LaneId, intersection: IntersectionId) {
        self.lanes[lane].to = Some(intersection);
        if let Some(node) = self.lanes[lane].last() {
            self.make_junction_edge(node, intersection);
        }
    }

    /// Specifies that `lane` starts from `intersection`.
    pub fn connect_lane_start(&mut self, lane: LaneId, intersection: IntersectionId) {
        self.lanes[lane].from = Some(intersection);
        if let Some(node) = self.lanes[lane].first() {
            self.make_junction_edge(node, intersection);
        }
    }

    /// Specifies that the end of the `from` lane continues directly onto the start of `to`.
    pub fn connect_lanes(&mut self, from: LaneId, to: LaneId) {
        if let (Some(a), Some(b)) = (self.lanes[from].last(), self.lanes[to].first()) {
            self.nodes[a].kind = NodeType::RoadConnection;
            self.nodes[b].kind = NodeType::RoadConnection;
            self.link(a, b);
        }
    }

    /// Adds a node inside an intersection, which may back several guide lanes.
    pub fn add_intersection_node(
        &mut self,
        intersection: IntersectionId,
        position: Point2d,
    ) -> NodeId {
        self.nodes.insert_with_key(|id| {
            let mut node = LaneNode::new(id, position, NodeType::Intersection);
            node.intersection = Some(intersection);
            node
        })
    }

    /// Adds a guide lane from the end of `entry_lane` to the start of `exit_lane`,
    /// made of guide nodes proxying the given backing nodes.
    ///
    /// Both lanes must already be connected to `intersection`.
    ///
    /// # Panics
    /// Panics if `backing` or either lane is empty.
    pub fn add_guide_lane(
        &mut self,
        intersection: IntersectionId,
        entry_lane: LaneId,
        exit_lane: LaneId,
        turn: TurnDirection,
        backing: &[NodeId],
    ) -> GuideLane {
        assert!(!backing.is_empty(), "Guide lane must have atleast one node");
        let entry = self.lanes[entry_lane].last().expect("Entry lane is empty");
        let exit = self.lanes[exit_lane].first().expect("Exit lane is empty");

        let guides = backing
            .iter()
            .map(|backing| {
                let backing = self.resolve(*backing);
                let position = self.nodes[backing].position;
                self.nodes.insert_with_key(|id| {
                    let mut node = LaneNode::new(id, position, NodeType::Intersection);
                    node.intersection = Some(intersection);
                    node.occupancy = Occupancy::Guide(backing);
                    node
                })
            })
            .collect::<Vec<_>>();

        for (a, b) in guides.iter().copied().tuple_windows() {
            self.link(a, b);
        }
        let (start, end) = (guides[0], guides[guides.len() - 1]);

        // The first guide lane added becomes the graph's default way through
        self.nodes[start].prev = Some(entry);
        self.nodes[start].distance_to_prev = self.straight_distance(entry, start);
        self.nodes[entry].next.get_or_insert(start);
        self.nodes[end].next = Some(exit);
        if self.nodes[exit].prev.is_none() {
            self.nodes[exit].prev = Some(end);
            self.nodes[exit].distance_to_prev = self.straight_distance(end, exit);
        }

        let mut path = guides.clone();
        path.push(exit);
        for (id, dir) in guides.iter().zip(self.path_directions(&path)) {
            self.nodes[*id].direction = dir;
        }

        let guide = GuideLane {
            entry,
            start,
            end,
            exit,
            exit_lane,
            turn,
        };
        self.intersections[intersection].add_guide_lane(guide);
        guide
    }

    /// Adds a guide lane through freshly created intersection nodes at the given points.
    pub fn add_intersection_path(
        &mut self,
        intersection: IntersectionId,
        entry_lane: LaneId,
        exit_lane: LaneId,
        turn: TurnDirection,
        points: &[Point2d],
    ) -> GuideLane {
        let backing = points
            .iter()
            .map(|p| self.add_intersection_node(intersection, *p))
            .collect::<Vec<_>>();
        self.add_guide_lane(intersection, entry_lane, exit_lane, turn, &backing)
    }

    /// Specifies that vehicles at `node` must give way to traffic approaching via `yield_node`.
    pub fn add_yield_node(&mut self, node: NodeId, yield_node: YieldNode) {
        self.nodes[node].yield_nodes.push(yield_node);
    }

    /// Specifies that vehicles may not pass `node` while `blocking` is occupied.
    pub fn add_yield_blocking_node(&mut self, node: NodeId, blocking: NodeId) {
        self.nodes[node].yield_blocking_nodes.push(blocking);
    }

    /// Adds a traffic light to the network.
    pub fn add_traffic_light(&mut self, light: TrafficLight) -> TrafficLightId {
        self.lights.insert(light)
    }

    /// Places a traffic light at a node.
    pub fn set_node_light(&mut self, node: NodeId, light: TrafficLightId) {
        self.nodes[node].traffic_light = Some(light);
    }

    /// Advances the timing of all traffic lights.
    pub fn update_lights(&mut self, dt: f64) {
        for (_, light) in &mut self.lights {
            light.step(dt);
        }
    }

    pub fn light(&self, id: TrafficLightId) -> Option<&TrafficLight> {
        self.lights.get(id)
    }

    pub fn light_mut(&mut self, id: TrafficLightId) -> Option<&mut TrafficLight> {
        self.lights.get_mut(id)
    }

    /// The state of the traffic light at a node, if it has one.
    pub fn light_state(&self, node: NodeId) -> Option<LightState> {
        let light = self.nodes.get(node)?.traffic_light?;
        self.lights.get(light).map(|l| l.state())
    }

    pub fn node(&self, id: NodeId) -> Option<&LaneNode> {
        self.nodes.get(id)
    }

    pub fn lane(&self, id: LaneId) -> Option<&Lane> {
        self.lanes.get(id)
    }

    pub fn intersection(&self, id: IntersectionId) -> Option<&Intersection> {
        self.intersections.get(id)
    }

    pub fn iter_intersections(&self) -> impl Iterator<Item = &Intersection> {
        self.intersections.values()
    }

    /// The raw successor link of a node.
    pub fn next(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node)?.next
    }

    /// The raw predecessor link of a node.
    pub fn prev(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node)?.prev
    }

    pub fn position(&self, node: NodeId) -> Point2d {
        self.nodes[node].position
    }

    pub fn kind(&self, node: NodeId) -> NodeType {
        self.nodes[node].kind
    }

    /// The first node of the lane paired with `lane`.
    pub fn paired_start(&self, lane: LaneId) -> Option<NodeId> {
        let paired = self.lanes.get(lane)?.paired?;
        self.lanes.get(paired)?.first()
    }

    /// The last node of the lane paired with `lane`.
    pub fn paired_end(&self, lane: LaneId) -> Option<NodeId> {
        let paired = self.lanes.get(lane)?.paired?;
        self.lanes.get(paired)?.last()
    }

    /// Whether `node` is a junction edge leading into an intersection.
    pub fn is_junction_entry(&self, node: NodeId) -> bool {
        self.junction_lane(node)
            .map_or(false, |lane| lane.last() == Some(node))
    }

    /// Whether `node` is a junction edge leading out of an intersection.
    pub fn is_junction_exit(&self, node: NodeId) -> bool {
        self.junction_lane(node)
            .map_or(false, |lane| lane.first() == Some(node))
    }

    /// Gets the node `offset` places along the lane from `node`.
    ///
    /// With `wrap_around`, indices past either end wrap to the other end of the lane;
    /// otherwise `None` is returned.
    pub fn next_lane_node(&self, node: NodeId, offset: isize, wrap_around: bool) -> Option<NodeId> {
        let (lane, index) = self.nodes.get(node)?.lane?;
        let nodes = &self.lanes.get(lane)?.nodes;
        let len = nodes.len() as isize;
        let index = index as isize + offset;
        let index = if wrap_around {
            index.rem_euclid(len)
        } else if (0..len).contains(&index) {
            index
        } else {
            return None;
        };
        nodes.get(index as usize).copied()
    }

    /// The distance travelled going from `a` to the adjacent node `b`.
    ///
    /// Junction edges may sit apart from the stored path distance,
    /// so crossings of them are measured in a straight line.
    pub fn distance_between(&self, a: NodeId, b: NodeId) -> f64 {
        let (na, nb) = (&self.nodes[a], &self.nodes[b]);
        let crosses_junction =
            na.kind == NodeType::JunctionEdge || nb.kind == NodeType::JunctionEdge;
        if crosses_junction || nb.prev != Some(a) {
            na.position.distance(nb.position)
        } else {
            nb.distance_to_prev
        }
    }

    /// The road edges leaving `intersection` through one of its guide lanes,
    /// with the length of the lane taken.
    pub fn successor_intersections(
        &self,
        intersection: IntersectionId,
    ) -> impl Iterator<Item = (RoadEdge, f64)> + '_ {
        self.intersections
            .get(intersection)
            .into_iter()
            .flat_map(|i| i.guide_lanes().iter())
            .filter_map(move |guide| {
                let lane = self.lanes.get(guide.exit_lane)?;
                let edge = RoadEdge {
                    from: intersection,
                    to: lane.to,
                    road: lane.road,
                };
                Some((edge, self.lane_length(lane)))
            })
            .unique_by(|(edge, _)| *edge)
    }

    /// The path length of a lane.
    fn lane_length(&self, lane: &Lane) -> f64 {
        lane.nodes
            .iter()
            .skip(1)
            .map(|id| self.nodes[*id].distance_to_prev)
            .sum()
    }

    /// Maps a guide node to the node owning its occupancy.
    pub fn resolve(&self, node: NodeId) -> NodeId {
        match self.nodes.get(node).map(|n| n.occupancy) {
            Some(Occupancy::Guide(backing)) => backing,
            _ => node,
        }
    }

    /// The identity of a node as seen by other vehicles.
    pub fn identity(&self, node: NodeId) -> NodeId {
        self.resolve(node)
    }

    /// The vehicle occupying a node, if any.
    pub fn vehicle(&self, node: NodeId) -> Option<VehicleId> {
        match self.nodes.get(self.resolve(node))?.occupancy {
            Occupancy::Owned(vehicle) => vehicle,
            Occupancy::Guide(_) => None,
        }
    }

    pub fn has_vehicle(&self, node: NodeId) -> bool {
        self.vehicle(node).is_some()
    }

    /// Claims a node for a vehicle. Fails if another vehicle already occupies it.
    pub fn set_vehicle(&mut self, node: NodeId, vehicle: VehicleId) -> bool {
        let id = self.resolve(node);
        match self.nodes.get_mut(id).map(|n| &mut n.occupancy) {
            Some(Occupancy::Owned(Some(other))) if *other != vehicle => false,
            Some(Occupancy::Owned(slot)) => {
                *slot = Some(vehicle);
                true
            }
            _ => false,
        }
    }

    /// Releases a node held by a vehicle.
    /// Only the occupying vehicle may release a node; any other attempt is a no-op.
    pub fn unset_vehicle(&mut self, node: NodeId, vehicle: VehicleId) -> bool {
        let id = self.resolve(node);
        match self.nodes.get_mut(id).map(|n| &mut n.occupancy) {
            Some(Occupancy::Owned(slot)) if *slot == Some(vehicle) => {
                *slot = None;
                true
            }
            Some(Occupancy::Owned(Some(other))) => {
                error!(
                    "Vehicle {:?} tried to release node {:?} occupied by {:?}",
                    vehicle, id, other
                );
                false
            }
            _ => {
                trace!("Vehicle {:?} released unoccupied node {:?}", vehicle, id);
                false
            }
        }
    }

    /// Publishes a vehicle's current speed for other vehicles' yield decisions.
    pub fn publish_speed(&mut self, vehicle: VehicleId, speed: f64) {
        self.speeds.insert(vehicle, speed);
    }

    /// The last published speed of a vehicle.
    pub fn vehicle_speed(&self, vehicle: VehicleId) -> f64 {
        self.speeds.get(vehicle).copied().unwrap_or(0.0)
    }

    /// Releases every node held by a vehicle and forgets its speed.
    pub fn remove_vehicle(&mut self, vehicle: VehicleId) {
        self.speeds.remove(vehicle);
        for node in self.nodes.values_mut() {
            if node.occupancy == Occupancy::Owned(Some(vehicle)) {
                node.occupancy = Occupancy::Owned(None);
            }
        }
    }

    fn junction_lane(&self, node: NodeId) -> Option<&Lane> {
        let node = self.nodes.get(node)?;
        if node.kind != NodeType::JunctionEdge {
            return None;
        }
        self.lanes.get(node.lane()?)
    }

    fn make_junction_edge(&mut self, node: NodeId, intersection: IntersectionId) {
        let node = &mut self.nodes[node];
        node.kind = NodeType::JunctionEdge;
        node.intersection = Some(intersection);
    }

    fn link(&mut self, a: NodeId, b: NodeId) {
        let distance = self.straight_distance(a, b);
        self.nodes[a].next = Some(b);
        self.nodes[b].prev = Some(a);
        self.nodes[b].distance_to_prev = distance;
    }

    fn straight_distance(&self, a: NodeId, b: NodeId) -> f64 {
        self.nodes[a].position.distance(self.nodes[b].position)
    }

    /// The direction of travel at each node of a path: towards the following node,
    /// or away from the preceding one at the end of the path.
    fn path_directions(&self, path: &[NodeId]) -> Vec<Vector2d> {
        let fallback = Vector2d::new(1.0, 0.0);
        let pos = |id: NodeId| self.nodes[id].position;
        (0..path.len())
            .map(|i| match (i.checked_sub(1).map(|i| path[i]), path.get(i + 1)) {
                (_, Some(next)) => direction_between(pos(path[i]), pos(*next), fallback),
                (Some(prev), None) => direction_between(pos(prev), pos(path[i]), fallback),
                (None, None) => fallback,
            })
            .collect()
    }
}

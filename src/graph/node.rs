use crate::math::{Point2d, Vector2d};
use crate::{IntersectionId, LaneId, NodeId, TrafficLightId, VehicleId};
use smallvec::SmallVec;

/// The role a [LaneNode] plays in the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeType {
    /// An ordinary point along a lane.
    Default,
    /// The boundary between a road lane and an intersection.
    JunctionEdge,
    /// The first or last node of a lane that leads nowhere.
    End,
    /// The seam where one road's lane continues directly onto another's.
    RoadConnection,
    /// A point inside an intersection.
    Intersection,
}

/// Who may claim a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Occupancy {
    /// The node holds its own occupant.
    Owned(Option<VehicleId>),
    /// A guide node; occupancy and identity belong to the backing node.
    Guide(NodeId),
}

/// A conflicting approach that a node must give way to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct YieldNode {
    /// The node on the conflicting lane from which to look back for traffic.
    pub start: NodeId,
    /// The point where the conflicting traffic crosses our path.
    pub transition: NodeId,
}

/// A point on a directional lane.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LaneNode {
    pub(crate) id: NodeId,
    pub(crate) position: Point2d,
    /// Unit vector of the direction of travel at this node.
    pub(crate) direction: Vector2d,
    pub(crate) kind: NodeType,
    /// The lane this node belongs to, and its index within it.
    /// Nodes inside intersections have no lane.
    pub(crate) lane: Option<(LaneId, usize)>,
    pub(crate) intersection: Option<IntersectionId>,
    pub(crate) traffic_light: Option<TrafficLightId>,
    pub(crate) distance_to_prev: f64,
    pub(crate) next: Option<NodeId>,
    pub(crate) prev: Option<NodeId>,
    pub(crate) yield_nodes: SmallVec<[YieldNode; 2]>,
    pub(crate) yield_blocking_nodes: SmallVec<[NodeId; 4]>,
    pub(crate) occupancy: Occupancy,
}

impl LaneNode {
    pub(crate) fn new(id: NodeId, position: Point2d, kind: NodeType) -> Self {
        Self {
            id,
            position,
            direction: Vector2d::new(1.0, 0.0),
            kind,
            lane: None,
            intersection: None,
            traffic_light: None,
            distance_to_prev: 0.0,
            next: None,
            prev: None,
            yield_nodes: SmallVec::new(),
            yield_blocking_nodes: SmallVec::new(),
            occupancy: Occupancy::Owned(None),
        }
    }

    /// Gets the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The world space position of the node.
    pub fn position(&self) -> Point2d {
        self.position
    }

    /// A unit vector aligned with the direction of travel.
    pub fn direction(&self) -> Vector2d {
        self.direction
    }

    pub fn kind(&self) -> NodeType {
        self.kind
    }

    /// The lane the node belongs to, if it isn't inside an intersection.
    pub fn lane(&self) -> Option<LaneId> {
        self.lane.map(|(lane, _)| lane)
    }

    pub fn intersection(&self) -> Option<IntersectionId> {
        self.intersection
    }

    pub fn traffic_light(&self) -> Option<TrafficLightId> {
        self.traffic_light
    }

    /// The path distance from the previous node to this one.
    pub fn distance_to_prev(&self) -> f64 {
        self.distance_to_prev
    }

    pub fn yield_nodes(&self) -> &[YieldNode] {
        &self.yield_nodes
    }

    pub fn yield_blocking_nodes(&self) -> &[NodeId] {
        &self.yield_blocking_nodes
    }

    /// Whether the node lies inside an intersection.
    pub fn is_intersection(&self) -> bool {
        self.kind == NodeType::Intersection
    }
}

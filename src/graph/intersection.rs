use super::LaneGraph;
use crate::math::Point2d;
use crate::{IntersectionId, LaneId, NodeId, RoadId};
use rand::seq::SliceRandom;
use rand::Rng;
use smallvec::SmallVec;

/// The manoeuvre a guide lane performs through an intersection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TurnDirection {
    #[default]
    Straight,
    Left,
    Right,
    UTurn,
}

/// A step of a navigation path: leave intersection `from` along `road` towards `to`.
/// `to` is `None` for roads that lead out of the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoadEdge {
    pub from: IntersectionId,
    pub to: Option<IntersectionId>,
    pub road: RoadId,
}

/// A path through an intersection, from the last node of one lane
/// to the first node of another.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GuideLane {
    /// The junction edge the path starts from.
    pub entry: NodeId,
    /// The first guide node.
    pub start: NodeId,
    /// The last guide node.
    pub end: NodeId,
    /// The junction edge the path leads onto.
    pub exit: NodeId,
    /// The lane the path leads onto.
    pub exit_lane: LaneId,
    pub turn: TurnDirection,
}

/// A junction joining several lanes through guide lanes.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Intersection {
    id: IntersectionId,
    position: Point2d,
    guide_lanes: Vec<GuideLane>,
}

/// A chosen way through an intersection, and the node to wrap around to
/// if the chosen exit lane later loops back on itself.
pub type LaneChoice = (Option<NodeId>, GuideLane);

impl Intersection {
    pub(crate) fn new(id: IntersectionId, position: Point2d) -> Self {
        Self {
            id,
            position,
            guide_lanes: vec![],
        }
    }

    pub fn id(&self) -> IntersectionId {
        self.id
    }

    pub fn position(&self) -> Point2d {
        self.position
    }

    pub fn guide_lanes(&self) -> &[GuideLane] {
        &self.guide_lanes
    }

    pub(crate) fn add_guide_lane(&mut self, guide: GuideLane) {
        self.guide_lanes.push(guide);
    }

    /// The guide lanes a vehicle at `entry` may take.
    pub fn guide_lanes_from(&self, entry: NodeId) -> impl Iterator<Item = &GuideLane> + '_ {
        self.guide_lanes.iter().filter(move |g| g.entry == entry)
    }

    /// Finds the guide lane from `entry` which follows the navigation `edge`.
    ///
    /// Where several lanes of the road lead the right way, the one with the
    /// same lane index as the entry lane is preferred.
    pub fn get_new_lane_node(
        &self,
        graph: &LaneGraph,
        edge: &RoadEdge,
        entry: NodeId,
        turn: &mut TurnDirection,
    ) -> Option<LaneChoice> {
        if edge.from != self.id {
            return None;
        }
        let entry_index = graph
            .node(entry)
            .and_then(|n| n.lane())
            .and_then(|lane| graph.lane(lane))
            .map(|lane| lane.index());

        let candidates = self
            .guide_lanes_from(entry)
            .filter(|g| {
                graph
                    .lane(g.exit_lane)
                    .map_or(false, |lane| lane.road() == edge.road && lane.to() == edge.to)
            })
            .collect::<SmallVec<[_; 4]>>();

        let guide = candidates
            .iter()
            .find(|g| graph.lane(g.exit_lane).map(|l| l.index()) == entry_index)
            .or_else(|| candidates.first())
            .copied()?;

        *turn = guide.turn;
        Some((graph.paired_start(guide.exit_lane), *guide))
    }

    /// Picks a uniformly random guide lane from `entry`.
    pub fn get_random_lane_node(
        &self,
        graph: &LaneGraph,
        entry: NodeId,
        rng: &mut impl Rng,
        turn: &mut TurnDirection,
    ) -> Option<LaneChoice> {
        let candidates = self.guide_lanes_from(entry).collect::<SmallVec<[_; 4]>>();
        let guide = *candidates.choose(rng).copied()?;
        *turn = guide.turn;
        Some((graph.paired_start(guide.exit_lane), guide))
    }
}

use super::context::{AutoDriveContext, NavigationMode, TransitionKey};
use super::pathfinding::{find_route, random_route};
use super::setting::{AutoDriveSetting, EndBehaviour};
use crate::graph::{GuideLane, Intersection, LaneChoice, LaneGraph, NodeType, RoadEdge};
use crate::{IntersectionId, NodeId, VehicleId};
use log::{debug, warn};

/// The most nodes visited by a single walk along the graph.
const MAX_WALK_NODES: usize = 4096;

/// Graph traversal on behalf of one vehicle.
///
/// The agent owns no state of its own: it layers the vehicle's intersection
/// decisions, navigation path and end-of-road behaviour over the raw lane graph,
/// recording any decisions it makes in the vehicle's context.
pub struct AutoDriveAgent<'a> {
    pub(crate) context: &'a mut AutoDriveContext,
    pub(crate) setting: &'a AutoDriveSetting,
    pub(crate) graph: &'a LaneGraph,
    pub(crate) vehicle: VehicleId,
}

impl<'a> AutoDriveAgent<'a> {
    pub fn context(&self) -> &AutoDriveContext {
        self.context
    }

    /// The node following `node` on this vehicle's way.
    ///
    /// Entering an intersection follows the guide lane chosen for this crossing,
    /// choosing one first if needed. At the end of a road, `end_override`
    /// (or else the configured end behaviour) decides whether to wrap around.
    pub fn next(&mut self, node: NodeId, end_override: Option<EndBehaviour>) -> Option<NodeId> {
        if self.graph.is_junction_entry(node) {
            return self.update_and_get_guide_node(node).map(|guide| guide.start);
        }
        match self.graph.next(node) {
            Some(next) => Some(next),
            None if self.graph.kind(node) == NodeType::End => {
                match end_override.unwrap_or(self.setting.end_behaviour) {
                    EndBehaviour::Loop => self.loop_start(node),
                    EndBehaviour::Stop => None,
                }
            }
            None => None,
        }
    }

    /// The node preceding `node` on this vehicle's way.
    ///
    /// Leaving an intersection is traced back through the guide lane the vehicle took.
    pub fn prev(&self, node: NodeId, end_override: Option<EndBehaviour>) -> Option<NodeId> {
        if self.graph.is_junction_exit(node) {
            let taken = self.context.transitions.values().find(|g| g.exit == node);
            if let Some(guide) = taken {
                return Some(guide.end);
            }
        }
        match self.graph.prev(node) {
            Some(prev) => Some(prev),
            None if self.graph.kind(node) == NodeType::End => {
                match end_override.unwrap_or(self.setting.end_behaviour) {
                    EndBehaviour::Loop => {
                        let lane = self.graph.node(node)?.lane()?;
                        self.graph.paired_end(lane)
                    }
                    EndBehaviour::Stop => None,
                }
            }
            None => None,
        }
    }

    /// Gets the guide lane to take from the junction edge `entry`,
    /// deciding on one if this crossing hasn't been decided yet.
    ///
    /// With a navigation path, the next edge of the path picks the lane;
    /// an edge the intersection can't follow abandons the path in favour of random turns.
    pub fn update_and_get_guide_node(&mut self, entry: NodeId) -> Option<GuideLane> {
        let intersection_id = self.graph.node(entry)?.intersection()?;
        let key = TransitionKey {
            intersection: intersection_id,
            entry,
        };
        if let Some(guide) = self.context.transitions.get(&key) {
            return Some(*guide);
        }

        let graph = self.graph;
        let intersection = graph.intersection(intersection_id)?;
        let mut turn = self.context.turn_direction;
        let choice = match self.context.navigation_mode {
            NavigationMode::Path | NavigationMode::RandomNavigationPath => {
                self.navigated_lane(intersection, entry, &mut turn)
            }
            NavigationMode::Disabled | NavigationMode::Random => None,
        };
        let choice = choice.or_else(|| {
            intersection.get_random_lane_node(graph, entry, &mut self.context.rng, &mut turn)
        });

        let Some((loop_node, guide)) = choice else {
            warn!(
                "Vehicle {:?} found no way through intersection {:?} from node {:?}",
                self.vehicle, intersection_id, entry
            );
            return None;
        };
        self.context.turn_direction = turn;
        if loop_node.is_some() {
            self.context.loop_node = loop_node;
        }
        self.context.transitions.insert(key, guide);
        Some(guide)
    }

    /// Forgets the guide lane taken through `intersection` onto the junction edge `exit`.
    pub fn unset_intersection_transition(&mut self, intersection: IntersectionId, exit: NodeId) {
        self.context
            .transitions
            .retain(|key, guide| key.intersection != intersection || guide.exit != exit);
    }

    /// Plans a route to `destination` and switches to following it.
    /// Returns `false` if no route exists.
    pub fn set_destination(&mut self, destination: NodeId) -> bool {
        let graph = self.graph;
        let lane = graph.node(destination).and_then(|n| n.lane());
        let Some(lane) = lane.and_then(|l| graph.lane(l)) else {
            warn!("Navigation destination {:?} is not on a lane", destination);
            return false;
        };
        let Some(dst) = lane.from() else {
            warn!(
                "Navigation destination {:?} can't be reached through an intersection",
                destination
            );
            return false;
        };

        // Decisions already made for crossings ahead would contradict the new route
        let crossing = graph.node(self.context.current_node).and_then(|n| n.intersection());
        self.context
            .transitions
            .retain(|key, _| Some(key.intersection) == crossing);

        let Some(src) = self.upcoming_intersection() else {
            warn!("Vehicle {:?} has no intersection ahead to navigate from", self.vehicle);
            return false;
        };
        let Some(mut route) = find_route(graph, src, dst) else {
            warn!("No route from {:?} to {:?}", src, dst);
            return false;
        };
        route.push(RoadEdge {
            from: dst,
            to: lane.to(),
            road: lane.road(),
        });
        debug!("Vehicle {:?} navigating to {:?}: {:?}", self.vehicle, destination, route);
        self.context.navigation_path = route.into();
        self.context.navigation_end = Some(destination);
        self.context.navigation_mode = NavigationMode::Path;
        true
    }

    /// The nodes following (or preceding) `from`, up to and including
    /// the first node at least `reach` metres away.
    pub(crate) fn walk(&mut self, from: NodeId, reach: f64, forward: bool) -> Vec<NodeId> {
        let mut nodes = vec![];
        let mut node = from;
        let mut distance = 0.0;
        while distance < reach && nodes.len() < MAX_WALK_NODES {
            let (step, dist) = if forward {
                let Some(next) = self.next(node, Some(EndBehaviour::Stop)) else { break };
                (next, self.graph.distance_between(node, next))
            } else {
                let Some(prev) = self.prev(node, Some(EndBehaviour::Stop)) else { break };
                (prev, self.graph.distance_between(prev, node))
            };
            distance += dist;
            nodes.push(step);
            node = step;
        }
        nodes
    }

    /// The next intersection the vehicle will have to choose a way through.
    fn upcoming_intersection(&mut self) -> Option<IntersectionId> {
        let mut node = self.context.current_node;
        for _ in 0..MAX_WALK_NODES {
            if self.graph.is_junction_entry(node) {
                let intersection = self.graph.node(node)?.intersection()?;
                if !self.context.has_transition(intersection, node) {
                    return Some(intersection);
                }
            }
            node = self.next(node, Some(EndBehaviour::Stop))?;
        }
        None
    }

    /// Chooses a guide lane following the navigation path, rebuilding the path if it has run out.
    fn navigated_lane(
        &mut self,
        intersection: &Intersection,
        entry: NodeId,
        turn: &mut crate::graph::TurnDirection,
    ) -> Option<LaneChoice> {
        if self.context.navigation_path.is_empty() {
            self.rebuild_navigation_path(intersection.id());
        }
        let edge = self.context.navigation_path.pop_front()?;
        let choice = intersection.get_new_lane_node(self.graph, &edge, entry, turn);
        if choice.is_none() {
            warn!(
                "Vehicle {:?} can't follow {:?} from node {:?}; switching to random turns",
                self.vehicle, edge, entry
            );
            self.context.navigation_mode = NavigationMode::Random;
            self.context.navigation_path.clear();
            self.context.navigation_end = None;
        }
        choice
    }

    fn rebuild_navigation_path(&mut self, from: IntersectionId) {
        match self.context.navigation_mode {
            NavigationMode::RandomNavigationPath => {
                if let Some(route) = random_route(self.graph, from, &mut self.context.rng) {
                    debug!("Vehicle {:?} planned route {:?}", self.vehicle, route);
                    self.context.navigation_path = route.into();
                }
            }
            NavigationMode::Path => {
                debug!("Vehicle {:?} completed its route", self.vehicle);
                self.context.navigation_mode = NavigationMode::Random;
                self.context.navigation_end = None;
            }
            NavigationMode::Disabled | NavigationMode::Random => {}
        }
    }

    /// Where to wrap to from the end node `node`.
    fn loop_start(&self, node: NodeId) -> Option<NodeId> {
        let lane = self.graph.node(node)?.lane()?;
        let paired = self.graph.lane(lane)?.paired();
        let on_paired = |node: NodeId| self.graph.node(node).and_then(|n| n.lane()) == paired;
        match self.context.loop_node {
            Some(loop_node) if paired.is_some() && on_paired(loop_node) => Some(loop_node),
            _ => self.graph.paired_start(lane),
        }
    }
}

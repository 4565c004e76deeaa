use crate::graph::{LaneGraph, RoadEdge};
use crate::IntersectionId;
use rand::seq::SliceRandom;
use rand::Rng;

/// The number of random destinations tried before giving up on planning a route.
const RANDOM_ROUTE_ATTEMPTS: usize = 4;

/// Finds the shortest sequence of road edges leading from one intersection to another.
pub(crate) fn find_route(
    graph: &LaneGraph,
    src: IntersectionId,
    dst: IntersectionId,
) -> Option<Vec<RoadEdge>> {
    if src == dst {
        return Some(vec![]);
    }
    let (route, _) = pathfinding::directed::dijkstra::dijkstra(
        &src,
        |id| successors(graph, *id),
        |id| *id == dst,
    )?;
    route
        .windows(2)
        .map(|pair| cheapest_edge(graph, pair[0], pair[1]))
        .collect()
}

/// Plans a route from `src` to a randomly chosen, reachable intersection.
pub(crate) fn random_route(
    graph: &LaneGraph,
    src: IntersectionId,
    rng: &mut impl Rng,
) -> Option<Vec<RoadEdge>> {
    let candidates = graph
        .iter_intersections()
        .map(|i| i.id())
        .filter(|id| *id != src)
        .collect::<Vec<_>>();
    (0..RANDOM_ROUTE_ATTEMPTS)
        .filter_map(|_| candidates.choose(rng))
        .find_map(|dst| find_route(graph, src, *dst).filter(|route| !route.is_empty()))
}

fn successors(
    graph: &LaneGraph,
    id: IntersectionId,
) -> impl Iterator<Item = (IntersectionId, usize)> + '_ {
    graph
        .successor_intersections(id)
        .filter_map(|(edge, length)| Some((edge.to?, cost(length))))
}

fn cheapest_edge(graph: &LaneGraph, from: IntersectionId, to: IntersectionId) -> Option<RoadEdge> {
    graph
        .successor_intersections(from)
        .filter(|(edge, _)| edge.to == Some(to))
        .min_by_key(|(_, length)| cost(*length))
        .map(|(edge, _)| edge)
}

fn cost(length: f64) -> usize {
    (10.0 * length) as _
}

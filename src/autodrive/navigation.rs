use super::agent::AutoDriveAgent;
use super::setting::EndBehaviour;
use crate::IntersectionId;

/// A junction edge crossing, reported once per current node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NavigationEvent {
    /// The vehicle reached the junction edge leading into an intersection.
    IntersectionEntry(IntersectionId),
    /// The vehicle reached the junction edge leading out of an intersection.
    IntersectionExit(IntersectionId),
}

/// Checks whether the vehicle's current node borders an intersection.
///
/// Each current node is only considered once, so an event fires on the tick
/// the vehicle reaches the junction edge and not again while it stays there.
pub fn update(agent: &mut AutoDriveAgent) -> Option<NavigationEvent> {
    let current = agent.context.current_node;
    if agent.context.last_event_node == Some(current) {
        return None;
    }
    agent.context.last_event_node = Some(current);

    let graph = agent.graph;
    let intersection = graph.node(current)?.intersection()?;
    if graph.is_junction_entry(current) {
        let next = agent.next(current, Some(EndBehaviour::Stop))?;
        let inside = graph.node(next)?.is_intersection();
        inside.then_some(NavigationEvent::IntersectionEntry(intersection))
    } else if graph.is_junction_exit(current) {
        let prev = agent.prev(current, Some(EndBehaviour::Stop))?;
        let inside = graph.node(prev)?.is_intersection();
        inside.then_some(NavigationEvent::IntersectionExit(intersection))
    } else {
        None
    }
}

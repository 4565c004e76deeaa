use crate::graph::{GuideLane, RoadEdge, TurnDirection};
use crate::{IntersectionId, NodeId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::collections::{HashMap, VecDeque};

/// Below this speed in m/s a vehicle counts as stopped.
const STOP_SPEED: f64 = 0.1;

/// Mean and standard deviation of the pause before pulling away after a stop, in s.
const RESTART_DELAY_MEAN: f64 = 0.8;
const RESTART_DELAY_STDDEV: f64 = 0.3;

/// How a driver picks its way through intersections.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NavigationMode {
    /// No route planning; turns are random.
    Disabled,
    /// Turns are random.
    #[default]
    Random,
    /// Follows routes to random destinations, planning a new one on arrival.
    RandomNavigationPath,
    /// Follows a route to a chosen destination.
    Path,
}

/// The longitudinal phase of driving.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DrivingState {
    Accelerating,
    Driving,
    Braking,
    Stopped,
}

/// Identifies a crossing of an intersection from a given entry node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct TransitionKey {
    pub intersection: IntersectionId,
    pub entry: NodeId,
}

/// The mutable driving state of one vehicle.
#[derive(Clone, Debug)]
pub struct AutoDriveContext {
    /// The node the vehicle is currently at.
    pub(crate) current_node: NodeId,
    /// The node the vehicle is steering towards.
    pub(crate) target: NodeId,
    pub(crate) prev_target: Option<NodeId>,
    /// The node the hazard scan last settled on.
    pub(crate) brake_target: Option<NodeId>,
    /// The signed distance in m left before the vehicle must be stopped.
    pub(crate) brake_undershoot: f64,
    /// The missed target a repositioning vehicle is returning to.
    pub(crate) repositioning_target: Option<NodeId>,
    pub(crate) navigation_mode: NavigationMode,
    /// Road edges still to be taken, front first.
    pub(crate) navigation_path: VecDeque<RoadEdge>,
    /// The destination of a [NavigationMode::Path] route.
    pub(crate) navigation_end: Option<NodeId>,
    /// The intersection most recently entered.
    pub(crate) prev_intersection: Option<IntersectionId>,
    pub(crate) turn_direction: TurnDirection,
    /// Whether the vehicle is still at the node it was spawned at.
    pub(crate) is_entering_network: bool,
    pub(crate) entry_node: NodeId,
    /// Where to wrap to upon reaching the end of the road under loop behaviour.
    pub(crate) loop_node: Option<NodeId>,
    pub(crate) driving_state: DrivingState,
    /// Time in s left before pulling away after a stop.
    pub(crate) restart_delay: f64,
    /// The chosen guide lane for each intersection crossing in progress.
    pub(crate) transitions: HashMap<TransitionKey, GuideLane>,
    /// The current node when intersection events were last checked.
    pub(crate) last_event_node: Option<NodeId>,
    pub(crate) rng: StdRng,
}

impl AutoDriveContext {
    pub(crate) fn new(
        start: NodeId,
        target: NodeId,
        navigation_mode: NavigationMode,
        seed: Option<u64>,
    ) -> Self {
        Self {
            current_node: start,
            target,
            prev_target: None,
            brake_target: None,
            brake_undershoot: f64::INFINITY,
            repositioning_target: None,
            navigation_mode,
            navigation_path: VecDeque::new(),
            navigation_end: None,
            prev_intersection: None,
            turn_direction: TurnDirection::default(),
            is_entering_network: true,
            entry_node: start,
            loop_node: None,
            driving_state: DrivingState::Accelerating,
            restart_delay: 0.0,
            transitions: HashMap::new(),
            last_event_node: None,
            rng: match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            },
        }
    }

    pub fn current_node(&self) -> NodeId {
        self.current_node
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn prev_target(&self) -> Option<NodeId> {
        self.prev_target
    }

    pub fn brake_target(&self) -> Option<NodeId> {
        self.brake_target
    }

    pub fn brake_undershoot(&self) -> f64 {
        self.brake_undershoot
    }

    pub fn navigation_mode(&self) -> NavigationMode {
        self.navigation_mode
    }

    pub fn navigation_path(&self) -> impl Iterator<Item = &RoadEdge> {
        self.navigation_path.iter()
    }

    pub fn prev_intersection(&self) -> Option<IntersectionId> {
        self.prev_intersection
    }

    pub fn turn_direction(&self) -> TurnDirection {
        self.turn_direction
    }

    pub fn driving_state(&self) -> DrivingState {
        self.driving_state
    }

    /// Whether a guide lane has been chosen for crossing `intersection` from `entry`.
    pub fn has_transition(&self, intersection: IntersectionId, entry: NodeId) -> bool {
        self.transitions.contains_key(&TransitionKey {
            intersection,
            entry,
        })
    }

    /// Forgets every per-crossing decision, e.g. after the vehicle is moved.
    pub(crate) fn reset(&mut self) {
        self.transitions.clear();
        self.prev_intersection = None;
        self.brake_target = None;
        self.brake_undershoot = f64::INFINITY;
        self.repositioning_target = None;
        self.prev_target = None;
        self.last_event_node = None;
    }

    /// Advances the driving state given the vehicle's speed and whether it is braking.
    /// Returns `false` while the vehicle must hold still.
    pub(crate) fn update_driving_state(
        &mut self,
        speed: f64,
        braking: bool,
        cruise: f64,
        dt: f64,
    ) -> bool {
        use DrivingState::*;
        let stopped = speed.abs() < STOP_SPEED;
        self.driving_state = match (self.driving_state, braking, stopped) {
            (Stopped, true, _) => Stopped,
            (_, true, true) => {
                self.restart_delay = self.sample_restart_delay();
                Stopped
            }
            (_, true, false) => Braking,
            (Stopped, false, _) if self.restart_delay > 0.0 => {
                self.restart_delay -= dt;
                Stopped
            }
            (Stopped | Braking, false, _) => Accelerating,
            (Accelerating, false, _) if speed >= 0.95 * cruise => Driving,
            (state, false, _) => state,
        };
        self.driving_state != Stopped
    }

    fn sample_restart_delay(&mut self) -> f64 {
        match Normal::new(RESTART_DELAY_MEAN, RESTART_DELAY_STDDEV) {
            Ok(distr) => distr.sample(&mut self.rng).clamp(0.2, 2.0),
            Err(_) => RESTART_DELAY_MEAN,
        }
    }
}

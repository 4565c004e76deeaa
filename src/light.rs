/// A fixed-time traffic signal.
///
/// The light cycles green, amber, red, then back to green.
/// A light can also be forced into a state, which restarts the timing of that state.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrafficLight {
    /// The current state.
    state: LightState,
    /// The time since the current state was entered, in s.
    since: f64,
    /// The duration of the green phase in s.
    green_time: f64,
    /// The duration of the amber phase in s.
    amber_time: f64,
    /// The duration of the red phase in s.
    red_time: f64,
}

/// The state of a traffic light.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LightState {
    Red,
    Amber,
    Green,
}

impl TrafficLight {
    /// Creates a new traffic light, starting in the given state.
    pub fn new(state: LightState, green_time: f64, amber_time: f64, red_time: f64) -> Self {
        Self {
            state,
            since: 0.0,
            green_time,
            amber_time,
            red_time,
        }
    }

    /// Gets the current state.
    pub fn state(&self) -> LightState {
        self.state
    }

    /// Whether the light currently allows vehicles to proceed.
    pub fn is_green(&self) -> bool {
        self.state == LightState::Green
    }

    /// Forces the light into the given state.
    pub fn set_state(&mut self, state: LightState) {
        self.state = state;
        self.since = 0.0;
    }

    /// Advances the light timing by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        use LightState::*;
        self.since += dt;
        loop {
            let (duration, next) = match self.state {
                Green => (self.green_time, Amber),
                Amber => (self.amber_time, Red),
                Red => (self.red_time, Green),
            };
            // A zero-length cycle would never terminate
            if self.since < duration || duration <= 0.0 {
                break;
            }
            self.since -= duration;
            self.state = next;
        }
    }
}

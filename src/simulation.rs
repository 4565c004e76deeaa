use crate::autodrive::{AutoDrive, AutoDriveSetting, StartLocation};
#[cfg(feature = "debug")]
use crate::debug::take_debug_frame;
use crate::error::SetupError;
use crate::graph::LaneGraph;
use crate::math::Vector2d;
use crate::vehicle::{KinematicVehicle, VehicleAttributes, VehicleControl};
use crate::{NodeId, VehicleId};
use slotmap::SlotMap;

/// A simulated vehicle and its driver.
#[derive(Clone, Debug)]
pub struct Vehicle {
    id: VehicleId,
    body: KinematicVehicle,
    autodrive: AutoDrive,
}

impl Vehicle {
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The vehicle's physical state.
    pub fn body(&self) -> &KinematicVehicle {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut KinematicVehicle {
        &mut self.body
    }

    pub fn autodrive(&self) -> &AutoDrive {
        &self.autodrive
    }
}

/// A traffic simulation of autonomously driven vehicles on a lane graph.
#[derive(Default)]
pub struct Simulation {
    /// The road network.
    graph: LaneGraph,
    /// The vehicles being simulated.
    vehicles: SlotMap<VehicleId, Vehicle>,
    /// The current frame of simulation.
    frame: usize,
    /// Debugging information from the previously simulated frame.
    #[cfg(feature = "debug")]
    debug: serde_json::Value,
}

impl Simulation {
    /// Creates a new simulation over the given network.
    pub fn new(graph: LaneGraph) -> Self {
        Self {
            graph,
            ..Default::default()
        }
    }

    /// Gets a reference to the road network.
    pub fn graph(&self) -> &LaneGraph {
        &self.graph
    }

    /// Gets a mutable reference to the road network, e.g. to change traffic lights.
    pub fn graph_mut(&mut self) -> &mut LaneGraph {
        &mut self.graph
    }

    /// Adds a vehicle to the simulation, placed at its starting node.
    ///
    /// # Parameters
    /// * `attributes` - The physical attributes of the vehicle
    /// * `setting` - How the vehicle drives
    /// * `start` - The lane node the vehicle starts at
    pub fn add_vehicle(
        &mut self,
        attributes: &VehicleAttributes,
        setting: AutoDriveSetting,
        start: StartLocation,
    ) -> Result<VehicleId, SetupError> {
        let graph = &self.graph;
        self.vehicles.try_insert_with_key(|id| {
            let autodrive = AutoDrive::new(id, setting, graph, start)?;
            let node = autodrive.current_node();
            let forward = graph
                .node(node)
                .map_or(Vector2d::new(1.0, 0.0), |n| n.direction());
            let mut body = KinematicVehicle::new(attributes, graph.position(node), forward);
            body.set_max_speed_forward(setting.speed);
            Ok(Vehicle {
                id,
                body,
                autodrive,
            })
        })
    }

    /// Removes a vehicle from the simulation, releasing the nodes it occupies.
    pub fn remove_vehicle(&mut self, id: VehicleId) {
        if self.vehicles.remove(id).is_some() {
            self.graph.remove_vehicle(id);
        }
    }

    /// Routes a vehicle to the given node. Returns `false` if no route was found.
    pub fn set_vehicle_destination(&mut self, id: VehicleId, destination: NodeId) -> bool {
        match self.vehicles.get_mut(id) {
            Some(vehicle) => vehicle.autodrive.set_destination(&self.graph, destination),
            None => false,
        }
    }

    /// Sets whether a vehicle's navigation path is drawn into the debug output.
    pub fn set_navigation_path_visibility(&mut self, id: VehicleId, visible: bool) {
        if let Some(vehicle) = self.vehicles.get_mut(id) {
            vehicle.autodrive.set_navigation_path_visibility(visible);
        }
    }

    /// Advances the simulation by `dt` seconds.
    ///
    /// Each vehicle's driver runs in turn against the same network, after which
    /// all vehicles move. For a stable simulation, keep `dt` below around 0.1.
    pub fn step(&mut self, dt: f64) {
        self.graph.update_lights(dt);
        for vehicle in self.vehicles.values_mut() {
            vehicle.autodrive.tick(&mut self.graph, &mut vehicle.body, dt);
        }
        for vehicle in self.vehicles.values_mut() {
            vehicle.body.integrate(dt);
        }
        self.frame += 1;

        #[cfg(feature = "debug")]
        {
            self.debug = take_debug_frame();
        }
    }

    /// Gets the current simulation frame index.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Returns an iterator over all the vehicles in the simulation.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get_vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }

    pub fn get_vehicle_mut(&mut self, id: VehicleId) -> Option<&mut Vehicle> {
        self.vehicles.get_mut(id)
    }

    /// Gets the debugging information for the previously simulated frame as JSON array.
    #[cfg(feature = "debug")]
    pub fn debug(&mut self) -> serde_json::Value {
        self.debug.clone()
    }
}

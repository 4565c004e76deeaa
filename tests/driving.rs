//! Tests that drive vehicles along simple lane graphs.

use assert_approx_eq::assert_approx_eq;
use slotmap::SlotMap;
use traffic_autodrive::autodrive::brake_distance;
use traffic_autodrive::math::{Point2d, Vector2d};
use traffic_autodrive::{
    AutoDrive, AutoDriveSetting, DriveStatus, EndBehaviour, Hazard, IntersectionId,
    KinematicVehicle, LaneGraph, LaneId, LaneSide, LightState, NodeId, SetupError, Simulation,
    StartLocation, TrafficLight, TurnDirection, VehicleAttributes, VehicleControl, VehicleId,
};

const DT: f64 = 0.05;

fn p(x: f64, y: f64) -> Point2d {
    Point2d::new(x, y)
}

/// Adds a straight lane of `n` equal segments.
fn line(graph: &mut LaneGraph, side: LaneSide, from: Point2d, to: Point2d, n: usize) -> LaneId {
    let road = graph.add_road();
    let points = (0..=n)
        .map(|i| from + (to - from) * (i as f64 / n as f64))
        .collect::<Vec<_>>();
    graph.add_lane(road, side, 0, &points)
}

/// Adds a pair of opposing lanes along the x axis, driving on the right.
fn two_way_road(graph: &mut LaneGraph, length: f64, n: usize) -> (LaneId, LaneId) {
    let road = graph.add_road();
    let points = |y: f64, reverse: bool| {
        let mut points = (0..=n)
            .map(|i| p(length * i as f64 / n as f64, y))
            .collect::<Vec<_>>();
        if reverse {
            points.reverse();
        }
        points
    };
    let ahead = graph.add_lane(road, LaneSide::Right, 0, &points(-2.0, false));
    let back = graph.add_lane(road, LaneSide::Left, 0, &points(2.0, true));
    graph.pair_lanes(ahead, back);
    (ahead, back)
}

fn vehicle_ids(n: usize) -> Vec<VehicleId> {
    let mut ids = SlotMap::<VehicleId, ()>::with_key();
    (0..n).map(|_| ids.insert(())).collect()
}

fn setting(end_behaviour: EndBehaviour) -> AutoDriveSetting {
    AutoDriveSetting {
        end_behaviour,
        seed: Some(42),
        ..Default::default()
    }
}

/// Creates a driver and a vehicle standing at the given lane node.
fn spawn(
    graph: &LaneGraph,
    id: VehicleId,
    setting: AutoDriveSetting,
    lane: LaneId,
    index: usize,
) -> (AutoDrive, KinematicVehicle) {
    let driver = AutoDrive::new(id, setting, graph, StartLocation { lane, index }).unwrap();
    let node = graph.node(driver.current_node()).unwrap();
    let mut vehicle = KinematicVehicle::new(
        &VehicleAttributes::default(),
        node.position(),
        node.direction(),
    );
    vehicle.set_max_speed_forward(setting.speed);
    (driver, vehicle)
}

/// Creates the only driver on the network.
fn spawn_alone(
    graph: &LaneGraph,
    end_behaviour: EndBehaviour,
    lane: LaneId,
    index: usize,
) -> (AutoDrive, KinematicVehicle) {
    spawn(graph, vehicle_ids(1)[0], setting(end_behaviour), lane, index)
}

/// A stationary vehicle on the x axis, heading towards +x.
fn eastbound(x: f64) -> KinematicVehicle {
    KinematicVehicle::new(&VehicleAttributes::default(), p(x, 0.0), Vector2d::new(1.0, 0.0))
}

fn step(driver: &mut AutoDrive, graph: &mut LaneGraph, vehicle: &mut KinematicVehicle) {
    driver.tick(graph, vehicle, DT);
    vehicle.integrate(DT);
}

fn lane_nodes(graph: &LaneGraph, lane: LaneId) -> Vec<NodeId> {
    graph.lane(lane).unwrap().nodes().to_vec()
}

/// Test that a vehicle follows a straight lane, accounting for the distance it covers.
#[test]
fn vehicle_follows_lane() {
    let mut graph = LaneGraph::new();
    let (lane, _) = two_way_road(&mut graph, 400.0, 40);
    let (mut driver, mut vehicle) = spawn_alone(&graph, EndBehaviour::Loop, lane, 0);

    let mut x = vehicle.position().x;
    for _ in 0..200 {
        step(&mut driver, &mut graph, &mut vehicle);
        assert!(vehicle.position().x >= x);
        assert_approx_eq!(vehicle.position().y, -2.0, 0.01);
        x = vehicle.position().x;
    }
    assert_eq!(driver.status(), DriveStatus::Driving);
    assert!(x > 50.0);

    // The odometer trails the vehicle by at most one node spacing
    let current = graph.position(driver.current_node());
    assert_approx_eq!(driver.total_distance(), current.x, 1e-6);
    assert!((x - current.x).abs() <= 10.0);
}

#[test]
fn stops_before_road_end() {
    let mut graph = LaneGraph::new();
    let lane = line(&mut graph, LaneSide::Right, p(0.0, 0.0), p(60.0, 0.0), 6);
    let (mut driver, mut vehicle) = spawn_alone(&graph, EndBehaviour::Stop, lane, 0);

    for _ in 0..600 {
        step(&mut driver, &mut graph, &mut vehicle);
    }
    assert_eq!(driver.hazard(), Some(Hazard::RoadEnd));
    assert_approx_eq!(vehicle.speed(), 0.0);
    assert!(vehicle.position().x > 50.0);
    assert!(vehicle.position().x < 60.0);
}

#[test]
fn next_and_prev_are_inverse() {
    let mut graph = LaneGraph::new();
    let (ahead, back) = two_way_road(&mut graph, 50.0, 5);
    let (mut driver, _) = spawn_alone(&graph, EndBehaviour::Loop, ahead, 0);
    let nodes = lane_nodes(&graph, ahead);
    let stop = Some(EndBehaviour::Stop);

    let mut agent = driver.agent(&graph);
    for node in &nodes[..nodes.len() - 1] {
        let next = agent.next(*node, stop).unwrap();
        assert_eq!(agent.prev(next, stop), Some(*node));
    }
    for node in &nodes[1..] {
        let prev = agent.prev(*node, stop).unwrap();
        assert_eq!(agent.next(prev, stop), Some(*node));
    }

    // Network boundaries stop or wrap to the paired lane
    let (first, last) = (nodes[0], nodes[nodes.len() - 1]);
    let paired = lane_nodes(&graph, back);
    assert_eq!(agent.next(last, stop), None);
    assert_eq!(agent.prev(first, stop), None);
    assert_eq!(agent.next(last, None), Some(paired[0]));
    assert_eq!(agent.prev(first, None), Some(paired[paired.len() - 1]));
}

/// A four-way junction approached from the west, with exits to the north, east and south.
struct Junction {
    graph: LaneGraph,
    intersection: IntersectionId,
    approach: LaneId,
    exits: [LaneId; 3],
}

fn junction() -> Junction {
    let mut graph = LaneGraph::new();
    let approach = line(&mut graph, LaneSide::Right, p(0.0, 0.0), p(40.0, 0.0), 4);
    let north = line(&mut graph, LaneSide::Right, p(50.0, 10.0), p(50.0, 50.0), 4);
    let east = line(&mut graph, LaneSide::Right, p(60.0, 0.0), p(100.0, 0.0), 4);
    let south = line(&mut graph, LaneSide::Right, p(50.0, -10.0), p(50.0, -50.0), 4);
    let intersection = graph.add_intersection(p(50.0, 0.0));
    graph.connect_lane_end(approach, intersection);
    for exit in [north, east, south] {
        graph.connect_lane_start(exit, intersection);
    }

    let middle = graph.add_intersection_node(intersection, p(45.0, 0.0));
    let turns = [
        (north, TurnDirection::Left, p(50.0, 5.0)),
        (east, TurnDirection::Straight, p(55.0, 0.0)),
        (south, TurnDirection::Right, p(50.0, -5.0)),
    ];
    for (exit, turn, point) in turns {
        let second = graph.add_intersection_node(intersection, point);
        graph.add_guide_lane(intersection, approach, exit, turn, &[middle, second]);
    }
    Junction {
        graph,
        intersection,
        approach,
        exits: [north, east, south],
    }
}

#[test]
fn turn_choice_is_stable_within_a_crossing() {
    let Junction {
        graph,
        intersection,
        approach,
        ..
    } = junction();
    let entry = *lane_nodes(&graph, approach).last().unwrap();
    let (mut driver, _) = spawn_alone(&graph, EndBehaviour::Stop, approach, 0);

    let mut agent = driver.agent(&graph);
    let guide = agent.update_and_get_guide_node(entry).unwrap();
    for _ in 0..20 {
        assert_eq!(agent.next(entry, None), Some(guide.start));
    }
    assert_eq!(agent.context().turn_direction(), guide.turn);
    assert!(agent.context().has_transition(intersection, entry));

    // Backing out of the exit retraces the chosen guide lane
    assert_eq!(agent.prev(guide.exit, None), Some(guide.end));

    agent.unset_intersection_transition(intersection, guide.exit);
    assert!(!agent.context().has_transition(intersection, entry));
}

#[test]
fn random_turns_use_every_exit() {
    let Junction {
        graph,
        intersection,
        approach,
        exits,
    } = junction();
    let entry = *lane_nodes(&graph, approach).last().unwrap();
    let (mut driver, _) = spawn_alone(&graph, EndBehaviour::Stop, approach, 0);

    let mut seen = vec![];
    let mut agent = driver.agent(&graph);
    for _ in 0..100 {
        let guide = agent.update_and_get_guide_node(entry).unwrap();
        if !seen.contains(&guide.exit_lane) {
            seen.push(guide.exit_lane);
        }
        agent.unset_intersection_transition(intersection, guide.exit);
    }
    assert_eq!(seen.len(), exits.len());
}

#[test]
fn drives_to_destination() {
    let Junction {
        mut graph,
        approach,
        exits,
        ..
    } = junction();
    let [_, _, south] = exits;
    let destination = lane_nodes(&graph, south)[3];
    let (mut driver, mut vehicle) = spawn_alone(&graph, EndBehaviour::Stop, approach, 0);

    assert!(driver.set_destination(&graph, destination));
    let points = driver.navigation_path_points(&graph).unwrap();
    assert_eq!(points.first(), Some(&p(0.0, 0.0)));
    assert_eq!(points.last(), Some(&p(50.0, -40.0)));
    assert!(points.contains(&p(50.0, -5.0)));

    for _ in 0..1200 {
        step(&mut driver, &mut graph, &mut vehicle);
    }
    let lane = graph.node(driver.current_node()).unwrap().lane();
    assert_eq!(lane, Some(south));
    assert!(vehicle.position().y < -20.0);
}

#[test]
fn brake_scan_stays_within_braking_distance() {
    let mut graph = LaneGraph::new();
    let lane = line(&mut graph, LaneSide::Right, p(0.0, 0.0), p(100.0, 0.0), 50);
    let nodes = lane_nodes(&graph, lane);
    let ids = vehicle_ids(2);
    assert!(graph.set_vehicle(nodes[15], ids[1]));

    let setting = setting(EndBehaviour::Loop);
    for speed in 0..25 {
        let speed = speed as f64;
        let (mut driver, mut vehicle) = spawn(&graph, ids[0], setting, lane, 0);
        vehicle.set_speed(speed);
        driver.tick(&mut graph, &mut vehicle, DT);

        let reach = brake_distance(&setting, speed, vehicle.tire_friction(), false);
        let target = driver.context().brake_target().unwrap();
        assert!(graph.position(target).x <= reach);
        assert_eq!(driver.hazard().is_some(), reach >= 30.0);
        graph.remove_vehicle(ids[0]);
    }
}

#[test]
fn second_claim_sees_vehicle_ahead() {
    let mut graph = LaneGraph::new();
    let lane = line(&mut graph, LaneSide::Right, p(0.0, 0.0), p(100.0, 0.0), 20);
    let node = lane_nodes(&graph, lane)[4];
    let ids = vehicle_ids(2);
    let setting = setting(EndBehaviour::Loop);
    let (mut first, mut first_vehicle) = spawn(&graph, ids[0], setting, lane, 4);
    let (mut second, mut second_vehicle) = spawn(&graph, ids[1], setting, lane, 4);

    first.tick(&mut graph, &mut first_vehicle, DT);
    assert_eq!(graph.vehicle(node), Some(ids[0]));
    assert!(!graph.set_vehicle(node, ids[1]));

    second.tick(&mut graph, &mut second_vehicle, DT);
    assert_eq!(second.hazard(), Some(Hazard::VehicleAhead));
    assert!(second.occupied_nodes().is_empty());
    assert_eq!(graph.vehicle(node), Some(ids[0]));
}

#[test]
fn claims_stop_at_an_occupied_node() {
    let mut graph = LaneGraph::new();
    let lane = line(&mut graph, LaneSide::Right, p(0.0, 0.0), p(20.0, 0.0), 20);
    let nodes = lane_nodes(&graph, lane);
    let ids = vehicle_ids(2);
    assert!(graph.set_vehicle(nodes[7], ids[1]));

    let attributes = VehicleAttributes {
        length: 8.0,
        ..Default::default()
    };
    let (mut driver, _) = spawn(&graph, ids[0], setting(EndBehaviour::Loop), lane, 5);
    let mut vehicle = KinematicVehicle::new(&attributes, p(5.0, 0.0), Vector2d::new(1.0, 0.0));
    driver.tick(&mut graph, &mut vehicle, DT);

    // 5m reach each way, but node 7 is taken
    let claimed = driver.occupied_nodes();
    assert!(claimed.contains(&nodes[5]));
    assert!(claimed.contains(&nodes[6]));
    assert!(claimed.contains(&nodes[4]));
    assert!(claimed.contains(&nodes[1]));
    for node in &nodes[7..] {
        assert!(!claimed.contains(node));
    }
    assert_eq!(graph.vehicle(nodes[8]), None);
    assert_eq!(graph.vehicle(nodes[7]), Some(ids[1]));
}

#[test]
fn claims_move_with_the_vehicle() {
    let mut graph = LaneGraph::new();
    let lane = line(&mut graph, LaneSide::Right, p(0.0, 0.0), p(200.0, 0.0), 100);
    let nodes = lane_nodes(&graph, lane);
    let id = vehicle_ids(1)[0];
    let (mut driver, mut vehicle) = spawn(&graph, id, setting(EndBehaviour::Stop), lane, 0);

    for _ in 0..100 {
        step(&mut driver, &mut graph, &mut vehicle);
    }
    let held = nodes
        .iter()
        .filter(|node| graph.vehicle(**node) == Some(id))
        .count();
    assert_eq!(held, driver.occupied_nodes().len());
    assert_eq!(graph.vehicle(nodes[0]), None);
    assert!(driver.occupied_nodes().contains(&driver.current_node()));
}

#[test]
fn red_light_holds_until_green() {
    let mut graph = LaneGraph::new();
    let approach = line(&mut graph, LaneSide::Right, p(0.0, 0.0), p(50.0, 0.0), 5);
    let exit = line(&mut graph, LaneSide::Right, p(60.0, 0.0), p(120.0, 0.0), 6);
    let intersection = graph.add_intersection(p(55.0, 0.0));
    graph.connect_lane_end(approach, intersection);
    graph.connect_lane_start(exit, intersection);
    let straight = TurnDirection::Straight;
    graph.add_intersection_path(intersection, approach, exit, straight, &[p(55.0, 0.0)]);
    let stop_line = *lane_nodes(&graph, approach).last().unwrap();
    let light = graph.add_traffic_light(TrafficLight::new(LightState::Red, 1000.0, 3.0, 1000.0));
    graph.set_node_light(stop_line, light);

    let (mut driver, mut vehicle) = spawn_alone(&graph, EndBehaviour::Stop, approach, 0);
    for _ in 0..400 {
        step(&mut driver, &mut graph, &mut vehicle);
    }
    assert_eq!(driver.hazard(), Some(Hazard::RedLight));
    assert_eq!(driver.context().brake_target(), Some(stop_line));
    assert_eq!(driver.context().prev_intersection(), None);
    assert_approx_eq!(vehicle.speed(), 0.0);
    assert!(vehicle.position().x < 50.0);
    assert_eq!(graph.light(light).map(|l| l.state()), Some(LightState::Red));

    graph.light_mut(light).unwrap().set_state(LightState::Green);
    step(&mut driver, &mut graph, &mut vehicle);
    assert_eq!(driver.hazard(), None);
    for _ in 0..400 {
        step(&mut driver, &mut graph, &mut vehicle);
    }
    assert_eq!(driver.context().prev_intersection(), Some(intersection));
    assert!(vehicle.position().x > 60.0);
}

/// The steering target is held at a junction edge that is also the brake target,
/// even with no light there, until the intersection has been entered.
#[test]
fn target_held_at_unentered_junction_edge() {
    let mut graph = LaneGraph::new();
    let road = graph.add_road();
    let approach = graph.add_lane(
        road,
        LaneSide::Right,
        0,
        &[p(0.0, 0.0), p(5.0, 0.0), p(8.0, 0.0), p(9.5, 0.0)],
    );
    let exit = line(&mut graph, LaneSide::Right, p(15.5, 0.0), p(35.5, 0.0), 2);
    let intersection = graph.add_intersection(p(12.5, 0.0));
    graph.connect_lane_end(approach, intersection);
    graph.connect_lane_start(exit, intersection);
    let straight = TurnDirection::Straight;
    let guide =
        graph.add_intersection_path(intersection, approach, exit, straight, &[p(12.5, 0.0)]);

    let (mut driver, mut vehicle) = spawn_alone(&graph, EndBehaviour::Stop, approach, 2);
    assert_eq!(driver.context().target(), guide.entry);

    let mut held = 0;
    for _ in 0..200 {
        step(&mut driver, &mut graph, &mut vehicle);
        if driver.context().target() != guide.entry {
            break;
        }
        assert_eq!(driver.context().prev_intersection(), None);
        held += 1;
    }
    assert!(held > 0);
    assert_eq!(driver.context().prev_intersection(), Some(intersection));
}

#[test]
fn target_behind_is_not_advanced() {
    let mut graph = LaneGraph::new();
    let lane = line(&mut graph, LaneSide::Right, p(0.0, 0.0), p(50.0, 0.0), 10);
    let nodes = lane_nodes(&graph, lane);
    let (mut driver, _) = spawn_alone(&graph, EndBehaviour::Stop, lane, 0);
    assert_eq!(driver.context().target(), nodes[1]);

    // 3m past the target, inside the 5m lookahead but short of an overshoot
    let mut vehicle = eastbound(8.0);
    driver.tick(&mut graph, &mut vehicle, DT);
    assert_eq!(driver.context().target(), nodes[1]);
    assert_eq!(driver.status(), DriveStatus::Driving);
}

#[test]
fn repositions_after_overshoot() {
    let mut graph = LaneGraph::new();
    let lane = line(&mut graph, LaneSide::Right, p(0.0, 0.0), p(100.0, 0.0), 20);
    let nodes = lane_nodes(&graph, lane);
    let (mut driver, _) = spawn_alone(&graph, EndBehaviour::Stop, lane, 2);
    assert_eq!(driver.context().target(), nodes[3]);

    // 11m past the target at 5m/s, beyond the 5m lookahead
    let mut vehicle = eastbound(26.0);
    vehicle.set_speed(5.0);
    step(&mut driver, &mut graph, &mut vehicle);
    assert_eq!(driver.status(), DriveStatus::RepositioningInitiated);
    assert_approx_eq!(vehicle.max_speed_forward(), 3.0);

    let mut statuses = vec![driver.status()];
    for _ in 0..400 {
        step(&mut driver, &mut graph, &mut vehicle);
        if statuses.last() != Some(&driver.status()) {
            statuses.push(driver.status());
        }
        if driver.status() == DriveStatus::Driving {
            break;
        }
    }
    assert_eq!(
        statuses,
        vec![
            DriveStatus::RepositioningInitiated,
            DriveStatus::Repositioning,
            DriveStatus::Driving
        ]
    );
    assert_eq!(driver.current_node(), nodes[3]);
    assert_eq!(driver.context().target(), nodes[4]);
    assert_approx_eq!(vehicle.max_speed_forward(), driver.setting().speed);
    assert_approx_eq!(vehicle.max_speed_reverse(), VehicleAttributes::default().max_speed_reverse);
}

#[test]
fn loops_onto_paired_lane() {
    let mut graph = LaneGraph::new();
    let (ahead, back) = two_way_road(&mut graph, 50.0, 5);
    let (mut driver, mut vehicle) = spawn_alone(&graph, EndBehaviour::Loop, ahead, 3);

    let mut looped = false;
    for _ in 0..300 {
        step(&mut driver, &mut graph, &mut vehicle);
        if vehicle.forward().x < 0.0 {
            looped = true;
            break;
        }
    }
    assert!(looped);
    let lane = graph.node(driver.current_node()).unwrap().lane();
    assert_eq!(lane, Some(back));
    assert_approx_eq!(vehicle.position().y, 2.0, 0.5);
    assert!(lane_nodes(&graph, ahead)
        .iter()
        .all(|node| graph.vehicle(*node).is_none()));
}

#[test]
fn simulation_rejects_bad_start() {
    let mut graph = LaneGraph::new();
    let lane = line(&mut graph, LaneSide::Right, p(0.0, 0.0), p(30.0, 0.0), 3);
    let mut sim = Simulation::new(graph);
    let attributes = VehicleAttributes::default();

    let start = StartLocation { lane, index: 4 };
    let err = sim.add_vehicle(&attributes, setting(EndBehaviour::Stop), start);
    assert_eq!(err, Err(SetupError::InvalidLaneIndex { index: 4, len: 4 }));
    assert_eq!(sim.iter_vehicles().count(), 0);
}

#[test]
fn removed_vehicle_releases_its_nodes() {
    let mut graph = LaneGraph::new();
    let (lane, _) = two_way_road(&mut graph, 100.0, 20);
    let nodes = lane_nodes(&graph, lane);
    let mut sim = Simulation::new(graph);
    let attributes = VehicleAttributes::default();
    let id = sim
        .add_vehicle(&attributes, setting(EndBehaviour::Loop), StartLocation { lane, index: 2 })
        .unwrap();
    let other = sim
        .add_vehicle(&attributes, setting(EndBehaviour::Loop), StartLocation { lane, index: 10 })
        .unwrap();

    for _ in 0..20 {
        sim.step(DT);
    }
    assert_eq!(sim.frame(), 20);
    assert!(nodes.iter().any(|node| sim.graph().vehicle(*node) == Some(id)));
    assert!(sim.get_vehicle(id).unwrap().body().speed() > 0.0);

    sim.remove_vehicle(id);
    assert!(sim.get_vehicle(id).is_none());
    assert!(nodes.iter().all(|node| sim.graph().vehicle(*node) != Some(id)));
    assert!(nodes.iter().any(|node| sim.graph().vehicle(*node) == Some(other)));
}

#[test]
fn simulation_routes_vehicle() {
    let Junction {
        graph,
        approach,
        exits,
        ..
    } = junction();
    let [north, _, _] = exits;
    let destination = lane_nodes(&graph, north)[2];
    let mut sim = Simulation::new(graph);
    let id = sim
        .add_vehicle(
            &VehicleAttributes::default(),
            setting(EndBehaviour::Stop),
            StartLocation { lane: approach, index: 0 },
        )
        .unwrap();

    // Lanes not starting at an intersection can't be routed to
    let start = lane_nodes(sim.graph(), approach)[2];
    assert!(!sim.set_vehicle_destination(id, start));
    assert!(sim.set_vehicle_destination(id, destination));
    sim.set_navigation_path_visibility(id, true);

    for _ in 0..1200 {
        sim.step(DT);
    }
    let vehicle = sim.get_vehicle(id).unwrap();
    assert!(vehicle.autodrive().navigation_path_visible());
    let node = sim.graph().node(vehicle.autodrive().current_node()).unwrap();
    assert_eq!(node.lane(), Some(north));
    assert!(vehicle.body().position().y > 20.0);
}

use std::time::Instant;

use traffic_autodrive::math::Point2d;
use traffic_autodrive::{
    AutoDriveSetting, LaneGraph, LaneId, LaneSide, LightState, Simulation, StartLocation,
    TrafficLight, TurnDirection, VehicleAttributes, VehicleType,
};

/// Builds a two-way road broken by a signalised intersection at x = 110.
fn network() -> (LaneGraph, [LaneId; 4]) {
    let mut graph = LaneGraph::new();
    let points = |from: f64, to: f64, y: f64| {
        let step = (to - from) / 20.0;
        (0..=20)
            .map(|i| Point2d::new(from + step * i as f64, y))
            .collect::<Vec<_>>()
    };

    let west_road = graph.add_road();
    let west_in = graph.add_lane(west_road, LaneSide::Right, 0, &points(0.0, 100.0, -2.0));
    let west_out = graph.add_lane(west_road, LaneSide::Left, 0, &points(100.0, 0.0, 2.0));
    graph.pair_lanes(west_in, west_out);

    let east_road = graph.add_road();
    let east_out = graph.add_lane(east_road, LaneSide::Right, 0, &points(120.0, 220.0, -2.0));
    let east_in = graph.add_lane(east_road, LaneSide::Left, 0, &points(220.0, 120.0, 2.0));
    graph.pair_lanes(east_out, east_in);

    let junction = graph.add_intersection(Point2d::new(110.0, 0.0));
    graph.connect_lane_end(west_in, junction);
    graph.connect_lane_start(west_out, junction);
    graph.connect_lane_end(east_in, junction);
    graph.connect_lane_start(east_out, junction);
    let crossing = |y: f64| [105.0, 110.0, 115.0].map(|x| Point2d::new(x, y));
    let straight = TurnDirection::Straight;
    graph.add_intersection_path(junction, west_in, east_out, straight, &crossing(-2.0));
    let mut back = crossing(2.0);
    back.reverse();
    graph.add_intersection_path(junction, east_in, west_out, straight, &back);

    let light = graph.add_traffic_light(TrafficLight::new(LightState::Green, 20.0, 3.0, 20.0));
    for lane in [west_in, east_in] {
        if let Some(node) = graph.lane(lane).and_then(|l| l.last()) {
            graph.set_node_light(node, light);
        }
    }
    (graph, [west_in, west_out, east_out, east_in])
}

fn main() {
    let (graph, lanes) = network();
    let mut sim = Simulation::new(graph);
    for (i, lane) in lanes.iter().enumerate() {
        let types = [VehicleType::Car, VehicleType::Bus, VehicleType::Truck];
        for (index, vehicle_type) in [0, 8, 16].into_iter().zip(types) {
            let setting = AutoDriveSetting {
                vehicle_type,
                seed: Some((10 * i + index) as u64),
                ..Default::default()
            };
            let attributes = VehicleAttributes::for_type(setting.vehicle_type);
            let start = StartLocation { lane: *lane, index };
            if let Err(err) = sim.add_vehicle(&attributes, setting, start) {
                eprintln!("Skipping vehicle: {}", err);
            }
        }
    }

    println!("Simulating...");
    const NUM_FRAMES: u32 = 1000;
    for _ in 0..5 {
        let start = Instant::now();
        for _ in 0..NUM_FRAMES {
            sim.step(0.05);
        }
        let frame = start.elapsed() / NUM_FRAMES;
        let driven: f64 = sim.iter_vehicles().map(|v| v.autodrive().total_distance()).sum();
        println!(
            "Avg. frame: {:?} --> {:.0}x speedup ({} vehs, {:.0}m driven)",
            frame,
            0.05 / frame.as_secs_f64(),
            sim.iter_vehicles().count(),
            driven,
        );
    }
}

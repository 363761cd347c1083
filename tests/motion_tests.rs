use chrono::Utc;
use medifleet::adapters::outbound::init_noop_logger;
use medifleet::domains::fleet::{EnergyProfile, FleetEvent, Priority, Robot, RobotStatus, Task, TaskStatus, World};
use medifleet::domains::grid::{Cell, GridWorld};
use medifleet::domains::motion::{MotionController, ReplanOutcome, StepOutcome};
use medifleet::domains::pathfinding::Pathfinder;
use std::collections::BTreeSet;

fn world_with_assigned_task(path: Vec<Cell>) -> World {
    let mut grid = GridWorld::new(6, 6).unwrap();
    grid.add_waypoint("PHA", Cell::new(3, 3), None).unwrap();
    let mut world = World::new(grid);
    world
        .add_robot(Robot::new("R1".to_string(), path[0], EnergyProfile::default()))
        .unwrap();

    let mut task = Task::new("t1".to_string(), "PHA".to_string(), Cell::new(3, 3), Priority(5), Utc::now(), 1);
    task.open_bidding(BTreeSet::from(["R1".to_string()])).unwrap();
    task.record_bid("R1", 40.0).unwrap();
    task.award("R1").unwrap();
    world.insert_task(task).unwrap();
    world.robot_mut("R1").unwrap().begin_route("t1", path).unwrap();
    world
}

#[test]
fn test_single_cell_route_arrives_on_first_step() {
    let mut world = world_with_assigned_task(vec![Cell::new(3, 3)]);
    let outcome = MotionController::new(init_noop_logger()).step(&mut world, "R1").unwrap();

    assert_eq!(outcome, StepOutcome::Arrived { task_id: Some("t1".to_string()) });
    assert_eq!(world.task("t1").unwrap().status(), TaskStatus::Complete);
    assert!(matches!(
        world.take_events().as_slice(),
        [FleetEvent::TaskCompleted { robot_id, .. }] if robot_id == "R1"
    ));
}

#[test]
fn test_diagonal_step_drains_more_energy() {
    let mut world = world_with_assigned_task(vec![Cell::new(2, 2), Cell::new(3, 3)]);
    let outcome = MotionController::new(init_noop_logger()).step(&mut world, "R1").unwrap();

    assert!(matches!(outcome, StepOutcome::Arrived { .. }));
    assert!((world.robot("R1").unwrap().energy - 99.3).abs() < 1e-9);
}

#[test]
fn test_idle_robot_does_not_step() {
    let mut world = world_with_assigned_task(vec![Cell::new(0, 0), Cell::new(1, 1)]);
    world.robot_mut("R1").unwrap().arrive().unwrap();
    let outcome = MotionController::new(init_noop_logger()).step(&mut world, "R1").unwrap();
    assert_eq!(outcome, StepOutcome::NotMoving);
}

#[test]
fn test_replanning_without_a_live_task_fails_at_once() {
    let mut world = world_with_assigned_task(vec![Cell::new(0, 0), Cell::new(1, 1)]);
    world.robot_mut("R1").unwrap().block().unwrap();
    world.robot_mut("R1").unwrap().current_task = None;
    world.tick = 7;

    let outcome = MotionController::new(init_noop_logger())
        .replan(&mut world, &Pathfinder::default(), "R1")
        .unwrap();
    assert_eq!(outcome, ReplanOutcome::Failed { task_id: None });
    let robot = world.robot("R1").unwrap();
    assert_eq!(robot.status(), RobotStatus::Failed);
    assert_eq!(robot.failed_at_tick, Some(7));
    assert!(world.take_events().is_empty());
}

#[test]
fn test_replan_resumes_from_current_cell() {
    let mut world = world_with_assigned_task(vec![Cell::new(0, 0), Cell::new(1, 1), Cell::new(2, 2), Cell::new(3, 3)]);
    world.grid.block(Cell::new(1, 1)).unwrap();
    let motion = MotionController::new(init_noop_logger());

    assert_eq!(motion.step(&mut world, "R1").unwrap(), StepOutcome::Blocked { at: Cell::new(1, 1) });
    let outcome = motion.replan(&mut world, &Pathfinder::default(), "R1").unwrap();
    assert!(matches!(outcome, ReplanOutcome::Resumed { .. }));

    let robot = world.robot("R1").unwrap();
    assert_eq!(robot.status(), RobotStatus::Moving);
    assert_eq!(robot.path.first(), Some(&Cell::new(0, 0)));
    assert_eq!(robot.path_index, 1);
    assert_eq!(world.task("t1").unwrap().status(), TaskStatus::Assigned);
}

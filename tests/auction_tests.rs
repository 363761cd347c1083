use chrono::Utc;
use medifleet::adapters::outbound::init_noop_logger;
use medifleet::domains::auction::{Auctioneer, BidPolicy, BidRejection};
use medifleet::domains::fleet::{
    EnergyProfile, FailureReason, FleetEvent, Priority, Robot, RobotStatus, Task, TaskStatus, World,
};
use medifleet::domains::grid::{Axis, Cell, DynamicObstacle, GridWorld};
use medifleet::domains::pathfinding::Pathfinder;
use proptest::prelude::*;
use std::collections::BTreeSet;

fn auctioneer() -> Auctioneer {
    Auctioneer::new(BidPolicy::default(), init_noop_logger())
}

fn world(robots: &[(&str, Cell, f64)]) -> World {
    let mut grid = GridWorld::new(8, 8).unwrap();
    grid.add_waypoint("PHA", Cell::new(4, 3), None).unwrap();
    grid.add_waypoint("LAB", Cell::new(7, 7), None).unwrap();
    let mut world = World::new(grid);
    for (id, cell, energy) in robots {
        world
            .add_robot(Robot::new(id.to_string(), *cell, EnergyProfile::default()).with_energy(*energy))
            .unwrap();
    }
    world
}

fn add_task(world: &mut World, id: &str, destination: &str, priority: u8) {
    let target = world.grid.waypoint(destination).unwrap().cell;
    let sequence = world.next_sequence();
    world
        .insert_task(Task::new(
            id.to_string(),
            destination.to_string(),
            target,
            Priority(priority),
            Utc::now(),
            sequence,
        ))
        .unwrap();
}

#[test]
fn test_announce_invites_only_robots_with_energy() {
    let mut world = world(&[("R1", Cell::new(0, 0), 90.0), ("R2", Cell::new(0, 1), 15.0)]);
    add_task(&mut world, "t1", "PHA", 5);

    let opened = auctioneer().announce(&mut world).unwrap();
    assert_eq!(opened, vec!["t1".to_string()]);

    let task = world.task("t1").unwrap();
    assert_eq!(task.status(), TaskStatus::Bidding);
    assert_eq!(task.potential_bidders.len(), 1);
    assert!(task.potential_bidders.contains("R1"));
    assert_eq!(task.bidding_rounds, 1);
    assert_eq!(world.robot("R1").unwrap().status(), RobotStatus::Bidding);
    assert_eq!(world.robot("R2").unwrap().status(), RobotStatus::Idle);
}

#[test]
fn test_bid_includes_energy_and_priority_terms() {
    let mut world = world(&[("R1", Cell::new(1, 3), 80.0)]);
    add_task(&mut world, "t1", "PHA", 1);
    let auctioneer = auctioneer();
    auctioneer.announce(&mut world).unwrap();

    let attempt = auctioneer
        .place_bid(&mut world, &Pathfinder::default(), "R1")
        .unwrap()
        .unwrap();
    let bid = attempt.result.unwrap();
    assert_eq!(bid.path_cost, 30);
    assert_eq!(bid.value, 30.0 + 2.0 + 5.0);
    assert_eq!(world.task("t1").unwrap().bids["R1"], bid.value);
    assert_eq!(world.robot("R1").unwrap().status(), RobotStatus::Idle);
}

#[test]
fn test_obstacle_on_destination_rejects_the_bid() {
    let mut world = world(&[("R1", Cell::new(0, 0), 100.0)]);
    add_task(&mut world, "t1", "PHA", 5);
    let auctioneer = auctioneer();
    auctioneer.announce(&mut world).unwrap();
    world
        .grid
        .add_obstacle(DynamicObstacle::new("cart".to_string(), Cell::new(4, 3), Cell::new(4, 6), Axis::Horizontal, 10).unwrap())
        .unwrap();

    let attempt = auctioneer
        .place_bid(&mut world, &Pathfinder::default(), "R1")
        .unwrap()
        .unwrap();
    assert_eq!(attempt.result, Err(BidRejection::ObstacleOnDestination));
    assert!(world.task("t1").unwrap().bids.is_empty());
}

#[test]
fn test_settle_fails_rounds_without_bids() {
    let mut world = world(&[("R1", Cell::new(0, 0), 100.0)]);
    add_task(&mut world, "t1", "PHA", 5);
    let auctioneer = auctioneer();
    auctioneer.announce(&mut world).unwrap();

    // The robot still owes its bid, so nothing settles yet.
    assert!(auctioneer.settle_rounds(&mut world).unwrap().is_empty());

    for cell in [(3, 2), (3, 3), (3, 4), (4, 2), (4, 4), (5, 2), (5, 3), (5, 4)] {
        world.grid.block(Cell::from(cell)).unwrap();
    }
    let attempt = auctioneer
        .place_bid(&mut world, &Pathfinder::default(), "R1")
        .unwrap()
        .unwrap();
    assert_eq!(attempt.result, Err(BidRejection::NoPath));

    let failed = auctioneer.settle_rounds(&mut world).unwrap();
    assert_eq!(failed, vec!["t1".to_string()]);
    let task = world.task("t1").unwrap();
    assert_eq!(task.status(), TaskStatus::Failed);
    assert_eq!(task.failure_reason, Some(FailureReason::NoBids));
    assert!(matches!(
        world.take_events().as_slice(),
        [FleetEvent::TaskFailed { reason: FailureReason::NoBids, .. }]
    ));
}

#[test]
fn test_arbitration_orders_by_priority_then_age() {
    let mut world = world(&[("R1", Cell::new(0, 0), 100.0)]);
    add_task(&mut world, "older", "PHA", 5);
    add_task(&mut world, "newer", "LAB", 5);
    add_task(&mut world, "urgent", "LAB", 0);
    let auctioneer = auctioneer();
    let pathfinder = Pathfinder::default();
    auctioneer.announce(&mut world).unwrap();
    assert_eq!(
        world.robot("R1").unwrap().pending_bids,
        ["urgent", "older", "newer"].map(String::from)
    );
    while auctioneer.place_bid(&mut world, &pathfinder, "R1").unwrap().is_some() {}

    let awards = auctioneer.arbitrate(&mut world, &pathfinder).unwrap();
    assert_eq!(awards.len(), 1);
    assert_eq!(awards[0].task_id, "urgent");
    assert_eq!(world.task("older").unwrap().status(), TaskStatus::Bidding);
    assert_eq!(world.task("newer").unwrap().status(), TaskStatus::Bidding);
}

#[test]
fn test_busy_bidders_are_skipped_at_arbitration() {
    let mut world = world(&[("R1", Cell::new(4, 2), 100.0), ("R2", Cell::new(0, 0), 100.0)]);
    add_task(&mut world, "t1", "PHA", 5);
    let auctioneer = auctioneer();
    let pathfinder = Pathfinder::default();
    auctioneer.announce(&mut world).unwrap();
    auctioneer.place_bid(&mut world, &pathfinder, "R1").unwrap();
    auctioneer.place_bid(&mut world, &pathfinder, "R2").unwrap();

    // R1 bid lowest but got sent elsewhere before arbitration.
    world
        .robot_mut("R1")
        .unwrap()
        .begin_route("other", vec![Cell::new(4, 2), Cell::new(5, 2)])
        .unwrap();

    let awards = auctioneer.arbitrate(&mut world, &pathfinder).unwrap();
    assert_eq!(awards[0].robot_id, "R2");
    assert_eq!(world.task("t1").unwrap().assignee.as_deref(), Some("R2"));
}

#[test]
fn test_stale_award_rolls_back_to_announced() {
    let mut world = world(&[("R1", Cell::new(0, 0), 100.0)]);
    add_task(&mut world, "t1", "PHA", 5);
    let auctioneer = auctioneer();
    let pathfinder = Pathfinder::default();
    auctioneer.announce(&mut world).unwrap();
    auctioneer.place_bid(&mut world, &pathfinder, "R1").unwrap();

    // A cart parks on the destination between bid and award.
    world
        .grid
        .add_obstacle(DynamicObstacle::new("cart".to_string(), Cell::new(4, 3), Cell::new(4, 6), Axis::Horizontal, 10).unwrap())
        .unwrap();
    let awards = auctioneer.arbitrate(&mut world, &pathfinder).unwrap();
    assert!(awards.is_empty());

    let task = world.task("t1").unwrap();
    assert_eq!(task.status(), TaskStatus::Announced);
    assert!(task.bids.is_empty());
    assert!(task.assignee.is_none());
    assert_eq!(world.robot("R1").unwrap().status(), RobotStatus::Idle);

    let reopened = auctioneer.announce(&mut world).unwrap();
    assert_eq!(reopened, vec!["t1".to_string()]);
    assert_eq!(world.task("t1").unwrap().bidding_rounds, 2);
}

proptest! {
    #[test]
    fn test_arbitration_picks_the_cheapest_idle_robot(
        offers in prop::collection::vec((0u8..4, any::<bool>()), 1..7)
    ) {
        let ids: Vec<String> = (0..offers.len()).map(|i| format!("R{}", i)).collect();
        let robots: Vec<(&str, Cell, f64)> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), Cell::new(0, i), 100.0))
            .collect();
        let mut world = world(&robots);
        add_task(&mut world, "t1", "LAB", 5);

        let task = world.task_mut("t1").unwrap();
        task.open_bidding(ids.iter().cloned().collect::<BTreeSet<_>>()).unwrap();
        for (id, (value, _)) in ids.iter().zip(&offers) {
            task.record_bid(id, 10.0 + f64::from(*value)).unwrap();
        }
        for (i, (id, (_, busy))) in ids.iter().zip(&offers).enumerate() {
            if *busy {
                let robot = world.robot_mut(id).unwrap();
                robot.begin_route("elsewhere", vec![Cell::new(0, i)]).unwrap();
            }
        }

        let expected = offers
            .iter()
            .enumerate()
            .filter(|(_, (_, busy))| !busy)
            .min_by_key(|(i, (value, _))| (*value, *i))
            .map(|(i, _)| ids[i].clone());

        let awards = auctioneer().arbitrate(&mut world, &Pathfinder::default()).unwrap();
        match expected {
            Some(winner) => {
                prop_assert_eq!(awards.len(), 1);
                prop_assert_eq!(&awards[0].robot_id, &winner);
                prop_assert_eq!(world.task("t1").unwrap().assignee.as_deref(), Some(winner.as_str()));
            }
            None => {
                prop_assert!(awards.is_empty());
                prop_assert_eq!(world.task("t1").unwrap().status(), TaskStatus::Bidding);
            }
        }
    }
}

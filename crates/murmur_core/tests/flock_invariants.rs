//! End-to-end properties of the tick pipeline.

use murmur_core::glam::{Quat, Vec3};
use murmur_core::{
    steering_terms, BoidStore, CellAggregates, FlockConfig, ForceParams, GridJitter, Simulation,
    SpatialHashGrid, Weights,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const DT: f32 = 1.0 / 60.0;

#[test]
fn speed_invariant_holds_every_tick() {
    let config = FlockConfig::default().with_seed(17);
    let speed = config.boid_speed;
    let mut sim = Simulation::initialize(300, config).unwrap();

    for _ in 0..120 {
        sim.step(DT).unwrap();
        for heading in sim.store().headings() {
            let velocity = *heading * speed;
            assert!((velocity.length() - speed).abs() < 1e-3, "|v| = {}", velocity.length());
        }
    }
}

#[test]
fn containment_over_ten_seconds() {
    let config = FlockConfig::default().with_cage_size(50.0).with_seed(2024);
    let half_extent = config.cage_half_extent;
    let turn_dist = config.avoid_walls_turn_dist;
    let speed = config.boid_speed;
    let mut sim = Simulation::initialize(500, config).unwrap();

    const K: f32 = 5.0;
    for tick in 0..600 {
        sim.step(DT).unwrap();
        let store = sim.store();
        for (position, heading) in store.positions().iter().zip(store.headings()) {
            let velocity = *heading * speed;
            assert!(position.is_finite(), "tick {tick}: position {position}");
            assert!(velocity.is_finite(), "tick {tick}: velocity {velocity}");
            assert!(
                position.abs().max_element() <= half_extent + turn_dist * K,
                "tick {tick}: {position} escaped the cage"
            );
        }
    }
    assert_eq!(sim.time().tick_count(), 600);
}

#[test]
fn lone_boid_force_is_only_wall_avoidance() {
    let config = FlockConfig::default();
    let params = ForceParams::from(&config);
    let mut rng = SmallRng::seed_from_u64(8);

    for _ in 0..200 {
        let position = Vec3::new(
            rng.gen_range(-25.0..25.0),
            rng.gen_range(-25.0..25.0),
            rng.gen_range(-25.0..25.0),
        );
        let heading = Vec3::new(rng.gen_range(-1.0..1.0), 1.0, 0.0).normalize();

        let grid = SpatialHashGrid::new(config.perception_radius, GridJitter::draw(&mut rng, 5.0));
        grid.insert_all(&[position]);
        let cells = CellAggregates::merge(&grid.into_groups(), vec![position], vec![heading]).unwrap();

        let terms = steering_terms(position, heading, &cells.cell_of(0), &params);
        assert_eq!(terms.separation + terms.cohesion + terms.alignment, Vec3::ZERO);

        let near_wall = 25.0 - position.abs().max_element() < config.avoid_walls_turn_dist;
        if near_wall {
            let expected = -position.normalize() * config.weights.avoid_walls;
            assert!(terms.total().abs_diff_eq(expected, 1e-4));
        } else {
            assert_eq!(terms.total(), Vec3::ZERO);
        }
    }
}

#[test]
fn pair_in_one_cell_matches_closed_form() {
    let config = FlockConfig::default();
    let params = ForceParams::from(&config);
    let weights = config.weights;

    let positions = vec![Vec3::new(1.0, 1.0, 1.0), Vec3::new(3.0, 2.0, 1.5)];
    let headings = vec![Vec3::X, Vec3::new(0.0, 0.6, 0.8)];

    let grid = SpatialHashGrid::new(config.perception_radius, GridJitter::IDENTITY);
    grid.insert_all(&positions);
    assert_eq!(grid.cell_count(), 1);
    let cells = CellAggregates::merge(&grid.into_groups(), positions.clone(), headings.clone()).unwrap();

    for (own, other) in [(0usize, 1usize), (1, 0)] {
        let cell = cells.cell_of(own);
        assert_eq!(cell.nearby_count(), 1);

        let terms = steering_terms(positions[own], headings[own], &cell, &params);
        let offset = positions[other] - positions[own];
        let dir = offset.normalize();
        let need_to_leave = (1.0 - offset.length_squared() / 25.0).max(0.0);
        let expected = -dir * weights.separation * need_to_leave
            + dir * weights.cohesion
            + headings[other] * weights.alignment;
        assert!(terms.total().abs_diff_eq(expected, 1e-4), "{} vs {}", terms.total(), expected);
    }
}

#[test]
fn close_pairs_rarely_split_under_jitter() {
    let radius = 5.0;
    let separation = 0.05 * radius;
    let mut rng = SmallRng::seed_from_u64(99);
    let draws = 4000;
    let mut split = 0;

    for _ in 0..draws {
        let a = Vec3::new(
            rng.gen_range(-25.0..25.0),
            rng.gen_range(-25.0..25.0),
            rng.gen_range(-25.0..25.0),
        );
        let direction = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        )
        .try_normalize()
        .unwrap_or(Vec3::X);
        let b = a + direction * separation;

        let grid = SpatialHashGrid::new(radius, GridJitter::draw(&mut rng, radius));
        if grid.cell_of(a) != grid.cell_of(b) {
            split += 1;
        }
    }

    let fraction = split as f32 / draws as f32;
    assert!(fraction < 0.15, "{split} of {draws} close pairs were split");
}

#[test]
fn seed_reproduces_initial_state_and_jitter() {
    let config = FlockConfig::default().with_seed(123);
    let a = Simulation::initialize(50, config.clone()).unwrap();
    let b = Simulation::initialize(50, config).unwrap();
    assert_eq!(a.store().positions(), b.store().positions());
    assert_eq!(a.store().rotations(), b.store().rotations());

    let mut rng_a = SmallRng::seed_from_u64(5);
    let mut rng_b = SmallRng::seed_from_u64(5);
    for _ in 0..10 {
        assert_eq!(GridJitter::draw(&mut rng_a, 5.0), GridJitter::draw(&mut rng_b, 5.0));
    }
}

#[test]
fn aligned_flock_keeps_formation() {
    // Every boid in one cell with the same heading: alignment pulls along the
    // current heading and nothing else acts, so they all fly straight.
    let config = FlockConfig {
        weights: Weights {
            separation: 0.0,
            cohesion: 0.0,
            alignment: 5.0,
            avoid_walls: 0.0,
        },
        ..FlockConfig::default()
    };
    let positions: Vec<Vec3> = (0..5).map(|i| Vec3::new(i as f32 * 0.1, 0.0, 0.0)).collect();
    let store = BoidStore::from_poses(positions.clone(), vec![Quat::IDENTITY; 5]).unwrap();
    let mut sim = Simulation::initialize_with(store, config).unwrap();

    for _ in 0..30 {
        sim.step(DT).unwrap();
    }
    for (start, now) in positions.iter().zip(sim.store().positions()) {
        let expected = *start + Vec3::Z * 10.0 * 30.0 * DT;
        assert!(now.abs_diff_eq(expected, 1e-3), "{now} vs {expected}");
    }
}

#[test]
fn overflowing_tick_is_rolled_back() {
    use murmur_core::schedule::StageFault;
    use murmur_core::TickError;

    let mut sim = Simulation::initialize(40, FlockConfig::default().with_seed(4)).unwrap();
    sim.step(DT).unwrap();
    let positions = sim.store().positions().to_vec();
    let rotations = sim.store().rotations().to_vec();

    // Finite delta whose displacement overflows f32.
    let err = sim.step(1.0e38).unwrap_err();
    match err {
        TickError::Stage(stage) => {
            assert_eq!(stage.stage, "integrate");
            assert!(matches!(stage.fault, StageFault::NonFinite { .. }));
        }
        other => panic!("unexpected error {other}"),
    }

    assert_eq!(sim.store().positions(), positions.as_slice());
    assert_eq!(sim.store().rotations(), rotations.as_slice());
    assert_eq!(sim.time().tick_count(), 1);
    assert_eq!(sim.counter().aborted(), 1);
    assert_eq!(sim.counter().committed(), 1);

    // The host may simply carry on from the previous state.
    sim.step(DT).unwrap();
    assert_eq!(sim.time().tick_count(), 2);
}

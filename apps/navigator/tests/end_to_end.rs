// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Whole-navigator scenarios on a temporary data directory.

use std::fmt::Write;
use std::sync::Arc;

use wayfinder_core::{Point3, PositionSample};
use wayfinder_navigator::{LayerCatalog, MemoryCatalog, Navigator, NavigatorConfig};

const LOCATION: &str = "lab";

/// 10x10 floor of unit squares at y = 0; `skip(x, z)` leaves a square out
fn floor_obj(skip: impl Fn(u32, u32) -> bool) -> Vec<u8> {
    let mut obj = String::from("# device: test-rig\n");
    for z in 0..=10 {
        for x in 0..=10 {
            writeln!(obj, "v {} 0 {}", x, z).unwrap();
        }
    }
    for z in 0..10u32 {
        for x in 0..10u32 {
            if skip(x, z) {
                continue;
            }
            let a = z * 11 + x + 1;
            writeln!(obj, "f {} {} {}", a, a + 11, a + 12).unwrap();
            writeln!(obj, "f {} {} {}", a, a + 12, a + 1).unwrap();
        }
    }
    obj.into_bytes()
}

/// 2.5 m high walls along x = 4 and x = 5 with a door for z in [5, 6]
fn walls_obj() -> Vec<u8> {
    let mut obj = String::new();
    let mut n = 0;
    for x in [4.0, 5.0] {
        for (z0, z1) in [(0.0, 5.0), (6.0, 10.0)] {
            for (y, z) in [(0.0, z0), (0.0, z1), (2.5, z1), (2.5, z0)] {
                writeln!(obj, "v {} {} {}", x, y, z).unwrap();
            }
            writeln!(obj, "f {} {} {}", n + 1, n + 2, n + 3).unwrap();
            writeln!(obj, "f {} {} {}", n + 1, n + 3, n + 4).unwrap();
            n += 4;
        }
    }
    obj.into_bytes()
}

/// Samples at head height walking from `from` to `to` (x, z)
fn walk(from: (f64, f64), to: (f64, f64), step: f64) -> Vec<PositionSample> {
    let d = (to.0 - from.0).hypot(to.1 - from.1);
    let n = (d / step).ceil() as usize;
    (0..=n)
        .map(|i| {
            let t = i as f64 / n as f64;
            PositionSample::new(
                i as f64 * 0.5,
                Point3::new(from.0 + (to.0 - from.0) * t, 1.6, from.1 + (to.1 - from.1) * t),
            )
        })
        .collect()
}

fn length(path: &[Point3<f64>]) -> f64 {
    path.windows(2).map(|w| (w[1] - w[0]).norm()).sum()
}

fn navigator(dir: &tempfile::TempDir) -> (Navigator, Arc<MemoryCatalog>) {
    navigator_with(dir, Arc::new(MemoryCatalog::new()))
}

fn navigator_with(dir: &tempfile::TempDir, catalog: Arc<MemoryCatalog>) -> (Navigator, Arc<MemoryCatalog>) {
    let mut config = NavigatorConfig::with_data_dir(dir.path());
    config.workers = 2;
    (Navigator::new(config, catalog.clone()), catalog)
}

#[tokio::test]
async fn empty_location_returns_the_straight_line() {
    let dir = tempfile::tempdir().unwrap();
    let (nav, _) = navigator(&dir);

    let start = Point3::new(0.0, 0.0, 0.0);
    let end = Point3::new(5.0, 0.0, 5.0);
    assert_eq!(nav.find_path(LOCATION, start, end), vec![start, end]);
    assert_eq!(nav.mesh_stats(LOCATION).unwrap(), None);

    let summary = nav.rebuild_map(LOCATION).await.unwrap().unwrap();
    assert_eq!(summary.chunks, 0);
    assert_eq!(summary.changes, 0);
    assert_eq!(summary.boundary, None);
    assert_eq!(nav.find_path(LOCATION, start, end), vec![start, end]);
}

#[tokio::test]
async fn open_floor_walk_gives_a_direct_path() {
    let dir = tempfile::tempdir().unwrap();
    let (nav, _) = navigator(&dir);

    let summary = nav
        .ingest_surface(LOCATION, "floor", floor_obj(|_, _| false))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.chunks, 1);
    assert_eq!(summary.changes, 1);

    let trace = walk((0.7, 2.3), (9.3, 2.3), 0.3);
    let report = nav.ingest_trace(LOCATION, "walker", &trace).await.unwrap().unwrap();
    assert_eq!(report.hits, trace.len());
    assert_eq!(nav.mesh_stats(LOCATION).unwrap().unwrap().walkable, 200);

    let start = trace[0].position;
    let end = trace[trace.len() - 1].position;
    assert_eq!(nav.find_path(LOCATION, start, end), vec![start, end]);
}

#[tokio::test]
async fn doorway_route_passes_the_gap() {
    let dir = tempfile::tempdir().unwrap();
    let (nav, catalog) = navigator(&dir);

    nav.ingest_surface(LOCATION, "floor", floor_obj(|x, z| x == 4 && z != 5))
        .await
        .unwrap()
        .unwrap();
    let summary = nav
        .ingest_surface(LOCATION, "walls", walls_obj())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.chunks, 2);
    let boundary = summary.boundary.unwrap();
    assert!((boundary.min_x - 4.0).abs() < 1e-6 && (boundary.max_x - 5.0).abs() < 1e-6);

    let layers = catalog.layers(LOCATION).unwrap();
    assert_eq!(layers.len(), 1);
    assert!(layers[0].ready);
    assert!(nav.store().floorplan_svg(LOCATION, &layers[0].id).unwrap().exists());

    nav.ingest_trace(LOCATION, "walker", &walk((1.2, 4.3), (4.5, 5.45), 0.3))
        .await
        .unwrap();
    nav.ingest_trace(LOCATION, "walker", &walk((4.5, 5.45), (8.8, 4.3), 0.3))
        .await
        .unwrap();

    let start = Point3::new(1.2, 1.6, 1.3);
    let end = Point3::new(8.8, 1.6, 1.3);
    let path = nav.find_path(LOCATION, start, end);

    assert_eq!(path.first(), Some(&start));
    assert_eq!(path.last(), Some(&end));
    let step = nav.config().grid_step;
    let near_door = path.iter().any(|p| {
        let dx = (4.0 - p.x).max(p.x - 5.0).max(0.0);
        let dz = (5.0 - p.z).max(p.z - 6.0).max(0.0);
        dx.hypot(dz) <= step
    });
    assert!(near_door, "no waypoint at the door: {:?}", path);
    assert!(length(&path) > (end - start).norm() + 1.0);

    // Every leg stays over scanned floor, sampled like the mesh line-of-sight check
    for leg in path.windows(2) {
        let delta = leg[1] - leg[0];
        let samples = (delta.x.hypot(delta.z) / 0.1).ceil().max(1.0) as usize;
        for k in 0..=samples {
            let p = leg[0] + delta * (k as f64 / samples as f64);
            let in_wall_column = p.x > 4.0 + 1e-6 && p.x < 5.0 - 1e-6;
            let in_door = p.z > 5.0 - 1e-6 && p.z < 6.0 + 1e-6;
            assert!(!in_wall_column || in_door, "leg {:?} leaves the floor at {:?}", leg, p);
        }
    }
}

#[tokio::test]
async fn unchanged_surface_reingest_reports_no_changes() {
    let dir = tempfile::tempdir().unwrap();
    let (nav, _) = navigator(&dir);

    let first = nav
        .ingest_surface(LOCATION, "floor", floor_obj(|_, _| false))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.changes, 1);
    let second = nav
        .ingest_surface(LOCATION, "floor", floor_obj(|_, _| false))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.changes, 0);
    assert_eq!(nav.rebuild_map(LOCATION).await.unwrap().unwrap().changes, 0);
}

#[tokio::test]
async fn rebuild_replays_stored_traces() {
    let dir = tempfile::tempdir().unwrap();
    let (nav, _) = navigator(&dir);

    // Trace arrives before any surface: stored, nothing to learn yet
    let trace = walk((0.7, 2.3), (9.3, 2.3), 0.3);
    assert!(nav.ingest_trace(LOCATION, "walker", &trace).await.unwrap().is_none());

    nav.ingest_surface(LOCATION, "floor", floor_obj(|_, _| false))
        .await
        .unwrap()
        .unwrap();
    let stats = nav.mesh_stats(LOCATION).unwrap().unwrap();
    assert_eq!(stats.walkable, 200);
    assert!(stats.observed_transitions > 0);
}

#[tokio::test]
async fn concurrent_rebuilds_are_debounced() {
    let dir = tempfile::tempdir().unwrap();
    let (nav, _) = navigator(&dir);
    nav.store()
        .write_surface(LOCATION, "floor", &floor_obj(|_, _| false))
        .unwrap();

    let (a, b) = tokio::join!(nav.rebuild_map(LOCATION), nav.rebuild_map(LOCATION));
    assert!(a.unwrap().is_some());
    assert!(b.unwrap().is_none());

    // The limiter is released once the first rebuild is applied
    assert!(nav.rebuild_map(LOCATION).await.unwrap().is_some());
}

#[tokio::test]
async fn floor_grid_routes_along_walked_cells() {
    let dir = tempfile::tempdir().unwrap();
    let (nav, _) = navigator(&dir);

    let leg1 = walk((0.0, 0.0), (5.0, 0.0), 0.5);
    let leg2 = walk((5.0, 0.0), (5.0, 5.0), 0.5);
    for sample in leg1.iter().chain(&leg2[1..]) {
        nav.record_position(LOCATION, "walker", *sample).await.unwrap();
    }
    assert!(nav.store().floor_grid_path(LOCATION).unwrap().exists());

    let start = Point3::new(0.0, 1.6, 0.0);
    let end = Point3::new(5.0, 1.6, 5.0);
    let path = nav.find_path(LOCATION, start, end);
    assert_eq!(path.len(), 3);
    assert_eq!(path[0], start);
    assert_eq!(path[2], end);
    assert!((path[1].x - 5.0).abs() < 1e-6 && path[1].z.abs() < 1e-6);

    // Off the walked cells: nothing better than the straight line
    let off = Point3::new(0.0, 1.6, 5.0);
    assert_eq!(nav.find_path(LOCATION, start, off), vec![start, off]);
}

#[tokio::test]
async fn restart_reloads_stored_surfaces_and_traces() {
    let dir = tempfile::tempdir().unwrap();
    let trace = walk((0.7, 2.3), (9.3, 2.3), 0.3);
    let catalog = {
        let (nav, catalog) = navigator(&dir);
        nav.ingest_surface(LOCATION, "floor", floor_obj(|_, _| false))
            .await
            .unwrap()
            .unwrap();
        nav.ingest_trace(LOCATION, "walker", &trace).await.unwrap();
        catalog
    };

    let (nav, _) = navigator_with(&dir, catalog);
    assert_eq!(nav.locations().unwrap(), vec![LOCATION.to_string()]);
    // Opening the location schedules the load; waiting makes it visible
    let loaded = nav.wait_loaded(LOCATION).await.unwrap().unwrap();
    assert_eq!(loaded.chunks, 1);
    assert_eq!(loaded.changes, 0);
    assert_eq!(nav.wait_loaded(LOCATION).await.unwrap(), None);
    assert_eq!(nav.mesh_stats(LOCATION).unwrap().unwrap().walkable, 200);

    let start = trace[0].position;
    let end = trace[trace.len() - 1].position;
    assert_eq!(nav.find_path(LOCATION, start, end), vec![start, end]);
}

#[tokio::test]
async fn first_query_after_restart_starts_loading() {
    let dir = tempfile::tempdir().unwrap();
    {
        let (nav, _) = navigator(&dir);
        nav.ingest_surface(LOCATION, "floor", floor_obj(|_, _| false))
            .await
            .unwrap()
            .unwrap();
    }

    let (nav, _) = navigator(&dir);
    let start = Point3::new(0.7, 1.6, 2.3);
    let end = Point3::new(9.3, 1.6, 2.3);
    // Nothing loaded yet: straight line, but the rebuild is under way
    assert_eq!(nav.find_path(LOCATION, start, end), vec![start, end]);
    assert!(nav.rebuild_map(LOCATION).await.unwrap().is_none());
    assert!(nav.wait_loaded(LOCATION).await.unwrap().is_some());
    assert_eq!(nav.mesh_stats(LOCATION).unwrap().unwrap().faces, 200);
}

#[tokio::test]
async fn removing_a_surface_rebuilds_without_it() {
    let dir = tempfile::tempdir().unwrap();
    let (nav, _) = navigator(&dir);
    nav.ingest_surface(LOCATION, "floor", floor_obj(|_, _| false))
        .await
        .unwrap()
        .unwrap();
    assert!(nav.mesh_stats(LOCATION).unwrap().is_some());

    let summary = nav.remove_surface(LOCATION, "floor").await.unwrap().unwrap();
    assert_eq!(summary.chunks, 0);
    assert_eq!(summary.changes, 1);
    assert_eq!(nav.mesh_stats(LOCATION).unwrap(), None);
    assert!(nav.remove_surface(LOCATION, "floor").await.unwrap().is_none());
}

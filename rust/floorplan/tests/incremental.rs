// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Incremental extraction: only new, modified or deleted scans count as
//! changes.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use approx::assert_relative_eq;
use wayfinder_floorplan::{FloorPlanCache, FloorPlanExtractor};

/// Vertical 2.5 m wall quad from (x0, z0) to (x1, z1)
fn wall_obj(x0: f64, z0: f64, x1: f64, z1: f64) -> String {
    format!(
        "# device: test\nv {x0} 0 {z0}\nv {x1} 0 {z1}\nv {x1} 2.5 {z1}\nv {x0} 2.5 {z0}\nf 1 2 3\nf 1 3 4\n"
    )
}

fn write_scan(path: &Path, contents: &str, age_secs: u64) {
    std::fs::write(path, contents).unwrap();
    let mtime = SystemTime::now() - Duration::from_secs(age_secs);
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(mtime)
        .unwrap();
}

fn setup() -> (tempfile::TempDir, Vec<PathBuf>, FloorPlanExtractor) {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.obj");
    let b = dir.path().join("b.obj");
    write_scan(&a, &wall_obj(0.0, 0.0, 4.0, 0.0), 100);
    write_scan(&b, &wall_obj(4.0, 0.0, 4.0, 3.0), 100);
    let extractor = FloorPlanExtractor::new(dir.path().join("plans").join("layer.json"));
    (dir, vec![a, b], extractor)
}

#[test]
fn unchanged_files_report_no_changes() {
    let (_dir, files, extractor) = setup();

    let first = extractor.update(&files, 1.0).unwrap();
    assert_eq!(first.changes, 2);
    assert_eq!(first.polylines.len(), 2);
    let boundary = first.boundary.unwrap();
    assert_relative_eq!(boundary.min_x, 0.0, epsilon = 1e-9);
    assert_relative_eq!(boundary.max_x, 4.0, epsilon = 1e-9);
    assert_relative_eq!(boundary.max_z, 3.0, epsilon = 1e-9);

    let second = extractor.update(&files, 1.0).unwrap();
    assert_eq!(second.changes, 0);
    assert_eq!(second.polylines.len(), first.polylines.len());
    for (a, b) in second.polylines.iter().zip(&first.polylines) {
        assert_eq!(a.len(), b.len());
        assert_relative_eq!(a.length(), b.length(), epsilon = 1e-9);
    }
}

#[test]
fn modified_and_deleted_files_are_changes() {
    let (_dir, files, extractor) = setup();
    extractor.update(&files, 1.0).unwrap();

    // Newer mtime on one file
    write_scan(&files[1], &wall_obj(4.0, 0.0, 4.0, 6.0), 10);
    let summary = extractor.update(&files, 1.0).unwrap();
    assert_eq!(summary.changes, 1);
    assert_relative_eq!(summary.boundary.unwrap().max_z, 6.0, epsilon = 1e-9);

    // Dropping a file from the input set
    let summary = extractor.update(&files[..1], 1.0).unwrap();
    assert_eq!(summary.changes, 1);
    assert_eq!(summary.polylines.len(), 1);
}

#[test]
fn cutting_height_change_rebuilds_everything() {
    let (_dir, files, extractor) = setup();
    extractor.update(&files, 1.0).unwrap();

    let summary = extractor.update(&files, 2.0).unwrap();
    assert_eq!(summary.changes, 2);
    let cache = FloorPlanCache::load(extractor.cache_path()).unwrap();
    assert_relative_eq!(cache.cutting_height, 2.0);

    // Above every wall: nothing left to draw
    let summary = extractor.update(&files, 3.0).unwrap();
    assert!(summary.polylines.is_empty());
    assert!(summary.boundary.is_none());
}

#[test]
fn malformed_scan_is_skipped_once() {
    let (dir, mut files, extractor) = setup();
    let bad = dir.path().join("bad.obj");
    write_scan(&bad, "v 0 0 0\nf 1 2 3\n", 100);
    files.push(bad);

    let first = extractor.update(&files, 1.0).unwrap();
    assert_eq!(first.changes, 3);
    assert_eq!(first.polylines.len(), 2);

    assert_eq!(extractor.update(&files, 1.0).unwrap().changes, 0);
}

#[test]
fn deleting_the_cache_only_forces_recompute() {
    let (_dir, files, extractor) = setup();
    let first = extractor.update(&files, 1.0).unwrap();
    std::fs::remove_file(extractor.cache_path()).unwrap();

    let again = extractor.update(&files, 1.0).unwrap();
    assert_eq!(again.changes, 2);
    assert_eq!(again.polylines, first.polylines);
}

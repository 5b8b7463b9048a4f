mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{FakeOps, file_name, names_in, write_raster};
use sentimosaic::{
    FixedOffsetIdentity, IdentityScheme, RegexIdentity, ResampleParams, SceneBatchLayout,
    SceneBatchReport, ShutdownFlag, resample_scenes_with,
};
use tempfile::TempDir;

const TILE: &str = "T33UUP_20230615";

fn scene_name(n: usize) -> String {
    format!("S2A_MSIL2A_20230615T1010{:02}_N0509_R022_T33UUP", n)
}

fn band_file(scene: &Path, band: &str, stem: &str) -> PathBuf {
    let (folder, suffix) = match band {
        "B02" | "B03" | "B04" | "B08" => ("R10m", "10m"),
        _ => ("R20m", "20m"),
    };
    let dir = scene.join("GRANULE/L2A_T33UUP_A041/IMG_DATA").join(folder);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{}_{}_{}.jp2", stem, band, suffix));
    write_raster(&path, "EPSG:32633", &[]);
    path
}

fn make_scene(base: &Path, name: &str, bands: &[&str]) -> PathBuf {
    let scene = base.join(name);
    fs::create_dir_all(&scene).unwrap();
    for band in bands {
        band_file(&scene, band, TILE);
    }
    scene
}

struct Batch {
    _root: TempDir,
    layout: SceneBatchLayout,
}

fn batch(staged: bool) -> Batch {
    let root = tempfile::tempdir().unwrap();
    let base_dir = root.path().join("scenes");
    fs::create_dir_all(&base_dir).unwrap();
    let layout = SceneBatchLayout {
        base_dir,
        staging_dir: staged.then(|| root.path().join("staging")),
        final_dir: root.path().join("final"),
        scratch_dir: None,
    };
    Batch {
        _root: root,
        layout,
    }
}

fn params(bands: &[&str]) -> ResampleParams {
    ResampleParams {
        bands: bands.iter().map(|b| b.to_string()).collect(),
        max_workers: 2,
        ..Default::default()
    }
}

fn run_with(
    ops: &FakeOps,
    identity: &dyn IdentityScheme,
    b: &Batch,
    params: &ResampleParams,
    shutdown: Option<ShutdownFlag>,
) -> SceneBatchReport {
    resample_scenes_with(ops, identity, &b.layout, params, shutdown).unwrap()
}

fn run(ops: &FakeOps, b: &Batch, params: &ResampleParams) -> SceneBatchReport {
    run_with(ops, &FixedOffsetIdentity, b, params, None)
}

fn scratch_leftovers(dir: &Path) -> Vec<String> {
    names_in(dir)
        .into_iter()
        .filter(|n| n.starts_with(".scratch-"))
        .collect()
}

#[test]
fn stacks_found_bands_in_request_order() {
    let b = batch(false);
    let scene = make_scene(&b.layout.base_dir, &scene_name(1), &["B8A", "B04", "B02"]);
    let ops = FakeOps::new();

    let report = run(&ops, &b, &params(&["B02", "B03", "B04", "B8A"]));

    assert_eq!(report.processed, 1);
    let stacks = ops.stacks();
    assert_eq!(stacks.len(), 1);
    let sources: Vec<String> = stacks[0].1.iter().map(|p| file_name(p)).collect();
    assert_eq!(
        sources,
        vec![
            "T33UUP_20230615_B02_10m.jp2",
            "T33UUP_20230615_B04_10m.jp2",
            "T33UUP_20230615_B8A_20m.jp2"
        ]
    );

    let expected = format!("20230615_{}.tif", scene_name(1));
    assert_eq!(names_in(&b.layout.final_dir), vec![expected.clone()]);
    assert_eq!(report.outputs, vec![b.layout.final_dir.join(expected)]);
    assert!(scene.exists());
    assert!(scratch_leftovers(&b.layout.base_dir).is_empty());
}

#[test]
fn every_band_shares_one_grid() {
    let b = batch(false);
    make_scene(&b.layout.base_dir, &scene_name(1), &["B02", "B11", "B12"]);
    let ops = FakeOps::new();
    let params = ResampleParams {
        resolution: 20.0,
        ..params(&["B02", "B11", "B12"])
    };

    run(&ops, &b, &params);

    let regrids = ops.regrids();
    assert_eq!(regrids.len(), 3);
    let grid = &regrids[0].1;
    assert!(regrids.iter().all(|(_, g)| g == grid));
    assert_eq!(grid.resolution, 20.0);
    assert_eq!((grid.width, grid.height), (5, 5));
    assert_eq!((grid.origin_x, grid.origin_y), (300000.0, 5190100.0));
}

#[test]
fn scene_without_bands_writes_nothing() {
    let b = batch(false);
    make_scene(&b.layout.base_dir, &scene_name(1), &["B05"]);
    let ops = FakeOps::new();

    let report = run(&ops, &b, &params(&["B02", "B03"]));

    assert_eq!(report.no_bands, 1);
    assert_eq!(report.processed, 0);
    assert!(ops.stacks().is_empty());
    assert!(names_in(&b.layout.final_dir).is_empty());
}

#[test]
fn completed_scenes_are_not_resampled_again() {
    let b = batch(false);
    let done = make_scene(&b.layout.base_dir, &scene_name(1), &["B02"]);
    make_scene(&b.layout.base_dir, &scene_name(2), &["B02"]);
    fs::create_dir_all(&b.layout.final_dir).unwrap();
    fs::write(
        b.layout.final_dir.join(format!("20230615_{}.tif", scene_name(1))),
        "done",
    )
    .unwrap();
    let ops = FakeOps::new();

    let report = run(&ops, &b, &params(&["B02"]));

    assert_eq!(report.already_done, 1);
    assert_eq!(report.processed, 1);
    assert_eq!(report.removed_inputs, 0);
    assert!(done.exists());
    let touched_done = ops
        .regrids()
        .iter()
        .any(|(src, _)| src.starts_with(&done));
    assert!(!touched_done);
}

#[test]
fn completed_scenes_are_deleted_when_asked() {
    let b = batch(false);
    let done = make_scene(&b.layout.base_dir, &scene_name(1), &["B02"]);
    let pending = make_scene(&b.layout.base_dir, &scene_name(2), &["B02"]);
    fs::create_dir_all(&b.layout.final_dir).unwrap();
    fs::write(
        b.layout.final_dir.join(format!("20230615_{}.tif", scene_name(1))),
        "done",
    )
    .unwrap();
    let ops = FakeOps::new();
    let params = ResampleParams {
        delete_processed: true,
        ..params(&["B02"])
    };

    let report = run(&ops, &b, &params);

    assert_eq!(report.removed_inputs, 1);
    assert!(!done.exists());
    // A scene processed in this run keeps its input
    assert!(pending.exists());
}

#[test]
fn failing_scene_does_not_stop_the_batch() {
    let b = batch(false);
    make_scene(&b.layout.base_dir, &scene_name(1), &["B02", "B04"]);
    let broken = make_scene(&b.layout.base_dir, &scene_name(2), &["B02"]);
    band_file(&broken, "B04", "T33UUP_BROKEN");
    make_scene(&b.layout.base_dir, &scene_name(3), &["B02", "B04"]);
    let ops = FakeOps::failing_on("BROKEN");

    let report = run(&ops, &b, &params(&["B02", "B04"]));

    assert_eq!(report.processed, 2);
    assert_eq!(report.errors, 1);
    assert_eq!(report.failures[0].0, broken);
    assert_eq!(names_in(&b.layout.final_dir).len(), 2);
    assert!(scratch_leftovers(&b.layout.base_dir).is_empty());
    assert_eq!(ops.reclaims.load(Ordering::SeqCst), 3);
}

#[test]
fn unparseable_scene_name_is_counted_as_error() {
    let b = batch(false);
    make_scene(&b.layout.base_dir, "short", &["B02"]);
    make_scene(&b.layout.base_dir, &scene_name(1), &["B02"]);
    let ops = FakeOps::new();

    let report = run(&ops, &b, &params(&["B02"]));

    assert_eq!(report.errors, 1);
    assert_eq!(report.processed, 1);
}

#[test]
fn staging_is_flushed_into_final_directory() {
    let b = batch(true);
    for n in 1..=3 {
        make_scene(&b.layout.base_dir, &scene_name(n), &["B02"]);
    }
    let ops = FakeOps::new();
    let params = ResampleParams {
        max_staged_files: 2,
        ..params(&["B02"])
    };

    let report = run(&ops, &b, &params);

    assert_eq!(report.processed, 3);
    assert_eq!(report.flushed, 3);
    let staging = b.layout.staging_dir.as_ref().unwrap();
    assert!(names_in(staging).is_empty());
    assert_eq!(names_in(&b.layout.final_dir).len(), 3);
}

#[test]
fn leftovers_in_staging_are_recovered_first() {
    let b = batch(true);
    make_scene(&b.layout.base_dir, &scene_name(1), &["B02"]);
    make_scene(&b.layout.base_dir, &scene_name(2), &["B02"]);
    let staging = b.layout.staging_dir.clone().unwrap();
    fs::create_dir_all(&staging).unwrap();
    let staged = format!("20230615_{}.tif", scene_name(1));
    fs::write(staging.join(&staged), "finished earlier").unwrap();
    let ops = FakeOps::new();

    let report = run(&ops, &b, &params(&["B02"]));

    assert_eq!(report.already_done, 1);
    assert_eq!(report.processed, 1);
    assert_eq!(
        fs::read_to_string(b.layout.final_dir.join(staged)).unwrap(),
        "finished earlier"
    );
    assert!(names_in(&staging).is_empty());
}

#[test]
fn scenes_run_in_numeric_order() {
    let b = batch(false);
    for name in ["scene_10_20230101", "scene_2_20230102", "scene_1_20230103", "extra_20230104"] {
        make_scene(&b.layout.base_dir, name, &["B02"]);
    }
    let ops = FakeOps::new();
    let identity = RegexIdentity::new(r"_(\d{8})$").unwrap();

    let report = run_with(&ops, &identity, &b, &params(&["B02"]), None);

    assert_eq!(report.processed, 4);
    let order: Vec<String> = ops.stacks().iter().map(|(dst, _)| file_name(dst)).collect();
    assert_eq!(
        order,
        vec![
            "temp_stack_scene_1_20230103.tif",
            "temp_stack_scene_2_20230102.tif",
            "temp_stack_scene_10_20230101.tif",
            "temp_stack_extra_20230104.tif"
        ]
    );
    assert!(
        b.layout
            .final_dir
            .join("20230101_scene_10_20230101.tif")
            .exists()
    );
}

#[test]
fn stop_request_finishes_current_scene_only() {
    let b = batch(true);
    for n in 1..=3 {
        make_scene(&b.layout.base_dir, &scene_name(n), &["B02"]);
    }
    let ops = FakeOps::new();
    let flag = ShutdownFlag::new();
    *ops.stop_after_stack.lock().unwrap() = Some(flag.clone());

    let report = run_with(&ops, &FixedOffsetIdentity, &b, &params(&["B02"]), Some(flag));

    assert_eq!(report.processed, 1);
    assert_eq!(ops.stacks().len(), 1);
    // The finished scene still reaches the final directory
    assert_eq!(
        names_in(&b.layout.final_dir),
        vec![format!("20230615_{}.tif", scene_name(1))]
    );
}

#[test]
fn scratch_root_can_live_elsewhere() {
    let mut b = batch(false);
    let scratch = b.layout.base_dir.parent().unwrap().join("fast_scratch");
    b.layout.scratch_dir = Some(scratch.clone());
    make_scene(&b.layout.base_dir, &scene_name(1), &["B02", "B03"]);
    let ops = FakeOps::new();

    let report = run(&ops, &b, &params(&["B02", "B03"]));

    assert_eq!(report.processed, 1);
    let stacks = ops.stacks();
    assert!(stacks[0].0.starts_with(&scratch));
    assert!(names_in(&scratch).is_empty());
    assert_eq!(names_in(&b.layout.base_dir), vec![scene_name(1)]);
}

#[test]
fn band_workers_are_bounded_and_stacking_waits_for_all() {
    let b = batch(false);
    let bands = ["B02", "B03", "B04", "B05", "B06", "B07", "B08", "B8A"];
    make_scene(&b.layout.base_dir, &scene_name(1), &bands);
    let ops = FakeOps {
        regrid_delay: Some(Duration::from_millis(50)),
        ..FakeOps::default()
    };
    let params = ResampleParams {
        max_workers: 3,
        ..params(&bands)
    };

    let report = run(&ops, &b, &params);

    assert_eq!(report.processed, 1);
    let peak = ops.regrid_peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "{} regrids ran at once", peak);
    assert!(peak > 1, "band regrids never overlapped");
    assert_eq!(*ops.regrids_done_at_stack.lock().unwrap(), vec![bands.len()]);
    assert_eq!(ops.stacks()[0].1.len(), bands.len());
}

#[test]
fn single_worker_regrids_one_band_at_a_time() {
    let b = batch(false);
    make_scene(&b.layout.base_dir, &scene_name(1), &["B02", "B03", "B04"]);
    let ops = FakeOps {
        regrid_delay: Some(Duration::from_millis(10)),
        ..FakeOps::default()
    };
    let params = ResampleParams {
        max_workers: 1,
        ..params(&["B02", "B03", "B04"])
    };

    run(&ops, &b, &params);

    assert_eq!(ops.regrid_peak.load(Ordering::SeqCst), 1);
    assert_eq!(*ops.regrids_done_at_stack.lock().unwrap(), vec![3]);
}

#[cfg(unix)]
#[test]
fn unreadable_band_folder_fails_the_scene() {
    use std::os::unix::fs::PermissionsExt;

    let b = batch(false);
    let scene = make_scene(&b.layout.base_dir, &scene_name(1), &["B02", "B8A"]);
    make_scene(&b.layout.base_dir, &scene_name(2), &["B02", "B8A"]);
    let r20 = scene.join("GRANULE/L2A_T33UUP_A041/IMG_DATA/R20m");
    fs::set_permissions(&r20, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(&r20).is_ok() {
        // Privileged user: permissions are not enforced
        fs::set_permissions(&r20, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }
    let ops = FakeOps::new();

    let report = run(&ops, &b, &params(&["B02", "B8A"]));
    fs::set_permissions(&r20, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(report.errors, 1);
    assert_eq!(report.processed, 1);
    assert_eq!(report.failures[0].0, scene);
    assert_eq!(
        names_in(&b.layout.final_dir),
        vec![format!("20230615_{}.tif", scene_name(2))]
    );
}

#[test]
fn scratch_left_by_an_interrupted_run_is_removed() {
    let b = batch(false);
    make_scene(&b.layout.base_dir, &scene_name(1), &["B02"]);
    let stale = b.layout.base_dir.join(format!(".scratch-{}-abc123", scene_name(1)));
    fs::create_dir_all(&stale).unwrap();
    fs::write(stale.join("temp_band_1.tif"), "partial").unwrap();
    let ops = FakeOps::new();

    let report = run(&ops, &b, &params(&["B02"]));

    assert_eq!(report.processed, 1);
    assert!(!stale.exists());
    assert!(scratch_leftovers(&b.layout.base_dir).is_empty());
}

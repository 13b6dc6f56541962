//! End-to-end tests driving the library the way the binaries do.

use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgb, RgbImage};
use tempfile::tempdir;

use reorg_tools::convert::batch::BatchRunner;
use reorg_tools::convert::converters::ImageCodecConverter;
use reorg_tools::convert::pipeline::{ConversionPipeline, PipelineConfig};
use reorg_tools::convert::FileEntry;
use reorg_tools::distribute::{
    DistributeOutcome, DistributionPlan, distribute, merge, move_from_list, read_restored_list,
};
use reorg_tools::organize::clean_folder_names;
use reorg_tools::{list_immediate_directories, list_immediate_files};

fn write_png(path: &Path) {
    RgbImage::from_pixel(2, 2, Rgb([7, 7, 7]))
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

fn create_files(dir: &Path, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let path = dir.join(format!("file_{i:02}.txt"));
            fs::write(&path, format!("content {i}")).unwrap();
            path
        })
        .collect()
}

#[test]
fn distribute_and_merge_round_trip_preserves_files() {
    let dir = tempdir().unwrap();
    let originals = create_files(dir.path(), 10);

    let plan = DistributionPlan::new(dir.path(), 4).unwrap();
    let outcome = distribute(&plan, None).unwrap();
    assert_eq!(outcome, DistributeOutcome::Completed { moved: 10 });
    assert!(list_immediate_files(dir.path()).unwrap().is_empty());

    let summary = merge(dir.path(), None).unwrap();
    assert_eq!(summary.moved, 10);
    assert_eq!(summary.removed_dirs, 4);

    let merged = list_immediate_files(dir.path()).unwrap();
    assert_eq!(merged, originals);
    for (i, path) in merged.iter().enumerate() {
        assert_eq!(fs::read_to_string(path).unwrap(), format!("content {i}"));
    }
}

#[test]
fn failed_distribution_leaves_directory_unchanged() {
    let dir = tempdir().unwrap();
    create_files(dir.path(), 6);

    let mut plan = DistributionPlan::new(dir.path(), 3).unwrap();
    plan.files.insert(4, dir.path().join("never_existed.txt"));

    let outcome = distribute(&plan, None).unwrap();
    assert!(matches!(outcome, DistributeOutcome::RolledBack { .. }));

    assert_eq!(list_immediate_files(dir.path()).unwrap().len(), 6);
    assert!(list_immediate_directories(dir.path()).unwrap().is_empty());
}

#[test]
fn batch_conversion_then_cleanup_workflow() {
    let dir = tempdir().unwrap();
    for name in ["IMG_0012 (3).png", "IMG_0044.png", "scan_7.png"] {
        write_png(&dir.path().join(name));
    }

    let config = PipelineConfig {
        quarantine_dir_name: Some("corrupted".to_string()),
        repair: false,
        use_trash: false,
    };
    let pipeline = ConversionPipeline::new(vec![Box::new(ImageCodecConverter)], config);
    let files = FileEntry::from_paths(list_immediate_files(dir.path()).unwrap()).unwrap();

    let result = BatchRunner::new(pipeline).run(files, "jpg", None).unwrap();
    assert_eq!(result.succeeded, 3);
    assert!(result.failed.is_empty());

    let names: Vec<String> = list_immediate_files(dir.path())
        .unwrap()
        .iter()
        .map(|p| reorg_tools::path_to_filename_string(p))
        .collect();
    assert_eq!(names, vec!["IMG_0012 (3).jpg", "IMG_0044.jpg", "scan_7.jpg"]);
}

#[test]
fn restored_list_workflow_groups_and_skips() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("recovered");
    let destination = dir.path().join("sorted");
    fs::create_dir_all(&source).unwrap();
    fs::create_dir_all(&destination).unwrap();

    let kept_one = source.join("Report_2 (1).pdf");
    let kept_two = source.join("Report_9.pdf");
    let skipped = source.join("secret.pdf");
    fs::write(&kept_one, b"one").unwrap();
    fs::write(&kept_two, b"two").unwrap();
    fs::write(&skipped, b"three").unwrap();

    let list = dir.path().join("restored.txt");
    fs::write(
        &list,
        format!(
            "\u{feff}{}\n?{}\n{}\n\n{}\n",
            kept_one.display(),
            skipped.display(),
            kept_two.display(),
            source.join("long gone.pdf").display()
        ),
    )
    .unwrap();

    let entries = read_restored_list(&list).unwrap();
    assert_eq!(entries.len(), 3);

    let moved = move_from_list(&entries, &destination, None).unwrap();
    assert_eq!(moved, 2);

    // Both reports normalize to "Report" and share a folder.
    let report_dir = destination.join("Report");
    assert!(report_dir.join("Report_2 (1).pdf").is_file());
    assert!(report_dir.join("Report_9.pdf").is_file());
    // The sentinel-prefixed file was never touched.
    assert!(skipped.is_file());
}

#[test]
fn clean_names_collapses_duplicate_camera_folders() {
    let dir = tempdir().unwrap();
    for (folder, file) in [("IMG_0001", "a.jpg"), ("IMG_0002", "b.jpg"), ("IMG", "c.jpg")] {
        let path = dir.path().join(folder);
        fs::create_dir(&path).unwrap();
        fs::write(path.join(file), file.as_bytes()).unwrap();
    }

    let cleaned = clean_folder_names(dir.path(), None).unwrap();
    assert_eq!(cleaned, 2);

    let remaining = list_immediate_directories(dir.path()).unwrap();
    assert_eq!(remaining.len(), 1);
    let img = dir.path().join("IMG");
    assert!(img.join("a.jpg").is_file());
    assert!(img.join("b.jpg").is_file());
    assert!(img.join("c.jpg").is_file());
}

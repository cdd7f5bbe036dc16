//! Directory scanning and scan-mode cubes.

use std::path::Path;
use std::sync::Arc;

use cube_builder::{assemble_directory, scan_directory, CubeError, ScanCubeAssembler};
use test_utils::{capture_logs, date, FakeRasterReader};

fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, b"").unwrap();
}

fn populated_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "scene_2021-06-20.tif");
    touch(dir.path(), "nested/scene_2021-06-05.tif");
    touch(dir.path(), "scene_2021-06-12.tif");
    touch(dir.path(), "scene_2021-06-12.xml");
    touch(dir.path(), "notes.tif");
    dir
}

#[test]
fn test_scan_sorted_by_date() {
    let dir = populated_dir();
    let files = scan_directory(dir.path(), "%Y-%m-%d", "tif").unwrap();

    let dates: Vec<_> = files.iter().map(|f| f.date).collect();
    assert_eq!(
        dates,
        vec![date(2021, 6, 5), date(2021, 6, 12), date(2021, 6, 20)]
    );
    assert!(files[0].path.ends_with("nested/scene_2021-06-05.tif"));
}

#[test]
fn test_scan_extension_with_dot() {
    let dir = populated_dir();
    let files = scan_directory(dir.path(), "%Y-%m-%d", ".xml").unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].date, date(2021, 6, 12));
}

#[test]
fn test_scan_skips_impossible_dates() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "scene_2021-02-30.tif");
    touch(dir.path(), "scene_2021-03-01.tif");

    let files = scan_directory(dir.path(), "%Y-%m-%d", "tif").unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].date, date(2021, 3, 1));
}

#[test]
fn test_scan_day_of_year_names() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "HLS.S30.T13SDA.2021166T174911.v2.0.B04.tif");
    touch(dir.path(), "HLS.S30.T13SDA.2021001T174911.v2.0.B04.tif");

    let files = scan_directory(dir.path(), "%Y%j", "tif").unwrap();
    let dates: Vec<_> = files.iter().map(|f| f.date).collect();
    assert_eq!(dates, vec![date(2021, 1, 1), date(2021, 6, 15)]);
}

#[test]
fn test_scan_without_matches() {
    let dir = populated_dir();
    let err = scan_directory(dir.path(), "%Y%m%d", "tif").unwrap_err();
    assert!(matches!(err, CubeError::NoFilesFound { .. }));

    let err = scan_directory(&dir.path().join("missing"), "%Y-%m-%d", "tif").unwrap_err();
    assert!(matches!(err, CubeError::NoFilesFound { .. }));

    let err = scan_directory(dir.path(), "%Y-%q", "tif").unwrap_err();
    assert!(matches!(err, CubeError::ConfigFormat(_)));
}

#[tokio::test]
async fn test_assemble_directory_labels_bands() {
    let dir = populated_dir();
    let reader = Arc::new(FakeRasterReader::new(2, 2).with_bands_per_file(3));

    let cube = assemble_directory(dir.path(), "%Y-%m-%d", "tif", reader.clone())
        .await
        .unwrap();

    assert_eq!(cube.shape(), [3, 3, 2, 2]);
    assert_eq!(cube.bands, vec!["1", "2", "3"]);
    assert_eq!(
        cube.times,
        vec![date(2021, 6, 5), date(2021, 6, 12), date(2021, 6, 20)]
    );
    assert_eq!(
        cube.satellites,
        vec!["scene_2021-06-05", "scene_2021-06-12", "scene_2021-06-20"]
    );

    // Band i of a file holds the file's value plus i.
    let first = dir.path().join("nested/scene_2021-06-05.tif");
    let base = reader.value_for(&first.to_string_lossy());
    assert_eq!(cube.get(0, 2, 1, 1), Some(base + 2.0));
}

#[tokio::test]
async fn test_twelve_band_files_keep_file_order() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "stack_2021-06-01.tif");
    let path = dir.path().join("stack_2021-06-01.tif");
    let reader = Arc::new(
        FakeRasterReader::new(1, 1)
            .with_value(path.to_string_lossy(), 100.0)
            .with_bands_per_file(12),
    );

    let cube = assemble_directory(dir.path(), "%Y-%m-%d", "tif", reader)
        .await
        .unwrap();

    let expected: Vec<String> = (1..=12).map(|i| i.to_string()).collect();
    assert_eq!(cube.bands, expected);
    for band in 0..12 {
        assert_eq!(cube.get(0, band, 0, 0), Some(100.0 + band as f32));
    }
}

#[cfg(unix)]
#[test]
fn test_scan_warns_on_unreadable_directory() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "scene_2021-06-01.tif");
    touch(dir.path(), "locked/scene_2021-06-02.tif");
    let locked = dir.path().join("locked");
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

    // Superusers can list the directory anyway.
    let listable = std::fs::read_dir(&locked).is_ok();
    let (files, logs) = capture_logs(|| scan_directory(dir.path(), "%Y-%m-%d", "tif"));
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

    let files = files.unwrap();
    if listable {
        assert_eq!(files.len(), 2);
    } else {
        assert_eq!(files.len(), 1);
        assert!(logs.contains("Unreadable directory entry"), "{}", logs);
    }
}

#[tokio::test]
async fn test_scan_assembler_keeps_same_day_files() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "a_2021-06-01.tif");
    touch(dir.path(), "b_2021-06-01.tif");

    let cube = ScanCubeAssembler::new(Arc::new(FakeRasterReader::new(1, 1)))
        .with_processes(2)
        .assemble(dir.path(), "%Y-%m-%d", "tif")
        .await
        .unwrap();

    assert_eq!(cube.times, vec![date(2021, 6, 1), date(2021, 6, 1)]);
    assert_eq!(cube.satellites, vec!["a_2021-06-01", "b_2021-06-01"]);
}

#[tokio::test]
async fn test_scan_assembler_propagates_read_failure() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "a_2021-06-01.tif");
    let broken = dir.path().join("a_2021-06-01.tif");

    let reader = FakeRasterReader::new(1, 1).failing(broken.to_string_lossy());
    let err = ScanCubeAssembler::new(Arc::new(reader))
        .assemble(dir.path(), "%Y-%m-%d", "tif")
        .await
        .unwrap_err();
    assert!(matches!(err, CubeError::SourceUnavailable { .. }));
}

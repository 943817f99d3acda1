use std::path::PathBuf;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_sketch-export")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "sketch-export.exe"
            } else {
                "sketch-export"
            });
            p
        })
}

#[test]
fn cli_records_then_plays_back_into_png_frames() {
    let dir = PathBuf::from("target").join("cli_smoke");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();

    let storage = dir.join("storage");
    let frames = dir.join("frames");
    let storage_arg = storage.to_string_lossy().to_string();
    let frames_arg = frames.to_string_lossy().to_string();

    let status = std::process::Command::new(exe())
        .args(["run", "--query", "?record=angle", "--frames", "4"])
        .args(["--width", "32", "--height", "32", "--quiet"])
        .args(["--storage", storage_arg.as_str()])
        .status()
        .unwrap();
    assert!(status.success());
    assert!(storage.join("sketchRecordStorage.json").exists());

    let status = std::process::Command::new(exe())
        .args(["run", "--query", "?play=angle&export=true", "--frames", "6"])
        .args(["--format", "png", "--width", "32", "--height", "32", "--quiet"])
        .args(["--storage", storage_arg.as_str(), "--out", frames_arg.as_str()])
        .status()
        .unwrap();
    assert!(status.success());
    assert!(frames.join("frame-00000.png").exists());
    assert!(frames.join("frame-00005.png").exists());

    let output = std::process::Command::new(exe())
        .args(["inspect", "--storage", storage_arg.as_str()])
        .output()
        .unwrap();
    assert!(output.status.success());
    let series: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(series["angle"].as_array().map(Vec::len), Some(4));
}

use assert_fs::TempDir;
use assert_fs::prelude::*;
use std::collections::BTreeSet;
use std::path::Path;
use std::process::{Command, Output};

const BROKEN_TOOLS: &str = r#"
[media]
ffmpeg_path = "/nonexistent/ffmpeg"
ffprobe_path = "/nonexistent/ffprobe"

[ocr]
binary_path = "/nonexistent/tesseract"
"#;

fn subocr(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_subocr"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn entries(dir: &Path) -> BTreeSet<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect()
}

fn fixture() -> TempDir {
    let temp = TempDir::new().unwrap();
    temp.child("subocr.toml").write_str(BROKEN_TOOLS).unwrap();
    temp.child("v.mp4").touch().unwrap();
    temp
}

fn assert_missing_tool(output: &Output) {
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(1), "stderr: {}", stderr);
    assert!(stderr.contains("Required tool"), "stderr: {}", stderr);
    assert!(stderr.contains("/nonexistent/ffmpeg"), "stderr: {}", stderr);
}

#[test]
fn run_with_missing_tools_exits_without_side_effects() {
    let temp = fixture();
    let frames = temp.child("frames");
    frames.create_dir_all().unwrap();
    frames.child("precious.txt").write_str("keep me").unwrap();

    let output = subocr(
        temp.path(),
        &["run", "-i", "v.mp4", "--roi", "0,0,10,10", "--keep-frames", "frames"],
    );
    assert_missing_tool(&output);

    let expected: BTreeSet<String> = ["subocr.toml", "v.mp4", "frames"].iter().map(|s| s.to_string()).collect();
    assert_eq!(entries(temp.path()), expected);
    assert_eq!(std::fs::read_to_string(frames.path().join("precious.txt")).unwrap(), "keep me");
    assert!(!temp.path().join("v_tc.ass").exists());
}

#[test]
fn preview_with_missing_tools_leaves_no_state() {
    let temp = fixture();

    let output = subocr(temp.path(), &["preview", "-i", "v.mp4", "-t", "5"]);
    assert_missing_tool(&output);

    let expected: BTreeSet<String> = ["subocr.toml", "v.mp4"].iter().map(|s| s.to_string()).collect();
    assert_eq!(entries(temp.path()), expected);
}

#[test]
fn roi_commands_need_no_external_tools() {
    let temp = fixture();

    let output = subocr(temp.path(), &["roi", "set", "0,900,1920,180"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let state = std::fs::read_to_string(temp.path().join(".subocr").join("state.json")).unwrap();
    assert!(state.contains("1920"), "state: {}", state);
}

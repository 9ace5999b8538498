use clap::Parser;
use image::{Rgba, RgbaImage};
use watermarkfe::cli::{self, CliArgs};
use watermarkfe::io::write_png;
use watermarkfe::style::WatermarkStyle;

#[test]
fn test_headless_run_crops_and_writes_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    let output = dir.path().join("nested").join("out.png");
    let preset = dir.path().join("style.json");
    write_png(&RgbaImage::from_pixel(200, 200, Rgba([0, 0, 0, 255])), &input).unwrap();

    let args = CliArgs::try_parse_from([
        "WatermarkFE",
        "-i",
        input.to_str().unwrap(),
        "-o",
        output.to_str().unwrap(),
        "--crop",
        "10,10,100,50",
        "--text",
        "line one\\nline two",
        "--background-opacity",
        "0.4",
        "--save-style",
        preset.to_str().unwrap(),
    ])
    .unwrap();
    assert_eq!(cli::run(args), std::process::ExitCode::SUCCESS);

    let written = image::open(&output).unwrap();
    assert_eq!((written.width(), written.height()), (100, 50));

    let saved = WatermarkStyle::load(&preset).unwrap();
    assert_eq!(saved.text, "line one\nline two");
    assert_eq!(saved.background.opacity, 0.4);
}

#[test]
fn test_headless_run_fails_on_unreadable_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.png");
    std::fs::write(&input, b"garbage").unwrap();
    let output = dir.path().join("out.png");

    let args = CliArgs::try_parse_from([
        "WatermarkFE",
        "--input",
        input.to_str().unwrap(),
        "--output",
        output.to_str().unwrap(),
    ])
    .unwrap();
    assert_eq!(cli::run(args), std::process::ExitCode::FAILURE);
    assert!(!output.exists());
}

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, Rgba, RgbaImage};
use serde_json::Value;
use spritepack_core::prelude::*;

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

/// `w x h` transparent image with an opaque `color` block at (x, y) sized bw x bh.
fn sprite(w: u32, h: u32, (x, y, bw, bh): (u32, u32, u32, u32), color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_fn(w, h, |px, py| {
        if px >= x && px < x + bw && py >= y && py < y + bh {
            color
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

fn save(dir: &Path, name: &str, img: &RgbaImage) -> PathBuf {
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn generate_writes_image_and_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let run0 = sprite(16, 16, (3, 4, 6, 5), RED);
    let run1 = sprite(16, 16, (0, 0, 16, 16), BLUE);
    let idle = sprite(8, 8, (2, 2, 4, 4), BLUE);

    let mut groups = BTreeMap::new();
    groups.insert(
        "run".to_string(),
        vec![
            save(dir.path(), "run_0.png", &run0),
            save(dir.path(), "run_1.png", &run1),
            // same pixels as run_0
            save(dir.path(), "run_2.png", &run0),
        ],
    );
    groups.insert("idle".to_string(), vec![save(dir.path(), "idle_0.png", &idle)]);

    let out = dir.path().join("out").join("hero");
    let res = generate(&groups, &out, &GeneratorOptions::default());
    assert!(res.success, "{:?}", res.errors);
    assert_eq!(res.frame_count, 4);
    assert_eq!(res.unique_frames, 3);
    assert_eq!(res.duplicate_count, 1);

    let atlas_path = res.atlas_path.clone().unwrap();
    let meta_path = res.metadata_path.clone().unwrap();
    assert_eq!(atlas_path, dir.path().join("out").join("hero.png"));
    assert_eq!(meta_path, dir.path().join("out").join("hero.json"));

    let atlas = image::open(&atlas_path).unwrap().to_rgba8();
    assert_eq!(atlas.dimensions(), (res.atlas_width, res.atlas_height));

    let meta = read_json(&meta_path);
    assert_eq!(meta["meta"]["image"], "hero.png");
    assert_eq!(meta["meta"]["size"]["w"], res.atlas_width);
    let frames = meta["frames"].as_object().unwrap();
    assert_eq!(frames.len(), 4);

    let r0 = &frames["run0000"];
    assert_eq!(r0["frame"]["w"], 6);
    assert_eq!(r0["frame"]["h"], 5);
    assert_eq!(r0["spriteSourceSize"]["x"], 3);
    assert_eq!(r0["spriteSourceSize"]["y"], 4);
    assert_eq!(r0["sourceSize"]["w"], 16);
    assert_eq!(r0["trimmed"], true);
    assert_eq!(frames["run0002"]["frame"], r0["frame"]);

    // trimmed pixels land where the metadata says
    let (x, y) = (
        r0["frame"]["x"].as_u64().unwrap() as u32,
        r0["frame"]["y"].as_u64().unwrap() as u32,
    );
    assert_eq!(*atlas.get_pixel(x, y), RED);
    assert_eq!(*atlas.get_pixel(x + 5, y + 4), RED);

    let i0 = &frames["idle0000"];
    assert_eq!(i0["animation"], "idle");
    assert_eq!(i0["sourceSize"]["w"], 8);
}

#[test]
fn sprites_are_ordered_by_animation_then_index() {
    let img = |c: u8| DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([c, c, c, 255])));
    let anims = vec![
        AnimationInput::new("walk", vec![img(1), img(2)]),
        AnimationInput::new("attack", vec![img(3)]),
    ];
    let res = generate_from_images(anims, None, &GeneratorOptions::default());
    assert!(res.success, "{:?}", res.errors);
    let meta = res.metadata.unwrap();
    let names: Vec<(&str, usize)> = meta
        .sprites
        .iter()
        .map(|s| (s.animation.as_str(), s.index))
        .collect();
    assert_eq!(names, [("walk", 0), ("walk", 1), ("attack", 0)]);
}

#[test]
fn in_memory_generation_returns_pixels_and_text() {
    let anims = vec![AnimationInput::new(
        "blink",
        vec![
            DynamicImage::ImageRgba8(sprite(10, 10, (1, 1, 8, 8), RED)),
            DynamicImage::ImageRgba8(sprite(10, 10, (0, 0, 0, 0), RED)),
        ],
    )];
    let opts = GeneratorOptions {
        export_format: "json-array".into(),
        algorithm: AlgorithmChoice::Fixed(Algorithm::Skyline),
        ..Default::default()
    };
    let res = generate_from_images(anims, None, &opts);
    assert!(res.success, "{:?}", res.errors);
    assert!(res.atlas_path.is_none());
    let image = res.image.unwrap();
    assert_eq!(image.dimensions(), (res.atlas_width, res.atlas_height));

    let v: Value = serde_json::from_str(&res.metadata_text.unwrap()).unwrap();
    let frames = v["frames"].as_array().unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0]["filename"], "blink0000");
    // fully transparent frame is kept as a single pixel
    assert_eq!(frames[1]["frame"]["w"], 1);
    assert_eq!(v["meta"]["packer"], "skyline");
}

#[test]
fn power_of_two_and_square_shape_the_atlas() {
    let anims = vec![AnimationInput::new(
        "bar",
        vec![DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 6, RED))],
    )];
    let opts = GeneratorOptions {
        power_of_two: true,
        force_square: true,
        ..Default::default()
    };
    let res = generate_from_images(anims, None, &opts);
    assert!(res.success, "{:?}", res.errors);
    assert_eq!((res.atlas_width, res.atlas_height), (64, 64));
}

#[test]
fn fixed_algorithm_with_unknown_heuristic_warns() {
    let anims = vec![AnimationInput::new(
        "a",
        vec![DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, RED))],
    )];
    let opts = GeneratorOptions {
        algorithm: AlgorithmChoice::Fixed(Algorithm::MaxRects),
        heuristic: HeuristicChoice::Key("spiral".into()),
        ..Default::default()
    };
    let res = generate_from_images(anims, None, &opts);
    assert!(res.success, "{:?}", res.errors);
    assert_eq!(res.heuristic, "bssf");
    assert!(res.warnings.iter().any(|w| w.contains("spiral")));
}

#[test]
fn missing_files_fail_without_panicking() {
    let dir = tempfile::tempdir().unwrap();
    let mut groups = BTreeMap::new();
    groups.insert(
        "ghost".to_string(),
        vec![dir.path().join("nope_0.png"), dir.path().join("nope_1.png")],
    );
    let out = dir.path().join("atlas");
    let res = generate(&groups, &out, &GeneratorOptions::default());
    assert!(!res.success);
    assert!(!res.errors.is_empty());
    assert!(res.atlas_path.is_none());
    assert!(!dir.path().join("atlas.png").exists());
}

#[test]
fn unknown_export_format_fails_early() {
    let anims = vec![AnimationInput::new(
        "a",
        vec![DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, RED))],
    )];
    let opts = GeneratorOptions {
        export_format: "sparrow".into(),
        ..Default::default()
    };
    let res = generate_from_images(anims, None, &opts);
    assert!(!res.success);
    assert!(res.errors[0].contains("sparrow"));
}

#[test]
fn frames_larger_than_the_maximum_fail() {
    let anims = vec![AnimationInput::new(
        "huge",
        vec![DynamicImage::ImageRgba8(RgbaImage::from_pixel(70, 10, RED))],
    )];
    let opts = GeneratorOptions {
        max_width: 64,
        max_height: 64,
        ..Default::default()
    };
    let res = generate_from_images(anims, None, &opts);
    assert!(!res.success);
    assert!(res.image.is_none());
}

#[test]
fn jpeg_output_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let anims = vec![AnimationInput::new(
        "a",
        vec![DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, RED))],
    )];
    let opts = GeneratorOptions {
        image_format: ImageFormat::Jpeg,
        ..Default::default()
    };
    let out = dir.path().join("atlas");
    let res = generate_from_images(anims, Some(&out), &opts);
    assert!(res.success, "{:?}", res.errors);
    assert!(dir.path().join("atlas.jpg").exists());
    assert!(dir.path().join("atlas.json").exists());
}

fn distinct_squares(n: u8, side: u32) -> Vec<DynamicImage> {
    (0..n)
        .map(|i| DynamicImage::ImageRgba8(RgbaImage::from_pixel(side, side, Rgba([i * 20, 10, 200, 255]))))
        .collect()
}

#[test]
fn short_height_limit_is_never_exceeded() {
    let opts = GeneratorOptions {
        algorithm: AlgorithmChoice::Fixed(Algorithm::MaxRects),
        max_width: 1024,
        max_height: 64,
        padding: 0,
        ..Default::default()
    };
    let res = generate_from_images(vec![AnimationInput::new("row", distinct_squares(10, 60))], None, &opts);
    assert!(res.success, "{:?}", res.errors);
    assert_eq!(res.unique_frames, 10);
    assert_eq!((res.atlas_width, res.atlas_height), (600, 60));

    let frames: Vec<Arc<FrameInput>> = (0..10)
        .map(|i| Arc::new(FrameInput::new(format!("row{i:04}"), 60, 60)))
        .collect();
    let layout = layout_frames(&frames, &opts);
    assert!(layout.success, "{:?}", layout.errors);
    assert!(layout.atlas_height <= 64);
    assert!(layout.packed.iter().all(|p| p.y + p.placed_size().1 <= 64));
}

#[test]
fn auto_mode_and_square_stay_within_axis_limits() {
    let opts = GeneratorOptions {
        max_width: 1024,
        max_height: 64,
        force_square: true,
        ..Default::default()
    };
    let res = generate_from_images(vec![AnimationInput::new("row", distinct_squares(10, 60))], None, &opts);
    assert!(res.success, "{:?}", res.errors);
    assert!(res.atlas_height <= 64, "height {}", res.atlas_height);
    assert!(res.atlas_width <= 1024);
    let image = res.image.unwrap();
    assert_eq!(image.dimensions(), (res.atlas_width, res.atlas_height));
}

#[test]
fn repeated_frame_names_keep_only_the_first_record() {
    let anims = vec![
        AnimationInput::new("walk", vec![DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, RED))]),
        AnimationInput::new("walk", vec![DynamicImage::ImageRgba8(RgbaImage::from_pixel(6, 6, BLUE))]),
    ];
    let res = generate_from_images(anims, None, &GeneratorOptions::default());
    assert!(res.success, "{:?}", res.errors);
    assert!(res.warnings.iter().any(|w| w.contains("walk0000")));
    assert_eq!(res.frame_count, 1);

    let sprites = res.metadata.unwrap().sprites;
    assert_eq!(sprites.len(), 1);
    assert_eq!(sprites[0].name, "walk0000");
    assert_eq!((sprites[0].width, sprites[0].height), (4, 4));
    assert_eq!(sprites[0].source_width, 4);
}

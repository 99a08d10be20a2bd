use std::sync::Arc;

use rand::{Rng, SeedableRng};
use spritepack_core::prelude::*;

fn random_frames(seed: u64, count: usize, min: u32, max: u32) -> Vec<Arc<FrameInput>> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let w = rng.gen_range(min..=max);
            let h = rng.gen_range(min..=max);
            Arc::new(FrameInput::new(format!("r{i}"), w, h))
        })
        .collect()
}

fn options(rotation: bool) -> PackerOptions {
    PackerOptions::builder()
        .with_max_dimensions(1024, 1024)
        .padding(2)
        .border_padding(3)
        .allow_rotation(rotation)
        .allow_flip(rotation)
        .build()
}

fn assert_valid(res: &PackerResult, frames: &[Arc<FrameInput>], opts: &PackerOptions, w: u32, h: u32) {
    let label = format!("{}/{}", res.algorithm_name, res.heuristic_name);
    assert!(res.success, "{label} failed: {:?}", res.errors);
    assert_eq!(res.packed.len(), frames.len(), "{label} lost frames");

    // placements come back in input order
    for (p, f) in res.packed.iter().zip(frames) {
        assert_eq!(p.id(), f.id, "{label} reordered output");
    }

    let usable = Rect::new(
        opts.border_padding,
        opts.border_padding,
        w - 2 * opts.border_padding,
        h - 2 * opts.border_padding,
    );
    let slots: Vec<Rect> = res.packed.iter().map(|p| p.padded_rect(opts.padding)).collect();
    for (i, a) in slots.iter().enumerate() {
        assert!(usable.contains(a), "{label}: {:?} escapes {:?}", a, usable);
        for b in &slots[i + 1..] {
            assert!(!a.intersects(b), "{label}: {:?} overlaps {:?}", a, b);
        }
    }

    assert!(res.atlas_area() >= res.used_area());
    assert!(res.efficiency > 0.0 && res.efficiency <= 1.0);
    assert!(res.atlas_width <= w && res.atlas_height <= h);
}

#[test]
fn every_algorithm_packs_without_overlap() {
    let frames = random_frames(42, 80, 4, 48);
    for rotation in [false, true] {
        let opts = options(rotation);
        for algorithm in Algorithm::ALL {
            let mut packer = create_packer(algorithm, opts.clone());
            let res = packer.pack(&frames, 1024, 1024).unwrap();
            assert_valid(&res, &frames, &opts, 1024, 1024);
            if !rotation {
                assert!(res.packed.iter().all(|p| !p.rotated && !p.flipped_y));
            }
        }
    }
}

#[test]
fn every_heuristic_packs_without_overlap() {
    let frames = random_frames(7, 60, 2, 40);
    let opts = options(true);
    for algorithm in Algorithm::ALL {
        let keys = create_packer(algorithm, opts.clone()).heuristics();
        for key in keys {
            let mut packer = create_packer(algorithm, opts.clone());
            assert!(packer.set_heuristic(key), "{algorithm} rejected its own key {key}");
            let res = packer.pack(&frames, 1024, 1024).unwrap();
            assert_valid(&res, &frames, &opts, 1024, 1024);
        }
    }
}

#[test]
fn packing_is_deterministic_and_reusable() {
    let frames = random_frames(1234, 100, 4, 64);
    let opts = options(true);
    let layout = |r: &PackerResult| -> Vec<(String, u32, u32, bool, bool)> {
        r.packed
            .iter()
            .map(|p| (p.id().to_string(), p.x, p.y, p.rotated, p.flipped_y))
            .collect()
    };
    for algorithm in Algorithm::ALL {
        let mut a = create_packer(algorithm, opts.clone());
        let mut b = create_packer(algorithm, opts.clone());
        let first = a.pack(&frames, 1024, 1024).unwrap();
        let again = a.pack(&frames, 1024, 1024).unwrap();
        let other = b.pack(&frames, 1024, 1024).unwrap();
        assert_eq!(layout(&first), layout(&again), "{algorithm} kept state between calls");
        assert_eq!(layout(&first), layout(&other), "{algorithm} is not deterministic");
    }
}

#[test]
fn capacity_failure_reports_partial_result() {
    let frames = random_frames(99, 40, 20, 40);
    let opts = options(false);
    for algorithm in Algorithm::ALL {
        let mut packer = create_packer(algorithm, opts.clone());
        let res = packer.pack(&frames, 96, 96).unwrap();
        assert!(!res.success, "{algorithm} claimed success in a tiny bin");
        assert!(res.packed.len() < frames.len());
        assert!(!res.errors.is_empty());
    }
}

#[test]
fn degenerate_bins_are_errors() {
    let frames = random_frames(3, 4, 4, 8);
    let opts = PackerOptions::builder().border_padding(10).build();
    for algorithm in Algorithm::ALL {
        let mut packer = create_packer(algorithm, opts.clone());
        assert!(packer.pack(&frames, 0, 64).is_err());
        assert!(packer.pack(&frames, 20, 64).is_err());
    }
}

#[test]
fn empty_input_succeeds_with_no_extents() {
    for algorithm in Algorithm::ALL {
        let mut packer = create_packer(algorithm, PackerOptions::default());
        let res = packer.pack(&[], 64, 64).unwrap();
        assert!(res.success);
        assert!(res.packed.is_empty());
        assert_eq!((res.atlas_width, res.atlas_height), (0, 0));
    }
}

#[test]
fn zero_sized_frames_are_skipped_with_a_warning() {
    let frames: Vec<Arc<FrameInput>> = vec![
        Arc::new(FrameInput::new("a", 8, 8)),
        Arc::new(FrameInput::new("hole", 0, 8)),
        Arc::new(FrameInput::new("b", 8, 8)),
    ];
    for algorithm in Algorithm::ALL {
        let mut packer = create_packer(algorithm, PackerOptions::default());
        let res = packer.pack(&frames, 64, 64).unwrap();
        assert!(res.success, "{algorithm}: {:?}", res.errors);
        assert_eq!(res.packed.len(), 2);
        assert!(res.get("hole").is_none());
        assert_eq!(res.warnings.len(), 1);
    }
}

use std::sync::Arc;

use spritepack_core::config::{PackerOptions, SkylineHeuristic};
use spritepack_core::model::FrameInput;
use spritepack_core::packer::{Packer, SkylinePacker};

fn one(id: &str, w: u32, h: u32) -> Vec<Arc<FrameInput>> {
    vec![Arc::new(FrameInput::new(id, w, h))]
}

#[test]
fn skyline_respects_allow_rotation_false() {
    let opts = PackerOptions::builder().allow_rotation(false).build();
    let mut p = SkylinePacker::with_heuristic(opts, SkylineHeuristic::BottomLeft);
    // tall frame that could be rotated if allowed
    let res = p.pack(&one("tall", 64, 128), 4096, 4096).unwrap();
    let f = &res.packed[0];
    assert_eq!(f.placed_size(), (64, 128));
    assert!(!f.rotated, "rotation must be false when allow_rotation=false");
}

#[test]
fn skyline_rotates_when_only_rotated_fits() {
    // 8x14 upright does not fit a 12 high bin; 14x8 does
    let opts = PackerOptions::builder()
        .padding(0)
        .allow_rotation(true)
        .build();
    let mut p = SkylinePacker::with_heuristic(opts, SkylineHeuristic::BottomLeft);
    let res = p.pack(&one("R", 8, 14), 16, 12).unwrap();
    assert!(res.success, "{:?}", res.errors);
    let f = &res.packed[0];
    assert!(f.rotated, "should rotate because only rotated fits");
    assert_eq!(f.placed_size(), (14, 8));
}

#[test]
fn skyline_fails_cleanly_when_neither_orientation_fits() {
    let opts = PackerOptions::builder()
        .padding(0)
        .allow_rotation(true)
        .build();
    let mut p = SkylinePacker::new(opts);
    let res = p.pack(&one("big", 20, 14), 16, 12).unwrap();
    assert!(!res.success);
    assert!(res.packed.is_empty());
    assert_eq!(res.errors.len(), 1);
}

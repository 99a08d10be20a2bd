use std::sync::Arc;

use super::maxrects::MaxRectsPacker;
use super::{Block, Packer, PlacementHints, block_order, finish, prepare_blocks, usable_area};
use crate::config::{MaxRectsHeuristic, PackerOptions};
use crate::error::Result;
use crate::model::{FrameInput, PackerResult};

/// Aspect ratio above which a minority-orientation block gets tagged.
const ASPECT_THRESHOLD: f64 = 1.25;

/// MaxRects with an orientation pre-pass.
///
/// Blocks whose orientation disagrees with the dominant one (by summed area)
/// and that are clearly elongated are hinted to rotate, and to flip when
/// flipping is allowed. Hints only bias MaxRects scoring.
pub struct HybridPacker {
    inner: MaxRectsPacker,
}

impl HybridPacker {
    pub fn new(options: PackerOptions) -> Self {
        Self {
            inner: MaxRectsPacker::new(options),
        }
    }

    fn tag_blocks(options: &PackerOptions, blocks: &mut [Block]) -> usize {
        if !options.allow_rotation && !options.allow_flip {
            return 0;
        }
        let (landscape, portrait) = blocks.iter().fold((0u64, 0u64), |(l, p), b| {
            if b.w > b.h {
                (l + b.area(), p)
            } else if b.h > b.w {
                (l, p + b.area())
            } else {
                (l, p)
            }
        });
        let dominant_landscape = landscape >= portrait;

        let mut tagged = 0;
        for b in blocks.iter_mut() {
            let minority = if dominant_landscape { b.h > b.w } else { b.w > b.h };
            let aspect = b.max_side() as f64 / b.w.min(b.h).max(1) as f64;
            if minority && aspect > ASPECT_THRESHOLD {
                b.hints = Some(PlacementHints {
                    force_rotate: options.allow_rotation,
                    force_flip_y: options.allow_flip,
                });
                tagged += 1;
            }
        }
        tagged
    }
}

impl Packer for HybridPacker {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    fn heuristic_name(&self) -> String {
        self.inner.heuristic_name()
    }

    fn heuristics(&self) -> &'static [&'static str] {
        MaxRectsHeuristic::KEYS
    }

    fn set_heuristic(&mut self, key: &str) -> bool {
        self.inner.set_heuristic(key)
    }

    fn pack(
        &mut self,
        frames: &[Arc<FrameInput>],
        width: u32,
        height: u32,
    ) -> Result<PackerResult> {
        let options = self.inner.options();
        let bin = usable_area(options, width, height)?;
        let mut result = PackerResult::new(self.name(), self.heuristic_name());
        let mut blocks = prepare_blocks(frames, options.padding, &mut result);
        let tagged = Self::tag_blocks(options, &mut blocks);
        if tagged > 0 {
            tracing::trace!(tagged, "hybrid orientation hints");
        }
        let order = block_order(&blocks, options.sort_by_max_side);
        self.inner
            .pack_blocks(&mut blocks, &order, bin, &mut result, (width, height));
        Ok(finish(blocks, self.inner.options(), result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(sizes: &[(u32, u32)]) -> Vec<Arc<FrameInput>> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &(w, h))| Arc::new(FrameInput::new(format!("f{i}"), w, h)))
            .collect()
    }

    #[test]
    fn minority_orientation_gets_rotated_and_flipped() {
        let opts = PackerOptions::builder()
            .padding(0)
            .allow_rotation(true)
            .allow_flip(true)
            .build();
        let mut p = HybridPacker::new(opts);
        let res = p
            .pack(&frames(&[(40, 10), (40, 10), (40, 10), (10, 40)]), 64, 64)
            .unwrap();
        assert!(res.success);
        let odd = res.get("f3").unwrap();
        assert!(odd.rotated);
        assert!(odd.flipped_y);
        assert!(res.packed.iter().take(3).all(|f| !f.flipped_y));
    }

    #[test]
    fn no_tags_without_rotation_or_flip() {
        let opts = PackerOptions::builder().padding(0).build();
        let mut p = HybridPacker::new(opts);
        let res = p.pack(&frames(&[(40, 10), (10, 40)]), 64, 64).unwrap();
        assert!(res.packed.iter().all(|f| !f.rotated && !f.flipped_y));
        assert_eq!(res.algorithm_name, "hybrid");
    }
}

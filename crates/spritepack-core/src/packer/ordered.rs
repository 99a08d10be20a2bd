use std::sync::Arc;

use super::{Packer, Placement, finish, prepare_blocks, record_unplaced, usable_area};
use crate::config::PackerOptions;
use crate::error::Result;
use crate::model::{FrameInput, PackerResult};

/// Row layout that keeps frames in their input order.
///
/// The row width targets a square overall shape: `ceil(sqrt(total padded area))`,
/// clamped between the widest frame and the usable bin width.
pub struct OrderedPacker {
    options: PackerOptions,
}

impl OrderedPacker {
    pub fn new(options: PackerOptions) -> Self {
        Self { options }
    }
}

impl Packer for OrderedPacker {
    fn name(&self) -> &'static str {
        "ordered"
    }

    fn heuristic_name(&self) -> String {
        String::new()
    }

    fn heuristics(&self) -> &'static [&'static str] {
        &[]
    }

    fn set_heuristic(&mut self, _key: &str) -> bool {
        false
    }

    fn pack(
        &mut self,
        frames: &[Arc<FrameInput>],
        width: u32,
        height: u32,
    ) -> Result<PackerResult> {
        let bin = usable_area(&self.options, width, height)?;
        let mut result = PackerResult::new(self.name(), self.heuristic_name());
        let mut blocks = prepare_blocks(frames, self.options.padding, &mut result);

        let total_area: u64 = blocks.iter().map(|b| b.area()).sum();
        let widest = blocks.iter().map(|b| b.w).max().unwrap_or(0);
        let target = ((total_area as f64).sqrt().ceil() as u32)
            .max(widest)
            .min(bin.w);

        let (mut x, mut y, mut row_h) = (0u32, 0u32, 0u32);
        for block in blocks.iter_mut() {
            let (w, h) = (block.w, block.h);
            if x > 0 && x + w > target {
                y += row_h;
                x = 0;
                row_h = 0;
            }
            if w > bin.w || y + h > bin.h {
                record_unplaced(&mut result, block, width, height);
                break;
            }
            block.placement = Some(Placement {
                x: bin.x + x,
                y: bin.y + y,
                rotated: false,
                flipped_y: false,
            });
            x += w;
            row_h = row_h.max(h);
        }
        Ok(finish(blocks, &self.options, result))
    }
}

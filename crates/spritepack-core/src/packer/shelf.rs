use std::sync::Arc;

use super::{Block, Packer, Placement, finish, prepare_blocks, record_unplaced, usable_area};
use crate::config::{PackerOptions, ShelfHeuristic};
use crate::error::Result;
use crate::model::{FrameInput, PackerResult, Rect};

#[derive(Clone, Copy, Debug)]
struct Shelf {
    y: u32,
    height: u32,
    used_width: u32,
}

/// Row packer: every shelf takes the height of the first frame placed on it.
///
/// `ShelfPacker::ffdh` sorts by height (then width) descending before packing,
/// which is the classic first-fit decreasing height layout.
pub struct ShelfPacker {
    options: PackerOptions,
    heuristic: ShelfHeuristic,
    decreasing_height: bool,
}

impl ShelfPacker {
    pub fn new(options: PackerOptions) -> Self {
        Self {
            options,
            heuristic: ShelfHeuristic::FirstFit,
            decreasing_height: false,
        }
    }

    pub fn ffdh(options: PackerOptions) -> Self {
        Self {
            decreasing_height: true,
            ..Self::new(options)
        }
    }

    pub fn with_heuristic(mut self, heuristic: ShelfHeuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    fn order(&self, blocks: &[Block]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..blocks.len()).collect();
        if self.decreasing_height {
            order.sort_by(|&a, &b| {
                (blocks[b].h, blocks[b].w).cmp(&(blocks[a].h, blocks[a].w))
            });
        }
        order
    }

    /// Picks an existing shelf for a `w x h` slot.
    fn pick_shelf(&self, shelves: &[Shelf], bin_w: u32, w: u32, h: u32) -> Option<usize> {
        let fits = |s: &Shelf| h <= s.height && s.used_width + w <= bin_w;
        match self.heuristic {
            ShelfHeuristic::NextFit => {
                let last = shelves.len().checked_sub(1)?;
                fits(&shelves[last]).then_some(last)
            }
            ShelfHeuristic::FirstFit => shelves.iter().position(fits),
            ShelfHeuristic::BestWidthFit => shelves
                .iter()
                .enumerate()
                .filter(|(_, s)| fits(s))
                .min_by_key(|(_, s)| bin_w - s.used_width - w)
                .map(|(i, _)| i),
            ShelfHeuristic::BestHeightFit => shelves
                .iter()
                .enumerate()
                .filter(|(_, s)| fits(s))
                .min_by_key(|(_, s)| s.height - h)
                .map(|(i, _)| i),
            ShelfHeuristic::WorstWidthFit => shelves
                .iter()
                .enumerate()
                .filter(|(_, s)| fits(s))
                // first of equals wins
                .fold(None::<(usize, u32)>, |best, (i, s)| {
                    let left = bin_w - s.used_width - w;
                    match best {
                        Some((_, b)) if b >= left => best,
                        _ => Some((i, left)),
                    }
                })
                .map(|(i, _)| i),
        }
    }

    fn place(&self, shelves: &mut Vec<Shelf>, bin: &Rect, block: &Block) -> Option<Placement> {
        let rotations: &[bool] = if self.options.allow_rotation {
            &[false, true]
        } else {
            &[false]
        };
        for &rotated in rotations {
            let (w, h) = block.size(rotated);
            if let Some(i) = self.pick_shelf(shelves, bin.w, w, h) {
                let shelf = &mut shelves[i];
                let x = bin.x + shelf.used_width;
                shelf.used_width += w;
                return Some(Placement {
                    x,
                    y: shelf.y,
                    rotated,
                    flipped_y: false,
                });
            }
        }

        // open a new shelf, preferring the flatter orientation that fits the width
        let next_y = shelves.last().map_or(bin.y, |s| s.y + s.height);
        let mut candidates: Vec<bool> = rotations
            .iter()
            .copied()
            .filter(|&r| block.size(r).0 <= bin.w)
            .collect();
        candidates.sort_by_key(|&r| block.size(r).1);
        let rotated = *candidates.first()?;
        let (w, h) = block.size(rotated);
        if next_y + h > bin.y_end() {
            return None;
        }
        shelves.push(Shelf {
            y: next_y,
            height: h,
            used_width: w,
        });
        Some(Placement {
            x: bin.x,
            y: next_y,
            rotated,
            flipped_y: false,
        })
    }
}

impl Packer for ShelfPacker {
    fn name(&self) -> &'static str {
        if self.decreasing_height {
            "shelf-ffdh"
        } else {
            "shelf"
        }
    }

    fn heuristic_name(&self) -> String {
        self.heuristic.key().to_string()
    }

    fn heuristics(&self) -> &'static [&'static str] {
        ShelfHeuristic::KEYS
    }

    fn set_heuristic(&mut self, key: &str) -> bool {
        match key.parse() {
            Ok(h) => {
                self.heuristic = h;
                true
            }
            Err(()) => false,
        }
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
        let mut shelves: Vec<Shelf> = Vec::new();

        for i in self.order(&blocks) {
            match self.place(&mut shelves, &bin, &blocks[i]) {
                Some(p) => blocks[i].placement = Some(p),
                None => {
                    record_unplaced(&mut result, &blocks[i], width, height);
                    break;
                }
            }
        }
        Ok(finish(blocks, &self.options, result))
    }
}

use std::sync::Arc;

use super::{Block, Packer, Placement, block_order, finish, prepare_blocks, record_unplaced, usable_area};
use crate::config::{PackerOptions, SkylineHeuristic};
use crate::error::Result;
use crate::model::{FrameInput, PackerResult, Rect};

/// One horizontal piece of the contour: free space starts at `y` over `[x, x + w)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SkylineNode {
    x: u32,
    y: u32,
    w: u32,
}

impl SkylineNode {
    #[inline]
    fn x_end(&self) -> u32 {
        self.x + self.w
    }
}

/// Candidate score. The primary component is doubled so a rotated candidate can
/// carry a half-point penalty and still compare exactly.
type Score = (i64, i64);

pub struct SkylinePacker {
    options: PackerOptions,
    heuristic: SkylineHeuristic,
    border: Rect,
    skylines: Vec<SkylineNode>,
}

impl SkylinePacker {
    pub fn new(options: PackerOptions) -> Self {
        Self::with_heuristic(options, SkylineHeuristic::BottomLeft)
    }

    pub fn with_heuristic(options: PackerOptions, heuristic: SkylineHeuristic) -> Self {
        Self {
            options,
            heuristic,
            border: Rect::default(),
            skylines: Vec::new(),
        }
    }

    fn reset(&mut self, border: Rect) {
        self.border = border;
        self.skylines = vec![SkylineNode {
            x: border.x,
            y: border.y,
            w: border.w,
        }];
    }

    /// Where a `w x h` rect starting at segment `i` would sit, if it fits.
    fn can_put(&self, i: usize, w: u32, h: u32) -> Option<Rect> {
        let x = self.skylines[i].x;
        if x + w > self.border.x_end() {
            return None;
        }
        let mut y = 0;
        let mut width_left = w;
        let mut j = i;
        while width_left > 0 {
            let seg = self.skylines.get(j)?;
            y = y.max(seg.y);
            width_left = width_left.saturating_sub(seg.w);
            j += 1;
        }
        if y + h > self.border.y_end() {
            return None;
        }
        Some(Rect::new(x, y, w, h))
    }

    fn wasted_area(&self, start: usize, r: &Rect) -> i64 {
        let mut area = 0i64;
        let mut width_left = r.w;
        for seg in &self.skylines[start..] {
            if width_left == 0 {
                break;
            }
            let use_w = width_left.min(seg.w);
            area += (r.y - seg.y) as i64 * use_w as i64;
            width_left -= use_w;
        }
        area
    }

    fn score(&self, i: usize, r: &Rect, rotated: bool) -> Score {
        let top = r.y_end() as i64;
        let (primary, secondary) = match self.heuristic {
            SkylineHeuristic::BottomLeft => (top, r.x as i64),
            SkylineHeuristic::MinWaste => (self.wasted_area(i, r), top),
            SkylineHeuristic::BestFit => ((self.skylines[i].w as i64 - r.w as i64).abs(), top),
        };
        (primary * 2 + rotated as i64, secondary)
    }

    fn find_position(&self, block: &Block) -> Option<(usize, Rect, bool)> {
        let mut best: Option<(Score, usize, Rect, bool)> = None;
        for i in 0..self.skylines.len() {
            for rotated in [false, true] {
                if rotated && !self.options.allow_rotation {
                    continue;
                }
                let (w, h) = block.size(rotated);
                let Some(r) = self.can_put(i, w, h) else {
                    continue;
                };
                let s = self.score(i, &r, rotated);
                if best.is_none_or(|(b, ..)| s < b) {
                    best = Some((s, i, r, rotated));
                }
            }
        }
        best.map(|(_, i, r, rot)| (i, r, rot))
    }

    fn place(&mut self, index: usize, rect: &Rect) {
        self.skylines.insert(
            index,
            SkylineNode {
                x: rect.x,
                y: rect.y_end(),
                w: rect.w,
            },
        );
        let end = rect.x_end();
        let i = index + 1;
        while i < self.skylines.len() {
            let seg = self.skylines[i];
            if seg.x >= end {
                break;
            }
            if seg.x_end() <= end {
                self.skylines.remove(i);
            } else {
                let shrink = end - seg.x;
                self.skylines[i].x += shrink;
                self.skylines[i].w -= shrink;
                break;
            }
        }
        self.merge();
    }

    fn merge(&mut self) {
        let mut i = 1;
        while i < self.skylines.len() {
            if self.skylines[i - 1].y == self.skylines[i].y {
                let w = self.skylines[i].w;
                self.skylines[i - 1].w += w;
                self.skylines.remove(i);
            } else {
                i += 1;
            }
        }
    }
}

impl Packer for SkylinePacker {
    fn name(&self) -> &'static str {
        "skyline"
    }

    fn heuristic_name(&self) -> String {
        self.heuristic.key().to_string()
    }

    fn heuristics(&self) -> &'static [&'static str] {
        SkylineHeuristic::KEYS
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
        self.reset(bin);
        let mut result = PackerResult::new(self.name(), self.heuristic_name());
        let mut blocks = prepare_blocks(frames, self.options.padding, &mut result);
        let order = block_order(&blocks, self.options.sort_by_max_side);

        for i in order {
            let Some((index, rect, rotated)) = self.find_position(&blocks[i]) else {
                record_unplaced(&mut result, &blocks[i], width, height);
                break;
            };
            self.place(index, &rect);
            blocks[i].placement = Some(Placement {
                x: rect.x,
                y: rect.y,
                rotated,
                flipped_y: false,
            });
        }
        Ok(finish(blocks, &self.options, result))
    }
}

use std::sync::Arc;

use super::free_list::{leftovers, prune_contained, split_around};
use super::{Block, Packer, Placement, block_order, finish, prepare_blocks, record_unplaced, usable_area};
use crate::config::{MaxRectsHeuristic, PackerOptions};
use crate::error::Result;
use crate::model::{FrameInput, PackerResult, Rect};

/// Primary-score penalty applied to the orientation a hint argues against.
const HINT_PENALTY: i64 = 1;

pub struct MaxRectsPacker {
    options: PackerOptions,
    heuristic: MaxRectsHeuristic,
}

impl MaxRectsPacker {
    pub fn new(options: PackerOptions) -> Self {
        Self::with_heuristic(options, MaxRectsHeuristic::BestShortSideFit)
    }

    pub fn with_heuristic(options: PackerOptions, heuristic: MaxRectsHeuristic) -> Self {
        Self { options, heuristic }
    }

    pub fn heuristic(&self) -> MaxRectsHeuristic {
        self.heuristic
    }

    pub fn options(&self) -> &PackerOptions {
        &self.options
    }

    /// Packs prepared blocks in `order`, stopping at the first one that does not fit.
    pub(crate) fn pack_blocks(
        &self,
        blocks: &mut [Block],
        order: &[usize],
        bin: Rect,
        result: &mut PackerResult,
        (width, height): (u32, u32),
    ) {
        let mut state = MaxRectsBin::new(
            bin,
            self.heuristic,
            self.options.allow_rotation,
            self.options.allow_flip,
        );
        for &i in order {
            match state.insert(&blocks[i]) {
                Some(p) => blocks[i].placement = Some(p),
                None => {
                    record_unplaced(result, &blocks[i], width, height);
                    break;
                }
            }
        }
    }
}

impl Packer for MaxRectsPacker {
    fn name(&self) -> &'static str {
        "maxrects"
    }

    fn heuristic_name(&self) -> String {
        self.heuristic.key().to_string()
    }

    fn heuristics(&self) -> &'static [&'static str] {
        MaxRectsHeuristic::KEYS
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
        let order = block_order(&blocks, self.options.sort_by_max_side);
        self.pack_blocks(&mut blocks, &order, bin, &mut result, (width, height));
        Ok(finish(blocks, &self.options, result))
    }
}

/// Free-list state of one packing attempt.
pub(crate) struct MaxRectsBin {
    border: Rect,
    free: Vec<Rect>,
    used: Vec<Rect>,
    heuristic: MaxRectsHeuristic,
    allow_rotation: bool,
    allow_flip: bool,
}

impl MaxRectsBin {
    pub(crate) fn new(
        border: Rect,
        heuristic: MaxRectsHeuristic,
        allow_rotation: bool,
        allow_flip: bool,
    ) -> Self {
        Self {
            border,
            free: vec![border],
            used: Vec::new(),
            heuristic,
            allow_rotation,
            allow_flip,
        }
    }

    pub(crate) fn insert(&mut self, block: &Block) -> Option<Placement> {
        let (node, rotated) = self.find_position(block)?;
        self.place_rect(&node);
        let hints = block.hints.unwrap_or_default();
        Some(Placement {
            x: node.x,
            y: node.y,
            rotated,
            flipped_y: self.allow_flip && hints.force_flip_y,
        })
    }

    #[cfg(test)]
    pub(crate) fn free_list_len(&self) -> usize {
        self.free.len()
    }

    fn place_rect(&mut self, node: &Rect) {
        self.free = split_around(&self.free, node);
        prune_contained(&mut self.free);
        self.used.push(*node);
    }

    fn score(&self, fr: &Rect, w: u32, h: u32) -> (i64, i64) {
        let (short_fit, long_fit, area_fit) = leftovers(fr, w, h);
        match self.heuristic {
            MaxRectsHeuristic::BestShortSideFit => (short_fit, long_fit),
            MaxRectsHeuristic::BestLongSideFit => (long_fit, short_fit),
            MaxRectsHeuristic::BestAreaFit => (area_fit, short_fit),
            MaxRectsHeuristic::BottomLeft => ((fr.y + h) as i64, fr.x as i64),
            MaxRectsHeuristic::ContactPoint => {
                // maximize contact score: use negative for minimization
                let contact = self.contact_point_score(fr.x, fr.y, w, h);
                (-(contact as i64), area_fit)
            }
        }
    }

    fn exact_fit_is_optimal(&self) -> bool {
        matches!(
            self.heuristic,
            MaxRectsHeuristic::BestShortSideFit
                | MaxRectsHeuristic::BestLongSideFit
                | MaxRectsHeuristic::BestAreaFit
        )
    }

    fn find_position(&self, block: &Block) -> Option<(Rect, bool)> {
        let hints = block.hints.unwrap_or_default();
        let prefer_rotated = self.allow_rotation && hints.force_rotate;
        let early_out = self.exact_fit_is_optimal() && block.hints.is_none();
        let orientations: &[bool] = if self.allow_rotation {
            &[false, true]
        } else {
            &[false]
        };

        let mut best: Option<(i64, i64, Rect, bool)> = None;
        for fr in &self.free {
            for &rotated in orientations {
                let (w, h) = block.size(rotated);
                if fr.w < w || fr.h < h {
                    continue;
                }
                let (mut s1, s2) = self.score(fr, w, h);
                if prefer_rotated && !rotated {
                    s1 += HINT_PENALTY;
                }
                if early_out && fr.w == w && fr.h == h {
                    return Some((Rect::new(fr.x, fr.y, w, h), rotated));
                }
                let better = match best {
                    None => true,
                    Some((b1, b2, _, _)) => s1 < b1 || (s1 == b1 && s2 < b2),
                };
                if better {
                    best = Some((s1, s2, Rect::new(fr.x, fr.y, w, h), rotated));
                }
            }
        }
        best.map(|(_, _, r, rot)| (r, rot))
    }

    fn contact_point_score(&self, x: u32, y: u32, w: u32, h: u32) -> u32 {
        let node = Rect::new(x, y, w, h);
        let mut score = 0u32;
        // contact with borders
        if node.x == self.border.x || node.x_end() == self.border.x_end() {
            score += node.h;
        }
        if node.y == self.border.y || node.y_end() == self.border.y_end() {
            score += node.w;
        }
        // contact with used rectangles
        for u in &self.used {
            if node.x == u.x_end() || u.x == node.x_end() {
                score += overlap_1d(node.y, node.y_end(), u.y, u.y_end());
            }
            if node.y == u.y_end() || u.y == node.y_end() {
                score += overlap_1d(node.x, node.x_end(), u.x, u.x_end());
            }
        }
        score
    }
}

fn overlap_1d(a1: u32, a2: u32, b1: u32, b2: u32) -> u32 {
    let start = a1.max(b1);
    let end = a2.min(b2);
    end.saturating_sub(start)
}

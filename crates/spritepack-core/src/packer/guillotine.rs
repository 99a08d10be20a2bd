use std::sync::Arc;

use super::free_list::{leftovers, merge_adjacent};
use super::{Block, Packer, Placement, block_order, finish, prepare_blocks, record_unplaced, usable_area};
use crate::config::{GuillotineChoice, GuillotineSplit, PackerOptions};
use crate::error::Result;
use crate::model::{FrameInput, PackerResult, Rect};

pub struct GuillotinePacker {
    options: PackerOptions,
    choice: GuillotineChoice,
    split: GuillotineSplit,
    merge_interval: usize,
    free: Vec<Rect>,
}

impl GuillotinePacker {
    pub fn new(options: PackerOptions) -> Self {
        Self::with_heuristics(
            options,
            GuillotineChoice::BestAreaFit,
            GuillotineSplit::SplitShorterLeftoverAxis,
        )
    }

    pub fn with_heuristics(
        options: PackerOptions,
        choice: GuillotineChoice,
        split: GuillotineSplit,
    ) -> Self {
        Self {
            options,
            choice,
            split,
            merge_interval: 1,
            free: Vec::new(),
        }
    }

    /// Run `merge_free_rects` every `n` placements; 0 disables merging.
    pub fn with_merge_interval(mut self, n: usize) -> Self {
        self.merge_interval = n;
        self
    }

    pub fn split(&self) -> GuillotineSplit {
        self.split
    }

    /// Free rectangles left by the last `pack` call.
    pub fn free_rects(&self) -> &[Rect] {
        &self.free
    }

    /// Coalesces free rects that share a full edge. Returns the number of merges.
    pub fn merge_free_rects(&mut self) -> usize {
        merge_adjacent(&mut self.free)
    }

    fn score(&self, fr: &Rect, w: u32, h: u32) -> i64 {
        let (short_fit, long_fit, area_fit) = leftovers(fr, w, h);
        match self.choice {
            GuillotineChoice::BestAreaFit => area_fit,
            GuillotineChoice::BestShortSideFit => short_fit,
            GuillotineChoice::BestLongSideFit => long_fit,
            GuillotineChoice::WorstAreaFit => -area_fit,
            GuillotineChoice::WorstShortSideFit => -short_fit,
            GuillotineChoice::WorstLongSideFit => -long_fit,
        }
    }

    fn choose(&self, block: &Block) -> Option<(usize, Rect, bool)> {
        let mut best: Option<(i64, usize, Rect, bool)> = None;
        for (i, fr) in self.free.iter().enumerate() {
            for rotated in [false, true] {
                if rotated && !self.options.allow_rotation {
                    continue;
                }
                let (w, h) = block.size(rotated);
                if fr.w < w || fr.h < h {
                    continue;
                }
                let s = self.score(fr, w, h);
                if best.is_none_or(|(b, ..)| s < b) {
                    best = Some((s, i, Rect::new(fr.x, fr.y, w, h), rotated));
                }
            }
        }
        best.map(|(_, i, r, rot)| (i, r, rot))
    }

    /// Splits `fr` around `placed` (at its top-left) into a bottom and a right child.
    fn split_rect(&self, fr: &Rect, placed: &Rect) -> [Option<Rect>; 2] {
        let w_right = fr.x_end() - placed.x_end();
        let h_bottom = fr.y_end() - placed.y_end();

        let split_horizontal = match self.split {
            GuillotineSplit::SplitShorterLeftoverAxis => h_bottom < w_right,
            GuillotineSplit::SplitLongerLeftoverAxis => h_bottom > w_right,
            // cross terms kept literally: leftover_w * (h + leftover_h) vs leftover_h * (w + leftover_w)
            GuillotineSplit::SplitMinimizeArea => {
                (w_right as u64) * (placed.h + h_bottom) as u64
                    <= (h_bottom as u64) * (placed.w + w_right) as u64
            }
            GuillotineSplit::SplitMaximizeArea => {
                (w_right as u64) * (placed.h + h_bottom) as u64
                    >= (h_bottom as u64) * (placed.w + w_right) as u64
            }
            GuillotineSplit::SplitShorterAxis => placed.w <= placed.h,
            GuillotineSplit::SplitLongerAxis => placed.w > placed.h,
        };

        let (bottom, right) = if split_horizontal {
            (
                Rect::new(fr.x, placed.y_end(), fr.w, h_bottom),
                Rect::new(placed.x_end(), fr.y, w_right, placed.h),
            )
        } else {
            (
                Rect::new(fr.x, placed.y_end(), placed.w, h_bottom),
                Rect::new(placed.x_end(), fr.y, w_right, fr.h),
            )
        };
        [bottom, right].map(|r| (!r.is_empty()).then_some(r))
    }

    fn place(&mut self, idx: usize, placed: &Rect) {
        let fr = self.free[idx];
        let children = self.split_rect(&fr, placed);
        let mut next = Vec::with_capacity(self.free.len() + 1);
        next.extend(
            self.free
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != idx)
                .map(|(_, r)| *r),
        );
        next.extend(children.into_iter().flatten());
        self.free = next;
    }
}

impl Packer for GuillotinePacker {
    fn name(&self) -> &'static str {
        "guillotine"
    }

    fn heuristic_name(&self) -> String {
        format!("{}+{}", self.choice.key(), self.split.key())
    }

    fn heuristics(&self) -> &'static [&'static str] {
        GuillotineChoice::KEYS
    }

    fn set_heuristic(&mut self, key: &str) -> bool {
        let (choice_key, split_key) = match key.split_once('+') {
            Some((c, s)) => (c, Some(s)),
            None => (key, None),
        };
        let Ok(choice) = choice_key.parse::<GuillotineChoice>() else {
            return false;
        };
        let split = match split_key {
            Some(s) => match s.parse::<GuillotineSplit>() {
                Ok(split) => split,
                Err(()) => return false,
            },
            None => self.split,
        };
        self.choice = choice;
        self.split = split;
        true
    }

    fn pack(
        &mut self,
        frames: &[Arc<FrameInput>],
        width: u32,
        height: u32,
    ) -> Result<PackerResult> {
        let bin = usable_area(&self.options, width, height)?;
        self.free = vec![bin];
        let mut result = PackerResult::new(self.name(), self.heuristic_name());
        let mut blocks = prepare_blocks(frames, self.options.padding, &mut result);
        let order = block_order(&blocks, self.options.sort_by_max_side);

        let mut placed_count = 0usize;
        for i in order {
            let Some((idx, rect, rotated)) = self.choose(&blocks[i]) else {
                record_unplaced(&mut result, &blocks[i], width, height);
                break;
            };
            self.place(idx, &rect);
            blocks[i].placement = Some(Placement {
                x: rect.x,
                y: rect.y,
                rotated,
                flipped_y: false,
            });
            placed_count += 1;
            if self.merge_interval > 0 && placed_count % self.merge_interval == 0 {
                self.merge_free_rects();
            }
        }
        Ok(finish(blocks, &self.options, result))
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
    fn free_rects_stay_disjoint() {
        let opts = PackerOptions::builder().padding(0).build();
        let mut p = GuillotinePacker::new(opts).with_merge_interval(0);
        let res = p
            .pack(&frames(&[(30, 20), (10, 40), (25, 25), (5, 5)]), 64, 64)
            .unwrap();
        assert!(res.success);
        let free = p.free_rects();
        for (i, a) in free.iter().enumerate() {
            for b in free.iter().skip(i + 1) {
                assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
            }
            for placed in &res.packed {
                assert!(!a.intersects(&placed.rect()));
            }
        }
    }

    #[test]
    fn compound_heuristic_keys() {
        let mut p = GuillotinePacker::new(PackerOptions::default());
        assert!(p.set_heuristic("bssf+minas"));
        assert_eq!(p.heuristic_name(), "bssf+minas");
        assert!(p.set_heuristic("WAF"));
        assert_eq!(p.heuristic_name(), "waf+minas");
        assert!(!p.set_heuristic("baf+nope"));
        assert!(!p.set_heuristic("nope"));
        assert_eq!(p.heuristic_name(), "waf+minas");
        for s in GuillotineSplit::KEYS {
            assert!(p.set_heuristic(&format!("baf+{s}")));
        }
    }

    #[test]
    fn split_children_cover_remainder() {
        let p = GuillotinePacker::new(PackerOptions::default());
        let fr = Rect::new(0, 0, 10, 10);
        let placed = Rect::new(0, 0, 4, 6);
        let [bottom, right] = p.split_rect(&fr, &placed);
        let bottom = bottom.unwrap();
        let right = right.unwrap();
        assert_eq!(bottom.area() + right.area() + placed.area(), fr.area());
        assert!(!bottom.intersects(&right));
    }
}

use std::sync::Arc;

use super::{Block, Packer, Placement, block_order, finish, prepare_blocks, record_unplaced, usable_area};
use crate::config::{GrowingSort, PackerOptions};
use crate::error::Result;
use crate::model::{FrameInput, PackerResult, Rect};

#[derive(Clone, Copy, Debug)]
struct Node {
    rect: Rect,
    used: bool,
    right: Option<usize>,
    down: Option<usize>,
}

impl Node {
    fn leaf(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            rect: Rect::new(x, y, w, h),
            used: false,
            right: None,
            down: None,
        }
    }
}

/// Binary-tree packer whose root grows right or down as blocks arrive.
/// Node coordinates are relative to the usable area's top-left.
struct Tree {
    nodes: Vec<Node>,
    root: usize,
    limit_w: u32,
    limit_h: u32,
}

impl Tree {
    fn new(w: u32, h: u32, limit_w: u32, limit_h: u32) -> Self {
        Self {
            nodes: vec![Node::leaf(0, 0, w, h)],
            root: 0,
            limit_w,
            limit_h,
        }
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn find(&self, idx: usize, w: u32, h: u32) -> Option<usize> {
        let node = &self.nodes[idx];
        if node.used {
            node.right
                .and_then(|r| self.find(r, w, h))
                .or_else(|| node.down.and_then(|d| self.find(d, w, h)))
        } else if w <= node.rect.w && h <= node.rect.h {
            Some(idx)
        } else {
            None
        }
    }

    fn split(&mut self, idx: usize, w: u32, h: u32) -> Rect {
        let r = self.nodes[idx].rect;
        let down = self.push(Node::leaf(r.x, r.y + h, r.w, r.h - h));
        let right = self.push(Node::leaf(r.x + w, r.y, r.w - w, h));
        let node = &mut self.nodes[idx];
        node.used = true;
        node.down = Some(down);
        node.right = Some(right);
        Rect::new(r.x, r.y, w, h)
    }

    fn grow(&mut self, w: u32, h: u32) -> Option<Rect> {
        let root = self.nodes[self.root].rect;
        let can_grow_down = w <= root.w && root.h + h <= self.limit_h;
        let can_grow_right = h <= root.h && root.w + w <= self.limit_w;

        // keep the root near-square
        let should_grow_right = can_grow_right && root.h >= root.w + w;
        let should_grow_down = can_grow_down && root.w >= root.h + h;

        if should_grow_right {
            self.grow_right(w, h)
        } else if should_grow_down {
            self.grow_down(w, h)
        } else if can_grow_right {
            self.grow_right(w, h)
        } else if can_grow_down {
            self.grow_down(w, h)
        } else {
            None
        }
    }

    fn grow_right(&mut self, w: u32, h: u32) -> Option<Rect> {
        let root = self.nodes[self.root].rect;
        let right = self.push(Node::leaf(root.w, 0, w, root.h));
        let new_root = self.push(Node {
            rect: Rect::new(0, 0, root.w + w, root.h),
            used: true,
            right: Some(right),
            down: Some(self.root),
        });
        self.root = new_root;
        let idx = self.find(self.root, w, h)?;
        Some(self.split(idx, w, h))
    }

    fn grow_down(&mut self, w: u32, h: u32) -> Option<Rect> {
        let root = self.nodes[self.root].rect;
        let down = self.push(Node::leaf(0, root.h, root.w, h));
        let new_root = self.push(Node {
            rect: Rect::new(0, 0, root.w, root.h + h),
            used: true,
            right: Some(self.root),
            down: Some(down),
        });
        self.root = new_root;
        let idx = self.find(self.root, w, h)?;
        Some(self.split(idx, w, h))
    }

    fn insert(&mut self, w: u32, h: u32) -> Option<Rect> {
        match self.find(self.root, w, h) {
            Some(idx) => Some(self.split(idx, w, h)),
            None => self.grow(w, h),
        }
    }
}

pub struct GrowingPacker {
    options: PackerOptions,
    sort: GrowingSort,
}

impl GrowingPacker {
    pub fn new(options: PackerOptions) -> Self {
        Self {
            options,
            sort: GrowingSort::MaxSide,
        }
    }

    pub fn with_sort(mut self, sort: GrowingSort) -> Self {
        self.sort = sort;
        self
    }

    fn order(&self, blocks: &[Block]) -> Vec<usize> {
        let mut order = block_order(blocks, self.options.sort_by_max_side);
        // stable sorts: ties keep the previous order
        match self.sort {
            GrowingSort::MaxSide => order.sort_by(|&a, &b| {
                (blocks[b].max_side(), blocks[b].w.min(blocks[b].h))
                    .cmp(&(blocks[a].max_side(), blocks[a].w.min(blocks[a].h)))
            }),
            GrowingSort::Area => order.sort_by(|&a, &b| blocks[b].area().cmp(&blocks[a].area())),
            GrowingSort::Height => order.sort_by(|&a, &b| {
                (blocks[b].h, blocks[b].w).cmp(&(blocks[a].h, blocks[a].w))
            }),
            GrowingSort::Width => order.sort_by(|&a, &b| {
                (blocks[b].w, blocks[b].h).cmp(&(blocks[a].w, blocks[a].h))
            }),
            GrowingSort::None => {}
        }
        order
    }
}

impl Packer for GrowingPacker {
    fn name(&self) -> &'static str {
        "growing"
    }

    fn heuristic_name(&self) -> String {
        self.sort.key().to_string()
    }

    fn heuristics(&self) -> &'static [&'static str] {
        GrowingSort::KEYS
    }

    fn set_heuristic(&mut self, key: &str) -> bool {
        match key.parse() {
            Ok(s) => {
                self.sort = s;
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
        let order = self.order(&blocks);

        let mut tree: Option<Tree> = None;
        for i in order {
            let (w, h) = blocks[i].size(false);
            let tree = tree.get_or_insert_with(|| Tree::new(w, h, bin.w, bin.h));
            let slot = if w <= bin.w && h <= bin.h {
                tree.insert(w, h)
            } else {
                None
            };
            let Some(slot) = slot else {
                record_unplaced(&mut result, &blocks[i], width, height);
                break;
            };
            blocks[i].placement = Some(Placement {
                x: bin.x + slot.x,
                y: bin.y + slot.y,
                rotated: false,
                flipped_y: false,
            });
        }
        Ok(finish(blocks, &self.options, result))
    }
}

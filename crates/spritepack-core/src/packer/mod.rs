use std::collections::HashSet;
use std::sync::Arc;

use crate::config::{Algorithm, PackerOptions};
use crate::error::{Result, SpritePackError};
use crate::model::{FrameInput, PackedFrame, PackerResult, Rect};

pub mod free_list;
pub mod growing;
pub mod guillotine;
pub mod hybrid;
pub mod maxrects;
pub mod ordered;
pub mod shelf;
pub mod skyline;

pub use growing::GrowingPacker;
pub use guillotine::GuillotinePacker;
pub use hybrid::HybridPacker;
pub use maxrects::MaxRectsPacker;
pub use ordered::OrderedPacker;
pub use shelf::ShelfPacker;
pub use skyline::SkylinePacker;

/// A packer places a list of frames into one bin.
///
/// Implementations must ensure no overlaps and respect the configured border/padding.
/// `pack` resets all internal state on entry, so an instance can be reused.
/// It only returns `Err` for a malformed bin; a frame that does not fit ends the
/// attempt with `success = false` and the frames placed so far.
pub trait Packer {
    /// Registry name of the algorithm.
    fn name(&self) -> &'static str;
    /// Key of the active heuristic (empty when the algorithm has none).
    fn heuristic_name(&self) -> String;
    /// Keys accepted by `set_heuristic`.
    fn heuristics(&self) -> &'static [&'static str];
    /// Selects a heuristic. Unknown keys return false and keep the current one.
    fn set_heuristic(&mut self, key: &str) -> bool;
    fn pack(&mut self, frames: &[Arc<FrameInput>], width: u32, height: u32)
    -> Result<PackerResult>;
}

/// Builds a packer for `algorithm` with its default heuristic.
pub fn create_packer(algorithm: Algorithm, options: PackerOptions) -> Box<dyn Packer + Send> {
    match algorithm {
        Algorithm::MaxRects => Box::new(MaxRectsPacker::new(options)),
        Algorithm::Guillotine => Box::new(GuillotinePacker::new(options)),
        Algorithm::Skyline => Box::new(SkylinePacker::new(options)),
        Algorithm::Shelf => Box::new(ShelfPacker::new(options)),
        Algorithm::ShelfFfdh => Box::new(ShelfPacker::ffdh(options)),
        Algorithm::Growing => Box::new(GrowingPacker::new(options)),
        Algorithm::Ordered => Box::new(OrderedPacker::new(options)),
        Algorithm::Hybrid => Box::new(HybridPacker::new(options)),
    }
}

/// Orientation preferences attached to a block by an upstream pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlacementHints {
    pub force_rotate: bool,
    pub force_flip_y: bool,
}

/// Where a block ended up. `x,y` is the top-left of its padded slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub rotated: bool,
    pub flipped_y: bool,
}

/// Per-call working record for one frame.
#[derive(Debug, Clone)]
pub struct Block {
    /// Position in the caller's frame list.
    pub index: usize,
    pub frame: Arc<FrameInput>,
    /// Padded width (frame width + padding).
    pub w: u32,
    /// Padded height (frame height + padding).
    pub h: u32,
    pub hints: Option<PlacementHints>,
    pub placement: Option<Placement>,
}

impl Block {
    pub fn id(&self) -> &str {
        &self.frame.id
    }

    /// Padded size in the given orientation.
    pub fn size(&self, rotated: bool) -> (u32, u32) {
        if rotated { (self.h, self.w) } else { (self.w, self.h) }
    }

    pub fn max_side(&self) -> u32 {
        self.w.max(self.h)
    }

    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
}

/// Usable region of a `width x height` bin after removing the border.
pub(crate) fn usable_area(options: &PackerOptions, width: u32, height: u32) -> Result<Rect> {
    let border = options.border_padding;
    if width == 0 || height == 0 {
        return Err(SpritePackError::InvalidDimensions { width, height });
    }
    let total_border = border.saturating_mul(2);
    if total_border >= width || total_border >= height {
        return Err(SpritePackError::InvalidDimensions { width, height });
    }
    Ok(Rect::new(
        border,
        border,
        width - total_border,
        height - total_border,
    ))
}

/// Builds blocks for all valid frames. Zero-size frames are skipped with a warning;
/// duplicate ids are reported as errors.
pub(crate) fn prepare_blocks(
    frames: &[Arc<FrameInput>],
    padding: u32,
    result: &mut PackerResult,
) -> Vec<Block> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(frames.len());
    let mut blocks = Vec::with_capacity(frames.len());
    for (index, frame) in frames.iter().enumerate() {
        if frame.width == 0 || frame.height == 0 {
            result.warnings.push(format!(
                "skipping frame '{}' with invalid size {}x{}",
                frame.id, frame.width, frame.height
            ));
            continue;
        }
        if !seen.insert(frame.id.as_str()) {
            result
                .errors
                .push(format!("duplicate frame id '{}'", frame.id));
            continue;
        }
        blocks.push(Block {
            index,
            frame: Arc::clone(frame),
            w: frame.width.saturating_add(padding),
            h: frame.height.saturating_add(padding),
            hints: None,
            placement: None,
        });
    }
    blocks
}

/// Visiting order over `blocks`: input order, or max side descending when requested.
pub(crate) fn block_order(blocks: &[Block], sort_by_max_side: bool) -> Vec<usize> {
    let mut order: Vec<usize> = (0..blocks.len()).collect();
    if sort_by_max_side {
        // stable: ties keep input order
        order.sort_by(|&a, &b| blocks[b].max_side().cmp(&blocks[a].max_side()));
    }
    order
}

/// Records a capacity failure for `block`.
pub(crate) fn record_unplaced(result: &mut PackerResult, block: &Block, width: u32, height: u32) {
    result.errors.push(format!(
        "could not place '{}' ({}x{}) in {}x{} bin",
        block.id(),
        block.frame.width,
        block.frame.height,
        width,
        height
    ));
}

/// Converts placed blocks into the final result (input order, tight extents).
pub(crate) fn finish(
    blocks: Vec<Block>,
    options: &PackerOptions,
    mut result: PackerResult,
) -> PackerResult {
    let all_placed = blocks.iter().all(|b| b.placement.is_some());
    let mut placed: Vec<Block> = blocks.into_iter().filter(|b| b.placement.is_some()).collect();
    placed.sort_by_key(|b| b.index);
    result.packed = placed
        .into_iter()
        .filter_map(|b| {
            let p = b.placement?;
            Some(PackedFrame {
                frame: b.frame,
                x: p.x,
                y: p.y,
                rotated: p.rotated,
                flipped_x: false,
                flipped_y: p.flipped_y,
            })
        })
        .collect();
    result.success = all_placed && result.errors.is_empty();
    result.finalize_extents(options.padding, options.border_padding);
    result
}

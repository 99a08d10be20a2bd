use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Inclusive right edge coordinate (`x + w - 1`).
    pub fn right(&self) -> u32 {
        self.x + self.w.saturating_sub(1)
    }
    /// Inclusive bottom edge coordinate (`y + h - 1`).
    pub fn bottom(&self) -> u32 {
        self.y + self.h.saturating_sub(1)
    }
    /// Exclusive right edge (`x + w`).
    pub fn x_end(&self) -> u32 {
        self.x + self.w
    }
    /// Exclusive bottom edge (`y + h`).
    pub fn y_end(&self) -> u32 {
        self.y + self.h
    }
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
    /// Returns true if `r` is fully inside `self`.
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.x_end() <= self.x_end() && r.y_end() <= self.y_end()
    }
    /// Returns true if the interiors of `self` and `other` overlap.
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.x >= other.x_end()
            || other.x >= self.x_end()
            || self.y >= other.y_end()
            || other.y >= self.y_end())
    }
}

/// A sprite to be placed. Owned by the caller and shared with packers read-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameInput {
    /// Unique id within one `pack()` call.
    pub id: String,
    pub width: u32,
    pub height: u32,
    /// Opaque caller data carried through to the placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<serde_json::Value>,
}

impl FrameInput {
    pub fn new(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            user_data: None,
        }
    }

    pub fn with_user_data(mut self, data: serde_json::Value) -> Self {
        self.user_data = Some(data);
        self
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Placement of one frame inside a bin, produced by a packer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackedFrame {
    pub frame: Arc<FrameInput>,
    /// Top-left of the sprite content in the atlas.
    pub x: u32,
    pub y: u32,
    /// True if stored rotated 90° clockwise.
    pub rotated: bool,
    pub flipped_x: bool,
    pub flipped_y: bool,
}

impl PackedFrame {
    pub fn new(frame: Arc<FrameInput>, x: u32, y: u32, rotated: bool) -> Self {
        Self {
            frame,
            x,
            y,
            rotated,
            flipped_x: false,
            flipped_y: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.frame.id
    }

    /// Size as stored in the atlas (post-rotation).
    pub fn placed_size(&self) -> (u32, u32) {
        if self.rotated {
            (self.frame.height, self.frame.width)
        } else {
            (self.frame.width, self.frame.height)
        }
    }

    /// Content rectangle in the atlas.
    pub fn rect(&self) -> Rect {
        let (w, h) = self.placed_size();
        Rect::new(self.x, self.y, w, h)
    }

    /// Reserved slot: content plus trailing padding on the right and bottom.
    pub fn padded_rect(&self, padding: u32) -> Rect {
        let (w, h) = self.placed_size();
        Rect::new(self.x, self.y, w + padding, h + padding)
    }
}

/// Outcome of one `pack()` call.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PackerResult {
    pub success: bool,
    /// Placements in input order.
    pub packed: Vec<PackedFrame>,
    /// Tight extents of the placement including trailing padding and border.
    pub atlas_width: u32,
    pub atlas_height: u32,
    /// Used area / atlas area (0.0 to 1.0).
    pub efficiency: f64,
    pub algorithm_name: String,
    pub heuristic_name: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl PackerResult {
    pub fn new(algorithm_name: impl Into<String>, heuristic_name: impl Into<String>) -> Self {
        Self {
            algorithm_name: algorithm_name.into(),
            heuristic_name: heuristic_name.into(),
            ..Default::default()
        }
    }

    /// Sum of unpadded frame areas.
    pub fn used_area(&self) -> u64 {
        self.packed.iter().map(|p| p.frame.area()).sum()
    }

    pub fn atlas_area(&self) -> u64 {
        self.atlas_width as u64 * self.atlas_height as u64
    }

    pub fn get(&self, id: &str) -> Option<&PackedFrame> {
        self.packed.iter().find(|p| p.id() == id)
    }

    /// Computes tight atlas extents and efficiency from the current placements.
    pub fn finalize_extents(&mut self, padding: u32, border_padding: u32) {
        let mut w = 0u32;
        let mut h = 0u32;
        for p in &self.packed {
            let r = p.padded_rect(padding);
            w = w.max(r.x_end());
            h = h.max(r.y_end());
        }
        if self.packed.is_empty() {
            self.atlas_width = 0;
            self.atlas_height = 0;
            self.efficiency = 0.0;
            return;
        }
        self.atlas_width = w + border_padding;
        self.atlas_height = h + border_padding;
        let area = self.atlas_area();
        self.efficiency = if area > 0 {
            self.used_area() as f64 / area as f64
        } else {
            0.0
        };
    }

    /// Selector score: area dominates, efficiency breaks ties. Lower is better.
    pub fn score(&self) -> f64 {
        self.atlas_area() as f64 - self.efficiency * 0.01
    }

    pub fn stats(&self) -> PackStats {
        let used = self.used_area();
        let total = self.atlas_area();
        PackStats {
            num_frames: self.packed.len(),
            atlas_width: self.atlas_width,
            atlas_height: self.atlas_height,
            total_area: total,
            used_area: used,
            occupancy: if total > 0 {
                used as f64 / total as f64
            } else {
                0.0
            },
            num_rotated: self.packed.iter().filter(|p| p.rotated).count(),
            num_flipped: self
                .packed
                .iter()
                .filter(|p| p.flipped_x || p.flipped_y)
                .count(),
        }
    }
}

/// Result of the size search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SizeResult {
    pub width: u32,
    pub height: u32,
    /// Total frame area / bin area.
    pub occupancy: f64,
    /// Name of the packer that satisfied the search, or `"fallback"`.
    pub algorithm_used: String,
}

impl SizeResult {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_fallback(&self) -> bool {
        self.algorithm_used == crate::FALLBACK_NAME
    }
}

/// Statistics about one packing result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PackStats {
    pub num_frames: usize,
    pub atlas_width: u32,
    pub atlas_height: u32,
    pub total_area: u64,
    pub used_area: u64,
    /// used_area / total_area (0.0 to 1.0). Higher is better.
    pub occupancy: f64,
    pub num_rotated: usize,
    pub num_flipped: usize,
}

impl PackStats {
    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Atlas: {}x{}, Frames: {}, Occupancy: {:.2}%, Total Area: {} px², Used Area: {} px², Rotated: {}, Flipped: {}",
            self.atlas_width,
            self.atlas_height,
            self.num_frames,
            self.occupancy * 100.0,
            self.total_area,
            self.used_area,
            self.num_rotated,
            self.num_flipped,
        )
    }

    /// Returns wasted space in pixels.
    pub fn wasted_area(&self) -> u64 {
        self.total_area.saturating_sub(self.used_area)
    }

    /// Returns wasted space as a percentage (0.0 to 100.0).
    pub fn waste_percentage(&self) -> f64 {
        if self.total_area > 0 {
            (self.wasted_area() as f64 / self.total_area as f64) * 100.0
        } else {
            0.0
        }
    }
}

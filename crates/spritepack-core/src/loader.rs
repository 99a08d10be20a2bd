//! Frame loading: decode, normalize to RGBA8, trim, hash and deduplicate.

use std::collections::HashMap;
use std::path::Path;

use image::{DynamicImage, ImageReader, RgbaImage, imageops};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpritePackError};
use crate::model::{FrameInput, Rect};

/// Decoded (and possibly trimmed) frame, ready for packing.
#[derive(Debug, Clone)]
pub struct LoadedFrame {
    pub id: String,
    /// Pixels after trimming.
    pub rgba: RgbaImage,
    /// Size of the image before trimming.
    pub source_width: u32,
    pub source_height: u32,
    /// Offset of the kept region inside the original image.
    pub trim_x: u32,
    pub trim_y: u32,
    pub trimmed: bool,
    /// BLAKE3 hex digest of the kept pixels.
    pub hash: String,
}

impl LoadedFrame {
    pub fn width(&self) -> u32 {
        self.rgba.width()
    }

    pub fn height(&self) -> u32 {
        self.rgba.height()
    }

    /// Region of the original image that was kept.
    pub fn source_rect(&self) -> Rect {
        Rect::new(self.trim_x, self.trim_y, self.width(), self.height())
    }

    pub fn to_input(&self) -> FrameInput {
        FrameInput::new(self.id.clone(), self.width(), self.height())
    }
}

/// Bounding box of pixels with `alpha > threshold`, or `None` when every pixel is at or below it.
pub fn compute_trim_rect(rgba: &RgbaImage, threshold: u8) -> Option<Rect> {
    let (w, h) = rgba.dimensions();
    let opaque = |x: u32, y: u32| rgba.get_pixel(x, y)[3] > threshold;
    let row_has = |y: u32| (0..w).any(|x| opaque(x, y));

    let top = (0..h).find(|&y| row_has(y))?;
    let bottom = (top..h).rev().find(|&y| row_has(y))?;
    let col_has = |x: u32| (top..=bottom).any(|y| opaque(x, y));
    let left = (0..w).find(|&x| col_has(x))?;
    let right = (left..w).rev().find(|&x| col_has(x))?;
    Some(Rect::new(left, top, right - left + 1, bottom - top + 1))
}

/// BLAKE3 over `width, height, "RGBA8", pixels`, hex encoded.
pub fn content_hash(rgba: &RgbaImage) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&rgba.width().to_le_bytes());
    hasher.update(&rgba.height().to_le_bytes());
    hasher.update(b"RGBA8");
    hasher.update(rgba.as_raw());
    hasher.finalize().to_hex().to_string()
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrameLoader {
    pub trim: bool,
    pub trim_threshold: u8,
}

impl FrameLoader {
    pub fn new(trim: bool, trim_threshold: u8) -> Self {
        Self {
            trim,
            trim_threshold,
        }
    }

    /// Decodes `path` (format guessed from content) and prepares it as frame `id`.
    pub fn load_path(&self, id: impl Into<String>, path: &Path) -> Result<LoadedFrame> {
        let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        self.load_image(id, image)
    }

    pub fn load_image(&self, id: impl Into<String>, image: DynamicImage) -> Result<LoadedFrame> {
        let id = id.into();
        let rgba = image.into_rgba8();
        let (w, h) = rgba.dimensions();
        if w == 0 || h == 0 {
            return Err(SpritePackError::InvalidInput(format!(
                "frame '{id}' has zero size {w}x{h}"
            )));
        }

        let (rgba, keep, trimmed) = if self.trim {
            match compute_trim_rect(&rgba, self.trim_threshold) {
                Some(r) if r.w == w && r.h == h => (rgba, r, false),
                Some(r) => (crop(&rgba, r), r, true),
                None => {
                    let r = Rect::new(0, 0, 1, 1);
                    (crop(&rgba, r), r, true)
                }
            }
        } else {
            (rgba, Rect::new(0, 0, w, h), false)
        };

        Ok(LoadedFrame {
            hash: content_hash(&rgba),
            id,
            rgba,
            source_width: w,
            source_height: h,
            trim_x: keep.x,
            trim_y: keep.y,
            trimmed,
        })
    }
}

fn crop(rgba: &RgbaImage, r: Rect) -> RgbaImage {
    imageops::crop_imm(rgba, r.x, r.y, r.w, r.h).to_image()
}

/// Maps duplicate frames onto the first frame seen with the same content.
#[derive(Debug, Clone, Default)]
pub struct DedupTable {
    canonical_by_hash: HashMap<String, String>,
    /// duplicate id -> canonical id, in insertion order
    duplicates: Vec<(String, String)>,
    canonical_by_id: HashMap<String, String>,
    total: usize,
}

impl DedupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a frame. Returns the canonical id when `id` duplicates an earlier frame.
    pub fn insert(&mut self, id: &str, hash: &str) -> Option<&str> {
        self.total += 1;
        if let Some(canonical) = self.canonical_by_hash.get(hash).cloned() {
            self.canonical_by_id
                .insert(id.to_string(), canonical.clone());
            self.duplicates.push((id.to_string(), canonical));
            return self.duplicates.last().map(|(_, c)| c.as_str());
        }
        self.canonical_by_hash
            .insert(hash.to_string(), id.to_string());
        None
    }

    pub fn canonical_of(&self, id: &str) -> Option<&str> {
        self.canonical_by_id.get(id).map(String::as_str)
    }

    pub fn is_duplicate(&self, id: &str) -> bool {
        self.canonical_of(id).is_some()
    }

    /// `(duplicate, canonical)` pairs in insertion order.
    pub fn duplicates(&self) -> impl Iterator<Item = (&str, &str)> {
        self.duplicates.iter().map(|(d, c)| (d.as_str(), c.as_str()))
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn unique_count(&self) -> usize {
        self.canonical_by_hash.len()
    }

    pub fn duplicate_count(&self) -> usize {
        self.total - self.unique_count()
    }
}

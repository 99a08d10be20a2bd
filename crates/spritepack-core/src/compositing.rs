use std::collections::HashMap;
use std::sync::Arc;

use image::{Rgba, RgbaImage};

use crate::error::{Result, SpritePackError};
use crate::loader::{DedupTable, LoadedFrame};
use crate::model::{FrameInput, PackedFrame};

/// Orientation applied while blitting. Flips happen before the rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transform {
    /// Rotate 90° clockwise.
    pub rotated: bool,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl Transform {
    pub fn of(p: &PackedFrame) -> Self {
        Self {
            rotated: p.rotated,
            flip_x: p.flipped_x,
            flip_y: p.flipped_y,
        }
    }
}

/// Copies `src` into `canvas` with its top-left at (dx, dy), applying `t`.
/// Pixels falling outside the canvas are clipped.
pub fn blit_rgba(src: &RgbaImage, canvas: &mut RgbaImage, dx: u32, dy: u32, t: Transform) {
    let (sw, sh) = src.dimensions();
    let (cw, ch) = canvas.dimensions();
    // rendered size differs when rotated
    let (rw, rh) = if t.rotated { (sh, sw) } else { (sw, sh) };

    for yy in 0..rh {
        let ty = dy + yy;
        if ty >= ch {
            break;
        }
        for xx in 0..rw {
            let tx = dx + xx;
            if tx >= cw {
                break;
            }
            let (mut u, mut v) = if t.rotated { (yy, sh - 1 - xx) } else { (xx, yy) };
            if t.flip_x {
                u = sw - 1 - u;
            }
            if t.flip_y {
                v = sh - 1 - v;
            }
            canvas.put_pixel(tx, ty, *src.get_pixel(u, v));
        }
    }
}

/// Pastes every placement onto a transparent `width x height` canvas.
///
/// `pixels` maps frame ids to their (trimmed) images; a placement without
/// pixels is an error.
pub fn compose_atlas(
    width: u32,
    height: u32,
    placements: &[PackedFrame],
    pixels: &HashMap<&str, &RgbaImage>,
) -> Result<RgbaImage> {
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    for p in placements {
        let src = pixels.get(p.id()).ok_or_else(|| {
            SpritePackError::InvalidInput(format!("no pixels for placed frame '{}'", p.id()))
        })?;
        blit_rgba(src, &mut canvas, p.x, p.y, Transform::of(p));
    }
    Ok(canvas)
}

/// Adds a placement for every duplicate whose canonical frame was placed,
/// sharing the canonical's position and orientation.
pub fn expand_duplicates(packed: &[PackedFrame], dedup: &DedupTable) -> Vec<PackedFrame> {
    let by_id: HashMap<&str, &PackedFrame> = packed.iter().map(|p| (p.id(), p)).collect();
    let mut out = packed.to_vec();
    for (dup, canonical) in dedup.duplicates() {
        let Some(c) = by_id.get(canonical) else {
            continue;
        };
        let frame = FrameInput {
            id: dup.to_string(),
            ..(*c.frame).clone()
        };
        out.push(PackedFrame {
            frame: Arc::new(frame),
            ..(*c).clone()
        });
    }
    out
}

/// Logical canvas of an animation: the largest untrimmed width and height among its frames.
pub fn logical_canvas<'a>(frames: impl IntoIterator<Item = &'a LoadedFrame>) -> (u32, u32) {
    frames.into_iter().fold((0, 0), |(w, h), f| {
        (w.max(f.source_width), h.max(f.source_height))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2x3 image where each pixel encodes its own coordinates.
    fn coords() -> RgbaImage {
        RgbaImage::from_fn(2, 3, |x, y| Rgba([x as u8, y as u8, 0, 255]))
    }

    fn at(img: &RgbaImage, x: u32, y: u32) -> (u8, u8) {
        let p = img.get_pixel(x, y);
        (p[0], p[1])
    }

    #[test]
    fn rotation_is_clockwise() {
        let mut canvas = RgbaImage::new(3, 2);
        let t = Transform {
            rotated: true,
            ..Default::default()
        };
        blit_rgba(&coords(), &mut canvas, 0, 0, t);
        // source bottom-left lands top-left; source top-left lands top-right
        assert_eq!(at(&canvas, 0, 0), (0, 2));
        assert_eq!(at(&canvas, 2, 0), (0, 0));
        assert_eq!(at(&canvas, 2, 1), (1, 0));
    }

    #[test]
    fn flip_y_happens_before_rotation() {
        let mut canvas = RgbaImage::new(3, 2);
        let t = Transform {
            rotated: true,
            flip_y: true,
            ..Default::default()
        };
        blit_rgba(&coords(), &mut canvas, 0, 0, t);
        assert_eq!(at(&canvas, 0, 0), (0, 0));
        assert_eq!(at(&canvas, 2, 0), (0, 2));
    }

    #[test]
    fn blit_clips_to_canvas() {
        let mut canvas = RgbaImage::new(2, 2);
        blit_rgba(&coords(), &mut canvas, 1, 1, Transform::default());
        assert_eq!(at(&canvas, 1, 1), (0, 0));
        assert_eq!(canvas.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn compose_requires_pixels() {
        let p = PackedFrame::new(Arc::new(FrameInput::new("a", 2, 3)), 0, 0, false);
        let img = coords();
        let mut pixels = HashMap::new();
        assert!(compose_atlas(4, 4, std::slice::from_ref(&p), &pixels).is_err());
        pixels.insert("a", &img);
        let atlas = compose_atlas(4, 4, &[p], &pixels).unwrap();
        assert_eq!(at(&atlas, 1, 2), (1, 2));
        assert_eq!(atlas.get_pixel(3, 3)[3], 0);
    }

    #[test]
    fn duplicates_share_canonical_placement() {
        let mut dedup = DedupTable::new();
        dedup.insert("a", "h");
        dedup.insert("b", "h");
        let mut p = PackedFrame::new(Arc::new(FrameInput::new("a", 4, 4)), 7, 9, true);
        p.flipped_y = true;
        let out = expand_duplicates(&[p], &dedup);
        assert_eq!(out.len(), 2);
        let b = &out[1];
        assert_eq!(b.id(), "b");
        assert_eq!((b.x, b.y, b.rotated, b.flipped_y), (7, 9, true, true));
    }
}

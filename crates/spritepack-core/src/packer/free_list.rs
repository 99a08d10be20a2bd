//! Free-rectangle list maintenance shared by MaxRects and Guillotine.

use crate::model::Rect;

/// Splits every free rect intersecting `node` into its maximal residuals
/// (full-height left/right strips, full-width top/bottom strips) and returns
/// the rebuilt list. Zero-area residuals are dropped.
pub fn split_around(free: &[Rect], node: &Rect) -> Vec<Rect> {
    let mut out: Vec<Rect> = Vec::with_capacity(free.len() + 4);
    for fr in free {
        if !fr.intersects(node) {
            out.push(*fr);
            continue;
        }
        // left
        if node.x > fr.x {
            out.push(Rect::new(fr.x, fr.y, node.x - fr.x, fr.h));
        }
        // right
        if node.x_end() < fr.x_end() {
            out.push(Rect::new(
                node.x_end(),
                fr.y,
                fr.x_end() - node.x_end(),
                fr.h,
            ));
        }
        // top
        if node.y > fr.y {
            out.push(Rect::new(fr.x, fr.y, fr.w, node.y - fr.y));
        }
        // bottom
        if node.y_end() < fr.y_end() {
            out.push(Rect::new(
                fr.x,
                node.y_end(),
                fr.w,
                fr.y_end() - node.y_end(),
            ));
        }
    }
    out.retain(|r| !r.is_empty());
    out
}

/// Removes every rect fully contained in another one. Of two identical rects
/// the earlier one is removed.
pub fn prune_contained(free: &mut Vec<Rect>) {
    let mut i = 0;
    while i < free.len() {
        let a = free[i];
        let mut remove_i = false;
        let mut j = i + 1;
        while j < free.len() {
            let b = free[j];
            if b.contains(&a) {
                remove_i = true;
                break;
            }
            if a.contains(&b) {
                free.remove(j);
                continue;
            }
            j += 1;
        }
        if remove_i {
            free.remove(i);
        } else {
            i += 1;
        }
    }
}

/// Coalesces pairs of free rects that share a full edge. Repeats until stable.
/// Returns the number of merges performed.
pub fn merge_adjacent(free: &mut Vec<Rect>) -> usize {
    let mut merges = 0;
    let mut merged = true;
    while merged {
        merged = false;
        'outer: for i in 0..free.len() {
            for j in i + 1..free.len() {
                let a = free[i];
                let b = free[j];
                // horizontal merge (same y, height, contiguous in x)
                if a.y == b.y && a.h == b.h {
                    if a.x_end() == b.x {
                        free[i] = Rect::new(a.x, a.y, a.w + b.w, a.h);
                        free.remove(j);
                        merged = true;
                        merges += 1;
                        break 'outer;
                    } else if b.x_end() == a.x {
                        free[i] = Rect::new(b.x, a.y, a.w + b.w, a.h);
                        free.remove(j);
                        merged = true;
                        merges += 1;
                        break 'outer;
                    }
                }
                // vertical merge (same x, width, contiguous in y)
                if a.x == b.x && a.w == b.w {
                    if a.y_end() == b.y {
                        free[i] = Rect::new(a.x, a.y, a.w, a.h + b.h);
                        free.remove(j);
                        merged = true;
                        merges += 1;
                        break 'outer;
                    } else if b.y_end() == a.y {
                        free[i] = Rect::new(a.x, b.y, a.w, a.h + b.h);
                        free.remove(j);
                        merged = true;
                        merges += 1;
                        break 'outer;
                    }
                }
            }
        }
    }
    merges
}

/// Leftover measures of placing `w x h` into `fr`: (short side, long side, area).
pub(crate) fn leftovers(fr: &Rect, w: u32, h: u32) -> (i64, i64, i64) {
    let leftover_h = (fr.w as i64 - w as i64).abs();
    let leftover_v = (fr.h as i64 - h as i64).abs();
    let area_fit = fr.area() as i64 - w as i64 * h as i64;
    (
        leftover_h.min(leftover_v),
        leftover_h.max(leftover_v),
        area_fit,
    )
}

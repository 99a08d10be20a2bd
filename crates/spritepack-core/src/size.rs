//! Minimal bin search over an opaque "does it pack" predicate.
//!
//! The predicate is usually a closure around one packer (see
//! [`crate::packer::create_packer`]). Results are memoized per `(w, h)` so the
//! attempt budget counts distinct probes only.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::FALLBACK_NAME;
use crate::config::{ExpandStrategy, PackerOptions};
use crate::model::{FrameInput, SizeResult};

/// Parameters of one size search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SizeSearch {
    pub min_size: u32,
    pub max_size: u32,
    /// Per-axis caps; `max_size` applies where unset.
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    pub padding: u32,
    pub border_padding: u32,
    pub power_of_two: bool,
    /// Break equal-area ties toward the squarer bin.
    pub prefer_square: bool,
    pub fixed_width: Option<u32>,
    pub fixed_height: Option<u32>,
    pub expand_strategy: ExpandStrategy,
    /// Upper bound on distinct predicate calls.
    pub max_attempts: Option<usize>,
    pub time_budget_ms: Option<u64>,
    /// Reported in `SizeResult::algorithm_used` on success.
    pub algorithm_name: String,
}

impl Default for SizeSearch {
    fn default() -> Self {
        Self {
            min_size: 1,
            max_size: 4096,
            max_width: None,
            max_height: None,
            padding: 0,
            border_padding: 0,
            power_of_two: false,
            prefer_square: false,
            fixed_width: None,
            fixed_height: None,
            expand_strategy: ExpandStrategy::Disabled,
            max_attempts: None,
            time_budget_ms: None,
            algorithm_name: "maxrects".into(),
        }
    }
}

impl SizeSearch {
    /// Search parameters matching a packer configuration.
    pub fn from_options(options: &PackerOptions, algorithm_name: impl Into<String>) -> Self {
        Self {
            min_size: options.min_width.min(options.min_height).max(1),
            max_size: options.max_width.max(options.max_height),
            max_width: Some(options.max_width),
            max_height: Some(options.max_height),
            padding: options.padding,
            border_padding: options.border_padding,
            power_of_two: options.power_of_two,
            prefer_square: options.force_square,
            expand_strategy: options.expand_strategy,
            algorithm_name: algorithm_name.into(),
            ..Default::default()
        }
    }

    pub fn width_cap(&self) -> u32 {
        self.max_width.unwrap_or(self.max_size)
    }

    pub fn height_cap(&self) -> u32 {
        self.max_height.unwrap_or(self.max_size)
    }

    pub fn with_fixed_width(mut self, w: u32) -> Self {
        self.fixed_width = Some(w);
        self
    }

    pub fn with_fixed_height(mut self, h: u32) -> Self {
        self.fixed_height = Some(h);
        self
    }

    pub fn with_max_attempts(mut self, n: usize) -> Self {
        self.max_attempts = Some(n);
        self
    }

    pub fn with_time_budget_ms(mut self, ms: u64) -> Self {
        self.time_budget_ms = Some(ms);
        self
    }
}

pub(crate) fn next_pow2(v: u32) -> u32 {
    v.max(1).checked_next_power_of_two().unwrap_or(1 << 31)
}

/// Padded-frame aggregates used for the search bounds.
#[derive(Debug, Default, Clone, Copy)]
struct Extents {
    max_w: u32,
    max_h: u32,
    max_short: u32,
    sum_w: u64,
    sum_h: u64,
    sum_long: u64,
    padded_area: u64,
    area: u64,
}

impl Extents {
    fn of(frames: &[Arc<FrameInput>], padding: u32) -> Self {
        let mut e = Extents::default();
        for f in frames.iter().filter(|f| f.width > 0 && f.height > 0) {
            let (w, h) = (f.width + padding, f.height + padding);
            e.max_w = e.max_w.max(w);
            e.max_h = e.max_h.max(h);
            e.max_short = e.max_short.max(w.min(h));
            e.sum_w += w as u64;
            e.sum_h += h as u64;
            e.sum_long += w.max(h) as u64;
            e.padded_area += w as u64 * h as u64;
            e.area += f.area();
        }
        e
    }

    fn is_empty(&self) -> bool {
        self.padded_area == 0
    }
}

/// Memoizing predicate wrapper with an attempt budget and a deadline.
struct Probe<F> {
    try_pack: F,
    cache: HashMap<(u32, u32), bool>,
    attempts: usize,
    max_attempts: Option<usize>,
    deadline: Option<Instant>,
}

impl<F: FnMut(u32, u32) -> bool> Probe<F> {
    fn new(try_pack: F, search: &SizeSearch) -> Self {
        Self {
            try_pack,
            cache: HashMap::new(),
            attempts: 0,
            max_attempts: search.max_attempts,
            deadline: search
                .time_budget_ms
                .map(|ms| Instant::now() + Duration::from_millis(ms)),
        }
    }

    fn exhausted(&self) -> bool {
        self.max_attempts.is_some_and(|m| self.attempts >= m)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// `None` once the budget is spent.
    fn check(&mut self, w: u32, h: u32) -> Option<bool> {
        if let Some(&ok) = self.cache.get(&(w, h)) {
            return Some(ok);
        }
        if self.exhausted() {
            return None;
        }
        self.attempts += 1;
        let ok = (self.try_pack)(w, h);
        self.cache.insert((w, h), ok);
        Some(ok)
    }

    /// Smallest value in `[lo, hi]` passing `pred`, given that `hi` passes.
    /// Stops early with the best known value when the budget runs out.
    fn min_passing(&mut self, lo: u32, hi: u32, mut dims: impl FnMut(u32) -> (u32, u32)) -> u32 {
        let (mut lo, mut best) = (lo.min(hi), hi);
        while lo < best {
            let mid = lo + (best - lo) / 2;
            let (w, h) = dims(mid);
            match self.check(w, h) {
                Some(true) => best = mid,
                Some(false) => lo = mid + 1,
                None => break,
            }
        }
        best
    }
}

fn occupancy(area: u64, w: u32, h: u32) -> f64 {
    let bin = w as u64 * h as u64;
    if bin == 0 { 0.0 } else { area as f64 / bin as f64 }
}

fn success(search: &SizeSearch, e: &Extents, (w, h): (u32, u32)) -> SizeResult {
    debug!(width = w, height = h, "size search settled");
    SizeResult {
        width: w,
        height: h,
        occupancy: occupancy(e.area, w, h),
        algorithm_used: search.algorithm_name.clone(),
    }
}

fn fallback(search: &SizeSearch, e: &Extents, reason: &str) -> SizeResult {
    let w = search.fixed_width.unwrap_or(search.width_cap());
    let h = search.fixed_height.unwrap_or(search.height_cap());
    warn!(width = w, height = h, reason, "size search fell back to maximum bin");
    SizeResult {
        width: w,
        height: h,
        occupancy: occupancy(e.area, w, h),
        algorithm_used: FALLBACK_NAME.to_string(),
    }
}

fn ceil_div(a: u64, b: u64) -> u64 {
    if b == 0 { u64::MAX } else { a.div_ceil(b) }
}

fn clamp_u32(v: u64) -> u32 {
    v.min(u32::MAX as u64) as u32
}

/// Finds the smallest bin for which `try_pack(width, height)` returns true.
///
/// Searches a minimal square first, then shrinks one side at a time in both
/// orders and keeps the smaller area. Power-of-two searches scan the sparse
/// candidate set instead. With one fixed dimension only the other one is
/// searched. When nothing fits, or the budget runs out before any success,
/// the result is the per-axis maximum (or the fixed dimensions) tagged
/// `"fallback"`. When the minimal square exceeds the tighter axis cap, that
/// axis is pinned at its cap and the other one is searched.
#[instrument(skip_all, fields(frames = frames.len(), algorithm = %search.algorithm_name))]
pub fn find_optimal_size<F>(frames: &[Arc<FrameInput>], try_pack: F, search: &SizeSearch) -> SizeResult
where
    F: FnMut(u32, u32) -> bool,
{
    let e = Extents::of(frames, search.padding);
    let b2 = search.border_padding.saturating_mul(2);
    let min_size = search.min_size.max(1);

    if e.is_empty() {
        let w = search.fixed_width.unwrap_or(min_size);
        let h = search.fixed_height.unwrap_or(min_size);
        return success(search, &e, (w, h));
    }

    let mut probe = Probe::new(try_pack, search);

    match (search.fixed_width, search.fixed_height) {
        (Some(w), Some(h)) => match probe.check(w, h) {
            Some(true) => success(search, &e, (w, h)),
            _ => fallback(search, &e, "fixed bin does not fit"),
        },
        (Some(w), None) => {
            let cap = search.height_cap();
            let lo = (e.max_h + b2).max(min_size);
            let hi = clamp_u32(e.sum_h + b2 as u64).min(cap);
            search_one_dim(&mut probe, search, &e, (lo, hi, cap), |v| (w, v))
        }
        (None, Some(h)) => {
            let cap = search.width_cap();
            let lo = (e.max_w + b2).max(min_size);
            let hi = clamp_u32(e.sum_w + b2 as u64).min(cap);
            search_one_dim(&mut probe, search, &e, (lo, hi, cap), |v| (v, h))
        }
        (None, None) if search.power_of_two => search_pow2(&mut probe, search, &e, b2, min_size),
        (None, None) => search_two_dim(&mut probe, search, &e, b2, min_size),
    }
}

fn search_one_dim<F: FnMut(u32, u32) -> bool>(
    probe: &mut Probe<F>,
    search: &SizeSearch,
    e: &Extents,
    (lo, hi, cap): (u32, u32, u32),
    dims: impl Fn(u32) -> (u32, u32),
) -> SizeResult {
    if lo > cap {
        return fallback(search, e, "largest frame exceeds maximum size");
    }
    let hi = hi.max(lo);
    if search.power_of_two {
        let mut v = next_pow2(lo);
        while v <= cap {
            match probe.check(dims(v).0, dims(v).1) {
                Some(true) => return success(search, e, dims(v)),
                Some(false) => {}
                None => return fallback(search, e, "budget exhausted"),
            }
            v = match v.checked_mul(2) {
                Some(n) => n,
                None => break,
            };
        }
        return fallback(search, e, "no power-of-two size fits");
    }
    match probe.check(dims(hi).0, dims(hi).1) {
        Some(true) => {}
        Some(false) => return fallback(search, e, "frames do not fit within maximum size"),
        None => return fallback(search, e, "budget exhausted"),
    }
    let best = probe.min_passing(lo, hi, &dims);
    success(search, e, dims(best))
}

fn search_pow2<F: FnMut(u32, u32) -> bool>(
    probe: &mut Probe<F>,
    search: &SizeSearch,
    e: &Extents,
    b2: u32,
    min_size: u32,
) -> SizeResult {
    let sides = |cap: u32| {
        let mut out = Vec::new();
        let mut v = next_pow2(min_size);
        while v <= cap {
            out.push(v);
            v = match v.checked_mul(2) {
                Some(n) => n,
                None => break,
            };
        }
        out
    };
    let (widths, heights) = (sides(search.width_cap()), sides(search.height_cap()));
    let min_short = e.max_short + b2;
    let mut candidates: Vec<(u32, u32)> = widths
        .iter()
        .flat_map(|&w| heights.iter().map(move |&h| (w, h)))
        .filter(|&(w, h)| {
            w.min(h) >= min_short
                && (w as u64).saturating_sub(b2 as u64) * (h as u64).saturating_sub(b2 as u64)
                    >= e.padded_area
        })
        .collect();
    candidates.sort_by_key(|&(w, h)| {
        let area = w as u64 * h as u64;
        let skew = if search.prefer_square { w.max(h) / w.min(h) } else { 0 };
        (area, skew, w.max(h), w < h)
    });
    for (w, h) in candidates {
        match probe.check(w, h) {
            Some(true) => return success(search, e, (w, h)),
            Some(false) => {}
            None => return fallback(search, e, "budget exhausted"),
        }
    }
    fallback(search, e, "no power-of-two size fits")
}

fn search_two_dim<F: FnMut(u32, u32) -> bool>(
    probe: &mut Probe<F>,
    search: &SizeSearch,
    e: &Extents,
    b2: u32,
    min_size: u32,
) -> SizeResult {
    let cap = search.width_cap().min(search.height_cap());
    let area_side = clamp_u32((e.padded_area as f64).sqrt().ceil() as u64) + b2;
    let lower = (e.max_w.max(e.max_h) + b2).max(area_side).max(min_size);
    let mut upper = clamp_u32(e.sum_long + b2 as u64).min(cap);
    if lower > cap {
        return search_pinned(probe, search, e, b2, min_size);
    }
    upper = upper.max(lower);

    if search.expand_strategy != ExpandStrategy::Disabled {
        match expand_probe(probe, search.expand_strategy, lower, upper) {
            Some(Some(side)) => upper = upper.min(side),
            Some(None) => return search_pinned(probe, search, e, b2, min_size),
            None => return fallback(search, e, "budget exhausted"),
        }
    }

    match probe.check(upper, upper) {
        Some(true) => {}
        Some(false) => return search_pinned(probe, search, e, b2, min_size),
        None => return fallback(search, e, "budget exhausted"),
    }
    let side = probe.min_passing(lower, upper, |s| (s, s));
    debug!(side, "minimal square");

    // Shrink one side at a time, in both orders.
    let lower_w = |h: u32| {
        let inner = (h.saturating_sub(b2)) as u64;
        (e.max_short + b2)
            .max(clamp_u32(ceil_div(e.padded_area, inner)).saturating_add(b2))
            .max(min_size)
    };
    let width_first = {
        let w = probe.min_passing(lower_w(side), side, |v| (v, side));
        let h = probe.min_passing(lower_w(w), side, |v| (w, v));
        (w, h)
    };
    let height_first = {
        let h = probe.min_passing(lower_w(side), side, |v| (side, v));
        let w = probe.min_passing(lower_w(h), side, |v| (v, h));
        (w, h)
    };

    let area = |(w, h): (u32, u32)| w as u64 * h as u64;
    let squareness = |(w, h): (u32, u32)| w.abs_diff(h);
    let best = match area(width_first).cmp(&area(height_first)) {
        std::cmp::Ordering::Less => width_first,
        std::cmp::Ordering::Greater => height_first,
        std::cmp::Ordering::Equal => {
            if search.prefer_square && squareness(height_first) < squareness(width_first) {
                height_first
            } else {
                width_first
            }
        }
    };
    success(search, e, best)
}

/// Non-square search under unequal caps: the tighter axis starts at its cap,
/// the other axis is minimised, then the pinned axis is shrunk back.
fn search_pinned<F: FnMut(u32, u32) -> bool>(
    probe: &mut Probe<F>,
    search: &SizeSearch,
    e: &Extents,
    b2: u32,
    min_size: u32,
) -> SizeResult {
    let (cap_w, cap_h) = (search.width_cap(), search.height_cap());
    if cap_w == cap_h {
        return fallback(search, e, "frames do not fit within maximum size");
    }
    let pin_height = cap_h < cap_w;
    let (pinned, free_cap) = if pin_height { (cap_h, cap_w) } else { (cap_w, cap_h) };
    let orient = move |free: u32, fixed: u32| if pin_height { (free, fixed) } else { (fixed, free) };
    let lower_for = |other: u32| {
        let inner = other.saturating_sub(b2) as u64;
        (e.max_short + b2)
            .max(clamp_u32(ceil_div(e.padded_area, inner)).saturating_add(b2))
            .max(min_size)
    };

    let lo = lower_for(pinned);
    if lo > free_cap {
        return fallback(search, e, "frames exceed maximum size");
    }
    let mut hi = clamp_u32(e.sum_long + b2 as u64).max(lo).min(free_cap);
    loop {
        let (w, h) = orient(hi, pinned);
        match probe.check(w, h) {
            Some(true) => break,
            Some(false) if hi < free_cap => hi = free_cap,
            Some(false) => return fallback(search, e, "frames do not fit within maximum size"),
            None => return fallback(search, e, "budget exhausted"),
        }
    }
    let free = probe.min_passing(lo, hi, |v| orient(v, pinned));
    let shrunk = probe.min_passing(lower_for(free).min(pinned), pinned, |v| orient(free, v));
    debug!(free, pinned = shrunk, "pinned-axis search");
    success(search, e, orient(free, shrunk))
}

/// Grows a candidate from `lower` until the predicate succeeds.
/// Returns `Some(Some(side))` for the square side that covers the first success,
/// `Some(None)` when even the cap fails, `None` when the budget ran out.
fn expand_probe<F: FnMut(u32, u32) -> bool>(
    probe: &mut Probe<F>,
    strategy: ExpandStrategy,
    lower: u32,
    cap: u32,
) -> Option<Option<u32>> {
    let grow = |v: u32| v.saturating_mul(2).min(cap);
    let (mut w, mut h) = (lower, lower);
    loop {
        if probe.check(w, h)? {
            return Some(Some(w.max(h)));
        }
        if w >= cap && h >= cap {
            return Some(None);
        }
        let grow_width = match strategy {
            ExpandStrategy::WidthFirst => w < cap,
            ExpandStrategy::HeightFirst => h >= cap,
            ExpandStrategy::ShortSide => (w <= h && w < cap) || h >= cap,
            ExpandStrategy::LongSide => (w >= h && w < cap) || h >= cap,
            ExpandStrategy::Both | ExpandStrategy::Disabled => {
                w = grow(w);
                h = grow(h);
                continue;
            }
        };
        if grow_width {
            w = grow(w);
        } else {
            h = grow(h);
        }
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

    /// Predicate that accepts any bin at least `min_w x min_h` with area >= `min_area`.
    fn threshold(min_w: u32, min_h: u32, min_area: u64) -> impl FnMut(u32, u32) -> bool {
        move |w, h| w >= min_w && h >= min_h && w as u64 * h as u64 >= min_area
    }

    #[test]
    fn next_pow2_rounds_up() {
        assert_eq!(next_pow2(0), 1);
        assert_eq!(next_pow2(1), 1);
        assert_eq!(next_pow2(33), 64);
        assert_eq!(next_pow2(64), 64);
    }

    #[test]
    fn square_then_refine() {
        let f = frames(&[(30, 10), (30, 10)]);
        let s = SizeSearch::default();
        let r = find_optimal_size(&f, threshold(30, 20, 600), &s);
        assert_eq!(r.area(), 600);
        assert!(!r.is_fallback());
    }

    #[test]
    fn pow2_results_are_powers_of_two() {
        let f = frames(&[(30, 30), (30, 30)]);
        let s = SizeSearch {
            power_of_two: true,
            ..Default::default()
        };
        let r = find_optimal_size(&f, threshold(32, 32, 1800), &s);
        assert!(r.width.is_power_of_two() && r.height.is_power_of_two());
        assert_eq!((r.width, r.height), (64, 32));
    }

    #[test]
    fn fixed_width_searches_height_only() {
        let f = frames(&[(10, 10); 8]);
        let s = SizeSearch::default().with_fixed_width(20);
        let r = find_optimal_size(&f, |w, h| w == 20 && h >= 40, &s);
        assert_eq!((r.width, r.height), (20, 40));
    }

    #[test]
    fn nothing_fits_falls_back_to_max() {
        let f = frames(&[(10, 10)]);
        let s = SizeSearch {
            max_size: 256,
            ..Default::default()
        };
        let r = find_optimal_size(&f, |_, _| false, &s);
        assert!(r.is_fallback());
        assert_eq!((r.width, r.height), (256, 256));
        assert!(r.occupancy > 0.0);
    }

    #[test]
    fn fallback_uses_each_axis_cap() {
        let f = frames(&[(10, 10)]);
        let s = SizeSearch {
            max_width: Some(256),
            max_height: Some(128),
            ..Default::default()
        };
        let r = find_optimal_size(&f, |_, _| false, &s);
        assert!(r.is_fallback());
        assert_eq!((r.width, r.height), (256, 128));
    }

    #[test]
    fn short_height_cap_pins_height() {
        // 10 frames of 60x60 need one 600-wide row under a 64 height cap
        let f = frames(&[(60, 60); 10]);
        let s = SizeSearch {
            max_width: Some(1024),
            max_height: Some(64),
            ..Default::default()
        };
        let r = find_optimal_size(&f, |w, h| h >= 60 && (w / 60) * (h / 60) >= 10, &s);
        assert!(!r.is_fallback());
        assert_eq!((r.width, r.height), (600, 60));
    }

    #[test]
    fn short_width_cap_pins_width() {
        let f = frames(&[(60, 60); 10]);
        let s = SizeSearch {
            max_width: Some(64),
            max_height: Some(1024),
            ..Default::default()
        };
        let r = find_optimal_size(&f, |w, h| w >= 60 && (w / 60) * (h / 60) >= 10, &s);
        assert_eq!((r.width, r.height), (60, 600));
    }

    #[test]
    fn pow2_candidates_respect_axis_caps() {
        let f = frames(&[(60, 60); 10]);
        let s = SizeSearch {
            power_of_two: true,
            max_width: Some(1024),
            max_height: Some(64),
            ..Default::default()
        };
        let r = find_optimal_size(&f, |w, h| (w / 60) * (h / 60) >= 10, &s);
        assert_eq!((r.width, r.height), (1024, 64));
    }

    #[test]
    fn attempt_budget_is_respected() {
        let f = frames(&[(10, 10); 16]);
        let mut calls = 0;
        let s = SizeSearch::default().with_max_attempts(3);
        let r = find_optimal_size(
            &f,
            |w, h| {
                calls += 1;
                w * h >= 1600
            },
            &s,
        );
        assert!(calls <= 3);
        assert!(r.width * r.height >= 1600 || r.is_fallback());
    }

    #[test]
    fn expand_probe_tightens_bounds() {
        let f = frames(&[(10, 10); 4]);
        let s = SizeSearch {
            expand_strategy: ExpandStrategy::Both,
            ..Default::default()
        };
        let r = find_optimal_size(&f, threshold(20, 20, 400), &s);
        assert_eq!((r.width, r.height), (20, 20));
    }
}

//! "auto" mode: try several algorithm/heuristic pairings on one bin and keep the best.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::FALLBACK_NAME;
use crate::config::{Algorithm, MaxRectsHeuristic, PackerOptions};
use crate::model::{FrameInput, PackerResult};
use crate::packer::{MaxRectsPacker, Packer, create_packer};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SelectorOptions {
    /// Algorithms to try, in tie-break order.
    pub algorithms: Vec<Algorithm>,
    /// Sweep every heuristic of each algorithm instead of only its default.
    pub all_heuristics: bool,
    /// Stop launching candidates after this many milliseconds (sequential mode).
    pub time_budget_ms: Option<u64>,
    /// Evaluate candidates with rayon when the `parallel` feature is enabled.
    pub parallel: bool,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self {
            algorithms: Algorithm::ALL.to_vec(),
            all_heuristics: false,
            time_budget_ms: None,
            parallel: false,
        }
    }
}

/// One (algorithm, heuristic) pairing. `None` keeps the algorithm's default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub algorithm: Algorithm,
    pub heuristic: Option<&'static str>,
}

/// Expands the selector options into the ordered candidate list.
pub fn candidates(options: &PackerOptions, sel: &SelectorOptions) -> Vec<Candidate> {
    let mut out = Vec::new();
    for &algorithm in &sel.algorithms {
        let keys = if sel.all_heuristics {
            create_packer(algorithm, options.clone()).heuristics()
        } else {
            &[]
        };
        if keys.is_empty() {
            out.push(Candidate {
                algorithm,
                heuristic: None,
            });
        } else {
            out.extend(keys.iter().map(|&k| Candidate {
                algorithm,
                heuristic: Some(k),
            }));
        }
    }
    out
}

fn run_candidate(
    cand: Candidate,
    frames: &[Arc<FrameInput>],
    width: u32,
    height: u32,
    options: &PackerOptions,
) -> Option<PackerResult> {
    let mut packer = create_packer(cand.algorithm, options.clone());
    if let Some(key) = cand.heuristic {
        if !packer.set_heuristic(key) {
            return None;
        }
    }
    match packer.pack(frames, width, height) {
        Ok(res) if res.success => {
            debug!(
                algorithm = %res.algorithm_name,
                heuristic = %res.heuristic_name,
                w = res.atlas_width,
                h = res.atlas_height,
                efficiency = res.efficiency,
                "candidate succeeded"
            );
            Some(res)
        }
        Ok(res) => {
            debug!(algorithm = %res.algorithm_name, heuristic = %res.heuristic_name, "candidate failed");
            None
        }
        Err(e) => {
            debug!(algorithm = %cand.algorithm, error = %e, "candidate rejected bin");
            None
        }
    }
}

/// Keeps the lowest score; the earlier candidate wins ties.
fn pick_best(results: impl IntoIterator<Item = PackerResult>) -> Option<PackerResult> {
    results.into_iter().fold(None, |best, r| match best {
        Some(b) if b.score() <= r.score() => Some(b),
        _ => Some(r),
    })
}

/// Packs `frames` into a `width x height` bin with every candidate and returns
/// the successful result with the smallest `area - efficiency * 0.01`.
///
/// When no candidate succeeds, MaxRects with BSSF is run at the configured
/// maximum size and the result is labelled `"fallback"`.
#[instrument(skip_all, fields(frames = frames.len(), width, height))]
pub fn select_best(
    frames: &[Arc<FrameInput>],
    width: u32,
    height: u32,
    options: &PackerOptions,
    sel: &SelectorOptions,
) -> PackerResult {
    let cands = candidates(options, sel);

    #[cfg(feature = "parallel")]
    {
        if sel.parallel {
            let results: Vec<Option<PackerResult>> = cands
                .par_iter()
                .map(|&c| run_candidate(c, frames, width, height, options))
                .collect();
            if let Some(best) = pick_best(results.into_iter().flatten()) {
                return best;
            }
            return fallback(frames, options);
        }
    }

    let start = Instant::now();
    let budget_ms = sel.time_budget_ms.unwrap_or(0);
    let mut best: Option<PackerResult> = None;
    for cand in cands {
        if budget_ms > 0 && start.elapsed().as_millis() as u64 > budget_ms {
            debug!("selector time budget exhausted");
            break;
        }
        if let Some(r) = run_candidate(cand, frames, width, height, options) {
            best = pick_best(best.into_iter().chain(Some(r)));
        }
    }
    match best {
        Some(b) => b,
        None => fallback(frames, options),
    }
}

fn fallback(frames: &[Arc<FrameInput>], options: &PackerOptions) -> PackerResult {
    let (w, h) = (options.max_width, options.max_height);
    warn!(width = w, height = h, "no candidate succeeded; using fallback packer");
    let mut packer =
        MaxRectsPacker::with_heuristic(options.clone(), MaxRectsHeuristic::BestShortSideFit);
    let mut res = match packer.pack(frames, w, h) {
        Ok(r) => r,
        Err(e) => {
            let mut r = PackerResult::new(FALLBACK_NAME, "bssf");
            r.errors.push(e.to_string());
            r
        }
    };
    res.algorithm_name = FALLBACK_NAME.to_string();
    res.warnings
        .push("no algorithm succeeded; fell back to maxrects/bssf at maximum size".into());
    res
}

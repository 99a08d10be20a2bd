//! Core library for building sprite atlases.
//!
//! - Packers: MaxRects (BSSF/BLSF/BAF/BL/CP), Guillotine (choice + split), Skyline (BL/MinWaste/BestFit),
//!   Shelf and Shelf-FFDH, Growing, Ordered, and Hybrid (MaxRects with orientation hints)
//! - Size search: `find_optimal_size` finds the smallest bin a packer accepts
//! - Selector: `select_best` tries algorithm/heuristic pairings on one bin ("auto")
//! - Generator: `generate` loads, trims, deduplicates, packs, composites and writes image + metadata
//!
//! Quick example:
//! ```ignore
//! use std::collections::BTreeMap;
//! use std::path::{Path, PathBuf};
//! use spritepack_core::{GeneratorOptions, generate};
//!
//! let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
//! groups.insert("run".into(), vec!["run_0.png".into(), "run_1.png".into()]);
//! let res = generate(&groups, Path::new("out/hero"), &GeneratorOptions::default());
//! assert!(res.success, "{:?}", res.errors);
//! ```

pub mod compositing;
pub mod config;
pub mod error;
pub mod export;
pub mod generator;
pub mod loader;
pub mod model;
pub mod packer;
pub mod selector;
pub mod size;

pub use config::*;
pub use error::*;
pub use export::*;
pub use generator::*;
pub use loader::*;
pub use model::*;
pub use packer::{Packer, create_packer};
pub use selector::*;
pub use size::{SizeSearch, find_optimal_size};

/// `algorithm_used` / `algorithm_name` reported when a search or selection gave up.
pub const FALLBACK_NAME: &str = "fallback";

/// Convenience prelude for common types and functions.
/// Importing `spritepack_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::config::{
        Algorithm, AlgorithmChoice, ExpandStrategy, GeneratorOptions, GuillotineChoice,
        GuillotineSplit, HeuristicChoice, ImageFormat, MaxRectsHeuristic, PackerOptions,
        PackerOptionsBuilder, ShelfHeuristic, SkylineHeuristic,
    };
    pub use crate::model::{FrameInput, PackStats, PackedFrame, PackerResult, Rect, SizeResult};
    pub use crate::packer::{
        GrowingPacker, GuillotinePacker, HybridPacker, MaxRectsPacker, OrderedPacker, Packer,
        ShelfPacker, SkylinePacker, create_packer,
    };
    pub use crate::selector::{SelectorOptions, select_best};
    pub use crate::size::{SizeSearch, find_optimal_size};
    pub use crate::{AnimationInput, GeneratorResult, generate, generate_from_images, layout_frames};
}

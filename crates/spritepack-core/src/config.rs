use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Packing algorithms known to the registry.
/// Key notes:
///   - `ShelfFfdh` pre-sorts by height and is the cheapest good baseline
///   - `Hybrid` layers rotation/flip hints over MaxRects
///   - `Growing` and `Ordered` are simple packers for estimation and order-preserving layouts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Free-rectangle list with overlapping free regions (high quality).
    MaxRects,
    /// Disjoint free rectangles split by single straight cuts.
    Guillotine,
    /// Top contour of placed rectangles.
    Skyline,
    /// Fixed-height rows in input order.
    Shelf,
    /// Shelf with first-fit decreasing height pre-sort.
    ShelfFfdh,
    /// Binary-tree packer that grows its root right or down.
    Growing,
    /// Row layout preserving input order strictly.
    Ordered,
    /// MaxRects with adaptive rotation/flip tagging.
    Hybrid,
}

impl Algorithm {
    /// Registry order; also the selector's iteration and tie-break order.
    pub const ALL: [Algorithm; 8] = [
        Algorithm::MaxRects,
        Algorithm::Guillotine,
        Algorithm::Skyline,
        Algorithm::Shelf,
        Algorithm::ShelfFfdh,
        Algorithm::Growing,
        Algorithm::Ordered,
        Algorithm::Hybrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::MaxRects => "maxrects",
            Algorithm::Guillotine => "guillotine",
            Algorithm::Skyline => "skyline",
            Algorithm::Shelf => "shelf",
            Algorithm::ShelfFfdh => "shelf-ffdh",
            Algorithm::Growing => "growing",
            Algorithm::Ordered => "ordered",
            Algorithm::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "maxrects" | "max-rects" => Ok(Self::MaxRects),
            "guillotine" => Ok(Self::Guillotine),
            "skyline" => Ok(Self::Skyline),
            "shelf" => Ok(Self::Shelf),
            "shelf-ffdh" | "ffdh" => Ok(Self::ShelfFfdh),
            "growing" => Ok(Self::Growing),
            "ordered" => Ok(Self::Ordered),
            "hybrid" | "adaptive" => Ok(Self::Hybrid),
            _ => Err(()),
        }
    }
}

/// Either a concrete algorithm or the "try everything" selector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub enum AlgorithmChoice {
    Fixed(Algorithm),
    Auto,
}

impl FromStr for AlgorithmChoice {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        s.parse().map(Self::Fixed)
    }
}

impl TryFrom<String> for AlgorithmChoice {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse().map_err(|_| format!("unknown algorithm: {}", s))
    }
}

impl From<AlgorithmChoice> for String {
    fn from(c: AlgorithmChoice) -> Self {
        match c {
            AlgorithmChoice::Auto => "auto".into(),
            AlgorithmChoice::Fixed(a) => a.as_str().into(),
        }
    }
}

/// Heuristic selection for the chosen algorithm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum HeuristicChoice {
    /// The algorithm's own default.
    #[default]
    Default,
    /// Try every heuristic of the algorithm(s) and keep the best.
    Auto,
    /// A specific key, validated by `Packer::set_heuristic`.
    Key(String),
}

impl From<Option<String>> for HeuristicChoice {
    fn from(v: Option<String>) -> Self {
        match v {
            None => Self::Default,
            Some(s) if s.is_empty() || s.eq_ignore_ascii_case("default") => Self::Default,
            Some(s) if s.eq_ignore_ascii_case("auto") => Self::Auto,
            Some(s) => Self::Key(s),
        }
    }
}

impl From<HeuristicChoice> for Option<String> {
    fn from(c: HeuristicChoice) -> Self {
        match c {
            HeuristicChoice::Default => None,
            HeuristicChoice::Auto => Some("auto".into()),
            HeuristicChoice::Key(k) => Some(k),
        }
    }
}

impl FromStr for HeuristicChoice {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Some(s.to_string()).into())
    }
}

/// MaxRects placement heuristics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MaxRectsHeuristic {
    BestShortSideFit,
    BestLongSideFit,
    BestAreaFit,
    BottomLeft,
    ContactPoint,
}

impl MaxRectsHeuristic {
    pub const KEYS: &'static [&'static str] = &["bssf", "blsf", "baf", "bl", "cp"];

    pub fn key(&self) -> &'static str {
        match self {
            Self::BestShortSideFit => "bssf",
            Self::BestLongSideFit => "blsf",
            Self::BestAreaFit => "baf",
            Self::BottomLeft => "bl",
            Self::ContactPoint => "cp",
        }
    }
}

impl FromStr for MaxRectsHeuristic {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bssf" | "bestshortsidefit" => Ok(Self::BestShortSideFit),
            "blsf" | "bestlongsidefit" => Ok(Self::BestLongSideFit),
            "baf" | "bestareafit" => Ok(Self::BestAreaFit),
            "bl" | "bottomleft" => Ok(Self::BottomLeft),
            "cp" | "contactpoint" => Ok(Self::ContactPoint),
            _ => Err(()),
        }
    }
}

/// Guillotine free-rect choice heuristics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GuillotineChoice {
    BestAreaFit,
    BestShortSideFit,
    BestLongSideFit,
    WorstAreaFit,
    WorstShortSideFit,
    WorstLongSideFit,
}

impl GuillotineChoice {
    pub const KEYS: &'static [&'static str] = &["baf", "bssf", "blsf", "waf", "wssf", "wlsf"];

    pub fn key(&self) -> &'static str {
        match self {
            Self::BestAreaFit => "baf",
            Self::BestShortSideFit => "bssf",
            Self::BestLongSideFit => "blsf",
            Self::WorstAreaFit => "waf",
            Self::WorstShortSideFit => "wssf",
            Self::WorstLongSideFit => "wlsf",
        }
    }
}

impl FromStr for GuillotineChoice {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "baf" | "bestareafit" => Ok(Self::BestAreaFit),
            "bssf" | "bestshortsidefit" => Ok(Self::BestShortSideFit),
            "blsf" | "bestlongsidefit" => Ok(Self::BestLongSideFit),
            "waf" | "worstareafit" => Ok(Self::WorstAreaFit),
            "wssf" | "worstshortsidefit" => Ok(Self::WorstShortSideFit),
            "wlsf" | "worstlongsidefit" => Ok(Self::WorstLongSideFit),
            _ => Err(()),
        }
    }
}

/// Guillotine split axis heuristics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GuillotineSplit {
    SplitShorterLeftoverAxis,
    SplitLongerLeftoverAxis,
    SplitMinimizeArea,
    SplitMaximizeArea,
    SplitShorterAxis,
    SplitLongerAxis,
}

impl GuillotineSplit {
    pub const KEYS: &'static [&'static str] = &["slas", "llas", "minas", "maxas", "sas", "las"];

    pub fn key(&self) -> &'static str {
        match self {
            Self::SplitShorterLeftoverAxis => "slas",
            Self::SplitLongerLeftoverAxis => "llas",
            Self::SplitMinimizeArea => "minas",
            Self::SplitMaximizeArea => "maxas",
            Self::SplitShorterAxis => "sas",
            Self::SplitLongerAxis => "las",
        }
    }
}

impl FromStr for GuillotineSplit {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "slas" | "splitshorterleftoveraxis" => Ok(Self::SplitShorterLeftoverAxis),
            "llas" | "splitlongerleftoveraxis" => Ok(Self::SplitLongerLeftoverAxis),
            "minas" | "splitminimizearea" => Ok(Self::SplitMinimizeArea),
            "maxas" | "splitmaximizearea" => Ok(Self::SplitMaximizeArea),
            "sas" | "splitshorteraxis" => Ok(Self::SplitShorterAxis),
            "las" | "splitlongeraxis" => Ok(Self::SplitLongerAxis),
            _ => Err(()),
        }
    }
}

/// Skyline placement heuristics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SkylineHeuristic {
    BottomLeft,
    MinWaste,
    BestFit,
}

impl SkylineHeuristic {
    pub const KEYS: &'static [&'static str] = &["bl", "minwaste", "bestfit"];

    pub fn key(&self) -> &'static str {
        match self {
            Self::BottomLeft => "bl",
            Self::MinWaste => "minwaste",
            Self::BestFit => "bestfit",
        }
    }
}

impl FromStr for SkylineHeuristic {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bl" | "bottomleft" | "bottom_left" => Ok(Self::BottomLeft),
            "minwaste" | "mw" | "min_waste" => Ok(Self::MinWaste),
            "bestfit" | "bf" | "best_fit" => Ok(Self::BestFit),
            _ => Err(()),
        }
    }
}

/// Shelf selection heuristics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShelfHeuristic {
    NextFit,
    FirstFit,
    BestWidthFit,
    BestHeightFit,
    WorstWidthFit,
}

impl ShelfHeuristic {
    pub const KEYS: &'static [&'static str] = &["nf", "ff", "bwf", "bhf", "wwf"];

    pub fn key(&self) -> &'static str {
        match self {
            Self::NextFit => "nf",
            Self::FirstFit => "ff",
            Self::BestWidthFit => "bwf",
            Self::BestHeightFit => "bhf",
            Self::WorstWidthFit => "wwf",
        }
    }
}

impl FromStr for ShelfHeuristic {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nf" | "next_fit" | "nextfit" => Ok(Self::NextFit),
            "ff" | "first_fit" | "firstfit" => Ok(Self::FirstFit),
            "bwf" | "best_width_fit" | "bestwidthfit" => Ok(Self::BestWidthFit),
            "bhf" | "best_height_fit" | "bestheightfit" => Ok(Self::BestHeightFit),
            "wwf" | "worst_width_fit" | "worstwidthfit" => Ok(Self::WorstWidthFit),
            _ => Err(()),
        }
    }
}

/// Pre-sort keys for the growing packer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GrowingSort {
    MaxSide,
    Area,
    Height,
    Width,
    None,
}

impl GrowingSort {
    pub const KEYS: &'static [&'static str] = &["maxside", "area", "height", "width", "none"];

    pub fn key(&self) -> &'static str {
        match self {
            Self::MaxSide => "maxside",
            Self::Area => "area",
            Self::Height => "height",
            Self::Width => "width",
            Self::None => "none",
        }
    }
}

impl FromStr for GrowingSort {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "maxside" | "max_side" => Ok(Self::MaxSide),
            "area" => Ok(Self::Area),
            "height" => Ok(Self::Height),
            "width" => Ok(Self::Width),
            "none" => Ok(Self::None),
            _ => Err(()),
        }
    }
}

/// How a size probe grows a candidate bin before the binary search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExpandStrategy {
    /// No probing; the binary search starts from the full bounds.
    #[default]
    Disabled,
    WidthFirst,
    HeightFirst,
    ShortSide,
    LongSide,
    Both,
}

impl FromStr for ExpandStrategy {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "disabled" | "none" | "off" => Ok(Self::Disabled),
            "width_first" => Ok(Self::WidthFirst),
            "height_first" => Ok(Self::HeightFirst),
            "short_side" => Ok(Self::ShortSide),
            "long_side" => Ok(Self::LongSide),
            "both" => Ok(Self::Both),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PackerOptions {
    /// Pixels reserved to the right and below every frame.
    pub padding: u32,
    /// Pixels around the entire bin border.
    pub border_padding: u32,
    /// Maximum bin width in pixels.
    pub max_width: u32,
    /// Maximum bin height in pixels.
    pub max_height: u32,
    /// Smallest bin width the size search will try.
    pub min_width: u32,
    /// Smallest bin height the size search will try.
    pub min_height: u32,
    /// Restrict bins (and final atlas sizes) to powers of two.
    pub power_of_two: bool,
    /// Force final atlas to be square (max(width,height)).
    pub force_square: bool,
    /// Allow 90° rotations for placements where beneficial.
    pub allow_rotation: bool,
    /// Allow flip hints to be emitted as `flipped_y` placements.
    pub allow_flip: bool,
    pub expand_strategy: ExpandStrategy,
    /// Pre-sort frames by their longer side (descending) before packing.
    pub sort_by_max_side: bool,
}

impl Default for PackerOptions {
    fn default() -> Self {
        Self {
            padding: 2,
            border_padding: 0,
            max_width: 4096,
            max_height: 4096,
            min_width: 1,
            min_height: 1,
            power_of_two: false,
            force_square: false,
            allow_rotation: false,
            allow_flip: false,
            expand_strategy: ExpandStrategy::Disabled,
            sort_by_max_side: false,
        }
    }
}

impl PackerOptions {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if:
    /// - Maximum dimensions are zero
    /// - Minimum dimensions exceed maximum dimensions
    /// - Border padding would leave no usable space
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::SpritePackError;

        if self.max_width == 0 || self.max_height == 0 {
            return Err(SpritePackError::InvalidDimensions {
                width: self.max_width,
                height: self.max_height,
            });
        }
        if self.min_width > self.max_width || self.min_height > self.max_height {
            return Err(SpritePackError::InvalidConfig(format!(
                "min size {}x{} exceeds max size {}x{}",
                self.min_width, self.min_height, self.max_width, self.max_height
            )));
        }
        let total_border = self.border_padding.saturating_mul(2);
        if total_border >= self.max_width || total_border >= self.max_height {
            return Err(SpritePackError::InvalidConfig(format!(
                "border_padding ({}) * 2 exceeds atlas dimensions ({}x{})",
                self.border_padding, self.max_width, self.max_height
            )));
        }
        Ok(())
    }

    /// Create a fluent builder for `PackerOptions`.
    pub fn builder() -> PackerOptionsBuilder {
        PackerOptionsBuilder::new()
    }
}

/// Builder for `PackerOptions` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct PackerOptionsBuilder {
    opts: PackerOptions,
}

impl PackerOptionsBuilder {
    pub fn new() -> Self {
        Self {
            opts: PackerOptions::default(),
        }
    }
    pub fn with_max_dimensions(mut self, w: u32, h: u32) -> Self {
        self.opts.max_width = w;
        self.opts.max_height = h;
        self
    }
    pub fn with_min_dimensions(mut self, w: u32, h: u32) -> Self {
        self.opts.min_width = w;
        self.opts.min_height = h;
        self
    }
    pub fn padding(mut self, v: u32) -> Self {
        self.opts.padding = v;
        self
    }
    pub fn border_padding(mut self, v: u32) -> Self {
        self.opts.border_padding = v;
        self
    }
    pub fn pow2(mut self, v: bool) -> Self {
        self.opts.power_of_two = v;
        self
    }
    pub fn square(mut self, v: bool) -> Self {
        self.opts.force_square = v;
        self
    }
    pub fn allow_rotation(mut self, v: bool) -> Self {
        self.opts.allow_rotation = v;
        self
    }
    pub fn allow_flip(mut self, v: bool) -> Self {
        self.opts.allow_flip = v;
        self
    }
    pub fn expand_strategy(mut self, v: ExpandStrategy) -> Self {
        self.opts.expand_strategy = v;
        self
    }
    pub fn sort_by_max_side(mut self, v: bool) -> Self {
        self.opts.sort_by_max_side = v;
        self
    }
    pub fn build(self) -> PackerOptions {
        self.opts
    }
}

/// Output raster format handed to the image encoder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    Bmp,
    Tga,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Bmp => "bmp",
            Self::Tga => "tga",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "bmp" => Ok(Self::Bmp),
            "tga" => Ok(Self::Tga),
            _ => Err(()),
        }
    }
}

/// Encoder settings forwarded untouched to the image writer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct CompressionSettings {
    /// PNG compression: `fast` | `default` | `best`.
    pub png_compression: Option<String>,
    /// JPEG quality 1..=100.
    pub jpeg_quality: Option<u8>,
    /// Unrecognised encoder keys, kept for downstream encoders.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Options recognised by `generate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorOptions {
    pub algorithm: AlgorithmChoice,
    pub heuristic: HeuristicChoice,
    pub max_width: u32,
    pub max_height: u32,
    pub padding: u32,
    pub border_padding: u32,
    pub power_of_two: bool,
    pub force_square: bool,
    pub allow_rotation: bool,
    pub allow_flip: bool,
    /// Trim transparent borders (alpha <= trim_threshold).
    pub trim_sprites: bool,
    pub trim_threshold: u8,
    pub expand_strategy: ExpandStrategy,
    pub sort_by_max_side: bool,
    pub image_format: ImageFormat,
    /// Key of the metadata exporter (`json`, `json-array`).
    pub export_format: String,
    pub compression_settings: CompressionSettings,
    /// Optional time budget for size search and auto selection (milliseconds).
    pub time_budget_ms: Option<u64>,
    /// Evaluate auto candidates in parallel when feature "parallel" is on.
    pub parallel: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmChoice::Auto,
            heuristic: HeuristicChoice::Default,
            max_width: 4096,
            max_height: 4096,
            padding: 2,
            border_padding: 0,
            power_of_two: false,
            force_square: false,
            allow_rotation: false,
            allow_flip: false,
            trim_sprites: true,
            trim_threshold: 0,
            expand_strategy: ExpandStrategy::Disabled,
            sort_by_max_side: false,
            image_format: ImageFormat::Png,
            export_format: "json".into(),
            compression_settings: CompressionSettings::default(),
            time_budget_ms: None,
            parallel: false,
        }
    }
}

impl GeneratorOptions {
    /// Packer-level view of these options.
    pub fn packer_options(&self) -> PackerOptions {
        PackerOptions {
            padding: self.padding,
            border_padding: self.border_padding,
            max_width: self.max_width,
            max_height: self.max_height,
            min_width: 1,
            min_height: 1,
            power_of_two: self.power_of_two,
            force_square: self.force_square,
            allow_rotation: self.allow_rotation,
            allow_flip: self.allow_flip,
            expand_strategy: self.expand_strategy,
            sort_by_max_side: self.sort_by_max_side,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_choice_parses_auto_and_names() {
        assert_eq!("auto".parse::<AlgorithmChoice>(), Ok(AlgorithmChoice::Auto));
        assert_eq!(
            "Shelf_FFDH".parse::<AlgorithmChoice>(),
            Ok(AlgorithmChoice::Fixed(Algorithm::ShelfFfdh))
        );
        assert!("autox".parse::<AlgorithmChoice>().is_err());
        for a in Algorithm::ALL {
            assert_eq!(a.as_str().parse::<Algorithm>(), Ok(a));
        }
    }

    #[test]
    fn heuristic_choice_round_trips_through_serde() {
        let opts = GeneratorOptions {
            heuristic: HeuristicChoice::Key("bssf".into()),
            ..Default::default()
        };
        let s = serde_json::to_string(&opts).unwrap();
        let back: GeneratorOptions = serde_json::from_str(&s).unwrap();
        assert_eq!(back.heuristic, HeuristicChoice::Key("bssf".into()));

        let partial: GeneratorOptions =
            serde_json::from_str(r#"{"algorithm":"skyline","heuristic":"auto"}"#).unwrap();
        assert_eq!(partial.algorithm, AlgorithmChoice::Fixed(Algorithm::Skyline));
        assert_eq!(partial.heuristic, HeuristicChoice::Auto);
        assert_eq!(partial.padding, 2);
    }

    #[test]
    fn validate_rejects_min_above_max() {
        let opts = PackerOptions::builder()
            .with_max_dimensions(64, 64)
            .with_min_dimensions(128, 16)
            .build();
        assert!(opts.validate().is_err());
    }
}

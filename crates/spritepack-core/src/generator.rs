//! End-to-end atlas generation: load → dedup → size search → pack → composite → save.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, RgbaImage};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::compositing::{compose_atlas, expand_duplicates, logical_canvas};
use crate::config::{
    Algorithm, AlgorithmChoice, CompressionSettings, GeneratorOptions, HeuristicChoice,
    ImageFormat, MaxRectsHeuristic, PackerOptions,
};
use crate::error::{Result, SpritePackError};
use crate::export::{AtlasMetadata, Provenance, SpriteRecord, exporter_for};
use crate::loader::{DedupTable, FrameLoader, LoadedFrame};
use crate::model::{FrameInput, PackedFrame, PackerResult, SizeResult};
use crate::packer::{MaxRectsPacker, Packer, create_packer};
use crate::selector::{SelectorOptions, select_best};
use crate::size::{SizeSearch, find_optimal_size, next_pow2};

/// Decoded frames of one animation, in playback order.
#[derive(Debug, Clone)]
pub struct AnimationInput {
    pub name: String,
    pub frames: Vec<DynamicImage>,
}

impl AnimationInput {
    pub fn new(name: impl Into<String>, frames: Vec<DynamicImage>) -> Self {
        Self {
            name: name.into(),
            frames,
        }
    }
}

/// Outcome of `generate`. Failures are reported in `errors`, never as a panic.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GeneratorResult {
    pub success: bool,
    pub atlas_path: Option<PathBuf>,
    pub metadata_path: Option<PathBuf>,
    pub atlas_width: u32,
    pub atlas_height: u32,
    /// Frames loaded successfully (including duplicates).
    pub frame_count: usize,
    pub unique_frames: usize,
    pub duplicate_count: usize,
    pub efficiency: f64,
    pub algorithm: String,
    pub heuristic: String,
    pub elapsed_ms: u64,
    pub metadata: Option<AtlasMetadata>,
    /// Composited atlas, kept when no output path was given.
    #[serde(skip)]
    pub image: Option<RgbaImage>,
    /// Exported metadata text, kept when no output path was given.
    #[serde(skip)]
    pub metadata_text: Option<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl GeneratorResult {
    fn fail(mut self, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        warn!(error = %msg, "atlas generation failed");
        self.errors.push(msg);
        self.success = false;
        self
    }
}

struct Group {
    name: String,
    frames: Vec<LoadedFrame>,
}

fn frame_id(animation: &str, index: usize) -> String {
    format!("{animation}{index:04}")
}

fn record_load_error(result: &mut GeneratorResult, what: &str, err: SpritePackError) {
    match err {
        SpritePackError::InvalidInput(msg) => {
            warn!(frame = what, %msg, "skipping frame");
            result.warnings.push(msg);
        }
        other => {
            warn!(frame = what, error = %other, "failed to load frame");
            result.errors.push(format!("failed to load {what}: {other}"));
        }
    }
}

/// Builds an atlas from image files grouped by animation name.
///
/// Frames are named `<animation><index:04>`. Writes `<output>.<image ext>` and
/// `<output>.<metadata ext>`.
#[instrument(skip_all, fields(animations = animation_groups.len(), output = %output_path.display()))]
pub fn generate(
    animation_groups: &BTreeMap<String, Vec<PathBuf>>,
    output_path: &Path,
    options: &GeneratorOptions,
) -> GeneratorResult {
    let start = Instant::now();
    let mut result = GeneratorResult::default();
    let loader = FrameLoader::new(options.trim_sprites, options.trim_threshold);

    let mut groups = Vec::with_capacity(animation_groups.len());
    for (name, paths) in animation_groups {
        let mut frames = Vec::with_capacity(paths.len());
        for (i, path) in paths.iter().enumerate() {
            match loader.load_path(frame_id(name, i), path) {
                Ok(f) => frames.push(f),
                Err(e) => record_load_error(&mut result, &path.display().to_string(), e),
            }
        }
        groups.push(Group {
            name: name.clone(),
            frames,
        });
    }
    run(groups, Some(output_path), options, result, start)
}

/// Builds an atlas from decoded images. With `output_path = None` nothing is
/// written and the image and metadata text are returned in the result.
#[instrument(skip_all, fields(animations = animations.len()))]
pub fn generate_from_images(
    animations: Vec<AnimationInput>,
    output_path: Option<&Path>,
    options: &GeneratorOptions,
) -> GeneratorResult {
    let start = Instant::now();
    let mut result = GeneratorResult::default();
    let loader = FrameLoader::new(options.trim_sprites, options.trim_threshold);

    let mut groups = Vec::with_capacity(animations.len());
    for anim in animations {
        let mut frames = Vec::with_capacity(anim.frames.len());
        for (i, img) in anim.frames.into_iter().enumerate() {
            let id = frame_id(&anim.name, i);
            match loader.load_image(id.clone(), img) {
                Ok(f) => frames.push(f),
                Err(e) => record_load_error(&mut result, &id, e),
            }
        }
        groups.push(Group {
            name: anim.name,
            frames,
        });
    }
    run(groups, output_path, options, result, start)
}

fn run(
    groups: Vec<Group>,
    output_path: Option<&Path>,
    options: &GeneratorOptions,
    mut result: GeneratorResult,
    start: Instant,
) -> GeneratorResult {
    let packer_opts = options.packer_options();
    if let Err(e) = packer_opts.validate() {
        return result.fail(e.to_string());
    }
    let exporter = match exporter_for(&options.export_format) {
        Ok(x) => x,
        Err(e) => return result.fail(e.to_string()),
    };

    // dedup, keeping first occurrences in animation order
    let mut dedup = DedupTable::new();
    let mut unique: Vec<Arc<FrameInput>> = Vec::new();
    let mut loaded: HashMap<&str, &LoadedFrame> = HashMap::new();
    for f in groups.iter().flat_map(|g| g.frames.iter()) {
        if loaded.contains_key(f.id.as_str()) {
            result
                .warnings
                .push(format!("duplicate frame name '{}' ignored", f.id));
            continue;
        }
        loaded.insert(f.id.as_str(), f);
        if dedup.insert(&f.id, &f.hash).is_none() {
            unique.push(Arc::new(f.to_input()));
        }
    }
    result.frame_count = dedup.total();
    result.unique_frames = dedup.unique_count();
    result.duplicate_count = dedup.duplicate_count();
    if unique.is_empty() {
        return result.fail(SpritePackError::Empty.to_string());
    }
    debug!(
        frames = result.frame_count,
        unique = result.unique_frames,
        "frames deduplicated"
    );

    let packed = pack_frames(&unique, &packer_opts, options, &mut result.warnings);
    result.algorithm = packed.algorithm_name.clone();
    result.heuristic = packed.heuristic_name.clone();
    result.efficiency = packed.efficiency;
    result.warnings.extend(packed.warnings.iter().cloned());
    if !packed.success {
        result.errors.extend(packed.errors.iter().cloned());
        return result.fail(format!(
            "packed {} of {} frames within {}x{}",
            packed.packed.len(),
            unique.len(),
            options.max_width,
            options.max_height
        ));
    }

    let (width, height) = final_size(&packed, &packer_opts);
    result.atlas_width = width;
    result.atlas_height = height;

    let pixels: HashMap<&str, &RgbaImage> = loaded.iter().map(|(k, f)| (*k, &f.rgba)).collect();
    let canvas = match compose_atlas(width, height, &packed.packed, &pixels) {
        Ok(c) => c,
        Err(e) => return result.fail(e.to_string()),
    };
    let placements = expand_duplicates(&packed.packed, &dedup);

    let image_name = output_path
        .map(|p| with_extension(p, options.image_format.extension()))
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| format!("atlas.{}", options.image_format.extension()));
    let metadata = AtlasMetadata {
        image: image_name,
        width,
        height,
        sprites: sprite_records(&groups, &loaded, &placements),
        provenance: Provenance::new(&packed.algorithm_name, &packed.heuristic_name, packed.efficiency),
    };
    let text = match exporter.export(&metadata) {
        Ok(t) => t,
        Err(e) => return result.fail(e.to_string()),
    };

    match output_path {
        Some(out) => {
            let image_path = with_extension(out, options.image_format.extension());
            let meta_path = with_extension(out, exporter.extension());
            if let Err(e) = write_outputs(&canvas, &image_path, &text, &meta_path, options) {
                return result.fail(e.to_string());
            }
            result.atlas_path = Some(image_path);
            result.metadata_path = Some(meta_path);
        }
        None => {
            result.image = Some(canvas);
            result.metadata_text = Some(text);
        }
    }
    result.metadata = Some(metadata);
    result.success = result.errors.is_empty();
    result.elapsed_ms = start.elapsed().as_millis() as u64;
    info!(
        width,
        height,
        frames = result.frame_count,
        unique = result.unique_frames,
        efficiency = result.efficiency,
        algorithm = %result.algorithm,
        ms = result.elapsed_ms,
        "atlas generated"
    );
    result
}

/// Placement-only run of the generator's packing stage: size search, then the
/// configured algorithm (or the selector for "auto"). No pixels are involved.
pub fn layout_frames(frames: &[Arc<FrameInput>], options: &GeneratorOptions) -> PackerResult {
    let packer_opts = options.packer_options();
    if let Err(e) = packer_opts.validate() {
        let mut r = PackerResult::new("", "");
        r.errors.push(e.to_string());
        return r;
    }
    let mut warnings = Vec::new();
    let mut res = pack_frames(frames, &packer_opts, options, &mut warnings);
    res.warnings.extend(warnings);
    res
}

/// Size search followed by the final pack (fixed algorithm) or selector sweep (auto).
fn pack_frames(
    frames: &[Arc<FrameInput>],
    packer_opts: &PackerOptions,
    options: &GeneratorOptions,
    warnings: &mut Vec<String>,
) -> PackerResult {
    let auto_heuristic = options.heuristic == HeuristicChoice::Auto;
    match options.algorithm {
        AlgorithmChoice::Fixed(algorithm) if !auto_heuristic => {
            let mut packer = create_packer(algorithm, packer_opts.clone());
            if let HeuristicChoice::Key(key) = &options.heuristic {
                if !packer.set_heuristic(key) {
                    let msg = format!(
                        "unknown heuristic '{key}' for {algorithm}; using {}",
                        packer.heuristic_name()
                    );
                    warn!("{msg}");
                    warnings.push(msg);
                }
            }
            let size = search_size(frames, packer.as_mut(), packer_opts, options);
            pack_or_report(packer.as_mut(), frames, &size)
        }
        choice => {
            let mut probe =
                MaxRectsPacker::with_heuristic(packer_opts.clone(), MaxRectsHeuristic::BestShortSideFit);
            let size = search_size(frames, &mut probe, packer_opts, options);
            let algorithms = match choice {
                AlgorithmChoice::Fixed(a) => vec![a],
                AlgorithmChoice::Auto => Algorithm::ALL.to_vec(),
            };
            let sel = SelectorOptions {
                algorithms,
                all_heuristics: auto_heuristic,
                time_budget_ms: options.time_budget_ms,
                parallel: options.parallel,
            };
            select_best(frames, size.width, size.height, packer_opts, &sel)
        }
    }
}

fn search_size(
    frames: &[Arc<FrameInput>],
    packer: &mut dyn Packer,
    packer_opts: &PackerOptions,
    options: &GeneratorOptions,
) -> SizeResult {
    let mut search = SizeSearch::from_options(packer_opts, packer.name());
    search.time_budget_ms = options.time_budget_ms;
    find_optimal_size(
        frames,
        |w, h| packer.pack(frames, w, h).is_ok_and(|r| r.success),
        &search,
    )
}

fn pack_or_report(packer: &mut dyn Packer, frames: &[Arc<FrameInput>], size: &SizeResult) -> PackerResult {
    match packer.pack(frames, size.width, size.height) {
        Ok(r) => r,
        Err(e) => {
            let mut r = PackerResult::new(packer.name(), packer.heuristic_name());
            r.errors.push(e.to_string());
            r
        }
    }
}

/// Tight extents, rounded up to powers of two and/or squared when requested,
/// never beyond the per-axis maximum.
fn final_size(result: &PackerResult, options: &PackerOptions) -> (u32, u32) {
    let tight_w = result.atlas_width.max(1);
    let tight_h = result.atlas_height.max(1);
    let (mut w, mut h) = (tight_w, tight_h);
    if options.power_of_two {
        w = next_pow2(w);
        h = next_pow2(h);
    }
    if options.force_square {
        let m = w.max(h);
        w = m;
        h = m;
    }
    let capped = (
        w.min(options.max_width.max(tight_w)),
        h.min(options.max_height.max(tight_h)),
    );
    if capped != (w, h) {
        warn!(width = w, height = h, "atlas shape clamped to the maximum dimensions");
    }
    capped
}

/// One record per kept frame; frames dropped for a repeated name get none.
fn sprite_records(
    groups: &[Group],
    kept: &HashMap<&str, &LoadedFrame>,
    placements: &[PackedFrame],
) -> Vec<SpriteRecord> {
    let by_id: HashMap<&str, &PackedFrame> = placements.iter().map(|p| (p.id(), p)).collect();
    let mut out = Vec::with_capacity(placements.len());
    for g in groups {
        let (canvas_w, canvas_h) = logical_canvas(&g.frames);
        for (index, f) in g.frames.iter().enumerate() {
            if !kept.get(f.id.as_str()).is_some_and(|k| std::ptr::eq(*k, f)) {
                continue;
            }
            let Some(p) = by_id.get(f.id.as_str()) else {
                continue;
            };
            out.push(SpriteRecord {
                name: f.id.clone(),
                x: p.x,
                y: p.y,
                width: f.width(),
                height: f.height(),
                frame_x: -(f.trim_x as i32),
                frame_y: -(f.trim_y as i32),
                frame_width: canvas_w,
                frame_height: canvas_h,
                rotated: p.rotated,
                flipped_x: p.flipped_x,
                flipped_y: p.flipped_y,
                source_width: f.source_width,
                source_height: f.source_height,
                animation: g.name.clone(),
                index,
            });
        }
    }
    out
}

/// `out/atlas` + `png` → `out/atlas.png`; existing dots in the stem are kept.
fn with_extension(path: &Path, ext: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

fn write_outputs(
    canvas: &RgbaImage,
    image_path: &Path,
    metadata: &str,
    metadata_path: &Path,
    options: &GeneratorOptions,
) -> Result<()> {
    if let Some(dir) = image_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    encode_image(
        canvas,
        image_path,
        options.image_format,
        &options.compression_settings,
    )?;
    fs::write(metadata_path, metadata)?;
    debug!(image = %image_path.display(), metadata = %metadata_path.display(), "outputs written");
    Ok(())
}

/// Writes `canvas` in `format`, honouring the PNG compression level and JPEG quality.
pub fn encode_image(
    canvas: &RgbaImage,
    path: &Path,
    format: ImageFormat,
    compression: &CompressionSettings,
) -> Result<()> {
    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    match format {
        ImageFormat::Png => {
            let level = match compression.png_compression.as_deref() {
                Some("fast") => CompressionType::Fast,
                Some("best") => CompressionType::Best,
                Some("default") | None => CompressionType::Default,
                Some(other) => {
                    return Err(SpritePackError::InvalidConfig(format!(
                        "unknown png compression '{other}'"
                    )));
                }
            };
            let enc = PngEncoder::new_with_quality(&mut writer, level, FilterType::Adaptive);
            canvas.write_with_encoder(enc)?;
        }
        ImageFormat::Jpeg => {
            let quality = compression.jpeg_quality.unwrap_or(90).clamp(1, 100);
            let enc = JpegEncoder::new_with_quality(&mut writer, quality);
            // no alpha channel in JPEG
            DynamicImage::ImageRgba8(canvas.clone())
                .to_rgb8()
                .write_with_encoder(enc)?;
        }
        ImageFormat::Bmp => {
            canvas.write_to(&mut writer, image::ImageFormat::Bmp)?;
        }
        ImageFormat::Tga => {
            canvas.write_to(&mut writer, image::ImageFormat::Tga)?;
        }
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_appended() {
        assert_eq!(
            with_extension(Path::new("out/atlas"), "png"),
            PathBuf::from("out/atlas.png")
        );
        assert_eq!(
            with_extension(Path::new("hero.v2"), "json"),
            PathBuf::from("hero.v2.json")
        );
    }

    #[test]
    fn final_size_applies_pow2_then_square() {
        let mut r = PackerResult::new("maxrects", "bssf");
        r.atlas_width = 70;
        r.atlas_height = 20;
        let opts = PackerOptions::builder().pow2(true).build();
        assert_eq!(final_size(&r, &opts), (128, 32));
        let opts = PackerOptions::builder().pow2(true).square(true).build();
        assert_eq!(final_size(&r, &opts), (128, 128));
        assert_eq!(final_size(&r, &PackerOptions::default()), (70, 20));
    }

    #[test]
    fn layout_uses_the_fixed_algorithm() {
        let frames: Vec<Arc<FrameInput>> = (0..6)
            .map(|i| Arc::new(FrameInput::new(format!("f{i}"), 10, 10)))
            .collect();
        let opts = GeneratorOptions {
            algorithm: AlgorithmChoice::Fixed(Algorithm::Ordered),
            padding: 0,
            ..Default::default()
        };
        let res = layout_frames(&frames, &opts);
        assert!(res.success, "{:?}", res.errors);
        assert_eq!(res.algorithm_name, "ordered");
        assert_eq!(res.packed.len(), 6);

        let bad = GeneratorOptions {
            max_width: 0,
            ..Default::default()
        };
        assert!(!layout_frames(&frames, &bad).success);
    }

    #[test]
    fn frame_ids_are_zero_padded() {
        assert_eq!(frame_id("idle", 7), "idle0007");
    }
}

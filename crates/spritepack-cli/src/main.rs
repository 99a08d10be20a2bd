use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow, bail};
use clap::{ArgAction, Parser, Subcommand};
use globset::{Glob, GlobSet, GlobSetBuilder};
use handlebars::Handlebars;
use image::{DynamicImage, ImageReader};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::{Value, json};
use spritepack_core::prelude::*;
use spritepack_core::{AtlasMetadata, CompressionSettings};
use tracing::{error, info, warn};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "spritepack",
    about = "Pack animation frames into a sprite atlas",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the atlas image and metadata
    Pack(PackArgs),
    /// Placement-only run on image sizes; prints the layout JSON
    Layout(PackArgs),
    /// Time every algorithm on the same input
    Bench(BenchArgs),
}

#[derive(Parser, Debug, Clone)]
struct PackArgs {
    // Input/Output
    /// Input directory (subdirectories are animations) or a single image
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Output path without extension (writes <output>.png and <output>.json)
    #[arg(short, long, default_value = "out/atlas", help_heading = "Input/Output")]
    output: PathBuf,
    /// YAML config file; its keys override the command-line values
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,

    // Layout
    /// Max width
    #[arg(long, default_value_t = 4096, help_heading = "Layout")]
    max_width: u32,
    /// Max height
    #[arg(long, default_value_t = 4096, help_heading = "Layout")]
    max_height: u32,
    /// Round atlas dims up to powers of two
    #[arg(long, default_value_t = false, help_heading = "Layout")]
    pow2: bool,
    /// Force a square atlas
    #[arg(long, default_value_t = false, help_heading = "Layout")]
    square: bool,
    /// Size probe before the binary search: disabled|width_first|height_first|short_side|long_side|both
    #[arg(long, default_value = "disabled", help_heading = "Layout")]
    expand_strategy: String,
    /// Place frames longest side first
    #[arg(long, default_value_t = false, help_heading = "Layout")]
    sort_by_max_side: bool,

    // Image Processing
    /// Allow rotation (90deg clockwise)
    #[arg(long, default_value_t = false, help_heading = "Image Processing")]
    allow_rotation: bool,
    /// Allow vertical flips (hybrid packer)
    #[arg(long, default_value_t = false, help_heading = "Image Processing")]
    allow_flip: bool,
    /// Border padding (around the whole atlas)
    #[arg(long, default_value_t = 0, help_heading = "Image Processing")]
    border_padding: u32,
    /// Padding after each frame (right and bottom)
    #[arg(long, default_value_t = 2, help_heading = "Image Processing")]
    padding: u32,
    /// Trim transparent borders
    #[arg(long, default_value_t = true, action = ArgAction::Set, help_heading = "Image Processing")]
    trim: bool,
    /// Trim alpha threshold (0..=255)
    #[arg(long, default_value_t = 0, help_heading = "Image Processing")]
    trim_threshold: u8,

    // Algorithms
    /// Algorithm: auto | maxrects | guillotine | skyline | shelf | shelf-ffdh | growing | ordered | hybrid
    #[arg(long, default_value = "auto", help_heading = "Algorithms")]
    algorithm: String,
    /// Heuristic key for the algorithm, or "auto" to sweep all of them
    #[arg(long, help_heading = "Algorithms")]
    heuristic: Option<String>,
    /// Time budget for size search and auto selection (ms)
    #[arg(long, help_heading = "Algorithms")]
    time_budget: Option<u64>,
    /// Evaluate auto candidates in parallel (requires core feature `parallel`)
    #[arg(long, default_value_t = false, help_heading = "Algorithms")]
    parallel: bool,

    // Export
    /// Image format: png | jpeg | bmp | tga
    #[arg(long, default_value = "png", help_heading = "Export")]
    format: String,
    /// Metadata format: json | json-array | template
    #[arg(long, default_value = "json", help_heading = "Export")]
    metadata: String,
    /// Handlebars template file, used when --metadata template
    #[arg(long, help_heading = "Export")]
    template: Option<PathBuf>,
    /// PNG compression: fast | default | best
    #[arg(long, help_heading = "Export")]
    png_compression: Option<String>,
    /// JPEG quality (1..=100)
    #[arg(long, help_heading = "Export")]
    jpeg_quality: Option<u8>,
    /// Export packing stats (JSON) to this file
    #[arg(long, help_heading = "Export")]
    export_stats: Option<PathBuf>,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: pack and report but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
struct BenchArgs {
    /// Input directory
    input: PathBuf,
    #[arg(long)]
    include: Vec<String>,
    #[arg(long)]
    exclude: Vec<String>,
    #[arg(long, default_value_t = 2)]
    padding: u32,
    #[arg(long, default_value_t = 4096)]
    max_size: u32,
    #[arg(long, default_value_t = false)]
    allow_rotation: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    match &cli.command {
        Commands::Pack(args) => run_pack(args, cli.progress && !cli.quiet),
        Commands::Layout(args) => run_layout(args),
        Commands::Bench(b) => run_bench(b),
    }
}

/// CLI flags, then YAML overrides, then validation.
fn resolve_options(args: &PackArgs) -> anyhow::Result<GeneratorOptions> {
    let algorithm: AlgorithmChoice = args
        .algorithm
        .parse()
        .map_err(|_| anyhow!("unknown algorithm: {}", args.algorithm))?;
    let image_format: ImageFormat = args
        .format
        .parse()
        .map_err(|_| anyhow!("unknown image format: {}", args.format))?;
    let expand_strategy: ExpandStrategy = args
        .expand_strategy
        .parse()
        .map_err(|_| anyhow!("unknown expand strategy: {}", args.expand_strategy))?;
    let export_format = match args.metadata.as_str() {
        // template output is rendered from the json metadata
        "template" => "json".to_string(),
        other => other.to_string(),
    };

    let opts = GeneratorOptions {
        algorithm,
        heuristic: HeuristicChoice::from(args.heuristic.clone()),
        max_width: args.max_width,
        max_height: args.max_height,
        padding: args.padding,
        border_padding: args.border_padding,
        power_of_two: args.pow2,
        force_square: args.square,
        allow_rotation: args.allow_rotation,
        allow_flip: args.allow_flip,
        trim_sprites: args.trim,
        trim_threshold: args.trim_threshold,
        expand_strategy,
        sort_by_max_side: args.sort_by_max_side,
        image_format,
        export_format,
        compression_settings: CompressionSettings {
            png_compression: args.png_compression.clone(),
            jpeg_quality: args.jpeg_quality,
            ..Default::default()
        },
        time_budget_ms: args.time_budget,
        parallel: args.parallel,
    };
    let opts = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("read config {}", path.display()))?;
            merge_yaml(opts, &text).with_context(|| format!("apply config {}", path.display()))?
        }
        None => opts,
    };
    opts.packer_options().validate()?;
    Ok(opts)
}

fn merge_yaml(opts: GeneratorOptions, yaml: &str) -> anyhow::Result<GeneratorOptions> {
    let overrides: Value = serde_yaml::from_str(yaml)?;
    let mut base = serde_json::to_value(&opts)?;
    match (&mut base, overrides) {
        (Value::Object(b), Value::Object(o)) => b.extend(o),
        (_, Value::Null) => {}
        _ => bail!("config must be a mapping"),
    }
    Ok(serde_json::from_value(base)?)
}

fn run_pack(args: &PackArgs, show_progress: bool) -> anyhow::Result<()> {
    let options = resolve_options(args)?;
    if args.print_config {
        match args.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&options)?),
            _ => println!("{}", serde_json::to_string_pretty(&options)?),
        }
        return Ok(());
    }
    if args.metadata == "template" && args.template.is_none() {
        bail!("--metadata template requires --template <file>");
    }

    let groups = collect_groups(&args.input, &args.include, &args.exclude)?;
    let animations = load_animations(&groups, show_progress)?;
    info!(animations = animations.len(), "loaded input images");

    let output = (!args.dry_run).then_some(args.output.as_path());
    let res = generate_from_images(animations, output, &options);
    for w in &res.warnings {
        warn!("{w}");
    }
    if !res.success {
        bail!("atlas generation failed: {}", res.errors.join("; "));
    }
    info!(
        width = res.atlas_width,
        height = res.atlas_height,
        frames = res.frame_count,
        unique = res.unique_frames,
        algorithm = %res.algorithm,
        heuristic = %res.heuristic,
        occupancy = format!("{:.2}%", res.efficiency * 100.0),
        "atlas built"
    );
    if let Some(p) = &res.atlas_path {
        info!(path = %p.display(), "image written");
    }

    if let (Some(tpl), Some(meta)) = (&args.template, &res.metadata) {
        if args.metadata == "template" {
            let rendered = render_template(tpl, meta)?;
            if args.dry_run {
                println!("{rendered}");
            } else {
                let out_path = template_output_path(&args.output, tpl);
                fs::write(&out_path, rendered)
                    .with_context(|| format!("write {}", out_path.display()))?;
                info!(path = %out_path.display(), "template written");
            }
        }
    }

    if let Some(stats_path) = &args.export_stats {
        let value = AtlasStats::from(&res);
        if args.dry_run {
            println!("{}", serde_json::to_string_pretty(&value)?);
        } else {
            fs::write(stats_path, serde_json::to_string_pretty(&value)?)
                .with_context(|| format!("write {}", stats_path.display()))?;
            info!(path = %stats_path.display(), "stats exported");
        }
    }
    Ok(())
}

/// Summary written by `--export-stats`.
#[derive(Debug, Serialize)]
struct AtlasStats<'a> {
    width: u32,
    height: u32,
    frames: usize,
    unique_frames: usize,
    duplicates: usize,
    occupancy: f64,
    algorithm: &'a str,
    heuristic: &'a str,
    elapsed_ms: u64,
}

impl<'a> From<&'a GeneratorResult> for AtlasStats<'a> {
    fn from(res: &'a GeneratorResult) -> Self {
        Self {
            width: res.atlas_width,
            height: res.atlas_height,
            frames: res.frame_count,
            unique_frames: res.unique_frames,
            duplicates: res.duplicate_count,
            occupancy: res.efficiency,
            algorithm: &res.algorithm,
            heuristic: &res.heuristic,
            elapsed_ms: res.elapsed_ms,
        }
    }
}

fn render_template(path: &Path, meta: &AtlasMetadata) -> anyhow::Result<String> {
    let tpl = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let mut reg = Handlebars::new();
    reg.set_strict_mode(true);
    reg.register_template_string("atlas", tpl)?;
    Ok(reg.render("atlas", meta)?)
}

/// `out/hero` + `unity.json.hbs` → `out/hero.template.json`.
fn template_output_path(output: &Path, template: &Path) -> PathBuf {
    let ext = template
        .file_stem()
        .map(Path::new)
        .and_then(|s| s.extension())
        .and_then(|e| e.to_str())
        .unwrap_or("txt");
    let mut s = output.as_os_str().to_owned();
    s.push(".template.");
    s.push(ext);
    PathBuf::from(s)
}

fn run_layout(args: &PackArgs) -> anyhow::Result<()> {
    let options = resolve_options(args)?;
    let groups = collect_groups(&args.input, &args.include, &args.exclude)?;
    let frames = measure_frames(&groups);
    let res = layout_frames(&frames, &options);
    println!("{}", serde_json::to_string_pretty(&res)?);
    if !res.success {
        bail!("layout failed: {}", res.errors.join("; "));
    }
    Ok(())
}

fn run_bench(b: &BenchArgs) -> anyhow::Result<()> {
    let groups = collect_groups(&b.input, &b.include, &b.exclude)?;
    let frames = measure_frames(&groups);
    let opts = PackerOptions::builder()
        .with_max_dimensions(b.max_size, b.max_size)
        .padding(b.padding)
        .allow_rotation(b.allow_rotation)
        .build();
    opts.validate()?;
    println!("frames={}", frames.len());

    for algorithm in Algorithm::ALL {
        let start = Instant::now();
        let mut packer = create_packer(algorithm, opts.clone());
        let search = SizeSearch::from_options(&opts, algorithm.as_str());
        let size = find_optimal_size(
            &frames,
            |w, h| packer.pack(&frames, w, h).is_ok_and(|r| r.success),
            &search,
        );
        let res = packer.pack(&frames, size.width, size.height)?;
        let dur = start.elapsed();
        println!(
            "{:<11} {:>5}x{:<5} occupancy={:.2}% ok={} time={}",
            algorithm.as_str(),
            res.atlas_width,
            res.atlas_height,
            res.efficiency * 100.0,
            res.success,
            bench_fmt_dur(dur)
        );
    }

    let start = Instant::now();
    let auto = GeneratorOptions {
        padding: b.padding,
        max_width: b.max_size,
        max_height: b.max_size,
        allow_rotation: b.allow_rotation,
        ..Default::default()
    };
    let res = layout_frames(&frames, &auto);
    println!(
        "{:<11} {:>5}x{:<5} occupancy={:.2}% ok={} time={} ({}/{})",
        "auto",
        res.atlas_width,
        res.atlas_height,
        res.efficiency * 100.0,
        res.success,
        bench_fmt_dur(start.elapsed()),
        res.algorithm_name,
        res.heuristic_name
    );
    Ok(())
}

fn bench_fmt_dur(d: Duration) -> String {
    let ms = d.as_secs_f64() * 1000.0;
    if ms >= 1.0 {
        format!("{:.1}ms", ms)
    } else {
        format!("{}us", d.as_micros())
    }
}

fn build_globset(patterns: &[String]) -> anyhow::Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut b = GlobSetBuilder::new();
    for pat in patterns {
        b.add(Glob::new(pat).with_context(|| format!("bad glob '{pat}'"))?);
    }
    Ok(Some(b.build()?))
}

fn gather_paths(path: &Path, include: &[String], exclude: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let inc_set = build_globset(include)?;
    let exc_set = build_globset(exclude)?;
    let mut list: Vec<PathBuf> = Vec::new();
    if path.is_file() {
        if !should_skip(path, inc_set.as_ref(), exc_set.as_ref()) && is_image(path) {
            list.push(path.to_path_buf());
        }
    } else {
        for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && !should_skip(p, inc_set.as_ref(), exc_set.as_ref()) && is_image(p) {
                list.push(p.to_path_buf());
            }
        }
    }
    list.sort();
    Ok(list)
}

fn should_skip(p: &Path, include: Option<&GlobSet>, exclude: Option<&GlobSet>) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if exclude.is_some_and(|ex| ex.is_match(&s)) {
        return true;
    }
    include.is_some_and(|inc| !inc.is_match(&s))
}

fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "bmp" | "tga")
    )
}

/// Images grouped into animations, each sorted by path.
fn collect_groups(
    input: &Path,
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<BTreeMap<String, Vec<PathBuf>>> {
    let paths = gather_paths(input, include, exclude)?;
    if paths.is_empty() {
        bail!("no images found under {}", input.display());
    }
    let mut groups: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for p in paths {
        groups.entry(animation_name(input, &p)).or_default().push(p);
    }
    Ok(groups)
}

/// First directory below `root`, or the file stem without its frame number.
fn animation_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let mut comps = rel.components();
    if let (Some(first), Some(_)) = (comps.next(), comps.next()) {
        return first.as_os_str().to_string_lossy().into_owned();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    stem_animation(&stem)
}

/// `run_01` → `run`; a stem made only of digits is kept as is.
fn stem_animation(stem: &str) -> String {
    let base = stem
        .trim_end_matches(|c: char| c.is_ascii_digit())
        .trim_end_matches(['_', '-', '.', ' ']);
    if base.is_empty() {
        stem.to_string()
    } else {
        base.to_string()
    }
}

fn load_animations(
    groups: &BTreeMap<String, Vec<PathBuf>>,
    progress: bool,
) -> anyhow::Result<Vec<AnimationInput>> {
    let total: usize = groups.values().map(Vec::len).sum();
    let bar = if progress {
        let b = ProgressBar::new(total as u64);
        b.set_style(ProgressStyle::with_template(
            "{spinner:.green} loading {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )?);
        Some(b)
    } else {
        None
    };
    let mut out = Vec::with_capacity(groups.len());
    for (name, paths) in groups {
        let mut frames = Vec::with_capacity(paths.len());
        for p in paths {
            if let Some(b) = &bar {
                b.set_message(p.file_name().and_then(|s| s.to_str()).unwrap_or("").to_string());
            }
            match load_image(p) {
                Ok(img) => frames.push(img),
                Err(e) => error!(path = %p.display(), error = %e, "skip image"),
            }
            if let Some(b) = &bar {
                b.inc(1);
            }
        }
        out.push(AnimationInput::new(name.clone(), frames));
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    Ok(out)
}

fn load_image(p: &Path) -> anyhow::Result<DynamicImage> {
    let img = ImageReader::open(p)?.with_guessed_format()?.decode()?;
    Ok(img)
}

/// Frame sizes read from image headers, named like the generator names them.
/// Unreadable files are skipped without consuming an index, as in `load_animations`.
fn measure_frames(groups: &BTreeMap<String, Vec<PathBuf>>) -> Vec<Arc<FrameInput>> {
    let mut frames = Vec::new();
    for (name, paths) in groups {
        let mut index = 0usize;
        for p in paths {
            match image::image_dimensions(p) {
                Ok((w, h)) => {
                    frames.push(Arc::new(
                        FrameInput::new(format!("{name}{index:04}"), w, h)
                            .with_user_data(json!({ "path": p.to_string_lossy() })),
                    ));
                    index += 1;
                }
                Err(e) => error!(path = %p.display(), error = %e, "skip image"),
            }
        }
    }
    frames
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stems_lose_frame_numbers() {
        assert_eq!(stem_animation("run_01"), "run");
        assert_eq!(stem_animation("idle-3"), "idle");
        assert_eq!(stem_animation("jump"), "jump");
        assert_eq!(stem_animation("0042"), "0042");
    }

    #[test]
    fn subdirectories_name_animations() {
        let root = Path::new("sprites");
        assert_eq!(animation_name(root, Path::new("sprites/walk/left/0.png")), "walk");
        assert_eq!(animation_name(root, Path::new("sprites/attack_02.png")), "attack");
        let file = Path::new("sprites/coin7.png");
        assert_eq!(animation_name(file, file), "coin");
    }

    #[test]
    fn yaml_overrides_cli_values() {
        let base = GeneratorOptions {
            padding: 5,
            ..Default::default()
        };
        let merged = merge_yaml(base, "algorithm: skyline\nheuristic: minwaste\npower_of_two: true\n").unwrap();
        assert_eq!(merged.algorithm, AlgorithmChoice::Fixed(Algorithm::Skyline));
        assert_eq!(merged.heuristic, HeuristicChoice::Key("minwaste".into()));
        assert!(merged.power_of_two);
        assert_eq!(merged.padding, 5);

        assert!(merge_yaml(GeneratorOptions::default(), "- 1\n- 2\n").is_err());
    }

    #[test]
    fn template_extension_comes_from_the_template_name() {
        assert_eq!(
            template_output_path(Path::new("out/hero"), Path::new("tpl/unity.json.hbs")),
            PathBuf::from("out/hero.template.json")
        );
        assert_eq!(
            template_output_path(Path::new("atlas"), Path::new("plain.hbs")),
            PathBuf::from("atlas.template.txt")
        );
    }

    #[test]
    fn stats_serialize_with_stable_keys() {
        let res = GeneratorResult {
            atlas_width: 64,
            atlas_height: 32,
            frame_count: 5,
            unique_frames: 4,
            duplicate_count: 1,
            algorithm: "skyline".into(),
            heuristic: "bl".into(),
            ..Default::default()
        };
        let v = serde_json::to_value(AtlasStats::from(&res)).unwrap();
        assert_eq!(v["width"], 64);
        assert_eq!(v["duplicates"], 1);
        assert_eq!(v["algorithm"], "skyline");
    }

    #[test]
    fn pack_and_layout_agree_on_names_after_a_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("run_0.png");
        let good = dir.path().join("run_1.png");
        fs::write(&bad, b"not a png").unwrap();
        image::RgbaImage::from_pixel(4, 4, image::Rgba([1, 2, 3, 255]))
            .save(&good)
            .unwrap();
        let mut groups = BTreeMap::new();
        groups.insert("run".to_string(), vec![bad, good]);

        let measured: Vec<String> = measure_frames(&groups).iter().map(|f| f.id.clone()).collect();
        assert_eq!(measured, ["run0000"]);

        let animations = load_animations(&groups, false).unwrap();
        let res = generate_from_images(animations, None, &GeneratorOptions::default());
        assert!(res.success, "{:?}", res.errors);
        let packed: Vec<String> = res.metadata.unwrap().sprites.into_iter().map(|s| s.name).collect();
        assert_eq!(packed, measured);
    }

    #[test]
    fn globs_filter_paths() {
        let inc = build_globset(&["**/*.png".into()]).unwrap();
        let exc = build_globset(&["**/skip/**".into()]).unwrap();
        assert!(!should_skip(Path::new("a/b.png"), inc.as_ref(), exc.as_ref()));
        assert!(should_skip(Path::new("a/b.jpg"), inc.as_ref(), exc.as_ref()));
        assert!(should_skip(Path::new("a/skip/c.png"), inc.as_ref(), exc.as_ref()));
    }
}

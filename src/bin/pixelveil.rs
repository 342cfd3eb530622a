use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use pixelveil::{
    default_output_path, Error, PatternFetcher, PerturbationConfig, PresetMode, ProcessResult,
    ProtectMode, ProtectOptions, ProtectionEngine, Result, StyleOptions,
};

#[derive(Parser)]
#[command(
    name = "pixelveil",
    about = "Protect images against unauthorized AI training with seeded adversarial perturbations",
    version,
    after_help = "Simple usage: pixelveil <image>  (protect with the standard preset)\n\n\
                  Output is always PNG; the file carries a provenance metadata chunk\n\
                  unless --no-metadata is given."
)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Input image file or directory
    input: String,

    /// Output file or directory (default: {name}_protected.png)
    #[arg(short, long)]
    output: Option<String>,

    /// Seed for deterministic output (default: a built-in constant)
    #[arg(long)]
    seed: Option<String>,

    /// Perturbation intensity (0-100), overrides the preset
    #[arg(short, long)]
    intensity: Option<f32>,

    /// Intensity preset: light, standard, or maximum
    #[arg(short, long, default_value = "standard")]
    preset: PresetMode,

    /// Strong mode: also mix in a universal pattern (requires --pattern)
    #[arg(long)]
    strong: bool,

    /// File holding a universal pattern (raw little-endian f32 RGB tile)
    #[arg(long, value_name = "FILE")]
    pattern: Option<PathBuf>,

    /// Mixing weight for the universal pattern
    #[arg(long, default_value = "0.12")]
    pattern_weight: f32,

    /// Fraction of blocks perturbed per pass (0.0-1.0)
    #[arg(long, default_value = "0.5")]
    density: f32,

    /// Enable the color-shift style stage
    #[arg(long)]
    color_shift: bool,

    /// Enable the edge-disruption style stage
    #[arg(long)]
    edge_disruption: bool,

    /// Enable the texture-confusion style stage
    #[arg(long)]
    texture_confusion: bool,

    /// Stronger edge settings for line art and sketches
    #[arg(long)]
    sketch: bool,

    /// Skip the provenance metadata chunk
    #[arg(long)]
    no_metadata: bool,

    /// Print per-file stats as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

/// Reads pattern bytes from the local filesystem.
struct FilePatternFetcher;

impl PatternFetcher for FilePatternFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        std::fs::read(url).map_err(|e| Error::FetchFailure(format!("{url}: {e}")))
    }
}

fn main() {
    let cli = Cli::parse();

    if let Some(intensity) = cli.intensity {
        if !(0.0..=100.0).contains(&intensity) {
            eprintln!("Error: Intensity must be between 0 and 100");
            process::exit(1);
        }
    }

    if !(0.0..=1.0).contains(&cli.density) {
        eprintln!("Error: Density must be between 0.0 and 1.0");
        process::exit(1);
    }

    if cli.strong && cli.pattern.is_none() {
        eprintln!("Error: --strong requires --pattern <FILE>");
        process::exit(1);
    }

    let intensity = cli.intensity.unwrap_or(cli.preset.preset().intensity);

    let config = PerturbationConfig {
        intensity,
        density: cli.density,
        seed: cli.seed.clone(),
        pattern_url: cli
            .pattern
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned()),
        pattern_weight: cli.pattern_weight,
        ..PerturbationConfig::default()
    };

    let style = StyleOptions {
        color_shift: cli.color_shift,
        edge_disruption: cli.edge_disruption || cli.sketch,
        texture_confusion: cli.texture_confusion,
        sketch_mode: cli.sketch,
    };

    let options = ProtectOptions {
        mode: if cli.pattern.is_some() {
            ProtectMode::Strong
        } else {
            ProtectMode::Basic
        },
        config,
        style: style.any_enabled().then_some(style),
        inject_metadata: !cli.no_metadata,
    };

    let engine = if cli.pattern.is_some() {
        ProtectionEngine::with_fetcher(Box::new(FilePatternFetcher))
    } else {
        ProtectionEngine::new()
    };

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        process::exit(1);
    }

    if !cli.quiet {
        eprintln!(
            "Protecting with intensity {intensity:.0} ({} preset{})",
            cli.preset,
            if cli.intensity.is_some() {
                ", overridden"
            } else {
                ""
            }
        );
        eprintln!();
    }

    let results = if input_path.is_dir() {
        let output_dir = if let Some(o) = &cli.output {
            PathBuf::from(o)
        } else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: pixelveil <input_dir> -o <output_dir>");
            process::exit(1);
        };
        engine.process_directory(input_path, &output_dir, &options)
    } else {
        let output_path = match &cli.output {
            Some(o) => PathBuf::from(o),
            None => default_output_path(input_path),
        };
        vec![engine.process_file(input_path, &output_path, &options)]
    };

    let mut success_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, &cli);
        if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !cli.quiet {
        eprintln!();
        eprint!("[Summary] Protected: {success_count}");
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn print_result(result: &ProcessResult, cli: &Cli) {
    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    if cli.json {
        if let Some(stats) = &result.stats {
            match serde_json::to_string(stats) {
                Ok(json) => println!("{{\"file\":{filename:?},\"stats\":{json}}}"),
                Err(e) => eprintln!("[FAIL] {filename}: stats serialization failed: {e}"),
            }
        }
    }

    if result.success {
        if !cli.quiet {
            eprintln!("[OK] {filename}: {}", result.message);
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }

    if cli.verbose {
        if let Some(stats) = &result.stats {
            eprintln!(
                "  -> multiplier {:.2}, overlay {}, {} bytes, {:.0} ms total",
                stats.amplitude_multiplier,
                if stats.overlay_applied { "yes" } else { "no" },
                stats.output_size,
                stats.timings.total.as_secs_f64() * 1000.0,
            );
        }
    }
}

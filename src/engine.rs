//! Protection pipeline orchestrator.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use serde::Serialize;

use crate::error::Result;
use crate::metadata;
use crate::metrics;
use crate::overlay::{self, PatternFetcher};
use crate::perturb::{self, PerturbationConfig};
use crate::signature;
use crate::style::{self, StyleOptions};

/// Minimum acceptable PSNR, in dB, before the result ships anyway.
pub const PSNR_FLOOR: f64 = 38.0;

/// How many times the perturbation is re-run at reduced strength.
pub const MAX_RETRIES: u32 = 2;

/// Amplitude multiplier applied on each retry.
pub const RETRY_FALLOFF: f32 = 0.8;

/// Seed used when the caller does not supply one.
pub const DEFAULT_SEED: &str = "pixelveil";

/// How much of the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectMode {
    /// Multi-scale perturbation and signature only.
    Basic,
    /// Basic plus the universal pattern overlay, when one is available.
    Strong,
}

/// Options controlling a protection run.
#[derive(Debug, Clone)]
pub struct ProtectOptions {
    /// Pipeline mode.
    pub mode: ProtectMode,
    /// Perturbation parameters.
    pub config: PerturbationConfig,
    /// Optional style-disruption stage.
    pub style: Option<StyleOptions>,
    /// Whether to plant the metadata chunk in the output PNG.
    pub inject_metadata: bool,
}

impl Default for ProtectOptions {
    fn default() -> Self {
        Self {
            mode: ProtectMode::Basic,
            config: PerturbationConfig::default(),
            style: None,
            inject_metadata: true,
        }
    }
}

/// Wall-clock time spent in each pipeline stage.
///
/// Perturbation and signature times accumulate across retries.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageTimings {
    /// Pattern fetch and overlay mix.
    pub overlay: Duration,
    /// Multi-scale perturbation, summed over attempts.
    pub perturb: Duration,
    /// Tiled signature, summed over attempts.
    pub signature: Duration,
    /// Style disruption.
    pub style: Duration,
    /// PNG encoding.
    pub encode: Duration,
    /// Metadata injection.
    pub metadata: Duration,
    /// Whole pipeline.
    pub total: Duration,
}

/// Quality measurements for a finished protection run.
#[derive(Debug, Clone, Serialize)]
pub struct QualityStats {
    /// PSNR of the perturbed pixels against the input, in dB.
    pub psnr: f64,
    /// SSIM of the final pixels against the input.
    pub ssim: f64,
    /// Perturbation attempts used (1 means no retry was needed).
    pub attempts: u32,
    /// Amplitude multiplier of the accepted attempt.
    pub amplitude_multiplier: f32,
    /// Whether the universal pattern overlay was actually mixed in.
    pub overlay_applied: bool,
    /// Size of the encoded output, in bytes.
    pub output_size: usize,
    /// Per-stage timings.
    pub timings: StageTimings,
}

/// A finished protection run: encoded bytes plus its quality record.
#[derive(Debug, Clone)]
pub struct Protected {
    /// The protected image, PNG encoded.
    pub bytes: Vec<u8>,
    /// Quality and timing measurements.
    pub stats: QualityStats,
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the processed file.
    pub path: PathBuf,
    /// Whether processing succeeded.
    pub success: bool,
    /// Human-readable status message.
    pub message: String,
    /// Quality stats, present on success.
    pub stats: Option<QualityStats>,
}

/// The protection engine.
///
/// Create once and reuse across images. The optional fetcher supplies
/// universal pattern bytes for strong mode; without one, strong mode
/// silently degrades to basic.
pub struct ProtectionEngine {
    fetcher: Option<Box<dyn PatternFetcher>>,
}

impl Default for ProtectionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtectionEngine {
    /// Create an engine with no pattern source.
    #[must_use]
    pub fn new() -> Self {
        Self { fetcher: None }
    }

    /// Create an engine that can fetch universal patterns.
    #[must_use]
    pub fn with_fetcher(fetcher: Box<dyn PatternFetcher>) -> Self {
        Self {
            fetcher: Some(fetcher),
        }
    }

    /// Run the full pipeline over decoded pixels.
    ///
    /// Stages: optional overlay, perturbation plus signature inside the
    /// quality retry loop, optional style disruption, PNG encode,
    /// optional metadata injection. PSNR is always measured against the
    /// original input pixels, so overlay damage counts toward the
    /// quality floor.
    ///
    /// # Errors
    ///
    /// Returns an error when PNG encoding or metadata injection fails.
    /// Overlay failures never propagate; they only clear
    /// `overlay_applied` in the stats.
    pub fn protect(&self, image: &RgbaImage, options: &ProtectOptions) -> Result<Protected> {
        let started = Instant::now();
        let mut timings = StageTimings::default();

        let seed = options
            .config
            .seed
            .as_deref()
            .unwrap_or(DEFAULT_SEED)
            .to_string();

        let mut working = image.clone();
        let mut overlay_applied = false;

        if options.mode == ProtectMode::Strong {
            let stage = Instant::now();
            overlay_applied = self.try_overlay(&mut working, &options.config);
            timings.overlay = stage.elapsed();
        }

        let mut attempts = 0_u32;
        let mut multiplier = 1.0_f32;
        let (mut candidate, psnr) = loop {
            attempts += 1;
            let (perturbed, psnr) =
                self.attempt(image, &working, options, &seed, multiplier, &mut timings)?;
            if psnr >= PSNR_FLOOR || attempts > MAX_RETRIES {
                break (perturbed, psnr);
            }
            multiplier *= RETRY_FALLOFF;
        };

        if let Some(style_options) = &options.style {
            if style_options.any_enabled() {
                let stage = Instant::now();
                style::apply_style(&mut candidate, style_options, options.config.intensity, &seed);
                timings.style = stage.elapsed();
            }
        }

        let ssim = metrics::ssim(
            image.as_raw(),
            candidate.as_raw(),
            image.width(),
            image.height(),
        )?;

        let stage = Instant::now();
        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes).write_image(
            candidate.as_raw(),
            candidate.width(),
            candidate.height(),
            ExtendedColorType::Rgba8,
        )?;
        timings.encode = stage.elapsed();

        if options.inject_metadata {
            let stage = Instant::now();
            bytes = metadata::inject_metadata(&bytes, &seed)?;
            timings.metadata = stage.elapsed();
        }

        timings.total = started.elapsed();

        let stats = QualityStats {
            psnr,
            ssim,
            attempts,
            amplitude_multiplier: multiplier,
            overlay_applied,
            output_size: bytes.len(),
            timings,
        };

        Ok(Protected { bytes, stats })
    }

    /// One perturbation attempt: multi-scale pass, signature, PSNR.
    ///
    /// Pure in its inputs; the retry loop only varies `multiplier`.
    #[allow(clippy::unused_self)]
    fn attempt(
        &self,
        original: &RgbaImage,
        working: &RgbaImage,
        options: &ProtectOptions,
        seed: &str,
        multiplier: f32,
        timings: &mut StageTimings,
    ) -> Result<(RgbaImage, f64)> {
        let stage = Instant::now();
        let mut perturbed = perturb::apply_multi_scale(working, &options.config, seed, multiplier);
        timings.perturb += stage.elapsed();

        let stage = Instant::now();
        signature::apply_signature(&mut perturbed, seed);
        timings.signature += stage.elapsed();

        let psnr = metrics::psnr(original.as_raw(), perturbed.as_raw())?;
        Ok((perturbed, psnr))
    }

    /// Fetch and mix the universal pattern, degrading on any failure.
    fn try_overlay(&self, working: &mut RgbaImage, config: &PerturbationConfig) -> bool {
        let (Some(fetcher), Some(url)) = (&self.fetcher, &config.pattern_url) else {
            return false;
        };
        match fetcher.fetch(url) {
            Ok(bytes) => overlay::apply_overlay(working, &bytes, config.pattern_weight).is_ok(),
            Err(_) => false,
        }
    }

    /// Process a single image file: load, protect, save.
    ///
    /// Returns a [`ProcessResult`] instead of an error so directory runs
    /// can report per-file outcomes.
    #[must_use]
    pub fn process_file(
        &self,
        input: &Path,
        output: &Path,
        options: &ProtectOptions,
    ) -> ProcessResult {
        let mut result = ProcessResult {
            path: input.to_path_buf(),
            success: false,
            message: String::new(),
            stats: None,
        };

        let dyn_img = match image::open(input) {
            Ok(img) => img,
            Err(e) => {
                result.message = format!("Failed to load: {e}");
                return result;
            }
        };
        let rgba = dyn_img.to_rgba8();

        let protected = match self.protect(&rgba, options) {
            Ok(p) => p,
            Err(e) => {
                result.message = format!("Protection failed: {e}");
                return result;
            }
        };

        if let Some(parent) = output.parent() {
            if !parent.exists() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    result.message = format!("Failed to create output directory: {e}");
                    return result;
                }
            }
        }

        match std::fs::write(output, &protected.bytes) {
            Ok(()) => {
                result.success = true;
                result.message = format!(
                    "Protected (PSNR {:.1} dB, SSIM {:.4}, {} attempt{})",
                    protected.stats.psnr,
                    protected.stats.ssim,
                    protected.stats.attempts,
                    if protected.stats.attempts == 1 { "" } else { "s" },
                );
                result.stats = Some(protected.stats);
            }
            Err(e) => {
                result.message = format!("Failed to save: {e}");
            }
        }

        result
    }

    /// Process all supported images in a directory.
    ///
    /// Uses parallel iteration when the `cli` feature is enabled (via
    /// rayon). Outputs are written as PNG regardless of input format.
    ///
    /// # Panics
    ///
    /// Panics if any directory entry has no filename (should not happen
    /// for regular files).
    #[must_use]
    pub fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        options: &ProtectOptions,
    ) -> Vec<ProcessResult> {
        let entries: Vec<_> = match std::fs::read_dir(input_dir) {
            Ok(rd) => rd
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
                .filter(|e| is_supported_image(e.path().as_path()))
                .collect(),
            Err(e) => {
                return vec![ProcessResult {
                    path: input_dir.to_path_buf(),
                    success: false,
                    message: format!("Failed to read directory: {e}"),
                    stats: None,
                }];
            }
        };

        if !output_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(output_dir) {
                return vec![ProcessResult {
                    path: output_dir.to_path_buf(),
                    success: false,
                    message: format!("Failed to create output directory: {e}"),
                    stats: None,
                }];
            }
        }

        let output_for = |input_path: &Path| {
            let stem = input_path.file_stem().unwrap().to_string_lossy();
            output_dir.join(format!("{stem}_protected.png"))
        };

        #[cfg(feature = "cli")]
        {
            use rayon::prelude::*;
            entries
                .par_iter()
                .map(|entry| {
                    let input_path = entry.path();
                    self.process_file(&input_path, &output_for(&input_path), options)
                })
                .collect()
        }

        #[cfg(not(feature = "cli"))]
        {
            entries
                .iter()
                .map(|entry| {
                    let input_path = entry.path();
                    self.process_file(&input_path, &output_for(&input_path), options)
                })
                .collect()
        }
    }
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Generate a default output path from an input path.
///
/// Example: `"photo.jpg"` becomes `"photo_protected.png"`. Output is
/// always PNG because the metadata chunk lives in a PNG container.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_protected.png"))
}

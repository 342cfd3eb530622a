//! Protect images against unauthorized AI training.
//!
//! This crate applies deterministic, seed-keyed adversarial perturbations
//! to images: a multi-scale DCT perturbation, a tiled frequency-domain
//! signature, an optional universal pattern overlay, and optional style
//! disruption. A quality gate retries the perturbation at reduced
//! strength until PSNR clears 38 dB, and the output PNG carries a
//! metadata chunk with decoy provenance fields.
//!
//! Every stage is seeded from a caller-supplied string, so the same
//! input, seed, and settings always produce byte-identical output.
//!
//! # Quick Start
//!
//! ```no_run
//! use pixelveil::{ProtectionEngine, ProtectOptions};
//!
//! let engine = ProtectionEngine::new();
//! let img = image::open("photo.jpg").unwrap().to_rgba8();
//! let protected = engine.protect(&img, &ProtectOptions::default()).unwrap();
//! println!(
//!     "PSNR {:.1} dB, SSIM {:.4}",
//!     protected.stats.psnr, protected.stats.ssim
//! );
//! std::fs::write("photo_protected.png", &protected.bytes).unwrap();
//! ```

#![deny(missing_docs)]

pub mod color;
pub mod dct;
mod engine;
pub mod error;
pub mod metadata;
pub mod metrics;
pub mod overlay;
pub mod perturb;
pub mod presets;
pub mod rng;
pub mod signature;
pub mod style;

pub use engine::{
    default_output_path, is_supported_image, ProcessResult, ProtectMode, ProtectOptions,
    Protected, ProtectionEngine, QualityStats, StageTimings, DEFAULT_SEED, MAX_RETRIES,
    PSNR_FLOOR, RETRY_FALLOFF,
};
pub use error::{Error, Result};
pub use overlay::PatternFetcher;
pub use perturb::PerturbationConfig;
pub use presets::{Preset, PresetMode};
pub use style::StyleOptions;

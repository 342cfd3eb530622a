//! Named intensity presets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named protection strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetMode {
    /// Subtle protection, minimal visible change.
    Light,
    /// Balanced protection and quality.
    Standard,
    /// Strongest protection, visible artifacts possible.
    Maximum,
}

/// The concrete settings behind a preset.
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    /// Display name.
    pub label: &'static str,
    /// One-line description for CLI help output.
    pub description: &'static str,
    /// Perturbation intensity on the 0..=100 scale.
    pub intensity: f32,
}

const LIGHT: Preset = Preset {
    label: "light",
    description: "subtle protection, minimal visible change",
    intensity: 40.0,
};

const STANDARD: Preset = Preset {
    label: "standard",
    description: "balanced protection and quality",
    intensity: 70.0,
};

const MAXIMUM: Preset = Preset {
    label: "maximum",
    description: "strongest protection, visible artifacts possible",
    intensity: 100.0,
};

impl PresetMode {
    /// The preset used when none is requested.
    pub const DEFAULT: Self = Self::Standard;

    /// Look up the settings for this preset.
    #[must_use]
    pub fn preset(self) -> &'static Preset {
        match self {
            Self::Light => &LIGHT,
            Self::Standard => &STANDARD,
            Self::Maximum => &MAXIMUM,
        }
    }
}

impl fmt::Display for PresetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.preset().label)
    }
}

impl FromStr for PresetMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "standard" => Ok(Self::Standard),
            "maximum" => Ok(Self::Maximum),
            other => Err(format!(
                "unknown preset '{other}' (expected light, standard, or maximum)"
            )),
        }
    }
}

//! Output quality presets.

use std::fmt;
use std::str::FromStr;

/// Quality preset selecting the zoom at which tiles start being quantized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Quality {
    /// Quantize from zoom 8.
    Low,
    /// Quantize from zoom 12.
    #[default]
    Medium,
    /// Never quantize in practice.
    High,
}

impl Quality {
    /// Zoom level at or above which tiles are palette-reduced.
    pub fn reduce_threshold(self) -> u8 {
        match self {
            Quality::Low => 8,
            Quality::Medium => 12,
            Quality::High => 100,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "l" => Ok(Quality::Low),
            "medium" | "m" => Ok(Quality::Medium),
            "high" | "h" => Ok(Quality::High),
            other => Err(format!(
                "unknown quality '{}', expected low, medium or high",
                other
            )),
        }
    }
}

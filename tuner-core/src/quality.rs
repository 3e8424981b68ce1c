//! # Tuning Quality Module
//!
//! Buckets a cents deviation into one of four quality tiers. The tiers drive
//! the indicator color and the pass/fail "in tune" state in the presentation
//! layer; the tuner itself never renders anything.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality tier of a tuning reading, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TuningQuality {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

/// An sRGB display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Formats the color as `#RRGGBB`.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl TuningQuality {
    /// Whether a note at this tier counts as "in tune".
    pub fn is_in_tune(self) -> bool {
        self != TuningQuality::Poor
    }

    /// Indicator color: two greens, amber, red.
    pub fn color(self) -> Color {
        match self {
            TuningQuality::Excellent => Color::rgb(0x22, 0xC5, 0x5E),
            TuningQuality::Good => Color::rgb(0x84, 0xCC, 0x16),
            TuningQuality::Acceptable => Color::rgb(0xF5, 0x9E, 0x0B),
            TuningQuality::Poor => Color::rgb(0xEF, 0x44, 0x44),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TuningQuality::Excellent => "excellent",
            TuningQuality::Good => "good",
            TuningQuality::Acceptable => "acceptable",
            TuningQuality::Poor => "poor",
        }
    }
}

impl fmt::Display for TuningQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Upper bounds (inclusive, absolute cents) of the first three tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    pub excellent: f32,
    pub good: f32,
    pub acceptable: f32,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            excellent: 5.0,
            good: 10.0,
            acceptable: 15.0,
        }
    }
}

impl QualityThresholds {
    /// Checks that the thresholds are finite, non-negative and strictly increasing.
    pub fn is_valid(&self) -> bool {
        [self.excellent, self.good, self.acceptable]
            .iter()
            .all(|t| t.is_finite() && *t >= 0.0)
            && self.excellent < self.good
            && self.good < self.acceptable
    }

    /// Classifies a cents deviation. The sign is ignored; non-finite input is poor.
    pub fn classify(&self, cents: f32) -> TuningQuality {
        let deviation = cents.abs();
        if !deviation.is_finite() {
            TuningQuality::Poor
        } else if deviation <= self.excellent {
            TuningQuality::Excellent
        } else if deviation <= self.good {
            TuningQuality::Good
        } else if deviation <= self.acceptable {
            TuningQuality::Acceptable
        } else {
            TuningQuality::Poor
        }
    }
}

/// Classifies a cents deviation against the default thresholds.
pub fn classify(cents: f32) -> TuningQuality {
    QualityThresholds::default().classify(cents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_inclusive() {
        assert_eq!(classify(5.0), TuningQuality::Excellent);
        assert_eq!(classify(5.01), TuningQuality::Good);
        assert_eq!(classify(10.0), TuningQuality::Good);
        assert_eq!(classify(10.01), TuningQuality::Acceptable);
        assert_eq!(classify(15.0), TuningQuality::Acceptable);
        assert_eq!(classify(15.01), TuningQuality::Poor);
    }

    #[test]
    fn sign_is_ignored() {
        assert_eq!(classify(-4.9), TuningQuality::Excellent);
        assert_eq!(classify(-12.0), TuningQuality::Acceptable);
        assert_eq!(classify(-40.0), TuningQuality::Poor);
    }

    #[test]
    fn poor_is_never_in_tune() {
        assert!(!TuningQuality::Poor.is_in_tune());
        assert!(!classify(f32::NAN).is_in_tune());
        assert!(!classify(f32::INFINITY).is_in_tune());
        for quality in [TuningQuality::Excellent, TuningQuality::Good, TuningQuality::Acceptable] {
            assert!(quality.is_in_tune());
        }
    }

    #[test]
    fn tiers_are_ordered_and_colored() {
        assert!(TuningQuality::Excellent < TuningQuality::Good);
        assert!(TuningQuality::Acceptable < TuningQuality::Poor);
        assert_eq!(TuningQuality::Poor.color().to_hex(), "#EF4444");
        assert_eq!(TuningQuality::Excellent.color().to_hex(), "#22C55E");
    }

    #[test]
    fn custom_thresholds() {
        let strict = QualityThresholds { excellent: 1.0, good: 2.0, acceptable: 3.0 };
        assert!(strict.is_valid());
        assert_eq!(strict.classify(2.5), TuningQuality::Acceptable);
        assert_eq!(strict.classify(4.0), TuningQuality::Poor);

        let inverted = QualityThresholds { excellent: 10.0, good: 5.0, acceptable: 15.0 };
        assert!(!inverted.is_valid());
    }
}

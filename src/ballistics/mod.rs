use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One calibration sample of a range table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallisticRow {
    pub range: f64,    // meters
    pub mill: f64,     // mils at zero altitude difference
    pub diff100m: f64, // mils per 100 m of altitude difference
    pub eta: f64,      // seconds
}

impl BallisticRow {
    pub fn new(range: f64, mill: f64, diff100m: f64, eta: f64) -> Self {
        Self { range, mill, diff100m, eta }
    }

    pub fn is_finite(&self) -> bool {
        self.range.is_finite()
            && self.mill.is_finite()
            && self.diff100m.is_finite()
            && self.eta.is_finite()
    }

    pub fn field(&self, field: Field) -> f64 {
        match field {
            Field::Mill => self.mill,
            Field::Diff100m => self.diff100m,
            Field::Eta => self.eta,
        }
    }
}

/// Interpolated columns of a range table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Mill,
    Diff100m,
    Eta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trajectory {
    Low,
    High,
}

impl Trajectory {
    pub const ALL: [Trajectory; 2] = [Trajectory::Low, Trajectory::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Trajectory::Low => "low",
            Trajectory::High => "high",
        }
    }
}

impl fmt::Display for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Trajectory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "low" => Ok(Trajectory::Low),
            "high" => Ok(Trajectory::High),
            other => Err(format!("unknown trajectory '{other}' (expected low or high)")),
        }
    }
}

/// Firing answer for a single charge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Elevation after altitude correction.
    pub mill: f64,
    pub eta: f64,
    pub charge: u32,
    pub base_mill: f64,
    pub diff100m: f64,
}

/// Which way round the altitude difference is taken.
///
/// The correction is always `(altitude_delta / 100) * diff100m`; this only
/// decides how a front end turns two altitudes into that delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AltitudeConvention {
    /// `my_alt - target_alt`, positive when the gun sits above the target.
    #[default]
    FiringPointAboveTarget,
    /// `target_alt - my_alt`.
    TargetAboveFiringPoint,
}

impl AltitudeConvention {
    pub fn delta(&self, my_alt: f64, target_alt: f64) -> f64 {
        match self {
            AltitudeConvention::FiringPointAboveTarget => my_alt - target_alt,
            AltitudeConvention::TargetAboveFiringPoint => target_alt - my_alt,
        }
    }
}

pub fn altitude_correction(altitude_delta: f64, diff100m: f64) -> f64 {
    (altitude_delta / 100.0) * diff100m
}

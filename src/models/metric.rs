use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// A tracked measurement family. Used as the key for all per-kind state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Weight,
    BodyFat,
    Height,
    LeanMass,
    Waist,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        Self::Weight,
        Self::BodyFat,
        Self::Height,
        Self::LeanMass,
        Self::Waist,
    ];

    /// Canonical storage unit. Display conversion happens in `core::units`.
    pub fn canonical_unit(&self) -> &'static str {
        match self {
            Self::Weight | Self::LeanMass => "kg",
            Self::BodyFat => "%",
            Self::Height | Self::Waist => "cm",
        }
    }

    /// Whether the source reports this kind as a unit-interval fraction.
    pub fn is_percent_encoded(&self) -> bool {
        matches!(self, Self::BodyFat)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weight => "weight",
            Self::BodyFat => "body_fat",
            Self::Height => "height",
            Self::LeanMass => "lean_mass",
            Self::Waist => "waist",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "weight" | "w" => Ok(Self::Weight),
            "body_fat" | "bf" => Ok(Self::BodyFat),
            "height" => Ok(Self::Height),
            "lean_mass" | "lean" => Ok(Self::LeanMass),
            "waist" => Ok(Self::Waist),
            _ => anyhow::bail!(
                "unknown metric kind: {} (expected weight/body_fat/height/lean_mass/waist)",
                s
            ),
        }
    }
}

/// A locally stored measurement. `value` is in the kind's canonical unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub id: String,
    pub kind: MetricKind,
    pub value: f64,
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

impl Sample {
    pub fn new(kind: MetricKind, value: f64, date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            value,
            date,
            source_id: None,
        }
    }

    pub fn with_source(mut self, source_id: Option<String>) -> Self {
        self.source_id = source_id;
        self
    }
}

/// A sample as delivered by the external source, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub value: f64,
    pub date: DateTime<Utc>,
    pub source_id: Option<String>,
}

/// The single latest reading the source knows of.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub value: f64,
    pub date: DateTime<Utc>,
}

/// Convert a raw source value into the canonical stored value.
pub fn normalize(value: f64, percent_encoded: bool) -> f64 {
    if percent_encoded { value * 100.0 } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in MetricKind::ALL {
            assert_eq!(kind.as_str().parse::<MetricKind>().unwrap(), kind);
        }
    }

    #[test]
    fn aliases_resolve() {
        assert_eq!("w".parse::<MetricKind>().unwrap(), MetricKind::Weight);
        assert_eq!("bf".parse::<MetricKind>().unwrap(), MetricKind::BodyFat);
        assert!("steps".parse::<MetricKind>().is_err());
    }

    #[test]
    fn only_body_fat_is_percent_encoded() {
        let encoded: Vec<_> = MetricKind::ALL
            .iter()
            .filter(|k| k.is_percent_encoded())
            .collect();
        assert_eq!(encoded, vec![&MetricKind::BodyFat]);
        assert!((normalize(0.235, true) - 23.5).abs() < 1e-9);
        assert!((normalize(72.4, false) - 72.4).abs() < 1e-9);
    }
}

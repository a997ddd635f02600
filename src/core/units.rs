use crate::models::config::Units;
use crate::models::metric::MetricKind;

const KG_TO_LBS: f64 = 2.20462;
const IN_TO_CM: f64 = 2.54;

/// Convert a canonical value to display value + display unit string.
pub fn to_display(value: f64, kind: MetricKind, units: &Units) -> (f64, String) {
    if !units.is_imperial() {
        return (round1(value), kind.canonical_unit().to_string());
    }

    match kind {
        MetricKind::Weight | MetricKind::LeanMass => (round1(value * KG_TO_LBS), "lbs".to_string()),
        MetricKind::Height | MetricKind::Waist => (round1(value / IN_TO_CM), "in".to_string()),
        MetricKind::BodyFat => (round1(value), "%".to_string()),
    }
}

/// Return the display unit string for a kind in the active unit system.
pub fn display_unit(kind: MetricKind, units: &Units) -> String {
    to_display(0.0, kind, units).1
}

/// Convert a user-input value (in their configured unit system) to the
/// canonical unit.
pub fn from_input(value: f64, kind: MetricKind, units: &Units) -> f64 {
    if !units.is_imperial() {
        return value;
    }

    match kind {
        MetricKind::Weight | MetricKind::LeanMass => value / KG_TO_LBS,
        MetricKind::Height | MetricKind::Waist => value * IN_TO_CM,
        MetricKind::BodyFat => value,
    }
}

/// Convert a canonical value into what the source expects on write.
/// Percent-encoded kinds are stored there as unit-interval fractions.
pub fn to_source(value: f64, kind: MetricKind) -> f64 {
    if kind.is_percent_encoded() {
        value / 100.0
    } else {
        value
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

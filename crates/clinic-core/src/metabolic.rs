//! Metabolic derivations: BMR, TDEE, and BMI.
//!
//! BMR uses the Schofield weight-based equations with three adult age bands.
//! TDEE multiplies BMR by an FAO/WHO activity factor chosen from the
//! patient's work type. All functions are pure; persistence of the results
//! is the vitals manager's job.

use crate::models::{Gender, WorkType};

/// Schofield coefficients per age band: (weight multiplier, constant).
/// Bands: 18-30, 31-60, over 60.
const SCHOFIELD_MALE: [(f64, f64); 3] = [(15.3, 679.0), (11.6, 879.0), (13.5, 487.0)];
const SCHOFIELD_FEMALE: [(f64, f64); 3] = [(14.7, 496.0), (8.7, 829.0), (10.5, 596.0)];

/// FAO/WHO activity factors per work type: soft, medium, heavy.
const ACTIVITY_MALE: [f64; 3] = [1.55, 1.78, 2.10];
const ACTIVITY_FEMALE: [f64; 3] = [1.56, 1.64, 1.82];

/// Schofield age band for an age in years.
///
/// Under-18 ages fall into the youngest adult band rather than erroring;
/// intake forms occasionally carry minors and a plausible estimate beats a
/// refusal.
fn band_index(age_years: u32) -> usize {
    if age_years <= 30 {
        0
    } else if age_years <= 60 {
        1
    } else {
        2
    }
}

/// Basal metabolic rate in kcal/day, rounded to a whole number.
pub fn bmr(gender: Gender, age_years: u32, weight_kg: f64) -> f64 {
    let table = match gender {
        Gender::Male => &SCHOFIELD_MALE,
        Gender::Female => &SCHOFIELD_FEMALE,
    };
    let (multiplier, constant) = table[band_index(age_years)];
    (multiplier * weight_kg + constant).round()
}

/// Total daily energy expenditure in kcal/day, rounded to a whole number.
pub fn tdee(bmr: f64, gender: Gender, work_type: WorkType) -> f64 {
    let factors = match gender {
        Gender::Male => &ACTIVITY_MALE,
        Gender::Female => &ACTIVITY_FEMALE,
    };
    let factor = match work_type {
        WorkType::Soft => factors[0],
        WorkType::Medium => factors[1],
        WorkType::Heavy => factors[2],
    };
    (bmr * factor).round()
}

/// Body mass index, rounded to one decimal. None for non-positive inputs.
pub fn bmi(weight_kg: f64, height_cm: f64) -> Option<f64> {
    if weight_kg <= 0.0 || height_cm <= 0.0 {
        return None;
    }
    let height_m = height_cm / 100.0;
    Some((weight_kg / (height_m * height_m) * 10.0).round() / 10.0)
}

/// Resolve a free-text work-type label, falling back to the soft band when
/// the label is unrecognized.
pub fn resolve_work_type(label: &str) -> WorkType {
    match WorkType::parse(label) {
        Some(work_type) => work_type,
        None => {
            tracing::debug!(label, "unrecognized work type, using soft activity band");
            WorkType::Soft
        }
    }
}

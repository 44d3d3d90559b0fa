//! Laboratory result text drawn against age- and sex-specific reference ranges.

use super::{Demographics, Sex};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

/// Chance that a numeric analyte is drawn outside its reference range.
const ABNORMAL_PROBABILITY: f64 = 0.15;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Range {
    low: Option<f64>,
    high: Option<f64>,
}

impl Range {
    const fn between(low: f64, high: f64) -> Self {
        Self {
            low: Some(low),
            high: Some(high),
        }
    }

    const fn below(high: f64) -> Self {
        Self {
            low: None,
            high: Some(high),
        }
    }

    const fn above(low: f64) -> Self {
        Self {
            low: Some(low),
            high: None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Analyte {
    name: &'static str,
    unit: &'static str,
    range: Range,
    decimals: usize,
}

const fn analyte(name: &'static str, unit: &'static str, range: Range, decimals: usize) -> Analyte {
    Analyte {
        name,
        unit,
        range,
        decimals,
    }
}

type Qualitative = (&'static str, &'static [&'static str]);

enum Panel {
    Numeric(Vec<Analyte>),
    Qualitative(&'static [Qualitative]),
}

const VIROLOGY_SCREEN: &[Qualitative] = &[
    ("Hepatitis B surface antigen", &["NOT DETECTED"]),
    ("Hepatitis C antibody", &["NOT DETECTED"]),
    ("HIV 1&2 antibody/antigen", &["NOT DETECTED"]),
];

const URINE_DIPSTICK: &[Qualitative] = &[
    ("Protein", &["NEGATIVE", "NEGATIVE", "TRACE", "+", "++"]),
    ("Glucose", &["NEGATIVE", "NEGATIVE", "TRACE", "+"]),
    ("Blood", &["NEGATIVE", "NEGATIVE", "TRACE", "+"]),
    ("Leucocytes", &["NEGATIVE", "NEGATIVE", "TRACE", "+"]),
];

fn psa_upper_limit(age: u8) -> f64 {
    match age {
        0..=49 => 2.5,
        50..=59 => 3.5,
        60..=69 => 4.5,
        _ => 6.5,
    }
}

fn panel(code: &str, demographics: &Demographics) -> Option<Panel> {
    let male = demographics.sex == Sex::Male;
    let age = f64::from(demographics.age);

    let analytes = match code {
        "FBC" => vec![
            analyte("White cell count", "x10^9/L", Range::between(4.0, 11.0), 1),
            if male {
                analyte("Haemoglobin", "g/L", Range::between(130.0, 180.0), 0)
            } else {
                analyte("Haemoglobin", "g/L", Range::between(115.0, 165.0), 0)
            },
            analyte("Platelets", "x10^9/L", Range::between(150.0, 400.0), 0),
        ],
        "U&E" => vec![
            analyte("Sodium", "mmol/L", Range::between(135.0, 145.0), 0),
            analyte("Potassium", "mmol/L", Range::between(3.5, 5.3), 1),
            analyte("Urea", "mmol/L", Range::between(2.5, 7.8), 1),
            if male {
                analyte("Creatinine", "umol/L", Range::between(59.0, 104.0), 0)
            } else {
                analyte("Creatinine", "umol/L", Range::between(45.0, 84.0), 0)
            },
        ],
        "LFT" => vec![
            analyte("ALT", "U/L", Range::below(40.0), 0),
            analyte("ALP", "U/L", Range::between(30.0, 130.0), 0),
            analyte("Bilirubin", "umol/L", Range::below(21.0), 0),
            analyte("Albumin", "g/L", Range::between(35.0, 50.0), 0),
        ],
        "TFT" => vec![
            analyte("TSH", "mU/L", Range::between(0.27, 4.2), 2),
            analyte("Free T4", "pmol/L", Range::between(12.0, 22.0), 1),
        ],
        "LIPIDS" => vec![
            analyte("Total cholesterol", "mmol/L", Range::below(5.0), 1),
            analyte("LDL cholesterol", "mmol/L", Range::below(3.0), 1),
            if male {
                analyte("HDL cholesterol", "mmol/L", Range::above(1.0), 1)
            } else {
                analyte("HDL cholesterol", "mmol/L", Range::above(1.2), 1)
            },
            analyte("Triglycerides", "mmol/L", Range::below(1.7), 1),
        ],
        "HBA1C" => vec![analyte("HbA1c", "mmol/mol", Range::between(20.0, 42.0), 0)],
        "INR" => vec![analyte("INR", "", Range::between(0.8, 1.2), 1)],
        "CRP" => vec![analyte("CRP", "mg/L", Range::below(5.0), 1)],
        "ESR" => {
            let upper = if male { age / 2.0 } else { (age + 10.0) / 2.0 };
            vec![analyte("ESR", "mm/hr", Range::below(upper.round().max(10.0)), 0)]
        }
        "TROPONIN" => vec![if male {
            analyte("hs Troponin I", "ng/L", Range::below(34.0), 0)
        } else {
            analyte("hs Troponin I", "ng/L", Range::below(16.0), 0)
        }],
        "GLUCOSE" => vec![analyte("Glucose (random)", "mmol/L", Range::between(3.5, 7.8), 1)],
        "TSH" => vec![analyte("TSH", "mU/L", Range::between(0.27, 4.2), 2)],
        "PSA" => vec![analyte(
            "PSA",
            "ug/L",
            Range::below(psa_upper_limit(demographics.age)),
            2,
        )],
        "MHH" => return Some(Panel::Qualitative(VIROLOGY_SCREEN)),
        "URINALYSIS" => return Some(Panel::Qualitative(URINE_DIPSTICK)),
        _ => return None,
    };
    Some(Panel::Numeric(analytes))
}

fn round_to(value: f64, decimals: usize) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn draw(range: Range, decimals: usize, rng: &mut dyn RngCore) -> f64 {
    let abnormal = rng.gen_bool(ABNORMAL_PROBABILITY);
    let value = match (range.low, range.high, abnormal) {
        (Some(low), Some(high), false) => rng.gen_range(low..=high),
        (None, Some(high), false) => rng.gen_range(high * 0.2..=high),
        (Some(low), None, false) => rng.gen_range(low..=low * 2.0),
        (Some(low), Some(high), true) => {
            if rng.gen_bool(0.5) {
                rng.gen_range(high * 1.05..=high * 1.6)
            } else {
                rng.gen_range(low * 0.6..=low * 0.95)
            }
        }
        (None, Some(high), true) => rng.gen_range(high * 1.1..=high * 4.0),
        (Some(low), None, true) => rng.gen_range(low * 0.5..=low * 0.95),
        (None, None, _) => rng.gen_range(0.0..=1.0),
    };
    round_to(value, decimals)
}

fn flag(value: f64, range: Range) -> Option<&'static str> {
    if range.high.is_some_and(|high| value > high) {
        Some("H")
    } else if range.low.is_some_and(|low| value < low) {
        Some("L")
    } else {
        None
    }
}

fn with_unit(value: String, unit: &str) -> String {
    if unit.is_empty() {
        value
    } else {
        format!("{value} {unit}")
    }
}

/// Result narrative for a lab test code, or `None` for codes without a panel.
pub(super) fn result_text(
    code: &str,
    demographics: &Demographics,
    rng: &mut dyn RngCore,
) -> Option<String> {
    let parts: Vec<String> = match panel(code, demographics)? {
        Panel::Numeric(analytes) => analytes
            .iter()
            .map(|a| {
                let value = draw(a.range, a.decimals, rng);
                let rendered = with_unit(format!("{:.*}", a.decimals, value), a.unit);
                match flag(value, a.range) {
                    Some(f) => format!("{}: {rendered} ({f})", a.name),
                    None => format!("{}: {rendered}", a.name),
                }
            })
            .collect(),
        Panel::Qualitative(items) => items
            .iter()
            .map(|(name, outcomes)| {
                let outcome = outcomes.choose(&mut *rng).copied().unwrap_or("NOT TESTED");
                format!("{name}: {outcome}")
            })
            .collect(),
    };
    Some(parts.join(", "))
}

/// Reference range text for OBX.7, or `None` for codes without numeric ranges.
pub(super) fn reference_range(code: &str, demographics: &Demographics) -> Option<String> {
    let Panel::Numeric(analytes) = panel(code, demographics)? else {
        return None;
    };
    let parts: Vec<String> = analytes
        .iter()
        .map(|a| {
            let bounds = match (a.range.low, a.range.high) {
                (Some(low), Some(high)) => {
                    format!("{:.*}-{:.*}", a.decimals, low, a.decimals, high)
                }
                (None, Some(high)) => format!("<{:.*}", a.decimals, high),
                (Some(low), None) => format!(">{:.*}", a.decimals, low),
                (None, None) => String::new(),
            };
            format!("{} {}", a.name, with_unit(bounds, a.unit))
        })
        .collect();
    Some(parts.join(", "))
}

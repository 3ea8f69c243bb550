//! Categorical encoding tables and value coercion
//!
//! Every categorical field has a fixed lookup table. Unknown or empty values
//! encode to 0 instead of failing, so a record with an unexpected category
//! still produces a full-length vector.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

/// Age in months below which an animal is a baby
const BABY_MAX_MONTHS: f64 = 6.0;
/// Age in months below which an animal is young
const YOUNG_MAX_MONTHS: f64 = 24.0;
/// Age in months below which an animal is an adult
const ADULT_MAX_MONTHS: f64 = 96.0;
const DAYS_PER_MONTH: f64 = 30.4;
const WEEKS_PER_MONTH: f64 = 4.345;
/// Bare integers at or above this read as a calendar year, not an age
const FIRST_YEAR_LIKE: f64 = 1000.0;

static AGE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn age_pattern() -> &'static Regex {
    AGE_PATTERN.get_or_init(|| {
        Regex::new(r"(\d+(?:\.\d+)?)\s*(days?|d|weeks?|wks?|w|months?|mos?|years?|yrs?|y)\b")
            .expect("age pattern is valid")
    })
}

fn normalize_token(text: &str) -> String {
    text.trim().to_ascii_lowercase().replace(['_', ' '], "-")
}

/// species: dog=2, cat=1, anything else=0
pub fn encode_species(species: &str) -> u8 {
    match normalize_token(species).as_str() {
        "dog" => 2,
        "cat" => 1,
        _ => 0,
    }
}

/// size: small=0, medium=1, large=2, extra-large=3
pub fn encode_size(size: &str) -> u8 {
    match normalize_token(size).as_str() {
        "small" | "s" => 0,
        "medium" | "m" => 1,
        "large" | "l" => 2,
        "extra-large" | "extralarge" | "xl" => 3,
        _ => 0,
    }
}

/// Ordinal age bucket derived from free-form age text
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgeCategory {
    Baby,
    Young,
    Adult,
    Senior,
}

impl AgeCategory {
    pub fn code(&self) -> u8 {
        match self {
            AgeCategory::Baby => 0,
            AgeCategory::Young => 1,
            AgeCategory::Adult => 2,
            AgeCategory::Senior => 3,
        }
    }

    fn from_months(months: f64) -> Self {
        if months < BABY_MAX_MONTHS {
            AgeCategory::Baby
        } else if months < YOUNG_MAX_MONTHS {
            AgeCategory::Young
        } else if months < ADULT_MAX_MONTHS {
            AgeCategory::Adult
        } else {
            AgeCategory::Senior
        }
    }
}

/// Normalize free-form age text ("2 years", "5 months", "puppy") to a category
///
/// A number with a unit wins over keywords so that "10 years old" is not
/// read as the keyword "old". A number without a unit counts as years only
/// when it is the whole text, and never when it looks like a year such as
/// "2023". Unparseable text is treated as an adult.
pub fn normalize_age(text: &str) -> AgeCategory {
    let lowered = text.trim().to_ascii_lowercase();

    if let Some(caps) = age_pattern().captures(&lowered) {
        if let Ok(amount) = caps[1].parse::<f64>() {
            let unit = &caps[2];
            let months = if unit.starts_with('d') {
                amount / DAYS_PER_MONTH
            } else if unit.starts_with('w') {
                amount / WEEKS_PER_MONTH
            } else if unit.starts_with('m') {
                amount
            } else {
                amount * 12.0
            };
            return AgeCategory::from_months(months);
        }
    }

    for word in lowered.split(|c: char| !c.is_ascii_alphanumeric()) {
        match word {
            "puppy" | "kitten" | "baby" | "newborn" => return AgeCategory::Baby,
            "young" | "juvenile" => return AgeCategory::Young,
            "adult" => return AgeCategory::Adult,
            "senior" | "elderly" | "old" => return AgeCategory::Senior,
            _ => {}
        }
    }

    match lowered.parse::<f64>() {
        Ok(years) if years.is_finite() && years >= 0.0 => {
            let year_like = !lowered.contains('.') && years >= FIRST_YEAR_LIKE;
            if year_like {
                AgeCategory::Adult
            } else {
                AgeCategory::from_months(years * 12.0)
            }
        }
        _ => AgeCategory::Adult,
    }
}

/// Ordinal energy level of a behavior profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl EnergyLevel {
    pub const ALL: [EnergyLevel; 4] = [
        EnergyLevel::Low,
        EnergyLevel::Medium,
        EnergyLevel::High,
        EnergyLevel::VeryHigh,
    ];

    pub fn parse(text: &str) -> Option<Self> {
        match normalize_token(text).as_str() {
            "low" => Some(EnergyLevel::Low),
            "medium" | "moderate" => Some(EnergyLevel::Medium),
            "high" => Some(EnergyLevel::High),
            "very-high" | "veryhigh" => Some(EnergyLevel::VeryHigh),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn from_code(code: u8) -> Self {
        Self::ALL[usize::from(code.min(3))]
    }

    pub fn label(&self) -> &'static str {
        match self {
            EnergyLevel::Low => "Low",
            EnergyLevel::Medium => "Medium",
            EnergyLevel::High => "High",
            EnergyLevel::VeryHigh => "Very high",
        }
    }
}

/// energy: low=0, medium=1, high=2, very-high=3
pub fn encode_energy(text: &str) -> u8 {
    EnergyLevel::parse(text).map(|e| e.code()).unwrap_or(0)
}

/// Ordinal training level of a behavior profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TrainingLevel {
    None,
    Basic,
    Intermediate,
    Advanced,
}

impl TrainingLevel {
    pub const ALL: [TrainingLevel; 4] = [
        TrainingLevel::None,
        TrainingLevel::Basic,
        TrainingLevel::Intermediate,
        TrainingLevel::Advanced,
    ];

    pub fn parse(text: &str) -> Option<Self> {
        match normalize_token(text).as_str() {
            "none" | "untrained" => Some(TrainingLevel::None),
            "basic" => Some(TrainingLevel::Basic),
            "intermediate" => Some(TrainingLevel::Intermediate),
            "advanced" => Some(TrainingLevel::Advanced),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn from_code(code: u8) -> Self {
        Self::ALL[usize::from(code.min(3))]
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrainingLevel::None => "no",
            TrainingLevel::Basic => "basic",
            TrainingLevel::Intermediate => "intermediate",
            TrainingLevel::Advanced => "advanced",
        }
    }
}

/// training: none=0, basic=1, intermediate=2, advanced=3
pub fn encode_training(text: &str) -> u8 {
    TrainingLevel::parse(text).map(|t| t.code()).unwrap_or(0)
}

/// Tri-state flag coercion
///
/// Strings count only when they read "true", "1" or "yes" (any case).
/// Booleans map to their integer value. Everything else falls back to
/// truthiness: non-zero numbers and non-empty collections are 1, null is 0.
pub fn coerce_flag(value: &Value) -> u8 {
    match value {
        Value::String(s) => {
            let s = s.trim().to_ascii_lowercase();
            u8::from(matches!(s.as_str(), "true" | "1" | "yes"))
        }
        Value::Bool(b) => u8::from(*b),
        Value::Number(n) => u8::from(n.as_f64().map(|v| v != 0.0).unwrap_or(false)),
        Value::Array(items) => u8::from(!items.is_empty()),
        Value::Object(map) => u8::from(!map.is_empty()),
        Value::Null => 0,
    }
}

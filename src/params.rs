//! Tunable search inputs.
//!
//! [`SearchParameters`] only exposes bounds-checked setters. There is no
//! separate validation pass: whatever the user types is coerced into range
//! at the moment it is stored, so a submission can always snapshot the
//! current values as-is.
//!
//! | Field | Range | Fallback for non-numeric input |
//! |-------|-------|--------------------------------|
//! | `top_k` | `1..=20` | `5` |
//! | `min_similarity` | `0.0..=1.0` | `0.0` |
//! | `provider` | [`Provider`] | n/a (typed) |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const TOP_K_MIN: u32 = 1;
pub const TOP_K_MAX: u32 = 20;
pub const TOP_K_DEFAULT: u32 = 5;
pub const MIN_SIMILARITY_DEFAULT: f64 = 0.0;
/// Increment used by UI steppers for the similarity floor.
pub const MIN_SIMILARITY_STEP: f64 = 0.05;

/// Backend generation model selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    Groq,
    DeepSeek,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::OpenAi, Provider::Groq, Provider::DeepSeek];

    /// Wire identifier sent to the service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Groq => "groq",
            Provider::DeepSeek => "deepseek",
        }
    }

    /// Human-facing model label.
    pub fn label(&self) -> &'static str {
        match self {
            Provider::OpenAi => "GPT-4",
            Provider::Groq => "Llama-3",
            Provider::DeepSeek => "DeepSeek",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown provider '{0}' (expected openai, groq, or deepseek)")]
pub struct UnknownProvider(pub String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "groq" => Ok(Provider::Groq),
            "deepseek" => Ok(Provider::DeepSeek),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}

/// Session-scoped search inputs. Mutated only by explicit user input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParameters {
    top_k: u32,
    min_similarity: f64,
    provider: Provider,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            top_k: TOP_K_DEFAULT,
            min_similarity: MIN_SIMILARITY_DEFAULT,
            provider: Provider::default(),
        }
    }
}

impl SearchParameters {
    pub fn top_k(&self) -> u32 {
        self.top_k
    }

    pub fn min_similarity(&self) -> f64 {
        self.min_similarity
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Set the result count from raw text input.
    ///
    /// A leading integer is read the way form inputs are usually read
    /// (`"7"`, `" 12 "`, `"3 results"`); anything without one stores 5,
    /// and so does `"0"`. Returns the stored value.
    pub fn set_top_k(&mut self, raw: &str) -> u32 {
        match leading_integer(raw) {
            Some(v) => self.set_top_k_value(v),
            None => {
                self.top_k = TOP_K_DEFAULT;
                self.top_k
            }
        }
    }

    /// Set the result count from a numeric value, clamped to `1..=20`.
    /// Zero means "unset" and stores the default.
    pub fn set_top_k_value(&mut self, value: i64) -> u32 {
        self.top_k = match value {
            0 => TOP_K_DEFAULT,
            v => v.clamp(TOP_K_MIN as i64, TOP_K_MAX as i64) as u32,
        };
        self.top_k
    }

    /// Set the similarity floor from raw text input. Non-numeric input stores 0.0.
    pub fn set_min_similarity(&mut self, raw: &str) -> f64 {
        match leading_float(raw) {
            Some(v) => self.set_min_similarity_value(v),
            None => {
                self.min_similarity = MIN_SIMILARITY_DEFAULT;
                self.min_similarity
            }
        }
    }

    /// Set the similarity floor from a numeric value, clamped to `[0.0, 1.0]`.
    /// `NaN` stores 0.0.
    pub fn set_min_similarity_value(&mut self, value: f64) -> f64 {
        self.min_similarity = if value.is_nan() {
            MIN_SIMILARITY_DEFAULT
        } else {
            value.clamp(0.0, 1.0)
        };
        self.min_similarity
    }

    /// Move the similarity floor one UI step up or down.
    pub fn step_min_similarity(&mut self, up: bool) -> f64 {
        let delta = if up {
            MIN_SIMILARITY_STEP
        } else {
            -MIN_SIMILARITY_STEP
        };
        // Round to two decimals so repeated stepping doesn't drift (0.1 + 0.05 ...).
        let next = ((self.min_similarity + delta) * 100.0).round() / 100.0;
        self.set_min_similarity_value(next)
    }

    pub fn set_provider(&mut self, provider: Provider) {
        self.provider = provider;
    }
}

/// Parse the integer prefix of `raw` (optional sign then digits).
/// Values too large for `i64` saturate.
fn leading_integer(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Parse the decimal prefix of `raw`. `"inf"`/`"infinity"` are accepted;
/// `NaN` is treated as non-numeric.
fn leading_float(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if let Ok(v) = s.parse::<f64>() {
        return if v.is_nan() { None } else { Some(v) };
    }

    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'-') | Some(b'+')) {
        end = 1;
    }
    let mut seen_digit = false;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if !seen_digit {
        return None;
    }
    s[..end].trim_end_matches('.').parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = SearchParameters::default();
        assert_eq!(p.top_k(), 5);
        assert_eq!(p.min_similarity(), 0.0);
        assert_eq!(p.provider(), Provider::OpenAi);
    }

    #[test]
    fn test_provider_labels() {
        assert_eq!(Provider::OpenAi.label(), "GPT-4");
        assert_eq!(Provider::Groq.label(), "Llama-3");
        assert_eq!(Provider::DeepSeek.label(), "DeepSeek");
        for p in Provider::ALL {
            assert!(!p.label().is_empty());
        }
    }

    #[test]
    fn test_top_k_clamps() {
        let mut p = SearchParameters::default();
        assert_eq!(p.set_top_k("7"), 7);
        assert_eq!(p.set_top_k("21"), 20);
        assert_eq!(p.set_top_k("-4"), 1);
        assert_eq!(p.set_top_k(" 12 "), 12);
        assert_eq!(p.set_top_k("3 results"), 3);
        assert_eq!(p.set_top_k("99999999999999999999999"), 20);
    }

    #[test]
    fn test_top_k_non_numeric_is_five() {
        let mut p = SearchParameters::default();
        p.set_top_k("15");
        for raw in ["", "abc", "  ", "-", "x7", "."] {
            assert_eq!(p.set_top_k(raw), 5, "input {:?}", raw);
        }
    }

    #[test]
    fn test_top_k_zero_is_default() {
        let mut p = SearchParameters::default();
        p.set_top_k("12");
        assert_eq!(p.set_top_k("0"), 5);
        assert_eq!(p.top_k(), 5);
        p.set_top_k("12");
        assert_eq!(p.set_top_k(" 00 "), 5);
        assert_eq!(p.set_top_k_value(0), 5);
        // Negative values are out of range, not unset.
        assert_eq!(p.set_top_k("-1"), 1);
    }

    #[test]
    fn test_top_k_always_in_range() {
        let mut p = SearchParameters::default();
        for v in [i64::MIN, -100, -1, 0, 1, 10, 20, 21, 1000, i64::MAX] {
            let stored = p.set_top_k_value(v);
            assert!((TOP_K_MIN..=TOP_K_MAX).contains(&stored), "{} -> {}", v, stored);
            assert_eq!(p.top_k(), stored);
        }
    }

    #[test]
    fn test_min_similarity_clamps() {
        let mut p = SearchParameters::default();
        assert_eq!(p.set_min_similarity("0.35"), 0.35);
        assert_eq!(p.set_min_similarity("1.7"), 1.0);
        assert_eq!(p.set_min_similarity("-0.2"), 0.0);
        assert_eq!(p.set_min_similarity("0.5abc"), 0.5);
        assert_eq!(p.set_min_similarity(".25"), 0.25);
        assert_eq!(p.set_min_similarity("inf"), 1.0);
        assert_eq!(p.set_min_similarity("-infinity"), 0.0);
    }

    #[test]
    fn test_min_similarity_non_numeric_is_zero() {
        let mut p = SearchParameters::default();
        p.set_min_similarity("0.8");
        for raw in ["", "high", "NaN", "-", "."] {
            assert_eq!(p.set_min_similarity(raw), 0.0, "input {:?}", raw);
        }
        p.set_min_similarity("0.8");
        assert_eq!(p.set_min_similarity_value(f64::NAN), 0.0);
    }

    #[test]
    fn test_min_similarity_always_in_unit() {
        let mut p = SearchParameters::default();
        for v in [f64::NEG_INFINITY, -3.0, -0.0, 0.05, 0.5, 0.999, 1.0, 1.01, f64::INFINITY] {
            let stored = p.set_min_similarity_value(v);
            assert!((0.0..=1.0).contains(&stored), "{} -> {}", v, stored);
        }
    }

    #[test]
    fn test_step_min_similarity() {
        let mut p = SearchParameters::default();
        for _ in 0..3 {
            p.step_min_similarity(true);
        }
        assert_eq!(p.min_similarity(), 0.15);
        p.step_min_similarity(false);
        assert_eq!(p.min_similarity(), 0.1);

        p.set_min_similarity_value(0.98);
        assert_eq!(p.step_min_similarity(true), 1.0);
        p.set_min_similarity_value(0.0);
        assert_eq!(p.step_min_similarity(false), 0.0);
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("openai".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!(" Groq ".parse::<Provider>().unwrap(), Provider::Groq);
        assert_eq!("DEEPSEEK".parse::<Provider>().unwrap(), Provider::DeepSeek);
        assert!("mistral".parse::<Provider>().is_err());
        for p in Provider::ALL {
            assert_eq!(p.as_str().parse::<Provider>().unwrap(), p);
        }
    }

    #[test]
    fn test_provider_serializes_lowercase() {
        let json = serde_json::to_string(&Provider::DeepSeek).unwrap();
        assert_eq!(json, "\"deepseek\"");
    }
}

//! Resource quantity conversion.
//!
//! Converts human-readable quantities (`"500m"`, `"2"`, `"2Gi"`) into the
//! canonical integer units used throughout the simulator: millicores for
//! CPU and bytes for memory. Everything here is a pure function.

use thiserror::Error;

const BINARY_SUFFIXES: [(&str, u64); 4] = [
    ("Ki", 1 << 10),
    ("Mi", 1 << 20),
    ("Gi", 1 << 30),
    ("Ti", 1 << 40),
];

const DECIMAL_SUFFIXES: [(&str, u64); 4] = [
    ("k", 1_000),
    ("M", 1_000_000),
    ("G", 1_000_000_000),
    ("T", 1_000_000_000_000),
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuantityError {
    #[error("empty quantity")]
    Empty,
    #[error("malformed quantity: {0:?}")]
    Malformed(String),
    #[error("quantity out of range: {0:?}")]
    Overflow(String),
}

/// Parse a CPU quantity into millicores.
///
/// Accepts `"<int>m"` (millicores), `"<int>n"` (nanocores, floored to whole
/// millicores) and plain core counts, integral or fractional (`"2"`, `"0.5"`).
pub fn parse_cpu(value: &str) -> Result<u64, QuantityError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(QuantityError::Empty);
    }

    if let Some(millis) = value.strip_suffix('m') {
        return parse_integer(millis, value);
    }
    if let Some(nanos) = value.strip_suffix('n') {
        return Ok(parse_integer(nanos, value)? / 1_000_000);
    }
    scaled(value, 1_000, value)
}

/// Parse a memory quantity into bytes.
///
/// Accepts binary suffixes (`Ki`, `Mi`, `Gi`, `Ti`), decimal suffixes
/// (`k`, `M`, `G`, `T`) and plain byte counts.
pub fn parse_memory(value: &str) -> Result<u64, QuantityError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(QuantityError::Empty);
    }

    for (suffix, multiplier) in BINARY_SUFFIXES.iter().chain(DECIMAL_SUFFIXES.iter()) {
        if let Some(number) = value.strip_suffix(suffix) {
            return scaled(number, *multiplier, value);
        }
    }
    parse_integer(value, value)
}

/// Render millicores in the shortest exact form (`"2"` or `"1500m"`).
pub fn format_cpu(millicores: u64) -> String {
    if millicores % 1_000 == 0 {
        format!("{}", millicores / 1_000)
    } else {
        format!("{millicores}m")
    }
}

/// Render bytes using the largest binary suffix that divides them exactly.
pub fn format_memory(bytes: u64) -> String {
    if bytes == 0 {
        return "0".to_string();
    }
    for (suffix, multiplier) in BINARY_SUFFIXES.iter().rev() {
        if bytes % multiplier == 0 {
            return format!("{}{suffix}", bytes / multiplier);
        }
    }
    bytes.to_string()
}

fn parse_integer(number: &str, input: &str) -> Result<u64, QuantityError> {
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(QuantityError::Malformed(input.to_string()));
    }
    number
        .parse::<u64>()
        .map_err(|_| QuantityError::Overflow(input.to_string()))
}

/// Multiply an integral or fractional number by `multiplier`.
fn scaled(number: &str, multiplier: u64, input: &str) -> Result<u64, QuantityError> {
    if number.contains('.') {
        let valid = number.bytes().all(|b| b.is_ascii_digit() || b == b'.')
            && number.bytes().filter(|b| *b == b'.').count() == 1
            && number.bytes().any(|b| b.is_ascii_digit());
        if !valid {
            return Err(QuantityError::Malformed(input.to_string()));
        }
        let parsed: f64 = number
            .parse()
            .map_err(|_| QuantityError::Malformed(input.to_string()))?;
        let total = (parsed * multiplier as f64).round();
        // u64::MAX as f64 rounds up to 2^64, which is already out of range.
        if !total.is_finite() || total >= u64::MAX as f64 {
            return Err(QuantityError::Overflow(input.to_string()));
        }
        return Ok(total as u64);
    }

    parse_integer(number, input)?
        .checked_mul(multiplier)
        .ok_or_else(|| QuantityError::Overflow(input.to_string()))
}

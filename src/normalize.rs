//! Conversion of raw page text into typed values.
//!
//! Every function here degrades to `None` on malformed input and logs the
//! offending text; none of them return errors.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

/// Format of the "Last report" cell, e.g. `Jan 05, 2024 13:07 UTC`
pub const REPORT_DATE_FORMAT: &str = "%b %d, %Y %H:%M UTC";

const COMPASS: [char; 4] = ['N', 'S', 'E', 'W'];

/// Convert a coordinate suffixed with a compass letter into signed degrees.
///
/// `S` and `W` are negative, `N` and `E` positive. When both kinds of marker
/// are present the negative one wins.
pub fn sign_coordinate(text: &str) -> Option<f64> {
    let text = text.trim();
    let direction = if text.contains(['S', 'W']) {
        -1.0
    } else if text.contains(['N', 'E']) {
        1.0
    } else {
        warn!("could not find compass direction in coordinate {:?}", text);
        return None;
    };

    let number = text.trim_end_matches(|c: char| COMPASS.contains(&c) || c.is_whitespace());
    match number.parse::<f64>() {
        Ok(value) => Some(value * direction),
        Err(_) => {
            warn!("could not extract coordinate from {:?}", text);
            None
        }
    }
}

/// Parse `raw` as `T`, logging the field name on failure
pub fn parse_number<T: FromStr>(field: &str, raw: &str) -> Option<T> {
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("could not extract {} from {:?}", field, raw);
            None
        }
    }
}

pub fn parse_float(field: &str, raw: &str) -> Option<f64> {
    parse_number(field, raw)
}

pub fn parse_int(field: &str, raw: &str) -> Option<i32> {
    parse_number(field, raw)
}

/// Parse a report timestamp in [`REPORT_DATE_FORMAT`]
pub fn parse_timestamp(field: &str, raw: &str) -> Option<DateTime<Utc>> {
    match NaiveDateTime::parse_from_str(raw.trim(), REPORT_DATE_FORMAT) {
        Ok(naive) => Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)),
        Err(e) => {
            warn!("could not extract {} from {:?}: {}", field, raw, e);
            None
        }
    }
}

/// Trimmed text, `None` if empty
pub fn parse_text(field: &str, raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        warn!("could not find {}", field);
        return None;
    }
    Some(trimmed.to_string())
}

/// Strip the unit from a quantity such as `10.1 kn` or `9m`
pub fn quantity(raw: &str) -> &str {
    raw.split_whitespace()
        .next()
        .unwrap_or("")
        .trim_end_matches(|c: char| c.is_ascii_alphabetic())
}

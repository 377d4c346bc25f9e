//! Timestamp column decoding.
//!
//! Exports carry timestamps either as unit-less epoch numbers or as date/time
//! text. The unit is decided once per column from the median magnitude of its
//! numeric values; a column is never decoded with mixed rules.

use tank_domain::domain::TimestampEncoding;
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    PrimitiveDateTime, UtcOffset,
};

const MICROS_THRESHOLD: f64 = 1e14;
const MILLIS_THRESHOLD: f64 = 1e11;
const SECONDS_THRESHOLD: f64 = 1e8;

/// A decoded column: one slot per input value, `None` where the value could
/// not be decoded under the column's encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedColumn {
    pub instants: Vec<Option<OffsetDateTime>>,
    pub encoding: TimestampEncoding,
}

impl DecodedColumn {
    pub fn invalid_count(&self) -> usize {
        self.instants.iter().filter(|i| i.is_none()).count()
    }

    pub fn all_invalid(&self) -> bool {
        self.instants.iter().all(Option::is_none)
    }
}

fn as_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Picks the encoding for a whole column.
pub fn detect_encoding<S: AsRef<str>>(values: &[S]) -> TimestampEncoding {
    let numeric: Vec<f64> = values.iter().filter_map(|v| as_number(v.as_ref())).collect();
    match median(numeric) {
        Some(m) if m >= MICROS_THRESHOLD => TimestampEncoding::EpochMicros,
        Some(m) if m >= MILLIS_THRESHOLD => TimestampEncoding::EpochMillis,
        Some(m) if m >= SECONDS_THRESHOLD => TimestampEncoding::EpochSeconds,
        _ => TimestampEncoding::GenericDatetime,
    }
}

/// Decodes every value of a column under a single detected encoding.
pub fn decode_column<S: AsRef<str>>(values: &[S]) -> DecodedColumn {
    let encoding = detect_encoding(values);
    let instants = values
        .iter()
        .map(|v| decode_value(v.as_ref(), encoding))
        .collect();
    DecodedColumn { instants, encoding }
}

pub fn decode_value(value: &str, encoding: TimestampEncoding) -> Option<OffsetDateTime> {
    match encoding.nanos_per_unit() {
        Some(scale) => {
            // Whole units are scaled exactly; only the fraction goes through
            // float rounding.
            let number = as_number(value)?;
            let whole = number.trunc();
            let fraction = ((number - whole) * scale as f64).round() as i128;
            let nanos = (whole as i128).checked_mul(scale)?.checked_add(fraction)?;
            OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
        }
        None => parse_datetime_text(value),
    }
}

/// Parses the date/time spellings found in exports. Text without an offset is
/// taken as UTC; text with one is converted to UTC.
pub fn parse_datetime_text(text: &str) -> Option<OffsetDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(ts) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(ts.to_offset(UtcOffset::UTC));
    }

    let with_offset = OffsetDateTime::parse(
        text,
        format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]][offset_hour sign:mandatory]:[offset_minute]"
        ),
    )
    .or_else(|_| {
        OffsetDateTime::parse(
            text,
            format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]][offset_hour sign:mandatory][offset_minute]"
            ),
        )
    });
    if let Ok(ts) = with_offset {
        return Some(ts.to_offset(UtcOffset::UTC));
    }

    if let Some(naive) = parse_naive(text) {
        return Some(naive.assume_utc());
    }

    parse_date(text).map(|d| d.midnight().assume_utc())
}

fn parse_naive(text: &str) -> Option<PrimitiveDateTime> {
    PrimitiveDateTime::parse(
        text,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(
            text,
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"),
        )
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(text, format_description!("[year]-[month]-[day] [hour]:[minute]"))
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(text, format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(
            text,
            format_description!("[year]/[month]/[day] [hour]:[minute]:[second]"),
        )
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(
            text,
            format_description!("[day]/[month]/[year] [hour]:[minute]:[second]"),
        )
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(text, format_description!("[day]/[month]/[year] [hour]:[minute]"))
    })
    .ok()
}

fn parse_date(text: &str) -> Option<Date> {
    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .or_else(|_| Date::parse(text, format_description!("[year]/[month]/[day]")))
        .or_else(|_| Date::parse(text, format_description!("[day]/[month]/[year]")))
        .ok()
}

/// True for a date without a time of day, e.g. `2024-02-20`.
pub fn is_bare_date(text: &str) -> bool {
    let text = text.trim();
    text.len() == 10 && parse_date(text).is_some()
}

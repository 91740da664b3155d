//! Text to typed literal conversion

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use mitre_ontology::{Datatype, Literal};
use mitre_xsd::XsdType;

use crate::{Error, Result};

/// Datatype of literals produced from a built-in schema type
#[must_use]
pub fn datatype_of(source: XsdType) -> Datatype {
    match source {
        XsdType::Integer | XsdType::GYear | XsdType::GMonth | XsdType::GDay => Datatype::Integer,
        XsdType::Decimal => Datatype::Decimal,
        XsdType::Double => Datatype::Double,
        XsdType::Boolean => Datatype::Boolean,
        XsdType::Date => Datatype::Date,
        XsdType::DateTime => Datatype::DateTime,
        XsdType::Time => Datatype::Time,
        XsdType::AnyUri => Datatype::AnyUri,
        XsdType::AnyType => Datatype::XmlLiteral,
        XsdType::String
        | XsdType::Token
        | XsdType::Id
        | XsdType::IdRef
        | XsdType::IdRefs
        | XsdType::AnySimpleType => Datatype::String,
    }
}

/// Convert element or attribute text to a literal
///
/// Empty text yields `None`. Text that is not a valid lexical form of the
/// datatype is an [`Error::InvalidLiteral`].
///
/// # Errors
///
/// Returns [`Error::InvalidLiteral`] when validation fails.
pub fn convert(text: &str, datatype: Datatype, source: XsdType) -> Result<Option<Literal>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let lexical = match datatype {
        Datatype::Integer => {
            // gMonth `--05` and gDay `---17` fold to plain integers
            let folded = match source {
                XsdType::GYear | XsdType::GMonth | XsdType::GDay => trimmed.replace('-', ""),
                _ => trimmed.to_string(),
            };
            canonical_integer(&folded).ok_or_else(|| Error::invalid_literal(trimmed, datatype))?
        }
        Datatype::Decimal => {
            if !is_decimal(trimmed) {
                return Err(Error::invalid_literal(trimmed, datatype));
            }
            trimmed.to_string()
        }
        Datatype::Double => {
            if !matches!(trimmed, "INF" | "-INF" | "NaN") && trimmed.parse::<f64>().is_err() {
                return Err(Error::invalid_literal(trimmed, datatype));
            }
            trimmed.to_string()
        }
        Datatype::Boolean => match trimmed {
            "true" | "1" => "true".to_string(),
            "false" | "0" => "false".to_string(),
            _ => return Err(Error::invalid_literal(trimmed, datatype)),
        },
        Datatype::Date => {
            let (date, _) = split_timezone(trimmed);
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|_| Error::invalid_literal(trimmed, datatype))?;
            trimmed.to_string()
        }
        Datatype::DateTime => {
            if DateTime::parse_from_rfc3339(trimmed).is_err()
                && NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f").is_err()
            {
                return Err(Error::invalid_literal(trimmed, datatype));
            }
            trimmed.to_string()
        }
        Datatype::Time => {
            let (time, _) = split_timezone(trimmed);
            NaiveTime::parse_from_str(time, "%H:%M:%S%.f")
                .map_err(|_| Error::invalid_literal(trimmed, datatype))?;
            trimmed.to_string()
        }
        Datatype::String | Datatype::AnyUri | Datatype::XmlLiteral => text.to_string(),
    };
    Ok(Some(Literal::new(lexical, datatype)))
}

fn canonical_integer(text: &str) -> Option<String> {
    let (negative, digits) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits = digits.trim_start_matches('0');
    Some(match (negative, digits.is_empty()) {
        (_, true) => "0".to_string(),
        (true, false) => format!("-{digits}"),
        (false, false) => digits.to_string(),
    })
}

fn is_decimal(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    !(whole.is_empty() && fraction.is_empty()) && digits(whole) && digits(fraction)
}

/// Split a trailing `Z` or `+hh:mm`/`-hh:mm` timezone off a date or time
fn split_timezone(text: &str) -> (&str, Option<&str>) {
    if let Some(stripped) = text.strip_suffix('Z') {
        return (stripped, Some("Z"));
    }
    let split = text.len().saturating_sub(6);
    if split > 0 {
        if let (Some(head), Some(zone)) = (text.get(..split), text.get(split..)) {
            let bytes = zone.as_bytes();
            if matches!(bytes[0], b'+' | b'-') && bytes[3] == b':' {
                return (head, Some(zone));
            }
        }
    }
    (text, None)
}

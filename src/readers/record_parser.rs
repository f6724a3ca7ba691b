use crate::models::Observation;
use crate::utils::constants::{
    DATE_KEY_FORMAT, DATE_KEY_LEN, FIELDS_PER_LINE, FIELD_DELIMITER, MIN_DATE_YEAR,
};
use chrono::{Datelike, NaiveDate};
use std::fmt;

/// Why a line was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    FieldCount(usize),
    InvalidDate,
    InvalidMeasurement,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::FieldCount(n) => {
                write!(f, "expected {} fields, found {}", FIELDS_PER_LINE, n)
            }
            RejectReason::InvalidDate => write!(f, "date is not a YYYYMMDD calendar date"),
            RejectReason::InvalidMeasurement => write!(f, "measurement is not an integer"),
        }
    }
}

/// Outcome of looking at one raw line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Blank,
    Rejected(RejectReason),
    Record(Observation),
}

impl ParsedLine {
    pub fn into_observation(self) -> Option<Observation> {
        match self {
            ParsedLine::Record(observation) => Some(observation),
            ParsedLine::Blank | ParsedLine::Rejected(_) => None,
        }
    }
}

/// Parser for `YYYYMMDD<TAB>MAX<TAB>MIN<TAB>PRECIP` lines.
///
/// Malformed input is data, not a fault: nothing here returns an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordParser;

impl RecordParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a line into an observation, or `None` if it must be discarded.
    pub fn parse(&self, line: &str) -> Option<Observation> {
        self.classify(line).into_observation()
    }

    /// Classify a line as blank, rejected (with reason) or a valid record.
    pub fn classify(&self, line: &str) -> ParsedLine {
        let line = line.trim();
        if line.is_empty() {
            return ParsedLine::Blank;
        }

        let parts: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        if parts.len() != FIELDS_PER_LINE {
            return ParsedLine::Rejected(RejectReason::FieldCount(parts.len()));
        }

        let Some(date) = parse_date_key(parts[0]) else {
            return ParsedLine::Rejected(RejectReason::InvalidDate);
        };

        let (Some(max_temp), Some(min_temp), Some(precip)) = (
            parse_measurement(parts[1]),
            parse_measurement(parts[2]),
            parse_measurement(parts[3]),
        ) else {
            return ParsedLine::Rejected(RejectReason::InvalidMeasurement);
        };

        ParsedLine::Record(Observation::new(date, max_temp, min_temp, precip))
    }
}

/// Parse an exact 8-digit `YYYYMMDD` token into a calendar date.
///
/// Year 0000 parses in the proleptic calendar but is not a real date, so it is rejected.
pub fn parse_date_key(token: &str) -> Option<NaiveDate> {
    if token.len() != DATE_KEY_LEN || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(token, DATE_KEY_FORMAT)
        .ok()
        .filter(|date| date.year() >= MIN_DATE_YEAR)
}

/// Outer `None`: not an integer. Inner `None`: the missing-value sentinel.
fn parse_measurement(token: &str) -> Option<Option<i32>> {
    token
        .trim()
        .parse::<i32>()
        .ok()
        .map(Observation::measurement)
}

//! W3C-DTF dates, DCMI periods and ISO 8601 durations
//!
//! Periods use the DCMI Period encoding scheme, e.g.
//! `start=2024-03-01T10:00:00Z; end=2024-03-01T11:30:00Z; scheme=W3C-DTF;`.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

use crate::error::{MetadataError, Result};

pub const SCHEME_W3CDTF: &str = "W3C-DTF";

/// Granularity used when encoding a date
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precision {
    Year,
    Month,
    Day,
    Minute,
    Second,
    Fraction,
}

/// Encodes `date` as W3C-DTF in UTC.
pub fn encode_date(date: &DateTime<Utc>, precision: Precision) -> String {
    let format = match precision {
        Precision::Year => "%Y",
        Precision::Month => "%Y-%m",
        Precision::Day => "%Y-%m-%d",
        Precision::Minute => "%Y-%m-%dT%H:%MZ",
        Precision::Second => "%Y-%m-%dT%H:%M:%SZ",
        Precision::Fraction => "%Y-%m-%dT%H:%M:%S%.3fZ",
    };
    date.format(format).to_string()
}

/// Decodes any W3C-DTF form (`YYYY` up to fractional seconds with zone).
/// Dates without zone designator are read as UTC.
pub fn decode_date(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    let invalid = || MetadataError::InvalidDate(value.to_string());

    if value.contains('T') {
        if let Ok(date) = DateTime::parse_from_rfc3339(value) {
            return Ok(date.with_timezone(&Utc));
        }
        // hh:mm with zone designator
        let zoned = match value.strip_suffix('Z') {
            Some(rest) => format!("{}+00:00", rest),
            None => value.to_string(),
        };
        if let Ok(date) = DateTime::parse_from_str(&zoned, "%Y-%m-%dT%H:%M%:z") {
            return Ok(date.with_timezone(&Utc));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
            if let Ok(date) = NaiveDateTime::parse_from_str(value, format) {
                return Ok(Utc.from_utc_datetime(&date));
            }
        }
        return Err(invalid());
    }

    let full = match value.len() {
        4 => format!("{}-01-01", value),
        7 => format!("{}-01", value),
        _ => value.to_string(),
    };
    let date = NaiveDate::parse_from_str(&full, "%Y-%m-%d").map_err(|_| invalid())?;
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
    Ok(Utc.from_utc_datetime(&midnight))
}

/// Encodes a duration as ISO 8601 (`PT1H2M3.456S`).
pub fn encode_duration(duration_ms: u64) -> String {
    let hours = duration_ms / 3_600_000;
    let minutes = (duration_ms / 60_000) % 60;
    let seconds = (duration_ms / 1000) % 60;
    let millis = duration_ms % 1000;
    format!("PT{}H{}M{}.{:03}S", hours, minutes, seconds, millis)
}

/// Decodes an ISO 8601 time duration or a plain number of milliseconds.
pub fn decode_duration(value: &str) -> Result<u64> {
    let value = value.trim();
    let invalid = || MetadataError::InvalidDuration(value.to_string());

    if let Ok(ms) = value.parse::<u64>() {
        return Ok(ms);
    }

    let rest = value.strip_prefix("PT").ok_or_else(invalid)?;
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total_ms: f64 = 0.0;
    let mut number = String::new();
    for c in rest.chars() {
        let unit_ms = match c {
            'H' => 3_600_000.0,
            'M' => 60_000.0,
            'S' => 1000.0,
            '0'..='9' | '.' => {
                number.push(c);
                continue;
            }
            _ => return Err(invalid()),
        };
        let amount: f64 = number.parse().map_err(|_| invalid())?;
        total_ms += amount * unit_ms;
        number.clear();
    }
    if !number.is_empty() {
        return Err(invalid());
    }
    Ok(total_ms.round() as u64)
}

/// A DCMI period with optional open ends
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DcmiPeriod {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub name: Option<String>,
}

impl DcmiPeriod {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self {
            start,
            end,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Time between start and end when both are known.
    pub fn duration(&self) -> Option<Duration> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    pub fn has_start(&self) -> bool {
        self.start.is_some()
    }

    pub fn has_end(&self) -> bool {
        self.end.is_some()
    }

    /// Encodes with the given date precision.
    pub fn encode(&self, precision: Precision) -> String {
        let mut out = String::new();
        if let Some(start) = &self.start {
            out.push_str(&format!("start={}; ", encode_date(start, precision)));
        }
        if let Some(end) = &self.end {
            out.push_str(&format!("end={}; ", encode_date(end, precision)));
        }
        if let Some(name) = &self.name {
            out.push_str(&format!("name={}; ", name));
        }
        out.push_str(&format!("scheme={};", SCHEME_W3CDTF));
        out
    }

    pub fn decode(value: &str) -> Result<Self> {
        let mut period = DcmiPeriod::default();
        for part in value.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, val) = part
                .split_once('=')
                .ok_or_else(|| MetadataError::InvalidPeriod(value.to_string()))?;
            let val = val.trim();
            match key.trim() {
                "start" => period.start = Some(decode_date(val)?),
                "end" => period.end = Some(decode_date(val)?),
                "name" => period.name = Some(val.to_string()),
                "scheme" if !val.eq_ignore_ascii_case(SCHEME_W3CDTF) => {
                    return Err(MetadataError::InvalidPeriod(format!(
                        "unsupported scheme {}",
                        val
                    )))
                }
                _ => {}
            }
        }
        if period.start.is_none() && period.end.is_none() {
            return Err(MetadataError::InvalidPeriod(value.to_string()));
        }
        Ok(period)
    }
}

impl fmt::Display for DcmiPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode(Precision::Second))
    }
}

impl FromStr for DcmiPeriod {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

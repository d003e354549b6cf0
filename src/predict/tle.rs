//! Fixed-width two-line element set parsing.
//!
//! Lines follow the historical NORAD layout: 69 ASCII columns, with each
//! field at a fixed column offset. Parsing does not depend on the trailing
//! checksum digit; mismatches are only logged.

use std::f64::consts::PI;
use std::ops::Range;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use strum_macros::Display;

use crate::predict::error::TleError;
use crate::predict::types::OrbitSummary;

pub const LINE_LENGTH: usize = 69;

/// Earth gravitational parameter (km^3/s^2)
const MU_KM3_S2: f64 = 398_600.4418;
const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum Classification {
    Unclassified,
    Classified,
    Secret,
}

/// Parsed mean elements of one satellite. Angles are kept in degrees as
/// written in the TLE; the `_rad` accessors feed the propagator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrbitalElementSet {
    name: Option<String>,
    norad_id: u32,
    classification: Classification,
    international_designator: String,
    epoch: DateTime<Utc>,
    mean_motion_dot: f64,
    mean_motion_ddot: f64,
    bstar: f64,
    ephemeris_type: u8,
    element_set_number: u32,
    inclination_deg: f64,
    raan_deg: f64,
    eccentricity: f64,
    arg_perigee_deg: f64,
    mean_anomaly_deg: f64,
    mean_motion_rev_per_day: f64,
    revolution_number: u32,
    checksum_ok: bool,
}

/// One satellite's worth of raw TLE text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTle {
    pub name: Option<String>,
    pub line1: String,
    pub line2: String,
}

impl RawTle {
    pub fn parse(&self) -> Result<OrbitalElementSet, TleError> {
        OrbitalElementSet::parse_named(self.name.clone(), &self.line1, &self.line2)
    }
}

impl OrbitalElementSet {
    pub fn parse(line1: &str, line2: &str) -> Result<Self, TleError> {
        Self::parse_named(None, line1, line2)
    }

    pub fn parse_named(name: Option<String>, line1: &str, line2: &str) -> Result<Self, TleError> {
        check_line(line1, 1)?;
        check_line(line2, 2)?;

        let norad_id = parse_catalog(field(line1, 2..7), 1)?;
        let norad_id_2 = parse_catalog(field(line2, 2..7), 2)?;
        if norad_id != norad_id_2 {
            return Err(TleError::CatalogMismatch {
                line1: norad_id,
                line2: norad_id_2,
            });
        }

        let classification = match line1.as_bytes()[7] {
            b'U' | b' ' => Classification::Unclassified,
            b'C' => Classification::Classified,
            b'S' => Classification::Secret,
            _ => return Err(invalid(1, "classification", field(line1, 7..8))),
        };

        let epoch = parse_epoch(field(line1, 18..20), field(line1, 20..32))?;

        let elements = Self {
            name: name.map(|n| clean_name(&n)).filter(|n| !n.is_empty()),
            norad_id,
            classification,
            international_designator: field(line1, 9..17).trim().to_string(),
            epoch,
            mean_motion_dot: parse_float(field(line1, 33..43), 1, "mean motion first derivative")?,
            mean_motion_ddot: parse_exponent(
                field(line1, 44..52),
                1,
                "mean motion second derivative",
            )?,
            bstar: parse_exponent(field(line1, 53..61), 1, "bstar")?,
            ephemeris_type: parse_int(field(line1, 62..63), 1, "ephemeris type")? as u8,
            element_set_number: parse_int(field(line1, 64..68), 1, "element set number")?,
            inclination_deg: parse_float(field(line2, 8..16), 2, "inclination")?,
            raan_deg: parse_float(field(line2, 17..25), 2, "right ascension")?,
            eccentricity: parse_implied_decimal(field(line2, 26..33), 2, "eccentricity")?,
            arg_perigee_deg: parse_float(field(line2, 34..42), 2, "argument of perigee")?,
            mean_anomaly_deg: parse_float(field(line2, 43..51), 2, "mean anomaly")?,
            mean_motion_rev_per_day: parse_float(field(line2, 52..63), 2, "mean motion")?,
            revolution_number: parse_int(field(line2, 63..68), 2, "revolution number")?,
            checksum_ok: checksum_matches(line1) && checksum_matches(line2),
        };

        elements.check_bounds()?;

        if !elements.checksum_ok {
            log::warn!("TLE checksum mismatch for NORAD {}", elements.norad_id);
        }

        Ok(elements)
    }

    fn check_bounds(&self) -> Result<(), TleError> {
        if !(0.0..1.0).contains(&self.eccentricity) {
            return Err(TleError::OutOfBounds {
                field: "eccentricity",
                value: self.eccentricity,
            });
        }
        if !(0.0..=180.0).contains(&self.inclination_deg) {
            return Err(TleError::OutOfBounds {
                field: "inclination",
                value: self.inclination_deg,
            });
        }
        if self.mean_motion_rev_per_day <= 0.0 {
            return Err(TleError::OutOfBounds {
                field: "mean motion",
                value: self.mean_motion_rev_per_day,
            });
        }
        Ok(())
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn norad_id(&self) -> u32 {
        self.norad_id
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn international_designator(&self) -> &str {
        &self.international_designator
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    pub fn mean_motion_dot(&self) -> f64 {
        self.mean_motion_dot
    }

    pub fn mean_motion_ddot(&self) -> f64 {
        self.mean_motion_ddot
    }

    pub fn bstar(&self) -> f64 {
        self.bstar
    }

    pub fn ephemeris_type(&self) -> u8 {
        self.ephemeris_type
    }

    pub fn element_set_number(&self) -> u32 {
        self.element_set_number
    }

    pub fn inclination_deg(&self) -> f64 {
        self.inclination_deg
    }

    pub fn raan_deg(&self) -> f64 {
        self.raan_deg
    }

    pub fn eccentricity(&self) -> f64 {
        self.eccentricity
    }

    pub fn arg_perigee_deg(&self) -> f64 {
        self.arg_perigee_deg
    }

    pub fn mean_anomaly_deg(&self) -> f64 {
        self.mean_anomaly_deg
    }

    pub fn mean_motion_rev_per_day(&self) -> f64 {
        self.mean_motion_rev_per_day
    }

    pub fn revolution_number(&self) -> u32 {
        self.revolution_number
    }

    pub fn checksum_ok(&self) -> bool {
        self.checksum_ok
    }

    pub fn inclination_rad(&self) -> f64 {
        self.inclination_deg.to_radians()
    }

    pub fn raan_rad(&self) -> f64 {
        self.raan_deg.to_radians()
    }

    pub fn arg_perigee_rad(&self) -> f64 {
        self.arg_perigee_deg.to_radians()
    }

    pub fn mean_anomaly_rad(&self) -> f64 {
        self.mean_anomaly_deg.to_radians()
    }

    /// Kozai mean motion in radians per minute.
    pub fn mean_motion_rad_per_min(&self) -> f64 {
        self.mean_motion_rev_per_day * PI / 720.0
    }

    pub fn summary(&self, earth_radius_km: f64) -> OrbitSummary {
        let n_rad_s = self.mean_motion_rev_per_day * 2.0 * PI / SECONDS_PER_DAY;
        let a = (MU_KM3_S2 / (n_rad_s * n_rad_s)).cbrt();
        OrbitSummary {
            period_minutes: 1440.0 / self.mean_motion_rev_per_day,
            semi_major_axis_km: a,
            apogee_altitude_km: a * (1.0 + self.eccentricity) - earth_radius_km,
            perigee_altitude_km: a * (1.0 - self.eccentricity) - earth_radius_km,
        }
    }
}

/// Parse a 2-line or 3-line (named) TLE block.
pub fn parse_tle_block(text: &str) -> Result<OrbitalElementSet, TleError> {
    let lines: Vec<&str> = text
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    match lines.as_slice() {
        [line1, line2] => OrbitalElementSet::parse(line1, line2),
        [name, line1, line2] => {
            OrbitalElementSet::parse_named(Some(name.to_string()), line1, line2)
        }
        _ => Err(TleError::LineCount(lines.len())),
    }
}

/// Split catalog text holding any number of 2-line or 3-line entries.
/// Lines that do not belong to an entry are skipped.
pub fn parse_multi_tle(content: &str) -> Vec<RawTle> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut result = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].starts_with("1 ") && i + 1 < lines.len() && lines[i + 1].starts_with("2 ") {
            result.push(RawTle {
                name: None,
                line1: lines[i].to_string(),
                line2: lines[i + 1].to_string(),
            });
            i += 2;
        } else if i + 2 < lines.len()
            && lines[i + 1].starts_with("1 ")
            && lines[i + 2].starts_with("2 ")
        {
            result.push(RawTle {
                name: Some(lines[i].to_string()),
                line1: lines[i + 1].to_string(),
                line2: lines[i + 2].to_string(),
            });
            i += 3;
        } else {
            i += 1;
        }
    }

    result
}

/// Modulo-10 checksum over the first 68 columns: digits count their value,
/// minus signs count one.
pub fn checksum(line: &str) -> u8 {
    let sum: u32 = line
        .bytes()
        .take(LINE_LENGTH - 1)
        .map(|b| match b {
            b'0'..=b'9' => (b - b'0') as u32,
            b'-' => 1,
            _ => 0,
        })
        .sum();
    (sum % 10) as u8
}

fn checksum_matches(line: &str) -> bool {
    let expected = line.as_bytes()[LINE_LENGTH - 1];
    expected.is_ascii_digit() && expected - b'0' == checksum(line)
}

fn check_line(line: &str, number: u8) -> Result<(), TleError> {
    if !line.is_ascii() {
        return Err(invalid(number, "line", line));
    }
    if line.len() != LINE_LENGTH {
        return Err(TleError::LineLength {
            line: number,
            len: line.len(),
        });
    }
    let bytes = line.as_bytes();
    if bytes[0] != b'0' + number || bytes[1] != b' ' {
        return Err(TleError::LineNumber { line: number });
    }
    Ok(())
}

// Lines are checked to be 69 ASCII bytes before any field is sliced.
fn field(line: &str, columns: Range<usize>) -> &str {
    &line[columns]
}

fn invalid(line: u8, field: &'static str, value: &str) -> TleError {
    TleError::InvalidField {
        line,
        field,
        value: value.to_string(),
    }
}

fn clean_name(name: &str) -> String {
    let name = name.trim();
    name.strip_prefix("0 ").unwrap_or(name).trim().to_string()
}

fn parse_float(raw: &str, line: u8, name: &'static str) -> Result<f64, TleError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(line, name, raw))
}

fn parse_int(raw: &str, line: u8, name: &'static str) -> Result<u32, TleError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed.parse().map_err(|_| invalid(line, name, raw))
}

/// "0003835" -> 0.0003835
fn parse_implied_decimal(raw: &str, line: u8, name: &'static str) -> Result<f64, TleError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(line, name, raw));
    }
    format!("0.{raw}")
        .parse()
        .map_err(|_| invalid(line, name, raw))
}

/// " 40864-4" -> 0.40864e-4
fn parse_exponent(raw: &str, line: u8, name: &'static str) -> Result<f64, TleError> {
    let sign = match raw.as_bytes()[0] {
        b' ' | b'+' => "",
        b'-' => "-",
        _ => return Err(invalid(line, name, raw)),
    };
    let mantissa = raw[1..6].trim();
    let exponent = raw[6..8].trim();
    if mantissa.is_empty() || !mantissa.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(line, name, raw));
    }
    let exponent: i32 = exponent.parse().map_err(|_| invalid(line, name, raw))?;
    format!("{sign}0.{mantissa}e{exponent}")
        .parse()
        .map_err(|_| invalid(line, name, raw))
}

fn parse_catalog(raw: &str, line: u8) -> Result<u32, TleError> {
    let trimmed = raw.trim_start();
    let bytes = trimmed.as_bytes();
    match bytes.first() {
        // Alpha-5: the leading letter replaces the two most significant digits
        Some(&c) if c.is_ascii_uppercase() => {
            if c == b'I' || c == b'O' {
                return Err(invalid(line, "catalog number", raw));
            }
            let mut prefix = (c - b'A') as u32 + 10;
            if c > b'I' {
                prefix -= 1;
            }
            if c > b'O' {
                prefix -= 1;
            }
            let rest = &trimmed[1..];
            if rest.len() != 4 || !rest.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(line, "catalog number", raw));
            }
            let rest: u32 = rest.parse().map_err(|_| invalid(line, "catalog number", raw))?;
            Ok(prefix * 10_000 + rest)
        }
        Some(_) if trimmed.bytes().all(|b| b.is_ascii_digit()) => trimmed
            .parse()
            .map_err(|_| invalid(line, "catalog number", raw)),
        _ => Err(invalid(line, "catalog number", raw)),
    }
}

fn parse_epoch(year: &str, day: &str) -> Result<DateTime<Utc>, TleError> {
    let yy = parse_int(year, 1, "epoch year")? as i32;
    if year.trim().is_empty() {
        return Err(invalid(1, "epoch year", year));
    }
    let year_full = if yy < 57 { 2000 + yy } else { 1900 + yy };
    let day_of_year = parse_float(day, 1, "epoch day")?;
    let days_in_year = if NaiveDate::from_ymd_opt(year_full, 2, 29).is_some() {
        366.0
    } else {
        365.0
    };
    if !(1.0..days_in_year + 1.0).contains(&day_of_year) {
        return Err(invalid(1, "epoch day", day));
    }

    let start_of_year = Utc
        .with_ymd_and_hms(year_full, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| invalid(1, "epoch year", year))?;
    let offset_us = ((day_of_year - 1.0) * SECONDS_PER_DAY * 1e6).round() as i64;
    Ok(start_of_year + Duration::microseconds(offset_us))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::tests::{init_logger, ISS_LINE1, ISS_LINE2};
    use rstest::*;

    #[test]
    fn parses_iss_fields_exactly() {
        init_logger();
        let elements = OrbitalElementSet::parse(ISS_LINE1, ISS_LINE2).unwrap();

        assert_eq!(elements.norad_id(), 25544);
        assert_eq!(elements.classification(), Classification::Unclassified);
        assert_eq!(elements.international_designator(), "98067A");
        assert_eq!(elements.inclination_deg(), 51.64);
        assert_eq!(elements.raan_deg(), 339.79);
        assert_eq!(elements.eccentricity(), 0.0003835);
        assert_eq!(elements.arg_perigee_deg(), 356.85);
        assert_eq!(elements.mean_anomaly_deg(), 120.68);
        assert_eq!(elements.mean_motion_rev_per_day(), 15.48919103);
        assert_eq!(elements.revolution_number(), 12345);
        assert_eq!(elements.mean_motion_dot(), 0.00002182);
        assert_eq!(elements.mean_motion_ddot(), 0.0);
        assert_eq!(elements.bstar(), 0.40864e-4);
        assert_eq!(elements.element_set_number(), 999);
        assert_eq!(
            elements.epoch(),
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
        );
        // the sample lines carry made-up checksum digits
        assert!(!elements.checksum_ok());
    }

    #[test]
    fn three_line_block_keeps_name() {
        let text = format!("\n0 ISS (ZARYA)\n{ISS_LINE1}\n{ISS_LINE2}\n\n");
        let elements = parse_tle_block(&text).unwrap();
        assert_eq!(elements.name(), Some("ISS (ZARYA)"));

        let unnamed = parse_tle_block(&format!("{ISS_LINE1}\n{ISS_LINE2}")).unwrap();
        assert_eq!(unnamed.name(), None);
    }

    #[test]
    fn block_with_wrong_line_count() {
        assert_eq!(
            parse_tle_block(ISS_LINE1).unwrap_err(),
            TleError::LineCount(1)
        );
    }

    #[test]
    fn valid_checksum_is_detected() {
        let line1 = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
        let line2 = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";
        let elements = OrbitalElementSet::parse(line1, line2).unwrap();
        assert!(elements.checksum_ok());
        assert_eq!(checksum(line1), 7);
        assert_eq!(elements.mean_motion_dot(), -0.00002182);
        assert_eq!(elements.bstar(), -0.11606e-4);
        assert_eq!(
            elements.epoch().format("%Y-%m-%d").to_string(),
            "2008-09-20"
        );
    }

    #[rstest]
    #[case("A0001", 100_001)]
    #[case("H9999", 179_999)]
    #[case("J0000", 180_000)]
    #[case("P1234", 231_234)]
    #[case("Z9999", 339_999)]
    #[case("00005", 5)]
    fn catalog_numbers(#[case] raw: &str, #[case] expected: u32) {
        assert_eq!(parse_catalog(raw, 1).unwrap(), expected);
    }

    #[rstest]
    #[case("I0001")]
    #[case("O0001")]
    #[case("2554x")]
    fn bad_catalog_numbers(#[case] raw: &str) {
        assert!(parse_catalog(raw, 1).is_err());
    }

    #[rstest]
    #[case("24", "366.50000000", "2024-12-31T12:00:00+00:00")]
    #[case("23", "365.50000000", "2023-12-31T12:00:00+00:00")]
    #[case("00", "366.00000000", "2000-12-31T00:00:00+00:00")]
    fn epoch_day_within_year(#[case] year: &str, #[case] day: &str, #[case] expected: &str) {
        assert_eq!(parse_epoch(year, day).unwrap().to_rfc3339(), expected);
    }

    #[rstest]
    #[case("23", "366.50000000")]
    #[case("99", "366.00000000")]
    #[case("24", "367.00000000")]
    #[case("24", "000.50000000")]
    fn epoch_day_past_year_end(#[case] year: &str, #[case] day: &str) {
        assert!(matches!(
            parse_epoch(year, day),
            Err(TleError::InvalidField {
                line: 1,
                field: "epoch day",
                ..
            })
        ));
    }

    #[test]
    fn rejects_short_line() {
        let err = OrbitalElementSet::parse(&ISS_LINE1[..60], ISS_LINE2).unwrap_err();
        assert_eq!(err, TleError::LineLength { line: 1, len: 60 });
    }

    #[test]
    fn rejects_swapped_lines() {
        let err = OrbitalElementSet::parse(ISS_LINE2, ISS_LINE1).unwrap_err();
        assert_eq!(err, TleError::LineNumber { line: 1 });
    }

    #[test]
    fn rejects_catalog_mismatch() {
        let line2 = ISS_LINE2.replacen("25544", "25545", 1);
        let err = OrbitalElementSet::parse(ISS_LINE1, &line2).unwrap_err();
        assert_eq!(
            err,
            TleError::CatalogMismatch {
                line1: 25544,
                line2: 25545
            }
        );
    }

    #[test]
    fn rejects_non_numeric_field() {
        let line2 = ISS_LINE2.replacen(" 51.6400", " 51.64x0", 1);
        let err = OrbitalElementSet::parse(ISS_LINE1, &line2).unwrap_err();
        assert!(matches!(
            err,
            TleError::InvalidField {
                line: 2,
                field: "inclination",
                ..
            }
        ));
    }

    #[test]
    fn rejects_out_of_bounds_inclination() {
        let line2 = ISS_LINE2.replacen(" 51.6400", "181.6400", 1);
        let err = OrbitalElementSet::parse(ISS_LINE1, &line2).unwrap_err();
        assert!(matches!(
            err,
            TleError::OutOfBounds {
                field: "inclination",
                ..
            }
        ));
    }

    #[test]
    fn rejects_zero_mean_motion() {
        let line2 = ISS_LINE2.replacen("15.48919103", "00.00000000", 1);
        let err = OrbitalElementSet::parse(ISS_LINE1, &line2).unwrap_err();
        assert!(matches!(
            err,
            TleError::OutOfBounds {
                field: "mean motion",
                ..
            }
        ));
    }

    #[test]
    fn multi_tle_mixes_named_and_unnamed() {
        let content = format!(
            "ISS (ZARYA)\n{ISS_LINE1}\n{ISS_LINE2}\n{ISS_LINE1}\n{ISS_LINE2}\ntrailing garbage\n"
        );
        let entries = parse_multi_tle(&content);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name.as_deref(), Some("ISS (ZARYA)"));
        assert_eq!(entries[1].name, None);
        assert_eq!(entries[1].parse().unwrap().norad_id(), 25544);
    }

    #[test]
    fn iss_orbit_summary() {
        let elements = OrbitalElementSet::parse(ISS_LINE1, ISS_LINE2).unwrap();
        let summary = elements.summary(6371.0);
        assert!((summary.period_minutes - 92.97).abs() < 0.01);
        assert!(summary.semi_major_axis_km > 6790.0 && summary.semi_major_axis_km < 6805.0);
        assert!(summary.apogee_altitude_km > summary.perigee_altitude_km);
        assert!(summary.perigee_altitude_km > 350.0 && summary.apogee_altitude_km < 450.0);
    }
}

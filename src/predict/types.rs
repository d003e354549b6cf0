use chrono::{DateTime, Utc};
use serde::Serialize;

/// Information about a single satellite from TLE
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SatelliteInfo {
    pub name: String,
    pub norad_id: u32,
    pub tle_source: String,
}

/// Inertial state and spherical-Earth geodetic position at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateVector {
    pub timestamp: DateTime<Utc>,
    pub position_eci_km: [f64; 3],
    pub velocity_eci_km_s: [f64; 3],
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
    pub speed_km_s: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LookAngles {
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    pub range_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassPoint {
    pub time: DateTime<Utc>,
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    pub range_km: f64,
}

/// A contiguous run of samples at or above the minimum elevation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassRecord {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: f64,
    pub max_elevation_deg: f64,
    pub max_elevation_time: DateTime<Utc>,
    pub max_elevation_azimuth_deg: f64,
    pub points: Vec<PassPoint>,
}

/// Shape of the mean orbit described by an element set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrbitSummary {
    pub period_minutes: f64,
    pub semi_major_axis_km: f64,
    pub apogee_altitude_km: f64,
    pub perigee_altitude_km: f64,
}

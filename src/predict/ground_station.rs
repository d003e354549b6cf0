use serde::Serialize;

use crate::config::ConfigError;
use crate::predict::types::{LookAngles, StateVector};

/// Fixed observer on a spherical Earth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observer {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
}

impl Observer {
    pub fn new(
        latitude_deg: f64,
        longitude_deg: f64,
        altitude_km: f64,
    ) -> Result<Self, ConfigError> {
        if !(-90.0..=90.0).contains(&latitude_deg) {
            return Err(ConfigError::OutOfRange {
                field: "observer latitude",
                value: latitude_deg,
                expected: "[-90, 90]",
            });
        }
        if !(-180.0..=180.0).contains(&longitude_deg) {
            return Err(ConfigError::OutOfRange {
                field: "observer longitude",
                value: longitude_deg,
                expected: "[-180, 180]",
            });
        }
        if !altitude_km.is_finite() {
            return Err(ConfigError::OutOfRange {
                field: "observer altitude",
                value: altitude_km,
                expected: "a finite number",
            });
        }
        Ok(Self {
            latitude_deg,
            longitude_deg,
            altitude_km,
        })
    }

    /// Parse `"lat,lon"` as written in the station config.
    pub fn from_coordinates(coordinates: &str, altitude_m: f64) -> Result<Self, ConfigError> {
        let bad = || ConfigError::Coordinates(coordinates.to_string());
        let parts: Vec<_> = coordinates.split(',').map(|s| s.trim()).collect();
        if parts.len() != 2 {
            return Err(bad());
        }
        let lat = parts[0].parse().map_err(|_| bad())?;
        let lon = parts[1].parse().map_err(|_| bad())?;
        Self::new(lat, lon, altitude_m / 1000.0)
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    pub fn position_km(&self, earth_radius_km: f64) -> [f64; 3] {
        spherical_to_cartesian(
            self.latitude_deg,
            self.longitude_deg,
            earth_radius_km + self.altitude_km,
        )
    }

    /// Elevation, azimuth and slant range to a satellite at the given
    /// geodetic position.
    pub fn look_angles(
        &self,
        sat_latitude_deg: f64,
        sat_longitude_deg: f64,
        sat_altitude_km: f64,
        earth_radius_km: f64,
    ) -> LookAngles {
        let obs = self.position_km(earth_radius_km);
        let sat = spherical_to_cartesian(
            sat_latitude_deg,
            sat_longitude_deg,
            earth_radius_km + sat_altitude_km,
        );

        let dr = [sat[0] - obs[0], sat[1] - obs[1], sat[2] - obs[2]];
        let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();

        let (east, north, up) = ecef_to_enu(dr, self.lat_rad(), self.lon_rad());
        let elevation_deg = up.atan2((east * east + north * north).sqrt()).to_degrees();
        let azimuth_deg = east.atan2(north).to_degrees().rem_euclid(360.0);

        LookAngles {
            elevation_deg,
            azimuth_deg,
            range_km,
        }
    }

    pub fn look_at(&self, state: &StateVector, earth_radius_km: f64) -> LookAngles {
        self.look_angles(
            state.latitude_deg,
            state.longitude_deg,
            state.altitude_km,
            earth_radius_km,
        )
    }
}

pub fn spherical_to_cartesian(latitude_deg: f64, longitude_deg: f64, radius_km: f64) -> [f64; 3] {
    let lat = latitude_deg.to_radians();
    let lon = longitude_deg.to_radians();
    [
        radius_km * lat.cos() * lon.cos(),
        radius_km * lat.cos() * lon.sin(),
        radius_km * lat.sin(),
    ]
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}

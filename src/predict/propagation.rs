//! SGP4 evaluation of an element set and conversion of the inertial state
//! to latitude/longitude/altitude over a spherical Earth.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use sgp4::{Constants, MinutesSinceEpoch, Orbit};

use crate::config::{validate_positive, ConfigError, EngineConfig};
use crate::predict::error::{PredictError, PropagationError};
use crate::predict::tle::OrbitalElementSet;
use crate::predict::types::StateVector;

/// 2000-01-01T12:00:00Z as a unix timestamp in milliseconds
const J2000_UNIX_MS: i64 = 946_728_000_000;

pub struct Propagator {
    elements: OrbitalElementSet,
    constants: Constants,
    config: EngineConfig,
}

impl fmt::Debug for Propagator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Propagator")
            .field("elements", &self.elements)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Propagator {
    /// Initialise the SGP4 model for one element set. The model uses the
    /// WGS-72 geopotential.
    pub fn new(elements: OrbitalElementSet, config: &EngineConfig) -> Result<Self, PredictError> {
        config.validate()?;

        let orbit = Orbit::from_kozai_elements(
            &sgp4::WGS72,
            elements.inclination_rad(),
            elements.raan_rad(),
            elements.eccentricity(),
            elements.arg_perigee_rad(),
            elements.mean_anomaly_rad(),
            elements.mean_motion_rad_per_min(),
        )
        .map_err(|e| PropagationError::Initialization(e.to_string()))?;

        let epoch = sgp4::julian_years_since_j2000(&elements.epoch().naive_utc());
        let constants = Constants::new(
            sgp4::WGS72,
            sgp4::iau_epoch_to_sidereal_time,
            epoch,
            elements.bstar(),
            orbit,
        )
        .map_err(|e| PropagationError::Initialization(e.to_string()))?;

        log::debug!(
            "Initialised propagator for NORAD {} (epoch {})",
            elements.norad_id(),
            elements.epoch()
        );

        Ok(Self {
            elements,
            constants,
            config: config.clone(),
        })
    }

    pub fn elements(&self) -> &OrbitalElementSet {
        &self.elements
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate the model at `instant`. Each call is independent.
    pub fn propagate(&self, instant: DateTime<Utc>) -> Result<StateVector, PropagationError> {
        let minutes = (instant - self.elements.epoch())
            .num_microseconds()
            .ok_or(PropagationError::InvalidInstant)? as f64
            / 60e6;

        let prediction = self
            .constants
            .propagate(MinutesSinceEpoch(minutes))
            .map_err(|e| PropagationError::Model(e.to_string()))?;

        let position = prediction.position;
        let velocity = prediction.velocity;
        if position.iter().chain(velocity.iter()).any(|v| !v.is_finite()) {
            return Err(PropagationError::Model("non-finite state vector".into()));
        }

        let radius_km = norm(position);
        if radius_km < self.config.earth_radius_km {
            return Err(PropagationError::Decayed { radius_km });
        }

        let (latitude_deg, longitude_deg, altitude_km) =
            eci_to_geodetic(position, instant, &self.config);

        Ok(StateVector {
            timestamp: instant,
            position_eci_km: position,
            velocity_eci_km_s: velocity,
            latitude_deg,
            longitude_deg,
            altitude_km,
            speed_km_s: norm(velocity),
        })
    }

    pub fn position_now(&self) -> Result<StateVector, PropagationError> {
        self.propagate(Utc::now())
    }

    /// States from `start` to `end` inclusive at `step`. Instants the model
    /// cannot evaluate are left out.
    pub fn ground_track(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> Result<Vec<StateVector>, ConfigError> {
        validate_positive("step_minutes", step.num_milliseconds() as f64 / 60_000.0)?;

        let mut cursor = start;
        let mut points = Vec::new();
        while cursor <= end {
            match self.propagate(cursor) {
                Ok(state) => points.push(state),
                Err(e) => log::debug!(
                    "Skipping NORAD {} at {}: {}",
                    self.elements.norad_id(),
                    cursor,
                    e
                ),
            }
            cursor = match cursor.checked_add_signed(step) {
                Some(next) => next,
                None => break,
            };
        }
        Ok(points)
    }
}

/// One-shot evaluation without keeping the model around.
pub fn propagate(
    elements: &OrbitalElementSet,
    instant: DateTime<Utc>,
    config: &EngineConfig,
) -> Result<StateVector, PredictError> {
    let propagator = Propagator::new(elements.clone(), config)?;
    Ok(propagator.propagate(instant)?)
}

/// Latitude from the normalised z component, longitude from x/y minus the
/// Earth rotation accumulated since J2000 at a fixed sidereal rate. Returns
/// (latitude deg, longitude deg in [-180, 180), altitude km).
pub fn eci_to_geodetic(
    position_km: [f64; 3],
    instant: DateTime<Utc>,
    config: &EngineConfig,
) -> (f64, f64, f64) {
    let [x, y, z] = position_km;
    let r = norm(position_km);

    let latitude = (z / r).clamp(-1.0, 1.0).asin().to_degrees();
    let hours_since_j2000 = (instant.timestamp_millis() - J2000_UNIX_MS) as f64 / 3_600_000.0;
    let rotation = (config.sidereal_rate_deg_per_hour * hours_since_j2000).rem_euclid(360.0);
    let longitude = normalize_longitude(y.atan2(x).to_degrees() - rotation);

    (latitude, longitude, r - config.earth_radius_km)
}

pub fn normalize_longitude(degrees: f64) -> f64 {
    (degrees + 180.0).rem_euclid(360.0) - 180.0
}

fn norm(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::tests::{iss, iss_epoch, init_logger};
    use chrono::TimeZone;
    use rstest::*;

    #[test]
    fn iss_at_epoch() {
        init_logger();
        let propagator = iss();
        let state = propagator.propagate(iss_epoch()).unwrap();

        assert!(state.latitude_deg.abs() <= 51.64, "{state:?}");
        assert!(
            state.altitude_km > 350.0 && state.altitude_km < 450.0,
            "{state:?}"
        );
        assert!(state.speed_km_s > 7.0 && state.speed_km_s < 8.0);
        assert!(state.longitude_deg >= -180.0 && state.longitude_deg <= 180.0);
    }

    #[test]
    fn propagation_is_deterministic() {
        let propagator = iss();
        let t = iss_epoch() + Duration::minutes(137);
        assert_eq!(propagator.propagate(t).unwrap(), propagator.propagate(t).unwrap());
    }

    #[test]
    fn geodetic_bounds_over_three_days() {
        let propagator = iss();
        let start = iss_epoch();
        let track = propagator
            .ground_track(start, start + Duration::days(3), Duration::minutes(7))
            .unwrap();
        assert_eq!(track.len(), (3 * 24 * 60) / 7 + 1);
        for state in track {
            assert!((-90.0..=90.0).contains(&state.latitude_deg));
            assert!((-180.0..=180.0).contains(&state.longitude_deg));
            assert!(state.altitude_km > 0.0);
        }
    }

    /// Reference values for catalog 00005 from the SGP4 verification set.
    #[rstest]
    #[case(0.0, [7022.46529266, -1400.08296755, 0.03995155])]
    #[case(360.0, [-7154.03120202, -3783.17682504, -3536.19412294])]
    fn matches_reference_vectors(#[case] minutes: f64, #[case] expected: [f64; 3]) {
        let elements = OrbitalElementSet::parse(
            "1 00005U 58002B   00179.78495062  .00000023  00000-0  28098-4 0  4753",
            "2 00005  34.2682 348.7242 1859667 331.7664  19.3264 10.82419157413667",
        )
        .unwrap();
        let epoch = elements.epoch();
        let propagator = Propagator::new(elements, &EngineConfig::default()).unwrap();
        let state = propagator
            .propagate(epoch + Duration::milliseconds((minutes * 60_000.0) as i64))
            .unwrap();

        let error = norm([
            state.position_eci_km[0] - expected[0],
            state.position_eci_km[1] - expected[1],
            state.position_eci_km[2] - expected[2],
        ]);
        assert!(error < 1.0, "position error {error} km");
    }

    #[test]
    fn below_surface_is_decayed() {
        let config = EngineConfig {
            earth_radius_km: 7000.0,
            ..EngineConfig::default()
        };
        let elements = iss().elements().clone();
        let propagator = Propagator::new(elements, &config).unwrap();
        assert!(matches!(
            propagator.propagate(iss_epoch()),
            Err(PropagationError::Decayed { .. })
        ));

        let start = iss_epoch();
        let track = propagator
            .ground_track(start, start + Duration::hours(1), Duration::minutes(5))
            .unwrap();
        assert!(track.is_empty());
    }

    #[test]
    fn rejects_invalid_config() {
        let config = EngineConfig {
            min_elevation_deg: 120.0,
            ..EngineConfig::default()
        };
        let result = Propagator::new(iss().elements().clone(), &config);
        assert!(matches!(result, Err(PredictError::Config(_))));
    }

    #[test]
    fn rejects_zero_step_track() {
        let start = iss_epoch();
        assert!(iss().ground_track(start, start, Duration::zero()).is_err());
    }

    #[test]
    fn longitude_accounts_for_earth_rotation() {
        let config = EngineConfig::default();
        let j2000 = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        let (lat, lon, alt) = eci_to_geodetic([7000.0, 0.0, 0.0], j2000, &config);
        assert_eq!(lat, 0.0);
        assert!(lon.abs() < 1e-12);
        assert!((alt - 629.0).abs() < 1e-9);

        let (_, lon, _) = eci_to_geodetic([7000.0, 0.0, 0.0], j2000 + Duration::hours(1), &config);
        assert!((lon + 15.04107).abs() < 1e-9);

        let (lat, _, _) = eci_to_geodetic([0.0, 0.0, -7000.0], j2000, &config);
        assert!((lat + 90.0).abs() < 1e-9);
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(190.0, -170.0)]
    #[case(-190.0, 170.0)]
    #[case(540.0, -180.0)]
    #[case(-725.0, -5.0)]
    fn longitude_normalisation(#[case] input: f64, #[case] expected: f64) {
        assert!((normalize_longitude(input) - expected).abs() < 1e-9);
    }
}

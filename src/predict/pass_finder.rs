use chrono::{DateTime, Duration, Utc};

use crate::config::{validate_min_elevation, validate_positive, ConfigError, EngineConfig};
use crate::predict::error::PropagationError;
use crate::predict::tle_loader::TleEntry;
use crate::predict::types::{LookAngles, PassPoint, PassRecord, SatelliteInfo, StateVector};
use crate::predict::{Observer, Propagator};

/// Anything that can be evaluated to a state at an instant.
pub trait StateSource {
    fn state_at(&self, instant: DateTime<Utc>) -> Result<StateVector, PropagationError>;

    /// Radius of the spherical Earth that reported altitudes are measured
    /// against. Look angles are computed with this same radius.
    fn earth_radius_km(&self) -> f64;
}

impl StateSource for Propagator {
    fn state_at(&self, instant: DateTime<Utc>) -> Result<StateVector, PropagationError> {
        self.propagate(instant)
    }

    fn earth_radius_km(&self) -> f64 {
        self.config().earth_radius_km
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PassQuery {
    pub start: DateTime<Utc>,
    pub horizon_hours: f64,
    pub min_elevation_deg: f64,
    pub step_minutes: f64,
}

impl PassQuery {
    /// Scan settings taken from `config`, starting at `start`.
    pub fn new(start: DateTime<Utc>, config: &EngineConfig) -> Self {
        Self {
            start,
            horizon_hours: config.horizon_hours(),
            min_elevation_deg: config.min_elevation_deg,
            step_minutes: config.step_minutes(),
        }
    }

    pub fn with_horizon_hours(mut self, hours: f64) -> Self {
        self.horizon_hours = hours;
        self
    }

    pub fn with_min_elevation(mut self, degrees: f64) -> Self {
        self.min_elevation_deg = degrees;
        self
    }

    pub fn with_step_minutes(mut self, minutes: f64) -> Self {
        self.step_minutes = minutes;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_min_elevation(self.min_elevation_deg)?;
        validate_positive("horizon_hours", self.horizon_hours)?;
        validate_positive("step_minutes", self.step_minutes)?;
        Ok(())
    }

    fn step(&self) -> Result<Duration, ConfigError> {
        millis("step_minutes", self.step_minutes, self.step_minutes * 60_000.0)
    }

    fn end(&self) -> Result<DateTime<Utc>, ConfigError> {
        let horizon = millis(
            "horizon_hours",
            self.horizon_hours,
            self.horizon_hours * 3_600_000.0,
        )?;
        self.start
            .checked_add_signed(horizon)
            .ok_or(ConfigError::OutOfRange {
                field: "horizon_hours",
                value: self.horizon_hours,
                expected: "an end time chrono can represent",
            })
    }
}

fn millis(field: &'static str, value: f64, ms: f64) -> Result<Duration, ConfigError> {
    Duration::try_milliseconds(ms.round() as i64)
        .filter(|d| *d > Duration::zero())
        .ok_or(ConfigError::OutOfRange {
            field,
            value,
            expected: "at least one millisecond",
        })
}

struct OpenPass {
    start_time: DateTime<Utc>,
    max_elevation_deg: f64,
    max_elevation_time: DateTime<Utc>,
    max_elevation_azimuth_deg: f64,
    points: Vec<PassPoint>,
}

impl OpenPass {
    fn open(time: DateTime<Utc>, look: LookAngles) -> Self {
        Self {
            start_time: time,
            max_elevation_deg: look.elevation_deg,
            max_elevation_time: time,
            max_elevation_azimuth_deg: look.azimuth_deg,
            points: Vec::new(),
        }
    }

    fn push(&mut self, time: DateTime<Utc>, look: LookAngles) {
        if look.elevation_deg > self.max_elevation_deg {
            self.max_elevation_deg = look.elevation_deg;
            self.max_elevation_time = time;
            self.max_elevation_azimuth_deg = look.azimuth_deg;
        }
        self.points.push(PassPoint {
            time,
            elevation_deg: look.elevation_deg,
            azimuth_deg: look.azimuth_deg,
            range_km: look.range_km,
        });
    }

    fn close(self) -> PassRecord {
        let end_time = self
            .points
            .last()
            .map(|p| p.time)
            .unwrap_or(self.start_time);
        let duration_minutes = (end_time - self.start_time).num_milliseconds() as f64 / 60_000.0;
        PassRecord {
            start_time: self.start_time,
            end_time,
            duration_minutes,
            max_elevation_deg: self.max_elevation_deg,
            max_elevation_time: self.max_elevation_time,
            max_elevation_azimuth_deg: self.max_elevation_azimuth_deg,
            points: self.points,
        }
    }
}

/// Scans over a fixed set of validated engine settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PassFinder {
    config: EngineConfig,
}

impl PassFinder {
    pub fn new(config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The query a scan starting at `start` runs with.
    pub fn query(&self, start: DateTime<Utc>) -> PassQuery {
        PassQuery::new(start, &self.config)
    }

    pub fn find_passes<S: StateSource + ?Sized>(
        &self,
        source: &S,
        observer: &Observer,
        start: DateTime<Utc>,
    ) -> Result<Vec<PassRecord>, ConfigError> {
        find_passes(source, observer, &self.query(start))
    }

    /// Passes of every satellite, ordered by start time.
    pub fn find_passes_for_all<'a, I>(
        &self,
        satellites: I,
        observer: &Observer,
        start: DateTime<Utc>,
    ) -> Result<Vec<(SatelliteInfo, PassRecord)>, ConfigError>
    where
        I: IntoIterator<Item = &'a TleEntry>,
    {
        let query = self.query(start);
        query.validate()?;

        let mut all_passes = Vec::new();
        for sat in satellites {
            let passes = find_passes(&sat.propagator, observer, &query)?;
            log::debug!("{}: {} passes", sat.info.name, passes.len());
            all_passes.extend(passes.into_iter().map(|p| (sat.info.clone(), p)));
        }

        all_passes.sort_by_key(|(_, p)| p.start_time);
        Ok(all_passes)
    }
}

/// Sample `source` from `query.start` to `query.start + horizon` and group
/// consecutive samples with elevation >= the minimum into passes.
///
/// Instants the source cannot evaluate are skipped; they neither open nor
/// close a pass. A pass still open at the end of the horizon is closed at
/// its last sample.
pub fn find_passes<S: StateSource + ?Sized>(
    source: &S,
    observer: &Observer,
    query: &PassQuery,
) -> Result<Vec<PassRecord>, ConfigError> {
    query.validate()?;
    let earth_radius_km = source.earth_radius_km();
    validate_positive("earth_radius_km", earth_radius_km)?;
    let step = query.step()?;
    let end = query.end()?;

    let mut passes = Vec::new();
    let mut current: Option<OpenPass> = None;
    let mut skipped = 0usize;
    let mut cursor = query.start;

    while cursor <= end {
        match source.state_at(cursor) {
            Ok(state) => {
                let look = observer.look_at(&state, earth_radius_km);
                if look.elevation_deg >= query.min_elevation_deg {
                    current
                        .get_or_insert_with(|| OpenPass::open(cursor, look))
                        .push(cursor, look);
                } else if let Some(open) = current.take() {
                    passes.push(open.close());
                }
            }
            Err(e) => {
                skipped += 1;
                log::debug!("No state at {}: {}", cursor, e);
            }
        }

        cursor = match cursor.checked_add_signed(step) {
            Some(next) => next,
            None => break,
        };
    }

    if let Some(open) = current.take() {
        passes.push(open.close());
    }

    if skipped > 0 {
        log::debug!("Pass scan skipped {} samples", skipped);
    }

    Ok(passes)
}

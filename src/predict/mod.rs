mod error;
mod ground_station;
mod pass_finder;
mod propagation;
mod tle;
mod tle_loader;
mod types;

pub use error::{PredictError, PropagationError, TleError};
pub use ground_station::{ecef_to_enu, spherical_to_cartesian, Observer};
pub use pass_finder::{find_passes, PassFinder, PassQuery, StateSource};
pub use propagation::{eci_to_geodetic, normalize_longitude, propagate, Propagator};
pub use tle::{
    checksum, parse_multi_tle, parse_tle_block, Classification, OrbitalElementSet, RawTle,
};
pub use tle_loader::{TleEntry, TleLoader};
pub use types::{LookAngles, OrbitSummary, PassPoint, PassRecord, SatelliteInfo, StateVector};

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use log::LevelFilter;
    use std::sync::Once;

    use super::{OrbitalElementSet, Propagator};
    use crate::config::EngineConfig;

    pub const ISS_LINE1: &str =
        "1 25544U 98067A   24001.50000000  .00002182  00000-0  40864-4 0  9990";
    pub const ISS_LINE2: &str =
        "2 25544  51.6400 339.7900 0003835 356.8500 120.6800 15.48919103123456";

    static INIT: Once = Once::new();

    pub fn init_logger() {
        INIT.call_once(|| {
            let _ = env_logger::builder()
                .is_test(true)
                .filter_level(LevelFilter::Debug)
                .try_init();
        });
    }

    pub fn iss_epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    pub fn iss() -> Propagator {
        let elements = OrbitalElementSet::parse(ISS_LINE1, ISS_LINE2).unwrap();
        Propagator::new(elements, &EngineConfig::default()).unwrap()
    }
}

//! Satellite orbit propagation and pass prediction from two-line element
//! sets.
//!
//! ```no_run
//! use chrono::Utc;
//! use satintel::config::EngineConfig;
//! use satintel::predict::{parse_tle_block, Observer, PassFinder, Propagator};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let text = std::fs::read_to_string("iss.tle")?;
//! let config = EngineConfig::default();
//! let propagator = Propagator::new(parse_tle_block(&text)?, &config)?;
//! let observer = Observer::new(20.67, -103.35, 1.56)?;
//! let passes = PassFinder::new(&config)?.find_passes(&propagator, &observer, Utc::now())?;
//! println!("{} passes in the next 24 hours", passes.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod predict;

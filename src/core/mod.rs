//! Orchestration: the date-mosaic pipeline (`normalize` -> `reduce` -> `schedule`)
//! and the scene-resample pipeline (`tracker` -> `resample` -> `driver`), plus the
//! parameters, identity extraction and scratch ownership they share.
pub mod driver;
pub mod identity;
pub mod normalize;
pub mod params;
pub mod reduce;
pub mod resample;
pub mod schedule;
pub mod scratch;
pub mod shutdown;
pub mod tracker;

//! Common types and utilities shared across the climate diagnostics crates.

pub mod bbox;
pub mod error;
pub mod field;
pub mod grid;
pub mod regrid;
pub mod region;
pub mod time;

pub use bbox::BoundingBox;
pub use error::{PmpError, PmpResult};
pub use field::Field;
pub use grid::{GridSpec, TargetGrid};
pub use regrid::{RegridMethod, RegridTool, Regridder};
pub use region::Region;
pub use time::{TimeBounds, TimeWindow};

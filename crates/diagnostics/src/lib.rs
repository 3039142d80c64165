//! Numerical diagnostics on gridded climate fields.
//!
//! - [`InterpolationRegridder`]: nearest, bilinear, bicubic and
//!   area-average regridding between lat/lon grids
//! - [`climatology`]: annual cycle and departures from it
//! - [`stats`]: area-weighted RMS difference and spatial correlation
//! - [`eof`]: leading EOF with principal component and variance fraction

pub mod climatology;
pub mod eof;
pub mod error;
pub mod interpolation;
pub mod regrid;
pub mod stats;

pub use climatology::{annual_cycle, departures};
pub use eof::{leading_eof, EofMode};
pub use error::{DiagnosticsError, Result};
pub use regrid::InterpolationRegridder;
pub use stats::{cor_xy, rms_xy, weighted_correlation, weighted_rms};

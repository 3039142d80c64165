//! Test support for the climate diagnostics crates.
//!
//! - [`fixtures`]: observation catalogs, naming templates and model names
//! - [`generators`]: synthetic monthly fields, land fractions and modes
//! - [`DatasetTree`]: datasets laid out in a temp dir and served from memory
//!
//! Pull it in as a dev-dependency (`test-utils = { path = "../test-utils" }`)
//! and import what a test needs:
//!
//! ```ignore
//! use test_utils::{assert_approx_eq, fixtures, generators, DatasetTree};
//! ```

pub mod datasets;
pub mod fixtures;
pub mod generators;

pub use datasets::DatasetTree;

/// Assert that two numbers differ by at most `epsilon`.
///
/// Both sides are widened to `f64`, so `f32` field values can be compared
/// against `f64` expectations directly.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right, epsilon) = ($left as f64, $right as f64, $epsilon as f64);
        if !((left - right).abs() <= epsilon) {
            panic!(
                "values not within {:e}: left = {:?}, right = {:?}",
                epsilon, left, right
            );
        }
    }};
}

//! Test support for the enrichment workspace: scripted providers that drive
//! the reconciler offline, biosample records in both input shapes, canned
//! observations and recorded provider responses.
//!
//! ```ignore
//! use test_utils::{shape_a_record, sst_observation, ScriptedProvider};
//!
//! let oisst = ScriptedProvider::<Marine>::returning("noaa_oisst", vec![sst_observation(tier, "noaa_oisst")]);
//! ```

pub mod fixtures;
pub mod paths;
pub mod providers;

pub use fixtures::*;
pub use paths::*;
pub use providers::*;

/// Assert two floats differ by at most `epsilon`.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right, epsilon): (f64, f64, f64) = ($left as f64, $right as f64, $epsilon as f64);
        assert!(
            (left - right).abs() <= epsilon,
            "{} is not within {} of {} (diff {})",
            left,
            epsilon,
            right,
            (left - right).abs()
        );
    }};
}

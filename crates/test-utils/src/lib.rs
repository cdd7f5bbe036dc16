//! Test support shared by the hls-cube crates.
//!
//! - [`fakes`]: a raster reader and a slice store that never touch the network or disk
//! - [`fixtures`]: HLS-shaped scene items, band maps and regions
//! - [`generators`]: synthetic band values and small georeferenced GeoTIFFs
//! - [`logs`]: log capture for asserting on emitted events
//! - [`paths`]: files shipped under `config/`
//!
//! Used as a dev-dependency from integration tests only, since it depends on
//! `cube-builder` itself.

pub mod fakes;
pub mod fixtures;
pub mod generators;
pub mod logs;
pub mod paths;

pub use fakes::*;
pub use fixtures::*;
pub use generators::*;
pub use logs::capture_logs;
pub use paths::*;

/// Asserts that every value of a band slice is NaN.
#[macro_export]
macro_rules! assert_all_nan {
    ($values:expr) => {{
        let values: &[f32] = $values;
        if let Some((i, v)) = values.iter().enumerate().find(|(_, v)| !v.is_nan()) {
            panic!("expected all NaN, found {} at index {}", v, i);
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_all_nan() {
        assert_all_nan!(&[f32::NAN, f32::NAN]);
    }

    #[test]
    #[should_panic(expected = "expected all NaN")]
    fn test_assert_all_nan_fails() {
        assert_all_nan!(&[f32::NAN, 1.0]);
    }
}

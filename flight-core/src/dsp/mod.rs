//! Fixed-point signal processing building blocks shared by the estimators.

pub mod fir_filter;
pub mod interpolator;

pub use fir_filter::FirFilter;
pub use interpolator::{Interpolator, TimebaseError};

//! pa-core: shared foundation for procagent.
//!
//! Contains:
//! - units (uom SI types + constructors + reporting conversions)
//! - numeric (Real + tolerances + float helpers)
//! - handle (compact opaque handles for simulator objects)
//! - error (non-finite value guard)

pub mod error;
pub mod handle;
pub mod numeric;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use handle::*;
pub use numeric::*;
pub use units::*;

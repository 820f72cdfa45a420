//! Binary data processing utilities
//!
//! Bounds-checked big-endian reads and bit extraction over raw frame bytes.
//! Every read returns `None` instead of panicking when the slice is too short.

pub mod bit_ops;
pub mod conversions;

pub use bit_ops::*;
pub use conversions::*;

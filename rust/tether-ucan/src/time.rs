//! Timestamps and validity windows.

pub mod range;
pub mod timestamp;

pub use range::TimeRange;
pub use timestamp::Timestamp;

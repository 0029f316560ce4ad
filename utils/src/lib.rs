//! Comparison helpers shared by the assertion oracle and the reporter.
//!
//! - **`structural`**: deep JSON comparison yielding path-addressed differences
//! - **`diff`**: unified line diff rendering

pub mod diff;
pub mod structural;

pub use diff::format_unified_diff;
pub use structural::{Difference, structural_diff, to_sorted_pretty};

//! File analysis for agevault.
//!
//! This crate answers the two questions the migration engine asks about
//! every file:
//!
//! - **Age** - is the file old enough to archive?
//! - **Hash** - does the archived copy hold exactly the source's bytes?
//!
//! ```rust,no_run
//! use agevault_analyze::{AgePolicy, hash};
//!
//! let policy = AgePolicy::from_days(365.0).unwrap();
//! if policy.is_eligible("/share/old.txt").unwrap() {
//!     // ... copy to /arch/share/old.txt ...
//!     assert!(hash::equal("/share/old.txt", "/arch/share/old.txt").unwrap());
//! }
//! ```

pub mod age;
pub mod hash;

pub use age::{AgePolicy, days_to_seconds, format_age, is_eligible};

// Re-export core types
pub use agevault_core::{Digest, SECONDS_PER_DAY};

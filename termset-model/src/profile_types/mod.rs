//! Profile entity model and tree operations.
//!
//! ## Sub-modules
//!
//! - [`profile`]: `ProfileSettings` (one layer) and the resolved `Profile`
//! - [`group`]: `ProfileGroup` and the `ProfileEntry` sum type
//! - [`tree`]: flatten, find, hide-filter and dedup over the tree

pub mod group;
pub mod profile;
pub mod tree;

pub use group::{DEFAULT_GROUP_NAME, ProfileEntry, ProfileGroup};
pub use profile::{Profile, ProfileSettings};

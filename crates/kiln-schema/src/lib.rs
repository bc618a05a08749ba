//! Shared types for kiln: package identities, descriptors, and the
//! entry point declaration syntax that packages use to advertise
//! capabilities.

pub mod descriptor;
pub mod entry_point;
pub mod types;

// Re-exports
pub use descriptor::{PackageDescriptor, PackageId};
pub use entry_point::{Declaration, DeclarationError, EntryPoint, Target, parse_entry_points};
pub use types::*;

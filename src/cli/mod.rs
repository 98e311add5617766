//! Admin subcommands that read or maintain the store without serving.

pub mod stats;
pub mod sweep;

pub use stats::stats;
pub use sweep::sweep;

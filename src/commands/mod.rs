//! CLI commands implementation

pub mod diagnose;
pub mod generate;
pub mod ingest;
pub mod init;
pub mod query;
pub mod sweep;

pub use diagnose::*;
pub use generate::*;
pub use ingest::*;
pub use init::*;
pub use query::*;
pub use sweep::*;

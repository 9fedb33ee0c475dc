/// CLI Indexes: Network variants
pub mod variants;

pub use variants::Variant;

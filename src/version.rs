/// Version of this provider crate, reported in logs.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build identifier baked in by `build.rs`.
pub const GIT_VERSION: &str = env!("GIT_VERSION");

pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

//! Configuration loading and the runtime endpoint provider.

pub mod loader;
pub mod provider;

pub use loader::{load, load_from_env, load_from_file};
pub use provider::StaticEndpointProvider;

mod cache;
mod client;
pub mod links;
mod types;

pub use cache::ConsoleCache;
pub use client::GoClient;
pub use types::{BuildingInfo, JobLocator};

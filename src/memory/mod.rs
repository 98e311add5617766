pub mod context_pack;
pub mod lifecycle;
pub mod ranking;
pub mod search;
pub mod service;
pub mod stats;
pub mod store;
pub mod types;

pub use service::MemoryService;

pub mod config;
pub mod event_bus;
pub mod scheduler;
pub mod tab_store;

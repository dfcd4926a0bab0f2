/// Shared modules for the Pulse spread monitor
pub mod config;
pub mod controls;
pub mod dashboard;
pub mod fetcher;
pub mod logging;
pub mod reconciler;
pub mod scheduler;
pub mod sort;
pub mod types;
pub mod widget;

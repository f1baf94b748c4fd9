pub mod actions;
pub mod cli;
pub mod config;
pub mod data_paths;
pub mod display;
pub mod gateway;
pub mod logging;
pub mod session;
pub mod store;

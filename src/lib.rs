pub mod artifacts;
pub mod audit;
pub mod clipboard;
pub mod config;
pub mod errors;
pub mod extract;
pub mod flow_config;
pub mod logging;
pub mod operator;
pub mod orchestrator;
pub mod phase;
pub mod surface;
pub mod ui;

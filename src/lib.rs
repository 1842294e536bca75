pub mod assessment;
pub mod browser;
pub mod clusters;
pub mod config;
pub mod fetch;
pub mod logging;
pub mod output;
pub mod reclassify;
pub mod review;
pub mod stderr_buffer;
pub mod tui;

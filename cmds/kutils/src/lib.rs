pub mod commands;
pub mod config;
pub mod docpath;
pub mod flatten;
pub mod helm;
pub mod ini;
pub mod kubectl;
pub mod manifest;
pub mod process;
pub mod report;
pub mod sizing;
pub mod telemetry;
#[cfg(test)]
pub mod test_utils;
pub mod values;
pub mod yaml;

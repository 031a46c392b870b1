//! Helm values files: analysis of existing charts and generation from sizing INI files.

pub mod analysis;
pub mod generate;

pub mod helm;
pub mod manifest;
pub mod pods;
pub mod sizing;
pub mod values;

pub mod util;

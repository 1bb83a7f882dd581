pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod git;
pub mod github;
pub mod history;
pub mod model;
pub mod paths;
pub mod profile;
pub mod ranges;
pub mod report;
pub mod sort;
pub mod threshold;

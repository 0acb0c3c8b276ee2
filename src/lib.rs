pub mod app;
pub mod archive;
pub mod config;
pub mod domain;
pub mod error;
pub mod ncbi;
pub mod output;

pub mod cli;
pub mod config;
pub mod models;
pub mod services;
pub mod storage;
pub mod web;

#[cfg(test)]
mod tests;

pub use config::Config;

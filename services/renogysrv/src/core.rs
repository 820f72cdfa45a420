//! Service core: configuration and bootstrap

pub mod bootstrap;
pub mod config;

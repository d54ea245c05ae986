pub mod config;
pub mod error;
pub mod logger;
pub mod model;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;

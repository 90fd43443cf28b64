//! Core translation engine module

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod models;
pub mod tokenizer;

#[cfg(test)]
pub(crate) mod test_support;

//! Document processors

pub mod chunker;
pub mod latex;

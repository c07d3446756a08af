//! Presentation-facing modules

pub mod export;

// Domain layer - Core types and lifecycle rules

pub mod errors;
pub mod model;
pub mod rules;

// Domain layer - Ladder model, naming contract and validation rules

pub mod errors;
pub mod model;
pub mod rules;

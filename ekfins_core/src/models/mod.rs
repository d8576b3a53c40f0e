// ekfins_core/src/models/mod.rs

pub mod error_state;
pub mod observation;

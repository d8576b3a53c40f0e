// ekfins_core/src/estimation/mod.rs

//! Consumers of observation results that act on an error-state estimate.

pub mod correction;

// ekfins_core/src/lib.rs

// Error-state and observation models for a strapdown INS / GNSS Kalman filter.
pub mod config;
pub mod earth;
pub mod error;
pub mod estimation;
pub mod frames;
pub mod models;
pub mod prelude;
pub mod types;

//! Healthcare entity recognition gateway.
//!
//! Accepts batches of clinical text over HTTP, delegates entity extraction to
//! a [`services::providers::HealthcareProvider`] and returns the recognised
//! entities as a flat list.

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

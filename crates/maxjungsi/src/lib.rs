//! Admission score engine for a test-prep academy's counseling tools.
//!
//! [`scoring`] holds the pure calculators. [`catalog`], [`service`] and [`router`] wrap them
//! with the data-access boundary and the HTTP surface used by the api binary.

pub mod catalog;
pub mod config;
pub mod error;
pub mod router;
pub mod scoring;
pub mod service;
pub mod telemetry;

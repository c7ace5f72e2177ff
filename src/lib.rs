//! Client library for the plans service.
//!
//! Plans are rating/subscription policies attached to charms. The crate
//! offers:
//! - `identifier`: parsing and validation of plan URLs and plan IDs
//! - `compat`: decoding of records whose field names changed across API versions
//! - `client`: the `PlanClient` trait and its reqwest implementation
//! - `error`: classification of service responses into typed errors
//!
//! The `cli` and `output` modules back the `plans` and `charm-push-plan`
//! binaries.

pub mod cli;
pub mod client;
pub mod compat;
pub mod config;
pub mod error;
pub mod identifier;
pub mod models;
pub mod output;

pub use client::{HttpPlanClient, PlanClient};
pub use config::ClientConfig;
pub use error::{ApiError, Error, ErrorKind, Result};
pub use identifier::{PlanId, PlanOwner, PlanUrl};
pub use models::{Plan, PlanDetails};

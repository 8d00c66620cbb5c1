//! # Declarative
//!
//! A framework for declarative resource lifecycles.
//!
//! This crate provides the contract between a host control loop and the code
//! that manages one kind of remote resource: the host hands each instance's
//! persisted id and desired fields to four lifecycle operations, and those
//! operations converge the remote system and write the resulting state back.
//!
//! ## Core Concepts
//!
//! - **Lifecycle**: create/read/update/delete for one resource type
//! - **ResourceData**: an instance's id, last-known state and planned values
//! - **CancelToken**: cooperative cancellation for in-flight calls
//! - **Executor**: refreshes, plans and applies many instances in parallel
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{ExecuteOptions, Instance, execute_simple};
//!
//! let instances = vec![Instance::fresh("budgeteer_api_key.svc_a", desired)];
//! let report = execute_simple(&resource, instances, &ExecuteOptions::default())?;
//! println!("{} created", report.summary.created);
//! ```
//!
//! ## Provider Traits
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks or prompt libraries.

pub mod cancel;
pub mod context;
pub mod executor;
pub mod planner;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use cancel::CancelToken;
pub use context::{
    ApplyContext, AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback,
};
pub use executor::{ExecuteReport, Outcome, execute, execute_simple};
pub use planner::{Instance, plan_action};
pub use resource::{Lifecycle, ResourceData};
pub use types::{Action, ApplyResult, Creation, ExecuteOptions, ExecuteSummary};

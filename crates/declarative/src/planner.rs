//! Action planner - decides what the host loop does with each instance

use crate::resource::{Lifecycle, ResourceData};
use crate::types::Action;

/// An instance handed to the executor
///
/// `desired` is `None` when the instance should no longer exist.
#[derive(Debug, Clone)]
pub struct Instance<M> {
    /// Host-side address used in progress and error output
    pub address: String,
    /// Persisted id and last-known state
    pub data: ResourceData<M>,
    /// Desired configuration, or `None` to delete
    pub desired: Option<M>,
}

impl<M: Clone> Instance<M> {
    /// An instance with no persisted state yet
    pub fn fresh(address: impl Into<String>, desired: M) -> Self {
        Self {
            address: address.into(),
            data: ResourceData::new(desired.clone()),
            desired: Some(desired),
        }
    }

    /// An instance restored from persisted state and still desired
    pub fn tracked(address: impl Into<String>, id: impl Into<String>, state: M, desired: M) -> Self {
        Self {
            address: address.into(),
            data: ResourceData::from_state(id, state),
            desired: Some(desired),
        }
    }

    /// An instance restored from persisted state that should be removed
    pub fn orphaned(address: impl Into<String>, id: impl Into<String>, state: M) -> Self {
        Self {
            address: address.into(),
            data: ResourceData::from_state(id, state),
            desired: None,
        }
    }
}

/// Decide the action for an already refreshed instance
///
/// Overlay the desired configuration onto the planned values before calling
/// this; the decision is a function of the id and the configured fields only.
pub fn plan_action<L: Lifecycle>(
    resource: &L,
    data: &ResourceData<L::Model>,
    desired_present: bool,
) -> Action {
    match (desired_present, data.is_new()) {
        (true, true) => Action::Create,
        (true, false) if resource.has_config_change(data) => Action::Update,
        (true, false) => Action::NoChange,
        (false, false) => Action::Delete,
        (false, true) => Action::NoChange,
    }
}

//! Lifecycle trait and instance record for declarative state management
//!
//! A [`Lifecycle`] maps the four host-driven operations (create, read, update,
//! delete) onto some remote system. Each managed instance travels through
//! those operations as a [`ResourceData`]: the persisted identifier, the
//! last-known state and the planned values the operation should converge to.

use crate::context::ApplyContext;
use crate::types::Creation;
use std::fmt;

/// Core trait for resources managed through a create/read/update/delete loop
///
/// Operations receive the instance record mutably. They write the converged
/// state into [`ResourceData::planned_mut`] and maintain the identifier:
/// setting it once a remote record exists, clearing it once it is gone.
///
/// # Example
///
/// ```ignore
/// use declarative::{ApplyContext, Creation, Lifecycle, ResourceData};
///
/// struct Note;
///
/// impl Lifecycle for Note {
///     type Model = String;
///     type Error = std::io::Error;
///
///     fn resource_type(&self) -> &'static str { "note" }
///
///     fn create(&self, _ctx: &ApplyContext, data: &mut ResourceData<String>) -> Result<Creation, Self::Error> {
///         data.set_id("1");
///         Ok(Creation::New)
///     }
///     // read, update, delete ...
/// }
/// ```
pub trait Lifecycle: Send + Sync {
    /// Field model of one instance (desired and computed fields together)
    type Model: Clone + fmt::Debug + Send + Sync;

    /// Error surfaced to the host when an operation fails
    type Error: std::error::Error + Send + Sync + 'static;

    /// Resource type name, e.g. "budgeteer_api_key"
    fn resource_type(&self) -> &'static str;

    /// Create the remote record for a new instance, or adopt a matching one
    fn create(
        &self,
        ctx: &ApplyContext,
        data: &mut ResourceData<Self::Model>,
    ) -> Result<Creation, Self::Error>;

    /// Refresh the instance from remote; clear the id if the record is gone
    fn read(
        &self,
        ctx: &ApplyContext,
        data: &mut ResourceData<Self::Model>,
    ) -> Result<(), Self::Error>;

    /// Push changed configuration fields to the existing record
    fn update(
        &self,
        ctx: &ApplyContext,
        data: &mut ResourceData<Self::Model>,
    ) -> Result<(), Self::Error>;

    /// Delete the remote record and clear the id
    fn delete(
        &self,
        ctx: &ApplyContext,
        data: &mut ResourceData<Self::Model>,
    ) -> Result<(), Self::Error>;

    /// Overlay the user-settable fields of `desired` onto `planned`
    fn merge_config(&self, planned: &mut Self::Model, desired: &Self::Model);

    /// Whether the configured fields differ from the last-known state
    fn has_config_change(&self, data: &ResourceData<Self::Model>) -> bool;
}

/// One managed instance: identifier, last-known state and planned values
#[derive(Clone)]
pub struct ResourceData<M> {
    id: String,
    prior: Option<M>,
    planned: M,
}

impl<M: Clone> ResourceData<M> {
    /// A new instance that has never been created remotely
    pub fn new(planned: M) -> Self {
        Self {
            id: String::new(),
            prior: None,
            planned,
        }
    }

    /// An instance restored from persisted state
    pub fn from_state(id: impl Into<String>, state: M) -> Self {
        Self {
            id: id.into(),
            prior: Some(state.clone()),
            planned: state,
        }
    }

    /// Persisted identifier; empty when no remote record is known
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Forget the remote record; the host treats the instance as absent
    pub fn clear_id(&mut self) {
        self.id.clear();
    }

    /// Whether no remote record is known for this instance
    pub fn is_new(&self) -> bool {
        self.id.is_empty()
    }

    pub fn planned(&self) -> &M {
        &self.planned
    }

    pub fn planned_mut(&mut self) -> &mut M {
        &mut self.planned
    }

    /// Replace the planned values wholesale
    pub fn set_planned(&mut self, planned: M) {
        self.planned = planned;
    }

    /// Last-known state, if the instance was ever committed
    pub fn prior(&self) -> Option<&M> {
        self.prior.as_ref()
    }

    /// Whether a field differs between last-known state and planned values
    ///
    /// Every field counts as changed for an instance with no prior state.
    pub fn has_change<T, F>(&self, field: F) -> bool
    where
        T: PartialEq + ?Sized,
        F: Fn(&M) -> &T,
    {
        match &self.prior {
            Some(prior) => field(prior) != field(&self.planned),
            None => true,
        }
    }

    /// Make the planned values the new last-known state
    pub fn commit(&mut self) {
        self.prior = Some(self.planned.clone());
    }

    /// Consume the record, returning id and planned values
    pub fn into_parts(self) -> (String, M) {
        (self.id, self.planned)
    }
}

impl<M: fmt::Debug> fmt::Debug for ResourceData<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceData")
            .field("id", &self.id)
            .field("prior", &self.prior)
            .field("planned", &self.planned)
            .finish()
    }
}

//! API key resource - reconciles one budgeted key against the budget service
//!
//! Convergence policy:
//! - create adopts an existing key with the same name instead of duplicating it
//! - update sends only the fields that changed, then refreshes
//! - read clears the id when the key is gone remotely (drift, not an error)
//! - delete keeps the id when the service refuses, so the next run retries

use budgetkit::{Error, KeyApi, KeyPatch, UNLIMITED_BUDGET};
use declarative::{ApplyContext, Creation, Lifecycle, ResourceData};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource type name used in addresses and logs
pub const RESOURCE_TYPE: &str = "budgeteer_api_key";

/// Fields of one API key instance
///
/// `name` and `budget` are configured; everything else is read back from the
/// service and never sent.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyModel {
    pub name: String,
    #[serde(default = "default_budget")]
    pub budget: i64,
    /// Secret key material, only ever populated from the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_value: Option<String>,
    #[serde(default)]
    pub costs: f64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_used_at: Option<String>,
}

fn default_budget() -> i64 {
    UNLIMITED_BUDGET
}

impl ApiKeyModel {
    /// Desired configuration for a key; computed fields start empty
    pub fn desired(name: impl Into<String>, budget: Option<i64>) -> Self {
        Self {
            name: name.into(),
            budget: budget.unwrap_or(UNLIMITED_BUDGET),
            key_value: None,
            costs: 0.0,
            created_at: None,
            last_used_at: None,
        }
    }
}

impl fmt::Debug for ApiKeyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyModel")
            .field("name", &self.name)
            .field("budget", &self.budget)
            .field("key_value", &self.key_value.as_ref().map(|_| "<redacted>"))
            .field("costs", &self.costs)
            .field("created_at", &self.created_at)
            .field("last_used_at", &self.last_used_at)
            .finish()
    }
}

/// Lifecycle of `budgeteer_api_key` instances against one service
///
/// Borrows its client; every call receives the backend explicitly instead of
/// reaching for shared state.
pub struct ApiKeyResource<'a> {
    api: &'a dyn KeyApi,
}

impl<'a> ApiKeyResource<'a> {
    pub fn new(api: &'a dyn KeyApi) -> Self {
        Self { api }
    }

    /// Parse the persisted id; `None` if it cannot name a remote key
    fn remote_id(data: &ResourceData<ApiKeyModel>) -> Option<i64> {
        data.id().parse().ok()
    }

    fn require_remote_id(data: &ResourceData<ApiKeyModel>) -> Result<i64, Error> {
        Self::remote_id(data)
            .ok_or_else(|| Error::InvalidConfig(format!("invalid API key id '{}'", data.id())))
    }
}

impl Lifecycle for ApiKeyResource<'_> {
    type Model = ApiKeyModel;
    type Error = Error;

    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn create(
        &self,
        ctx: &ApplyContext,
        data: &mut ResourceData<ApiKeyModel>,
    ) -> Result<Creation, Error> {
        let name = data.planned().name.clone();
        let budget = data.planned().budget;

        if name.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "API key name must not be empty".to_string(),
            ));
        }

        let existing = self.api.list_key_summaries(&ctx.cancel)?;
        if let Some(record) = existing.iter().find(|record| record.name == name) {
            log::info!("Adopting existing API key '{}' (id {})", name, record.id);
            let changed = record.budget != budget;
            if changed {
                log::info!(
                    "Updating budget of '{}' from {} to {}",
                    name,
                    record.budget,
                    budget
                );
                self.api.update_key_budget(&ctx.cancel, record.id, budget)?;
            }
            data.set_id(record.id.to_string());
            self.read(ctx, data)?;
            return Ok(Creation::Adopted { changed });
        }

        let created = self.api.create_key(&ctx.cancel, &name, budget)?;
        log::info!("Created API key '{}' (id {})", name, created.id);
        data.set_id(created.id.to_string());
        if let Some(key) = created.key {
            data.planned_mut().key_value = Some(key);
        }

        self.read(ctx, data)?;
        Ok(Creation::New)
    }

    fn read(&self, ctx: &ApplyContext, data: &mut ResourceData<ApiKeyModel>) -> Result<(), Error> {
        if data.is_new() {
            return Ok(());
        }

        let Some(id) = Self::remote_id(data) else {
            log::warn!("API key id '{}' is not numeric, dropping from state", data.id());
            data.clear_id();
            return Ok(());
        };

        let summaries = self.api.list_key_summaries(&ctx.cancel)?;
        let Some(record) = summaries.into_iter().find(|record| record.id == id) else {
            log::warn!("API key {} no longer exists remotely, dropping from state", id);
            data.clear_id();
            return Ok(());
        };

        let model = data.planned_mut();
        model.name = record.name;
        model.budget = record.budget;
        model.costs = record.costs;
        model.created_at = record.created_at;
        model.last_used_at = record.last_used_at;

        // A key missing from the full listing keeps its known secret.
        let full = self.api.list_full_keys(&ctx.cancel)?;
        match full.into_iter().find(|record| record.id == id) {
            Some(record) => {
                if let Some(key) = record.key {
                    data.planned_mut().key_value = Some(key);
                }
            }
            None => log::debug!("API key {} missing from full listing, keeping secret", id),
        }

        Ok(())
    }

    fn update(&self, ctx: &ApplyContext, data: &mut ResourceData<ApiKeyModel>) -> Result<(), Error> {
        let id = Self::require_remote_id(data)?;

        let planned = data.planned();
        let patch = KeyPatch {
            name: data
                .has_change(|m| &m.name)
                .then(|| planned.name.clone()),
            budget: data.has_change(|m| &m.budget).then_some(planned.budget),
        };

        if patch.is_empty() {
            log::debug!("API key {} has no configured changes", id);
        } else {
            self.api.update_key(&ctx.cancel, id, &patch)?;
        }

        self.read(ctx, data)
    }

    fn delete(&self, ctx: &ApplyContext, data: &mut ResourceData<ApiKeyModel>) -> Result<(), Error> {
        if data.is_new() {
            return Ok(());
        }

        let id = Self::require_remote_id(data)?;
        self.api.delete_key(&ctx.cancel, id)?;
        log::info!("Deleted API key {}", id);
        data.clear_id();
        Ok(())
    }

    fn merge_config(&self, planned: &mut ApiKeyModel, desired: &ApiKeyModel) {
        planned.name.clone_from(&desired.name);
        planned.budget = desired.budget;
    }

    fn has_config_change(&self, data: &ResourceData<ApiKeyModel>) -> bool {
        data.has_change(|m| &m.name) || data.has_change(|m| &m.budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use budgetkit::{Call, MockBackend, Operation};

    fn ctx() -> ApplyContext {
        ApplyContext::new(false)
    }

    fn new_key(name: &str, budget: i64) -> ResourceData<ApiKeyModel> {
        ResourceData::new(ApiKeyModel::desired(name, Some(budget)))
    }

    /// Create, then restore the result the way a host would on its next run
    fn created(mock: &MockBackend, name: &str, budget: i64) -> ResourceData<ApiKeyModel> {
        let mut data = new_key(name, budget);
        ApiKeyResource::new(mock).create(&ctx(), &mut data).unwrap();
        let (id, state) = data.into_parts();
        ResourceData::from_state(id, state)
    }

    #[test]
    fn test_create_against_empty_remote() {
        let mock = MockBackend::new();
        let resource = ApiKeyResource::new(&mock);
        let mut data = new_key("svc-a", 1000);

        resource.create(&ctx(), &mut data).unwrap();

        let records = mock.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].budget, 1000);
        assert_eq!(data.id(), records[0].id.to_string());
        assert!(data.planned().key_value.is_some());
        assert!(data.planned().costs.abs() < f64::EPSILON);
    }

    #[test]
    fn test_create_twice_adopts_instead_of_duplicating() {
        let mock = MockBackend::new();
        let resource = ApiKeyResource::new(&mock);

        let mut first = new_key("svc-a", 1000);
        let made = resource.create(&ctx(), &mut first).unwrap();
        let mut second = new_key("svc-a", 1000);
        let adopted = resource.create(&ctx(), &mut second).unwrap();

        assert_eq!(made, Creation::New);
        assert_eq!(adopted, Creation::Adopted { changed: false });

        assert_eq!(mock.records().len(), 1);
        assert_eq!(first.id(), second.id());
        assert_eq!(mock.call_count(Operation::Create), 1);
        assert_eq!(mock.call_count(Operation::Update), 0);
    }

    #[test]
    fn test_create_adopts_and_updates_budget() {
        let mock = MockBackend::new();
        let existing = mock.seed("svc-a", 1000);
        let resource = ApiKeyResource::new(&mock);
        let mut data = new_key("svc-a", 2000);

        let creation = resource.create(&ctx(), &mut data).unwrap();

        assert_eq!(creation, Creation::Adopted { changed: true });
        assert_eq!(mock.records().len(), 1);
        assert_eq!(mock.record(existing).unwrap().budget, 2000);
        assert_eq!(data.id(), existing.to_string());
        assert_eq!(data.planned().budget, 2000);
        assert_eq!(mock.call_count(Operation::Create), 0);
    }

    #[test]
    fn test_adopted_key_gets_secret_from_full_listing() {
        let mock = MockBackend::new();
        let existing = mock.seed("svc-a", 1000);
        let mut data = new_key("svc-a", 1000);

        ApiKeyResource::new(&mock).create(&ctx(), &mut data).unwrap();

        assert_eq!(data.planned().key_value, mock.record(existing).unwrap().key);
    }

    #[test]
    fn test_create_converges_computed_fields() {
        let mock = MockBackend::new();
        let mut data = new_key("svc-a", 1000);
        ApiKeyResource::new(&mock).create(&ctx(), &mut data).unwrap();

        let record = mock.record(data.id().parse().unwrap()).unwrap();
        let model = data.planned();
        assert_eq!(model.budget, record.budget);
        assert!((model.costs - record.costs).abs() < f64::EPSILON);
        assert_eq!(model.created_at, record.created_at);
        assert_eq!(model.last_used_at, record.last_used_at);
    }

    #[test]
    fn test_create_rejects_empty_name_without_calls() {
        let mock = MockBackend::new();
        let mut data = new_key("  ", 10);

        let err = ApiKeyResource::new(&mock)
            .create(&ctx(), &mut data)
            .unwrap_err();

        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_create_failure_leaves_id_empty() {
        let mock = MockBackend::new();
        mock.reject_next(Operation::Create, 500);
        let mut data = new_key("svc-a", 10);

        let err = ApiKeyResource::new(&mock)
            .create(&ctx(), &mut data)
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert!(data.is_new());
    }

    #[test]
    fn test_failed_adoption_update_leaves_id_empty() {
        let mock = MockBackend::new();
        mock.seed("svc-a", 1000);
        mock.reject_next(Operation::Update, 503);
        let mut data = new_key("svc-a", 2000);

        let err = ApiKeyResource::new(&mock)
            .create(&ctx(), &mut data)
            .unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert!(data.is_new());
    }

    #[test]
    fn test_read_empty_id_is_noop() {
        let mock = MockBackend::new();
        let mut data = new_key("svc-a", 10);
        let before = data.planned().clone();

        ApiKeyResource::new(&mock).read(&ctx(), &mut data).unwrap();

        assert!(data.is_new());
        assert_eq!(data.planned(), &before);
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_read_detects_out_of_band_delete() {
        let mock = MockBackend::new();
        let mut data = created(&mock, "svc-a", 10);
        mock.remove(data.id().parse().unwrap());

        ApiKeyResource::new(&mock).read(&ctx(), &mut data).unwrap();

        assert!(data.is_new());
    }

    #[test]
    fn test_read_non_numeric_id_is_drift() {
        let mock = MockBackend::new();
        let mut data = ResourceData::from_state("svc-a", ApiKeyModel::desired("svc-a", None));

        ApiKeyResource::new(&mock).read(&ctx(), &mut data).unwrap();

        assert!(data.is_new());
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_read_pulls_remote_fields() {
        let mock = MockBackend::new();
        let mut data = created(&mock, "svc-a", 10);
        let id: i64 = data.id().parse().unwrap();
        mock.set_costs(id, 4.25);
        mock.set_last_used_at(id, "2024-06-01T08:00:00Z");

        ApiKeyResource::new(&mock).read(&ctx(), &mut data).unwrap();

        assert!((data.planned().costs - 4.25).abs() < f64::EPSILON);
        assert_eq!(
            data.planned().last_used_at.as_deref(),
            Some("2024-06-01T08:00:00Z")
        );
    }

    #[test]
    fn test_read_keeps_secret_when_full_listing_omits_key() {
        let mock = MockBackend::new();
        let mut data = created(&mock, "svc-a", 10);
        let secret = data.planned().key_value.clone();
        assert!(secret.is_some());
        mock.hide_from_full_listing(data.id().parse().unwrap());

        ApiKeyResource::new(&mock).read(&ctx(), &mut data).unwrap();

        assert_eq!(data.planned().key_value, secret);
        assert!(!data.is_new());
    }

    #[test]
    fn test_read_never_mutates_remote() {
        let mock = MockBackend::new();
        let mut data = created(&mock, "svc-a", 10);
        let before = mock.records();

        let resource = ApiKeyResource::new(&mock);
        resource.read(&ctx(), &mut data).unwrap();
        resource.read(&ctx(), &mut data).unwrap();

        assert_eq!(mock.records(), before);
        assert_eq!(mock.call_count(Operation::Create), 1);
        assert_eq!(mock.call_count(Operation::Update), 0);
    }

    #[test]
    fn test_update_budget_issues_single_put() {
        let mock = MockBackend::new();
        let mut data = created(&mock, "svc-a", 1000);
        let id: i64 = data.id().parse().unwrap();
        data.planned_mut().budget = 500;

        ApiKeyResource::new(&mock).update(&ctx(), &mut data).unwrap();

        assert_eq!(mock.call_count(Operation::Update), 1);
        assert!(mock.calls().contains(&Call::Update {
            id,
            patch: KeyPatch::budget(500)
        }));
        assert_eq!(data.planned().budget, 500);
        assert_eq!(mock.record(id).unwrap().budget, 500);
    }

    #[test]
    fn test_update_rename_sends_name_only() {
        let mock = MockBackend::new();
        let mut data = created(&mock, "svc-a", 1000);
        let id: i64 = data.id().parse().unwrap();
        data.planned_mut().name = "svc-renamed".to_string();

        ApiKeyResource::new(&mock).update(&ctx(), &mut data).unwrap();

        assert!(mock.calls().contains(&Call::Update {
            id,
            patch: KeyPatch {
                name: Some("svc-renamed".to_string()),
                budget: None,
            }
        }));
        assert_eq!(mock.record(id).unwrap().name, "svc-renamed");
        assert_eq!(data.planned().name, "svc-renamed");
    }

    #[test]
    fn test_update_without_changes_only_refreshes() {
        let mock = MockBackend::new();
        let mut data = created(&mock, "svc-a", 1000);
        mock.set_costs(data.id().parse().unwrap(), 9.0);

        ApiKeyResource::new(&mock).update(&ctx(), &mut data).unwrap();

        assert_eq!(mock.call_count(Operation::Update), 0);
        assert!((data.planned().costs - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_update_rejected() {
        let mock = MockBackend::new();
        let mut data = created(&mock, "svc-a", 1000);
        data.planned_mut().budget = 1;
        mock.reject_next(Operation::Update, 422);

        let err = ApiKeyResource::new(&mock)
            .update(&ctx(), &mut data)
            .unwrap_err();

        assert!(matches!(
            err,
            Error::RemoteRejected {
                operation: Operation::Update,
                status: 422,
                ..
            }
        ));
    }

    #[test]
    fn test_delete_clears_id() {
        let mock = MockBackend::new();
        let mut data = created(&mock, "svc-a", 10);

        ApiKeyResource::new(&mock).delete(&ctx(), &mut data).unwrap();

        assert!(data.is_new());
        assert!(mock.records().is_empty());
    }

    #[test]
    fn test_delete_of_vanished_key_fails_and_keeps_id() {
        let mock = MockBackend::new();
        let mut data = created(&mock, "svc-a", 10);
        let id = data.id().to_string();
        mock.remove(id.parse().unwrap());

        let err = ApiKeyResource::new(&mock)
            .delete(&ctx(), &mut data)
            .unwrap_err();

        assert!(matches!(
            err,
            Error::RemoteRejected {
                operation: Operation::Delete,
                ..
            }
        ));
        assert_eq!(data.id(), id);
    }

    #[test]
    fn test_delete_empty_id_is_noop() {
        let mock = MockBackend::new();
        let mut data = new_key("svc-a", 10);

        ApiKeyResource::new(&mock).delete(&ctx(), &mut data).unwrap();

        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_cancelled_create_reports_cancellation() {
        let mock = MockBackend::new();
        let ctx = ctx();
        ctx.cancel.cancel();
        let mut data = new_key("svc-a", 10);

        let err = ApiKeyResource::new(&mock)
            .create(&ctx, &mut data)
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(data.is_new());
        assert!(mock.records().is_empty());
    }

    #[test]
    fn test_secret_is_redacted_in_debug() {
        let mut model = ApiKeyModel::desired("svc-a", None);
        model.key_value = Some("bk-0001-svc-a".into());
        let debug = format!("{:?}", model);
        assert!(!debug.contains("bk-0001"));
        assert_eq!(model.budget, UNLIMITED_BUDGET);
    }

    #[test]
    fn test_has_config_change() {
        let mock = MockBackend::new();
        let resource = ApiKeyResource::new(&mock);
        let mut data = ResourceData::from_state("1", ApiKeyModel::desired("svc-a", Some(5)));
        assert!(!resource.has_config_change(&data));

        data.planned_mut().costs = 3.0;
        assert!(!resource.has_config_change(&data));

        resource.merge_config(data.planned_mut(), &ApiKeyModel::desired("svc-a", Some(6)));
        assert!(resource.has_config_change(&data));
    }

    #[test]
    fn test_executor_converges_mixed_instances() {
        use declarative::{ApplyResult, ExecuteOptions, Instance, execute_simple};

        let mock = MockBackend::new();
        let seeded = mock.seed("svc-b", 100);
        let doomed = mock.seed("svc-c", 5);
        let resource = ApiKeyResource::new(&mock);

        let instances = vec![
            Instance::fresh("api_key.a", ApiKeyModel::desired("svc-a", Some(10))),
            Instance::tracked(
                "api_key.b",
                seeded.to_string(),
                ApiKeyModel::desired("svc-b", Some(100)),
                ApiKeyModel::desired("svc-b", Some(250)),
            ),
            Instance::orphaned(
                "api_key.c",
                doomed.to_string(),
                ApiKeyModel::desired("svc-c", Some(5)),
            ),
        ];

        let report = execute_simple(&resource, instances, &ExecuteOptions::default()).unwrap();

        assert!(report.summary.is_success());
        assert_eq!(report.summary.created, 1);
        assert_eq!(report.summary.modified, 1);
        assert_eq!(report.summary.removed, 1);
        assert_eq!(mock.record(seeded).unwrap().budget, 250);
        assert!(mock.record(doomed).is_none());
        assert!(
            report
                .outcomes
                .iter()
                .all(|outcome| !matches!(outcome.result, ApplyResult::Failed { .. }))
        );
    }

    #[test]
    fn test_executor_recreates_drifted_key() {
        use declarative::{ExecuteOptions, Instance, execute_simple};

        let mock = MockBackend::new();
        let resource = ApiKeyResource::new(&mock);
        let instances = vec![Instance::tracked(
            "api_key.gone",
            "42",
            ApiKeyModel::desired("svc-gone", Some(10)),
            ApiKeyModel::desired("svc-gone", Some(10)),
        )];

        let report = execute_simple(&resource, instances, &ExecuteOptions::default()).unwrap();

        assert_eq!(report.summary.drifted, 1);
        assert_eq!(report.summary.created, 1);
        assert_eq!(mock.records().len(), 1);
        assert_ne!(report.outcomes[0].data.id(), "42");
    }

    #[test]
    fn test_read_keeps_secret_when_full_record_has_none() {
        let mock = MockBackend::new();
        let mut data = created(&mock, "svc-a", 10);
        let secret = data.planned().key_value.clone();
        assert!(secret.is_some());
        mock.strip_secret(data.id().parse().unwrap());

        ApiKeyResource::new(&mock).read(&ctx(), &mut data).unwrap();

        assert_eq!(data.planned().key_value, secret);
        assert_eq!(mock.call_count(Operation::ListFull), 2);
    }

    #[test]
    fn test_executor_rerun_reports_adopted_keys_unchanged() {
        use declarative::{ExecuteOptions, Instance, execute_simple};

        let mock = MockBackend::new();
        let resource = ApiKeyResource::new(&mock);
        let manifest = || {
            vec![
                Instance::fresh("api_key.a", ApiKeyModel::desired("svc-a", Some(10))),
                Instance::fresh("api_key.b", ApiKeyModel::desired("svc-b", Some(20))),
            ]
        };

        let first = execute_simple(&resource, manifest(), &ExecuteOptions::default()).unwrap();
        assert_eq!(first.summary.created, 2);

        let second = execute_simple(&resource, manifest(), &ExecuteOptions::default()).unwrap();
        assert_eq!(second.summary.created, 0);
        assert_eq!(second.summary.no_change, 2);
        assert_eq!(second.summary.total_changes(), 0);
        assert_eq!(mock.call_count(Operation::Create), 2);
    }
}

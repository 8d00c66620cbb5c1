//! Single-instance lifecycle commands
//!
//! Each command drives one lifecycle call the way a plugin host would and
//! prints the resulting instance.

use anyhow::{Result, bail};
use budgetkit::KeyApi;
use declarative::{ApplyContext, Lifecycle, ResourceData};

use super::{explain, print_instance};
use crate::Context;
use crate::resource::{ApiKeyModel, ApiKeyResource};
use crate::ui;

/// Create a key, adopting an existing one with the same name
pub fn create(ctx: &Context, api: &dyn KeyApi, name: &str, budget: Option<i64>) -> Result<()> {
    let data = create_instance(api, name, budget)?;
    print_instance(&data, ctx.show_secret)
}

/// Read a key; fails if the service no longer has it
pub fn read(ctx: &Context, api: &dyn KeyApi, id: &str) -> Result<()> {
    let data = refresh(api, id)?;
    print_instance(&data, ctx.show_secret)
}

/// Apply a name and/or budget change to an existing key
pub fn update(
    ctx: &Context,
    api: &dyn KeyApi,
    id: &str,
    name: Option<String>,
    budget: Option<i64>,
) -> Result<()> {
    let data = update_instance(api, id, name, budget)?;
    print_instance(&data, ctx.show_secret)
}

/// Delete a key
pub fn delete(ctx: &Context, api: &dyn KeyApi, id: &str) -> Result<()> {
    delete_instance(api, id)?;
    if !ctx.quiet {
        ui::success(&format!("Deleted API key {}", id));
    }
    Ok(())
}

fn create_instance(
    api: &dyn KeyApi,
    name: &str,
    budget: Option<i64>,
) -> Result<ResourceData<ApiKeyModel>> {
    let resource = ApiKeyResource::new(api);
    let mut data = ResourceData::new(ApiKeyModel::desired(name, budget));
    resource
        .create(&ApplyContext::default(), &mut data)
        .map_err(explain)?;
    Ok(data)
}

/// Read `id` into a fresh instance; the read fills every field
fn refresh(api: &dyn KeyApi, id: &str) -> Result<ResourceData<ApiKeyModel>> {
    let resource = ApiKeyResource::new(api);
    let mut data = ResourceData::from_state(id, ApiKeyModel::desired("", None));
    resource
        .read(&ApplyContext::default(), &mut data)
        .map_err(explain)?;

    if data.is_new() {
        bail!("API key {} not found", id);
    }
    data.commit();
    Ok(data)
}

fn update_instance(
    api: &dyn KeyApi,
    id: &str,
    name: Option<String>,
    budget: Option<i64>,
) -> Result<ResourceData<ApiKeyModel>> {
    if name.is_none() && budget.is_none() {
        bail!("Nothing to update (pass --name and/or --budget)");
    }

    let mut data = refresh(api, id)?;
    let planned = data.planned_mut();
    if let Some(name) = name {
        planned.name = name;
    }
    if let Some(budget) = budget {
        planned.budget = budget;
    }

    let resource = ApiKeyResource::new(api);
    if !resource.has_config_change(&data) {
        log::info!("API key {} already matches", id);
        return Ok(data);
    }
    resource
        .update(&ApplyContext::default(), &mut data)
        .map_err(explain)?;
    Ok(data)
}

fn delete_instance(api: &dyn KeyApi, id: &str) -> Result<()> {
    let resource = ApiKeyResource::new(api);
    let mut data = ResourceData::from_state(id, ApiKeyModel::desired("", None));
    resource
        .delete(&ApplyContext::default(), &mut data)
        .map_err(explain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use budgetkit::{MockBackend, Operation};

    #[test]
    fn test_create_then_read() {
        let mock = MockBackend::new();
        let created = create_instance(&mock, "svc-a", Some(10)).unwrap();

        let read = refresh(&mock, created.id()).unwrap();
        assert_eq!(read.planned().name, "svc-a");
        assert_eq!(read.planned().budget, 10);
        assert!(read.planned().key_value.is_some());
    }

    #[test]
    fn test_read_missing_key_fails() {
        let mock = MockBackend::new();
        let err = refresh(&mock, "7").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_update_sends_budget_only() {
        let mock = MockBackend::new();
        let id = mock.seed("svc-a", 1000);

        let data = update_instance(&mock, &id.to_string(), None, Some(500)).unwrap();

        assert_eq!(data.planned().budget, 500);
        assert_eq!(mock.call_count(Operation::Update), 1);
    }

    #[test]
    fn test_update_with_same_values_skips_put() {
        let mock = MockBackend::new();
        let id = mock.seed("svc-a", 1000);

        update_instance(&mock, &id.to_string(), Some("svc-a".into()), Some(1000)).unwrap();

        assert_eq!(mock.call_count(Operation::Update), 0);
    }

    #[test]
    fn test_update_requires_a_field() {
        let mock = MockBackend::new();
        assert!(update_instance(&mock, "1", None, None).is_err());
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_delete_missing_key_reports_rejection() {
        let mock = MockBackend::new();
        let err = delete_instance(&mock, "3").unwrap_err();
        let source = err.downcast_ref::<budgetkit::Error>().unwrap();
        assert!(source.is_not_found());
    }
}

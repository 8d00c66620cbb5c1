//! Subcommand implementations

pub mod apply;
pub mod lifecycle;

use anyhow::Result;
use budgetkit::Error;
use declarative::ResourceData;
use serde::Serialize;

use crate::resource::ApiKeyModel;

/// JSON view of one key instance as printed by the CLI
#[derive(Debug, Serialize)]
pub struct KeyView<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub budget: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_value: Option<&'a str>,
    pub costs: f64,
    pub created_at: Option<&'a str>,
    pub last_used_at: Option<&'a str>,
}

const REDACTED: &str = "<redacted>";

impl<'a> KeyView<'a> {
    pub fn new(data: &'a ResourceData<ApiKeyModel>, show_secret: bool) -> Self {
        let model = data.planned();
        Self {
            id: data.id(),
            name: &model.name,
            budget: model.budget,
            key_value: model
                .key_value
                .as_deref()
                .map(|key| if show_secret { key } else { REDACTED }),
            costs: model.costs,
            created_at: model.created_at.as_deref(),
            last_used_at: model.last_used_at.as_deref(),
        }
    }
}

/// Print an instance as pretty JSON on stdout
pub fn print_instance(data: &ResourceData<ApiKeyModel>, show_secret: bool) -> Result<()> {
    let json = serde_json::to_string_pretty(&KeyView::new(data, show_secret))?;
    println!("{}", json);
    Ok(())
}

/// Attach the error category and its advice to a service error
pub fn explain(err: Error) -> anyhow::Error {
    let category = err.category();
    log::debug!("{} error: {:?}", category, err);
    anyhow::Error::new(err).context(format!("{} ({})", category.description(), category.advice()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use budgetkit::Operation;

    fn instance() -> ResourceData<ApiKeyModel> {
        let mut model = ApiKeyModel::desired("svc-a", Some(10));
        model.key_value = Some("bk-0001-svc-a".into());
        ResourceData::from_state("1", model)
    }

    #[test]
    fn test_view_redacts_secret_by_default() {
        let data = instance();
        let json = serde_json::to_value(KeyView::new(&data, false)).unwrap();
        assert_eq!(json["key_value"], REDACTED);
        assert_eq!(json["id"], "1");
        assert_eq!(json["budget"], 10);
    }

    #[test]
    fn test_view_shows_secret_on_request() {
        let data = instance();
        let json = serde_json::to_value(KeyView::new(&data, true)).unwrap();
        assert_eq!(json["key_value"], "bk-0001-svc-a");
    }

    #[test]
    fn test_view_omits_unknown_secret() {
        let data = ResourceData::from_state("1", ApiKeyModel::desired("svc-a", None));
        let json = serde_json::to_value(KeyView::new(&data, true)).unwrap();
        assert!(json.get("key_value").is_none());
    }

    #[test]
    fn test_explain_keeps_source_and_adds_advice() {
        let err = explain(Error::rejected(Operation::Delete, 404, "missing"));
        let text = format!("{:#}", err);
        assert!(text.contains("Request rejected by the service"));
        assert!(text.contains("status: 404"));
        assert!(err.downcast_ref::<Error>().is_some_and(Error::is_not_found));
    }
}

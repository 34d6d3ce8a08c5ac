// Alfred script filter output
//
// A script filter prints `{"items": [...]}` on stdout. Only the fields the
// workflow uses are modelled; unset optional fields are left out of the JSON.

use serde::Serialize;
use std::collections::BTreeMap;

use tracing::error;

use crate::{Error, Result};

/// Shipped with the workflow, shown when a site has no cached icon
pub const FALLBACK_ICON: &str = "icon.png";
pub const ERROR_ICON: &str = "error-icon.png";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Feedback {
    pub items: Vec<Item>,
}

impl Feedback {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// A single non-actionable item
    pub fn message(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self::new(vec![Item::new(title).subtitle(subtitle).invalid()])
    }

    /// How a failed step shows up in the launcher
    pub fn from_error(err: &Error) -> Self {
        Self::new(vec![Item::new(format!("Error occurs: {}", err.kind()))
            .subtitle(format!("Message: {}", err))
            .invalid()
            .icon(ERROR_ICON)])
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// JSON for a script filter step. A failed step still renders, as an
    /// error item, so the process can exit 0.
    pub fn render(result: Result<Feedback>) -> serde_json::Result<String> {
        let feedback = result.unwrap_or_else(|e| {
            error!("{}", e);
            Feedback::from_error(&e)
        });
        feedback.to_json()
    }
}

fn is_true(value: &bool) -> bool {
    *value
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "is_true")]
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Text>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mods: Option<Mods>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Icon {
    pub path: String,
}

/// What ⌘C copies and ⌘L shows in large type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Text {
    pub copy: String,
    pub largetype: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Mods {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmd: Option<Modifier>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Modifier {
    pub subtitle: String,
}

impl Item {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            arg: None,
            uid: None,
            valid: true,
            icon: None,
            text: None,
            variables: BTreeMap::new(),
            mods: None,
        }
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arg = Some(arg.into());
        self
    }

    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn invalid(mut self) -> Self {
        self.valid = false;
        self
    }

    pub fn icon(mut self, path: impl Into<String>) -> Self {
        self.icon = Some(Icon { path: path.into() });
        self
    }

    /// Same text for copy and large type
    pub fn text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.text = Some(Text {
            copy: text.clone(),
            largetype: text,
        });
        self
    }

    pub fn variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn cmd_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.mods = Some(Mods {
            cmd: Some(Modifier {
                subtitle: subtitle.into(),
            }),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_item_omits_unset_fields() {
        let value = serde_json::to_value(Feedback::new(vec![Item::new("Hello")])).unwrap();

        assert_eq!(value, json!({"items": [{"title": "Hello"}]}));
    }

    #[test]
    fn test_full_item_shape() {
        let item = Item::new("Stack Overflow")
            .subtitle("professional programmers")
            .arg("stackoverflow")
            .uid("stackoverflow")
            .icon("/cache/icons/stackoverflow.png")
            .text("stackoverflow")
            .variable("site_id", "stackoverflow")
            .cmd_subtitle("Reveal icon in Finder");

        let value = serde_json::to_value(&item).unwrap();

        assert_eq!(
            value,
            json!({
                "title": "Stack Overflow",
                "subtitle": "professional programmers",
                "arg": "stackoverflow",
                "uid": "stackoverflow",
                "icon": {"path": "/cache/icons/stackoverflow.png"},
                "text": {"copy": "stackoverflow", "largetype": "stackoverflow"},
                "variables": {"site_id": "stackoverflow"},
                "mods": {"cmd": {"subtitle": "Reveal icon in Finder"}}
            })
        );
    }

    #[test]
    fn test_error_feedback() {
        let err = Error::ConfigError("result_count must be between 1 and 100, got 0".into());
        let value = serde_json::to_value(Feedback::from_error(&err)).unwrap();

        assert_eq!(value["items"][0]["title"], "Error occurs: ConfigError");
        assert_eq!(value["items"][0]["valid"], false);
        assert_eq!(value["items"][0]["icon"]["path"], ERROR_ICON);
        assert!(value["items"][0]["subtitle"]
            .as_str()
            .unwrap()
            .starts_with("Message: Configuration error"));
    }

    #[test]
    fn test_render_turns_failure_into_item() {
        let err = Error::ConfigError("cache_max_age must be a non-negative integer".into());
        let json = Feedback::render(Err(err)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["items"].as_array().unwrap().len(), 1);
        assert_eq!(value["items"][0]["title"], "Error occurs: ConfigError");
        assert_eq!(value["items"][0]["valid"], false);
    }

    #[test]
    fn test_render_passes_success_through() {
        let json = Feedback::render(Ok(Feedback::message("Search Super User", "Type a query"))).unwrap();

        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&json).unwrap(),
            json!({"items": [{"title": "Search Super User", "subtitle": "Type a query", "valid": false}]})
        );
    }
}

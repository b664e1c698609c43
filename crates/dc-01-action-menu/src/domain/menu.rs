//! Menu model
//!
//! The record owns its menu, the menu owns its options, an option owns an
//! optional form and the form owns its parameters. The same types are used on
//! the wire, so field names follow the RFC (`submit-label`, `type`).

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{ActionMenuError, ActionMenuResult};

/// Input type of a form parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionMenuFormParameterType {
    Text,
}

/// One input field of an option form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMenuFormParameter {
    pub name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub parameter_type: Option<ActionMenuFormParameterType>,
}

/// Form collecting parameters before an option is performed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMenuForm {
    pub description: String,
    pub params: Vec<ActionMenuFormParameter>,
    #[serde(rename = "submit-label")]
    pub submit_label: String,
}

/// A selectable menu entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMenuOption {
    pub name: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<ActionMenuForm>,
}

impl ActionMenuOption {
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            description: description.into(),
            disabled: None,
            form: None,
        }
    }

    pub fn with_form(mut self, form: ActionMenuForm) -> Self {
        self.form = Some(form);
        self
    }
}

/// A menu offered by the responder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMenu {
    pub title: String,
    pub description: String,
    pub options: Vec<ActionMenuOption>,
}

impl ActionMenu {
    /// Build and validate a menu.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        options: Vec<ActionMenuOption>,
    ) -> ActionMenuResult<Self> {
        let menu = Self {
            title: title.into(),
            description: description.into(),
            options,
        };
        menu.validate()?;
        Ok(menu)
    }

    /// Option and form parameter names must be non-empty.
    pub fn validate(&self) -> ActionMenuResult<()> {
        for option in &self.options {
            if option.name.trim().is_empty() {
                return Err(ActionMenuError::Validation(
                    "menu option name must not be empty".into(),
                ));
            }
            if let Some(form) = &option.form {
                if form.params.iter().any(|p| p.name.trim().is_empty()) {
                    return Err(ActionMenuError::Validation(format!(
                        "form parameter name of option {} must not be empty",
                        option.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Reject menus with two options of the same name.
    pub fn assert_unique_options(&self) -> ActionMenuResult<()> {
        let mut seen = HashSet::with_capacity(self.options.len());
        if self.options.iter().all(|o| seen.insert(o.name.as_str())) {
            Ok(())
        } else {
            Err(ActionMenuError::DuplicateOptions)
        }
    }

    pub fn has_option(&self, name: &str) -> bool {
        self.options.iter().any(|o| o.name == name)
    }
}

/// The option a requester performed, with its form values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMenuSelection {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, String>>,
}

impl ActionMenuSelection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: None,
        }
    }

    pub fn with_params(mut self, params: BTreeMap<String, String>) -> Self {
        self.params = Some(params);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(name: &str) -> ActionMenuOption {
        ActionMenuOption::new(name, format!("{name}-title"), format!("{name}-desc"))
    }

    #[test]
    fn test_duplicate_options_rejected_anywhere() {
        for options in [
            vec![option("a"), option("a")],
            vec![option("a"), option("b"), option("a")],
            vec![option("b"), option("c"), option("c"), option("c")],
        ] {
            let menu = ActionMenu::new("t", "d", options).unwrap();
            assert!(matches!(
                menu.assert_unique_options(),
                Err(ActionMenuError::DuplicateOptions)
            ));
        }
        let menu = ActionMenu::new("t", "d", vec![option("a"), option("b")]).unwrap();
        assert!(menu.assert_unique_options().is_ok());
    }

    #[test]
    fn test_empty_option_name_is_invalid() {
        assert!(matches!(
            ActionMenu::new("t", "d", vec![option(" ")]),
            Err(ActionMenuError::Validation(_))
        ));
    }

    #[test]
    fn test_form_wire_format() {
        let form = ActionMenuForm {
            description: "Enter your name".into(),
            params: vec![ActionMenuFormParameter {
                name: "name".into(),
                title: "Name".into(),
                default: None,
                description: "Your name".into(),
                required: Some(true),
                parameter_type: Some(ActionMenuFormParameterType::Text),
            }],
            submit_label: "Send".into(),
        };
        let json = serde_json::to_value(option("register").with_form(form)).unwrap();

        assert_eq!(json["form"]["submit-label"], "Send");
        assert_eq!(json["form"]["params"][0]["type"], "text");
        assert!(json.get("disabled").is_none());
    }

    #[test]
    fn test_form_parameter_name_required() {
        let form = ActionMenuForm {
            description: "d".into(),
            params: vec![ActionMenuFormParameter {
                name: "".into(),
                title: "t".into(),
                default: None,
                description: "d".into(),
                required: None,
                parameter_type: None,
            }],
            submit_label: "ok".into(),
        };
        assert!(ActionMenu::new("t", "d", vec![option("a").with_form(form)]).is_err());
    }
}

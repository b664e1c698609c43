//! Action menu exchange record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_storage::{Record, Tags, TagsExt};
use shared_types::generate_id;

use super::menu::{ActionMenu, ActionMenuSelection};
use super::state::{ActionMenuRole, ActionMenuState};
use crate::error::{ActionMenuError, ActionMenuResult};

/// One action menu exchange per connection and role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionMenuRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub connection_id: String,
    pub thread_id: String,
    pub state: ActionMenuState,
    pub role: ActionMenuRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu: Option<ActionMenu>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performed_action: Option<ActionMenuSelection>,
    #[serde(default)]
    pub tags: Tags,
}

impl ActionMenuRecord {
    pub fn new(
        connection_id: impl Into<String>,
        role: ActionMenuRole,
        state: ActionMenuState,
        thread_id: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_id(),
            created_at: Utc::now(),
            updated_at: None,
            connection_id: connection_id.into(),
            thread_id: thread_id.into(),
            state,
            role,
            menu: None,
            performed_action: None,
            tags: Tags::new(),
        }
    }

    pub fn with_menu(mut self, menu: ActionMenu) -> Self {
        self.menu = Some(menu);
        self
    }

    /// Fail unless the record is in one of `allowed`.
    pub fn assert_state(&self, allowed: &[ActionMenuState]) -> ActionMenuResult<()> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        Err(ActionMenuError::InvalidState {
            record_id: self.id.clone(),
            current: self.state,
            allowed: allowed.to_vec(),
        })
    }

    pub fn assert_role(&self, expected: ActionMenuRole) -> ActionMenuResult<()> {
        if self.role == expected {
            return Ok(());
        }
        Err(ActionMenuError::InvalidRole {
            record_id: self.id.clone(),
            current: self.role,
            expected,
        })
    }

    /// Fail unless `name` is one of the current menu's options.
    pub fn assert_valid_selection(&self, name: &str) -> ActionMenuResult<()> {
        match &self.menu {
            Some(menu) if menu.has_option(name) => Ok(()),
            _ => Err(ActionMenuError::InvalidSelection {
                name: name.to_string(),
            }),
        }
    }

    /// Drop menu and selection.
    pub(crate) fn clear_payload(&mut self) {
        self.menu = None;
        self.performed_action = None;
    }
}

impl Record for ActionMenuRecord {
    const RECORD_TYPE: &'static str = "ActionMenuRecord";

    fn id(&self) -> &str {
        &self.id
    }

    fn default_tags(&self) -> Tags {
        let mut tags = Tags::new();
        tags.insert("role".into(), self.role.as_str().into());
        tags.insert("connectionId".into(), self.connection_id.as_str().into());
        tags.insert("threadId".into(), self.thread_id.as_str().into());
        tags.insert("state".into(), self.state.as_str().into());
        tags.insert_opt(
            "performedAction",
            self.performed_action.as_ref().map(|a| a.name.as_str()),
        );
        tags
    }

    fn custom_tags(&self) -> &Tags {
        &self.tags
    }

    fn set_updated_at(&mut self, updated_at: DateTime<Utc>) {
        self.updated_at = Some(updated_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ActionMenuOption;
    use shared_storage::TagValue;

    fn record(state: ActionMenuState) -> ActionMenuRecord {
        ActionMenuRecord::new("conn-1", ActionMenuRole::Responder, state, "thread-1")
    }

    #[test]
    fn test_assert_state() {
        let record = record(ActionMenuState::AwaitingSelection);
        assert!(record
            .assert_state(&[ActionMenuState::AwaitingSelection])
            .is_ok());

        let err = record
            .assert_state(&[ActionMenuState::Null, ActionMenuState::Done])
            .unwrap_err();
        match err {
            ActionMenuError::InvalidState {
                current, allowed, ..
            } => {
                assert_eq!(current, ActionMenuState::AwaitingSelection);
                assert_eq!(allowed, vec![ActionMenuState::Null, ActionMenuState::Done]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_assert_role() {
        let record = record(ActionMenuState::Null);
        assert!(record.assert_role(ActionMenuRole::Responder).is_ok());
        assert!(matches!(
            record.assert_role(ActionMenuRole::Requester),
            Err(ActionMenuError::InvalidRole { .. })
        ));
    }

    #[test]
    fn test_selection_requires_menu_option() {
        let mut record = record(ActionMenuState::AwaitingSelection);
        assert!(record.assert_valid_selection("opt1").is_err());

        record.menu = Some(
            ActionMenu::new("t", "d", vec![ActionMenuOption::new("opt1", "o", "o")]).unwrap(),
        );
        assert!(record.assert_valid_selection("opt1").is_ok());
        assert!(record.assert_valid_selection("opt2").is_err());
    }

    #[test]
    fn test_tags_follow_fields() {
        let mut record = record(ActionMenuState::Done);
        record
            .tags
            .insert("threadId".into(), TagValue::from("stale"));
        record.tags.insert("label".into(), TagValue::from("x"));

        let tags = record.tags();
        assert_eq!(tags["threadId"], TagValue::from("thread-1"));
        assert_eq!(tags["role"], TagValue::from("responder"));
        assert_eq!(tags["state"], TagValue::from("done"));
        assert_eq!(tags["label"], TagValue::from("x"));

        // Side-effect free.
        assert_eq!(record.tags["threadId"], TagValue::from("stale"));
    }
}

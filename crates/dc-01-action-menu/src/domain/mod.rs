//! Domain layer for the Action Menu protocol

pub mod menu;
pub mod record;
pub mod state;

pub use menu::{
    ActionMenu, ActionMenuForm, ActionMenuFormParameter, ActionMenuFormParameterType,
    ActionMenuOption, ActionMenuSelection,
};
pub use record::ActionMenuRecord;
pub use state::{ActionMenuRole, ActionMenuState};

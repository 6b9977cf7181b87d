//! Inline menu and reply keyboard builders.

use pricewatch_core::{InlineButton, InlineMenu, ReplyKeyboard};

/// Append a "<< Return" row to an existing menu, or build a menu holding
/// just the return button.
pub fn with_return_button(menu: Option<InlineMenu>) -> InlineMenu {
    let mut menu = menu.unwrap_or_default();
    menu.push_row(vec![InlineButton::new(" << Return", "back")]);
    menu
}

/// One-time reply keyboard offering common interval values.
pub fn interval_keyboard() -> ReplyKeyboard {
    ReplyKeyboard::one_time(vec![vec!["10m".into(), "1h".into(), "1d".into()]])
}

/// Header rows of the all-trackers status menu.
pub fn status_overview_menu() -> InlineMenu {
    InlineMenu::new()
        .row(vec![InlineButton::new("Run all trackers", "/run")])
        .row(vec![InlineButton::new("Stop all trackers", "/stop")])
}

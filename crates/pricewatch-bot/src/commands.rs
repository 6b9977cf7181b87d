//! Command dispatching and handling.
//!
//! Routes inbound command strings to handlers, maintains the per-chat
//! navigation stack, and orchestrates tracker start/stop/interval/status
//! operations against the registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use pricewatch_core::{
    format_duration, parse_duration, ChatId, InlineButton, InlineMenu, Messenger, MessageId,
    PricewatchError, Result, SourceKind, TrackerConfig, WatchConfig,
};
use pricewatch_fetch::{strategy_for, FetchStrategy};
use pricewatch_tracker::{Tracker, TrackerRegistry};

use crate::menus;
use crate::navigation::{CommandInvocation, NavigationState};

/// How a command may be targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandScope {
    /// No tracker code accepted.
    General,
    /// Requires a tracker code.
    Tracker,
    /// Works with or without a tracker code.
    Both,
}

struct CommandSpec {
    name: &'static str,
    scope: CommandScope,
    description_general: &'static str,
    description_tracker: &'static str,
    params: &'static [&'static str],
    /// Hidden commands are dispatchable but absent from the help menu.
    hidden: bool,
}

const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "start",
        scope: CommandScope::General,
        description_general: "Bot start command",
        description_tracker: "",
        params: &[],
        hidden: true,
    },
    CommandSpec {
        name: "run",
        scope: CommandScope::Both,
        description_general: "Run all available trackers",
        description_tracker: "Run a tracker",
        params: &["tracker_code"],
        hidden: false,
    },
    CommandSpec {
        name: "stop",
        scope: CommandScope::Both,
        description_general: "Stop all running trackers",
        description_tracker: "Stop a tracker",
        params: &["tracker_code"],
        hidden: false,
    },
    CommandSpec {
        name: "interval",
        scope: CommandScope::Tracker,
        description_general: "",
        description_tracker: "Change the tracker run interval",
        params: &["tracker_code", "interval*"],
        hidden: false,
    },
    CommandSpec {
        name: "status",
        scope: CommandScope::Both,
        description_general: "View status of all available trackers",
        description_tracker: "View a particular tracker status",
        params: &["tracker_code"],
        hidden: false,
    },
    CommandSpec {
        name: "help",
        scope: CommandScope::General,
        description_general: "View all available commands",
        description_tracker: "",
        params: &[],
        hidden: false,
    },
];

fn command_spec(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|c| c.name == name)
}

/// Builds a fetch strategy for a source kind; injectable so tests can avoid
/// real network fetchers.
type StrategyFactory =
    dyn Fn(SourceKind, Arc<dyn Messenger>) -> Arc<dyn FetchStrategy> + Send + Sync;

enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// Routes chat commands to handlers and owns all per-chat navigation state.
pub struct Dispatcher {
    config: Arc<WatchConfig>,
    registry: Arc<TrackerRegistry>,
    messenger: Arc<dyn Messenger>,
    strategies: Box<StrategyFactory>,
    navigation: Mutex<HashMap<ChatId, NavigationState>>,
}

impl Dispatcher {
    pub fn new(
        config: Arc<WatchConfig>,
        registry: Arc<TrackerRegistry>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self::with_strategies(config, registry, messenger, Box::new(strategy_for))
    }

    pub fn with_strategies(
        config: Arc<WatchConfig>,
        registry: Arc<TrackerRegistry>,
        messenger: Arc<dyn Messenger>,
        strategies: Box<StrategyFactory>,
    ) -> Self {
        Self {
            config,
            registry,
            messenger,
            strategies,
            navigation: Mutex::new(HashMap::new()),
        }
    }

    /// Run a closure against the chat's navigation state, creating it lazily.
    fn with_nav<R>(&self, chat: ChatId, f: impl FnOnce(&mut NavigationState) -> R) -> R {
        let mut map = self.navigation.lock().expect("navigation lock poisoned");
        f(map.entry(chat).or_default())
    }

    /// Toggle the back-button augmentation for subsequent replies to a chat.
    pub fn set_back_button(&self, chat: ChatId, enabled: bool) {
        self.with_nav(chat, |nav| nav.back_button_enabled = enabled);
    }

    /// Whether the chat's next plain-text message should be consumed as
    /// awaited command input.
    pub fn awaiting_input(&self, chat: ChatId) -> bool {
        self.with_nav(chat, |nav| nav.awaiting_input)
    }

    /// Parse and dispatch a command string. `replay` marks re-dispatches
    /// (return navigation, collected input) which must not re-push onto the
    /// navigation stack.
    pub async fn handle_command(
        &self,
        chat: ChatId,
        raw: &str,
        callback_message_id: Option<MessageId>,
        replay: bool,
    ) -> Result<()> {
        // Message ID is only present when the command came from a button press.
        self.with_nav(chat, |nav| nav.callback_message_id = callback_message_id);

        let mut parts = raw.split_whitespace();
        let name = parts
            .next()
            .map(|p| p.trim_start_matches('/').to_string())
            .unwrap_or_default();
        let code = parts.next().map(str::to_string);
        let param = parts.next().map(str::to_string);

        tracing::info!(chat, command = raw, replay, "handling command");

        if command_spec(&name).is_none() {
            tracing::warn!(chat, command = %name, "unknown command");
            self.send_plain(chat, "Unrecognized command").await;
            return Err(PricewatchError::UnknownCommand(name));
        }

        if !replay {
            let params: Vec<String> = [code.clone(), param.clone()].into_iter().flatten().collect();
            self.with_nav(chat, |nav| {
                nav.push(CommandInvocation::new(name.clone(), params));
            });
        }

        let code = code.unwrap_or_default();
        match name.as_str() {
            "run" => self.handle_run(&code, chat).await,
            "stop" => self.handle_stop(&code, chat).await,
            "interval" => self.handle_interval(&code, chat, param.as_deref()).await,
            "status" => self.handle_status(&code, chat).await,
            "help" | "start" => self.handle_help(&code, chat).await,
            _ => unreachable!("command table and dispatch arms out of sync"),
        }
    }

    /// Handle the "back" button: leave the current command and re-enter the
    /// one before it. Pop first, then peek — the popped entry is the command
    /// being left.
    pub async fn handle_return(
        &self,
        chat: ChatId,
        callback_message_id: Option<MessageId>,
    ) -> Result<()> {
        let target = self.with_nav(chat, |nav| {
            nav.pop();
            nav.peek().cloned()
        });

        let Some(target) = target else {
            // Nothing left to return to; fall back to the help screen.
            return self.handle_command(chat, "/help", callback_message_id, true).await;
        };

        self.handle_command(chat, &target.command_string(), callback_message_id, true)
            .await
    }

    /// Consume awaited free-text input: append it to the top-of-stack
    /// command and re-dispatch as a replay.
    pub async fn handle_user_input(
        &self,
        chat: ChatId,
        input: &str,
        callback_message_id: Option<MessageId>,
    ) -> Result<()> {
        let (keyboard_active, target) = self.with_nav(chat, |nav| {
            nav.awaiting_input = false;
            let active = nav.custom_keyboard_active;
            nav.custom_keyboard_active = false;
            (active, nav.peek().cloned())
        });

        if keyboard_active {
            if let Err(e) = self.messenger.remove_reply_keyboard(chat).await {
                tracing::warn!(chat, "failed to remove reply keyboard: {e}");
            }
        }

        let Some(target) = target else {
            tracing::warn!(chat, "received input with no command awaiting it");
            self.send_plain(chat, "Unrecognized command").await;
            return Err(PricewatchError::UnknownCommand(input.to_string()));
        };

        let command = format!("{} {}", target.command_string().trim(), input.trim());
        self.handle_command(chat, &command, callback_message_id, true)
            .await
    }

    /// Create and start the tracker for `code` unless one is already live.
    async fn start_one(&self, code: &str, chat: ChatId) -> Result<StartOutcome> {
        let (tracker_config, kind) = self
            .config
            .tracker(code)
            .ok_or_else(|| PricewatchError::UnknownTracker(code.to_string()))?;

        let interval = parse_duration(&tracker_config.interval)?;
        let config: Arc<TrackerConfig> = Arc::new(tracker_config.clone());
        let strategy = (self.strategies)(kind, Arc::clone(&self.messenger));
        let error_limit = self.config.error_notify_limit;
        let messenger = Arc::clone(&self.messenger);

        let inserted = self
            .registry
            .add_if_absent(code, || {
                Ok(Arc::new(Tracker::new(
                    config, chat, interval, strategy, messenger, error_limit,
                )))
            })
            .await?;

        match inserted {
            Some(tracker) => {
                tracker.start().await;
                tracing::info!(code, chat, "tracker started by command");
                Ok(StartOutcome::Started)
            }
            None => Ok(StartOutcome::AlreadyRunning),
        }
    }

    async fn handle_run(&self, code: &str, chat: ChatId) -> Result<()> {
        // Start all configured trackers, aggregating per-code failures.
        if code.is_empty() {
            let mut failures: Vec<(String, PricewatchError)> = Vec::new();
            let codes: Vec<String> = self
                .config
                .all_trackers()
                .map(|(t, _)| t.code.clone())
                .collect();

            for tracker_code in codes {
                if let Err(e) = self.start_one(&tracker_code, chat).await {
                    failures.push((tracker_code, e));
                }
            }

            if failures.is_empty() {
                self.compose_reply(chat, "All available trackers have been started", None)
                    .await;
            } else {
                let mut text = String::from("Failed to start the following trackers:\n");
                for (tracker_code, e) in &failures {
                    text.push_str(&format!(" - {tracker_code}: {e}\n"));
                }
                self.compose_reply(chat, &text, None).await;
            }
            return Ok(());
        }

        match self.start_one(code, chat).await {
            Ok(StartOutcome::Started) => {
                self.compose_reply(chat, &format!("Tracker '{code}' has been started"), None)
                    .await;
                Ok(())
            }
            Ok(StartOutcome::AlreadyRunning) => {
                tracing::info!(code, "tracker is already running");
                self.compose_reply(chat, &format!("Tracker '{code}' is already running"), None)
                    .await;
                Ok(())
            }
            Err(e @ PricewatchError::UnknownTracker(_)) => {
                self.compose_reply(
                    chat,
                    &format!("Invalid command, tracker with code '{code}' not found :("),
                    None,
                )
                .await;
                Err(e)
            }
            Err(e) => {
                tracing::error!(code, "failed to start tracker: {e}");
                self.compose_reply(chat, "Failed to start the tracker :(", None)
                    .await;
                Err(e)
            }
        }
    }

    async fn handle_stop(&self, code: &str, chat: ChatId) -> Result<()> {
        if code.is_empty() {
            self.registry.stop_all().await;
            self.compose_reply(chat, "All running trackers have been stopped", None)
                .await;
            return Ok(());
        }

        match self.registry.remove(code).await {
            Some(tracker) => {
                tracker.stop().await;
                self.compose_reply(chat, &format!("Tracker '{code}' has been stopped"), None)
                    .await;
            }
            None => {
                tracing::info!(code, "tracker is not running");
                self.compose_reply(chat, &format!("Tracker '{code}' is not running"), None)
                    .await;
            }
        }
        Ok(())
    }

    async fn handle_interval(&self, code: &str, chat: ChatId, param: Option<&str>) -> Result<()> {
        // Invoked from a menu button: prompt for the value and await input.
        let from_button = self.with_nav(chat, |nav| nav.callback_message_id.is_some());
        if from_button {
            self.with_nav(chat, |nav| {
                nav.awaiting_input = true;
                nav.custom_keyboard_active = true;
            });
            if let Err(e) = self
                .messenger
                .send_text_with_reply_keyboard(
                    chat,
                    "Send me the new interval value!\n\nThe format: <i>[number][interval type]</i>\
                     \n\nAvailable interval types: \n's'(second), 'm'(minute), 'h'(hour), 'd'(day)",
                    &menus::interval_keyboard(),
                )
                .await
            {
                tracing::error!(chat, "failed to send interval prompt: {e}");
            }
            return Ok(());
        }

        if code.is_empty() {
            self.send_plain(chat, "The /interval command requires a tracker code")
                .await;
            return Ok(());
        }

        let Some(param) = param else {
            tracing::warn!(code, "no interval value provided");
            self.compose_reply(chat, "No interval value provided", None).await;
            return Err(PricewatchError::InvalidInterval("missing value".into()));
        };

        let new_interval = match parse_duration(param) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(code, "invalid interval value: {e}");
                self.compose_reply(
                    chat,
                    "Invalid interval value. Available interval types: \
                     's'(second), 'm'(minute), 'h'(hour), 'd'(day)",
                    None,
                )
                .await;
                return Err(e);
            }
        };

        match self.registry.lookup(code).await {
            Some(tracker) => {
                tracker.update_interval(new_interval).await;
                self.compose_reply(
                    chat,
                    &format!(
                        "Tracker <b>{code}</b> run interval successfully updated to {}",
                        format_duration(new_interval)
                    ),
                    None,
                )
                .await;
                Ok(())
            }
            None => {
                tracing::warn!(code, "tracker not found for interval update");
                self.compose_reply(
                    chat,
                    &format!("Tracker <b>{code}</b> not found, it's probably not running"),
                    None,
                )
                .await;
                Err(PricewatchError::UnknownTracker(code.to_string()))
            }
        }
    }

    async fn handle_status(&self, code: &str, chat: ChatId) -> Result<()> {
        if code.is_empty() {
            return self.handle_status_overview(chat).await;
        }

        let Some(tracker) = self.registry.lookup(code).await else {
            tracing::info!(code, "tracker is not active");
            let menu =
                InlineMenu::new().row(vec![InlineButton::new("Run tracker", format!("/run {code}"))]);
            self.compose_reply(chat, &format!("Tracker '{code}' is not active"), Some(menu))
                .await;
            return Err(PricewatchError::UnknownTracker(code.to_string()));
        };

        let status = tracker.status();
        let mut text = format!("<b>Status for tracker {code}</b>\n\n");
        text.push_str("Status: active\n");
        text.push_str(&format!(
            "Tracker started: {}\n",
            format_timestamp(status.started_at)
        ));
        text.push_str(&format!("Last run: {}\n", format_timestamp(status.last_run_at)));
        text.push_str(&format!("Total runs: {}\n", status.total_runs));
        let last_value = if status.last_recorded_value.is_empty() {
            "none"
        } else {
            status.last_recorded_value.as_str()
        };
        text.push_str(&format!("Last recorded value: {last_value}\n"));
        text.push_str(&format!(
            "{}\n",
            format_criteria(tracker.config())
        ));
        text.push_str(&format!(
            "Current run interval: {}\n",
            format_duration(status.current_interval)
        ));
        text.push_str(&format!("Execution errors count: {}\n", status.error_count));

        let menu = InlineMenu::new()
            .row(vec![InlineButton::new("Stop tracker", format!("/stop {code}"))])
            .row(vec![InlineButton::new(
                "Change run interval",
                format!("/interval {code}"),
            )]);

        self.compose_reply(chat, &text, Some(menu)).await;
        Ok(())
    }

    async fn handle_status_overview(&self, chat: ChatId) -> Result<()> {
        let mut menu = menus::status_overview_menu();
        let mut text = String::from("<b>All available trackers</b>\n\n");

        for (tracker_config, kind) in self.config.all_trackers() {
            let code = &tracker_config.code;
            let active = self.registry.lookup(code).await.is_some();

            let mut row = vec![InlineButton::new(
                format!("Status [{code}]"),
                format!("/status {code}"),
            )];
            if active {
                row.push(InlineButton::new(format!("Stop [{code}]"), format!("/stop {code}")));
            } else {
                row.push(InlineButton::new(format!("Start [{code}]"), format!("/run {code}")));
            }
            menu.push_row(row);

            let active_status = if active { "active" } else { "inactive" };
            text.push_str(&format!(" - {code} | {active_status} | {kind}\n"));
        }

        // When returning here from a back-button click the existing message
        // is edited instead; compose_reply decides based on the callback ID.
        self.compose_reply(chat, &text, Some(menu)).await;
        Ok(())
    }

    async fn handle_help(&self, code: &str, chat: ChatId) -> Result<()> {
        // Help is general-only.
        if !code.is_empty() {
            tracing::info!("code passed to the general-only /help command");
            self.send_plain(chat, "/help is a general command not specific to any trackers")
                .await;
            return Ok(());
        }

        let mut text = String::from("<b>Welcome to the bot help section!</b>\n");
        text.push_str(
            "You can use the bot to manage the available trackers. \
             There are two types of commands:\n\n",
        );
        text.push_str("<b>Available general commands</b>\n");
        text.push_str("These are also available from the menu button and they do not accept parameters\n\n");
        for spec in COMMANDS {
            if !spec.hidden
                && matches!(spec.scope, CommandScope::General | CommandScope::Both)
            {
                text.push_str(&format!(" - /{} - {}\n", spec.name, spec.description_general));
            }
        }

        text.push_str("\n<b>Available tracker specific commands</b>\n");
        text.push_str("These require at minimum one parameter - tracker code\n\n");
        for spec in COMMANDS {
            if !spec.hidden
                && matches!(spec.scope, CommandScope::Tracker | CommandScope::Both)
            {
                let mut line = format!(" - /{}", spec.name);
                for param in spec.params {
                    line.push_str(&format!(" &lt;{param}&gt;"));
                }
                text.push_str(&format!("{line}\n   {}\n", spec.description_tracker));
            }
        }

        text.push_str(
            "\n<b>*</b>Interval parameter format: \n<i>[number][interval type]</i> \
             (e.g. 5m, 1h, 2d)\n",
        );
        text.push_str("\nAvailable interval types: \n's'(second), 'm'(minute), 'h'(hour), 'd'(day)\n");

        self.send_plain(chat, &text).await;
        Ok(())
    }

    /// Compose and deliver a reply, applying the back-button augmentation
    /// and edit-in-place behavior from the chat's navigation state. Send
    /// failures are logged, never propagated into command handling.
    async fn compose_reply(&self, chat: ChatId, text: &str, menu: Option<InlineMenu>) {
        let (back_enabled, callback_message_id) =
            self.with_nav(chat, |nav| (nav.back_button_enabled, nav.callback_message_id));

        let result = if back_enabled {
            let menu = menus::with_return_button(menu);
            match callback_message_id {
                // Triggered by a button press: edit the message in place to
                // avoid cluttering the chat.
                Some(message_id) => self.messenger.edit_message(chat, message_id, text, &menu).await,
                None => self.messenger.send_text_with_menu(chat, text, &menu).await,
            }
        } else if let Some(menu) = menu {
            self.messenger.send_text_with_menu(chat, text, &menu).await
        } else {
            self.messenger.send_text(chat, text).await
        };

        if let Err(e) = result {
            tracing::error!(chat, "failed to send reply: {e}");
        }
    }

    async fn send_plain(&self, chat: ChatId, text: &str) {
        if let Err(e) = self.messenger.send_text(chat, text).await {
            tracing::error!(chat, "failed to send message: {e}");
        }
    }
}

fn format_timestamp(at: Option<chrono::DateTime<chrono::Utc>>) -> String {
    match at {
        Some(at) => at.format("%d.%m.%Y %H:%M").to_string(),
        None => "never".into(),
    }
}

fn format_criteria(tracker: &TrackerConfig) -> String {
    if tracker.notify_criteria.is_empty() {
        return "Notification criteria: none".into();
    }
    let parts: Vec<String> = tracker
        .notify_criteria
        .iter()
        .map(|c| format!("{} {}", c.operator, c.value))
        .collect();
    format!("Notification criteria: {}", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pricewatch_core::ReplyKeyboard;
    use std::time::Duration;

    const CHAT: ChatId = 7;

    const SAMPLE: &str = r#"
        bot_token = "123:abc"
        environment = "local"

        [[api_trackers]]
        code = "btc"
        data_url = "https://api.example.com/price"
        interval = "30m"
        extraction_path = "data.rates.usd"

        [[scraper_trackers]]
        code = "gold"
        data_url = "https://example.com/gold"
        interval = "1h"
        extraction_path = "span.price"
    "#;

    /// Messenger double recording every outbound call.
    #[derive(Default)]
    struct RecordingMessenger {
        sent: Mutex<Vec<(&'static str, ChatId, String)>>,
    }

    impl RecordingMessenger {
        fn sent(&self) -> Vec<(&'static str, ChatId, String)> {
            self.sent.lock().unwrap().clone()
        }

        fn last_text(&self) -> String {
            self.sent.lock().unwrap().last().expect("nothing sent").2.clone()
        }
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send_text(&self, chat: ChatId, html: &str) -> Result<()> {
            self.sent.lock().unwrap().push(("text", chat, html.to_string()));
            Ok(())
        }
        async fn send_text_with_menu(
            &self,
            chat: ChatId,
            html: &str,
            _: &InlineMenu,
        ) -> Result<()> {
            self.sent.lock().unwrap().push(("menu", chat, html.to_string()));
            Ok(())
        }
        async fn edit_message(
            &self,
            chat: ChatId,
            _: MessageId,
            html: &str,
            _: &InlineMenu,
        ) -> Result<()> {
            self.sent.lock().unwrap().push(("edit", chat, html.to_string()));
            Ok(())
        }
        async fn send_text_with_reply_keyboard(
            &self,
            chat: ChatId,
            html: &str,
            _: &ReplyKeyboard,
        ) -> Result<()> {
            self.sent.lock().unwrap().push(("keyboard", chat, html.to_string()));
            Ok(())
        }
        async fn remove_reply_keyboard(&self, chat: ChatId) -> Result<()> {
            self.sent.lock().unwrap().push(("remove_keyboard", chat, String::new()));
            Ok(())
        }
    }

    /// Strategy double that always samples successfully.
    struct StubStrategy;

    #[async_trait]
    impl FetchStrategy for StubStrategy {
        async fn execute(&self, _: &TrackerConfig, _: ChatId) -> Result<String> {
            Ok("42.00".into())
        }
    }

    fn setup() -> (Dispatcher, Arc<RecordingMessenger>, Arc<TrackerRegistry>) {
        let config: Arc<WatchConfig> = Arc::new(toml::from_str(SAMPLE).unwrap());
        let registry = Arc::new(TrackerRegistry::new());
        let messenger = Arc::new(RecordingMessenger::default());
        let dispatcher = Dispatcher::with_strategies(
            config,
            Arc::clone(&registry),
            messenger.clone(),
            Box::new(|_, _| Arc::new(StubStrategy)),
        );
        (dispatcher, messenger, registry)
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_command_is_rejected() {
        let (dispatcher, messenger, _) = setup();
        let result = dispatcher.handle_command(CHAT, "/frobnicate", None, false).await;
        assert!(matches!(result, Err(PricewatchError::UnknownCommand(_))));
        assert_eq!(messenger.last_text(), "Unrecognized command");
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_starts_tracker_once() {
        let (dispatcher, messenger, registry) = setup();

        dispatcher.handle_command(CHAT, "/run btc", None, false).await.unwrap();
        assert_eq!(messenger.last_text(), "Tracker 'btc' has been started");
        let tracker = registry.lookup("btc").await.expect("registered");
        assert!(tracker.is_running().await);

        dispatcher.handle_command(CHAT, "/run btc", None, false).await.unwrap();
        assert_eq!(messenger.last_text(), "Tracker 'btc' is already running");
        assert_eq!(registry.len().await, 1);

        registry.stop_all().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_unknown_code_reports_not_found() {
        let (dispatcher, messenger, registry) = setup();
        let result = dispatcher.handle_command(CHAT, "/run doge", None, false).await;
        assert!(matches!(result, Err(PricewatchError::UnknownTracker(_))));
        assert!(messenger.last_text().contains("'doge' not found"));
        assert!(registry.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_all_then_stop_all() {
        let (dispatcher, messenger, registry) = setup();

        dispatcher.handle_command(CHAT, "/run", None, false).await.unwrap();
        assert_eq!(messenger.last_text(), "All available trackers have been started");
        assert_eq!(registry.len().await, 2);

        dispatcher.handle_command(CHAT, "/stop", None, false).await.unwrap();
        assert_eq!(messenger.last_text(), "All running trackers have been stopped");
        assert!(registry.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_not_running() {
        let (dispatcher, messenger, _) = setup();
        dispatcher.handle_command(CHAT, "/stop gold", None, false).await.unwrap();
        assert_eq!(messenger.last_text(), "Tracker 'gold' is not running");
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_updates_running_tracker() {
        let (dispatcher, messenger, registry) = setup();

        dispatcher.handle_command(CHAT, "/run btc", None, false).await.unwrap();
        dispatcher
            .handle_command(CHAT, "/interval btc 15m", None, false)
            .await
            .unwrap();

        assert!(messenger.last_text().contains("successfully updated to 15m"));
        let tracker = registry.lookup("btc").await.unwrap();
        assert_eq!(tracker.status().current_interval, Duration::from_secs(900));
        registry.stop_all().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_requires_running_tracker() {
        let (dispatcher, messenger, _) = setup();
        let result = dispatcher
            .handle_command(CHAT, "/interval btc 15m", None, false)
            .await;
        assert!(matches!(result, Err(PricewatchError::UnknownTracker(_))));
        assert!(messenger.last_text().contains("probably not running"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_rejects_bad_value() {
        let (dispatcher, messenger, registry) = setup();
        dispatcher.handle_command(CHAT, "/run btc", None, false).await.unwrap();

        let result = dispatcher
            .handle_command(CHAT, "/interval btc soon", None, false)
            .await;
        assert!(matches!(result, Err(PricewatchError::InvalidInterval(_))));
        assert!(messenger.last_text().contains("Invalid interval value"));
        registry.stop_all().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_button_prompts_and_consumes_input() {
        let (dispatcher, messenger, registry) = setup();
        dispatcher.handle_command(CHAT, "/run btc", None, false).await.unwrap();

        // Pressing "Change run interval" carries a callback message ID.
        dispatcher
            .handle_command(CHAT, "/interval btc", Some(42), false)
            .await
            .unwrap();
        assert!(dispatcher.awaiting_input(CHAT));
        let sent = messenger.sent();
        assert_eq!(sent.last().unwrap().0, "keyboard");

        dispatcher.handle_user_input(CHAT, "15m", None).await.unwrap();
        assert!(!dispatcher.awaiting_input(CHAT));
        assert!(messenger
            .sent()
            .iter()
            .any(|(kind, _, _)| *kind == "remove_keyboard"));
        let tracker = registry.lookup("btc").await.unwrap();
        assert_eq!(tracker.status().current_interval, Duration::from_secs(900));
        registry.stop_all().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_overview_lists_all_trackers() {
        let (dispatcher, messenger, registry) = setup();
        dispatcher.handle_command(CHAT, "/run btc", None, false).await.unwrap();

        dispatcher.handle_command(CHAT, "/status", None, false).await.unwrap();
        let text = messenger.last_text();
        assert!(text.contains(" - btc | active | api"));
        assert!(text.contains(" - gold | inactive | scraper"));
        registry.stop_all().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_single_tracker() {
        let (dispatcher, messenger, registry) = setup();

        let result = dispatcher.handle_command(CHAT, "/status btc", None, false).await;
        assert!(result.is_err());
        assert_eq!(messenger.last_text(), "Tracker 'btc' is not active");

        dispatcher.handle_command(CHAT, "/run btc", None, false).await.unwrap();
        tokio::task::yield_now().await;
        dispatcher.handle_command(CHAT, "/status btc", None, false).await.unwrap();
        let text = messenger.last_text();
        assert!(text.contains("Status: active"));
        assert!(text.contains("Current run interval: 30m"));
        registry.stop_all().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_return_redispatches_previous_command() {
        let (dispatcher, messenger, registry) = setup();
        dispatcher.set_back_button(CHAT, true);
        dispatcher.handle_command(CHAT, "/run btc", None, false).await.unwrap();

        dispatcher.handle_command(CHAT, "/status", Some(42), false).await.unwrap();
        dispatcher
            .handle_command(CHAT, "/status btc", Some(42), false)
            .await
            .unwrap();

        // Back from the single-tracker view lands on the overview again.
        dispatcher.handle_return(CHAT, Some(42)).await.unwrap();
        let text = messenger.last_text();
        assert!(text.contains("All available trackers"));
        registry.stop_all().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_return_on_empty_stack_falls_back_to_help() {
        let (dispatcher, messenger, _) = setup();
        dispatcher.handle_return(CHAT, Some(42)).await.unwrap();
        assert!(messenger.last_text().contains("help section"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_replies_edit_in_place() {
        let (dispatcher, messenger, registry) = setup();
        dispatcher.set_back_button(CHAT, true);

        dispatcher.handle_command(CHAT, "/status", Some(42), false).await.unwrap();
        assert_eq!(messenger.sent().last().unwrap().0, "edit");

        // Plain-text commands send a fresh message even with back enabled.
        dispatcher.handle_command(CHAT, "/status", None, false).await.unwrap();
        assert_eq!(messenger.sent().last().unwrap().0, "menu");
        registry.stop_all().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_help_lists_visible_commands() {
        let (dispatcher, messenger, _) = setup();
        dispatcher.handle_command(CHAT, "/help", None, false).await.unwrap();
        let text = messenger.last_text();
        for name in ["/run", "/stop", "/interval", "/status", "/help"] {
            assert!(text.contains(name), "help is missing {name}");
        }
        assert!(!text.contains("/start"));
        assert!(text.contains("&lt;tracker_code&gt;"));
    }
}

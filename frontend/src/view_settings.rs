use crate::config::ViewConfig;
use crate::dataflow::{Actor, Relay, relay};
use futures::{StreamExt, select};

/// Display toggles shared by every projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewSettings {
    /// Dim timeline edges that are not in the highlight set.
    pub highlight: bool,
    /// Include Waiting and Busy rows in charts.
    pub show_waiting: bool,
    /// Keep one row per worker instead of folding.
    pub split_worker: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        ViewSettings::from(&ViewConfig::default())
    }
}

impl From<&ViewConfig> for ViewSettings {
    fn from(config: &ViewConfig) -> Self {
        ViewSettings {
            highlight: config.highlight,
            show_waiting: config.show_waiting,
            split_worker: config.split_worker,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ViewSettingsController {
    pub settings: Actor<ViewSettings>,
    pub highlight_toggled_relay: Relay<bool>,
    pub show_waiting_toggled_relay: Relay<bool>,
    pub split_worker_toggled_relay: Relay<bool>,
}

impl ViewSettingsController {
    pub fn new(initial: ViewSettings) -> Self {
        let (highlight_toggled_relay, highlight_toggled_stream) = relay::<bool>();
        let (show_waiting_toggled_relay, show_waiting_toggled_stream) = relay::<bool>();
        let (split_worker_toggled_relay, split_worker_toggled_stream) = relay::<bool>();

        let settings = Actor::new(initial, async move |state| {
            let mut highlight_toggled = highlight_toggled_stream;
            let mut show_waiting_toggled = show_waiting_toggled_stream;
            let mut split_worker_toggled = split_worker_toggled_stream;
            loop {
                select! {
                    enabled = highlight_toggled.next() => {
                        if let Some(enabled) = enabled {
                            let next = ViewSettings { highlight: enabled, ..state.get_cloned() };
                            state.set_neq(next);
                        }
                    }
                    enabled = show_waiting_toggled.next() => {
                        if let Some(enabled) = enabled {
                            let next = ViewSettings { show_waiting: enabled, ..state.get_cloned() };
                            state.set_neq(next);
                        }
                    }
                    enabled = split_worker_toggled.next() => {
                        if let Some(enabled) = enabled {
                            let next = ViewSettings { split_worker: enabled, ..state.get_cloned() };
                            state.set_neq(next);
                        }
                    }
                    complete => break,
                }
            }
        });

        Self {
            settings,
            highlight_toggled_relay,
            show_waiting_toggled_relay,
            split_worker_toggled_relay,
        }
    }

    pub fn current(&self) -> ViewSettings {
        *self.settings.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn defaults_follow_view_config() {
        let settings = ViewSettings::default();
        assert!(settings.highlight);
        assert!(settings.show_waiting);
        assert!(!settings.split_worker);
    }

    #[tokio::test]
    async fn toggles_update_only_their_own_flag() {
        let controller = ViewSettingsController::new(ViewSettings::default());
        let mut signal = controller.settings.signal();

        controller.split_worker_toggled_relay.send(true);
        controller.show_waiting_toggled_relay.send(false);

        tokio::time::timeout(
            Duration::from_secs(1),
            signal.wait_for(|settings| settings.split_worker && !settings.show_waiting),
        )
        .await
        .unwrap()
        .unwrap();

        assert!(controller.current().highlight);
    }
}

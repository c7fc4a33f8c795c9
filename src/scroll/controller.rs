use crate::classifier::LoadMoreClassifier;
use crate::core::settings::{
    KEY_DISABLED_SITES, KEY_ENABLED, KEY_ENABLED_SITES, KEY_ENABLE_NEW_SITES, KEY_INFINITE_SCROLL,
};
use crate::core::{
    load_settings, notify_best_effort, Config, DomEvent, InfiniteScrollConfig, NodeId,
    Notification, Notifier, PageDom, SettingsStore,
};
use crate::runtime::scheduler::{Scheduler, Task};
use crate::scroll::proximity::ProximityObserver;
use serde::Serialize;
use tracing::{debug, info, warn};

const SCROLL_KEYS: [&str; 5] = [
    KEY_ENABLED,
    KEY_ENABLE_NEW_SITES,
    KEY_ENABLED_SITES,
    KEY_DISABLED_SITES,
    KEY_INFINITE_SCROLL,
];

/// Click gates. A click is allowed only when both are clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadMoreState {
    /// Set when a click starts, cleared once the page has had time to
    /// append content.
    pub is_loading_more: bool,
    /// Set after a successful click, cleared when the cooldown expires.
    pub cooldown_active: bool,
}

impl LoadMoreState {
    pub fn can_trigger(&self) -> bool {
        !self.is_loading_more && !self.cooldown_active
    }
}

/// Automatic "load more" clicking while the user scrolls.
pub struct InfiniteScrollController {
    config: InfiniteScrollConfig,
    classifier: LoadMoreClassifier,
    observer: ProximityObserver,
    state: LoadMoreState,
    active: bool,
    clicks: usize,
}

impl InfiniteScrollController {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.infinite_scroll.clone(),
            classifier: LoadMoreClassifier::new(config.classifier.clone()),
            observer: ProximityObserver::new(config.infinite_scroll.root_margin_px),
            state: LoadMoreState::default(),
            active: false,
            clicks: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn state(&self) -> LoadMoreState {
        self.state
    }

    /// Successful clicks since the page loaded.
    pub fn clicks(&self) -> usize {
        self.clicks
    }

    pub fn observer(&self) -> &ProximityObserver {
        &self.observer
    }

    /// Whether the user turned infinite scroll on for `host`.
    pub async fn is_enabled_for(host: &str, settings: &dyn SettingsStore) -> bool {
        let settings = load_settings(settings, &SCROLL_KEYS).await;
        settings.is_active_for(host) && settings.infinite_scroll
    }

    /// Starts watching load-more controls. Controls already near the
    /// viewport are reported right away.
    pub fn start<D: PageDom + ?Sized>(
        &mut self,
        page: &mut D,
        scheduler: &mut Scheduler,
        notifier: &dyn Notifier,
    ) -> Option<NodeId> {
        if self.active {
            return None;
        }
        self.active = true;
        info!("Infinite scroll enabled");
        self.observe_load_more_buttons(page);
        self.check_proximity(page, scheduler, notifier)
    }

    /// Disconnects observers and drops pending scroll work. In-flight
    /// cooldown and settle timers still run to clear the gates.
    pub fn stop(&mut self, scheduler: &mut Scheduler) {
        if !self.active {
            return;
        }
        self.active = false;
        self.observer.disconnect();
        scheduler.cancel_all(Task::ScrollCheck);
        scheduler.cancel_all(Task::RescanLoadMore);
        info!("Infinite scroll disabled");
    }

    /// Registers new candidates with the proximity observer, marking each
    /// element so it is registered at most once. Returns how many were added.
    pub fn observe_load_more_buttons<D: PageDom + ?Sized>(&mut self, page: &mut D) -> usize {
        let marker = self.config.observed_marker.as_str();
        let mut added = 0;
        for candidate in self.classifier.find_candidates(page) {
            if page.attribute(candidate.node, marker).is_some() {
                continue;
            }
            if let Err(e) = page.set_attribute(candidate.node, marker, "true") {
                debug!("Cannot mark load-more candidate {}: {}", candidate.node, e);
                continue;
            }
            self.observer.observe(candidate.node);
            added += 1;
        }
        if added > 0 {
            debug!("Observing {} new load-more candidates", added);
        }
        added
    }

    /// Proximity is checked as the page moves. The near-bottom fallback
    /// runs once scrolling pauses for the debounce interval.
    pub fn on_scroll<D: PageDom + ?Sized>(
        &mut self,
        page: &mut D,
        scheduler: &mut Scheduler,
        notifier: &dyn Notifier,
    ) -> Option<NodeId> {
        if !self.active {
            return None;
        }
        scheduler.debounce(self.config.scroll_debounce(), Task::ScrollCheck);
        self.check_proximity(page, scheduler, notifier)
    }

    pub fn on_mutation(&self, scheduler: &mut Scheduler) {
        if self.active {
            scheduler.debounce(self.config.rescan_debounce(), Task::RescanLoadMore);
        }
    }

    /// Runs a scroll task. Returns the element clicked, if any.
    pub fn run_task<D: PageDom + ?Sized>(
        &mut self,
        task: Task,
        page: &mut D,
        scheduler: &mut Scheduler,
        notifier: &dyn Notifier,
    ) -> Option<NodeId> {
        match task {
            Task::ScrollCheck => {
                if self.active && self.state.can_trigger() && self.is_near_bottom(page) {
                    self.try_click_load_more(page, scheduler, notifier)
                } else {
                    None
                }
            }
            Task::RescanLoadMore => {
                if !self.active {
                    return None;
                }
                self.observe_load_more_buttons(page);
                self.check_proximity(page, scheduler, notifier)
            }
            Task::CooldownExpired => {
                self.state.cooldown_active = false;
                None
            }
            Task::LoadMoreSettled => {
                self.state.is_loading_more = false;
                if !self.active {
                    return None;
                }
                self.observe_load_more_buttons(page);
                self.check_proximity(page, scheduler, notifier)
            }
            Task::Redetect | Task::RetryDetection => None,
        }
    }

    /// Consumes proximity records and clicks when an observed control came
    /// close while the gates are open. Records arriving while gated are lost.
    pub fn check_proximity<D: PageDom + ?Sized>(
        &mut self,
        page: &mut D,
        scheduler: &mut Scheduler,
        notifier: &dyn Notifier,
    ) -> Option<NodeId> {
        let entered = self.observer.take_records(page);
        if entered.is_empty() || !self.state.can_trigger() {
            return None;
        }
        self.try_click_load_more(page, scheduler, notifier)
    }

    /// Clicks the first visible load-more candidate.
    pub fn try_click_load_more<D: PageDom + ?Sized>(
        &mut self,
        page: &mut D,
        scheduler: &mut Scheduler,
        notifier: &dyn Notifier,
    ) -> Option<NodeId> {
        if !self.state.can_trigger() {
            return None;
        }

        let button = self
            .classifier
            .find_candidates(page)
            .into_iter()
            .find(|candidate| self.is_element_visible(page, candidate.node))?;

        info!("Clicking load more button: {}", button.signature);
        self.state.is_loading_more = true;

        let clicked = page
            .click(button.node)
            .and_then(|_| page.dispatch_event(button.node, DomEvent::Click));

        let result = match clicked {
            Ok(()) => {
                self.state.cooldown_active = true;
                self.clicks += 1;
                scheduler.schedule(self.config.cooldown(), Task::CooldownExpired);
                notify_best_effort(
                    notifier,
                    Notification::LoadMoreClicked {
                        host: page.hostname(),
                    },
                );
                Some(button.node)
            }
            Err(e) => {
                warn!("Error clicking load more: {}", e);
                None
            }
        };

        scheduler.schedule(self.config.settle(), Task::LoadMoreSettled);
        result
    }

    /// Rendered, non-empty and roughly on screen: up to a screen below the
    /// viewport and slightly above it.
    pub fn is_element_visible<D: PageDom + ?Sized>(&self, page: &D, node: NodeId) -> bool {
        if !page.computed_style(node).is_rendered() {
            return false;
        }
        let Some(rect) = page.bounding_rect(node) else {
            return false;
        };
        if rect.is_empty() {
            return false;
        }
        let viewport = page.viewport();
        rect.top() < viewport.height + self.config.visible_below_px
            && rect.bottom() > -self.config.visible_above_px
            && rect.left() < viewport.width
            && rect.right() > 0.0
    }

    pub fn is_near_bottom<D: PageDom + ?Sized>(&self, page: &D) -> bool {
        page.scroll_metrics().distance_to_bottom() < self.config.near_bottom_px
    }
}

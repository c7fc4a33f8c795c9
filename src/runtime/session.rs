use crate::core::{Config, FeatureFlags, NodeId, Notifier, PageDom, SettingsStore};
use crate::detection::{DetectionOrchestrator, RetryReport};
use crate::registry::SiteRegistry;
use crate::runtime::messages::{MessageResponse, RuntimeMessage};
use crate::runtime::scheduler::{Scheduler, Task};
use crate::scroll::InfiniteScrollController;
use crate::strategy::ApplyOutcome;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, Instrument, Span};
use uuid::Uuid;

/// Everything the engine does for one page load.
///
/// Events from the page (`on_mutation`, `on_scroll`) mostly schedule work;
/// `advance` runs whatever became due, one task at a time.
pub struct PageSession<D: PageDom> {
    id: Uuid,
    page: D,
    settings: Arc<dyn SettingsStore>,
    notifier: Arc<dyn Notifier>,
    detection: DetectionOrchestrator,
    scroll: InfiniteScrollController,
    scheduler: Scheduler,
    features: FeatureFlags,
    clicked: Vec<NodeId>,
    unloaded: bool,
}

impl<D: PageDom> PageSession<D> {
    pub fn new(
        page: D,
        registry: Arc<SiteRegistry>,
        settings: Arc<dyn SettingsStore>,
        notifier: Arc<dyn Notifier>,
        config: &Config,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            page,
            settings,
            notifier,
            detection: DetectionOrchestrator::new(registry, config),
            scroll: InfiniteScrollController::new(config),
            scheduler: Scheduler::new(),
            features: config.features.clone(),
            clicked: Vec::new(),
            unloaded: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn page(&self) -> &D {
        &self.page
    }

    /// Direct page access, for hosts that mutate the document between
    /// events.
    pub fn page_mut(&mut self) -> &mut D {
        &mut self.page
    }

    pub fn detection(&self) -> &DetectionOrchestrator {
        &self.detection
    }

    pub fn scroll(&self) -> &InfiniteScrollController {
        &self.scroll
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Time since page load on the session clock.
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// Load-more controls clicked so far.
    pub fn clicked(&self) -> &[NodeId] {
        &self.clicked
    }

    /// True once the session navigated the page away.
    pub fn is_unloaded(&self) -> bool {
        self.unloaded
    }

    fn span(&self) -> Span {
        info_span!("page", session = %self.id, host = %self.page.hostname())
    }

    /// Page-ready entry point: eligibility, the first pipeline pass, then
    /// observation and infinite scroll.
    pub async fn start(&mut self) {
        let span = self.span();
        self.start_inner().instrument(span).await
    }

    async fn start_inner(&mut self) {
        let host = self.page.hostname();
        info!("Page ready: {}", self.page.location());

        if !self
            .detection
            .check_eligibility(&host, self.settings.as_ref())
            .await
        {
            return;
        }

        self.run_pipeline().await;
        if self.unloaded {
            return;
        }
        self.detection.begin_observing(&mut self.scheduler);

        if self.features.infinite_scroll
            && InfiniteScrollController::is_enabled_for(&host, self.settings.as_ref()).await
        {
            self.start_infinite_scroll();
        }
    }

    /// The page's subtree changed.
    pub fn on_mutation(&mut self) {
        if self.unloaded {
            return;
        }
        self.detection.on_mutation(&mut self.scheduler);
        self.scroll.on_mutation(&mut self.scheduler);
    }

    /// The window scrolled.
    pub fn on_scroll(&mut self) {
        if self.unloaded {
            return;
        }
        let clicked = self
            .scroll
            .on_scroll(&mut self.page, &mut self.scheduler, self.notifier.as_ref());
        self.clicked.extend(clicked);
    }

    /// Moves the session clock forward by `by`, running every task that
    /// falls due in deadline order.
    pub async fn advance(&mut self, by: Duration) {
        let span = self.span();
        self.advance_inner(by).instrument(span).await
    }

    async fn advance_inner(&mut self, by: Duration) {
        let target = self.scheduler.now() + by;
        while let Some(task) = self.scheduler.pop_due(target) {
            self.run_task(task).await;
        }
        self.scheduler.advance_to(target);
    }

    /// Real-time driver: sleeps on tokio timers between deadlines and runs
    /// tasks as they fall due, for `duration` of wall time.
    pub async fn run_for(&mut self, duration: Duration) {
        let started = tokio::time::Instant::now();
        let base = self.scheduler.now();
        let end = base + duration;

        while let Some(deadline) = self.scheduler.next_deadline().filter(|d| *d <= end) {
            tokio::time::sleep_until(started + deadline.saturating_sub(base)).await;
            let step = deadline.saturating_sub(self.scheduler.now());
            self.advance(step).await;
        }

        tokio::time::sleep_until(started + duration).await;
        self.scheduler.advance_to(end);
    }

    async fn run_task(&mut self, task: Task) {
        if self.unloaded {
            debug!("Page unloaded, dropping {:?}", task);
            return;
        }
        match task {
            Task::Redetect | Task::RetryDetection => self.run_pipeline().await,
            Task::ScrollCheck
            | Task::RescanLoadMore
            | Task::CooldownExpired
            | Task::LoadMoreSettled => {
                let clicked = self.scroll.run_task(
                    task,
                    &mut self.page,
                    &mut self.scheduler,
                    self.notifier.as_ref(),
                );
                self.clicked.extend(clicked);
            }
        }
    }

    async fn run_pipeline(&mut self) {
        let application = self
            .detection
            .try_apply(&mut self.page, self.settings.as_ref(), self.notifier.as_ref())
            .await;
        if matches!(application, Some(app) if app.outcome == ApplyOutcome::Navigated) {
            self.unload();
        }
    }

    fn unload(&mut self) {
        info!("Page is navigating away, stopping");
        self.unloaded = true;
        self.scroll.stop(&mut self.scheduler);
    }

    fn start_infinite_scroll(&mut self) {
        let clicked = self
            .scroll
            .start(&mut self.page, &mut self.scheduler, self.notifier.as_ref());
        self.clicked.extend(clicked);
    }

    pub async fn handle_message(&mut self, message: RuntimeMessage) -> MessageResponse {
        let span = self.span();
        self.handle_message_inner(message).instrument(span).await
    }

    async fn handle_message_inner(&mut self, message: RuntimeMessage) -> MessageResponse {
        match message {
            RuntimeMessage::RetryDetection => MessageResponse::Retry(self.retry().await),
            RuntimeMessage::InfiniteScrollChanged { enabled } => {
                if !self.features.infinite_scroll || self.unloaded {
                    return MessageResponse::Ack { success: false };
                }
                if enabled {
                    self.start_infinite_scroll();
                } else {
                    self.scroll.stop(&mut self.scheduler);
                }
                MessageResponse::Ack { success: true }
            }
        }
    }

    /// Re-runs the pipeline regardless of the latch. Eligibility is not
    /// re-checked.
    pub async fn retry(&mut self) -> RetryReport {
        let report = self
            .detection
            .retry(&mut self.page, self.settings.as_ref(), self.notifier.as_ref())
            .await;
        if self
            .detection
            .last_application()
            .is_some_and(|a| a.outcome == ApplyOutcome::Navigated)
        {
            self.unload();
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DetectionMethod, DomEvent, Notification, Settings};
    use crate::detection::DetectionPhase;
    use crate::dom::HtmlDocument;
    use crate::host::MemorySettingsStore;
    use crate::registry::{SiteConfig, StrategyDescriptor};
    use crate::testing::{RecordingNotifier, TestHelper};
    use crate::types::ElementRect;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn example_registry() -> Arc<SiteRegistry> {
        Arc::new(SiteRegistry::new(vec![
            SiteConfig::new(
                "example.com",
                StrategyDescriptor::select_max_numeric(["select#size"]),
            ),
            SiteConfig::new("params.test", StrategyDescriptor::url_param("limit", "100")),
        ]))
    }

    fn session(
        doc: HtmlDocument,
        settings: Settings,
    ) -> (PageSession<HtmlDocument>, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let session = PageSession::new(
            doc,
            example_registry(),
            Arc::new(MemorySettingsStore::new(settings)),
            notifier.clone(),
            &Config::default(),
        );
        (session, notifier)
    }

    #[tokio::test]
    async fn test_known_site_end_to_end() {
        let doc = TestHelper::document_at(
            "https://www.example.com/list",
            r#"<select id="size"><option value="10">10</option><option value="100">100</option></select>"#,
        );
        let (mut session, notifier) = session(doc, Settings::default());
        session.start().await;

        let select = session.page().find("select#size").unwrap();
        assert_eq!(session.page().selected_index(select), Some(1));
        assert_eq!(
            session.page().state().events_for(select),
            vec![DomEvent::Change, DomEvent::Input]
        );
        assert_eq!(
            notifier.notifications(),
            vec![Notification::PageSizeApplied {
                method: DetectionMethod::Known,
                host: "www.example.com".to_string(),
                url: "https://www.example.com/list".to_string(),
            }]
        );

        // later retries and mutations are no-ops
        session.on_mutation();
        session.advance(ms(6000)).await;
        assert_eq!(session.page().events().len(), 2);
        assert_eq!(notifier.notifications().len(), 1);
    }

    #[tokio::test]
    async fn test_late_select_is_found_after_mutation() {
        let doc = TestHelper::document_at("https://www.example.com/", r#"<div id="app"></div>"#);
        let (mut session, notifier) = session(doc, Settings::default());
        session.start().await;
        assert_eq!(session.detection().phase(), DetectionPhase::Applying);

        session.advance(ms(1000)).await;
        let app = session.page().find("#app").unwrap();
        session
            .page_mut()
            .append_html(
                app,
                r#"<select id="size"><option>20</option><option>50</option></select>"#,
            )
            .unwrap();
        session.on_mutation();

        session.advance(ms(499)).await;
        assert!(notifier.notifications().is_empty());
        session.advance(ms(1)).await;
        assert!(session.detection().is_applied());
        assert_eq!(notifier.methods(), vec![DetectionMethod::Known]);
    }

    #[tokio::test]
    async fn test_disabled_page_does_nothing() {
        let doc = TestHelper::document_at(
            "https://www.example.com/",
            r#"<select id="size"><option>10</option><option>100</option></select>"#,
        );
        let settings = Settings {
            enabled: false,
            ..Settings::default()
        };
        let (mut session, notifier) = session(doc, settings);
        session.start().await;
        session.on_mutation();
        session.advance(ms(10_000)).await;

        assert_eq!(session.detection().phase(), DetectionPhase::Idle);
        assert!(session.page().events().is_empty());
        assert!(notifier.notifications().is_empty());
        assert_eq!(session.scheduler().pending(), 0);
    }

    #[tokio::test]
    async fn test_navigation_unloads_session() {
        let doc = TestHelper::document_at("https://params.test/search?q=x", "<p>results</p>");
        let (mut session, _) = session(doc, Settings::default());
        session.start().await;

        assert!(session.is_unloaded());
        assert_eq!(
            session.page().navigations(),
            &["https://params.test/search?q=x&limit=100".to_string()]
        );
        session.on_mutation();
        assert_eq!(session.scheduler().pending(), 0);
    }

    #[tokio::test]
    async fn test_infinite_scroll_clicks_and_respects_cooldown() {
        let mut doc = TestHelper::document_at(
            "https://shop.test/catalog",
            r#"<div id="grid"></div><button id="more">Show more</button>"#,
        );
        let button = doc.find("#more").unwrap();
        doc.set_scroll_height(3000.0);
        doc.set_rect(button, ElementRect::new(0.0, 2900.0, 200.0, 40.0));

        let settings = Settings {
            infinite_scroll: true,
            ..Settings::default()
        };
        let (mut session, notifier) = session(doc, settings);
        session.start().await;
        assert!(session.scroll().is_active());
        assert!(session.clicked().is_empty());

        session.page_mut().scroll_to(2280.0);
        session.on_scroll();
        session.advance(ms(200)).await;
        assert_eq!(session.clicked(), &[button]);

        // scrolling again inside the cooldown does nothing
        for _ in 0..5 {
            session.on_scroll();
            session.advance(ms(250)).await;
        }
        assert_eq!(session.clicked().len(), 1);

        // cooldown ends 1500 ms after the click
        session.advance(ms(300)).await;
        session.on_scroll();
        session.advance(ms(200)).await;
        assert_eq!(session.clicked().len(), 2);
        assert_eq!(
            notifier
                .notifications()
                .iter()
                .filter(|n| matches!(n, Notification::LoadMoreClicked { .. }))
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_scrolling_into_margin_clicks_before_bottom() {
        let mut doc = TestHelper::document_at(
            "https://shop.test/catalog",
            r#"<div id="grid"></div><button id="more">Show more</button>"#,
        );
        let button = doc.find("#more").unwrap();
        doc.set_scroll_height(10000.0);
        doc.set_rect(button, ElementRect::new(0.0, 4800.0, 200.0, 40.0));

        let settings = Settings {
            infinite_scroll: true,
            ..Settings::default()
        };
        let (mut session, _) = session(doc, settings);
        session.start().await;
        assert!(session.clicked().is_empty());

        // far from the bottom, but the button is within 500 px of the viewport
        session.page_mut().scroll_to(3600.0);
        session.on_scroll();
        session.advance(ms(1000)).await;
        assert_eq!(session.clicked(), &[button]);
    }

    #[tokio::test]
    async fn test_messages() {
        let doc = TestHelper::document_at(
            "https://www.example.com/",
            r#"<select id="size"><option>10</option><option>100</option></select>"#,
        );
        let (mut session, _) = session(doc, Settings::default());
        session.start().await;
        assert!(!session.scroll().is_active());

        let response = session
            .handle_message(RuntimeMessage::InfiniteScrollChanged { enabled: true })
            .await;
        assert!(response.is_success());
        assert!(session.scroll().is_active());

        session
            .handle_message(RuntimeMessage::InfiniteScrollChanged { enabled: false })
            .await;
        assert!(!session.scroll().is_active());

        match session.handle_message(RuntimeMessage::RetryDetection).await {
            MessageResponse::Retry(report) => {
                assert!(report.applied_before);
                assert!(report.applied_after);
                assert_eq!(report.host, "www.example.com");
            }
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_real_time_driver_runs_retries() {
        let doc = TestHelper::document_at("https://www.example.com/", r#"<div id="app"></div>"#);
        let (mut session, notifier) = session(doc, Settings::default());
        session.start().await;

        let app = session.page().find("#app").unwrap();
        session
            .page_mut()
            .append_html(app, r#"<select id="size"><option>10</option><option>25</option></select>"#)
            .unwrap();

        session.run_for(ms(2500)).await;
        assert_eq!(session.now(), ms(2500));
        assert_eq!(notifier.methods(), vec![DetectionMethod::Known]);
    }
}

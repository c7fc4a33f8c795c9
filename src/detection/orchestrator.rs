use crate::classifier::PageSizeClassifier;
use crate::core::settings::{
    KEY_CUSTOM_PARAMS, KEY_DISABLED_SITES, KEY_ENABLED, KEY_ENABLED_SITES, KEY_ENABLE_NEW_SITES,
};
use crate::core::{
    load_settings, notify_best_effort, Config, DetectionConfig, DetectionMethod, Notification,
    Notifier, PageDom, SettingsStore,
};
use crate::detection::report::{MatchedConfig, RetryReport};
use crate::registry::SiteRegistry;
use crate::runtime::scheduler::{Scheduler, Task};
use crate::strategy::{self, ApplyOutcome};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const ELIGIBILITY_KEYS: [&str; 4] = [
    KEY_ENABLED,
    KEY_ENABLE_NEW_SITES,
    KEY_ENABLED_SITES,
    KEY_DISABLED_SITES,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionPhase {
    /// Not started, or disabled for this page load.
    Idle,
    CheckingEligibility,
    /// Eligible and attempting; stays here between failed attempts.
    Applying,
    Applied,
}

/// A successful pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Application {
    pub method: DetectionMethod,
    pub outcome: ApplyOutcome,
}

/// Runs custom override, known-site and smart detection in that order and
/// latches after the first success.
pub struct DetectionOrchestrator {
    registry: Arc<SiteRegistry>,
    classifier: PageSizeClassifier,
    config: DetectionConfig,
    smart_detection: bool,
    phase: DetectionPhase,
    applied: bool,
    observing: bool,
    last: Option<Application>,
}

impl DetectionOrchestrator {
    pub fn new(registry: Arc<SiteRegistry>, config: &Config) -> Self {
        Self {
            registry,
            classifier: PageSizeClassifier::new(config.classifier.clone()),
            config: config.detection.clone(),
            smart_detection: config.features.smart_detection,
            phase: DetectionPhase::Idle,
            applied: false,
            observing: false,
            last: None,
        }
    }

    pub fn phase(&self) -> DetectionPhase {
        self.phase
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    pub fn is_observing(&self) -> bool {
        self.observing
    }

    pub fn last_application(&self) -> Option<Application> {
        self.last
    }

    pub fn registry(&self) -> &SiteRegistry {
        &self.registry
    }

    /// Global and per-site switches. A disabled page stays idle for its
    /// whole lifetime.
    pub async fn check_eligibility(&mut self, host: &str, settings: &dyn SettingsStore) -> bool {
        self.phase = DetectionPhase::CheckingEligibility;
        let settings = load_settings(settings, &ELIGIBILITY_KEYS).await;

        if !settings.enabled {
            info!("Extension is globally disabled");
            self.phase = DetectionPhase::Idle;
            return false;
        }
        if !settings.is_site_enabled(host) {
            info!("Disabled for this site");
            self.phase = DetectionPhase::Idle;
            return false;
        }
        true
    }

    /// Runs the pipeline once unless already applied. Notifies the
    /// background process on success.
    pub async fn try_apply<D: PageDom + ?Sized>(
        &mut self,
        page: &mut D,
        settings: &dyn SettingsStore,
        notifier: &dyn Notifier,
    ) -> Option<Application> {
        if self.applied {
            return None;
        }
        self.phase = DetectionPhase::Applying;

        let host = page.hostname();
        let application = self.run_pipeline(page, settings, &host).await?;

        self.applied = true;
        self.phase = DetectionPhase::Applied;
        self.last = Some(application);
        info!(
            "Page size applied via {} ({:?})",
            application.method, application.outcome
        );

        notify_best_effort(
            notifier,
            Notification::PageSizeApplied {
                method: application.method,
                host,
                url: page.location(),
            },
        );
        Some(application)
    }

    async fn run_pipeline<D: PageDom + ?Sized>(
        &self,
        page: &mut D,
        settings: &dyn SettingsStore,
        host: &str,
    ) -> Option<Application> {
        let settings = load_settings(settings, &[KEY_CUSTOM_PARAMS]).await;
        if let Some((domain, custom)) = settings.custom_param_for(host) {
            debug!("Found custom param config {} for {}", domain, host);
            let outcome = strategy::apply_url_param(page, &custom.param, &custom.value);
            if outcome.is_success() {
                return Some(Application {
                    method: DetectionMethod::Custom,
                    outcome,
                });
            }
        }

        if let Some(site) = self.registry.lookup(host) {
            debug!("Found known-site config {} for {}", site.domain, host);
            let outcome = strategy::apply(&site.descriptor, page);
            if outcome.is_success() {
                return Some(Application {
                    method: DetectionMethod::Known,
                    outcome,
                });
            }
            if outcome == ApplyOutcome::NotApplicable && !self.config.fallthrough_on_url_mismatch {
                debug!("Known site does not handle this URL, skipping smart detection");
                return None;
            }
        }

        if !self.smart_detection {
            return None;
        }

        let candidate = self.classifier.detect(page)?;
        debug!("Smart detected selector: {}", candidate.signature);
        match strategy::select_max_option(page, candidate.node) {
            Ok(outcome) if outcome.is_success() => Some(Application {
                method: DetectionMethod::Detected,
                outcome,
            }),
            Ok(_) => None,
            Err(e) if e.is_transient_dom_error() => {
                debug!("Detected selector changed during evaluation: {}", e);
                None
            }
            Err(e) => {
                warn!("Detected selector could not be updated: {}", e);
                None
            }
        }
    }

    /// Enters the observing state and schedules the fixed-delay re-attempts.
    pub fn begin_observing(&mut self, scheduler: &mut Scheduler) {
        if self.observing {
            return;
        }
        self.observing = true;
        for delay in self.config.retry_delays() {
            scheduler.schedule(delay, Task::RetryDetection);
        }
    }

    /// Any subtree mutation re-runs the pipeline after a quiet period,
    /// until applied.
    pub fn on_mutation(&self, scheduler: &mut Scheduler) {
        if self.observing && !self.applied {
            scheduler.debounce(self.config.mutation_debounce(), Task::Redetect);
        }
    }

    /// Clears the latch so the next `try_apply` runs the pipeline again.
    pub fn reset(&mut self) {
        self.applied = false;
        self.last = None;
        self.phase = DetectionPhase::Applying;
    }

    /// Resets the latch, re-runs the pipeline once and reports what it saw.
    pub async fn retry<D: PageDom + ?Sized>(
        &mut self,
        page: &mut D,
        settings: &dyn SettingsStore,
        notifier: &dyn Notifier,
    ) -> RetryReport {
        info!("Retry requested");
        let host = page.hostname();
        let url = page.location();
        let applied_before = self.applied;
        let select_elements = page
            .query_selector_all("select")
            .map(|selects| selects.len())
            .unwrap_or(0);
        let matched_config = self
            .registry
            .lookup(&host)
            .map(|site| MatchedConfig::inspect(site, page));

        self.reset();
        let application = self.try_apply(page, settings, notifier).await;

        RetryReport {
            host,
            url,
            applied_before,
            applied_after: self.applied,
            method: application.map(|a| a.method),
            select_elements,
            matched_config,
            timestamp: chrono::Utc::now(),
        }
    }
}

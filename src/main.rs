mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Args, Command};
use max_page_size::classifier::LoadMoreClassifier;
use max_page_size::core::load_settings;
use max_page_size::core::settings::ALL_KEYS;
use max_page_size::host::{FileSettingsStore, MemorySettingsStore, TracingNotifier};
use max_page_size::{
    Config, DomElement, HtmlDocument, PageDom, PageSession, Settings, SettingsStore,
    SiteRegistry, Strategy,
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    let registry = match &args.registry {
        Some(path) => SiteRegistry::load(path)
            .with_context(|| format!("loading registry {}", path.display()))?,
        None => SiteRegistry::builtin().context("loading built-in registry")?,
    };

    match args.command {
        Command::Detect {
            url,
            file,
            settings,
            wait_ms,
        } => detect(config, registry, &url, &file, settings.as_deref(), wait_ms).await,
        Command::LoadMore { url, file } => load_more(config, &url, &file),
        Command::Sites => sites(&registry),
    }
}

fn read_document(url: &str, file: &Path) -> anyhow::Result<HtmlDocument> {
    let html = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    Ok(HtmlDocument::parse(url, &html)?)
}

async fn detect(
    config: Config,
    registry: SiteRegistry,
    url: &str,
    file: &Path,
    settings: Option<&Path>,
    wait_ms: u64,
) -> anyhow::Result<()> {
    let document = read_document(url, file)?;
    let store: Arc<dyn SettingsStore> = match settings {
        Some(path) => Arc::new(FileSettingsStore::new(path)),
        None => Arc::new(MemorySettingsStore::new(Settings::default())),
    };
    let effective = load_settings(store.as_ref(), &ALL_KEYS).await;

    let mut session = PageSession::new(
        document,
        Arc::new(registry),
        store,
        Arc::new(TracingNotifier),
        &config,
    );
    info!("Session {} for {}", session.id(), url);
    session.start().await;
    session.advance(Duration::from_millis(wait_ms)).await;

    let detection = session.detection();
    let application = detection.last_application();
    let page = session.page();
    let selections: Vec<_> = page
        .state()
        .selections
        .iter()
        .filter_map(|(node, index)| {
            DomElement::capture(page, *node).map(|element| json!({
                "element": element.describe(),
                "selectedIndex": index,
            }))
        })
        .collect();

    let report = json!({
        "sessionId": session.id().to_string(),
        "url": url,
        "enabled": effective.is_active_for(&page.hostname()),
        "phase": detection.phase(),
        "applied": detection.is_applied(),
        "method": application.map(|a| a.method),
        "outcome": application.map(|a| a.outcome),
        "selections": selections,
        "navigations": page.navigations(),
        "events": page.events(),
        "matchedSite": detection.registry().lookup(&page.hostname()).map(|site| &site.domain),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn load_more(config: Config, url: &str, file: &Path) -> anyhow::Result<()> {
    let document = read_document(url, file)?;
    let classifier = LoadMoreClassifier::new(config.classifier);

    let candidates: Vec<_> = classifier
        .find_candidates(&document)
        .into_iter()
        .map(|candidate| {
            let element = DomElement::capture(&document, candidate.node)
                .map(|element| element.describe())
                .unwrap_or_default();
            json!({
                "node": candidate.node,
                "element": element,
                "signature": candidate.signature,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&candidates)?);
    Ok(())
}

fn sites(registry: &SiteRegistry) -> anyhow::Result<()> {
    for site in registry.entries() {
        let detail = match &site.descriptor.strategy {
            Strategy::SelectMaxNumeric { selectors } => selectors.join(", "),
            Strategy::UrlParam { param, max_value } => format!("{}={}", param, max_value),
        };
        let pattern = site
            .descriptor
            .url_pattern
            .as_ref()
            .map(|pattern| format!(" [{}]", pattern.as_str()))
            .unwrap_or_default();
        println!(
            "{:<24} {:<20} {}{}",
            site.domain,
            site.descriptor.strategy.name(),
            detail,
            pattern
        );
    }
    info!("{} known sites", registry.len());
    Ok(())
}

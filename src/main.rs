use std::error::Error;
use std::sync::Arc;

use application::config::DashboardConfig;
use application::dashboard::Dashboard;
use application::error::AppError;
use application::event::event_bus::EventBus;
use application::event::events::DashboardEvent;
use application::playback::{AudioEvent, AudioOutput};
use async_trait::async_trait;
use domain::rating::RatingValue;
use domain::value::{BandId, Scope, SetListId, TrackId, UserId};
use infra::config::AppConfigImpl;
use infra::event_bus::in_memory::{DashboardEventLog, InMemoryEventBus};
use infra::repository::in_memory::InMemoryBackend;
use infra::{Fixture, SnowflakeIdGenerator};
use log4rs::{
    append::{console::ConsoleAppender, file::FileAppender},
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};

/// 只写日志的音频输出
struct ConsoleOutput;

#[async_trait]
impl AudioOutput for ConsoleOutput {
    async fn load(&self, url: &str) -> Result<(), AppError> {
        log::info!("[Audio] load {}", url);
        Ok(())
    }

    async fn play(&self) -> Result<(), AppError> {
        log::info!("[Audio] play");
        Ok(())
    }

    async fn pause(&self) -> Result<(), AppError> {
        log::info!("[Audio] pause");
        Ok(())
    }

    async fn seek(&self, seconds: f64) -> Result<(), AppError> {
        log::info!("[Audio] seek {:.1}s", seconds);
        Ok(())
    }

    async fn stop(&self) -> Result<(), AppError> {
        log::info!("[Audio] stop");
        Ok(())
    }
}

fn init_logging(log_file: &str) -> Result<(), Box<dyn Error>> {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let pattern = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {m}{n}";

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build(log_file)?;

    // 同时输出到控制台和文件
    let config = Config::builder()
        .appender(Appender::builder().build("file", Box::new(file_appender)))
        .appender(Appender::builder().build(
            "stdout",
            Box::new(
                ConsoleAppender::builder()
                    .encoder(Box::new(PatternEncoder::new(pattern)))
                    .build(),
            ),
        ))
        .build(
            Root::builder()
                .appender("file")
                .appender("stdout")
                .build(log_level.parse().unwrap_or(log::LevelFilter::Info)),
        )?;

    log4rs::init_config(config)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cfg = AppConfigImpl::load()?;
    init_logging(&cfg.log_file())?;

    let backend = InMemoryBackend::new();
    match Fixture::load(cfg.fixture_path()) {
        Ok(fixture) => fixture.seed(&backend)?,
        Err(e) => log::warn!("[Main] starting with empty data, fixture not loaded: {}", e),
    }

    let events = Arc::new(DashboardEventLog::new());
    let mut bus = InMemoryEventBus::new();
    bus.subscribe::<DashboardEvent>(events.clone()).await;

    let id_generator = Arc::new(SnowflakeIdGenerator::new(i64::from(cfg.node_id()))?);
    let mut dashboard = Dashboard::new(
        backend.repositories(),
        id_generator,
        Arc::new(bus),
        Arc::new(ConsoleOutput),
        &cfg,
    );

    let scope = match cfg.default_band_id() {
        Some(band_id) => Scope::Band(BandId::from(band_id)),
        None => Scope::Personal(UserId::from(cfg.viewer_id())),
    };
    dashboard.load_scope(&scope).await?;

    let rows = dashboard.track_rows(&scope);
    log::info!("[Main] {} tracks in {}", rows.len(), scope);
    let track_ids: Vec<TrackId> = rows.iter().map(|r| TrackId::from(r.id)).collect();
    dashboard.load_ratings(&track_ids).await?;

    if let Some(first) = track_ids.first() {
        dashboard.rate(first, RatingValue::Liked).await?;
        dashboard.play(first).await?;
        dashboard.handle_audio_event(AudioEvent::CanPlay).await?;
    }
    println!("{}", serde_json::to_string_pretty(&dashboard.track_rows(&scope))?);

    let set_lists = dashboard.set_list_summaries(&scope);
    for summary in &set_lists {
        let id = SetListId::from(summary.id);
        let view = dashboard.open_set_list(&id).await?;
        println!("{}", serde_json::to_string_pretty(&view)?);
        if let Some(link) = dashboard.share_link(&id) {
            log::info!("[Main] share \"{}\" via {}", summary.title, link);
        }
    }
    println!("{}", serde_json::to_string_pretty(&dashboard.work_summaries(&scope))?);

    log::info!("[Main] {} dashboard events published", events.len().await);
    Ok(())
}

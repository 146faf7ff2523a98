use application::config::DashboardConfig;
use config::{Config, Environment, File};
use dotenvy::dotenv;
use serde::Deserialize;
use std::error::Error;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawConfig {
    /// 当前登录用户
    viewer_id: i64,
    /// 启动时打开的乐队，为空则打开个人空间
    default_band_id: Option<i64>,
    /// 雪花ID的节点号
    node_id: u16,
    fixture_path: String,
    log_file: String,
    success_notice_ttl_ms: u64,
    auto_advance: bool,
    deep_link_scheme: String,
    web_host: String,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            viewer_id: 1,
            default_band_id: None,
            node_id: 1,
            fixture_path: "fixtures/demo.json".to_string(),
            log_file: "coretet.log".to_string(),
            success_notice_ttl_ms: 3000,
            auto_advance: true,
            deep_link_scheme: "coretet".to_string(),
            web_host: "coretet.app".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfigImpl {
    pub viewer_id: Arc<AtomicU64>,
    pub default_band_id: Arc<RwLock<Option<i64>>>,
    pub node_id: Arc<AtomicU64>,
    pub fixture_path: Arc<RwLock<String>>,
    pub log_file: Arc<RwLock<String>>,
    pub success_notice_ttl_ms: Arc<AtomicU64>,
    pub auto_advance: Arc<AtomicBool>,
    pub deep_link_scheme: Arc<RwLock<String>>,
    pub web_host: Arc<RwLock<String>>,
}

/// 读锁中毒时仍取出里面的值
fn read_cloned<T: Clone>(lock: &RwLock<T>) -> T {
    match lock.read() {
        Ok(value) => value.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

impl AppConfigImpl {
    fn new(data: RawConfig) -> Self {
        AppConfigImpl {
            viewer_id: Arc::new(AtomicU64::new(data.viewer_id as u64)),
            default_band_id: Arc::new(RwLock::new(data.default_band_id)),
            node_id: Arc::new(AtomicU64::new(u64::from(data.node_id))),
            fixture_path: Arc::new(RwLock::new(data.fixture_path)),
            log_file: Arc::new(RwLock::new(data.log_file)),
            success_notice_ttl_ms: Arc::new(AtomicU64::new(data.success_notice_ttl_ms)),
            auto_advance: Arc::new(AtomicBool::new(data.auto_advance)),
            deep_link_scheme: Arc::new(RwLock::new(data.deep_link_scheme)),
            web_host: Arc::new(RwLock::new(data.web_host)),
        }
    }

    /// 依次读取 `.env`、可选的 `config.toml` 和 `CORETET__*` 环境变量
    pub fn load() -> Result<AppConfigImpl, Box<dyn Error>> {
        dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("CORETET").separator("__"))
            .build()?;

        let raw: RawConfig = config.try_deserialize()?;
        Ok(AppConfigImpl::new(raw))
    }

    pub fn default_band_id(&self) -> Option<i64> {
        read_cloned(&self.default_band_id)
    }

    pub fn node_id(&self) -> u16 {
        self.node_id.load(Ordering::SeqCst) as u16
    }

    pub fn fixture_path(&self) -> String {
        read_cloned(&self.fixture_path)
    }

    pub fn log_file(&self) -> String {
        read_cloned(&self.log_file)
    }
}

impl Default for AppConfigImpl {
    fn default() -> Self {
        Self::new(RawConfig::default())
    }
}

impl DashboardConfig for AppConfigImpl {
    fn viewer_id(&self) -> i64 {
        self.viewer_id.load(Ordering::SeqCst) as i64
    }

    fn success_notice_ttl_ms(&self) -> u64 {
        self.success_notice_ttl_ms.load(Ordering::SeqCst)
    }

    fn auto_advance(&self) -> bool {
        self.auto_advance.load(Ordering::SeqCst)
    }

    fn deep_link_scheme(&self) -> String {
        read_cloned(&self.deep_link_scheme)
    }

    fn web_host(&self) -> String {
        read_cloned(&self.web_host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfigImpl::default();
        assert_eq!(config.viewer_id(), 1);
        assert_eq!(config.success_notice_ttl_ms(), 3000);
        assert!(config.auto_advance());
        assert_eq!(config.deep_link_scheme(), "coretet");
        assert_eq!(config.default_band_id(), None);
    }

    #[test]
    fn test_partial_source_keeps_defaults() {
        let config = Config::builder()
            .set_override("viewer_id", 42)
            .unwrap()
            .set_override("auto_advance", false)
            .unwrap()
            .build()
            .unwrap();
        let raw: RawConfig = config.try_deserialize().unwrap();
        let config = AppConfigImpl::new(raw);
        assert_eq!(config.viewer_id(), 42);
        assert!(!config.auto_advance());
        assert_eq!(config.web_host(), "coretet.app");
        assert_eq!(config.fixture_path(), "fixtures/demo.json");
    }
}

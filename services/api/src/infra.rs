use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tower_staffing::config::{AppConfig, RelayConfig};
use tower_staffing::error::AppError;
use tower_staffing::relay::{GeminiRelay, ImageRequest, VisionRelay};
use tower_staffing::workflows::roster::{Category, JsonFileStore, RosterService};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type FileRosterService = RosterService<JsonFileStore>;

/// `--snapshot` wins over `ROSTER_SNAPSHOT_PATH`.
pub(crate) fn snapshot_path(config: &AppConfig, override_path: Option<PathBuf>) -> PathBuf {
    override_path.unwrap_or_else(|| config.storage.snapshot_path.clone())
}

pub(crate) fn open_roster(path: &Path) -> Result<FileRosterService, AppError> {
    let store = Arc::new(JsonFileStore::new(path));
    Ok(RosterService::open(store)?)
}

pub(crate) fn build_relay(config: &RelayConfig) -> Result<Arc<dyn VisionRelay>, AppError> {
    let relay = GeminiRelay::new(config)?;
    if !relay.is_configured() {
        tracing::warn!("GEMINI_API_KEY is not set; screenshot import is disabled");
    }
    Ok(Arc::new(relay))
}

/// Reads an image file into a scan request, guessing the media type from the extension.
pub(crate) fn image_request(path: &Path) -> Result<ImageRequest, AppError> {
    let bytes = std::fs::read(path)?;
    let media_type = mime_guess::from_path(path)
        .first()
        .filter(|mime| mime.type_() == "image")
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| "image/png".to_string());
    Ok(ImageRequest::resident_scan(STANDARD.encode(bytes), media_type))
}

pub(crate) fn parse_category(raw: &str) -> Result<Category, String> {
    raw.parse::<Category>().map_err(|err| err.to_string())
}

/// Parses `Food=7` style skill overrides.
pub(crate) fn parse_skill(raw: &str) -> Result<(Category, u8), String> {
    let (category, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=VALUE, got '{raw}'"))?;
    let category = parse_category(category)?;
    let value = value
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|value| *value <= 9)
        .ok_or_else(|| format!("skill value for {category} must be 0-9, got '{}'", value.trim()))?;
    Ok((category, value))
}

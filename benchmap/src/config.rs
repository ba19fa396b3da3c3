//! Session configuration.
//!
//! [`SessionConfig`] combines everything needed to start a session: the
//! initial viewport, provider mode, prefetch tuning, tile cache budget, and
//! point-API settings. Defaults match the behavior being replaced; an INI
//! file in the user config directory can override them.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::prefetch::PrefetchConfig;
use crate::provider::ProviderMode;
use crate::session::Viewport;

/// Default zoom applied by recenter-on-user.
pub const DEFAULT_RECENTER_ZOOM: f64 = 15.0;

/// Default tile cache budget (bytes).
pub const DEFAULT_TILE_CACHE_BYTES: u64 = 50 * 1024 * 1024;

/// Default nominal view size in pixels (portrait phone).
pub const DEFAULT_VIEW_SIZE_PX: (f64, f64) = (1080.0, 1920.0);

/// Default point API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://openbenches.org/api";

/// Default radius for nearby queries, in meters.
pub const DEFAULT_NEARBY_RADIUS_M: u32 = 200;

/// Default reverse-geocoder base URL.
pub const DEFAULT_GEOCODER_BASE_URL: &str = "https://api.opencagedata.com";

/// Errors loading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or parsed as INI.
    #[error("Failed to read config: {0}")]
    Read(#[from] ini::Error),

    /// A key's value could not be parsed.
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
}

/// Tile cache configuration.
#[derive(Debug, Clone)]
pub struct TileCacheConfig {
    /// Maximum cache size in bytes.
    pub max_size_bytes: u64,
}

impl Default for TileCacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_TILE_CACHE_BYTES,
        }
    }
}

/// Point API and geocoder configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Point API base URL.
    pub base_url: String,
    /// Radius for nearby queries, in meters.
    pub nearby_radius_m: u32,
    /// Reverse-geocoder base URL.
    pub geocoder_base_url: String,
    /// Reverse-geocoder API key; geocoding is disabled without one.
    pub geocoder_api_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            nearby_radius_m: DEFAULT_NEARBY_RADIUS_M,
            geocoder_base_url: DEFAULT_GEOCODER_BASE_URL.to_string(),
            geocoder_api_key: None,
        }
    }
}

/// Top-level session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Viewport at session start (a resolved user location may replace it).
    pub initial_viewport: Viewport,
    /// Provider implementation for the session.
    pub provider_mode: ProviderMode,
    /// Zoom applied when recentering on the user.
    pub recenter_zoom: f64,
    /// Nominal view width in pixels, for visible-bounds computation.
    pub view_width_px: f64,
    /// Nominal view height in pixels.
    pub view_height_px: f64,
    /// Prefetch tuning.
    pub prefetch: PrefetchConfig,
    /// Tile cache budget.
    pub cache: TileCacheConfig,
    /// Point API settings.
    pub api: ApiConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_viewport: Viewport::default(),
            provider_mode: ProviderMode::Raster,
            recenter_zoom: DEFAULT_RECENTER_ZOOM,
            view_width_px: DEFAULT_VIEW_SIZE_PX.0,
            view_height_px: DEFAULT_VIEW_SIZE_PX.1,
            prefetch: PrefetchConfig::default(),
            cache: TileCacheConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Set the starting viewport.
    pub fn with_initial_viewport(mut self, viewport: Viewport) -> Self {
        self.initial_viewport = viewport;
        self
    }

    /// Set the provider mode.
    pub fn with_provider_mode(mut self, mode: ProviderMode) -> Self {
        self.provider_mode = mode;
        self
    }

    /// Set the prefetch configuration.
    pub fn with_prefetch(mut self, prefetch: PrefetchConfig) -> Self {
        self.prefetch = prefetch;
        self
    }

    /// The default config file location, when a user config dir exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("benchmap").join("config.ini"))
    }

    /// Load configuration from an INI file, overlaying the defaults.
    ///
    /// Recognized sections and keys:
    ///
    /// ```ini
    /// [map]
    /// center_lat = 51.5
    /// center_lon = -0.1
    /// zoom = 15.0
    /// provider = raster
    /// recenter_zoom = 15.0
    ///
    /// [prefetch]
    /// enabled = true
    /// throttle_ms = 100
    /// pan_settle_ms = 500
    /// zoom_settle_ms = 300
    /// warmup_ms = 1000
    /// max_tiles_per_job = 64
    /// fetch_concurrency = 8
    ///
    /// [cache]
    /// max_size_mb = 50
    ///
    /// [api]
    /// base_url = https://openbenches.org/api
    /// nearby_radius_m = 200
    /// geocoder_api_key = ...
    /// ```
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path)?;
        let mut config = Self::default();

        if let Some(map) = ini.section(Some("map")) {
            let mut center = config.initial_viewport.center;
            if let Some(lat) = map.get("center_lat") {
                center.latitude = parse(lat, "map.center_lat")?;
            }
            if let Some(lon) = map.get("center_lon") {
                center.longitude = parse(lon, "map.center_lon")?;
            }
            config.initial_viewport.center = center;
            if let Some(zoom) = map.get("zoom") {
                config.initial_viewport.zoom = parse(zoom, "map.zoom")?;
            }
            if let Some(provider) = map.get("provider") {
                config.provider_mode =
                    provider.parse().map_err(|_| ConfigError::Invalid {
                        key: "map.provider".to_string(),
                        value: provider.to_string(),
                    })?;
            }
            if let Some(zoom) = map.get("recenter_zoom") {
                config.recenter_zoom = parse(zoom, "map.recenter_zoom")?;
            }
        }

        if let Some(prefetch) = ini.section(Some("prefetch")) {
            if let Some(enabled) = prefetch.get("enabled") {
                config.prefetch.enabled = parse(enabled, "prefetch.enabled")?;
            }
            if let Some(ms) = prefetch.get("throttle_ms") {
                config.prefetch.throttle_interval = millis(ms, "prefetch.throttle_ms")?;
            }
            if let Some(ms) = prefetch.get("pan_settle_ms") {
                config.prefetch.pan_settle_delay = millis(ms, "prefetch.pan_settle_ms")?;
            }
            if let Some(ms) = prefetch.get("zoom_settle_ms") {
                config.prefetch.zoom_settle_delay = millis(ms, "prefetch.zoom_settle_ms")?;
            }
            if let Some(ms) = prefetch.get("warmup_ms") {
                config.prefetch.warmup_delay = millis(ms, "prefetch.warmup_ms")?;
            }
            if let Some(max) = prefetch.get("max_tiles_per_job") {
                config.prefetch.max_tiles_per_job = parse(max, "prefetch.max_tiles_per_job")?;
            }
            if let Some(n) = prefetch.get("fetch_concurrency") {
                config.prefetch.fetch_concurrency = parse(n, "prefetch.fetch_concurrency")?;
            }
        }

        if let Some(cache) = ini.section(Some("cache")) {
            if let Some(mb) = cache.get("max_size_mb") {
                let mb: u64 = parse(mb, "cache.max_size_mb")?;
                config.cache.max_size_bytes = mb * 1024 * 1024;
            }
        }

        if let Some(api) = ini.section(Some("api")) {
            if let Some(url) = api.get("base_url") {
                config.api.base_url = url.to_string();
            }
            if let Some(radius) = api.get("nearby_radius_m") {
                config.api.nearby_radius_m = parse(radius, "api.nearby_radius_m")?;
            }
            if let Some(key) = api.get("geocoder_api_key") {
                config.api.geocoder_api_key = Some(key.to_string());
            }
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn millis(value: &str, key: &str) -> Result<std::time::Duration, ConfigError> {
    let ms: u64 = parse(value, key)?;
    Ok(std::time::Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::LatLon;
    use std::io::Write;
    use std::time::Duration;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.provider_mode, ProviderMode::Raster);
        assert_eq!(config.recenter_zoom, 15.0);
        assert_eq!(config.cache.max_size_bytes, 50 * 1024 * 1024);
        assert_eq!(config.api.nearby_radius_m, 200);
        assert_eq!(config.initial_viewport.center, LatLon::new(51.5, -0.1));
    }

    #[test]
    fn test_load_overlays_defaults() {
        let file = write_config(
            "[map]\n\
             center_lat = 48.85\n\
             center_lon = 2.35\n\
             zoom = 12\n\
             provider = vector\n\
             \n\
             [prefetch]\n\
             throttle_ms = 250\n\
             \n\
             [cache]\n\
             max_size_mb = 100\n",
        );

        let config = SessionConfig::load(file.path()).unwrap();
        assert_eq!(config.initial_viewport.center, LatLon::new(48.85, 2.35));
        assert_eq!(config.initial_viewport.zoom, 12.0);
        assert_eq!(config.provider_mode, ProviderMode::Vector);
        assert_eq!(config.prefetch.throttle_interval, Duration::from_millis(250));
        // Untouched keys keep their defaults
        assert_eq!(config.prefetch.pan_settle_delay, Duration::from_millis(500));
        assert_eq!(config.cache.max_size_bytes, 100 * 1024 * 1024);
        assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_invalid_value_is_an_error() {
        let file = write_config("[map]\nzoom = very close\n");
        let result = SessionConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = SessionConfig::load(Path::new("/nonexistent/benchmap.ini"));
        assert!(matches!(result, Err(ConfigError::Read(_))));
    }
}

use std::collections::HashMap;

use serde::Deserialize;

use crate::types::ModuleKind;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret for session tokens.
    pub jwt_secret: String,
    /// Username → argon2 password hash. Loaded once; changing users requires
    /// a restart, which is also how access is revoked.
    #[serde(default)]
    pub users: HashMap<String, String>,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShareConfig {
    /// Directory holding one JSON file per share slug.
    pub path: String,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GalleryConfig {
    pub path: String,
    pub cache: String,
    #[serde(default = "default_gallery_extensions")]
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecurityConfig {
    pub enable_hsts: Option<bool>,
    pub hsts_max_age: Option<u64>,
    pub hsts_include_subdomains: Option<bool>,
    pub csp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub share: ShareConfig,
    #[serde(default)]
    pub modules: Vec<ModuleKind>,
    pub gallery: Option<GalleryConfig>,
    pub files: Option<FilesConfig>,
    pub security: Option<SecurityConfig>,
}

fn default_token_ttl_hours() -> u64 {
    720
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

fn default_gallery_extensions() -> Vec<String> {
    vec![".jpg".to_string(), ".jpeg".to_string(), ".png".to_string()]
}

pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let defaults: &str = include_str!("../config/default.toml");
    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
        // Optional local file: heimwolke.toml (in CWD)
        .add_source(::config::File::with_name("heimwolke").required(false));

    if let Ok(custom_path) = std::env::var("HEIMWOLKE_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(::config::Environment::with_prefix("HEIMWOLKE").separator("__"));

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    // Server
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }

    // Auth
    if cfg.auth.jwt_secret.is_empty() {
        return Err(anyhow::anyhow!("auth.jwt_secret must be set"));
    }
    if cfg.auth.users.is_empty() {
        tracing::warn!("auth.users is empty - owner sign-in is impossible until users are configured");
    }
    if cfg.auth.token_ttl_hours == 0 {
        return Err(anyhow::anyhow!("auth.token_ttl_hours must be > 0"));
    }

    // Shares
    if cfg.share.path.is_empty() {
        return Err(anyhow::anyhow!("share.path must be set"));
    }
    if cfg.share.sweep_interval_secs == 0 {
        return Err(anyhow::anyhow!("share.sweep_interval_secs must be > 0"));
    }

    // Modules
    for module in &cfg.modules {
        match module {
            ModuleKind::Gallery => {
                let gallery =
                    cfg.gallery.as_ref().ok_or_else(|| anyhow::anyhow!("gallery module enabled but [gallery] is missing"))?;
                if gallery.path.is_empty() || gallery.cache.is_empty() {
                    return Err(anyhow::anyhow!("gallery.path and gallery.cache must be set"));
                }
                if gallery.extensions.is_empty() {
                    return Err(anyhow::anyhow!("gallery.extensions must not be empty"));
                }
            }
            ModuleKind::Files => {
                let files =
                    cfg.files.as_ref().ok_or_else(|| anyhow::anyhow!("files module enabled but [files] is missing"))?;
                if files.path.is_empty() {
                    return Err(anyhow::anyhow!("files.path must be set"));
                }
            }
        }
    }

    Ok(())
}

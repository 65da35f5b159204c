use crate::domain::model::Coordinates;
use crate::utils::error::{AppError, Result};
use crate::utils::validation::{
    validate_config_email, validate_path, validate_positive_number, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub upload: UploadConfig,
    pub mail: MailConfig,
    pub maps: MapsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Base for magic links and label QR codes.
    pub public_base_url: String,
    /// Allowed browser origins; empty allows any.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
            public_base_url: "http://localhost:5000".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    pub snapshot_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            snapshot_file: "reptile-db.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub admin_emails: Vec<String>,
    pub session_ttl_hours: u64,
    pub min_password_length: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_emails: Vec::new(),
            session_ttl_hours: 168,
            min_password_length: 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub endpoint: String,
    pub cloud_name: String,
    pub upload_preset: Option<String>,
    pub folder: String,
    pub max_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.cloudinary.com".to_string(),
            cloud_name: String::new(),
            upload_preset: None,
            folder: "kyc_verifications".to_string(),
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub endpoint: String,
    pub api_key: String,
    pub from: String,
    /// Where contact form submissions are delivered.
    pub inbox: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8025/api/send".to_string(),
            api_key: String::new(),
            from: "no-reply@reptileglobal.site".to_string(),
            inbox: "marcus@reptileglobal.site".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapsConfig {
    pub access_token: String,
    pub directions_endpoint: String,
    pub geocoding_endpoint: String,
    pub route_debounce_ms: u64,
    pub edit_fit_padding: u32,
    pub route_fit_padding: u32,
    pub default_center: Coordinates,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            directions_endpoint: "https://api.mapbox.com/directions/v5/mapbox/driving".to_string(),
            geocoding_endpoint: "https://api.mapbox.com/geocoding/v5/mapbox.places".to_string(),
            route_debounce_ms: 1000,
            edit_fit_padding: 50,
            route_fit_padding: 100,
            default_center: crate::core::map::DEFAULT_CENTER,
        }
    }
}

fn env_var_regex() -> &'static Regex {
    static ENV_VAR: OnceLock<Regex> = OnceLock::new();
    ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is a valid regex"))
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Load the file when it exists, otherwise fall back to defaults.
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            tracing::info!(
                "No config file at {}, using defaults",
                path.as_ref().display()
            );
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed_content)?)
    }

    /// Replace `${VAR}` with the environment value. Unset variables are
    /// left as written.
    fn substitute_env_vars(content: &str) -> String {
        env_var_regex()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .map_err(|e: std::net::AddrParseError| AppError::InvalidConfigValue {
                field: "server.bind".to_string(),
                value: self.server.bind.clone(),
                reason: e.to_string(),
            })
    }

    pub fn validate_config(&self) -> Result<()> {
        self.bind_addr()?;
        validate_url("server.public_base_url", &self.server.public_base_url)?;
        for origin in &self.server.cors_origins {
            validate_url("server.cors_origins", origin)?;
        }

        validate_path("storage.data_dir", &self.storage.data_dir)?;
        validate_path("storage.snapshot_file", &self.storage.snapshot_file)?;

        for email in &self.auth.admin_emails {
            validate_config_email("auth.admin_emails", email)?;
        }
        validate_positive_number("auth.session_ttl_hours", self.auth.session_ttl_hours, 1)?;
        validate_positive_number("auth.min_password_length", self.auth.min_password_length, 1)?;

        validate_url("upload.endpoint", &self.upload.endpoint)?;
        validate_positive_number("upload.max_bytes", self.upload.max_bytes, 1)?;
        validate_path("upload.folder", &self.upload.folder)?;

        validate_url("mail.endpoint", &self.mail.endpoint)?;
        validate_config_email("mail.from", &self.mail.from)?;
        validate_config_email("mail.inbox", &self.mail.inbox)?;

        validate_url("maps.directions_endpoint", &self.maps.directions_endpoint)?;
        validate_url("maps.geocoding_endpoint", &self.maps.geocoding_endpoint)?;
        let center = self.maps.default_center;
        if !(-90.0..=90.0).contains(&center.lat) || !(-180.0..=180.0).contains(&center.lng) {
            return Err(AppError::InvalidConfigValue {
                field: "maps.default_center".to_string(),
                value: format!("{}, {}", center.lat, center.lng),
                reason: "Coordinates out of range".to_string(),
            });
        }

        Ok(())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

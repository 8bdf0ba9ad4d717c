/// Configuration management for the CMS
use crate::error::{CmsError, CmsResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
    pub auth: AuthConfig,
    pub email: Option<EmailConfig>,
    pub cors: CorsConfig,
    pub rate_limit: RateLimitSettings,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Externally visible base URL, used when deriving attachment URLs
    pub public_url: Option<String>,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    pub blobstore: BlobstoreConfig,
}

/// Blob storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BlobstoreConfig {
    Disk {
        location: PathBuf,
        tmp_location: PathBuf,
    },
}

/// Upload constraints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Per-file ceiling in bytes (default 10 MB, matching the admin
    /// dashboard's documented limit)
    pub max_file_size: usize,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Access token lifetime in seconds
    pub token_ttl: i64,
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
    /// Where contact-form messages are delivered
    pub contact_recipient: String,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Exact origins allowed to call the API; empty means allow any
    pub allowed_origins: Vec<String>,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub requests_per_second: u32,
    pub upload_requests_per_second: u32,
    pub burst_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> CmsResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("CMS_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("CMS_PORT")
            .unwrap_or_else(|_| "4000".to_string())
            .parse()
            .map_err(|_| CmsError::Validation("Invalid port number".to_string()))?;
        let public_url = env::var("CMS_PUBLIC_URL").ok();
        let version = env::var("CMS_VERSION").unwrap_or_else(|_| "0.1.0".to_string());

        let data_directory: PathBuf = env::var("CMS_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("CMS_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("cms.sqlite"));

        let blobstore = BlobstoreConfig::Disk {
            location: env::var("CMS_BLOBSTORE_DISK_LOCATION")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_directory.join("blobs")),
            tmp_location: env::var("CMS_BLOBSTORE_DISK_TMP_LOCATION")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_directory.join("tmp")),
        };

        let max_file_size = env::var("CMS_UPLOAD_LIMIT")
            .unwrap_or_else(|_| "10485760".to_string())
            .parse()
            .unwrap_or(10 * 1024 * 1024);

        let jwt_secret = env::var("CMS_JWT_SECRET")
            .map_err(|_| CmsError::Validation("JWT secret required".to_string()))?;
        let token_ttl = env::var("CMS_TOKEN_TTL")
            .unwrap_or_else(|_| "604800".to_string()) // 7 days
            .parse()
            .unwrap_or(604_800);

        let email = if let Ok(smtp_url) = env::var("CMS_EMAIL_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("CMS_EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| format!("noreply@{}", hostname)),
                contact_recipient: env::var("CMS_CONTACT_RECIPIENT")
                    .map_err(|_| CmsError::Validation("Contact recipient required".to_string()))?,
            })
        } else {
            None
        };

        let allowed_origins = env::var("CMS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| String::new())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<String>>();

        let rate_limit_enabled = env::var("CMS_RATE_LIMITS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let requests_per_second = env::var("CMS_RATE_LIMIT_RPS")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);
        let upload_requests_per_second = env::var("CMS_RATE_LIMIT_UPLOAD_RPS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);
        let burst_size = env::var("CMS_RATE_LIMIT_BURST")
            .unwrap_or_else(|_| "25".to_string())
            .parse()
            .unwrap_or(25);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                public_url,
                version,
            },
            storage: StorageConfig {
                data_directory,
                database,
                blobstore,
            },
            upload: UploadConfig { max_file_size },
            auth: AuthConfig {
                jwt_secret,
                token_ttl,
            },
            email,
            cors: CorsConfig { allowed_origins },
            rate_limit: RateLimitSettings {
                enabled: rate_limit_enabled,
                requests_per_second,
                upload_requests_per_second,
                burst_size,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> CmsResult<()> {
        if self.service.hostname.is_empty() {
            return Err(CmsError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.auth.jwt_secret.len() < 32 {
            return Err(CmsError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.upload.max_file_size == 0 {
            return Err(CmsError::Validation(
                "Upload size limit must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 4000,
                public_url: None,
                version: "0.1.0".to_string(),
            },
            storage: StorageConfig {
                data_directory: "./data".into(),
                database: "./data/cms.sqlite".into(),
                blobstore: BlobstoreConfig::Disk {
                    location: "./data/blobs".into(),
                    tmp_location: "./data/tmp".into(),
                },
            },
            upload: UploadConfig {
                max_file_size: 10 * 1024 * 1024,
            },
            auth: AuthConfig {
                jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
                token_ttl: 604_800,
            },
            email: None,
            cors: CorsConfig {
                allowed_origins: vec![],
            },
            rate_limit: RateLimitSettings {
                enabled: true,
                requests_per_second: 50,
                upload_requests_per_second: 5,
                burst_size: 25,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let mut config = test_config();
        config.auth.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_upload_limit_rejected() {
        let mut config = test_config();
        config.upload.max_file_size = 0;
        assert!(config.validate().is_err());
    }
}

/// Account manager using runtime sqlx queries
use crate::{
    account::{Account, Session, ValidatedSession},
    config::ServerConfig,
    error::{CmsError, CmsResult},
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>) -> Self {
        Self { db, config }
    }

    /// Register a new account
    pub async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> CmsResult<Account> {
        // Emails are stored normalized so lookups are case-insensitive
        let email = email.trim().to_lowercase();

        if self.email_exists(&email).await? {
            return Err(CmsError::Conflict("Email is already in use".to_string()));
        }

        let password_hash = hash_password(password)?;

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4().simple().to_string(),
            full_name: full_name.trim().to_string(),
            email,
            password_hash,
            role: "user".to_string(),
            created_at: now,
        };

        sqlx::query(
            "INSERT INTO account (id, full_name, email, password_hash, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&account.id)
        .bind(&account.full_name)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.role)
        .bind(account.created_at)
        .execute(&self.db)
        .await
        .map_err(CmsError::Database)?;

        tracing::info!("registered account {}", account.id);

        Ok(account)
    }

    /// Authenticate and create a session
    pub async fn login(&self, email: &str, password: &str) -> CmsResult<(Account, Session)> {
        let email = email.trim().to_lowercase();

        // The same error for unknown email and wrong password, so the
        // endpoint does not disclose which addresses exist
        let account = self
            .get_account_by_email(&email)
            .await?
            .ok_or_else(|| CmsError::Authentication("Invalid email or password".to_string()))?;

        if !verify_password(password, &account.password_hash) {
            return Err(CmsError::Authentication(
                "Invalid email or password".to_string(),
            ));
        }

        let session = self.create_session(&account).await?;

        Ok((account, session))
    }

    /// Create a session for an account
    pub async fn create_session(&self, account: &Account) -> CmsResult<Session> {
        let session_id = Uuid::new_v4().simple().to_string();
        let access_token = self.generate_access_token(account, &session_id)?;

        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.config.auth.token_ttl);

        sqlx::query(
            "INSERT INTO session (id, account_id, access_token, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&session_id)
        .bind(&account.id)
        .bind(&access_token)
        .bind(now)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .map_err(CmsError::Database)?;

        Ok(Session {
            id: session_id,
            account_id: account.id.clone(),
            access_token,
            created_at: now,
            expires_at,
        })
    }

    /// Validate an access token and return session info
    pub async fn validate_access_token(&self, token: &str) -> CmsResult<ValidatedSession> {
        let row = sqlx::query(
            "SELECT s.id, s.account_id, s.expires_at, a.role
             FROM session s JOIN account a ON a.id = s.account_id
             WHERE s.access_token = ?1",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
        .map_err(CmsError::Database)?
        .ok_or_else(|| CmsError::Authentication("Invalid or expired session".to_string()))?;

        let session_id: String = row.get("id");
        let account_id: String = row.get("account_id");
        let expires_at: DateTime<Utc> = row.get("expires_at");
        let role: String = row.get("role");

        if Utc::now() > expires_at {
            return Err(CmsError::Authentication("Session expired".to_string()));
        }

        Ok(ValidatedSession {
            account_id,
            session_id,
            role,
        })
    }

    /// Delete sessions past their expiry, returning how many went
    pub async fn cleanup_expired_sessions(&self) -> CmsResult<u64> {
        let result = sqlx::query("DELETE FROM session WHERE expires_at < ?1")
            .bind(Utc::now())
            .execute(&self.db)
            .await
            .map_err(CmsError::Database)?;

        Ok(result.rows_affected())
    }

    async fn email_exists(&self, email: &str) -> CmsResult<bool> {
        let row = sqlx::query("SELECT 1 FROM account WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .map_err(CmsError::Database)?;

        Ok(row.is_some())
    }

    async fn get_account_by_email(&self, email: &str) -> CmsResult<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, full_name, email, password_hash, role, created_at
             FROM account WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(CmsError::Database)?;

        match row {
            Some(row) => Ok(Some(Account {
                id: row.get("id"),
                full_name: row.get("full_name"),
                email: row.get("email"),
                password_hash: row.get("password_hash"),
                role: row.get("role"),
                created_at: row.get("created_at"),
            })),
            None => Ok(None),
        }
    }

    /// Generate a signed access JWT
    fn generate_access_token(&self, account: &Account, session_id: &str) -> CmsResult<String> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        use serde::{Deserialize, Serialize};

        #[derive(Debug, Serialize, Deserialize)]
        struct Claims {
            sub: String,
            sid: String,
            role: String,
            iat: i64,
            exp: i64,
        }

        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: account.id.clone(),
            sid: session_id.to_string(),
            role: account.role.clone(),
            iat: now,
            exp: now + self.config.auth.token_ttl,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.auth.jwt_secret.as_bytes()),
        )
        .map_err(|e| CmsError::Internal(format!("Failed to generate token: {}", e)))?;

        Ok(token)
    }
}

fn hash_password(password: &str) -> CmsResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CmsError::Internal(format!("Password hashing failed: {}", e)))
}

fn verify_password(candidate: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AuthConfig, BlobstoreConfig, CorsConfig, LoggingConfig, RateLimitSettings, ServiceConfig,
        StorageConfig, UploadConfig,
    };

    fn test_config() -> Arc<ServerConfig> {
        Arc::new(ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 0,
                public_url: None,
                version: "test".to_string(),
            },
            storage: StorageConfig {
                data_directory: "./data".into(),
                database: ":memory:".into(),
                blobstore: BlobstoreConfig::Disk {
                    location: "./data/blobs".into(),
                    tmp_location: "./data/tmp".into(),
                },
            },
            upload: UploadConfig {
                max_file_size: 1024,
            },
            auth: AuthConfig {
                jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
                token_ttl: 3600,
            },
            email: None,
            cors: CorsConfig {
                allowed_origins: vec![],
            },
            rate_limit: RateLimitSettings {
                enabled: false,
                requests_per_second: 50,
                upload_requests_per_second: 5,
                burst_size: 25,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        })
    }

    async fn create_test_manager() -> AccountManager {
        let db = SqlitePool::connect(":memory:").await.unwrap();

        sqlx::query(
            r#"
            CREATE TABLE account (
                id TEXT PRIMARY KEY,
                full_name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                created_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        sqlx::query(
            r#"
            CREATE TABLE session (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                access_token TEXT NOT NULL,
                created_at DATETIME NOT NULL,
                expires_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        AccountManager::new(db, test_config())
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let manager = create_test_manager().await;

        let account = manager
            .register("Test User", "Test@Example.edu", "hunter22")
            .await
            .unwrap();
        // Email is normalized
        assert_eq!(account.email, "test@example.edu");
        assert_eq!(account.role, "user");

        let (logged_in, session) = manager
            .login("test@example.edu", "hunter22")
            .await
            .unwrap();
        assert_eq!(logged_in.id, account.id);
        assert!(!session.access_token.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let manager = create_test_manager().await;

        manager
            .register("A", "user@example.edu", "password1")
            .await
            .unwrap();

        let result = manager.register("B", "user@example.edu", "password2").await;
        assert!(matches!(result, Err(CmsError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let manager = create_test_manager().await;

        manager
            .register("A", "user@example.edu", "correct-horse")
            .await
            .unwrap();

        let result = manager.login("user@example.edu", "wrong-horse").await;
        assert!(matches!(result, Err(CmsError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_token_validation_round_trip() {
        let manager = create_test_manager().await;

        manager
            .register("A", "user@example.edu", "password1")
            .await
            .unwrap();
        let (_, session) = manager.login("user@example.edu", "password1").await.unwrap();

        let validated = manager
            .validate_access_token(&session.access_token)
            .await
            .unwrap();
        assert_eq!(validated.account_id, session.account_id);

        let result = manager.validate_access_token("not-a-token").await;
        assert!(matches!(result, Err(CmsError::Authentication(_))));
    }

    #[tokio::test]
    async fn test_cleanup_expired_sessions() {
        let manager = create_test_manager().await;

        manager
            .register("A", "user@example.edu", "password1")
            .await
            .unwrap();
        manager.login("user@example.edu", "password1").await.unwrap();

        // Nothing has expired yet
        assert_eq!(manager.cleanup_expired_sessions().await.unwrap(), 0);

        sqlx::query("UPDATE session SET expires_at = ?1")
            .bind(Utc::now() - Duration::hours(1))
            .execute(&manager.db)
            .await
            .unwrap();

        assert_eq!(manager.cleanup_expired_sessions().await.unwrap(), 1);
    }
}

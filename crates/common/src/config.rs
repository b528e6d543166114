use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 5)
    pub db_max_connections: u32,

    /// Delivery worker polling interval in milliseconds (default: 60000)
    pub worker_poll_interval_ms: u64,

    /// Maximum pending notifications processed per tick (default: 10)
    pub worker_batch_size: u32,

    /// VAPID public key, base64url-encoded uncompressed P-256 point
    pub vapid_public_key: Option<String>,

    /// VAPID private key: PKCS#8 PEM text, a path to a PEM file, or the raw
    /// base64url scalar `web-push` generates
    pub vapid_private_key: Option<String>,

    /// VAPID contact (`mailto:` or `https:` URI)
    pub vapid_subject: String,

    /// Web Push `TTL` header in seconds (default: 4 weeks)
    pub push_ttl_seconds: u64,

    /// Optional per-send HTTP timeout in milliseconds
    pub push_request_timeout_ms: Option<u64>,

    /// Listen address for the enqueue API
    pub api_bind_addr: String,

    /// HS256 secret for API bearer tokens
    pub api_jwt_secret: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let worker_batch_size: u32 = parse_or(&lookup, "WORKER_BATCH_SIZE", 10)?;
        if worker_batch_size == 0 {
            anyhow::bail!("WORKER_BATCH_SIZE must be at least 1");
        }
        let worker_poll_interval_ms: u64 = parse_or(&lookup, "WORKER_POLL_INTERVAL_MS", 60_000)?;
        if worker_poll_interval_ms == 0 {
            anyhow::bail!("WORKER_POLL_INTERVAL_MS must be at least 1");
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            worker_poll_interval_ms,
            worker_batch_size,
            vapid_public_key: lookup("VAPID_PUBLIC_KEY"),
            vapid_private_key: lookup("VAPID_PRIVATE_KEY_PEM")
                .or_else(|| lookup("VAPID_PRIVATE_KEY")),
            vapid_subject: lookup("VAPID_SUBJECT")
                .or_else(|| lookup("VAPID_EMAIL"))
                .unwrap_or_else(|| "mailto:admin@example.com".to_string()),
            push_ttl_seconds: parse_or(&lookup, "PUSH_TTL_SECONDS", 2_419_200)?,
            push_request_timeout_ms: lookup("PUSH_REQUEST_TIMEOUT_MS")
                .map(|raw| {
                    raw.parse().map_err(|_| {
                        anyhow::anyhow!("PUSH_REQUEST_TIMEOUT_MS must be a valid u64")
                    })
                })
                .transpose()?,
            api_bind_addr: lookup("API_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            api_jwt_secret: lookup("API_JWT_SECRET"),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.parse().map_err(|_| {
            anyhow::anyhow!(
                "{} must be a valid {}",
                key,
                std::any::type_name::<T>()
            )
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://x")]))
            .unwrap();
        assert_eq!(config.database_url, "postgres://x");
        assert_eq!(config.worker_poll_interval_ms, 60_000);
        assert_eq!(config.worker_batch_size, 10);
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.vapid_subject, "mailto:admin@example.com");
        assert_eq!(config.push_ttl_seconds, 2_419_200);
        assert_eq!(config.push_request_timeout_ms, None);
        assert_eq!(config.api_bind_addr, "0.0.0.0:3000");
        assert!(config.vapid_public_key.is_none());
    }

    #[test]
    fn test_missing_database_url() {
        let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("WORKER_POLL_INTERVAL_MS", "250"),
            ("WORKER_BATCH_SIZE", "3"),
            ("PUSH_REQUEST_TIMEOUT_MS", "5000"),
            ("VAPID_SUBJECT", "mailto:ops@agrosense.dev"),
        ]))
        .unwrap();
        assert_eq!(config.worker_poll_interval_ms, 250);
        assert_eq!(config.worker_batch_size, 3);
        assert_eq!(config.push_request_timeout_ms, Some(5000));
        assert_eq!(config.vapid_subject, "mailto:ops@agrosense.dev");
    }

    #[test]
    fn test_malformed_number_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("WORKER_POLL_INTERVAL_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("WORKER_POLL_INTERVAL_MS"));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("WORKER_BATCH_SIZE", "0"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("WORKER_BATCH_SIZE"));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("WORKER_POLL_INTERVAL_MS", "0"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("WORKER_POLL_INTERVAL_MS"));
    }

    #[test]
    fn test_web_push_variable_names_as_fallback() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("VAPID_PRIVATE_KEY", "raw-scalar"),
            ("VAPID_EMAIL", "mailto:farm@agrosense.dev"),
        ]))
        .unwrap();
        assert_eq!(config.vapid_private_key.as_deref(), Some("raw-scalar"));
        assert_eq!(config.vapid_subject, "mailto:farm@agrosense.dev");

        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("VAPID_PRIVATE_KEY_PEM", "/etc/agrosense/vapid.pem"),
            ("VAPID_PRIVATE_KEY", "raw-scalar"),
            ("VAPID_SUBJECT", "mailto:ops@agrosense.dev"),
            ("VAPID_EMAIL", "mailto:farm@agrosense.dev"),
        ]))
        .unwrap();
        assert_eq!(config.vapid_private_key.as_deref(), Some("/etc/agrosense/vapid.pem"));
        assert_eq!(config.vapid_subject, "mailto:ops@agrosense.dev");
    }
}

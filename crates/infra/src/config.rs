//! Process configuration, read from the environment.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use rust_decimal::Decimal;

use digiwallet_wallet::{CommissionPolicy, RecorderPolicy};

pub use digiwallet_observability::LogFormat;

const DEV_JWT_SECRET: &str = "dev-secret";

/// Seeded administrator, created at startup if missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// Postgres when set, in-memory stores otherwise.
    pub database_url: Option<String>,
    pub log_format: LogFormat,
    pub commission: CommissionPolicy,
    pub recorder: RecorderPolicy,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .context("BIND_ADDR must be a socket address")?;

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.to_string());

        let log_format = match var("LOG_FORMAT").as_deref() {
            None | Some("json") => LogFormat::Json,
            Some("pretty") => LogFormat::Pretty,
            Some(other) => anyhow::bail!("LOG_FORMAT must be 'json' or 'pretty', got '{other}'"),
        };

        let commission = match var("WALLET_COMMISSION_RATE") {
            None => CommissionPolicy::default(),
            Some(raw) => {
                let rate: Decimal =
                    raw.parse().context("WALLET_COMMISSION_RATE must be a decimal")?;
                CommissionPolicy::new(rate).context("WALLET_COMMISSION_RATE out of range")?
            }
        };

        let recorder = match var("WALLET_MIRROR_RECEIVE_ENTRY") {
            None => RecorderPolicy::default(),
            Some(raw) => RecorderPolicy {
                mirror_receive_entry: raw
                    .parse()
                    .context("WALLET_MIRROR_RECEIVE_ENTRY must be 'true' or 'false'")?,
            },
        };

        let bootstrap_admin = var("BOOTSTRAP_ADMIN_EMAIL").map(|email| BootstrapAdmin {
            name: var("BOOTSTRAP_ADMIN_NAME").unwrap_or_else(|| "Administrator".to_string()),
            email,
        });

        Ok(Self {
            bind_addr,
            jwt_secret,
            database_url: var("DATABASE_URL"),
            log_format,
            commission,
            recorder,
            bootstrap_admin,
        })
    }

    /// Whether `JWT_SECRET` was left unset.
    pub fn uses_dev_jwt_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:8080");
        assert!(cfg.uses_dev_jwt_secret());
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.commission.rate(), dec!(0.02));
        assert!(cfg.recorder.mirror_receive_entry);
        assert_eq!(cfg.bootstrap_admin, None);
    }

    #[test]
    fn overrides() {
        let cfg = config(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("LOG_FORMAT", "pretty"),
            ("WALLET_COMMISSION_RATE", "0.015"),
            ("WALLET_MIRROR_RECEIVE_ENTRY", "false"),
            ("BOOTSTRAP_ADMIN_EMAIL", "root@example.com"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert_eq!(cfg.commission.rate(), dec!(0.015));
        assert!(!cfg.recorder.mirror_receive_entry);
        assert_eq!(cfg.bootstrap_admin.unwrap().name, "Administrator");
    }

    #[test]
    fn rejects_out_of_range_commission() {
        assert!(config(&[("WALLET_COMMISSION_RATE", "1.5")]).is_err());
        assert!(config(&[("LOG_FORMAT", "xml")]).is_err());
    }
}

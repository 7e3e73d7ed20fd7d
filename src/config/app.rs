//! # Security configuration loader
//!
//! Top-level configuration for the authentication stack.
//!
//! Automatically loads `.env` files outside production. It checks for a
//! custom `DOTENV_FILE` path first, then falls back to `.env.{APP_ENV}` or
//! `.env`.
//!
//! # Environment Variables
//! | Variable | Description | Default |
//! |-----------|-------------|----------|
//! | `APP_ENV` | Current environment (`development`, `production`, etc.) | `"development"` |
//! | `DOTENV_FILE` | Optional path to a custom dotenv file | *none* |
//! | `AUTHC_STRATEGY` | Multi-realm policy: `all`, `at_least_one`, `first` | `at_least_one` |
//! | `REMEMBER_ME_*` | See [`RememberMeConfig`] | |
//!
//! # Example
//! ```rust,no_run
//! use wzs_auth::config::app::SecurityConfig;
//!
//! let cfg = SecurityConfig::from_env();
//! println!("authenticating with the `{}` strategy", cfg.strategy);
//! ```

use std::env;
use std::sync::Arc;

use tracing::warn;

use crate::auth::coordinator::AuthenticationCoordinator;
use crate::auth::realm::Realm;
use crate::auth::strategy::StrategyKind;
use crate::config::env::read_string_from;
use crate::config::remember_me::RememberMeConfig;
use crate::error::KeyError;
use crate::subject::manager::SecurityManager;

#[derive(Clone, Debug)]
pub struct SecurityConfig {
    pub app_env: String,
    /// Policy applied when more than one realm is configured.
    pub strategy: StrategyKind,
    pub remember_me: RememberMeConfig,
}

impl SecurityConfig {
    /// Loads `.env` files as described above, then reads the environment.
    pub fn from_env() -> Self {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".into());

        if app_env != "production" {
            if let Ok(path) = env::var("DOTENV_FILE") {
                let _ = dotenvy::from_filename(path);
            } else {
                let candidate = format!(".env.{}", app_env);
                dotenvy::from_filename(&candidate)
                    .or_else(|_| dotenvy::dotenv())
                    .ok();
            }
        }

        Self::from_env_with(|k| env::var(k).ok())
    }

    /// Reads configuration through a custom key provider. No dotenv loading.
    pub fn from_env_with<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let strategy = match read_string_from(&get, "AUTHC_STRATEGY") {
            Some(name) => name.parse().unwrap_or_else(|err| {
                warn!(error = %err, "falling back to the default authentication strategy");
                StrategyKind::default()
            }),
            None => StrategyKind::default(),
        };

        Self {
            app_env: read_string_from(&get, "APP_ENV").unwrap_or_else(|| "development".into()),
            strategy,
            remember_me: RememberMeConfig::from_env_with(&get),
        }
    }

    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// Coordinator over `realms` using the configured strategy.
    pub fn coordinator(&self, realms: Vec<Arc<dyn Realm>>) -> AuthenticationCoordinator {
        AuthenticationCoordinator::new(realms).with_strategy(self.strategy.build())
    }

    /// Security manager with the configured strategy and remember-me keys.
    ///
    /// Session factory and authorizer are left to the caller.
    pub fn security_manager(
        &self,
        realms: Vec<Arc<dyn Realm>>,
    ) -> Result<SecurityManager, KeyError> {
        let pipeline = self.remember_me.build_pipeline()?;
        Ok(SecurityManager::new(Arc::new(self.coordinator(realms))).with_remember_me(pipeline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::coordinator::Authenticator;
    use crate::auth::identity::IdentityRecord;
    use crate::auth::principal::PrincipalSet;
    use crate::auth::token::{AuthenticationToken, UsernamePasswordToken};
    use crate::error::AuthenticationError;

    struct Fixed(&'static str, bool);

    impl Realm for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn supports(&self, _token: &dyn AuthenticationToken) -> bool {
            true
        }

        fn identity(
            &self,
            token: &dyn AuthenticationToken,
        ) -> anyhow::Result<Option<IdentityRecord>> {
            Ok(self
                .1
                .then(|| IdentityRecord::new(PrincipalSet::single(self.0, token.principal()))))
        }
    }

    fn realms() -> Vec<Arc<dyn Realm>> {
        vec![Arc::new(Fixed("a", true)), Arc::new(Fixed("b", false))]
    }

    #[test]
    fn strategy_defaults_and_parses() {
        assert_eq!(
            SecurityConfig::from_env_with(|_| None).strategy,
            StrategyKind::RequireAtLeastOne
        );
        assert_eq!(
            SecurityConfig::from_env_with(|k| (k == "AUTHC_STRATEGY").then(|| "all".into()))
                .strategy,
            StrategyKind::RequireAll
        );
        assert_eq!(
            SecurityConfig::from_env_with(|k| (k == "AUTHC_STRATEGY").then(|| "bogus".into()))
                .strategy,
            StrategyKind::RequireAtLeastOne
        );
    }

    #[test]
    fn coordinator_uses_configured_strategy() {
        let token = UsernamePasswordToken::new("alice", "pw");

        let lenient = SecurityConfig::from_env_with(|_| None);
        assert!(lenient.coordinator(realms()).authenticate(&token).is_ok());

        let strict =
            SecurityConfig::from_env_with(|k| (k == "AUTHC_STRATEGY").then(|| "all".into()));
        assert!(matches!(
            strict.coordinator(realms()).authenticate(&token),
            Err(AuthenticationError::UnknownIdentity { .. })
        ));
    }

    #[test]
    fn security_manager_is_wired_with_remember_me() {
        let cfg = SecurityConfig::from_env_with(|_| None);
        let manager = cfg.security_manager(realms()).unwrap();
        assert_eq!(manager.remember_me().map(|p| p.name()), Some("rememberMe"));
    }

    #[test]
    fn from_env_reads_strategy_from_process_environment() {
        temp_env::with_vars(
            vec![
                ("APP_ENV", Some("production")),
                ("AUTHC_STRATEGY", Some("first")),
            ],
            || {
                let cfg = SecurityConfig::from_env();
                assert!(cfg.is_production());
                assert_eq!(cfg.strategy, StrategyKind::FirstSuccessWins);
            },
        );
    }
}

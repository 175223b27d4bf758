use anyhow::{Context, Result};

use super::config_model::{BackendServer, Database, DotEnvyConfig, Stripe, Supabase};
use crates::payments::stripe_client::DEFAULT_API_BASE;

pub const DEFAULT_STRIPE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    load_from(|key| std::env::var(key).ok())
}

/// Builds the config from any key lookup so it can be exercised without touching the
/// process environment.
pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<DotEnvyConfig> {
    let required = |key: &str| -> Result<String> {
        lookup(key)
            .filter(|value| !value.trim().is_empty())
            .with_context(|| format!("{key} is invalid"))
    };
    let optional = |key: &str| -> Option<String> {
        lookup(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let backend_server = BackendServer {
        port: required("SERVER_PORT_BACKEND")?
            .parse()
            .context("SERVER_PORT_BACKEND is not a port")?,
        body_limit: required("SERVER_BODY_LIMIT")?
            .parse()
            .context("SERVER_BODY_LIMIT is not a number")?,
        timeout: required("SERVER_TIMEOUT")?
            .parse()
            .context("SERVER_TIMEOUT is not a number")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_connections: match optional("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse()
                .context("DATABASE_MAX_CONNECTIONS is not a number")?,
            None => DEFAULT_DATABASE_MAX_CONNECTIONS,
        },
    };

    let supabase = Supabase {
        jwt_secret: required("SUPABASE_JWT_SECRET")?,
    };

    let timeout_secs = match optional("STRIPE_TIMEOUT_SECS") {
        Some(raw) => raw
            .parse()
            .context("STRIPE_TIMEOUT_SECS is not a number")?,
        None => DEFAULT_STRIPE_TIMEOUT_SECS,
    };

    let stripe = Stripe {
        secret_key: required("STRIPE_SECRET_KEY")?,
        webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
        price_pro: optional("STRIPE_PRICE_PRO"),
        price_creator_plus: optional("STRIPE_PRICE_CREATOR_PLUS"),
        api_base: optional("STRIPE_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        timeout_secs,
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        supabase,
        stripe,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("SERVER_PORT_BACKEND", "8080"),
            ("SERVER_BODY_LIMIT", "10"),
            ("SERVER_TIMEOUT", "30"),
            ("DATABASE_URL", "postgres://localhost:5432/db"),
            ("SUPABASE_JWT_SECRET", "supersecretjwtsecretforunittesting123"),
            ("STRIPE_SECRET_KEY", "sk_test_123"),
            ("STRIPE_WEBHOOK_SECRET", "whsec_123"),
            ("STRIPE_PRICE_PRO", "price_pro"),
        ])
    }

    fn lookup<'a>(
        env: &'a HashMap<&'static str, &'static str>,
    ) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| env.get(key).map(|value| value.to_string())
    }

    #[test]
    fn loads_required_values_and_defaults() {
        let env = base_env();
        let config = load_from(lookup(&env)).unwrap();

        assert_eq!(config.backend_server.port, 8080);
        assert_eq!(config.backend_server.body_limit, 10);
        assert_eq!(config.stripe.price_pro.as_deref(), Some("price_pro"));
        assert_eq!(config.stripe.price_creator_plus, None);
        assert_eq!(config.stripe.timeout_secs, DEFAULT_STRIPE_TIMEOUT_SECS);
        assert_eq!(config.stripe.api_base, DEFAULT_API_BASE);
        assert_eq!(
            config.database.max_connections,
            DEFAULT_DATABASE_MAX_CONNECTIONS
        );
    }

    #[test]
    fn missing_required_key_is_an_error() {
        let mut env = base_env();
        env.remove("STRIPE_WEBHOOK_SECRET");

        let err = load_from(lookup(&env)).unwrap_err();
        assert!(err.to_string().contains("STRIPE_WEBHOOK_SECRET"));
    }

    #[test]
    fn blank_optional_price_is_treated_as_absent() {
        let mut env = base_env();
        env.insert("STRIPE_PRICE_PRO", "   ");
        env.insert("STRIPE_TIMEOUT_SECS", "3");

        let config = load_from(lookup(&env)).unwrap();
        assert_eq!(config.stripe.price_pro, None);
        assert_eq!(config.stripe.timeout_secs, 3);
    }

    #[test]
    fn malformed_port_is_an_error() {
        let mut env = base_env();
        env.insert("SERVER_PORT_BACKEND", "eighty");

        assert!(load_from(lookup(&env)).is_err());
    }
}

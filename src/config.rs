use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub loyalty: LoyaltyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64, // seconds
}

/// Tunables of the points and rewards program.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoyaltyConfig {
    /// Order value (in cents) that earns one base point.
    pub points_divisor_cents: i64,
    pub coupon_code_length: usize,
    pub coupon_mint_attempts: u32,
    pub transactions_default_limit: u64,
    pub transactions_max_limit: u64,
    pub dashboard_transactions: u64,
    /// Offset from UTC used to decide "today" for day-of-week promotions.
    pub utc_offset_minutes: i32,
    /// When false, a failed coupon usage update is logged and the redemption stays used.
    pub atomic_redemption_use: bool,
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        Self {
            points_divisor_cents: 1000,
            coupon_code_length: 8,
            coupon_mint_attempts: 5,
            transactions_default_limit: 50,
            transactions_max_limit: 200,
            dashboard_transactions: 20,
            utc_offset_minutes: 0,
            atomic_redemption_use: true,
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // A missing file means the whole config comes from the environment.
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => toml::from_str(&config_str)
                .map_err(|e| format!("failed to parse config file: {e}"))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                let database_url = get_env("DATABASE_URL")
                    .ok_or("DATABASE_URL is not set and no config.toml was found")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                    },
                    loyalty: LoyaltyConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("cannot read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.jwt.access_token_expires_in = n;
        }

        // Loyalty
        if let Ok(v) = env::var("LOYALTY_POINTS_DIVISOR_CENTS")
            && let Ok(n) = v.parse()
        {
            self.loyalty.points_divisor_cents = n;
        }
        if let Ok(v) = env::var("LOYALTY_COUPON_CODE_LENGTH")
            && let Ok(n) = v.parse()
        {
            self.loyalty.coupon_code_length = n;
        }
        if let Ok(v) = env::var("LOYALTY_COUPON_MINT_ATTEMPTS")
            && let Ok(n) = v.parse()
        {
            self.loyalty.coupon_mint_attempts = n;
        }
        if let Ok(v) = env::var("LOYALTY_UTC_OFFSET_MINUTES")
            && let Ok(n) = v.parse()
        {
            self.loyalty.utc_offset_minutes = n;
        }
        if let Ok(v) = env::var("LOYALTY_ATOMIC_REDEMPTION_USE")
            && let Ok(b) = v.parse()
        {
            self.loyalty.atomic_redemption_use = b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loyalty_section_is_optional() {
        let raw = r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [database]
            url = "postgres://localhost/loyalty"
            max_connections = 5

            [jwt]
            secret = "s3cret"
            access_token_expires_in = 60
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.loyalty.points_divisor_cents, 1000);
        assert_eq!(config.loyalty.coupon_code_length, 8);
        assert_eq!(config.loyalty.coupon_mint_attempts, 5);
        assert!(config.loyalty.atomic_redemption_use);
    }

    #[test]
    fn partial_loyalty_section_keeps_defaults() {
        let raw = r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [database]
            url = "postgres://localhost/loyalty"
            max_connections = 5

            [jwt]
            secret = "s3cret"
            access_token_expires_in = 60

            [loyalty]
            utc_offset_minutes = 480
            atomic_redemption_use = false
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.loyalty.utc_offset_minutes, 480);
        assert!(!config.loyalty.atomic_redemption_use);
        assert_eq!(config.loyalty.transactions_default_limit, 50);
    }
}

//! Addressable configuration keys for `config get` and `config set`.

use std::fmt;
use std::str::FromStr;

use super::{ConfigError, EngineConfig};
use crate::healpix::MAX_ORDER;

/// Addressable configuration settings, named `section.key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    CacheBudgetMb,
    CacheErrorBackoffSecs,
    LoaderMaxConcurrent,
    LoaderTimeoutSecs,
    LoaderUserAgent,
    RenderSplitOrder,
    RenderTileWidth,
}

impl ConfigKey {
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::CacheBudgetMb,
            ConfigKey::CacheErrorBackoffSecs,
            ConfigKey::LoaderMaxConcurrent,
            ConfigKey::LoaderTimeoutSecs,
            ConfigKey::LoaderUserAgent,
            ConfigKey::RenderSplitOrder,
            ConfigKey::RenderTileWidth,
        ]
    }

    pub fn section(&self) -> &'static str {
        match self {
            ConfigKey::CacheBudgetMb | ConfigKey::CacheErrorBackoffSecs => "cache",
            ConfigKey::LoaderMaxConcurrent
            | ConfigKey::LoaderTimeoutSecs
            | ConfigKey::LoaderUserAgent => "loader",
            ConfigKey::RenderSplitOrder | ConfigKey::RenderTileWidth => "render",
        }
    }

    pub fn key_name(&self) -> &'static str {
        match self {
            ConfigKey::CacheBudgetMb => "budget_mb",
            ConfigKey::CacheErrorBackoffSecs => "error_backoff_secs",
            ConfigKey::LoaderMaxConcurrent => "max_concurrent",
            ConfigKey::LoaderTimeoutSecs => "timeout_secs",
            ConfigKey::LoaderUserAgent => "user_agent",
            ConfigKey::RenderSplitOrder => "split_order",
            ConfigKey::RenderTileWidth => "tile_width",
        }
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    pub fn get(&self, config: &EngineConfig) -> String {
        match self {
            ConfigKey::CacheBudgetMb => config.cache.budget_mb.to_string(),
            ConfigKey::CacheErrorBackoffSecs => config.cache.error_backoff_secs.to_string(),
            ConfigKey::LoaderMaxConcurrent => config.loader.max_concurrent.to_string(),
            ConfigKey::LoaderTimeoutSecs => config.loader.timeout_secs.to_string(),
            ConfigKey::LoaderUserAgent => config.loader.user_agent.clone(),
            ConfigKey::RenderSplitOrder => config.render.split_order.to_string(),
            ConfigKey::RenderTileWidth => config.render.tile_width.to_string(),
        }
    }

    /// Parse and store `value`, rejecting values out of range.
    pub fn set(&self, config: &mut EngineConfig, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match self {
            ConfigKey::CacheBudgetMb => config.cache.budget_mb = self.parse_positive(value)?,
            ConfigKey::CacheErrorBackoffSecs => {
                config.cache.error_backoff_secs = self.parse(value)?
            }
            ConfigKey::LoaderMaxConcurrent => {
                config.loader.max_concurrent = self.parse_positive(value)?
            }
            ConfigKey::LoaderTimeoutSecs => {
                config.loader.timeout_secs = self.parse_positive(value)?
            }
            ConfigKey::LoaderUserAgent => {
                if value.is_empty() {
                    return Err(self.invalid(value, "must not be empty"));
                }
                config.loader.user_agent = value.to_string();
            }
            ConfigKey::RenderSplitOrder => {
                let order: u8 = self.parse(value)?;
                if order > MAX_ORDER {
                    return Err(self.invalid(value, &format!("must be at most {}", MAX_ORDER)));
                }
                config.render.split_order = order;
            }
            ConfigKey::RenderTileWidth => config.render.tile_width = self.parse_positive(value)?,
        }
        Ok(())
    }

    fn parse<N: FromStr>(&self, value: &str) -> Result<N, ConfigError> {
        value
            .parse()
            .map_err(|_| self.invalid(value, "expected a non-negative integer"))
    }

    fn parse_positive<N>(&self, value: &str) -> Result<N, ConfigError>
    where
        N: FromStr + PartialOrd + Default,
    {
        let n: N = self.parse(value)?;
        if n <= N::default() {
            return Err(self.invalid(value, "must be greater than zero"));
        }
        Ok(n)
    }

    fn invalid(&self, value: &str, reason: &str) -> ConfigError {
        ConfigError::InvalidValue {
            section: self.section().to_string(),
            key: self.key_name().to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == s)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_names() {
        assert_eq!(
            "cache.budget_mb".parse::<ConfigKey>().unwrap(),
            ConfigKey::CacheBudgetMb
        );
        assert!(matches!(
            "cache.nope".parse::<ConfigKey>(),
            Err(ConfigError::UnknownKey(_))
        ));
        for key in ConfigKey::all() {
            assert_eq!(key.name().parse::<ConfigKey>().unwrap(), *key);
        }
    }

    #[test]
    fn test_set_validates() {
        let mut config = EngineConfig::default();
        ConfigKey::LoaderMaxConcurrent.set(&mut config, " 4 ").unwrap();
        assert_eq!(config.loader.max_concurrent, 4);
        assert_eq!(ConfigKey::LoaderMaxConcurrent.get(&config), "4");

        assert!(ConfigKey::LoaderMaxConcurrent.set(&mut config, "0").is_err());
        assert!(ConfigKey::RenderSplitOrder.set(&mut config, "30").is_err());
        assert!(ConfigKey::LoaderUserAgent.set(&mut config, "").is_err());
        ConfigKey::CacheErrorBackoffSecs.set(&mut config, "0").unwrap();
        assert_eq!(config.cache.error_backoff_secs, 0);
    }
}

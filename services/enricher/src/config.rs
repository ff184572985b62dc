//! Enricher configuration: HTTP client settings and provider priority lists.
//!
//! Loaded from an optional YAML file. `${VAR}` and `${VAR:-default}` are
//! substituted from the environment before parsing.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use enrich_common::{EnrichError, EnrichResult};
use providers::{HttpConfig, ProviderKind};
use reconciler::DomainKind;

/// Provider priority order for one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    pub providers: Vec<String>,
}

impl DomainConfig {
    pub fn defaults_for(domain: DomainKind) -> Self {
        Self {
            providers: ProviderKind::defaults_for(domain)
                .into_iter()
                .map(|k| k.as_str().to_string())
                .collect(),
        }
    }
}

fn default_weather() -> DomainConfig {
    DomainConfig::defaults_for(DomainKind::Weather)
}

fn default_marine() -> DomainConfig {
    DomainConfig::defaults_for(DomainKind::Marine)
}

fn default_soil() -> DomainConfig {
    DomainConfig::defaults_for(DomainKind::Soil)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnricherConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default = "default_weather")]
    pub weather: DomainConfig,
    #[serde(default = "default_marine")]
    pub marine: DomainConfig,
    #[serde(default = "default_soil")]
    pub soil: DomainConfig,
}

impl Default for EnricherConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            weather: default_weather(),
            marine: default_marine(),
            soil: default_soil(),
        }
    }
}

impl EnricherConfig {
    /// Load and validate a YAML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config file: {:?}", path))
    }

    /// Defaults when no file is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        // An empty document means "all defaults".
        let config: EnricherConfig = if expanded.trim().is_empty() {
            EnricherConfig::default()
        } else {
            serde_yaml::from_str(&expanded).context("Failed to parse YAML")?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn domain(&self, domain: DomainKind) -> &DomainConfig {
        match domain {
            DomainKind::Weather => &self.weather,
            DomainKind::Marine => &self.marine,
            DomainKind::Soil => &self.soil,
        }
    }

    /// Every provider id must name a known provider of the domain it is
    /// listed under, at most once.
    pub fn validate(&self) -> EnrichResult<()> {
        for domain in [DomainKind::Weather, DomainKind::Marine, DomainKind::Soil] {
            let mut seen = Vec::new();
            for id in &self.domain(domain).providers {
                let kind: ProviderKind = id
                    .parse()
                    .map_err(|_| EnrichError::Config(format!("unknown {} provider: {}", domain, id)))?;
                if kind.domain() != domain {
                    return Err(EnrichError::Config(format!(
                        "provider {} serves {}, not {}",
                        kind,
                        kind.domain(),
                        domain
                    )));
                }
                if seen.contains(&kind) {
                    return Err(EnrichError::Config(format!("provider {} listed twice for {}", kind, domain)));
                }
                seen.push(kind);
            }
        }
        if self.http.timeout_secs == 0 {
            return Err(EnrichError::Config("http.timeout_secs must be greater than 0".into()));
        }
        Ok(())
    }

    /// Normalized provider ids for a domain, in priority order.
    pub fn provider_order(&self, domain: DomainKind) -> EnrichResult<Vec<ProviderKind>> {
        self.domain(domain)
            .providers
            .iter()
            .map(|id| id.parse::<ProviderKind>())
            .collect()
    }
}

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next();

        let mut expr = String::new();
        loop {
            match chars.next() {
                Some('}') => break,
                Some(c) => expr.push(c),
                None => anyhow::bail!("Unclosed variable substitution: ${{{}", expr),
            }
        }
        result.push_str(&resolve_var(&expr)?);
    }

    Ok(result)
}

fn resolve_var(expr: &str) -> Result<String> {
    match expr.split_once(":-") {
        Some((name, default)) => match std::env::var(name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        },
        None => std::env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr)),
    }
}

use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::config::{read_json, Config, ConfigError};
use crate::evolution::prompt;

/// Accepts either a JSON number or a numeric string; older config files
/// quoted their numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Number(f64),
    Text(String),
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Lenient>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Lenient::Number(n)) => Ok(Some(n)),
        Some(Lenient::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    #[serde(default, deserialize_with = "lenient_f64")]
    novelty_threshold: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    retry: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    span: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPrompts {
    generator: Option<String>,
    scorer: Option<String>,
    harder: Option<String>,
    simpler: Option<String>,
}

/// Tunables of the adaptive loop.
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionSettings {
    /// Minimum nearest-neighbor distance a new question must exceed.
    pub novelty_threshold: f64,
    /// Maximum generation attempts per cycle.
    pub retry: u32,
    /// EMA window; multiplier is `2 / (span + 1)`.
    pub span: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    pub generator: String,
    /// Placeholders: `{question}`, `{answer}`.
    pub scorer: String,
    /// Placeholder: `{question}`.
    pub harder: String,
    /// Placeholder: `{question}`.
    pub simpler: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvogenConfig {
    pub settings: EvolutionSettings,
    pub prompts: PromptSet,
}

impl EvogenConfig {
    pub fn load(config: &Config) -> Result<Self, ConfigError> {
        Self::load_from(&config.evogen_config_path, &config.prompt_config_path)
    }

    pub fn load_from(settings_path: &Path, prompts_path: &Path) -> Result<Self, ConfigError> {
        let settings = EvolutionSettings::from_raw(read_json(settings_path)?)?;
        let prompts = PromptSet::from_raw(read_json(prompts_path)?)?;
        tracing::info!(
            novelty_threshold = settings.novelty_threshold,
            retry = settings.retry,
            span = settings.span,
            "Loaded evogen config"
        );
        Ok(Self { settings, prompts })
    }
}

fn positive_count(name: &str, value: Option<f64>) -> Result<u32, ConfigError> {
    let value = value.ok_or_else(|| ConfigError::missing(name))?;
    if !value.is_finite() || value < 1.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return Err(ConfigError::Invalid(format!(
            "{name} must be an integer >= 1, got {value}"
        )));
    }
    Ok(value as u32)
}

impl EvolutionSettings {
    fn from_raw(raw: RawSettings) -> Result<Self, ConfigError> {
        let settings = Self {
            novelty_threshold: raw
                .novelty_threshold
                .ok_or_else(|| ConfigError::missing("novelty_threshold"))?,
            retry: positive_count("retry", raw.retry)?,
            span: positive_count("span", raw.span)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.novelty_threshold.is_finite() {
            return Err(ConfigError::Invalid(
                "novelty_threshold must be finite".to_string(),
            ));
        }
        if self.retry == 0 {
            return Err(ConfigError::Invalid("retry must be >= 1".to_string()));
        }
        if self.span == 0 {
            return Err(ConfigError::Invalid("span must be >= 1".to_string()));
        }
        Ok(())
    }
}

impl PromptSet {
    fn from_raw(raw: RawPrompts) -> Result<Self, ConfigError> {
        let prompts = Self {
            generator: raw.generator.ok_or_else(|| ConfigError::missing("generator"))?,
            scorer: raw.scorer.ok_or_else(|| ConfigError::missing("scorer"))?,
            harder: raw.harder.ok_or_else(|| ConfigError::missing("harder"))?,
            simpler: raw.simpler.ok_or_else(|| ConfigError::missing("simpler"))?,
        };
        prompts.validate()?;
        Ok(prompts)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&str, &str, &[&str]); 4] = [
            ("generator", self.generator.as_str(), &[][..]),
            ("scorer", self.scorer.as_str(), &["question", "answer"][..]),
            ("harder", self.harder.as_str(), &["question"][..]),
            ("simpler", self.simpler.as_str(), &["question"][..]),
        ];
        for (name, template, placeholders) in checks {
            prompt::check(template, placeholders)
                .map_err(|e| ConfigError::Invalid(format!("prompt '{name}': {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).expect("write");
        path
    }

    const PROMPTS: &str = r#"{
        "generator": "Write one question.",
        "scorer": "Rate {answer} to {question}",
        "harder": "Harder: {question}",
        "simpler": "Simpler: {question}"
    }"#;

    #[test]
    fn loads_numbers_and_quoted_numbers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = write(
            dir.path(),
            "evogen.json",
            r#"{"novelty_threshold": "0.3", "retry": 5, "span": "10"}"#,
        );
        let prompts = write(dir.path(), "prompts.json", PROMPTS);

        let cfg = EvogenConfig::load_from(&settings, &prompts).expect("load");
        assert_eq!(cfg.settings.novelty_threshold, 0.3);
        assert_eq!(cfg.settings.retry, 5);
        assert_eq!(cfg.settings.span, 10);
        assert_eq!(cfg.prompts.harder, "Harder: {question}");
    }

    #[test]
    fn missing_key_is_configuration_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = write(dir.path(), "evogen.json", r#"{"novelty_threshold": 0.3, "retry": 5}"#);
        let prompts = write(dir.path(), "prompts.json", PROMPTS);

        let err = EvogenConfig::load_from(&settings, &prompts).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { ref key } if key == "span"));
    }

    #[test]
    fn missing_prompt_is_configuration_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = write(
            dir.path(),
            "evogen.json",
            r#"{"novelty_threshold": 0.3, "retry": 1, "span": 1}"#,
        );
        let prompts = write(dir.path(), "prompts.json", r#"{"generator": "g"}"#);

        let err = EvogenConfig::load_from(&settings, &prompts).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { ref key } if key == "scorer"));
    }

    #[test]
    fn zero_retry_and_fractional_span_are_invalid() {
        let zero_retry = RawSettings {
            novelty_threshold: Some(0.1),
            retry: Some(0.0),
            span: Some(3.0),
        };
        assert!(matches!(
            EvolutionSettings::from_raw(zero_retry),
            Err(ConfigError::Invalid(_))
        ));

        let fractional_span = RawSettings {
            novelty_threshold: Some(0.1),
            retry: Some(2.0),
            span: Some(2.5),
        };
        assert!(matches!(
            EvolutionSettings::from_raw(fractional_span),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn scorer_with_unknown_placeholder_is_rejected() {
        let raw = RawPrompts {
            generator: Some("g".to_string()),
            scorer: Some("{question} {response}".to_string()),
            harder: Some("{question}".to_string()),
            simpler: Some("{question}".to_string()),
        };
        let err = PromptSet::from_raw(raw).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("scorer")));
    }
}

//! Configuration loader.
//!
//! Sources, lowest precedence first: built-in defaults, a config file, and
//! `FETE_*` environment variables.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::schema::PlannerConfig;

/// File names searched, in order, when no path is given.
pub const CONFIG_CANDIDATES: [&str; 3] = ["fete.json", "fete.yml", "fete.yaml"];

/// Environment variable overriding the provider.
pub const PROVIDER_ENV: &str = "FETE_PROVIDER";
/// Environment variable overriding the model.
pub const MODEL_ENV: &str = "FETE_MODEL";
/// Environment variable overriding the base URL.
pub const BASE_URL_ENV: &str = "FETE_BASE_URL";
/// Environment variable overriding the timeout in seconds.
pub const TIMEOUT_ENV: &str = "FETE_TIMEOUT_SECS";
/// Environment variable overriding the log filter.
pub const LOG_ENV: &str = "FETE_LOG";

/// Loads configuration from `path`, or from the first [`CONFIG_CANDIDATES`]
/// file in the working directory, or from defaults, then applies environment
/// overrides.
///
/// # Errors
///
/// Returns an error if an explicit or discovered file cannot be read or parsed,
/// or an override holds an invalid value.
pub fn load_config(path: Option<&Path>) -> Result<PlannerConfig> {
    let config = match path
        .map(Path::to_path_buf)
        .or_else(|| find_config_file(Path::new(".")))
    {
        Some(path) => load_config_from_file(&path)?,
        None => {
            debug!("no configuration file found, using defaults");
            PlannerConfig::default()
        }
    };

    apply_env_overrides(config, |key| env::var(key).ok())
}

/// Reads a configuration file. `.json` files are parsed as JSON, anything else as YAML.
///
/// `${VAR}` references in `apiKey` and `baseUrl` are expanded from the environment.
///
/// # Errors
///
/// Returns an error when the file cannot be read or does not parse, or when
/// `apiKey` or `baseUrl` references a variable that is not set.
pub fn load_config_from_file(path: &Path) -> Result<PlannerConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    let mut config: PlannerConfig = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse JSON config {}", path.display()))?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse YAML config {}", path.display()))?
    };

    let lookup = |key: &str| env::var(key).ok();
    config.backend.api_key = config
        .backend
        .api_key
        .map(|value| expand_field("apiKey", &value, lookup))
        .transpose()
        .with_context(|| format!("invalid config file {}", path.display()))?;
    config.backend.base_url = config
        .backend
        .base_url
        .map(|value| expand_field("baseUrl", &value, lookup))
        .transpose()
        .with_context(|| format!("invalid config file {}", path.display()))?;

    debug!(path = %path.display(), "configuration file loaded");
    Ok(config)
}

/// Returns the first [`CONFIG_CANDIDATES`] file present in `dir`.
#[must_use]
pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
    CONFIG_CANDIDATES
        .iter()
        .map(|candidate| dir.join(candidate))
        .find(|path| path.is_file())
}

/// Applies `FETE_*` overrides read through `lookup`, then validates the result.
///
/// # Errors
///
/// Returns an error for an unknown provider, a non-numeric timeout, or a
/// configuration that fails [`PlannerConfig::validate`].
pub fn apply_env_overrides<F>(mut config: PlannerConfig, lookup: F) -> Result<PlannerConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(provider) = get(PROVIDER_ENV) {
        config.backend.provider = provider
            .parse()
            .with_context(|| format!("invalid {PROVIDER_ENV}"))?;
    }
    if let Some(model) = get(MODEL_ENV) {
        config.backend.model = Some(model);
    }
    if let Some(base_url) = get(BASE_URL_ENV) {
        config.backend.base_url = Some(base_url);
    }
    if let Some(timeout) = get(TIMEOUT_ENV) {
        config.backend.timeout_secs = timeout
            .trim()
            .parse()
            .with_context(|| format!("invalid {TIMEOUT_ENV} `{timeout}`"))?;
    }
    if let Some(filter) = get(LOG_ENV) {
        config.telemetry.filter = filter;
    }

    config.validate()?;
    Ok(config)
}

/// Expands `field`'s `${VAR}` references and rejects any left unresolved.
fn expand_field<F>(field: &str, value: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let expanded = expand_env_string(value, &lookup);
    let unresolved = value
        .split("${")
        .skip(1)
        .filter_map(|rest| rest.split_once('}').map(|(name, _)| name))
        .find(|name| lookup(name).is_none());
    match unresolved {
        Some(name) => bail!("`{field}` references `${{{name}}}`, which is not set"),
        None => Ok(expanded),
    }
}

/// Expands `${VAR}` references; unknown variables are left as written.
fn expand_env_string<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            result.push_str(&rest[start..]);
            return result;
        };
        let name = &after[..end];
        match lookup(name) {
            Some(value) => result.push_str(&value),
            None => result.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;
    use crate::schema::Provider;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_yaml() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "fete.yaml",
            "backend:\n  provider: ollama\n  model: llama3.1\n  timeoutSecs: 120\ntelemetry:\n  filter: debug\n",
        );

        let config = load_config_from_file(&path).unwrap();
        assert_eq!(config.backend.provider, Provider::Ollama);
        assert_eq!(config.backend.model(), "llama3.1");
        assert_eq!(config.backend.timeout_secs, 120);
        assert_eq!(config.telemetry.filter, "debug");
    }

    #[test]
    fn loads_json_with_defaults_for_missing_sections() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "fete.json", r#"{"backend": {"provider": "openai"}}"#);

        let config = load_config_from_file(&path).unwrap();
        assert_eq!(config.backend.provider, Provider::OpenAi);
        assert_eq!(config.backend.model(), "gpt-4o-mini");
        assert_eq!(config.telemetry, fete_telemetry::TelemetryConfig::default());
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "fete.json", "{ not json");
        let err = load_config_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("fete.json"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.yml");
        assert!(load_config(Some(&missing)).is_err());
    }

    #[test]
    fn discovery_prefers_json() {
        let dir = TempDir::new().unwrap();
        write(&dir, "fete.yaml", "backend: {}\n");
        write(&dir, "fete.json", "{}");
        assert_eq!(
            find_config_file(dir.path()).unwrap(),
            dir.path().join("fete.json")
        );

        let empty = TempDir::new().unwrap();
        assert!(find_config_file(empty.path()).is_none());
    }

    #[test]
    fn environment_overrides_file_values() {
        let config = apply_env_overrides(
            PlannerConfig::default(),
            vars(&[
                (PROVIDER_ENV, "ollama"),
                (MODEL_ENV, "mistral"),
                (BASE_URL_ENV, "http://gpu-box:11434"),
                (TIMEOUT_ENV, "15"),
                (LOG_ENV, "fete_kernel=debug"),
            ]),
        )
        .unwrap();

        assert_eq!(config.backend.provider, Provider::Ollama);
        assert_eq!(config.backend.model(), "mistral");
        assert_eq!(config.backend.base_url.as_deref(), Some("http://gpu-box:11434"));
        assert_eq!(config.backend.timeout_secs, 15);
        assert_eq!(config.telemetry.filter, "fete_kernel=debug");
    }

    #[test]
    fn invalid_overrides_are_rejected() {
        assert!(
            apply_env_overrides(PlannerConfig::default(), vars(&[(TIMEOUT_ENV, "soon")])).is_err()
        );
        assert!(
            apply_env_overrides(PlannerConfig::default(), vars(&[(TIMEOUT_ENV, "0")])).is_err()
        );
        assert!(
            apply_env_overrides(PlannerConfig::default(), vars(&[(PROVIDER_ENV, "bard")])).is_err()
        );
    }

    #[test]
    fn blank_overrides_are_ignored() {
        let config =
            apply_env_overrides(PlannerConfig::default(), vars(&[(MODEL_ENV, "  ")])).unwrap();
        assert_eq!(config.backend.model(), "gemini-2.0-flash");
    }

    #[test]
    fn expands_braced_variables() {
        let lookup = vars(&[("KEY", "abc123")]);
        assert_eq!(expand_env_string("${KEY}", &lookup), "abc123");
        assert_eq!(expand_env_string("pre-${KEY}-post", &lookup), "pre-abc123-post");
        assert_eq!(expand_env_string("${UNSET}", &lookup), "${UNSET}");
        assert_eq!(expand_env_string("${OPEN", &lookup), "${OPEN");
        assert_eq!(expand_env_string("$KEY", &lookup), "$KEY");
    }

    #[test]
    fn unresolved_references_are_rejected() {
        let lookup = vars(&[("KEY", "abc123")]);
        assert_eq!(expand_field("apiKey", "${KEY}", &lookup).unwrap(), "abc123");
        assert_eq!(expand_field("apiKey", "plain-key", &lookup).unwrap(), "plain-key");

        let err = expand_field("apiKey", "${UNSET}", &lookup).unwrap_err();
        assert!(err.to_string().contains("apiKey"));
        assert!(err.to_string().contains("${UNSET}"));
        assert!(expand_field("baseUrl", "http://${KEY}/${HOST}", &lookup).is_err());
    }

    #[test]
    fn unset_api_key_reference_fails_to_load() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "fete.json",
            r#"{"backend": {"apiKey": "${FETE_TEST_KEY_NEVER_SET}"}}"#,
        );

        let err = load_config_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("fete.json"));
        assert!(format!("{err:#}").contains("FETE_TEST_KEY_NEVER_SET"));
    }
}

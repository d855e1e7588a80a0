use std::time::Duration;

use serde::Deserialize;

use crate::dictionary::ApDictionary;

/// Options handed to every parser instance opened during an ingestion call.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ParseOptions {
    /// Trace every line the parser consumes (at `debug` level).
    pub debug: bool,
    /// Skip automata terminated by `--ABORT--` instead of reporting them as
    /// syntax errors.
    pub ignore_abort: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            debug: false,
            ignore_abort: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct IngestLimits {
    pub max_line_bytes: usize,
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self {
            max_line_bytes: 1024 * 1024,
        }
    }
}

/// Settings for one ingestion call.
///
/// With no `timeout`, commands are parsed straight out of their pipe while
/// they run. With a `timeout`, each command must finish within it; its
/// buffered output is parsed afterwards.
#[derive(Debug, Clone, Default)]
pub struct IngestConfig {
    pub timeout: Option<Duration>,
    pub parse_options: ParseOptions,
    pub limits: IngestLimits,
    pub dictionary: Option<ApDictionary>,
}

impl IngestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn debug(mut self, enabled: bool) -> Self {
        self.parse_options.debug = enabled;
        self
    }

    pub fn ignore_abort(mut self, enabled: bool) -> Self {
        self.parse_options.ignore_abort = enabled;
        self
    }

    pub fn limits(mut self, limits: IngestLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn dictionary(mut self, dictionary: ApDictionary) -> Self {
        self.dictionary = Some(dictionary);
        self
    }
}

/// File-friendly form of [`IngestConfig`].
///
/// ```toml
/// timeout_ms = 5000
/// ignore_abort = false
/// max_line_bytes = 65536
/// ```
#[derive(Debug, Clone, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct IngestSettings {
    pub timeout_ms: Option<u64>,
    pub debug: bool,
    pub ignore_abort: bool,
    pub max_line_bytes: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        let options = ParseOptions::default();
        Self {
            timeout_ms: None,
            debug: options.debug,
            ignore_abort: options.ignore_abort,
            max_line_bytes: IngestLimits::default().max_line_bytes,
        }
    }
}

impl IngestSettings {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

impl From<IngestSettings> for IngestConfig {
    fn from(settings: IngestSettings) -> Self {
        IngestConfig {
            timeout: settings.timeout_ms.map(Duration::from_millis),
            parse_options: ParseOptions {
                debug: settings.debug,
                ignore_abort: settings.ignore_abort,
            },
            limits: IngestLimits {
                max_line_bytes: settings.max_line_bytes,
            },
            dictionary: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_ignore_aborts_and_stream_commands() {
        let config = IngestConfig::default();
        assert!(config.parse_options.ignore_abort);
        assert!(!config.parse_options.debug);
        assert!(config.timeout.is_none());
    }

    #[test]
    fn settings_load_from_toml() {
        let settings =
            IngestSettings::from_toml_str("timeout_ms = 250\nignore_abort = false\n").unwrap();
        assert_eq!(settings.timeout_ms, Some(250));
        assert!(!settings.ignore_abort);
        assert_eq!(settings.max_line_bytes, IngestLimits::default().max_line_bytes);

        let config = IngestConfig::from(settings);
        assert_eq!(config.timeout, Some(Duration::from_millis(250)));
        assert!(!config.parse_options.ignore_abort);
    }

    #[test]
    fn settings_reject_unknown_keys() {
        assert!(IngestSettings::from_toml_str("timeout = 3").is_err());
        assert_eq!(
            IngestSettings::from_toml_str("").unwrap(),
            IngestSettings::default()
        );
    }
}

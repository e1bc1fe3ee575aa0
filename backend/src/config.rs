//! Configuration management.

use crate::mcp::SessionPolicy;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Environment variable selecting the listening port.
pub const PORT_ENV: &str = "PORT";

/// Configuration structure that matches the TOML file format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    session: SessionPolicy,
    #[serde(default)]
    logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServerConfig {
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_widget_html")]
    widget_html: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            widget_html: default_widget_html(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Path to log file (if set, logs will be written to file in addition to stdout)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error)
    /// If not set, uses RUST_LOG environment variable or defaults to "info"
    #[serde(default)]
    pub log_level: Option<String>,
}

fn default_port() -> u16 {
    pizzaz_types::DEFAULT_PORT
}

fn default_widget_html() -> PathBuf {
    PathBuf::from("story/demo.html")
}

/// Parse a port value, treating anything unusable as absent.
pub fn parse_port(value: Option<&str>) -> Option<u16> {
    value.and_then(|v| v.trim().parse::<u16>().ok())
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,
    /// Widget HTML, read once at startup
    pub widget_html: PathBuf,
    /// Session behavior
    pub session: SessionPolicy,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration with full priority chain:
    /// CLI args > `PORT` > `PIZZAZ_*` env vars > config files > defaults.
    ///
    /// Config files are merged in this order:
    /// 1. `config.toml` in the user config directory (~/.config/pizzaz/ on Linux)
    /// 2. `.pizzaz.toml` in current directory
    /// 3. An explicit `config_file`, if given
    pub fn from_figment(
        port: Option<u16>,
        widget_html: Option<PathBuf>,
        config_file: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let local_config = std::env::current_dir()
            .ok()
            .map(|d| d.join(".pizzaz.toml"));
        let user_config = directories::ProjectDirs::from("", "", "pizzaz")
            .map(|dirs| dirs.config_dir().join("config.toml"));

        let mut figment = Figment::new().merge(Serialized::defaults(ConfigFile::default()));

        for path in [user_config, local_config].into_iter().flatten() {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            }
        }

        if let Some(path) = config_file {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }

        // PIZZAZ_SERVER__PORT, PIZZAZ_SESSION__STRICT_RESOURCE_URI, ...
        figment = figment.merge(Env::prefixed("PIZZAZ_").split("__"));

        if let Some(p) = parse_port(env::var(PORT_ENV).ok().as_deref()) {
            figment = figment.merge(Serialized::default("server.port", p));
        }

        if let Some(p) = port {
            figment = figment.merge(Serialized::default("server.port", p));
        }
        if let Some(ref path) = widget_html {
            figment = figment.merge(Serialized::default("server.widget_html", path));
        }

        let config_file: ConfigFile = figment.extract()?;

        Ok(Self {
            port: config_file.server.port,
            widget_html: config_file.server.widget_html,
            session: config_file.session,
            logging: config_file.logging,
        })
    }

    /// Load configuration from the `PORT` environment variable only.
    ///
    /// Never fails; an unset or invalid `PORT` yields the default port.
    pub fn from_env() -> Self {
        Self {
            port: parse_port(env::var(PORT_ENV).ok().as_deref()).unwrap_or_else(default_port),
            ..Self::default()
        }
    }

    /// Apply command-line values on top of an already loaded config.
    pub fn with_overrides(mut self, port: Option<u16>, widget_html: Option<PathBuf>) -> Self {
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(path) = widget_html {
            self.widget_html = path;
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            widget_html: default_widget_html(),
            session: SessionPolicy::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    /// Run `f` inside `dir` with the given env vars set, restoring both.
    fn with_env<T>(dir: &TempDir, vars: &[(&str, Option<&str>)], f: impl FnOnce() -> T) -> T {
        let saved: Vec<_> = vars
            .iter()
            .map(|(k, _)| (k.to_string(), std::env::var(k).ok()))
            .collect();
        for (k, v) in vars {
            match v {
                Some(v) => std::env::set_var(k, v),
                None => std::env::remove_var(k),
            }
        }
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let result = f();

        let _ = std::env::set_current_dir(original_dir);
        for (k, v) in saved {
            match v {
                Some(v) => std::env::set_var(&k, v),
                None => std::env::remove_var(&k),
            }
        }
        result
    }

    #[test]
    fn test_parse_port() {
        assert_eq!(parse_port(Some("9000")), Some(9000));
        assert_eq!(parse_port(Some(" 9001 ")), Some(9001));
        assert_eq!(parse_port(Some("abc")), None);
        assert_eq!(parse_port(Some("")), None);
        assert_eq!(parse_port(Some("70000")), None);
        assert_eq!(parse_port(Some("-1")), None);
        assert_eq!(parse_port(None), None);
    }

    #[test]
    #[serial]
    fn test_from_figment_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = with_env(
            &temp_dir,
            &[(PORT_ENV, None), ("PIZZAZ_SERVER__PORT", None)],
            || Config::from_figment(None, None, None).unwrap(),
        );

        assert_eq!(config.port, pizzaz_types::DEFAULT_PORT);
        assert_eq!(config.widget_html, PathBuf::from("story/demo.html"));
        assert_eq!(config.session, SessionPolicy::default());
    }

    #[test]
    #[serial]
    fn test_port_env_selects_port() {
        let temp_dir = TempDir::new().unwrap();
        let config = with_env(&temp_dir, &[(PORT_ENV, Some("9123"))], || {
            Config::from_figment(None, None, None).unwrap()
        });
        assert_eq!(config.port, 9123);
    }

    #[test]
    #[serial]
    fn test_invalid_port_env_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        for bad in ["not-a-port", "", "99999"] {
            let config = with_env(&temp_dir, &[(PORT_ENV, Some(bad))], || {
                Config::from_figment(None, None, None).unwrap()
            });
            assert_eq!(config.port, pizzaz_types::DEFAULT_PORT);

            let config = with_env(&temp_dir, &[(PORT_ENV, Some(bad))], Config::from_env);
            assert_eq!(config.port, pizzaz_types::DEFAULT_PORT);
        }
    }

    #[test]
    #[serial]
    fn test_config_file_and_overrides() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(".pizzaz.toml"),
            r#"
[server]
port = 7777
widget_html = "assets/widget.html"

[session]
strict_resource_uri = true
"#,
        )
        .unwrap();

        let config = with_env(&temp_dir, &[(PORT_ENV, None)], || {
            Config::from_figment(None, None, None).unwrap()
        });
        assert_eq!(config.port, 7777);
        assert_eq!(config.widget_html, PathBuf::from("assets/widget.html"));
        assert!(config.session.strict_resource_uri);
        assert!(!config.session.close_on_message_error);

        // PORT beats the file, CLI beats PORT
        let config = with_env(&temp_dir, &[(PORT_ENV, Some("8888"))], || {
            Config::from_figment(None, None, None).unwrap()
        });
        assert_eq!(config.port, 8888);

        let config = with_env(&temp_dir, &[(PORT_ENV, Some("8888"))], || {
            Config::from_figment(Some(9999), Some(PathBuf::from("x.html")), None).unwrap()
        });
        assert_eq!(config.port, 9999);
        assert_eq!(config.widget_html, PathBuf::from("x.html"));
    }

    #[test]
    #[serial]
    fn test_prefixed_env_vars() {
        let temp_dir = TempDir::new().unwrap();
        let config = with_env(
            &temp_dir,
            &[
                (PORT_ENV, None),
                ("PIZZAZ_SESSION__CLOSE_ON_MESSAGE_ERROR", Some("true")),
                ("PIZZAZ_LOGGING__LOG_LEVEL", Some("debug")),
            ],
            || Config::from_figment(None, None, None).unwrap(),
        );
        assert!(config.session.close_on_message_error);
        assert_eq!(config.logging.log_level.as_deref(), Some("debug"));
    }

    #[test]
    #[serial]
    fn test_env_fallback_keeps_cli_values() {
        let temp_dir = TempDir::new().unwrap();
        let config = with_env(&temp_dir, &[(PORT_ENV, Some("8123"))], || {
            Config::from_env().with_overrides(Some(9100), Some(PathBuf::from("w.html")))
        });
        assert_eq!(config.port, 9100);
        assert_eq!(config.widget_html, PathBuf::from("w.html"));

        let config = with_env(&temp_dir, &[(PORT_ENV, Some("8123"))], || {
            Config::from_env().with_overrides(None, None)
        });
        assert_eq!(config.port, 8123);
        assert_eq!(config.widget_html, PathBuf::from("story/demo.html"));
    }

    #[test]
    #[serial]
    fn test_missing_explicit_config_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");
        let result = with_env(&temp_dir, &[], || {
            Config::from_figment(None, None, Some(missing))
        });
        assert!(result.is_err());
    }
}

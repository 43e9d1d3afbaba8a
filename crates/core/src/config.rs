use crate::{
    collector::CollectorConfig,
    error::{CoreError, Result},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:9102";
pub const DEFAULT_SCRAPE_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest accepted scrape timeout
pub const MAX_SCRAPE_TIMEOUT: Duration = Duration::from_secs(3600);

/// Configuration file contents (YAML; JSON files parse as well)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub web: WebSection,
    pub redfish: RedfishSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSection {
    pub listen_address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedfishSection {
    pub host: String,
    pub username: String,
    pub password: String,
    pub insecure_tls: bool,
    pub chassis_id: String,

    /// Request timeout in seconds, 0 means unset
    pub timeout_sec: u64,
}

/// Values given on the command line; `None` means not given
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub listen_address: Option<String>,
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub insecure_tls: bool,
    pub scrape_timeout: Option<Duration>,
    pub chassis_id: Option<String>,
}

/// Connection settings of the Redfish service
#[derive(Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub insecure_tls: bool,
    pub timeout: Duration,
}

impl std::fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("insecure_tls", &self.insecure_tls)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Final configuration consumed by the exporter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub listen_address: SocketAddr,
    pub endpoint: EndpointConfig,
    pub collector: CollectorConfig,
}

impl FileConfig {
    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| CoreError::config(format!("Failed to read config file {}: {}", path.display(), e)))?;

        Self::parse(&contents)
            .map_err(|e| CoreError::config(format!("Failed to parse config file {}: {}", path.display(), e)))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// An explicit path must load; otherwise the first readable default location wins
    pub fn discover(explicit: Option<&Path>) -> Result<Option<Self>> {
        if let Some(path) = explicit {
            return Self::load(path).map(Some);
        }

        for path in Self::default_config_paths() {
            if !path.exists() {
                continue;
            }
            match Self::load(&path) {
                Ok(config) => {
                    tracing::info!(path = %path.display(), "loaded config file");
                    return Ok(Some(config));
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable config file");
                }
            }
        }

        Ok(None)
    }

    /// Default configuration file search paths
    pub fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("redfish-exporter").join("config.yaml"));
        }

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".redfish-exporter.yaml"));
        }

        paths.push(PathBuf::from("redfish-exporter.yaml"));

        paths
    }
}

/// Merge a config file with command-line values.
///
/// Precedence is command line, then file, then built-in defaults. Empty
/// strings and a zero timeout in the file count as unset.
pub fn resolve(file: Option<&FileConfig>, cli: &CliOverrides) -> Result<ResolvedConfig> {
    let empty = FileConfig::default();
    let file = file.unwrap_or(&empty);

    let listen = pick(cli.listen_address.as_deref(), &file.web.listen_address)
        .unwrap_or_else(|| DEFAULT_LISTEN_ADDRESS.to_string());
    let host = pick(cli.host.as_deref(), &file.redfish.host);
    let username = pick(cli.username.as_deref(), &file.redfish.username);
    let password = pick(cli.password.as_deref(), &file.redfish.password);
    let chassis_id = pick(cli.chassis_id.as_deref(), &file.redfish.chassis_id);

    let scrape_timeout = cli
        .scrape_timeout
        .or_else(|| (file.redfish.timeout_sec > 0).then(|| Duration::from_secs(file.redfish.timeout_sec)))
        .unwrap_or(DEFAULT_SCRAPE_TIMEOUT);

    let (base_url, username, password) = match (host, username, password) {
        (Some(h), Some(u), Some(p)) => (h, u, p),
        _ => {
            return Err(CoreError::config(
                "Redfish host, username and password are required via flags or config file",
            ))
        }
    };

    if scrape_timeout.is_zero() {
        return Err(CoreError::config("Scrape timeout must be greater than zero"));
    }
    if scrape_timeout > MAX_SCRAPE_TIMEOUT {
        return Err(CoreError::config(format!(
            "Scrape timeout must not exceed {}s",
            MAX_SCRAPE_TIMEOUT.as_secs()
        )));
    }

    Ok(ResolvedConfig {
        listen_address: parse_listen_address(&listen)?,
        endpoint: EndpointConfig {
            base_url,
            username,
            password,
            insecure_tls: cli.insecure_tls || file.redfish.insecure_tls,
            timeout: scrape_timeout,
        },
        collector: CollectorConfig {
            scrape_timeout,
            chassis_id,
        },
    })
}

fn pick(cli: Option<&str>, file: &str) -> Option<String> {
    cli.map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| Some(file.trim()).filter(|v| !v.is_empty()))
        .map(str::to_string)
}

/// Parse a listen address; `:9102` binds every interface
pub fn parse_listen_address(value: &str) -> Result<SocketAddr> {
    let value = value.trim();
    let full = if value.starts_with(':') {
        format!("0.0.0.0{}", value)
    } else {
        value.to_string()
    };

    full.parse()
        .map_err(|e| CoreError::config(format!("Invalid listen address {}: {}", value, e)))
}

/// Parse `10s`, `500ms`, `2m` or a plain number of seconds
pub fn parse_duration(value: &str) -> std::result::Result<Duration, String> {
    let value = value.trim();
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);

    let number: f64 = number
        .parse()
        .map_err(|_| format!("invalid duration: {:?}", value))?;
    let seconds = match unit {
        "" | "s" => number,
        "ms" => number / 1000.0,
        "m" => number * 60.0,
        "h" => number * 3600.0,
        other => return Err(format!("unknown duration unit {:?} in {:?}", other, value)),
    };

    Duration::try_from_secs_f64(seconds).map_err(|_| format!("invalid duration: {:?}", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_file() -> FileConfig {
        FileConfig::parse(
            r#"
web:
  listen_address: "127.0.0.1:9200"
redfish:
  host: "https://bmc-file"
  username: "file-user"
  password: "file-pass"
  insecure_tls: true
  chassis_id: "1"
  timeout_sec: 30
"#,
        )
        .unwrap()
    }

    fn cli_credentials() -> CliOverrides {
        CliOverrides {
            host: Some("https://bmc-cli".to_string()),
            username: Some("cli-user".to_string()),
            password: Some("cli-pass".to_string()),
            ..CliOverrides::default()
        }
    }

    #[test]
    fn test_file_only() {
        let resolved = resolve(Some(&full_file()), &CliOverrides::default()).unwrap();
        assert_eq!(resolved.listen_address, "127.0.0.1:9200".parse::<SocketAddr>().unwrap());
        assert_eq!(resolved.endpoint.base_url, "https://bmc-file");
        assert_eq!(resolved.endpoint.username, "file-user");
        assert!(resolved.endpoint.insecure_tls);
        assert_eq!(resolved.endpoint.timeout, Duration::from_secs(30));
        assert_eq!(resolved.collector.scrape_timeout, Duration::from_secs(30));
        assert_eq!(resolved.collector.chassis_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_cli_wins_over_file() {
        let cli = CliOverrides {
            listen_address: Some(":9300".to_string()),
            scrape_timeout: Some(Duration::from_secs(5)),
            chassis_id: Some("/redfish/v1/Chassis/Blade2".to_string()),
            ..cli_credentials()
        };
        let resolved = resolve(Some(&full_file()), &cli).unwrap();
        assert_eq!(resolved.listen_address, "0.0.0.0:9300".parse::<SocketAddr>().unwrap());
        assert_eq!(resolved.endpoint.base_url, "https://bmc-cli");
        assert_eq!(resolved.endpoint.username, "cli-user");
        assert_eq!(resolved.endpoint.password, "cli-pass");
        assert_eq!(resolved.endpoint.timeout, Duration::from_secs(5));
        assert_eq!(
            resolved.collector.chassis_id.as_deref(),
            Some("/redfish/v1/Chassis/Blade2")
        );
    }

    #[test]
    fn test_defaults_without_file() {
        let resolved = resolve(None, &cli_credentials()).unwrap();
        assert_eq!(resolved.listen_address, DEFAULT_LISTEN_ADDRESS.parse::<SocketAddr>().unwrap());
        assert_eq!(resolved.endpoint.timeout, DEFAULT_SCRAPE_TIMEOUT);
        assert!(!resolved.endpoint.insecure_tls);
        assert!(resolved.collector.chassis_id.is_none());
    }

    #[test]
    fn test_insecure_from_either_source() {
        let cli = CliOverrides {
            insecure_tls: true,
            ..cli_credentials()
        };
        assert!(resolve(None, &cli).unwrap().endpoint.insecure_tls);
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let mut file = full_file();
        file.redfish.chassis_id = String::new();
        file.redfish.timeout_sec = 0;
        let cli = CliOverrides {
            host: Some("   ".to_string()),
            ..CliOverrides::default()
        };
        let resolved = resolve(Some(&file), &cli).unwrap();
        assert_eq!(resolved.endpoint.base_url, "https://bmc-file");
        assert!(resolved.collector.chassis_id.is_none());
        assert_eq!(resolved.collector.scrape_timeout, DEFAULT_SCRAPE_TIMEOUT);
    }

    #[test]
    fn test_missing_credentials() {
        let cli = CliOverrides {
            password: None,
            ..cli_credentials()
        };
        let err = resolve(None, &cli).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let cli = CliOverrides {
            scrape_timeout: Some(Duration::ZERO),
            ..cli_credentials()
        };
        assert!(resolve(None, &cli).is_err());
    }

    #[test]
    fn test_oversized_timeout_rejected() {
        let mut file = full_file();
        file.redfish.timeout_sec = u64::MAX;
        let err = resolve(Some(&file), &CliOverrides::default()).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));

        let cli = CliOverrides {
            scrape_timeout: Some(MAX_SCRAPE_TIMEOUT + Duration::from_millis(1)),
            ..cli_credentials()
        };
        assert!(resolve(None, &cli).is_err());

        let cli = CliOverrides {
            scrape_timeout: Some(MAX_SCRAPE_TIMEOUT),
            ..cli_credentials()
        };
        assert_eq!(resolve(None, &cli).unwrap().collector.scrape_timeout, MAX_SCRAPE_TIMEOUT);
    }

    #[test]
    fn test_bad_listen_address() {
        let cli = CliOverrides {
            listen_address: Some("not-an-address".to_string()),
            ..cli_credentials()
        };
        assert!(resolve(None, &cli).is_err());
    }

    #[test]
    fn test_parse_partial_file() {
        let file = FileConfig::parse("redfish:\n  host: https://bmc\n").unwrap();
        assert_eq!(file.redfish.host, "https://bmc");
        assert!(file.web.listen_address.is_empty());
        assert_eq!(file.redfish.timeout_sec, 0);

        assert_eq!(FileConfig::parse("").unwrap(), FileConfig::default());
    }

    #[test]
    fn test_parse_json_file() {
        let file = FileConfig::parse(r#"{"redfish": {"host": "https://bmc", "timeout_sec": 3}}"#).unwrap();
        assert_eq!(file.redfish.host, "https://bmc");
        assert_eq!(file.redfish.timeout_sec, 3);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "redfish:\n  username: root\n").unwrap();

        let file = FileConfig::load(&path).unwrap();
        assert_eq!(file.redfish.username, "root");

        let found = FileConfig::discover(Some(&path)).unwrap();
        assert_eq!(found, Some(file));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileConfig::load(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("10").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("5d").is_err());
    }

    #[test]
    fn test_parse_duration_out_of_range() {
        assert!(parse_duration("99999999999999999999h").is_err());
        assert!(parse_duration(&format!("{}s", f64::MAX)).is_err());
        assert!(parse_duration("1e400").is_err());
    }

    #[test]
    fn test_endpoint_debug_redacts_password() {
        let resolved = resolve(None, &cli_credentials()).unwrap();
        let text = format!("{:?}", resolved.endpoint);
        assert!(!text.contains("cli-pass"));
        assert!(text.contains("<redacted>"));
    }
}

//! Shared helpers for CLI commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use lava_adapter_sim::SimMaster;
use lava_client::{ClientConfig, Session, TcpTransport, Transport};

/// Session type used by every command, over TCP or the simulator.
pub type CliSession = Session<Box<dyn Transport>>;

/// Flags shared by all subcommands.
#[derive(Debug, Clone, Default)]
pub struct GlobalOpts {
    pub config: Option<PathBuf>,
    pub sim: bool,
    pub json: bool,
}

/// Return the default configuration file (~/.lava/config.yaml).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".lava").join("config.yaml"))
}

/// Load the client configuration: file, then `LAVA_*` environment overrides.
pub fn load_config(opts: &GlobalOpts) -> Result<ClientConfig> {
    let path = opts.config.clone().or_else(default_config_path);
    if let Some(explicit) = &opts.config {
        if !explicit.exists() {
            anyhow::bail!("Configuration file not found: {}", explicit.display());
        }
    }
    ClientConfig::load(path.as_deref()).context("Failed to load configuration")
}

/// Open a session against the configured master, or the simulator with
/// `--sim`.
pub async fn open_session(opts: &GlobalOpts) -> Result<CliSession> {
    let config = load_config(opts)?;

    let transport: Box<dyn Transport> = if opts.sim {
        debug!("Using the simulated master");
        Box::new(SimMaster::seeded())
    } else {
        Box::new(TcpTransport::new(
            config.master_addr(),
            config.max_packet_bytes,
            config.timeout(),
        ))
    };
    let endpoint = transport.endpoint();

    Session::init(transport, config)
        .await
        .with_context(|| format!("Failed to connect to master at {endpoint}"))
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to encode JSON")?;
    println!("{out}");
    Ok(())
}

/// Render a numeric limit, where non-positive values mean unlimited.
pub fn limit(value: i32) -> String {
    if value > 0 {
        value.to_string()
    } else {
        "-".to_string()
    }
}

/// Compact timestamp for job tables, e.g. `May  4 10:00`.
pub fn short_time(t: &DateTime<Utc>) -> String {
    t.format("%b %e %H:%M").to_string()
}

/// Full timestamp for event listings.
pub fn full_time(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Parse a processor count given as `MIN` or `MIN,MAX`.
pub fn parse_processors(range: &str) -> Result<(i32, i32)> {
    let parse = |s: &str| -> Result<i32> {
        let n: i32 = s
            .trim()
            .parse()
            .with_context(|| format!("Invalid processor count: '{s}'"))?;
        if n <= 0 {
            anyhow::bail!("Processor count must be positive: {n}");
        }
        Ok(n)
    };

    match range.split_once(',') {
        Some((min, max)) => {
            let (min, max) = (parse(min)?, parse(max)?);
            if max < min {
                anyhow::bail!("Maximum processors ({max}) below minimum ({min})");
            }
            Ok((min, max))
        }
        None => {
            let n = parse(range)?;
            Ok((n, n))
        }
    }
}

/// Read a file, naming it in the error.
pub async fn read_file(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_processors_single() {
        assert_eq!(parse_processors("4").unwrap(), (4, 4));
    }

    #[test]
    fn test_parse_processors_range() {
        assert_eq!(parse_processors("2,8").unwrap(), (2, 8));
        assert_eq!(parse_processors(" 1 , 3 ").unwrap(), (1, 3));
    }

    #[test]
    fn test_parse_processors_rejects_bad_input() {
        assert!(parse_processors("0").is_err());
        assert!(parse_processors("four").is_err());
        assert!(parse_processors("8,2").is_err());
        assert!(parse_processors("").is_err());
    }

    #[test]
    fn test_limit_rendering() {
        assert_eq!(limit(10), "10");
        assert_eq!(limit(0), "-");
        assert_eq!(limit(-1), "-");
    }

    #[test]
    fn test_time_rendering() {
        use chrono::TimeZone;

        let t = Utc.with_ymd_and_hms(2014, 1, 9, 16, 10, 0).unwrap();
        assert_eq!(short_time(&t), "Jan  9 16:10");
        assert_eq!(full_time(&t), "2014-01-09 16:10:00");
        // fixed width keeps the table columns aligned
        assert_eq!(format!("{:<20}|", full_time(&t)), "2014-01-09 16:10:00 |");
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let opts = GlobalOpts {
            config: Some(PathBuf::from("/nonexistent/lava/config.yaml")),
            ..GlobalOpts::default()
        };
        let err = load_config(&opts).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "master_host: master01\nmaster_port: 7000\n").unwrap();

        let opts = GlobalOpts {
            config: Some(path),
            ..GlobalOpts::default()
        };
        let config = load_config(&opts).unwrap();
        assert_eq!(config.master_port, 7000);
    }

    #[tokio::test]
    async fn test_sim_session() {
        let opts = GlobalOpts {
            config: Some(PathBuf::from("/nonexistent")),
            sim: true,
            json: false,
        };
        // explicit config must exist even in sim mode
        assert!(open_session(&opts).await.is_err());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "app_name: lava-test\n").unwrap();
        let opts = GlobalOpts {
            config: Some(path),
            sim: true,
            json: false,
        };
        let mut session = open_session(&opts).await.unwrap();
        assert_eq!(session.cluster_name().await.unwrap(), "lava");
        assert!(session.transport().endpoint().starts_with("sim://"));
    }
}

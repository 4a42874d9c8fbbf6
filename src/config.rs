//! File-based configuration, loaded from a `rust-ini` `[chord]` section.
//!
//! Generalized from the teacher's `Config::load_from_file`, which loaded a
//! `listen_address`/`api_address` pair for its api/p2p split. This node has
//! no api layer, so the fields are its own: the bind address, the
//! maintenance cadence, the RPC timeout, and the listener's worker count.

use ini::Ini;

use crate::error::{Error, Result};

const DEFAULT_INTERVAL_MS: u64 = 1000;
const DEFAULT_TIMEOUT_MS: u64 = 5000;
const DEFAULT_WORKERS: usize = 4;

/// Settings read from a config file's `[chord]` section.
#[derive(Debug, Clone)]
pub struct Config {
    pub ip: String,
    pub port: u16,
    pub interval_ms: u64,
    pub timeout_ms: u64,
    pub workers: usize,
}

impl Config {
    /// Loads settings from `path`. `ip` and `port` are required;
    /// `interval_ms`, `timeout_ms`, and `workers` fall back to their
    /// defaults when absent.
    pub fn load_from_file(path: &str) -> Result<Config> {
        let conf = Ini::load_from_file(path)
            .map_err(|e| Error::Config(format!("could not read {}: {}", path, e)))?;

        let section = conf
            .section(Some("chord"))
            .ok_or_else(|| Error::Config("missing section `chord`".to_string()))?;

        let ip = section
            .get("ip")
            .ok_or_else(|| Error::Config("missing value `ip`".to_string()))?
            .to_string();

        let port: u16 = section
            .get("port")
            .ok_or_else(|| Error::Config("missing value `port`".to_string()))?
            .parse()
            .map_err(|_| Error::Config("`port` is not a valid u16".to_string()))?;

        let interval_ms = match section.get("interval_ms") {
            Some(v) => v
                .parse()
                .map_err(|_| Error::Config("`interval_ms` is not a valid integer".to_string()))?,
            None => DEFAULT_INTERVAL_MS,
        };

        let timeout_ms = match section.get("timeout_ms") {
            Some(v) => v
                .parse()
                .map_err(|_| Error::Config("`timeout_ms` is not a valid integer".to_string()))?,
            None => DEFAULT_TIMEOUT_MS,
        };

        let workers = match section.get("workers") {
            Some(v) => v
                .parse()
                .map_err(|_| Error::Config("`workers` is not a valid integer".to_string()))?,
            None => DEFAULT_WORKERS,
        };

        Ok(Config {
            ip,
            port,
            interval_ms,
            timeout_ms,
            workers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp_ini(contents: &str) -> std::path::PathBuf {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static COUNTER: AtomicUsize = AtomicUsize::new(0);

        let mut path = std::env::temp_dir();
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        path.push(format!("chordring-test-{}-{}.ini", std::process::id(), n));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_required_fields_and_defaults() {
        let path = write_temp_ini("[chord]\nip = 127.0.0.1\nport = 9000\n");
        let config = Config::load_from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.ip, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.interval_ms, DEFAULT_INTERVAL_MS);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.workers, DEFAULT_WORKERS);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn loads_overridden_fields() {
        let path = write_temp_ini(
            "[chord]\nip = 10.0.0.1\nport = 9001\ninterval_ms = 250\ntimeout_ms = 1500\nworkers = 8\n",
        );
        let config = Config::load_from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.interval_ms, 250);
        assert_eq!(config.timeout_ms, 1500);
        assert_eq!(config.workers, 8);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_section_is_an_error() {
        let path = write_temp_ini("[other]\nfoo = bar\n");
        assert!(Config::load_from_file(path.to_str().unwrap()).is_err());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Config::load_from_file("/nonexistent/path/chordring.ini").is_err());
    }
}

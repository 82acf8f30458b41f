//! Binary entrypoint for the patent fusion MCP server.

#![forbid(unsafe_code)]

use clap::Parser;
use fusion_core::Config;

/// Patent fusion MCP server (stdio + HTTP).
#[derive(Parser)]
#[command(name = "fusion-server", version, about = "MCP server for RRF-fused patent search")]
struct Cli {
    /// Path to a `.env`-style config file to load before `Config::from_env`.
    #[arg(long)]
    config: Option<String>,

    /// Serve over stdio instead of HTTP (default: HTTP).
    #[arg(long, conflicts_with = "http")]
    stdio: bool,

    /// Serve over HTTP (default).
    #[arg(long, conflicts_with = "stdio")]
    http: bool,

    /// Override `MCP_PORT` for this run.
    #[arg(long)]
    port: Option<u16>,
}

/// Parse a dotenv-style file (`KEY=value` lines) without touching process
/// env, so `--config` composes with `Config::from_env()`'s own `.env`
/// lookup instead of racing it.
fn apply_config_file(config: &mut Config, path: &str) {
    let Ok(contents) = std::fs::read_to_string(path) else {
        tracing::warn!(path, "could not read --config file, ignoring");
        return;
    };
    for line in contents.lines() {
        let line = line.trim().strip_prefix("export ").unwrap_or(line.trim());
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else { continue };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        match key.trim() {
            "STATE_STORE_URL" => config.state_store_url = value.to_string(),
            "SNAPSHOT" => config.snapshot = value.to_string(),
            "MCP_HOST" => config.mcp_host = value.to_string(),
            "MCP_PORT" => {
                if let Ok(port) = value.parse() {
                    config.mcp_port = port;
                }
            }
            "MCP_AUTH_TOKEN" => config.mcp_auth_token = (!value.is_empty()).then(|| value.to_string()),
            "UPSTREAM_BASE_URL" => config.upstream_base_url = Some(value.to_string()),
            "INTERNAL_DENSE_BASE_URL" => config.internal_dense_base_url = Some(value.to_string()),
            "USE_LOCAL_STUB" => config.use_local_stub = matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
            "LOG_LEVEL" => config.log_level = value.to_string(),
            "LOG_JSON" => config.log_json = matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn apply_config_file_overrides_named_fields() {
        let file = write_config(
            "# comment, ignored\nexport MCP_PORT=4100\nSNAPSHOT=\"staging\"\nUSE_LOCAL_STUB=true\n",
        );
        let mut config = Config::default();
        apply_config_file(&mut config, file.path().to_str().unwrap());
        assert_eq!(config.mcp_port, 4100);
        assert_eq!(config.snapshot, "staging");
        assert!(config.use_local_stub);
    }

    #[test]
    fn apply_config_file_ignores_blank_lines_comments_and_unknown_keys() {
        let file = write_config("\n# nope\nNOT_A_REAL_KEY=whatever\n");
        let mut config = Config::default();
        let before = config.mcp_port;
        apply_config_file(&mut config, file.path().to_str().unwrap());
        assert_eq!(config.mcp_port, before);
    }

    #[test]
    fn apply_config_file_warns_and_leaves_config_untouched_on_missing_file() {
        let mut config = Config::default();
        let before = config.snapshot.clone();
        apply_config_file(&mut config, "/nonexistent/path/to/config.env");
        assert_eq!(config.snapshot, before);
    }

    #[test]
    fn apply_config_file_treats_empty_auth_token_as_none() {
        let file = write_config("MCP_AUTH_TOKEN=\n");
        let mut config = Config::default();
        config.mcp_auth_token = Some("stale".to_string());
        apply_config_file(&mut config, file.path().to_str().unwrap());
        assert_eq!(config.mcp_auth_token, None);
    }
}

fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(path) = cli.config.as_deref() {
        apply_config_file(&mut config, path);
    }
    if let Some(port) = cli.port {
        config.mcp_port = port;
    }

    if cli.stdio {
        fusion_server::run_stdio(&config);
        Ok(())
    } else {
        fusion_server::run_http(&config)
    }
}

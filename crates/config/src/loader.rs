use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::TicketlogConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "ticketlog.toml",
    "ticketlog.yaml",
    "ticketlog.yml",
    "ticketlog.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<TicketlogConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    parse_config(&substitute_env(&raw), path)
}

/// Parse already-substituted config text, picking the format from the
/// file extension (TOML when there is none).
pub fn parse_config(raw: &str, path: &Path) -> anyhow::Result<TicketlogConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./ticketlog.{toml,yaml,yml,json}`
/// 2. `<user config dir>/ticketlog/ticketlog.{toml,yaml,yml,json}`
///
/// Returns `(config, path)`; the defaults and `None` when nothing is found
/// or the file fails to parse.
pub fn discover_and_load() -> (TicketlogConfig, Option<PathBuf>) {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return (TicketlogConfig::default(), None);
    };
    debug!(path = %path.display(), "loading config");
    match load_config(&path) {
        Ok(cfg) => (cfg, Some(path)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            (TicketlogConfig::default(), None)
        },
    }
}

fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists());
    if local.is_some() {
        return local;
    }
    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// The user-global config directory.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "ticketlog").map(|d| d.config_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret, std::io::Write};

    const TOML: &str = r#"
[discord]
token = "bot-token"

[tickets]
category_ids = ["55"]
baseline_role_id = "3"
webhook_url = "https://hooks.test/tickets"
ranks = [
  { role_id = "1", key = "owner", label = "Owner" },
  { role_id = "3", key = "support", label = "Support" },
]

[relay]
channel_ids = ["77"]
ignore_role_ids = ["3"]
webhook_url = "https://hooks.test/relay"
"#;

    #[test]
    fn parses_toml() {
        let cfg = parse_config(TOML, Path::new("ticketlog.toml")).unwrap();
        assert_eq!(cfg.discord.token.expose_secret(), "bot-token");
        assert_eq!(cfg.discord.lookup_timeout_ms, 5_000);
        assert_eq!(cfg.tickets.ranks.len(), 2);
        assert_eq!(cfg.tickets.ranks[1].label, "Support");
        assert_eq!(cfg.tickets.name_patterns, vec!["ticket-*".to_string()]);
        assert!(cfg.tickets.notify_transcript_url);
        assert!(cfg.tickets.is_enabled());
        assert!(cfg.relay.is_enabled());
    }

    #[test]
    fn parses_yaml_and_json() {
        let yaml = "tickets:\n  baseline_role_id: \"9\"\n  embed_color: 255\n";
        let cfg = parse_config(yaml, Path::new("ticketlog.yaml")).unwrap();
        assert_eq!(cfg.tickets.baseline_role_id, "9");
        assert_eq!(cfg.tickets.embed_color, 255);
        assert!(!cfg.tickets.is_enabled());

        let json = r#"{"relay": {"channel_ids": ["1"]}}"#;
        let cfg = parse_config(json, Path::new("ticketlog.json")).unwrap();
        assert_eq!(cfg.relay.channel_ids, vec!["1".to_string()]);
        assert!(!cfg.relay.is_enabled());
    }

    #[test]
    fn rejects_unknown_extension() {
        assert!(parse_config("", Path::new("ticketlog.ini")).is_err());
    }

    #[test]
    fn load_config_reads_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(TOML.as_bytes()).unwrap();
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.relay.channel_ids, vec!["77".to_string()]);
    }
}

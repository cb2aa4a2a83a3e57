//! Semantic checks on a parsed configuration.

use {secrecy::ExposeSecret, std::collections::HashSet};

use crate::schema::TicketlogConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. `tickets.baseline_role_id`.
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.path, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    fn push(&mut self, severity: Severity, path: &str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Check cross-field constraints the schema cannot express.
#[must_use]
pub fn validate(config: &TicketlogConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if config.discord.token.expose_secret().trim().is_empty() {
        result.push(Severity::Error, "discord.token", "bot token is required");
    }

    let tickets = &config.tickets;
    if tickets.is_enabled() {
        if tickets.ranks.is_empty() {
            result.push(Severity::Error, "tickets.ranks", "rank table is empty");
        }
        if !tickets
            .ranks
            .iter()
            .any(|r| r.role_id == tickets.baseline_role_id)
        {
            result.push(
                Severity::Error,
                "tickets.baseline_role_id",
                format!(
                    "role {:?} is not listed in tickets.ranks",
                    tickets.baseline_role_id
                ),
            );
        }
        let mut seen = HashSet::new();
        for rank in &tickets.ranks {
            if !seen.insert(rank.role_id.as_str()) {
                result.push(
                    Severity::Warning,
                    "tickets.ranks",
                    format!("role {} listed twice; the first entry wins", rank.role_id),
                );
            }
        }
    } else {
        result.push(
            Severity::Warning,
            "tickets.webhook_url",
            "no webhook configured, ticket transcripts are disabled",
        );
    }

    if !config.relay.channel_ids.is_empty() && !config.relay.is_enabled() {
        result.push(
            Severity::Warning,
            "relay.webhook_url",
            "relay channels listed without a webhook, relay is disabled",
        );
    }

    result
}

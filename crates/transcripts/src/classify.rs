//! Privilege classification of channel participants.

use std::time::Duration;

use {
    serde::{Deserialize, Serialize},
    tracing::{debug, warn},
};

use ticketlog_channels::{Error as PlatformError, MemberDirectory, Participant};

/// Label given to participants holding none of the ranked roles.
pub const UNPRIVILEGED_LABEL: &str = "Member";

/// One row of the rank table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankEntry {
    pub role_id: String,
    /// Short symbolic key, e.g. `"admin"`.
    pub key: String,
    pub label: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RankTableError {
    #[error("rank table is empty")]
    Empty,

    #[error("baseline role {role_id} is not listed in the rank table")]
    MissingBaseline { role_id: String },
}

/// Ordered privilege table, most privileged first.
#[derive(Debug, Clone)]
pub struct RankTable {
    entries: Vec<RankEntry>,
    baseline_role_id: String,
}

impl RankTable {
    pub fn new(
        entries: Vec<RankEntry>,
        baseline_role_id: impl Into<String>,
    ) -> Result<Self, RankTableError> {
        let baseline_role_id = baseline_role_id.into();
        if entries.is_empty() {
            return Err(RankTableError::Empty);
        }
        if !entries.iter().any(|e| e.role_id == baseline_role_id) {
            return Err(RankTableError::MissingBaseline {
                role_id: baseline_role_id,
            });
        }
        Ok(Self {
            entries,
            baseline_role_id,
        })
    }

    pub fn entries(&self) -> &[RankEntry] {
        &self.entries
    }

    pub fn baseline_role_id(&self) -> &str {
        &self.baseline_role_id
    }
}

/// Coarse privilege category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Unprivileged,
    BaselinePrivileged,
    HigherPrivileged,
}

impl Rank {
    #[must_use]
    pub fn is_staff(self) -> bool {
        !matches!(self, Self::Unprivileged)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub rank: Rank,
    pub label: String,
}

impl Classification {
    #[must_use]
    pub fn unprivileged() -> Self {
        Self {
            rank: Rank::Unprivileged,
            label: UNPRIVILEGED_LABEL.into(),
        }
    }
}

/// Scan the table top-down and return the first rank whose role is held.
#[must_use]
pub fn classify(held: &[String], table: &RankTable) -> Classification {
    let Some(entry) = table
        .entries
        .iter()
        .find(|entry| held.iter().any(|role| *role == entry.role_id))
    else {
        return Classification::unprivileged();
    };

    let rank = if entry.role_id == table.baseline_role_id {
        Rank::BaselinePrivileged
    } else {
        Rank::HigherPrivileged
    };
    Classification {
        rank,
        label: entry.label.clone(),
    }
}

/// Fetch the roles a participant holds right now.
///
/// Returns `None` when the lookup fails or exceeds `timeout`; the failure is
/// logged and callers fall back to "holds no roles".
pub async fn lookup_roles(
    directory: &dyn MemberDirectory,
    guild_id: &str,
    user_id: &str,
    timeout: Duration,
) -> Option<Vec<String>> {
    let result = match tokio::time::timeout(timeout, directory.role_ids(guild_id, user_id)).await
    {
        Ok(result) => result,
        Err(_) => Err(PlatformError::Timeout {
            millis: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    };
    match result {
        Ok(roles) => Some(roles),
        Err(e) => {
            warn!(guild_id, user_id, error = %e, "member lookup failed, treating as no roles");
            None
        },
    }
}

/// Classify a message author, looking up their current roles.
///
/// Any lookup failure classifies the author as unprivileged. Placeholder
/// authors and messages outside a guild are never looked up.
pub async fn classify_member(
    directory: &dyn MemberDirectory,
    guild_id: Option<&str>,
    author: &Participant,
    table: &RankTable,
    timeout: Duration,
) -> Classification {
    let Some(guild_id) = guild_id else {
        return Classification::unprivileged();
    };
    if author.is_placeholder() {
        return Classification::unprivileged();
    }
    let held = lookup_roles(directory, guild_id, &author.id, timeout)
        .await
        .unwrap_or_default();
    let classification = classify(&held, table);
    debug!(user_id = %author.id, rank = ?classification.rank, "classified participant");
    classification
}

/// Whether any held role is on the ignore list.
#[must_use]
pub fn has_ignored_role(held: &[String], ignored: &[String]) -> bool {
    held.iter().any(|role| ignored.iter().any(|i| i == role))
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        rstest::rstest,
        std::collections::HashMap,
        ticketlog_channels::Result as PlatformResult,
    };

    fn table() -> RankTable {
        let entry = |role_id: &str, key: &str, label: &str| RankEntry {
            role_id: role_id.into(),
            key: key.into(),
            label: label.into(),
        };
        RankTable::new(
            vec![
                entry("1", "owner", "Owner"),
                entry("2", "admin", "Admin"),
                entry("3", "support", "Support"),
            ],
            "3",
        )
        .unwrap()
    }

    fn roles(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case(&[], Rank::Unprivileged, UNPRIVILEGED_LABEL)]
    #[case(&["99"], Rank::Unprivileged, UNPRIVILEGED_LABEL)]
    #[case(&["3"], Rank::BaselinePrivileged, "Support")]
    #[case(&["99", "3"], Rank::BaselinePrivileged, "Support")]
    #[case(&["2"], Rank::HigherPrivileged, "Admin")]
    #[case(&["3", "2", "1"], Rank::HigherPrivileged, "Owner")]
    #[case(&["3", "2"], Rank::HigherPrivileged, "Admin")]
    fn classification(#[case] held: &[&str], #[case] rank: Rank, #[case] label: &str) {
        let result = classify(&roles(held), &table());
        assert_eq!(result.rank, rank);
        assert_eq!(result.label, label);
    }

    #[test]
    fn rank_table_requires_baseline() {
        let entries = vec![RankEntry {
            role_id: "1".into(),
            key: "owner".into(),
            label: "Owner".into(),
        }];
        assert!(matches!(
            RankTable::new(entries, "7"),
            Err(RankTableError::MissingBaseline { .. })
        ));
        assert!(matches!(
            RankTable::new(Vec::new(), "7"),
            Err(RankTableError::Empty)
        ));
    }

    #[test]
    fn ignored_roles() {
        assert!(has_ignored_role(&roles(&["5", "6"]), &roles(&["6"])));
        assert!(!has_ignored_role(&roles(&["5"]), &roles(&["6"])));
        assert!(!has_ignored_role(&[], &roles(&["6"])));
    }

    struct FixedDirectory(HashMap<String, Vec<String>>);

    #[async_trait]
    impl MemberDirectory for FixedDirectory {
        async fn role_ids(&self, guild_id: &str, user_id: &str) -> PlatformResult<Vec<String>> {
            self.0
                .get(user_id)
                .cloned()
                .ok_or_else(|| PlatformError::unknown_member(guild_id, user_id))
        }
    }

    struct StalledDirectory;

    #[async_trait]
    impl MemberDirectory for StalledDirectory {
        async fn role_ids(&self, _guild_id: &str, _user_id: &str) -> PlatformResult<Vec<String>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec!["1".into()])
        }
    }

    fn person(id: &str) -> Participant {
        Participant {
            id: id.into(),
            username: format!("user{id}"),
            discriminator: None,
            global_name: None,
            avatar_url: None,
            bot: false,
        }
    }

    #[tokio::test]
    async fn classify_member_uses_directory() {
        let dir = FixedDirectory(HashMap::from([("10".to_string(), roles(&["2"]))]));
        let result = classify_member(
            &dir,
            Some("g"),
            &person("10"),
            &table(),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(result.rank, Rank::HigherPrivileged);
    }

    #[tokio::test]
    async fn failed_lookup_fails_open() {
        let dir = FixedDirectory(HashMap::new());
        let result = classify_member(
            &dir,
            Some("g"),
            &person("10"),
            &table(),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(result, Classification::unprivileged());
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_lookup_fails_open() {
        let result = classify_member(
            &StalledDirectory,
            Some("g"),
            &person("10"),
            &table(),
            Duration::from_millis(50),
        )
        .await;
        assert_eq!(result.rank, Rank::Unprivileged);
    }

    #[tokio::test]
    async fn placeholder_is_never_looked_up() {
        let dir = FixedDirectory(HashMap::from([("0".to_string(), roles(&["1"]))]));
        let result = classify_member(
            &dir,
            Some("g"),
            &Participant::placeholder(),
            &table(),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(result.rank, Rank::Unprivileged);
    }
}

//! Member role lookups over the Discord REST API.

use std::sync::Arc;

use {
    async_trait::async_trait,
    serenity::{
        all::{GuildId, UserId},
        http::Http,
    },
};

use ticketlog_channels::{Error, MemberDirectory, Result};

/// [`MemberDirectory`] backed by serenity's HTTP client.
pub struct SerenityDirectory {
    http: Arc<Http>,
}

impl SerenityDirectory {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

fn snowflake(raw: &str, what: &str) -> Result<u64> {
    match raw.parse::<u64>()? {
        0 => Err(Error::invalid_input(format!("{what} id must be non-zero"))),
        id => Ok(id),
    }
}

#[async_trait]
impl MemberDirectory for SerenityDirectory {
    async fn role_ids(&self, guild_id: &str, user_id: &str) -> Result<Vec<String>> {
        let guild = GuildId::new(snowflake(guild_id, "guild")?);
        let user = UserId::new(snowflake(user_id, "user")?);
        let member = self
            .http
            .get_member(guild, user)
            .await
            .map_err(|e| Error::external(format!("get member {user_id} in {guild_id}"), e))?;
        Ok(member.roles.iter().map(ToString::to_string).collect())
    }
}

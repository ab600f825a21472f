//! Invite links and the shared-secret gate
//!
//! An invite link carries the invited participant's role and the shared
//! secret as query parameters (`?role=b&key=...`). It is read once at startup
//! to bind the tab's role.

use anyhow::{anyhow, bail, Context, Result};
use url::Url;

use crate::chat::Role;

/// Role and key read from an invite link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invite {
    pub role: Role,
    pub key: String,
}

impl Invite {
    pub fn parse(link: &str) -> Result<Self> {
        let url = Url::parse(link).with_context(|| format!("Invalid invite link: {}", link))?;

        let mut role = None;
        let mut key = None;
        for (name, value) in url.query_pairs() {
            match name.as_ref() {
                "role" => role = Some(value.parse::<Role>()?),
                "key" => key = Some(value.into_owned()),
                _ => {}
            }
        }

        Ok(Self {
            role: role.ok_or_else(|| anyhow!("Invite link has no role"))?,
            key: key.ok_or_else(|| anyhow!("Invite link has no key"))?,
        })
    }
}

/// Checks invite keys against the configured secret
pub struct AccessGate {
    secret: String,
}

impl AccessGate {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Role granted by a valid invite
    pub fn verify(&self, invite: &Invite) -> Result<Role> {
        if invite.key != self.secret {
            bail!("Invite key does not match");
        }
        Ok(invite.role)
    }

    /// Build the link that invites `role` into the conversation
    pub fn invite_link(&self, base: &str, role: Role) -> Result<Url> {
        let mut url = Url::parse(base).with_context(|| format!("Invalid invite base: {}", base))?;
        url.query_pairs_mut()
            .clear()
            .append_pair("role", role.as_str())
            .append_pair("key", &self.secret);
        Ok(url)
    }
}

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Access level of a grant. `ReadWrite` includes `Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessLevel {
    Read,
    ReadWrite,
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccessLevel::Read => "read",
            AccessLevel::ReadWrite => "read-write",
        })
    }
}

/// The policy attached to one principal's execution role.
///
/// Grants accumulate: granting a lower level than the one held changes nothing,
/// granting a higher one upgrades. Lowering takes an explicit restrict.
#[derive(Debug, Clone, PartialEq)]
pub struct RolePolicy {
    pub role_arn: String,
    pub subject: String,
    pub grants: BTreeMap<String, AccessLevel>,
}

impl RolePolicy {
    /// Level held on `resource`, if any.
    pub fn level(&self, resource: &str) -> Option<AccessLevel> {
        self.grants.get(resource).copied()
    }
}

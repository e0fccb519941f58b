//! # Authorization Seam
//!
//! The engine itself is authorization-agnostic: it takes an opaque
//! actor identifier purely to stamp settlement records. The capability
//! check ("may this actor mutate the ledger?") is applied by the API
//! layer BEFORE an engine operation is invoked, through this trait.

use std::collections::HashSet;

/// Write-capability check for ledger mutations.
pub trait Authorizer: Send + Sync {
    /// Whether `actor` may invoke mutating engine operations.
    fn can_write(&self, actor: &str) -> bool;
}

/// Grants every actor write access (single-operator deployments,
/// tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn can_write(&self, _actor: &str) -> bool {
        true
    }
}

/// Grants write access to an explicit set of actors.
#[derive(Debug, Clone, Default)]
pub struct RoleTable {
    writers: HashSet<String>,
}

impl RoleTable {
    /// Builds a table from actor identifiers with write access.
    pub fn new<I, S>(writers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RoleTable {
            writers: writers.into_iter().map(Into::into).collect(),
        }
    }
}

impl Authorizer for RoleTable {
    fn can_write(&self, actor: &str) -> bool {
        self.writers.contains(actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all() {
        assert!(AllowAll.can_write("anyone"));
    }

    #[test]
    fn test_role_table_membership() {
        let table = RoleTable::new(["admin", "manager"]);
        assert!(table.can_write("admin"));
        assert!(table.can_write("manager"));
        assert!(!table.can_write("waiter"));
    }
}

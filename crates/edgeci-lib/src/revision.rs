//! Revision resolution
//!
//! Decides which revision of a proxy is current and how a push should land
//! on the management API.

use crate::error::{SyncError, SyncResult};
use crate::models::MetadataProbe;

/// Revision assigned to a proxy that is imported for the first time
pub const FIRST_REVISION: u32 = 1;

/// How a push publishes a bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushPlan {
    /// Overwrite the given live revision in place
    Update(u32),
    /// Import as a new revision on top of an existing proxy
    Import(u32),
    /// Create the proxy, which starts at revision 1
    ImportFresh,
}

impl PushPlan {
    /// Revision the plan is expected to produce
    pub fn target_revision(&self) -> u32 {
        match self {
            PushPlan::Update(revision) | PushPlan::Import(revision) => *revision,
            PushPlan::ImportFresh => FIRST_REVISION,
        }
    }

    pub fn is_import(&self) -> bool {
        !matches!(self, PushPlan::Update(_))
    }
}

/// Highest revision in the set. An empty set is a precondition violation.
pub fn resolve_max_revision(revisions: &[u32]) -> SyncResult<u32> {
    revisions
        .iter()
        .copied()
        .max()
        .ok_or(SyncError::InvalidRevisionSet)
}

/// Choose between updating the live revision and importing a new one
pub fn resolve_push_plan(probe: &MetadataProbe, requested_update: bool) -> SyncResult<PushPlan> {
    let metadata = match probe {
        MetadataProbe::NotFound => return Ok(PushPlan::ImportFresh),
        MetadataProbe::Found(metadata) => metadata,
    };

    let current = resolve_max_revision(&metadata.revisions)?;
    if requested_update {
        Ok(PushPlan::Update(current))
    } else {
        current
            .checked_add(1)
            .map(PushPlan::Import)
            .ok_or(SyncError::RevisionOverflow { revision: current })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProxyMetaData, ProxyMetadata};

    fn found(revisions: Vec<u32>) -> MetadataProbe {
        MetadataProbe::Found(ProxyMetadata {
            name: "orders-api".to_string(),
            revisions,
            meta_data: ProxyMetaData {
                last_modified_at: 100,
                created_at: None,
                last_modified_by: None,
            },
        })
    }

    #[test]
    fn test_max_revision() {
        assert_eq!(resolve_max_revision(&[1]).unwrap(), 1);
        assert_eq!(resolve_max_revision(&[3, 5, 4]).unwrap(), 5);
        assert_eq!(resolve_max_revision(&[0, 0]).unwrap(), 0);
        assert_eq!(resolve_max_revision(&[12, 2, 9, 11]).unwrap(), 12);
    }

    #[test]
    fn test_max_revision_empty_set_fails() {
        assert!(matches!(
            resolve_max_revision(&[]),
            Err(SyncError::InvalidRevisionSet)
        ));
    }

    #[test]
    fn test_push_plan_for_missing_proxy() {
        for update in [true, false] {
            let plan = resolve_push_plan(&MetadataProbe::NotFound, update).unwrap();
            assert_eq!(plan, PushPlan::ImportFresh);
            assert_eq!(plan.target_revision(), 1);
            assert!(plan.is_import());
        }
    }

    #[test]
    fn test_push_plan_update_uses_current_revision() {
        let plan = resolve_push_plan(&found(vec![3, 5, 4]), true).unwrap();
        assert_eq!(plan, PushPlan::Update(5));
        assert!(!plan.is_import());
    }

    #[test]
    fn test_push_plan_import_uses_next_revision() {
        let plan = resolve_push_plan(&found(vec![3, 5, 4]), false).unwrap();
        assert_eq!(plan, PushPlan::Import(6));
        assert_eq!(plan.target_revision(), 6);
    }

    #[test]
    fn test_push_plan_import_past_last_revision_fails() {
        assert!(matches!(
            resolve_push_plan(&found(vec![7, u32::MAX]), false),
            Err(SyncError::RevisionOverflow { revision: u32::MAX })
        ));
        assert_eq!(
            resolve_push_plan(&found(vec![u32::MAX]), true).unwrap(),
            PushPlan::Update(u32::MAX)
        );
    }

    #[test]
    fn test_push_plan_empty_revisions_fails() {
        assert!(matches!(
            resolve_push_plan(&found(vec![]), false),
            Err(SyncError::InvalidRevisionSet)
        ));
    }
}

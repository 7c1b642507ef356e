//! Tenant scope resolution
//!
//! One pure function shared by the validator and the committer, so preview
//! and commit can never disagree about which unit a row is allowed to
//! touch.

/// Why a row's unit could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeViolation {
    /// Global batch and the row carries no organization_unit_id
    MissingUnit,
    /// Row names a unit other than the batch's unit
    UnitMismatch { batch_unit: i64, row_unit: i64 },
}

/// Resolve the unit a row operates under.
///
/// Unit-scoped batch: the batch's unit applies; a row unit that disagrees
/// is a violation (a row must not escalate into another unit). Global
/// batch: the row must name its own unit.
pub fn resolve_effective_unit(
    batch_unit: Option<i64>,
    row_unit: Option<i64>,
) -> Result<i64, ScopeViolation> {
    match (batch_unit, row_unit) {
        (Some(batch), Some(row)) if batch != row => Err(ScopeViolation::UnitMismatch {
            batch_unit: batch,
            row_unit: row,
        }),
        (Some(batch), _) => Ok(batch),
        (None, Some(row)) => Ok(row),
        (None, None) => Err(ScopeViolation::MissingUnit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_scoped_batch_defaults_rows_to_batch_unit() {
        assert_eq!(resolve_effective_unit(Some(5), None), Ok(5));
        assert_eq!(resolve_effective_unit(Some(5), Some(5)), Ok(5));
    }

    #[test]
    fn row_cannot_escalate_to_another_unit() {
        assert_eq!(
            resolve_effective_unit(Some(5), Some(7)),
            Err(ScopeViolation::UnitMismatch {
                batch_unit: 5,
                row_unit: 7
            })
        );
    }

    #[test]
    fn global_batch_requires_row_unit() {
        assert_eq!(resolve_effective_unit(None, Some(9)), Ok(9));
        assert_eq!(
            resolve_effective_unit(None, None),
            Err(ScopeViolation::MissingUnit)
        );
    }
}

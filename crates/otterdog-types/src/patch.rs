use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PatchType {
    Add,
    Change,
    Remove,
}

/// Counters the planner accumulates across one reconciliation pass.
/// `extras` is REMOVE patches suppressed (not executed); `removed` is REMOVE
/// patches actually executed under `--delete-extras`. A Remove patch falls
/// into exactly one of the two, never both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStatus {
    pub additions: usize,
    pub differences: usize,
    pub extras: usize,
    pub removed: usize,
}

impl DiffStatus {
    pub fn is_empty(&self) -> bool {
        self.additions == 0 && self.differences == 0 && self.extras == 0 && self.removed == 0
    }

    pub fn record(&mut self, patch_type: PatchType, counted_as_extra: bool) {
        if counted_as_extra {
            self.extras += 1;
            return;
        }
        match patch_type {
            PatchType::Add => self.additions += 1,
            PatchType::Change => self.differences += 1,
            PatchType::Remove => self.removed += 1,
        }
    }

    /// The single user-facing summary line, in the two registers a run uses:
    /// dry-run ("Plan: ...") and executed ("Executed plan: ...").
    pub fn summary_line(&self, executed: bool) -> String {
        if executed {
            format!(
                "Executed plan: {} added, {} changed, {} removed, {} ignored.",
                self.additions, self.differences, self.removed, self.extras
            )
        } else {
            format!(
                "Plan: {} to add, {} to change, {} to remove, {} to ignore.",
                self.additions, self.differences, self.removed, self.extras
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_op_status_is_empty() {
        assert!(DiffStatus::default().is_empty());
    }

    #[test]
    fn record_counts_suppressed_removes_as_extras() {
        let mut status = DiffStatus::default();
        status.record(PatchType::Add, false);
        status.record(PatchType::Change, false);
        status.record(PatchType::Remove, true);
        assert_eq!(
            status,
            DiffStatus {
                additions: 1,
                differences: 1,
                extras: 1,
                removed: 0,
            }
        );
    }

    #[test]
    fn record_counts_executed_removes_separately_from_extras() {
        let mut status = DiffStatus::default();
        status.record(PatchType::Remove, false);
        assert_eq!(
            status,
            DiffStatus {
                additions: 0,
                differences: 0,
                extras: 0,
                removed: 1,
            }
        );
    }

    #[test]
    fn summary_line_matches_the_expected_phrasing() {
        let status = DiffStatus {
            additions: 2,
            differences: 1,
            extras: 3,
            removed: 4,
        };
        assert_eq!(
            status.summary_line(false),
            "Plan: 2 to add, 1 to change, 4 to remove, 3 to ignore."
        );
        assert_eq!(
            status.summary_line(true),
            "Executed plan: 2 added, 1 changed, 4 removed, 3 ignored."
        );
    }
}

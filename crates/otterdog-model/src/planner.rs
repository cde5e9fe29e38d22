//! Glues Loader, Validator, and Differ into the three run modes the CLI and
//! the webhook service both drive: `plan`, `local-plan`, `apply`.

use otterdog_provider::Provider;
use otterdog_types::{DiffStatus, OtterdogError, PatchType, Result, ValidationContext};

use crate::differ::{generate_patches, LivePatch};
use crate::model::Organization;
use crate::validator::validate_organization;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerMode {
    Plan,
    LocalPlan,
    Apply,
}

impl PlannerMode {
    fn executed(self) -> bool {
        matches!(self, PlannerMode::Apply)
    }
}

/// What one reconciliation pass produced, regardless of mode.
pub struct RunOutcome {
    pub status: DiffStatus,
    pub patches: Vec<LivePatch>,
    pub validation: ValidationContext,
}

impl RunOutcome {
    pub fn summary_line(&self, mode: PlannerMode) -> String {
        self.status.summary_line(mode.executed())
    }
}

/// `callback(org_id, diff_status, patches)` runs once: before execution for
/// `plan`/`local-plan`, after execution for `apply`. The webhook service
/// uses it to inspect `LivePatch::requires_secrets()` before logging.
type Callback<'a> = dyn Fn(&str, &DiffStatus, &[LivePatch]) + 'a;

#[derive(Default)]
pub struct Planner<'a> {
    delete_extras: bool,
    callback: Option<Box<Callback<'a>>>,
}

impl<'a> Planner<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delete_extras(mut self, delete_extras: bool) -> Self {
        self.delete_extras = delete_extras;
        self
    }

    pub fn with_callback(mut self, callback: impl Fn(&str, &DiffStatus, &[LivePatch]) + 'a) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    fn counted_as_extra(&self, patch: &LivePatch) -> bool {
        patch.patch_type == PatchType::Remove && !self.delete_extras
    }

    /// `plan` and `local-plan` differ only in where `current` came from
    /// (a fresh provider read vs. an on-disk snapshot) — both stop here,
    /// no writes.
    pub fn plan(&self, org_id: &str, expected: &Organization, current: &Organization) -> RunOutcome {
        let mut validation = ValidationContext::new();
        validate_organization(expected, &mut validation);

        let patches = generate_patches(expected, current);
        let mut status = DiffStatus::default();
        for patch in &patches {
            status.record(patch.patch_type, self.counted_as_extra(patch));
        }

        if let Some(callback) = &self.callback {
            callback(org_id, &status, &patches);
        }

        RunOutcome {
            status,
            patches,
            validation,
        }
    }

    /// Plans, then executes every non-extra patch in the order the Differ
    /// produced. Halts before touching the provider if validation raised
    /// any ERROR.
    pub fn apply(
        &self,
        org_id: &str,
        expected: &Organization,
        current: &Organization,
        provider: &dyn Provider,
    ) -> Result<RunOutcome> {
        let mut validation = ValidationContext::new();
        validate_organization(expected, &mut validation);
        if validation.has_errors() {
            return Err(OtterdogError::ValidationBlocked {
                error_count: validation.error_count(),
            });
        }

        let patches = generate_patches(expected, current);
        let mut status = DiffStatus::default();
        for patch in &patches {
            let extra = self.counted_as_extra(patch);
            status.record(patch.patch_type, extra);
            if extra {
                continue;
            }
            patch.apply(org_id, provider)?;
        }

        if let Some(callback) = &self.callback {
            callback(org_id, &status, &patches);
        }

        Ok(RunOutcome {
            status,
            patches,
            validation,
        })
    }
}

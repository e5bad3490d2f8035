//! Removes projects that forward their input unchanged

use crate::optimizer::RewriteRule;
use crate::planner::{LogicalPlan, PlannerResult};

/// An identity Project is replaced by its input.
///
/// Column names are not compared: a Project that only renames is removed.
pub struct ProjectRemove;

impl RewriteRule for ProjectRemove {
    fn name(&self) -> &'static str {
        "ProjectRemove"
    }

    fn apply(&self, plan: &LogicalPlan) -> PlannerResult<Option<LogicalPlan>> {
        match plan {
            LogicalPlan::Project { input, .. } if plan.is_identity_project() => {
                Ok(Some(input.as_ref().clone()))
            }
            _ => Ok(None),
        }
    }
}

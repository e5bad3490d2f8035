//! Rewrite rules of the default program

mod aggregate_reduce;
mod arrow_scan;
mod filter_join;
mod project_join;
mod project_remove;

pub use aggregate_reduce::AggregateReduceFunctions;
pub use arrow_scan::{ArrowTableScan, ArrowTableScanFilterProject, ArrowTableScanProjection};
pub use filter_join::FilterIntoJoin;
pub use project_join::ProjectJoinTranspose;
pub use project_remove::ProjectRemove;

use super::program::HepProgram;

/// The rule program every isolate plans with, in application order
pub fn default_program() -> HepProgram {
    HepProgram::new()
        .add_rule(AggregateReduceFunctions)
        .add_rule(FilterIntoJoin)
        .add_rule(ProjectJoinTranspose)
        .add_rule(ProjectRemove)
        .add_rule(ArrowTableScanProjection)
        .add_rule(ArrowTableScan)
        .add_rule(ArrowTableScanFilterProject)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_program_order() {
        assert_eq!(
            default_program().rule_names(),
            vec![
                "AggregateReduceFunctions",
                "FilterIntoJoin",
                "ProjectJoinTranspose",
                "ProjectRemove",
                "ArrowTableScanProjection",
                "ArrowTableScan",
                "ArrowTableScanFilterProject",
            ]
        );
    }
}

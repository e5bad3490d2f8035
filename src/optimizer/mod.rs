//! Heuristic plan optimiser
//!
//! A [`HepProgram`] is an ordered list of [`RewriteRule`]s. The
//! [`HepPlanner`] applies each rule across the whole plan until it stops
//! matching, then moves on to the next.

mod program;
pub mod rules;

pub use program::{HepPlanner, HepProgram, RewriteRule};
pub use rules::default_program;

//! Heuristic rule program
//!
//! Rules run one after another in program order. Each rule is applied over
//! the whole tree, top-down, until a full pass changes nothing or the pass
//! limit is reached.

use crate::observability::Logger;
use crate::planner::{LogicalPlan, PlannerResult};

/// A local rewrite of one plan node
pub trait RewriteRule: Send + Sync {
    /// Stable rule name, used in logs
    fn name(&self) -> &'static str;

    /// Rewrites `plan` if the rule matches at its root.
    ///
    /// Returns `Ok(None)` when the rule does not match or would not change
    /// anything. A rule must never return a plan equal to its input.
    fn apply(&self, plan: &LogicalPlan) -> PlannerResult<Option<LogicalPlan>>;
}

/// Ordered list of rules
pub struct HepProgram {
    rules: Vec<Box<dyn RewriteRule>>,
}

impl HepProgram {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a rule to the program
    pub fn add_rule(mut self, rule: impl RewriteRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for HepProgram {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a [`HepProgram`] over logical plans
pub struct HepPlanner {
    program: HepProgram,
    max_iterations: usize,
}

impl HepPlanner {
    pub fn new(program: HepProgram, max_iterations: usize) -> Self {
        Self {
            program,
            max_iterations: max_iterations.max(1),
        }
    }

    pub fn program(&self) -> &HepProgram {
        &self.program
    }

    /// Applies every rule of the program in order and returns the result
    pub fn find_best_exp(&self, root: LogicalPlan) -> PlannerResult<LogicalPlan> {
        let mut plan = root;

        for rule in &self.program.rules {
            let mut passes = 0;
            loop {
                match rewrite_tree(rule.as_ref(), &plan)? {
                    Some(rewritten) => plan = rewritten,
                    None => break,
                }

                passes += 1;
                if passes >= self.max_iterations {
                    let limit = self.max_iterations.to_string();
                    Logger::warn(
                        "RULE_ITERATION_LIMIT",
                        &[("rule", rule.name()), ("limit", &limit)],
                    );
                    break;
                }
            }

            if passes > 0 && Logger::enabled(crate::observability::Severity::Trace) {
                let passes = passes.to_string();
                Logger::trace("RULE_APPLIED", &[("rule", rule.name()), ("passes", &passes)]);
            }
        }

        Ok(plan)
    }
}

/// One top-down pass. Returns `None` if nothing in the tree changed.
fn rewrite_tree(rule: &dyn RewriteRule, plan: &LogicalPlan) -> PlannerResult<Option<LogicalPlan>> {
    let (node, mut changed) = match rule.apply(plan)? {
        Some(rewritten) => (rewritten, true),
        None => (plan.clone(), false),
    };

    let inputs = node.inputs();
    let mut new_inputs = Vec::with_capacity(inputs.len());
    for input in inputs {
        match rewrite_tree(rule, input)? {
            Some(rewritten) => {
                changed = true;
                new_inputs.push(rewritten);
            }
            None => new_inputs.push(input.clone()),
        }
    }

    if !changed {
        return Ok(None);
    }

    Ok(Some(node.with_inputs(new_inputs)))
}

//! Sequential execution and the solution store
//!
//! The store starts as a copy of the caller's input values (the baseline -
//! seeding records no overwrites). Each step then draws its needs from the
//! store, runs, and merges its declared provides back in. A merge over an
//! already-present name appends the displaced value to that name's overwrite
//! history before replacing it, so data provenance survives duplicate
//! producers and input collisions.

use super::error::{ExecutionError, ExecutionResult};
use crate::core::{Operation, Value, ValueMap};
use crate::plan::Plan;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Overwrite history: for each name written more than once, the displaced
/// values in the order they were displaced.
pub type Overwrites = BTreeMap<String, Vec<Value>>;

/// The outcome of executing a plan: the final value store and the overwrite
/// history accumulated along the way.
///
/// Owned solely by the caller of the execute call that produced it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Solution {
    values: ValueMap,
    overwrites: Overwrites,
}

impl Solution {
    pub(crate) fn new(values: ValueMap, overwrites: Overwrites) -> Self {
        Self { values, overwrites }
    }

    /// Returns the full accumulated value store.
    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    /// Looks up a single value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns the overwrite history.
    pub fn overwrites(&self) -> &Overwrites {
        &self.overwrites
    }

    /// Consumes the solution, returning the value store.
    pub fn into_values(self) -> ValueMap {
        self.values
    }
}

/// Verifies the supplied values cover the plan's required inputs.
pub(crate) fn check_required_inputs(plan: &Plan, values: &ValueMap) -> ExecutionResult<()> {
    let missing: Vec<String> = plan
        .required_inputs()
        .iter()
        .filter(|name| !values.contains_key(*name))
        .cloned()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ExecutionError::missing_inputs(missing))
    }
}

/// Gathers an operation's needs from the store.
///
/// An absent need means the plan's ordering invariant was broken; that is an
/// engine bug, not a user error.
pub(crate) fn gather_inputs(op: &dyn Operation, store: &ValueMap) -> ExecutionResult<ValueMap> {
    let mut inputs = ValueMap::with_capacity(op.needs().len());
    for need in op.needs() {
        match store.get(need) {
            Some(value) => {
                inputs.insert(need.clone(), value.clone());
            }
            None => {
                return Err(ExecutionError::internal(format!(
                    "need '{}' absent from store for operation '{}'",
                    need,
                    op.name()
                )))
            }
        }
    }
    Ok(inputs)
}

/// Merges an operation's produced values into the store, recording
/// overwrites and enforcing the declared contract.
///
/// Only declared provides are merged, in their declared order; undeclared
/// names in the result are dropped with a warning.
pub(crate) fn merge_outputs(
    op: &dyn Operation,
    mut produced: ValueMap,
    store: &mut ValueMap,
    overwrites: &mut Overwrites,
) -> ExecutionResult<()> {
    let missing: Vec<String> = op
        .provides()
        .iter()
        .filter(|name| !produced.contains_key(*name))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ExecutionError::contract_violation(op.name(), missing));
    }

    for name in op.provides() {
        if let Some(value) = produced.remove(name) {
            if let Some(displaced) = store.insert(name.clone(), value) {
                overwrites.entry(name.clone()).or_default().push(displaced);
            }
        }
    }
    if !produced.is_empty() {
        warn!(
            operation = op.name(),
            ignored = produced.len(),
            "ignoring undeclared outputs"
        );
    }
    Ok(())
}

impl Plan {
    /// Executes this plan sequentially against concrete input values.
    ///
    /// Fails with [`ExecutionError::MissingInputs`] when `values` does not
    /// cover [`required_inputs`](Plan::required_inputs). A failing operation
    /// aborts the call atomically: no solution is returned.
    ///
    /// # Example
    ///
    /// ```
    /// use plegma::core::{FnOperation, Value, ValueMap};
    /// use plegma::graph::compose;
    /// use serde_json::json;
    ///
    /// let add = FnOperation::new("add", &["a", "b"], &["sum"], |inputs: &ValueMap| {
    ///     let sum = inputs["a"].as_i64().unwrap() + inputs["b"].as_i64().unwrap();
    ///     Ok(ValueMap::from([("sum".to_string(), json!(sum))]))
    /// });
    ///
    /// let network = compose([add.into_arc()]).unwrap();
    /// let plan = network.compile(["a", "b"], ["sum"]).unwrap();
    ///
    /// let values = ValueMap::from([
    ///     ("a".to_string(), json!(2)),
    ///     ("b".to_string(), json!(3)),
    /// ]);
    /// let solution = plan.execute(&values).unwrap();
    /// assert_eq!(solution.get("sum"), Some(&json!(5)));
    /// ```
    pub fn execute(&self, values: &ValueMap) -> ExecutionResult<Solution> {
        check_required_inputs(self, values)?;

        let mut store = values.clone();
        let mut overwrites = Overwrites::new();

        for op in self.steps() {
            debug!(operation = op.name(), "executing step");
            let inputs = gather_inputs(op.as_ref(), &store)?;
            let produced = op
                .invoke(&inputs)
                .map_err(|source| ExecutionError::operation_failed(op.name(), source))?;
            merge_outputs(op.as_ref(), produced, &mut store, &mut overwrites)?;
        }

        info!(steps = self.len(), values = store.len(), "execution complete");
        Ok(Solution::new(store, overwrites))
    }
}

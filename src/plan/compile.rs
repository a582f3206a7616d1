//! Plan - pruned, ordered execution schedule
//!
//! Compilation runs in three pruning phases followed by an ordering phase:
//!
//! 1. **Backward reachability** from the requested outputs bounds the set of
//!    operations that could possibly contribute to the result.
//! 2. **Forward feasibility** from the given inputs iterates to a fixed
//!    point; a candidate whose needs never all become available is dropped.
//!    Backward reachability alone would admit operations whose *other*
//!    needs are unsatisfiable, so this phase is a correctness requirement.
//! 3. **Backward contribution** repeats the reachability walk restricted to
//!    the runnable set. Phase 2 can orphan a step by dropping its only
//!    consumer; the orphan is runnable but feeds no requested output and
//!    must not survive.
//! 4. **Kahn's algorithm** orders the survivors. The ready frontier is kept
//!    as an ordered set of declaration indices, so ties always resolve to
//!    the earliest-declared operation. This is what makes duplicate-output
//!    races and overwrite histories reproducible.

use super::error::{CompileError, CompileResult};
use crate::core::Operation;
use crate::graph::Network;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// An ordered, dependency-respecting sequence of operations compiled for one
/// specific (inputs, outputs) request shape.
///
/// Immutable once compiled and safe to share across threads; a plan carries
/// no execution state, so the same plan may be executed concurrently.
///
/// Invariant: every step's needs are covered by `required_inputs` or by the
/// provides of a strictly earlier step.
pub struct Plan {
    steps: Vec<Arc<dyn Operation>>,
    required_inputs: BTreeSet<String>,
    provided_outputs: BTreeSet<String>,
}

impl Plan {
    /// Returns the ordered steps of the plan.
    pub fn steps(&self) -> &[Arc<dyn Operation>] {
        &self.steps
    }

    /// Returns the step names in execution order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|op| op.name()).collect()
    }

    /// Returns the number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the plan has no steps (all outputs are pass-through
    /// inputs).
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Input names an execution must supply values for.
    ///
    /// This is the minimal subset of the requested inputs the surviving
    /// steps actually consume, plus requested outputs that are themselves
    /// pass-through inputs.
    pub fn required_inputs(&self) -> &BTreeSet<String> {
        &self.required_inputs
    }

    /// The requested output names this plan delivers.
    pub fn provided_outputs(&self) -> &BTreeSet<String> {
        &self.provided_outputs
    }
}

impl fmt::Debug for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field("steps", &self.step_names())
            .field("required_inputs", &self.required_inputs)
            .field("provided_outputs", &self.provided_outputs)
            .finish()
    }
}

impl Network {
    /// Compiles this network into a [`Plan`] for a concrete request.
    ///
    /// `inputs` names the data slots the caller will supply values for;
    /// `outputs` names the slots the caller wants computed. Fails with
    /// [`CompileError::UnsatisfiableOutputs`] when some requested output has
    /// no producing path from the given inputs.
    ///
    /// # Example
    ///
    /// ```
    /// use plegma::core::{FnOperation, Value, ValueMap};
    /// use plegma::graph::compose;
    ///
    /// let add = FnOperation::new("add", &["a", "b"], &["sum"], |inputs: &ValueMap| {
    ///     let sum = inputs["a"].as_i64().unwrap() + inputs["b"].as_i64().unwrap();
    ///     Ok(ValueMap::from([("sum".to_string(), Value::from(sum))]))
    /// });
    ///
    /// let network = compose([add.into_arc()]).unwrap();
    /// let plan = network.compile(["a", "b"], ["sum"]).unwrap();
    /// assert_eq!(plan.step_names(), vec!["add"]);
    /// ```
    pub fn compile<I, O>(&self, inputs: I, outputs: O) -> CompileResult<Plan>
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        let inputs: BTreeSet<String> = inputs.into_iter().map(Into::into).collect();
        let outputs: BTreeSet<String> = outputs.into_iter().map(Into::into).collect();
        compile(self, &inputs, &outputs)
    }
}

fn compile(network: &Network, inputs: &BTreeSet<String>, outputs: &BTreeSet<String>) -> CompileResult<Plan> {
    let op_count = network.ops.len();

    // Phase 1: backward reachability from the requested outputs.
    let mut candidate = vec![false; op_count];
    let mut visited_data = HashSet::new();
    let mut pending = VecDeque::new();
    for name in outputs {
        // Outputs the caller supplies as inputs are pass-through; no
        // producer needed.
        if inputs.contains(name) {
            continue;
        }
        if let Some(&data_id) = network.names.get(name) {
            if visited_data.insert(data_id) {
                pending.push_back(data_id);
            }
        }
    }
    while let Some(data_id) = pending.pop_front() {
        for &producer in &network.data[data_id.0].producers {
            if candidate[producer.0] {
                continue;
            }
            candidate[producer.0] = true;
            for &need in &network.ops[producer.0].needs {
                let need_name = &network.data[need.0].name;
                if !inputs.contains(need_name) && visited_data.insert(need) {
                    pending.push_back(need);
                }
            }
        }
    }
    debug!(
        candidates = candidate.iter().filter(|&&c| c).count(),
        "backward reachability bounded candidate set"
    );

    // Phase 2: forward feasibility fixed point from the given inputs.
    let mut available: HashSet<&str> = inputs.iter().map(String::as_str).collect();
    let mut runnable = vec![false; op_count];
    loop {
        let mut changed = false;
        for i in 0..op_count {
            if !candidate[i] || runnable[i] {
                continue;
            }
            let node = &network.ops[i];
            let ready = node
                .needs
                .iter()
                .all(|&d| available.contains(network.data[d.0].name.as_str()));
            if ready {
                runnable[i] = true;
                changed = true;
                for &d in &node.provides {
                    available.insert(network.data[d.0].name.as_str());
                }
            }
        }
        if !changed {
            break;
        }
    }
    debug!(
        runnable = runnable.iter().filter(|&&r| r).count(),
        "forward feasibility fixed point"
    );

    // Phase 3: backward contribution over the runnable set. A step whose
    // only consumer was dropped in phase 2 is runnable yet feeds no
    // requested output; walk back from the outputs again, this time over
    // runnable producers only, and keep just the contributors.
    let mut surviving = vec![false; op_count];
    let mut visited_data = HashSet::new();
    let mut pending = VecDeque::new();
    for name in outputs {
        if inputs.contains(name) {
            continue;
        }
        if let Some(&data_id) = network.names.get(name) {
            if visited_data.insert(data_id) {
                pending.push_back(data_id);
            }
        }
    }
    while let Some(data_id) = pending.pop_front() {
        for &producer in &network.data[data_id.0].producers {
            if !runnable[producer.0] || surviving[producer.0] {
                continue;
            }
            surviving[producer.0] = true;
            for &need in &network.ops[producer.0].needs {
                let need_name = &network.data[need.0].name;
                if !inputs.contains(need_name) && visited_data.insert(need) {
                    pending.push_back(need);
                }
            }
        }
    }
    let surviving_count = surviving.iter().filter(|&&s| s).count();
    debug!(surviving = surviving_count, "backward contribution pass");

    // Phase 4: Kahn's algorithm over the survivors, producer before every
    // consumer, ready frontier popped in declaration order.
    let mut in_degree = vec![0usize; op_count];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); op_count];
    let mut edges = HashSet::new();
    for i in 0..op_count {
        if !surviving[i] {
            continue;
        }
        for &d in &network.ops[i].provides {
            for &consumer in &network.data[d.0].consumers {
                if surviving[consumer.0] && edges.insert((i, consumer.0)) {
                    successors[i].push(consumer.0);
                    in_degree[consumer.0] += 1;
                }
            }
        }
    }

    let mut frontier: BTreeSet<usize> = (0..op_count)
        .filter(|&i| surviving[i] && in_degree[i] == 0)
        .collect();
    let mut ordered = Vec::with_capacity(surviving_count);
    while let Some(&i) = frontier.iter().next() {
        frontier.remove(&i);
        ordered.push(i);
        for &succ in &successors[i] {
            in_degree[succ] -= 1;
            if in_degree[succ] == 0 {
                frontier.insert(succ);
            }
        }
    }
    if ordered.len() != surviving_count {
        // Unreachable for networks built by compose(); handled anyway.
        let remaining = (0..op_count)
            .filter(|&i| surviving[i] && !ordered.contains(&i))
            .map(|i| network.ops[i].op.name().to_string())
            .collect();
        return Err(CompileError::cycle(remaining));
    }

    // Verify every requested output is provided by a surviving step or is
    // itself a supplied input.
    let mut produced: HashSet<&str> = HashSet::new();
    for &i in &ordered {
        for &d in &network.ops[i].provides {
            produced.insert(network.data[d.0].name.as_str());
        }
    }
    let unsatisfied: Vec<String> = outputs
        .iter()
        .filter(|name| !produced.contains(name.as_str()) && !inputs.contains(*name))
        .cloned()
        .collect();
    if !unsatisfied.is_empty() {
        return Err(CompileError::unsatisfiable(unsatisfied));
    }

    // Required inputs: needs not covered by an earlier step's provides, plus
    // requested pass-through outputs no step produces.
    let mut provided_so_far: HashSet<&str> = HashSet::new();
    let mut required_inputs = BTreeSet::new();
    for &i in &ordered {
        let node = &network.ops[i];
        for &d in &node.needs {
            let name = network.data[d.0].name.as_str();
            if !provided_so_far.contains(name) {
                required_inputs.insert(name.to_string());
            }
        }
        for &d in &node.provides {
            provided_so_far.insert(network.data[d.0].name.as_str());
        }
    }
    for name in outputs {
        if inputs.contains(name) && !produced.contains(name.as_str()) {
            required_inputs.insert(name.clone());
        }
    }

    let steps: Vec<Arc<dyn Operation>> = ordered
        .iter()
        .map(|&i| Arc::clone(&network.ops[i].op))
        .collect();

    info!(
        steps = steps.len(),
        required_inputs = required_inputs.len(),
        "compiled plan"
    );
    Ok(Plan {
        steps,
        required_inputs,
        provided_outputs: outputs.clone(),
    })
}

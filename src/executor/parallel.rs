//! Parallel plan execution
//!
//! Steps with no transitive data dependency on one another may run
//! concurrently. The executor walks the plan in readiness waves: every step
//! whose predecessors have all completed is dispatched to a blocking worker,
//! the wave is joined, and results are merged strictly in plan order.
//!
//! Plan-order merging is what keeps overwrite histories identical between
//! sequential and parallel runs - wall-clock completion order never leaks
//! into the solution.
//!
//! On the first failure the executor stops scheduling further waves; steps
//! already dispatched in the failing wave run to completion (their bodies
//! are opaque and may have started external side effects), then the failure
//! is reported and no solution is returned.

use super::error::{ExecutionError, ExecutionResult};
use super::execution::{check_required_inputs, gather_inputs, merge_outputs, Overwrites, Solution};
use crate::core::ValueMap;
use crate::plan::Plan;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// How an [`Executor`] schedules the steps of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMethod {
    /// One step at a time, strictly in plan order.
    #[default]
    Sequential,
    /// Independent steps of a readiness wave run concurrently on the
    /// blocking worker pool.
    Parallel,
}

/// Executes a shared [`Plan`] with a configurable scheduling method.
///
/// The executor itself is stateless between runs; every call owns its value
/// store exclusively, so one executor (or one plan) may serve concurrent
/// calls.
///
/// # Example
///
/// ```no_run
/// # async fn demo(plan: std::sync::Arc<plegma::Plan>, values: plegma::core::ValueMap) {
/// use plegma::executor::{ExecutionMethod, Executor};
///
/// let executor = Executor::new(plan).with_method(ExecutionMethod::Parallel);
/// let solution = executor.run(&values).await.unwrap();
/// # }
/// ```
pub struct Executor {
    plan: Arc<Plan>,
    method: ExecutionMethod,
}

impl Executor {
    /// Creates an executor over a compiled plan, sequential by default.
    pub fn new(plan: Arc<Plan>) -> Self {
        Self {
            plan,
            method: ExecutionMethod::Sequential,
        }
    }

    /// Sets the scheduling method.
    pub fn with_method(mut self, method: ExecutionMethod) -> Self {
        self.method = method;
        self
    }

    /// Returns the configured scheduling method.
    pub fn method(&self) -> ExecutionMethod {
        self.method
    }

    /// Returns the plan this executor runs.
    pub fn plan(&self) -> &Arc<Plan> {
        &self.plan
    }

    /// Executes the plan against concrete input values.
    pub async fn run(&self, values: &ValueMap) -> ExecutionResult<Solution> {
        match self.method {
            ExecutionMethod::Sequential => self.plan.execute(values),
            ExecutionMethod::Parallel => run_parallel(&self.plan, values).await,
        }
    }
}

/// Predecessor indices per step.
///
/// A step waits for every earlier step it shares data with: true
/// dependencies (their provides feed its needs) plus anti- and output
/// dependencies (overlapping reads/writes of the same name). The last two
/// keep the store's write order, and therefore the overwrite history,
/// identical to a sequential run.
fn predecessors(plan: &Plan) -> Vec<Vec<usize>> {
    let steps = plan.steps();
    let mut preds = vec![Vec::new(); steps.len()];
    for j in 0..steps.len() {
        let needs_j: HashSet<&str> = steps[j].needs().iter().map(String::as_str).collect();
        let provides_j: HashSet<&str> = steps[j].provides().iter().map(String::as_str).collect();
        for i in 0..j {
            let conflicts = steps[i]
                .provides()
                .iter()
                .any(|name| needs_j.contains(name.as_str()) || provides_j.contains(name.as_str()))
                || steps[i]
                    .needs()
                    .iter()
                    .any(|name| provides_j.contains(name.as_str()));
            if conflicts {
                preds[j].push(i);
            }
        }
    }
    preds
}

async fn run_parallel(plan: &Plan, values: &ValueMap) -> ExecutionResult<Solution> {
    check_required_inputs(plan, values)?;

    let steps = plan.steps();
    let preds = predecessors(plan);
    let mut store = values.clone();
    let mut overwrites = Overwrites::new();
    let mut completed = vec![false; steps.len()];
    let mut done = 0;

    while done < steps.len() {
        // Wave membership and merge order both follow plan order.
        let wave: Vec<usize> = (0..steps.len())
            .filter(|&j| !completed[j] && preds[j].iter().all(|&i| completed[i]))
            .collect();
        if wave.is_empty() {
            return Err(ExecutionError::internal(
                "no runnable steps remain before completion",
            ));
        }
        debug!(wave = wave.len(), "dispatching wave");

        let mut handles = Vec::with_capacity(wave.len());
        for &j in &wave {
            let op = Arc::clone(&steps[j]);
            let inputs = gather_inputs(op.as_ref(), &store)?;
            handles.push(tokio::task::spawn_blocking(move || op.invoke(&inputs)));
        }
        let results = join_all(handles).await;

        for (&j, joined) in wave.iter().zip(results) {
            let op = &steps[j];
            match joined {
                Err(_) => return Err(ExecutionError::task_panic(op.name())),
                Ok(Err(source)) => {
                    return Err(ExecutionError::operation_failed(op.name(), source))
                }
                Ok(Ok(produced)) => {
                    merge_outputs(op.as_ref(), produced, &mut store, &mut overwrites)?;
                    completed[j] = true;
                    done += 1;
                }
            }
        }
    }

    info!(steps = steps.len(), "parallel execution complete");
    Ok(Solution::new(store, overwrites))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FnOperation, Operation};
    use crate::graph::compose;
    use serde_json::json;
    use std::time::{Duration, Instant};

    fn values(pairs: &[(&str, i64)]) -> ValueMap {
        pairs
            .iter()
            .map(|(name, v)| (name.to_string(), json!(v)))
            .collect()
    }

    fn slow_const(name: &str, needs: &[&str], output: &str, value: i64) -> Arc<dyn Operation> {
        let out = output.to_string();
        FnOperation::new(name, needs, &[output], move |_: &ValueMap| {
            std::thread::sleep(Duration::from_millis(100));
            Ok(ValueMap::from([(out.clone(), json!(value))]))
        })
        .into()
    }

    #[tokio::test]
    async fn test_parallel_diamond_matches_sequential() {
        let build = || {
            let left = FnOperation::new("left", &["seed"], &["l"], |inputs: &ValueMap| {
                Ok(ValueMap::from([(
                    "l".to_string(),
                    json!(inputs["seed"].as_i64().unwrap() + 1),
                )]))
            });
            let right = FnOperation::new("right", &["seed"], &["r"], |inputs: &ValueMap| {
                Ok(ValueMap::from([(
                    "r".to_string(),
                    json!(inputs["seed"].as_i64().unwrap() + 2),
                )]))
            });
            let join = FnOperation::new("join", &["l", "r"], &["total"], |inputs: &ValueMap| {
                Ok(ValueMap::from([(
                    "total".to_string(),
                    json!(inputs["l"].as_i64().unwrap() + inputs["r"].as_i64().unwrap()),
                )]))
            });
            compose([left.into_arc(), right.into_arc(), join.into_arc()]).unwrap()
        };

        let plan = Arc::new(build().compile(["seed"], ["total"]).unwrap());
        let inputs = values(&[("seed", 10)]);

        let sequential = plan.execute(&inputs).unwrap();
        let parallel = Executor::new(Arc::clone(&plan))
            .with_method(ExecutionMethod::Parallel)
            .run(&inputs)
            .await
            .unwrap();

        assert_eq!(sequential.values(), parallel.values());
        assert_eq!(parallel.get("total"), Some(&json!(23)));
    }

    #[tokio::test]
    async fn test_parallel_runs_independent_steps_concurrently() {
        let network = compose([
            slow_const("slow_a", &["seed"], "a_out", 1),
            slow_const("slow_b", &["seed"], "b_out", 2),
        ])
        .unwrap();
        let plan = Arc::new(network.compile(["seed"], ["a_out", "b_out"]).unwrap());
        let executor = Executor::new(plan).with_method(ExecutionMethod::Parallel);

        let start = Instant::now();
        let solution = executor.run(&values(&[("seed", 0)])).await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(solution.get("a_out"), Some(&json!(1)));
        assert_eq!(solution.get("b_out"), Some(&json!(2)));
        // Sequential would take ~200ms; allow generous scheduling variance.
        assert!(
            elapsed < Duration::from_millis(190),
            "expected concurrent execution, took {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn test_parallel_overwrite_order_is_declaration_order() {
        let first = FnOperation::new("first_writer", &["seed"], &["z"], |_: &ValueMap| {
            Ok(ValueMap::from([("z".to_string(), json!("first"))]))
        });
        let second = FnOperation::new("second_writer", &["seed"], &["z"], |_: &ValueMap| {
            Ok(ValueMap::from([("z".to_string(), json!("second"))]))
        });
        let network = compose([first.into_arc(), second.into_arc()]).unwrap();
        let plan = Arc::new(network.compile(["seed"], ["z"]).unwrap());
        let executor = Executor::new(plan).with_method(ExecutionMethod::Parallel);

        // Same result on every run, regardless of completion order.
        for _ in 0..10 {
            let solution = executor.run(&values(&[("seed", 0)])).await.unwrap();
            assert_eq!(solution.get("z"), Some(&json!("second")));
            assert_eq!(solution.overwrites()["z"], vec![json!("first")]);
        }
    }

    #[tokio::test]
    async fn test_parallel_failure_aborts() {
        let ok = FnOperation::new("ok", &["seed"], &["fine"], |_: &ValueMap| {
            Ok(ValueMap::from([("fine".to_string(), json!(1))]))
        });
        let boom = FnOperation::new("boom", &["seed"], &["broken"], |_: &ValueMap| {
            Err("network gremlins".to_string().into())
        });
        let network = compose([ok.into_arc(), boom.into_arc()]).unwrap();
        let plan = Arc::new(network.compile(["seed"], ["fine", "broken"]).unwrap());
        let executor = Executor::new(plan).with_method(ExecutionMethod::Parallel);

        let err = executor.run(&values(&[("seed", 0)])).await.unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::OperationFailed { operation, .. } if operation == "boom"
        ));
    }

    #[tokio::test]
    async fn test_parallel_panic_surfaces_as_task_panic() {
        let panicky = FnOperation::new("panicky", &["seed"], &["out"], |_: &ValueMap| {
            panic!("unexpected")
        });
        let network = compose([panicky.into_arc()]).unwrap();
        let plan = Arc::new(network.compile(["seed"], ["out"]).unwrap());
        let executor = Executor::new(plan).with_method(ExecutionMethod::Parallel);

        let err = executor.run(&values(&[("seed", 0)])).await.unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::TaskPanic { operation } if operation == "panicky"
        ));
    }

    #[tokio::test]
    async fn test_sequential_method_is_default() {
        let network = compose([slow_const("only", &["seed"], "out", 5)]).unwrap();
        let plan = Arc::new(network.compile(["seed"], ["out"]).unwrap());
        let executor = Executor::new(plan);

        assert_eq!(executor.method(), ExecutionMethod::Sequential);
        let solution = executor.run(&values(&[("seed", 0)])).await.unwrap();
        assert_eq!(solution.get("out"), Some(&json!(5)));
    }
}

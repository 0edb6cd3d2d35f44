use serde::Serialize;

use cmdbx_core_types::RequestContext;

use crate::errors::{CoreError, ExError, ExErrorKind, Result};
use crate::model::{Instance, ObjectDefinition};

/// Per-definition unit of work run by `FanOut`
pub trait DefinitionExecutor: Sync {
    type Output: Send;

    /// Operation name used when wrapping a failure
    fn op(&self) -> &'static str;

    /// # Errors
    ///
    /// Whatever the underlying operation fails with; `FanOut` wraps it with
    /// the definition it failed under.
    fn execute(&self, ctx: &RequestContext, def: &ObjectDefinition) -> Result<Self::Output>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOutMode {
    Sequential,
    /// At most `max_workers` definitions in flight at once
    Parallel { max_workers: usize },
}

/// Runs one executor over every resolved definition
///
/// Outputs are returned in resolver order whatever the mode. The first
/// failure (in resolver order) aborts the request; work already done against
/// earlier definitions is not rolled back.
#[derive(Debug, Clone, Copy)]
pub struct FanOut {
    mode: FanOutMode,
}

impl Default for FanOut {
    fn default() -> Self {
        Self::sequential()
    }
}

impl FanOut {
    pub fn sequential() -> Self {
        Self {
            mode: FanOutMode::Sequential,
        }
    }

    pub fn parallel(max_workers: usize) -> Self {
        Self {
            mode: FanOutMode::Parallel {
                max_workers: max_workers.max(1),
            },
        }
    }

    pub fn mode(&self) -> FanOutMode {
        self.mode
    }

    /// # Errors
    ///
    /// The first executor failure, wrapped with its definition, or
    /// `Cancelled` when the request is cancelled between definitions.
    pub fn run<E: DefinitionExecutor>(
        &self,
        ctx: &RequestContext,
        definitions: &[ObjectDefinition],
        executor: &E,
    ) -> Result<Vec<E::Output>> {
        match self.mode {
            FanOutMode::Parallel { max_workers } if definitions.len() > 1 && max_workers > 1 => {
                run_parallel(ctx, definitions, executor, max_workers)
            }
            _ => run_sequential(ctx, definitions, executor),
        }
    }
}

fn cancelled(op: &str) -> ExError {
    CoreError::Cancelled { op: op.to_string() }.into()
}

fn run_sequential<E: DefinitionExecutor>(
    ctx: &RequestContext,
    definitions: &[ObjectDefinition],
    executor: &E,
) -> Result<Vec<E::Output>> {
    let mut outputs = Vec::with_capacity(definitions.len());
    for def in definitions {
        if ctx.is_cancelled() {
            return Err(cancelled(executor.op()));
        }
        let out = executor
            .execute(ctx, def)
            .map_err(|e| e.in_definition(executor.op(), &def.obj_id))?;
        outputs.push(out);
    }
    Ok(outputs)
}

fn run_parallel<E: DefinitionExecutor>(
    ctx: &RequestContext,
    definitions: &[ObjectDefinition],
    executor: &E,
    max_workers: usize,
) -> Result<Vec<E::Output>> {
    // Sibling workers observe this token; the caller's token stays untouched.
    let workers = ctx.child();
    let mut outputs = Vec::with_capacity(definitions.len());

    for batch in definitions.chunks(max_workers) {
        if ctx.is_cancelled() {
            return Err(cancelled(executor.op()));
        }

        let results: Vec<Result<E::Output>> = std::thread::scope(|scope| {
            let handles: Vec<_> = batch
                .iter()
                .map(|def| {
                    let workers = &workers;
                    scope.spawn(move || {
                        let out = executor.execute(workers, def);
                        if out.is_err() {
                            workers.cancel();
                        }
                        out
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| {
                    h.join().unwrap_or_else(|_| {
                        workers.cancel();
                        Err(ExError::from(CoreError::Internal {
                            message: "fan-out worker panicked".to_string(),
                        })
                        .with_op(executor.op()))
                    })
                })
                .collect()
        });

        if let Some(err) = first_failure(ctx, batch, results.iter(), executor.op()) {
            return Err(err);
        }
        outputs.extend(results.into_iter().flatten());
    }

    Ok(outputs)
}

/// First failure in resolver order
///
/// `Cancelled` results caused by a sibling's failure are skipped in favour
/// of the failure that triggered them.
fn first_failure<'r, T: 'r>(
    ctx: &RequestContext,
    batch: &[ObjectDefinition],
    results: impl Iterator<Item = &'r Result<T>>,
    op: &str,
) -> Option<ExError> {
    let failures: Vec<(&ObjectDefinition, &ExError)> = batch
        .iter()
        .zip(results)
        .filter_map(|(def, r)| r.as_ref().err().map(|e| (def, e)))
        .collect();

    let (def, err) = if ctx.is_cancelled() {
        failures.first().copied()?
    } else {
        failures
            .iter()
            .find(|(_, e)| e.kind() != ExErrorKind::Cancelled)
            .or_else(|| failures.first())
            .copied()?
    };
    Some(err.clone().in_definition(op, &def.obj_id))
}

/// Aggregate search response: total count plus concatenated instances
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResult {
    pub count: u64,
    pub info: Vec<Instance>,
}

impl SearchResult {
    /// Sum counts and concatenate pages in resolver order
    pub fn merge(parts: Vec<(u64, Vec<Instance>)>) -> Self {
        parts
            .into_iter()
            .fold(Self::default(), |mut acc, (count, info)| {
                acc.count += count;
                acc.info.extend(info);
                acc
            })
    }
}

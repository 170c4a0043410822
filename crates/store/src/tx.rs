//! Transaction manager with compensating rollback.
//!
//! Sequences operations as a unit. There is no store-level atomicity behind
//! this: rollbacks are application-level compensating actions, invoked in
//! reverse order, best-effort. The manager guarantees the attempt and the
//! ordering, nothing stronger — callers needing true atomicity must use a
//! store-native primitive instead.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use scribehub_core::DomainResult;

type BoxFuture<T> = Pin<Box<dyn Future<Output = DomainResult<T>> + Send>>;
type ExecuteFn = Box<dyn FnOnce() -> BoxFuture<Value> + Send>;
type RollbackFn = Box<dyn FnOnce() -> BoxFuture<()> + Send>;

/// One step of a transaction: a forward action and an optional compensating
/// action replayed if a later step fails.
pub struct TxOperation {
    label: &'static str,
    execute: ExecuteFn,
    rollback: Option<RollbackFn>,
}

impl TxOperation {
    pub fn new<F, Fut>(label: &'static str, execute: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = DomainResult<Value>> + Send + 'static,
    {
        Self {
            label,
            execute: Box::new(move || Box::pin(execute())),
            rollback: None,
        }
    }

    pub fn with_rollback<F, Fut>(mut self, rollback: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = DomainResult<()>> + Send + 'static,
    {
        self.rollback = Some(Box::new(move || Box::pin(rollback())));
        self
    }
}

/// Execute operations strictly in order, collecting each result.
///
/// On failure of operation *i*: operations `i+1 …` never run, the rollbacks
/// of `i-1 … 0` run in reverse order (a rollback failure is logged and does
/// not stop the walk), and the triggering error is re-raised. Errors here
/// are already domain-typed; anything that is not gets the Transaction code
/// at its origin.
pub async fn execute_transaction(operations: Vec<TxOperation>) -> DomainResult<Vec<Value>> {
    let mut results = Vec::with_capacity(operations.len());
    let mut compensations: Vec<(&'static str, RollbackFn)> = Vec::new();

    for op in operations {
        match (op.execute)().await {
            Ok(value) => {
                results.push(value);
                if let Some(rollback) = op.rollback {
                    compensations.push((op.label, rollback));
                }
            }
            Err(err) => {
                tracing::warn!(
                    operation = op.label,
                    error = %err,
                    completed = compensations.len(),
                    "transaction step failed; compensating"
                );
                for (label, rollback) in compensations.into_iter().rev() {
                    if let Err(rollback_err) = rollback().await {
                        tracing::warn!(
                            operation = label,
                            error = %rollback_err,
                            "rollback failed; continuing compensation walk"
                        );
                    }
                }
                return Err(err);
            }
        }
    }

    Ok(results)
}

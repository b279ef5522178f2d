/*
* Reconciliation engine.
*
* Converges remote vms and disks towards a desired state
* with the fewest remote calls, in a strict sequence:
* every step either completes or stops the pipeline.
* Nothing is rolled back, a later run re-plans from fresh state.
*/

mod create;
mod diff;
mod disk;
mod fingerprint;
pub mod lookup;
mod orchestrator;
mod power;
mod step;

#[cfg(test)]
pub(crate) mod fixtures;

// Reexports
pub use diff::{plan, plan_disks, plan_networks, AttachmentKind, CurrentAttachment, Plan};
pub use fingerprint::{AttachmentKey, Fingerprint, Fingerprinted};
pub use orchestrator::{BootResize, UpdatePlan};
pub use power::{final_transition, requires_power_off, GateDecision, PowerGate, PowerTransition};
pub use step::Step;

use crate::repository::{get_by_id, Repository, XoObject};

use std::future::Future;
use tokio_util::sync::CancellationToken;

// Error Handling
use log::{debug, trace};
use xovm_error::{Cancelled, PreconditionViolation, RepositoryError, StepError, XovmError};

/// Runs reconciliations against one repository.
/// Independent reconcilers can share a repository concurrently.
pub struct Reconciler<'a, R: Repository + ?Sized> {
    repo: &'a R,
    cancel: CancellationToken,
}

impl<'a, R: Repository + ?Sized> Reconciler<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self {
            repo,
            cancel: CancellationToken::new(),
        }
    }
    /// Abort before the next remote call once the token is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn checkpoint(&self, step: Step) -> Result<(), XovmError> {
        if self.cancel.is_cancelled() {
            debug!("cancelled before {}", step);
            return Err(Cancelled {
                step: step.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /*
     * Issue a mutating call.
     * The future is only polled once the cancellation checkpoint passed.
     */
    async fn call<T, F>(&self, step: Step, entity: &str, call: F) -> Result<T, XovmError>
    where
        F: Future<Output = Result<T, RepositoryError>>,
    {
        self.checkpoint(step)?;
        trace!("{} {}", step, entity);
        call.await.map_err(|e| {
            StepError {
                step: step.to_string(),
                entity: entity.to_owned(),
                origin: e,
            }
            .into()
        })
    }

    /*
     * Read a dependency of the change.
     * A missing one is a precondition failure, not a vanished resource.
     */
    async fn resolve<T: XoObject>(&self, id: &str) -> Result<T, XovmError> {
        self.checkpoint(Step::ValidatePreconditions)?;
        match get_by_id::<T, R>(self.repo, id).await {
            Ok(object) => Ok(object),
            Err(RepositoryError::NotFound { .. }) => {
                let message = format!("{} {} not found", T::KIND, id);
                Err(precondition(&message, "Check the referenced identifier."))
            }
            Err(e) => Err(e.into()),
        }
    }
}

pub(crate) fn precondition(msg: &str, help: &str) -> XovmError {
    PreconditionViolation::builder()
        .msg(msg)
        .help(help)
        .build()
        .into()
}

/// Every resource a vm touches must live in the vm pool.
pub(crate) fn ensure_same_pool(what: &str, id: &str, pool: &str, expected: &str) -> Result<(), XovmError> {
    if pool != expected {
        let message = format!("{what} {id} is in pool {pool}, expected pool {expected}");
        return Err(precondition(
            &message,
            "Resources of a vm must all belong to the same pool.",
        ));
    }
    Ok(())
}

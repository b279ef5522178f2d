use bon::bon;
use miette::{Diagnostic, Report};
pub use pipelight_error::{CastError, TomlError};

use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum XovmError {
    ////////////////////////////////
    // Lib native errors
    #[error(transparent)]
    #[diagnostic(transparent)]
    WrapError(#[from] WrapError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    LibError(#[from] LibError),

    ////////////////////////////////
    // Reconciliation
    #[error(transparent)]
    #[diagnostic(transparent)]
    RepositoryError(#[from] RepositoryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    PreconditionViolation(#[from] PreconditionViolation),

    #[error(transparent)]
    #[diagnostic(transparent)]
    PolicyViolation(#[from] PolicyViolation),

    #[error(transparent)]
    #[diagnostic(transparent)]
    StepError(#[from] StepError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Cancelled(#[from] Cancelled),

    #[error(transparent)]
    #[diagnostic(transparent)]
    IncompleteCreation(#[from] IncompleteCreation),

    ////////////////////////////////
    // Type convertion
    #[error(transparent)]
    #[diagnostic(code(serde::error))]
    SerdeError(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(code(toml::error))]
    TomlSerError(#[from] toml::ser::Error),

    #[error(transparent)]
    #[diagnostic(code(xovm::strum::error))]
    StrumError(#[from] strum::ParseError),

    #[error(transparent)]
    #[diagnostic(code(xovm::parse::error))]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    CastError(#[from] CastError),

    #[error(transparent)]
    #[diagnostic(code(xovm::io::error))]
    IoError(#[from] std::io::Error),
}

impl XovmError {
    /// True when a lookup matched zero remote objects.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            XovmError::RepositoryError(RepositoryError::NotFound { .. })
        )
    }
    /// The identity of a vm that exists remotely despite the failure.
    pub fn created_vm_id(&self) -> Option<&str> {
        match self {
            XovmError::IncompleteCreation(e) => Some(&e.vm_id),
            _ => None,
        }
    }
}

/**
Failures reported by the remote object repository.
Carries an explicit discriminant instead of a shared sentinel value.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum RepositoryError {
    #[error("no {kind} matches {filter}")]
    #[diagnostic(code(xovm::repository::not_found))]
    NotFound { kind: String, filter: String },

    #[error("{count} {kind} objects match {filter}")]
    #[diagnostic(
        code(xovm::repository::ambiguous),
        help("Names must be unique in the remote inventory, query by id instead.")
    )]
    Ambiguous {
        kind: String,
        filter: String,
        count: usize,
    },

    #[error("remote call {method} failed: {detail}")]
    #[diagnostic(code(xovm::repository::remote))]
    Remote { method: String, detail: String },

    #[error("couldn't decode {kind} snapshot: {detail}")]
    #[diagnostic(code(xovm::repository::decode))]
    Decode { kind: String, detail: String },
}

impl RepositoryError {
    pub fn remote(method: &str, detail: &str) -> Self {
        Self::Remote {
            method: method.to_owned(),
            detail: detail.to_owned(),
        }
    }
}

/**
A configuration or remote inventory state that forbids the change.
Always raised before any mutating call.
*/
#[derive(Debug, Error, Diagnostic)]
#[error("{}", message)]
#[diagnostic(code(xovm::precondition::error))]
pub struct PreconditionViolation {
    pub message: String,
    #[help]
    pub help: String,
}

#[bon]
impl PreconditionViolation {
    #[builder]
    pub fn new(msg: &str, help: &str) -> Self {
        Self {
            message: msg.to_owned(),
            help: help.to_owned(),
        }
    }
}

/**
The change needs the vm to be powered off
and the caller did not allow it.
*/
#[derive(Debug, Error, Diagnostic)]
#[error("{}", message)]
#[diagnostic(code(xovm::policy::error))]
pub struct PolicyViolation {
    pub message: String,
    #[help]
    pub help: String,
}

#[bon]
impl PolicyViolation {
    #[builder]
    pub fn new(msg: &str, help: &str) -> Self {
        Self {
            message: msg.to_owned(),
            help: help.to_owned(),
        }
    }
}

/**
A mutating remote call rejected by the hypervisor.
The sequence stops at the failing step, nothing is rolled back.
*/
#[derive(Debug, Error, Diagnostic)]
#[error("step {step} failed on {entity}")]
#[diagnostic(
    code(xovm::step::error),
    help("Nothing was rolled back, run the reconciliation again to finish the remaining work.")
)]
pub struct StepError {
    pub step: String,
    pub entity: String,
    #[source]
    #[diagnostic_source]
    pub origin: RepositoryError,
}

#[derive(Debug, Error, Diagnostic)]
#[error("reconciliation cancelled before step {step}")]
#[diagnostic(code(xovm::cancelled))]
pub struct Cancelled {
    pub step: String,
}

/**
The vm exists remotely but a later creation step failed.
*/
#[derive(Debug, Error, Diagnostic)]
#[error("vm {vm_id} was created but its provisioning did not complete")]
#[diagnostic(
    code(xovm::create::incomplete),
    help("Run an update against the created vm to attach the remaining resources and start it.")
)]
pub struct IncompleteCreation {
    pub vm_id: String,
    #[diagnostic_source]
    pub origin: Report,
}

/**
A config error with help higher origin
Can be recursively chained.
*/
#[derive(Debug, Error, Diagnostic)]
#[error("{}", message)]
#[diagnostic(code(xovm::wrap::error))]
pub struct WrapError {
    pub message: String,
    #[diagnostic_source]
    pub origin: Report,
    #[help]
    pub help: String,
}

#[bon]
impl WrapError {
    #[builder]
    pub fn new(msg: &str, help: &str, origin: Report) -> Self {
        Self {
            message: msg.to_owned(),
            help: help.to_owned(),
            origin,
        }
    }
}
/**
A root cause error with no inner origin
*/
#[derive(Debug, Error, Diagnostic)]
#[error("{}", message)]
#[diagnostic(code(xovm::lib::error))]
pub struct LibError {
    pub message: String,
    #[help]
    pub help: String,
}

#[bon]
impl LibError {
    #[builder]
    pub fn new(msg: &str, help: &str) -> Self {
        Self {
            message: msg.to_owned(),
            help: help.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_detected_through_the_umbrella_error() {
        let err: XovmError = RepositoryError::NotFound {
            kind: "VM".to_owned(),
            filter: "{id=abc}".to_owned(),
        }
        .into();
        assert!(err.is_not_found());
        assert_eq!(err.created_vm_id(), None);
    }

    #[test]
    fn incomplete_creation_exposes_the_new_identity() {
        let origin: XovmError = StepError {
            step: "start_vm".to_owned(),
            entity: "vm-1".to_owned(),
            origin: RepositoryError::remote("vm.start", "NO_HOSTS_AVAILABLE"),
        }
        .into();
        let err: XovmError = IncompleteCreation {
            vm_id: "vm-1".to_owned(),
            origin: Report::new(origin),
        }
        .into();
        assert_eq!(err.created_vm_id(), Some("vm-1"));
        assert!(!err.is_not_found());
        // The failing step keeps its own code.
        let inner = err
            .diagnostic_source()
            .and_then(|e| e.code())
            .map(|e| e.to_string());
        assert_eq!(inner, Some("xovm::step::error".to_owned()));
    }

    #[test]
    fn builders_fill_message_and_help() {
        let err = PreconditionViolation::builder()
            .msg("boot disk shrink not allowed")
            .help("Grow the disk instead.")
            .build();
        assert_eq!(err.to_string(), "boot disk shrink not allowed");
        assert_eq!(err.help, "Grow the disk instead.");
    }
}

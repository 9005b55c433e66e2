use tracing::debug;

use crate::domain::{Capabilities, Capability, Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchOutcome {
    Accepted,
    Rejected,
    Unsupported,
}

impl BranchOutcome {
    pub fn counts_as_success(self) -> bool {
        !matches!(self, BranchOutcome::Rejected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchReport {
    pub capability: Capability,
    pub outcome: BranchOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Succeeds when at least one branch succeeded. No branches means failure.
    AnyAccepted,
    /// Succeeds unless a branch was rejected. No branches means success.
    NoneRejected,
}

impl MergePolicy {
    pub fn merge(self, reports: &[BranchReport]) -> bool {
        match self {
            MergePolicy::AnyAccepted => reports
                .iter()
                .any(|report| report.outcome.counts_as_success()),
            MergePolicy::NoneRejected => reports
                .iter()
                .all(|report| report.outcome.counts_as_success()),
        }
    }
}

pub fn dispatch<F>(capabilities: Capabilities, operation: Operation, mut branch: F) -> Vec<BranchReport>
where
    F: FnMut(Capability) -> BranchOutcome,
{
    capabilities
        .iter()
        .map(|capability| {
            let outcome = if capability.supports(operation) {
                branch(capability)
            } else {
                debug!(%capability, ?operation, "operation not supported by backend, skipping request");
                BranchOutcome::Unsupported
            };
            BranchReport {
                capability,
                outcome,
            }
        })
        .collect()
}

//! Primary result of an operation together with the fate of its best-effort writes.

use serde::Serialize;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuxiliaryKind {
    TransactionRecord,
    AuditEvent,
    FileCleanup,
    DependentCleanup,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum AuxiliaryStatus {
    Applied,
    /// Nothing to do (e.g. no stored file to clean up).
    Skipped,
    Failed(String),
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryWrite {
    pub kind: AuxiliaryKind,
    pub status: AuxiliaryStatus,
}

#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub primary: T,
    pub auxiliary: Vec<AuxiliaryWrite>,
}

impl<T> Outcome<T> {
    pub fn new(primary: T) -> Self {
        Self {
            primary,
            auxiliary: Vec::new(),
        }
    }

    pub fn record(&mut self, kind: AuxiliaryKind, status: AuxiliaryStatus) {
        self.auxiliary.push(AuxiliaryWrite { kind, status });
    }

    /// True when no best-effort write failed.
    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn failures(&self) -> impl Iterator<Item = &AuxiliaryWrite> {
        self.auxiliary
            .iter()
            .filter(|w| matches!(w.status, AuxiliaryStatus::Failed(_)))
    }

    pub fn status_of(&self, kind: AuxiliaryKind) -> Option<&AuxiliaryStatus> {
        self.auxiliary
            .iter()
            .find(|w| w.kind == kind)
            .map(|w| &w.status)
    }

    pub fn into_primary(self) -> T {
        self.primary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_are_tracked_apart_from_primary() {
        let mut outcome = Outcome::new(7);
        outcome.record(AuxiliaryKind::TransactionRecord, AuxiliaryStatus::Applied);
        assert!(outcome.is_clean());

        outcome.record(
            AuxiliaryKind::AuditEvent,
            AuxiliaryStatus::Failed("db down".into()),
        );
        assert!(!outcome.is_clean());
        assert_eq!(outcome.failures().count(), 1);
        assert_eq!(
            outcome.status_of(AuxiliaryKind::TransactionRecord),
            Some(&AuxiliaryStatus::Applied)
        );
        assert_eq!(outcome.status_of(AuxiliaryKind::FileCleanup), None);
        assert_eq!(outcome.into_primary(), 7);
    }
}

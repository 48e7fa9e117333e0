//! Cross-reference engine.
//!
//! For every target feature the engine opens a spatial search on the source
//! collection, aggregates the matched source values, and writes the result
//! into the target field when that field is still empty.
//!
//! # Run lifecycle
//!
//! ```text
//! Idle ──► Validating ──► Running ──► Completed
//!               │            │
//!               └──► Failed ◄┘
//! ```
//!
//! Validation resolves both collections and both fields once, before any
//! cursor is opened. All writes of a run share one transaction; any error
//! after validation drops the [`EditSession`] and rolls every write back.
//!
//! # Cursors
//!
//! At most two cursors are open at once: the outer update cursor over the
//! target collection and, per target, an inner read cursor over the source
//! collection. The inner cursor is drained and dropped before the outer one
//! advances. Source and target must be different collections; the update
//! cursor holds its collection exclusively.

use crate::aggregate::AggregateBuilder;
use crate::config::CrossReferenceJob;
use crate::error::{Result, ValidationError, XrefError};
use crate::field::FieldAccessor;
use crate::report::{RunReport, RunStatistics, SelectionSet};
use crate::session::EditSession;
use geoxref_store::{CollectionId, Feature, FeatureStore, QueryFilter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Validating,
    Running,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }

    fn can_enter(self, next: RunState) -> bool {
        match (self, next) {
            (RunState::Idle, RunState::Validating) => true,
            (s, RunState::Validating) if s.is_terminal() => true,
            (RunState::Validating, RunState::Running | RunState::Failed) => true,
            (RunState::Running, RunState::Completed | RunState::Failed) => true,
            _ => false,
        }
    }
}

/// Everything resolved during validation, reused for every target.
struct RunPlan {
    source: CollectionId,
    target: CollectionId,
    source_field: FieldAccessor,
    target_field: FieldAccessor,
}

/// Drives cross-reference runs against a feature store.
///
/// Per-run state (counters, selection, aggregates) lives on the stack of
/// [`run`](Self::run); the engine itself only remembers the lifecycle state.
pub struct CrossReferenceEngine<'s, S: FeatureStore + ?Sized> {
    store: &'s S,
    state: RunState,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'s, S: FeatureStore + ?Sized> CrossReferenceEngine<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            state: RunState::Idle,
            cancel: None,
        }
    }

    /// Check `flag` between target features; once raised the run fails with
    /// [`XrefError::Cancelled`] and its writes are rolled back.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// State after the most recent transition.
    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_enter(next),
            "invalid run transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!(from = ?self.state, to = ?next, "run state transition");
        self.state = next;
    }

    /// Execute one job.
    pub fn run(&mut self, job: &CrossReferenceJob) -> Result<RunReport> {
        let span = tracing::info_span!("xref_run",
            source = %job.source_collection,
            target = %job.target_collection,
            predicate = %job.predicate,
        );
        let _guard = span.enter();

        self.transition(RunState::Validating);
        let plan = match self.validate(job) {
            Ok(plan) => plan,
            Err(err) => {
                tracing::warn!(error = %err, "job validation failed");
                self.transition(RunState::Failed);
                return Err(err);
            }
        };

        self.transition(RunState::Running);
        match self.execute(job, &plan) {
            Ok(report) => {
                tracing::info!(
                    total_targets = report.total_targets,
                    matched = report.statistics.matched_count,
                    modified = report.statistics.modified_count,
                    skipped_geometries = report.skipped_geometries,
                    "cross-reference run completed"
                );
                self.transition(RunState::Completed);
                Ok(report)
            }
            Err(err) => {
                tracing::warn!(error = %err, "cross-reference run failed, writes rolled back");
                self.transition(RunState::Failed);
                Err(err)
            }
        }
    }

    fn validate(&self, job: &CrossReferenceJob) -> Result<RunPlan> {
        let source = self
            .store
            .collection(&job.source_collection)
            .ok_or_else(|| ValidationError::CollectionNotFound(job.source_collection.clone()))?;
        let target = self
            .store
            .collection(&job.target_collection)
            .ok_or_else(|| ValidationError::CollectionNotFound(job.target_collection.clone()))?;

        if source == target {
            return Err(ValidationError::SameCollection(job.target_collection.clone()).into());
        }

        let source_field = FieldAccessor::resolve(self.store, source, &job.source_field)?;
        let target_field = FieldAccessor::resolve_writable(self.store, target, &job.target_field)?;

        Ok(RunPlan {
            source,
            target,
            source_field,
            target_field,
        })
    }

    fn execute(&self, job: &CrossReferenceJob, plan: &RunPlan) -> Result<RunReport> {
        let session = EditSession::begin(self.store)?;

        let mut report = RunReport::default();
        let mut statistics = RunStatistics::default();
        let mut selection = SelectionSet::new();

        {
            let mut targets = self.store.update(plan.target, &QueryFilter::all())?;

            while let Some(mut target) = targets.next_feature()? {
                self.check_cancelled()?;
                report.total_targets += 1;

                let aggregate = match self.collect_matches(job, plan, &target)? {
                    Some(aggregate) => aggregate,
                    None => {
                        report.skipped_geometries += 1;
                        AggregateBuilder::new()
                    }
                };

                let pending = if aggregate.is_empty() {
                    job.fallback_value.clone()
                } else {
                    selection.insert(target.id());
                    statistics.matched_count += 1;
                    aggregate.join(&job.separator)
                };

                if pending.is_empty() || !plan.target_field.is_empty(&target) {
                    continue;
                }

                plan.target_field.write(&mut target, pending);
                targets.update_feature(&target)?;
                statistics.modified_count += 1;
            }
        }

        session.commit()?;

        report.statistics = statistics;
        report.selection = selection;
        Ok(report)
    }

    /// Aggregate source values matching `target`.
    ///
    /// Returns `None` when the target geometry is unusable; the caller treats
    /// that as a zero-match record.
    fn collect_matches(
        &self,
        job: &CrossReferenceJob,
        plan: &RunPlan,
        target: &Feature,
    ) -> Result<Option<AggregateBuilder>> {
        let geometry = match target.geometry() {
            Ok(geometry) => geometry,
            Err(err) => {
                tracing::warn!(
                    feature_id = target.id(),
                    error = %err,
                    "target geometry unusable, treating as no match"
                );
                return Ok(None);
            }
        };

        let filter = QueryFilter::spatial(geometry, job.predicate);
        let mut sources = self.store.search(plan.source, &filter)?;

        let mut aggregate = AggregateBuilder::new();
        while let Some(source) = sources.next_feature()? {
            aggregate.add(&plan.source_field.read(&source));
        }

        tracing::trace!(
            feature_id = target.id(),
            distinct_values = aggregate.len(),
            "collected source matches"
        );
        Ok(Some(aggregate))
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(XrefError::Cancelled),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        assert!(RunState::Idle.can_enter(RunState::Validating));
        assert!(RunState::Validating.can_enter(RunState::Failed));
        assert!(RunState::Running.can_enter(RunState::Completed));
        assert!(RunState::Completed.can_enter(RunState::Validating));
        assert!(RunState::Failed.can_enter(RunState::Validating));

        assert!(!RunState::Idle.can_enter(RunState::Running));
        assert!(!RunState::Validating.can_enter(RunState::Completed));
        assert!(!RunState::Completed.can_enter(RunState::Failed));
    }
}

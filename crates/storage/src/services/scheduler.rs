use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior, interval, timeout};
use tracing::{debug, error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::error::{ChallengeError, Result};
use super::ingestion::{EffortIngestor, IngestOutcome};
use super::resolution::{ChallengeResolver, Resolution};
use crate::gateway::{ChallengeStore, Clock};
use crate::models::{Challenge, ChallengeStatus, Side};

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Time between two sweeps.
    pub interval: Duration,
    /// Upper bound for one sweep. Checked between candidates and while
    /// ingesting; a resolution that has started always finishes.
    pub sweep_timeout: Duration,
    /// Upper bound for a single provider-backed ingestion.
    pub ingest_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            sweep_timeout: Duration::from_secs(50),
            ingest_timeout: Duration::from_secs(15),
        }
    }
}

/// Summary of one sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SweepReport {
    /// Candidates that reached resolution before the sweep deadline
    pub examined: usize,
    pub resolved: usize,
    pub voided: usize,
    pub already_resolved: usize,
    /// Candidates whose resolution failed; they are retried on the next sweep
    pub failed: usize,
    pub timed_out: bool,
}

#[derive(Debug)]
enum IngestAttempt {
    Recorded,
    NoEffort,
    Failed(ChallengeError),
    TimedOut,
}

/// Periodically settles challenges whose window has elapsed.
pub struct ChallengeScheduler {
    challenges: Arc<dyn ChallengeStore>,
    ingestor: Arc<EffortIngestor>,
    resolver: Arc<ChallengeResolver>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
}

impl ChallengeScheduler {
    pub fn new(
        challenges: Arc<dyn ChallengeStore>,
        ingestor: Arc<EffortIngestor>,
        resolver: Arc<ChallengeResolver>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            challenges,
            ingestor,
            resolver,
            clock,
            config,
        }
    }

    pub fn ingestor(&self) -> &EffortIngestor {
        &self.ingestor
    }

    /// Sweep forever on the configured interval. Ticks missed while a slow
    /// sweep is running are skipped rather than replayed.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = self.config.interval.as_secs(),
            "Challenge scheduler started"
        );

        loop {
            ticker.tick().await;
            self.sweep().await;
        }
    }

    /// Settle every expired, unresolved challenge. Failures are logged and
    /// counted, never propagated.
    pub async fn sweep(&self) -> SweepReport {
        let deadline = Instant::now() + self.config.sweep_timeout;
        let now = self.clock.now();
        let mut report = SweepReport::default();

        let candidates = match self.challenges.find_expired_unresolved(now).await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(error = %e, "Failed to load expired challenges");
                return report;
            }
        };

        if candidates.is_empty() {
            debug!("No expired challenges to settle");
            return report;
        }

        for challenge in &candidates {
            if Instant::now() >= deadline {
                report.timed_out = true;
                break;
            }

            self.refresh_efforts(challenge, Some(deadline)).await;

            // Nothing is claimed yet, so an overrun here defers the challenge whole.
            if Instant::now() >= deadline {
                report.timed_out = true;
                break;
            }

            report.examined += 1;
            match self.resolve(challenge.challenge_id).await {
                Ok(Resolution::Won { .. }) | Ok(Resolution::Tied) => report.resolved += 1,
                Ok(Resolution::Voided) => report.voided += 1,
                Ok(Resolution::AlreadyResolved) => report.already_resolved += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(
                        challenge_id = %challenge.challenge_id,
                        error = %e,
                        "Failed to resolve expired challenge"
                    );
                }
            }
        }

        if report.timed_out {
            warn!(
                timeout_secs = self.config.sweep_timeout.as_secs(),
                remaining = candidates.len() - report.examined,
                "Sweep deadline reached, deferring remaining challenges"
            );
        }

        info!(
            found = candidates.len(),
            examined = report.examined,
            resolved = report.resolved,
            voided = report.voided,
            already_resolved = report.already_resolved,
            failed = report.failed,
            "Sweep finished"
        );

        report
    }

    /// One settlement step: refresh the incomplete sides of an accepted
    /// challenge, challengee first, then resolve with whatever data is on
    /// record. Ingestion failures never prevent resolution.
    pub async fn settle(&self, challenge: &Challenge) -> Result<Resolution> {
        self.refresh_efforts(challenge, None).await;
        self.resolve(challenge.challenge_id).await
    }

    async fn refresh_efforts(&self, challenge: &Challenge, deadline: Option<Instant>) {
        if challenge.status == ChallengeStatus::Pending {
            return;
        }

        for side in [Side::Challengee, Side::Challenger] {
            let opponent = challenge.opponent(side);
            if opponent.completed {
                continue;
            }

            let limit = match deadline {
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return;
                    }
                    left.min(self.config.ingest_timeout)
                }
                None => self.config.ingest_timeout,
            };
            self.attempt_ingest(challenge.challenge_id, opponent.id, limit)
                .await;
        }
    }

    /// Resolve on a task of its own, so a dropped caller cannot stop the
    /// resolution between the claiming write and the statistics updates.
    pub async fn resolve(&self, challenge_id: Uuid) -> Result<Resolution> {
        let resolver = Arc::clone(&self.resolver);
        match tokio::spawn(async move { resolver.resolve(challenge_id).await }).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(ChallengeError::Interrupted(challenge_id)),
        }
    }

    async fn attempt_ingest(
        &self,
        challenge_id: Uuid,
        athlete_id: i64,
        limit: Duration,
    ) -> IngestAttempt {
        let attempt = match timeout(limit, self.ingestor.ingest(challenge_id, athlete_id)).await {
            Ok(Ok(ingestion)) => match ingestion.outcome {
                IngestOutcome::Recorded { .. } => IngestAttempt::Recorded,
                IngestOutcome::NoQualifyingEffort => IngestAttempt::NoEffort,
            },
            Ok(Err(e)) => IngestAttempt::Failed(e),
            Err(_) => IngestAttempt::TimedOut,
        };

        match &attempt {
            IngestAttempt::Failed(e) => warn!(
                challenge_id = %challenge_id,
                athlete_id,
                error = %e,
                retryable = e.is_retryable(),
                "Ingestion failed, resolving with the data on record"
            ),
            IngestAttempt::TimedOut => warn!(
                challenge_id = %challenge_id,
                athlete_id,
                timeout_secs = limit.as_secs(),
                "Ingestion timed out, resolving with the data on record"
            ),
            other => debug!(challenge_id = %challenge_id, athlete_id, attempt = ?other, "Ingestion attempt"),
        }

        attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{
        FixedClock, MemoryStore, ScriptedProvider, StatEvent, at, challenge, effort,
    };

    fn scheduler(
        store: Arc<MemoryStore>,
        provider: Arc<ScriptedProvider>,
        config: SchedulerConfig,
    ) -> ChallengeScheduler {
        let clock = Arc::new(FixedClock::at(at(2024, 1, 9, 0, 1, 0)));
        let ingestor = Arc::new(EffortIngestor::new(
            store.clone(),
            store.clone(),
            provider,
            clock.clone(),
        ));
        let resolver = Arc::new(ChallengeResolver::new(
            store.clone(),
            store.clone(),
            clock.clone(),
        ));
        ChallengeScheduler::new(store, ingestor, resolver, clock, config)
    }

    #[tokio::test]
    async fn test_sweep_ingests_and_resolves_elapsed_challenge() {
        let store = Arc::new(MemoryStore::with_fixtures());
        let id = store.put(challenge(ChallengeStatus::Active));
        let provider = Arc::new(ScriptedProvider::with_efforts(
            1,
            vec![effort(1, at(2024, 1, 3, 7, 0, 0), 3600)],
        ));
        provider.set_efforts(2, vec![effort(2, at(2024, 1, 5, 7, 0, 0), 3500)]);

        let report = scheduler(store.clone(), provider.clone(), SchedulerConfig::default())
            .sweep()
            .await;

        assert_eq!(report.examined, 1);
        assert_eq!(report.resolved, 1);
        assert!(!report.timed_out);

        // challengee is refreshed before the challenger
        let athletes: Vec<i64> = provider.calls().iter().map(|c| c.2).collect();
        assert_eq!(athletes, vec![2, 1]);

        let stored = store.get(id).unwrap();
        assert!(stored.expired);
        assert_eq!(stored.winner_id, Some(2));
        assert_eq!(stored.loser_id, Some(1));
        assert!(store.stats().contains(&StatEvent::Win {
            user_id: 2,
            opponent_id: 1
        }));
        assert!(store.stats().contains(&StatEvent::Loss {
            user_id: 1,
            opponent_id: 2
        }));
    }

    #[tokio::test]
    async fn test_pending_challenge_is_voided_without_ingestion() {
        let store = Arc::new(MemoryStore::with_fixtures());
        let id = store.put(challenge(ChallengeStatus::Pending));
        let provider = Arc::new(ScriptedProvider::default());

        let report = scheduler(store.clone(), provider.clone(), SchedulerConfig::default())
            .sweep()
            .await;

        assert_eq!(report.voided, 1);
        assert!(provider.calls().is_empty());
        assert!(store.get(id).is_none());
        assert!(store.stats().is_empty());
    }

    #[tokio::test]
    async fn test_completed_side_is_not_refetched() {
        let store = Arc::new(MemoryStore::with_fixtures());
        let mut c = challenge(ChallengeStatus::Active);
        c.challenger
            .record_effort(&effort(1, at(2024, 1, 3, 7, 0, 0), 3600));
        let id = store.put(c);
        let provider = Arc::new(ScriptedProvider::default());

        scheduler(store.clone(), provider.clone(), SchedulerConfig::default())
            .sweep()
            .await;

        let athletes: Vec<i64> = provider.calls().iter().map(|c| c.2).collect();
        assert_eq!(athletes, vec![2]);
        assert_eq!(store.get(id).unwrap().winner_id, Some(1));
    }

    #[tokio::test]
    async fn test_ingestion_failure_still_resolves() {
        let store = Arc::new(MemoryStore::with_fixtures());
        let id = store.put(challenge(ChallengeStatus::Active));
        let provider = Arc::new(ScriptedProvider::with_efforts(
            1,
            vec![effort(1, at(2024, 1, 3, 7, 0, 0), 3600)],
        ));
        provider.fail_for(2);

        let report = scheduler(store.clone(), provider.clone(), SchedulerConfig::default())
            .sweep()
            .await;

        assert_eq!(report.resolved, 1);
        assert_eq!(provider.calls().len(), 2);
        let stored = store.get(id).unwrap();
        assert_eq!(stored.winner_id, Some(1));
        assert!(!stored.challengee.completed);
    }

    #[tokio::test]
    async fn test_failing_challenge_does_not_abort_batch() {
        let store = Arc::new(MemoryStore::with_fixtures());
        let broken = store.put(challenge(ChallengeStatus::Pending));
        let healthy = store.put(challenge(ChallengeStatus::Pending));
        *store.fail_find_for.lock().unwrap() = Some(broken);
        let provider = Arc::new(ScriptedProvider::default());

        let report = scheduler(store.clone(), provider, SchedulerConfig::default())
            .sweep()
            .await;

        assert_eq!(report.examined, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.voided, 1);
        assert!(store.get(healthy).is_none());
        let broken = store.get(broken).unwrap();
        assert!(!broken.expired);
    }

    #[tokio::test]
    async fn test_open_challenges_are_left_alone() {
        let store = Arc::new(MemoryStore::with_fixtures());
        let mut open = challenge(ChallengeStatus::Active);
        open.expires = at(2024, 1, 12, 23, 59, 59);
        let id = store.put(open);
        let provider = Arc::new(ScriptedProvider::default());

        let report = scheduler(store.clone(), provider.clone(), SchedulerConfig::default())
            .sweep()
            .await;

        assert_eq!(report, SweepReport::default());
        assert!(provider.calls().is_empty());
        assert!(!store.get(id).unwrap().expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_provider_is_bounded() {
        let store = Arc::new(MemoryStore::with_fixtures());
        let id = store.put(challenge(ChallengeStatus::Active));
        let provider = Arc::new(ScriptedProvider::with_efforts(
            1,
            vec![effort(1, at(2024, 1, 3, 7, 0, 0), 3600)],
        ));
        provider.hang_for(2);

        let report = scheduler(store.clone(), provider.clone(), SchedulerConfig::default())
            .sweep()
            .await;

        assert_eq!(report.resolved, 1);
        assert!(!report.timed_out);
        assert_eq!(store.get(id).unwrap().winner_id, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_deadline_defers_remaining_work() {
        let store = Arc::new(MemoryStore::with_fixtures());
        let id = store.put(challenge(ChallengeStatus::Active));
        let provider = Arc::new(ScriptedProvider::default());
        provider.hang_for(1);
        provider.hang_for(2);

        let config = SchedulerConfig {
            sweep_timeout: Duration::from_secs(20),
            ..SchedulerConfig::default()
        };
        let report = scheduler(store.clone(), provider, config).sweep().await;

        assert!(report.timed_out);
        assert_eq!(report.resolved, 0);
        assert_eq!(report.examined, 0);
        assert!(!store.get(id).unwrap().expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_started_resolution_outlives_sweep_deadline() {
        let store = Arc::new(MemoryStore::with_fixtures());
        for _ in 0..2 {
            let mut c = challenge(ChallengeStatus::Active);
            c.challenger
                .record_effort(&effort(1, at(2024, 1, 3, 7, 0, 0), 3600));
            c.challengee
                .record_effort(&effort(2, at(2024, 1, 5, 7, 0, 0), 3700));
            store.put(c);
        }
        *store.stats_delay.lock().unwrap() = Some(Duration::from_secs(60));
        let provider = Arc::new(ScriptedProvider::default());

        let config = SchedulerConfig {
            sweep_timeout: Duration::from_secs(20),
            ..SchedulerConfig::default()
        };
        let report = scheduler(store.clone(), provider, config).sweep().await;

        // the first resolution runs to the end, the second challenge waits
        assert!(report.timed_out);
        assert_eq!(report.examined, 1);
        assert_eq!(report.resolved, 1);
        assert_eq!(report.failed, 0);

        let finalized: Vec<Challenge> = store
            .challenges
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.expired)
            .cloned()
            .collect();
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized[0].winner_id, Some(1));
        assert_eq!(
            store.stats(),
            vec![
                StatEvent::Win {
                    user_id: 1,
                    opponent_id: 2
                },
                StatEvent::Loss {
                    user_id: 2,
                    opponent_id: 1
                },
                StatEvent::Segment {
                    user_id: 1,
                    segment_id: 42
                },
                StatEvent::Segment {
                    user_id: 2,
                    segment_id: 42
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_sweep_does_not_cut_resolution_short() {
        let store = Arc::new(MemoryStore::with_fixtures());
        let mut c = challenge(ChallengeStatus::Active);
        c.challenger
            .record_effort(&effort(1, at(2024, 1, 3, 7, 0, 0), 3600));
        let id = store.put(c);
        *store.stats_delay.lock().unwrap() = Some(Duration::from_secs(60));
        let scheduler = scheduler(
            store.clone(),
            Arc::new(ScriptedProvider::default()),
            SchedulerConfig::default(),
        );

        let cut = timeout(Duration::from_secs(5), scheduler.sweep()).await;
        assert!(cut.is_err());

        tokio::time::sleep(Duration::from_secs(600)).await;

        assert!(store.get(id).unwrap().expired);
        assert_eq!(store.stats().len(), 4);
    }
}

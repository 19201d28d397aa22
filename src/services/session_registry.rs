use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::dto::session_dto::SessionSnapshot;
use crate::error::{Error, Result};
use crate::models::candidate::VerifiedCandidate;
use crate::models::session::SessionStep;
use crate::services::session_service::{FinishOutcome, SessionService, Transition};
use crate::session::SessionMachine;
use crate::timer::{ExpiryCallback, QuizTimer};
use crate::utils::time::now;

struct LiveSession {
    machine: SessionMachine,
    timer: Option<QuizTimer>,
    closed: bool,
    created_at: DateTime<Utc>,
    last_error: Option<String>,
}

impl LiveSession {
    /// Rejects candidate input once the running attempt's countdown has hit zero,
    /// before the expiry transition has been applied.
    fn ensure_time_left(&self) -> Result<()> {
        if self.machine.step() != SessionStep::Quiz {
            return Ok(());
        }
        match &self.timer {
            Some(timer) if timer.remaining() == 0 => Err(Error::TimeExpired),
            _ => Ok(()),
        }
    }
}

/// A live session: its state machine plus the timer of the test in progress.
///
/// Every operation holds the session lock for its whole duration, including
/// store lookups, so timer expiry and candidate actions are serialized.
#[derive(Clone)]
pub struct SessionHandle {
    id: Uuid,
    inner: Arc<Mutex<LiveSession>>,
    service: SessionService,
}

impl SessionHandle {
    fn new(id: Uuid, service: SessionService) -> Self {
        Self {
            id,
            inner: Arc::new(Mutex::new(LiveSession {
                machine: SessionMachine::new(),
                timer: None,
                closed: false,
                created_at: Utc::now(),
                last_error: None,
            })),
            service,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn verify(&self, identity: &str) -> Result<VerifiedCandidate> {
        let mut live = self.lock_open().await?;
        let verified = self.service.verify(&mut live.machine, identity).await?;
        live.timer = None;
        live.last_error = None;
        Ok(verified)
    }

    pub async fn start(&self) -> Result<()> {
        let mut live = self.lock_open().await?;
        let transition = self.service.start(&mut live.machine).await?;
        self.apply(&mut live, transition);
        Ok(())
    }

    pub async fn answer(&self, question_index: usize, option: &str) -> Result<()> {
        let mut live = self.lock_open().await?;
        live.ensure_time_left()?;
        live.machine.answer(question_index, option)
    }

    pub async fn toggle_flag(&self, question_index: usize) -> Result<bool> {
        let mut live = self.lock_open().await?;
        live.ensure_time_left()?;
        live.machine.toggle_flag(question_index)
    }

    pub async fn finish(&self, confirm_unanswered: bool) -> Result<FinishOutcome> {
        let mut live = self.lock_open().await?;
        let outcome = self.service.finish(&mut live.machine, confirm_unanswered)?;
        if let FinishOutcome::Finished(_) = outcome {
            if let Some(timer) = live.timer.as_mut() {
                timer.stop();
            }
        }
        Ok(outcome)
    }

    pub async fn next(&self) -> Result<()> {
        let mut live = self.lock_open().await?;
        let transition = self.service.next(&mut live.machine).await?;
        self.apply(&mut live, transition);
        Ok(())
    }

    pub async fn reset(&self) -> Result<()> {
        let mut live = self.lock_open().await?;
        live.timer = None;
        live.last_error = None;
        live.machine.reset();
        tracing::info!(session_id = %self.id, "Session reset");
        Ok(())
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let live = self.lock_open().await?;
        Ok(SessionSnapshot::capture(
            self.id,
            live.created_at,
            &live.machine,
            live.timer.as_ref(),
            live.last_error.as_deref(),
        ))
    }

    async fn expire(&self, epoch: u64) -> Result<()> {
        let mut live = self.inner.lock().await;
        if live.closed {
            return Ok(());
        }
        let transition = self.service.expire(&mut live.machine, epoch).await?;
        self.apply(&mut live, transition);
        Ok(())
    }

    async fn completed_before(&self, cutoff: DateTime<Utc>) -> bool {
        let live = self.inner.lock().await;
        matches!(live.machine.completed_at(), Some(at) if at <= cutoff)
    }

    async fn close(&self) {
        let mut live = self.inner.lock().await;
        live.closed = true;
        live.timer = None;
    }

    async fn lock_open(&self) -> Result<MutexGuard<'_, LiveSession>> {
        let live = self.inner.lock().await;
        if live.closed {
            return Err(Error::NotFound(format!("Session {} has been closed", self.id)));
        }
        Ok(live)
    }

    fn apply(&self, live: &mut LiveSession, transition: Transition) {
        match transition {
            Transition::Quiz {
                epoch,
                duration_secs,
            } => {
                let mut timer = QuizTimer::new(duration_secs, self.expiry_callback(epoch));
                timer.start();
                // Replacing the previous timer drops and cancels it.
                live.timer = Some(timer);
                live.last_error = None;
            }
            Transition::Completed => {
                live.timer = None;
                live.last_error = None;
            }
            Transition::Interrupted { reason } => {
                if let Some(timer) = live.timer.as_mut() {
                    timer.stop();
                }
                live.last_error = Some(reason);
            }
            Transition::Unchanged => {}
        }
    }

    fn expiry_callback(&self, epoch: u64) -> ExpiryCallback {
        let id = self.id;
        let inner = Arc::downgrade(&self.inner);
        let service = self.service.clone();
        Arc::new(move || {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let handle = SessionHandle {
                id,
                inner,
                service: service.clone(),
            };
            tokio::spawn(async move {
                if let Err(e) = handle.expire(epoch).await {
                    tracing::error!(session_id = %id, error = %e, "Failed to advance after timer expiry");
                }
            });
        })
    }
}

/// All live sessions of this process, keyed by session id.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
    service: SessionService,
}

impl SessionRegistry {
    pub fn new(service: SessionService) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            service,
        }
    }

    pub async fn create(&self) -> SessionHandle {
        let handle = SessionHandle::new(Uuid::new_v4(), self.service.clone());
        self.sessions
            .write()
            .await
            .insert(handle.id(), handle.clone());
        tracing::info!(session_id = %handle.id(), "Session created");
        handle
    }

    pub async fn get(&self, id: Uuid) -> Result<SessionHandle> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Session {} not found", id)))
    }

    /// Removes the session and cancels its timer.
    pub async fn remove(&self, id: Uuid) -> Result<()> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| Error::NotFound(format!("Session {} not found", id)))?;
        handle.close().await;
        tracing::info!(session_id = %id, "Session closed");
        Ok(())
    }

    /// Closes and removes sessions that completed at least `grace` ago.
    /// Returns how many were removed.
    pub async fn prune_completed(&self, grace: Duration) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(grace)
            .ok()
            .and_then(|grace| now().checked_sub_signed(grace))
        else {
            return 0;
        };
        let handles: Vec<SessionHandle> = self.sessions.read().await.values().cloned().collect();

        let mut expired = Vec::new();
        for handle in handles {
            if handle.completed_before(cutoff).await {
                expired.push(handle);
            }
        }
        if expired.is_empty() {
            return 0;
        }

        let mut sessions = self.sessions.write().await;
        for handle in &expired {
            sessions.remove(&handle.id());
        }
        drop(sessions);

        for handle in &expired {
            handle.close().await;
        }
        tracing::info!(removed = expired.len(), "Pruned completed sessions");
        expired.len()
    }

    /// Runs [`Self::prune_completed`] every `every` until the token is cancelled.
    pub fn spawn_pruner(&self, every: Duration, grace: Duration, shutdown: CancellationToken) {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(every);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = ticks.tick() => {
                        registry.prune_completed(grace).await;
                    }
                }
            }
        });
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

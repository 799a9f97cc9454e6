//! Archive Session: the controller that ties store, scheduler, feed and
//! reconciler together.
//!
//! The session owns the single in-memory working copy of the [`Archive`] and
//! publishes read-only [`SessionSnapshot`]s through a `tokio::sync::watch`
//! channel. Every reconciliation is persisted before it is published.
//!
//! Feed failures never escape [`ArchiveSession::refresh`]; whether the user
//! sees one is decided in a single place (`resolve_failure`). Storage
//! failures do propagate as [`SessionError::Storage`].

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use crate::archive::{
    reconcile, seed_catalog, Archive, ArchiveLimits, Article, ContentBatch, ALL_CATEGORIES,
};
use crate::feed::FeedClient;
use crate::storage::Database;
use crate::sync::{
    classify_failure, is_stale, on_fetch_failure, on_fetch_success, should_attempt_fetch,
    FailureClass, SyncState, DEFAULT_COOLDOWN_MINUTES, DEFAULT_STALENESS_HOURS,
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session has already been started")]
    AlreadyStarted,

    #[error("Cached archive is malformed: {0}")]
    MalformedCache(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// The only failure the presentation layer ever shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("The briefing is unavailable right now. Please try again later.")]
    BriefingUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Uninitialized,
    Loading,
    Ready,
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub archive: Option<Arc<Archive>>,
    /// Nothing is visible yet and a foreground fetch is running.
    pub loading: bool,
    pub refreshing: bool,
    pub last_error: Option<UserError>,
}

/// What startup decided to do after the first publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupPlan {
    /// Cached archive shown; it is stale, so refresh behind it.
    BackgroundSync,
    /// Cached archive shown and fresh enough; no fetch.
    CacheOnly,
    /// No usable cache; seed archive shown, fetch in the foreground.
    ForegroundSync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// User-initiated. Clears any cooldown first.
    Manual,
    Background,
    Foreground,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A non-empty batch was merged.
    Updated { articles: usize },
    /// The feed answered with nothing new; seed and cache were re-merged.
    NoNewContent { articles: usize },
    /// Skipped without a network call.
    CoolingDown { until: DateTime<Utc> },
    /// The fetch failed. `visible` is true when the user is shown an error.
    Failed { class: FailureClass, visible: bool },
}

/// Tunables, normally filled from [`crate::config::Config`].
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub limits: ArchiveLimits,
    pub staleness: Duration,
    pub cooldown: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            limits: ArchiveLimits::default(),
            staleness: Duration::hours(DEFAULT_STALENESS_HOURS),
            cooldown: Duration::minutes(DEFAULT_COOLDOWN_MINUTES),
        }
    }
}

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct ArchiveSession {
    db: Database,
    client: Arc<dyn FeedClient>,
    seed: Vec<Article>,
    settings: SessionSettings,
    clock: Clock,

    started: bool,
    phase: SessionPhase,
    archive: Option<Arc<Archive>>,
    category: String,
    loading: bool,
    refreshing: bool,
    last_error: Option<UserError>,

    tx: watch::Sender<Arc<SessionSnapshot>>,
}

impl ArchiveSession {
    pub fn new(db: Database, client: Arc<dyn FeedClient>, settings: SessionSettings) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(SessionSnapshot::default()));
        Self {
            db,
            client,
            seed: seed_catalog(),
            settings,
            clock: Box::new(Utc::now),
            started: false,
            phase: SessionPhase::Uninitialized,
            archive: None,
            category: ALL_CATEGORIES.to_owned(),
            loading: false,
            refreshing: false,
            last_error: None,
            tx,
        }
    }

    /// Replace the wall clock (tests, replays).
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replace the bundled seed catalog.
    pub fn with_seed(mut self, seed: Vec<Article>) -> Self {
        self.seed = seed;
        self
    }

    // ========================================================================
    // Presentation Surface
    // ========================================================================

    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionSnapshot>> {
        self.tx.subscribe()
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Set the category filter. Stored upper-cased; never touches the store.
    pub fn select_category(&mut self, name: &str) {
        let name = name.trim();
        self.category = if name.is_empty() {
            ALL_CATEGORIES.to_owned()
        } else {
            name.to_uppercase()
        };
    }

    /// Articles under the current category filter, newest first.
    pub fn visible_articles(&self) -> Vec<&Article> {
        match &self.archive {
            Some(archive) => archive.filter_by_category(&self.category),
            None => Vec::new(),
        }
    }

    /// Article at `index` within [`Self::visible_articles`].
    pub fn open_article(&self, index: usize) -> Option<&Article> {
        self.visible_articles().get(index).copied()
    }

    // ========================================================================
    // Startup
    // ========================================================================

    /// Load the cached archive (or seed one) and publish it.
    ///
    /// Runs once per session; a second call fails with
    /// [`SessionError::AlreadyStarted`].
    pub async fn startup(&mut self) -> Result<StartupPlan, SessionError> {
        if self.started {
            return Err(SessionError::AlreadyStarted);
        }
        self.started = true;
        self.phase = SessionPhase::Loading;
        self.publish();

        let now = self.now();
        let state = self.db.load_sync_state().await?;

        match self.read_cached_archive().await {
            Ok(Some(cached)) => {
                self.archive = Some(Arc::new(cached));
                self.phase = SessionPhase::Ready;
                self.publish();

                if is_stale(now, &state, self.settings.staleness) {
                    tracing::info!(last_sync = ?state.last_sync_at, "Cached archive is stale");
                    Ok(StartupPlan::BackgroundSync)
                } else {
                    tracing::info!("Serving cached archive");
                    Ok(StartupPlan::CacheOnly)
                }
            }
            Ok(None) => {
                tracing::info!("No cached archive, starting from seed catalog");
                self.commit_seed_only(state, now).await?;
                Ok(StartupPlan::ForegroundSync)
            }
            Err(SessionError::MalformedCache(e)) => {
                tracing::warn!(error = %e, "Cached archive is malformed, reseeding");
                self.commit_seed_only(state, now).await?;
                Ok(StartupPlan::ForegroundSync)
            }
            Err(e) => Err(e),
        }
    }

    /// [`Self::startup`] followed by whatever refresh it planned.
    pub async fn run_startup(
        &mut self,
    ) -> Result<(StartupPlan, Option<RefreshOutcome>), SessionError> {
        let plan = self.startup().await?;
        let outcome = match plan {
            StartupPlan::CacheOnly => None,
            StartupPlan::BackgroundSync => Some(self.refresh(RefreshTrigger::Background).await?),
            StartupPlan::ForegroundSync => Some(self.refresh(RefreshTrigger::Foreground).await?),
        };
        Ok((plan, outcome))
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    /// Fetch, reconcile, persist and publish.
    ///
    /// `refreshing` and `loading` are released on every return path,
    /// including storage errors.
    pub async fn refresh(&mut self, trigger: RefreshTrigger) -> Result<RefreshOutcome, SessionError> {
        let result = self.refresh_inner(trigger).await;
        if self.refreshing || self.loading {
            self.refreshing = false;
            self.loading = false;
            self.publish();
        }
        result
    }

    async fn refresh_inner(&mut self, trigger: RefreshTrigger) -> Result<RefreshOutcome, SessionError> {
        let now = self.now();
        let mut state = self.db.load_sync_state().await?;

        if trigger == RefreshTrigger::Manual && state.retry_not_before.is_some() {
            tracing::info!("Manual refresh clears cooldown");
            state = state.clear_cooldown();
            self.db.save_sync_state(&state).await?;
        }

        if !should_attempt_fetch(now, &state) {
            let until = state.retry_not_before.unwrap_or(now);
            tracing::info!(%until, ?trigger, "Skipping fetch during cooldown");
            if self.archive_is_empty() {
                self.load_cache_quietly().await?;
            }
            return Ok(RefreshOutcome::CoolingDown { until });
        }

        self.refreshing = true;
        self.loading = trigger == RefreshTrigger::Foreground && self.archive_is_empty();
        self.publish();

        tracing::debug!(?trigger, "Fetching feed batch");
        match self.client.fetch_batch().await {
            Ok(batch) => self.apply_batch(batch, state, now).await,
            Err(err) => {
                let class = classify_failure(&err);
                tracing::warn!(error = %err, ?class, "Feed fetch failed");

                let next = on_fetch_failure(now, &err, state, self.settings.cooldown);
                if next != state {
                    self.db.save_sync_state(&next).await?;
                }
                let visible = self.resolve_failure(next, now).await?;
                Ok(RefreshOutcome::Failed { class, visible })
            }
        }
    }

    async fn apply_batch(
        &mut self,
        batch: ContentBatch,
        state: SyncState,
        now: DateTime<Utc>,
    ) -> Result<RefreshOutcome, SessionError> {
        let fresh = (!batch.is_empty()).then_some(&batch);
        let cached = self.merge_base().await?;
        let merged = reconcile(
            cached.as_deref(),
            &self.seed,
            fresh,
            &self.settings.limits,
            &display_date(now),
        );
        let articles = merged.articles.len();

        self.last_error = None;
        self.commit(merged, on_fetch_success(now, state), now).await?;

        if fresh.is_some() {
            tracing::info!(fetched = batch.articles.len(), articles, "Archive updated");
            Ok(RefreshOutcome::Updated { articles })
        } else {
            tracing::info!(articles, "Feed returned an empty batch");
            Ok(RefreshOutcome::NoNewContent { articles })
        }
    }

    /// Decide what the user sees after a failed fetch.
    ///
    /// Returns true when [`UserError::BriefingUnavailable`] is shown. Any
    /// non-empty archive in the store suppresses the error.
    async fn resolve_failure(
        &mut self,
        state: SyncState,
        now: DateTime<Utc>,
    ) -> Result<bool, SessionError> {
        match self.read_cached_archive().await {
            Ok(Some(cached)) if !cached.is_empty() => {
                tracing::info!(articles = cached.articles.len(), "Suppressing fetch error, cached archive available");
                self.archive = Some(Arc::new(cached));
                self.phase = SessionPhase::Ready;
                self.last_error = None;
                self.publish();
                Ok(false)
            }
            Ok(Some(_)) => {
                tracing::warn!("Cached archive is empty, reporting briefing unavailable");
                self.last_error = Some(UserError::BriefingUnavailable);
                self.publish();
                Ok(true)
            }
            Ok(None) => {
                tracing::info!("No cached archive after failure, falling back to seed catalog");
                self.last_error = None;
                self.commit_seed_only(state, now).await?;
                Ok(false)
            }
            Err(SessionError::MalformedCache(e)) => {
                tracing::warn!(error = %e, "Cached archive unreadable during recovery, reseeding");
                self.last_error = Some(UserError::BriefingUnavailable);
                self.commit_seed_only(state, now).await?;
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn archive_is_empty(&self) -> bool {
        !matches!(&self.archive, Some(a) if !a.is_empty())
    }

    /// Stored archive: `Ok(None)` when absent, `MalformedCache` when unparsable.
    async fn read_cached_archive(&self) -> Result<Option<Archive>, SessionError> {
        match self.db.load_archive_blob().await? {
            Some(blob) => Ok(Some(serde_json::from_str(&blob)?)),
            None => Ok(None),
        }
    }

    /// Archive to merge a batch into: the working copy, or the stored blob
    /// when nothing has been loaded yet. A malformed blob merges as absent.
    async fn merge_base(&self) -> Result<Option<Arc<Archive>>, SessionError> {
        if let Some(archive) = &self.archive {
            return Ok(Some(Arc::clone(archive)));
        }
        match self.read_cached_archive().await {
            Ok(cached) => Ok(cached.map(Arc::new)),
            Err(SessionError::MalformedCache(e)) => {
                tracing::warn!(error = %e, "Cached archive is malformed, merging without it");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Cooldown path: show whatever is cached without reseeding.
    async fn load_cache_quietly(&mut self) -> Result<(), SessionError> {
        match self.read_cached_archive().await {
            Ok(Some(cached)) => {
                self.archive = Some(Arc::new(cached));
                self.phase = SessionPhase::Ready;
                self.publish();
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(SessionError::MalformedCache(e)) => {
                tracing::warn!(error = %e, "Ignoring malformed cached archive during cooldown");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn commit_seed_only(
        &mut self,
        state: SyncState,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        let seeded = reconcile(
            None,
            &self.seed,
            None,
            &self.settings.limits,
            &display_date(now),
        );
        self.commit(seeded, state, now).await
    }

    /// Persist the archive and sync state, then publish.
    ///
    /// Every archive write stamps `last_sync_at`, whether or not a fetch
    /// succeeded.
    async fn commit(
        &mut self,
        archive: Archive,
        state: SyncState,
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        self.db.save_archive(&archive).await?;
        self.db
            .save_sync_state(&SyncState {
                last_sync_at: Some(now),
                ..state
            })
            .await?;

        self.archive = Some(Arc::new(archive));
        self.phase = SessionPhase::Ready;
        self.publish();
        Ok(())
    }

    fn publish(&self) {
        let snapshot = SessionSnapshot {
            phase: self.phase,
            archive: self.archive.clone(),
            loading: self.loading,
            refreshing: self.refreshing,
            last_error: self.last_error,
        };
        self.tx.send_replace(Arc::new(snapshot));
    }
}

/// Wall-clock date as shown in the archive header, e.g. `3/1/2024`.
fn display_date(now: DateTime<Utc>) -> String {
    now.format("%-m/%-d/%Y").to_string()
}

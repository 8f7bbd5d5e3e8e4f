//! Loop controller: owns the session and drives discovery iterations.
//!
//! State machine: Idle -> Running -> Idle. One tokio task runs the loop.
//! `stop()` only clears a flag; the task finishes the iteration in flight and
//! exits at the next boundary. A `start()` that arrives while a stopped loop
//! is still draining flips the flag back and the same task keeps going, so
//! two loops never run at once.
//!
//! Locking:
//! - `session` (async mutex) guards the knowledge base, dedup set, settings
//!   and status. It is held only for short sections and never across an
//!   oracle call or a gesture.
//! - `actuation` serializes gestures so a manual combine cannot interleave
//!   with one issued by the loop.
//! - `slot` (sync mutex) guards the loop task bookkeeping.

pub mod control;

pub use control::{ControlCommand, ControlResponse};

use crate::actuator::Actuator;
use crate::config::AgentConfig;
use crate::dedup::DedupTracker;
use crate::error::{EngineError, EngineResult};
use crate::knowledge::{KnowledgeBase, OutcomeKind, NOTHING};
use crate::oracle::Oracle;
use crate::selector::{self, is_number_name, SelectionFilter};
use crate::settings::{BotSettings, PctOffset};
use crate::storage::KeyValueStore;
use crate::surface::{HostSurface, Point, Viewport};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard as StdMutexGuard};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Entries kept in the recent-combinations log.
pub const RECENT_CAPACITY: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentCombination {
    pub at: DateTime<Utc>,
    pub entry: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub running: bool,
    /// Non-numeric names the host shows right now, not knowledge-base size.
    pub item_count: usize,
    pub tried_pair_count: usize,
    pub iterations: u64,
    pub current_action: String,
    pub recent: Vec<RecentCombination>,
}

/// What one loop iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// Nothing eligible to select.
    Idle,
    Queried {
        a: String,
        b: String,
        kind: OutcomeKind,
        actuated: bool,
    },
}

/// Mutable state of one discovery session.
struct Session {
    kb: KnowledgeBase,
    dedup: DedupTracker,
    settings: BotSettings,
    recent: VecDeque<RecentCombination>,
    iterations: u64,
    current_action: String,
    rng: StdRng,
}

impl Session {
    fn set_action(&mut self, action: impl Into<String>) {
        self.current_action = action.into();
        debug!("[Engine] {}", self.current_action);
    }

    fn push_recent(&mut self, entry: String) {
        info!("[Engine] {}", entry);
        if self.recent.len() == RECENT_CAPACITY {
            self.recent.pop_front();
        }
        self.recent.push_back(RecentCombination {
            at: Utc::now(),
            entry,
        });
    }

    fn filter(&self, config: &AgentConfig) -> SelectionFilter {
        SelectionFilter::from_config(&config.selection, self.settings.restricted.clone())
    }
}

#[derive(Default)]
struct LoopSlot {
    /// A loop task exists and has not passed its exit check.
    active: bool,
    handle: Option<JoinHandle<()>>,
}

struct EngineInner {
    config: AgentConfig,
    store: Arc<dyn KeyValueStore>,
    oracle: Arc<dyn Oracle>,
    host: Arc<dyn HostSurface>,
    running: AtomicBool,
    slot: StdMutex<LoopSlot>,
    session: Mutex<Session>,
    actuation: Mutex<()>,
}

/// Cheap to clone; all clones drive the same session.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Load persisted state from `store` and build an idle engine.
    pub fn new(
        config: AgentConfig,
        store: Arc<dyn KeyValueStore>,
        oracle: Arc<dyn Oracle>,
        host: Arc<dyn HostSurface>,
    ) -> EngineResult<Self> {
        config.validate()?;
        let kb = KnowledgeBase::load(store.as_ref())?;
        let dedup = DedupTracker::load(store.as_ref())?;
        let settings = BotSettings::load(store.as_ref())?;
        let rng = match config.loop_config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        info!(
            "[Engine] loaded {} items and {} tried pairs",
            kb.len(),
            dedup.len()
        );

        let session = Session {
            kb,
            dedup,
            settings,
            recent: VecDeque::with_capacity(RECENT_CAPACITY),
            iterations: 0,
            current_action: "Idle".to_string(),
            rng,
        };
        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                store,
                oracle,
                host,
                running: AtomicBool::new(false),
                slot: StdMutex::new(LoopSlot::default()),
                session: Mutex::new(session),
                actuation: Mutex::new(()),
            }),
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.inner.config
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Start the discovery loop. Returns false if it was already running.
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        let mut slot = self.inner.lock_slot();
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return false;
        }
        if slot.active {
            info!("[Engine] resuming loop that was still finishing its last iteration");
            return true;
        }
        slot.active = true;
        let inner = Arc::clone(&self.inner);
        slot.handle = Some(tokio::spawn(run_loop(inner)));
        info!("[Engine] discovery started");
        true
    }

    /// Request a stop. The iteration in flight completes first. Returns false
    /// if the loop was not running.
    pub fn stop(&self) -> bool {
        let was_running = self.inner.running.swap(false, Ordering::SeqCst);
        if was_running {
            info!("[Engine] stop requested");
        }
        was_running
    }

    /// Wait for the current loop task, if any, to exit.
    pub async fn wait(&self) {
        let handle = self.inner.lock_slot().handle.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("[Engine] loop task failed: {}", e);
            }
        }
    }

    pub async fn status(&self) -> EngineStatus {
        let item_count = self.elements().await.len();
        let session = self.inner.session.lock().await;
        EngineStatus {
            running: self.is_running(),
            item_count,
            tried_pair_count: session.dedup.len(),
            iterations: session.iterations,
            current_action: session.current_action.clone(),
            recent: session.recent.iter().cloned().collect(),
        }
    }

    /// Snapshot of the knowledge base.
    pub async fn knowledge(&self) -> KnowledgeBase {
        self.inner.session.lock().await.kb.clone()
    }

    pub async fn has_tried(&self, a: &str, b: &str) -> bool {
        self.inner.session.lock().await.dedup.has_tried(a, b)
    }

    pub async fn settings(&self) -> BotSettings {
        self.inner.session.lock().await.settings.clone()
    }

    /// Prepare the session and run a single iteration outside the loop.
    pub async fn step(&self) -> EngineResult<IterationOutcome> {
        self.inner.prepare_session().await?;
        let result = self.inner.iteration().await;
        if !matches!(result, Ok(IterationOutcome::Idle)) {
            self.inner.count_attempt().await;
        }
        result
    }

    pub async fn place(&self, name: &str) -> EngineResult<Point> {
        let inner = &self.inner;
        let _gesture = inner.actuation.lock().await;
        let settings = inner.begin_action(format!("Place: {}", name)).await;
        let actuator = Actuator::new(inner.host.as_ref(), &settings, &inner.config.actuation);
        let result = actuator.place(name).await;
        inner.end_action().await;
        result
    }

    pub async fn combine(&self, a: &str, b: &str) -> EngineResult<Point> {
        let inner = &self.inner;
        let _gesture = inner.actuation.lock().await;
        let settings = inner.begin_action(format!("Combine: {} + {}", a, b)).await;
        let actuator = Actuator::new(inner.host.as_ref(), &settings, &inner.config.actuation);
        let result = actuator.combine(a, b).await;
        inner.end_action().await;
        result
    }

    /// Capture a click on an item and store the pickup offset.
    pub async fn calibrate_pickup(&self) -> EngineResult<Option<PctOffset>> {
        self.calibrate(true).await
    }

    /// Capture a click on the canvas and store the drop offset.
    pub async fn calibrate_drop(&self) -> EngineResult<Option<PctOffset>> {
        self.calibrate(false).await
    }

    async fn calibrate(&self, pickup: bool) -> EngineResult<Option<PctOffset>> {
        let inner = &self.inner;
        let _gesture = inner.actuation.lock().await;
        let settings = inner.session.lock().await.settings.clone();
        let actuator = Actuator::new(inner.host.as_ref(), &settings, &inner.config.actuation);
        let offset = if pickup {
            actuator.calibrate_pickup().await?
        } else {
            actuator.calibrate_drop().await?
        };
        let Some(offset) = offset else {
            return Ok(None);
        };

        let mut session = inner.session.lock().await;
        if pickup {
            session.settings.pickup_offset = Some(offset);
        } else {
            session.settings.drop_offset = Some(offset);
        }
        session.settings.save(inner.store.as_ref())?;
        Ok(Some(offset))
    }

    pub async fn add_restricted(&self, name: &str) -> EngineResult<Vec<String>> {
        let mut session = self.inner.session.lock().await;
        if session.settings.add_restricted(name)? {
            session.settings.save(self.inner.store.as_ref())?;
        }
        Ok(session.settings.restricted.clone())
    }

    pub async fn remove_restricted(&self, name: &str) -> EngineResult<Vec<String>> {
        let mut session = self.inner.session.lock().await;
        if session.settings.remove_restricted(name)? {
            session.settings.save(self.inner.store.as_ref())?;
        }
        Ok(session.settings.restricted.clone())
    }

    pub async fn restricted(&self) -> Vec<String> {
        self.inner.session.lock().await.settings.restricted.clone()
    }

    pub async fn set_base_viewport(&self, width: i64, height: i64) -> EngineResult<Viewport> {
        let mut session = self.inner.session.lock().await;
        let mut updated = session.settings.clone();
        let viewport = updated.set_base_viewport(width, height)?;
        updated.save(self.inner.store.as_ref())?;
        session.settings = updated;
        Ok(viewport)
    }

    /// Stored reference viewport and the host's current one.
    pub async fn base_viewport(&self) -> (Option<Viewport>, Viewport) {
        let current = self.inner.host.viewport().await;
        let base = self.inner.session.lock().await.settings.base_viewport;
        (base, current)
    }

    /// Visible, non-numeric item names, sorted.
    pub async fn elements(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .host
            .visible_names()
            .await
            .into_iter()
            .filter(|name| !is_number_name(name))
            .collect();
        names.sort();
        names
    }
}

impl EngineInner {
    fn lock_slot(&self) -> StdMutexGuard<'_, LoopSlot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Exit check at an iteration boundary. Clearing `active` under the slot
    /// lock means a concurrent `start()` either sees this loop alive and
    /// resumes it, or sees it gone and spawns a new one.
    fn should_continue(&self) -> bool {
        let mut slot = self.lock_slot();
        if self.running.load(Ordering::SeqCst) {
            true
        } else {
            slot.active = false;
            false
        }
    }

    async fn begin_action(&self, action: String) -> BotSettings {
        let mut session = self.session.lock().await;
        session.set_action(action);
        session.settings.clone()
    }

    async fn end_action(&self) {
        let mut session = self.session.lock().await;
        let idle = if self.running.load(Ordering::SeqCst) {
            "Running"
        } else {
            "Idle"
        };
        session.set_action(idle);
    }

    async fn visible_sorted(&self) -> Vec<String> {
        let mut names: Vec<String> = self.host.visible_names().await.into_iter().collect();
        names.sort();
        names
    }

    /// Merge what the host shows, seed an empty knowledge base, record the
    /// reference viewport if none is stored, and persist.
    async fn prepare_session(&self) -> EngineResult<()> {
        let visible = self.visible_sorted().await;
        let viewport = self.host.viewport().await;
        let loop_config = &self.config.loop_config;

        let mut guard = self.session.lock().await;
        let session = &mut *guard;
        let merged = session.kb.merge_observed(&visible);
        let seeded = session
            .kb
            .seed_if_empty(&visible, &loop_config.seeds, loop_config.seed_limit);
        if merged + seeded > 0 {
            debug!("[Engine] session prepared: {} merged, {} seeded", merged, seeded);
        }
        session.kb.save(self.store.as_ref())?;
        if session.settings.ensure_base_viewport(viewport) {
            info!("[Engine] recorded base viewport {}", viewport);
            session.settings.save(self.store.as_ref())?;
        }
        Ok(())
    }

    async fn iteration(&self) -> EngineResult<IterationOutcome> {
        let visible = self.host.visible_names().await;

        // Select.
        let (a, b, known_before) = {
            let mut guard = self.session.lock().await;
            let session = &mut *guard;
            let filter = session.filter(&self.config);
            let mut pick = selector::select_pair(&session.kb, &visible, &filter, &mut session.rng);
            for _ in 0..self.config.loop_config.max_redraws {
                let tried = matches!(&pick, Some((a, b)) if session.dedup.has_tried(a, b));
                if !tried {
                    break;
                }
                pick = selector::select_pair(&session.kb, &visible, &filter, &mut session.rng);
            }
            let Some((a, b)) = pick else {
                session.set_action("Idle: no eligible items");
                return Ok(IterationOutcome::Idle);
            };
            let known_before: HashSet<String> = visible
                .iter()
                .cloned()
                .chain(session.kb.names().map(str::to_string))
                .collect();
            session.set_action(format!("API check: {} + {}", a, b));
            (a, b, known_before)
        };

        // Query without holding the session.
        let answer = match self.oracle.pair(&a, &b).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("[Engine] oracle query {} + {} failed: {}", a, b, e);
                let mut session = self.session.lock().await;
                session.set_action(format!("Oracle error: {} + {}", a, b));
                return Err(e);
            }
        };
        let outcome = answer.outcome();

        let kind = {
            let mut session = self.session.lock().await;
            let kind = session
                .kb
                .record_outcome(self.store.as_ref(), &a, &b, &outcome)?;
            let shown = outcome.product().unwrap_or(NOTHING);
            session.push_recent(format!("{} + {} => {}", a, b, shown));
            kind
        };

        // New only if unknown before the query and still absent right now.
        let novel = match outcome.product() {
            Some(product) if !known_before.contains(product) => {
                let shown_now = self.host.visible_names().await.contains(product);
                if shown_now {
                    debug!("[Engine] '{}' appeared on the host before acting", product);
                }
                !shown_now
            }
            _ => false,
        };

        if novel {
            self.actuate_discovery(&a, &b).await;
        }

        // Fold in whatever the host shows now and mark the pair.
        let observed = self.host.visible_names().await;
        {
            let mut guard = self.session.lock().await;
            let session = &mut *guard;
            let added = session.kb.merge_observed(&observed);
            if added > 0 {
                info!("[Engine] {} new item(s) confirmed by the host", added);
            }
            session.kb.save(self.store.as_ref())?;
            session.dedup.mark_tried(self.store.as_ref(), &a, &b)?;
            session.set_action("Running");
        }

        Ok(IterationOutcome::Queried {
            a,
            b,
            kind,
            actuated: novel,
        })
    }

    /// Reproduce a new combination on the host, then clear the field.
    /// Failures are logged; the iteration carries on either way.
    async fn actuate_discovery(&self, a: &str, b: &str) {
        let _gesture = self.actuation.lock().await;
        let settings = self
            .begin_action(format!("Physical combine: {} + {}", a, b))
            .await;
        let actuator = Actuator::new(self.host.as_ref(), &settings, &self.config.actuation);
        if let Err(e) = actuator.combine(a, b).await {
            warn!(
                "[Engine] physical combine {} + {} failed ({}): {}",
                a,
                b,
                e.reason_code().unwrap_or("actuation"),
                e
            );
        }
        self.session.lock().await.set_action("Clearing field");
        actuator.clear_field().await;
    }

    /// Count one finished attempt, whatever its result. Idle passes are not
    /// attempts. Returns the new total.
    async fn count_attempt(&self) -> u64 {
        let mut session = self.session.lock().await;
        session.iterations += 1;
        session.iterations
    }

    fn budget_exhausted(&self, iterations: u64) -> bool {
        matches!(self.config.loop_config.max_iterations, Some(max) if iterations >= max)
    }
}

async fn run_loop(inner: Arc<EngineInner>) {
    if let Err(e) = inner.prepare_session().await {
        warn!("[Engine] session preparation failed: {}", e);
    }

    while inner.should_continue() {
        let result = AssertUnwindSafe(inner.iteration()).catch_unwind().await;
        let idle = matches!(result, Ok(Ok(IterationOutcome::Idle)));
        let delay = match result {
            Ok(Ok(IterationOutcome::Idle)) => inner.config.loop_config.idle_backoff(),
            Ok(Ok(IterationOutcome::Queried { .. })) => inner.config.loop_config.iteration_delay(),
            Ok(Err(e)) => {
                log_iteration_error(&e);
                inner.config.loop_config.iteration_delay()
            }
            Err(_) => {
                error!("[Engine] iteration panicked; continuing with the next one");
                inner.config.loop_config.iteration_delay()
            }
        };

        let iterations = if idle {
            inner.session.lock().await.iterations
        } else {
            inner.count_attempt().await
        };
        if inner.budget_exhausted(iterations) {
            info!("[Engine] iteration budget of {} reached", iterations);
            inner.running.store(false, Ordering::SeqCst);
            continue;
        }
        tokio::time::sleep(delay).await;
    }

    inner.session.lock().await.set_action("Idle");
    info!("[Engine] discovery stopped");
}

fn log_iteration_error(e: &EngineError) {
    match e {
        EngineError::OracleUnavailable(_) => debug!("[Engine] iteration abandoned: {}", e),
        _ => warn!("[Engine] iteration failed: {}", e),
    }
}

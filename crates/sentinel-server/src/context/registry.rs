use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::app::AppContext;
use crate::billing::{ProfileStore, StoreSettings};
use crate::clients::{PaymentClient, ScanClient};
use crate::identity::{Identity, IdentityProvider, SessionHolder};
use crate::scanner::Scanner;
use crate::storage::SentinelDatabase;

/// Requests for one user are serialized on this lock.
pub type SharedContext = Arc<Mutex<AppContext>>;

/// Everything needed to build a fresh [`AppContext`].
#[derive(Clone)]
pub struct ContextFactory {
    pub db: SentinelDatabase,
    pub provider: IdentityProvider,
    pub scan_client: ScanClient,
    pub payments: PaymentClient,
    pub settings: StoreSettings,
    pub recent_capacity: usize,
}

impl ContextFactory {
    pub fn build(&self, identity: Identity) -> AppContext {
        AppContext::new(
            SessionHolder::with_identity(self.provider.clone(), identity),
            ProfileStore::new(self.db.clone(), self.payments.clone(), self.settings.clone()),
            Scanner::new(self.scan_client.clone(), self.recent_capacity),
        )
    }
}

/// How often the idle sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Entry {
    ctx: SharedContext,
    /// Milliseconds since the registry epoch.
    last_used: AtomicU64,
}

/// One [`AppContext`] per signed-in user.
#[derive(Clone)]
pub struct ContextRegistry {
    factory: Arc<ContextFactory>,
    contexts: Arc<RwLock<HashMap<String, Entry>>>,
    epoch: Instant,
}

impl ContextRegistry {
    pub fn new(factory: ContextFactory) -> Self {
        Self {
            factory: Arc::new(factory),
            contexts: Arc::new(RwLock::new(HashMap::new())),
            epoch: Instant::now(),
        }
    }

    pub fn factory(&self) -> &ContextFactory {
        &self.factory
    }

    fn now_millis(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// The context for `identity`, created on first use.
    pub async fn context_for(&self, identity: &Identity) -> SharedContext {
        let now = self.now_millis();
        if let Some(entry) = self.contexts.read().await.get(&identity.id) {
            entry.last_used.store(now, Ordering::Relaxed);
            return Arc::clone(&entry.ctx);
        }

        let mut contexts = self.contexts.write().await;
        let entry = contexts.entry(identity.id.clone()).or_insert_with(|| {
            info!(user_id = %identity.id, "Session context created");
            Entry {
                ctx: Arc::new(Mutex::new(self.factory.build(identity.clone()))),
                last_used: AtomicU64::new(now),
            }
        });
        entry.last_used.store(now, Ordering::Relaxed);
        Arc::clone(&entry.ctx)
    }

    /// Clear the user's session and forget their context.
    pub async fn end_session(&self, user_id: &str) -> bool {
        let Some(entry) = self.contexts.write().await.remove(user_id) else {
            return false;
        };
        let ctx = entry.ctx.lock().await;
        if let Err(e) = ctx.session().sign_out(None).await {
            warn!(user_id, error = %e, "Sign-out during session teardown failed");
        }
        info!(user_id, "Session context removed");
        true
    }

    /// Drop contexts unused for at least `max_idle`. Contexts serving a
    /// request are kept. Returns how many were dropped.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = self.now_millis();
        let max_idle = u64::try_from(max_idle.as_millis()).unwrap_or(u64::MAX);
        let mut contexts = self.contexts.write().await;
        let before = contexts.len();
        contexts.retain(|user_id, entry| {
            let idle = now.saturating_sub(entry.last_used.load(Ordering::Relaxed));
            let keep = idle < max_idle || entry.ctx.try_lock().is_err();
            if !keep {
                debug!(user_id, idle_ms = idle, "Evicting idle session context");
            }
            keep
        });
        before - contexts.len()
    }

    /// Periodically evict contexts idle for longer than `max_idle`.
    pub fn spawn_idle_sweep(&self, max_idle: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let period = SWEEP_INTERVAL.min(max_idle).max(Duration::from_secs(1));
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                let removed = registry.evict_idle(max_idle).await;
                if removed > 0 {
                    info!(removed, "Idle session contexts evicted");
                }
            }
        })
    }

    pub async fn get(&self, user_id: &str) -> Option<SharedContext> {
        self.contexts
            .read()
            .await
            .get(user_id)
            .map(|entry| Arc::clone(&entry.ctx))
    }

    pub async fn context_count(&self) -> usize {
        self.contexts.read().await.len()
    }
}

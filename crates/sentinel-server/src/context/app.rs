use tokio::sync::watch;
use tracing::debug;

use sentinel_core::ContentType;

use crate::billing::{BillingError, ProfileStore};
use crate::identity::{Identity, SessionHolder};
use crate::scanner::{ScanError, ScanResult, Scanner};
use crate::storage::UserProfile;

pub struct AppContext {
    session: SessionHolder,
    identity_rx: watch::Receiver<Option<Identity>>,
    loaded_for: Option<String>,
    store: ProfileStore,
    scanner: Scanner,
}

impl AppContext {
    pub fn new(session: SessionHolder, store: ProfileStore, scanner: Scanner) -> Self {
        let identity_rx = session.subscribe();
        Self {
            session,
            identity_rx,
            loaded_for: None,
            store,
            scanner,
        }
    }

    pub const fn session(&self) -> &SessionHolder {
        &self.session
    }

    pub const fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub const fn store_mut(&mut self) -> &mut ProfileStore {
        &mut self.store
    }

    pub const fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    pub const fn scanner_mut(&mut self) -> &mut Scanner {
        &mut self.scanner
    }

    /// Bring cached state in line with the session's current identity and
    /// return its profile, loading (or creating) it when needed.
    pub async fn ensure_loaded(&mut self) -> Result<&UserProfile, BillingError> {
        let identity = self.identity_rx.borrow_and_update().clone();
        let Some(identity) = identity else {
            self.clear();
            return Err(BillingError::NotAuthenticated);
        };

        if self.loaded_for.as_deref() != Some(identity.id.as_str()) {
            self.clear();
        }
        if self.store.profile().is_none() {
            self.store.load_or_create_profile(&identity).await?;
            self.loaded_for = Some(identity.id);
        }
        self.store.profile().ok_or(BillingError::NotAuthenticated)
    }

    /// Scan `input` as `kind` for the current identity.
    pub async fn scan(&mut self, kind: ContentType, input: &str) -> Result<ScanResult, ScanError> {
        self.ensure_signed_in().await?;
        self.scanner.scan(&mut self.store, kind, input).await
    }

    /// Scan a QR payload, tagging its side-record with `source`.
    pub async fn scan_qr(&mut self, raw: &str, source: &str) -> Result<ScanResult, ScanError> {
        self.ensure_signed_in().await?;
        self.scanner.scan_qr(&mut self.store, raw, source).await
    }

    async fn ensure_signed_in(&mut self) -> Result<(), ScanError> {
        match self.ensure_loaded().await {
            Ok(_) => Ok(()),
            Err(BillingError::NotAuthenticated) => Err(ScanError::NotAuthenticated),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&mut self) {
        if let Some(previous) = self.loaded_for.take() {
            debug!(user_id = %previous, "Dropping per-user state");
        }
        self.store.reset();
        self.scanner.reset();
    }
}

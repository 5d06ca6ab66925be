//! Per-user profile and billing state.
//!
//! [`ProfileStore`] caches the signed-in user's profile and runs every
//! balance, history, subscription and payment operation against the
//! database. Writes follow persist-then-cache: the cached profile is only
//! replaced by the row the database returned, so a failed write leaves the
//! cache exactly as it was.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info, instrument, warn};

use sentinel_core::Config;
use sentinel_core::SubscriptionStatus;
use sentinel_core::db::unix_timestamp;

use super::error::BillingError;
use super::export::{self, ExportFormat};
use super::plans::PlanResolver;
use super::stats::{HistoryPage, HistoryStats};
use crate::clients::{InitPayment, PaymentClient};
use crate::identity::Identity;
use crate::storage::time::add_one_month;
use crate::storage::{
    DatabaseError, HistoryFilters, LedgerAction, LedgerEntry, NewPayment, NewProfile, NewQrScan,
    NewScan, PaymentPurpose, PaymentRecord, PaymentStatus, QrScan, QrScanType, ScanHistory,
    SentinelDatabase, SubscriptionEvent, SubscriptionPlan, UserProfile,
};

/// QR side-records attached to a loaded profile.
const PROFILE_QR_LIMIT: i64 = 20;

/// Knobs taken from configuration.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub signup_tokens: i64,
    pub history_limit: i64,
    pub usd_to_ngn: f64,
    pub token_price_usd: f64,
}

impl StoreSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            signup_tokens: config.billing.signup_tokens,
            history_limit: config.billing.history_limit,
            usd_to_ngn: config.payments.usd_to_ngn,
            token_price_usd: config.payments.token_price_usd,
        }
    }

    /// Naira price of one month of `plan`.
    pub fn plan_price(&self, plan: &SubscriptionPlan) -> f64 {
        round_cents(plan.monthly_price_usd * self.usd_to_ngn)
    }

    /// Naira price of a pack of `tokens`.
    #[allow(clippy::cast_precision_loss)]
    pub fn token_pack_price(&self, tokens: i64) -> f64 {
        round_cents(tokens as f64 * self.token_price_usd * self.usd_to_ngn)
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Fields a user may change on their own profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// A purchase to start. Naming a plan makes it a subscription, otherwise
/// `tokens` is bought as a pack. `amount` defaults to the quoted price.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentRequest {
    pub plan: Option<String>,
    pub tokens: Option<i64>,
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    /// The gateway has not confirmed the payment yet.
    NotVerified,
    /// Confirmed and applied to the profile by this call.
    Credited,
    /// Confirmed earlier; nothing was applied again.
    AlreadyCredited,
}

pub struct ProfileStore {
    db: SentinelDatabase,
    payments: PaymentClient,
    settings: StoreSettings,
    plans: PlanResolver,
    profile: Option<UserProfile>,
}

impl ProfileStore {
    pub fn new(db: SentinelDatabase, payments: PaymentClient, settings: StoreSettings) -> Self {
        Self {
            db,
            payments,
            settings,
            plans: PlanResolver::default(),
            profile: None,
        }
    }

    pub const fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub const fn plans(&self) -> &PlanResolver {
        &self.plans
    }

    pub const fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    pub fn tokens_remaining(&self) -> i64 {
        self.profile.as_ref().map_or(0, |p| p.tokens_remaining)
    }

    /// Forget the cached profile. The catalog is kept.
    pub fn reset(&mut self) {
        self.profile = None;
    }

    fn current(&self) -> Result<&UserProfile, BillingError> {
        self.profile.as_ref().ok_or(BillingError::NotAuthenticated)
    }

    fn user_id(&self) -> Option<&str> {
        self.profile.as_ref().map(|p| p.id.as_str())
    }

    async fn ensure_plans(&mut self) {
        if self.plans.is_empty() {
            self.plans = PlanResolver::load(&self.db).await;
        }
    }

    fn attach(&self, mut profile: UserProfile, qr_scans: Vec<QrScan>) -> UserProfile {
        profile.subscription_plan = profile
            .subscription_plan_id
            .as_deref()
            .and_then(|id| self.plans.by_id(id))
            .cloned();
        profile.qr_scans = qr_scans;
        profile
    }

    /// Replace the cache with a row the database returned, keeping the
    /// attached QR side-records.
    fn cache(&mut self, stored: UserProfile) -> &UserProfile {
        let qr_scans = self
            .profile
            .take()
            .map(|p| p.qr_scans)
            .unwrap_or_default();
        let profile = self.attach(stored, qr_scans);
        self.profile.insert(profile)
    }

    async fn recent_qr_scans(&self, user_id: &str) -> Vec<QrScan> {
        match self.db.list_qr_scans(user_id, PROFILE_QR_LIMIT).await {
            Ok(scans) => scans,
            Err(e) => {
                warn!(user_id, error = %e, "Failed to load QR scans");
                Vec::new()
            }
        }
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Load the profile for `identity`, creating it on first use.
    #[instrument(skip(self, identity), fields(user_id = %identity.id))]
    pub async fn load_or_create_profile(
        &mut self,
        identity: &Identity,
    ) -> Result<&UserProfile, BillingError> {
        self.ensure_plans().await;

        let base = match self.db.get_profile(&identity.id).await {
            Ok(profile) => profile,
            Err(e) if e.is_not_found() => self.create_profile(identity).await?,
            Err(e) => return Err(e.into()),
        };

        let qr_scans = self.recent_qr_scans(&identity.id).await;
        let profile = self.attach(base, qr_scans);
        Ok(self.profile.insert(profile))
    }

    async fn create_profile(&self, identity: &Identity) -> Result<UserProfile, DatabaseError> {
        let created = self
            .db
            .create_profile(&NewProfile {
                id: &identity.id,
                email: &identity.email,
                full_name: identity.full_name.as_deref(),
                avatar_url: identity.avatar_url.as_deref(),
                tokens_remaining: self.settings.signup_tokens,
            })
            .await;

        match created {
            Ok(profile) => {
                info!(user_id = %identity.id, "Profile created");
                Ok(profile)
            }
            // Someone else created it between our read and insert.
            Err(e) if e.is_conflict() => self.db.get_profile(&identity.id).await,
            Err(e) => Err(e),
        }
    }

    /// Re-read the cached profile from the database.
    pub async fn refresh_profile(&mut self) -> Result<&UserProfile, BillingError> {
        let id = self.current()?.id.clone();
        self.ensure_plans().await;
        let stored = self.db.get_profile(&id).await?;
        let qr_scans = self.recent_qr_scans(&id).await;
        let profile = self.attach(stored, qr_scans);
        Ok(self.profile.insert(profile))
    }

    pub async fn update_profile(
        &mut self,
        update: ProfileUpdate,
    ) -> Result<&UserProfile, BillingError> {
        let mut next = self.current()?.clone();
        if let Some(full_name) = update.full_name {
            next.full_name = Some(full_name).filter(|n| !n.trim().is_empty());
        }
        if let Some(avatar_url) = update.avatar_url {
            next.avatar_url = Some(avatar_url).filter(|u| !u.trim().is_empty());
        }

        let stored = self.db.save_profile(&next).await?;
        Ok(self.cache(stored))
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    /// Apply `delta` to the balance, floored at zero. Negative deltas count
    /// as usage.
    pub async fn adjust_tokens(&mut self, delta: i64) -> Result<&UserProfile, BillingError> {
        let current = self.current()?.clone();
        Ok(self.save_with_delta(current, delta).await?)
    }

    async fn save_with_delta(
        &mut self,
        mut next: UserProfile,
        delta: i64,
    ) -> Result<&UserProfile, DatabaseError> {
        next.tokens_remaining = next.tokens_remaining.saturating_add(delta).max(0);
        if delta < 0 {
            next.tokens_used_total = next.tokens_used_total.saturating_add(delta.saturating_neg());
            next.last_scan_at = Some(unix_timestamp());
        }

        let stored = self.db.save_profile(&next).await?;
        Ok(self.cache(stored))
    }

    /// Re-read only the balance. Falls back to the cached value on error.
    pub async fn force_fetch_tokens(&mut self) -> Result<i64, BillingError> {
        let current = self.current()?;
        let (id, cached) = (current.id.clone(), current.tokens_remaining);

        match self.db.get_tokens_remaining(&id).await {
            Ok(tokens) => {
                if let Some(profile) = self.profile.as_mut() {
                    profile.tokens_remaining = tokens;
                }
                Ok(tokens)
            }
            Err(e) => {
                warn!(user_id = %id, error = %e, "Balance re-read failed, using cached value");
                Ok(cached)
            }
        }
    }

    /// Whether the user may scan at all: a positive balance or an active
    /// subscription.
    pub fn check_token_usage(&self) -> bool {
        self.profile.as_ref().is_some_and(|p| {
            p.tokens_remaining > 0 || p.subscription_status == SubscriptionStatus::Active
        })
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Persist a scan, then deduct `tokens_used`.
    ///
    /// Nothing is deducted when the insert fails. When the deduction fails
    /// the row stays and [`BillingError::TokenDeductionFailed`] names it.
    #[instrument(skip(self, scan), fields(content_type = %scan.content_type))]
    pub async fn record_scan(
        &mut self,
        scan: &NewScan<'_>,
        tokens_used: i64,
    ) -> Result<ScanHistory, BillingError> {
        let current = self.current()?.clone();
        let row = self.db.insert_scan(&current.id, scan, tokens_used).await?;

        if let Err(source) = self.save_with_delta(current, -tokens_used).await {
            warn!(scan_id = %row.id, error = %source, "Scan saved but token deduction failed");
            return Err(BillingError::TokenDeductionFailed {
                scan_id: row.id,
                source,
            });
        }
        Ok(row)
    }

    /// Most recent scans, newest first.
    pub async fn get_scan_history(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<ScanHistory>, BillingError> {
        let Some(user_id) = self.user_id() else {
            return Ok(Vec::new());
        };
        let filters = HistoryFilters {
            limit: Some(limit.unwrap_or(self.settings.history_limit)),
            ..HistoryFilters::default()
        };
        Ok(self.db.list_scans(user_id, &filters).await?)
    }

    /// One scan, or `None` when it does not exist or belongs to someone else.
    pub async fn get_history_item(&self, id: &str) -> Result<Option<ScanHistory>, BillingError> {
        let Some(user_id) = self.user_id() else {
            return Ok(None);
        };
        match self.db.get_scan(user_id, id).await {
            Ok(scan) => Ok(Some(scan)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Filtered history with day groups and stats. Read failures degrade to
    /// an empty page.
    pub async fn fetch_history(&self, filters: &HistoryFilters) -> HistoryPage {
        let Some(user_id) = self.user_id() else {
            return HistoryPage::default();
        };
        match self.db.list_scans(user_id, filters).await {
            Ok(scans) => HistoryPage::from_scans(scans),
            Err(e) => {
                warn!(user_id, error = %e, "History fetch failed");
                HistoryPage::default()
            }
        }
    }

    /// Stats over the whole history. Read failures degrade to zeroes.
    pub async fn history_stats(&self) -> HistoryStats {
        let Some(user_id) = self.user_id() else {
            return HistoryStats::default();
        };
        match self.db.list_scans(user_id, &HistoryFilters::default()).await {
            Ok(scans) => HistoryStats::from_scans(&scans),
            Err(e) => {
                warn!(user_id, error = %e, "History stats failed");
                HistoryStats::default()
            }
        }
    }

    pub async fn delete_history_item(&self, id: &str) -> Result<bool, BillingError> {
        let user_id = &self.current()?.id;
        Ok(self.db.delete_scan(user_id, id).await?)
    }

    pub async fn clear_history(&self) -> Result<u64, BillingError> {
        let user_id = &self.current()?.id;
        let removed = self.db.clear_scans(user_id).await?;
        info!(user_id = %user_id, removed, "History cleared");
        Ok(removed)
    }

    pub async fn export_history(&self, format: ExportFormat) -> Result<String, BillingError> {
        let user_id = &self.current()?.id;
        let scans = self
            .db
            .list_scans(user_id, &HistoryFilters::default())
            .await?;

        Ok(match format {
            ExportFormat::Json => export::to_json(user_id, &scans, unix_timestamp())?,
            ExportFormat::Csv => export::to_csv(&scans),
        })
    }

    // =========================================================================
    // QR side-records
    // =========================================================================

    /// Record a wallet found in a QR code. The record is tagged `ethereum`
    /// when an ENS name is known.
    pub async fn record_qr_scan(
        &mut self,
        wallet_address: &str,
        ens_domain: Option<&str>,
        metadata: Value,
    ) -> Result<QrScan, BillingError> {
        let scan_type = if ens_domain.is_some() {
            QrScanType::Ethereum
        } else {
            QrScanType::Other
        };
        self.record_qr(NewQrScan {
            wallet_address,
            ens_domain,
            scan_type,
            metadata,
        })
        .await
    }

    pub(crate) async fn record_qr(&mut self, scan: NewQrScan<'_>) -> Result<QrScan, BillingError> {
        let user_id = self.current()?.id.clone();
        let stored = self.db.insert_qr_scan(&user_id, scan).await?;

        if let Some(profile) = self.profile.as_mut() {
            profile.qr_scans.insert(0, stored.clone());
            profile
                .qr_scans
                .truncate(usize::try_from(PROFILE_QR_LIMIT).unwrap_or(usize::MAX));
        }
        Ok(stored)
    }

    /// QR side-records, newest first. Falls back to the cached list on error.
    pub async fn get_qr_scans(&self, limit: Option<i64>) -> Vec<QrScan> {
        let Some(profile) = self.profile.as_ref() else {
            return Vec::new();
        };
        let limit = limit.unwrap_or(self.settings.history_limit);
        match self.db.list_qr_scans(&profile.id, limit).await {
            Ok(scans) => scans,
            Err(e) => {
                warn!(user_id = %profile.id, error = %e, "QR scan fetch failed, using cached list");
                profile.qr_scans.clone()
            }
        }
    }

    pub async fn clear_qr_scans(&mut self) -> Result<u64, BillingError> {
        let user_id = self.current()?.id.clone();
        let removed = self.db.clear_qr_scans(&user_id).await?;
        if let Some(profile) = self.profile.as_mut() {
            profile.qr_scans.clear();
        }
        Ok(removed)
    }

    // =========================================================================
    // Subscription
    // =========================================================================

    pub fn plan_by_name(&self, name: &str) -> Option<&SubscriptionPlan> {
        self.plans.by_name(name)
    }

    /// Subscriptions made by this user, newest first.
    pub async fn subscription_history(&self) -> Result<Vec<SubscriptionEvent>, BillingError> {
        let user_id = &self.current()?.id;
        Ok(self.db.list_ledger(user_id).await?)
    }

    /// Start (or renew) a subscription: credit the plan's monthly tokens and
    /// run the period for one calendar month.
    #[instrument(skip(self))]
    pub async fn subscribe_to_plan(&mut self, ident: &str) -> Result<&UserProfile, BillingError> {
        let current = self.current()?.clone();
        self.ensure_plans().await;
        let plan = self
            .plans
            .resolve(ident)
            .cloned()
            .ok_or_else(|| BillingError::PlanNotFound(ident.to_string()))?;

        let previous_status = current.subscription_status;
        let mut next = current;
        next.subscription_plan_id = Some(plan.id.clone());
        next.tokens_remaining = next.tokens_remaining.saturating_add(plan.monthly_tokens);
        next.subscription_status = SubscriptionStatus::Active;
        next.current_period_end = Some(add_one_month(unix_timestamp()));

        let stored = self.db.save_profile(&next).await?;
        self.append_ledger(LedgerEntry {
            user_id: &stored.id,
            plan_id: Some(&plan.id),
            action: LedgerAction::Subscribed,
            tokens_added: plan.monthly_tokens,
            tokens_remaining: stored.tokens_remaining,
            metadata: json!({ "plan_name": plan.name }),
        })
        .await;

        info!(user_id = %stored.id, plan = %plan.id, from = %previous_status, "Subscribed");
        Ok(self.cache(stored))
    }

    /// Cancel an active subscription. Remaining tokens are kept.
    #[instrument(skip(self))]
    pub async fn cancel_subscription(&mut self) -> Result<&UserProfile, BillingError> {
        let current = self.current()?.clone();
        if !current.subscription_status.can_cancel() {
            return Err(BillingError::InvalidTransition {
                action: "cancel",
                status: current.subscription_status,
            });
        }

        let mut next = current.clone();
        next.subscription_status = SubscriptionStatus::Canceled;
        next.current_period_end = None;

        let stored = self.db.save_profile(&next).await?;
        self.append_ledger(LedgerEntry {
            user_id: &stored.id,
            plan_id: current.subscription_plan_id.as_deref(),
            action: LedgerAction::Canceled,
            tokens_added: 0,
            tokens_remaining: stored.tokens_remaining,
            metadata: json!({
                "previous_plan": current.subscription_plan.as_ref().map(|p| p.name.as_str()),
                "tokens_at_cancellation": current.tokens_remaining,
            }),
        })
        .await;

        info!(user_id = %stored.id, "Subscription canceled");
        Ok(self.cache(stored))
    }

    /// Add purchased tokens. The subscription status is left alone.
    #[instrument(skip(self))]
    pub async fn refill_tokens(&mut self, amount: i64) -> Result<&UserProfile, BillingError> {
        if amount <= 0 {
            return Err(BillingError::InvalidAmount(format!(
                "token refill must be positive, got {amount}"
            )));
        }
        let current = self.current()?.clone();
        let previous_tokens = current.tokens_remaining;
        let mut next = current;
        next.tokens_remaining = next.tokens_remaining.saturating_add(amount);

        let stored = self.db.save_profile(&next).await?;
        self.append_ledger(LedgerEntry {
            user_id: &stored.id,
            plan_id: stored.subscription_plan_id.as_deref(),
            action: LedgerAction::TokensRefilled,
            tokens_added: amount,
            tokens_remaining: stored.tokens_remaining,
            metadata: json!({ "previous_tokens": previous_tokens }),
        })
        .await;

        Ok(self.cache(stored))
    }

    /// The ledger is an audit trail; a failed append does not undo the
    /// profile change it describes.
    async fn append_ledger(&self, entry: LedgerEntry<'_>) {
        let user_id = entry.user_id.to_string();
        let action = entry.action;
        if let Err(e) = self.db.append_ledger(entry).await {
            warn!(user_id = %user_id, ?action, error = %e, "Failed to append subscription ledger");
        }
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Open a gateway payment for a plan or a token pack and remember it as
    /// pending.
    #[instrument(skip(self, request))]
    pub async fn start_payment(
        &mut self,
        request: PaymentRequest,
    ) -> Result<PaymentRecord, BillingError> {
        let profile = self.current()?.clone();
        self.ensure_plans().await;

        let (purpose, plan_id, quote) = match request.plan.as_deref() {
            Some(ident) => {
                let plan = self
                    .plans
                    .resolve(ident)
                    .ok_or_else(|| BillingError::PlanNotFound(ident.to_string()))?;
                (
                    PaymentPurpose::Subscription,
                    Some(plan.id.clone()),
                    self.settings.plan_price(plan),
                )
            }
            None => {
                let tokens = request.tokens.filter(|t| *t > 0).ok_or_else(|| {
                    BillingError::InvalidAmount(
                        "a token purchase needs a positive token count".into(),
                    )
                })?;
                (
                    PaymentPurpose::TokenPurchase,
                    None,
                    self.settings.token_pack_price(tokens),
                )
            }
        };

        let amount = match request.amount {
            Some(amount) if amount < quote => {
                return Err(BillingError::InvalidAmount(format!(
                    "amount {amount} is below the price of {quote}"
                )));
            }
            Some(amount) => amount,
            None => quote,
        };

        let auth = self
            .payments
            .initialize_payment(&InitPayment {
                amount,
                email: profile.email.clone(),
                metadata: json!({
                    "planId": plan_id,
                    "tokens": request.tokens,
                    "userId": profile.id,
                    "type": purpose.as_str(),
                }),
            })
            .await?;

        let record = self
            .db
            .create_payment(&NewPayment {
                reference: &auth.reference,
                user_id: &profile.id,
                authorization_url: &auth.authorization_url,
                purpose,
                plan_id: plan_id.as_deref(),
                tokens: request.tokens,
                amount,
            })
            .await?;

        info!(user_id = %profile.id, reference = %record.reference, amount, "Payment started");
        Ok(record)
    }

    /// Latest payment still waiting for confirmation.
    pub async fn pending_payment(&self) -> Result<Option<PaymentRecord>, BillingError> {
        let user_id = &self.current()?.id;
        Ok(self.db.latest_pending_payment(user_id).await?)
    }

    /// Ask the gateway about `reference` and credit the purchase once.
    ///
    /// The payment is marked credited before the purchase is applied, so a
    /// repeated call can never credit twice. When applying fails the mark is
    /// released and the payment stays pending.
    #[instrument(skip(self))]
    pub async fn verify_and_apply_payment(
        &mut self,
        reference: &str,
    ) -> Result<PaymentOutcome, BillingError> {
        let user_id = self.current()?.id.clone();
        let record = self.db.get_payment(&user_id, reference).await?;
        if record.status == PaymentStatus::Credited {
            return Ok(PaymentOutcome::AlreadyCredited);
        }

        if !self.payments.verify_payment(reference).await? {
            info!(user_id = %user_id, reference, "Payment not yet verified");
            return Ok(PaymentOutcome::NotVerified);
        }
        if !self.db.mark_payment_credited(&user_id, reference).await? {
            return Ok(PaymentOutcome::AlreadyCredited);
        }

        let applied = match record.purpose {
            PaymentPurpose::Subscription => match record.plan_id.as_deref() {
                Some(plan_id) => self.subscribe_to_plan(plan_id).await.map(|_| ()),
                None => Err(BillingError::PlanNotFound(reference.to_string())),
            },
            PaymentPurpose::TokenPurchase => self
                .refill_tokens(record.tokens.unwrap_or_default())
                .await
                .map(|_| ()),
        };
        if let Err(e) = applied {
            error!(user_id = %user_id, reference, error = %e, "Verified payment could not be applied");
            if let Err(release) = self.db.release_payment_credit(&user_id, reference).await {
                error!(user_id = %user_id, reference, error = %release, "Failed to release payment credit");
            }
            return Err(e);
        }

        self.refresh_profile().await?;
        info!(user_id = %user_id, reference, "Payment credited");
        Ok(PaymentOutcome::Credited)
    }
}

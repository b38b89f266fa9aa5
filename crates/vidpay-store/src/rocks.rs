//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use vidpay_core::{
    check_ad_eligibility, validate_cpm, AdView, AuditEntry, AuditEventType, AuditFilter,
    AuditStatus, BankDetails, MonetizationError, PremiumOrder, RevenueSplit, Role,
    SubscriptionDetails, Transaction, TransactionId, TransactionStatus, TransactionType, User,
    UserId, Video, VideoId, ViewSession,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::locks::KeyedLocks;
use crate::schema::{all_column_families, cf};
use crate::{
    AdViewRecording, ClientInfo, PremiumActivation, PremiumReceipt, RecordedAdView, Store,
    WatchTimeReceipt, WithdrawalReceipt, WithdrawalRequest, WithdrawalResolution,
};

/// Idempotency scope for ad view recording.
const OP_RECORD_AD_VIEW: &str = "record_ad_view";

/// Idempotency scope for withdrawals.
const OP_WITHDRAW: &str = "withdraw";

/// Lock namespaces.
mod lock {
    pub const USER: &[u8] = b"user:";
    pub const VIDEO: &[u8] = b"video:";
    pub const SESSION: &[u8] = b"session:";
    pub const TRANSACTION: &[u8] = b"tx:";
    pub const REQUEST: &[u8] = b"request:";
    pub const PAYMENT: &[u8] = b"payment:";
}

fn lock_key(namespace: &[u8], key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(namespace.len() + key.len());
    out.extend_from_slice(namespace);
    out.extend_from_slice(key);
    out
}

fn db_error(e: rocksdb::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn add_micros(balance: i64, amount: i64) -> Result<i64> {
    balance
        .checked_add(amount)
        .ok_or_else(|| MonetizationError::InvalidAmount("balance overflow".into()).into())
}

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    locks: KeyedLocks,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(db_error)?;

        Ok(Self {
            db: Arc::new(db),
            locks: KeyedLocks::default(),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_value<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(db_error)?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn exists(&self, cf_name: &str, key: &[u8]) -> Result<bool> {
        let cf = self.cf(cf_name)?;
        Ok(self.db.get_pinned_cf(&cf, key).map_err(db_error)?.is_some())
    }

    /// Queue a serialized value in `batch`.
    fn stage<T: Serialize>(
        &self,
        batch: &mut WriteBatch,
        cf_name: &str,
        key: &[u8],
        value: &T,
    ) -> Result<()> {
        let cf = self.cf(cf_name)?;
        batch.put_cf(&cf, key, Self::serialize(value)?);
        Ok(())
    }

    /// Queue an index entry (empty value) in `batch`.
    fn stage_index(&self, batch: &mut WriteBatch, cf_name: &str, key: &[u8]) -> Result<()> {
        let cf = self.cf(cf_name)?;
        batch.put_cf(&cf, key, b"");
        Ok(())
    }

    fn stage_transaction(&self, batch: &mut WriteBatch, tx: &Transaction) -> Result<()> {
        self.stage(batch, cf::TRANSACTIONS, &keys::transaction_key(&tx.id), tx)?;
        self.stage_index(
            batch,
            cf::TRANSACTIONS_BY_USER,
            &keys::user_transaction_key(&tx.user_id, &tx.id),
        )
    }

    fn stage_audit(&self, batch: &mut WriteBatch, entry: &AuditEntry) -> Result<()> {
        self.stage(batch, cf::AUDIT_LOG, &keys::audit_key(&entry.id), entry)
    }

    fn put_value<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        self.db
            .put_cf(&cf, key, Self::serialize(value)?)
            .map_err(db_error)
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db.write(batch).map_err(db_error)
    }

    /// All values of a column family in key order (or reverse key order).
    fn scan_values<T: DeserializeOwned>(&self, cf_name: &str, newest_first: bool) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mode = if newest_first {
            IteratorMode::End
        } else {
            IteratorMode::Start
        };

        let mut values = Vec::new();
        for item in self.db.iterator_cf(&cf, mode) {
            let (_, value) = item.map_err(db_error)?;
            values.push(Self::deserialize(&value)?);
        }
        Ok(values)
    }

    /// Index keys under `prefix`, newest first.
    fn index_keys(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let cf = self.cf(cf_name)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));

        let mut all_keys = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(db_error)?;
            if !key.starts_with(prefix) {
                break;
            }
            all_keys.push(key.to_vec());
        }

        // ULID suffixes sort oldest first
        all_keys.reverse();
        Ok(all_keys)
    }

    fn require_user(&self, user_id: &UserId) -> Result<User> {
        self.get_user(user_id)?
            .ok_or_else(|| StoreError::not_found("user", user_id))
    }

    fn require_video(&self, video_id: &VideoId) -> Result<Video> {
        self.get_video(video_id)?
            .ok_or_else(|| StoreError::not_found("video", video_id))
    }

    fn require_transaction(&self, transaction_id: &TransactionId) -> Result<Transaction> {
        self.get_transaction(transaction_id)?
            .ok_or_else(|| StoreError::not_found("transaction", transaction_id))
    }

    fn video_ids_by_creator(&self, creator_id: &UserId) -> Result<Vec<VideoId>> {
        self.index_keys(cf::VIDEOS_BY_CREATOR, creator_id.as_bytes())?
            .iter()
            .map(|key| keys::video_id_from_index(key))
            .collect()
    }

    fn ensure_unused_request(&self, key: Option<&Vec<u8>>) -> Result<()> {
        if let Some(key) = key {
            if self.exists(cf::IDEMPOTENCY, key)? {
                return Err(StoreError::DuplicateRequest {
                    request_id: String::from_utf8_lossy(key).into_owned(),
                });
            }
        }
        Ok(())
    }
}

impl Store for RocksStore {
    // =========================================================================
    // User Operations
    // =========================================================================

    fn create_user(&self, user: &User) -> Result<()> {
        let key = keys::user_key(&user.user_id);
        let _guard = self.locks.lock(&[lock_key(lock::USER, &key)]);

        if self.exists(cf::USERS, &key)? {
            return Err(StoreError::AlreadyExists {
                entity: "user",
                id: user.user_id.to_string(),
            });
        }
        self.put_value(cf::USERS, &key, user)
    }

    fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        self.get_value(cf::USERS, &keys::user_key(user_id))
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.scan_values(cf::USERS, false)?;
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    fn update_user_role(&self, user_id: &UserId, role: Role) -> Result<User> {
        let key = keys::user_key(user_id);
        let _guard = self.locks.lock(&[lock_key(lock::USER, &key)]);

        let mut user = self.require_user(user_id)?;
        user.role = role;
        user.updated_at = Utc::now();
        self.put_value(cf::USERS, &key, &user)?;
        Ok(user)
    }

    fn update_bank_details(&self, user_id: &UserId, bank_details: BankDetails) -> Result<User> {
        let key = keys::user_key(user_id);
        let _guard = self.locks.lock(&[lock_key(lock::USER, &key)]);

        let mut user = self.require_user(user_id)?;
        user.bank_details = Some(bank_details);
        user.updated_at = Utc::now();
        self.put_value(cf::USERS, &key, &user)?;
        Ok(user)
    }

    fn set_monetization(
        &self,
        user_id: &UserId,
        enable: bool,
        now: DateTime<Utc>,
    ) -> Result<(User, usize)> {
        let user_key = keys::user_key(user_id);
        let video_ids = self.video_ids_by_creator(user_id)?;

        let mut lock_keys = vec![lock_key(lock::USER, &user_key)];
        lock_keys.extend(
            video_ids
                .iter()
                .map(|id| lock_key(lock::VIDEO, &keys::video_key(id))),
        );
        let _guard = self.locks.lock(&lock_keys);

        let mut user = self.require_user(user_id)?;
        if enable {
            user.enable_monetization(now)?;
        } else {
            user.disable_monetization(now);
        }

        let mut batch = WriteBatch::default();
        self.stage(&mut batch, cf::USERS, &user_key, &user)?;

        let mut changed = 0;
        for video_id in &video_ids {
            if let Some(mut video) = self.get_video(video_id)? {
                video.is_monetized = enable;
                video.updated_at = now;
                self.stage(&mut batch, cf::VIDEOS, &keys::video_key(video_id), &video)?;
                changed += 1;
            }
        }
        self.write(batch)?;

        tracing::info!(user_id = %user_id, enable, videos = changed, "Monetization updated");
        Ok((user, changed))
    }

    // =========================================================================
    // Video Operations
    // =========================================================================

    fn create_video(&self, video: &Video) -> Result<()> {
        let key = keys::video_key(&video.video_id);
        let _guard = self.locks.lock(&[lock_key(lock::VIDEO, &key)]);

        if self.exists(cf::VIDEOS, &key)? {
            return Err(StoreError::AlreadyExists {
                entity: "video",
                id: video.video_id.to_string(),
            });
        }

        let mut batch = WriteBatch::default();
        self.stage(&mut batch, cf::VIDEOS, &key, video)?;
        self.stage_index(
            &mut batch,
            cf::VIDEOS_BY_CREATOR,
            &keys::creator_video_key(&video.creator_id, &video.video_id),
        )?;
        self.write(batch)
    }

    fn get_video(&self, video_id: &VideoId) -> Result<Option<Video>> {
        self.get_value(cf::VIDEOS, &keys::video_key(video_id))
    }

    fn list_videos(&self) -> Result<Vec<Video>> {
        self.scan_values(cf::VIDEOS, false)
    }

    fn list_videos_by_creator(&self, creator_id: &UserId) -> Result<Vec<Video>> {
        let mut videos = Vec::new();
        for video_id in self.video_ids_by_creator(creator_id)? {
            if let Some(video) = self.get_video(&video_id)? {
                videos.push(video);
            }
        }
        Ok(videos)
    }

    fn count_videos(&self) -> Result<usize> {
        let cf = self.cf(cf::VIDEOS)?;
        let mut count = 0;
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            item.map_err(db_error)?;
            count += 1;
        }
        Ok(count)
    }

    fn update_cpm(&self, video_id: &VideoId, owner_id: &UserId, cpm: i64) -> Result<Video> {
        let cpm = validate_cpm(cpm)?;
        let key = keys::video_key(video_id);
        let _guard = self.locks.lock(&[lock_key(lock::VIDEO, &key)]);

        let mut video = self
            .get_video(video_id)?
            .filter(|video| video.creator_id == *owner_id)
            .ok_or_else(|| StoreError::not_found("video", video_id))?;

        video.cpm = cpm;
        video.updated_at = Utc::now();
        self.put_value(cf::VIDEOS, &key, &video)?;
        Ok(video)
    }

    fn add_watch_time(&self, video_id: &VideoId, watch_seconds: u64) -> Result<WatchTimeReceipt> {
        let video_key = keys::video_key(video_id);
        let creator_id = self.require_video(video_id)?.creator_id;
        let creator_key = keys::user_key(&creator_id);
        let _guard = self.locks.lock(&[
            lock_key(lock::VIDEO, &video_key),
            lock_key(lock::USER, &creator_key),
        ]);

        let mut video = self.require_video(video_id)?;
        let mut creator = self.require_user(&creator_id)?;
        let now = Utc::now();

        #[allow(clippy::cast_precision_loss)]
        let hours = watch_seconds as f64 / 3600.0;
        creator.channel_stats.total_watch_hours += hours;
        creator.channel_stats.total_video_views += 1;
        creator.updated_at = now;
        if let Some(entry) = video.revenue_entry_mut() {
            entry.views += 1;
        }
        video.updated_at = now;

        let mut batch = WriteBatch::default();
        self.stage(&mut batch, cf::USERS, &creator_key, &creator)?;
        self.stage(&mut batch, cf::VIDEOS, &video_key, &video)?;
        self.write(batch)?;

        Ok(WatchTimeReceipt {
            hours_added: hours,
            stats: creator.channel_stats,
        })
    }

    // =========================================================================
    // View Session Operations
    // =========================================================================

    fn get_session(&self, video_id: &VideoId, viewer_id: &UserId) -> Result<Option<ViewSession>> {
        self.get_value(cf::VIEW_SESSIONS, &keys::session_key(video_id, viewer_id))
    }

    fn start_view_session(
        &self,
        video_id: &VideoId,
        viewer_id: &UserId,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> Result<ViewSession> {
        let key = keys::session_key(video_id, viewer_id);
        let _guard = self.locks.lock(&[lock_key(lock::SESSION, &key)]);

        let session = match self.get_value::<ViewSession>(cf::VIEW_SESSIONS, &key)? {
            None => ViewSession::start(
                *video_id,
                *viewer_id,
                client.ip_address.clone(),
                client.user_agent.clone(),
                now,
            ),
            Some(mut session) if session.window_expired(now) && session.cooldown_until(now).is_none() => {
                session.refresh(client.ip_address.clone(), client.user_agent.clone(), now);
                session
            }
            Some(session) => return Ok(session),
        };

        self.put_value(cf::VIEW_SESSIONS, &key, &session)?;
        Ok(session)
    }

    fn purge_stale_sessions(&self, now: DateTime<Utc>) -> Result<usize> {
        let cf = self.cf(cf::VIEW_SESSIONS)?;
        let mut stale = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (key, value) = item.map_err(db_error)?;
            let session: ViewSession = Self::deserialize(&value)?;
            if session.is_stale(now) {
                stale.push(key.to_vec());
            }
        }

        let mut removed = 0;
        for key in stale {
            let _guard = self.locks.lock(&[lock_key(lock::SESSION, &key)]);
            // Re-check: an ad view may have landed since the scan.
            let still_stale = self
                .get_value::<ViewSession>(cf::VIEW_SESSIONS, &key)?
                .is_some_and(|session| session.is_stale(now));
            if still_stale {
                self.db.delete_cf(&cf, &key).map_err(db_error)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    // =========================================================================
    // Ad View Operations
    // =========================================================================

    fn record_ad_view(&self, recording: &AdViewRecording) -> Result<RecordedAdView> {
        let AdViewRecording {
            video_id,
            viewer_id,
            client,
            idempotency_key,
            now,
        } = recording;
        let now = *now;

        let creator_id = self.require_video(video_id)?.creator_id;
        let video_key = keys::video_key(video_id);
        let creator_key = keys::user_key(&creator_id);
        let session_key = keys::session_key(video_id, viewer_id);
        let request_key = idempotency_key
            .as_deref()
            .map(|k| keys::idempotency_key(OP_RECORD_AD_VIEW, viewer_id, k));

        let mut lock_keys = vec![
            lock_key(lock::VIDEO, &video_key),
            lock_key(lock::USER, &creator_key),
            lock_key(lock::SESSION, &session_key),
        ];
        if let Some(key) = &request_key {
            lock_keys.push(lock_key(lock::REQUEST, key));
        }
        let _guard = self.locks.lock(&lock_keys);

        self.ensure_unused_request(request_key.as_ref())?;

        let mut video = self.require_video(video_id)?;
        let viewer = self.require_user(viewer_id)?;
        let session = self.get_value::<ViewSession>(cf::VIEW_SESSIONS, &session_key)?;

        check_ad_eligibility(&video, &viewer, session.as_ref(), now)
            .map_err(StoreError::AdViewRejected)?;

        let split = RevenueSplit::from_cpm(video.cpm)?;
        let mut creator = if creator_id == *viewer_id {
            viewer.clone()
        } else {
            self.require_user(&creator_id)?
        };

        let ad_view = AdView::new(
            &video,
            *viewer_id,
            split,
            client.ip_address.clone(),
            client.user_agent.clone(),
            now,
        );
        let transaction = Transaction::earning(&ad_view);

        creator.wallet_balance_micros = add_micros(creator.wallet_balance_micros, split.creator_micros)?;
        creator.total_earnings_micros = add_micros(creator.total_earnings_micros, split.creator_micros)?;
        creator.updated_at = now;

        if let Some(entry) = video.revenue_entry_mut() {
            entry.credit_ad_view(split.total_micros);
        }
        video.updated_at = now;

        let mut session = session.unwrap_or_else(|| {
            ViewSession::start(
                *video_id,
                *viewer_id,
                client.ip_address.clone(),
                client.user_agent.clone(),
                now,
            )
        });
        session.mark_ad_view(now);

        let audit = AuditEntry::new(AuditEventType::AdView, *viewer_id, AuditStatus::Success, now)
            .with_email(viewer.email.clone())
            .with_client(client.ip_address.clone(), client.user_agent.clone())
            .with_amount(split.creator_micros)
            .with_video(*video_id)
            .with_transaction(transaction.id)
            .with_ad_view(ad_view.ad_view_id)
            .with_revenue(split)
            .with_metadata(serde_json::json!({
                "creatorId": creator_id.to_string(),
                "revenuePerViewMicros": split.total_micros,
            }));

        let mut batch = WriteBatch::default();
        self.stage(&mut batch, cf::USERS, &creator_key, &creator)?;
        self.stage(&mut batch, cf::VIDEOS, &video_key, &video)?;
        self.stage(&mut batch, cf::VIEW_SESSIONS, &session_key, &session)?;
        self.stage(&mut batch, cf::AD_VIEWS, &keys::ad_view_key(&ad_view.ad_view_id), &ad_view)?;
        self.stage_index(
            &mut batch,
            cf::AD_VIEWS_BY_VIDEO,
            &keys::video_ad_view_key(video_id, &ad_view.ad_view_id),
        )?;
        self.stage_transaction(&mut batch, &transaction)?;
        self.stage_audit(&mut batch, &audit)?;
        if let Some(key) = &request_key {
            self.stage(&mut batch, cf::IDEMPOTENCY, key, &now)?;
        }
        self.write(batch)?;

        Ok(RecordedAdView {
            ad_view,
            transaction_id: transaction.id,
            creator_balance_micros: creator.wallet_balance_micros,
        })
    }

    fn list_ad_views_by_video(
        &self,
        video_id: &VideoId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<AdView>> {
        let mut views = Vec::new();
        for key in self.index_keys(cf::AD_VIEWS_BY_VIDEO, video_id.as_bytes())? {
            let ad_view_id = keys::ad_view_id_from_index(&key)?;
            let Some(view) = self.get_value::<AdView>(cf::AD_VIEWS, &keys::ad_view_key(&ad_view_id))?
            else {
                continue;
            };
            if since.is_some_and(|since| view.created_at < since) {
                // Newest first: everything after this is older.
                break;
            }
            views.push(view);
        }
        Ok(views)
    }

    fn count_ad_views(&self) -> Result<usize> {
        let cf = self.cf(cf::AD_VIEWS)?;
        let mut count = 0;
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            item.map_err(db_error)?;
            count += 1;
        }
        Ok(count)
    }

    // =========================================================================
    // Transaction Operations
    // =========================================================================

    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<Transaction>> {
        self.get_value(cf::TRANSACTIONS, &keys::transaction_key(transaction_id))
    }

    fn list_transactions_by_user(
        &self,
        user_id: &UserId,
        transaction_type: Option<TransactionType>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>> {
        let mut transactions = Vec::new();
        let mut skipped = 0;

        for key in self.index_keys(cf::TRANSACTIONS_BY_USER, user_id.as_bytes())? {
            if transactions.len() >= limit {
                break;
            }

            let tx_id = keys::transaction_id_from_index(&key)?;
            let Some(tx) = self.get_transaction(&tx_id)? else {
                continue;
            };
            if transaction_type.is_some_and(|t| tx.transaction_type != t) {
                continue;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }
            transactions.push(tx);
        }

        Ok(transactions)
    }

    fn list_transactions(
        &self,
        transaction_type: Option<TransactionType>,
        status: Option<TransactionStatus>,
    ) -> Result<Vec<Transaction>> {
        let transactions: Vec<Transaction> = self.scan_values(cf::TRANSACTIONS, true)?;
        Ok(transactions
            .into_iter()
            .filter(|tx| transaction_type.map_or(true, |t| tx.transaction_type == t))
            .filter(|tx| status.map_or(true, |s| tx.status == s))
            .collect())
    }

    fn request_withdrawal(&self, request: &WithdrawalRequest) -> Result<WithdrawalReceipt> {
        let WithdrawalRequest {
            user_id,
            amount_micros,
            client,
            idempotency_key,
            now,
        } = request;
        let (amount, now) = (*amount_micros, *now);

        vidpay_core::validate_withdrawal_amount(amount)?;

        let user_key = keys::user_key(user_id);
        let request_key = idempotency_key
            .as_deref()
            .map(|k| keys::idempotency_key(OP_WITHDRAW, user_id, k));

        let mut lock_keys = vec![lock_key(lock::USER, &user_key)];
        if let Some(key) = &request_key {
            lock_keys.push(lock_key(lock::REQUEST, key));
        }
        let _guard = self.locks.lock(&lock_keys);

        self.ensure_unused_request(request_key.as_ref())?;

        let mut user = self.require_user(user_id)?;
        let bank_details = user
            .bank_details
            .clone()
            .ok_or(MonetizationError::MissingBankDetails)?;

        if user.wallet_balance_micros < amount {
            return Err(StoreError::InsufficientBalance {
                balance: user.wallet_balance_micros,
                required: amount,
            });
        }

        let transaction = Transaction::withdrawal(*user_id, amount, bank_details, now)?;
        user.wallet_balance_micros -= amount;
        user.updated_at = now;

        let audit = AuditEntry::new(AuditEventType::Withdrawal, *user_id, AuditStatus::Pending, now)
            .with_email(user.email.clone())
            .with_client(client.ip_address.clone(), client.user_agent.clone())
            .with_amount(amount)
            .with_transaction(transaction.id);

        let mut batch = WriteBatch::default();
        self.stage(&mut batch, cf::USERS, &user_key, &user)?;
        self.stage_transaction(&mut batch, &transaction)?;
        self.stage_audit(&mut batch, &audit)?;
        if let Some(key) = &request_key {
            self.stage(&mut batch, cf::IDEMPOTENCY, key, &now)?;
        }
        self.write(batch)?;

        Ok(WithdrawalReceipt {
            transaction,
            remaining_balance_micros: user.wallet_balance_micros,
        })
    }

    fn resolve_withdrawal(&self, resolution: &WithdrawalResolution) -> Result<Transaction> {
        let WithdrawalResolution {
            transaction_id,
            admin_id,
            approve,
            reason,
            client,
            now,
        } = resolution;
        let now = *now;

        let tx_key = keys::transaction_key(transaction_id);
        let owner_id = self.require_transaction(transaction_id)?.user_id;
        let user_key = keys::user_key(&owner_id);
        let _guard = self.locks.lock(&[
            lock_key(lock::TRANSACTION, &tx_key),
            lock_key(lock::USER, &user_key),
        ]);

        let mut transaction = self.require_transaction(transaction_id)?;
        let mut batch = WriteBatch::default();

        let audit = if *approve {
            transaction.approve_withdrawal(*admin_id, now)?;
            let payout_reference = transaction
                .withdrawal
                .as_ref()
                .and_then(|w| w.payout_reference.clone());

            AuditEntry::new(AuditEventType::Payout, owner_id, AuditStatus::Success, now)
                .with_amount(transaction.amount_micros)
                .with_metadata(serde_json::json!({
                    "adminId": admin_id.to_string(),
                    "payoutReference": payout_reference,
                }))
        } else {
            let mut user = self.require_user(&owner_id)?;
            let refund = transaction.reject_withdrawal(*admin_id, reason.clone(), now)?;
            user.wallet_balance_micros = add_micros(user.wallet_balance_micros, refund)?;
            user.updated_at = now;
            self.stage(&mut batch, cf::USERS, &user_key, &user)?;

            let failure_reason = transaction
                .withdrawal
                .as_ref()
                .and_then(|w| w.failure_reason.clone());

            AuditEntry::new(AuditEventType::BalanceUpdate, owner_id, AuditStatus::Success, now)
                .with_email(user.email.clone())
                .with_amount(refund)
                .with_metadata(serde_json::json!({
                    "adminId": admin_id.to_string(),
                    "reason": failure_reason,
                    "newBalanceMicros": user.wallet_balance_micros,
                }))
        };
        let audit = audit
            .with_client(client.ip_address.clone(), client.user_agent.clone())
            .with_transaction(transaction.id);

        self.stage(&mut batch, cf::TRANSACTIONS, &tx_key, &transaction)?;
        self.stage_audit(&mut batch, &audit)?;
        self.write(batch)?;

        Ok(transaction)
    }

    // =========================================================================
    // Premium Operations
    // =========================================================================

    fn put_premium_order(&self, order: &PremiumOrder) -> Result<()> {
        self.put_value(
            cf::PREMIUM_ORDERS,
            &keys::premium_order_key(&order.order_id),
            order,
        )
    }

    fn get_premium_order(&self, order_id: &str) -> Result<Option<PremiumOrder>> {
        self.get_value(cf::PREMIUM_ORDERS, &keys::premium_order_key(order_id))
    }

    fn activate_premium(&self, activation: &PremiumActivation) -> Result<PremiumReceipt> {
        let PremiumActivation {
            user_id,
            plan,
            order_id,
            payment_id,
            amount_minor,
            client,
            now,
        } = activation;
        let now = *now;

        let user_key = keys::user_key(user_id);
        let payment_key = keys::premium_payment_key(payment_id);
        let _guard = self.locks.lock(&[
            lock_key(lock::USER, &user_key),
            lock_key(lock::PAYMENT, &payment_key),
        ]);

        if self.exists(cf::PREMIUM_PAYMENTS, &payment_key)? {
            return Err(StoreError::DuplicateRequest {
                request_id: payment_id.clone(),
            });
        }

        let mut user = self.require_user(user_id)?;
        let expires_at = plan.expiry_from(now)?;
        user.is_premium = true;
        user.premium_expiry = Some(expires_at);
        user.updated_at = now;

        let transaction = Transaction::premium_subscription(
            *user_id,
            plan.amount_micros(),
            SubscriptionDetails {
                plan_id: plan.id.to_string(),
                order_id: order_id.clone(),
                payment_id: payment_id.clone(),
                amount_minor: *amount_minor,
                starts_at: now,
                ends_at: expires_at,
            },
            now,
        );

        let audit = AuditEntry::new(
            AuditEventType::PremiumSubscription,
            *user_id,
            AuditStatus::Success,
            now,
        )
        .with_email(user.email.clone())
        .with_client(client.ip_address.clone(), client.user_agent.clone())
        .with_amount(plan.amount_micros())
        .with_transaction(transaction.id)
        .with_metadata(serde_json::json!({
            "planId": plan.id,
            "orderId": order_id,
            "paymentId": payment_id,
            "expiresAt": expires_at,
        }));

        let mut batch = WriteBatch::default();
        self.stage(&mut batch, cf::USERS, &user_key, &user)?;
        self.stage_transaction(&mut batch, &transaction)?;
        self.stage(&mut batch, cf::PREMIUM_PAYMENTS, &payment_key, &transaction.id)?;
        self.stage_audit(&mut batch, &audit)?;
        self.write(batch)?;

        Ok(PremiumReceipt { user, transaction })
    }

    // =========================================================================
    // Audit Operations
    // =========================================================================

    fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
        self.put_value(cf::AUDIT_LOG, &keys::audit_key(&entry.id), entry)
    }

    fn list_audit(
        &self,
        filter: &AuditFilter,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<AuditEntry>, usize)> {
        let cf = self.cf(cf::AUDIT_LOG)?;
        let mut page = Vec::new();
        let mut total = 0;

        for item in self.db.iterator_cf(&cf, IteratorMode::End) {
            let (_, value) = item.map_err(db_error)?;
            let entry: AuditEntry = Self::deserialize(&value)?;
            if !filter.matches(&entry) {
                continue;
            }
            if total >= offset && page.len() < limit {
                page.push(entry);
            }
            total += 1;
        }

        Ok((page, total))
    }
}

//! Bounded, LRU-evicted tables for sessions and authorization codes.
//!
//! Both tables follow the same discipline as [`gateway_core::BoundedCache`]:
//! a single `parking_lot::Mutex` guarding an `IndexMap`, eviction by
//! oldest access time on overflow. They're kept separate from
//! `BoundedCache` because session lookup also needs a secondary index by
//! `refresh_token`, which a generic `K -> V` cache doesn't model.

use indexmap::IndexMap;
use parking_lot::Mutex;

use gateway_core::time::now_ms;

use crate::types::{AuthorizationCode, Session};

struct Slot<V> {
    value: V,
    access_time: u64,
}

/// Session table indexed primarily by access token, secondarily by
/// refresh token.
pub struct SessionStore {
    capacity: usize,
    by_access_token: Mutex<IndexMap<String, Slot<Session>>>,
}

impl SessionStore {
    /// Create a table holding at most `capacity` live sessions.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            by_access_token: Mutex::new(IndexMap::new()),
        }
    }

    /// Insert a newly issued session, evicting the least-recently-used
    /// entry if the table is at capacity.
    pub fn insert(&self, session: Session) {
        let mut table = self.by_access_token.lock();
        let now = now_ms();

        if table.len() >= self.capacity && !table.contains_key(&session.access_token) {
            if let Some(evict_key) = table
                .iter()
                .min_by_key(|(_, slot)| slot.access_time)
                .map(|(k, _)| k.clone())
            {
                table.shift_remove(&evict_key);
            }
        }

        table.insert(
            session.access_token.clone(),
            Slot {
                value: session,
                access_time: now,
            },
        );
    }

    /// Look up a session by its access token, touching its access time.
    pub fn get_by_access_token(&self, token: &str) -> Option<Session> {
        let mut table = self.by_access_token.lock();
        let now = now_ms();
        let slot = table.get_mut(token)?;
        slot.access_time = now;
        Some(slot.value.clone())
    }

    /// Look up a session by its refresh token (linear scan; tables are
    /// bounded and small by default).
    pub fn get_by_refresh_token(&self, token: &str) -> Option<Session> {
        self.by_access_token
            .lock()
            .values()
            .find(|slot| slot.value.refresh_token == token)
            .map(|slot| slot.value.clone())
    }

    /// Remove a session by access token. Returns whether it was present.
    pub fn remove_by_access_token(&self, token: &str) -> bool {
        self.by_access_token.lock().shift_remove(token).is_some()
    }

    /// Atomically look up a session by refresh token, validate it against
    /// `now`, and remove it in the same critical section — closing the
    /// window a separate get-then-remove pair would leave open for two
    /// concurrent redemptions of the same refresh token to both succeed.
    /// Returns the removed session only if it was present and its
    /// refresh token hadn't expired.
    pub fn take_valid_by_refresh_token(&self, token: &str, now: u64) -> Option<Session> {
        let mut table = self.by_access_token.lock();
        let access_token = table
            .values()
            .find(|slot| slot.value.refresh_token == token)
            .map(|slot| slot.value.access_token.clone())?;
        let slot = table.shift_remove(&access_token)?;
        if slot.value.refresh_expires_at > now {
            Some(slot.value)
        } else {
            None
        }
    }

    /// Drop every session expired (both access and refresh) as of `now`.
    pub fn sweep_expired(&self, now: u64) {
        self.by_access_token
            .lock()
            .retain(|_, slot| slot.value.refresh_expires_at > now);
    }

    /// Number of live sessions (test/diagnostic helper).
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_access_token.lock().len()
    }

    /// True when no sessions are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_access_token.lock().is_empty()
    }
}

/// Bounded table of single-use authorization codes.
pub struct AuthCodeStore {
    capacity: usize,
    codes: Mutex<IndexMap<String, Slot<AuthorizationCode>>>,
}

impl AuthCodeStore {
    /// Create a table holding at most `capacity` live codes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            codes: Mutex::new(IndexMap::new()),
        }
    }

    /// Mint and store a new authorization code, evicting the
    /// least-recently-used entry on overflow.
    pub fn insert(&self, code: AuthorizationCode) {
        let mut table = self.codes.lock();
        let now = now_ms();

        if table.len() >= self.capacity && !table.contains_key(&code.code) {
            if let Some(evict_key) = table
                .iter()
                .min_by_key(|(_, slot)| slot.access_time)
                .map(|(k, _)| k.clone())
            {
                table.shift_remove(&evict_key);
            }
        }

        table.insert(
            code.code.clone(),
            Slot {
                value: code,
                access_time: now,
            },
        );
    }

    /// Look up a code without marking it used.
    pub fn get(&self, code: &str) -> Option<AuthorizationCode> {
        self.codes.lock().get(code).map(|slot| slot.value.clone())
    }

    /// Mark a code used in place; returns `false` if it was absent.
    pub fn mark_used(&self, code: &str) -> bool {
        let mut table = self.codes.lock();
        match table.get_mut(code) {
            Some(slot) => {
                slot.value.used = true;
                true
            }
            None => false,
        }
    }

    /// Drop every expired (or already-used) code as of `now`.
    pub fn sweep_expired(&self, now: u64) {
        self.codes
            .lock()
            .retain(|_, slot| !slot.value.used && slot.value.expires_at > now);
    }

    /// Number of tracked codes (test/diagnostic helper).
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.lock().len()
    }
}

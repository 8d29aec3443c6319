// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pending confirmations, one slot per requester.
//!
//! Every read and transition takes the per-key lock of the concurrent map,
//! so expiry and a reply to the same confirmation cannot interleave. Expired
//! entries are marked on read and otherwise left in place.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use herald_config::ConfirmationPolicy;
use herald_config::model::ConfirmationConfig;
use herald_core::{CallContext, ConfirmationStatus, HeraldError, PendingConfirmation};
use tracing::{debug, info};

pub struct ConfirmationStore {
    entries: DashMap<String, PendingConfirmation>,
    ttl: chrono::Duration,
    policy: ConfirmationPolicy,
}

impl ConfirmationStore {
    pub fn new(ttl: chrono::Duration, policy: ConfirmationPolicy) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            policy,
        }
    }

    pub fn from_config(config: &ConfirmationConfig) -> Result<Self, HeraldError> {
        let ttl = i64::try_from(config.expiry_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                HeraldError::Config(format!(
                    "confirmation.expiry_secs {} is out of range",
                    config.expiry_secs
                ))
            })?;
        Ok(Self::new(ttl, config.policy))
    }

    /// Open a confirmation for `action`.
    ///
    /// Under [`ConfirmationPolicy::Replace`] a live pending entry is
    /// overwritten; under [`ConfirmationPolicy::RejectNew`] it causes
    /// [`HeraldError::Confirmation`].
    pub fn open(
        &self,
        ctx: &CallContext,
        action: &str,
        payload: serde_json::Value,
        prompt: &str,
    ) -> Result<PendingConfirmation, HeraldError> {
        let now = Utc::now();
        let pending = PendingConfirmation::new(ctx, action, payload, prompt, self.ttl);

        match self.entries.entry(ctx.requester_id.clone()) {
            Entry::Occupied(mut slot) => {
                let existing = slot.get();
                if existing.is_live(now) {
                    if self.policy == ConfirmationPolicy::RejectNew {
                        return Err(HeraldError::Confirmation(format!(
                            "`{}` is still waiting for confirmation",
                            existing.action
                        )));
                    }
                    info!(
                        requester_id = %ctx.requester_id,
                        replaced = %existing.action,
                        action,
                        "replacing pending confirmation"
                    );
                }
                slot.insert(pending.clone());
            }
            Entry::Vacant(slot) => {
                slot.insert(pending.clone());
            }
        }

        debug!(
            requester_id = %ctx.requester_id,
            confirmation_id = %pending.id,
            action,
            expires_at = %pending.expires_at,
            "confirmation opened"
        );
        Ok(pending)
    }

    /// The requester's live confirmation, if any.
    ///
    /// A pending entry past its expiry is marked expired and not returned.
    pub fn active(&self, requester_id: &str, now: DateTime<Utc>) -> Option<PendingConfirmation> {
        let mut entry = self.entries.get_mut(requester_id)?;
        if entry.status != ConfirmationStatus::Pending {
            return None;
        }
        if entry.is_expired(now) {
            entry.status = ConfirmationStatus::Expired;
            debug!(requester_id, confirmation_id = %entry.id, "confirmation expired");
            return None;
        }
        Some(entry.clone())
    }

    /// Move confirmation `id` from pending to confirmed or rejected.
    ///
    /// Fails if the slot now holds a different confirmation, or if it is no
    /// longer pending or has expired. At most one caller can succeed.
    pub fn resolve(
        &self,
        requester_id: &str,
        id: &str,
        accept: bool,
        now: DateTime<Utc>,
    ) -> Result<PendingConfirmation, HeraldError> {
        let mut entry = self.entries.get_mut(requester_id).ok_or_else(|| {
            HeraldError::Confirmation(format!("no confirmation for requester {requester_id}"))
        })?;

        if entry.id != id {
            return Err(HeraldError::Confirmation(format!(
                "confirmation {id} was replaced"
            )));
        }
        if entry.status == ConfirmationStatus::Pending && entry.is_expired(now) {
            entry.status = ConfirmationStatus::Expired;
        }
        if entry.status != ConfirmationStatus::Pending {
            return Err(HeraldError::Confirmation(format!(
                "confirmation {id} is already {}",
                entry.status
            )));
        }

        entry.status = if accept {
            ConfirmationStatus::Confirmed
        } else {
            ConfirmationStatus::Rejected
        };
        Ok(entry.clone())
    }

    /// The most recent confirmation for `requester_id`, whatever its status.
    pub fn latest(&self, requester_id: &str) -> Option<PendingConfirmation> {
        self.entries.get(requester_id).map(|e| e.clone())
    }

    pub fn policy(&self) -> ConfirmationPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ctx(requester: &str) -> CallContext {
        CallContext {
            requester_id: requester.into(),
            tenant_id: "t".into(),
            session_id: "s".into(),
            channel_handle: "c".into(),
            reply_address: "a".into(),
            confirmed: false,
        }
    }

    fn store() -> ConfirmationStore {
        ConfirmationStore::new(chrono::Duration::seconds(300), ConfirmationPolicy::Replace)
    }

    #[test]
    fn open_then_active() {
        let store = store();
        let opened = store
            .open(&ctx("r1"), "delete_cell", json!({"cell_id": 7}), "Delete cell 7?")
            .unwrap();
        let active = store.active("r1", Utc::now()).expect("active");
        assert_eq!(active.id, opened.id);
        assert_eq!(active.payload, json!({"cell_id": 7}));
        assert!(store.active("r2", Utc::now()).is_none());
    }

    #[test]
    fn unrepresentable_expiry_is_a_config_error() {
        let config = ConfirmationConfig {
            expiry_secs: u64::MAX,
            ..ConfirmationConfig::default()
        };
        assert!(matches!(
            ConfirmationStore::from_config(&config),
            Err(HeraldError::Config(_))
        ));
    }

    #[test]
    fn huge_expiry_saturates_instead_of_overflowing() {
        let config = ConfirmationConfig {
            expiry_secs: 100_000_000_000_000,
            ..ConfirmationConfig::default()
        };
        let store = ConfirmationStore::from_config(&config).unwrap();
        let opened = store.open(&ctx("r1"), "delete_cell", json!({}), "Delete?").unwrap();
        assert_eq!(opened.expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(store.active("r1", Utc::now()).is_some());
    }

    #[test]
    fn second_open_replaces_first() {
        let store = store();
        store.open(&ctx("r1"), "delete_cell", json!({"cell_id": 1}), "one").unwrap();
        let second = store
            .open(&ctx("r1"), "archive_group", json!({"group": 2}), "two")
            .unwrap();

        let active = store.active("r1", Utc::now()).expect("active");
        assert_eq!(active.id, second.id);
        assert_eq!(active.action, "archive_group");
    }

    #[test]
    fn reject_new_policy_refuses_while_live() {
        let store =
            ConfirmationStore::new(chrono::Duration::seconds(300), ConfirmationPolicy::RejectNew);
        let first = store.open(&ctx("r1"), "a", json!({}), "one").unwrap();
        let err = store.open(&ctx("r1"), "b", json!({}), "two").unwrap_err();
        assert!(matches!(err, HeraldError::Confirmation(_)));

        store.resolve("r1", &first.id, false, Utc::now()).unwrap();
        assert!(store.open(&ctx("r1"), "b", json!({}), "two").is_ok());
    }

    #[test]
    fn expired_confirmation_reads_as_absent() {
        let store = store();
        let opened = store.open(&ctx("r1"), "a", json!({}), "p").unwrap();
        let later = opened.expires_at + chrono::Duration::seconds(1);

        assert!(store.active("r1", later).is_none());
        assert_eq!(
            store.latest("r1").expect("latest").status,
            ConfirmationStatus::Expired
        );
        assert!(store.resolve("r1", &opened.id, true, later).is_err());
    }

    #[test]
    fn expiry_is_inclusive() {
        let store = store();
        let opened = store.open(&ctx("r1"), "a", json!({}), "p").unwrap();
        assert!(store.active("r1", opened.expires_at).is_none());
    }

    #[test]
    fn resolve_is_single_use() {
        let store = store();
        let opened = store.open(&ctx("r1"), "a", json!({}), "p").unwrap();
        let confirmed = store.resolve("r1", &opened.id, true, Utc::now()).unwrap();
        assert_eq!(confirmed.status, ConfirmationStatus::Confirmed);

        assert!(store.resolve("r1", &opened.id, true, Utc::now()).is_err());
        assert!(store.resolve("r1", &opened.id, false, Utc::now()).is_err());
        assert!(store.active("r1", Utc::now()).is_none());
    }

    #[test]
    fn resolving_a_replaced_confirmation_fails() {
        let store = store();
        let first = store.open(&ctx("r1"), "a", json!({}), "one").unwrap();
        store.open(&ctx("r1"), "b", json!({}), "two").unwrap();
        let err = store.resolve("r1", &first.id, true, Utc::now()).unwrap_err();
        assert!(err.to_string().contains("replaced"));
    }

    #[test]
    fn rejected_status_stays_inspectable() {
        let store = store();
        let opened = store.open(&ctx("r1"), "a", json!({}), "p").unwrap();
        store.resolve("r1", &opened.id, false, Utc::now()).unwrap();
        assert_eq!(
            store.latest("r1").expect("latest").status,
            ConfirmationStatus::Rejected
        );
    }

    #[test]
    fn after_expiry_a_new_confirmation_can_open_under_reject_new() {
        let store = ConfirmationStore::new(chrono::Duration::zero(), ConfirmationPolicy::RejectNew);
        store.open(&ctx("r1"), "a", json!({}), "one").unwrap();
        let second = store.open(&ctx("r1"), "b", json!({}), "two").unwrap();
        assert_eq!(store.latest("r1").expect("latest").id, second.id);
    }

    proptest::proptest! {
        #[test]
        fn at_most_one_pending_per_requester(actions in proptest::collection::vec("[a-z]{1,8}", 1..20)) {
            let store = store();
            let mut last_id = String::new();
            for action in &actions {
                last_id = store.open(&ctx("r1"), action, json!({}), "p").unwrap().id;
            }
            let active = store.active("r1", Utc::now()).expect("active");
            proptest::prop_assert_eq!(active.id, last_id);
            proptest::prop_assert_eq!(store.entries.len(), 1);
        }
    }
}

use crate::{
    address::SuiAddress,
    chain::ChainReader,
    error::{
        Error,
        Result,
    },
    gateway::ChainQuery,
    pools::{
        Pool,
        RefreshFence,
        RefreshOutcome,
        RefreshToken,
        sort_by_expiry,
    },
};
use std::{
    collections::{
        HashMap,
        HashSet,
    },
    sync::{
        Arc,
        Mutex,
        PoisonError,
    },
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopMark {
    /// Submitted, waiting on the signer.
    Pending,
    /// Signed and executed.
    Stopped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowStatus {
    Active,
    Expired,
    StopPending,
    Stopped,
}

impl RowStatus {
    pub fn label(self) -> &'static str {
        match self {
            RowStatus::Active => "Active",
            RowStatus::Expired => "Expired",
            RowStatus::StopPending => "Stopping",
            RowStatus::Stopped => "Stopped",
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct AdminRow<'a> {
    pub pool: &'a Pool,
    pub status: RowStatus,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdminStats {
    pub total_pools: usize,
    pub active_pools: usize,
    pub stopped_pools: usize,
    pub total_pot_mist: u64,
}

/// Pool listing for the admin screen with optimistic stop marks layered on top.
#[derive(Debug, Default)]
pub struct AdminDesk {
    pools: Vec<Pool>,
    overlays: HashMap<String, StopMark>,
    error: Option<String>,
    loading: bool,
    fence: RefreshFence,
}

impl AdminDesk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn begin_listing(&mut self) -> RefreshToken {
        self.loading = true;
        self.fence.issue()
    }

    /// Stop marks for pools missing from the new listing are discarded.
    pub fn apply_listing(&mut self, token: RefreshToken, result: Result<Vec<Pool>>) -> RefreshOutcome {
        if !self.fence.is_current(token) {
            return RefreshOutcome::Stale;
        }
        self.loading = false;
        match result {
            Ok(mut pools) => {
                sort_by_expiry(&mut pools);
                self.overlays
                    .retain(|id, _| pools.iter().any(|pool| &pool.id == id));
                self.pools = pools;
                self.error = None;
                RefreshOutcome::Applied
            }
            Err(err) => {
                tracing::warn!(%err, "admin pool listing failed");
                self.error = Some(format!("Failed to load pools: {err}"));
                RefreshOutcome::Failed
            }
        }
    }

    pub async fn list_pools<G: ChainQuery>(&mut self, reader: &ChainReader<G>) -> RefreshOutcome {
        let token = self.begin_listing();
        let result = reader.fetch_pools_with_creators().await;
        self.apply_listing(token, result)
    }

    /// Marks a listed pool as stopping. Refuses pools that are unknown or
    /// already marked.
    pub fn mark_stop_pending(&mut self, id: &str) -> bool {
        if self.overlays.contains_key(id) || !self.pools.iter().any(|p| p.id == id) {
            return false;
        }
        self.overlays.insert(id.to_string(), StopMark::Pending);
        true
    }

    pub fn confirm_stop(&mut self, id: &str) {
        if let Some(mark) = self.overlays.get_mut(id) {
            *mark = StopMark::Stopped;
        }
    }

    pub fn revert_stop(&mut self, id: &str) {
        if self.overlays.remove(id).is_some() {
            tracing::info!(pool = id, "reverted optimistic stop");
        }
    }

    pub fn stop_mark(&self, id: &str) -> Option<StopMark> {
        self.overlays.get(id).copied()
    }

    pub fn rows(&self, now: u64) -> Vec<AdminRow<'_>> {
        self.pools
            .iter()
            .map(|pool| {
                let status = match self.overlays.get(&pool.id) {
                    Some(StopMark::Pending) => RowStatus::StopPending,
                    Some(StopMark::Stopped) => RowStatus::Stopped,
                    None if pool.is_expired(now) => RowStatus::Expired,
                    None => RowStatus::Active,
                };
                AdminRow { pool, status }
            })
            .collect()
    }

    pub fn stats(&self, now: u64) -> AdminStats {
        let rows = self.rows(now);
        AdminStats {
            total_pools: rows.len(),
            active_pools: rows.iter().filter(|r| r.status == RowStatus::Active).count(),
            stopped_pools: rows
                .iter()
                .filter(|r| matches!(r.status, RowStatus::Stopped | RowStatus::StopPending))
                .count(),
            total_pot_mist: rows.iter().map(|r| r.pool.pot_mist).sum(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ActionKey {
    StartGame,
    StopPool(SuiAddress),
    ConfigureOracle,
}

impl ActionKey {
    fn describe(&self) -> String {
        match self {
            ActionKey::StartGame => "start game".to_string(),
            ActionKey::StopPool(pool) => format!("stop of pool {pool}"),
            ActionKey::ConfigureOracle => "oracle setting".to_string(),
        }
    }
}

/// Tracks privileged actions awaiting the signer, one per capability and key.
#[derive(Clone, Debug, Default)]
pub struct InFlightRegistry {
    inner: Arc<Mutex<HashSet<(SuiAddress, ActionKey)>>>,
}

impl InFlightRegistry {
    pub fn claim(&self, cap: SuiAddress, key: ActionKey) -> Result<InFlightGuard> {
        let mut active = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.insert((cap, key.clone())) {
            return Err(Error::ActionInFlight(key.describe()));
        }
        Ok(InFlightGuard {
            registry: self.clone(),
            entry: (cap, key),
        })
    }

    pub fn is_in_flight(&self, cap: SuiAddress, key: &ActionKey) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(cap, key.clone()))
    }
}

/// Releases its registry entry on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    registry: InFlightRegistry,
    entry: (SuiAddress, ActionKey),
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.entry);
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::pools::{
        MIST_PER_SUI,
        round_name,
    };

    const T: u64 = 1_700_000_000_000;

    fn pool(id: &str, expires_at: u64, pot_sui: u64) -> Pool {
        Pool {
            id: id.to_string(),
            name: round_name(id),
            created_at: expires_at - 100,
            expires_at,
            pot_mist: pot_sui * MIST_PER_SUI,
            ticket_price_mist: MIST_PER_SUI,
            creator: None,
            defaulted: Vec::new(),
        }
    }

    fn listed(pools: Vec<Pool>) -> AdminDesk {
        let mut desk = AdminDesk::new();
        let token = desk.begin_listing();
        desk.apply_listing(token, Ok(pools));
        desk
    }

    #[test]
    fn mark_stop_pending__shows_stopping_until_confirmed() {
        // given
        let mut desk = listed(vec![pool("0xa1", T + 100, 1)]);

        // when
        assert!(desk.mark_stop_pending("0xa1"));
        let pending = desk.rows(T)[0].status;
        desk.confirm_stop("0xa1");

        // then
        assert_eq!(pending, RowStatus::StopPending);
        assert_eq!(desk.rows(T)[0].status, RowStatus::Stopped);
    }

    #[test]
    fn mark_stop_pending__twice__is_refused() {
        let mut desk = listed(vec![pool("0xa1", T + 100, 1)]);
        assert!(desk.mark_stop_pending("0xa1"));
        assert!(!desk.mark_stop_pending("0xa1"));
        assert!(!desk.mark_stop_pending("0xunknown"));
    }

    #[test]
    fn revert_stop__restores_derived_status() {
        // given
        let mut desk = listed(vec![pool("0xa1", T + 100, 1)]);
        desk.mark_stop_pending("0xa1");

        // when
        desk.revert_stop("0xa1");

        // then
        assert_eq!(desk.rows(T)[0].status, RowStatus::Active);
        assert_eq!(desk.stop_mark("0xa1"), None);
    }

    #[test]
    fn apply_listing__drops_marks_for_vanished_pools() {
        // given
        let mut desk = listed(vec![pool("0xa1", T + 100, 1), pool("0xb2", T + 200, 1)]);
        desk.mark_stop_pending("0xa1");
        desk.mark_stop_pending("0xb2");
        desk.confirm_stop("0xb2");
        let token = desk.begin_listing();

        // when
        desk.apply_listing(token, Ok(vec![pool("0xb2", T + 200, 1)]));

        // then
        assert_eq!(desk.stop_mark("0xa1"), None);
        assert_eq!(desk.stop_mark("0xb2"), Some(StopMark::Stopped));
    }

    #[test]
    fn apply_listing__stale_token__is_ignored() {
        let mut desk = AdminDesk::new();
        let old = desk.begin_listing();
        let new = desk.begin_listing();
        desk.apply_listing(new, Ok(vec![pool("0xa1", T, 1)]));
        assert_eq!(desk.apply_listing(old, Ok(Vec::new())), RefreshOutcome::Stale);
        assert_eq!(desk.pools().len(), 1);
    }

    #[test]
    fn stats__counts_active_and_sums_pot() {
        // given
        let mut desk = listed(vec![
            pool("0xa1", T + 100, 3),
            pool("0xb2", T - 1, 4),
            pool("0xc3", T + 100, 5),
        ]);
        desk.mark_stop_pending("0xc3");

        // when
        let stats = desk.stats(T);

        // then
        assert_eq!(
            stats,
            AdminStats {
                total_pools: 3,
                active_pools: 1,
                stopped_pools: 1,
                total_pot_mist: 12 * MIST_PER_SUI,
            }
        );
    }

    #[test]
    fn in_flight_registry__second_claim__is_rejected_until_release() {
        // given
        let registry = InFlightRegistry::default();
        let cap = SuiAddress::CLOCK;
        let guard = registry.claim(cap, ActionKey::StartGame).unwrap();

        // when
        let second = registry.claim(cap, ActionKey::StartGame);

        // then
        assert!(matches!(second, Err(Error::ActionInFlight(_))));
        assert!(registry.claim(cap, ActionKey::StopPool(cap)).is_ok());
        drop(guard);
        assert!(!registry.is_in_flight(cap, &ActionKey::StartGame));
        assert!(registry.claim(cap, ActionKey::StartGame).is_ok());
    }
}

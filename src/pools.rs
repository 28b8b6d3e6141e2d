use crate::{
    address::SuiAddress,
    chain::ChainReader,
    error::Result,
    gateway::ChainQuery,
};
use std::{
    collections::HashMap,
    time::Duration,
};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time,
};

pub const MIST_PER_SUI: u64 = 1_000_000_000;
/// Length of a pool's open window; `create_pool` on chain uses the same value.
pub const WINDOW_MS: u64 = 100_000;
pub const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolField {
    TicketPrice,
    Balance,
    EndTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolStatus {
    Active,
    Expired,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pool {
    pub id: String,
    pub name: String,
    pub created_at: u64,
    pub expires_at: u64,
    pub pot_mist: u64,
    pub ticket_price_mist: u64,
    pub creator: Option<SuiAddress>,
    /// Fields that could not be decoded and were defaulted to zero.
    pub defaulted: Vec<PoolField>,
}

impl Pool {
    pub fn status(&self, now: u64) -> PoolStatus {
        if now < self.expires_at {
            PoolStatus::Active
        } else {
            PoolStatus::Expired
        }
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.status(now) == PoolStatus::Expired
    }

    pub fn time_left(&self, now: u64) -> u64 {
        self.expires_at.saturating_sub(now)
    }

    pub fn window(&self) -> u64 {
        self.expires_at.saturating_sub(self.created_at)
    }

    /// `min(max(now - created, 0), expires - created)`
    pub fn elapsed(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at).min(self.window())
    }

    /// Fraction of the open window that has passed, `1.0` for an empty window.
    pub fn progress(&self, now: u64) -> f64 {
        let window = self.window();
        if window == 0 {
            return 1.0;
        }
        self.elapsed(now) as f64 / window as f64
    }

    pub fn pot_sui(&self) -> f64 {
        mist_to_sui(self.pot_mist)
    }

    pub fn ticket_price_sui(&self) -> f64 {
        mist_to_sui(self.ticket_price_mist)
    }

    pub fn is_defaulted(&self, field: PoolField) -> bool {
        self.defaulted.contains(&field)
    }
}

pub fn mist_to_sui(mist: u64) -> f64 {
    mist as f64 / MIST_PER_SUI as f64
}

/// Display label derived from the pool address, e.g. `Round ABCD`.
pub fn round_name(id: &str) -> String {
    let tag: String = id.chars().skip(2).take(4).collect();
    format!("Round {}", tag.to_uppercase())
}

/// Stable ascending sort by expiry.
pub fn sort_by_expiry(pools: &mut [Pool]) {
    pools.sort_by_key(|pool| pool.expires_at);
}

/// Demo rounds shown when no chain is attached.
pub fn demo_pools(now: u64) -> Vec<Pool> {
    let minutes = |m: u64| m * 60 * 1000;
    let demo = |id: &str, opened: u64, closes: u64, pot_mist: u64| Pool {
        id: id.to_string(),
        name: format!("Round {}", &id[2..]),
        created_at: now.saturating_sub(minutes(opened)),
        expires_at: now + minutes(closes),
        pot_mist,
        ticket_price_mist: MIST_PER_SUI,
        creator: None,
        defaulted: Vec::new(),
    };
    vec![
        demo("P-129", 30, 45, 32_500_000_000),
        demo("P-130", 10, 90, 12_000_000_000),
        demo("P-131", 5, 150, 4_200_000_000),
    ]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshToken(u64);

/// Hands out monotonically increasing tokens; only the latest one is current.
#[derive(Debug, Default)]
pub struct RefreshFence {
    last_issued: u64,
}

impl RefreshFence {
    pub fn issue(&mut self) -> RefreshToken {
        self.last_issued += 1;
        RefreshToken(self.last_issued)
    }

    pub fn is_current(&self, token: RefreshToken) -> bool {
        token.0 == self.last_issued
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    Failed,
    Stale,
}

/// Known pools plus the single current selection.
#[derive(Debug, Default)]
pub struct PoolBoard {
    pools: Vec<Pool>,
    selected: Option<String>,
    error: Option<String>,
    loading: bool,
    pot_credits: HashMap<String, u64>,
    fence: RefreshFence,
}

impl PoolBoard {
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

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected(&self) -> Option<&Pool> {
        let id = self.selected.as_deref()?;
        self.pools.iter().find(|pool| pool.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Pool> {
        self.pools.iter().find(|pool| pool.id == id)
    }

    /// Issues the token the matching [`PoolBoard::apply_refresh`] must carry.
    pub fn begin_refresh(&mut self) -> RefreshToken {
        self.loading = true;
        self.fence.issue()
    }

    /// Applies a fetch result unless a newer refresh has been issued since.
    /// Failures keep the previous list and surface the message.
    pub fn apply_refresh(
        &mut self,
        token: RefreshToken,
        result: Result<Vec<Pool>>,
        now: u64,
    ) -> RefreshOutcome {
        if !self.fence.is_current(token) {
            tracing::debug!(?token, "dropping stale pool refresh");
            return RefreshOutcome::Stale;
        }
        self.loading = false;
        match result {
            Ok(mut pools) => {
                sort_by_expiry(&mut pools);
                self.pools = pools;
                self.error = None;
                self.pot_credits.clear();
                let keep = self
                    .selected()
                    .map(|pool| !pool.is_expired(now))
                    .unwrap_or(false);
                if !keep {
                    self.selected = None;
                }
                RefreshOutcome::Applied
            }
            Err(err) => {
                tracing::warn!(%err, "pool refresh failed");
                self.error = Some(format!("Failed to load pools: {err}"));
                RefreshOutcome::Failed
            }
        }
    }

    pub async fn refresh<G: ChainQuery>(
        &mut self,
        reader: &ChainReader<G>,
        now: u64,
    ) -> RefreshOutcome {
        let token = self.begin_refresh();
        let result = reader.fetch_pools().await;
        self.apply_refresh(token, result, now)
    }

    /// Selects a known, unexpired pool. Anything else leaves the selection as is.
    pub fn select(&mut self, id: &str, now: u64) -> bool {
        match self.get(id) {
            Some(pool) if !pool.is_expired(now) => {
                self.selected = Some(pool.id.clone());
                true
            }
            _ => false,
        }
    }

    /// Adds a local purchase to a pool's pot until the next applied refresh
    /// brings the chain balance.
    pub fn credit_pot(&mut self, id: &str, mist: u64) -> bool {
        let Some(pool) = self.pools.iter_mut().find(|pool| pool.id == id) else {
            return false;
        };
        pool.pot_mist = pool.pot_mist.saturating_add(mist);
        let credit = self.pot_credits.entry(id.to_string()).or_default();
        *credit = credit.saturating_add(mist);
        true
    }

    pub fn pot_credit(&self, id: &str) -> Option<u64> {
        self.pot_credits.get(id).copied()
    }

    /// Countdown step; drops a selection whose pool has expired.
    /// Returns `true` when the selection was cleared.
    pub fn tick(&mut self, now: u64) -> bool {
        let expired = match self.selected() {
            Some(pool) => pool.is_expired(now),
            None => self.selected.is_some(),
        };
        if expired {
            tracing::info!(pool = ?self.selected, "selected pool expired");
            self.selected = None;
        }
        expired
    }
}

/// Handle to the periodic countdown task; dropping it cancels the task.
pub struct CountdownTicker {
    handle: JoinHandle<()>,
}

impl CountdownTicker {
    pub fn spawn(period: Duration, ticks: mpsc::UnboundedSender<()>) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if ticks.send(()).is_err() {
                    break;
                }
            }
        });
        Self { handle }
    }

    pub fn dispose(self) {
        drop(self)
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use proptest::prelude::*;

    const T: u64 = 1_700_000_000_000;

    fn pool(id: &str, expires_at: u64) -> Pool {
        Pool {
            id: id.to_string(),
            name: round_name(id),
            created_at: expires_at.saturating_sub(WINDOW_MS),
            expires_at,
            pot_mist: 0,
            ticket_price_mist: MIST_PER_SUI,
            creator: None,
            defaulted: Vec::new(),
        }
    }

    fn loaded(pools: Vec<Pool>) -> PoolBoard {
        let mut board = PoolBoard::new();
        let token = board.begin_refresh();
        board.apply_refresh(token, Ok(pools), T);
        board
    }

    fn ids(board: &PoolBoard) -> Vec<&str> {
        board.pools().iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn credit_pot__adds_until_next_refresh() {
        // given
        let mut board = loaded(vec![pool("0xa1", T + 50)]);

        // when
        assert!(board.credit_pot("0xa1", 3 * MIST_PER_SUI));
        assert!(!board.credit_pot("0xzz", MIST_PER_SUI));

        // then
        assert_eq!(board.pools()[0].pot_mist, pool("0xa1", T + 50).pot_mist + 3 * MIST_PER_SUI);
        assert_eq!(board.pot_credit("0xa1"), Some(3 * MIST_PER_SUI));
        let token = board.begin_refresh();
        board.apply_refresh(token, Ok(vec![pool("0xa1", T + 50)]), T);
        assert_eq!(board.pools()[0].pot_mist, pool("0xa1", T + 50).pot_mist);
        assert_eq!(board.pot_credit("0xa1"), None);
    }

    #[test]
    fn apply_refresh__sorts_soonest_expiry_first() {
        // given
        let pools = vec![pool("A", T + 100), pool("B", T + 50)];

        // when
        let board = loaded(pools);

        // then
        assert_eq!(ids(&board), vec!["B", "A"]);
    }

    #[test]
    fn apply_refresh__failure__keeps_previous_list_and_reports() {
        // given
        let mut board = loaded(vec![pool("A", T + 100)]);
        let token = board.begin_refresh();

        // when
        let outcome =
            board.apply_refresh(token, Err(Error::Query(vec!["boom".into()])), T);

        // then
        assert_eq!(outcome, RefreshOutcome::Failed);
        assert_eq!(ids(&board), vec!["A"]);
        assert!(board.error().unwrap().contains("boom"));
        assert!(!board.is_loading());
    }

    #[test]
    fn apply_refresh__stale_token__is_discarded() {
        // given
        let mut board = PoolBoard::new();
        let first = board.begin_refresh();
        let second = board.begin_refresh();
        board.apply_refresh(second, Ok(vec![pool("NEW", T + 10)]), T);

        // when
        let outcome = board.apply_refresh(first, Ok(vec![pool("OLD", T + 10)]), T);

        // then
        assert_eq!(outcome, RefreshOutcome::Stale);
        assert_eq!(ids(&board), vec!["NEW"]);
    }

    #[test]
    fn apply_refresh__drops_selection_missing_from_new_list() {
        // given
        let mut board = loaded(vec![pool("A", T + 100), pool("B", T + 50)]);
        assert!(board.select("A", T));
        let token = board.begin_refresh();

        // when
        board.apply_refresh(token, Ok(vec![pool("B", T + 50)]), T);

        // then
        assert_eq!(board.selected_id(), None);
    }

    #[test]
    fn apply_refresh__keeps_selection_still_present() {
        let mut board = loaded(vec![pool("A", T + 100)]);
        board.select("A", T);
        let token = board.begin_refresh();
        board.apply_refresh(token, Ok(vec![pool("A", T + 100), pool("C", T + 5)]), T);
        assert_eq!(board.selected_id(), Some("A"));
    }

    #[test]
    fn select__unknown_id__is_noop() {
        // given
        let mut board = loaded(vec![pool("A", T + 100), pool("B", T + 50)]);
        board.select("A", T);

        // when
        let changed = board.select("Z", T);

        // then
        assert!(!changed);
        assert_eq!(board.selected_id(), Some("A"));
    }

    #[test]
    fn select__expired_pool__is_noop() {
        let mut board = loaded(vec![pool("A", T - 1)]);
        assert!(!board.select("A", T));
        assert_eq!(board.selected_id(), None);
    }

    #[test]
    fn tick__selected_pool_expires__clears_selection() {
        // given
        let mut board = loaded(vec![pool("A", T + 100), pool("B", T + 50)]);
        board.select("B", T);
        assert!(!board.tick(T + 49));

        // when
        let cleared = board.tick(T + 51);

        // then
        assert!(cleared);
        assert_eq!(board.selected_id(), None);
    }

    #[test]
    fn elapsed__is_clamped_to_window() {
        let p = pool("A", T + 100);
        assert_eq!(p.elapsed(p.created_at - 10), 0);
        assert_eq!(p.elapsed(p.created_at + 10), 10);
        assert_eq!(p.elapsed(T + 1_000), WINDOW_MS);
        assert_eq!(p.progress(T + 1_000), 1.0);
    }

    #[test]
    fn round_name__uses_four_hex_digits_after_prefix() {
        assert_eq!(round_name("0x5a91d93d"), "Round 5A91");
        assert_eq!(round_name("0x1"), "Round 1");
    }

    #[test]
    fn demo_pools__are_open_and_named_after_round() {
        let pools = demo_pools(T);
        assert_eq!(pools.len(), 3);
        assert_eq!(pools[0].name, "Round 129");
        assert!(pools.iter().all(|p| !p.is_expired(T)));
    }

    #[tokio::test]
    async fn countdown_ticker__dispose__stops_ticks() {
        // given
        let (tx, mut rx) = mpsc::unbounded_channel();
        let ticker = CountdownTicker::spawn(Duration::from_millis(5), tx);
        rx.recv().await.unwrap();

        // when
        ticker.dispose();

        // then
        while rx.recv().await.is_some() {}
    }

    proptest! {
        #[test]
        fn sort_by_expiry__is_ordered_and_stable(expiries in prop::collection::vec(0u64..20, 0..40)) {
            let mut pools: Vec<Pool> = expiries
                .iter()
                .enumerate()
                .map(|(i, e)| pool(&i.to_string(), *e))
                .collect();
            sort_by_expiry(&mut pools);
            for pair in pools.windows(2) {
                prop_assert!(pair[0].expires_at <= pair[1].expires_at);
                if pair[0].expires_at == pair[1].expires_at {
                    let a: usize = pair[0].id.parse().unwrap();
                    let b: usize = pair[1].id.parse().unwrap();
                    prop_assert!(a < b);
                }
            }
        }
    }
}

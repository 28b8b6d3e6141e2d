use crate::{
    error::Error,
    pools::{
        MIST_PER_SUI,
        Pool,
        mist_to_sui,
        round_name,
    },
};
use rand::Rng;
use std::{
    fmt,
    str::FromStr,
};

/// Quotes travel on chain as fixed point with four decimals.
pub const QUOTE_SCALE: u64 = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TicketStatus {
    Active,
    Won,
    Lost,
    Settled,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [
        TicketStatus::Active,
        TicketStatus::Won,
        TicketStatus::Lost,
        TicketStatus::Settled,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TicketStatus::Active => "Active",
            TicketStatus::Won => "Won",
            TicketStatus::Lost => "Lost",
            TicketStatus::Settled => "Settled",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TicketStatus {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        TicketStatus::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| Error::invalid_input(format!("unknown ticket status '{raw}'")))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(TicketStatus),
}

impl StatusFilter {
    pub fn matches(self, status: TicketStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => wanted == status,
        }
    }

    /// All → Active → Won → Lost → Settled → All
    pub fn next(self) -> Self {
        match self {
            StatusFilter::All => StatusFilter::Only(TicketStatus::Active),
            StatusFilter::Only(TicketStatus::Active) => StatusFilter::Only(TicketStatus::Won),
            StatusFilter::Only(TicketStatus::Won) => StatusFilter::Only(TicketStatus::Lost),
            StatusFilter::Only(TicketStatus::Lost) => {
                StatusFilter::Only(TicketStatus::Settled)
            }
            StatusFilter::Only(TicketStatus::Settled) => StatusFilter::All,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("All"),
            StatusFilter::Only(status) => write!(f, "{status}"),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        raw.parse().map(StatusFilter::Only)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ticket {
    pub id: String,
    pub pool_id: Option<String>,
    pub round: String,
    pub quote: f64,
    pub stake_mist: u64,
    pub status: TicketStatus,
    pub placed_at: u64,
    /// Local entry awaiting the matching chain object.
    pub provisional: bool,
}

impl Ticket {
    pub fn stake_sui(&self) -> f64 {
        mist_to_sui(self.stake_mist)
    }

    fn quote_raw(&self) -> u64 {
        quote_to_raw(self.quote)
    }
}

pub fn quote_to_raw(quote: f64) -> u64 {
    if quote.is_finite() && quote > 0.0 {
        (quote * QUOTE_SCALE as f64).round() as u64
    } else {
        0
    }
}

pub fn raw_to_quote(raw: u64) -> f64 {
    raw as f64 / QUOTE_SCALE as f64
}

/// Ticket object as decoded from chain, before it is placed in a round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainTicket {
    pub id: String,
    pub pool_id: Option<String>,
    pub quote_raw: u64,
    pub stake_mist: u64,
    pub placed_at: u64,
}

impl ChainTicket {
    /// A ticket is `Active` while its pool is listed and open, `Settled` otherwise.
    pub fn into_ticket(self, pools: &[Pool], now: u64) -> Ticket {
        let pool = self
            .pool_id
            .as_deref()
            .and_then(|id| pools.iter().find(|pool| pool.id == id));
        let round = match (pool, self.pool_id.as_deref()) {
            (Some(pool), _) => pool.name.clone(),
            (None, Some(id)) => round_name(id),
            (None, None) => "Unknown round".to_string(),
        };
        let status = match pool {
            Some(pool) if !pool.is_expired(now) => TicketStatus::Active,
            _ => TicketStatus::Settled,
        };
        Ticket {
            id: self.id,
            pool_id: self.pool_id,
            round,
            quote: raw_to_quote(self.quote_raw),
            stake_mist: self.stake_mist,
            status,
            placed_at: self.placed_at,
            provisional: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Aggregates {
    pub total: usize,
    pub active: usize,
    pub total_stake_mist: u64,
    pub filtered: usize,
}

/// The player's tickets and the active status filter.
#[derive(Debug, Default)]
pub struct TicketBook {
    tickets: Vec<Ticket>,
    filter: StatusFilter,
    demo: bool,
}

impl TicketBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn demo(now: u64) -> Self {
        Self {
            tickets: demo_tickets(now),
            filter: StatusFilter::All,
            demo: true,
        }
    }

    pub fn reset_demo(&mut self, now: u64) {
        self.tickets = demo_tickets(now);
        self.demo = true;
    }

    pub fn is_demo(&self) -> bool {
        self.demo
    }

    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    pub fn current_filter(&self) -> StatusFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: StatusFilter) {
        self.filter = filter;
    }

    pub fn filter(&self, filter: StatusFilter) -> Vec<&Ticket> {
        self.tickets
            .iter()
            .filter(|ticket| filter.matches(ticket.status))
            .collect()
    }

    pub fn visible(&self) -> Vec<&Ticket> {
        self.filter(self.filter)
    }

    /// Recomputed from the full list on every call.
    pub fn aggregates(&self) -> Aggregates {
        Aggregates {
            total: self.tickets.len(),
            active: self
                .tickets
                .iter()
                .filter(|t| t.status == TicketStatus::Active)
                .count(),
            total_stake_mist: self.tickets.iter().map(|t| t.stake_mist).sum(),
            filtered: self.visible().len(),
        }
    }

    /// Prepends a provisional `Active` ticket for a purchase just submitted.
    /// The id is local until the caller swaps in the created object's id.
    pub fn record_purchase(
        &mut self,
        pool_id: &str,
        quote: f64,
        stake_mist: u64,
        now: u64,
    ) -> &mut Ticket {
        let ticket = Ticket {
            id: format!("T-{}", rand::rng().random_range(1000..10_000)),
            pool_id: Some(pool_id.to_string()),
            round: round_name(pool_id),
            quote,
            stake_mist,
            status: TicketStatus::Active,
            placed_at: now,
            provisional: true,
        };
        self.tickets.insert(0, ticket);
        &mut self.tickets[0]
    }

    /// Replaces the list with authoritative chain tickets. Provisional entries
    /// survive only until a chain ticket with the same id, or the same pool,
    /// quote and stake, shows up.
    pub fn reconcile(&mut self, mut chain: Vec<Ticket>) {
        chain.sort_by(|a, b| b.placed_at.cmp(&a.placed_at));
        let mut unmatched: Vec<&Ticket> = chain.iter().collect();
        let mut still_pending = Vec::new();
        for pending in self.tickets.drain(..).filter(|t| t.provisional) {
            let position = unmatched
                .iter()
                .position(|known| known.id == pending.id)
                .or_else(|| {
                    unmatched.iter().position(|known| {
                        known.pool_id == pending.pool_id
                            && known.quote_raw() == pending.quote_raw()
                            && known.stake_mist == pending.stake_mist
                    })
                });
            match position {
                Some(pos) => {
                    unmatched.remove(pos);
                }
                None => still_pending.push(pending),
            }
        }
        still_pending.extend(chain);
        self.tickets = still_pending;
        self.demo = false;
    }
}

fn demo_tickets(now: u64) -> Vec<Ticket> {
    let minutes = |m: u64| now.saturating_sub(m * 60 * 1000);
    let demo = |id: &str, round: &str, quote: f64, stake: u64, status, placed_at| Ticket {
        id: id.to_string(),
        pool_id: None,
        round: round.to_string(),
        quote,
        stake_mist: stake * MIST_PER_SUI,
        status,
        placed_at,
        provisional: false,
    };
    vec![
        demo("T-1001", "Round 128", 4.62, 3, TicketStatus::Active, minutes(20)),
        demo("T-1000", "Round 127", 4.75, 2, TicketStatus::Settled, minutes(70)),
        demo("T-0999", "Round 127", 4.81, 1, TicketStatus::Won, minutes(75)),
        demo("T-0998", "Round 126", 4.55, 4, TicketStatus::Lost, minutes(180)),
    ]
}

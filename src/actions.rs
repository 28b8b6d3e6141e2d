use crate::{
    address::SuiAddress,
    admin::{
        ActionKey,
        InFlightRegistry,
    },
    chain::{
        self,
        ChainReader,
        OwnedCoin,
    },
    error::{
        Error,
        Result,
    },
    gateway::ChainQuery,
    pools::{
        Pool,
        mist_to_sui,
    },
    signer::{
        ExecutionResult,
        TransactionSigner,
    },
    transactions::{
        self,
        TransactionPayload,
    },
};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdminAuthority {
    pub owner: SuiAddress,
    pub cap: SuiAddress,
}

/// Upper bound on tickets bought from one buy dialog.
pub const MAX_TICKETS_PER_PURCHASE: u64 = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PurchaseReceipt {
    pub execution: ExecutionResult,
    pub coin: SuiAddress,
    pub stake_mist: u64,
    /// The `Ticket` object the call created, when the signer reported it.
    pub ticket: Option<SuiAddress>,
}

/// Outcome of buying several tickets one call at a time. Calls stop at the
/// first failure; tickets bought before it are kept in `receipts`.
#[derive(Debug)]
pub struct PurchaseBatch {
    pub receipts: Vec<PurchaseReceipt>,
    pub failure: Option<Error>,
}

impl PurchaseBatch {
    pub fn stake_mist(&self) -> u64 {
        self.receipts.iter().map(|receipt| receipt.stake_mist).sum()
    }
}

/// Smallest owned coin that covers `price_mist` on its own.
pub fn select_coin(coins: &[OwnedCoin], price_mist: u64) -> Option<OwnedCoin> {
    coins
        .iter()
        .filter(|coin| coin.balance_mist >= price_mist)
        .min_by_key(|coin| coin.balance_mist)
        .copied()
}

/// Builds payloads from chain state and hands them to the signer.
pub struct ChainActions<G, S> {
    reader: Arc<ChainReader<G>>,
    signer: Arc<S>,
    in_flight: InFlightRegistry,
}

impl<G, S> Clone for ChainActions<G, S> {
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
            signer: Arc::clone(&self.signer),
            in_flight: self.in_flight.clone(),
        }
    }
}

impl<G, S> ChainActions<G, S>
where
    G: ChainQuery + Send + Sync,
    S: TransactionSigner + Send + Sync,
{
    pub fn new(reader: Arc<ChainReader<G>>, signer: Arc<S>) -> Self {
        Self {
            reader,
            signer,
            in_flight: InFlightRegistry::default(),
        }
    }

    pub fn reader(&self) -> &ChainReader<G> {
        &self.reader
    }

    pub fn in_flight(&self) -> &InFlightRegistry {
        &self.in_flight
    }

    pub async fn active_address(&self) -> Result<SuiAddress> {
        self.signer.active_address().await
    }

    /// Looks up the signer's `AdminCap` afresh; nothing is cached between actions.
    pub async fn resolve_capability(&self) -> Result<AdminAuthority> {
        let owner = self.signer.active_address().await?;
        let cap = self
            .reader
            .find_admin_cap(owner)
            .await?
            .ok_or(Error::CapabilityNotFound { owner })?;
        tracing::debug!(%owner, %cap, "resolved admin capability");
        Ok(AdminAuthority { owner, cap })
    }

    async fn submit(&self, payload: TransactionPayload) -> Result<ExecutionResult> {
        let result = self.signer.sign_and_execute(&payload).await;
        match &result {
            Ok(execution) => {
                tracing::info!(target = %payload.target(), digest = %execution.digest, "transaction executed")
            }
            Err(err) => tracing::warn!(target = %payload.target(), %err, "transaction failed"),
        }
        result
    }

    pub async fn buy_ticket(&self, pool: &Pool, quote: u64, now: u64) -> Result<PurchaseReceipt> {
        if pool.is_expired(now) {
            return Err(Error::invalid_input(format!("{} has expired", pool.name)));
        }
        let pool_id: SuiAddress = pool.id.parse()?;
        let owner = self.signer.active_address().await?;
        let coins = self.reader.fetch_coins(owner).await?;
        let coin = select_coin(&coins, pool.ticket_price_mist).ok_or_else(|| {
            Error::invalid_input(format!(
                "no single coin holds the {} SUI ticket price",
                mist_to_sui(pool.ticket_price_mist)
            ))
        })?;
        let payload = transactions::buy_ticket(self.reader.contract(), pool_id, coin.id, quote);
        let execution = self.submit(payload).await?;
        let ticket = execution
            .created_of_type(&format!("::{}::Ticket", chain::MODULE))
            .into_iter()
            .next();
        Ok(PurchaseReceipt {
            execution,
            coin: coin.id,
            stake_mist: pool.ticket_price_mist,
            ticket,
        })
    }

    /// One `buy_ticket` call per ticket, each funded from a fresh coin listing.
    pub async fn buy_tickets(
        &self,
        pool: &Pool,
        quote: u64,
        quantity: u64,
        now: u64,
    ) -> PurchaseBatch {
        let mut batch = PurchaseBatch {
            receipts: Vec::new(),
            failure: None,
        };
        if quantity == 0 || quantity > MAX_TICKETS_PER_PURCHASE {
            batch.failure = Some(Error::invalid_input(format!(
                "quantity must be between 1 and {MAX_TICKETS_PER_PURCHASE}"
            )));
            return batch;
        }
        for _ in 0..quantity {
            match self.buy_ticket(pool, quote, now).await {
                Ok(receipt) => batch.receipts.push(receipt),
                Err(err) => {
                    batch.failure = Some(err);
                    break;
                }
            }
        }
        batch
    }

    /// Opens a new round. With an oracle configured this is `start_game`,
    /// otherwise a plain `create_pool`.
    pub async fn start_game(&self, price_mist: u64) -> Result<ExecutionResult> {
        let authority = self.resolve_capability().await?;
        let _guard = self.in_flight.claim(authority.cap, ActionKey::StartGame)?;
        let contract = self.reader.contract();
        let payload = match contract.oracle {
            Some(oracle) => transactions::start_game(
                contract,
                authority.cap,
                oracle.holder,
                oracle.feed_id,
                price_mist,
            ),
            None => transactions::create_pool(contract, authority.cap, price_mist),
        };
        self.submit(payload).await
    }

    /// Closes a round: `fixed_price` against the oracle when one is
    /// configured, `redeem_setting` otherwise.
    pub async fn stop_pool(&self, pool_id: &str) -> Result<ExecutionResult> {
        let pool: SuiAddress = pool_id.parse()?;
        let authority = self.resolve_capability().await?;
        let _guard = self.in_flight.claim(authority.cap, ActionKey::StopPool(pool))?;
        let contract = self.reader.contract();
        let payload = match contract.oracle {
            Some(oracle) => transactions::fixed_price(contract, authority.cap, oracle.holder, pool),
            None => transactions::redeem_setting(contract, authority.cap, pool),
        };
        self.submit(payload).await
    }

    pub async fn create_oracle_setting(&self, oracle_id: &[u8]) -> Result<ExecutionResult> {
        let authority = self.resolve_capability().await?;
        let _guard = self
            .in_flight
            .claim(authority.cap, ActionKey::ConfigureOracle)?;
        let payload =
            transactions::create_oracle_setting(self.reader.contract(), authority.cap, oracle_id);
        self.submit(payload).await
    }
}

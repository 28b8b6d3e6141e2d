use crate::{
    address::SuiAddress,
    error::{
        Error,
        Result,
    },
    gateway::ChainQuery,
    signer::{
        ExecutionResult,
        TransactionSigner,
    },
    transactions::TransactionPayload,
};
use serde_json::{
    Value,
    json,
};
use std::{
    collections::VecDeque,
    sync::{
        Arc,
        Mutex,
        PoisonError,
    },
    time::Duration,
};

/// Scripted [`ChainQuery`]: answers requests in push order and records them.
#[derive(Clone, Default)]
pub struct FakeChain {
    responses: Arc<Mutex<VecDeque<Result<Value>>>>,
    requests: Arc<Mutex<Vec<(String, Value)>>>,
}

impl FakeChain {
    pub fn push_ok(&self, data: Value) {
        self.lock_responses().push_back(Ok(data));
    }

    pub fn push_err(&self, error: Error) {
        self.lock_responses().push_back(Err(error));
    }

    /// `(query, variables)` of every request so far.
    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<Value>>> {
        self.responses.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ChainQuery for FakeChain {
    async fn query(&self, query: &str, variables: Option<Value>) -> Result<Value> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((query.to_string(), variables.unwrap_or(Value::Null)));
        self.lock_responses()
            .pop_front()
            .unwrap_or_else(|| Err(Error::transport(None, "no scripted response")))
    }
}

#[derive(Default)]
struct SignerState {
    submitted: Vec<TransactionPayload>,
    failures: VecDeque<String>,
    next_digest: u64,
}

/// Records payloads instead of signing them.
#[derive(Clone)]
pub struct FakeSigner {
    address: SuiAddress,
    delay: Duration,
    created_type: Option<String>,
    state: Arc<Mutex<SignerState>>,
}

impl Default for FakeSigner {
    fn default() -> Self {
        Self {
            address: SuiAddress::new([0x11; 32]),
            delay: Duration::ZERO,
            created_type: None,
            state: Arc::default(),
        }
    }
}

impl FakeSigner {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every execution reports one created object of `object_type`, with ids
    /// `0x7001`, `0x7002`, ... in execution order.
    pub fn creating(mut self, object_type: impl Into<String>) -> Self {
        self.created_type = Some(object_type.into());
        self
    }

    pub fn address(&self) -> SuiAddress {
        self.address
    }

    pub fn fail_next(&self, message: impl Into<String>) {
        self.lock().failures.push_back(message.into());
    }

    pub fn submitted(&self) -> Vec<TransactionPayload> {
        self.lock().submitted.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SignerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TransactionSigner for FakeSigner {
    async fn active_address(&self) -> Result<SuiAddress> {
        Ok(self.address)
    }

    async fn sign_and_execute(&self, payload: &TransactionPayload) -> Result<ExecutionResult> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let mut state = self.lock();
        if let Some(message) = state.failures.pop_front() {
            return Err(Error::Signing(message));
        }
        state.submitted.push(payload.clone());
        state.next_digest += 1;
        let object_changes = self
            .created_type
            .iter()
            .map(|object_type| {
                json!({
                    "type": "created",
                    "objectType": object_type,
                    "objectId": format!("0x{}", 7000 + state.next_digest),
                })
            })
            .collect();
        Ok(ExecutionResult {
            digest: format!("digest-{}", state.next_digest),
            object_changes,
        })
    }
}

/// Pool object node in the `asMoveObject.contents.data.Struct` shape.
pub fn pool_node(address: &str, price: u64, balance: u64, end_time: u64) -> Value {
    json!({
        "address": address,
        "asMoveObject": { "contents": { "data": { "Struct": [
            { "name": "id", "value": { "UID": address } },
            { "name": "price", "value": { "Number": price.to_string() } },
            { "name": "balance", "value": { "Number": balance.to_string() } },
            { "name": "end_time", "value": { "Number": end_time.to_string() } }
        ] } } }
    })
}

/// Single-page `objects` listing.
pub fn pools_response(nodes: Vec<Value>) -> Value {
    json!({ "objects": {
        "pageInfo": { "hasNextPage": false, "endCursor": null },
        "nodes": nodes,
    } })
}

pub fn admin_cap_response(cap: &str) -> Value {
    json!({ "address": { "objects": { "nodes": [{ "address": cap }] } } })
}

pub fn coins_response(coins: &[(&str, u64)]) -> Value {
    let nodes: Vec<Value> = coins
        .iter()
        .map(|(address, balance)| json!({ "address": address, "coinBalance": balance.to_string() }))
        .collect();
    json!({ "address": { "coins": {
        "pageInfo": { "hasNextPage": false, "endCursor": null },
        "nodes": nodes,
    } } })
}

/// Creator lookup answer for pools `p0..pN` in order.
pub fn creators_response(senders: &[&str]) -> Value {
    let entries = senders.iter().enumerate().map(|(index, sender)| {
        (
            format!("p{index}"),
            json!({ "previousTransactionBlock": { "sender": { "address": sender } } }),
        )
    });
    Value::Object(entries.collect())
}

//! Move call payloads for the prediction-pool package.
//!
//! Builders only arrange arguments in entry-point order. They never check
//! balances, expiry or ownership and never submit anything.

use crate::{
    address::SuiAddress,
    chain::{
        ContractConfig,
        MODULE,
    },
};
use itertools::Itertools;
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CallArg {
    Object(SuiAddress),
    U32(u32),
    U64(u64),
    Bytes(Vec<u8>),
}

impl CallArg {
    /// Argument as the `sui client call --args` flag expects it.
    pub fn to_cli_arg(&self) -> String {
        match self {
            CallArg::Object(id) => id.to_string(),
            CallArg::U32(n) => n.to_string(),
            CallArg::U64(n) => n.to_string(),
            CallArg::Bytes(bytes) => format!("[{}]", bytes.iter().join(",")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPayload {
    pub package: SuiAddress,
    pub module: String,
    pub function: String,
    pub arguments: Vec<CallArg>,
}

impl TransactionPayload {
    fn call(contract: &ContractConfig, function: &str, arguments: Vec<CallArg>) -> Self {
        Self {
            package: contract.package,
            module: MODULE.to_string(),
            function: function.to_string(),
            arguments,
        }
    }

    pub fn target(&self) -> String {
        format!("{}::{}::{}", self.package, self.module, self.function)
    }
}

impl fmt::Display for TransactionPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({})",
            self.target(),
            self.arguments.iter().map(CallArg::to_cli_arg).join(", ")
        )
    }
}

pub fn buy_ticket(
    contract: &ContractConfig,
    pool: SuiAddress,
    coin: SuiAddress,
    quote: u64,
) -> TransactionPayload {
    TransactionPayload::call(
        contract,
        "buy_ticket",
        vec![CallArg::Object(pool), CallArg::Object(coin), CallArg::U64(quote)],
    )
}

pub fn create_pool(
    contract: &ContractConfig,
    admin_cap: SuiAddress,
    price: u64,
) -> TransactionPayload {
    TransactionPayload::call(
        contract,
        "create_pool",
        vec![
            CallArg::Object(admin_cap),
            CallArg::U64(price),
            CallArg::Object(SuiAddress::CLOCK),
        ],
    )
}

pub fn start_game(
    contract: &ContractConfig,
    admin_cap: SuiAddress,
    oracle_holder: SuiAddress,
    oracle_id: u32,
    price: u64,
) -> TransactionPayload {
    TransactionPayload::call(
        contract,
        "start_game",
        vec![
            CallArg::Object(admin_cap),
            CallArg::Object(oracle_holder),
            CallArg::U32(oracle_id),
            CallArg::U64(price),
            CallArg::Object(SuiAddress::CLOCK),
        ],
    )
}

pub fn fixed_price(
    contract: &ContractConfig,
    admin_cap: SuiAddress,
    oracle_holder: SuiAddress,
    pool: SuiAddress,
) -> TransactionPayload {
    TransactionPayload::call(
        contract,
        "fixed_price",
        vec![
            CallArg::Object(admin_cap),
            CallArg::Object(oracle_holder),
            CallArg::Object(pool),
        ],
    )
}

pub fn redeem_setting(
    contract: &ContractConfig,
    admin_cap: SuiAddress,
    pool: SuiAddress,
) -> TransactionPayload {
    TransactionPayload::call(
        contract,
        "redeem_setting",
        vec![
            CallArg::Object(admin_cap),
            CallArg::Object(pool),
            CallArg::Object(SuiAddress::CLOCK),
        ],
    )
}

pub fn redeem(
    contract: &ContractConfig,
    ticket: SuiAddress,
    pool: SuiAddress,
) -> TransactionPayload {
    TransactionPayload::call(
        contract,
        "redeem",
        vec![CallArg::Object(ticket), CallArg::Object(pool)],
    )
}

pub fn create_oracle_setting(
    contract: &ContractConfig,
    admin_cap: SuiAddress,
    oracle_id: &[u8],
) -> TransactionPayload {
    TransactionPayload::call(
        contract,
        "create_oracle_setting",
        vec![CallArg::Object(admin_cap), CallArg::Bytes(oracle_id.to_vec())],
    )
}

use crate::{
    address::SuiAddress,
    decode::{
        self,
        connection_nodes,
    },
    error::{
        Error,
        Result,
    },
    gateway::ChainQuery,
    pools::Pool,
    tickets::ChainTicket,
};
use serde_json::{
    Value,
    json,
};
use std::{
    collections::HashMap,
    fmt::Write,
};

pub const DEFAULT_PACKAGE: &str =
    "0x70d3045213d0ff5858539b77932bdd6aea5e044b9fb9408f8e3085b3c8b52288";
pub const MODULE: &str = "suipredict";
pub const SUI_COIN_TYPE: &str = "0x2::sui::SUI";

pub const PAGE_SIZE: u32 = 50;
/// Listings stop following cursors after this many pages.
pub const MAX_PAGES: usize = 20;
/// Pool addresses per aliased creator query.
pub const CREATOR_BATCH: usize = 50;

const OBJECTS_QUERY: &str = r#"
query Objects($type: String!, $first: Int, $after: String) {
  objects(filter: { type: $type }, first: $first, after: $after) {
    pageInfo { hasNextPage endCursor }
    nodes {
      address
      asMoveObject { contents { data json } }
    }
  }
}
"#;

const OWNED_OBJECTS_QUERY: &str = r#"
query OwnedObjects($owner: SuiAddress!, $type: String!, $first: Int, $after: String) {
  address(address: $owner) {
    objects(filter: { type: $type }, first: $first, after: $after) {
      pageInfo { hasNextPage endCursor }
      nodes {
        address
        asMoveObject { contents { data json } }
      }
    }
  }
}
"#;

const COINS_QUERY: &str = r#"
query Coins($owner: SuiAddress!, $type: String!, $first: Int, $after: String) {
  address(address: $owner) {
    coins(type: $type, first: $first, after: $after) {
      pageInfo { hasNextPage endCursor }
      nodes { address coinBalance }
    }
  }
}
"#;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OracleConfig {
    pub holder: SuiAddress,
    pub feed_id: u32,
}

/// Where the game contract lives and how its rounds are priced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractConfig {
    pub package: SuiAddress,
    pub oracle: Option<OracleConfig>,
}

impl ContractConfig {
    pub fn new(package: SuiAddress) -> Self {
        Self {
            package,
            oracle: None,
        }
    }

    pub fn with_oracle(mut self, oracle: OracleConfig) -> Self {
        self.oracle = Some(oracle);
        self
    }

    fn type_tag(&self, name: &str) -> String {
        format!("{}::{MODULE}::{name}", self.package)
    }

    pub fn pool_type(&self) -> String {
        self.type_tag("Pool")
    }

    pub fn admin_cap_type(&self) -> String {
        self.type_tag("AdminCap")
    }

    pub fn ticket_type(&self) -> String {
        self.type_tag("Ticket")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OwnedCoin {
    pub id: SuiAddress,
    pub balance_mist: u64,
}

/// Typed chain reads on top of a [`ChainQuery`] transport.
#[derive(Clone, Debug)]
pub struct ChainReader<G> {
    gateway: G,
    contract: ContractConfig,
}

impl<G: ChainQuery> ChainReader<G> {
    pub fn new(gateway: G, contract: ContractConfig) -> Self {
        Self { gateway, contract }
    }

    pub fn contract(&self) -> &ContractConfig {
        &self.contract
    }

    /// Follows `pageInfo` cursors of the connection at `path` and collects its nodes.
    async fn paginate(&self, query: &str, mut variables: Value, path: &str) -> Result<Vec<Value>> {
        let mut nodes = Vec::new();
        let mut cursor: Option<String> = None;
        for page in 0..MAX_PAGES {
            variables["first"] = json!(PAGE_SIZE);
            variables["after"] = json!(cursor);
            let data = self.gateway.query(query, Some(variables.clone())).await?;
            let connection = match data.pointer(path) {
                Some(Value::Null) | None if path.starts_with("/address") => {
                    return Ok(nodes);
                }
                Some(connection) => connection,
                None => {
                    return Err(Error::decode(format!("response has no {path} connection")));
                }
            };
            nodes.extend(connection_nodes(connection).into_iter().cloned());
            let has_next = connection
                .pointer("/pageInfo/hasNextPage")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            cursor = connection
                .pointer("/pageInfo/endCursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if !has_next || cursor.is_none() {
                return Ok(nodes);
            }
            tracing::debug!(page, fetched = nodes.len(), "following page cursor");
        }
        tracing::warn!(path, fetched = nodes.len(), "page limit reached; listing truncated");
        Ok(nodes)
    }

    pub async fn fetch_pools(&self) -> Result<Vec<Pool>> {
        let nodes = self
            .paginate(
                OBJECTS_QUERY,
                json!({ "type": self.contract.pool_type() }),
                "/objects",
            )
            .await?;
        let pools: Vec<Pool> = nodes.iter().filter_map(decode::decode_pool).collect();
        tracing::debug!(nodes = nodes.len(), pools = pools.len(), "fetched pools");
        Ok(pools)
    }

    /// Senders of each pool's previous transaction, keyed by the id as given.
    /// Ids that are not valid addresses are skipped.
    pub async fn fetch_pool_creators(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, SuiAddress>> {
        let valid: Vec<(&String, SuiAddress)> = ids
            .iter()
            .filter_map(|id| match id.parse::<SuiAddress>() {
                Ok(address) => Some((id, address)),
                Err(err) => {
                    tracing::warn!(%err, "skipping creator lookup");
                    None
                }
            })
            .collect();
        let mut creators = HashMap::new();
        for batch in valid.chunks(CREATOR_BATCH) {
            let query = creators_query(batch.iter().map(|(_, address)| *address));
            let data = self.gateway.query(&query, None).await?;
            for (index, (id, _)) in batch.iter().enumerate() {
                let sender = data
                    .pointer(&format!("/p{index}/previousTransactionBlock/sender/address"))
                    .and_then(decode::address);
                if let Some(sender) = sender {
                    creators.insert((*id).clone(), sender);
                }
            }
        }
        Ok(creators)
    }

    /// Pools with their creators filled in. A failed creator lookup leaves
    /// creators empty instead of failing the listing.
    pub async fn fetch_pools_with_creators(&self) -> Result<Vec<Pool>> {
        let mut pools = self.fetch_pools().await?;
        let ids: Vec<String> = pools.iter().map(|pool| pool.id.clone()).collect();
        match self.fetch_pool_creators(&ids).await {
            Ok(creators) => {
                for pool in &mut pools {
                    pool.creator = creators.get(&pool.id).copied();
                }
            }
            Err(err) => tracing::warn!(%err, "creator lookup failed"),
        }
        Ok(pools)
    }

    pub async fn find_admin_cap(&self, owner: SuiAddress) -> Result<Option<SuiAddress>> {
        let variables = json!({
            "owner": owner.to_string(),
            "type": self.contract.admin_cap_type(),
            "first": 1,
        });
        let data = self.gateway.query(OWNED_OBJECTS_QUERY, Some(variables)).await?;
        let cap = data
            .pointer("/address/objects")
            .map(connection_nodes)
            .unwrap_or_default()
            .into_iter()
            .find_map(|node| node.get("address").and_then(decode::address));
        Ok(cap)
    }

    pub async fn fetch_tickets(&self, owner: SuiAddress) -> Result<Vec<ChainTicket>> {
        let nodes = self
            .paginate(
                OWNED_OBJECTS_QUERY,
                json!({
                    "owner": owner.to_string(),
                    "type": self.contract.ticket_type(),
                }),
                "/address/objects",
            )
            .await?;
        Ok(nodes.iter().filter_map(decode::decode_ticket).collect())
    }

    pub async fn fetch_coins(&self, owner: SuiAddress) -> Result<Vec<OwnedCoin>> {
        let nodes = self
            .paginate(
                COINS_QUERY,
                json!({ "owner": owner.to_string(), "type": SUI_COIN_TYPE }),
                "/address/coins",
            )
            .await?;
        let coins = nodes
            .iter()
            .filter_map(|node| {
                let id = node.get("address").and_then(decode::address)?;
                let balance_mist = node.get("coinBalance").and_then(decode::numeric)?;
                Some(OwnedCoin { id, balance_mist })
            })
            .collect();
        Ok(coins)
    }
}

fn creators_query(addresses: impl Iterator<Item = SuiAddress>) -> String {
    let mut query = String::from("query Creators {\n");
    for (index, address) in addresses.enumerate() {
        // writing into a String cannot fail
        let _ = writeln!(
            query,
            "  p{index}: object(address: \"{address}\") {{ previousTransactionBlock {{ sender {{ address }} }} }}"
        );
    }
    query.push('}');
    query
}

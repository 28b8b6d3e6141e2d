//! Lenient decoding of Move object contents as served by the GraphQL endpoint.
//!
//! On-chain field encodings are not a stable contract for this client, so every
//! accessor here accepts several shapes and reports `None` instead of failing.
//! Callers decide what a missing value defaults to and record that it did.

use crate::{
    address::SuiAddress,
    pools::{
        Pool,
        PoolField,
        WINDOW_MS,
        round_name,
    },
    tickets::ChainTicket,
};
use serde_json::{
    Map,
    Value,
};
use std::collections::HashMap;

pub type FieldMap<'a> = HashMap<&'a str, &'a Value>;

/// Nodes of a GraphQL connection, accepting both `nodes` and `edges[].node`.
pub fn connection_nodes(connection: &Value) -> Vec<&Value> {
    if let Some(nodes) = connection.get("nodes").and_then(Value::as_array) {
        return nodes.iter().collect();
    }
    connection
        .get("edges")
        .and_then(Value::as_array)
        .map(|edges| edges.iter().filter_map(|edge| edge.get("node")).collect())
        .unwrap_or_default()
}

/// Field map of a Move object node (`asMoveObject.contents`).
pub fn object_fields(node: &Value) -> FieldMap<'_> {
    let Some(contents) = node.pointer("/asMoveObject/contents") else {
        return FieldMap::new();
    };
    if let Some(fields) = contents.get("data").and_then(struct_fields) {
        return fields;
    }
    contents
        .get("json")
        .and_then(Value::as_object)
        .map(plain_fields)
        .unwrap_or_default()
}

/// Flattens `{"Struct": [{name, value}, ..]}` (or the keyed-object variant of the
/// same list) into a name lookup.
pub fn struct_fields(data: &Value) -> Option<FieldMap<'_>> {
    let raw = data.get("Struct")?;
    let entries: Vec<&Value> = match raw {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => return None,
    };
    let fields = entries
        .into_iter()
        .filter_map(|entry| {
            let name = entry.get("name")?.as_str()?;
            let value = entry.get("value")?;
            Some((name, value))
        })
        .collect();
    Some(fields)
}

fn plain_fields(map: &Map<String, Value>) -> FieldMap<'_> {
    map.iter().map(|(k, v)| (k.as_str(), v)).collect()
}

/// Resolves an unsigned integer from a direct number, a numeric string, or a
/// wrapper (`Number`, `value`, `fields.value`, a `Struct` with a `value` field).
pub fn numeric(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => parse_numeric_str(s),
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(non_negative)),
        Value::Object(map) => map
            .get("Number")
            .or_else(|| map.get("value"))
            .and_then(numeric)
            .or_else(|| map.get("fields").and_then(|f| f.get("value")).and_then(numeric))
            .or_else(|| {
                struct_fields(value)
                    .and_then(|fields| fields.get("value").copied())
                    .and_then(numeric)
            }),
        _ => None,
    }
}

fn parse_numeric_str(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    raw.parse::<u64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().and_then(non_negative))
}

fn non_negative(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0).then_some(value as u64)
}

/// Resolves an object or account address from a hex string, a raw byte array,
/// or a wrapper (`Address`, `ID`, `UID`, `id`, `bytes`).
pub fn address(value: &Value) -> Option<SuiAddress> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Array(items) => {
            let bytes = items
                .iter()
                .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                .collect::<Option<Vec<u8>>>()?;
            SuiAddress::from_slice(&bytes)
        }
        Value::Object(map) => ["Address", "ID", "UID", "id", "bytes", "value"]
            .iter()
            .find_map(|key| map.get(*key).and_then(address))
            .or_else(|| {
                let fields = struct_fields(value)?;
                ["id", "bytes"]
                    .iter()
                    .find_map(|key| fields.get(key).and_then(|v| address(v)))
            }),
        _ => None,
    }
}

fn first_numeric(fields: &FieldMap<'_>, names: &[&str]) -> Option<u64> {
    names
        .iter()
        .find_map(|name| fields.get(name).and_then(|v| numeric(v)))
}

/// Canonical form of a node's `address`, so ids compare equal however the
/// endpoint abbreviates them.
fn node_id(node: &Value) -> Option<String> {
    let raw = node.get("address")?;
    match address(raw) {
        Some(id) => Some(id.to_string()),
        None => {
            tracing::warn!(address = %raw, "skipping node with invalid address");
            None
        }
    }
}

/// Decodes one pool node. Returns `None` only when the node has no valid
/// address; unresolvable numeric fields default to zero and are listed in
/// [`Pool::defaulted`].
pub fn decode_pool(node: &Value) -> Option<Pool> {
    let id = node_id(node)?;
    let fields = object_fields(node);
    let mut defaulted = Vec::new();
    let mut field = |which: PoolField, names: &[&str]| {
        first_numeric(&fields, names).unwrap_or_else(|| {
            tracing::warn!(pool = %id, field = ?which, "defaulting undecodable pool field to zero");
            defaulted.push(which);
            0
        })
    };
    let ticket_price_mist = field(PoolField::TicketPrice, &["price", "ticket_price"]);
    let pot_mist = field(PoolField::Balance, &["balance", "pot"]);
    let expires_at = field(PoolField::EndTime, &["end_time", "expires_at"]);
    let created_at = if expires_at > 0 {
        expires_at.saturating_sub(WINDOW_MS)
    } else {
        0
    };
    Some(Pool {
        name: round_name(&id),
        id,
        created_at,
        expires_at,
        pot_mist,
        ticket_price_mist,
        creator: None,
        defaulted,
    })
}

/// Decodes one owned ticket node; missing numbers default to zero.
pub fn decode_ticket(node: &Value) -> Option<ChainTicket> {
    let id = node_id(node)?;
    let fields = object_fields(node);
    let pool_id = ["pool_id", "pool"]
        .iter()
        .find_map(|name| fields.get(name).and_then(|v| address(v)))
        .map(|address| address.to_string());
    let quote_raw = first_numeric(&fields, &["price", "quote", "guess"]);
    let stake_mist = first_numeric(&fields, &["amount", "stake", "paid"]);
    if quote_raw.is_none() || stake_mist.is_none() {
        tracing::warn!(ticket = %id, "ticket fields missing; defaulting to zero");
    }
    Some(ChainTicket {
        id,
        pool_id,
        quote_raw: quote_raw.unwrap_or_default(),
        stake_mist: stake_mist.unwrap_or_default(),
        placed_at: first_numeric(&fields, &["timestamp", "created_at", "buy_time"])
            .unwrap_or_default(),
    })
}

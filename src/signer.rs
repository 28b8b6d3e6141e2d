use crate::{
    address::SuiAddress,
    error::{
        Error,
        Result,
    },
    transactions::{
        CallArg,
        TransactionPayload,
    },
};
use serde_json::Value;
use std::{
    ffi::OsString,
    path::PathBuf,
};
use tokio::process::Command;

pub const DEFAULT_SUI_BIN: &str = "sui";
pub const DEFAULT_GAS_BUDGET: u64 = 100_000_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionResult {
    pub digest: String,
    pub object_changes: Vec<Value>,
}

impl ExecutionResult {
    /// Ids of created objects whose type ends with `type_suffix`.
    pub fn created_of_type(&self, type_suffix: &str) -> Vec<SuiAddress> {
        self.object_changes
            .iter()
            .filter(|change| change.get("type").and_then(Value::as_str) == Some("created"))
            .filter(|change| {
                change
                    .get("objectType")
                    .and_then(Value::as_str)
                    .is_some_and(|ty| ty.ends_with(type_suffix))
            })
            .filter_map(|change| change.get("objectId")?.as_str()?.parse().ok())
            .collect()
    }
}

/// Wallet boundary: whoever holds the keys signs and executes payloads.
pub trait TransactionSigner {
    fn active_address(&self) -> impl Future<Output = Result<SuiAddress>> + Send;

    fn sign_and_execute(
        &self,
        payload: &TransactionPayload,
    ) -> impl Future<Output = Result<ExecutionResult>> + Send;
}

/// Signs through the `sui` CLI and its active keystore entry.
#[derive(Clone, Debug)]
pub struct SuiCliSigner {
    bin: PathBuf,
    gas_budget: u64,
}

impl SuiCliSigner {
    pub fn new(bin: impl Into<PathBuf>, gas_budget: u64) -> Self {
        Self {
            bin: bin.into(),
            gas_budget,
        }
    }

    fn call_args(&self, payload: &TransactionPayload) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "client".into(),
            "call".into(),
            "--package".into(),
            payload.package.to_string().into(),
            "--module".into(),
            payload.module.clone().into(),
            "--function".into(),
            payload.function.clone().into(),
        ];
        if !payload.arguments.is_empty() {
            args.push("--args".into());
            args.extend(payload.arguments.iter().map(CallArg::to_cli_arg).map(OsString::from));
        }
        args.extend([
            "--gas-budget".into(),
            self.gas_budget.to_string().into(),
            "--json".into(),
        ]);
        args
    }

    async fn run(&self, args: Vec<OsString>) -> Result<Vec<u8>> {
        let output = Command::new(&self.bin)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::Signing(format!("failed to run {}: {e}", self.bin.display())))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Signing(format!(
                "{} exited with {}: {}",
                self.bin.display(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

impl TransactionSigner for SuiCliSigner {
    async fn active_address(&self) -> Result<SuiAddress> {
        let stdout = self.run(vec!["client".into(), "active-address".into()]).await?;
        String::from_utf8_lossy(&stdout).trim().parse()
    }

    async fn sign_and_execute(&self, payload: &TransactionPayload) -> Result<ExecutionResult> {
        tracing::info!(target = %payload.target(), "submitting transaction");
        let stdout = self.run(self.call_args(payload)).await?;
        let response: Value = serde_json::from_slice(&stdout)?;
        parse_execution(response)
    }
}

fn parse_execution(response: Value) -> Result<ExecutionResult> {
    let status = response
        .pointer("/effects/status/status")
        .and_then(Value::as_str)
        .unwrap_or("success");
    if status != "success" {
        let reason = response
            .pointer("/effects/status/error")
            .and_then(Value::as_str)
            .unwrap_or(status);
        return Err(Error::Execution(reason.to_string()));
    }
    let digest = response
        .get("digest")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::decode("transaction response has no digest"))?
        .to_string();
    let object_changes = response
        .get("objectChanges")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    Ok(ExecutionResult {
        digest,
        object_changes,
    })
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chain::ContractConfig,
        transactions,
    };
    use serde_json::json;

    #[test]
    fn call_args__lists_target_arguments_and_budget() {
        // given
        let signer = SuiCliSigner::new("sui", 5_000);
        let contract = ContractConfig::new("0xbeef".parse().unwrap());
        let payload = transactions::create_pool(&contract, "0xca".parse().unwrap(), 10);

        // when
        let args: Vec<String> = signer
            .call_args(&payload)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        // then
        assert_eq!(&args[..2], ["client", "call"]);
        assert_eq!(args[6..8], ["--function".to_string(), "create_pool".to_string()]);
        let args_at = args.iter().position(|a| a == "--args").unwrap();
        assert_eq!(args[args_at + 2], "10");
        assert_eq!(args[args_at + 3], SuiAddress::CLOCK.to_string());
        assert_eq!(&args[args.len() - 3..], ["--gas-budget", "5000", "--json"]);
    }

    #[test]
    fn parse_execution__failure_status__is_execution_error() {
        let response = json!({
            "digest": "abc",
            "effects": { "status": { "status": "failure", "error": "MoveAbort(4)" } }
        });
        let err = parse_execution(response).unwrap_err();
        assert!(matches!(err, Error::Execution(ref reason) if reason == "MoveAbort(4)"));
    }

    #[test]
    fn created_of_type__filters_created_objects() {
        // given
        let result = parse_execution(json!({
            "digest": "d1",
            "effects": { "status": { "status": "success" } },
            "objectChanges": [
                { "type": "created", "objectType": "0xbeef::suipredict::Ticket", "objectId": "0x11" },
                { "type": "mutated", "objectType": "0xbeef::suipredict::Pool", "objectId": "0x12" },
                { "type": "created", "objectType": "0x2::coin::Coin<0x2::sui::SUI>", "objectId": "0x13" }
            ]
        }))
        .unwrap();

        // when
        let tickets = result.created_of_type("::suipredict::Ticket");

        // then
        assert_eq!(result.digest, "d1");
        assert_eq!(tickets, vec!["0x11".parse().unwrap()]);
    }

    #[tokio::test]
    async fn sign_and_execute__missing_binary__is_signing_error() {
        let signer = SuiCliSigner::new("/nonexistent/sui-binary", 1);
        let contract = ContractConfig::new(SuiAddress::CLOCK);
        let payload = transactions::redeem(&contract, SuiAddress::CLOCK, SuiAddress::CLOCK);
        let err = signer.sign_and_execute(&payload).await.unwrap_err();
        assert!(matches!(err, Error::Signing(_)));
    }
}

use crate::encoding::{self, parse_u256_field};
use crate::error::{Error, Result};
use crate::retry;
use crate::types::{SponsorshipResult, UnsignedOperation};
use ethers::types::Address;
use serde_json::Value;

/// Fee-sponsor (verifying paymaster) web service client.
///
/// The sponsor simulates the draft operation and, if it agrees to pay,
/// returns authoritative gas limits plus the `paymasterAndData` payload that
/// proves sponsorship at validation time.
#[derive(Debug, Clone)]
pub struct PaymasterClient {
    url: String,
    http: reqwest::Client,
}

impl PaymasterClient {
    pub fn new(url: String) -> Result<Self> {
        Ok(Self {
            url,
            http: retry::http_client()?,
        })
    }

    /// Per-request deadline override; the default is crate-wide.
    pub fn with_request_timeout(mut self, timeout: std::time::Duration) -> Result<Self> {
        self.http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// Request sponsorship for a draft operation.
    ///
    /// A sponsor-side decline (simulation revert, unsupported entrypoint,
    /// policy refusal) surfaces as `SponsorshipRejected` and is not retried;
    /// transport failures are retried with bounded backoff.
    pub async fn sponsor_user_operation(
        &self,
        op: &UnsignedOperation,
        entrypoint: Address,
    ) -> Result<SponsorshipResult> {
        let params = serde_json::json!([
            encoding::user_op_to_json(op.fields()),
            encoding::fmt_address(entrypoint)
        ]);

        let res = retry::idempotent(retry::DEFAULT_ATTEMPTS, || {
            self.rpc("pm_sponsorUserOperation", params.clone())
        })
        .await
        .map_err(|e| match e {
            Error::Rpc { message, .. } => Error::SponsorshipRejected(message),
            other => other,
        })?;

        let result = parse_sponsorship(&res)?;
        tracing::info!(
            call_gas_limit = %result.call_gas_limit,
            verification_gas_limit = %result.verification_gas_limit,
            pre_verification_gas = %result.pre_verification_gas,
            "sponsorship granted"
        );
        Ok(result)
    }

    async fn rpc(&self, method: &str, params: Value) -> Result<Value> {
        let req = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let resp = self.http.post(&self.url).json(&req).send().await?;
        let status = resp.status();
        let body: Value = resp.json().await?;

        if !status.is_success() {
            return Err(Error::Rpc {
                method: method.to_string(),
                message: format!("HTTP {status}: {body}"),
            });
        }

        if let Some(err) = body.get("error") {
            return Err(Error::Rpc {
                method: method.to_string(),
                message: err.to_string(),
            });
        }

        body.get("result").cloned().ok_or_else(|| Error::Rpc {
            method: method.to_string(),
            message: "missing result field".to_string(),
        })
    }
}

fn parse_sponsorship(result: &Value) -> Result<SponsorshipResult> {
    let pm_hex = result
        .get("paymasterAndData")
        .and_then(|x| x.as_str())
        .ok_or_else(|| Error::Response("sponsorship result missing paymasterAndData".into()))?;

    Ok(SponsorshipResult {
        pre_verification_gas: parse_u256_field(result, "preVerificationGas")?,
        verification_gas_limit: parse_u256_field(result, "verificationGasLimit")?,
        call_gas_limit: parse_u256_field(result, "callGasLimit")?,
        paymaster_and_data: encoding::parse_bytes(pm_hex)?,
    })
}

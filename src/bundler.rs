use crate::encoding::{self, parse_h256, parse_u256_field};
use crate::error::{Error, Result};
use crate::retry;
use crate::types::{GasEstimates, GasFees, GasPriceTiers, Receipt, SignedOperation, UnsignedOperation};
use ethers::types::{Address, H256};
use serde_json::Value;
use std::time::{Duration, Instant};

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// Relay network (bundler) client: fee tiers, gas estimation, submission and
/// receipt polling over ERC-4337 JSON-RPC.
#[derive(Debug, Clone)]
pub struct BundlerClient {
    url: String,
    http: reqwest::Client,
    poll_interval: Duration,
}

impl BundlerClient {
    pub fn new(url: String) -> Result<Self> {
        Ok(Self {
            url,
            http: retry::http_client()?,
            poll_interval: RECEIPT_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Per-request deadline override; the default is crate-wide.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// Current fee tiers from the relay. Read-through, no caching; transport
    /// failures are retried a bounded number of times.
    pub async fn gas_price_tiers(&self) -> Result<GasPriceTiers> {
        retry::idempotent(retry::DEFAULT_ATTEMPTS, || self.gas_price_tiers_once()).await
    }

    async fn gas_price_tiers_once(&self) -> Result<GasPriceTiers> {
        let res = self
            .rpc("pimlico_getUserOperationGasPrice", serde_json::json!([]))
            .await?;
        Ok(GasPriceTiers {
            slow: parse_gas_fees(&res, "slow")?,
            standard: parse_gas_fees(&res, "standard")?,
            fast: parse_gas_fees(&res, "fast")?,
        })
    }

    /// Dry-run gas limits for an unsponsored draft.
    pub async fn estimate_user_operation_gas(
        &self,
        op: &UnsignedOperation,
        entrypoint: Address,
    ) -> Result<GasEstimates> {
        let params = serde_json::json!([
            encoding::user_op_to_json(op.fields()),
            encoding::fmt_address(entrypoint)
        ]);
        let res = self.rpc("eth_estimateUserOperationGas", params).await?;

        Ok(GasEstimates {
            call_gas_limit: parse_u256_field(&res, "callGasLimit")?,
            verification_gas_limit: parse_u256_field(&res, "verificationGasLimit")?,
            pre_verification_gas: parse_u256_field(&res, "preVerificationGas")?,
        })
    }

    /// Submit a signed operation for bundling. A single shot, never retried:
    /// resubmitting could land the operation twice. A relay-side error comes
    /// back verbatim as `SubmissionRejected`.
    pub async fn send_user_operation(
        &self,
        op: &SignedOperation,
        entrypoint: Address,
    ) -> Result<H256> {
        let params = serde_json::json!([
            encoding::user_op_to_json(op.fields()),
            encoding::fmt_address(entrypoint)
        ]);
        let res = self
            .rpc("eth_sendUserOperation", params)
            .await
            .map_err(|e| match e {
                Error::Rpc { message, .. } => Error::SubmissionRejected(message),
                other => other,
            })?;
        let hash = parse_userop_hash(&res)?;
        tracing::info!(user_op_hash = %encoding::fmt_h256(hash), "user operation submitted");
        Ok(hash)
    }

    /// Poll for a receipt at a fixed interval until it appears or `timeout`
    /// elapses. Timing out is not a rejection; the operation may still be
    /// included later and the caller can poll again.
    pub async fn wait_user_operation_receipt(
        &self,
        user_op_hash: H256,
        timeout: Duration,
    ) -> Result<Receipt> {
        let start = Instant::now();
        loop {
            if start.elapsed() > timeout {
                return Err(Error::ReceiptTimeout {
                    user_op_hash,
                    waited: timeout,
                });
            }

            let params = serde_json::json!([encoding::fmt_h256(user_op_hash)]);
            match self.rpc("eth_getUserOperationReceipt", params).await {
                Ok(v) if !v.is_null() => return parse_receipt(&v),
                Ok(_) => {}
                Err(e) => {
                    // a failed poll is not a verdict; the deadline above bounds the loop
                    tracing::warn!(error = %e, "receipt poll failed, retrying");
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
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

fn parse_gas_fees(v: &Value, tier: &str) -> Result<GasFees> {
    let obj = v
        .get(tier)
        .ok_or_else(|| Error::Response(format!("missing gas price tier {tier}")))?;
    Ok(GasFees {
        max_fee_per_gas: parse_u256_field(obj, "maxFeePerGas")?,
        max_priority_fee_per_gas: parse_u256_field(obj, "maxPriorityFeePerGas")?,
    })
}

fn parse_userop_hash(res: &Value) -> Result<H256> {
    // Most bundlers return the userOpHash directly as a JSON string; some
    // wrap it in an object. Accept both shapes.
    let hash_str = if let Some(s) = res.as_str() {
        s
    } else if let Some(s) = res.get("result").and_then(|v| v.as_str()) {
        s
    } else if let Some(s) = res.get("userOpHash").and_then(|v| v.as_str()) {
        s
    } else if let Some(s) = res.get("userOperationHash").and_then(|v| v.as_str()) {
        s
    } else {
        return Err(Error::Response(format!(
            "unexpected eth_sendUserOperation result shape (expected string or {{result: ...}}): {res}"
        )));
    };

    parse_h256(hash_str)
}

fn parse_receipt(v: &Value) -> Result<Receipt> {
    let user_op_hash = v
        .get("userOpHash")
        .and_then(|x| x.as_str())
        .ok_or_else(|| Error::Response("receipt missing userOpHash".into()))
        .and_then(parse_h256)?;

    let success = match v.get("success") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "0x1" || s == "true",
        _ => return Err(Error::Response("receipt missing success flag".into())),
    };

    let transaction_hash = v
        .get("receipt")
        .and_then(|r| r.get("transactionHash"))
        .and_then(|x| x.as_str())
        .ok_or_else(|| Error::Response("receipt missing receipt.transactionHash".into()))
        .and_then(parse_h256)?;

    Ok(Receipt {
        user_op_hash,
        success,
        transaction_hash,
    })
}

//! Call scripts for the `run` command.
//!
//! A script is a JSON array of steps. Each step names the calling principal,
//! an optional timestamp (the wall clock when omitted) and one engine call:
//!
//! ```json
//! [
//!   { "caller": "0x..", "timestamp": 1700000000,
//!     "call": { "op": "approve", "token": "0x..", "spender": "0x..", "amount": "0x64", "expiration": 1700001000 } },
//!   { "caller": "0x..", "call": { "op": "transfer_from", "from": "0x..", "to": "0x..", "amount": "0x3c", "token": "0x.." } }
//! ]
//! ```
//!
//! Running a script yields one output line per step followed by one line per
//! event the step committed. Events are recorded without a bound, so a step
//! that commits many of them still reports every one.

use alloy_primitives::Bytes;
use permit2_core::{CallContext, Permit2Engine, Permit2Error};
use permit2_types::{
	Address, AllowanceTransferDetails, Permit2Event, PermitBatch, PermitBatchTransferFrom,
	PermitSingle, PermitTransferFrom, SignatureTransferDetails, TokenSpenderPair, Witness, U256,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
	#[error("Invalid script: {0}")]
	Parse(#[from] serde_json::Error),
}

/// One scripted engine call.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
	pub caller: Address,
	pub timestamp: Option<u64>,
	pub call: Call,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Call {
	DomainSeparator,
	Allowance {
		owner: Address,
		token: Address,
		spender: Address,
	},
	Approve {
		token: Address,
		spender: Address,
		amount: U256,
		expiration: u64,
	},
	Permit {
		owner: Address,
		permit: PermitSingle,
		signature: Bytes,
	},
	PermitBatch {
		owner: Address,
		permit: PermitBatch,
		signature: Bytes,
	},
	TransferFrom {
		from: Address,
		to: Address,
		amount: U256,
		token: Address,
	},
	BatchTransferFrom {
		transfers: Vec<AllowanceTransferDetails>,
	},
	Lockdown {
		approvals: Vec<TokenSpenderPair>,
	},
	InvalidateNonces {
		token: Address,
		spender: Address,
		new_nonce: u64,
	},
	PermitTransferFrom {
		permit: PermitTransferFrom,
		transfer_details: SignatureTransferDetails,
		owner: Address,
		signature: Bytes,
	},
	PermitWitnessTransferFrom {
		permit: PermitTransferFrom,
		transfer_details: SignatureTransferDetails,
		owner: Address,
		witness: Witness,
		signature: Bytes,
	},
	PermitBatchTransferFrom {
		permit: PermitBatchTransferFrom,
		transfer_details: Vec<SignatureTransferDetails>,
		owner: Address,
		signature: Bytes,
	},
	PermitWitnessBatchTransferFrom {
		permit: PermitBatchTransferFrom,
		transfer_details: Vec<SignatureTransferDetails>,
		owner: Address,
		witness: Witness,
		signature: Bytes,
	},
	NonceBitmap {
		owner: Address,
		nonce_space: U256,
	},
	IsNonceUsable {
		owner: Address,
		nonce: U256,
	},
	InvalidateUnorderedNonces {
		nonce_space: U256,
		mask: U256,
	},
}

/// Output line for one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
	pub step: usize,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub value: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

/// Output line for one committed event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventLine {
	pub step: usize,
	pub event: &'static str,
	pub data: Permit2Event,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputLine {
	Step(StepOutcome),
	Event(EventLine),
}

pub fn parse_script(input: &str) -> Result<Vec<Step>, ScriptError> {
	Ok(serde_json::from_str(input)?)
}

/// Runs every step in order. A failing step is reported and the script goes on.
pub async fn run_script(engine: &Permit2Engine, steps: &[Step]) -> Vec<OutputLine> {
	let mut events = engine.event_bus().record();
	let mut lines = Vec::new();

	for (step, entry) in steps.iter().enumerate() {
		let timestamp = entry
			.timestamp
			.unwrap_or_else(|| u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default());
		let ctx = CallContext::new(entry.caller, timestamp);

		let outcome = match execute(engine, &ctx, &entry.call).await {
			Ok(value) => StepOutcome {
				step,
				value,
				error: None,
			},
			Err(e) => {
				tracing::warn!(step, caller = %entry.caller, error = %e, "Step failed");
				StepOutcome {
					step,
					value: None,
					error: Some(e.to_string()),
				}
			},
		};
		lines.push(OutputLine::Step(outcome));

		while let Ok(data) = events.try_recv() {
			lines.push(OutputLine::Event(EventLine {
				step,
				event: data.name(),
				data,
			}));
		}
	}

	lines
}

async fn execute(
	engine: &Permit2Engine,
	ctx: &CallContext,
	call: &Call,
) -> Result<Option<Value>, Permit2Error> {
	let value = match call {
		Call::DomainSeparator => Some(json!(engine.domain_separator())),
		Call::Allowance {
			owner,
			token,
			spender,
		} => {
			let record = engine.allowance(*owner, *token, *spender).await?;
			Some(json!({
				"amount": record.amount,
				"expiration": record.expiration,
				"nonce": record.nonce,
			}))
		},
		Call::Approve {
			token,
			spender,
			amount,
			expiration,
		} => {
			engine
				.approve(ctx, *token, *spender, *amount, *expiration)
				.await?;
			None
		},
		Call::Permit {
			owner,
			permit,
			signature,
		} => {
			engine.permit(ctx, *owner, permit, signature).await?;
			None
		},
		Call::PermitBatch {
			owner,
			permit,
			signature,
		} => {
			engine.permit_batch(ctx, *owner, permit, signature).await?;
			None
		},
		Call::TransferFrom {
			from,
			to,
			amount,
			token,
		} => {
			engine
				.transfer_from(ctx, *from, *to, *amount, *token)
				.await?;
			None
		},
		Call::BatchTransferFrom { transfers } => {
			let results = engine.batch_transfer_from(ctx, transfers).await;
			let entries: Vec<Value> = results
				.into_iter()
				.map(|result| match result {
					Ok(()) => json!({ "ok": true }),
					Err(e) => json!({ "ok": false, "error": e.to_string() }),
				})
				.collect();
			Some(Value::Array(entries))
		},
		Call::Lockdown { approvals } => {
			engine.lockdown(ctx, approvals).await?;
			None
		},
		Call::InvalidateNonces {
			token,
			spender,
			new_nonce,
		} => {
			engine
				.invalidate_nonces(ctx, *token, *spender, *new_nonce)
				.await?;
			None
		},
		Call::PermitTransferFrom {
			permit,
			transfer_details,
			owner,
			signature,
		} => {
			engine
				.permit_transfer_from(ctx, permit, transfer_details, *owner, signature)
				.await?;
			None
		},
		Call::PermitWitnessTransferFrom {
			permit,
			transfer_details,
			owner,
			witness,
			signature,
		} => {
			engine
				.permit_witness_transfer_from(
					ctx,
					permit,
					transfer_details,
					*owner,
					witness,
					signature,
				)
				.await?;
			None
		},
		Call::PermitBatchTransferFrom {
			permit,
			transfer_details,
			owner,
			signature,
		} => {
			engine
				.permit_batch_transfer_from(ctx, permit, transfer_details, *owner, signature)
				.await?;
			None
		},
		Call::PermitWitnessBatchTransferFrom {
			permit,
			transfer_details,
			owner,
			witness,
			signature,
		} => {
			engine
				.permit_witness_batch_transfer_from(
					ctx,
					permit,
					transfer_details,
					*owner,
					witness,
					signature,
				)
				.await?;
			None
		},
		Call::NonceBitmap { owner, nonce_space } => {
			Some(json!(engine.nonce_bitmap(*owner, *nonce_space).await?))
		},
		Call::IsNonceUsable { owner, nonce } => {
			Some(json!(engine.is_nonce_usable(*owner, *nonce).await?))
		},
		Call::InvalidateUnorderedNonces { nonce_space, mask } => {
			engine
				.invalidate_unordered_nonces(ctx, *nonce_space, *mask)
				.await?;
			None
		},
	};
	Ok(value)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::factory_registry::build_engine;
	use crate::message::TypedMessage;
	use permit2_account::implementations::local::LocalAccount;
	use permit2_config::Config;
	use permit2_types::{PermitDetails, TokenPermissions};
	use std::str::FromStr;

	const OWNER_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const OWNER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
	const TOKEN: &str = "0x1111111111111111111111111111111111111111";
	const SPENDER: &str = "0x3333333333333333333333333333333333333333";
	const RECIPIENT: &str = "0x4444444444444444444444444444444444444444";

	fn engine() -> Permit2Engine {
		let config = Config::from_str(&format!(
			r#"
[domain]
chain_id = 1
verifying_contract = "0x000000000022D473030F116dDEE9F6B43aC78BA3"

[storage]
primary = "memory"
[storage.implementations.memory]

[token]
primary = "ledger"
[token.implementations.ledger]
balances = [{{ token = "{TOKEN}", owner = "{OWNER}", amount = "1000" }}]
"#
		))
		.unwrap();
		build_engine(config).unwrap()
	}

	fn outcomes(lines: &[OutputLine]) -> Vec<&StepOutcome> {
		lines
			.iter()
			.filter_map(|line| match line {
				OutputLine::Step(outcome) => Some(outcome),
				OutputLine::Event(_) => None,
			})
			.collect()
	}

	fn event_names(lines: &[OutputLine]) -> Vec<&'static str> {
		lines
			.iter()
			.filter_map(|line| match line {
				OutputLine::Event(event) => Some(event.event),
				OutputLine::Step(_) => None,
			})
			.collect()
	}

	#[tokio::test]
	async fn test_approve_then_transfer_script() {
		let script = format!(
			r#"[
			{{ "caller": "{OWNER}", "timestamp": 100,
			   "call": {{ "op": "approve", "token": "{TOKEN}", "spender": "{SPENDER}", "amount": "0x64", "expiration": 1100 }} }},
			{{ "caller": "{SPENDER}", "timestamp": 200,
			   "call": {{ "op": "transfer_from", "from": "{OWNER}", "to": "{RECIPIENT}", "amount": "0x3c", "token": "{TOKEN}" }} }},
			{{ "caller": "{SPENDER}", "timestamp": 300,
			   "call": {{ "op": "transfer_from", "from": "{OWNER}", "to": "{RECIPIENT}", "amount": "0x3c", "token": "{TOKEN}" }} }},
			{{ "caller": "{SPENDER}", "timestamp": 400,
			   "call": {{ "op": "allowance", "owner": "{OWNER}", "token": "{TOKEN}", "spender": "{SPENDER}" }} }}
		]"#
		);
		let engine = engine();
		let lines = run_script(&engine, &parse_script(&script).unwrap()).await;

		let steps = outcomes(&lines);
		assert_eq!(steps.len(), 4);
		assert!(steps[0].error.is_none());
		assert!(steps[1].error.is_none());
		assert!(steps[2]
			.error
			.as_deref()
			.is_some_and(|e| e.contains("Insufficient allowance")));
		let allowance = steps[3].value.as_ref().unwrap();
		assert_eq!(allowance["expiration"], 1100);
		assert_eq!(allowance["nonce"], 0);
		assert_eq!(event_names(&lines), vec!["Approval"]);

		let recipient = Address::from_str(RECIPIENT).unwrap();
		let token = Address::from_str(TOKEN).unwrap();
		assert_eq!(
			engine.token().balance_of(token, recipient).await.unwrap(),
			U256::from(60)
		);
	}

	#[tokio::test]
	async fn test_signed_permit_script() {
		let engine = engine();
		let owner = LocalAccount::new(OWNER_KEY).unwrap();
		let token = Address::from_str(TOKEN).unwrap();
		let spender = Address::from_str(SPENDER).unwrap();

		let permit = PermitSingle {
			details: PermitDetails {
				token,
				amount: U256::from(500),
				expiration: 10_000,
				nonce: 0,
			},
			spender,
			sig_deadline: U256::from(5_000),
		};
		let digest = TypedMessage::PermitSingle {
			permit: permit.clone(),
		}
		.digest(&engine.domain_separator());
		let signature = Bytes::from(owner.sign_hash_sync(&digest).unwrap());

		let transfer = PermitTransferFrom {
			permitted: TokenPermissions {
				token,
				amount: U256::from(50),
			},
			nonce: U256::from(1),
			deadline: U256::from(5_000),
		};
		let transfer_digest = TypedMessage::PermitTransferFrom {
			permit: transfer.clone(),
			spender,
		}
		.digest(&engine.domain_separator());
		let transfer_signature = Bytes::from(owner.sign_hash_sync(&transfer_digest).unwrap());

		let step = |call: Value| -> Value {
			json!({ "caller": SPENDER, "timestamp": 1_000, "call": call })
		};
		let script = Value::Array(vec![
			step(json!({ "op": "permit", "owner": OWNER, "permit": permit, "signature": signature })),
			step(json!({ "op": "permit", "owner": OWNER, "permit": permit, "signature": signature })),
			step(json!({
				"op": "permit_transfer_from",
				"permit": transfer,
				"transfer_details": { "to": RECIPIENT, "requested_amount": "0x32" },
				"owner": OWNER,
				"signature": transfer_signature,
			})),
			step(json!({ "op": "is_nonce_usable", "owner": OWNER, "nonce": "0x1" })),
		]);

		let steps: Vec<Step> = serde_json::from_value(script).unwrap();
		let lines = run_script(&engine, &steps).await;
		let results = outcomes(&lines);

		assert!(results[0].error.is_none());
		assert_eq!(results[1].error.as_deref(), Some("Invalid nonce"));
		assert!(results[2].error.is_none());
		assert_eq!(results[3].value, Some(json!(false)));
		assert_eq!(event_names(&lines), vec!["Permit", "NonceInvalidated"]);
	}

	#[tokio::test]
	async fn test_every_event_of_a_large_step_is_reported() {
		// More pairs than the default bus capacity of 1000.
		let approvals: Vec<Value> = (0..1_100u64)
			.map(|n| {
				json!({ "token": TOKEN, "spender": Address::left_padding_from(&(n + 1).to_be_bytes()) })
			})
			.collect();
		let script = json!([
			{ "caller": OWNER, "timestamp": 1_000, "call": { "op": "lockdown", "approvals": approvals } }
		]);

		let engine = engine();
		let steps: Vec<Step> = serde_json::from_value(script).unwrap();
		let lines = run_script(&engine, &steps).await;

		assert!(outcomes(&lines)[0].error.is_none());
		let names = event_names(&lines);
		assert_eq!(names.len(), 1_100);
		assert!(names.iter().all(|name| *name == "Lockdown"));
	}

	#[test]
	fn test_unknown_op_is_rejected() {
		let script = r#"[{ "caller": "0x3333333333333333333333333333333333333333", "call": { "op": "mint" } }]"#;
		assert!(matches!(parse_script(script), Err(ScriptError::Parse(_))));
	}
}

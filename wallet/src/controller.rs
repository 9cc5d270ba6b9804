//! Batch preparation, signing and submission.
//!
//! Preparing a batch fetches the sender's nonce once and numbers the operations
//! sequentially from it. Each operation then reads chain state and is quoted by the node
//! independently. The batch is rejected with [`WalletError::Balance`] before anything is
//! signed when the quoted fees exceed the available balance.
//!
//! The controller does not serialize concurrent batches for the same account; callers
//! submitting from one account in parallel will collide on nonces.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::try_join_all;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::address::Address;
use crate::config::ChainConfig;
use crate::crypto::CryptoBackend;
use crate::error::{WalletError, WalletResult};
use crate::metadata::CallIndex;
use crate::method::{CallArgs, CallProvider, CallRegistry, Method};
use crate::node::NodeClient;
use crate::scale::{Compact, Hash, Scale, ScaleContext};
use crate::transaction::{
    decode_batch, encode_batch, total_fee, ChainState, Era, SignedExtra, Transaction,
    TransactionDetails, TransactionPayload,
};

/// One operation of a batch.
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub args: CallArgs,
    pub tip: u128,
}

impl Operation {
    pub fn new(args: CallArgs) -> Self {
        Self { args, tip: 0 }
    }

    pub fn with_tip(mut self, tip: u128) -> Self {
        self.tip = tip;
        self
    }
}

impl From<CallArgs> for Operation {
    fn from(args: CallArgs) -> Self {
        Self::new(args)
    }
}

/// A prepared, not yet signed batch.
#[derive(Clone, Debug)]
pub struct PreparedBatch {
    pub transactions: Vec<TransactionDetails>,
    pub total_fee: u128,
    /// SCALE encoding of `transactions`.
    pub encoded: Vec<u8>,
}

impl PreparedBatch {
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.encoded))
    }
}

struct Built {
    ctx: ScaleContext,
    transaction: Transaction,
    payload: TransactionPayload,
}

pub struct TransactionController {
    node: Arc<dyn NodeClient>,
    crypto: CryptoBackend,
    providers: Vec<Arc<dyn CallProvider>>,
    calls: OnceCell<Arc<CallRegistry>>,
    /// Last quoted fee per operation tag, tip included.
    fees: Mutex<HashMap<String, u128>>,
}

impl TransactionController {
    pub fn new(node: Arc<dyn NodeClient>) -> Self {
        Self::with_providers(node, Vec::new())
    }

    pub fn with_providers(node: Arc<dyn NodeClient>, providers: Vec<Arc<dyn CallProvider>>) -> Self {
        let crypto = CryptoBackend::new(node.config().clone());
        Self {
            node,
            crypto,
            providers,
            calls: OnceCell::new(),
            fees: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &Arc<ChainConfig> {
        self.node.config()
    }

    pub fn crypto(&self) -> &CryptoBackend {
        &self.crypto
    }

    pub async fn calls(&self) -> WalletResult<Arc<CallRegistry>> {
        self.calls
            .get_or_try_init(|| async {
                let metadata = self.node.metadata().await?;
                if metadata.extrinsic_version() != Some(self.config().extrinsic_version) {
                    debug!(
                        declared = ?metadata.extrinsic_version(),
                        configured = self.config().extrinsic_version,
                        "runtime extrinsic version differs from configuration"
                    );
                }
                Ok::<_, WalletError>(Arc::new(CallRegistry::with_providers(metadata, &self.providers)))
            })
            .await
            .cloned()
    }

    /// Context able to decode any call known to the registry.
    pub async fn context(&self, runtime_version: Option<u32>) -> WalletResult<ScaleContext> {
        Ok(ScaleContext::new(self.config().clone())
            .with_runtime_version(runtime_version)
            .with_calls(self.calls().await?))
    }

    /// Call index an operation tag resolves to on this chain.
    pub async fn get_transaction_metadata(&self, tag: &str) -> WalletResult<CallIndex> {
        self.calls().await?.resolve(tag)
    }

    pub async fn method(&self, args: CallArgs) -> WalletResult<Method> {
        self.calls().await?.method(args)
    }

    async fn chain_state(&self) -> WalletResult<(ChainState, Era)> {
        let (height, runtime, genesis_hash) = tokio::try_join!(
            self.node.get_current_height(),
            self.node.get_runtime_version(),
            self.node.get_first_block_hash(),
        )?;
        let era = Era::mortal(self.config().era_period, height);
        let block_hash = self.node.get_block_hash(era.birth(height)).await?;
        let state = ChainState {
            genesis_hash,
            block_hash,
            block_number: height,
            spec_version: runtime.spec_version,
            transaction_version: runtime.transaction_version,
        };
        Ok((state, era))
    }

    async fn build(&self, sender: &Address, nonce: u128, operation: &Operation) -> WalletResult<Built> {
        let (chain, era) = self.chain_state().await?;
        let ctx = self.context(Some(chain.spec_version)).await?;
        let method = ctx.calls()?.method(operation.args.clone())?;
        let extra = SignedExtra {
            era,
            nonce: Compact(nonce),
            tip: Compact(operation.tip),
        };
        let transaction = Transaction::new(self.config().extrinsic_version, sender.clone(), extra, method);
        let payload = TransactionPayload::new(&ctx, &transaction, &chain)?;
        Ok(Built {
            ctx,
            transaction,
            payload,
        })
    }

    /// Quotes an unsigned or placeholder-signed transaction and records the fee for its tag.
    pub async fn calculate_transaction_fee(
        &self,
        ctx: &ScaleContext,
        transaction: &Transaction,
    ) -> WalletResult<u128> {
        let quote = self
            .node
            .get_transfer_fee_estimate(&transaction.encode_for_fee(ctx)?)
            .await?;
        let fee = quote.saturating_add(transaction.tip());
        self.fees
            .lock()
            .insert(transaction.method().tag().to_string(), fee);
        debug!(tag = transaction.method().tag(), fee, "fee quoted");
        Ok(fee)
    }

    /// Fee of the last quoted transaction with this tag.
    pub fn cached_fee(&self, tag: &str) -> Option<u128> {
        self.fees.lock().get(tag).copied()
    }

    /// Estimated total fee for future operations, with the configured safety margin.
    pub async fn estimate_transaction_fees(
        &self,
        sender: &Address,
        operations: &[Operation],
    ) -> WalletResult<u128> {
        let mut total = 0u128;
        let mut account_nonce: Option<u128> = None;
        for operation in operations {
            let fee = match self.cached_fee(operation.args.tag()) {
                Some(fee) => fee,
                None => {
                    let nonce = match account_nonce {
                        Some(nonce) => nonce,
                        None => {
                            let fetched = self.node.get_account_info(sender).await?.nonce as u128;
                            account_nonce = Some(fetched);
                            fetched
                        }
                    };
                    let built = self.build(sender, nonce, operation).await?;
                    self.calculate_transaction_fee(&built.ctx, &built.transaction).await?
                }
            };
            total = total.saturating_add(fee);
        }
        Ok(self.config().apply_fee_margin(total))
    }

    pub async fn prepare_submittable_transactions(
        &self,
        sender: &Address,
        available_balance: u128,
        operations: Vec<Operation>,
    ) -> WalletResult<PreparedBatch> {
        if operations.is_empty() {
            return Err(WalletError::violation("cannot prepare an empty batch"));
        }
        let base_nonce = self.node.get_account_info(sender).await?.nonce as u128;
        let prepared = operations.iter().enumerate().map(|(offset, operation)| async move {
            let built = self.build(sender, base_nonce + offset as u128, operation).await?;
            let fee = self.calculate_transaction_fee(&built.ctx, &built.transaction).await?;
            Ok::<_, WalletError>(TransactionDetails {
                runtime_version: built.ctx.runtime_version,
                tag: operation.args.tag().to_string(),
                fee,
                transaction: built.transaction,
                payload: built.payload,
            })
        });
        let transactions = try_join_all(prepared).await?;

        let total_fee = total_fee(&transactions);
        if available_balance < total_fee {
            warn!(needed = total_fee, available = available_balance, "insufficient balance for batch fees");
            return Err(WalletError::Balance {
                needed: total_fee,
                available: available_balance,
            });
        }
        let encoded = encode_batch(&self.context(None).await?, &transactions)?;
        info!(
            count = transactions.len(),
            first_nonce = base_nonce,
            total_fee,
            "batch prepared"
        );
        Ok(PreparedBatch {
            transactions,
            total_fee,
            encoded,
        })
    }

    /// Signs `payload_hex` with `secret` and returns `transaction` with the signature filled.
    pub async fn sign_transaction(
        &self,
        secret: &[u8],
        transaction: &Transaction,
        payload_hex: &str,
    ) -> WalletResult<Transaction> {
        let payload = TransactionPayload::from_hex(payload_hex)?;
        let signature = self.crypto.sign(secret, &payload).await?;
        let signer = transaction
            .signer()
            .ok_or_else(|| WalletError::violation("transaction has no signer"))?;
        if self.crypto.address(secret)?.raw() != signer.raw() {
            return Err(WalletError::violation(format!(
                "secret key does not belong to signer {signer}"
            )));
        }
        transaction.with_signature(signature)
    }

    /// Signs every record of an encoded batch with its stored payload.
    pub async fn sign_prepared_transactions(&self, secret: &[u8], encoded: &[u8]) -> WalletResult<Vec<u8>> {
        let ctx = self.context(None).await?;
        let mut signed = Vec::new();
        for record in decode_batch(&ctx, encoded)? {
            let transaction = self
                .sign_transaction(secret, &record.transaction, &record.payload.to_hex())
                .await?;
            signed.push(record.with_transaction(transaction));
        }
        encode_batch(&ctx, &signed)
    }

    /// Submits each signed record in nonce order and returns the extrinsic hashes.
    pub async fn submit_transactions(&self, encoded: &[u8]) -> WalletResult<Vec<Hash>> {
        let ctx = self.context(None).await?;
        let batch = decode_batch(&ctx, encoded)?;
        if let Some(unsigned) = batch.iter().find(|record| !record.transaction.is_signed()) {
            return Err(WalletError::violation(format!(
                "{} transaction in batch is not signed",
                unsigned.tag
            )));
        }
        let mut hashes = Vec::with_capacity(batch.len());
        for record in &batch {
            let record_ctx = record.context(&ctx);
            let hash = self
                .node
                .submit_transaction(&record.transaction.encode(&record_ctx)?)
                .await?;
            info!(tag = %record.tag, hash = %hash.to_hex(), "transaction submitted");
            hashes.push(hash);
        }
        Ok(hashes)
    }
}

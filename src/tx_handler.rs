use crate::{
    Ed25519Verifier, SignatureVerifier, Transaction, TransactionValidator, TxHandlerConfig,
    UtxoPool, ValidTransaction, ValidationError,
};
use log::{debug, info};

/// A candidate that was not accepted in an epoch, and the first rule it broke.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Rejection {
    /// Position of the transaction in the candidate batch.
    pub index: usize,
    pub reason: ValidationError,
}

/// The outcome of one epoch.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct EpochReport {
    accepted: Vec<Transaction>,
    rejected: Vec<Rejection>,
}

impl EpochReport {
    /// Accepted transactions in the order they were committed.
    pub fn accepted(&self) -> &Vec<Transaction> {
        &self.accepted
    }

    /// Rejected candidates ordered by their position in the batch.
    pub fn rejected(&self) -> &Vec<Rejection> {
        &self.rejected
    }

    pub fn into_accepted(self) -> Vec<Transaction> {
        self.accepted
    }
}

/// Maintains the canonical UTXO pool and commits batches of transactions into it, once
/// per epoch.
///
/// The handler owns a copy of the pool it was created from. Processing a batch requires
/// `&mut self`, so no other reader or writer can observe the pool mid-batch.
pub struct TxHandler {
    utxo_pool: UtxoPool,
    verifier: Box<dyn SignatureVerifier + Send + Sync>,
    config: TxHandlerConfig,
}

impl TxHandler {
    /// Creates a handler over a copy of `utxo_pool` that verifies Ed25519 signatures.
    pub fn new(utxo_pool: &UtxoPool) -> Self {
        Self::with_verifier(utxo_pool, Ed25519Verifier)
    }

    pub fn with_verifier<V>(utxo_pool: &UtxoPool, verifier: V) -> Self
    where
        V: SignatureVerifier + Send + Sync + 'static,
    {
        Self {
            utxo_pool: UtxoPool::from(utxo_pool),
            verifier: Box::new(verifier),
            config: TxHandlerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: TxHandlerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &TxHandlerConfig {
        &self.config
    }

    /// The current canonical pool, reflecting every epoch processed so far.
    pub fn utxo_pool(&self) -> &UtxoPool {
        &self.utxo_pool
    }

    pub fn into_utxo_pool(self) -> UtxoPool {
        self.utxo_pool
    }

    /// Validates the transaction against the current pool and reports the first broken
    /// rule, if any. Does not modify the pool.
    pub fn check_tx(&self, transaction: &Transaction) -> Result<ValidTransaction, ValidationError> {
        TransactionValidator::validate(transaction, &self.utxo_pool, self.verifier.as_ref())
    }

    /// Returns true iff the transaction can be committed on top of the current pool.
    pub fn is_valid_tx(&self, transaction: &Transaction) -> bool {
        self.check_tx(transaction).is_ok()
    }

    /// Accepts a mutually valid subset of `candidates`, commits it to the pool, and returns
    /// the accepted transactions in the order they were committed.
    pub fn handle_txs(&mut self, candidates: &[Transaction]) -> Vec<Transaction> {
        self.handle_txs_report(candidates).into_accepted()
    }

    /// Same as [`TxHandler::handle_txs`], additionally reporting why each rejected
    /// candidate was rejected.
    pub fn handle_txs_report(&mut self, candidates: &[Transaction]) -> EpochReport {
        let order = self.config.strategy.commit_order(
            candidates,
            &self.utxo_pool,
            self.verifier.as_ref(),
            self.config.exhaustive_limit,
        );

        let mut report = EpochReport::default();
        for index in order {
            let transaction = &candidates[index];
            // Validated against the pool as left by the transactions accepted so far.
            match self.check_tx(transaction) {
                Ok(valid) => {
                    debug!(
                        "Accepted transaction: {} with fee: {}",
                        transaction.id(),
                        valid.fee()
                    );
                    self.commit(transaction);
                    report.accepted.push(transaction.clone());
                }
                Err(reason) => {
                    debug!("Rejected transaction: {}: {}", transaction.id(), reason);
                    report.rejected.push(Rejection { index, reason });
                }
            }
        }
        report.rejected.sort_by_key(|rejection| rejection.index);

        info!(
            "Epoch accepted {} of {} transactions, UTXO pool size: {}",
            report.accepted.len(),
            candidates.len(),
            self.utxo_pool.len()
        );
        report
    }

    fn commit(&mut self, transaction: &Transaction) {
        // The claimed outputs are spent.
        for input in transaction.inputs() {
            self.utxo_pool.remove(&input.utxo());
        }
        // The new outputs become spendable under the id of this transaction.
        for (index, output) in transaction.outputs().iter().enumerate() {
            self.utxo_pool
                .add(transaction.output_utxo(index), output.clone());
        }
    }
}

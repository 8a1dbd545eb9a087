use crate::{
    Amount, SignatureVerifier, Transaction, TransactionOutput, UtxoId, UtxoPool,
};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Read-only access to the unspent outputs a transaction is validated against.
pub trait UtxoContext {
    fn lookup(&self, id: &UtxoId) -> Option<&TransactionOutput>;
}

impl UtxoContext for UtxoPool {
    fn lookup(&self, id: &UtxoId) -> Option<&TransactionOutput> {
        self.try_get(id)
    }
}

/// Records spends and creations on top of a pool without touching it.
/// Used to evaluate hypothetical commit orders.
#[derive(Debug)]
pub struct PoolOverlay<'a> {
    base: &'a UtxoPool,
    spent: HashSet<UtxoId>,
    created: HashMap<UtxoId, TransactionOutput>,
}

impl<'a> PoolOverlay<'a> {
    pub fn new(base: &'a UtxoPool) -> Self {
        Self {
            base,
            spent: HashSet::new(),
            created: HashMap::new(),
        }
    }

    /// Applies the effects of an accepted transaction to the overlay.
    pub fn apply(&mut self, transaction: &Transaction) {
        // A spent id stays spent even if the base pool also holds it; only a later
        // creation under the same id makes it visible again.
        for input in transaction.inputs() {
            let utxo = input.utxo();
            self.created.remove(&utxo);
            self.spent.insert(utxo);
        }
        for (index, output) in transaction.outputs().iter().enumerate() {
            self.created
                .insert(transaction.output_utxo(index), output.clone());
        }
    }
}

impl UtxoContext for PoolOverlay<'_> {
    fn lookup(&self, id: &UtxoId) -> Option<&TransactionOutput> {
        if let Some(output) = self.created.get(id) {
            return Some(output);
        }
        if self.spent.contains(id) {
            None
        } else {
            self.base.try_get(id)
        }
    }
}

/// The first validation rule a transaction breaks.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum ValidationError {
    #[error("Input: {input} claims output: {utxo} which is not in the UTXO pool")]
    MissingUtxo { input: usize, utxo: UtxoId },

    #[error("Input: {input} claims output: {utxo} which is already claimed by an earlier input")]
    DuplicateClaim { input: usize, utxo: UtxoId },

    #[error("Input: {input} has an invalid signature")]
    InvalidSignature { input: usize },

    #[error("Output: {output} has a negative amount: {amount}")]
    NegativeOutput { output: usize, amount: Amount },

    #[error("Inputs: {inputs} are less than outputs: {outputs}")]
    InsufficientInputs { inputs: i128, outputs: i128 },
}

/// Totals of a transaction that passed validation.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ValidTransaction {
    input_total: i128,
    output_total: i128,
}

impl ValidTransaction {
    pub fn input_total(&self) -> i128 {
        self.input_total
    }

    pub fn output_total(&self) -> i128 {
        self.output_total
    }

    /// The excess of inputs over outputs. It is reported, but nothing collects it.
    pub fn fee(&self) -> i128 {
        self.input_total - self.output_total
    }
}

// Responsible for checking a single transaction against a set of unspent outputs.
// The checks run in a fixed order and stop at the first failure:
//   1. every input claims an output present in the context,
//   2. no output is claimed by two inputs of the same transaction,
//   3. every input carries a valid signature by the owner of the claimed output,
//   4. no output amount is negative,
//   5. the inputs cover the outputs.
// Rules 1-3 are evaluated input by input.
pub struct TransactionValidator {}

impl TransactionValidator {
    pub fn validate<C>(
        transaction: &Transaction,
        context: &C,
        verifier: &dyn SignatureVerifier,
    ) -> Result<ValidTransaction, ValidationError>
    where
        C: UtxoContext + ?Sized,
    {
        let input_total = Self::validate_inputs(transaction, context, verifier)?;
        Self::validate_outputs_are_non_negative(transaction)?;
        let output_total = transaction.output_total();
        Self::validate_inputs_cover_outputs(input_total, output_total)?;
        Ok(ValidTransaction {
            input_total,
            output_total,
        })
    }

    fn validate_inputs<C>(
        transaction: &Transaction,
        context: &C,
        verifier: &dyn SignatureVerifier,
    ) -> Result<i128, ValidationError>
    where
        C: UtxoContext + ?Sized,
    {
        // Outputs claimed so far by this transaction, independent of the context.
        let mut claimed = HashSet::with_capacity(transaction.inputs().len());
        let mut input_total = 0i128;

        for (index, input) in transaction.inputs().iter().enumerate() {
            let utxo = input.utxo();
            let output = context
                .lookup(&utxo)
                .ok_or(ValidationError::MissingUtxo { input: index, utxo })?;

            if !claimed.insert(utxo) {
                return Err(ValidationError::DuplicateClaim { input: index, utxo });
            }

            let signature_is_valid = match transaction.signing_message(index) {
                Ok(message) => verifier.verify(output.owner(), &message, input.signature()),
                Err(_) => false,
            };
            if !signature_is_valid {
                return Err(ValidationError::InvalidSignature { input: index });
            }

            input_total += output.amount().units() as i128;
        }
        Ok(input_total)
    }

    fn validate_outputs_are_non_negative(transaction: &Transaction) -> Result<(), ValidationError> {
        match transaction
            .outputs()
            .iter()
            .enumerate()
            .find(|(_, output)| output.amount().is_negative())
        {
            Some((index, output)) => Err(ValidationError::NegativeOutput {
                output: index,
                amount: output.amount(),
            }),
            None => Ok(()),
        }
    }

    fn validate_inputs_cover_outputs(
        input_total: i128,
        output_total: i128,
    ) -> Result<(), ValidationError> {
        if input_total >= output_total {
            Ok(())
        } else {
            Err(ValidationError::InsufficientInputs {
                inputs: input_total,
                outputs: output_total,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Ed25519Verifier, KeyPair, OutputIndex, PublicKey, Sha256, TransactionBuilder,
        TransactionId,
    };
    use std::cell::Cell;

    fn key(seed: u8) -> KeyPair {
        KeyPair::from_seed([seed; 32])
    }

    fn genesis_utxo(index: u32) -> UtxoId {
        UtxoId::new(
            TransactionId::new(Sha256::digest(b"genesis")),
            OutputIndex::new(index),
        )
    }

    // Two outputs of 10 units owned by key 1.
    fn pool() -> UtxoPool {
        let mut pool = UtxoPool::new();
        for index in 0..2 {
            pool.add(
                genesis_utxo(index),
                TransactionOutput::new(key(1).public_key(), Amount::new(10)),
            );
        }
        pool
    }

    fn validate(transaction: &Transaction, pool: &UtxoPool) -> Result<ValidTransaction, ValidationError> {
        TransactionValidator::validate(transaction, pool, &Ed25519Verifier)
    }

    /// Counts calls and accepts every signature.
    struct CountingVerifier {
        calls: Cell<usize>,
    }

    impl SignatureVerifier for CountingVerifier {
        fn verify(&self, _: &PublicKey, _: &[u8], _: &[u8]) -> bool {
            self.calls.set(self.calls.get() + 1);
            true
        }
    }

    #[test]
    fn valid_transaction_reports_fee() {
        let transaction = TransactionBuilder::new()
            .spend(&genesis_utxo(0))
            .spend(&genesis_utxo(1))
            .output(key(2).public_key(), Amount::new(15))
            .sign(0, &key(1))
            .unwrap()
            .sign(1, &key(1))
            .unwrap()
            .build()
            .unwrap();
        let valid = validate(&transaction, &pool()).unwrap();
        assert_eq!(valid.input_total(), 20);
        assert_eq!(valid.output_total(), 15);
        assert_eq!(valid.fee(), 5);
    }

    #[test]
    fn missing_utxo() {
        let missing = genesis_utxo(7);
        let transaction = TransactionBuilder::new()
            .spend(&missing)
            .output(key(2).public_key(), Amount::new(1))
            .sign(0, &key(1))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            validate(&transaction, &pool()),
            Err(ValidationError::MissingUtxo {
                input: 0,
                utxo: missing
            })
        );
    }

    #[test]
    fn duplicate_claim_is_detected_before_signatures() {
        let verifier = CountingVerifier {
            calls: Cell::new(0),
        };
        let transaction = TransactionBuilder::new()
            .spend(&genesis_utxo(0))
            .spend(&genesis_utxo(0))
            .output(key(2).public_key(), Amount::new(1))
            .build()
            .unwrap();
        assert_eq!(
            TransactionValidator::validate(&transaction, &pool(), &verifier),
            Err(ValidationError::DuplicateClaim {
                input: 1,
                utxo: genesis_utxo(0)
            })
        );
        // Only the first input reached the signature check.
        assert_eq!(verifier.calls.get(), 1);
    }

    #[test]
    fn signature_by_wrong_key() {
        let transaction = TransactionBuilder::new()
            .spend(&genesis_utxo(0))
            .output(key(2).public_key(), Amount::new(1))
            .sign(0, &key(2))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            validate(&transaction, &pool()),
            Err(ValidationError::InvalidSignature { input: 0 })
        );
    }

    #[test]
    fn signature_is_checked_per_input() {
        let transaction = TransactionBuilder::new()
            .spend(&genesis_utxo(0))
            .spend(&genesis_utxo(1))
            .output(key(2).public_key(), Amount::new(1))
            .sign(0, &key(1))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            validate(&transaction, &pool()),
            Err(ValidationError::InvalidSignature { input: 1 })
        );
    }

    #[test]
    fn negative_output() {
        let transaction = TransactionBuilder::new()
            .spend(&genesis_utxo(0))
            .output(key(2).public_key(), Amount::new(5))
            .output(key(3).public_key(), Amount::new(-1))
            .sign(0, &key(1))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            validate(&transaction, &pool()),
            Err(ValidationError::NegativeOutput {
                output: 1,
                amount: Amount::new(-1)
            })
        );
    }

    #[test]
    fn zero_output_is_allowed() {
        let transaction = TransactionBuilder::new()
            .spend(&genesis_utxo(0))
            .output(key(2).public_key(), Amount::zero())
            .sign(0, &key(1))
            .unwrap()
            .build()
            .unwrap();
        assert!(validate(&transaction, &pool()).is_ok());
    }

    #[test]
    fn outputs_exceed_inputs() {
        let transaction = TransactionBuilder::new()
            .spend(&genesis_utxo(0))
            .output(key(2).public_key(), Amount::new(11))
            .sign(0, &key(1))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            validate(&transaction, &pool()),
            Err(ValidationError::InsufficientInputs {
                inputs: 10,
                outputs: 11
            })
        );
    }

    #[test]
    fn transaction_without_inputs_may_only_create_nothing() {
        let empty = TransactionBuilder::new().build().unwrap();
        assert_eq!(validate(&empty, &pool()).unwrap().fee(), 0);

        let minting = TransactionBuilder::new()
            .output(key(2).public_key(), Amount::new(1))
            .build()
            .unwrap();
        assert!(validate(&minting, &pool()).is_err());
    }

    #[test]
    fn overlay_tracks_spends_and_creations() {
        let base = pool();
        let transaction = TransactionBuilder::new()
            .spend(&genesis_utxo(0))
            .output(key(2).public_key(), Amount::new(4))
            .sign(0, &key(1))
            .unwrap()
            .build()
            .unwrap();
        let mut overlay = PoolOverlay::new(&base);
        overlay.apply(&transaction);

        assert!(overlay.lookup(&genesis_utxo(0)).is_none());
        assert!(overlay.lookup(&genesis_utxo(1)).is_some());
        assert_eq!(
            overlay.lookup(&transaction.output_utxo(0)).map(TransactionOutput::amount),
            Some(Amount::new(4))
        );
        // The base pool is untouched.
        assert!(base.contains(&genesis_utxo(0)));
        assert!(!base.contains(&transaction.output_utxo(0)));
    }

    #[test]
    fn overlay_spending_recreated_base_output() {
        // An input-less transaction that was already committed once recreates an id the
        // base pool still holds.
        let coinbase = TransactionBuilder::new()
            .output(key(1).public_key(), Amount::zero())
            .build()
            .unwrap();
        let mut base = pool();
        base.add(coinbase.output_utxo(0), coinbase.outputs()[0].clone());
        let spend = TransactionBuilder::new()
            .spend(&coinbase.output_utxo(0))
            .output(key(2).public_key(), Amount::zero())
            .sign(0, &key(1))
            .unwrap()
            .build()
            .unwrap();

        let mut overlay = PoolOverlay::new(&base);
        overlay.apply(&coinbase);
        assert!(overlay.lookup(&coinbase.output_utxo(0)).is_some());
        overlay.apply(&spend);
        assert!(overlay.lookup(&coinbase.output_utxo(0)).is_none());
        assert!(TransactionValidator::validate(&spend, &overlay, &Ed25519Verifier).is_err());

        // Creating it once more makes it spendable again, as in the real pool.
        overlay.apply(&coinbase);
        assert!(overlay.lookup(&coinbase.output_utxo(0)).is_some());
    }

    #[test]
    fn overlay_spending_created_output() {
        let base = pool();
        let first = TransactionBuilder::new()
            .spend(&genesis_utxo(0))
            .output(key(2).public_key(), Amount::new(4))
            .sign(0, &key(1))
            .unwrap()
            .build()
            .unwrap();
        let second = TransactionBuilder::new()
            .spend(&first.output_utxo(0))
            .output(key(3).public_key(), Amount::new(4))
            .sign(0, &key(2))
            .unwrap()
            .build()
            .unwrap();
        let mut overlay = PoolOverlay::new(&base);
        overlay.apply(&first);
        assert!(TransactionValidator::validate(&second, &overlay, &Ed25519Verifier).is_ok());
        overlay.apply(&second);
        assert!(overlay.lookup(&first.output_utxo(0)).is_none());
        assert!(overlay.lookup(&second.output_utxo(0)).is_some());
    }
}

use crate::{Amount, OutputIndex, PublicKey, TransactionId, TransactionOutput};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Iter;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::iter::FromIterator;

/// Identifies an unspent transaction output by the id of the transaction that created it
/// and the output's position in that transaction.
#[derive(Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Copy, Clone, Serialize, Deserialize)]
pub struct UtxoId {
    transaction_id: TransactionId,
    output_index: OutputIndex,
}

impl UtxoId {
    pub const fn new(transaction_id: TransactionId, output_index: OutputIndex) -> Self {
        Self {
            transaction_id,
            output_index,
        }
    }

    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    pub fn output_index(&self) -> &OutputIndex {
        &self.output_index
    }
}

impl Display for UtxoId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.transaction_id, self.output_index)
    }
}

/// A pool of confirmed and unspent transaction outputs.
///
/// Cloning the pool produces an independent copy.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct UtxoPool {
    // Unspent transaction outputs, indexed by their transaction ID and their index in the
    // transaction.
    utxos: HashMap<UtxoId, TransactionOutput>,
}

impl UtxoPool {
    pub fn new() -> Self {
        Self {
            utxos: HashMap::new(),
        }
    }

    pub fn contains(&self, id: &UtxoId) -> bool {
        self.utxos.contains_key(id)
    }

    /// Returns the output for `id`.
    /// Callers must check [`UtxoPool::contains`] first, a missing id is a bug.
    pub fn get(&self, id: &UtxoId) -> &TransactionOutput {
        match self.utxos.get(id) {
            Some(output) => output,
            None => panic!("UTXO: {} is not in the pool", id),
        }
    }

    pub fn try_get(&self, id: &UtxoId) -> Option<&TransactionOutput> {
        self.utxos.get(id)
    }

    /// Inserts the output, replacing any output previously stored under `id`.
    pub fn add(&mut self, id: UtxoId, output: TransactionOutput) {
        self.utxos.insert(id, output);
    }

    pub fn remove(&mut self, id: &UtxoId) -> Option<TransactionOutput> {
        self.utxos.remove(id)
    }

    pub fn len(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, UtxoId, TransactionOutput> {
        self.utxos.iter()
    }

    pub fn ids(&self) -> Vec<UtxoId> {
        self.utxos.keys().copied().collect()
    }

    pub fn total_value(&self) -> i128 {
        Amount::total(self.utxos.values().map(TransactionOutput::amount))
    }

    pub fn balance_of(&self, owner: &PublicKey) -> i128 {
        Amount::total(
            self.utxos
                .values()
                .filter(|output| output.owner() == owner)
                .map(TransactionOutput::amount),
        )
    }
}

impl From<&UtxoPool> for UtxoPool {
    fn from(other: &UtxoPool) -> Self {
        other.clone()
    }
}

impl FromIterator<(UtxoId, TransactionOutput)> for UtxoPool {
    fn from_iter<I: IntoIterator<Item = (UtxoId, TransactionOutput)>>(iter: I) -> Self {
        Self {
            utxos: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a UtxoPool {
    type Item = (&'a UtxoId, &'a TransactionOutput);
    type IntoIter = Iter<'a, UtxoId, TransactionOutput>;

    fn into_iter(self) -> Self::IntoIter {
        self.utxos.iter()
    }
}

use crate::{
    PoolOverlay, PublicKey, SignatureVerifier, Transaction, TransactionValidator, UtxoPool,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::HashMap;

/// Exhaustive search visits 2^n subsets, so batches above this size are never searched
/// regardless of configuration.
pub const MAX_EXHAUSTIVE_BATCH: usize = 20;

/// Decides in which order candidates are offered to the greedy commit pass of an epoch.
///
/// Every strategy commits through the same pass: a candidate is accepted iff it is valid
/// against the pool as left by the candidates accepted before it.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Candidates in the order they were given. The first one seen wins a conflict.
    GreedyByOrder,
    /// Candidates with the largest total output value first. Ties keep the given order.
    GreedyByValue,
    /// The largest set of candidates that can all be accepted in the given relative order,
    /// followed by the remaining candidates.
    Exhaustive,
}

impl Default for SelectionStrategy {
    fn default() -> Self {
        SelectionStrategy::GreedyByOrder
    }
}

impl SelectionStrategy {
    /// Returns a permutation of the candidate indices.
    pub fn commit_order(
        &self,
        candidates: &[Transaction],
        utxo_pool: &UtxoPool,
        verifier: &dyn SignatureVerifier,
        exhaustive_limit: usize,
    ) -> Vec<usize> {
        match self {
            SelectionStrategy::GreedyByOrder => (0..candidates.len()).collect(),
            SelectionStrategy::GreedyByValue => Self::order_by_value(candidates),
            SelectionStrategy::Exhaustive => {
                let limit = exhaustive_limit.min(MAX_EXHAUSTIVE_BATCH);
                if candidates.len() > limit {
                    warn!(
                        "Batch of {} transactions exceeds the exhaustive search limit of {}, selecting by order",
                        candidates.len(),
                        limit
                    );
                    (0..candidates.len()).collect()
                } else {
                    Self::order_by_best_subset(candidates, utxo_pool, verifier)
                }
            }
        }
    }

    fn order_by_value(candidates: &[Transaction]) -> Vec<usize> {
        let mut order = (0..candidates.len()).collect::<Vec<usize>>();
        // Stable, so equal values keep the given order.
        order.sort_by_key(|&index| Reverse(candidates[index].output_total()));
        order
    }

    fn order_by_best_subset(
        candidates: &[Transaction],
        utxo_pool: &UtxoPool,
        verifier: &dyn SignatureVerifier,
    ) -> Vec<usize> {
        let verifier = CachingVerifier::new(verifier);
        // The empty subset is always feasible.
        let mut best = Subset {
            members: Vec::new(),
            output_total: 0,
        };
        for mask in 1u32..(1u32 << candidates.len()) {
            let members = (0..candidates.len())
                .filter(|&index| mask & (1 << index) != 0)
                .collect::<Vec<usize>>();
            if let Some(subset) = Subset::evaluate(members, candidates, utxo_pool, &verifier) {
                if subset.is_better_than(&best) {
                    best = subset;
                }
            }
        }
        debug!(
            "Exhaustive search selected {} of {} transactions",
            best.members.len(),
            candidates.len()
        );

        let mut order = best.members.clone();
        order.extend((0..candidates.len()).filter(|index| !best.members.contains(index)));
        order
    }
}

/// A set of candidate indices, in ascending order, that can all be accepted in that order.
struct Subset {
    members: Vec<usize>,
    output_total: i128,
}

impl Subset {
    fn evaluate(
        members: Vec<usize>,
        candidates: &[Transaction],
        utxo_pool: &UtxoPool,
        verifier: &dyn SignatureVerifier,
    ) -> Option<Self> {
        let mut overlay = PoolOverlay::new(utxo_pool);
        let mut output_total = 0;
        for &index in &members {
            let transaction = &candidates[index];
            let valid = TransactionValidator::validate(transaction, &overlay, verifier).ok()?;
            overlay.apply(transaction);
            output_total += valid.output_total();
        }
        Some(Self {
            members,
            output_total,
        })
    }

    // More transactions, then more value moved, then earlier candidates.
    fn is_better_than(&self, other: &Subset) -> bool {
        (self.members.len(), self.output_total, Reverse(&self.members))
            > (other.members.len(), other.output_total, Reverse(&other.members))
    }
}

/// Remembers verification results, since the search checks the same signatures many times.
struct CachingVerifier<'a> {
    inner: &'a dyn SignatureVerifier,
    results: RefCell<HashMap<(PublicKey, Vec<u8>, Vec<u8>), bool>>,
}

impl<'a> CachingVerifier<'a> {
    fn new(inner: &'a dyn SignatureVerifier) -> Self {
        Self {
            inner,
            results: RefCell::new(HashMap::new()),
        }
    }
}

impl SignatureVerifier for CachingVerifier<'_> {
    fn verify(&self, public_key: &PublicKey, message: &[u8], signature: &[u8]) -> bool {
        let key = (*public_key, message.to_vec(), signature.to_vec());
        if let Some(&result) = self.results.borrow().get(&key) {
            return result;
        }
        let result = self.inner.verify(public_key, message, signature);
        self.results.borrow_mut().insert(key, result);
        result
    }
}

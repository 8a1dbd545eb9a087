use crate::SelectionStrategy;
use serde::{Deserialize, Serialize};

pub const DEFAULT_EXHAUSTIVE_LIMIT: usize = 12;

/// Settings of a [`TxHandler`](crate::TxHandler). Missing fields take their defaults.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxHandlerConfig {
    pub strategy: SelectionStrategy,
    /// The largest batch the exhaustive strategy searches; larger batches are selected
    /// by order. Capped at [`MAX_EXHAUSTIVE_BATCH`](crate::MAX_EXHAUSTIVE_BATCH).
    pub exhaustive_limit: usize,
}

impl Default for TxHandlerConfig {
    fn default() -> Self {
        Self {
            strategy: SelectionStrategy::default(),
            exhaustive_limit: DEFAULT_EXHAUSTIVE_LIMIT,
        }
    }
}

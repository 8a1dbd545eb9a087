pub mod amount;
pub mod config;
pub mod crypto;
pub mod error;
pub mod hash;
pub mod selection;
pub mod transaction;
pub mod tx_handler;
pub mod utxo_pool;
pub mod validation;

pub use self::{
    amount::*, config::*, crypto::*, error::*, hash::*, selection::*, transaction::*,
    tx_handler::*, utxo_pool::*, validation::*,
};

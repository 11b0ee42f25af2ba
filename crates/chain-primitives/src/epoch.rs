// chain-primitives/src/epoch.rs

//! Epoch arithmetic.
//!
//! Block 0 is the genesis block and belongs to epoch 0. Epoch `n >= 1` spans
//! blocks `(n - 1) * size + 1 ..= n * size`, so the last block of an epoch is
//! always a multiple of the epoch size.

use crate::types::{BlockNumber, Epoch};

/// Epoch that contains `block`
pub fn epoch_number_of_block(block: BlockNumber, epoch_size: u64) -> Epoch {
    debug_assert!(epoch_size > 0);
    let epoch = block / epoch_size;
    if block % epoch_size == 0 {
        epoch
    } else {
        epoch + 1
    }
}

/// First block of `epoch` (genesis for epoch 0)
pub fn first_block_of_epoch(epoch: Epoch, epoch_size: u64) -> BlockNumber {
    if epoch == 0 {
        0
    } else {
        (epoch - 1) * epoch_size + 1
    }
}

/// Last block of `epoch`
pub fn last_block_of_epoch(epoch: Epoch, epoch_size: u64) -> BlockNumber {
    epoch * epoch_size
}

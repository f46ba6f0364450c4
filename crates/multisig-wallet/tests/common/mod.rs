//! Shared helpers for the wallet integration tests.

#![allow(dead_code)]

use multisig_wallet::prelude::*;
use tracing_subscriber::EnvFilter;

pub const A: Address = Address::repeat_byte(0xa1);
pub const B: Address = Address::repeat_byte(0xb2);
pub const C: Address = Address::repeat_byte(0xc3);
pub const D: Address = Address::repeat_byte(0xd4);
pub const OUTSIDER: Address = Address::repeat_byte(0x99);

/// Install a test-writer subscriber once; `RUST_LOG` overrides the level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Owners [A, B, C], threshold 2, wallet funded with `funds`.
pub fn funded_wallet(funds: u64) -> TestWallet {
    init_tracing();
    let t = create_test_wallet(vec![A, B, C], 2).expect("valid wallet");
    t.settlement.set_balance(t.wallet.address(), U256::from(funds));
    t
}

/// Events still buffered on `sub`, without envelopes.
pub fn events(sub: &mut shared_bus::Subscription) -> Vec<WalletEvent> {
    sub.drain().into_iter().map(|e| e.event).collect()
}

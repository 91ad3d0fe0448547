//! Known Solana networks and their default stablecoin mints.

use solana_pubkey::{pubkey, Pubkey};
use t402::networks::NetworkInfo;

/// Static configuration for one Solana network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SvmNetworkConfig {
    /// CAIP-2 identifier (`"solana:<genesis-hash-prefix>"`).
    pub network: &'static str,
    /// V1 network name.
    pub name: &'static str,
    /// Default stablecoin mint for loose money prices.
    pub default_mint: Pubkey,
    /// Decimals of the default mint.
    pub default_decimals: u32,
}

/// Networks this crate knows out of the box.
pub const SVM_NETWORK_CONFIGS: &[SvmNetworkConfig] = &[
    SvmNetworkConfig {
        network: "solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp",
        name: "solana",
        default_mint: pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"),
        default_decimals: 6,
    },
    SvmNetworkConfig {
        network: "solana:EtWTRABZaYq6iMfeYKouRu166VU2xqa1",
        name: "solana-devnet",
        default_mint: pubkey!("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU"),
        default_decimals: 6,
    },
    SvmNetworkConfig {
        network: "solana:4uhcVJyU9pJkvQyS88uRDiswHXSCkY3z",
        name: "solana-testnet",
        default_mint: pubkey!("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU"),
        default_decimals: 6,
    },
];

/// `NetworkInfo` table for assembling a
/// [`t402::networks::NetworkRegistry`].
pub const SOLANA_NETWORKS: &[NetworkInfo] = &[
    NetworkInfo {
        name: "solana",
        namespace: "solana",
        reference: "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp",
    },
    NetworkInfo {
        name: "solana-devnet",
        namespace: "solana",
        reference: "EtWTRABZaYq6iMfeYKouRu166VU2xqa1",
    },
    NetworkInfo {
        name: "solana-testnet",
        namespace: "solana",
        reference: "4uhcVJyU9pJkvQyS88uRDiswHXSCkY3z",
    },
];

/// Looks up a network config by CAIP-2 identifier or V1 name.
#[must_use]
pub fn network_config(network: &str) -> Option<&'static SvmNetworkConfig> {
    SVM_NETWORK_CONFIGS
        .iter()
        .find(|config| config.network == network || config.name == network)
}

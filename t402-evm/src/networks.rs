//! Known EIP-155 networks and their default stablecoin deployments.

use alloy_primitives::{address, Address};
use t402::networks::NetworkInfo;

/// EIP-712 domain parameters of a token deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenEip712 {
    /// Domain `name` (e.g., `"USD Coin"`).
    pub name: &'static str,
    /// Domain `version` (e.g., `"2"`).
    pub version: &'static str,
}

/// A token deployment on one chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenDeployment {
    /// Token contract address.
    pub address: Address,
    /// Token decimals.
    pub decimals: u32,
    /// EIP-712 domain parameters.
    pub eip712: TokenEip712,
}

/// Static configuration for one EIP-155 network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvmNetworkConfig {
    /// Numeric EIP-155 chain id.
    pub chain_id: u64,
    /// CAIP-2 identifier (`"eip155:<chain_id>"`).
    pub network: &'static str,
    /// V1 network name.
    pub name: &'static str,
    /// Default stablecoin used for loose money prices.
    pub default_asset: TokenDeployment,
}

/// USDC EIP-712 domain on mainnet deployments.
const USDC_DOMAIN: TokenEip712 = TokenEip712 {
    name: "USD Coin",
    version: "2",
};

/// Networks this crate knows out of the box.
pub const EVM_NETWORK_CONFIGS: &[EvmNetworkConfig] = &[
    EvmNetworkConfig {
        chain_id: 1,
        network: "eip155:1",
        name: "ethereum",
        default_asset: TokenDeployment {
            address: address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
            decimals: 6,
            eip712: USDC_DOMAIN,
        },
    },
    EvmNetworkConfig {
        chain_id: 8453,
        network: "eip155:8453",
        name: "base",
        default_asset: TokenDeployment {
            address: address!("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
            decimals: 6,
            eip712: USDC_DOMAIN,
        },
    },
    EvmNetworkConfig {
        chain_id: 84532,
        network: "eip155:84532",
        name: "base-sepolia",
        default_asset: TokenDeployment {
            address: address!("0x036CbD53842c5426634e7929541eC2318f3dCF7e"),
            decimals: 6,
            // The Sepolia deployment uses the short domain name.
            eip712: TokenEip712 {
                name: "USDC",
                version: "2",
            },
        },
    },
    EvmNetworkConfig {
        chain_id: 137,
        network: "eip155:137",
        name: "polygon",
        default_asset: TokenDeployment {
            address: address!("0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359"),
            decimals: 6,
            eip712: USDC_DOMAIN,
        },
    },
    EvmNetworkConfig {
        chain_id: 43114,
        network: "eip155:43114",
        name: "avalanche",
        default_asset: TokenDeployment {
            address: address!("0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E"),
            decimals: 6,
            eip712: USDC_DOMAIN,
        },
    },
];

/// `NetworkInfo` table for assembling a
/// [`t402::networks::NetworkRegistry`].
pub const EVM_NETWORKS: &[NetworkInfo] = &[
    NetworkInfo {
        name: "ethereum",
        namespace: "eip155",
        reference: "1",
    },
    NetworkInfo {
        name: "base",
        namespace: "eip155",
        reference: "8453",
    },
    NetworkInfo {
        name: "base-sepolia",
        namespace: "eip155",
        reference: "84532",
    },
    NetworkInfo {
        name: "polygon",
        namespace: "eip155",
        reference: "137",
    },
    NetworkInfo {
        name: "avalanche",
        namespace: "eip155",
        reference: "43114",
    },
];

/// Looks up a network config by CAIP-2 identifier or V1 name.
#[must_use]
pub fn network_config(network: &str) -> Option<&'static EvmNetworkConfig> {
    EVM_NETWORK_CONFIGS
        .iter()
        .find(|config| config.network == network || config.name == network)
}

/// Extracts the numeric chain id from a CAIP-2 identifier or V1 name.
#[must_use]
pub fn chain_id_of(network: &str) -> Option<u64> {
    if let Some(reference) = network.strip_prefix("eip155:") {
        return reference.parse().ok();
    }
    network_config(network).map(|config| config.chain_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_config_by_caip2_and_name() {
        assert_eq!(network_config("eip155:8453").unwrap().name, "base");
        assert_eq!(network_config("base").unwrap().chain_id, 8453);
        assert!(network_config("eip155:555000").is_none());
    }

    #[test]
    fn test_chain_id_of_unknown_caip2_still_parses() {
        assert_eq!(chain_id_of("eip155:31337"), Some(31337));
        assert_eq!(chain_id_of("base-sepolia"), Some(84532));
        assert_eq!(chain_id_of("solana:x"), None);
    }
}

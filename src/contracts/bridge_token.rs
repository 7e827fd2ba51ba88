//! Bridged ERC-20 token ABI definition
//!
//! Uses alloy's sol! macro to generate type-safe bindings for the token contract.

use alloy::sol;

sol! {
    /// Bridged token interface. Mint and burn are restricted to the bridge operator.
    #[sol(rpc)]
    contract BridgeToken {
        /// Mint `amount` to `to` after the matching Sui burn
        function mint(address to, uint256 amount) external;

        /// Burn `amount` from `from` before the matching Sui mint
        function burn(address from, uint256 amount) external;
    }
}

//! Energy accounting parameters.
//!
//! Total energy is `per_signature * signatures + per_byte * (header + payload)
//! + specific`, where `specific` depends on the payload kind. The constants
//! belong to the chain configuration, so they are carried as a value rather
//! than baked into the codec. [`EnergyParams::default`] holds the current
//! mainnet table.

use serde::{Deserialize, Serialize};

/// Chain-supplied energy constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnergyParams {
    /// Cost per signature on the transaction (A).
    pub per_signature: u64,
    /// Cost per byte of header and payload (B).
    pub per_byte: u64,
    pub simple_transfer: u64,
    pub register_data: u64,
    pub configure_delegation: u64,
    /// Validator configuration without key rotation.
    pub configure_validator: u64,
    /// Validator configuration that also rotates keys.
    pub configure_validator_with_keys: u64,
    /// Module deployment costs one unit per this many source bytes.
    pub deploy_module_bytes_per_unit: u64,
    pub token_update_base: u64,
    pub token_transfer: u64,
    pub token_mint: u64,
    pub token_burn: u64,
    pub token_list_update: u64,
    pub token_pause: u64,
}

impl Default for EnergyParams {
    fn default() -> Self {
        Self {
            per_signature: 100,
            per_byte: 1,
            simple_transfer: 300,
            register_data: 300,
            configure_delegation: 300,
            configure_validator: 300,
            configure_validator_with_keys: 4050,
            deploy_module_bytes_per_unit: 10,
            token_update_base: 300,
            token_transfer: 100,
            token_mint: 50,
            token_burn: 50,
            token_list_update: 50,
            token_pause: 50,
        }
    }
}

impl EnergyParams {
    /// Total energy for a transaction.
    ///
    /// Saturates at `u64::MAX` instead of wrapping.
    pub fn total(
        &self,
        signature_count: usize,
        header_size: usize,
        payload_size: u32,
        specific: u64,
    ) -> u64 {
        let signatures = self.per_signature.saturating_mul(signature_count as u64);
        let size = (header_size as u64).saturating_add(u64::from(payload_size));
        signatures
            .saturating_add(self.per_byte.saturating_mul(size))
            .saturating_add(specific)
    }

    /// Specific cost of deploying a module with the given source length.
    pub fn deploy_module(&self, source_len: usize) -> u64 {
        match self.deploy_module_bytes_per_unit {
            0 => 0,
            per_unit => source_len as u64 / per_unit,
        }
    }
}

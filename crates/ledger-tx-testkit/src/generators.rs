//! Proptest generators for property-based testing.

use proptest::prelude::*;

use ledger_tx_core::payload::{
    ConfigureDelegation, DelegationTarget, DeployModule, InitContract, RegisterData, TokenUpdate,
    Transfer, TransferWithMemo, UpdateContract, MAX_DATA_SIZE,
};
use ledger_tx_core::token::{CborAccountAddress, TokenAmount, TokenId, TokenOperation};
use ledger_tx_core::{
    AccountAddress, ContractAddress, EnergyParams, ModuleReference, Payload, Signable,
    SignableHeader, Signature, SignatureMap, SponsorDetails,
};

/// Generate a random account address.
pub fn account_address() -> impl Strategy<Value = AccountAddress> {
    any::<[u8; 32]>().prop_map(AccountAddress::from_bytes)
}

/// Generate a 64-byte signature.
pub fn signature() -> impl Strategy<Value = Signature> {
    prop::collection::vec(any::<u8>(), 64).prop_map(Signature)
}

/// Generate a non-empty signature map over a few credentials and keys.
pub fn signature_map() -> impl Strategy<Value = SignatureMap> {
    prop::collection::btree_map((0u8..4, 0u8..4), signature(), 1..=6).prop_map(|slots| {
        slots
            .into_iter()
            .map(|((cred, key), sig)| (cred, key, sig))
            .collect()
    })
}

fn bytes(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

fn token_amount() -> impl Strategy<Value = TokenAmount> {
    (any::<u64>(), 0u32..=18).prop_map(|(value, decimals)| TokenAmount::from_parts(value, decimals))
}

/// Generate a token operation.
pub fn token_operation() -> impl Strategy<Value = TokenOperation> {
    prop_oneof![
        (token_amount(), account_address()).prop_map(|(amount, to)| TokenOperation::Transfer {
            amount,
            recipient: CborAccountAddress::new(to),
            memo: None,
        }),
        token_amount().prop_map(|amount| TokenOperation::Mint { amount }),
        token_amount().prop_map(|amount| TokenOperation::Burn { amount }),
        account_address().prop_map(|to| TokenOperation::AddAllowList {
            target: CborAccountAddress::new(to)
        }),
        account_address().prop_map(|to| TokenOperation::RemoveDenyList {
            target: CborAccountAddress::new(to)
        }),
        Just(TokenOperation::Pause),
        Just(TokenOperation::Unpause),
    ]
}

/// Generate a payload of any supported kind.
pub fn payload() -> impl Strategy<Value = Payload> {
    prop_oneof![
        (account_address(), any::<u64>())
            .prop_map(|(to, amount)| Payload::Transfer(Transfer { to, amount })),
        (account_address(), bytes(MAX_DATA_SIZE), any::<u64>()).prop_map(|(to, memo, amount)| {
            Payload::TransferWithMemo(TransferWithMemo { to, memo, amount })
        }),
        bytes(MAX_DATA_SIZE).prop_map(|data| Payload::RegisterData(RegisterData { data })),
        (any::<u32>(), bytes(512))
            .prop_map(|(version, source)| Payload::DeployModule(DeployModule { version, source })),
        (any::<u64>(), any::<[u8; 32]>(), "[a-z]{1,16}", bytes(64)).prop_map(
            |(amount, module, name, param)| {
                Payload::InitContract(InitContract {
                    amount,
                    module_ref: ModuleReference(module),
                    init_name: format!("init_{name}"),
                    param,
                })
            }
        ),
        (any::<u64>(), any::<u64>(), "[a-z]{1,8}\\.[a-z]{1,8}", bytes(64)).prop_map(
            |(amount, index, receive_name, message)| {
                Payload::UpdateContract(UpdateContract {
                    amount,
                    address: ContractAddress::new(index, 0),
                    receive_name,
                    message,
                })
            }
        ),
        (
            any::<Option<u64>>(),
            any::<Option<bool>>(),
            prop::option::of(prop_oneof![
                Just(DelegationTarget::Passive),
                any::<u64>().prop_map(|validator_id| DelegationTarget::Validator { validator_id }),
            ]),
        )
            .prop_map(|(stake, restake_earnings, delegation_target)| {
                Payload::ConfigureDelegation(ConfigureDelegation {
                    stake,
                    restake_earnings,
                    delegation_target,
                })
            }),
        ("[A-Z]{1,8}", prop::collection::vec(token_operation(), 0..4)).prop_filter_map(
            "encodable token update",
            |(symbol, ops)| {
                let token_id = TokenId::new(symbol).ok()?;
                TokenUpdate::new(token_id, &ops).ok().map(Payload::TokenUpdate)
            }
        ),
    ]
}

/// Parameters for generating a signable transaction.
#[derive(Debug, Clone)]
pub struct SignableParams {
    pub sender: AccountAddress,
    pub nonce: u64,
    pub expiry: u64,
    pub execution_energy: u64,
    pub num_signatures: usize,
    pub sponsor: Option<(AccountAddress, usize)>,
    pub payload: Payload,
}

impl Arbitrary for SignableParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            account_address(),
            1u64..=u64::MAX,
            any::<u64>(),
            0u64..=1_000_000,
            1usize..=8,
            prop::option::of((account_address(), 1usize..=4)),
            payload(),
        )
            .prop_map(
                |(sender, nonce, expiry, execution_energy, num_signatures, sponsor, payload)| {
                    SignableParams {
                        sender,
                        nonce,
                        expiry,
                        execution_energy,
                        num_signatures,
                        sponsor,
                        payload,
                    }
                },
            )
            .boxed()
    }
}

/// Build a signable from parameters.
pub fn signable_from_params(params: &SignableParams) -> Signable {
    let header = SignableHeader {
        sender: params.sender,
        nonce: params.nonce,
        expiry: params.expiry,
        execution_energy: params.execution_energy,
        num_signatures: params.num_signatures,
        sponsor: params.sponsor.map(|(account, num_signatures)| SponsorDetails {
            account,
            num_signatures,
        }),
    };
    match Signable::new(header, params.payload.clone(), &EnergyParams::default()) {
        Ok(signable) => signable,
        Err(e) => panic!("generated parameters must build: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_payload_roundtrip(payload in payload()) {
            let bytes = payload.serialize().unwrap();
            prop_assert_eq!(bytes[0], payload.kind().to_u8());
            prop_assert_eq!(bytes.len() as u32, payload.size_of().unwrap());
            prop_assert_eq!(Payload::deserialize(&bytes).unwrap(), payload);
        }

        #[test]
        fn test_payload_json_roundtrip(payload in payload()) {
            let json = payload.to_json().unwrap();
            prop_assert_eq!(Payload::from_json(&json).unwrap(), payload);
        }

        #[test]
        fn test_token_operations_roundtrip(ops in prop::collection::vec(token_operation(), 0..6)) {
            let bytes = ledger_tx_core::token::encode_operations(&ops).unwrap();
            prop_assert_eq!(ledger_tx_core::token::decode_operations(&bytes).unwrap(), ops);
        }

        #[test]
        fn test_signature_map_wire_roundtrip(map in signature_map()) {
            let bytes = map.to_bytes().unwrap();
            prop_assert_eq!(SignatureMap::from_bytes(&bytes).unwrap(), map);
        }

        #[test]
        fn test_merge_commutes(a in signature_map(), b in signature_map()) {
            match (a.merge(&b), b.merge(&a)) {
                (Ok(ab), Ok(ba)) => {
                    prop_assert_eq!(ab.count(), a.count() + b.count());
                    prop_assert_eq!(ab, ba);
                }
                (Err(_), Err(_)) => {}
                _ => prop_assert!(false, "merge succeeded in only one order"),
            }
        }

        #[test]
        fn test_digest_ignores_signatures(params: SignableParams, sig in signature()) {
            let signable = signable_from_params(&params);
            let signed = signable.add_signature(&SignatureMap::single(0, 0, sig)).unwrap();
            prop_assert_eq!(signable.signing_digest().unwrap(), signed.signing_digest().unwrap());
        }

        #[test]
        fn test_finalized_block_item_roundtrip(
            params: SignableParams,
            sender_sig in signature(),
            sponsor_sig in signature(),
        ) {
            let energy = EnergyParams::default();
            let mut signable = signable_from_params(&params)
                .add_signature(&SignatureMap::single(0, 0, sender_sig))
                .unwrap();
            if params.sponsor.is_some() {
                signable = signable
                    .add_sponsor_signature(&SignatureMap::single(0, 0, sponsor_sig))
                    .unwrap();
            }
            let tx = signable.finalize(&energy).unwrap();
            let item = tx.to_block_item().unwrap();
            let decoded = ledger_tx_core::Finalized::from_block_item(&item).unwrap();
            prop_assert_eq!(decoded.hash().unwrap(), tx.hash().unwrap());
            prop_assert_eq!(decoded, tx);
        }

        #[test]
        fn test_signable_json_roundtrip(params: SignableParams, sig in signature()) {
            let signable = signable_from_params(&params)
                .add_signature(&SignatureMap::single(1, 2, sig))
                .unwrap();
            let json = signable.to_json().unwrap();
            prop_assert_eq!(Signable::from_json(&json).unwrap(), signable);
        }
    }
}

//! Golden test vectors for deterministic verification.
//!
//! Serialized transactions and their hashes, shared with other
//! implementations of the wire format. All use the sample accounts in
//! [`crate::fixtures`].

use ledger_tx_core::{Finalized, Result};

/// Wire version of a serialized transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorVersion {
    V0,
    V1,
}

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    pub version: VectorVersion,
    /// Serialized transaction (hex), without the block item kind.
    pub serialized: &'static str,
    /// Expected transaction hash (hex).
    pub expected_hash: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "V0 transfer with 128-byte zero signature",
            version: VectorVersion::V0,
            serialized: concat!(
                "010001000080",
                "0000000000000000000000000000000000000000000000000000000000000000",
                "0000000000000000000000000000000000000000000000000000000000000000",
                "0000000000000000000000000000000000000000000000000000000000000000",
                "0000000000000000000000000000000000000000000000000000000000000000",
                "49176df18432686c93c61ca89dafbe1cb383bfe6eb3a301ef8907f852643d98d",
                "0000000000000001",
                "00000000000001f4",
                "00000029",
                "000000006553f100",
                "03d46bbc5fbbbbabb07752d4acb86892d7a2479856d414182f703e21065dad046d",
                "00000000000f4240",
            ),
            expected_hash: "a147330fb4636aa5727cb7228e921ace5a2aa95dfeecc633a08e7f90fd67035a",
        },
        GoldenVector {
            name: "V1 transfer without sponsor",
            version: VectorVersion::V1,
            serialized: concat!(
                "010001000040",
                "893f2e4a230bcbeee24675454c4ca95a2f55fd33f328958b626c6fa368341e07",
                "902c9ffe7864c3bee23b2b2300ed0922eb814ea41fdee25035be8cddc5c3980f",
                "00",
                "0000",
                "49176df18432686c93c61ca89dafbe1cb383bfe6eb3a301ef8907f852643d98d",
                "0000000000000001",
                "00000000000001f4",
                "00000029",
                "000000006553f100",
                "03d46bbc5fbbbbabb07752d4acb86892d7a2479856d414182f703e21065dad046d",
                "00000000000f4240",
            ),
            expected_hash: "1f02386f3e823fb85d075f93103ae04db75ad875708685e4177f3c1dd91fe3a2",
        },
        GoldenVector {
            name: "V1 transfer with sponsor",
            version: VectorVersion::V1,
            serialized: concat!(
                "010001000040",
                "893f2e4a230bcbeee24675454c4ca95a2f55fd33f328958b626c6fa368341e07",
                "902c9ffe7864c3bee23b2b2300ed0922eb814ea41fdee25035be8cddc5c3980f",
                "01",
                "010001000040",
                "620d859224c40160c2bb03dbe84e9f57b8ed17f1a5df28b4e21f10658992531e",
                "f27655e6b74b8e47923e1ccb0413d563205e8b6c0cd22b3adce5dc7dc1daf603",
                "0001",
                "49176df18432686c93c61ca89dafbe1cb383bfe6eb3a301ef8907f852643d98d",
                "0000000000000001",
                "00000000000001f4",
                "00000029",
                "000000006553f100",
                "d46bbc5fbbbbabb07752d4acb86892d7a2479856d414182f703e21065dad046d",
                "03d46bbc5fbbbbabb07752d4acb86892d7a2479856d414182f703e21065dad046d",
                "00000000000f4240",
            ),
            expected_hash: "040d2ea5ad1e896cb983357fb268a3bcb56ea7d42b48fd01dd95d05ad7e33205",
        },
        GoldenVector {
            name: "V0 transfer signed by fixed sender signature",
            version: VectorVersion::V0,
            serialized: concat!(
                "010001000040",
                "893f2e4a230bcbeee24675454c4ca95a2f55fd33f328958b626c6fa368341e07",
                "902c9ffe7864c3bee23b2b2300ed0922eb814ea41fdee25035be8cddc5c3980f",
                "49176df18432686c93c61ca89dafbe1cb383bfe6eb3a301ef8907f852643d98d",
                "0000000000000001",
                "00000000000001f5",
                "00000029",
                "000000006553f100",
                "03d46bbc5fbbbbabb07752d4acb86892d7a2479856d414182f703e21065dad046d",
                "00000000000f4240",
            ),
            expected_hash: "1977ec066e033034b5c5deda1dcde338b34ee828b8be98850a9d4226206649eb",
        },
    ]
}

/// Decode the transaction a vector describes.
pub fn decode_vector(vector: &GoldenVector) -> Result<Finalized> {
    let bytes = hex::decode(vector.serialized).map_err(|e| {
        ledger_tx_core::CodecError::MalformedHeader(format!("vector is not hex: {e}"))
    })?;
    match vector.version {
        VectorVersion::V0 => Finalized::deserialize_v0(&bytes),
        VectorVersion::V1 => Finalized::deserialize_v1(&bytes),
    }
}

/// Decode, re-serialize, and hash every vector.
///
/// Returns `(name, matches, computed_hash)` per vector. A vector matches
/// when it re-serializes byte for byte and hashes to the expected value.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let result = decode_vector(v).and_then(|tx| {
                let reserialized = hex::encode(tx.serialize()?);
                Ok((reserialized == v.serialized, tx.hash()?.to_hex()))
            });
            match result {
                Ok((same_bytes, hash)) => {
                    let matches = same_bytes && hash == v.expected_hash;
                    (v.name.to_string(), matches, hash)
                }
                Err(e) => (v.name.to_string(), false, e.to_string()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{sender, transfer, transfer_builder, FixedSigner, RECIPIENT};
    use ledger_tx_core::{AccountAddress, EnergyParams, Payload};

    #[test]
    fn test_all_vectors_verify() {
        for (name, matches, hash) in verify_all_vectors() {
            assert!(matches, "{name}: got {hash}");
        }
    }

    #[test]
    fn test_vectors_share_payload() {
        for vector in all_vectors() {
            let tx = decode_vector(&vector).unwrap();
            assert_eq!(tx.sender(), &sender());
            assert_eq!(tx.payload(), &Payload::from(transfer()));
        }
    }

    #[test]
    fn test_sponsor_vector() {
        let vectors = all_vectors();
        let tx = decode_vector(&vectors[2]).unwrap();
        assert_eq!(tx.sponsor(), Some(&AccountAddress::from_base58(RECIPIENT).unwrap()));
        assert!(tx.sponsor_signatures().is_some());
    }

    #[tokio::test]
    async fn test_sponsored_vector_from_builder() {
        let params = EnergyParams::default();
        let tx = transfer_builder()
            .execution_energy(165)
            .sponsor(AccountAddress::from_base58(RECIPIENT).unwrap(), 1)
            .build(&params)
            .unwrap()
            .sign(&FixedSigner::sender())
            .await
            .unwrap()
            .sponsor(&FixedSigner::sponsor())
            .await
            .unwrap()
            .finalize(&params)
            .unwrap();
        assert_eq!(tx.hash().unwrap().to_hex(), all_vectors()[2].expected_hash);
    }
}

//! CBOR codec for protocol-level token operations.

pub mod address;
pub mod amount;
pub mod memo;
pub mod operation;

pub use address::{
    CborAccountAddress, CborContractAddress, CoinInfo, ACCOUNT_ADDRESS_TAG, COIN_INFO_TAG,
    CONTRACT_ADDRESS_TAG, NETWORK_ID,
};
pub use amount::{TokenAmount, DECIMAL_FRACTION_TAG};
pub use memo::{CborMemo, Memo, MAX_MEMO_SIZE, TAGGED_MEMO};
pub use operation::{decode_operations, encode_operations, TokenId, TokenOperation};

//! Typed transaction construction and local signing for intents.

use alloy_consensus::{SignableTransaction, TxEip1559, TxEip2930, TxEip4844, TxEnvelope, TxLegacy};
use alloy_eips::{eip2718::Encodable2718, eip2930::AccessList};
use alloy_network::TxSignerSync;
use alloy_primitives::{Address, Bytes, TxKind, U256};
use alloy_signer_local::PrivateKeySigner;
use txfuzz::{
    errors::DriverError,
    types::{TxClass, TxIntent, TRANSFER_GAS_LIMIT},
};

/// Builds the typed transaction an intent describes, signs it with `signer`,
/// and returns the EIP-2718 envelope bytes ready for `eth_sendRawTransaction`.
pub(crate) fn encode_signed_transfer(
    signer: &PrivateKeySigner,
    intent: &TxIntent,
    recipient: Address,
    chain_id: u64,
) -> Result<Vec<u8>, DriverError> {
    let value = U256::from(intent.value);
    let sign_err = |err| DriverError::Rpc(format!("signing failed: {err}"));

    let envelope: TxEnvelope = match intent.class {
        TxClass::Legacy => {
            let mut tx = TxLegacy {
                chain_id: Some(chain_id),
                nonce: intent.nonce,
                gas_price: intent.price,
                gas_limit: TRANSFER_GAS_LIMIT,
                to: TxKind::Call(recipient),
                value,
                input: Bytes::new(),
            };
            let signature = signer.sign_transaction_sync(&mut tx).map_err(sign_err)?;
            tx.into_signed(signature).into()
        }
        TxClass::AccessList => {
            let mut tx = TxEip2930 {
                chain_id,
                nonce: intent.nonce,
                gas_price: intent.price,
                gas_limit: TRANSFER_GAS_LIMIT,
                to: TxKind::Call(recipient),
                value,
                access_list: AccessList::default(),
                input: Bytes::new(),
            };
            let signature = signer.sign_transaction_sync(&mut tx).map_err(sign_err)?;
            tx.into_signed(signature).into()
        }
        TxClass::DynamicFee => {
            let mut tx = TxEip1559 {
                chain_id,
                nonce: intent.nonce,
                gas_limit: TRANSFER_GAS_LIMIT,
                max_fee_per_gas: intent.price,
                max_priority_fee_per_gas: intent.max_priority_fee.unwrap_or_default(),
                to: TxKind::Call(recipient),
                value,
                access_list: AccessList::default(),
                input: Bytes::new(),
            };
            let signature = signer.sign_transaction_sync(&mut tx).map_err(sign_err)?;
            tx.into_signed(signature).into()
        }
        TxClass::Blob => {
            let mut tx = TxEip4844 {
                chain_id,
                nonce: intent.nonce,
                gas_limit: TRANSFER_GAS_LIMIT,
                max_fee_per_gas: intent.price,
                max_priority_fee_per_gas: intent.max_priority_fee.unwrap_or_default(),
                to: recipient,
                value,
                access_list: AccessList::default(),
                blob_versioned_hashes: intent.blob_versioned_hashes.clone().unwrap_or_default(),
                max_fee_per_blob_gas: intent.max_fee_per_blob_gas.unwrap_or_default(),
                input: Bytes::new(),
            };
            let signature = signer.sign_transaction_sync(&mut tx).map_err(sign_err)?;
            tx.into_signed(signature).into()
        }
    };

    Ok(envelope.encoded_2718())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_eips::eip2718::Decodable2718;
    use alloy_primitives::{B256, U256};

    fn signer() -> PrivateKeySigner {
        PrivateKeySigner::from_bytes(&B256::repeat_byte(0x42)).unwrap()
    }

    fn decode(encoded: &[u8]) -> TxEnvelope {
        TxEnvelope::decode_2718(&mut &encoded[..]).unwrap()
    }

    #[test]
    fn legacy_roundtrip() {
        let signer = signer();
        let intent = TxIntent::legacy(0, signer.address(), 7, 12_500, 10_000);
        let encoded =
            encode_signed_transfer(&signer, &intent, Address::repeat_byte(9), 1).unwrap();

        let TxEnvelope::Legacy(signed) = decode(&encoded) else {
            panic!("expected a legacy envelope");
        };
        assert_eq!(signed.tx().nonce, 7);
        assert_eq!(signed.tx().gas_price, 12_500);
        assert_eq!(signed.tx().value, U256::from(10_000));
        assert_eq!(signed.tx().gas_limit, TRANSFER_GAS_LIMIT);
    }

    #[test]
    fn dynamic_fee_roundtrip() {
        let signer = signer();
        let intent = TxIntent::dynamic_fee(0, signer.address(), 1, 12_000, 3, 2);
        let encoded =
            encode_signed_transfer(&signer, &intent, Address::repeat_byte(9), 1).unwrap();

        assert_eq!(encoded[0], 0x02);
        let TxEnvelope::Eip1559(signed) = decode(&encoded) else {
            panic!("expected an eip-1559 envelope");
        };
        assert_eq!(signed.tx().max_fee_per_gas, 12_000);
        assert_eq!(signed.tx().max_priority_fee_per_gas, 3);
    }

    #[test]
    fn blob_roundtrip() {
        let signer = signer();
        let hashes = vec![B256::repeat_byte(0x01), B256::repeat_byte(0x02)];
        let intent = TxIntent::blob(0, signer.address(), 0, 100, 1, 42, hashes.clone());
        let encoded =
            encode_signed_transfer(&signer, &intent, Address::repeat_byte(9), 1).unwrap();

        assert_eq!(encoded[0], 0x03);
        let TxEnvelope::Eip4844(signed) = decode(&encoded) else {
            panic!("expected an eip-4844 envelope");
        };
        let tx = signed.tx().tx();
        assert_eq!(tx.blob_versioned_hashes, hashes);
        assert_eq!(tx.max_fee_per_blob_gas, 42);
    }

    #[test]
    fn access_list_envelope_type() {
        let signer = signer();
        let mut intent = TxIntent::legacy(0, signer.address(), 0, 5, 1);
        intent.class = TxClass::AccessList;
        let encoded =
            encode_signed_transfer(&signer, &intent, Address::repeat_byte(9), 1).unwrap();
        assert_eq!(encoded[0], 0x01);
    }
}

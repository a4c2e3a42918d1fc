//! Minimal ABI call encoding: Keccak-256 selectors plus 32-byte words.
//! Covers exactly the call shapes the marketplace contract exposes
//! (uint256, address, one trailing dynamic string).

use sha3::{Digest, Keccak256};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AbiError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("return data too short: {0} bytes")]
    ShortReturn(usize),
}

/// First four bytes of Keccak-256 over the canonical signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let mut hasher = Keccak256::new();
    hasher.update(signature.as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[0..4]);
    out
}

/// Left-padded 32-byte word for an unsigned integer.
pub fn enc_uint(v: u128) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[16..].copy_from_slice(&v.to_be_bytes());
    out
}

/// Left-padded 32-byte word for a 20-byte address.
pub fn enc_address(addr: &str) -> Result<[u8; 32], AbiError> {
    let hex_part = addr
        .trim()
        .strip_prefix("0x")
        .ok_or_else(|| AbiError::InvalidAddress(addr.to_string()))?;
    let bytes = hex::decode(hex_part).map_err(|_| AbiError::InvalidAddress(addr.to_string()))?;
    if bytes.len() != 20 {
        return Err(AbiError::InvalidAddress(addr.to_string()));
    }
    let mut out = [0u8; 32];
    out[12..].copy_from_slice(&bytes);
    Ok(out)
}

/// Tail encoding of a dynamic string: length word then right-padded bytes.
pub fn enc_string_tail(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let padded_len = bytes.len().div_ceil(32) * 32;
    let mut out = Vec::with_capacity(32 + padded_len);
    out.extend_from_slice(&enc_uint(bytes.len() as u128));
    out.extend_from_slice(bytes);
    out.resize(32 + padded_len, 0);
    out
}

/// Unsigned integer from a 32-byte return word (low 16 bytes; amounts here
/// never exceed u128).
pub fn dec_uint(word: &[u8]) -> Result<u128, AbiError> {
    if word.len() < 32 {
        return Err(AbiError::ShortReturn(word.len()));
    }
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&word[16..32]);
    Ok(u128::from_be_bytes(buf))
}

/// Address from a 32-byte return word, lowercased hex.
pub fn dec_address(word: &[u8]) -> Result<String, AbiError> {
    if word.len() < 32 {
        return Err(AbiError::ShortReturn(word.len()));
    }
    Ok(format!("0x{}", hex::encode(&word[12..32])))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_matches_known_vector() {
        // Canonical ERC-20 transfer selector.
        assert_eq!(
            hex::encode(selector("transfer(address,uint256)")),
            "a9059cbb"
        );
    }

    #[test]
    fn uint_word_is_left_padded() {
        let w = enc_uint(5);
        assert_eq!(w[31], 5);
        assert!(w[..31].iter().all(|&b| b == 0));
        assert_eq!(dec_uint(&w).unwrap(), 5);
    }

    #[test]
    fn address_word_roundtrip() {
        let addr = "0x607ccf60493a51c61d86f4616e93014db9e32b77";
        let w = enc_address(addr).unwrap();
        assert!(w[..12].iter().all(|&b| b == 0));
        assert_eq!(dec_address(&w).unwrap(), addr);
    }

    #[test]
    fn address_rejects_wrong_length() {
        assert!(enc_address("0x1234").is_err());
        assert!(enc_address("no-prefix").is_err());
    }

    #[test]
    fn string_tail_pads_to_word_boundary() {
        let tail = enc_string_tail("ipfs://evidence");
        assert_eq!(dec_uint(&tail[0..32]).unwrap(), 15);
        assert_eq!(tail.len(), 64);
        assert_eq!(&tail[32..47], b"ipfs://evidence");
        assert!(tail[47..].iter().all(|&b| b == 0));
    }

    #[test]
    fn empty_string_tail_is_one_word() {
        let tail = enc_string_tail("");
        assert_eq!(tail.len(), 32);
        assert_eq!(dec_uint(&tail).unwrap(), 0);
    }

    #[test]
    fn short_return_rejected() {
        assert!(dec_uint(&[0u8; 16]).is_err());
        assert!(dec_address(&[0u8; 31]).is_err());
    }
}

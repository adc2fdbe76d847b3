use orbit_core::AddressValidator;

const PUBLIC_KEY_LEN: usize = 32;

/// Solana address check: base-58 text decoding to a 32-byte public key.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolanaAddressValidator;

impl AddressValidator for SolanaAddressValidator {
    fn is_valid_address(&self, raw: &str) -> bool {
        // 32 bytes never encode to more than 44 characters.
        if raw.is_empty() || raw.len() > 44 {
            return false;
        }
        let mut buf = [0u8; PUBLIC_KEY_LEN];
        matches!(bs58::decode(raw).onto(&mut buf), Ok(PUBLIC_KEY_LEN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_program_ids_and_rejects_garbage() {
        let v = SolanaAddressValidator;
        assert!(v.is_valid_address("11111111111111111111111111111111"));
        assert!(v.is_valid_address("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA"));
        assert!(!v.is_valid_address(""));
        assert!(!v.is_valid_address("0x000000000000000000000000000000000000dEaD"));
        assert!(!v.is_valid_address("abc"));
        assert!(!v.is_valid_address("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DATokenkeg"));
    }
}

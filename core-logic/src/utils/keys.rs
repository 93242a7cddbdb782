//! Sender key material, sourced from the environment.

use crate::error::{ConfigError, CoreError, WalletError};
use std::env;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A hex private key that is wiped on drop and never printed.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(String);

impl PrivateKey {
    /// Hex digits without the `0x` prefix.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(***REDACTED***)")
    }
}

pub struct KeyProvider;

impl KeyProvider {
    pub const ENV_VAR: &'static str = "PRIVATE_KEYS";

    /// Read `PRIVATE_KEYS` (comma separated). Missing or empty is fatal.
    pub fn from_env() -> Result<Vec<PrivateKey>, CoreError> {
        let mut raw = env::var(Self::ENV_VAR).unwrap_or_default();
        let keys = Self::parse(&raw);
        raw.zeroize();
        keys
    }

    pub fn parse(raw: &str) -> Result<Vec<PrivateKey>, CoreError> {
        let mut keys = Vec::new();

        for (index, part) in raw.split(',').enumerate() {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }

            let hex_part = trimmed
                .strip_prefix("0x")
                .or_else(|| trimmed.strip_prefix("0X"))
                .unwrap_or(trimmed);

            if hex_part.len() != 64 {
                return Err(WalletError::InvalidKeyLength {
                    index,
                    length: hex_part.len(),
                }
                .into());
            }

            let mut decoded =
                hex::decode(hex_part).map_err(|_| WalletError::InvalidKeyFormat { index })?;
            decoded.zeroize();

            keys.push(PrivateKey(hex_part.to_string()));
        }

        if keys.is_empty() {
            return Err(ConfigError::MissingKeyMaterial(Self::ENV_VAR.to_string()).into());
        }

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_parse_strips_prefix_and_whitespace() {
        let keys = KeyProvider::parse(&format!(" 0x{} , ", KEY)).unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].expose(), KEY);
    }

    #[test]
    fn test_empty_is_missing_key_material() {
        let err = KeyProvider::parse("").unwrap_err();
        assert!(matches!(
            err,
            CoreError::Config(ConfigError::MissingKeyMaterial(_))
        ));
        assert!(KeyProvider::parse(" , ").is_err());
    }

    #[test]
    fn test_rejects_bad_hex() {
        let bad = "zz".repeat(32);
        let err = KeyProvider::parse(&bad).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Wallet(WalletError::InvalidKeyFormat { index: 0 })
        ));

        let short = KeyProvider::parse("abcd").unwrap_err();
        assert!(matches!(
            short,
            CoreError::Wallet(WalletError::InvalidKeyLength { length: 4, .. })
        ));
    }

    #[test]
    fn test_debug_redacts() {
        let keys = KeyProvider::parse(KEY).unwrap();
        assert!(!format!("{:?}", keys[0]).contains("ac0974"));
    }
}

// Content hashing for uploaded documents and ledger key derivation.

use sha2::{Digest, Sha256};

// Domain separation so a document seed can never collide with a content digest.
const DOCUMENT_SEED_DOMAIN: &[u8] = b"CERTDOC";

/// Hashes raw document bytes into the lower-case hex SHA-256 digest used as `metadata_hash`.
pub fn hash_document(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Derives the fixed 32-byte seed under which a document is addressed on chain.
///
/// Hash strings can exceed the 32-byte limit of a PDA seed, so the seed is a digest of them.
pub fn document_seed(hash: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(DOCUMENT_SEED_DOMAIN);
    hasher.update(hash.as_bytes());
    hasher.finalize().into()
}

/// Anchor-style instruction discriminator: first 8 bytes of `sha256("global:<name>")`.
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("global:{}", name).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// Anchor-style account discriminator: first 8 bytes of `sha256("account:<Name>")`.
pub fn account_discriminator(name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("account:{}", name).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_document_is_sha256_hex() {
        assert_eq!(
            hash_document(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn document_seed_is_stable_and_distinct() {
        assert_eq!(document_seed("abc"), document_seed("abc"));
        assert_ne!(document_seed("abc"), document_seed("abd"));
        // Registry keys are case sensitive.
        assert_ne!(document_seed("abc"), document_seed("ABC"));
    }

    #[test]
    fn discriminators_differ_by_name() {
        assert_ne!(
            instruction_discriminator("store_document"),
            instruction_discriminator("whitelist_address")
        );
        assert_ne!(
            instruction_discriminator("init"),
            account_discriminator("Document")
        );
    }
}

//! Stable digests for archive members.
//!
//! Manifests taken before and after a rewrite are compared member by member,
//! so the digest must not depend on the process or the platform.

const FNV1A_OFFSET: u64 = 0xcbf29ce484222325;
const FNV1A_PRIME: u64 = 0x100000001b3;

/// FNV-1a (64-bit) over the whole buffer.
pub fn content_digest(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV1A_OFFSET, |state, &byte| {
        (state ^ u64::from(byte)).wrapping_mul(FNV1A_PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_reference_vectors() {
        assert_eq!(content_digest(b""), 0xcbf29ce484222325);
        assert_eq!(content_digest(b"a"), 0xaf63dc4c8601ec8c);
        assert_eq!(content_digest(b"foobar"), 0x85944171f73967e8);
    }

    #[test]
    fn byte_order_matters() {
        assert_ne!(content_digest(b"ab"), content_digest(b"ba"));
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::rank::Rank;

/// Normalization policy governing how name literals are folded before key
/// derivation.
///
/// Every merge engine instance owns one policy; two engines with different
/// policies produce unrelated keys. The default folds case and collapses
/// internal whitespace, which makes "Felis  catus" and "felis catus"
/// identical.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPolicy {
    /// Fold the literal to lowercase before hashing.
    pub fold_case: bool,
    /// Collapse runs of internal whitespace to a single space.
    pub collapse_whitespace: bool,
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self {
            fold_case: true,
            collapse_whitespace: true,
        }
    }
}

impl KeyPolicy {
    /// A policy that hashes literals exactly as written (trimmed only).
    pub fn verbatim() -> Self {
        Self {
            fold_case: false,
            collapse_whitespace: false,
        }
    }

    /// Normalize a literal under this policy.
    ///
    /// Leading and trailing whitespace is always trimmed.
    pub fn normalize(&self, literal: &str) -> String {
        let trimmed = literal.trim();
        let mut out = if self.collapse_whitespace {
            let mut s = String::with_capacity(trimmed.len());
            let mut in_gap = false;
            for ch in trimmed.chars() {
                if ch.is_whitespace() {
                    in_gap = true;
                } else {
                    if in_gap && !s.is_empty() {
                        s.push(' ');
                    }
                    in_gap = false;
                    s.push(ch);
                }
            }
            s
        } else {
            trimmed.to_string()
        };
        if self.fold_case {
            out = out.to_lowercase();
        }
        out
    }

    /// Derive the identity key for `(literal, rank)` under this policy.
    pub fn key(&self, literal: &str, rank: Rank) -> TaxonKey {
        TaxonKey::from_normalized(&self.normalize(literal), rank)
    }
}

/// Taxon identity: a BLAKE3 hash over the normalized name literal and rank.
///
/// The same `(literal, rank)` pair always derives the same key under the same
/// [`KeyPolicy`], so keys can be compared, hashed, and looked up in O(1)
/// without carrying the literal around. Keys carry no lineage information;
/// scoping identity to a position in the tree is the merge engine's job.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaxonKey {
    hash: [u8; 32],
}

impl TaxonKey {
    /// Derive a key under the default [`KeyPolicy`].
    pub fn derive(literal: &str, rank: Rank) -> Self {
        KeyPolicy::default().key(literal, rank)
    }

    /// Derive a key from an already-normalized literal.
    pub(crate) fn from_normalized(normalized: &str, rank: Rank) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"taxalign-key-v1:");
        hasher.update(normalized.as_bytes());
        hasher.update(b":");
        hasher.update(&[rank.discriminant()]);
        Self {
            hash: *hasher.finalize().as_bytes(),
        }
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.hash
    }

    /// Full hex-encoded string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Short identifier (first 8 hex characters).
    pub fn short_id(&self) -> String {
        format!("tx:{}", hex::encode(&self.hash[..4]))
    }

    /// Parse from a hex string (64 hex characters, optional `tx:` prefix).
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let s = s.strip_prefix("tx:").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self { hash: arr })
    }
}

impl fmt::Debug for TaxonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaxonKey({})", self.short_id())
    }
}

impl fmt::Display for TaxonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_id())
    }
}

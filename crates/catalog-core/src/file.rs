//! File references carried by software and driver updates.

use serde::{Deserialize, Serialize};

/// Digest algorithms recognized on update files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-1, 20-byte digest. Weaker; only used when no SHA-256 is present.
    Sha1,
    /// SHA-256, 32-byte digest. Preferred when multiple digests are present.
    Sha256,
}

impl DigestAlgorithm {
    /// Relative strength used to pick the identifying digest for a file.
    ///
    /// Higher is stronger; `Sha256` always outranks `Sha1`.
    #[must_use]
    pub const fn strength(self) -> u8 {
        match self {
            Self::Sha1 => 0,
            Self::Sha256 => 1,
        }
    }
}

/// A single digest attached to a file: an algorithm tag plus raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDigest {
    /// Digest algorithm.
    pub algorithm: DigestAlgorithm,
    /// Raw digest bytes (decoded from the base64 representation in the XML).
    pub bytes: Vec<u8>,
}

/// A file referenced by an update, with its size, source and digests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFile {
    /// File name as presented to the client.
    pub file_name: String,
    /// Size of the file in bytes.
    pub size: u64,
    /// Source URL the file can be fetched from.
    pub source_url: String,
    /// One or more digests; the strongest one identifies the file.
    pub digests: Vec<FileDigest>,
}

impl UpdateFile {
    /// Return the strongest available digest, preferring SHA-256 over SHA-1.
    ///
    /// Returns `None` if the file carries no digests at all, which should not
    /// happen for a validly decoded update but is not assumed.
    #[must_use]
    pub fn strongest_digest(&self) -> Option<&FileDigest> {
        self.digests.iter().max_by_key(|d| d.algorithm.strength())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_with(digests: Vec<FileDigest>) -> UpdateFile {
        UpdateFile {
            file_name: "payload.cab".into(),
            size: 1024,
            source_url: "https://example.invalid/payload.cab".into(),
            digests,
        }
    }

    #[test]
    fn sha256_outranks_sha1() {
        let file = file_with(vec![
            FileDigest {
                algorithm: DigestAlgorithm::Sha1,
                bytes: vec![1; 20],
            },
            FileDigest {
                algorithm: DigestAlgorithm::Sha256,
                bytes: vec![2; 32],
            },
        ]);
        let strongest = file.strongest_digest().expect("has digest");
        assert_eq!(strongest.algorithm, DigestAlgorithm::Sha256);
    }

    #[test]
    fn single_digest_is_returned() {
        let file = file_with(vec![FileDigest {
            algorithm: DigestAlgorithm::Sha1,
            bytes: vec![1; 20],
        }]);
        assert_eq!(
            file.strongest_digest().map(|d| d.algorithm),
            Some(DigestAlgorithm::Sha1)
        );
    }

    #[test]
    fn no_digests_returns_none() {
        let file = file_with(vec![]);
        assert!(file.strongest_digest().is_none());
    }
}

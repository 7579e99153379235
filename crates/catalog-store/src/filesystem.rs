//! Content-addressed filesystem layout (§6) and the atomic-write helper
//! used when persisting update XML outside the metadata store proper.

use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use catalog_core::file::FileDigest;
use catalog_core::identity::PackageIdentity;

use crate::error::{StoreError, StoreResult};
use crate::ContentStore;

const DONE_SUFFIX: &str = ".done";

/// Filesystem-backed [`ContentStore`], rooted at a configured directory.
///
/// Layout:
/// - Content: `<root>/content/<last-byte-of-digest:hex>/<base64-digest with
///   '/'->'_'>/<file_name>`, with a `<path>.done` marker once a download is
///   verified.
/// - XML: `<root>/xml-data/<last-byte-of-id>/<id>-<rev>.xml`.
#[derive(Debug, Clone)]
pub struct FilesystemContentStore {
    root: PathBuf,
}

impl FilesystemContentStore {
    /// Construct a store rooted at `root`. Does not create the directory;
    /// callers create it (or rely on it existing) before first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory this store is configured with.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `xml` to its canonical path for `identity`, via a staging file
    /// plus atomic rename so a crash mid-write never leaves a truncated or
    /// partially-written XML file in place (§7).
    ///
    /// # Errors
    ///
    /// Returns an error if the staging write, fsync, or rename fails.
    pub fn write_xml_atomic(&self, identity: PackageIdentity, xml: &str) -> StoreResult<()> {
        let final_path = self.xml_path(identity);
        if let Some(parent) = final_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                operation: "create_xml_dir",
                source,
            })?;
        }
        let staging_path = final_path.with_extension("xml.tmp");
        std::fs::write(&staging_path, xml).map_err(|source| StoreError::Io {
            operation: "write_xml_staging",
            source,
        })?;
        std::fs::rename(&staging_path, &final_path).map_err(|source| StoreError::Io {
            operation: "rename_xml_staging",
            source,
        })?;
        Ok(())
    }
}

impl ContentStore for FilesystemContentStore {
    fn content_path(&self, digest: &FileDigest, file_name: &str) -> PathBuf {
        let last_byte = digest.bytes.last().copied().unwrap_or(0);
        let encoded = BASE64.encode(&digest.bytes).replace('/', "_");
        self.root
            .join("content")
            .join(format!("{last_byte:02x}"))
            .join(encoded)
            .join(file_name)
    }

    fn is_complete(&self, digest: &FileDigest, file_name: &str) -> bool {
        let mut marker = self.content_path(digest, file_name).into_os_string();
        marker.push(DONE_SUFFIX);
        Path::new(&marker).is_file()
    }

    fn xml_path(&self, identity: PackageIdentity) -> PathBuf {
        let last_byte = identity.id.as_bytes().last().copied().unwrap_or(0);
        self.root
            .join("xml-data")
            .join(format!("{last_byte:02x}"))
            .join(format!("{}-{}.xml", identity.id, identity.revision))
    }
}

impl FilesystemContentStore {
    /// Directory a digest's content file is stored under, independent of
    /// file name: `<root>/content/<last-byte:hex>/<base64-digest with
    /// '/'->'_'>/`.
    fn digest_dir(&self, digest: &FileDigest) -> PathBuf {
        let last_byte = digest.bytes.last().copied().unwrap_or(0);
        let encoded = BASE64.encode(&digest.bytes).replace('/', "_");
        self.root
            .join("content")
            .join(format!("{last_byte:02x}"))
            .join(encoded)
    }

    /// Locate the completed content file for `digest`, if one exists.
    ///
    /// The content HTTP endpoint (§6) addresses files purely by digest, so
    /// the file name stored alongside a digest must be recovered by
    /// scanning its directory rather than reconstructed from the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be read.
    pub fn locate(&self, digest: &FileDigest) -> StoreResult<Option<PathBuf>> {
        let dir = self.digest_dir(digest);
        if !dir.is_dir() {
            return Ok(None);
        }
        let entries = std::fs::read_dir(&dir).map_err(|source| StoreError::Io {
            operation: "read_content_dir",
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                operation: "read_content_dir_entry",
                source,
            })?;
            let path = entry.path();
            let is_marker = path
                .extension()
                .is_some_and(|ext| ext == std::ffi::OsStr::new("done"));
            if !is_marker && path.is_file() && self.marker_path(&path).is_file() {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    fn marker_path(&self, content_path: &Path) -> PathBuf {
        let mut marker = content_path.as_os_str().to_owned();
        marker.push(DONE_SUFFIX);
        PathBuf::from(marker)
    }
}

/// Classify a digest's expected algorithm purely by byte length, per §6:
/// length 20 is SHA-1, length 32 is SHA-256. Any other length is malformed.
///
/// # Errors
///
/// Returns [`StoreError::MalformedDigest`] for any other length.
pub fn classify_digest_length(len: usize) -> StoreResult<&'static str> {
    match len {
        20 => Ok("sha1"),
        32 => Ok("sha256"),
        other => Err(StoreError::MalformedDigest { len: other }),
    }
}

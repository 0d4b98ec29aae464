//! On-disk file locations for a single entity.
//!
//! Each entity owns exactly three output files: its private key, its
//! certificate signing request and its certificate. [`FileLayout`] holds the
//! three paths and knows whether they form a usable set.

/// The key, certificate and certificate-signing-request paths of an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileLayout {
    pub key_file: Option<String>,
    pub certificate_file: Option<String>,
    pub certificate_signing_request_file: Option<String>,
}

impl FileLayout {
    pub fn new(
        key_file: Option<String>,
        certificate_file: Option<String>,
        certificate_signing_request_file: Option<String>,
    ) -> Self {
        Self {
            key_file,
            certificate_file,
            certificate_signing_request_file,
        }
    }

    /// True iff all three paths are present and non-blank after trimming
    /// whitespace. A path consisting only of spaces counts as blank.
    pub fn is_valid(&self) -> bool {
        [
            &self.key_file,
            &self.certificate_file,
            &self.certificate_signing_request_file,
        ]
        .iter()
        .all(|path| path.as_deref().is_some_and(|p| !p.trim().is_empty()))
    }
}

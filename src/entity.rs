//! The entity model: users and certificate authorities.
//!
//! Both kinds of entity share the same identity record (distinguished name,
//! file layout and generation parameters); what separates a certificate
//! authority from a plain user is its role:
//!
//! ```text
//! Entity
//!   ├── Identity   (name, subject, paths, key size, digest, expiration, ...)
//!   └── Role
//!         ├── Subject            (a user whose request is signed by a CA)
//!         └── Signer             (a CA, self-signed, countersigns users)
//! ```
//!
//! Generation parameters that arrive with the wrong type in the
//! configuration are coerced to absent rather than rejected; an entity with
//! an absent parameter is simply not valid. The coercion helpers at the
//! bottom of this module are the single place where raw JSON values become
//! typed fields.

use anyhow::{anyhow, Result};
use secrecy::SecretString;
use serde_json::Value;

use crate::distinguished_name::DistinguishedName;
use crate::file_layout::FileLayout;

pub const DEFAULT_KEY_BITS: i64 = 2048;
pub const DEFAULT_MESSAGE_DIGEST: &str = "sha256";
pub const DEFAULT_EXPIRATION_DAYS: i64 = 365;

/// What an entity is allowed to do in the generation pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// A plain user whose certificate request is signed by a CA.
    Subject,
    /// A certificate authority. Its own certificate is self-signed and it
    /// countersigns the requests of the subjects in its group.
    Signer {
        /// Optional OpenSSL CA configuration file. Carried through from the
        /// configuration but not consumed by any generation step yet.
        config_file: Option<String>,
    },
}

/// The shared identity record of users and certificate authorities.
#[derive(Debug)]
struct Identity {
    name: String,
    dn: DistinguishedName,
    files: FileLayout,
    base_dir: String,
    bits: Option<i64>,
    protected: Option<bool>,
    message_digest: Option<String>,
    certificate_expiration: Option<i64>,
    password: Option<SecretString>,
    password_file: Option<String>,
}

/// A fully resolved user or certificate authority.
///
/// Entities are created once per configuration entry by the resolver and are
/// immutable afterwards; the orchestrator only ever borrows them.
#[derive(Debug)]
pub struct Entity {
    identity: Identity,
    role: Role,
}

impl Entity {
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// The directory the entity's `keys`, `csrs` and `crts` subdirectories
    /// live under. For a signer this is the CA's own directory.
    pub fn base_dir(&self) -> &str {
        &self.identity.base_dir
    }

    pub fn key_file(&self) -> &str {
        self.identity.files.key_file.as_deref().unwrap_or_default()
    }

    pub fn certificate_file(&self) -> &str {
        self.identity
            .files
            .certificate_file
            .as_deref()
            .unwrap_or_default()
    }

    pub fn certificate_signing_request_file(&self) -> &str {
        self.identity
            .files
            .certificate_signing_request_file
            .as_deref()
            .unwrap_or_default()
    }

    pub fn format_subject(&self) -> String {
        self.identity.dn.format_subject()
    }

    pub fn distinguished_name(&self) -> &DistinguishedName {
        &self.identity.dn
    }

    pub fn bits(&self) -> Option<i64> {
        self.identity.bits
    }

    /// Whether the entity's key should be password protected.
    pub fn is_protected(&self) -> bool {
        self.identity.protected == Some(true)
    }

    pub fn message_digest(&self) -> Option<&str> {
        self.identity.message_digest.as_deref()
    }

    pub fn certificate_expiration(&self) -> Option<i64> {
        self.identity.certificate_expiration
    }

    pub fn password(&self) -> Option<&SecretString> {
        self.identity.password.as_ref()
    }

    pub fn password_file(&self) -> Option<&str> {
        self.identity.password_file.as_deref()
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn is_signer(&self) -> bool {
        matches!(self.role, Role::Signer { .. })
    }

    /// True iff the file layout holds and none of the generation parameters
    /// was lost to a type coercion. Absent parameters are represented, never
    /// raised, so this is the one place validity is decided.
    pub fn is_valid(&self) -> bool {
        self.identity.files.is_valid()
            && self.identity.bits.is_some()
            && self.identity.protected.is_some()
            && self.identity.message_digest.is_some()
            && self.identity.certificate_expiration.is_some()
    }
}

/// Builder for [`Entity`] values.
///
/// The generation parameters start out at their documented defaults
/// (2048-bit keys, unprotected, sha256, 365 days) and every setter accepts
/// an `Option` so a coercion failure can be carried through as absent.
///
/// `build` derives the three output paths
/// `{dir}/keys/{key_name}`, `{dir}/crts/{cert_name}` and
/// `{dir}/csrs/{request_name}` and fails when the base directory or any of
/// the three file names is unset or blank.
#[derive(Debug)]
pub struct EntityBuilder {
    name: String,
    dn: DistinguishedName,
    base_dir: Option<String>,
    key_name: Option<String>,
    request_name: Option<String>,
    cert_name: Option<String>,
    bits: Option<i64>,
    protected: Option<bool>,
    message_digest: Option<String>,
    certificate_expiration: Option<i64>,
    password: Option<SecretString>,
    password_file: Option<String>,
    role: Role,
}

impl EntityBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dn: DistinguishedName::default(),
            base_dir: None,
            key_name: None,
            request_name: None,
            cert_name: None,
            bits: Some(DEFAULT_KEY_BITS),
            protected: Some(false),
            message_digest: Some(DEFAULT_MESSAGE_DIGEST.to_string()),
            certificate_expiration: Some(DEFAULT_EXPIRATION_DAYS),
            password: None,
            password_file: None,
            role: Role::Subject,
        }
    }

    pub fn distinguished_name(mut self, dn: DistinguishedName) -> Self {
        self.dn = dn;
        self
    }

    pub fn base_dir(mut self, dir: Option<String>) -> Self {
        self.base_dir = dir;
        self
    }

    pub fn key_name(mut self, name: Option<String>) -> Self {
        self.key_name = name;
        self
    }

    pub fn request_name(mut self, name: Option<String>) -> Self {
        self.request_name = name;
        self
    }

    pub fn cert_name(mut self, name: Option<String>) -> Self {
        self.cert_name = name;
        self
    }

    pub fn bits(mut self, bits: Option<i64>) -> Self {
        self.bits = bits;
        self
    }

    pub fn protected(mut self, protected: Option<bool>) -> Self {
        self.protected = protected;
        self
    }

    pub fn message_digest(mut self, digest: Option<String>) -> Self {
        self.message_digest = digest;
        self
    }

    pub fn certificate_expiration(mut self, days: Option<i64>) -> Self {
        self.certificate_expiration = days;
        self
    }

    pub fn password(mut self, password: Option<SecretString>) -> Self {
        self.password = password;
        self
    }

    pub fn password_file(mut self, path: Option<String>) -> Self {
        self.password_file = path;
        self
    }

    /// Marks the entity as a certificate authority. A blank configuration
    /// file path is treated as absent.
    pub fn signer(mut self, config_file: Option<String>) -> Self {
        self.role = Role::Signer {
            config_file: config_file.filter(|f| !f.trim().is_empty()),
        };
        self
    }

    /// Builds the entity, deriving its on-disk layout.
    ///
    /// # Errors
    /// Fails when the base directory, key name, request name or certificate
    /// name is unset or blank. Missing generation parameters are not an
    /// error here; they surface through [`Entity::is_valid`].
    pub fn build(self) -> Result<Entity> {
        let name = self.name;
        let base_dir = non_blank(self.base_dir)
            .ok_or_else(|| anyhow!("No base directory configured for {}.", name))?;
        let key_name = non_blank(self.key_name)
            .ok_or_else(|| anyhow!("Key file name for {} is not set.", name))?;
        let request_name = non_blank(self.request_name).ok_or_else(|| {
            anyhow!("Certificate signing request file name for {} is not set.", name)
        })?;
        let cert_name = non_blank(self.cert_name)
            .ok_or_else(|| anyhow!("Certificate file name for {} is not set.", name))?;

        let files = FileLayout::new(
            Some(format!("{base_dir}/keys/{key_name}")),
            Some(format!("{base_dir}/crts/{cert_name}")),
            Some(format!("{base_dir}/csrs/{request_name}")),
        );

        Ok(Entity {
            identity: Identity {
                name,
                dn: self.dn,
                files,
                base_dir,
                bits: self.bits,
                protected: self.protected,
                message_digest: self.message_digest,
                certificate_expiration: self.certificate_expiration,
                password: self.password,
                password_file: self.password_file,
            },
            role: self.role,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ================= Raw value coercion =================

/// Coerces a raw configuration value to a string. Anything that is not a
/// JSON string becomes absent.
pub(crate) fn coerce_string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_owned)
}

/// Coerces a raw configuration value to an integer. Floats, strings and
/// booleans all become absent.
pub(crate) fn coerce_int(value: Option<&Value>) -> Option<i64> {
    value.and_then(Value::as_i64)
}

/// Coerces a raw configuration value to a boolean.
pub(crate) fn coerce_bool(value: Option<&Value>) -> Option<bool> {
    value.and_then(Value::as_bool)
}

/// Coerces a certificate expiration to a day count. Booleans are rejected
/// explicitly: expiration is the one integer field where a boolean must
/// never pass, whatever the host representation makes of it.
pub(crate) fn coerce_expiration(value: Option<&Value>) -> Option<i64> {
    match value {
        Some(Value::Bool(_)) => None,
        other => coerce_int(other),
    }
}

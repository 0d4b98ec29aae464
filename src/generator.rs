//! Generation orchestration.
//!
//! The generator sequences the OpenSSL invocations for one resolved group:
//!
//! ```text
//! CA key ─→ CA request ─→ CA certificate (self-signed)
//!                                │
//! user key ─→ user request ─→ user certificate (signed by the CA)
//! ```
//!
//! Certificate authorities are processed before users so a group's CA
//! material exists on disk by the time its users are signed against it.
//! Every operation is idempotent under the overwrite policy: an output file
//! that already exists is treated as already satisfied, not as an error.
//! A failure for one entity never blocks the rest of the batch.

use secrecy::ExposeSecret;
use tracing::{debug, info, warn};

use crate::entity::Entity;
use crate::files::FileHandler;
use crate::process::CommandRunner;
use crate::resolver::ResolvedGroup;

/// The set of generation actions requested on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Actions {
    pub key: bool,
    pub request: bool,
    pub sign: bool,
    pub all: bool,
    pub overwrite: bool,
}

impl Actions {
    pub fn wants_key(&self) -> bool {
        self.key || self.all
    }

    pub fn wants_request(&self) -> bool {
        self.request || self.all
    }

    pub fn wants_sign(&self) -> bool {
        self.sign || self.all
    }

    /// True iff at least one generation action was requested.
    pub fn any(&self) -> bool {
        self.key || self.request || self.sign || self.all
    }
}

/// Sequences external-tool invocations for resolved entities.
pub struct Generator<R> {
    openssl: String,
    files: FileHandler,
    runner: R,
}

impl<R: CommandRunner> Generator<R> {
    pub fn new(openssl: impl Into<String>, files: FileHandler, runner: R) -> Self {
        Self {
            openssl: openssl.into(),
            files,
            runner,
        }
    }

    /// Executes the requested actions across one resolved group.
    ///
    /// CAs run first (key, request, self-signed certificate), then users
    /// (key, request, certificate signed by the group's CA). When a group
    /// holds several CAs the last one in iteration order signs the users.
    /// Individual failures are logged per entity and do not stop the batch.
    pub fn generate(&self, actions: &Actions, group: &ResolvedGroup) {
        let overwrite = actions.overwrite;
        let mut signer: Option<&Entity> = None;
        for (name, ca) in &group.ca {
            signer = Some(ca);
            if actions.wants_key() {
                info!("Generating key for Certificate Authority: {}.", name);
                self.generate_key(Some(ca), overwrite);
            }
            if actions.wants_request() {
                info!(
                    "Generating certificate request for Certificate Authority: {}.",
                    name
                );
                self.generate_csr(Some(ca), overwrite);
            }
            if actions.wants_sign() {
                info!("Generating certificate for Certificate Authority: {}.", name);
                self.generate_ca_certificate(Some(ca), overwrite);
            }
        }
        for (name, user) in &group.users {
            if actions.wants_key() {
                info!("Generating key for user: {}.", name);
                self.generate_key(Some(user), overwrite);
            }
            if actions.wants_request() {
                info!("Generating certificate request for user: {}.", name);
                self.generate_csr(Some(user), overwrite);
            }
            if actions.wants_sign() {
                info!("Generating certificate for user: {}.", name);
                self.sign_certificate(Some(user), overwrite, signer);
            }
        }
    }

    /// Generates an RSA key for the entity.
    ///
    /// Returns true if the key was generated, or if it already exists and
    /// `overwrite` is false. Returns false when the entity is absent, its
    /// password cannot be resolved or the external tool fails.
    pub fn generate_key(&self, entity: Option<&Entity>, overwrite: bool) -> bool {
        let Some(entity) = entity else {
            warn!("No entity supplied for key generation.");
            return false;
        };
        if self.files.file_exists(entity.key_file()) && !overwrite {
            warn!(
                "Key already exists for {} at location {}, will not overwrite.",
                entity.name(),
                entity.key_file()
            );
            return true;
        }
        let Some(bits) = entity.bits() else {
            warn!("Key size for {} is not set, aborting.", entity.name());
            return false;
        };
        let mut command = vec![
            self.openssl.clone(),
            "genrsa".to_string(),
            "-out".to_string(),
            entity.key_file().to_string(),
        ];
        if entity.is_protected() {
            let Some(directive) = self.resolve_password(entity) else {
                return false;
            };
            command.push("-des3".to_string());
            command.push("-passout".to_string());
            command.push(directive);
        }
        // Bits must be the last argument in the command.
        command.push(bits.to_string());
        self.runner.run(&command)
    }

    /// Generates a certificate signing request for the entity.
    ///
    /// The entity's key must already exist on disk. Returns true if the
    /// request was generated, or if it already exists and `overwrite` is
    /// false.
    pub fn generate_csr(&self, entity: Option<&Entity>, overwrite: bool) -> bool {
        let Some(entity) = entity else {
            warn!("No entity supplied for request generation.");
            return false;
        };
        if !self.files.file_exists(entity.key_file()) {
            warn!(
                "Key for {} does not exist at {}, aborting.",
                entity.name(),
                entity.key_file()
            );
            return false;
        }
        if self.files.file_exists(entity.certificate_signing_request_file()) && !overwrite {
            warn!(
                "Certificate Signing Request for {} already exists at {}, will not overwrite.",
                entity.name(),
                entity.certificate_signing_request_file()
            );
            return true;
        }
        let mut command = vec![
            self.openssl.clone(),
            "req".to_string(),
            "-new".to_string(),
            "-out".to_string(),
            entity.certificate_signing_request_file().to_string(),
            "-subj".to_string(),
            entity.format_subject(),
            "-key".to_string(),
            entity.key_file().to_string(),
        ];
        if entity.is_protected() {
            let Some(directive) = self.resolve_password(entity) else {
                return false;
            };
            command.push("-passin".to_string());
            command.push(directive);
        }
        self.runner.run(&command)
    }

    /// Generates a self-signed certificate for a certificate authority.
    ///
    /// The CA's key must already exist on disk. Returns true if the
    /// certificate was generated, or if it already exists and `overwrite`
    /// is false.
    pub fn generate_ca_certificate(&self, entity: Option<&Entity>, overwrite: bool) -> bool {
        let Some(entity) = entity else {
            warn!("No CA supplied for certificate generation.");
            return false;
        };
        if !self.files.file_exists(entity.key_file()) {
            warn!(
                "CA key for {} does not exist at {}, aborting.",
                entity.name(),
                entity.key_file()
            );
            return false;
        }
        if self.files.file_exists(entity.certificate_file()) && !overwrite {
            warn!(
                "CA's certificate for {} already exists at {}, will not overwrite.",
                entity.name(),
                entity.certificate_file()
            );
            return true;
        }
        let Some(days) = entity.certificate_expiration() else {
            warn!(
                "Certificate expiration for {} is not set, aborting.",
                entity.name()
            );
            return false;
        };
        let mut command = vec![
            self.openssl.clone(),
            "req".to_string(),
            "-new".to_string(),
            "-x509".to_string(),
            "-key".to_string(),
            entity.key_file().to_string(),
            "-subj".to_string(),
            entity.format_subject(),
            "-days".to_string(),
            days.to_string(),
            "-out".to_string(),
            entity.certificate_file().to_string(),
        ];
        if entity.is_protected() {
            let Some(directive) = self.resolve_password(entity) else {
                return false;
            };
            command.push("-passin".to_string());
            command.push(directive);
        }
        self.runner.run(&command)
    }

    /// Signs the entity's certificate request with the signer's key.
    ///
    /// The entity's request and the signer's certificate and key must all
    /// exist on disk; each precondition is checked, and logged, on its own.
    /// Returns true if the certificate was generated, or if it already
    /// exists and `overwrite` is false.
    pub fn sign_certificate(
        &self,
        entity: Option<&Entity>,
        overwrite: bool,
        signer: Option<&Entity>,
    ) -> bool {
        let Some(entity) = entity else {
            warn!("No entity supplied for signing.");
            return false;
        };
        let Some(signer) = signer else {
            warn!(
                "No CA supplied when attempting to sign certificate for {}.",
                entity.name()
            );
            return false;
        };
        if self.files.file_exists(entity.certificate_file()) && !overwrite {
            warn!(
                "Certificate already exists for {} at location {}, will not overwrite.",
                entity.name(),
                entity.certificate_file()
            );
            return true;
        }
        if !self.files.file_exists(entity.certificate_signing_request_file()) {
            warn!(
                "Certificate signing request for {} does not exist at {}, aborting.",
                entity.name(),
                entity.certificate_signing_request_file()
            );
            return false;
        }
        if !self.files.file_exists(signer.certificate_file()) {
            warn!(
                "Certificate Authority's certificate for {} at location {} does not exist, aborting.",
                signer.name(),
                signer.certificate_file()
            );
            return false;
        }
        if !self.files.file_exists(signer.key_file()) {
            warn!(
                "Certificate Authority's key for {} at location {} does not exist, aborting.",
                signer.name(),
                signer.key_file()
            );
            return false;
        }
        let Some(days) = entity.certificate_expiration() else {
            warn!(
                "Certificate expiration for {} is not set, aborting.",
                entity.name()
            );
            return false;
        };
        let mut command = vec![
            self.openssl.clone(),
            "x509".to_string(),
            "-req".to_string(),
            "-CAcreateserial".to_string(),
            "-in".to_string(),
            entity.certificate_signing_request_file().to_string(),
            "-CA".to_string(),
            signer.certificate_file().to_string(),
            "-CAkey".to_string(),
            signer.key_file().to_string(),
        ];
        if signer.is_protected() {
            let Some(directive) = self.resolve_password(signer) else {
                return false;
            };
            command.push("-passin".to_string());
            command.push(directive);
        }
        command.push("-out".to_string());
        command.push(entity.certificate_file().to_string());
        command.push("-days".to_string());
        command.push(days.to_string());
        self.runner.run(&command)
    }

    /// Resolves the entity's passphrase into an OpenSSL directive.
    ///
    /// An explicit passphrase (formatted `pass:<value>`) takes priority over
    /// a password file (`file:<path>`, only accepted when the file exists).
    /// Returns `None`, logged, when neither is usable. The raw passphrase
    /// never reaches the log; redaction is handled at the invocation
    /// boundary.
    pub fn resolve_password(&self, entity: &Entity) -> Option<String> {
        info!(
            "Enabling password protected key for {}.",
            entity.name()
        );
        if let Some(password) = entity
            .password()
            .filter(|p| !p.expose_secret().is_empty())
        {
            debug!("Using password phrase for {}.", entity.name());
            return Some(format!("pass:{}", password.expose_secret()));
        }
        if let Some(password_file) = entity.password_file() {
            if self.files.file_exists(password_file) {
                debug!("Using password file for {}.", entity.name());
                return Some(format!("file:{password_file}"));
            }
            warn!(
                "{} specified a password protected key using password file at location {} but no such file exists.",
                entity.name(),
                password_file
            );
            return None;
        }
        warn!(
            "{} specified a password protected key, but no password or password file was specified in the configuration file.",
            entity.name()
        );
        None
    }
}

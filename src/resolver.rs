//! Configuration resolution.
//!
//! The resolver walks the raw configuration tree and turns each group into a
//! [`ResolvedGroup`] of ready-to-generate entities:
//!
//! ```text
//! config.json
//!   └── group
//!         ├── ssl_defaults   (bits, protected, message_digest, days, dirs)
//!         ├── name_defaults  (distinguished name fields)
//!         ├── ca             (one CertificateAuthority entry per name)
//!         └── users          (one User entry per name)
//! ```
//!
//! Field precedence is a three-way coalesce per field: the entity's own
//! value wins over the group default, and the built-in field default applies
//! only when neither is present. A value that is present but badly typed
//! coerces to absent and leaves the entity invalid rather than silently
//! falling through to a default.
//!
//! Resolution is tolerant: a malformed group, a failed directory creation or
//! a broken entity entry is logged and skipped without affecting anything
//! else in the run.

use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::configs::RawGroup;
use crate::distinguished_name::DistinguishedName;
use crate::entity::{
    coerce_bool, coerce_expiration, coerce_int, coerce_string, Entity, EntityBuilder,
    DEFAULT_EXPIRATION_DAYS, DEFAULT_KEY_BITS, DEFAULT_MESSAGE_DIGEST,
};
use crate::files::FileHandler;

/// The entities of one configuration group, keyed by entity name.
#[derive(Debug, Default)]
pub struct ResolvedGroup {
    pub ca: BTreeMap<String, Entity>,
    pub users: BTreeMap<String, Entity>,
}

/// Resolves the raw configuration tree into groups of entities.
#[derive(Debug, Clone, Copy)]
pub struct Resolver {
    files: FileHandler,
}

impl Resolver {
    pub fn new(files: FileHandler) -> Self {
        Self { files }
    }

    /// Resolves `config` into a map of group name to [`ResolvedGroup`].
    ///
    /// # Arguments
    /// * `config` - the decoded configuration document
    /// * `groups` - names of the groups to process; `None` processes all of
    ///   them (an empty set processes none)
    /// * `entities` - names of the CA and user entries to process; `None`
    ///   processes all of them
    ///
    /// A group that is malformed or lacks its `ssl_defaults` or
    /// `name_defaults` section is logged and skipped; the remaining groups
    /// are still processed. Entities whose construction or directory
    /// provisioning fails are omitted from the result.
    pub fn resolve(
        &self,
        config: &Value,
        groups: Option<&HashSet<String>>,
        entities: Option<&HashSet<String>>,
    ) -> BTreeMap<String, ResolvedGroup> {
        let mut all_groups = BTreeMap::new();
        let Some(data) = config.as_object() else {
            warn!("Configuration root is not an object, nothing to resolve.");
            return all_groups;
        };

        for (group_name, group_value) in data {
            if let Some(filter) = groups {
                if !filter.contains(group_name) {
                    debug!("Group {} is not in the list of specified groups.", group_name);
                    continue;
                }
            }
            debug!("Parsing data for group {}.", group_name);
            let raw: RawGroup = match serde_json::from_value(group_value.clone()) {
                Ok(raw) => raw,
                Err(err) => {
                    warn!("Group {} is malformed ({}), skipping.", group_name, err);
                    continue;
                }
            };
            let Some(ssl_defaults) = raw.ssl_defaults else {
                warn!(
                    "ssl_defaults entry for group {} was not found, skipping.",
                    group_name
                );
                continue;
            };
            // The group's user directory is provisioned eagerly; a failure
            // here is reported but does not stop the group.
            if let Some(user_dir) = coerce_string(ssl_defaults.get("user_dir")) {
                if !self.files.ensure_layout(&user_dir) {
                    warn!(
                        "Unable to create directory for group {} at {}.",
                        group_name, user_dir
                    );
                }
            }
            let Some(name_defaults) = raw.name_defaults else {
                warn!(
                    "name_defaults entry for group {} was not found, skipping.",
                    group_name
                );
                continue;
            };

            let mut resolved = ResolvedGroup::default();
            if let Some(cas) = &raw.ca {
                debug!("Generating CAs for group {}.", group_name);
                resolved.ca =
                    self.build_entities(cas, entities, &ssl_defaults, &name_defaults, true);
            }
            if let Some(users) = &raw.users {
                debug!("Generating users for group {}.", group_name);
                resolved.users =
                    self.build_entities(users, entities, &ssl_defaults, &name_defaults, false);
            }
            all_groups.insert(group_name.clone(), resolved);
        }
        all_groups
    }

    fn build_entities(
        &self,
        entries: &Map<String, Value>,
        filter: Option<&HashSet<String>>,
        ssl_defaults: &Map<String, Value>,
        name_defaults: &Map<String, Value>,
        signer: bool,
    ) -> BTreeMap<String, Entity> {
        let mut entities = BTreeMap::new();
        for (name, value) in entries {
            if let Some(filter) = filter {
                if !filter.contains(name) {
                    debug!("{} is not in the list of entities to generate.", name);
                    continue;
                }
            }
            debug!("Generating new entity {}.", name);
            if let Some(entity) = self.build_entity(name, value, ssl_defaults, name_defaults, signer)
            {
                entities.insert(name.clone(), entity);
            }
        }
        entities
    }

    /// Builds one entity from its configuration entry, provisioning its
    /// directory layout. Returns `None` (logged) when the entry is not an
    /// object, construction fails or the directories cannot be created.
    fn build_entity(
        &self,
        name: &str,
        value: &Value,
        ssl_defaults: &Map<String, Value>,
        name_defaults: &Map<String, Value>,
        signer: bool,
    ) -> Option<Entity> {
        let Some(overrides) = value.as_object() else {
            warn!("Entry for {} is not an object, skipping.", name);
            return None;
        };

        let dn = DistinguishedName {
            country: pick_string(overrides.get("country"), name_defaults.get("country")),
            state: pick_string(overrides.get("state"), name_defaults.get("state")),
            locality: pick_string(overrides.get("locality"), name_defaults.get("locality")),
            organization_name: pick_string(
                overrides.get("organization_name"),
                name_defaults.get("organization_name"),
            ),
            organizational_unit_name: pick_string(
                overrides.get("organizational_unit_name"),
                name_defaults.get("organizational_unit_name"),
            ),
            // The common name is always the entity's own; there is no group
            // level default for it.
            common_name: coerce_string(overrides.get("common_name")),
            email: pick_string(overrides.get("email"), name_defaults.get("email")),
        };

        let dir_key = if signer { "ca_dir" } else { "user_dir" };
        let mut builder = EntityBuilder::new(name)
            .distinguished_name(dn)
            .base_dir(pick_string(overrides.get(dir_key), ssl_defaults.get(dir_key)))
            .key_name(coerce_string(overrides.get("key_name")))
            .request_name(coerce_string(overrides.get("cert_request_name")))
            .cert_name(coerce_string(overrides.get("cert_name")))
            .bits(pick_int(
                overrides.get("bits"),
                ssl_defaults.get("bits"),
                DEFAULT_KEY_BITS,
            ))
            .protected(pick_bool(
                overrides.get("protected"),
                ssl_defaults.get("protected"),
                false,
            ))
            .message_digest(pick_string_or(
                overrides.get("message_digest"),
                ssl_defaults.get("message_digest"),
                DEFAULT_MESSAGE_DIGEST,
            ))
            .certificate_expiration(pick_expiration(
                overrides.get("days"),
                ssl_defaults.get("days"),
                DEFAULT_EXPIRATION_DAYS,
            ))
            .password(coerce_string(overrides.get("password")).map(Into::into))
            .password_file(coerce_string(overrides.get("password_file")));
        if signer {
            builder = builder.signer(coerce_string(overrides.get("ca_conf")));
        }

        match builder.build() {
            Ok(entity) => {
                if self.files.ensure_layout(entity.base_dir()) {
                    debug!("Successfully generated new entity {}.", entity.name());
                    Some(entity)
                } else {
                    warn!("Unable to create directory at {}.", entity.base_dir());
                    None
                }
            }
            Err(err) => {
                warn!("{}", err);
                None
            }
        }
    }
}

// ================= Field precedence =================
//
// pick_* implement the per-field precedence: the entity's own raw value if
// present, else the group default, else the built-in field default. An
// explicit JSON null counts as absent. Coercion applies to whichever raw
// value won, so a badly typed winner stays absent instead of falling back.

fn first_present<'a>(entity: Option<&'a Value>, group: Option<&'a Value>) -> Option<&'a Value> {
    entity
        .filter(|v| !v.is_null())
        .or_else(|| group.filter(|v| !v.is_null()))
}

pub(crate) fn pick_string(entity: Option<&Value>, group: Option<&Value>) -> Option<String> {
    coerce_string(first_present(entity, group))
}

pub(crate) fn pick_string_or(
    entity: Option<&Value>,
    group: Option<&Value>,
    fallback: &str,
) -> Option<String> {
    match first_present(entity, group) {
        Some(raw) => coerce_string(Some(raw)),
        None => Some(fallback.to_string()),
    }
}

pub(crate) fn pick_int(entity: Option<&Value>, group: Option<&Value>, fallback: i64) -> Option<i64> {
    match first_present(entity, group) {
        Some(raw) => coerce_int(Some(raw)),
        None => Some(fallback),
    }
}

pub(crate) fn pick_bool(
    entity: Option<&Value>,
    group: Option<&Value>,
    fallback: bool,
) -> Option<bool> {
    match first_present(entity, group) {
        Some(raw) => coerce_bool(Some(raw)),
        None => Some(fallback),
    }
}

pub(crate) fn pick_expiration(
    entity: Option<&Value>,
    group: Option<&Value>,
    fallback: i64,
) -> Option<i64> {
    match first_present(entity, group) {
        Some(raw) => coerce_expiration(Some(raw)),
        None => Some(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::{tempdir, TempDir};

    fn resolver() -> Resolver {
        Resolver::new(FileHandler)
    }

    fn group_config(dir: &TempDir) -> Value {
        let base = dir.path().to_str().unwrap();
        json!({
            "group1": {
                "ssl_defaults": {
                    "bits": 2048,
                    "days": 730,
                    "user_dir": format!("{base}/users"),
                    "ca_dir": format!("{base}/ca")
                },
                "name_defaults": {
                    "country": "US",
                    "organization_name": "Example Corp"
                },
                "ca": {
                    "root": {
                        "common_name": "Example Root CA",
                        "key_name": "root.key",
                        "cert_name": "root.crt",
                        "cert_request_name": "root.csr"
                    }
                },
                "users": {
                    "u1": {
                        "common_name": "U1",
                        "bits": 1,
                        "key_name": "a.key",
                        "cert_name": "c.crt",
                        "cert_request_name": "r.csr"
                    },
                    "u2": {
                        "common_name": "U2",
                        "country": "SE",
                        "key_name": "u2.key",
                        "cert_name": "u2.crt",
                        "cert_request_name": "u2.csr"
                    }
                }
            }
        })
    }

    #[test]
    fn test_entity_value_overrides_group_default() {
        let dir = tempdir().unwrap();
        let resolved = resolver().resolve(&group_config(&dir), None, None);

        let group = &resolved["group1"];
        assert_eq!(group.users["u1"].bits(), Some(1));
    }

    #[test]
    fn test_entity_inherits_group_default() {
        let dir = tempdir().unwrap();
        let resolved = resolver().resolve(&group_config(&dir), None, None);

        let group = &resolved["group1"];
        assert_eq!(group.users["u2"].bits(), Some(2048));
        assert_eq!(group.users["u2"].certificate_expiration(), Some(730));
    }

    #[test]
    fn test_name_defaults_inherited_and_overridable() {
        let dir = tempdir().unwrap();
        let resolved = resolver().resolve(&group_config(&dir), None, None);

        let group = &resolved["group1"];
        let u1 = group.users["u1"].distinguished_name();
        assert_eq!(u1.country.as_deref(), Some("US"));
        assert_eq!(u1.organization_name.as_deref(), Some("Example Corp"));
        assert_eq!(u1.common_name.as_deref(), Some("U1"));
        // u2 overrides the country.
        let u2 = group.users["u2"].distinguished_name();
        assert_eq!(u2.country.as_deref(), Some("SE"));
    }

    #[test]
    fn test_field_default_applies_when_both_absent() {
        let dir = tempdir().unwrap();
        let resolved = resolver().resolve(&group_config(&dir), None, None);

        let group = &resolved["group1"];
        // Neither u1 nor the group sets message_digest or protected.
        assert_eq!(group.users["u1"].message_digest(), Some("sha256"));
        assert!(!group.users["u1"].is_protected());
        assert!(group.users["u1"].is_valid());
    }

    #[test]
    fn test_mistyped_value_invalidates_entity() {
        let dir = tempdir().unwrap();
        let base = dir.path().to_str().unwrap();
        let config = json!({
            "g": {
                "ssl_defaults": {"user_dir": format!("{base}/users")},
                "name_defaults": {},
                "users": {
                    "u1": {
                        "common_name": "U1",
                        "bits": "not a number",
                        "key_name": "a.key",
                        "cert_name": "c.crt",
                        "cert_request_name": "r.csr"
                    }
                }
            }
        });
        let resolved = resolver().resolve(&config, None, None);

        let u1 = &resolved["g"].users["u1"];
        assert_eq!(u1.bits(), None);
        assert!(!u1.is_valid());
    }

    #[test]
    fn test_boolean_days_invalidates_entity() {
        let dir = tempdir().unwrap();
        let base = dir.path().to_str().unwrap();
        let config = json!({
            "g": {
                "ssl_defaults": {"user_dir": format!("{base}/users"), "days": true},
                "name_defaults": {},
                "users": {
                    "u1": {
                        "common_name": "U1",
                        "key_name": "a.key",
                        "cert_name": "c.crt",
                        "cert_request_name": "r.csr"
                    }
                }
            }
        });
        let resolved = resolver().resolve(&config, None, None);

        let u1 = &resolved["g"].users["u1"];
        assert_eq!(u1.certificate_expiration(), None);
        assert!(!u1.is_valid());
    }

    #[test]
    fn test_entity_missing_names_is_omitted() {
        let dir = tempdir().unwrap();
        let base = dir.path().to_str().unwrap();
        let config = json!({
            "g": {
                "ssl_defaults": {"user_dir": format!("{base}/users")},
                "name_defaults": {},
                "users": {
                    "broken": {"common_name": "X"},
                    "ok": {
                        "common_name": "OK",
                        "key_name": "ok.key",
                        "cert_name": "ok.crt",
                        "cert_request_name": "ok.csr"
                    }
                }
            }
        });
        let resolved = resolver().resolve(&config, None, None);

        let group = &resolved["g"];
        assert!(!group.users.contains_key("broken"));
        assert!(group.users.contains_key("ok"));
    }

    #[test]
    fn test_directories_are_provisioned() {
        let dir = tempdir().unwrap();
        let base = dir.path().to_str().unwrap();
        let resolved = resolver().resolve(&group_config(&dir), None, None);

        assert!(resolved["group1"].ca.contains_key("root"));
        let files = FileHandler;
        for subdir in ["keys", "csrs", "crts"] {
            assert!(files.directory_exists(&format!("{base}/users/{subdir}")));
            assert!(files.directory_exists(&format!("{base}/ca/{subdir}")));
        }
    }

    #[test]
    fn test_group_filter_restricts_processing() {
        let dir = tempdir().unwrap();
        let filter: HashSet<String> = ["other".to_string()].into();
        let resolved = resolver().resolve(&group_config(&dir), Some(&filter), None);
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_empty_group_filter_processes_nothing() {
        // An empty set is not the same as "no filter".
        let dir = tempdir().unwrap();
        let filter = HashSet::new();
        let resolved = resolver().resolve(&group_config(&dir), Some(&filter), None);
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_entity_filter_restricts_entities() {
        let dir = tempdir().unwrap();
        let filter: HashSet<String> = ["u1".to_string()].into();
        let resolved = resolver().resolve(&group_config(&dir), None, Some(&filter));

        let group = &resolved["group1"];
        assert!(group.users.contains_key("u1"));
        assert!(!group.users.contains_key("u2"));
        assert!(group.ca.is_empty());
    }

    #[test]
    fn test_group_without_ssl_defaults_is_skipped() {
        let dir = tempdir().unwrap();
        let base = dir.path().to_str().unwrap();
        let config = json!({
            "bad": {"name_defaults": {}},
            "good": {
                "ssl_defaults": {"user_dir": format!("{base}/users")},
                "name_defaults": {},
                "users": {}
            }
        });
        let resolved = resolver().resolve(&config, None, None);

        assert!(!resolved.contains_key("bad"));
        assert!(resolved.contains_key("good"));
    }

    #[test]
    fn test_malformed_group_does_not_abort_remaining_groups() {
        let dir = tempdir().unwrap();
        let base = dir.path().to_str().unwrap();
        // "aaa" sorts first and is malformed; "zzz" must still resolve.
        let config = json!({
            "aaa": "not an object",
            "zzz": {
                "ssl_defaults": {"user_dir": format!("{base}/users")},
                "name_defaults": {},
                "users": {
                    "u1": {
                        "common_name": "U1",
                        "key_name": "a.key",
                        "cert_name": "c.crt",
                        "cert_request_name": "r.csr"
                    }
                }
            }
        });
        let resolved = resolver().resolve(&config, None, None);

        assert!(!resolved.contains_key("aaa"));
        assert!(resolved["zzz"].users.contains_key("u1"));
    }

    #[test]
    fn test_non_object_config_root_resolves_to_nothing() {
        let resolved = resolver().resolve(&json!([1, 2, 3]), None, None);
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_null_entity_value_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let base = dir.path().to_str().unwrap();
        let config = json!({
            "g": {
                "ssl_defaults": {"user_dir": format!("{base}/users"), "bits": 4096},
                "name_defaults": {},
                "users": {
                    "u1": {
                        "common_name": "U1",
                        "bits": null,
                        "key_name": "a.key",
                        "cert_name": "c.crt",
                        "cert_request_name": "r.csr"
                    }
                }
            }
        });
        let resolved = resolver().resolve(&config, None, None);
        assert_eq!(resolved["g"].users["u1"].bits(), Some(4096));
    }

    #[test]
    fn test_pick_precedence() {
        let entity = json!(1);
        let group = json!(2);
        assert_eq!(pick_int(Some(&entity), Some(&group), 3), Some(1));
        assert_eq!(pick_int(None, Some(&group), 3), Some(2));
        assert_eq!(pick_int(None, None, 3), Some(3));
        // A mistyped winner coerces to absent instead of falling through.
        let bad = json!("one");
        assert_eq!(pick_int(Some(&bad), Some(&group), 3), None);
    }
}

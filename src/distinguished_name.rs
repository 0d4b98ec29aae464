//! Distinguished name handling for certificate subjects.
//!
//! A [`DistinguishedName`] carries the seven identity fields that can appear
//! in a certificate subject. Fields are individually optional; whatever is
//! present is rendered into the `/C=../ST=../...` syntax that OpenSSL accepts
//! for its `-subj` argument.

/// The subject identity fields of a user or certificate authority.
///
/// Every field is optional. Configuration values that are not strings are
/// coerced to absent during resolution rather than rejected, so an instance
/// always exists even for a badly typed configuration entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    pub country: Option<String>,
    pub state: Option<String>,
    pub locality: Option<String>,
    pub organization_name: Option<String>,
    pub organizational_unit_name: Option<String>,
    pub common_name: Option<String>,
    pub email: Option<String>,
}

impl DistinguishedName {
    /// Formats the distinguished name the way OpenSSL expects it on the
    /// command line.
    ///
    /// Fields that are absent are omitted entirely. The field order is fixed
    /// (C, ST, L, O, OU, CN, emailAddress) no matter how the value was
    /// constructed. When no field is present at all the result is the
    /// literal `//`, which OpenSSL treats as an empty subject.
    ///
    /// # Returns
    /// The subject starting and ending with `/`, with one `KEY=value/`
    /// segment per present field.
    pub fn format_subject(&self) -> String {
        let fields = [
            ("C", &self.country),
            ("ST", &self.state),
            ("L", &self.locality),
            ("O", &self.organization_name),
            ("OU", &self.organizational_unit_name),
            ("CN", &self.common_name),
            ("emailAddress", &self.email),
        ];

        let mut subject = String::from("/");
        let mut any_present = false;
        for (key, value) in fields {
            if let Some(value) = value {
                any_present = true;
                subject.push_str(key);
                subject.push('=');
                subject.push_str(value);
                subject.push('/');
            }
        }
        if any_present {
            subject
        } else {
            String::from("//")
        }
    }
}

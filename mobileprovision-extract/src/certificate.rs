// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Developer certificates embedded in provisioning profiles.

use {
    crate::asn1::rfc5280::Certificate,
    std::fmt::{Debug, Formatter},
};

/// Text displayed in place of a common name that couldn't be derived.
pub const UNKNOWN_COMMON_NAME: &str = "Unknown";

/// Obtain the subject common name of a DER encoded X.509 certificate.
///
/// Display of certificates is best effort: any decoding problem or a subject
/// without a common name yields `None`.
pub fn parse_common_name(data: &[u8]) -> Option<String> {
    Certificate::decode_ber(data)
        .ok()?
        .tbs_certificate
        .subject
        .common_name()
}

/// A certificate from a profile's `DeveloperCertificates` array.
#[derive(Clone, Eq, PartialEq)]
pub struct DeveloperCertificate {
    der: Vec<u8>,
    common_name: Option<String>,
}

impl Debug for DeveloperCertificate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("DeveloperCertificate");
        s.field("common_name", &self.common_name);
        s.field("der", &format_args!("{}", hex::encode(&self.der)));
        s.finish()
    }
}

impl DeveloperCertificate {
    /// Construct an instance from raw certificate bytes.
    ///
    /// This never fails. Bytes that aren't a certificate simply don't have
    /// a common name.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Self {
        let der = der.into();
        let common_name = parse_common_name(&der);

        Self { der, common_name }
    }

    /// The raw bytes of the certificate, as embedded in the profile.
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// The subject common name, if it could be derived.
    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref()
    }

    /// The subject common name or [UNKNOWN_COMMON_NAME].
    pub fn display_name(&self) -> &str {
        self.common_name().unwrap_or(UNKNOWN_COMMON_NAME)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const DEVELOPER_CERT: &[u8] = include_bytes!("testdata/developer.der");
    const NO_COMMON_NAME_CERT: &[u8] = include_bytes!("testdata/no-common-name.der");

    #[test]
    fn common_name() {
        assert_eq!(
            parse_common_name(DEVELOPER_CERT).as_deref(),
            Some("Apple Development: Jane Appleseed (A1B2C3D4E5)")
        );
    }

    #[test]
    fn unparsable_certificates() {
        assert_eq!(parse_common_name(NO_COMMON_NAME_CERT), None);
        assert_eq!(parse_common_name(b""), None);
        assert_eq!(parse_common_name(b"not a certificate"), None);
        assert_eq!(parse_common_name(&DEVELOPER_CERT[1..]), None);
    }

    #[test]
    fn developer_certificate() {
        let cert = DeveloperCertificate::from_der(DEVELOPER_CERT);
        assert_eq!(cert.as_der(), DEVELOPER_CERT);
        assert_eq!(
            cert.display_name(),
            "Apple Development: Jane Appleseed (A1B2C3D4E5)"
        );

        let cert = DeveloperCertificate::from_der(b"garbage".to_vec());
        assert_eq!(cert.common_name(), None);
        assert_eq!(cert.display_name(), UNKNOWN_COMMON_NAME);
    }
}

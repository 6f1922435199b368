// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! ASN.1 types defined RFC 5280. */

use {
    crate::asn1::rfc3280::Name,
    bcder::{
        decode::{Constructed, DecodeError, Source},
        BitString, Captured, Integer, Mode, Tag,
    },
    std::convert::Infallible,
};

/// Certificate.
///
/// ```ASN.1
/// Certificate  ::=  SEQUENCE  {
///   tbsCertificate       TBSCertificate,
///   signatureAlgorithm   AlgorithmIdentifier,
///   signature            BIT STRING  }
/// ```
#[derive(Clone, Debug)]
pub struct Certificate {
    pub tbs_certificate: TbsCertificate,
    pub signature_algorithm: Captured,
    pub signature: BitString,
}

impl Certificate {
    /// Construct an instance by parsing BER encoded ASN.1 data.
    ///
    /// Certificates should be DER. But BER is a superset and being lenient
    /// costs nothing when all we want is to display the subject.
    pub fn decode_ber(data: &[u8]) -> Result<Self, DecodeError<Infallible>> {
        Constructed::decode(data, Mode::Ber, |cons| Self::take_from(cons))
    }

    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| Self::from_sequence(cons))
    }

    pub fn from_sequence<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Self, DecodeError<S::Error>> {
        let tbs_certificate = TbsCertificate::take_from(cons)?;
        let signature_algorithm = cons.take_sequence(|cons| cons.capture_all())?;
        let signature = BitString::take_from(cons)?;

        Ok(Self {
            tbs_certificate,
            signature_algorithm,
            signature,
        })
    }
}

/// TBS Certificate.
///
/// ```ASN.1
/// TBSCertificate  ::=  SEQUENCE  {
///      version         [0]  Version DEFAULT v1,
///      serialNumber         CertificateSerialNumber,
///      signature            AlgorithmIdentifier,
///      issuer               Name,
///      validity             Validity,
///      subject              Name,
///      subjectPublicKeyInfo SubjectPublicKeyInfo,
///      issuerUniqueID  [1]  IMPLICIT UniqueIdentifier OPTIONAL,
///      subjectUniqueID [2]  IMPLICIT UniqueIdentifier OPTIONAL,
///      extensions      [3]  Extensions OPTIONAL }
/// ```
///
/// Only the names are decoded. Everything after the subject public key info
/// is captured as a single blob.
#[derive(Clone, Debug)]
pub struct TbsCertificate {
    pub version: Option<Integer>,
    pub serial_number: Integer,
    pub signature: Captured,
    pub issuer: Name,
    pub validity: Captured,
    pub subject: Name,
    pub subject_public_key_info: Captured,
    pub trailing: Captured,
}

impl TbsCertificate {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let version = cons.take_opt_constructed_if(Tag::CTX_0, |cons| Integer::take_from(cons))?;
            let serial_number = Integer::take_from(cons)?;
            let signature = cons.take_sequence(|cons| cons.capture_all())?;
            let issuer = Name::take_from(cons)?;
            let validity = cons.take_sequence(|cons| cons.capture_all())?;
            let subject = Name::take_from(cons)?;
            let subject_public_key_info = cons.take_sequence(|cons| cons.capture_all())?;
            let trailing = cons.capture_all()?;

            Ok(Self {
                version,
                serial_number,
                signature,
                issuer,
                validity,
                subject,
                subject_public_key_info,
                trailing,
            })
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const DEVELOPER_CERT: &[u8] = include_bytes!("../testdata/developer.der");
    const NO_COMMON_NAME_CERT: &[u8] = include_bytes!("../testdata/no-common-name.der");

    #[test]
    fn parse_developer_certificate() {
        let cert = Certificate::decode_ber(DEVELOPER_CERT).unwrap();

        assert_eq!(
            cert.tbs_certificate.subject.common_name().as_deref(),
            Some("Apple Development: Jane Appleseed (A1B2C3D4E5)")
        );
        // Self-signed, so the issuer carries the same CN.
        assert_eq!(
            cert.tbs_certificate.issuer.common_name(),
            cert.tbs_certificate.subject.common_name()
        );
        assert_eq!(cert.tbs_certificate.subject.iter_attributes().count(), 5);
    }

    #[test]
    fn parse_certificate_without_common_name() {
        let cert = Certificate::decode_ber(NO_COMMON_NAME_CERT).unwrap();

        assert_eq!(cert.tbs_certificate.subject.iter_common_name().count(), 0);
        assert!(cert.tbs_certificate.subject.common_name().is_none());
    }

    #[test]
    fn truncated_certificate() {
        assert!(Certificate::decode_ber(&DEVELOPER_CERT[0..DEVELOPER_CERT.len() / 2]).is_err());
        assert!(Certificate::decode_ber(&[]).is_err());
    }
}

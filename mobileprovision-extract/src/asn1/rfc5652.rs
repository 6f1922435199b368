// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! ASN.1 data structures defined by RFC 5652.

Provisioning profiles are a `ContentInfo` of type signed-data. We only
need to descend far enough to reach the encapsulated content. Signer
infos and the certificate set are captured but never examined: nothing
here verifies a signature.
*/

use {
    bcder::{
        decode::{Constructed, DecodeError, Source},
        Captured, ConstOid, Integer, Mode, OctetString, Oid, Tag,
    },
    std::convert::Infallible,
};

/// The data content type.
///
/// `id-data` in RFC 5652.
///
/// 1.2.840.113549.1.7.1
pub const OID_ID_DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 1]);

/// The signed-data content type.
///
/// 1.2.840.113549.1.7.2
pub const OID_ID_SIGNED_DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 2]);

pub type ContentType = Oid;

/// Represents signed data.
///
/// ASN.1 type definition:
///
/// ```ASN.1
/// SignedData ::= SEQUENCE {
///   version CMSVersion,
///   digestAlgorithms DigestAlgorithmIdentifiers,
///   encapContentInfo EncapsulatedContentInfo,
///   certificates [0] IMPLICIT CertificateSet OPTIONAL,
///   crls [1] IMPLICIT RevocationInfoChoices OPTIONAL,
///   signerInfos SignerInfos }
/// ```
#[derive(Clone, Debug)]
pub struct SignedData {
    pub version: Integer,
    pub digest_algorithms: Captured,
    pub content_info: EncapsulatedContentInfo,
    pub certificates: Option<Captured>,
    pub crls: Option<Captured>,
    pub signer_infos: Captured,
}

impl SignedData {
    /// Attempt to decode BER encoded bytes to a parsed data structure.
    ///
    /// The bytes must hold a `ContentInfo` whose content type is signed-data.
    pub fn decode_ber(data: &[u8]) -> Result<Self, DecodeError<Infallible>> {
        Constructed::decode(data, Mode::Ber, |cons| Self::decode(cons))
    }

    pub fn decode<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let oid = ContentType::take_from(cons)?;

            if oid != OID_ID_SIGNED_DATA {
                return Err(cons.content_err("ContentInfo is not signed-data"));
            }

            cons.take_constructed_if(Tag::CTX_0, Self::take_from)
        })
    }

    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let version = Integer::take_from(cons)?;
            let digest_algorithms = cons.take_set(|cons| cons.capture_all())?;
            let content_info = EncapsulatedContentInfo::take_from(cons)?;
            let certificates = cons.take_opt_constructed_if(Tag::CTX_0, |cons| cons.capture_all())?;
            let crls = cons.take_opt_constructed_if(Tag::CTX_1, |cons| cons.capture_all())?;
            let signer_infos = cons.take_set(|cons| cons.capture_all())?;

            Ok(Self {
                version,
                digest_algorithms,
                content_info,
                certificates,
                crls,
                signer_infos,
            })
        })
    }
}

/// Encapsulated content info.
///
/// ```ASN.1
/// EncapsulatedContentInfo ::= SEQUENCE {
///   eContentType ContentType,
///   eContent [0] EXPLICIT OCTET STRING OPTIONAL }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EncapsulatedContentInfo {
    pub content_type: ContentType,
    pub content: Option<OctetString>,
}

impl EncapsulatedContentInfo {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let content_type = ContentType::take_from(cons)?;
            let content =
                cons.take_opt_constructed_if(Tag::CTX_0, |cons| OctetString::take_from(cons))?;

            Ok(Self {
                content_type,
                content,
            })
        })
    }

    /// Whether the content type is `id-data`.
    pub fn is_data(&self) -> bool {
        self.content_type == OID_ID_DATA
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ASN.1 types defined in RFC 3280.

use {
    bcder::{
        decode::{BytesSource, Constructed, DecodeError, Source},
        string::{Ia5String, PrintableString, Utf8String},
        Captured, ConstOid, Oid, Tag,
    },
    std::{
        fmt::{Debug, Formatter},
        ops::Deref,
    },
};

/// Common Name (CN)
///
/// 2.5.4.3
pub const OID_COMMON_NAME: ConstOid = Oid(&[85, 4, 3]);

/// Directory string.
///
/// ```ASN.1
/// DirectoryString ::= CHOICE {
///       teletexString           TeletexString (SIZE (1..MAX)),
///       printableString         PrintableString (SIZE (1..MAX)),
///       universalString         UniversalString (SIZE (1..MAX)),
///       utf8String              UTF8String (SIZE (1..MAX)),
///       bmpString               BMPString (SIZE (1..MAX)) }
/// ```
///
/// IA5String isn't a member of the choice but shows up in the wild, so we
/// accept it too.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DirectoryString {
    PrintableString(PrintableString),
    Utf8String(Utf8String),
    Ia5String(Ia5String),
}

impl DirectoryString {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_value(|tag, content| {
            if tag == Tag::PRINTABLE_STRING {
                Ok(Self::PrintableString(PrintableString::from_content(
                    content,
                )?))
            } else if tag == Tag::UTF8_STRING {
                Ok(Self::Utf8String(Utf8String::from_content(content)?))
            } else if tag == Tag::IA5_STRING {
                Ok(Self::Ia5String(Ia5String::from_content(content)?))
            } else {
                Err(content.content_err(
                    "only decoding of PrintableString, UTF8String and IA5String is implemented",
                ))
            }
        })
    }
}

impl ToString for DirectoryString {
    fn to_string(&self) -> String {
        match self {
            Self::PrintableString(s) => s.to_string(),
            Self::Utf8String(s) => s.to_string(),
            Self::Ia5String(s) => s.to_string(),
        }
    }
}

/// Name.
///
/// ```ASN.1
/// Name ::= CHOICE { -- only one possibility for now --
///   rdnSequence  RDNSequence }
/// ```
#[derive(Clone, Debug, Default)]
pub struct Name(RdnSequence);

impl Deref for Name {
    type Target = RdnSequence;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Name {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        Ok(Self(RdnSequence::take_from(cons)?))
    }

    /// Iterate over all attributes in this Name.
    pub fn iter_attributes(&self) -> impl Iterator<Item = &AttributeTypeAndValue> {
        self.0.iter().flat_map(|rdn| rdn.iter())
    }

    /// Iterate over all attributes in this Name having a given OID.
    pub fn iter_by_oid<'a>(
        &'a self,
        oid: &'a ConstOid,
    ) -> impl Iterator<Item = &'a AttributeTypeAndValue> + 'a {
        self.iter_attributes().filter(move |atv| &atv.typ == oid)
    }

    /// Iterate over all Common Name (CN) attributes.
    pub fn iter_common_name(&self) -> impl Iterator<Item = &AttributeTypeAndValue> {
        self.iter_by_oid(&OID_COMMON_NAME)
    }

    /// Obtain the first Common Name attribute that decodes to a string.
    ///
    /// Attributes holding string types we can't decode are passed over.
    pub fn common_name(&self) -> Option<String> {
        self.iter_common_name()
            .find_map(|atv| atv.to_string().ok())
    }
}

/// ```ASN.1
/// RDNSequence ::= SEQUENCE OF RelativeDistinguishedName
/// ```
#[derive(Clone, Debug, Default)]
pub struct RdnSequence(Vec<RelativeDistinguishedName>);

impl Deref for RdnSequence {
    type Target = Vec<RelativeDistinguishedName>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl RdnSequence {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let mut values = Vec::new();

            while let Some(value) = RelativeDistinguishedName::take_opt_from(cons)? {
                values.push(value);
            }

            Ok(Self(values))
        })
    }
}

/// Relative distinguished name.
///
/// ```ASN.1
/// RelativeDistinguishedName ::=
///   SET OF AttributeTypeAndValue
/// ```
#[derive(Clone, Debug, Default)]
pub struct RelativeDistinguishedName(Vec<AttributeTypeAndValue>);

impl Deref for RelativeDistinguishedName {
    type Target = Vec<AttributeTypeAndValue>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl RelativeDistinguishedName {
    pub fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_set(|cons| {
            let mut values = Vec::new();

            while let Some(value) = AttributeTypeAndValue::take_opt_from(cons)? {
                values.push(value);
            }

            Ok(Self(values))
        })
    }
}

pub type AttributeType = Oid;

/// Attribute type and its value.
///
/// ```ASN.1
/// AttributeTypeAndValue ::= SEQUENCE {
///   type     AttributeType,
///   value    AttributeValue }
/// ```
///
/// The value is captured and only decoded on request.
#[derive(Clone)]
pub struct AttributeTypeAndValue {
    pub typ: AttributeType,
    pub value: Captured,
}

impl Debug for AttributeTypeAndValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("AttributeTypeAndValue");
        s.field("type", &format_args!("{}", self.typ));
        s.field("value", &format_args!("{}", hex::encode(self.value.as_slice())));
        s.finish()
    }
}

impl AttributeTypeAndValue {
    pub fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| {
            let typ = AttributeType::take_from(cons)?;
            let value = cons.capture_all()?;

            Ok(Self { typ, value })
        })
    }

    /// Attempt to coerce the stored value to a Rust string.
    pub fn to_string(&self) -> Result<String, DecodeError<<BytesSource as Source>::Error>> {
        self.value
            .clone()
            .decode(|cons| Ok(DirectoryString::take_from(cons)?.to_string()))
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Provisioning profile data model.

A [ProvisioningProfile] is built from the dictionary at the root of the
profile's plist. Every field is required except the device list, whose
absence is meaningful: distribution profiles don't carry one.
*/

use {
    crate::{
        certificate::DeveloperCertificate,
        error::ProfileError,
        property_list::{Dictionary, Value},
    },
    chrono::{DateTime, FixedOffset},
};

/// Fields of a provisioning profile, in display order.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ProfileField {
    AppIdName,
    ApplicationIdentifierPrefixes,
    CreationDate,
    Platforms,
    DeveloperCertificates,
    Entitlements,
    ExpirationDate,
    Name,
    ProvisionedDevices,
    TeamIdentifiers,
    TeamName,
    TimeToLive,
    Uuid,
    Version,
}

impl ProfileField {
    /// All fields, in the order they are rendered.
    pub fn all() -> &'static [Self] {
        &[
            Self::AppIdName,
            Self::ApplicationIdentifierPrefixes,
            Self::CreationDate,
            Self::Platforms,
            Self::DeveloperCertificates,
            Self::Entitlements,
            Self::ExpirationDate,
            Self::Name,
            Self::ProvisionedDevices,
            Self::TeamIdentifiers,
            Self::TeamName,
            Self::TimeToLive,
            Self::Uuid,
            Self::Version,
        ]
    }

    /// The key holding this field in the profile plist.
    pub fn plist_key(&self) -> &'static str {
        match self {
            Self::AppIdName => "AppIDName",
            Self::ApplicationIdentifierPrefixes => "ApplicationIdentifierPrefix",
            Self::CreationDate => "CreationDate",
            Self::Platforms => "Platform",
            Self::DeveloperCertificates => "DeveloperCertificates",
            Self::Entitlements => "Entitlements",
            Self::ExpirationDate => "ExpirationDate",
            Self::Name => "Name",
            Self::ProvisionedDevices => "ProvisionedDevices",
            Self::TeamIdentifiers => "TeamIdentifier",
            Self::TeamName => "TeamName",
            Self::TimeToLive => "TimeToLive",
            Self::Uuid => "UUID",
            Self::Version => "Version",
        }
    }
}

/// A decoded provisioning profile.
#[derive(Clone, Debug, PartialEq)]
pub struct ProvisioningProfile {
    pub app_id_name: String,
    pub application_identifier_prefixes: Vec<String>,
    pub creation_date: DateTime<FixedOffset>,
    pub platforms: Vec<String>,
    pub developer_certificates: Vec<DeveloperCertificate>,
    /// Entitlements in the order the profile declares them.
    pub entitlements: Dictionary,
    pub expiration_date: DateTime<FixedOffset>,
    pub name: String,
    /// `None` when the profile has no device list at all.
    pub provisioned_devices: Option<Vec<String>>,
    pub team_identifiers: Vec<String>,
    pub team_name: String,
    /// Validity in days.
    pub time_to_live: i64,
    pub uuid: String,
    pub version: i64,
}

impl ProvisioningProfile {
    /// Construct an instance from the root dictionary of a profile plist.
    ///
    /// Keys are matched case-sensitively. Keys we don't model are ignored.
    /// Certificates that can't be parsed don't cause failure; they just
    /// lack a common name.
    pub fn from_dictionary(dict: &Dictionary) -> Result<Self, ProfileError> {
        let fields = FieldReader(dict);

        Ok(Self {
            app_id_name: fields.string(ProfileField::AppIdName)?,
            application_identifier_prefixes: fields
                .string_array(ProfileField::ApplicationIdentifierPrefixes)?,
            creation_date: fields.date(ProfileField::CreationDate)?,
            platforms: fields.string_array(ProfileField::Platforms)?,
            developer_certificates: fields
                .data_array(ProfileField::DeveloperCertificates)?
                .into_iter()
                .map(DeveloperCertificate::from_der)
                .collect(),
            entitlements: fields.dictionary(ProfileField::Entitlements)?,
            expiration_date: fields.date(ProfileField::ExpirationDate)?,
            name: fields.string(ProfileField::Name)?,
            provisioned_devices: if dict.contains_key(ProfileField::ProvisionedDevices.plist_key())
            {
                Some(fields.string_array(ProfileField::ProvisionedDevices)?)
            } else {
                None
            },
            team_identifiers: fields.string_array(ProfileField::TeamIdentifiers)?,
            team_name: fields.string(ProfileField::TeamName)?,
            time_to_live: fields.integer(ProfileField::TimeToLive)?,
            uuid: fields.string(ProfileField::Uuid)?,
            version: fields.integer(ProfileField::Version)?,
        })
    }

    /// Look up an entitlement by name.
    pub fn entitlement(&self, key: &str) -> Option<&Value> {
        self.entitlements.get(key)
    }
}

/// Build a [ProvisioningProfile] from decoded plist values.
pub fn build(values: &Dictionary) -> Result<ProvisioningProfile, ProfileError> {
    ProvisioningProfile::from_dictionary(values)
}

/// Typed field access with errors naming the offending plist key.
struct FieldReader<'a>(&'a Dictionary);

impl<'a> FieldReader<'a> {
    fn get(&self, field: ProfileField) -> Result<&'a Value, ProfileError> {
        self.0
            .get(field.plist_key())
            .ok_or(ProfileError::MissingField(field.plist_key()))
    }

    fn string(&self, field: ProfileField) -> Result<String, ProfileError> {
        match self.get(field)? {
            Value::String(s) => Ok(s.clone()),
            value => Err(mismatch(field, "string", value)),
        }
    }

    fn integer(&self, field: ProfileField) -> Result<i64, ProfileError> {
        match self.get(field)? {
            Value::Integer(v) => Ok(*v),
            Value::UnsignedInteger(_) => Err(ProfileError::TypeMismatch {
                field: field.plist_key(),
                expected: "integer",
                found: "integer above the signed 64-bit range",
            }),
            value => Err(mismatch(field, "integer", value)),
        }
    }

    fn date(&self, field: ProfileField) -> Result<DateTime<FixedOffset>, ProfileError> {
        match self.get(field)? {
            Value::Date(dt) => Ok(*dt),
            value => Err(mismatch(field, "date", value)),
        }
    }

    fn dictionary(&self, field: ProfileField) -> Result<Dictionary, ProfileError> {
        match self.get(field)? {
            Value::Dictionary(dict) => Ok(dict.clone()),
            value => Err(mismatch(field, "dict", value)),
        }
    }

    fn array(&self, field: ProfileField) -> Result<&'a [Value], ProfileError> {
        match self.get(field)? {
            Value::Array(values) => Ok(values),
            value => Err(mismatch(field, "array", value)),
        }
    }

    fn string_array(&self, field: ProfileField) -> Result<Vec<String>, ProfileError> {
        self.array(field)?
            .iter()
            .map(|value| match value {
                Value::String(s) => Ok(s.clone()),
                value => Err(mismatch(field, "array of string", value)),
            })
            .collect()
    }

    fn data_array(&self, field: ProfileField) -> Result<Vec<&'a [u8]>, ProfileError> {
        self.array(field)?
            .iter()
            .map(|value| match value {
                Value::Data(data) => Ok(data.as_slice()),
                value => Err(mismatch(field, "array of data", value)),
            })
            .collect()
    }
}

fn mismatch(field: ProfileField, expected: &'static str, found: &Value) -> ProfileError {
    ProfileError::TypeMismatch {
        field: field.plist_key(),
        expected,
        found: found.type_name(),
    }
}

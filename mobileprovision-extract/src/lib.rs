// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Apple mobile provisioning profile decoding.
//!
//! A provisioning profile (`.mobileprovision` file) is an XML property list
//! wrapped in an RFC 5652 Cryptographic Message Syntax (CMS) signed-data
//! envelope. This crate strips the envelope, decodes the plist into a
//! [ProvisioningProfile] and renders that profile as plain text, XML or an
//! XML plist.
//!
//! ```no_run
//! use mobileprovision_extract::{decode_profile, render_profile, OutputFormat};
//!
//! let data = std::fs::read("embedded.mobileprovision")?;
//! let profile = decode_profile(&data)?;
//!
//! print!(
//!     "{}",
//!     render_profile(&profile, OutputFormat::Text, "embedded.mobileprovision", None)
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Security
//!
//! **The CMS signature is not verified**, nor is the certificate chain that
//! signed it. The signed-data structure is only a container to strip. Nothing
//! decoded by this crate should be treated as authentic, and all of it should
//! be treated as untrusted input. Output formats that are markup escape every
//! value they emit, and text output escapes control characters so values
//! can't masquerade as other fields.
//!
//! # Pipeline
//!
//! * [envelope] recovers the embedded plist bytes.
//! * [property_list] decodes XML plists into ordered [Dictionary] values.
//! * [profile] maps the root dictionary to a [ProvisioningProfile], using
//!   [certificate] to derive a display name for each developer certificate.
//! * [output] renders a profile in a chosen [OutputFormat].
//!
//! The library performs no I/O and doesn't log. Each call is independent.

pub mod asn1;
pub mod certificate;
pub mod envelope;
mod error;
pub use error::*;
pub mod output;
pub use output::OutputFormat;
pub mod profile;
pub use profile::{ProfileField, ProvisioningProfile};
pub mod property_list;
pub use property_list::{Dictionary, Value};

/// Decode the raw content of a `.mobileprovision` file.
pub fn decode_profile(data: &[u8]) -> Result<ProvisioningProfile, CoreError> {
    let plist = envelope::unwrap_envelope(data)?;
    let values = property_list::decode(&plist)?;

    Ok(profile::build(&values)?)
}

/// Render a decoded profile.
///
/// `original_path` is the path of the file the profile was read from.
/// `tool_version` is the version of the calling tool, if it is known.
pub fn render_profile(
    profile: &ProvisioningProfile,
    format: OutputFormat,
    original_path: &str,
    tool_version: Option<&str>,
) -> String {
    output::render(profile, format, original_path, tool_version)
}

/// The file extension to give rendered output of a format.
pub fn extension_for(format: OutputFormat) -> &'static str {
    format.extension()
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Stripping the signed-data envelope around a provisioning profile.

A `.mobileprovision` file is a BER encoded CMS `ContentInfo` of type
signed-data whose encapsulated content is an XML plist.

**The signature is not verified.** The envelope is treated as a container
to strip, not as a trust boundary. Callers must not infer anything about
the authenticity of the returned bytes.
*/

use {
    crate::{asn1::rfc5652::SignedData, error::EnvelopeError},
    bcder::{decode::Constructed, Mode},
};

/// Obtain the content embedded in a signed-data envelope.
///
/// Returns exactly the encapsulated content bytes, unmodified. Content split
/// across a constructed (indefinite length) OCTET STRING is reassembled.
///
/// The `ContentInfo` must span all of `data`.
pub fn unwrap_envelope(data: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let signed_data =
        SignedData::decode_ber(data).map_err(|e| EnvelopeError::Malformed(format!("{}", e)))?;

    // Top-level decoding doesn't look past the first value.
    let encoded_len = Constructed::decode(data, Mode::Ber, |cons| cons.capture_one())
        .map_err(|e| EnvelopeError::Malformed(format!("{}", e)))?
        .as_slice()
        .len();
    if encoded_len != data.len() {
        return Err(EnvelopeError::Malformed(format!(
            "{} bytes of trailing data after ContentInfo",
            data.len() - encoded_len
        )));
    }

    let content = signed_data
        .content_info
        .content
        .map(|content| content.to_bytes())
        .filter(|content| !content.is_empty())
        .ok_or(EnvelopeError::EmptyContent)?;

    Ok(content.to_vec())
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Holds Rust struct definitions for the ASN.1 primitives we decode.

Only the decoding direction is implemented. Fields that aren't needed to
reach the embedded plist or a certificate's subject are captured as raw
BER and never interpreted.
*/

pub mod rfc3280;
pub mod rfc5280;
pub mod rfc5652;

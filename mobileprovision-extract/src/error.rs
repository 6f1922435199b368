// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    std::fmt::{Display, Formatter},
    thiserror::Error,
};

/// A location within an XML document.
///
/// Lines and columns are 1-based.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TextPosition {
    pub line: u64,
    pub column: u64,
}

impl From<xml::common::TextPosition> for TextPosition {
    fn from(pos: xml::common::TextPosition) -> Self {
        Self {
            line: pos.row + 1,
            column: pos.column + 1,
        }
    }
}

impl Display for TextPosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Errors stripping the signed-data envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed signed-data envelope: {0}")]
    Malformed(String),

    #[error("signed-data envelope does not carry any content")]
    EmptyContent,
}

fn display_position(position: &Option<TextPosition>) -> String {
    position
        .map(|position| format!(" at {}", position))
        .unwrap_or_default()
}

/// Errors decoding an XML property list.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The document is not well-formed XML or not valid plist.
    ///
    /// `position` is known for errors found while scanning the XML.
    #[error("plist syntax error{}: {message}", display_position(.position))]
    Syntax {
        position: Option<TextPosition>,
        message: String,
    },

    #[error("plist root value is a {0}, not a dictionary")]
    RootNotDictionary(&'static str),
}

/// Errors mapping a decoded plist to a provisioning profile.
///
/// Field names are the plist keys as they appear in the profile.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ProfileError {
    #[error("provisioning profile does not define {0}")]
    MissingField(&'static str),

    #[error("provisioning profile field {field} should be {expected} but is {found}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

/// An output format name that isn't recognized.
#[derive(Debug, Error, Eq, PartialEq)]
#[error("unknown output format {0:?}; expected txt, xml or plist")]
pub struct UnknownFormatError(pub String);

/// Unified error type for decoding a provisioning profile.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0}")]
    Envelope(#[from] EnvelopeError),

    #[error("{0}")]
    Decode(#[from] DecodeError),

    #[error("{0}")]
    Profile(#[from] ProfileError),
}

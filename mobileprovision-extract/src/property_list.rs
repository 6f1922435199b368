// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! XML property list decoding.

This implements the XML dialect of Apple's property list format
(`-//Apple//DTD PLIST 1.0//EN`) on top of the `plist` crate.

Documents are scanned with the `xml-rs` pull parser before they are handed
to `plist`, so that structural problems are reported with the position at
which they occurred. The scan also enforces the parts of the dialect
`plist` is lenient about: the root element must be `<plist>`, `<dict>`
entries must alternate `<key>` and value, dates must be written as
`YYYY-MM-DDTHH:MM:SSZ` and elements may nest at most [MAX_NESTING_DEPTH]
deep.

Dictionaries preserve the order in which keys appear in the document.
*/

use {
    crate::error::{DecodeError, TextPosition},
    chrono::{DateTime, FixedOffset, NaiveDateTime, Utc},
    std::{io::Cursor, time::SystemTime},
    xml::{
        common::Position,
        reader::{EventReader, XmlEvent},
    },
};

/// Maximum element nesting depth of a decodable document.
///
/// The `<plist>` root element counts as the first level.
pub const MAX_NESTING_DEPTH: usize = 256;

/// The only `<date>` form the XML dialect defines.
const PLIST_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A value in a property list.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    /// An `<integer>` above [i64::MAX].
    UnsignedInteger(u64),
    Real(f64),
    String(String),
    Date(DateTime<FixedOffset>),
    Data(Vec<u8>),
    Array(Vec<Value>),
    Dictionary(Dictionary),
}

impl Value {
    /// The plist element name of this value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Integer(_) | Self::UnsignedInteger(_) => "integer",
            Self::Real(_) => "real",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::Data(_) => "data",
            Self::Array(_) => "array",
            Self::Dictionary(_) => "dict",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Self::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(v) => Self::Integer(v),
            Err(_) => Self::UnsignedInteger(v),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// An insertion ordered mapping of string keys to values.
///
/// Inserting an existing key replaces its value in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dictionary {
    entries: Vec<(String, Value)>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find_map(|(k, v)| if k == key { Some(v) } else { None })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert a value, returning the previous value for the key if present.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();

        if let Some((_, existing)) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(std::mem::replace(existing, value))
        } else {
            self.entries.push((key, value));
            None
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;

        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        let mut dict = Self::new();

        for (k, v) in iter {
            dict.insert(k, v);
        }

        dict
    }
}

impl TryFrom<plist::Value> for Value {
    type Error = DecodeError;

    fn try_from(value: plist::Value) -> Result<Self, Self::Error> {
        Ok(match value {
            plist::Value::Boolean(v) => Self::Boolean(v),
            plist::Value::Integer(v) => match (v.as_signed(), v.as_unsigned()) {
                (Some(v), _) => Self::Integer(v),
                (None, Some(v)) => Self::UnsignedInteger(v),
                (None, None) => return Err(dialect_err(format!("integer {:?} out of range", v))),
            },
            plist::Value::Real(v) => Self::Real(v),
            plist::Value::String(v) => Self::String(v),
            plist::Value::Date(v) => {
                Self::Date(DateTime::<Utc>::from(SystemTime::from(v)).into())
            }
            plist::Value::Data(v) => Self::Data(v),
            plist::Value::Array(values) => Self::Array(
                values
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            plist::Value::Dictionary(dict) => Self::Dictionary(
                dict.into_iter()
                    .map(|(k, v)| Ok((k, Self::try_from(v)?)))
                    .collect::<Result<_, DecodeError>>()?,
            ),
            value => {
                return Err(dialect_err(format!(
                    "unsupported plist value {:?}",
                    value
                )))
            }
        })
    }
}

impl From<&Value> for plist::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Boolean(v) => Self::Boolean(*v),
            Value::Integer(v) => Self::Integer((*v).into()),
            Value::UnsignedInteger(v) => Self::Integer((*v).into()),
            Value::Real(v) => Self::Real(*v),
            Value::String(v) => Self::String(v.clone()),
            Value::Date(v) => Self::Date(SystemTime::from(*v).into()),
            Value::Data(v) => Self::Data(v.clone()),
            Value::Array(values) => Self::Array(values.iter().map(Self::from).collect()),
            Value::Dictionary(dict) => Self::Dictionary(dict.into()),
        }
    }
}

impl From<&Dictionary> for plist::Dictionary {
    fn from(dict: &Dictionary) -> Self {
        dict.iter()
            .map(|(k, v)| (k.to_string(), plist::Value::from(v)))
            .collect()
    }
}

fn dialect_err(message: impl Into<String>) -> DecodeError {
    DecodeError::Syntax {
        position: None,
        message: message.into(),
    }
}

/// Decode an XML plist whose root value is a dictionary.
pub fn decode(data: &[u8]) -> Result<Dictionary, DecodeError> {
    match decode_value(data)? {
        Value::Dictionary(dict) => Ok(dict),
        value => Err(DecodeError::RootNotDictionary(value.type_name())),
    }
}

/// Decode an XML plist holding any root value.
pub fn decode_value(data: &[u8]) -> Result<Value, DecodeError> {
    scan_document(data)?;

    let value = plist::Value::from_reader_xml(Cursor::new(data))
        .map_err(|e| dialect_err(e.to_string()))?;

    Value::try_from(value)
}

/// What an open element expects next.
enum Frame {
    /// A `<dict>`, and whether the next child must be a `<key>`.
    Dict { expect_key: bool },
    Date,
    Other,
}

/// Check a document's structure before it is decoded.
fn scan_document(data: &[u8]) -> Result<(), DecodeError> {
    let mut events = EventReader::new(data);
    let mut stack: Vec<Frame> = vec![];

    let syntax_err = |events: &EventReader<&[u8]>, message: String| DecodeError::Syntax {
        position: Some(events.position().into()),
        message,
    };

    loop {
        let event = events.next().map_err(|e| DecodeError::Syntax {
            position: Some(TextPosition::from(e.position())),
            message: e.msg().to_string(),
        })?;

        match event {
            XmlEvent::StartElement { name, .. } => {
                let name = name.local_name;

                if stack.is_empty() && name != "plist" {
                    return Err(syntax_err(
                        &events,
                        format!("root element is <{}>, not <plist>", name),
                    ));
                }

                if stack.len() == MAX_NESTING_DEPTH {
                    return Err(syntax_err(
                        &events,
                        format!("elements nested deeper than {}", MAX_NESTING_DEPTH),
                    ));
                }

                if let Some(Frame::Dict { expect_key }) = stack.last_mut() {
                    if *expect_key && name != "key" {
                        return Err(syntax_err(
                            &events,
                            format!("expected <key> in <dict>, found <{}>", name),
                        ));
                    } else if !*expect_key && name == "key" {
                        return Err(syntax_err(&events, "<key> without a value".to_string()));
                    }

                    *expect_key = !*expect_key;
                }

                stack.push(match name.as_str() {
                    "dict" => Frame::Dict { expect_key: true },
                    "date" => Frame::Date,
                    _ => Frame::Other,
                });
            }
            XmlEvent::EndElement { .. } => {
                if let Some(Frame::Dict { expect_key: false }) = stack.pop() {
                    return Err(syntax_err(&events, "<key> without a value".to_string()));
                }
            }
            XmlEvent::Characters(text) => {
                if let Some(Frame::Date) = stack.last() {
                    if NaiveDateTime::parse_from_str(&text, PLIST_DATE_FORMAT).is_err() {
                        return Err(syntax_err(
                            &events,
                            format!("invalid date {:?}; expected YYYY-MM-DDTHH:MM:SSZ", text),
                        ));
                    }
                }
            }
            XmlEvent::EndDocument => return Ok(()),
            _ => {}
        }
    }
}

#[cfg(test)]
mod test {
    use {super::*, indoc::indoc};

    const PROFILE_PLIST: &[u8] = include_bytes!("testdata/profile.plist");

    fn syntax_position(err: DecodeError) -> Option<TextPosition> {
        match err {
            DecodeError::Syntax { position, .. } => position,
            err => panic!("expected syntax error; got {:?}", err),
        }
    }

    #[test]
    fn decode_profile_plist() {
        let dict = decode(PROFILE_PLIST).unwrap();

        assert_eq!(
            dict.keys().collect::<Vec<_>>(),
            vec![
                "AppIDName",
                "ApplicationIdentifierPrefix",
                "CreationDate",
                "Platform",
                "IsXcodeManaged",
                "DeveloperCertificates",
                "Entitlements",
                "ExpirationDate",
                "Name",
                "ProvisionedDevices",
                "TeamIdentifier",
                "TeamName",
                "TimeToLive",
                "UUID",
                "Version",
            ]
        );
        assert_eq!(dict.get("AppIDName"), Some(&Value::from("Example App")));
        assert_eq!(dict.get("IsXcodeManaged"), Some(&Value::Boolean(false)));
        assert_eq!(dict.get("TimeToLive"), Some(&Value::Integer(365)));
        assert_eq!(
            dict.get("Platform"),
            Some(&Value::Array(vec!["iOS".into(), "xrOS".into()]))
        );

        let certs = dict.get("DeveloperCertificates").unwrap().as_array().unwrap();
        assert_eq!(certs.len(), 3);
        assert_eq!(
            certs[0],
            Value::Data(include_bytes!("testdata/developer.der").to_vec())
        );
        assert_eq!(certs[2], Value::Data(b"not a certificate".to_vec()));

        let entitlements = dict.get("Entitlements").unwrap().as_dictionary().unwrap();
        assert_eq!(
            entitlements.keys().collect::<Vec<_>>(),
            vec![
                "application-identifier",
                "keychain-access-groups",
                "get-task-allow",
                "com.apple.developer.team-identifier",
                "com.apple.developer.icloud-container-environment",
            ]
        );
    }

    #[test]
    fn dates_must_use_plist_form() {
        match decode_value(b"<plist><date>2022-10-12T08:15:30Z</date></plist>").unwrap() {
            Value::Date(dt) => assert_eq!(dt.to_rfc3339(), "2022-10-12T08:15:30+00:00"),
            value => panic!("expected date; got {:?}", value),
        }

        for date in [
            "2022-10-12T08:15:30.5Z",
            "2022-10-12T10:15:30+02:00",
            "2022-10-12 08:15:30Z",
        ] {
            let doc = format!("<plist>\n<date>{}</date>\n</plist>", date);
            let position = syntax_position(decode_value(doc.as_bytes()).unwrap_err());

            assert_eq!(position.map(|p| p.line), Some(2), "{}", date);
        }
    }

    #[test]
    fn scalar_values() {
        let dict = decode(indoc! {br#"
            <plist version="1.0">
            <dict>
                <key>empty</key>
                <string/>
                <key>escaped</key>
                <string>&lt;a &amp; b&gt;</string>
                <key>negative</key>
                <integer>-42</integer>
                <key>unsigned</key>
                <integer>18446744073709551615</integer>
                <key>real</key>
                <real>1.5</real>
                <key>yes</key>
                <true/>
                <key>data</key>
                <data>
                    aGVs
                    bG8=
                </data>
                <key>nested</key>
                <array>
                    <array/>
                    <dict/>
                </array>
            </dict>
            </plist>
        "#})
        .unwrap();

        assert_eq!(dict.get("empty"), Some(&Value::from("")));
        assert_eq!(dict.get("escaped"), Some(&Value::from("<a & b>")));
        assert_eq!(dict.get("negative"), Some(&Value::Integer(-42)));
        assert_eq!(dict.get("unsigned"), Some(&Value::UnsignedInteger(u64::MAX)));
        assert_eq!(dict.get("real"), Some(&Value::Real(1.5)));
        assert_eq!(dict.get("yes"), Some(&Value::Boolean(true)));
        assert_eq!(dict.get("data"), Some(&Value::Data(b"hello".to_vec())));
        assert_eq!(
            dict.get("nested"),
            Some(&Value::Array(vec![
                Value::Array(vec![]),
                Value::Dictionary(Dictionary::new())
            ]))
        );
    }

    #[test]
    fn unsigned_integers() {
        assert_eq!(Value::from(7u64), Value::Integer(7));
        assert_eq!(
            Value::from(9_223_372_036_854_775_808u64),
            Value::UnsignedInteger(9_223_372_036_854_775_808)
        );

        assert_eq!(
            decode_value(b"<plist><integer>9223372036854775807</integer></plist>").unwrap(),
            Value::Integer(i64::MAX)
        );
        assert_eq!(
            decode_value(b"<plist><integer>9223372036854775808</integer></plist>").unwrap(),
            Value::UnsignedInteger(9_223_372_036_854_775_808)
        );
        assert!(matches!(
            decode_value(b"<plist><integer>18446744073709551616</integer></plist>"),
            Err(DecodeError::Syntax { .. })
        ));
    }

    #[test]
    fn duplicate_keys_replace_in_place() {
        let dict = decode(b"<plist><dict><key>a</key><integer>1</integer><key>b</key><integer>2</integer><key>a</key><integer>3</integer></dict></plist>").unwrap();

        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(dict.get("a"), Some(&Value::Integer(3)));
    }

    #[test]
    fn root_must_be_dictionary() {
        assert!(matches!(
            decode(b"<plist><array/></plist>"),
            Err(DecodeError::RootNotDictionary("array"))
        ));
    }

    #[test]
    fn root_element_must_be_plist() {
        let err = decode(b"<dict><key>a</key><true/></dict>").unwrap_err();

        assert_eq!(syntax_position(err).map(|p| p.line), Some(1));
    }

    #[test]
    fn malformed_xml_reports_position() {
        let err = decode(b"<plist>\n<dict>\n<key>a</key>\n<string>b</dict>\n</plist>").unwrap_err();
        assert_eq!(syntax_position(err).map(|p| p.line), Some(4));

        assert!(matches!(decode(b""), Err(DecodeError::Syntax { .. })));
        assert!(matches!(
            decode(b"<plist><dict>"),
            Err(DecodeError::Syntax { .. })
        ));
    }

    #[test]
    fn nesting_depth_is_limited() {
        let nested = |depth: usize| {
            format!(
                "<plist><dict><key>a</key>\n{}{}</dict></plist>",
                "<array>".repeat(depth),
                "</array>".repeat(depth)
            )
        };

        // <plist> and <dict> take two levels.
        assert!(decode(nested(MAX_NESTING_DEPTH - 2).as_bytes()).is_ok());

        let err = decode(nested(20_000).as_bytes()).unwrap_err();
        assert_eq!(syntax_position(err).map(|p| p.line), Some(2));

        let err = decode(nested(MAX_NESTING_DEPTH - 1).as_bytes()).unwrap_err();
        assert!(err.to_string().contains("nested deeper than 256"), "{}", err);
    }

    #[test]
    fn dialect_errors() {
        for doc in [
            &b"<plist><dict><key>a</key></dict></plist>"[..],
            &b"<plist><dict><string>a</string><true/></dict></plist>"[..],
            &b"<plist><dict><key>a</key><key>b</key></dict></plist>"[..],
            &b"<plist><dict><key>a</key><integer>nope</integer></dict></plist>"[..],
            &b"<plist><dict><key>a</key><date>yesterday</date></dict></plist>"[..],
            &b"<plist><dict><key>a</key><data>!!!</data></dict></plist>"[..],
            &b"<plist><dict><key>a</key><uid>1</uid></dict></plist>"[..],
            &b"<plist><dict/><dict/></plist>"[..],
            &b"<plist><dict>text</dict></plist>"[..],
        ] {
            assert!(
                matches!(decode(doc), Err(DecodeError::Syntax { .. })),
                "{}",
                String::from_utf8_lossy(doc)
            );
        }
    }

    #[test]
    fn converts_to_plist_values() {
        let dict = decode(PROFILE_PLIST).unwrap();
        let value = plist::Value::Dictionary(plist::Dictionary::from(&dict));

        assert_eq!(Value::try_from(value).unwrap(), Value::Dictionary(dict));
    }

    #[test]
    fn dictionary_operations() {
        let mut dict = [("a", Value::Integer(1)), ("b", Value::from(true))]
            .into_iter()
            .collect::<Dictionary>();

        assert_eq!(dict.insert("a", Value::from("x")), Some(Value::Integer(1)));
        assert_eq!(dict.insert("c", Value::Integer(2)), None);
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(dict.remove("b"), Some(Value::Boolean(true)));
        assert!(!dict.contains_key("b"));
        assert_eq!(dict.len(), 2);
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Rendering provisioning profiles as text.

Three formats are supported: a human readable listing, an XML document and
an XML plist. All of them are produced by a single [Emitter] whose behavior
is parameterized by [OutputFormat]:

* Text is written line by line. Control characters in values are escaped so
  every value stays on its own line.
* XML is written through the `xml-rs` event writer. Every value, text or
  attribute, is escaped with [escape_str_attribute], quotes included.
* Plists are assembled as a `plist::Value` and serialized by the `plist`
  crate once complete.

Rendering never fails: it operates on an already validated
[ProvisioningProfile] and writes to memory.
*/

use {
    crate::{
        certificate::DeveloperCertificate,
        error::UnknownFormatError,
        profile::{ProfileField, ProvisioningProfile},
        property_list::{Dictionary, Value},
    },
    std::{
        borrow::Cow,
        fmt::{Display, Formatter},
        io::Cursor,
        str::FromStr,
        string::FromUtf8Error,
    },
    thiserror::Error,
    xml::{
        common::XmlVersion,
        escape::escape_str_attribute,
        writer::{EmitterConfig, Error as EmitterError, EventWriter, XmlEvent},
    },
};

/// Name of the generating tool written into output headers.
pub const GENERATOR_NAME: &str = "mobileprovision-extract";

/// Plist key holding the derived certificate names in plist output.
pub const CERTIFICATE_NAMES_KEY: &str = "DeveloperCertificateNames";

/// Supported output formats.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum OutputFormat {
    Text,
    Xml,
    Plist,
}

impl OutputFormat {
    pub fn all() -> &'static [Self] {
        &[Self::Text, Self::Xml, Self::Plist]
    }

    /// File extension to use when persisting output of this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Xml => "xml",
            Self::Plist => "plist",
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Text
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = UnknownFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(Self::Text),
            "xml" => Ok(Self::Xml),
            "plist" => Ok(Self::Plist),
            _ => Err(UnknownFormatError(s.to_string())),
        }
    }
}

/// Errors from the underlying writers.
///
/// Writers only fail on I/O, which can't happen for in-memory output.
#[derive(Debug, Error)]
enum RenderError {
    #[error("XML serialization error: {0}")]
    Xml(#[from] EmitterError),

    #[error("plist serialization error: {0}")]
    Plist(#[from] plist::Error),

    #[error("{0}")]
    Utf8(#[from] FromUtf8Error),
}

/// Render a profile in the given format.
///
/// `original_path` is recorded in the header. `tool_version` is recorded
/// when known and omitted entirely otherwise.
pub fn render(
    profile: &ProvisioningProfile,
    format: OutputFormat,
    original_path: &str,
    tool_version: Option<&str>,
) -> String {
    emit_document(profile, format, original_path, tool_version)
        .expect("rendering a profile to memory should not fail")
}

fn emit_document(
    profile: &ProvisioningProfile,
    format: OutputFormat,
    original_path: &str,
    tool_version: Option<&str>,
) -> Result<String, RenderError> {
    let mut emitter = Emitter::new(format);

    emitter.begin_document()?;

    emitter.begin_section(Section::Header)?;
    let header = [
        (HeaderItem::Generator, Some(GENERATOR_NAME)),
        (HeaderItem::Version, tool_version),
        (HeaderItem::OriginalFile, Some(original_path)),
    ];
    for (item, value) in header {
        if let Some(value) = value {
            let name = emitter.header_name(item);
            emitter.scalar(name, &value.into())?;
        }
    }
    emitter.end_section(Section::Header)?;

    emitter.begin_section(Section::Profile)?;
    for field in ProfileField::all() {
        emitter.field(profile, *field)?;
    }
    emitter.end_section(Section::Profile)?;

    emitter.end_document()?;

    emitter.finish()
}

#[derive(Clone, Copy)]
enum Section {
    Header,
    Profile,
}

impl Section {
    fn xml_element(&self) -> &'static str {
        match self {
            Self::Header => "head",
            Self::Profile => "profile",
        }
    }

    fn plist_key(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Profile => "profile",
        }
    }
}

#[derive(Clone, Copy)]
enum HeaderItem {
    Generator,
    Version,
    OriginalFile,
}

/// Text format label for a field.
fn text_label(field: ProfileField) -> &'static str {
    match field {
        ProfileField::AppIdName => "AppIDName",
        ProfileField::ApplicationIdentifierPrefixes => "ApplicationIdentifierPrefixes",
        ProfileField::CreationDate => "CreationDate",
        ProfileField::Platforms => "Platforms",
        ProfileField::DeveloperCertificates => "DeveloperCertificates",
        ProfileField::Entitlements => "Entitlements",
        ProfileField::ExpirationDate => "ExpirationDate",
        ProfileField::Name => "Name",
        ProfileField::ProvisionedDevices => "ProvisionedDevices",
        ProfileField::TeamIdentifiers => "TeamIdentifiers",
        ProfileField::TeamName => "TeamName",
        ProfileField::TimeToLive => "TimeToLive",
        ProfileField::Uuid => "UUID",
        ProfileField::Version => "Version",
    }
}

/// XML format element name for a field.
fn xml_element(field: ProfileField) -> &'static str {
    match field {
        ProfileField::AppIdName => "appIdName",
        ProfileField::ApplicationIdentifierPrefixes => "applicationIdentifierPrefixes",
        ProfileField::CreationDate => "creationDate",
        ProfileField::Platforms => "platforms",
        ProfileField::DeveloperCertificates => "developerCertificates",
        ProfileField::Entitlements => "entitlements",
        ProfileField::ExpirationDate => "expirationDate",
        ProfileField::Name => "name",
        ProfileField::ProvisionedDevices => "provisionedDevices",
        ProfileField::TeamIdentifiers => "teamIdentifiers",
        ProfileField::TeamName => "teamName",
        ProfileField::TimeToLive => "timeToLive",
        ProfileField::Uuid => "uuid",
        ProfileField::Version => "version",
    }
}

/// XML format element name for members of list fields.
fn xml_item(field: ProfileField) -> &'static str {
    match field {
        ProfileField::ApplicationIdentifierPrefixes => "prefix",
        ProfileField::Platforms => "platform",
        ProfileField::DeveloperCertificates => "certificate",
        ProfileField::Entitlements => "entitlement",
        ProfileField::ProvisionedDevices => "device",
        ProfileField::TeamIdentifiers => "teamIdentifier",
        _ => "item",
    }
}

/// Single line representation of a scalar value.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::Boolean(v) => v.to_string(),
        Value::Integer(v) => v.to_string(),
        Value::UnsignedInteger(v) => v.to_string(),
        Value::Real(v) => v.to_string(),
        Value::String(s) => s.clone(),
        Value::Date(dt) => dt.to_rfc3339(),
        Value::Data(data) => hex::encode(data),
        Value::Array(_) | Value::Dictionary(_) => flatten(value, true),
    }
}

/// Single line representation of any value, used by the text format.
fn flatten(value: &Value, nested: bool) -> String {
    match value {
        Value::String(s) if nested => format!("\"{}\"", s),
        Value::Data(data) => format!("<{}>", hex::encode(data)),
        Value::Array(values) => format!(
            "[{}]",
            values
                .iter()
                .map(|v| flatten(v, true))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Value::Dictionary(dict) => format!(
            "{{{}}}",
            dict.iter()
                .map(|(k, v)| format!("{} = {}", k, flatten(v, true)))
                .collect::<Vec<_>>()
                .join("; ")
        ),
        value => scalar_text(value),
    }
}

/// Escape control characters so text output can't gain extra lines.
fn escape_text(s: &str) -> Cow<'_, str> {
    if !s.chars().any(char::is_control) {
        return Cow::Borrowed(s);
    }

    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_control() {
            escaped.extend(c.escape_default());
        } else {
            escaped.push(c);
        }
    }

    Cow::Owned(escaped)
}

fn text_line(out: &mut String, content: &str) {
    out.push_str(&escape_text(content));
    out.push('\n');
}

fn write_text_element(
    writer: &mut EventWriter<Vec<u8>>,
    name: &str,
    text: &str,
) -> Result<(), EmitterError> {
    writer.write(XmlEvent::start_element(name))?;
    writer.write(XmlEvent::characters(&escape_str_attribute(text)))?;
    writer.write(XmlEvent::end_element())
}

/// Write an element describing a value, recursing into containers.
fn write_xml_value(
    writer: &mut EventWriter<Vec<u8>>,
    tag: &str,
    key: Option<&str>,
    value: &Value,
) -> Result<(), EmitterError> {
    let key = key.map(escape_str_attribute);

    let mut start = XmlEvent::start_element(tag);
    if let Some(key) = &key {
        start = start.attr("key", key);
    }
    writer.write(start.attr("type", value.type_name()))?;

    match value {
        Value::Array(values) => {
            for v in values {
                write_xml_value(writer, "item", None, v)?;
            }
        }
        Value::Dictionary(dict) => {
            for (k, v) in dict.iter() {
                write_xml_value(writer, "entry", Some(k), v)?;
            }
        }
        value => {
            let text = scalar_text(value);
            writer.write(XmlEvent::characters(&escape_str_attribute(&text)))?;
        }
    }

    writer.write(XmlEvent::end_element())
}

/// Destination of an [Emitter].
enum Sink {
    Text(String),
    Xml(EventWriter<Vec<u8>>),
    /// Plist documents are built up as values and serialized at the end.
    Plist {
        root: plist::Dictionary,
        section: plist::Dictionary,
    },
}

/// Writes a document of a given format.
struct Emitter {
    format: OutputFormat,
    sink: Sink,
}

impl Emitter {
    fn new(format: OutputFormat) -> Self {
        let sink = match format {
            OutputFormat::Text => Sink::Text(String::new()),
            OutputFormat::Xml => {
                let mut config = EmitterConfig::new().perform_indent(true).indent_string("\t");
                // Values are escaped before they reach the writer.
                config.perform_escaping = false;

                Sink::Xml(config.create_writer(vec![]))
            }
            OutputFormat::Plist => Sink::Plist {
                root: plist::Dictionary::new(),
                section: plist::Dictionary::new(),
            },
        };

        Self { format, sink }
    }

    fn field_name(&self, field: ProfileField) -> &'static str {
        match self.format {
            OutputFormat::Text => text_label(field),
            OutputFormat::Xml => xml_element(field),
            OutputFormat::Plist => field.plist_key(),
        }
    }

    fn header_name(&self, item: HeaderItem) -> &'static str {
        match (self.format, item) {
            (OutputFormat::Text, HeaderItem::Generator) => "Generator",
            (OutputFormat::Text, HeaderItem::Version) => "Version",
            (OutputFormat::Text, HeaderItem::OriginalFile) => "OriginalFile",
            (_, HeaderItem::Generator) => "generator",
            (_, HeaderItem::Version) => "version",
            (_, HeaderItem::OriginalFile) => "originalFile",
        }
    }

    fn begin_document(&mut self) -> Result<(), RenderError> {
        if let Sink::Xml(writer) = &mut self.sink {
            writer.write(XmlEvent::StartDocument {
                version: XmlVersion::Version10,
                encoding: Some("UTF-8"),
                standalone: None,
            })?;
            writer.write(XmlEvent::start_element("mobileProvision"))?;
        }

        Ok(())
    }

    fn end_document(&mut self) -> Result<(), RenderError> {
        if let Sink::Xml(writer) = &mut self.sink {
            writer.write(XmlEvent::end_element().name("mobileProvision"))?;
        }

        Ok(())
    }

    fn begin_section(&mut self, section: Section) -> Result<(), RenderError> {
        match (&mut self.sink, section) {
            (Sink::Text(_), Section::Header) => {}
            (Sink::Text(out), Section::Profile) => out.push('\n'),
            (Sink::Xml(writer), section) => {
                writer.write(XmlEvent::start_element(section.xml_element()))?
            }
            (Sink::Plist { section: values, .. }, _) => *values = plist::Dictionary::new(),
        }

        Ok(())
    }

    fn end_section(&mut self, section: Section) -> Result<(), RenderError> {
        match &mut self.sink {
            Sink::Text(_) => {}
            Sink::Xml(writer) => {
                writer.write(XmlEvent::end_element().name(section.xml_element()))?
            }
            Sink::Plist {
                root,
                section: values,
            } => {
                root.insert(
                    section.plist_key().to_string(),
                    plist::Value::Dictionary(std::mem::take(values)),
                );
            }
        }

        Ok(())
    }

    /// Serialize the finished document.
    fn finish(self) -> Result<String, RenderError> {
        match self.sink {
            Sink::Text(out) => Ok(out),
            Sink::Xml(writer) => {
                let mut buffer = writer.into_inner();
                buffer.push(b'\n');

                Ok(String::from_utf8(buffer)?)
            }
            Sink::Plist { root, .. } => {
                let mut buffer = vec![];
                plist::Value::Dictionary(root).to_writer_xml(Cursor::new(&mut buffer))?;
                buffer.push(b'\n');

                Ok(String::from_utf8(buffer)?)
            }
        }
    }

    fn field(
        &mut self,
        profile: &ProvisioningProfile,
        field: ProfileField,
    ) -> Result<(), RenderError> {
        let name = self.field_name(field);

        match field {
            ProfileField::AppIdName => self.scalar(name, &profile.app_id_name.as_str().into()),
            ProfileField::ApplicationIdentifierPrefixes => {
                self.strings(field, Some(profile.application_identifier_prefixes.as_slice()))
            }
            ProfileField::CreationDate => self.scalar(name, &Value::Date(profile.creation_date)),
            ProfileField::Platforms => self.strings(field, Some(profile.platforms.as_slice())),
            ProfileField::DeveloperCertificates => {
                self.certificates(field, &profile.developer_certificates)
            }
            ProfileField::Entitlements => self.entitlements(field, &profile.entitlements),
            ProfileField::ExpirationDate => {
                self.scalar(name, &Value::Date(profile.expiration_date))
            }
            ProfileField::Name => self.scalar(name, &profile.name.as_str().into()),
            ProfileField::ProvisionedDevices => {
                self.strings(field, profile.provisioned_devices.as_deref())
            }
            ProfileField::TeamIdentifiers => {
                self.strings(field, Some(profile.team_identifiers.as_slice()))
            }
            ProfileField::TeamName => self.scalar(name, &profile.team_name.as_str().into()),
            ProfileField::TimeToLive => self.scalar(name, &Value::Integer(profile.time_to_live)),
            ProfileField::Uuid => self.scalar(name, &profile.uuid.as_str().into()),
            ProfileField::Version => self.scalar(name, &Value::Integer(profile.version)),
        }
    }

    /// Emit a named scalar value.
    fn scalar(&mut self, name: &str, value: &Value) -> Result<(), RenderError> {
        match &mut self.sink {
            Sink::Text(out) => text_line(out, &format!("{}: {}", name, scalar_text(value))),
            Sink::Xml(writer) => write_text_element(writer, name, &scalar_text(value))?,
            Sink::Plist { section, .. } => {
                section.insert(name.to_string(), value.into());
            }
        }

        Ok(())
    }

    /// Emit a list of strings.
    ///
    /// `None` means the list doesn't exist, which is rendered distinctly
    /// from an empty list.
    fn strings(
        &mut self,
        field: ProfileField,
        items: Option<&[String]>,
    ) -> Result<(), RenderError> {
        let name = self.field_name(field);

        match (&mut self.sink, items) {
            (Sink::Text(out), None) => text_line(out, &format!("{}: None", name)),
            (Sink::Text(out), Some(items)) => {
                text_line(out, &format!("{}:", name));
                for item in items {
                    text_line(out, &format!("- {}", item));
                }
            }
            (Sink::Xml(writer), None) => {
                writer.write(XmlEvent::start_element(name).attr("present", "false"))?;
                writer.write(XmlEvent::end_element())?;
            }
            (Sink::Xml(writer), Some(items)) => {
                writer.write(XmlEvent::start_element(name))?;
                for item in items {
                    write_text_element(writer, xml_item(field), item)?;
                }
                writer.write(XmlEvent::end_element())?;
            }
            (Sink::Plist { .. }, None) => {}
            (Sink::Plist { section, .. }, Some(items)) => {
                section.insert(
                    name.to_string(),
                    plist::Value::Array(items.iter().cloned().map(plist::Value::String).collect()),
                );
            }
        }

        Ok(())
    }

    fn certificates(
        &mut self,
        field: ProfileField,
        certificates: &[DeveloperCertificate],
    ) -> Result<(), RenderError> {
        let names = certificates
            .iter()
            .map(|cert| cert.display_name().to_string())
            .collect::<Vec<_>>();

        if let Sink::Plist { section, .. } = &mut self.sink {
            section.insert(
                field.plist_key().to_string(),
                plist::Value::Array(
                    certificates
                        .iter()
                        .map(|cert| plist::Value::Data(cert.as_der().to_vec()))
                        .collect(),
                ),
            );
            section.insert(
                CERTIFICATE_NAMES_KEY.to_string(),
                plist::Value::Array(names.into_iter().map(plist::Value::String).collect()),
            );

            Ok(())
        } else {
            self.strings(field, Some(names.as_slice()))
        }
    }

    fn entitlements(
        &mut self,
        field: ProfileField,
        entitlements: &Dictionary,
    ) -> Result<(), RenderError> {
        let name = self.field_name(field);

        match &mut self.sink {
            Sink::Text(out) => {
                text_line(out, &format!("{}:", name));
                for (key, value) in entitlements.iter() {
                    text_line(out, &format!("- {} => {}", key, flatten(value, false)));
                }
            }
            Sink::Xml(writer) => {
                writer.write(XmlEvent::start_element(name))?;
                for (key, value) in entitlements.iter() {
                    write_xml_value(writer, xml_item(field), Some(key), value)?;
                }
                writer.write(XmlEvent::end_element())?;
            }
            Sink::Plist { section, .. } => {
                section.insert(name.to_string(), plist::Value::Dictionary(entitlements.into()));
            }
        }

        Ok(())
    }
}

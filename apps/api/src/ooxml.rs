//! Shared Open Packaging Convention plumbing for the PPTX and DOCX writers:
//! a zip-backed package writer, content-type/relationship builders and XML escaping.

use std::fmt::Write as FmtWrite;
use std::io::{Cursor, Write};

use thiserror::Error;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

pub const XML_DECLARATION: &str =
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

pub const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
pub const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const REL_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
pub const REL_THEME: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),
}

/// In-memory zip package. Parts are written in insertion order.
pub struct PackageWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
}

impl PackageWriter {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// Adds a deflated XML part.
    pub fn add_xml(&mut self, part_name: &str, xml: &str) -> Result<(), PackageError> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.zip.start_file(part_name, options)?;
        self.zip.write_all(xml.as_bytes())?;
        Ok(())
    }

    /// Adds a binary part without recompressing it (images are already compressed).
    pub fn add_binary(&mut self, part_name: &str, data: &[u8]) -> Result<(), PackageError> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        self.zip.start_file(part_name, options)?;
        self.zip.write_all(data)?;
        Ok(())
    }

    pub fn finish(self) -> Result<Vec<u8>, PackageError> {
        Ok(self.zip.finish()?.into_inner())
    }
}

impl Default for PackageWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `[Content_Types].xml`.
#[derive(Debug, Default)]
pub struct ContentTypes {
    defaults: Vec<(String, String)>,
    overrides: Vec<(String, String)>,
}

impl ContentTypes {
    pub fn new() -> Self {
        let mut types = Self::default();
        types.add_default(
            "rels",
            "application/vnd.openxmlformats-package.relationships+xml",
        );
        types.add_default("xml", "application/xml");
        types
    }

    pub fn add_default(&mut self, extension: &str, content_type: &str) {
        if !self.defaults.iter().any(|(ext, _)| ext == extension) {
            self.defaults
                .push((extension.to_string(), content_type.to_string()));
        }
    }

    /// `part_name` is the absolute part name, e.g. `/ppt/presentation.xml`.
    pub fn add_override(&mut self, part_name: &str, content_type: &str) {
        self.overrides
            .push((part_name.to_string(), content_type.to_string()));
    }

    pub fn to_xml(&self) -> Result<String, PackageError> {
        let mut xml = String::with_capacity(1024);
        xml.push_str(XML_DECLARATION);
        write!(xml, r#"<Types xmlns="{NS_CONTENT_TYPES}">"#)?;
        for (extension, content_type) in &self.defaults {
            write!(
                xml,
                r#"<Default Extension="{extension}" ContentType="{content_type}"/>"#
            )?;
        }
        for (part_name, content_type) in &self.overrides {
            write!(
                xml,
                r#"<Override PartName="{part_name}" ContentType="{content_type}"/>"#
            )?;
        }
        xml.push_str("</Types>");
        Ok(xml)
    }
}

/// Builder for a `.rels` part. Relationship ids are assigned sequentially (`rId1`, `rId2`, ...).
#[derive(Debug, Default)]
pub struct Relationships {
    entries: Vec<(String, String)>,
}

impl Relationships {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a relationship and returns its id.
    pub fn add(&mut self, rel_type: &str, target: &str) -> String {
        self.entries.push((rel_type.to_string(), target.to_string()));
        format!("rId{}", self.entries.len())
    }

    pub fn to_xml(&self) -> Result<String, PackageError> {
        let mut xml = String::with_capacity(512);
        xml.push_str(XML_DECLARATION);
        write!(xml, r#"<Relationships xmlns="{NS_RELATIONSHIPS}">"#)?;
        for (index, (rel_type, target)) in self.entries.iter().enumerate() {
            write!(
                xml,
                r#"<Relationship Id="rId{}" Type="{}" Target="{}"/>"#,
                index + 1,
                rel_type,
                escape_xml(target)
            )?;
        }
        xml.push_str("</Relationships>");
        Ok(xml)
    }
}

/// Escapes text for element content and attribute values, dropping characters XML 1.0 forbids.
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\t' | '\n' | '\r' => escaped.push(c),
            c if (c as u32) < 0x20 => {}
            '\u{FFFE}' | '\u{FFFF}' => {}
            c => escaped.push(c),
        }
    }
    escaped
}

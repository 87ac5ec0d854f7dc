//! WordprocessingML writer for the DOCX export: a heading per slide, slide body as
//! paragraphs, notes as quotes and a page break after every slide.

use std::fmt::Write as FmtWrite;

use crate::models::presentation::{Presentation, SlideKind, SlideRecord};
use crate::models::template::StyleSpec;
use crate::ooxml::{
    escape_xml, ContentTypes, PackageError, PackageWriter, Relationships, REL_OFFICE_DOCUMENT,
    XML_DECLARATION,
};

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const CT_DOCUMENT: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
const CT_STYLES: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
const CT_NUMBERING: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml";
const REL_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_NUMBERING: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";

/// Paragraph styles defined in `styles.xml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphStyle {
    Normal,
    Title,
    Heading1,
    ListBullet,
    Quote,
    IntenseQuote,
}

impl ParagraphStyle {
    fn id(&self) -> &'static str {
        match self {
            ParagraphStyle::Normal => "Normal",
            ParagraphStyle::Title => "Title",
            ParagraphStyle::Heading1 => "Heading1",
            ParagraphStyle::ListBullet => "ListBullet",
            ParagraphStyle::Quote => "Quote",
            ParagraphStyle::IntenseQuote => "IntenseQuote",
        }
    }
}

/// Accumulates `w:body` content.
#[derive(Debug, Default)]
pub struct DocxWriter {
    body: String,
}

impl DocxWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heading(&mut self, text: &str, level: u8) -> Result<(), PackageError> {
        let style = if level == 0 {
            ParagraphStyle::Title
        } else {
            ParagraphStyle::Heading1
        };
        self.paragraph(text, style, false)
    }

    /// Writes one paragraph; embedded newlines become line breaks.
    pub fn paragraph(
        &mut self,
        text: &str,
        style: ParagraphStyle,
        bold: bool,
    ) -> Result<(), PackageError> {
        self.body.push_str("<w:p>");
        if style != ParagraphStyle::Normal {
            write!(self.body, r#"<w:pPr><w:pStyle w:val="{}"/></w:pPr>"#, style.id())?;
        }
        self.body.push_str("<w:r>");
        if bold {
            self.body.push_str("<w:rPr><w:b/></w:rPr>");
        }
        for (index, line) in text.lines().enumerate() {
            if index > 0 {
                self.body.push_str("<w:br/>");
            }
            write!(
                self.body,
                r#"<w:t xml:space="preserve">{}</w:t>"#,
                escape_xml(line)
            )?;
        }
        self.body.push_str("</w:r></w:p>");
        Ok(())
    }

    pub fn page_break(&mut self) {
        self.body
            .push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
    }

    /// Packages the body with styles and numbering into `.docx` bytes.
    pub fn finish(self, style: &StyleSpec) -> Result<Vec<u8>, PackageError> {
        let mut content_types = ContentTypes::new();
        content_types.add_override("/word/document.xml", CT_DOCUMENT);
        content_types.add_override("/word/styles.xml", CT_STYLES);
        content_types.add_override("/word/numbering.xml", CT_NUMBERING);

        let mut root_rels = Relationships::new();
        root_rels.add(REL_OFFICE_DOCUMENT, "word/document.xml");

        let mut document_rels = Relationships::new();
        document_rels.add(REL_STYLES, "styles.xml");
        document_rels.add(REL_NUMBERING, "numbering.xml");

        let mut document = String::with_capacity(self.body.len() + 512);
        document.push_str(XML_DECLARATION);
        write!(document, r#"<w:document xmlns:w="{NS_W}"><w:body>"#)?;
        document.push_str(&self.body);
        // US Letter, 1" margins
        document.push_str(r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr>"#);
        document.push_str("</w:body></w:document>");

        let mut package = PackageWriter::new();
        package.add_xml("[Content_Types].xml", &content_types.to_xml()?)?;
        package.add_xml("_rels/.rels", &root_rels.to_xml()?)?;
        package.add_xml("word/document.xml", &document)?;
        package.add_xml("word/_rels/document.xml.rels", &document_rels.to_xml()?)?;
        package.add_xml("word/styles.xml", &styles_xml(style)?)?;
        package.add_xml("word/numbering.xml", &numbering_xml())?;
        package.finish()
    }
}

/// Writes the Word export of a presentation record.
pub fn render_docx(presentation: &Presentation, style: &StyleSpec) -> Result<Vec<u8>, PackageError> {
    let mut writer = DocxWriter::new();

    if let Some(title) = &presentation.title {
        writer.heading(title, 0)?;
    }
    if let Some(description) = &presentation.description {
        writer.paragraph(description, ParagraphStyle::Normal, false)?;
    }

    for slide in &presentation.slides {
        // the deck title is already at the top
        if slide.is_kind(&SlideKind::Title) && slide.title.is_some() && slide.title == presentation.title {
            continue;
        }
        write_slide(&mut writer, slide)?;
        writer.page_break();
    }

    writer.finish(style)
}

fn write_slide(writer: &mut DocxWriter, slide: &SlideRecord) -> Result<(), PackageError> {
    if let Some(title) = &slide.title {
        writer.heading(title, 1)?;
    }

    if slide.is_kind(&SlideKind::Quote) {
        if let Some(quote) = &slide.quote {
            writer.paragraph(&format!("\"{quote}\""), ParagraphStyle::IntenseQuote, false)?;
            if let Some(author) = &slide.author {
                writer.paragraph(&format!("— {author}"), ParagraphStyle::Normal, false)?;
            }
        }
    } else if let Some(bullets) = &slide.bullets {
        for bullet in bullets {
            writer.paragraph(bullet, ParagraphStyle::ListBullet, false)?;
        }
    } else if let Some(content) = &slide.content {
        writer.paragraph(content, ParagraphStyle::Normal, false)?;
    } else if slide.left_content.is_some() || slide.right_content.is_some() {
        for (label, text) in [
            ("Left Column:", &slide.left_content),
            ("Right Column:", &slide.right_content),
        ] {
            if let Some(text) = text {
                writer.paragraph(label, ParagraphStyle::Normal, true)?;
                writer.paragraph(text, ParagraphStyle::Normal, false)?;
            }
        }
    }

    if let Some(notes) = &slide.notes {
        writer.paragraph(notes, ParagraphStyle::Quote, false)?;
    }
    Ok(())
}

fn styles_xml(style: &StyleSpec) -> Result<String, PackageError> {
    let title_font = escape_xml(&style.title_font);
    let body_font = escape_xml(&style.body_font);
    let title_color = style.title_color.hex();
    let accent = style.accent.hex();

    let mut xml = String::with_capacity(4096);
    xml.push_str(XML_DECLARATION);
    write!(xml, r#"<w:styles xmlns:w="{NS_W}">"#)?;
    write!(
        xml,
        r#"<w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="{body_font}" w:hAnsi="{body_font}" w:cs="{body_font}"/><w:sz w:val="22"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="160" w:line="259" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults>"#
    )?;
    xml.push_str(r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style>"#);
    write!(
        xml,
        r#"<w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:spacing w:after="240"/></w:pPr><w:rPr><w:rFonts w:ascii="{title_font}" w:hAnsi="{title_font}"/><w:b/><w:color w:val="{title_color}"/><w:sz w:val="56"/></w:rPr></w:style>"#
    )?;
    write!(
        xml,
        r#"<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="240" w:after="120"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:rFonts w:ascii="{title_font}" w:hAnsi="{title_font}"/><w:b/><w:color w:val="{title_color}"/><w:sz w:val="32"/></w:rPr></w:style>"#
    )?;
    xml.push_str(r#"<w:style w:type="paragraph" w:styleId="ListBullet"><w:name w:val="List Bullet"/><w:basedOn w:val="Normal"/><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr><w:ind w:left="360" w:hanging="360"/></w:pPr></w:style>"#);
    xml.push_str(r#"<w:style w:type="paragraph" w:styleId="Quote"><w:name w:val="Quote"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:ind w:left="864" w:right="864"/><w:jc w:val="center"/></w:pPr><w:rPr><w:i/><w:color w:val="404040"/></w:rPr></w:style>"#);
    write!(
        xml,
        r#"<w:style w:type="paragraph" w:styleId="IntenseQuote"><w:name w:val="Intense Quote"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:pBdr><w:top w:val="single" w:sz="4" w:space="10" w:color="{accent}"/><w:bottom w:val="single" w:sz="4" w:space="10" w:color="{accent}"/></w:pBdr><w:spacing w:before="360" w:after="360"/><w:ind w:left="864" w:right="864"/><w:jc w:val="center"/></w:pPr><w:rPr><w:i/><w:color w:val="{accent}"/></w:rPr></w:style>"#
    )?;
    xml.push_str("</w:styles>");
    Ok(xml)
}

fn numbering_xml() -> String {
    format!(
        r#"{XML_DECLARATION}<w:numbering xmlns:w="{NS_W}"><w:abstractNum w:abstractNumId="0"><w:multiLevelType w:val="hybridMultilevel"/><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="bullet"/><w:lvlText w:val="&#8226;"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="360" w:hanging="360"/></w:pPr><w:rPr><w:rFonts w:ascii="Symbol" w:hAnsi="Symbol" w:hint="default"/></w:rPr></w:lvl></w:abstractNum><w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num></w:numbering>"#
    )
}

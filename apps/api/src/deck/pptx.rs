//! PresentationML writer: an in-memory deck model and its serialisation to a `.pptx` package.
//!
//! Every slide carries explicit geometry and run formatting, so the output renders the
//! same in PowerPoint, Keynote and LibreOffice without relying on master inheritance.

use std::fmt::Write as FmtWrite;

use bytes::Bytes;

use crate::deck::placement::{Frame, SLIDE_HEIGHT_IN, SLIDE_WIDTH_IN};
use crate::deck::DeckError;
use crate::models::template::{RgbColor, StyleSpec};
use crate::ooxml::{
    escape_xml, ContentTypes, PackageError, PackageWriter, Relationships, REL_IMAGE,
    REL_OFFICE_DOCUMENT, REL_THEME, XML_DECLARATION,
};

/// English Metric Units per inch.
pub const EMU_PER_INCH: f64 = 914_400.0;

const NS_DECLS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const CT_PRESENTATION: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
const CT_SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
const CT_SLIDE_LAYOUT: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";
const CT_SLIDE_MASTER: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";
const CT_THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";
const CT_PRES_PROPS: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presProps+xml";
const CT_VIEW_PROPS: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.viewProps+xml";
const CT_TABLE_STYLES: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.tableStyles+xml";

const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_SLIDE_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_PRES_PROPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/presProps";
const REL_VIEW_PROPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/viewProps";
const REL_TABLE_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/tableStyles";

/// Converts inches to EMUs.
pub fn emu(inches: f64) -> i64 {
    (inches * EMU_PER_INCH).round() as i64
}

/// Font size in hundredths of a point, as DrawingML `sz` expects.
fn centipoints(points: f32) -> u32 {
    (points * 100.0).round() as u32
}

/// Encoded picture formats the package can embed directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureFormat {
    Png,
    Jpeg,
}

impl PictureFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            PictureFormat::Png => "png",
            PictureFormat::Jpeg => "jpeg",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            PictureFormat::Png => "image/png",
            PictureFormat::Jpeg => "image/jpeg",
        }
    }
}

/// The two layouts every deck carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideLayout {
    Title,
    TitleAndContent,
}

impl SlideLayout {
    fn part_index(&self) -> usize {
        match self {
            SlideLayout::Title => 1,
            SlideLayout::TitleAndContent => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderRole {
    CenteredTitle,
    Subtitle,
    Title,
    Body,
}

impl PlaceholderRole {
    fn ph_element(&self) -> &'static str {
        match self {
            PlaceholderRole::CenteredTitle => r#"<p:ph type="ctrTitle"/>"#,
            PlaceholderRole::Subtitle => r#"<p:ph type="subTitle" idx="1"/>"#,
            PlaceholderRole::Title => r#"<p:ph type="title"/>"#,
            PlaceholderRole::Body => r#"<p:ph type="body" idx="1"/>"#,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            PlaceholderRole::CenteredTitle | PlaceholderRole::Title => "Title",
            PlaceholderRole::Subtitle => "Subtitle",
            PlaceholderRole::Body => "Content Placeholder",
        }
    }

    /// Default geometry on a 13.333" × 7.5" slide.
    pub fn frame(&self) -> Frame {
        match self {
            PlaceholderRole::CenteredTitle => Frame {
                left: 1.0,
                top: 2.0,
                width: SLIDE_WIDTH_IN - 2.0,
                height: 1.8,
            },
            PlaceholderRole::Subtitle => Frame {
                left: 1.5,
                top: 4.0,
                width: SLIDE_WIDTH_IN - 3.0,
                height: 1.4,
            },
            PlaceholderRole::Title => Frame {
                left: 0.6,
                top: 0.4,
                width: SLIDE_WIDTH_IN - 1.2,
                height: 1.2,
            },
            PlaceholderRole::Body => Frame {
                left: 0.6,
                top: 1.8,
                width: SLIDE_WIDTH_IN - 1.2,
                height: SLIDE_HEIGHT_IN - 2.4,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
}

/// Character formatting for every run in a paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct RunFormat {
    pub font: String,
    pub size_pt: f32,
    pub color: RgbColor,
    pub bold: bool,
    pub italic: bool,
}

impl RunFormat {
    pub fn title(style: &StyleSpec) -> Self {
        RunFormat {
            font: style.title_font.clone(),
            size_pt: style.title_size_pt,
            color: style.title_color,
            bold: style.title_bold,
            italic: false,
        }
    }

    pub fn body(style: &StyleSpec) -> Self {
        RunFormat {
            font: style.body_font.clone(),
            size_pt: style.body_size_pt,
            color: style.body_color,
            bold: style.body_bold,
            italic: false,
        }
    }

    pub fn subtitle(style: &StyleSpec) -> Self {
        RunFormat {
            color: style.subtitle_color,
            ..RunFormat::body(style)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub text: String,
    pub level: u8,
    pub bullet: bool,
    pub alignment: Alignment,
    pub format: RunFormat,
}

impl Paragraph {
    pub fn plain(text: impl Into<String>, format: RunFormat) -> Self {
        Paragraph {
            text: text.into(),
            level: 0,
            bullet: false,
            alignment: Alignment::Left,
            format,
        }
    }

    pub fn bullet(text: impl Into<String>, level: u8, format: RunFormat) -> Self {
        Paragraph {
            bullet: true,
            level,
            ..Paragraph::plain(text, format)
        }
    }

    pub fn at_level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    pub fn centered(mut self) -> Self {
        self.alignment = Alignment::Center;
        self
    }
}

/// An embedded picture, already encoded as PNG or JPEG.
#[derive(Debug, Clone, PartialEq)]
pub struct Picture {
    pub data: Bytes,
    pub format: PictureFormat,
    pub frame: Frame,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Placeholder {
        role: PlaceholderRole,
        paragraphs: Vec<Paragraph>,
    },
    Picture(Picture),
}

/// One slide: layout, optional solid background and shapes in z-order (first is back-most).
#[derive(Debug, Clone, PartialEq)]
pub struct DeckSlide {
    pub layout: SlideLayout,
    pub background: Option<RgbColor>,
    pub shapes: Vec<Shape>,
}

impl DeckSlide {
    pub fn new(layout: SlideLayout) -> Self {
        Self {
            layout,
            background: None,
            shapes: Vec::new(),
        }
    }

    pub fn add_placeholder(&mut self, role: PlaceholderRole, paragraphs: Vec<Paragraph>) {
        self.shapes.push(Shape::Placeholder { role, paragraphs });
    }

    /// Adds a picture on top of existing shapes.
    pub fn add_picture(&mut self, picture: Picture) {
        self.shapes.push(Shape::Picture(picture));
    }

    /// Adds a picture behind every existing shape (used for background images).
    pub fn add_picture_behind(&mut self, picture: Picture) {
        self.shapes.insert(0, Shape::Picture(picture));
    }

    pub fn pictures(&self) -> impl Iterator<Item = &Picture> {
        self.shapes.iter().filter_map(|s| match s {
            Shape::Picture(p) => Some(p),
            Shape::Placeholder { .. } => None,
        })
    }

    /// Concatenated text of the placeholder with the given role, one line per paragraph.
    pub fn placeholder_text(&self, role: PlaceholderRole) -> Option<String> {
        self.shapes.iter().find_map(|s| match s {
            Shape::Placeholder { role: r, paragraphs } if *r == role => Some(
                paragraphs
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            _ => None,
        })
    }
}

/// A whole presentation, themed with one style.
#[derive(Debug, Clone)]
pub struct Deck {
    pub style: StyleSpec,
    pub slides: Vec<DeckSlide>,
}

impl Deck {
    pub fn new(style: StyleSpec) -> Self {
        Self {
            style,
            slides: Vec::new(),
        }
    }

    /// Serialises the deck to `.pptx` bytes.
    pub fn to_pptx(&self) -> Result<Vec<u8>, DeckError> {
        let mut package = PackageWriter::new();
        let mut content_types = ContentTypes::new();

        let mut root_rels = Relationships::new();
        root_rels.add(REL_OFFICE_DOCUMENT, "ppt/presentation.xml");

        // presentation-level parts
        let mut pres_rels = Relationships::new();
        pres_rels.add(REL_SLIDE_MASTER, "slideMasters/slideMaster1.xml");
        pres_rels.add(REL_THEME, "theme/theme1.xml");
        pres_rels.add(REL_PRES_PROPS, "presProps.xml");
        pres_rels.add(REL_VIEW_PROPS, "viewProps.xml");
        pres_rels.add(REL_TABLE_STYLES, "tableStyles.xml");
        let slide_rel_ids: Vec<String> = (1..=self.slides.len())
            .map(|n| pres_rels.add(REL_SLIDE, &format!("slides/slide{n}.xml")))
            .collect();

        content_types.add_override("/ppt/presentation.xml", CT_PRESENTATION);
        content_types.add_override("/ppt/slideMasters/slideMaster1.xml", CT_SLIDE_MASTER);
        content_types.add_override("/ppt/slideLayouts/slideLayout1.xml", CT_SLIDE_LAYOUT);
        content_types.add_override("/ppt/slideLayouts/slideLayout2.xml", CT_SLIDE_LAYOUT);
        content_types.add_override("/ppt/theme/theme1.xml", CT_THEME);
        content_types.add_override("/ppt/presProps.xml", CT_PRES_PROPS);
        content_types.add_override("/ppt/viewProps.xml", CT_VIEW_PROPS);
        content_types.add_override("/ppt/tableStyles.xml", CT_TABLE_STYLES);

        // slides and their media
        let mut slide_parts = Vec::with_capacity(self.slides.len());
        let mut media_parts: Vec<(String, &Bytes)> = Vec::new();
        for (index, slide) in self.slides.iter().enumerate() {
            let number = index + 1;
            let mut rels = Relationships::new();
            rels.add(
                REL_SLIDE_LAYOUT,
                &format!("../slideLayouts/slideLayout{}.xml", slide.layout.part_index()),
            );

            let mut picture_rel_ids = Vec::new();
            for picture in slide.pictures() {
                let media_name = format!(
                    "image{}.{}",
                    media_parts.len() + 1,
                    picture.format.extension()
                );
                content_types.add_default(picture.format.extension(), picture.format.content_type());
                picture_rel_ids.push(rels.add(REL_IMAGE, &format!("../media/{media_name}")));
                media_parts.push((format!("ppt/media/{media_name}"), &picture.data));
            }

            content_types.add_override(&format!("/ppt/slides/slide{number}.xml"), CT_SLIDE);
            slide_parts.push((
                number,
                slide_xml(number, slide, &picture_rel_ids)?,
                rels.to_xml()?,
            ));
        }

        package.add_xml("[Content_Types].xml", &content_types.to_xml()?)?;
        package.add_xml("_rels/.rels", &root_rels.to_xml()?)?;
        package.add_xml(
            "ppt/presentation.xml",
            &presentation_xml(&slide_rel_ids)?,
        )?;
        package.add_xml("ppt/_rels/presentation.xml.rels", &pres_rels.to_xml()?)?;
        package.add_xml("ppt/presProps.xml", &pres_props_xml())?;
        package.add_xml("ppt/viewProps.xml", &view_props_xml())?;
        package.add_xml("ppt/tableStyles.xml", TABLE_STYLES_XML)?;

        package.add_xml(
            "ppt/slideMasters/slideMaster1.xml",
            &slide_master_xml(&self.style)?,
        )?;
        let mut master_rels = Relationships::new();
        master_rels.add(REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout1.xml");
        master_rels.add(REL_SLIDE_LAYOUT, "../slideLayouts/slideLayout2.xml");
        master_rels.add(REL_THEME, "../theme/theme1.xml");
        package.add_xml(
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            &master_rels.to_xml()?,
        )?;

        for layout in [SlideLayout::Title, SlideLayout::TitleAndContent] {
            let index = layout.part_index();
            package.add_xml(
                &format!("ppt/slideLayouts/slideLayout{index}.xml"),
                &slide_layout_xml(layout)?,
            )?;
            let mut layout_rels = Relationships::new();
            layout_rels.add(REL_SLIDE_MASTER, "../slideMasters/slideMaster1.xml");
            package.add_xml(
                &format!("ppt/slideLayouts/_rels/slideLayout{index}.xml.rels"),
                &layout_rels.to_xml()?,
            )?;
        }

        package.add_xml("ppt/theme/theme1.xml", &theme_xml(&self.style)?)?;

        for (number, xml, rels) in &slide_parts {
            package.add_xml(&format!("ppt/slides/slide{number}.xml"), xml)?;
            package.add_xml(&format!("ppt/slides/_rels/slide{number}.xml.rels"), rels)?;
        }
        for (name, data) in media_parts {
            package.add_binary(&name, data)?;
        }

        Ok(package.finish()?)
    }
}

fn presentation_xml(slide_rel_ids: &[String]) -> Result<String, PackageError> {
    let mut xml = String::with_capacity(1024);
    xml.push_str(XML_DECLARATION);
    write!(xml, r#"<p:presentation {NS_DECLS} saveSubsetFonts="1">"#)?;
    xml.push_str(r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#);
    if !slide_rel_ids.is_empty() {
        xml.push_str("<p:sldIdLst>");
        for (index, rel_id) in slide_rel_ids.iter().enumerate() {
            write!(xml, r#"<p:sldId id="{}" r:id="{}"/>"#, 256 + index, rel_id)?;
        }
        xml.push_str("</p:sldIdLst>");
    }
    write!(
        xml,
        r#"<p:sldSz cx="{}" cy="{}"/>"#,
        emu(SLIDE_WIDTH_IN),
        emu(SLIDE_HEIGHT_IN)
    )?;
    xml.push_str(r#"<p:notesSz cx="6858000" cy="9144000"/>"#);
    xml.push_str("</p:presentation>");
    Ok(xml)
}

fn pres_props_xml() -> String {
    format!("{XML_DECLARATION}<p:presentationPr {NS_DECLS}/>")
}

fn view_props_xml() -> String {
    format!(
        r#"{XML_DECLARATION}<p:viewPr {NS_DECLS}><p:gridSpacing cx="76200" cy="76200"/></p:viewPr>"#
    )
}

const TABLE_STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><a:tblStyleLst xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" def="{5C22544A-7EE6-4342-B048-85BDC9FD1C3A}"/>"#;

const GROUP_SHAPE_PROPS: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#;

fn write_xfrm(xml: &mut String, frame: &Frame) -> Result<(), PackageError> {
    write!(
        xml,
        r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        emu(frame.left),
        emu(frame.top),
        emu(frame.width),
        emu(frame.height)
    )?;
    Ok(())
}

fn write_background(xml: &mut String, color: RgbColor) -> Result<(), PackageError> {
    write!(
        xml,
        r#"<p:bg><p:bgPr><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:effectLst/></p:bgPr></p:bg>"#,
        color.hex()
    )?;
    Ok(())
}

/// Writes an empty placeholder as it appears on masters and layouts.
fn write_layout_placeholder(
    xml: &mut String,
    shape_id: u32,
    role: PlaceholderRole,
) -> Result<(), PackageError> {
    write!(
        xml,
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{} {}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr>{}</p:nvPr></p:nvSpPr><p:spPr>"#,
        shape_id,
        role.name(),
        shape_id,
        role.ph_element()
    )?;
    write_xfrm(xml, &role.frame())?;
    xml.push_str(r#"</p:spPr><p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:endParaRPr lang="en-US"/></a:p></p:txBody></p:sp>"#);
    Ok(())
}

fn slide_master_xml(style: &StyleSpec) -> Result<String, PackageError> {
    let mut xml = String::with_capacity(2048);
    xml.push_str(XML_DECLARATION);
    write!(xml, "<p:sldMaster {NS_DECLS}><p:cSld>")?;
    write_background(&mut xml, style.background)?;
    xml.push_str("<p:spTree>");
    xml.push_str(GROUP_SHAPE_PROPS);
    write_layout_placeholder(&mut xml, 2, PlaceholderRole::Title)?;
    write_layout_placeholder(&mut xml, 3, PlaceholderRole::Body)?;
    xml.push_str("</p:spTree></p:cSld>");
    xml.push_str(r#"<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>"#);
    xml.push_str(r#"<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/><p:sldLayoutId id="2147483650" r:id="rId2"/></p:sldLayoutIdLst>"#);
    xml.push_str("</p:sldMaster>");
    Ok(xml)
}

fn slide_layout_xml(layout: SlideLayout) -> Result<String, PackageError> {
    let (layout_type, name, roles) = match layout {
        SlideLayout::Title => (
            "title",
            "Title Slide",
            [PlaceholderRole::CenteredTitle, PlaceholderRole::Subtitle],
        ),
        SlideLayout::TitleAndContent => (
            "obj",
            "Title and Content",
            [PlaceholderRole::Title, PlaceholderRole::Body],
        ),
    };

    let mut xml = String::with_capacity(1024);
    xml.push_str(XML_DECLARATION);
    write!(
        xml,
        r#"<p:sldLayout {NS_DECLS} type="{layout_type}" preserve="1"><p:cSld name="{name}"><p:spTree>"#
    )?;
    xml.push_str(GROUP_SHAPE_PROPS);
    for (offset, role) in roles.into_iter().enumerate() {
        write_layout_placeholder(&mut xml, offset as u32 + 2, role)?;
    }
    xml.push_str("</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>");
    Ok(xml)
}

fn theme_xml(style: &StyleSpec) -> Result<String, PackageError> {
    let mut xml = String::with_capacity(4096);
    xml.push_str(XML_DECLARATION);
    xml.push_str(r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Slideflow"><a:themeElements>"#);

    xml.push_str(r#"<a:clrScheme name="Slideflow">"#);
    let scheme = [
        ("dk1", style.body_color),
        ("lt1", RgbColor(255, 255, 255)),
        ("dk2", style.title_color),
        ("lt2", style.background),
        ("accent1", style.accent),
        ("accent2", style.title_color),
        ("accent3", RgbColor(165, 165, 165)),
        ("accent4", RgbColor(255, 192, 0)),
        ("accent5", RgbColor(91, 155, 213)),
        ("accent6", RgbColor(112, 173, 71)),
        ("hlink", RgbColor(5, 99, 193)),
        ("folHlink", RgbColor(149, 79, 114)),
    ];
    for (slot, color) in scheme {
        write!(xml, r#"<a:{slot}><a:srgbClr val="{}"/></a:{slot}>"#, color.hex())?;
    }
    xml.push_str("</a:clrScheme>");

    write!(
        xml,
        r#"<a:fontScheme name="Slideflow"><a:majorFont><a:latin typeface="{}"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="{}"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme>"#,
        escape_xml(&style.title_font),
        escape_xml(&style.body_font)
    )?;

    let solid = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let line = format!(r#"<a:ln w="6350">{solid}</a:ln>"#);
    let effect = "<a:effectStyle><a:effectLst/></a:effectStyle>";
    write!(
        xml,
        r#"<a:fmtScheme name="Slideflow"><a:fillStyleLst>{solid}{solid}{solid}</a:fillStyleLst><a:lnStyleLst>{line}{line}{line}</a:lnStyleLst><a:effectStyleLst>{effect}{effect}{effect}</a:effectStyleLst><a:bgFillStyleLst>{solid}{solid}{solid}</a:bgFillStyleLst></a:fmtScheme>"#
    )?;

    xml.push_str("</a:themeElements><a:objectDefaults/><a:extraClrSchemeLst/></a:theme>");
    Ok(xml)
}

fn slide_xml(
    number: usize,
    slide: &DeckSlide,
    picture_rel_ids: &[String],
) -> Result<String, DeckError> {
    let mut xml = String::with_capacity(4096);
    xml.push_str(XML_DECLARATION);
    write!(xml, "<p:sld {NS_DECLS}><p:cSld>").map_err(PackageError::from)?;
    if let Some(color) = slide.background {
        write_background(&mut xml, color)?;
    }
    xml.push_str("<p:spTree>");
    xml.push_str(GROUP_SHAPE_PROPS);

    let mut pictures = picture_rel_ids.iter();
    for (index, shape) in slide.shapes.iter().enumerate() {
        // id 1 is the group shape
        let shape_id = index as u32 + 2;
        match shape {
            Shape::Placeholder { role, paragraphs } => {
                write_placeholder(&mut xml, shape_id, *role, paragraphs)?
            }
            Shape::Picture(picture) => {
                let rel_id = pictures
                    .next()
                    .ok_or(DeckError::MissingPictureRelationship { slide: number })?;
                write_picture(&mut xml, shape_id, picture, rel_id)?
            }
        }
    }

    xml.push_str("</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>");
    Ok(xml)
}

fn write_placeholder(
    xml: &mut String,
    shape_id: u32,
    role: PlaceholderRole,
    paragraphs: &[Paragraph],
) -> Result<(), PackageError> {
    write!(
        xml,
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{} {}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr>{}</p:nvPr></p:nvSpPr><p:spPr>"#,
        shape_id,
        role.name(),
        shape_id,
        role.ph_element()
    )?;
    write_xfrm(xml, &role.frame())?;
    xml.push_str("</p:spPr><p:txBody>");
    match role {
        PlaceholderRole::Body => xml.push_str(r#"<a:bodyPr wrap="square"><a:normAutofit/></a:bodyPr>"#),
        _ => xml.push_str(r#"<a:bodyPr wrap="square" anchor="ctr"><a:normAutofit/></a:bodyPr>"#),
    }
    xml.push_str("<a:lstStyle/>");
    if paragraphs.is_empty() {
        xml.push_str(r#"<a:p><a:endParaRPr lang="en-US"/></a:p>"#);
    }
    for paragraph in paragraphs {
        write_paragraph(xml, paragraph)?;
    }
    xml.push_str("</p:txBody></p:sp>");
    Ok(())
}

fn write_paragraph(xml: &mut String, paragraph: &Paragraph) -> Result<(), PackageError> {
    let level = paragraph.level.min(8);
    let align = match paragraph.alignment {
        Alignment::Left => "l",
        Alignment::Center => "ctr",
    };

    xml.push_str("<a:p>");
    if paragraph.bullet {
        // hanging indent: 0.375" for the first level, 0.3125" deeper
        let (mar_l, indent) = match level {
            0 => (342_900, -342_900),
            n => (342_900 + 400_050 * i64::from(n), -285_750),
        };
        write!(
            xml,
            r#"<a:pPr marL="{mar_l}" lvl="{level}" indent="{indent}" algn="{align}"><a:buFont typeface="Arial"/><a:buChar char="&#8226;"/></a:pPr>"#
        )?;
    } else {
        write!(
            xml,
            r#"<a:pPr marL="{}" lvl="{level}" indent="0" algn="{align}"><a:buNone/></a:pPr>"#,
            457_200 * i64::from(level)
        )?;
    }

    let format = &paragraph.format;
    let mut run_props = String::with_capacity(256);
    write!(
        run_props,
        r#"<a:rPr lang="en-US" sz="{}" b="{}" i="{}" dirty="0"><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:latin typeface="{}"/></a:rPr>"#,
        centipoints(format.size_pt),
        u8::from(format.bold),
        u8::from(format.italic),
        format.color.hex(),
        escape_xml(&format.font)
    )?;

    for (index, line) in paragraph.text.lines().enumerate() {
        if index > 0 {
            xml.push_str("<a:br>");
            xml.push_str(&run_props);
            xml.push_str("</a:br>");
        }
        write!(xml, "<a:r>{run_props}<a:t>{}</a:t></a:r>", escape_xml(line))?;
    }
    xml.push_str("</a:p>");
    Ok(())
}

fn write_picture(
    xml: &mut String,
    shape_id: u32,
    picture: &Picture,
    rel_id: &str,
) -> Result<(), PackageError> {
    write!(
        xml,
        r#"<p:pic><p:nvPicPr><p:cNvPr id="{}" name="Picture {}" descr="{}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>"#,
        shape_id,
        shape_id,
        escape_xml(&picture.description)
    )?;
    write!(
        xml,
        r#"<p:blipFill><a:blip r:embed="{rel_id}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr>"#
    )?;
    write_xfrm(xml, &picture.frame)?;
    xml.push_str(r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::template::TemplateStyle;
    use std::io::{Cursor, Read};

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut body = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        body
    }

    fn sample_picture(frame: Frame) -> Picture {
        Picture {
            data: Bytes::from_static(&[0x89, b'P', b'N', b'G']),
            format: PictureFormat::Png,
            frame,
            description: "A chart".to_string(),
        }
    }

    #[test]
    fn test_emu_conversion() {
        assert_eq!(emu(1.0), 914_400);
        assert_eq!(emu(0.5), 457_200);
        assert_eq!(emu(SLIDE_HEIGHT_IN), 6_858_000);
    }

    #[test]
    fn test_empty_deck_is_a_valid_package() {
        let deck = Deck::new(TemplateStyle::Corporate.spec());
        let bytes = deck.to_pptx().unwrap();

        let content_types = read_part(&bytes, "[Content_Types].xml");
        assert!(content_types.contains("/ppt/presentation.xml"));
        assert!(!content_types.contains("/ppt/slides/slide1.xml"));

        let presentation = read_part(&bytes, "ppt/presentation.xml");
        assert!(!presentation.contains("<p:sldIdLst>"));
        assert!(presentation.contains(r#"<p:sldSz cx="12191695" cy="6858000"/>"#));
    }

    #[test]
    fn test_slides_media_and_relationships() {
        let style = TemplateStyle::Academic.spec();
        let mut deck = Deck::new(style.clone());

        let mut first = DeckSlide::new(SlideLayout::Title);
        first.add_placeholder(
            PlaceholderRole::CenteredTitle,
            vec![Paragraph::plain("Hello & welcome", RunFormat::title(&style)).centered()],
        );
        first.add_picture_behind(sample_picture(Frame::full_slide()));
        deck.slides.push(first);

        let mut second = DeckSlide::new(SlideLayout::TitleAndContent);
        second.add_placeholder(
            PlaceholderRole::Body,
            vec![Paragraph::bullet("Point", 0, RunFormat::body(&style))],
        );
        second.add_picture(sample_picture(Frame::full_slide()));
        deck.slides.push(second);

        let bytes = deck.to_pptx().unwrap();

        let slide1 = read_part(&bytes, "ppt/slides/slide1.xml");
        assert!(slide1.contains("Hello &amp; welcome"));
        assert!(slide1.contains(r#"algn="ctr""#));
        // background picture comes before the title in z-order
        assert!(slide1.find("<p:pic>").unwrap() < slide1.find("<p:sp>").unwrap());

        let rels2 = read_part(&bytes, "ppt/slides/_rels/slide2.xml.rels");
        assert!(rels2.contains("../slideLayouts/slideLayout2.xml"));
        assert!(rels2.contains("../media/image2.png"));

        let slide2 = read_part(&bytes, "ppt/slides/slide2.xml");
        assert!(slide2.contains(r#"<a:buChar char="&#8226;"/>"#));
        assert!(slide2.contains(r#"r:embed="rId2""#));

        let theme = read_part(&bytes, "ppt/theme/theme1.xml");
        assert!(theme.contains(r#"<a:latin typeface="Times New Roman"/>"#));

        let master = read_part(&bytes, "ppt/slideMasters/slideMaster1.xml");
        assert!(master.contains(&style.background.hex()));

        let content_types = read_part(&bytes, "[Content_Types].xml");
        assert!(content_types.contains(r#"Extension="png""#));
        assert!(content_types.contains("/ppt/slides/slide2.xml"));
    }

    #[test]
    fn test_picture_without_relationship_is_an_error() {
        let mut slide = DeckSlide::new(SlideLayout::TitleAndContent);
        slide.add_picture(sample_picture(Frame::full_slide()));
        slide.add_picture(sample_picture(Frame::full_slide()));

        let result = slide_xml(3, &slide, &["rId2".to_string()]);
        assert!(matches!(
            result,
            Err(DeckError::MissingPictureRelationship { slide: 3 })
        ));
        assert!(slide_xml(3, &slide, &["rId2".to_string(), "rId3".to_string()]).is_ok());
    }

    #[test]
    fn test_multiline_text_uses_line_breaks() {
        let style = TemplateStyle::Corporate.spec();
        let mut xml = String::new();
        write_paragraph(
            &mut xml,
            &Paragraph::plain("first\nsecond", RunFormat::body(&style)),
        )
        .unwrap();
        assert_eq!(xml.matches("<a:r>").count(), 2);
        assert_eq!(xml.matches("<a:br>").count(), 1);
        assert!(xml.contains("<a:buNone/>"));
    }

    #[test]
    fn test_run_format_uses_style() {
        let style = TemplateStyle::Marketing.spec();
        let mut xml = String::new();
        write_paragraph(&mut xml, &Paragraph::plain("Big", RunFormat::title(&style))).unwrap();
        assert!(xml.contains(r#"sz="4800""#));
        assert!(xml.contains(r#"b="1""#));
        assert!(xml.contains(r#"<a:srgbClr val="E63946"/>"#));
        assert!(xml.contains(r#"<a:latin typeface="Raleway"/>"#));
    }
}

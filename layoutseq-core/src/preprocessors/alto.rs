//! ALTO XML reader
//!
//! Reads the layout files produced by `pdfalto`: a `Styles` table of
//! `TextStyle` entries followed by `Layout/Page/PrintSpace/TextBlock/TextLine`
//! with `String` and `SP` items.

use super::preprocessor::{has_extension, Preprocessor};
use crate::error::{LayoutError, Result};
use crate::types::{
    BoundingBox, LayoutDocument, LayoutToken, LineItem, Page, PrintSpace, SpaceMarker, Style,
    Styles, TextBlock, TextLine,
};
use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Default)]
pub struct AltoPreprocessor;

impl AltoPreprocessor {
    pub fn new() -> Self {
        Self
    }
}

impl Preprocessor for AltoPreprocessor {
    fn parse(&self, content: &str) -> Result<LayoutDocument> {
        let mut reader = Reader::from_str(content);
        reader.trim_text(true);

        let mut builder = AltoBuilder::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => builder.open(&e)?,
                Event::Empty(e) => {
                    builder.open(&e)?;
                    builder.close(e.local_name().as_ref())?;
                }
                Event::End(e) => builder.close(e.local_name().as_ref())?,
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        let doc = builder.finish()?;
        doc.validate()?;
        debug!(
            "Read ALTO layout: {} pages, {} blocks, {} tokens, {} styles",
            doc.pages.len(),
            doc.block_count(),
            doc.token_count(),
            doc.styles.len()
        );
        Ok(doc)
    }

    fn name(&self) -> &str {
        "alto"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        has_extension(path, &["xml", "alto"])
    }
}

/// Attributes of one element, keyed by local name.
struct Attributes {
    context: String,
    values: HashMap<String, String>,
}

impl Attributes {
    fn read(e: &BytesStart) -> Result<Self> {
        let element = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
        let mut values = HashMap::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| LayoutError::malformed(&element, err.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).to_string();
            let value = attr.unescape_value()?.to_string();
            values.insert(key, value);
        }
        let context = match values.get("ID") {
            Some(id) => format!("{} {}", element, id),
            None => element,
        };
        Ok(Self { context, values })
    }

    fn optional(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn required(&self, key: &str) -> Result<&str> {
        self.optional(key)
            .ok_or_else(|| LayoutError::malformed(&self.context, format!("missing {}", key)))
    }

    fn number(&self, key: &str) -> Result<f32> {
        let raw = self.required(key)?;
        raw.trim().parse::<f32>().map_err(|_| {
            LayoutError::malformed(&self.context, format!("{} is not a number: '{}'", key, raw))
        })
    }

    fn bbox(&self) -> Result<BoundingBox> {
        Ok(BoundingBox::new(
            self.number("HPOS")?,
            self.number("VPOS")?,
            self.number("WIDTH")?,
            self.number("HEIGHT")?,
        ))
    }

    fn id(&self, fallback: impl FnOnce() -> String) -> String {
        self.optional("ID").map(str::to_string).unwrap_or_else(fallback)
    }
}

#[derive(Default)]
struct AltoBuilder {
    styles: Styles,
    pages: Vec<Page>,
    page: Option<Page>,
    space: Option<PrintSpace>,
    block: Option<TextBlock>,
    line: Option<TextLine>,
}

impl AltoBuilder {
    fn open(&mut self, e: &BytesStart) -> Result<()> {
        match e.local_name().as_ref() {
            b"TextStyle" => {
                let attrs = Attributes::read(e)?;
                let style = parse_style(&attrs)?;
                self.styles.insert(style);
            }
            b"Page" => {
                let attrs = Attributes::read(e)?;
                let number = self.pages.len() as u32 + 1;
                let physical_number = match attrs.optional("PHYSICAL_IMG_NR") {
                    Some(raw) => raw.trim().parse::<u32>().map_err(|_| {
                        LayoutError::malformed(
                            &attrs.context,
                            format!("PHYSICAL_IMG_NR is not an integer: '{}'", raw),
                        )
                    })?,
                    None => number,
                };
                self.page = Some(Page {
                    id: attrs.id(|| format!("Page{}", number)),
                    number,
                    physical_number,
                    width: attrs.number("WIDTH")?,
                    height: attrs.number("HEIGHT")?,
                    print_spaces: Vec::new(),
                });
            }
            b"PrintSpace" => {
                let attrs = Attributes::read(e)?;
                self.expect_open(self.page.is_some(), &attrs, "Page")?;
                let bbox = attrs.bbox().unwrap_or_default();
                self.space = Some(PrintSpace {
                    bbox,
                    blocks: Vec::new(),
                });
            }
            b"TextBlock" => {
                let attrs = Attributes::read(e)?;
                self.expect_open(self.space.is_some(), &attrs, "PrintSpace")?;
                self.block = Some(TextBlock {
                    id: attrs.required("ID")?.to_string(),
                    bbox: attrs.bbox()?,
                    lines: Vec::new(),
                });
            }
            b"TextLine" => {
                let attrs = Attributes::read(e)?;
                self.expect_open(self.block.is_some(), &attrs, "TextBlock")?;
                self.line = Some(TextLine {
                    id: attrs.required("ID")?.to_string(),
                    bbox: attrs.bbox()?,
                    items: Vec::new(),
                });
            }
            b"String" => {
                let attrs = Attributes::read(e)?;
                let token = LayoutToken {
                    id: attrs.optional("ID").map(str::to_string),
                    content: attrs.required("CONTENT")?.to_string(),
                    bbox: attrs.bbox()?,
                    style_ref: first_style_ref(attrs.required("STYLEREFS")?)
                        .ok_or_else(|| LayoutError::malformed(&attrs.context, "empty STYLEREFS"))?,
                };
                self.current_line(&attrs)?.items.push(LineItem::Token(token));
            }
            b"SP" => {
                let attrs = Attributes::read(e)?;
                let marker = SpaceMarker {
                    x: attrs.number("HPOS")?,
                    y: attrs.number("VPOS").unwrap_or_default(),
                    width: attrs.number("WIDTH").unwrap_or_default(),
                };
                self.current_line(&attrs)?.items.push(LineItem::Space(marker));
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) -> Result<()> {
        match name {
            b"TextLine" => {
                if let (Some(line), Some(block)) = (self.line.take(), self.block.as_mut()) {
                    block.lines.push(line);
                }
            }
            b"TextBlock" => {
                if let (Some(block), Some(space)) = (self.block.take(), self.space.as_mut()) {
                    space.blocks.push(block);
                }
            }
            b"PrintSpace" => {
                if let (Some(space), Some(page)) = (self.space.take(), self.page.as_mut()) {
                    page.print_spaces.push(space);
                }
            }
            b"Page" => {
                if let Some(page) = self.page.take() {
                    self.pages.push(page);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn current_line(&mut self, attrs: &Attributes) -> Result<&mut TextLine> {
        self.line
            .as_mut()
            .ok_or_else(|| LayoutError::malformed(&attrs.context, "outside of a TextLine"))
    }

    fn expect_open(&self, open: bool, attrs: &Attributes, parent: &str) -> Result<()> {
        if open {
            Ok(())
        } else {
            Err(LayoutError::malformed(
                &attrs.context,
                format!("outside of a {}", parent),
            ))
        }
    }

    fn finish(self) -> Result<LayoutDocument> {
        if self.page.is_some() {
            return Err(LayoutError::malformed("Layout", "unterminated Page element"));
        }
        Ok(LayoutDocument {
            pages: self.pages,
            styles: self.styles,
        })
    }
}

fn parse_style(attrs: &Attributes) -> Result<Style> {
    let font_style = attrs.optional("FONTSTYLE").unwrap_or_default();
    Ok(Style {
        id: attrs.required("ID")?.to_string(),
        font_size: attrs.number("FONTSIZE")?.trunc() as i32,
        font_family: attrs.optional("FONTFAMILY").map(str::to_string),
        bold: font_style.contains("bold"),
        italic: font_style.contains("italic"),
        superscript: font_style.contains("superscript"),
    })
}

fn first_style_ref(raw: &str) -> Option<String> {
    raw.split_whitespace().next().map(str::to_string)
}

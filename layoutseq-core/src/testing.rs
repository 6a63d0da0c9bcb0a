//! Small builders for layout fixtures used across unit tests.

use crate::types::{
    BoundingBox, LayoutDocument, LayoutToken, LineItem, Page, PrintSpace, SpaceMarker, Style,
    Styles, TextBlock, TextLine,
};

pub const CHAR_WIDTH: f32 = 6.0;

pub fn styles() -> Styles {
    let mut styles = Styles::default();
    for (id, size, bold, superscript) in [
        ("font0", 10, false, false),
        ("font1", 14, true, false),
        ("font2", 7, false, true),
    ] {
        styles.insert(Style {
            id: id.to_string(),
            font_size: size,
            font_family: Some("Times".to_string()),
            bold,
            italic: false,
            superscript,
        });
    }
    styles
}

/// Line at x=72 whose tokens are `(content, style)` pairs separated by spacing markers.
pub fn line(id: &str, tokens: &[(&str, &str)]) -> TextLine {
    line_at(id, 72.0, 100.0, tokens)
}

pub fn line_at(id: &str, x: f32, y: f32, tokens: &[(&str, &str)]) -> TextLine {
    let mut items = Vec::new();
    let mut cursor = x;
    for (i, (content, style)) in tokens.iter().enumerate() {
        if i > 0 {
            items.push(LineItem::Space(SpaceMarker {
                x: cursor,
                y,
                width: 4.0,
            }));
            cursor += 4.0;
        }
        let width = CHAR_WIDTH * content.chars().count().max(1) as f32;
        items.push(LineItem::Token(LayoutToken {
            id: Some(format!("{}_t{}", id, i)),
            content: content.to_string(),
            bbox: BoundingBox::new(cursor, y, width, 10.0),
            style_ref: style.to_string(),
        }));
        cursor += width;
    }
    TextLine {
        id: id.to_string(),
        bbox: BoundingBox::new(x, y, cursor - x, 10.0),
        items,
    }
}

pub fn block(id: &str, rect: (f32, f32, f32, f32), lines: Vec<TextLine>) -> TextBlock {
    TextBlock {
        id: id.to_string(),
        bbox: BoundingBox::new(rect.0, rect.1, rect.2, rect.3),
        lines,
    }
}

pub fn page(number: u32, blocks: Vec<TextBlock>) -> Page {
    Page {
        id: format!("Page{}", number),
        number,
        physical_number: number,
        width: 612.0,
        height: 792.0,
        print_spaces: vec![PrintSpace {
            bbox: BoundingBox::new(0.0, 0.0, 612.0, 792.0),
            blocks,
        }],
    }
}

pub fn doc(pages: Vec<Page>, styles: Styles) -> LayoutDocument {
    LayoutDocument { pages, styles }
}

use crate::error::{LayoutError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ===== GEOMETRY =====

/// Axis-aligned box in device units, origin at the top-left of the page.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// True when the two boxes overlap with a non-empty interior.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Integer rectangle describing the inferred main text area of a page parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaRect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl AreaRect {
    pub fn right(&self) -> i64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.height
    }

    /// Full containment of a block box, edges inclusive.
    pub fn contains(&self, bbox: &BoundingBox) -> bool {
        bbox.x >= self.x as f32
            && bbox.y >= self.y as f32
            && bbox.right() <= self.right() as f32
            && bbox.bottom() <= self.bottom() as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parity {
    Odd,
    Even,
}

impl Parity {
    pub fn of(number: u32) -> Self {
        if number % 2 == 0 {
            Parity::Even
        } else {
            Parity::Odd
        }
    }
}

/// Main-area rectangles for odd and even pages.
///
/// An absent rectangle means "no constraint": every block on pages of that
/// parity counts as inside the main area.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MainAreas {
    pub odd: Option<AreaRect>,
    pub even: Option<AreaRect>,
}

impl MainAreas {
    pub fn for_parity(&self, parity: Parity) -> Option<&AreaRect> {
        match parity {
            Parity::Odd => self.odd.as_ref(),
            Parity::Even => self.even.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.odd.is_none() && self.even.is_none()
    }

    pub fn contains_block(&self, page: &Page, bbox: &BoundingBox) -> bool {
        self.for_parity(page.parity())
            .map(|area| area.contains(bbox))
            .unwrap_or(true)
    }
}

// ===== STYLES =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub id: String,
    /// Integer-truncated font size
    pub font_size: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub superscript: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Styles {
    pub styles: HashMap<String, Style>,
}

impl Styles {
    pub fn insert(&mut self, style: Style) {
        self.styles.insert(style.id.clone(), style);
    }

    pub fn get(&self, id: &str) -> Option<&Style> {
        self.styles.get(id)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

// ===== LAYOUT TREE =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutToken {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: String,
    pub bbox: BoundingBox,
    pub style_ref: String,
}

/// Inter-token spacing marker (`SP` in ALTO).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpaceMarker {
    pub x: f32,
    pub y: f32,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineItem {
    Token(LayoutToken),
    Space(SpaceMarker),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub id: String,
    pub bbox: BoundingBox,
    pub items: Vec<LineItem>,
}

impl TextLine {
    pub fn tokens(&self) -> impl Iterator<Item = &LayoutToken> {
        self.items.iter().filter_map(|item| match item {
            LineItem::Token(token) => Some(token),
            LineItem::Space(_) => None,
        })
    }

    pub fn first_token(&self) -> Option<&LayoutToken> {
        self.tokens().next()
    }

    pub fn token_count(&self) -> usize {
        self.tokens().count()
    }

    /// A line takes part in segment labeling only when its first token has visible text.
    pub fn is_labelable(&self) -> bool {
        self.first_token()
            .map(|token| !token.content.trim().is_empty())
            .unwrap_or(false)
    }

    /// Space-joined contents of every token on the line.
    pub fn full_text(&self) -> String {
        self.tokens()
            .map(|token| token.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Text of the token following the first one, looking past a single spacing marker.
    pub fn second_token_text(&self) -> Option<&str> {
        let first = self
            .items
            .iter()
            .position(|item| matches!(item, LineItem::Token(_)))?;
        match self.items.get(first + 1)? {
            LineItem::Token(token) => Some(token.content.as_str()),
            LineItem::Space(_) => match self.items.get(first + 2)? {
                LineItem::Token(token) => Some(token.content.as_str()),
                LineItem::Space(_) => None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub id: String,
    pub bbox: BoundingBox,
    pub lines: Vec<TextLine>,
}

impl TextBlock {
    pub fn token_count(&self) -> usize {
        self.lines.iter().map(TextLine::token_count).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintSpace {
    pub bbox: BoundingBox,
    pub blocks: Vec<TextBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    /// 1-based position in the document
    pub number: u32,
    /// Physical image number, the source of page parity
    pub physical_number: u32,
    pub width: f32,
    pub height: f32,
    pub print_spaces: Vec<PrintSpace>,
}

impl Page {
    pub fn parity(&self) -> Parity {
        Parity::of(self.physical_number)
    }

    /// Blocks of every print space, in reading order.
    pub fn blocks(&self) -> impl Iterator<Item = &TextBlock> {
        self.print_spaces.iter().flat_map(|space| space.blocks.iter())
    }

    pub fn token_count(&self) -> usize {
        self.blocks().map(TextBlock::token_count).sum()
    }
}

/// Position of a block inside a document: page index and flattened block index on that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRef {
    pub page_index: usize,
    pub block_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutDocument {
    pub pages: Vec<Page>,
    pub styles: Styles,
}

impl LayoutDocument {
    pub fn token_count(&self) -> usize {
        self.pages.iter().map(Page::token_count).sum()
    }

    pub fn block_count(&self) -> usize {
        self.pages.iter().map(|page| page.blocks().count()).sum()
    }

    /// Every block with its reference and owning page, in document order.
    pub fn blocks(&self) -> impl Iterator<Item = (BlockRef, &Page, &TextBlock)> {
        self.pages.iter().enumerate().flat_map(|(page_index, page)| {
            page.blocks().enumerate().map(move |(block_index, block)| {
                (
                    BlockRef {
                        page_index,
                        block_index,
                    },
                    page,
                    block,
                )
            })
        })
    }

    pub fn block(&self, block_ref: BlockRef) -> Option<(&Page, &TextBlock)> {
        let page = self.pages.get(block_ref.page_index)?;
        let block = page.blocks().nth(block_ref.block_index)?;
        Some((page, block))
    }

    pub fn style_of(&self, token: &LayoutToken) -> Result<&Style> {
        self.styles.get(&token.style_ref).ok_or_else(|| {
            LayoutError::malformed(
                format!("token {:?}", token.id.as_deref().unwrap_or(&token.content)),
                format!("unknown style reference '{}'", token.style_ref),
            )
        })
    }

    /// Check that every token references a declared style.
    pub fn validate(&self) -> Result<()> {
        for page in &self.pages {
            for block in page.blocks() {
                for line in &block.lines {
                    for token in line.tokens() {
                        self.style_of(token)?;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let document: LayoutDocument = serde_json::from_str(json)?;
        document.validate()?;
        Ok(document)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

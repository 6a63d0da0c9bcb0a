use crate::types::Style;

/// Running font and font-size state threaded across the records of one pass.
#[derive(Debug, Clone, Default)]
pub struct FontTracker {
    current_font: String,
    current_size: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontChange {
    pub font_type: &'static str,
    pub font_size_type: &'static str,
}

impl FontTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare a style against the running state, then advance the state.
    pub fn observe(&mut self, style: &Style) -> FontChange {
        let font_type = if self.current_font != style.id {
            self.current_font = style.id.clone();
            "NEWFONT"
        } else {
            "SAMEFONT"
        };

        let font_size_type = match style.font_size.cmp(&self.current_size) {
            std::cmp::Ordering::Greater => {
                self.current_size = style.font_size;
                "HIGHERFONT"
            }
            std::cmp::Ordering::Less => {
                self.current_size = style.font_size;
                "LOWERFONT"
            }
            std::cmp::Ordering::Equal => "SAMEFONTSIZE",
        };

        FontChange {
            font_type,
            font_size_type,
        }
    }
}

/// Left-edge tracker for indentation detection inside one block.
#[derive(Debug, Clone, Default)]
pub struct AlignmentTracker {
    previous_x: Option<f32>,
}

impl AlignmentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// LINEINDENT when the line starts more than one average character width right of the previous line.
    pub fn observe(&mut self, line_x: f32, average_char_width: f32) -> &'static str {
        let previous = self.previous_x.unwrap_or(line_x);
        self.previous_x = Some(line_x);
        if line_x - previous > average_char_width {
            "LINEINDENT"
        } else {
            "ALIGNEDLEFT"
        }
    }
}

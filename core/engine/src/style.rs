//! FILENAME: core/engine/src/style.rs
//! PURPOSE: Defines the style data structures and registry for cell formatting.
//! CONTEXT: This file implements the Flyweight Pattern for efficient style storage.
//! Instead of storing full style data on every cell, cells store a style_index (usize)
//! that points to a shared Style object in the sheet's StyleRegistry.
//! Only the parts a batch can change or must carry through a save are modeled:
//! font, solid fill and borders.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// RGB color representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    pub const fn black() -> Self {
        Color::new(0, 0, 0)
    }

    pub const fn white() -> Self {
        Color::new(255, 255, 255)
    }

    /// Parse from hex string: "#FF0000", "FF0000", or ARGB "FFFF0000"
    /// as found in xlsx style parts (the alpha byte is ignored).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let rgb = match hex.len() {
            6 => hex,
            8 => &hex[2..],
            _ => return None,
        };
        let r = u8::from_str_radix(&rgb[0..2], 16).ok()?;
        let g = u8::from_str_radix(&rgb[2..4], 16).ok()?;
        let b = u8::from_str_radix(&rgb[4..6], 16).ok()?;
        Some(Color::new(r, g, b))
    }

    /// Uppercase "RRGGBB".
    pub fn to_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Packed 0xRRGGBB.
    pub fn to_rgb_u32(&self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | (self.b as u32)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::black()
    }
}

/// Line style for borders, named after the xlsx `style` attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BorderLineStyle {
    #[default]
    None,
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
}

impl BorderLineStyle {
    pub fn from_xlsx(name: &str) -> Self {
        match name {
            "thin" | "hair" => BorderLineStyle::Thin,
            "medium" | "mediumDashDot" | "mediumDashDotDot" => BorderLineStyle::Medium,
            "thick" => BorderLineStyle::Thick,
            "dashed" | "mediumDashed" | "dashDot" | "dashDotDot" | "slantDashDot" => {
                BorderLineStyle::Dashed
            }
            "dotted" => BorderLineStyle::Dotted,
            "double" => BorderLineStyle::Double,
            _ => BorderLineStyle::None,
        }
    }
}

/// Border style for a single edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct BorderStyle {
    pub style: BorderLineStyle,
    pub color: Color,
}

impl BorderStyle {
    pub fn thin() -> Self {
        BorderStyle {
            style: BorderLineStyle::Thin,
            color: Color::black(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.style == BorderLineStyle::None
    }
}

/// Complete border configuration for a cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Borders {
    pub top: BorderStyle,
    pub right: BorderStyle,
    pub bottom: BorderStyle,
    pub left: BorderStyle,
}

impl Borders {
    /// The same edge on all four sides.
    pub fn all(edge: BorderStyle) -> Self {
        Borders {
            top: edge.clone(),
            right: edge.clone(),
            bottom: edge.clone(),
            left: edge,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_none() && self.right.is_none() && self.bottom.is_none() && self.left.is_none()
    }
}

/// Font style configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontStyle {
    pub family: String,
    pub size: u8, // Font size in points
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub color: Color,
}

/// Default font family of new xlsx workbooks.
pub const DEFAULT_FONT_FAMILY: &str = "Calibri";
/// Default font size of new xlsx workbooks.
pub const DEFAULT_FONT_SIZE: u8 = 11;

impl Default for FontStyle {
    fn default() -> Self {
        FontStyle {
            family: DEFAULT_FONT_FAMILY.to_string(),
            size: DEFAULT_FONT_SIZE,
            bold: false,
            italic: false,
            underline: false,
            strikethrough: false,
            color: Color::black(),
        }
    }
}

/// Complete cell style definition.
/// This is what gets stored in the StyleRegistry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct CellStyle {
    pub font: FontStyle,
    /// Solid fill color; None means no fill.
    pub background: Option<Color>,
    pub borders: Borders,
}

impl CellStyle {
    /// Create a new default style.
    pub fn new() -> Self {
        CellStyle::default()
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.font.bold = bold;
        self
    }

    pub fn with_font_color(mut self, color: Color) -> Self {
        self.font.color = color;
        self
    }

    pub fn with_background(mut self, color: Option<Color>) -> Self {
        self.background = color;
        self
    }

    pub fn is_default(&self) -> bool {
        *self == CellStyle::default()
    }
}

/// Style registry using the Flyweight pattern.
#[derive(Debug, Clone)]
pub struct StyleRegistry {
    /// Vector of unique styles. Index 0 is always the default style.
    styles: Vec<CellStyle>,
    /// Reverse lookup: style hash -> index for deduplication.
    style_to_index: HashMap<CellStyle, usize>,
}

impl StyleRegistry {
    /// Create a new registry with the default style at index 0.
    pub fn new() -> Self {
        let default_style = CellStyle::new();
        let mut style_to_index = HashMap::new();
        style_to_index.insert(default_style.clone(), 0);

        StyleRegistry {
            styles: vec![default_style],
            style_to_index,
        }
    }

    /// Get or create a style index for the given style.
    /// If the style already exists, returns its index.
    /// Otherwise, adds the style and returns the new index.
    pub fn get_or_create(&mut self, style: CellStyle) -> usize {
        if let Some(&index) = self.style_to_index.get(&style) {
            return index;
        }

        let index = self.styles.len();
        self.style_to_index.insert(style.clone(), index);
        self.styles.push(style);
        index
    }

    /// Get a style by its index.
    /// Returns the default style (index 0) if index is out of bounds.
    pub fn get(&self, index: usize) -> &CellStyle {
        self.styles.get(index).unwrap_or(&self.styles[0])
    }

    /// Get the total number of unique styles.
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Check if the registry only contains the default style.
    pub fn is_empty(&self) -> bool {
        self.styles.len() <= 1
    }

    /// Get all styles (for serialization/debugging).
    pub fn all_styles(&self) -> &[CellStyle] {
        &self.styles
    }
}

impl Default for StyleRegistry {
    fn default() -> Self {
        StyleRegistry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_hex() {
        let color = Color::from_hex("#FF0000").unwrap();
        assert_eq!(color, Color::new(255, 0, 0));

        let argb = Color::from_hex("FF00FF00").unwrap();
        assert_eq!(argb.g, 255);
        assert_eq!(argb.r, 0);

        assert!(Color::from_hex("12345").is_none());
        assert!(Color::from_hex("GGGGGG").is_none());
    }

    #[test]
    fn test_color_from_hex_rejects_non_ascii() {
        // "红色" is six bytes but only two chars
        assert!(Color::from_hex("#红色").is_none());
        assert!(Color::from_hex("红色").is_none());
        assert!(Color::from_hex("FF红色").is_none());
    }

    #[test]
    fn test_color_to_hex() {
        assert_eq!(Color::new(255, 165, 0).to_hex(), "FFA500");
        assert_eq!(Color::new(128, 0, 128).to_rgb_u32(), 0x800080);
    }

    #[test]
    fn test_border_style_names() {
        assert_eq!(BorderLineStyle::from_xlsx("thin"), BorderLineStyle::Thin);
        assert_eq!(BorderLineStyle::from_xlsx("mediumDashed"), BorderLineStyle::Dashed);
        assert_eq!(BorderLineStyle::from_xlsx("bogus"), BorderLineStyle::None);
        assert!(Borders::default().is_empty());
        assert!(!Borders::all(BorderStyle::thin()).is_empty());
    }

    #[test]
    fn test_style_registry_deduplication() {
        let mut registry = StyleRegistry::new();

        // Create two identical bold styles
        let style1 = CellStyle::new().with_bold(true);
        let style2 = CellStyle::new().with_bold(true);

        let index1 = registry.get_or_create(style1);
        let index2 = registry.get_or_create(style2);

        // Should get the same index
        assert_eq!(index1, index2);
        assert_eq!(registry.len(), 2); // default + bold
    }

    #[test]
    fn test_style_registry_different_styles() {
        let mut registry = StyleRegistry::new();

        let red = CellStyle::new().with_font_color(Color::new(255, 0, 0));
        let filled = CellStyle::new().with_background(Some(Color::new(255, 255, 0)));

        let index1 = registry.get_or_create(red);
        let index2 = registry.get_or_create(filled);

        // Should get different indices
        assert_ne!(index1, index2);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_default_style_index() {
        let registry = StyleRegistry::new();
        let default = registry.get(0);
        assert!(default.is_default());
        assert!(registry.get(99).is_default());
    }
}

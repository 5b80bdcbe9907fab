//! 5x5 bitmap font for button labels and window titles.

use super::{Rgb, Surface};

/// Horizontal advance between glyphs, in pixels.
pub const ADVANCE: i32 = 6;

/// Glyph height in pixels.
pub const GLYPH_HEIGHT: i32 = 5;

/// Rows of a glyph, `#` marks a lit pixel.
type Glyph = [&'static str; 5];

/// Look up the glyph for `ch`. Lowercase letters fold to uppercase.
pub fn glyph(ch: char) -> Option<Glyph> {
    let g = match ch.to_ascii_uppercase() {
        'A' => ["  #  ", " # # ", "#####", "#   #", "#   #"],
        'B' => ["#### ", "#   #", "#### ", "#   #", "#### "],
        'C' => [" ####", "#    ", "#    ", "#    ", " ####"],
        'D' => ["#### ", "#   #", "#   #", "#   #", "#### "],
        'E' => ["#####", "#    ", "#### ", "#    ", "#####"],
        'F' => ["#####", "#    ", "#### ", "#    ", "#    "],
        'G' => [" ####", "#    ", "#  ##", "#   #", " ####"],
        'H' => ["#   #", "#   #", "#####", "#   #", "#   #"],
        'I' => ["#####", "  #  ", "  #  ", "  #  ", "#####"],
        'J' => ["#####", "   # ", "   # ", "#  # ", " ##  "],
        'K' => ["#   #", "#  # ", "###  ", "#  # ", "#   #"],
        'L' => ["#    ", "#    ", "#    ", "#    ", "#####"],
        'M' => ["#   #", "## ##", "# # #", "#   #", "#   #"],
        'N' => ["#   #", "##  #", "# # #", "#  ##", "#   #"],
        'O' => [" ### ", "#   #", "#   #", "#   #", " ### "],
        'P' => ["#### ", "#   #", "#### ", "#    ", "#    "],
        'Q' => [" ### ", "#   #", "#   #", "#  ##", " ####"],
        'R' => ["#### ", "#   #", "#### ", "#  # ", "#   #"],
        'S' => [" ####", "#    ", " ### ", "    #", "#### "],
        'T' => ["#####", "  #  ", "  #  ", "  #  ", "  #  "],
        'U' => ["#   #", "#   #", "#   #", "#   #", " ### "],
        'V' => ["#   #", "#   #", "#   #", " # # ", "  #  "],
        'W' => ["#   #", "#   #", "# # #", "## ##", "#   #"],
        'X' => ["#   #", " # # ", "  #  ", " # # ", "#   #"],
        'Y' => ["#   #", " # # ", "  #  ", "  #  ", "  #  "],
        'Z' => ["#####", "   # ", "  #  ", " #   ", "#####"],
        ' ' => ["     "; 5],
        _ => return None,
    };
    Some(g)
}

/// Draw one character with its top-left at `(x, y)`.
pub fn draw_char<S: Surface + ?Sized>(surface: &mut S, x: i32, y: i32, ch: char, color: Rgb) {
    let Some(rows) = glyph(ch) else {
        return;
    };
    for (row, line) in rows.iter().enumerate() {
        for (col, cell) in line.bytes().enumerate() {
            if cell == b'#' {
                surface.set_pixel(x.saturating_add(col as i32), y.saturating_add(row as i32), color);
            }
        }
    }
}

/// Draw `text` left to right starting at `(x, y)`.
pub fn draw_text<S: Surface + ?Sized>(surface: &mut S, x: i32, y: i32, text: &str, color: Rgb) {
    for (i, ch) in text.chars().enumerate() {
        let dx = i32::try_from(i).unwrap_or(i32::MAX).saturating_mul(ADVANCE);
        draw_char(surface, x.saturating_add(dx), y, ch, color);
    }
}

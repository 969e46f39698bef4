//! 5x7 bitmap glyphs for detection labels.
//!
//! Covers the label alphabet ("Person" plus a formatted confidence). Other
//! characters render as blank cells so that label width stays predictable.

pub const GLYPH_WIDTH: u32 = 5;
pub const GLYPH_HEIGHT: u32 = 7;

/// Blank columns between adjacent glyphs, before scaling.
const GLYPH_SPACING: u32 = 1;

/// Row bitmaps, top to bottom; bit 4 is the leftmost column.
pub fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'e' => [0x00, 0x00, 0x0E, 0x11, 0x1F, 0x10, 0x0E],
        'n' => [0x00, 0x00, 0x16, 0x19, 0x11, 0x11, 0x11],
        'o' => [0x00, 0x00, 0x0E, 0x11, 0x11, 0x11, 0x0E],
        'r' => [0x00, 0x00, 0x16, 0x19, 0x10, 0x10, 0x10],
        's' => [0x00, 0x00, 0x0E, 0x10, 0x0E, 0x01, 0x1E],
        _ => return None,
    };
    Some(rows)
}

/// Horizontal distance from one glyph origin to the next.
pub fn advance(scale: u32) -> u32 {
    (GLYPH_WIDTH + GLYPH_SPACING) * scale
}

/// Pixel size `(width, height)` of `text` at `scale`, without trailing spacing.
pub fn text_size(text: &str, scale: u32) -> (u32, u32) {
    let chars = text.chars().count() as u32;
    if chars == 0 {
        return (0, 0);
    }
    let width = chars * advance(scale) - GLYPH_SPACING * scale;
    (width, GLYPH_HEIGHT * scale)
}

/// Top-left corners (relative to the text origin) of every lit cell in
/// `text`, each cell being `scale` x `scale` pixels.
pub fn lit_cells(text: &str, scale: u32) -> impl Iterator<Item = (i32, i32)> + '_ {
    text.chars().enumerate().flat_map(move |(i, ch)| {
        let origin_x = (i as u32 * advance(scale)) as i32;
        let rows = glyph(ch).unwrap_or([0; 7]);
        (0..GLYPH_HEIGHT).flat_map(move |row| {
            (0..GLYPH_WIDTH).filter_map(move |col| {
                let lit = (rows[row as usize] >> (GLYPH_WIDTH - 1 - col)) & 1 == 1;
                lit.then(|| {
                    (
                        origin_x + (col * scale) as i32,
                        (row * scale) as i32,
                    )
                })
            })
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_alphabet_is_covered() {
        for ch in "Person 0123456789.".chars().filter(|c| *c != ' ') {
            assert!(glyph(ch).is_some(), "missing glyph for {ch:?}");
        }
    }

    #[test]
    fn test_glyphs_fit_five_columns() {
        for ch in "Person0123456789.".chars() {
            for row in glyph(ch).unwrap() {
                assert!(row < 0x20, "glyph {ch:?} overflows 5 columns");
            }
        }
    }

    #[test]
    fn test_text_size_scales() {
        assert_eq!(text_size("", 2), (0, 0));
        assert_eq!(text_size("P", 1), (5, 7));
        assert_eq!(text_size("Person 0.87", 2), (11 * 12 - 2, 14));
    }

    #[test]
    fn test_lit_cells_for_period() {
        let cells: Vec<_> = lit_cells(".", 1).collect();
        assert_eq!(cells, vec![(1, 5), (2, 5), (1, 6), (2, 6)]);
    }

    #[test]
    fn test_space_has_no_lit_cells() {
        assert_eq!(lit_cells("  ", 3).count(), 0);
    }

    #[test]
    fn test_second_glyph_is_offset_by_advance() {
        let first: Vec<_> = lit_cells(".", 2).collect();
        let both: Vec<_> = lit_cells("..", 2).collect();
        assert_eq!(both.len(), first.len() * 2);
        assert!(both.contains(&(first[0].0 + advance(2) as i32, first[0].1)));
    }
}

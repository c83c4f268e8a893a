// Dialog and menu color styling
// ANSI named colors render differently across terminals; this maps the
// small palette the shell uses onto stable values when the terminal can
// express them, so dialogs and menu highlights look the same everywhere.

use ratatui::style::Color;
use term_color_support::ColorSupport;

/// Extension for the shell's palette colors.
pub trait Harmonize {
    /// Pin the color to a sampled RGB value (truecolor terminals) or a
    /// stable 256-color index, falling back to the plain ANSI variant.
    fn harmonize(self) -> Color;
}

/// Palette rows: ((R, G, B), 256-color index) sampled from the Windows
/// Terminal Campbell scheme.
fn palette(color: Color) -> Option<((u8, u8, u8), u8)> {
    match color {
        Color::Black => Some(((12, 12, 12), 232)),
        Color::Red => Some(((197, 15, 31), 160)),
        Color::Yellow => Some(((193, 156, 0), 178)),
        Color::Blue => Some(((0, 55, 218), 20)),
        Color::Gray => Some(((204, 204, 204), 250)),
        Color::DarkGray => Some(((118, 118, 118), 243)),
        Color::LightBlue => Some(((59, 120, 255), 63)),
        Color::LightYellow => Some(((249, 241, 165), 229)),
        Color::White => Some(((242, 242, 242), 255)),
        _ => None,
    }
}

impl Harmonize for Color {
    fn harmonize(self) -> Color {
        let Some((rgb, index)) = palette(self) else {
            // Custom RGB or indexed colors pass through untouched
            return self;
        };
        let support = ColorSupport::stdout();
        if support.has_16m {
            Color::Rgb(rgb.0, rgb.1, rgb.2)
        } else if support.has_256 {
            Color::Indexed(index)
        } else {
            self
        }
    }
}

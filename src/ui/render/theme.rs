use ratatui::style::{Color, Modifier, Style};

/// xterm-256 ramp from green through yellow to red, one step per bucket group.
const BUCKET_PALETTE: [u8; 12] = [46, 47, 48, 49, 149, 148, 179, 176, 169, 168, 197, 196];

pub(super) const OK_COLOR: Color = Color::Green;
pub(super) const BAD_COLOR: Color = Color::Red;
pub(super) const RATE_COLOR: Color = Color::LightCyan;

pub(super) const BAD_GLYPH: &str = "E";
pub(super) const OK_GLYPH: &str = "*";

pub(crate) fn bucket_color(idx: usize, buckets: usize) -> Color {
    let last = BUCKET_PALETTE.len().saturating_sub(1);
    let slot = idx
        .saturating_mul(BUCKET_PALETTE.len())
        .checked_div(buckets)
        .unwrap_or(0)
        .min(last);
    BUCKET_PALETTE
        .get(slot)
        .map_or(Color::Reset, |code| Color::Indexed(*code))
}

pub(super) fn status_style(status: u16) -> Style {
    if (200..300).contains(&status) {
        Style::default().fg(OK_COLOR)
    } else {
        Style::default().fg(BAD_COLOR)
    }
}

pub(super) fn rate_style() -> Style {
    Style::default().fg(RATE_COLOR).add_modifier(Modifier::BOLD)
}

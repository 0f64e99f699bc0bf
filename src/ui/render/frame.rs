use ratatui::{
    layout::{Constraint, Direction, Layout},
    prelude::{Backend, Frame},
    widgets::Paragraph,
};

use crate::ui::model::{HEADER_LINES, PlotArea, UiRenderData};

use super::header::header_lines;
use super::histogram::histogram_lines;

pub fn draw_frame<B: Backend>(f: &mut Frame<'_, B>, data: &UiRenderData, plot: PlotArea) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(HEADER_LINES), Constraint::Min(0)])
        .split(f.size());

    let (header_chunk, plot_chunk) = match chunks.as_ref() {
        [a, b] => (*a, *b),
        _ => return,
    };

    f.render_widget(Paragraph::new(header_lines(data)), header_chunk);
    f.render_widget(
        Paragraph::new(histogram_lines(data, plot.bar_width())),
        plot_chunk,
    );
}

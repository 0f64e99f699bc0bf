use ratatui::{
    style::Style,
    text::{Line, Span},
};

use crate::ui::model::{HistogramRow, UiRenderData, bar_lengths};

use super::theme::{BAD_COLOR, BAD_GLYPH, OK_COLOR, OK_GLYPH, bucket_color};

pub(crate) fn row_prefix(row: &HistogramRow) -> String {
    format!("{:>10} ms: [", row.label)
}

pub(super) fn histogram_lines(data: &UiRenderData, bar_width: usize) -> Vec<Line<'static>> {
    let buckets = data.rows.len();
    data.rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let (bad_len, ok_len) = bar_lengths(row.ok, row.bad, data.max_combined, bar_width);
            let bar_style = Style::default().fg(bucket_color(idx, buckets));
            Line::from(vec![
                Span::raw(row_prefix(row)),
                Span::styled(format!("{:6}", row.ok), Style::default().fg(OK_COLOR)),
                Span::raw("/"),
                Span::styled(format!("{:6}", row.bad), Style::default().fg(BAD_COLOR)),
                Span::raw("] "),
                Span::styled(BAD_GLYPH.repeat(bad_len), bar_style),
                Span::styled(OK_GLYPH.repeat(ok_len), bar_style),
            ])
        })
        .collect()
}

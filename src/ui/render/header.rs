use ratatui::{
    style::Style,
    text::{Line, Span},
};

use crate::metrics::FailureClass;
use crate::ui::model::UiRenderData;

use super::theme::{BAD_COLOR, rate_style, status_style};

pub(crate) fn counters_text(data: &UiRenderData) -> (String, String, String) {
    let counters = format!("sent: {:<6} in-flight: {:<2} ", data.sent, data.in_flight);
    let rate = format!(
        "rate: {:>4.0}/{:.0} RPS ",
        data.observed_rate, data.target_rate
    );
    let connections = format!(
        "conns: {} open, {} opened, {} closed",
        data.connections.current, data.connections.opened, data.connections.closed
    );
    (counters, rate, connections)
}

pub(super) fn header_lines(data: &UiRenderData) -> Vec<Line<'static>> {
    let (counters, rate, connections) = counters_text(data);
    let first = Line::from(vec![
        Span::raw(counters),
        Span::styled(rate, rate_style()),
        Span::raw(connections),
    ]);

    let mut responses = vec![Span::raw("responses: ")];
    for (status, count) in data.statuses.iter().filter(|(status, _)| *status != 0) {
        responses.push(Span::styled(
            format!("[{}]: {:<6} ", status, count),
            status_style(*status),
        ));
    }
    if data.status_out_of_range > 0 {
        responses.push(Span::styled(
            format!("[other]: {:<6} ", data.status_out_of_range),
            Style::default().fg(BAD_COLOR),
        ));
    }
    for class in FailureClass::ALL {
        let count = data.errors.get(class);
        if count > 0 {
            responses.push(Span::styled(
                format!("{}: {:<6} ", class, count),
                Style::default().fg(BAD_COLOR),
            ));
        }
    }

    vec![first, Line::from(responses), Line::from("")]
}

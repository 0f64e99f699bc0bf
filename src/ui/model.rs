use crate::engine::EngineSnapshot;
use crate::error::UiError;
use crate::http::ConnectionStats;
use crate::metrics::ErrorSnapshot;

/// Lines above the histogram: counters, responses, and a spacer.
pub const HEADER_LINES: u16 = 3;
/// Columns kept free for the row label and the `[ok/bad]` counts.
pub const RESERVED_WIDTH: u16 = 40;
pub const MIN_HISTOGRAM_ROWS: u16 = 3;

/// Terminal area available to the histogram, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotArea {
    pub width: u16,
    pub buckets: usize,
}

impl PlotArea {
    /// One histogram row per terminal line below the header.
    ///
    /// # Errors
    ///
    /// Returns an error when the terminal cannot fit a usable histogram.
    pub fn from_terminal(width: u16, height: u16) -> Result<Self, UiError> {
        if width <= RESERVED_WIDTH {
            return Err(UiError::TerminalTooNarrow {
                min: RESERVED_WIDTH.saturating_add(1),
                actual: width,
            });
        }
        let rows = height.saturating_sub(HEADER_LINES);
        if rows < MIN_HISTOGRAM_ROWS {
            return Err(UiError::TerminalTooShort {
                min: MIN_HISTOGRAM_ROWS,
                actual: rows,
            });
        }
        Ok(Self {
            width,
            buckets: usize::from(rows),
        })
    }

    /// Query the current terminal size.
    ///
    /// # Errors
    ///
    /// Returns an error when the size cannot be read or is too small.
    pub fn detect() -> Result<Self, UiError> {
        let (width, height) =
            crossterm::terminal::size().map_err(|source| UiError::TerminalSize { source })?;
        Self::from_terminal(width, height)
    }

    #[must_use]
    pub fn bar_width(&self) -> usize {
        usize::from(self.width.saturating_sub(RESERVED_WIDTH))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistogramRow {
    pub label: String,
    pub ok: u64,
    pub bad: u64,
}

/// Everything one frame needs, detached from the live counters.
#[derive(Debug, Clone, PartialEq)]
pub struct UiRenderData {
    pub sent: u64,
    pub in_flight: u64,
    pub observed_rate: f64,
    pub target_rate: f64,
    pub connections: ConnectionStats,
    pub statuses: Vec<(u16, u64)>,
    pub status_out_of_range: u64,
    pub errors: ErrorSnapshot,
    pub rows: Vec<HistogramRow>,
    pub max_combined: u64,
}

impl UiRenderData {
    #[must_use]
    pub fn from_snapshot(snapshot: &EngineSnapshot, labels: &[String]) -> Self {
        let histogram = &snapshot.stats.histogram;
        let rows = labels
            .iter()
            .enumerate()
            .map(|(idx, label)| HistogramRow {
                label: label.clone(),
                ok: histogram.ok.get(idx).copied().unwrap_or(0),
                bad: histogram.bad.get(idx).copied().unwrap_or(0),
            })
            .collect();
        Self {
            sent: snapshot.stats.sent,
            in_flight: snapshot.stats.in_flight,
            observed_rate: snapshot.stats.observed_rate,
            target_rate: snapshot.target_rate,
            connections: snapshot.connections,
            statuses: snapshot.stats.statuses.clone(),
            status_out_of_range: snapshot.stats.status_out_of_range,
            errors: snapshot.stats.errors,
            rows,
            max_combined: histogram.max_combined.max(1),
        }
    }
}

/// Bar segment lengths `(bad, ok)` scaled so the widest bucket fills
/// `bar_width` columns.
#[must_use]
pub fn bar_lengths(ok: u64, bad: u64, max_combined: u64, bar_width: usize) -> (usize, usize) {
    let bad_len = scaled_len(bad, max_combined, bar_width).min(bar_width);
    let ok_len = scaled_len(ok, max_combined, bar_width).min(bar_width.saturating_sub(bad_len));
    (bad_len, ok_len)
}

/// `floor(count * bar_width / max_combined)` in exact integer math.
fn scaled_len(count: u64, max_combined: u64, bar_width: usize) -> usize {
    let width = u128::try_from(bar_width).unwrap_or(u128::MAX);
    let scaled = u128::from(count)
        .checked_mul(width)
        .and_then(|product| product.checked_div(u128::from(max_combined.max(1))))
        .unwrap_or(width);
    usize::try_from(scaled).unwrap_or(bar_width)
}

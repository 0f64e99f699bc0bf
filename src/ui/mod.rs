//! Terminal dashboard: live counters and the latency histogram.
mod model;
mod render;


pub use model::{
    HEADER_LINES, HistogramRow, MIN_HISTOGRAM_ROWS, PlotArea, RESERVED_WIDTH, UiRenderData,
    bar_lengths,
};
pub use render::{Ui, UiActions, apply_command, draw_frame, run_dashboard};

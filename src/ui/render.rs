mod dashboard;
mod frame;
mod header;
mod histogram;
mod lifecycle;
mod theme;

pub use dashboard::{Ui, UiActions};
pub use frame::draw_frame;
pub use lifecycle::{apply_command, run_dashboard};

#[cfg(test)]
pub(crate) use header::counters_text;
#[cfg(test)]
pub(crate) use histogram::row_prefix;
#[cfg(test)]
pub(crate) use theme::bucket_color;

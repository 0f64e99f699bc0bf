use clap::Parser;

use crate::error::{AppError, AppResult};

use super::SlapperArgs;

pub(crate) fn parse_test_args<I, T>(args: I) -> AppResult<SlapperArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    SlapperArgs::try_parse_from(args).map_err(AppError::from)
}

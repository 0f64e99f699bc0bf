use slapper::error::AppResult;

fn main() -> AppResult<()> {
    slapper::entry::run()
}

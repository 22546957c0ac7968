use intraday_etl::{cli, utils};

fn main() {
    dotenv::dotenv().ok();
    utils::init_tracing();
    cli::run();
}

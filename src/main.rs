mod args;
mod tab;

use clap::Parser;
use log::{info, LevelFilter};
use snafu::ErrorCompat;

use crate::args::Args;
use crate::tab::chart::{render_chart, ChartView};

fn main() {
    let args = Args::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();

    info!("args: {:?}", args);

    let res = tab::run_survey(&args);

    if args.chart {
        let view = match &res {
            Ok(tabulation) => ChartView::new(&tabulation.title, &tabulation.tables),
            Err(e) => ChartView::Error(e.to_string()),
        };
        println!("{}", render_chart(&view));
    }

    if let Err(e) = res {
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("{}", bt);
        }
        std::process::exit(1);
    }
}

//! Builds the daily table from a workbook and writes it out.
//!
//! Usage: `build-daily-table <workbook.xlsx> [--csv out.csv] [--sqlite table.db] [--config build.json]`
//!
//! With no output flag the CSV goes to stdout.

use curvedesk::{BuildConfig, DailyTableBuilder, SqliteTableStore};
use std::fs::File;
use std::io::{self, BufWriter};

struct Args {
    workbook: String,
    csv: Option<String>,
    sqlite: Option<String>,
    config: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = std::env::args().skip(1);
    let mut workbook = None;
    let mut csv = None;
    let mut sqlite = None;
    let mut config = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--csv" => csv = Some(args.next().ok_or("--csv needs a path")?),
            "--sqlite" => sqlite = Some(args.next().ok_or("--sqlite needs a path")?),
            "--config" => config = Some(args.next().ok_or("--config needs a path")?),
            flag if flag.starts_with("--") => return Err(format!("unknown flag {}", flag)),
            path if workbook.is_none() => workbook = Some(path.to_string()),
            extra => return Err(format!("unexpected argument {}", extra)),
        }
    }

    Ok(Args {
        workbook: workbook.ok_or("missing workbook path")?,
        csv,
        sqlite,
        config,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();

    let args = parse_args().map_err(|msg| {
        eprintln!("usage: build-daily-table <workbook.xlsx> [--csv out.csv] [--sqlite table.db] [--config build.json]");
        msg
    })?;

    let config = match &args.config {
        Some(path) => BuildConfig::from_json_file(path)?,
        None => BuildConfig::default(),
    };
    let builder = DailyTableBuilder::new(config)?;
    let bytes = std::fs::read(&args.workbook)?;
    let table = builder.build_from_bytes(&bytes)?;

    if let Some(path) = &args.sqlite {
        let mut store = SqliteTableStore::new(path)?;
        let written = store.save_table(&table)?;
        tracing::info!("wrote {} values to {}", written, path);
    }

    match &args.csv {
        Some(path) => {
            table.write_csv(BufWriter::new(File::create(path)?))?;
            tracing::info!("wrote {} rows to {}", table.len(), path);
        }
        None if args.sqlite.is_none() => table.write_csv(io::stdout().lock())?,
        None => {}
    }

    Ok(())
}

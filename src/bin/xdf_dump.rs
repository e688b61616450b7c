//! A small CLI around [`xdf::load_path`]: decodes a file and prints a
//! summary of its streams, or (with `--verbose`) every sample.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use xdf::{TimeSeries, XdfOptions};

#[derive(Parser, Debug)]
#[command(about = "Decodes an XDF recording and prints a summary of its streams")]
struct Opt {
    /// Path to the .xdf file to decode.
    file: PathBuf,

    /// Print every decoded sample instead of just a per-stream summary.
    #[arg(short, long)]
    verbose: bool,

    /// Skip clock-offset synchronization.
    #[arg(long)]
    no_sync_clocks: bool,

    /// Skip jitter removal.
    #[arg(long)]
    no_dejitter: bool,

    /// Run `sync_timestamps` on the decoded streams before printing.
    #[arg(long)]
    sync: bool,

    /// Run `limit_to_overlap` on the decoded streams before printing.
    #[arg(long)]
    overlap: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let opt = Opt::parse();

    let options = XdfOptions {
        synchronize_clocks: !opt.no_sync_clocks,
        dejitter_timestamps: !opt.no_dejitter,
        ..XdfOptions::default()
    };

    let mut loaded = xdf::load_path(&opt.file, options)
        .with_context(|| format!("failed to decode {:?}", opt.file))?;

    if opt.sync {
        xdf::sync_timestamps(&mut loaded.streams);
    }
    if opt.overlap {
        xdf::limit_to_overlap(&mut loaded.streams);
    }

    println!("file header fields: {}", loaded.file_header.fields.len());
    for (key, value) in &loaded.file_header.fields {
        println!("  {key}: {value}");
    }

    for stream in &loaded.streams {
        let rows = stream.time_series.rows();
        println!(
            "stream {:>3} {:<20} type={:<10} channels={:<4} fmt={:?} srate(nominal)={:<8} srate(effective)={:<8.3} samples={rows}",
            stream.info.stream_id,
            stream.info.name,
            stream.info.r#type,
            stream.info.channel_count,
            stream.info.channel_format,
            stream.info.nominal_srate,
            stream.info.effective_srate,
        );

        if opt.verbose {
            match &stream.time_series {
                TimeSeries::Numeric(mat) => {
                    for (t, row) in stream.time_stamps.iter().zip(mat.rows()) {
                        println!("  {t:.6}: {:?}", row.to_vec());
                    }
                }
                TimeSeries::String(rows) => {
                    for (t, row) in stream.time_stamps.iter().zip(rows) {
                        println!("  {t:.6}: {row:?}");
                    }
                }
            }
        }
    }

    Ok(())
}

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ieegconn::io::{SeriesData, StWriter};
use ieegconn::{granger_connectivity, ContactMode, GrangerConfig};

#[derive(Parser)]
#[command(name = "covgc", about = "Single-trial covariance Granger causality between sEEG sites")]
struct Args {
    /// Series safetensors: `data` [C, T], optional `ch_names`
    #[arg(long)]
    input: PathBuf,

    /// Output safetensors path
    #[arg(long)]
    output: PathBuf,

    /// Window length in samples
    #[arg(long, default_value_t = 100)]
    dt: usize,

    /// Model order
    #[arg(long, default_value_t = 2)]
    lag: usize,

    /// Exclusive end of the window (default: end of the recording)
    #[arg(long)]
    t0: Option<usize>,

    /// Mask neighbouring contacts: soft | hard
    #[arg(long)]
    contact: Option<String>,

    /// OR-symmetrize the contact mask
    #[arg(long)]
    symmetrical: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let rec = SeriesData::load(&args.input)?;
    println!("Loaded {} sources × {} samples", rec.data.nrows(), rec.data.ncols());

    let contact_mode = args
        .contact
        .as_deref()
        .map(str::parse::<ContactMode>)
        .transpose()?;
    let cfg = GrangerConfig {
        dt: args.dt,
        lag: args.lag,
        t0: args.t0,
        contact_mode,
        symmetrical: args.symmetrical,
    };

    let res = granger_connectivity(&rec.data, &rec.ch_names, &cfg)
        .context("granger causality failed")?;
    println!("Computed {} pairs", res.output.pairs.nrows());

    let mut w = StWriter::new();
    w.add_f64_arr2("gc", &res.output.gc);
    w.add_index_arr2("pairs", &res.output.pairs);
    w.add_f64_arr2("directed", &res.matrices.directed);
    w.add_f64_arr2("instantaneous", &res.matrices.instantaneous);
    if let Some(mask) = &res.contact_mask {
        w.add_bool_arr2("contact_mask", mask);
    }
    if !rec.ch_names.is_empty() {
        w.add_strings("ch_names", &rec.ch_names);
    }
    w.write(&args.output)?;
    println!("Written → {}", args.output.display());

    Ok(())
}

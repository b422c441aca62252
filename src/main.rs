//! ip2asn - offline IP-to-ASN database tool
//!
//! This is the command-line interface for the ip2asn library.

#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ip2asn::{codec, feed, AsnDatabase, RangeTable};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

/// Get the version string for ip2asn
fn get_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(env!("CARGO_PKG_VERSION"), "-UNRELEASED")
    } else {
        env!("CARGO_PKG_VERSION")
    }
}

/// Command-line arguments for the database tool.
#[derive(Parser, Debug)]
#[clap(author, version, about = "Offline IP-to-ASN database tool", long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a database file from a TSV feed
    Build {
        /// Input feed (TSV: start, end, asn, country, org name)
        input: PathBuf,
        /// Output database file
        output: PathBuf,
        /// On-disk format to write
        #[clap(long, value_enum, default_value_t = FormatArg::Ultra)]
        format: FormatArg,
        /// Zlib-compress the output (asn2 only; ultra and ip2a always compress)
        #[clap(long)]
        compress: bool,
    },
    /// Look up one or more IP addresses in a database file
    Lookup {
        /// Database file
        database: PathBuf,
        /// Addresses to resolve
        addresses: Vec<String>,
        /// Output results in JSON format
        #[clap(long)]
        json: bool,
    },
    /// Show statistics about a database file
    Info {
        /// Database file
        database: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum FormatArg {
    Ultra,
    Ip2a,
    Asn2,
    Asnd,
}

/// JSON output structure for a single lookup
#[derive(Debug, serde::Serialize)]
struct JsonLookup {
    address: String,
    asn: Option<u32>,
    name: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    match args.command {
        Command::Build {
            input,
            output,
            format,
            compress,
        } => build(&input, &output, format, compress),
        Command::Lookup {
            database,
            addresses,
            json,
        } => lookup(&database, &addresses, json),
        Command::Info { database } => info(&database),
    }
}

fn build(input: &PathBuf, output: &PathBuf, format: FormatArg, compress: bool) -> Result<()> {
    let reader = BufReader::new(
        File::open(input).with_context(|| format!("cannot open feed {}", input.display()))?,
    );
    let records = feed::records(reader)
        .collect::<Result<Vec<_>, _>>()
        .context("reading feed")?;
    let table = RangeTable::from_records(records).context("building range table")?;

    let mut writer = BufWriter::new(
        File::create(output).with_context(|| format!("cannot create {}", output.display()))?,
    );
    match format {
        FormatArg::Ultra => codec::ultra::write(&table, &mut writer)?,
        FormatArg::Ip2a => codec::ip2a::write(&table, &mut writer)?,
        FormatArg::Asn2 => codec::asn2::write(&table, &mut writer, compress)?,
        FormatArg::Asnd => codec::asnd::write(&table, &mut writer)?,
    }
    writer.flush().context("flushing output")?;

    println!(
        "wrote {} ranges ({} ASNs) to {}",
        table.entry_count(),
        table.unique_asn_count(),
        output.display()
    );
    Ok(())
}

fn lookup(database: &PathBuf, addresses: &[String], json: bool) -> Result<()> {
    let db = AsnDatabase::load(database)
        .with_context(|| format!("cannot load {}", database.display()))?;

    if json {
        let results: Vec<JsonLookup> = addresses
            .iter()
            .map(|address| {
                let hit = db.lookup(address);
                JsonLookup {
                    address: address.clone(),
                    asn: hit.map(|(asn, _)| asn),
                    name: hit.and_then(|(_, name)| name.map(str::to_string)),
                }
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    for address in addresses {
        match db.lookup(address) {
            Some((asn, Some(name))) => println!("{address}\tAS{asn}\t{name}"),
            Some((asn, None)) => println!("{address}\tAS{asn}"),
            None => println!("{address}\t-"),
        }
    }
    Ok(())
}

fn info(database: &PathBuf) -> Result<()> {
    let db = AsnDatabase::load(database)
        .with_context(|| format!("cannot load {}", database.display()))?;
    let format = db
        .format()
        .map(|f| f.name().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    println!("ip2asn {}", get_version());
    println!("format:      {format}");
    println!("ranges:      {}", db.entry_count());
    println!("unique ASNs: {}", db.unique_asn_count());
    Ok(())
}

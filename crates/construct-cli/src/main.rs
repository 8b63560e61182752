use clap::Parser;
use log::*;

use construct_core::{BuildOptions, ParseOptions};

mod args;
mod demos;

use args::{Args, Command};

fn decode_hex(input: &str) -> anyhow::Result<Vec<u8>> {
    let input = input.trim();
    if input.len() % 2 != 0 {
        anyhow::bail!("hex input must have an even number of digits");
    }
    (0..input.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&input[i..i + 2], 16).map_err(anyhow::Error::from))
        .collect()
}

fn run(construct: &dyn construct_core::Construct, bytes: Vec<u8>) -> anyhow::Result<()> {
    let value = construct_core::parse_bytes(bytes, construct, &ParseOptions::default())?;
    info!("parsed: {value:?}");

    let rebuilt = construct_core::to_bytes(&value, construct, &BuildOptions::default())?;
    info!("rebuilt: {}", rebuilt.iter().map(|b| format!("{b:02x}")).collect::<String>());

    Ok(())
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::formatted_builder()
        .format_indent(None)
        .format_timestamp(None)
        .filter_level(LevelFilter::Info)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Bmp { input } => run(demos::bmp_record().as_ref(), decode_hex(&input)?),
        Command::RespSimple { input } => run(demos::resp_simple_string().as_ref(), decode_hex(&input)?),
        Command::RespBulk { input } => run(demos::resp_bulk_string().as_ref(), decode_hex(&input)?),
        Command::RespArray { input } => run(demos::resp_message().as_ref(), decode_hex(&input)?),
        Command::Bitfields { input } => run(demos::bitfields().as_ref(), decode_hex(&input)?),
    }
}

use clap::{Parser, Subcommand};

/// User-specified command line parameters.
#[derive(Debug, Parser)]
#[clap(name = "construct-cli", about)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parses a BMP-style record: signature, width, height, then width*height pixel bytes.
    Bmp {
        /// Hex-encoded input bytes, e.g. 424d500302...
        input: String,
    },
    /// Parses a RESP simple string (a Line-terminated value).
    RespSimple {
        input: String,
    },
    /// Parses a RESP bulk string.
    RespBulk {
        input: String,
    },
    /// Parses a recursive RESP array of mixed types.
    RespArray {
        input: String,
    },
    /// Parses two bit fields ("a": 3 bits, "b": 5 bits) from a single byte.
    Bitfields {
        input: String,
    },
}

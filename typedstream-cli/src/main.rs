use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use typedstream::{archiver::unarchiver::Unarchiver, stream::reader::TypedStreamReader};

use crate::app::error::RuntimeError;

mod app;
mod dump;

#[derive(Parser)]
#[command(name = "typedstream")]
#[command(
    about = "Dump typedstream files produced by NSArchiver and the NeXTSTEP NXTypedStream APIs",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read and display the raw contents of a typedstream.
    ///
    /// All information is displayed as it is stored in the stream and is
    /// processed as little as possible; in particular, references are not
    /// resolved, although reference numbers are displayed so they can be
    /// followed manually.
    Read {
        /// The typedstream file to read, or - for stdin
        file: String,
    },
    /// Read, decode and display the contents of a typedstream.
    ///
    /// Objects are decoded based on their class where the format is known;
    /// objects of unknown classes are displayed in a generic form based on
    /// the raw typedstream data.
    Decode {
        /// The typedstream file to read, or - for stdin
        file: String,
    },
}

fn read_input(file: &str) -> Result<Vec<u8>, RuntimeError> {
    if file == "-" {
        let mut data = vec![];
        io::stdin()
            .read_to_end(&mut data)
            .map_err(RuntimeError::DiskError)?;
        return Ok(data);
    }
    fs::read(file).map_err(|why| RuntimeError::ReadError(why, PathBuf::from(file)))
}

fn run(cli: &Cli) -> Result<(), RuntimeError> {
    match &cli.command {
        Commands::Read { file } => {
            let data = read_input(file)?;
            let reader = TypedStreamReader::new(&data).map_err(RuntimeError::StreamError)?;
            for line in dump::dump_events(reader).map_err(RuntimeError::StreamError)? {
                println!("{line}");
            }
        }
        Commands::Decode { file } => {
            let data = read_input(file)?;
            let mut unarchiver =
                Unarchiver::from_bytes(&data).map_err(RuntimeError::ArchiveError)?;
            for line in dump::dump_decoded(&mut unarchiver).map_err(RuntimeError::ArchiveError)? {
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(why) => {
            eprintln!("{why}");
            ExitCode::FAILURE
        }
    }
}

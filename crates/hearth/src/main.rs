//! Hearth command line tool
//!
//! ## Usage
//!
//! ```bash
//! # Decompress a packed asset next to itself (game.pck.br -> game.pck)
//! hearth decompress game.pck.br
//!
//! # Explicit format, output and read size
//! hearth decompress engine.wasm.zst -o engine.wasm --format zst --chunk-size 16384
//!
//! # Validate the worker data of a web export
//! hearth check-worker-data service-worker-data.json
//! ```

use std::error::Error;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use hearth::offline::WorkerData;
use hearth::stream::{open_session, DecompressReader, DEFAULT_CHUNK_SIZE};
use hearth::{Algorithm, StreamingDecompressor};

#[derive(Parser, Debug)]
#[command(name = "hearth")]
#[command(version)]
#[command(about = "Hearth web export asset tool", long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream a compressed file through a decompression session
    Decompress {
        /// Compressed input file
        input: PathBuf,

        /// Output file (defaults to the input without its extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Input format (detected from the extension when omitted)
        #[arg(long, value_enum)]
        format: Option<Format>,

        /// Bytes read from the input per chunk
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },

    /// Validate a worker data file and print its full cache set
    CheckWorkerData {
        /// Path to service-worker-data.json
        file: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Br,
    Zst,
}

impl From<Format> for Algorithm {
    fn from(format: Format) -> Self {
        match format {
            Format::Br => Algorithm::Brotli,
            Format::Zst => Algorithm::Zstd,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Decompress {
            input,
            output,
            format,
            chunk_size,
        } => decompress(&input, output, format, chunk_size),
        Command::CheckWorkerData { file } => check_worker_data(&file),
    }
}

/// Algorithm and output path for a decompress run
fn plan(
    input: &Path,
    output: Option<PathBuf>,
    format: Option<Format>,
) -> Result<(Algorithm, PathBuf), Box<dyn Error>> {
    let algorithm = match format {
        Some(format) => format.into(),
        None => Algorithm::from_path(&input.to_string_lossy()).ok_or_else(|| {
            format!(
                "cannot detect the format of {}, pass --format br|zst",
                input.display()
            )
        })?,
    };

    let output = output.unwrap_or_else(|| input.with_extension(""));
    if output == input {
        return Err(format!(
            "output would overwrite {}, pass -o <output>",
            input.display()
        )
        .into());
    }
    Ok((algorithm, output))
}

fn decompress(
    input: &Path,
    output: Option<PathBuf>,
    format: Option<Format>,
    chunk_size: usize,
) -> Result<(), Box<dyn Error>> {
    let (algorithm, output) = plan(input, output, format)?;
    debug!(
        "Decompressing {} ({}) in {} byte chunks",
        input.display(),
        algorithm,
        chunk_size
    );

    let session = open_session(algorithm)?;
    let mut reader = DecompressReader::with_chunk_size(File::open(input)?, session, chunk_size);

    // Decode next to the output and only rename once the stream is complete
    let partial = partial_path(&output);
    if let Err(e) = write_file(&mut reader, &partial) {
        if let Err(cleanup) = fs::remove_file(&partial) {
            debug!("Could not remove {}: {}", partial.display(), cleanup);
        }
        return Err(e.into());
    }
    fs::rename(&partial, &output)?;

    let stats = reader.session().stats();
    info!(
        "Wrote {}: {} -> {} bytes ({:.2}x, {} chunks out, {} engine steps)",
        output.display(),
        stats.bytes_in,
        stats.bytes_out,
        stats.expansion(),
        stats.chunks_out,
        stats.engine_steps
    );
    Ok(())
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn write_file(reader: &mut impl Read, path: &Path) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    io::copy(reader, &mut writer)?;
    writer.flush()
}

fn check_worker_data(file: &Path) -> Result<(), Box<dyn Error>> {
    let text = fs::read_to_string(file)?;
    let data = WorkerData::from_json(&text)?;

    info!(
        "{} is valid: cache {} (prefix {:?}), offline page {}",
        file.display(),
        data.cache.name,
        data.cache.prefix,
        data.offline_url
    );
    if data.ensure_cross_origin_isolation_headers {
        info!("Cross-origin isolation headers will be added to served responses");
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for entry in data.full_cache() {
        writeln!(out, "{entry}")?;
    }
    Ok(())
}

// Command-line front end for fossil-delta.
//
// Subcommands map onto the library boundary: create / apply / batch for
// producing and consuming deltas, size / analyze / records for inspecting
// them, and config for build details.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};

use crate::compress::{self, Compression};
use crate::delta::{DecodeError, Record, Records};
use crate::engine::{self, DeltaOptions};
use crate::hash::config::{DEFAULT_SEARCH_LIMIT, DEFAULT_WINDOW_SIZE, MAX_WINDOW_SIZE};
use crate::io::{self as file_io, ApplyStats, CreateStats};

const DEFAULT_ZLIB_LEVEL: u32 = 6;

// ---------------------------------------------------------------------------
// Byte size parsing (supports K suffix)
// ---------------------------------------------------------------------------

fn parse_byte_size(s: &str) -> Result<usize, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty size string".into());
    }
    let (num_part, multiplier) = match s.as_bytes().last() {
        Some(b'k' | b'K') => (&s[..s.len() - 1], 1024usize),
        _ => (s, 1usize),
    };
    let num: usize = num_part
        .trim()
        .parse()
        .map_err(|e| format!("invalid size '{s}': {e}"))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size overflow: '{s}'"))
}

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Fossil-style binary delta encoder/decoder.
#[derive(Parser, Debug)]
#[command(
    name = "fossil-delta",
    version,
    about = "Fossil-style binary delta encoder/decoder",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Emit stats and listings as JSON.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Create a delta that turns SOURCE into TARGET.
    Create(CreateArgs),
    /// Apply a delta to SOURCE.
    Apply(ApplyArgs),
    /// Apply several deltas in order, each to the previous result.
    Batch(BatchArgs),
    /// Print the target length declared by a delta.
    Size(InspectArgs),
    /// Print copied / inserted byte totals of a delta.
    Analyze(InspectArgs),
    /// List the records of a delta.
    Records(InspectArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CompressArg {
    None,
    Zlib,
    Lzma,
}

#[derive(Args, Debug)]
struct CompressArgs {
    /// Compressor applied to the whole delta.
    #[arg(long, value_enum, default_value_t = CompressArg::None)]
    compress: CompressArg,

    /// Zlib compression level (0-9).
    #[arg(long, short = 'l', value_parser = clap::value_parser!(u32).range(0..=9), default_value_t = DEFAULT_ZLIB_LEVEL)]
    level: u32,
}

#[derive(Args, Debug)]
struct CreateArgs {
    /// Source (old) file.
    #[arg(long, short = 's', value_hint = ValueHint::FilePath)]
    source: PathBuf,

    /// Hash window / block size in bytes (power of two).
    #[arg(long = "window-size", short = 'w', value_parser = parse_byte_size, default_value_t = DEFAULT_WINDOW_SIZE)]
    window_size: usize,

    /// Index candidates examined per target position.
    #[arg(long = "search-depth", short = 'd', default_value_t = DEFAULT_SEARCH_LIMIT)]
    search_depth: usize,

    #[command(flatten)]
    compress: CompressArgs,

    /// Write to stdout even if an output path is given.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Target (new) file.
    #[arg(value_hint = ValueHint::FilePath)]
    target: PathBuf,

    /// Delta output file (stdout if omitted).
    #[arg(value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// Source (old) file.
    #[arg(long, short = 's', value_hint = ValueHint::FilePath)]
    source: PathBuf,

    /// Skip checksum verification of the output.
    #[arg(long = "no-checksum")]
    no_checksum: bool,

    #[command(flatten)]
    compress: CompressArgs,

    /// Write to stdout even if an output path is given.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Delta file.
    #[arg(value_hint = ValueHint::FilePath)]
    delta: PathBuf,

    /// Output file (stdout if omitted).
    #[arg(value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Source (old) file.
    #[arg(long, short = 's', value_hint = ValueHint::FilePath)]
    source: PathBuf,

    /// Delta file; repeat to apply several in order.
    #[arg(long = "delta", short = 'p', value_name = "DELTA", value_hint = ValueHint::FilePath, action = ArgAction::Append, required = true)]
    deltas: Vec<PathBuf>,

    /// Skip checksum verification of each intermediate output.
    #[arg(long = "no-checksum")]
    no_checksum: bool,

    #[command(flatten)]
    compress: CompressArgs,

    /// Write to stdout even if an output path is given.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Output file (stdout if omitted).
    #[arg(value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Delta file.
    #[arg(value_hint = ValueHint::FilePath)]
    delta: PathBuf,

    /// Compressor the delta was stored with.
    #[arg(long, value_enum, default_value_t = CompressArg::None)]
    compress: CompressArg,
}

// ---------------------------------------------------------------------------
// Resolved options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Create,
    Apply,
    Batch,
    Size,
    Analyze,
    Records,
    Config,
}

struct Options {
    command: Command,
    use_stdout: bool,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    window_size: usize,
    search_depth: usize,
    compress: CompressArg,
    level: u32,
    no_checksum: bool,
    source_file: Option<PathBuf>,
    input_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
    batch_deltas: Vec<PathBuf>,
}

impl Options {
    fn base(command: Command, cli_globals: (bool, bool, u8, bool)) -> Self {
        let (force, quiet, verbose, json_output) = cli_globals;
        Self {
            command,
            use_stdout: false,
            force,
            quiet,
            verbose,
            json_output,
            window_size: DEFAULT_WINDOW_SIZE,
            search_depth: DEFAULT_SEARCH_LIMIT,
            compress: CompressArg::None,
            level: DEFAULT_ZLIB_LEVEL,
            no_checksum: false,
            source_file: None,
            input_file: None,
            output_file: None,
            batch_deltas: Vec::new(),
        }
    }
}

fn resolve_options(cli: Cli) -> Options {
    let globals = (cli.force, cli.quiet, cli.verbose.min(2), cli.json_output);

    match cli.command {
        Cmd::Create(args) => Options {
            use_stdout: args.stdout,
            window_size: args.window_size,
            search_depth: args.search_depth,
            compress: args.compress.compress,
            level: args.compress.level,
            source_file: Some(args.source),
            input_file: Some(args.target),
            output_file: args.output,
            ..Options::base(Command::Create, globals)
        },
        Cmd::Apply(args) => Options {
            use_stdout: args.stdout,
            compress: args.compress.compress,
            level: args.compress.level,
            no_checksum: args.no_checksum,
            source_file: Some(args.source),
            input_file: Some(args.delta),
            output_file: args.output,
            ..Options::base(Command::Apply, globals)
        },
        Cmd::Batch(args) => Options {
            use_stdout: args.stdout,
            compress: args.compress.compress,
            level: args.compress.level,
            no_checksum: args.no_checksum,
            source_file: Some(args.source),
            output_file: args.output,
            batch_deltas: args.deltas,
            ..Options::base(Command::Batch, globals)
        },
        Cmd::Size(args) => Options {
            compress: args.compress,
            input_file: Some(args.delta),
            ..Options::base(Command::Size, globals)
        },
        Cmd::Analyze(args) => Options {
            compress: args.compress,
            input_file: Some(args.delta),
            ..Options::base(Command::Analyze, globals)
        },
        Cmd::Records(args) => Options {
            compress: args.compress,
            input_file: Some(args.delta),
            ..Options::base(Command::Records, globals)
        },
        Cmd::Config => Options::base(Command::Config, globals),
    }
}

// ---------------------------------------------------------------------------
// Options -> library configuration
// ---------------------------------------------------------------------------

fn build_compression(arg: CompressArg, level: u32) -> Result<Compression, String> {
    match arg {
        CompressArg::None => Ok(Compression::None),
        #[cfg(feature = "zlib")]
        CompressArg::Zlib => Ok(Compression::Zlib { level }),
        #[cfg(not(feature = "zlib"))]
        CompressArg::Zlib => {
            let _ = level;
            Err("zlib support requires the 'zlib' feature".into())
        }
        #[cfg(feature = "lzma")]
        CompressArg::Lzma => Ok(Compression::Lzma),
        #[cfg(not(feature = "lzma"))]
        CompressArg::Lzma => Err("lzma support requires the 'lzma' feature".into()),
    }
}

fn build_delta_options(opts: &Options) -> Result<DeltaOptions, String> {
    let options = DeltaOptions {
        window_size: opts.window_size,
        search_depth: opts.search_depth,
        compression: build_compression(opts.compress, opts.level)?,
        verify_checksum: !opts.no_checksum,
    };
    options.validate().map_err(|e| e.to_string())?;
    Ok(options)
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn fail(msg: impl std::fmt::Display) -> i32 {
    eprintln!("fossil-delta: {msg}");
    1
}

fn read_input(what: &str, path: &Path) -> Result<Vec<u8>, String> {
    std::fs::read(path).map_err(|e| format!("{what}: {}: {e}", path.display()))
}

/// Output path to write, or `None` for stdout. Refuses to clobber without -f.
fn output_target(opts: &Options) -> Result<Option<&Path>, String> {
    match (&opts.output_file, opts.use_stdout) {
        (Some(path), false) => {
            if path.exists() && !opts.force {
                return Err(format!(
                    "output file exists, use -f to overwrite: {}",
                    path.display()
                ));
            }
            Ok(Some(path))
        }
        _ => Ok(None),
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => eprintln!("{s}"),
        Err(e) => eprintln!("fossil-delta: cannot render stats: {e}"),
    }
}

fn hex_digest(digest: Option<[u8; 32]>) -> Option<String> {
    digest.map(|d| d.iter().map(|b| format!("{b:02x}")).collect())
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("fossil-delta version {version}");

    let zlib = cfg!(feature = "zlib") as u8;
    let lzma = cfg!(feature = "lzma") as u8;
    let file_io = cfg!(feature = "file-io") as u8;
    let parallel = cfg!(feature = "parallel") as u8;

    eprintln!("COMPRESS_ZLIB={zlib}");
    eprintln!("COMPRESS_LZMA={lzma}");
    eprintln!("FILE_IO={file_io}");
    eprintln!("PARALLEL={parallel}");
    eprintln!("DEFAULT_WINDOW_SIZE={DEFAULT_WINDOW_SIZE}");
    eprintln!("DEFAULT_SEARCH_DEPTH={DEFAULT_SEARCH_LIMIT}");
    eprintln!("MAX_WINDOW_SIZE={MAX_WINDOW_SIZE}");
    eprintln!("DEFAULT_ZLIB_LEVEL={DEFAULT_ZLIB_LEVEL}");

    0
}

// ---------------------------------------------------------------------------
// Create command
// ---------------------------------------------------------------------------

fn cmd_create(opts: &Options) -> i32 {
    let options = match build_delta_options(opts) {
        Ok(o) => o,
        Err(e) => return fail(e),
    };
    let (Some(source_path), Some(target_path)) = (&opts.source_file, &opts.input_file) else {
        return fail("create needs a source and a target");
    };
    let output = match output_target(opts) {
        Ok(o) => o,
        Err(e) => return fail(e),
    };

    let result = match output {
        Some(delta_path) => file_io::create_file(source_path, target_path, delta_path, &options),
        None => {
            let source = match read_input("source file", source_path) {
                Ok(s) => s,
                Err(e) => return fail(e),
            };
            let target = match File::open(target_path) {
                Ok(f) => f,
                Err(e) => return fail(format!("target file: {}: {e}", target_path.display())),
            };
            file_io::create_stream(&source, target, io::stdout().lock(), &options)
        }
    };

    match result {
        Ok(stats) => {
            report_create(opts, &options, &stats);
            0
        }
        Err(e) => fail(e),
    }
}

fn report_create(opts: &Options, options: &DeltaOptions, stats: &CreateStats) {
    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "fossil-delta: create: source size: {}, target size: {}, delta size: {}",
            stats.source_size, stats.target_size, stats.delta_size
        );
    }
    if opts.json_output {
        print_json(&serde_json::json!({
            "command": "create",
            "source_size": stats.source_size,
            "target_size": stats.target_size,
            "delta_size": stats.delta_size,
            "window_size": options.window_size,
            "search_depth": options.search_depth,
            "compression": options.compression.name(),
            "target_sha256": hex_digest(stats.target_sha256),
        }));
    }
}

// ---------------------------------------------------------------------------
// Apply command
// ---------------------------------------------------------------------------

fn cmd_apply(opts: &Options) -> i32 {
    let options = match build_delta_options(opts) {
        Ok(o) => o,
        Err(e) => return fail(e),
    };
    let (Some(source_path), Some(delta_path)) = (&opts.source_file, &opts.input_file) else {
        return fail("apply needs a source and a delta");
    };
    let output = match output_target(opts) {
        Ok(o) => o,
        Err(e) => return fail(e),
    };

    let result = match output {
        Some(output_path) => file_io::apply_file(source_path, delta_path, output_path, &options),
        None => {
            let source = match read_input("source file", source_path) {
                Ok(s) => s,
                Err(e) => return fail(e),
            };
            let delta = match File::open(delta_path) {
                Ok(f) => f,
                Err(e) => return fail(format!("delta file: {}: {e}", delta_path.display())),
            };
            file_io::apply_stream(&source, delta, io::stdout().lock(), &options)
        }
    };

    match result {
        Ok(stats) => {
            report_apply(opts, "apply", &stats);
            0
        }
        Err(e) => fail(e),
    }
}

fn report_apply(opts: &Options, command: &str, stats: &ApplyStats) {
    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "fossil-delta: {command}: source size: {}, delta size: {}, output size: {}",
            stats.source_size, stats.delta_size, stats.output_size
        );
    }
    if opts.json_output {
        print_json(&serde_json::json!({
            "command": command,
            "source_size": stats.source_size,
            "delta_size": stats.delta_size,
            "output_size": stats.output_size,
            "output_sha256": hex_digest(stats.output_sha256),
        }));
    }
}

// ---------------------------------------------------------------------------
// Batch command
// ---------------------------------------------------------------------------

fn cmd_batch(opts: &Options) -> i32 {
    let options = match build_delta_options(opts) {
        Ok(o) => o,
        Err(e) => return fail(e),
    };
    let Some(source_path) = &opts.source_file else {
        return fail("batch needs a source");
    };
    let output = match output_target(opts) {
        Ok(o) => o,
        Err(e) => return fail(e),
    };

    let source = match read_input("source file", source_path) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let mut deltas = Vec::with_capacity(opts.batch_deltas.len());
    for path in &opts.batch_deltas {
        match read_input("delta file", path) {
            Ok(d) => deltas.push(d),
            Err(e) => return fail(e),
        }
    }

    let result = match engine::apply_batch(&source, &deltas, &options) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    let written = match output {
        Some(path) => File::create(path).and_then(|mut f| f.write_all(&result)),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&result).and_then(|()| stdout.flush())
        }
    };
    if let Err(e) = written {
        return fail(format!("write error: {e}"));
    }

    let stats = ApplyStats {
        source_size: source.len() as u64,
        delta_size: deltas.iter().map(|d| d.len() as u64).sum(),
        output_size: result.len() as u64,
        output_sha256: file_io::sha256(&result),
    };
    report_apply(opts, "batch", &stats);
    0
}

// ---------------------------------------------------------------------------
// Inspection commands
// ---------------------------------------------------------------------------

/// Read a delta and undo `--compress`, if any.
fn load_delta(opts: &Options) -> Result<Vec<u8>, String> {
    let Some(path) = &opts.input_file else {
        return Err("missing delta file".into());
    };
    let raw = read_input("delta file", path)?;
    let compression = build_compression(opts.compress, opts.level)?;
    compress::decompress_delta(&raw, &compression)
        .map(|d| d.into_owned())
        .map_err(|e| e.to_string())
}

fn cmd_size(opts: &Options) -> i32 {
    let delta = match load_delta(opts) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };
    match engine::output_size(&delta) {
        Ok(size) => {
            if opts.json_output {
                println!("{}", serde_json::json!({ "target_size": size }));
            } else {
                println!("{size}");
            }
            0
        }
        Err(e) => fail(e),
    }
}

fn cmd_analyze(opts: &Options) -> i32 {
    let delta = match load_delta(opts) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };
    let stats = match engine::analyze(&delta) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    if opts.json_output {
        println!(
            "{}",
            serde_json::json!({
                "target_size": stats.target_len,
                "bytes_copied": stats.bytes_copied,
                "bytes_inserted": stats.bytes_inserted,
                "copy_records": stats.copy_records,
                "literal_records": stats.literal_records,
                "checksum": stats.checksum,
                "delta_size": delta.len(),
            })
        );
    } else {
        println!("target size:      {}", stats.target_len);
        println!("bytes copied:     {}", stats.bytes_copied);
        println!("bytes inserted:   {}", stats.bytes_inserted);
        println!("copy records:     {}", stats.copy_records);
        println!("literal records:  {}", stats.literal_records);
        println!("checksum:         {:#010x}", stats.checksum);
    }
    0
}

/// Why a record listing stopped early.
#[derive(Debug)]
enum ListingError {
    Decode(DecodeError),
    Write(io::Error),
}

impl From<io::Error> for ListingError {
    fn from(e: io::Error) -> Self {
        Self::Write(e)
    }
}

fn cmd_records(opts: &Options) -> i32 {
    let delta = match load_delta(opts) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };
    let records = match Records::new(&delta) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    let mut out = io::stdout().lock();
    match write_records(records, opts.json_output, &mut out) {
        Ok(()) => 0,
        Err(ListingError::Decode(e)) => fail(e),
        Err(ListingError::Write(e)) => {
            // Usually a closed pipe; stdout is gone, so exit quietly.
            log::debug!("record listing stopped: {e}");
            1
        }
    }
}

/// Write one line per record, or a single JSON document with `json`.
fn write_records<W: Write>(
    mut records: Records<'_>,
    json: bool,
    out: &mut W,
) -> Result<(), ListingError> {
    let mut json_records = Vec::new();
    if !json {
        writeln!(out, "target length {}", records.target_len())?;
    }

    let mut produced = 0u64;
    for record in records.by_ref() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                out.flush()?;
                return Err(ListingError::Decode(e));
            }
        };
        if json {
            json_records.push(match record {
                Record::Literal(bytes) => serde_json::json!({ "literal": bytes.len() }),
                Record::Copy { len, offset } => {
                    serde_json::json!({ "copy": len, "offset": offset })
                }
                Record::Checksum(sum) => serde_json::json!({ "checksum": sum }),
            });
            continue;
        }
        let line = match record {
            Record::Literal(bytes) => {
                let line = format!("{produced:>10}  literal {:>10}", bytes.len());
                produced += bytes.len() as u64;
                line
            }
            Record::Copy { len, offset } => {
                let line = format!("{produced:>10}  copy    {len:>10} @ {offset}");
                produced += u64::from(len);
                line
            }
            Record::Checksum(sum) => format!("{produced:>10}  checksum {sum:#010x}"),
        };
        writeln!(out, "{line}")?;
    }

    if json {
        let value = serde_json::json!({
            "target_size": records.target_len(),
            "records": json_records,
        });
        writeln!(out, "{value}")?;
    }
    out.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let mut opts = resolve_options(cli);

    let default_filter = match opts.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    if opts.use_stdout
        && let Some(path) = opts.output_file.take()
        && !opts.quiet
    {
        log::warn!("-c option overrides output filename: {}", path.display());
    }

    let exit_code = match opts.command {
        Command::Create => cmd_create(&opts),
        Command::Apply => cmd_apply(&opts),
        Command::Batch => cmd_batch(&opts),
        Command::Size => cmd_size(&opts),
        Command::Analyze => cmd_analyze(&opts),
        Command::Records => cmd_records(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Command-line interface module

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::conversion::{ConverterRegistry, Engine, EngineConfig, ParseStatistics, ReadEvent};
use crate::error::{EngineError, EngineResult, ErrorKind, FieldConversionError, SchemaError};
use crate::model::RecordNode;
use crate::schema::Schema;

/// Main CLI arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "flatconv")]
#[command(about = "Parse and format flat-file records described by a JSON schema")]
#[command(version = "0.1.0")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Parse flat records into JSON, one object per line
    Parse(ParseArgs),
    /// Format JSON objects, one per line, into flat records
    Format(FormatArgs),
    /// Load and check a schema
    Validate {
        /// Schema file (JSON)
        #[arg(long)]
        schema: PathBuf,
    },
}

/// Arguments of `flatconv parse`
#[derive(clap::Args, Debug, Clone)]
pub struct ParseArgs {
    /// Schema file (JSON)
    #[arg(long)]
    pub schema: PathBuf,

    /// Input file of flat records
    #[arg()]
    pub input: Option<PathBuf>,

    /// Read records from standard input
    #[arg(long)]
    pub stdin: bool,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Skip lines no record definition matches instead of failing
    #[arg(long)]
    pub lenient: bool,

    /// Character encoding of the input (e.g. UTF-8, ISO-8859-1, windows-1252)
    #[arg(long, default_value = "UTF-8")]
    pub encoding: String,

    /// Keep parsing after a record fails structurally
    #[arg(long)]
    pub continue_on_error: bool,

    /// Print session statistics to stderr
    #[arg(long)]
    pub stats: bool,
}

/// Arguments of `flatconv format`
#[derive(clap::Args, Debug, Clone)]
pub struct FormatArgs {
    /// Schema file (JSON)
    #[arg(long)]
    pub schema: PathBuf,

    /// Input file of JSON records, one per line
    #[arg()]
    pub input: Option<PathBuf>,

    /// Read JSON records from standard input
    #[arg(long)]
    pub stdin: bool,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Terminate lines with CRLF instead of LF
    #[arg(long)]
    pub crlf: bool,

    /// Character encoding of the written records
    #[arg(long, default_value = "UTF-8")]
    pub encoding: String,

    /// Keep formatting after a record fails structurally
    #[arg(long)]
    pub continue_on_error: bool,

    /// Print session statistics to stderr
    #[arg(long)]
    pub stats: bool,
}

impl ParseArgs {
    /// Engine configuration selected by the flags
    pub fn engine_config(&self) -> EngineConfig {
        let config = if self.lenient {
            EngineConfig::lenient()
        } else {
            EngineConfig::strict()
        };
        config.with_encoding(&self.encoding)
    }
}

impl FormatArgs {
    pub fn engine_config(&self) -> EngineConfig {
        let config = EngineConfig::default().with_encoding(&self.encoding);
        if self.crlf {
            config.with_record_separator("\r\n")
        } else {
            config
        }
    }
}

/// Run the selected subcommand
pub fn run(args: &Args) -> EngineResult<()> {
    match &args.command {
        Commands::Parse(parse) => run_parse(parse, args.quiet),
        Commands::Format(format) => run_format(format, args.quiet),
        Commands::Validate { schema } => run_validate(schema, args.quiet),
    }
}

/// Load a schema and build an engine with the built-in converters
pub fn load_engine(schema_path: &Path, config: EngineConfig) -> EngineResult<Engine> {
    let schema = Schema::from_path(schema_path)?;
    let registry = ConverterRegistry::with_builtins();
    Ok(Engine::new(Arc::new(schema), Arc::new(registry), config)?)
}

fn open_input(input: Option<&Path>, stdin: bool) -> EngineResult<Box<dyn Read>> {
    if stdin {
        Ok(Box::new(io::stdin().lock()))
    } else if let Some(path) = input {
        if !path.is_file() {
            return Err(anyhow::anyhow!("Input path does not exist: {}", path.display()).into());
        }
        Ok(Box::new(File::open(path)?))
    } else {
        Err(anyhow::anyhow!("No input provided. Use --stdin or provide an input path").into())
    }
}

fn open_output(output: Option<&Path>) -> EngineResult<Box<dyn Write>> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Ok(Box::new(io::BufWriter::new(File::create(path)?)))
        }
        None => Ok(Box::new(io::BufWriter::new(io::stdout().lock()))),
    }
}

fn report_field_errors(errors: Vec<FieldConversionError>, quiet: bool) {
    if quiet {
        return;
    }
    for error in errors {
        CliUtils::show_warning(&EngineError::from(error).user_message(), quiet);
    }
}

fn run_parse(args: &ParseArgs, quiet: bool) -> EngineResult<()> {
    let engine = load_engine(&args.schema, args.engine_config())?;
    let input = open_input(args.input.as_deref(), args.stdin)?;
    let mut output = open_output(args.output.as_deref())?;
    let mut reader = engine.read_bytes(input);
    let mut failed = 0usize;

    loop {
        match reader.next_event() {
            Ok(Some(ReadEvent::Record(mut record))) => {
                let line_number = record.line_number;
                let errors = std::mem::take(&mut record.errors);
                let node = record.into_node().ok_or_else(|| {
                    anyhow::anyhow!("Record at line {} is not a generic record node", line_number)
                })?;
                serde_json::to_writer(&mut output, &node).map_err(anyhow::Error::from)?;
                output.write_all(b"\n")?;
                report_field_errors(errors, quiet);
            }
            Ok(Some(ReadEvent::Unmatched(unmatched))) => {
                CliUtils::show_warning(&unmatched.to_string(), quiet);
            }
            Ok(None) => break,
            Err(error @ EngineError::Structural(_)) if args.continue_on_error => {
                failed += 1;
                CliUtils::show_error(&error.user_message());
            }
            Err(error) => return Err(error),
        }
    }
    output.flush()?;

    if args.stats {
        output_statistics(&reader.statistics(), quiet);
    }
    if failed > 0 {
        return Err(anyhow::anyhow!("{} records failed to parse", failed).into());
    }
    Ok(())
}

fn run_format(args: &FormatArgs, quiet: bool) -> EngineResult<()> {
    let engine = load_engine(&args.schema, args.engine_config())?;
    let input = BufReader::new(open_input(args.input.as_deref(), args.stdin)?);
    let output = open_output(args.output.as_deref())?;
    let mut writer = engine.write_to(output);
    let mut failed = 0usize;

    for (index, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let node: RecordNode = serde_json::from_str(&line).map_err(|e| {
            anyhow::Error::new(e).context(format!("Invalid JSON record on line {}", index + 1))
        })?;
        match writer.write_node(&node) {
            Ok(errors) => report_field_errors(errors, quiet),
            Err(error @ EngineError::Structural(_)) if args.continue_on_error => {
                failed += 1;
                CliUtils::show_error(&error.user_message());
            }
            Err(error) => return Err(error),
        }
    }

    let stats = writer.statistics().clone();
    writer.into_sink().flush()?;

    if args.stats {
        output_statistics(&stats, quiet);
    }
    if failed > 0 {
        return Err(anyhow::anyhow!("{} records failed to format", failed).into());
    }
    Ok(())
}

fn run_validate(schema_path: &Path, quiet: bool) -> EngineResult<()> {
    let schema = Schema::from_path(schema_path)?;
    let config = EngineConfig::default();
    schema.validate(&config)?;

    let registry = ConverterRegistry::with_builtins();
    if let Some(unknown) = schema.unknown_converters(&registry).into_iter().next() {
        return Err(SchemaError::field(
            &unknown.record,
            &unknown.field,
            format!(
                "unknown converter '{}' (known: {})",
                unknown.converter,
                registry.names().join(", ")
            ),
        )
        .into());
    }

    CliUtils::show_success(
        &format!(
            "Schema is valid: {} top-level record definitions",
            schema.records.len()
        ),
        quiet,
    );
    Ok(())
}

fn output_statistics(stats: &ParseStatistics, quiet: bool) {
    if quiet {
        return;
    }

    eprintln!("\nSession Statistics:");
    eprintln!("Lines read: {}", stats.lines_read);
    eprintln!("Records parsed: {}", stats.records_parsed);
    eprintln!("Records written: {}", stats.records_written);
    eprintln!("Lines written: {}", stats.lines_written);
    eprintln!("Unmatched lines: {}", stats.unmatched_lines);
    eprintln!("Field errors: {}", stats.field_errors);
    eprintln!("Structural errors: {}", stats.structural_errors);
    eprintln!("Processing time: {}ms", stats.processing_time_ms);
}

/// CLI utilities and helpers
pub struct CliUtils;

impl CliUtils {
    /// Show a success message (if not in quiet mode)
    pub fn show_success(message: &str, quiet: bool) {
        if !quiet {
            eprintln!("✓ {}", message);
        }
    }

    /// Show an error message
    pub fn show_error(message: &str) {
        eprintln!("✗ {}", message);
    }

    /// Show a warning message (if not in quiet mode)
    pub fn show_warning(message: &str, quiet: bool) {
        if !quiet {
            eprintln!("⚠ {}", message);
        }
    }
}

/// Handle CLI errors with user-friendly messages
pub fn handle_error(error: &EngineError) {
    CliUtils::show_error(&error.user_message());

    // Provide helpful suggestions
    match error.kind() {
        ErrorKind::UnmatchedLine => {
            eprintln!("\nTip: Use --lenient to skip lines no record definition matches");
        }
        ErrorKind::Structural => {
            eprintln!("\nTip: Use --continue-on-error to keep going after a bad record");
        }
        ErrorKind::Schema => {
            eprintln!("\nTip: Run 'flatconv validate --schema <file>' to check the schema");
        }
        ErrorKind::FieldConversion | ErrorKind::UnknownConverter | ErrorKind::Io => {}
    }

    // Show usage hint
    eprintln!("\nTry 'flatconv --help' for usage information.");
}

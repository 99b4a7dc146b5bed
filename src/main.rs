use anyhow::{bail, Context};
use clap::Parser;
use is_terminal::IsTerminal;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use logstage::{
    ErrorStrategy, LtsvConfig, PipelineConfig, PipelineDefinition, StageConfig, StreamPipeline,
};

#[derive(Parser)]
#[command(name = "logstage")]
#[command(about = "Extract LTSV fields from log lines and print them as JSON")]
#[command(version)]
struct Args {
    /// Pipeline definition file (YAML or JSON with `pipeline_stages`)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config_file: Option<PathBuf>,

    /// Parse the line, then parse the extracted field KEY as LTSV again
    #[arg(long, value_name = "KEY")]
    source: Option<String>,

    /// Only output these keys (comma-separated)
    #[arg(short = 'k', long, value_delimiter = ',')]
    keys: Option<Vec<String>>,

    /// Debug mode - log why lines produce no fields
    #[arg(long)]
    debug: bool,

    /// Fail on first error instead of skipping lines
    #[arg(long)]
    fail_fast: bool,

    /// Log processing statistics when done
    #[arg(long)]
    stats: bool,

    /// Maximum line length
    #[arg(long, default_value = "1048576")] // 1MB
    max_line_length: usize,

    /// Buffer size for I/O
    #[arg(long, default_value = "65536")] // 64KB
    buffer_size: usize,

    /// Input file (default: stdin)
    #[arg(short = 'i', long = "input")]
    input_file: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long = "output")]
    output_file: Option<PathBuf>,
}

impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if self.config_file.is_some() && self.source.is_some() {
            bail!("Cannot use both --config and --source");
        }
        Ok(())
    }

    fn definition(&self) -> anyhow::Result<PipelineDefinition> {
        match &self.config_file {
            Some(path) => PipelineDefinition::from_file(path).with_context(|| {
                format!("Failed to load pipeline definition '{}'", path.display())
            }),
            None => {
                let mut stages = vec![StageConfig::Ltsv(Some(LtsvConfig::default()))];
                if let Some(source) = &self.source {
                    stages.push(StageConfig::Ltsv(Some(LtsvConfig {
                        source: Some(source.clone()),
                    })));
                }
                Ok(PipelineDefinition { stages })
            }
        }
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("logstage={}", default_level).into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(io::stderr().is_terminal()),
        )
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = args.validate().and_then(|_| run(args)) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Flush buffered output; a reader that went away early is not an error
fn finish_output<W: Write + ?Sized>(output: &mut W) -> io::Result<()> {
    match output.flush() {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = PipelineConfig {
        error_strategy: if args.fail_fast {
            ErrorStrategy::FailFast
        } else {
            ErrorStrategy::Skip
        },
        debug: args.debug,
        max_line_length: args.max_line_length,
        keys: args.keys.clone(),
    };

    let definition = args.definition()?;
    let mut pipeline = StreamPipeline::from_definition(&definition, config)
        .context("Failed to build pipeline")?;

    let input_filename = args
        .input_file
        .as_ref()
        .map(|p| p.to_string_lossy().to_string());
    let input: Box<dyn BufRead> = match &args.input_file {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open input file '{}'", path.display()))?;
            Box::new(BufReader::with_capacity(args.buffer_size, file))
        }
        None => Box::new(BufReader::with_capacity(args.buffer_size, io::stdin())),
    };

    let mut output: Box<dyn Write> = match &args.output_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file '{}'", path.display()))?;
            Box::new(io::BufWriter::with_capacity(args.buffer_size, file))
        }
        None => Box::new(io::BufWriter::with_capacity(args.buffer_size, io::stdout())),
    };

    let stats = pipeline
        .process_stream(input, &mut output, input_filename.as_deref())
        .context("Processing failed")?;

    finish_output(&mut output)?;

    if args.stats {
        info!(
            processed = stats.records_processed,
            output = stats.records_output,
            skipped = stats.records_skipped,
            errors = stats.errors,
            elapsed = ?stats.processing_time,
            "final statistics"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "Broken pipe"))
        }
    }

    struct FullDisk;

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "No space left on device"))
        }
    }

    #[test]
    fn test_broken_pipe_on_flush_is_success() {
        let mut output: Box<dyn Write> = Box::new(ClosedPipe);
        assert!(finish_output(&mut output).is_ok());
    }

    #[test]
    fn test_other_flush_errors_propagate() {
        let err = finish_output(&mut FullDisk).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn test_source_adds_second_stage() {
        let args = Args::parse_from(["logstage", "--source", "msg"]);
        let definition = args.definition().unwrap();
        assert_eq!(
            definition.stages,
            vec![
                StageConfig::Ltsv(Some(LtsvConfig { source: None })),
                StageConfig::Ltsv(Some(LtsvConfig {
                    source: Some("msg".to_string())
                })),
            ]
        );
    }
}

use clap::Parser;
use colored::Colorize;
use cqpt_lang::{CompileOptions, Registry, TranslateError};
use itertools::Itertools;
use miette::IntoDiagnostic;
use miette::miette;
use std::io::IsTerminal;
use std::io::{self, BufWriter, Read, Write};
use std::{fs, path::PathBuf};

use crate::config::{Config, is_valid_span};

#[derive(Parser, Debug, Default)]
#[command(name = "cqpt")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(after_help = "# Examples:\n\n\
    ## To translate a query given on the command line:\n\
    cqpt json -q '{\"tokens\": [{\"name\": \"a\"}]}'\n\n\
    ## To translate query files, restricting matches to sentences:\n\
    cqpt --span s -f noun.json -f verb.json\n\n\
    ## To list the available front-ends:\n\
    cqpt --list")]
#[command(
    about = "cqpt translates dependency-tree queries into CQP patterns.",
    long_about = None
)]
pub struct Cli {
    #[clap(flatten)]
    input: InputArgs,

    #[clap(flatten)]
    output: OutputArgs,

    /// List the available front-ends
    #[arg(long)]
    list: bool,

    /// Front-end the queries are written for. Guessed when omitted
    #[arg(value_name = "FRONTEND")]
    frontend: Option<String>,
}

#[derive(Clone, Debug, clap::Args, Default)]
struct InputArgs {
    /// Query to translate. May be repeated
    #[arg(short, long = "query", value_name = "QUERY")]
    queries: Vec<String>,

    /// Read a query from the file. May be repeated
    #[arg(short, long = "file", value_name = "FILE")]
    files: Vec<PathBuf>,
}

#[derive(Clone, Debug, clap::Args, Default)]
struct OutputArgs {
    /// Write the patterns to the file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Restrict matches to the structure, such as `s`
    #[arg(long)]
    span: Option<String>,

    /// Fail a query that expands to more alternatives than this
    #[arg(long)]
    limit: Option<usize>,
}

/// A query text and where it came from.
struct Input {
    origin: String,
    content: String,
}

impl Cli {
    pub fn run(&self) -> miette::Result<()> {
        let registry = Registry::default();
        if self.list {
            return Self::list_frontends(&registry);
        }

        let config = Config::from_env();
        Self::init_tracing(&config);

        if let Some(name) = &self.frontend
            && registry.get(name).is_none()
        {
            return Err(miette::Report::new(cqpt_lang::Error::from_error(
                "",
                TranslateError::UnknownFrontend(name.clone()),
            )));
        }

        let options = self.compile_options(&config)?;
        let (inputs, unreadable) = self.read_inputs()?;
        let total = inputs.len() + unreadable;

        let mut patterns = Vec::with_capacity(inputs.len());
        for input in &inputs {
            match cqpt_lang::translate_input(&registry, &input.content, self.frontend.as_deref(), &options) {
                Ok(pattern) => {
                    tracing::debug!(origin = %input.origin, "translated query");
                    patterns.push(pattern);
                }
                Err(error) => Self::report(&input.origin, miette::Report::new(error)),
            }
        }

        self.print(&patterns)?;

        if patterns.is_empty() {
            return Err(miette!("No query was translated"));
        }
        if patterns.len() < total {
            tracing::warn!(
                failed = total - patterns.len(),
                total,
                "some queries were not translated"
            );
        }

        Ok(())
    }

    fn report(origin: &str, report: miette::Report) {
        eprintln!("{} {}", "Error in".red().bold(), origin.bold());
        eprintln!("{:?}", report);
    }

    fn init_tracing(config: &Config) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_new(&config.log_level)
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(Config::default().log_level)),
            )
            .with_writer(io::stderr)
            .try_init();
    }

    fn list_frontends(registry: &Registry) -> miette::Result<()> {
        let output = std::iter::once(format!("{}", "Front-ends:".bold().cyan()))
            .chain(registry.names().map(|name| format!("  {}", name.green())))
            .join("\n");

        println!("{}", output);
        Ok(())
    }

    fn compile_options(&self, config: &Config) -> miette::Result<CompileOptions> {
        if let Some(span) = &self.output.span
            && !is_valid_span(span)
        {
            return Err(miette!("Invalid --span value '{}'", span));
        }

        Ok(CompileOptions {
            candidate_limit: self.output.limit.or(config.candidate_limit),
            span: self
                .output
                .span
                .as_deref()
                .or(config.span.as_deref())
                .map(Into::into),
        })
    }

    /// Collects the queries to translate, with the number of files that could
    /// not be read. Unreadable files are reported and skipped.
    fn read_inputs(&self) -> miette::Result<(Vec<Input>, usize)> {
        let mut inputs = self
            .input
            .queries
            .iter()
            .enumerate()
            .map(|(i, query)| Input {
                origin: format!("query #{}", i + 1),
                content: query.clone(),
            })
            .collect::<Vec<_>>();

        let mut unreadable = 0;
        for file in &self.input.files {
            let origin = file.display().to_string();
            match fs::read_to_string(file) {
                Ok(content) => inputs.push(Input { origin, content }),
                Err(error) => {
                    let report = if error.kind() == io::ErrorKind::NotFound {
                        miette!("File not found: {}", origin)
                    } else {
                        miette!("Failed to read {}: {}", origin, error)
                    };
                    Self::report(&origin, report);
                    unreadable += 1;
                }
            }
        }

        if self.input.queries.is_empty() && self.input.files.is_empty() {
            if io::stdin().is_terminal() {
                return Err(miette!("Query is required"));
            }

            let mut content = String::new();
            io::stdin().read_to_string(&mut content).into_diagnostic()?;
            inputs.push(Input {
                origin: "<stdin>".to_string(),
                content,
            });
        }

        Ok((inputs, unreadable))
    }

    fn print(&self, patterns: &[String]) -> miette::Result<()> {
        let stdout = io::stdout();
        let mut handle: Box<dyn Write> = if let Some(output_file) = &self.output.output {
            let file = fs::File::create(output_file).into_diagnostic()?;
            Box::new(BufWriter::new(file))
        } else {
            Box::new(BufWriter::new(stdout.lock()))
        };

        for pattern in patterns {
            writeln!(handle, "{}", pattern).into_diagnostic()?;
        }
        handle.flush().into_diagnostic()
    }
}

use clap::{Parser, Subcommand};
use miette::Result;
use std::path::{Path, PathBuf};
use std::sync::Once;
use unveil_common::Diagnostic;
use unveil_config::{LanguageStandard, UnveilConfig};
use unveil_engine::{TransformOutput, Transformer};
use unveil_tree::ResolvedUnit;

#[derive(Parser)]
#[command(name = "unveil")]
#[command(author, version, about = "Shows the C++ the compiler writes for you")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Desugar a resolved translation unit into explicit C++
    Transform {
        /// Resolved unit (JSON) produced by a front end
        file: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: OptionArgs,
    },

    /// Desugar a unit and report declarations that could not be handled
    Check {
        /// Resolved unit (JSON) produced by a front end
        file: PathBuf,

        #[command(flatten)]
        options: OptionArgs,
    },

    /// Print the resolved tree of a unit
    Dump {
        /// Resolved unit (JSON) produced by a front end
        file: PathBuf,
    },
}

/// Overrides applied on top of the configuration file.
#[derive(clap::Args, Debug, Default)]
struct OptionArgs {
    /// Configuration file (defaults to ./unveil.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Language standard the input was compiled as, e.g. c++20
    #[arg(long = "std", value_parser = parse_standard)]
    standard: Option<LanguageStandard>,

    /// Show every implicit conversion, including loads and decays
    #[arg(long)]
    show_all_implicit_casts: bool,

    /// Name class-type template arguments as template parameter objects
    #[arg(long)]
    nttp_template_syntax: bool,

    /// Mark where each local's lifetime ends
    #[arg(long)]
    show_lifetime: bool,
}

fn parse_standard(s: &str) -> std::result::Result<LanguageStandard, String> {
    s.parse().map_err(|e| format!("{}", e))
}

static TRACING_INIT: Once = Once::new();

/// Install a subscriber when `RUST_LOG` is set, e.g. `RUST_LOG=unveil_engine=trace`.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
                .with(filter)
                .init();
        }
    });
}

impl OptionArgs {
    /// The configuration file, if any, with command line flags applied.
    fn resolve(&self) -> Result<UnveilConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => {
                let default = Path::new("unveil.toml");
                if default.exists() {
                    load_config(default)?
                } else {
                    UnveilConfig::default()
                }
            }
        };
        if let Some(standard) = self.standard {
            config.transform.standard = standard;
        }
        config.transform.show_all_implicit_casts |= self.show_all_implicit_casts;
        config.transform.use_template_syntax_for_nttp |= self.nttp_template_syntax;
        config.transform.show_lifetime |= self.show_lifetime;
        Ok(config)
    }
}

fn load_config(path: &Path) -> Result<UnveilConfig> {
    UnveilConfig::from_file(path)
        .map_err(|e| miette::miette!("Failed to load {}: {}", path.display(), e))
}

fn load_unit(path: &Path) -> Result<ResolvedUnit> {
    ResolvedUnit::from_file(path).map_err(|e| miette::miette!("Failed to load {}: {}", path.display(), e))
}

fn transform(file: &Path, options: &OptionArgs) -> Result<TransformOutput> {
    let config = options.resolve()?;
    tracing::debug!(standard = %config.transform.standard, file = %file.display(), "transform");
    let unit = load_unit(file)?;
    let output = Transformer::new(config).run(&unit)?;
    Ok(output)
}

fn report(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{:?}", miette::Report::new(diagnostic.clone()));
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))?;
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Transform {
            file,
            output,
            options,
        } => {
            let result = transform(&file, &options)?;
            report(&result.diagnostics);
            if let Some(ref output_path) = output {
                std::fs::write(output_path, &result.text)
                    .map_err(|e| miette::miette!("Failed to write output: {}", e))?;
                println!("Wrote {}", output_path.display());
            } else {
                print!("{}", result.text);
            }
        }

        Commands::Check { file, options } => {
            let result = transform(&file, &options)?;
            report(&result.diagnostics);
            if result.has_errors() {
                eprintln!("{}: Error", file.display());
                return Err(miette::miette!(
                    "{} declaration(s) could not be desugared",
                    result.diagnostics.iter().filter(|d| d.is_error()).count()
                ));
            }
            println!(
                "{}: OK ({} instantiation(s))",
                file.display(),
                result.instantiations.len()
            );
        }

        Commands::Dump { file } => {
            let unit = load_unit(&file)?;
            println!("{:#?}", unit);
        }
    }

    Ok(())
}

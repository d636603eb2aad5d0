use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use rdlc_generator::{
    demo, DirectoryStore, GeneratorConfig, ParameterBag, PdfEngine, ReportGenerator,
};

/// Generates report documents from RDLC definitions backed by the sample
/// invoicing providers.
///
/// The PDF engine needs the Roboto fonts under `assets/fonts` next to the
/// binary or in the directory named by `RDLC_FONTS_DIR`.
#[derive(Parser)]
#[command(author, version, about = "Render RDLC report definitions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the built-in invoice report.
    #[command(name = "demo")]
    Demo {
        /// Only list invoices issued in this year.
        #[arg(long)]
        year: Option<i32>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Render a definition read from a directory of `.rdlc` files.
    #[command(name = "render")]
    Render {
        /// Directory holding the definitions.
        #[arg(long, short = 'd')]
        dir: PathBuf,

        /// Definition key, e.g. `Demo.Sales.Invoice`.
        key: String,

        /// Parameter as `name=value`; repeat for more values.
        #[arg(long = "param", short = 'p', value_parser = parse_param)]
        params: Vec<(String, String)>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Print the datasets and subreports a definition needs.
    #[command(name = "inspect")]
    Inspect {
        /// Directory holding the definitions; the built-in ones when omitted.
        #[arg(long, short = 'd')]
        dir: Option<PathBuf>,

        /// Definition key.
        key: String,
    },
}

#[derive(Args)]
struct OutputArgs {
    /// Output format.
    #[arg(long, default_value = "pdf")]
    format: String,

    /// Count the pages of the rendered document.
    #[arg(long)]
    page_count: bool,

    /// Abort generation after this many milliseconds.
    #[arg(long)]
    deadline_ms: Option<u64>,

    /// File the document is written to.
    #[arg(long, short = 'o', default_value = "report.pdf")]
    output: PathBuf,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Demo { year, output } => {
            let generator = ReportGenerator::new(demo::store(), demo::registry(), PdfEngine::new())
                .with_config(config_for(&output));
            let mut bag = ParameterBag::new();
            if let Some(year) = year {
                bag.add("Year", year.to_string());
            }
            render(&generator, demo::INVOICE_REPORT, &bag, &output)
        }
        Commands::Render {
            dir,
            key,
            params,
            output,
        } => {
            let generator = ReportGenerator::new(
                DirectoryStore::new(dir),
                demo::registry(),
                PdfEngine::new(),
            )
            .with_config(config_for(&output));
            let bag: ParameterBag = params.into_iter().collect();
            render(&generator, &key, &bag, &output)
        }
        Commands::Inspect { dir, key } => match dir {
            Some(dir) => inspect(
                ReportGenerator::new(DirectoryStore::new(dir), demo::registry(), PdfEngine::new())
                    .with_config(GeneratorConfig::from_env()),
                &key,
            ),
            None => inspect(
                ReportGenerator::new(demo::store(), demo::registry(), PdfEngine::new())
                    .with_config(GeneratorConfig::from_env()),
                &key,
            ),
        },
    };

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        print_error_sources(err.as_ref());
        std::process::exit(1);
    }
}

fn config_for(args: &OutputArgs) -> GeneratorConfig {
    let config = GeneratorConfig::from_env();
    let config = match args.deadline_ms {
        Some(millis) => config.with_deadline(Duration::from_millis(millis)),
        None => config,
    };
    log::debug!("generator config: {:?}", config);
    config
}

fn render(
    generator: &ReportGenerator,
    key: &str,
    parameters: &ParameterBag,
    args: &OutputArgs,
) -> Result<(), Box<dyn Error>> {
    let document = generator.generate(key, parameters, &args.format, args.page_count)?;

    fs::write(&args.output, &document.content)?;
    println!(
        "Wrote {} ({} bytes, {}{})",
        args.output.display(),
        document.content.len(),
        document.mime_type,
        if args.page_count {
            format!(", {} page(s)", document.page_count)
        } else {
            String::new()
        }
    );
    Ok(())
}

fn inspect(generator: ReportGenerator, key: &str) -> Result<(), Box<dyn Error>> {
    let parameters = ParameterBag::new();
    let context = generator.prepare(key, &parameters)?;
    let definition = context.definition();

    println!("{}", definition.key());
    for dataset in definition.datasets() {
        println!(
            "  dataset {}: {} :: {}",
            dataset.name, dataset.provider_type, dataset.method_signature
        );
    }
    for parameter in definition.parameters() {
        println!("  parameter {}", parameter.name);
    }
    for subreport in context.subreports() {
        println!("  subreport {}", subreport.name);
        for dataset in subreport.definition.datasets() {
            println!("    dataset {}: {}", dataset.name, dataset.method_signature);
        }
    }
    println!("  {} dataset binding(s)", context.binding_count());
    Ok(())
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}

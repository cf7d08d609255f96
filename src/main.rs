use clap::{Parser, Subcommand};
use srcset_gen::{config, output, pipeline};
use srcset_gen::{RustBackend, SrcsetGenerator};
use std::path::PathBuf;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "srcset-gen")]
#[command(about = "Responsive image srcset generator")]
#[command(long_about = "\
Responsive image srcset generator

Walks a source directory, matches images against configured rules, and
writes resized/re-encoded derivatives for responsive <img srcset> and
<picture> markup. Files no rule matches are copied through unchanged.

Rules live in srcset.toml:

  [[rules]]
  match = \"photos/**/*.jpg\"       # path glob or CSS media query
  format = [\"jpg\", \"webp\"]        # output formats
  width = [1, 0.5, 480]           # <=1.0 = ratio of source width

Each matched source fans out into (formats × widths) derivatives, named
stem@{width}w.ext (the native-size derivative keeps the plain stem). A
media query matcher like \"(max-width: 1024px)\" is evaluated against the
image's pixel dimensions. SVG and GIF sources are never resized; they are
optimized and copied per matching rule.

Run 'srcset-gen gen-config' to generate a documented srcset.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Source image directory
    #[arg(long, default_value = "assets", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Config file path
    #[arg(long, default_value = "srcset.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate derivatives for all matched images
    Build,
    /// Validate the config file without building
    Check,
    /// Print a stock srcset.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Build => {
            let cfg = config::load_config(&cli.config)?;
            let rules = cfg.to_rules()?;
            init_thread_pool(&cfg.options);

            let generator =
                SrcsetGenerator::with_options(RustBackend::new(), cfg.to_generator_options());

            println!(
                "==> Building {} → {}",
                cli.source.display(),
                cli.output.display()
            );
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    println!("{}", output::format_process_event(&event));
                }
            });
            let summary =
                pipeline::run(&generator, &rules, &cli.source, &cli.output, Some(tx))?;
            printer.join().ok();
            output::print_summary(&summary);

            if !summary.failures.is_empty() {
                return Err(format!("{} file(s) failed", summary.failures.len()).into());
            }
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            println!("==> Checking {}", cli.config.display());
            let cfg = config::load_config(&cli.config)?;
            cfg.to_rules()?;
            output::print_check_output(&cfg);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Initialize the rayon thread pool based on the worker config.
///
/// Caps at the number of available CPU cores — user can constrain down, not up.
fn init_thread_pool(options: &config::OptionsConfig) {
    let threads = config::effective_threads(options);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

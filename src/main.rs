use clap::Parser;
use std::path::Path;
use wikisite::config;
use wikisite::fetch::HttpFetcher;
use wikisite::generate::{self, BuildError};
use wikisite::output::Printer;
use wikisite::sink::OutputMode;
use wikisite::types::BuildReport;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "wikisite")]
#[command(about = "Turn a GitHub wiki into an offline HTML bundle")]
#[command(long_about = "\
Turn a GitHub wiki into an offline HTML bundle

Clones (or fast-forwards) the wiki checkout, renders every page into the
HTML template, rewrites links between wiki pages to local files and
downloads remote images next to the pages.

Layout (all paths configurable in wikisite.toml):

  wikisite.toml      # optional, every key has a default
  template.html      # page shell with content/nav/toc/footer regions
  styles/            # *.scss / *.css → <name>.css, _partials skipped
  wiki/              # the wiki checkout
  out/               # loose-file output (default)
  doc.zip            # archive output (--zip)

Set WIKISITE_LOG=debug for diagnostic logging.")]
#[command(version = version_string())]
struct Cli {
    /// Write a single zip archive instead of loose files
    #[arg(long)]
    zip: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("WIKISITE_LOG", "warn")).init();

    let cli = Cli::parse();
    let printer = Printer::detect();
    let mode = if cli.zip {
        OutputMode::Archive
    } else {
        OutputMode::Filesystem
    };

    match run(mode, &printer).await {
        Ok(report) => printer.report(&report),
        Err(err) => {
            printer.error(&err);
            std::process::exit(1);
        }
    }
}

async fn run(mode: OutputMode, printer: &Printer) -> Result<BuildReport, BuildError> {
    let config = config::load_config(Path::new("."))?;
    let fetcher = HttpFetcher::new()?;
    generate::build(&config, mode, &fetcher, printer).await
}

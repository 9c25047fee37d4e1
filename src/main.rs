use clap::{Parser, Subcommand};
use make_index::{config, generate, output, scan};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(name = "make-index")]
#[command(about = "Index pages, a site map and a news feed for a directory tree")]
#[command(long_about = "\
Index pages, a site map and a news feed for a directory tree

Templates in the content root are expanded against every directory below it.

Content structure:

  content/
  ├── .index.html          # template → index.html in every directory
  ├── .sitemap.xml         # template → sitemap.xml (head ~ body ~ tail)
  ├── .newsfeed.rss        # template → newsfeed.rss (head ~ body ~ tail)
  ├── make-index.toml      # optional config
  ├── index.d              # description of the directory
  ├── content.d            # in-depth description of the directory
  ├── photo.jpg
  ├── photo.jpg.d          # description of photo.jpg (empty: photo.jpg is hidden)
  ├── photo.jpg.d.jpeg     # icon of photo.jpg
  ├── story.html.news      # news item: YYYY-MM-DD, then the title
  └── home.link            # link whose href is the first line

Template language:

  @(name)          run widget `name`
  @(name){body}    run it, and expand body while it asks to repeat
  ~                alone on a line: head / body / tail separator

Widgets: content date filealt filedesc filehref fileicon filename files
filesize htmlcontent news newsname now pwd root title

Run 'make-index gen-config' to generate a documented make-index.toml.")]
#[command(version)]
struct Cli {
    /// Content root
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Only log warnings and errors
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log every directory and sidecar
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write index.html into every directory, plus the site map and news feed
    Build,
    /// Show what a build would list, without writing anything
    Check {
        /// Print the scan report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stock make-index.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::WARN
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Build => {
            let config = config::load_config(&cli.root)?;
            println!("==> Building {}", cli.root.display());
            let report = generate::generate(&cli.root, &config, chrono::Utc::now())?;
            output::print_generate_output(&report, &config.outputs.index);
            println!("==> Build complete");
        }
        Command::Check { json } => {
            let report = scan::scan(&cli.root)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("==> Checking {}", cli.root.display());
                output::print_scan_output(&report);
                let problems = report
                    .templates
                    .iter()
                    .any(|t| !t.unknown_widgets.is_empty() || t.unterminated);
                if problems {
                    println!("==> Templates have problems");
                } else {
                    println!("==> Content is valid");
                }
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

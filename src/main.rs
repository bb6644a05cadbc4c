use chrono::Utc;
use clap::{Parser, Subcommand};
use dispatches::config::{self, SiteConfig};
use dispatches::fs::RealFs;
use dispatches::manifest::{self, Freshness};
use dispatches::scaffold::{self, Templates};
use dispatches::server::{App, Server};
use dispatches::slug::Slug;
use dispatches::{articles, output};
use std::path::PathBuf;

fn version_string() -> &'static str {
    let on_tag = env!("DISPATCHES_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("DISPATCHES_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "dispatches")]
#[command(about = "Scaffold articles and serve first-load pages for the dispatches blog")]
#[command(long_about = "\
Scaffold articles and serve first-load pages for the dispatches blog

Every article is a directory under the content root:

  src/articles/
  ├── articles.js                      # Generated manifest, imported by the bundle
  ├── 001-the-brief/
  │   ├── 001-the-brief.md             # Article body
  │   └── 001-the-brief-metadata.toml  # publish_date, slug, permalink
  └── 004-the-basics/
      └── ...

'dispatches new <slug>' creates a directory from templates and regenerates
the manifest. 'dispatches serve' renders the requested article into the HTML
shell for the first page load.

Run 'dispatches gen-config' to print a documented dispatches.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (optional; defaults apply when it does not exist)
    #[arg(long, default_value = config::CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Content directory, overriding `content_root` from the config
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new article and regenerate the manifest
    New {
        /// Article slug, e.g. 004-the-basics
        slug: String,
    },
    /// Regenerate the article manifest
    Manifest {
        /// Only verify that the manifest is up to date
        #[arg(long)]
        check: bool,
    },
    /// List discovered articles
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the first-load HTML document for an article
    Render {
        /// Article slug (default: `default_slug` from the config)
        slug: Option<Slug>,
    },
    /// Serve first-load pages and the public directory over HTTP
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print a stock dispatches.toml with all options documented
    GenConfig,
}

/// Initialize the logger: `info` by default, `RUST_LOG` overrides.
fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    let cli = Cli::parse();

    match cli.command {
        Command::New { ref slug } => {
            let site_config = load_site_config(&cli)?;
            let layout = site_config.layout();
            let templates = Templates::load(&RealFs, site_config.templates_dir.as_deref())?;
            let report = scaffold::scaffold_article(
                &RealFs,
                &layout,
                &site_config.site,
                &templates,
                slug,
                Utc::now(),
            )?;
            output::print_scaffold_output(&report, &layout.root);
        }
        Command::Manifest { check } => {
            let layout = load_site_config(&cli)?.layout();
            let manifest_path = layout.manifest_path();
            if check {
                let freshness = manifest::check(&RealFs, &layout)?;
                let message = output::format_freshness(&freshness, &manifest_path);
                if freshness != Freshness::Fresh {
                    return Err(message.into());
                }
                println!("{}", message);
            } else {
                let slugs = manifest::regenerate(&RealFs, &layout)?;
                output::print_manifest_output(&slugs, &manifest_path);
            }
        }
        Command::List { json } => {
            let site_config = load_site_config(&cli)?;
            let articles = articles::load_articles(&RealFs, &site_config.layout(), &site_config.site)?;
            if json {
                let summaries: Vec<_> = articles.iter().map(|a| a.summary()).collect();
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                output::print_articles_output(&articles);
            }
        }
        Command::Render { ref slug } => {
            let app = App::new(load_site_config(&cli)?, Box::new(RealFs))?;
            print!("{}", app.render_document(slug.as_ref())?);
        }
        Command::Serve { ref host, port } => {
            serve(load_site_config(&cli)?, host.clone(), port)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Config file over stock defaults, with `--source` applied.
fn load_site_config(cli: &Cli) -> Result<SiteConfig, config::ConfigError> {
    let mut site_config = config::load_config(&cli.config)?;
    if let Some(source) = &cli.source {
        site_config.content_root = source.clone();
    }
    Ok(site_config)
}

fn serve(
    mut site_config: SiteConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(host) = host {
        site_config.server.host = host;
    }
    if let Some(port) = port {
        site_config.server.port = port;
    }
    let address = site_config.server.address();
    let app = App::new(site_config, Box::new(RealFs))?;
    Server::bind(address.as_str(), app)?.run()?;
    Ok(())
}

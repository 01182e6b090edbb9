use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use connect_blog::config::Config;
use connect_blog::{route, Blog, Response, TemplateResponder, Templates};

/// Serves a blog from a directory of content files.
#[derive(Parser)]
#[command(name = "connect-blog", version, about)]
struct Cli {
    /// The directory to search (upward) for `blog.yaml`.
    #[arg(long, default_value = ".")]
    project: PathBuf,

    /// Log at debug level regardless of RUST_LOG.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a snapshot and print a summary of it.
    Check,

    /// Print the view a request path resolves to.
    Route { path: String },

    /// Render a request path through the theme templates.
    Render { path: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_directory(&cli.project)
        .with_context(|| format!("loading configuration from `{}`", cli.project.display()))?;
    let blog = Blog::new(config).context("building blog snapshot")?;

    match cli.command {
        Command::Check => check(&blog),
        Command::Route { path } => {
            let snapshot = blog.snapshot();
            println!("{:?}", route(&snapshot, &path));
            Ok(())
        }
        Command::Render { path } => render(&blog, &path),
    }
}

fn check(blog: &Blog) -> Result<()> {
    let snapshot = blog.snapshot();
    println!("posts:      {}", snapshot.posts().len());
    println!("pages:      {}", snapshot.page_count());
    println!("years:      {}", snapshot.archive().len());
    println!("tags:       {}", snapshot.tags().len());
    println!("categories: {}", snapshot.categories().len());
    if let Some(newest) = snapshot.posts().last() {
        println!("newest:     {} ({})", newest.slug, newest.date.format("%Y-%m-%d"));
    }
    Ok(())
}

fn render(blog: &Blog, path: &str) -> Result<()> {
    let config = blog.config();
    let templates = Templates::load(&config.theme_dir, config.templates.ids())
        .with_context(|| format!("loading templates from `{}`", config.theme_dir.display()))?;

    let mut responder = TemplateResponder::new(&templates);
    blog.handle(path, &mut responder)?;
    match responder.into_response() {
        Response::Body { content_type, body } => {
            eprintln!("content-type: {}", content_type);
            std::io::stdout().write_all(&body)?;
        }
        Response::Fallthrough => eprintln!("`{}` is not handled by the blog", path),
    }
    Ok(())
}

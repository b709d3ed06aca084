use anyhow::Result;
use clap::Parser;
use spacetraveling::api::HttpContentApi;
use spacetraveling::build::build_site;
use spacetraveling::config::Config;
use std::path::PathBuf;

/// Builds the blog from the content repository into a static HTML tree.
#[derive(Parser)]
#[command(name = "spacetraveling", version, about)]
struct App {
    /// The project directory (searched upwards for `spacetraveling.yaml`).
    #[arg(default_value = ".")]
    project_directory: PathBuf,

    /// The directory into which the site is written.
    #[arg(short, long, default_value = "_output")]
    output_directory: PathBuf,

    /// Build against this draft revision instead of the published master
    /// ref, and render the exit-preview affordance.
    #[arg(long)]
    preview_ref: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let app = App::parse();
    let config = Config::from_directory(
        &app.project_directory,
        &app.output_directory,
        app.preview_ref,
    )?;
    let api = HttpContentApi::connect(&config.api_url)?;
    build_site(&config, &api)?;
    Ok(())
}

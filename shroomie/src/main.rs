mod options;
mod progress;
mod raw;

use anyhow::Result;
use clap::Parser;
use envapi::Client;
use log::info;
use options::Cli;
use sitereport::{
    locate, Collector, GridSpec, PromptOptions, ResponseCache, Survey, SurveyError, Target,
};
use std::sync::Arc;

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Err(err) => match err.downcast_ref::<SurveyError>() {
            Some(input) => {
                println!("Error: {input}");
                Ok(())
            }
            None => Err(err),
        },
        ok => ok,
    }
}

fn run(cli: &Cli) -> Result<()> {
    let client = Arc::new(Client::new(cli.api_config())?);

    let center = locate(&client, cli.lat, cli.lon, cli.location.as_deref())?;
    if let (None, _) | (_, None) = (cli.lat, cli.lon) {
        println!(
            "Geocoded '{}' to: Latitude {}, Longitude {}",
            cli.location.as_deref().unwrap_or_default(),
            center.y,
            center.x
        );
    }

    let target = if cli.grid {
        Target::Grid(GridSpec::new(center, cli.grid_size, cli.grid_distance)?)
    } else {
        Target::Point(center)
    };

    let collector = Collector::builder()
        .client(client)
        .providers(cli.kinds())
        .options(cli.query_options())
        .cache(Arc::new(ResponseCache::new(cli.cache_policy())))
        .build()?;
    let prompt = PromptOptions {
        mushroom_type: cli.mushroom_type.clone(),
        location_name: cli.location_name.clone(),
        ..PromptOptions::today()
    };
    info!(
        "providers: {:?}, jobs: {}",
        collector.kinds().collect::<Vec<_>>(),
        cli.jobs
    );
    let survey = Survey::new(collector, prompt).jobs(cli.jobs);

    let coords = target.coords();
    if let Target::Grid(grid) = target {
        println!(
            "Generated a {size}x{size} grid with {} points",
            coords.len(),
            size = grid.size
        );
    }

    let pb = if coords.len() > 1 {
        Some(progress::bar(
            format!("Surveying {} points", coords.len()),
            coords.len() as u64,
        )?)
    } else {
        None
    };
    let collections = survey.collect(&coords, |_| {
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    });
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if cli.prompt_mode() {
        print!("{}", survey.render(&target, &collections));
    } else {
        print!(
            "{}",
            raw::render(&target, &collections, cli.show_location())?
        );
    }
    Ok(())
}

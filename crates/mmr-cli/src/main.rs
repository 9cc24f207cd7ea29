use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mmr_core::{MovieId, ProviderCategory, WatchAvailability};
use mmr_raffle::{AvailabilityStatus, MmrConfig, RaffleController, RaffleView};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "mmr-cli")]
#[command(about = "My Movie Raffle command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the web UI.
    Serve,
    /// Print the normalized catalog.
    Catalog,
    /// Draw movies and print each selection with its providers.
    Raffle {
        #[arg(long, default_value_t = 1)]
        draws: usize,
    },
    /// Print watch providers for one movie in the configured region.
    Providers { movie_id: MovieId },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let config = MmrConfig::load(".").context("loading configuration")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => mmr_web::serve(config).await?,
        Commands::Catalog => {
            let source = config.catalog_source()?;
            let catalog = source.fetch_catalog().await?;
            for movie in &catalog {
                println!(
                    "{}\t{}\t{}\t{}",
                    movie.id,
                    movie.title,
                    movie
                        .release_year()
                        .map(|y| y.to_string())
                        .unwrap_or_else(|| "n/a".to_string()),
                    movie.display_rating()
                );
            }
            println!("catalog: source={} movies={}", source.source_id(), catalog.len());
        }
        Commands::Raffle { draws } => {
            let catalog = config.catalog_source()?.fetch_catalog().await?;
            let controller = RaffleController::new(config.provider_lookup()?);
            controller.initialize(catalog).await?;
            for _ in 0..draws {
                controller.draw().await?.settled().await;
                print_view(&controller.view().await);
            }
        }
        Commands::Providers { movie_id } => {
            let lookup = config.provider_lookup()?;
            match lookup.fetch_availability(movie_id).await? {
                Some(availability) if !availability.is_empty() => {
                    print_availability(&availability)
                }
                _ => println!("No streaming information available"),
            }
        }
    }

    Ok(())
}

fn print_view(view: &RaffleView) {
    match view {
        RaffleView::Idle => println!("(no selection)"),
        RaffleView::RestartNotice { catalog_size } => {
            println!("all {catalog_size} movies raffled; starting over")
        }
        RaffleView::Selection(selection) => {
            println!(
                "#{} {} ({})",
                selection.draw_seq, selection.movie.title, selection.movie.id
            );
            match &selection.status {
                AvailabilityStatus::Ready { availability } => print_availability(availability),
                AvailabilityStatus::Pending => println!("  Loading providers..."),
                AvailabilityStatus::Empty | AvailabilityStatus::Failed { .. } => {
                    println!("  No streaming information available")
                }
            }
        }
    }
}

fn print_availability(availability: &WatchAvailability) {
    for category in ProviderCategory::ALL {
        let providers = availability.providers(category);
        if providers.is_empty() {
            continue;
        }
        let names = providers
            .iter()
            .map(|p| p.provider_name.as_str())
            .collect::<Vec<_>>();
        println!("  {} {}", category.label(), names.join(", "));
    }
    if let Some(link) = &availability.link {
        println!("  {link}");
    }
}

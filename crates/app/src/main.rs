mod args;
mod runner;

use services::{AppServices, Clock};
use study_core::model::{Deck, DeckId, Flashcard, FlashcardId, UserId, Visibility};
use tracing_subscriber::EnvFilter;

use args::{Args, ArgsError, Command, print_usage};

const SAMPLE_CARDS: &[(&str, &str)] = &[
    ("Capital of France", "Paris"),
    ("Capital of Japan", "Tokyo"),
    ("Capital of Canada", "Ottawa"),
    ("Capital of Australia", "Canberra"),
    ("Capital of Kenya", "Nairobi"),
    ("Capital of Peru", "Lima"),
    ("Capital of Norway", "Oslo"),
    ("Capital of Egypt", "Cairo"),
    ("Capital of Chile", "Santiago"),
    ("Capital of Vietnam", "Hanoi"),
    ("Capital of Portugal", "Lisbon"),
    ("Capital of Morocco", "Rabat"),
];

fn sample_deck(id: DeckId, owner: UserId, public: bool) -> Result<Deck, study_core::Error> {
    let cards = SAMPLE_CARDS
        .iter()
        .zip(1..)
        .map(|((prompt, answer), id)| Flashcard::new(FlashcardId::new(id), *prompt, *answer))
        .collect::<Result<Vec<_>, _>>()?;
    let visibility = if public {
        Visibility::Public
    } else {
        Visibility::Private
    };
    Ok(Deck::new(id, owner, "World Capitals", visibility, cards)?)
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" || db_url.starts_with("sqlite:file:") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand means study.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Study,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Study,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(cmd, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&parsed.engine.db_url)?;
    let services = AppServices::new_sqlite(parsed.engine.clone(), Clock::system()).await?;

    match cmd {
        Command::Seed => {
            let deck = sample_deck(parsed.deck_id, parsed.user_id, parsed.public)?;
            services.decks().save_deck(&deck).await?;
            tracing::info!(
                deck_id = %deck.id(),
                owner = %deck.owner_id(),
                cards = deck.card_count(),
                "seeded sample deck"
            );
            println!(
                "Seeded deck {} \"{}\" with {} cards.",
                deck.id(),
                deck.name(),
                deck.card_count()
            );
            Ok(())
        }
        Command::Study => {
            let mut controller = services
                .launcher()
                .launch(
                    parsed.user_id,
                    parsed.session.clone(),
                    services.access_token(),
                )
                .await;
            runner::run_session(&mut controller).await?;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_deck_is_studyable() {
        let deck = sample_deck(DeckId::new(3), UserId::new(9), true).unwrap();
        assert_eq!(deck.card_count(), SAMPLE_CARDS.len());
        assert_eq!(deck.visibility(), Visibility::Public);
        assert!(deck.is_accessible_by(UserId::new(1)));
        assert_eq!(deck.flashcards()[0].answer(), "Paris");
    }

    #[test]
    fn prepare_skips_in_memory_urls() {
        assert!(prepare_sqlite_file("sqlite::memory:").is_ok());
        assert!(prepare_sqlite_file("postgres://nope").is_err());
    }
}

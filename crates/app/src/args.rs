use std::fmt;

use services::EngineConfig;
use study_core::model::{
    ContentSourceSettingsDraft, DeckId, SessionConfigDraft, StudyMode, UserId,
};

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidMode { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidMode { raw } => {
                write!(f, "invalid --mode value (expected challenge or quiz): {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Study,
    Seed,
}

impl Command {
    pub fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "study" => Some(Self::Study),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

/// Parsed command line, layered over `EngineConfig::from_env`.
#[derive(Debug)]
pub struct Args {
    pub engine: EngineConfig,
    pub user_id: UserId,
    pub deck_id: DeckId,
    pub public: bool,
    pub session: SessionConfigDraft,
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- study [--db <sqlite_url>] [--deck-id <id>] [--user <id>]");
    eprintln!("                            [--mode challenge|quiz] [--rounds 1|3|5] [--timed]");
    eprintln!("                            [--seconds <n>] [--questions <n>]");
    eprintln!("                            [--content-url <url>] [--token <token>]");
    eprintln!("  cargo run -p app -- seed  [--db <sqlite_url>] [--deck-id <id>] [--user <id>] [--public]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://study.sqlite3  --deck-id 1  --user 1  --mode challenge  --rounds 1");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDY_DB_URL, STUDY_QUESTION_SECONDS, STUDY_ADAPTIVE_BASE_URL, STUDY_ADAPTIVE_TOKEN");
    eprintln!("  RUST_LOG (default: info)");
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn require_number<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<T, ArgsError> {
    let raw = require_value(args, flag)?;
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

impl Args {
    pub fn parse(
        command: Command,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut engine = EngineConfig::from_env();
        let mut user_id = UserId::new(1);
        let mut deck_id = DeckId::new(1);
        let mut public = false;
        let mut mode = StudyMode::Challenge;
        let mut rounds = 1;
        let mut timed = false;
        let mut quiz_questions = None;
        let mut content_url = None;
        let mut access_token = None;

        while let Some(arg) = args.next() {
            match (command, arg.as_str()) {
                (_, "--db") => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    engine.db_url = value;
                }
                (_, "--deck-id") => deck_id = DeckId::new(require_number(args, "--deck-id")?),
                (_, "--user") => user_id = UserId::new(require_number(args, "--user")?),
                (Command::Seed, "--public") => public = true,
                (Command::Study, "--mode") => {
                    let raw = require_value(args, "--mode")?;
                    mode = raw.parse().map_err(|_| ArgsError::InvalidMode { raw })?;
                }
                (Command::Study, "--rounds") => rounds = require_number(args, "--rounds")?,
                (Command::Study, "--timed") => timed = true,
                (Command::Study, "--seconds") => {
                    engine.question_seconds = require_number(args, "--seconds")?;
                }
                (Command::Study, "--questions") => {
                    quiz_questions = Some(require_number(args, "--questions")?);
                }
                (Command::Study, "--content-url") => {
                    content_url = Some(require_value(args, "--content-url")?);
                }
                (Command::Study, "--token") => access_token = Some(require_value(args, "--token")?),
                (_, "--help" | "-h") => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        engine.db_url = normalize_sqlite_url(engine.db_url);
        let env_source = engine.content_source.take();
        let base_url = content_url.or_else(|| {
            env_source
                .as_ref()
                .map(|settings| settings.base_url().to_string())
        });
        let access_token = access_token.or_else(|| {
            env_source
                .as_ref()
                .and_then(|settings| settings.access_token().map(str::to_owned))
        });
        if let Some(base_url) = base_url {
            let draft = ContentSourceSettingsDraft {
                base_url: Some(base_url),
                access_token,
            };
            match draft.validate() {
                Ok(settings) => engine.content_source = Some(settings),
                Err(err) => {
                    tracing::warn!(error = %err, "ignoring --content-url");
                    engine.content_source = env_source;
                }
            }
        } else if access_token.is_some() {
            tracing::warn!("--token has no effect without an adaptive content url");
        }

        let mut session = SessionConfigDraft {
            deck_id: Some(deck_id),
            mode,
            rounds,
            timed,
            question_seconds: engine.question_seconds,
            ..SessionConfigDraft::default()
        };
        if let Some(count) = quiz_questions {
            session.quiz_questions = count;
        }

        Ok(Self {
            engine,
            user_id,
            deck_id,
            public,
            session,
        })
    }
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.starts_with("sqlite:file:") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use services::{AppServices, Clock};

    fn parse(command: Command, argv: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = argv.iter().map(|s| (*s).to_owned());
        Args::parse(command, &mut iter)
    }

    #[test]
    fn study_flags_fill_the_session_draft() {
        let args = parse(
            Command::Study,
            &[
                "--db", "sqlite::memory:", "--deck-id", "4", "--rounds", "3", "--timed",
                "--seconds", "20",
            ],
        )
        .unwrap();
        assert_eq!(args.engine.db_url, "sqlite::memory:");
        assert_eq!(args.deck_id, DeckId::new(4));
        assert_eq!(args.session.deck_id, Some(DeckId::new(4)));
        assert_eq!(args.session.rounds, 3);
        assert!(args.session.timed);
        assert_eq!(args.session.question_seconds, 20);
    }

    #[test]
    fn quiz_mode_and_token() {
        let args = parse(
            Command::Study,
            &[
                "--mode", "quiz", "--questions", "5", "--content-url",
                "https://content.example.com/api", "--token", "t",
            ],
        )
        .unwrap();
        assert_eq!(args.session.mode, StudyMode::Quiz);
        assert_eq!(args.session.quiz_questions, 5);
        let services = AppServices::in_memory(args.engine, Clock::system());
        assert_eq!(services.access_token(), Some("t"));
    }

    #[test]
    fn seed_rejects_study_only_flags() {
        assert!(matches!(
            parse(Command::Seed, &["--timed"]),
            Err(ArgsError::UnknownArg(arg)) if arg == "--timed"
        ));
        assert!(parse(Command::Seed, &["--public"]).unwrap().public);
    }

    #[test]
    fn bad_numbers_and_missing_values_are_reported() {
        assert!(matches!(
            parse(Command::Study, &["--rounds", "three"]),
            Err(ArgsError::InvalidNumber { flag: "--rounds", .. })
        ));
        assert!(matches!(
            parse(Command::Study, &["--db"]),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
        assert!(matches!(
            parse(Command::Study, &["--mode", "cram"]),
            Err(ArgsError::InvalidMode { .. })
        ));
    }

    #[test]
    fn relative_paths_become_absolute_sqlite_urls() {
        let url = normalize_sqlite_url("sqlite:data/study.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/study.sqlite3"));
        assert_eq!(normalize_sqlite_url("sqlite::memory:".into()), "sqlite::memory:");
    }
}

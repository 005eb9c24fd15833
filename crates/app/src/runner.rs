//! Line-based terminal front end for a study session.

use std::io;

use services::sessions::{AnswerOutcome, QuestionInstance, SessionProgress, TimerExpired};
use services::{PersistenceStatus, SessionController, SessionResult, SessionState};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use study_core::model::RoundSummary;

enum Input {
    Line(Option<String>),
    Expired(Option<TimerExpired>),
}

/// Drives `controller` until the session completes or fails, racing learner
/// input against the question timer.
///
/// # Errors
///
/// Returns an I/O error if reading stdin fails.
pub async fn run_session(controller: &mut SessionController) -> io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut redraw = true;

    loop {
        let state = controller.state().clone();
        match state {
            SessionState::Active(question) => {
                if redraw {
                    print_question(&question, &controller.progress());
                }
                redraw = true;
                let input = tokio::select! {
                    line = lines.next_line() => Input::Line(line?),
                    expired = controller.next_timer_event() => Input::Expired(expired),
                };
                match input {
                    Input::Expired(Some(expired)) => {
                        redraw = expire(controller, expired).await;
                    }
                    Input::Expired(None) => redraw = false,
                    Input::Line(None) => {
                        let _ = controller.abandon().await;
                    }
                    Input::Line(Some(line)) => answer(controller, &question, line.trim()).await,
                }
            }
            SessionState::AnswerRevealed { question, outcome } => {
                print_outcome(&question, outcome);
                println!("  [enter] next   [q] end session");
                match read_command(&mut lines).await?.as_deref() {
                    None => {
                        let _ = controller.abandon().await;
                    }
                    Some("q") => {
                        let _ = controller.end_session().await;
                    }
                    Some(_) => {
                        let _ = controller.advance().await;
                    }
                }
            }
            SessionState::RoundComplete(summary) => {
                print_round(&summary, controller.progress().total_rounds);
                println!("  [enter] next round   [q] end session");
                match read_command(&mut lines).await?.as_deref() {
                    None => {
                        let _ = controller.abandon().await;
                    }
                    Some("q") => {
                        let _ = controller.end_session().await;
                    }
                    Some(_) => {
                        let _ = controller.acknowledge_round().await;
                    }
                }
            }
            SessionState::Complete(result) => {
                print_result(&result);
                return Ok(());
            }
            SessionState::Error(err) => {
                println!("Could not start the session: {err}");
                println!("Back to library.");
                return Ok(());
            }
            SessionState::Loading | SessionState::Finalizing(_) => {
                tracing::error!(state = state.name(), "session stalled");
                return Ok(());
            }
        }
    }
}

/// Forwards a timer expiry. Returns `false` when the controller ignored it,
/// as it does for a countdown left over from an earlier question.
async fn expire(controller: &mut SessionController, expired: TimerExpired) -> bool {
    let applied = controller.timer_expired(expired).await.is_applied();
    if applied {
        println!("  Time's up!");
    }
    applied
}

async fn answer(controller: &mut SessionController, question: &QuestionInstance, input: &str) {
    match input {
        "q" => {
            let _ = controller.end_session().await;
        }
        "x" => {
            let _ = controller.abandon().await;
        }
        raw => match raw.parse::<usize>() {
            Ok(choice) if (1..=question.options.len()).contains(&choice) => {
                let _ = controller.select_answer(choice - 1).await;
            }
            _ => println!("  Pick 1-{}, q to end or x to abandon.", question.options.len()),
        },
    }
}

async fn read_command(lines: &mut Lines<BufReader<Stdin>>) -> io::Result<Option<String>> {
    Ok(lines
        .next_line()
        .await?
        .map(|line| line.trim().to_lowercase()))
}

fn print_question(question: &QuestionInstance, progress: &SessionProgress) {
    println!();
    print!(
        "Round {}/{} · question {}/{}",
        progress.round_index,
        progress.total_rounds,
        progress.question_in_round,
        progress.questions_per_round
    );
    match progress.remaining_secs {
        Some(secs) => println!(" · {secs}s"),
        None => println!(),
    }
    println!("  {}", question.prompt);
    for (i, option) in question.options.options().iter().enumerate() {
        println!("  {}) {}", i + 1, option.text);
    }
}

fn print_outcome(question: &QuestionInstance, outcome: AnswerOutcome) {
    let correct_text = outcome
        .correct_index
        .and_then(|i| question.options.options().get(i))
        .map_or("?", |option| option.text.as_str());
    if outcome.correct {
        println!("  Correct!");
    } else if outcome.timed_out() {
        println!("  Out of time. The answer was: {correct_text}");
    } else {
        println!("  Not quite. The answer was: {correct_text}");
    }
}

fn print_round(summary: &RoundSummary, total_rounds: u32) {
    println!();
    println!(
        "Round {}/{} complete: {} correct, {} incorrect",
        summary.round_index, total_rounds, summary.correct, summary.incorrect
    );
}

fn print_result(result: &SessionResult) {
    let snapshot = &result.snapshot;
    let mastery = snapshot.mastery();
    println!();
    println!(
        "Session {}: {} correct, {} incorrect in {}s",
        if snapshot.ended_early() { "ended" } else { "complete" },
        snapshot.correct(),
        snapshot.incorrect(),
        snapshot.elapsed_secs()
    );
    for round in snapshot.rounds() {
        println!(
            "  round {}: {}/{}",
            round.round_index,
            round.correct,
            round.answered()
        );
    }
    println!(
        "Mastery {} → {} ({:+})",
        mastery.prior().value(),
        mastery.new_mastery().value(),
        mastery.delta()
    );
    match &result.persistence {
        PersistenceStatus::Saved => println!("Progress saved."),
        PersistenceStatus::Skipped => println!("Nothing answered, nothing saved."),
        PersistenceStatus::Failed(failures) => {
            println!("Progress could not be fully saved:");
            for failure in failures {
                println!("  {failure}");
            }
        }
    }
}

//! Interactive game loop over any line-based reader and writer.

use std::collections::HashSet;
use std::io::{self, BufRead, Write};

use services::{AnswerOutcome, AppServices};

#[derive(Debug, Default)]
struct Reveals {
    hint: bool,
    book: bool,
    wrong: HashSet<usize>,
}

enum Input {
    Answer(usize),
    Hint,
    Book,
    Quit,
    Unknown,
}

fn parse_input(line: &str) -> Input {
    match line.trim() {
        "h" | "hint" => Input::Hint,
        "b" | "book" => Input::Book,
        "q" | "quit" => Input::Quit,
        other => other
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map_or(Input::Unknown, |n| Input::Answer(n - 1)),
    }
}

fn show_question<W: Write>(services: &AppServices, out: &mut W) -> io::Result<()> {
    let session = services.session();
    let Some(question) = session.current_question() else {
        return Ok(());
    };
    writeln!(out)?;
    writeln!(
        out,
        "Score: {}   This question is worth {}",
        session.game_score(),
        session.question_score()
    )?;
    writeln!(out, "{}", question.prompt())?;
    for (i, answer) in session.answers().iter().enumerate() {
        writeln!(out, "  {}) {answer}", i + 1)?;
    }
    write!(out, "Answer number, (h)int, (b)ook, (q)uit > ")?;
    out.flush()
}

/// Play one game, reading commands from `input` until the player quits,
/// input ends, or every question in the enabled books has been answered.
pub async fn play<R: BufRead, W: Write>(
    services: &mut AppServices,
    input: R,
    mut out: W,
) -> io::Result<()> {
    if !services.start_game().await {
        writeln!(
            out,
            "No questions available: enable at least one book with `toggle <book>`."
        )?;
        return Ok(());
    }

    let mut reveals = Reveals::default();
    show_question(services, &mut out)?;

    let mut lines = input.lines();
    while let Some(line) = lines.next().transpose()? {
        let session = services.session_mut();
        match parse_input(&line) {
            Input::Quit => break,
            Input::Hint if !reveals.hint => {
                reveals.hint = true;
                session.use_hint();
                let hint = session.current_question().map_or("", |q| q.hint());
                writeln!(out, "Hint: {hint}")?;
            }
            Input::Book if !reveals.book => {
                reveals.book = true;
                session.use_hint();
                if let Some(question) = session.current_question() {
                    writeln!(out, "This question is from book {}.", question.book())?;
                }
            }
            Input::Hint | Input::Book => writeln!(out, "Already revealed.")?,
            Input::Answer(index) if reveals.wrong.contains(&index) => {
                writeln!(out, "You already tried that one.")?;
            }
            Input::Answer(index) => {
                let Some(answer) = session.answers().get(index).cloned() else {
                    writeln!(out, "Pick a number from the list.")?;
                    continue;
                };
                match session.submit_answer(&answer) {
                    AnswerOutcome::Correct { points } => {
                        writeln!(out, "Correct! +{points}")?;
                        reveals = Reveals::default();
                        if session.next_question().is_none() {
                            writeln!(out, "You answered every question!")?;
                            break;
                        }
                    }
                    AnswerOutcome::Incorrect { remaining } => {
                        reveals.wrong.insert(index);
                        writeln!(out, "Wrong. This question is now worth {remaining}.")?;
                    }
                    AnswerOutcome::NoQuestion => break,
                }
            }
            Input::Unknown => {
                writeln!(out, "Pick a number from the list, h, b, or q.")?;
                continue;
            }
        }
        show_question(services, &mut out)?;
    }

    let session = services.session_mut();
    let final_score = session.game_score();
    let [latest, previous, oldest] = session.end_game().await.as_array();
    writeln!(out)?;
    writeln!(out, "Final score: {final_score}")?;
    writeln!(out, "Recent scores: {latest}  {previous}  {oldest}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{BookCatalog, BookId, QuestionBank};
    use services::LocalPurchaseBackend;
    use std::sync::Arc;
    use storage::repository::Storage;

    const BANK: &str = r#"[
        {"id": 1, "book": 1, "question": "Owl?", "hint": "Snowy", "answers": {"Hedwig": true, "Errol": false}},
        {"id": 2, "book": 5, "question": "Locked?", "hint": "", "answers": {"yes": true, "no": false}}
    ]"#;

    async fn build_services() -> AppServices {
        let catalog = BookCatalog::standard();
        let backend = Arc::new(LocalPurchaseBackend::for_catalog(&catalog));
        let bank = Arc::new(QuestionBank::from_json(BANK).unwrap());
        AppServices::new(Storage::in_memory(), bank, catalog, backend)
            .await
            .with_seed(1)
    }

    fn answer_number(services: &AppServices, text: &str) -> usize {
        services
            .session()
            .answers()
            .iter()
            .position(|a| a == text)
            .unwrap()
            + 1
    }

    #[tokio::test]
    async fn hint_and_wrong_answer_reduce_points() {
        let mut services = build_services().await;
        // Draw once to learn the answer order for this seed, then replay.
        services.start_game().await;
        let wrong = answer_number(&services, "Errol");
        let right = answer_number(&services, "Hedwig");
        let mut services_replay = build_services().await;

        let script = format!("h\nh\n{wrong}\n{wrong}\n{right}\n");
        let mut out = Vec::new();
        play(&mut services_replay, script.as_bytes(), &mut out)
            .await
            .unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("Hint: Snowy"));
        assert!(out.contains("Already revealed."));
        assert!(out.contains("You already tried that one."));
        assert!(out.contains("Correct! +3"));
        assert!(out.contains("You answered every question!"));
        assert_eq!(services_replay.session().recent_scores().as_array(), [3, 0, 0]);
        services.shutdown();
        services_replay.shutdown();
    }

    #[tokio::test]
    async fn quitting_records_partial_score() {
        let mut services = build_services().await;
        let mut out = Vec::new();
        play(&mut services, "9\nwhat\nq\n".as_bytes(), &mut out)
            .await
            .unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("Pick a number from the list."));
        assert!(out.contains("Final score: 0"));
        services.shutdown();
    }

    #[tokio::test]
    async fn disabled_books_block_play() {
        let mut services = build_services().await;
        services.store().toggle(BookId::new(1)).await;
        services.store().toggle(BookId::new(2)).await;

        let mut out = Vec::new();
        play(&mut services, "".as_bytes(), &mut out).await.unwrap();
        assert!(String::from_utf8(out).unwrap().contains("No questions available"));
        services.shutdown();
    }
}

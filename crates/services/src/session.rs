use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use std::fmt;
use std::sync::Arc;

use quiz_core::model::{BookId, Question, QuestionBank, QuestionId, RecentScores};
use storage::repository::ScoreRepository;

/// Points a question is worth before any hint or wrong answer.
pub const STARTING_QUESTION_SCORE: u32 = 5;

/// What happened when an answer was submitted for the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// Correct; `points` were added to the game score.
    Correct { points: u32 },
    /// Wrong; the question is now worth `remaining`.
    Incorrect { remaining: u32 },
    /// No question is on screen.
    NoQuestion,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Controller for one player's quiz games.
///
/// Questions are drawn at random from the part of the bank selected by
/// [`QuizSession::filter_to_books`]. Each question starts at
/// [`STARTING_QUESTION_SCORE`] points and loses one per hint or wrong answer
/// (never below zero); a correct answer banks whatever is left.
pub struct QuizSession {
    bank: Arc<QuestionBank>,
    filtered: Vec<QuestionId>,
    answered: Vec<QuestionId>,
    unanswered: Vec<QuestionId>,
    current: Option<Question>,
    answers: Vec<String>,
    question_score: u32,
    game_score: u32,
    recent_scores: RecentScores,
    scores: Arc<dyn ScoreRepository>,
    rng: StdRng,
}

impl QuizSession {
    /// Create a session over `bank`, restoring recent scores from `scores`.
    ///
    /// A missing or unreadable history starts from zeros.
    pub async fn load(bank: Arc<QuestionBank>, scores: Arc<dyn ScoreRepository>) -> Self {
        let recent_scores = match scores.load_scores().await {
            Ok(Some(saved)) => saved,
            Ok(None) => RecentScores::default(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to load recent scores, starting from zero");
                RecentScores::default()
            }
        };
        let filtered = bank.questions().iter().map(Question::id).collect();

        Self {
            bank,
            filtered,
            answered: Vec::new(),
            unanswered: Vec::new(),
            current: None,
            answers: Vec::new(),
            question_score: STARTING_QUESTION_SCORE,
            game_score: 0,
            recent_scores,
            scores,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Draw questions and shuffle answers from a fixed seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.reseed(seed);
        self
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Restrict play to questions from `books` and refill the unanswered pool.
    ///
    /// The question on screen is dropped; the next draw comes from the new pool.
    pub fn filter_to_books(&mut self, books: &[BookId]) {
        self.filtered = self.bank.in_books(books).map(Question::id).collect();
        self.unanswered = self.filtered.clone();
        self.clear_current();
        tracing::debug!(
            books = books.len(),
            questions = self.filtered.len(),
            "filtered question pool"
        );
    }

    /// Reset scores and the answered set, then draw the first question.
    pub fn start_game(&mut self) -> Option<&Question> {
        self.game_score = 0;
        self.question_score = STARTING_QUESTION_SCORE;
        self.answered.clear();
        self.unanswered = self.filtered.clone();
        self.clear_current();
        self.next_question()
    }

    /// Draw a random unanswered question from the filtered pool.
    ///
    /// Does nothing and returns `None` when the pool is exhausted; the
    /// previous question stays current.
    pub fn next_question(&mut self) -> Option<&Question> {
        if self.filtered.is_empty() {
            return None;
        }
        let id = *self.unanswered.choose(&mut self.rng)?;
        let question = self.bank.get(id)?.clone();

        self.question_score = STARTING_QUESTION_SCORE;
        self.answers = question.answer_texts().map(str::to_owned).collect();
        self.answers.shuffle(&mut self.rng);
        tracing::debug!(question = %id, book = %question.book(), "drew question");
        self.current = Some(question);
        self.current.as_ref()
    }

    /// Bank the remaining question score and retire the current question.
    ///
    /// Returns the points added; zero if there is no current question or it
    /// was already answered this game.
    pub fn answer_correctly(&mut self) -> u32 {
        let Some(id) = self.current.as_ref().map(Question::id) else {
            return 0;
        };
        let Some(pos) = self.unanswered.iter().position(|q| *q == id) else {
            return 0;
        };
        self.unanswered.swap_remove(pos);
        self.answered.push(id);
        self.game_score += self.question_score;
        self.question_score
    }

    /// Penalise a wrong answer; returns what the question is now worth.
    pub fn answer_incorrectly(&mut self) -> u32 {
        self.deduct()
    }

    /// Penalise revealing a hint; returns what the question is now worth.
    pub fn use_hint(&mut self) -> u32 {
        self.deduct()
    }

    /// Check `answer` against the current question and score it.
    pub fn submit_answer(&mut self, answer: &str) -> AnswerOutcome {
        let Some(question) = self.current.as_ref() else {
            return AnswerOutcome::NoQuestion;
        };
        if question.is_correct(answer) {
            AnswerOutcome::Correct {
                points: self.answer_correctly(),
            }
        } else {
            AnswerOutcome::Incorrect {
                remaining: self.answer_incorrectly(),
            }
        }
    }

    /// Push the game score onto the recent history and save it.
    ///
    /// A failed save is logged; the in-memory history is still updated.
    pub async fn end_game(&mut self) -> RecentScores {
        self.recent_scores.push(self.game_score);
        if let Err(err) = self.scores.save_scores(&self.recent_scores).await {
            tracing::warn!(error = %err, "failed to save recent scores");
        }
        self.recent_scores
    }

    fn clear_current(&mut self) {
        self.current = None;
        self.answers.clear();
    }

    fn deduct(&mut self) -> u32 {
        self.question_score = self.question_score.saturating_sub(1);
        self.question_score
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current.as_ref()
    }

    /// Answer texts of the current question in display order.
    #[must_use]
    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    #[must_use]
    pub fn correct_answer(&self) -> Option<&str> {
        self.current.as_ref().and_then(Question::correct_answer)
    }

    #[must_use]
    pub fn question_score(&self) -> u32 {
        self.question_score
    }

    #[must_use]
    pub fn game_score(&self) -> u32 {
        self.game_score
    }

    #[must_use]
    pub fn recent_scores(&self) -> RecentScores {
        self.recent_scores
    }

    #[must_use]
    pub fn answered(&self) -> &[QuestionId] {
        &self.answered
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.unanswered.len()
    }

    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.filtered.len()
    }

    /// True once every question in the filtered pool has been answered.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.unanswered.is_empty()
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("bank_len", &self.bank.len())
            .field("filtered_len", &self.filtered.len())
            .field("answered_len", &self.answered.len())
            .field("unanswered_len", &self.unanswered.len())
            .field("current", &self.current.as_ref().map(Question::id))
            .field("question_score", &self.question_score)
            .field("game_score", &self.game_score)
            .field("recent_scores", &self.recent_scores)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

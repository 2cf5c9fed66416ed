use rusqlite::{params, Connection};
use serde::Serialize;

use crate::ai::{ImagePayload, Recommender};
use crate::db::models::HealthQuiz;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize)]
pub struct QuizAnswers {
    pub question_1: String,
    pub question_2: String,
    pub question_3: Option<String>,
}

impl QuizAnswers {
    pub fn new(question_1: &str, question_2: &str, question_3: Option<&str>) -> Self {
        Self {
            question_1: question_1.trim().to_string(),
            question_2: question_2.trim().to_string(),
            question_3: question_3
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(String::from),
        }
    }
}

/// Persist a submitted quiz for `user_id`.
pub fn save_quiz(
    conn: &Connection,
    user_id: i64,
    answers: &QuizAnswers,
    image_path: Option<&str>,
) -> AppResult<HealthQuiz> {
    if answers.question_1.is_empty() || answers.question_2.is_empty() {
        return Err(AppError::BadRequest(
            "The first two questions are required".into(),
        ));
    }

    conn.execute(
        "INSERT INTO health_quizzes (user_id, question_1, question_2, question_3, image_path)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user_id,
            answers.question_1,
            answers.question_2,
            answers.question_3,
            image_path
        ],
    )?;

    let quiz = conn.query_row(
        &format!("SELECT {} FROM health_quizzes WHERE id = ?1", HealthQuiz::COLUMNS),
        params![conn.last_insert_rowid()],
        HealthQuiz::from_row,
    )?;
    tracing::info!("User {} submitted health quiz {}", user_id, quiz.id);
    Ok(quiz)
}

pub fn build_prompt(answers: &QuizAnswers) -> String {
    format!(
        "You are a health assistant. Analyze the following quiz answers and provide 3 short recommendations:\n\
         Q1: {}\n\
         Q2: {}\n\
         Q3: {}\n",
        answers.question_1,
        answers.question_2,
        answers.question_3.as_deref().unwrap_or("")
    )
}

/// Non-empty trimmed lines of the model's answer.
pub fn parse_recommendations(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Ask the AI service for recommendations. Failures are folded into a
/// single explanatory line rather than returned as errors.
pub async fn recommend(
    ai: &dyn Recommender,
    answers: &QuizAnswers,
    image: Option<ImagePayload>,
) -> Vec<String> {
    match ai.generate(&build_prompt(answers), image).await {
        Ok(text) => parse_recommendations(&text),
        Err(e) => {
            tracing::warn!("AI recommendation failed: {}", e);
            vec![format!("AI could not generate recommendations: {}", e)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AiError;
    use crate::db::test_pool;
    use async_trait::async_trait;

    struct Canned(Result<&'static str, ()>);

    #[async_trait]
    impl Recommender for Canned {
        async fn generate(
            &self,
            _prompt: &str,
            _image: Option<ImagePayload>,
        ) -> Result<String, AiError> {
            self.0.map(String::from).map_err(|_| AiError::Empty)
        }

        fn model(&self) -> &str {
            "canned"
        }
    }

    fn answers() -> QuizAnswers {
        QuizAnswers::new(" I sleep 5 hours ", "Rarely exercise", Some("   "))
    }

    #[test]
    fn answers_are_trimmed_and_blank_third_is_none() {
        let a = answers();
        assert_eq!(a.question_1, "I sleep 5 hours");
        assert_eq!(a.question_3, None);
    }

    #[test]
    fn prompt_embeds_all_answers() {
        let prompt = build_prompt(&QuizAnswers::new("a", "b", Some("c")));
        assert!(prompt.contains("Q1: a"));
        assert!(prompt.contains("Q2: b"));
        assert!(prompt.contains("Q3: c"));
        assert!(prompt.contains("3 short recommendations"));
    }

    #[test]
    fn recommendations_skip_blank_lines() {
        let lines = parse_recommendations("\n 1. Sleep more \n\n2. Walk daily\n   \n");
        assert_eq!(lines, vec!["1. Sleep more", "2. Walk daily"]);
    }

    #[test]
    fn save_requires_first_two_answers() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO users (id, email, password_hash) VALUES (1, 'u@x.io', 'h')",
            [],
        )
        .unwrap();

        let blank = QuizAnswers::new("", "b", None);
        assert!(matches!(
            save_quiz(&conn, 1, &blank, None),
            Err(AppError::BadRequest(_))
        ));

        let quiz = save_quiz(&conn, 1, &answers(), Some("img.png")).unwrap();
        assert_eq!(quiz.user_id, 1);
        assert_eq!(quiz.question_3, None);
        assert_eq!(quiz.image_path.as_deref(), Some("img.png"));
        assert_eq!(quiz.consultant_id, None);
    }

    #[tokio::test]
    async fn successful_ai_answer_becomes_lines() {
        let ai = Canned(Ok("Drink water\nStretch"));
        let recs = recommend(&ai, &answers(), None).await;
        assert_eq!(recs, vec!["Drink water", "Stretch"]);
    }

    #[tokio::test]
    async fn ai_failure_is_downgraded_to_message() {
        let ai = Canned(Err(()));
        let recs = recommend(&ai, &answers(), None).await;
        assert_eq!(recs.len(), 1);
        assert!(recs[0].starts_with("AI could not generate recommendations"));
    }
}

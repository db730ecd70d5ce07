use futures::future::BoxFuture;
use serde::Deserialize;

use super::{Question, QuestionSupply, SupplyError};

/// Fetches the question sequence from an HTTP trivia provider that answers
/// with a `results` array of question/correct/incorrect triples.
pub struct HttpQuestionSupply {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    results: Vec<ProviderQuestion>,
}

#[derive(Debug, Deserialize)]
struct ProviderQuestion {
    question: String,
    correct_answer: String,
    incorrect_answers: Vec<String>,
}

impl HttpQuestionSupply {
    /// Build a supply pointed at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

fn map_results(response: ProviderResponse) -> Vec<Question> {
    response
        .results
        .into_iter()
        .map(|item| Question {
            prompt: item.question,
            correct_answer: item.correct_answer,
            distractors: item.incorrect_answers,
        })
        .collect()
}

impl QuestionSupply for HttpQuestionSupply {
    fn fetch_questions(&self) -> BoxFuture<'static, Result<Vec<Question>, SupplyError>> {
        let client = self.client.clone();
        let url = self.url.clone();
        Box::pin(async move {
            let response = client.get(&url).send().await?.error_for_status()?;
            let body: ProviderResponse = response.json().await?;
            let questions = map_results(body);
            if questions.is_empty() {
                return Err(SupplyError::Empty);
            }
            Ok(questions)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_payload_maps_into_questions() {
        let raw = r#"{
            "results": [
                {
                    "question": "Which team won in 1998?",
                    "correct_answer": "France",
                    "incorrect_answers": ["Brazil", "Italy", "Germany"]
                }
            ]
        }"#;

        let response: ProviderResponse = serde_json::from_str(raw).unwrap();
        let questions = map_results(response);

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].prompt, "Which team won in 1998?");
        assert_eq!(questions[0].correct_answer, "France");
        assert_eq!(questions[0].distractors.len(), 3);
    }
}

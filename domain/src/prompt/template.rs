//! Prompt templates for the consensus phase

/// Consensus text used when no branch produced a usable response.
pub const NO_VALID_RESPONSES: &str =
    "No valid responses were received from any model, so no consensus could be formed.";

/// Builds the prompt sent to the summarizer.
///
/// The wording depends on how many usable responses there are: one response
/// is enhanced and clarified, several are synthesized.
pub struct ConsensusPrompt;

impl ConsensusPrompt {
    /// Build the summarizer prompt, or `None` when nothing is usable.
    ///
    /// Responses are anonymized as "Response A", "Response B", ... so the
    /// summarizer cannot tell generated and manual entries apart.
    pub fn build(question: &str, responses: &[&str]) -> Option<String> {
        match responses {
            [] => None,
            [single] => Some(Self::enhance(question, single)),
            many => Some(Self::synthesize(question, many)),
        }
    }

    fn enhance(question: &str, response: &str) -> String {
        format!(
            r#"You are refining an expert answer.

Original question: {question}

Answer:
{response}

Enhance and clarify this answer. Correct any mistakes, fill obvious gaps and
improve structure, but keep its substance. Reply with the improved answer only."#
        )
    }

    fn synthesize(question: &str, responses: &[&str]) -> String {
        let mut prompt = format!(
            r#"You are a moderator synthesizing several expert answers into one consensus answer.

Original question: {question}

Expert responses:
"#
        );

        for (i, content) in responses.iter().enumerate() {
            prompt.push_str(&format!("\n--- {} ---\n{}\n", Self::label(i), content));
        }

        prompt.push_str(
            r#"
Write a single answer that combines the strongest, best supported points of the
responses above. Where they agree, state the shared conclusion plainly. Where
they disagree, say so and explain which position is better supported. Do not
mention the responses by label; reply with the consensus answer only."#,
        );

        prompt
    }

    fn label(index: usize) -> String {
        match u8::try_from(index).ok().filter(|i| *i < 26) {
            Some(i) => format!("Response {}", (b'A' + i) as char),
            None => format!("Response {}", index + 1),
        }
    }
}

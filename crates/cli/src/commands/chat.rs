//! Interactive chat loop.

use clap::Args;
use luxas_core::AppConfig;
use luxas_knowledge::{ConversationHistory, RagAnswer, RagContext};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// What a line typed at the prompt asks for.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Quit,
    Reset,
    Skip,
    Question(&'a str),
}

fn classify(line: &str) -> Input<'_> {
    match line.trim() {
        "" => Input::Skip,
        "/quit" | "/exit" => Input::Quit,
        "/reset" => Input::Reset,
        question => Input::Question(question),
    }
}

/// Interactive question loop; the history lives for the session only
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Number of past turns kept in memory (0 keeps everything)
    #[arg(long, default_value = "0")]
    pub max_turns: usize,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Starting chat session");

        let context = RagContext::from_config(config)?;
        let mut history = ConversationHistory::default();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        println!("LuXas - posez vos questions sur les propositions de loi.");
        println!("/reset efface l'historique, /quit termine la session.");

        loop {
            print!("\nVous > ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match classify(&line) {
                Input::Skip => continue,
                Input::Quit => break,
                Input::Reset => {
                    history = ConversationHistory::default();
                    println!("Historique effacé.");
                }
                Input::Question(question) => {
                    let answer = context.answer(question, history.turns()).await;
                    let rendered = answer.render();
                    println!("\nLuXas > {}", rendered);

                    // Citations stay out of the history fed back to the model
                    let remembered = match &answer {
                        RagAnswer::Answered(a) => a.answer_text.clone(),
                        _ => rendered,
                    };
                    history.push_user(question);
                    history.push_assistant(remembered);

                    if self.max_turns > 0 && history.len() > self.max_turns {
                        let keep = history.recent(self.max_turns).to_vec();
                        history = ConversationHistory::from(keep);
                    }
                }
            }
        }

        tracing::info!(turns = history.len(), "Chat session ended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_commands() {
        assert_eq!(classify("  /quit "), Input::Quit);
        assert_eq!(classify("/exit"), Input::Quit);
        assert_eq!(classify("/reset"), Input::Reset);
        assert_eq!(classify("   "), Input::Skip);
        assert_eq!(
            classify(" Que dit la loi 123 ? "),
            Input::Question("Que dit la loi 123 ?")
        );
    }
}

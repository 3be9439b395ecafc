use std::sync::Arc;

use atomic_agents::{
    logging, Agent, AppConfig, BasicChatInput, BasicChatOutput, ChatHistory, IoSchema,
    LanguageModel, ModelProvider, OpenAIClient, Result, Role, StubModel, SystemPromptGenerator,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = match std::env::args().nth(1) {
        Some(path) => AppConfig::from_env_or_file(path)?,
        None => AppConfig::from_env(),
    };
    logging::init(&cfg.logging)?;

    let mut history = match cfg.history.max_turns {
        Some(max_turns) => ChatHistory::with_max_turns(max_turns),
        None => ChatHistory::new(),
    };
    let greeting = BasicChatOutput {
        chat_message: "Hello! How can I help you today?".into(),
    };
    history.add_message(Role::Assistant, greeting.to_content()?);

    let prompt = SystemPromptGenerator::new().with_output_instructions([
        "Answer in one or two sentences.",
        "Ask a follow-up question when the request is ambiguous.",
    ]);

    match cfg.model.provider {
        ModelProvider::OpenAi => {
            info!(model = %cfg.model.model, "using OpenAI-compatible endpoint");
            let model = Arc::new(OpenAIClient::from_config(&cfg.model)?);
            chat(Agent::new(model).with_history(history).with_system_prompt(prompt)).await
        }
        ModelProvider::Stub => {
            info!("answering with a scripted model");
            let script = (1..=20)
                .map(|i| serde_json::json!({ "chat_message": format!("Scripted reply #{i}.") }).to_string())
                .collect();
            let model = StubModel::new(script);
            chat(Agent::new(model).with_history(history).with_system_prompt(prompt)).await
        }
    }
}

async fn chat<M: LanguageModel>(mut agent: Agent<BasicChatInput, BasicChatOutput, M>) -> Result<()> {
    println!("Agent: Hello! How can I help you today? (type `exit` to quit, `/reset` to start over)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "exit" | "quit" => break,
            "/reset" => {
                agent.reset_history();
                println!("Agent: history cleared.");
                continue;
            }
            _ => {}
        }

        match agent.run(Some(BasicChatInput::new(line))).await {
            Ok(output) => println!("Agent: {}", output.chat_message),
            Err(err) => eprintln!("error: {err}"),
        }
    }
    Ok(())
}

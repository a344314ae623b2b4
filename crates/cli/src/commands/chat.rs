//! `ragway chat`: interactive or single-message chat mode.

use crate::{session, startup};
use std::path::Path;
use tokio::io::BufReader;

pub async fn run(config_path: &Path, message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = startup::load_config(config_path)?;
    let mut assistant = startup::build_assistant(&config, config_path).await?;

    if let Some(msg) = message {
        // Single message mode
        let answer = assistant.ask(&msg).await?;
        println!("{}", answer.text);
        return Ok(());
    }

    let sentinel = &config.session.sentinel;
    println!();
    println!("  Ragway — Interactive Mode");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!("  Router:    {:?}", config.router.mode);
    println!(
        "  Sources:   {}",
        config
            .sources
            .iter()
            .map(|s| s.id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
    println!("  Type your question and press Enter. Type '{sentinel}' to quit.");
    println!();

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    let stats = session::run(&mut assistant, stdin, &mut stdout, sentinel).await?;

    println!();
    println!("  Goodbye! ({} answered, {} failed)", stats.answered, stats.failed);
    println!();
    Ok(())
}

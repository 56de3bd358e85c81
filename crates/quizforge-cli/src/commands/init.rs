//! The `quizforge init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("quizforge.toml").exists() {
        println!("quizforge.toml already exists, skipping.");
    } else {
        std::fs::write("quizforge.toml", SAMPLE_CONFIG)?;
        println!("Created quizforge.toml");
    }

    let sample_path = std::path::Path::new("sample-quiz.csv");
    if sample_path.exists() {
        println!("sample-quiz.csv already exists, skipping.");
    } else {
        std::fs::write(sample_path, SAMPLE_CSV)?;
        println!("Created sample-quiz.csv");
    }

    println!("\nNext steps:");
    println!("  1. Set OPENAI_API_KEY (or edit quizforge.toml) to use `generate` and `coach`");
    println!("  2. Run: quizforge quiz import-csv sample-quiz.csv --title \"Networking basics\"");
    println!("  3. Run: quizforge exam start --questions 5 --minutes 10");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizforge configuration

default_provider = "openai"
default_model = "gpt-4o-mini"
default_temperature = 0.7
max_tokens = 2000
state_path = "./quizforge-state.json"

[providers.openai]
type = "openai"
api_key = "${OPENAI_API_KEY}"

# Offline provider with canned replies, handy for trying things out.
[providers.offline]
type = "mock"
response = "[]"
"#;

const SAMPLE_CSV: &str = "prompt;answer;tags
What does DNS translate?;Domain names to IP addresses;dns basics
Which port does HTTPS use by default?;443;tls ports
What layer of the OSI model does IP operate on?;Network layer;osi
What does TTL stand for in a DNS record?;Time to live;dns
Which protocol resolves an IP address to a MAC address?;ARP;arp basics
";

//! `autorespond check`: run recognition over captured text.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use ar_config::Config;
use ar_detection::{PromptParser, RecognizedPrompt};
use serde_json::{json, Value};

pub fn parser_for(config: &Config) -> PromptParser {
    PromptParser::new(config.whitelist(), config.scan_limits())
}

pub fn read_capture(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

pub fn report(prompt: &RecognizedPrompt) -> Value {
    json!({
        "prompt": prompt,
        "option_to_select": prompt.is_valid.then(|| prompt.option_to_select()),
        "option_description": prompt.is_valid.then(|| prompt.option_description()),
    })
}

pub fn run_check(path: &Path, config: &Config) -> Result<()> {
    let text = read_capture(path)?;
    let prompt = parser_for(config).parse(&text);
    println!("{}", serde_json::to_string_pretty(&report(&prompt))?);
    Ok(())
}

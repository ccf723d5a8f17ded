use anyhow::Result;

use mnemos::triggers::detect_triggers;

/// Print the triggers found in `message`, one per line.
pub fn detect(message: &str, json: bool) -> Result<()> {
    let triggers = detect_triggers(message);

    if json {
        println!("{}", serde_json::to_string_pretty(&triggers)?);
        return Ok(());
    }

    if triggers.is_empty() {
        println!("No triggers.");
        return Ok(());
    }
    for t in &triggers {
        println!(
            "  {:?} -> {} (confidence: {:.1}, phrase: \"{}\")",
            t.kind,
            t.category(),
            t.confidence,
            t.phrase
        );
    }
    Ok(())
}

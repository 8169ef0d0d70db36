use anyhow::{Context, Result};
use relay_core::PromptBook;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Reads every `*.md` file in `dir_path`, keyed by file stem.
pub fn load_prompts(dir_path: &Path) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();

    for entry in fs::read_dir(dir_path)
        .with_context(|| format!("Failed to read prompts directory: {}", dir_path.display()))?
    {
        let path = entry?.path();

        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem for prompt file")?
                .to_string();

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;

            prompts.insert(prompt_key, content);
        }
    }

    Ok(prompts)
}

/// Built-in prompts, with any files found in `dir_path` layered on top.
pub fn load_prompt_book(dir_path: Option<&Path>) -> Result<PromptBook> {
    let Some(dir_path) = dir_path else {
        return Ok(PromptBook::new());
    };

    let files = load_prompts(dir_path)?;
    let loaded = files.len();
    let (book, unknown) = PromptBook::with_overrides(files);
    for key in &unknown {
        tracing::warn!("Ignoring prompt file with unknown key: {}.md", key);
    }
    tracing::info!(
        "Loaded {} prompt overrides from {}",
        loaded - unknown.len(),
        dir_path.display()
    );
    Ok(book)
}

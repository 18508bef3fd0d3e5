//! Prompt templates for summarization
//!
//! The document text is always sent as the user text, untouched. Task
//! instructions are appended to the configured system prompt.

/// Task for the map phase
pub fn chunk_instructions(index: usize, total: usize) -> String {
    if total <= 1 {
        return "Summarize the document provided by the user.".to_string();
    }

    format!(
        "The user text is section {} of {} of a longer document. Summarize this section, \
         keeping every important fact, figure and date. Do not add an introduction.",
        index + 1,
        total
    )
}

/// Task for the reduce phase
pub const REDUCE_INSTRUCTIONS: &str = "The user text contains summaries of consecutive \
sections of one document, in order. Condense these section summaries into one \
mobile-readable summary: remove duplicates, keep the most important facts and dates.";

/// Append a task to the configured system prompt
pub fn with_task(system_prompt: &str, task: &str) -> String {
    let base = system_prompt.trim();
    if base.is_empty() {
        task.to_string()
    } else {
        format!("{}\n\n{}", base, task)
    }
}

/// Intermediate text for the reduce phase, one header per section
pub fn join_section_summaries<'a, I>(summaries: I) -> String
where
    I: IntoIterator<Item = (usize, &'a str)>,
{
    summaries
        .into_iter()
        .map(|(index, text)| format!("[Section {}]\n{}", index + 1, text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

//! Prompt construction and response parsing for subtask generation.

use super::GenerationRequest;

/// System instruction sent with every generation request.
pub const SYSTEM_PROMPT: &str =
    "You are a productivity assistant that helps break down tasks into manageable subtasks.";

/// Placeholder used when the task has no description.
pub const NO_DESCRIPTION: &str = "No description provided";

/// Build the user prompt for a generation request.
pub fn build_prompt(request: &GenerationRequest) -> String {
    let description = if request.description.trim().is_empty() {
        NO_DESCRIPTION
    } else {
        request.description.trim()
    };

    format!(
        "Break down the following task into {count} clear, actionable subtasks:\n\
         \n\
         Task Title: {title}\n\
         Description: {description}\n\
         Category: {category}\n\
         Priority: {priority}\n\
         \n\
         Guidelines for creating subtasks:\n\
         1. Each subtask should be specific and actionable\n\
         2. Each subtask should be completable in 5-30 minutes\n\
         3. Order subtasks logically (preparation steps first, etc.)\n\
         4. Include any necessary setup or preparation steps\n\
         5. Include a final review/verification step if appropriate\n\
         \n\
         Format the response as a list of subtask titles only, one per line.",
        count = request.count,
        title = request.title.trim(),
        description = description,
        category = request.category,
        priority = request.priority,
    )
}

/// Split model output into subtask titles.
///
/// Blank lines are dropped, the rest are trimmed and kept in order. The
/// result is truncated to `count`, never padded.
pub fn parse_subtask_lines(text: &str, count: usize) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(count)
        .map(str::to_string)
        .collect()
}

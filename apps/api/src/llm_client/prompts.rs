// Prompt templates for capabilities that wrap user input in fixed instructions.

/// Resume review prompt. `{resume_text}` is replaced with the extracted PDF text.
pub const RESUME_REVIEW_PROMPT: &str = "Review the following resume and provide constructive \
    feedback on its strengths, weaknesses, and areas for improvement.\n\n\
    Resume Content: {resume_text}";

pub fn resume_review_prompt(resume_text: &str) -> String {
    RESUME_REVIEW_PROMPT.replace("{resume_text}", resume_text)
}

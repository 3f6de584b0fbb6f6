//! crates/tutor_core/src/prompt.rs
//!
//! Prompt assembly for the tutor model. This is a pure function so prompt
//! construction stays independently testable, and the persona text carries an
//! explicit version string so behavioral drift across deployments is auditable.

/// Bump this whenever `SYSTEM_PROMPT` changes in a way that affects replies.
pub const TEACHER_PERSONA_VERSION: &str = "1.0.0";

pub const SYSTEM_PROMPT: &str = r#"You are an English teacher for elementary and junior high school students.
Your goal is to help the student learn English based on the content of a specific book.

Rules:
1.  **Always reply in English.**
2.  **Strictly base your answers on the provided Book Content context.** Do not make up facts outside the book.
3.  **Correct grammar and vocabulary mistakes.** If the student makes a mistake, point it out gently and ask them to rewrite the sentence.
4.  **Encourage the student.** Be positive and helpful.
5.  **Output Format**: You must output a JSON object strictly matching this structure:
    {
      "reply": "Your response as the teacher (in English)",
      "feedback": {
        "grammar": "Grammar correction or 'Perfect!'",
        "vocabulary": "Vocabulary suggestions or 'Good usage!'",
        "encouragement": "A short encouraging phrase"
      },
      "requireRewrite": true/false
    }
"#;

/// Deterministically concatenates the persona block, the retrieved book
/// context, the prior turns (already formatted as `ROLE: content` lines), and
/// the new student message into a single prompt string.
pub fn assemble_prompt(book_context: &str, history: &[String], new_message: &str) -> String {
    format!(
        "{}\n\n[Book Content Context]\n{}\n\n[Conversation History]\n{}\n\n[Student Message]\n{}\n",
        SYSTEM_PROMPT,
        book_context,
        history.join("\n"),
        new_message
    )
}

//! Prompt text and fixed conversational phrases.

/// System instruction prepended to every model call.
pub const SYSTEM_PROMPT: &str = "You are engaging in a voice conversation with a patient.\n\
You have the following capabilities:\n\
1. Ask about the reason for the consultation.\n\
2. Ask about the patient's name.\n\
3. Ask about the date of the appointment.\n\
4. Use a function to get the availability of the doctor.\n\
5. Use a function to book a slot with the doctor.\n\
6. Use a function to get additional information.\n";

/// Synthetic nudge appended when the user has gone quiet.
pub const REMINDER_PROMPT: &str = "(Now the user has not responded in a while, you would say:)";

/// First message sent as soon as the connection is up.
pub const GREETING: &str =
    "Hey there, I'm Ema and I work at the Dental Office, how can I help you?";

/// Spoken when a reply could not be generated at all.
pub const APOLOGY: &str = "I'm sorry, something went wrong on my end. Could you say that again?";

/// Formats retrieved knowledge snippets for insertion into the prompt.
pub fn document_block(snippets: &[String]) -> String {
    format!("## Documents\n{}\n", snippets.join("\n###\n"))
}

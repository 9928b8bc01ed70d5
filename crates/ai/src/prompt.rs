//! Prompt construction for decomposition and coaching.

use neurocoach_core::{DecompositionRequest, Goal, Role, SessionMessage, Subgoal};

use crate::generator::ChatMessage;

/// Transcript messages replayed to the coach on each turn.
pub const HISTORY_LIMIT: usize = 20;

const DECOMPOSITION_SYSTEM: &str = "You are an expert in goal setting and planning. \
You break goals into concrete, measurable steps and answer with JSON only.";

const COACH_PERSONA: &str = "You are Alex, an empathetic personal-development coach who uses \
cognitive behavioural techniques. Give practical advice, ask one guiding question at a time, \
and keep answers to one to three sentences.";

/// Messages asking the provider to split a goal into subgoals.
pub fn decomposition_messages(request: &DecompositionRequest) -> Vec<ChatMessage> {
    let mut prompt = format!(
        "Break the goal \"{}\" into 3-5 concrete, measurable subgoals.\n",
        request.goal_title.trim()
    );
    if let Some(description) = request.goal_description.as_deref() {
        prompt.push_str(&format!("Goal description: {}\n", description.trim()));
    }
    if !request.existing.is_empty() {
        prompt.push_str("\nAlready planned, do not repeat:\n");
        for draft in &request.existing {
            prompt.push_str(&format!("- {}\n", draft.title));
        }
    }
    prompt.push_str(
        "\nEach subgoal must be specific, measurable, achievable, relevant to the goal \
and time-bound.\n\
Return a JSON array of objects with \"title\" and \"description\" fields, for example:\n\
[{\"title\": \"Learn basic grammar\", \"description\": \"Finish a beginner grammar course in two weeks\"}]",
    );

    vec![ChatMessage::system(DECOMPOSITION_SYSTEM), ChatMessage::user(prompt)]
}

/// System prompt for the coach, including the user's open goals.
pub fn coach_system_prompt(goals: &[(Goal, Vec<Subgoal>)]) -> String {
    let mut prompt = String::from(COACH_PERSONA);
    if goals.is_empty() {
        prompt.push_str("\n\nThe user has not set any goals yet.");
        return prompt;
    }

    prompt.push_str("\n\nThe user's current goals:");
    for (goal, subgoals) in goals {
        prompt.push_str(&format!(
            "\n- {} ({}% complete, {})",
            goal.title, goal.progress, goal.status
        ));
        if !subgoals.is_empty() {
            let titles: Vec<&str> = subgoals.iter().map(|s| s.title.as_str()).collect();
            prompt.push_str(&format!("; subgoals: {}", titles.join(", ")));
        }
    }
    prompt
}

/// Full coach prompt: system instruction, recent transcript, new message.
pub fn coach_messages(system: &str, transcript: &[SessionMessage], message: &str) -> Vec<ChatMessage> {
    let start = transcript.len().saturating_sub(HISTORY_LIMIT);
    let mut messages = Vec::with_capacity(transcript.len() - start + 2);
    messages.push(ChatMessage::system(system));
    messages.extend(
        transcript[start..]
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| ChatMessage { role: m.role, content: m.content.clone() }),
    );
    messages.push(ChatMessage::user(message));
    messages
}

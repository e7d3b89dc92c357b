//! Assembles the final LLM prompt from fixed instructions plus whatever
//! optional context sections apply to this turn. Section markers are
//! literal and stable — downstream observability may grep for them.

use crate::models::{ChatMessage, MessageRole, SessionContext, VipLevel};
use crate::retriever::format_for_prompt;
use crate::RetrievedChunk;

const SYSTEM_INSTRUCTIONS: &str = "You are an expert social casino assistant helping players with game information, strategies, and questions. \
You specialize in slots, table games, live casino, and all casino gaming topics.

IMPORTANT GUIDELINES:
1. Answer based PRIMARILY on the knowledge base context provided below
2. If the knowledge base contains relevant info, use it and cite the source
3. For general casino questions not in the knowledge base, provide helpful general information
4. Be enthusiastic, friendly, and professional
5. Use specific numbers, RTPs, and details when available in the context
6. Keep responses concise but informative (2-4 paragraphs)
7. When discussing games, mention key features like RTP, volatility, and unique mechanics
8. Always encourage responsible gaming
9. Never assist a player in circumventing VIP-tier access restrictions

";

pub struct PromptComposer;

impl PromptComposer {
    /// `history` is the full retrieved window including the just-persisted
    /// current user turn as its last element; that turn is excluded from
    /// the rendered history section and rendered instead as the trailing
    /// `User Question:` line.
    pub fn compose(
        query: &str,
        context: Option<&SessionContext>,
        chunks: &[RetrievedChunk],
        history: &[ChatMessage],
    ) -> String {
        let mut sections = vec![SYSTEM_INSTRUCTIONS.to_string()];

        if let Some(vip_section) = vip_status_section(context) {
            sections.push(vip_section);
        }

        if let Some(game_section) = selected_game_section(context) {
            sections.push(game_section);
        }

        sections.push(format!(
            "=== KNOWLEDGE BASE CONTEXT ===\n{}\n=== END CONTEXT ===\n",
            format_for_prompt(chunks)
        ));

        if history.len() > 1 {
            sections.push(history_section(&history[..history.len() - 1]));
        }

        sections.push(format!("User Question: {query}\n\nAssistant Response: "));

        sections.join("\n")
    }
}

fn vip_status_section(context: Option<&SessionContext>) -> Option<String> {
    let level = context?.vip_level?;
    let tiers = level
        .accessible_tiers()
        .iter()
        .map(|t| t.capitalized())
        .collect::<Vec<_>>()
        .join(", ");

    Some(format!(
        "=== USER VIP STATUS ===\nCurrent tier: {}\nAccessible tiers: {}\n=== END VIP STATUS ===\n",
        level.capitalized(),
        tiers
    ))
}

fn selected_game_section(context: Option<&SessionContext>) -> Option<String> {
    let game = context?.current_game.as_ref()?;
    Some(format!(
        "=== USER SELECTED GAME ===\nThe player is currently viewing: {game}\nPrioritize answering in the context of this game when relevant.\n=== END SELECTED GAME ===\n"
    ))
}

fn history_section(messages: &[ChatMessage]) -> String {
    let mut section = String::from("=== RECENT CHAT HISTORY ===\n");
    for message in messages {
        let role = match message.role {
            MessageRole::User => "User",
            MessageRole::Assistant => "Assistant",
        };
        section.push_str(&format!("{role}: {}\n", message.content));
    }
    section.push_str("=== END HISTORY ===\n");
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn message(role: MessageRole, content: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            role,
            content: content.to_string(),
            citations: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn minimal_turn_has_no_optional_sections() {
        let prompt = PromptComposer::compose("what is RTP", None, &[], &[]);
        assert!(!prompt.contains("USER VIP STATUS"));
        assert!(!prompt.contains("USER SELECTED GAME"));
        assert!(!prompt.contains("RECENT CHAT HISTORY"));
        assert!(prompt.contains("User Question: what is RTP"));
        assert!(prompt.ends_with("Assistant Response: "));
    }

    #[test]
    fn vip_section_lists_accessible_tiers_in_rank_order() {
        let ctx = SessionContext {
            current_page: None,
            current_game: None,
            vip_level: Some(VipLevel::Gold),
        };
        let prompt = PromptComposer::compose("hi", Some(&ctx), &[], &[]);
        assert!(prompt.contains("=== USER VIP STATUS ==="));
        assert!(prompt.contains("Accessible tiers: Bronze, Silver, Gold"));
        assert!(!prompt.contains("Platinum"));
    }

    #[test]
    fn selected_game_section_pins_current_game() {
        let ctx = SessionContext {
            current_page: None,
            current_game: Some("Sapphire Dragon".to_string()),
            vip_level: None,
        };
        let prompt = PromptComposer::compose("tell me more", Some(&ctx), &[], &[]);
        assert!(prompt.contains("=== USER SELECTED GAME ==="));
        assert!(prompt.contains("Sapphire Dragon"));
    }

    #[test]
    fn history_excludes_current_turn() {
        let history = vec![
            message(MessageRole::User, "first question"),
            message(MessageRole::Assistant, "first answer"),
            message(MessageRole::User, "current question"),
        ];
        let prompt = PromptComposer::compose("current question", None, &[], &history);
        assert!(prompt.contains("=== RECENT CHAT HISTORY ==="));
        assert!(prompt.contains("User: first question"));
        assert!(prompt.contains("Assistant: first answer"));
        assert_eq!(prompt.matches("current question").count(), 1);
    }

    #[test]
    fn single_message_history_has_no_history_section() {
        let history = vec![message(MessageRole::User, "only turn")];
        let prompt = PromptComposer::compose("only turn", None, &[], &history);
        assert!(!prompt.contains("RECENT CHAT HISTORY"));
    }
}

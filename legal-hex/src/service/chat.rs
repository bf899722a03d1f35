//! Chat Application Service
//!
//! Runs one user/assistant exchange inside a capped conversation.

use std::sync::Arc;

use legal_types::{
    AccountId, AccountStore, AppError, ChatSendResponse, Conversation, ConversationId,
    GenerationRequest, PromptTurn, RepoError, TURN_CAP, TextGenerator, Turn, TurnRole,
};

/// Reply stored when the model answers without any text.
pub const NO_REPLY: &str = "No response from the assistant";

/// Instruction sent with every generation request.
pub fn system_instruction(country: &str) -> String {
    format!(
        "You are a helpful legal assistant for people in {country}. \
         Answer using the laws of {country}. \
         Explain things simply, as if to a 15-year-old. \
         Always mention the law or rule your answer is based on."
    )
}

/// Application service for conversations with the legal assistant.
pub struct ChatService<R: AccountStore> {
    repo: Arc<R>,
    generator: Arc<dyn TextGenerator>,
}

impl<R: AccountStore> ChatService<R> {
    pub fn new(repo: Arc<R>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { repo, generator }
    }

    /// Sends a user message and returns the assistant's reply.
    ///
    /// Without `conversation_id` a new conversation is started. The user turn
    /// is only accepted if its reply still fits under the turn cap.
    pub async fn send(
        &self,
        owner: AccountId,
        message: &str,
        country: &str,
        conversation_id: Option<ConversationId>,
    ) -> Result<ChatSendResponse, AppError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::MissingFields("message".into()));
        }

        let country = match country.trim() {
            "" => {
                self.repo
                    .find_account_by_id(owner)
                    .await?
                    .ok_or_else(|| AppError::AccountNotFound(owner.to_string()))?
                    .country
            }
            given => given.to_string(),
        };

        let conversation = match conversation_id {
            Some(id) => self
                .repo
                .find_conversation_by_id(id)
                .await?
                .filter(|c| c.owner_id == owner)
                .ok_or(AppError::ConversationNotFound(id))?,
            None => {
                let conversation = Conversation::start(owner, message)?;
                let conversation = self.repo.create_conversation(conversation).await?;
                tracing::info!(conversation_id = %conversation.id, %owner, "Conversation started");
                conversation
            }
        };

        let user_turn = self
            .repo
            .append_turn_within_cap(conversation.id, TurnRole::User, message, Turn::EXCHANGE_SIZE)
            .await
            .map_err(|e| match e {
                RepoError::NotFound => AppError::ConversationNotFound(conversation.id),
                e => e.into(),
            })?;

        let history = self
            .repo
            .list_turns(conversation.id, TURN_CAP)
            .await?
            .into_iter()
            .map(|turn| PromptTurn {
                role: turn.role,
                text: turn.message,
            })
            .collect();

        let request = GenerationRequest {
            instruction: system_instruction(&country),
            history,
        };

        let reply = match self.generator.generate(&request).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!(conversation_id = %conversation.id, error = %err, "Generation failed");
                if let Err(e) = self.repo.delete_turn(user_turn.id).await {
                    tracing::error!(turn_id = %user_turn.id, error = %e, "Failed to roll back user turn");
                }
                return Err(AppError::UpstreamChat(err.to_string()));
            }
        };

        let reply = reply
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| NO_REPLY.to_string());

        self.repo
            .append_turn(conversation.id, TurnRole::Bot, &reply)
            .await?;

        tracing::debug!(
            conversation_id = %conversation.id,
            position = user_turn.position,
            "Exchange stored"
        );

        Ok(ChatSendResponse {
            reply,
            conversation_id: conversation.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_is_localized() {
        let instruction = system_instruction("Kenya");
        assert!(instruction.contains("people in Kenya"));
        assert!(instruction.contains("laws of Kenya"));
        assert!(instruction.contains("15-year-old"));
    }
}

//! Assistant identity bootstrap

use std::collections::BTreeSet;

use tracing::info;

use super::{AssistantApi, CreateAssistantRequest};
use crate::store::KeyValueStore;
use crate::tool::ToolDefinition;
use crate::{Error, Result};

/// Store key holding the remote assistant id
pub const ASSISTANT_ID_KEY: &str = "assistant_id";

/// How the assistant is created when no identity is stored yet
#[derive(Debug, Clone)]
pub struct AssistantProfile {
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub model: String,
    pub tools: Vec<ToolDefinition>,
}

impl AssistantProfile {
    /// Scheduling assistant restricted to calendar topics
    pub fn scheduling(model: impl Into<String>, tools: Vec<ToolDefinition>) -> Self {
        Self {
            name: "Assistente Pessoal".to_string(),
            description: "Assistente pessoal de agendamento de reuniões e coleta de informações \
                de próximas reuniões com conexão ao Google Calendar"
                .to_string(),
            instructions: "Seja gentil e respeitoso, agende reuniões e colete informações de \
                reuniões futuras, sua função é também montar as funções que permitam chamar as \
                funções e não falar sobre tópico algum que não seja relacionado a eventos"
                .to_string(),
            model: model.into(),
            tools,
        }
    }

    fn function_names(&self) -> BTreeSet<&str> {
        self.tools.iter().filter_map(|t| t.function_name()).collect()
    }

    fn to_request(&self) -> CreateAssistantRequest {
        CreateAssistantRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            instructions: self.instructions.clone(),
            model: self.model.clone(),
            tools: self.tools.clone(),
        }
    }
}

/// Return the stored assistant id, creating the assistant on first use
///
/// A stored assistant whose advertised functions differ from `profile.tools`
/// is rejected with [`Error::SchemaMismatch`].
pub async fn ensure_assistant(
    api: &dyn AssistantApi,
    store: &dyn KeyValueStore,
    profile: &AssistantProfile,
) -> Result<String> {
    if let Some(assistant_id) = store.get(ASSISTANT_ID_KEY)? {
        let assistant = api.retrieve_assistant(&assistant_id).await?;

        let advertised: BTreeSet<&str> =
            assistant.tools.iter().filter_map(|t| t.function_name()).collect();
        let expected = profile.function_names();
        if advertised != expected {
            return Err(Error::SchemaMismatch(format!(
                "assistant {} advertises {:?}, expected {:?}",
                assistant_id, advertised, expected
            )));
        }

        info!(assistant_id = %assistant.id, "Using stored assistant");
        return Ok(assistant.id);
    }

    info!(name = %profile.name, model = %profile.model, "No stored assistant, creating one");
    let assistant = api.create_assistant(&profile.to_request()).await?;
    store.put(ASSISTANT_ID_KEY, &assistant.id)?;
    info!(assistant_id = %assistant.id, "Created assistant");

    Ok(assistant.id)
}

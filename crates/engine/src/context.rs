//! Conversation window and system directive.

use triago_core::domain::message::{MessageOrigin, StoredMessage};
use triago_core::sanitize::sanitize_first_name;

use triago_llm::types::PromptMessage;

use crate::resolve::EntitySnapshot;

/// Used when a contact's name sanitizes down to nothing.
const ANONYMOUS_CONTACT: &str = "Amigo(a)";

/// Chronological, text-only slice of a ticket's history, capped at the
/// configured maximum.
#[derive(Clone, Debug, Default)]
pub struct ConversationWindow {
    entries: Vec<StoredMessage>,
}

impl ConversationWindow {
    pub fn build(history: Vec<StoredMessage>, max_messages: usize) -> Self {
        let mut entries: Vec<StoredMessage> =
            history.into_iter().filter(StoredMessage::is_text).collect();
        entries.truncate(max_messages);
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn customer_message_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.from_customer()).count()
    }

    /// Forced-decision mode: near the window limit, or once the customer
    /// has written twice, the directive must demand at least one action.
    /// Recomputed fresh every turn.
    pub fn must_escalate(&self, max_messages: usize) -> bool {
        self.customer_message_count() >= 2 || self.len() >= max_messages.saturating_sub(1)
    }

    pub fn as_prompt_messages(&self) -> Vec<PromptMessage> {
        self.entries
            .iter()
            .map(|entry| match entry.origin {
                MessageOrigin::Agent => PromptMessage::assistant(entry.body.clone()),
                MessageOrigin::Customer => PromptMessage::user(entry.body.clone()),
            })
            .collect()
    }
}

/// Builds the per-turn system directive. `prompt_body` is the resolved
/// assistant prompt (stored override or static fallback); entity names are
/// enumerated verbatim from the snapshot taken at the start of the turn.
pub fn build_directive(
    contact_name: &str,
    snapshot: &EntitySnapshot,
    escalate: bool,
    prompt_body: &str,
) -> String {
    let first_name = match sanitize_first_name(contact_name) {
        name if name.is_empty() => ANONYMOUS_CONTACT.to_string(),
        name => name,
    };

    let queues = serde_json::to_string(&snapshot.queue_names()).unwrap_or_default();
    let tags = serde_json::to_string(&snapshot.tag_names()).unwrap_or_default();
    let users = serde_json::to_string(&snapshot.user_names()).unwrap_or_default();

    let mut directive = format!(
        "Responda sempre de forma educada, objetiva e personalizada, chamando o cliente de {first_name}.\n\
\n\
Antes de indicar fila, tag ou usuário, faça perguntas até entender claramente a necessidade do cliente.\n\
Somente acione as funções (tools) de transferência de fila, adição de tag ou transferência de usuário quando a intenção estiver inequívoca.\n\
Quando o motivo do contato estiver claro, acione a função correspondente em vez de apenas escrever a sugestão.\n\
\n\
Filas disponíveis: {queues}\n\
Tags disponíveis: {tags}\n\
Usuários disponíveis: {users}\n\
\n\
Regras:\n\
- Utilize exatamente os nomes de filas, tags e usuários listados acima.\n\
- NUNCA mostre ao cliente que uma ação automática está sendo executada nem mencione fila/tag/usuário escolhidos.\n\
- Seja breve e direto ao ponto.\n"
    );

    if escalate {
        directive.push_str(
            "\nATENÇÃO: o limite de mensagens desta conversa foi atingido. Analise todo o \
histórico e acione OBRIGATORIAMENTE pelo menos uma das funções disponíveis \
(transfer_queue, add_tag, transfer_user), usando o melhor julgamento possível, mesmo \
que o contexto não esteja completo. Não peça mais informações.\n",
        );
    }

    directive.push('\n');
    directive.push_str(prompt_body);
    directive
}

//! Model invocation and tool dispatch: the two-call protocol.
//!
//! Call #1 runs with automatic tool selection. Every returned tool call is
//! executed synchronously and its JSON result folded into the prompt list;
//! when at least one tool fired, call #2 produces the customer-facing text
//! and the first call's text is kept only as the fallback-extraction
//! source. Either call failing aborts the turn.

use std::collections::HashMap;

use serde_json::Value;

use triago_core::domain::contact::Contact;
use triago_core::domain::ticket::Ticket;
use triago_core::settings::AssistantSettings;

use triago_llm::types::{ChatRequest, PromptMessage, ToolCall};
use triago_llm::ChatCapability;

use crate::resolve::{
    ActionExecutor, ActionRequest, ApplyResult, ResolvedAction, ResolvedKinds,
};
use crate::tools::{
    tool_specs, AddTagArgs, TransferQueueArgs, TransferUserArgs, ADD_TAG, TRANSFER_QUEUE,
    TRANSFER_USER,
};
use crate::EngineError;

#[derive(Debug)]
pub struct DispatchOutcome {
    /// Text of call #1; the pattern-fallback source on the audio path.
    pub first_text: String,
    /// Customer-facing text: call #2 when tools fired, call #1 otherwise.
    pub final_text: String,
    pub resolved: Vec<ResolvedAction>,
    pub resolved_kinds: ResolvedKinds,
    pub second_call_issued: bool,
}

enum ParsedCall {
    Queue(TransferQueueArgs),
    Tags(AddTagArgs),
    User(TransferUserArgs),
    Invalid { reason: &'static str },
}

fn parse_call(call: &ToolCall) -> ParsedCall {
    match call.name.as_str() {
        TRANSFER_QUEUE => match serde_json::from_str(&call.arguments) {
            Ok(args) => ParsedCall::Queue(args),
            Err(_) => ParsedCall::Invalid { reason: "argumentos inválidos" },
        },
        ADD_TAG => match serde_json::from_str(&call.arguments) {
            Ok(args) => ParsedCall::Tags(args),
            Err(_) => ParsedCall::Invalid { reason: "argumentos inválidos" },
        },
        TRANSFER_USER => match serde_json::from_str(&call.arguments) {
            Ok(args) => ParsedCall::User(args),
            Err(_) => ParsedCall::Invalid { reason: "argumentos inválidos" },
        },
        _ => ParsedCall::Invalid { reason: "ferramenta desconhecida" },
    }
}

fn chat_request(messages: &[PromptMessage], settings: &AssistantSettings) -> ChatRequest {
    ChatRequest {
        messages: messages.to_vec(),
        tools: tool_specs(),
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
    }
}

pub async fn run_two_call_protocol(
    client: &dyn ChatCapability,
    messages: &mut Vec<PromptMessage>,
    settings: &AssistantSettings,
    executor: &ActionExecutor<'_>,
    ticket: &mut Ticket,
    contact: &Contact,
) -> Result<DispatchOutcome, EngineError> {
    let first = client.chat(chat_request(messages, settings)).await?;

    if !first.requested_tools() {
        return Ok(DispatchOutcome {
            final_text: first.text.clone(),
            first_text: first.text,
            resolved: Vec::new(),
            resolved_kinds: ResolvedKinds::default(),
            second_call_issued: false,
        });
    }

    tracing::debug!(
        ticket_id = ticket.id.0,
        tool_call_count = first.tool_calls.len(),
        "executing requested tool calls"
    );
    messages.push(PromptMessage::Assistant {
        content: first.text.clone(),
        tool_calls: first.tool_calls.clone(),
    });

    let parsed: Vec<(ToolCall, ParsedCall)> =
        first.tool_calls.iter().map(|call| (call.clone(), parse_call(call))).collect();

    let mut results: HashMap<String, Value> = HashMap::new();
    let mut resolved = Vec::new();
    let mut resolved_kinds = ResolvedKinds::default();
    let mut deferred_notes: Vec<String> = Vec::new();

    // Queue transfers settle first; tags, user transfers and notes follow,
    // regardless of the order the model emitted the calls in.
    for (call, parsed_call) in &parsed {
        let ParsedCall::Queue(args) = parsed_call else { continue };
        let request = ActionRequest::TransferQueue { queue: args.queue.clone() };
        match executor.apply(ticket, contact, &request).await? {
            ApplyResult::Resolved(action) => {
                if let ResolvedAction::QueueTransferred { queue } = &action {
                    results.insert(
                        call.call_id.clone(),
                        serde_json::json!({ "success": true, "queue": queue.name }),
                    );
                }
                resolved_kinds.mark(&action);
                resolved.push(action);
            }
            ApplyResult::Rejected { reason } => {
                results.insert(
                    call.call_id.clone(),
                    serde_json::json!({ "success": false, "reason": reason }),
                );
            }
        }
    }

    for (call, parsed_call) in &parsed {
        let ParsedCall::Tags(args) = parsed_call else { continue };
        let request = ActionRequest::AddTags { tags: args.tags.clone() };
        let applied = executor.apply(ticket, contact, &request).await?;
        let tag_names: Vec<String> = match &applied {
            ApplyResult::Resolved(ResolvedAction::TagsAdded { tags }) => {
                tags.iter().map(|tag| tag.name.clone()).collect()
            }
            _ => Vec::new(),
        };
        results.insert(
            call.call_id.clone(),
            serde_json::json!({ "success": true, "tags": tag_names, "note": args.note }),
        );
        if let ApplyResult::Resolved(action) = applied {
            resolved_kinds.mark(&action);
            resolved.push(action);
        }

        if let Some(note) = args.note.as_deref().map(str::trim).filter(|note| !note.is_empty()) {
            deferred_notes.push(note.to_string());
        }
    }

    for (call, parsed_call) in &parsed {
        let ParsedCall::User(args) = parsed_call else { continue };
        let request = ActionRequest::TransferUser { user: args.user.clone() };
        match executor.apply(ticket, contact, &request).await? {
            ApplyResult::Resolved(action) => {
                if let ResolvedAction::UserTransferred { user } = &action {
                    results.insert(
                        call.call_id.clone(),
                        serde_json::json!({ "success": true, "user": user.name }),
                    );
                }
                resolved_kinds.mark(&action);
                resolved.push(action);
            }
            ApplyResult::Rejected { reason } => {
                results.insert(
                    call.call_id.clone(),
                    serde_json::json!({ "success": false, "reason": reason }),
                );
            }
        }
    }

    for note in deferred_notes {
        let request = ActionRequest::AddNote { body: note };
        if let ApplyResult::Resolved(action) = executor.apply(ticket, contact, &request).await? {
            resolved_kinds.mark(&action);
            resolved.push(action);
        }
    }

    for (call, parsed_call) in &parsed {
        if let ParsedCall::Invalid { reason } = parsed_call {
            results.insert(
                call.call_id.clone(),
                serde_json::json!({ "success": false, "reason": reason }),
            );
            tracing::warn!(
                ticket_id = ticket.id.0,
                tool = %call.name,
                reason = %reason,
                "rejected tool call"
            );
        }
    }

    for call in &first.tool_calls {
        let content = results.remove(&call.call_id).unwrap_or(Value::Null).to_string();
        messages.push(PromptMessage::ToolResult {
            call_id: call.call_id.clone(),
            name: call.name.clone(),
            content,
        });
    }

    let second = client.chat(chat_request(messages, settings)).await?;

    Ok(DispatchOutcome {
        first_text: first.text,
        final_text: second.text,
        resolved,
        resolved_kinds,
        second_call_issued: true,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use triago_core::domain::contact::{Contact, ContactId};
    use triago_core::domain::message::StoredMessage;
    use triago_core::domain::note::TicketNote;
    use triago_core::domain::queue::{Queue, QueueId};
    use triago_core::domain::tag::{Tag, TagId};
    use triago_core::domain::ticket::{Ticket, TicketId};
    use triago_core::domain::user::{User, UserId};
    use triago_core::domain::CompanyId;
    use triago_core::settings::AssistantSettings;

    use triago_llm::types::{ChatOutcome, ChatRequest, PromptMessage, ToolCall};
    use triago_llm::{ChatCapability, LlmError};

    use triago_store::{InMemoryTicketStore, StoreError, TicketStore};

    use crate::notify::NoopChangeNotifier;
    use crate::resolve::{ActionExecutor, EntitySnapshot, ResolvedAction};

    use super::run_two_call_protocol;

    struct ScriptedClient {
        responses: Mutex<VecDeque<ChatOutcome>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedClient {
        fn new(responses: Vec<ChatOutcome>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().expect("requests lock").len()
        }

        fn request(&self, index: usize) -> ChatRequest {
            self.requests.lock().expect("requests lock")[index].clone()
        }
    }

    #[async_trait]
    impl ChatCapability for ScriptedClient {
        async fn chat(&self, request: ChatRequest) -> Result<ChatOutcome, LlmError> {
            self.requests.lock().expect("requests lock").push(request);
            self.responses
                .lock()
                .expect("responses lock")
                .pop_front()
                .ok_or_else(|| LlmError::MalformedResponse("script exhausted".to_string()))
        }

        async fn transcribe(&self, _audio: Vec<u8>, _file_name: &str) -> Result<String, LlmError> {
            Err(LlmError::MalformedResponse("not scripted".to_string()))
        }
    }

    /// Records the order of mutating store operations.
    struct OrderRecordingStore {
        inner: InMemoryTicketStore,
        operations: Mutex<Vec<String>>,
    }

    impl OrderRecordingStore {
        async fn with_ticket(ticket: Ticket) -> Self {
            let inner = InMemoryTicketStore::new();
            inner.insert_ticket(ticket).await;
            Self { inner, operations: Mutex::new(Vec::new()) }
        }

        fn operations(&self) -> Vec<String> {
            self.operations.lock().expect("operations lock").clone()
        }

        fn record(&self, operation: impl Into<String>) {
            self.operations.lock().expect("operations lock").push(operation.into());
        }
    }

    #[async_trait]
    impl TicketStore for OrderRecordingStore {
        async fn list_queues(&self, company: CompanyId) -> Result<Vec<Queue>, StoreError> {
            self.inner.list_queues(company).await
        }

        async fn list_tags(&self, company: CompanyId) -> Result<Vec<Tag>, StoreError> {
            self.inner.list_tags(company).await
        }

        async fn list_users(&self, company: CompanyId) -> Result<Vec<User>, StoreError> {
            self.inner.list_users(company).await
        }

        async fn list_messages(
            &self,
            ticket: TicketId,
            limit: usize,
        ) -> Result<Vec<StoredMessage>, StoreError> {
            self.inner.list_messages(ticket, limit).await
        }

        async fn find_prompt(&self, name: &str) -> Result<Option<String>, StoreError> {
            self.inner.find_prompt(name).await
        }

        async fn update_ticket(&self, ticket: &Ticket) -> Result<(), StoreError> {
            self.record(format!(
                "update_ticket queue={:?} user={:?}",
                ticket.queue_id, ticket.user_id
            ));
            self.inner.update_ticket(ticket).await
        }

        async fn upsert_ticket_tag(&self, ticket: TicketId, tag: TagId) -> Result<(), StoreError> {
            self.record(format!("ticket_tag {}", tag.0));
            self.inner.upsert_ticket_tag(ticket, tag).await
        }

        async fn upsert_contact_tag(
            &self,
            contact: ContactId,
            tag: TagId,
        ) -> Result<(), StoreError> {
            self.record(format!("contact_tag {}", tag.0));
            self.inner.upsert_contact_tag(contact, tag).await
        }

        async fn create_note(&self, note: TicketNote) -> Result<(), StoreError> {
            self.record("create_note".to_string());
            self.inner.create_note(note).await
        }
    }

    fn snapshot() -> EntitySnapshot {
        EntitySnapshot {
            queues: vec![Queue {
                id: QueueId(1),
                company_id: CompanyId(1),
                name: "Cancelamentos".to_string(),
                greeting: None,
            }],
            tags: vec![Tag { id: TagId(9), company_id: CompanyId(1), name: "VIP".to_string() }],
            users: vec![User { id: UserId(5), company_id: CompanyId(1), name: "Ana".to_string() }],
        }
    }

    fn ticket() -> Ticket {
        Ticket {
            id: TicketId(42),
            company_id: CompanyId(1),
            contact_id: ContactId(7),
            queue_id: None,
            user_id: None,
            endpoint: "5511988887777".to_string(),
        }
    }

    fn contact() -> Contact {
        Contact {
            id: ContactId(7),
            company_id: CompanyId(1),
            name: "Maria Clara".to_string(),
            bot_disabled: false,
        }
    }

    fn settings() -> AssistantSettings {
        AssistantSettings {
            name: "triago".to_string(),
            prompt: String::new(),
            voice: "text".to_string(),
            voice_key: String::new().into(),
            voice_region: String::new(),
            max_tokens: 256,
            temperature: 0.7,
            api_key: "sk-test".to_string().into(),
            queue_id: None,
            max_messages: 10,
        }
    }

    fn call(id: &str, name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            call_id: id.to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    fn text_outcome(text: &str) -> ChatOutcome {
        ChatOutcome { text: text.to_string(), tool_calls: Vec::new() }
    }

    #[tokio::test]
    async fn plain_reply_skips_the_second_call() {
        let client = ScriptedClient::new(vec![text_outcome("Como posso ajudar?")]);
        let store = OrderRecordingStore::with_ticket(ticket()).await;
        let notifier = NoopChangeNotifier;
        let snapshot = snapshot();
        let executor = ActionExecutor {
            store: &store,
            notifier: &notifier,
            snapshot: &snapshot,
            contact_tagging: false,
        };
        let mut messages = vec![PromptMessage::system("directive"), PromptMessage::user("oi")];
        let mut ticket = ticket();

        let outcome = run_two_call_protocol(
            &client,
            &mut messages,
            &settings(),
            &executor,
            &mut ticket,
            &contact(),
        )
        .await
        .expect("protocol");

        assert_eq!(outcome.final_text, "Como posso ajudar?");
        assert!(!outcome.second_call_issued);
        assert!(outcome.resolved.is_empty());
        assert_eq!(client.request_count(), 1);
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn tool_calls_fold_results_and_trigger_the_second_call() {
        let client = ScriptedClient::new(vec![
            ChatOutcome {
                text: "Um momento.".to_string(),
                tool_calls: vec![call("c1", "transfer_queue", "{\"queue\":\"Cancelamentos\"}")],
            },
            text_outcome("Transferido! Já te atendem."),
        ]);
        let store = OrderRecordingStore::with_ticket(ticket()).await;
        let notifier = NoopChangeNotifier;
        let snapshot = snapshot();
        let executor = ActionExecutor {
            store: &store,
            notifier: &notifier,
            snapshot: &snapshot,
            contact_tagging: false,
        };
        let mut messages = vec![PromptMessage::system("directive"), PromptMessage::user("oi")];
        let mut ticket = ticket();

        let outcome = run_two_call_protocol(
            &client,
            &mut messages,
            &settings(),
            &executor,
            &mut ticket,
            &contact(),
        )
        .await
        .expect("protocol");

        assert!(outcome.second_call_issued);
        assert_eq!(outcome.final_text, "Transferido! Já te atendem.");
        assert_eq!(outcome.first_text, "Um momento.");
        assert!(outcome.resolved_kinds.queue);
        assert_eq!(ticket.queue_id, Some(QueueId(1)));

        // The second request carries assistant echo + tool result.
        assert_eq!(client.request_count(), 2);
        let second_request = client.request(1);
        let tool_result = second_request
            .messages
            .iter()
            .find_map(|message| match message {
                PromptMessage::ToolResult { name, content, .. } if name == "transfer_queue" => {
                    Some(content.clone())
                }
                _ => None,
            })
            .expect("tool result folded into history");
        assert!(tool_result.contains("\"success\":true"));
        assert!(tool_result.contains("Cancelamentos"));
    }

    #[tokio::test]
    async fn malformed_arguments_reject_only_that_call() {
        let client = ScriptedClient::new(vec![
            ChatOutcome {
                text: String::new(),
                tool_calls: vec![
                    call("bad", "transfer_queue", "{not json"),
                    call("good", "transfer_user", "{\"user\":\"Ana\"}"),
                ],
            },
            text_outcome("Encaminhei para a Ana."),
        ]);
        let store = OrderRecordingStore::with_ticket(ticket()).await;
        let notifier = NoopChangeNotifier;
        let snapshot = snapshot();
        let executor = ActionExecutor {
            store: &store,
            notifier: &notifier,
            snapshot: &snapshot,
            contact_tagging: false,
        };
        let mut messages = vec![PromptMessage::system("directive"), PromptMessage::user("oi")];
        let mut ticket = ticket();

        let outcome = run_two_call_protocol(
            &client,
            &mut messages,
            &settings(),
            &executor,
            &mut ticket,
            &contact(),
        )
        .await
        .expect("protocol");

        assert_eq!(outcome.resolved.len(), 1);
        assert!(matches!(outcome.resolved[0], ResolvedAction::UserTransferred { .. }));
        assert_eq!(ticket.user_id, Some(UserId(5)));
        assert_eq!(ticket.queue_id, None);

        let second_request = client.request(1);
        let rejected = second_request
            .messages
            .iter()
            .find_map(|message| match message {
                PromptMessage::ToolResult { call_id, content, .. } if call_id == "bad" => {
                    Some(content.clone())
                }
                _ => None,
            })
            .expect("rejected result folded into history");
        assert!(rejected.contains("\"success\":false"));
    }

    #[tokio::test]
    async fn queue_transfer_settles_before_tags_user_and_note() {
        let client = ScriptedClient::new(vec![
            ChatOutcome {
                text: String::new(),
                tool_calls: vec![
                    call("c_user", "transfer_user", "{\"user\":\"Ana\"}"),
                    call(
                        "c_tag",
                        "add_tag",
                        "{\"tags\":[\"VIP\"],\"note\":\"cliente prioritário\"}",
                    ),
                    call("c_queue", "transfer_queue", "{\"queue\":\"Cancelamentos\"}"),
                ],
            },
            text_outcome("Tudo certo!"),
        ]);
        let store = OrderRecordingStore::with_ticket(ticket()).await;
        let notifier = NoopChangeNotifier;
        let snapshot = snapshot();
        let executor = ActionExecutor {
            store: &store,
            notifier: &notifier,
            snapshot: &snapshot,
            contact_tagging: false,
        };
        let mut messages = vec![PromptMessage::system("directive"), PromptMessage::user("oi")];
        let mut ticket = ticket();

        let outcome = run_two_call_protocol(
            &client,
            &mut messages,
            &settings(),
            &executor,
            &mut ticket,
            &contact(),
        )
        .await
        .expect("protocol");

        assert!(outcome.resolved_kinds.queue);
        assert!(outcome.resolved_kinds.tags);
        assert!(outcome.resolved_kinds.user);
        assert!(outcome.resolved_kinds.note);

        let operations = store.operations();
        assert_eq!(
            operations,
            vec![
                "update_ticket queue=Some(QueueId(1)) user=None",
                "ticket_tag 9",
                "update_ticket queue=Some(QueueId(1)) user=Some(UserId(5))",
                "create_note",
            ]
        );
    }
}

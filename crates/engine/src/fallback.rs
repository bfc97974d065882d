//! Free-text pattern fallback.
//!
//! On the audio path the model sometimes narrates a decision instead of
//! calling the tool for it, emitting lines like `Fila: Suporte` in its
//! reply. This module recovers those as action candidates. It sits behind
//! the same candidate/commit interface as the structured path so the
//! resolution engine stays agnostic of the extraction strategy.

use std::sync::LazyLock;

use regex::Regex;

use crate::resolve::{ActionCandidate, ActionRequest, CandidateSource, ResolvedKinds};

static QUEUE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)fila:\s*([^\n]+)").expect("valid queue line regex"));

static TAGS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)tags?:\s*([^\n]+)").expect("valid tags line regex"));

static USER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)usu[aá]rio:\s*([^\n]+)").expect("valid user line regex"));

static NOTE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)observa[cç][aã]o:\s*([^\n]+)").expect("valid note line regex")
});

/// Raw line matches recovered from a reply, one slot per action kind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatternActions {
    pub queue: Option<String>,
    pub tags: Vec<String>,
    pub user: Option<String>,
    pub note: Option<String>,
}

impl PatternActions {
    pub fn is_empty(&self) -> bool {
        self.queue.is_none() && self.tags.is_empty() && self.user.is_none() && self.note.is_none()
    }
}

/// Scans a reply for the first occurrence of each action line. Names are
/// trimmed but otherwise taken as written; validation against the snapshot
/// happens at resolution time, exactly as for tool calls.
pub fn extract_pattern_actions(reply: &str) -> PatternActions {
    let first_capture = |pattern: &Regex| {
        pattern
            .captures(reply)
            .and_then(|captures| captures.get(1))
            .map(|group| group.as_str().trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let tags = first_capture(&TAGS_LINE)
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    PatternActions {
        queue: first_capture(&QUEUE_LINE),
        tags,
        user: first_capture(&USER_LINE),
        note: first_capture(&NOTE_LINE),
    }
}

/// The precedence rule, as a single function: a kind already resolved by a
/// tool call suppresses its pattern candidate; kinds are independent of
/// each other. Never merges partial results of both strategies for one
/// kind.
pub fn pattern_candidates(
    resolved: ResolvedKinds,
    actions: PatternActions,
) -> Vec<ActionCandidate> {
    let mut candidates = Vec::new();

    if !resolved.queue {
        if let Some(queue) = actions.queue {
            candidates.push(ActionCandidate {
                source: CandidateSource::Pattern,
                request: ActionRequest::TransferQueue { queue },
            });
        }
    }

    if !resolved.tags && !actions.tags.is_empty() {
        candidates.push(ActionCandidate {
            source: CandidateSource::Pattern,
            request: ActionRequest::AddTags { tags: actions.tags },
        });
    }

    if !resolved.user {
        if let Some(user) = actions.user {
            candidates.push(ActionCandidate {
                source: CandidateSource::Pattern,
                request: ActionRequest::TransferUser { user },
            });
        }
    }

    if !resolved.note {
        if let Some(note) = actions.note {
            candidates.push(ActionCandidate {
                source: CandidateSource::Pattern,
                request: ActionRequest::AddNote { body: note },
            });
        }
    }

    candidates
}

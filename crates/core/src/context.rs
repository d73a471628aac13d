//! Assembles the turn list sent to the model.

use crate::cleaning::snippet;
use crate::models::{ChatTurn, DocumentRecord};
use regex::RegexBuilder;
use tracing::warn;

/// Characters of a document spliced in where the user mentions it.
pub const MENTION_SNIPPET_CHARS: usize = 1_000;

/// Characters of each document listed in the system instruction.
pub const CATALOG_SNIPPET_CHARS: usize = 300;

/// System turn first, then `history` in order, then the current user turn.
pub fn build_messages<'a, I>(
    history: &[ChatTurn],
    documents: I,
    user_message: &str,
    system_template: &str,
) -> Vec<ChatTurn>
where
    I: IntoIterator<Item = &'a DocumentRecord>,
{
    let documents = documents.into_iter().collect::<Vec<_>>();

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatTurn::system(system_content(system_template, &documents)));
    messages.extend(history.iter().cloned());
    messages.push(ChatTurn::user(splice_mentions(user_message, &documents)));
    messages
}

pub fn system_content(system_template: &str, documents: &[&DocumentRecord]) -> String {
    if documents.is_empty() {
        return system_template.to_string();
    }

    let catalog = documents
        .iter()
        .map(|document| {
            format!(
                "- {}: {}",
                document.filename,
                snippet(&document.text, CATALOG_SNIPPET_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("{system_template}\n\nAvailable documents:\n{catalog}")
}

/// Follows every case-insensitive filename mention with the document's snippet.
pub fn splice_mentions(user_message: &str, documents: &[&DocumentRecord]) -> String {
    let mut mentions = Vec::new();

    for (index, document) in documents.iter().enumerate() {
        if document.filename.is_empty() {
            continue;
        }

        let pattern = match RegexBuilder::new(&regex::escape(&document.filename))
            .case_insensitive(true)
            .build()
        {
            Ok(pattern) => pattern,
            Err(error) => {
                warn!(filename = %document.filename, error = %error, "cannot match filename");
                continue;
            }
        };

        mentions.extend(
            pattern
                .find_iter(user_message)
                .map(|found| (found.start(), found.end(), index)),
        );
    }

    // earliest first; on ties the longer filename wins
    mentions.sort_by(|left, right| left.0.cmp(&right.0).then(right.1.cmp(&left.1)));

    let mut spliced = String::with_capacity(user_message.len());
    let mut cursor = 0;
    for (start, end, index) in mentions {
        if start < cursor {
            continue;
        }

        spliced.push_str(&user_message[cursor..end]);
        spliced.push_str(" (Extracted content: ");
        spliced.push_str(&snippet(&documents[index].text, MENTION_SNIPPET_CHARS));
        spliced.push(')');
        cursor = end;
    }
    spliced.push_str(&user_message[cursor..]);
    spliced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatRole, DocumentFormat};
    use chrono::Utc;

    fn record(filename: &str, text: &str) -> DocumentRecord {
        DocumentRecord {
            filename: filename.to_string(),
            format: DocumentFormat::from_path(std::path::Path::new(filename)),
            text: text.to_string(),
            checksum: "abc".to_string(),
            size_bytes: text.len() as u64,
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn ordering_is_system_history_then_user() {
        let history = vec![
            ChatTurn::user("What is a cell?"),
            ChatTurn::assistant("The basic unit of life."),
            ChatTurn::user("And a tissue?"),
            ChatTurn::assistant("A group of similar cells."),
        ];

        let messages = build_messages(
            &history,
            Vec::<&DocumentRecord>::new(),
            "And an organ?",
            "Be helpful.",
        );

        assert_eq!(messages.len(), 6);
        assert_eq!(messages[0], ChatTurn::system("Be helpful."));
        assert_eq!(&messages[1..5], history.as_slice());
        assert_eq!(messages[5], ChatTurn::user("And an organ?"));
    }

    #[test]
    fn mentioned_document_is_spliced_case_insensitively() {
        let notes = record("Biology_Notes.txt", "Mitochondria produce ATP.");
        let messages = build_messages(
            &[],
            [&notes],
            "Summarize biology_notes.TXT please",
            "Be helpful.",
        );

        let user = &messages[1];
        assert_eq!(user.role, ChatRole::User);
        assert_eq!(
            user.content,
            "Summarize biology_notes.TXT (Extracted content: Mitochondria produce ATP.) please"
        );
    }

    #[test]
    fn filename_at_end_of_message_is_not_left_bare() {
        let notes = record("notes.pdf", "Kinetic energy is one half m v squared.");
        let spliced = splice_mentions("explain notes.pdf", &[&notes]);
        assert!(!spliced.ends_with("notes.pdf"));
        assert!(spliced.ends_with("(Extracted content: Kinetic energy is one half m v squared.)"));
    }

    #[test]
    fn long_documents_are_truncated_in_mentions_and_catalog() {
        let long_text = "x".repeat(MENTION_SNIPPET_CHARS + 50);
        let doc = record("long.txt", &long_text);

        let spliced = splice_mentions("read long.txt", &[&doc]);
        let expected = format!("{}...", "x".repeat(MENTION_SNIPPET_CHARS));
        assert!(spliced.contains(&expected));
        assert!(!spliced.contains(&"x".repeat(MENTION_SNIPPET_CHARS + 1)));

        let system = system_content("Base.", &[&doc]);
        assert!(system.contains(&format!("- long.txt: {}...", "x".repeat(CATALOG_SNIPPET_CHARS))));
    }

    #[test]
    fn catalog_lists_every_document_even_when_unmentioned() {
        let first = record("a.txt", "alpha");
        let second = record("b.pdf", "[No text could be extracted from b.pdf]");
        let messages = build_messages(&[], [&first, &second], "hello", "Base.");

        assert_eq!(
            messages[0].content,
            "Base.\n\nAvailable documents:\n- a.txt: alpha\n- b.pdf: [No text could be extracted from b.pdf]"
        );
        assert_eq!(messages[1].content, "hello");
    }

    #[test]
    fn overlapping_names_prefer_the_longer_match() {
        let short = record("notes.txt", "short doc");
        let long = record("notes.txt.bak", "long doc");
        let spliced = splice_mentions("compare notes.txt.bak", &[&short, &long]);
        assert_eq!(spliced, "compare notes.txt.bak (Extracted content: long doc)");
    }

    #[test]
    fn repeated_mentions_are_each_substituted() {
        let doc = record("ch1.txt", "atoms");
        let spliced = splice_mentions("ch1.txt vs CH1.TXT", &[&doc]);
        assert_eq!(
            spliced,
            "ch1.txt (Extracted content: atoms) vs CH1.TXT (Extracted content: atoms)"
        );
    }
}

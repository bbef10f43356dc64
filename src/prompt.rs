use crate::types::{CachedSnapshot, ExternalContext, StandupPhase};

/// Fixed instruction block. The `{name}` placeholder is the only
/// interpolation point; everything else is appended verbatim.
const BASE_INSTRUCTION: &str = "\
You are a helpful assistant that collects daily standup updates from the user.

Your goal is to help the user quickly provide their standup update, which includes:
- Accomplishments since the last standup
- Plans for today
- Any blockers or challenges currently faced

If the user's response is vague or unclear, ask smart follow-up questions to get more details.
Proactively identify potential blockers from responses (e.g. if the user mentions \"waiting for review\" or \"need input from team\").
Remember the user's preferred writing style (bullet points vs. paragraphs) for the update.";

const GREETING_TEMPLATE: &str = "Start your reply by saying: \"Hi {name}, please provide your standup update:\". Then continue the conversation.";

/// Assemble the system instruction for one turn.
///
/// Inputs are concatenated as-is; there is no truncation or token
/// budgeting, so oversized history can only degrade model quality, never
/// crash composition.
pub fn compose_system(name: &str, phase: StandupPhase, context: &ExternalContext) -> String {
    let mut system = String::from(BASE_INSTRUCTION);

    system.push_str("\n\nRight now you are collecting ");
    system.push_str(phase.slot_request());
    system.push('.');

    if phase == StandupPhase::AwaitingAccomplishments {
        system.push_str("\n\n");
        system.push_str(&GREETING_TEMPLATE.replace("{name}", name));
    } else {
        system.push_str("\n\nThe user's name is ");
        system.push_str(name);
        system.push('.');
    }

    if !context.history.is_empty() {
        system.push_str("\n\nRecent messages in the channel (oldest first):\n");
        system.push_str(&context.history.join("\n"));
    }
    push_items(&mut system, "Open issues in the linked repository", &context.issues);
    push_items(
        &mut system,
        "Open pull requests in the linked repository",
        &context.pull_requests,
    );
    push_items(&mut system, "Recent repository comments", &context.comments);

    system
}

/// Wrap the user's raw input as the single human turn, prefixed with the
/// cached snapshot as plain text when one exists.
pub fn compose_human(input: &str, snapshot: &CachedSnapshot) -> String {
    if snapshot.is_empty() {
        return format!("User's response: {}", input);
    }
    let rendered =
        serde_json::to_string(snapshot).unwrap_or_else(|_| "{}".to_string());
    format!(
        "Previously fetched GitHub activity for this user:\n{}\n\nUser's response: {}",
        rendered, input
    )
}

fn push_items(out: &mut String, label: &str, items: &[serde_json::Value]) {
    if items.is_empty() {
        return;
    }
    out.push_str("\n\n");
    out.push_str(label);
    out.push_str(":\n");
    for item in items {
        out.push_str(&item.to_string());
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fresh_standup_greets_by_name() {
        let system = compose_system(
            "Ada",
            StandupPhase::AwaitingAccomplishments,
            &ExternalContext::default(),
        );
        assert!(system.contains("Hi Ada"), "got: {}", system);
        assert!(!system.contains("{name}"));
    }

    #[test]
    fn followup_phases_skip_greeting_but_keep_name() {
        let system = compose_system(
            "Ada",
            StandupPhase::AwaitingPlans,
            &ExternalContext::default(),
        );
        assert!(!system.contains("Hi Ada, please provide"));
        assert!(system.contains("Ada"));
        assert!(system.contains("plans for today"));
        assert!(!system.contains("{name}"));
    }

    #[test]
    fn history_is_included_verbatim() {
        let context = ExternalContext {
            history: vec!["U2: shipped the importer".to_string()],
            ..Default::default()
        };
        let system = compose_system("Ada", StandupPhase::AwaitingAccomplishments, &context);
        assert!(system.contains("shipped the importer"));
    }

    #[test]
    fn repo_context_sections_render() {
        let context = ExternalContext {
            issues: vec![json!({"number": 12, "title": "flaky test"})],
            pull_requests: vec![json!({"number": 3})],
            comments: vec![json!({"id": 5})],
            ..Default::default()
        };
        let system = compose_system("Ada", StandupPhase::AwaitingAccomplishments, &context);
        assert!(system.contains("flaky test"));
        assert!(system.contains("Open pull requests"));
        assert!(system.contains("Recent repository comments"));
    }

    #[test]
    fn human_turn_wraps_raw_input() {
        let human = compose_human("Finished the login page", &CachedSnapshot::default());
        assert_eq!(human, "User's response: Finished the login page");
    }

    #[test]
    fn cached_issue_id_appears_in_human_turn() {
        let snapshot = CachedSnapshot {
            issues: vec![json!({"id": 7})],
            pull_requests: vec![],
            comments: vec![],
        };
        let human = compose_human("starting on tests today", &snapshot);
        assert!(human.contains('7'), "got: {}", human);
        assert!(human.contains("User's response: starting on tests today"));
    }

    #[test]
    fn empty_snapshot_adds_no_prefix() {
        let human = compose_human("hello", &CachedSnapshot::default());
        assert!(!human.contains("Previously fetched"));
    }

    #[test]
    fn oversized_inputs_do_not_crash_composition() {
        let context = ExternalContext {
            history: vec!["x".repeat(1_000_000)],
            issues: (0..1000).map(|i| json!({"id": i})).collect(),
            ..Default::default()
        };
        let system = compose_system(
            &"n".repeat(10_000),
            StandupPhase::AwaitingAccomplishments,
            &context,
        );
        assert!(system.len() > 1_000_000);

        let snapshot = CachedSnapshot {
            issues: (0..1000).map(|i| json!({"id": i})).collect(),
            pull_requests: vec![],
            comments: vec![],
        };
        let human = compose_human(&"y".repeat(1_000_000), &snapshot);
        assert!(human.len() > 1_000_000);
    }

    mod proptest_compose {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn compose_never_panics(
                name in "\\PC{0,100}",
                input in "\\PC{0,500}",
                line in "\\PC{0,200}",
            ) {
                prop_assume!(!name.contains("{name}"));
                let context = ExternalContext {
                    history: vec![line],
                    ..Default::default()
                };
                let system = compose_system(&name, StandupPhase::AwaitingAccomplishments, &context);
                prop_assert!(!system.contains("{name}"), "template placeholder leaked into system prompt");
                let human = compose_human(&input, &CachedSnapshot::default());
                prop_assert!(human.contains("User's response:"));
            }
        }
    }
}

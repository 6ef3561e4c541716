//! Offline subtask lists used when the model is unavailable or fails.

const MEETING_PREP: [&str; 5] = [
    "Prepare agenda",
    "Send calendar invites",
    "Prepare presentation slides",
    "Take meeting notes",
    "Send follow-up email",
];

const WRITING: [&str; 5] = [
    "Gather necessary data",
    "Create outline",
    "Write first draft",
    "Review and edit",
    "Format document",
];

const PROJECT: [&str; 5] = [
    "Define project scope",
    "Create project timeline",
    "Assign responsibilities",
    "Implement core features",
    "Test and review",
];

const GENERIC: [&str; 5] = [
    "Research and plan",
    "Prepare materials",
    "Execute main task",
    "Review results",
    "Follow up if needed",
];

/// Fixed subtask list for a task category.
///
/// Matching is case-insensitive against whole category names; anything that
/// is not a known category gets the generic list.
pub fn fallback_subtasks(category: &str) -> Vec<String> {
    let bucket = match category.to_lowercase().as_str() {
        "meeting" | "call" => &MEETING_PREP,
        "report" | "document" => &WRITING,
        "project" | "development" => &PROJECT,
        _ => &GENERIC,
    };
    bucket.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meeting_and_call_share_a_list() {
        let expected = vec![
            "Prepare agenda",
            "Send calendar invites",
            "Prepare presentation slides",
            "Take meeting notes",
            "Send follow-up email",
        ];
        assert_eq!(fallback_subtasks("Meeting"), expected);
        assert_eq!(fallback_subtasks("call"), expected);
        assert_eq!(fallback_subtasks("CALL"), expected);
    }

    #[test]
    fn writing_and_project_buckets() {
        assert_eq!(fallback_subtasks("Report")[0], "Gather necessary data");
        assert_eq!(fallback_subtasks("document")[4], "Format document");
        assert_eq!(fallback_subtasks("Development")[0], "Define project scope");
        assert_eq!(fallback_subtasks("project")[4], "Test and review");
    }

    #[test]
    fn unknown_categories_get_generic_list() {
        let expected = vec![
            "Research and plan",
            "Prepare materials",
            "Execute main task",
            "Review results",
            "Follow up if needed",
        ];
        for category in ["Task", "", "errands", "Meetings", "phone call", "HEALTH", " meeting "] {
            assert_eq!(fallback_subtasks(category), expected, "category {:?}", category);
        }
    }

    #[test]
    fn always_five_items() {
        for category in ["meeting", "report", "project", "other"] {
            assert_eq!(fallback_subtasks(category).len(), 5);
        }
    }
}

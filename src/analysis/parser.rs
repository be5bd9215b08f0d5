use super::Analysis;

const ACTION_ITEMS_LABEL: &str = "Action Items:";
const INFO_NEEDS_LABEL: &str = "Information Needs:";

/// Parse a free-text analysis reply into its labeled sections.
///
/// Sections are separated by blank lines. A section counts as the action-item
/// list only if it begins with the literal label `Action Items:`, likewise
/// `Information Needs:`; each following non-empty line, with a leading `- `
/// stripped, is one item. Unlabeled or unrecognized sections are ignored,
/// not errors.
pub fn parse_sections(content: &str) -> Analysis {
    let mut analysis = Analysis::default();

    for section in content.split("\n\n") {
        let section = section.trim_start_matches('\n');
        if let Some(rest) = section.strip_prefix(ACTION_ITEMS_LABEL) {
            analysis.action_items = section_items(rest);
        } else if let Some(rest) = section.strip_prefix(INFO_NEEDS_LABEL) {
            analysis.info_needs = section_items(rest);
        }
    }

    analysis
}

fn section_items(body: &str) -> Vec<String> {
    body.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.strip_prefix("- ").unwrap_or(line).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_labeled_sections() {
        let reply = "Action Items:\n- Send the report\n- Book the room\n\n\
                     Information Needs:\n- What was user growth last quarter?";

        let analysis = parse_sections(reply);
        assert_eq!(analysis.action_items, vec!["Send the report", "Book the room"]);
        assert_eq!(analysis.info_needs, vec!["What was user growth last quarter?"]);
    }

    #[test]
    fn ignores_unrecognized_sections() {
        let reply = "Summary:\n- not an action item\n\nAction Items:\n- Follow up with legal";

        let analysis = parse_sections(reply);
        assert_eq!(analysis.action_items, vec!["Follow up with legal"]);
        assert!(analysis.info_needs.is_empty());
    }

    #[test]
    fn empty_reply_yields_empty_analysis() {
        assert_eq!(parse_sections(""), Analysis::default());
    }

    #[test]
    fn items_without_dash_marker_are_kept_verbatim() {
        let reply = "Action Items:\nReview the contract\n- Ping finance";

        let analysis = parse_sections(reply);
        assert_eq!(analysis.action_items, vec!["Review the contract", "Ping finance"]);
    }
}

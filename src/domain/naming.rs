/// Derived name for a PR preview. Deterministic, so every invocation for the
/// same PR lands on the same registry entry and distinct PRs never collide.
pub fn preview_name(real_name: &str, pr_number: u64) -> String {
    format!("{real_name}-pr-{pr_number}")
}

/// Returns a copy of the deploy descriptor with every literal
/// `name = "{real_name}"` replaced by the preview name. The input is never
/// mutated; when the pattern is absent the text comes back unchanged and the
/// caller decides what a no-op rename means.
pub fn render_preview_descriptor(descriptor: &str, real_name: &str, preview_name: &str) -> String {
    descriptor.replace(
        &format!("name = \"{real_name}\""),
        &format!("name = \"{preview_name}\""),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_name_is_deterministic() {
        assert_eq!(preview_name("myapp", 42), "myapp-pr-42");
        assert_eq!(preview_name("myapp", 0), "myapp-pr-0");
    }

    #[test]
    fn distinct_prs_get_distinct_names() {
        assert_ne!(preview_name("myapp", 1), preview_name("myapp", 2));
    }

    #[test]
    fn descriptor_rename_replaces_only_the_name_entry() {
        let descriptor = "spin_manifest_version = \"1\"\nname = \"myapp\"\ndescription = \"myapp demo\"\n";
        let rendered = render_preview_descriptor(descriptor, "myapp", "myapp-pr-42");
        assert!(rendered.contains("name = \"myapp-pr-42\""));
        assert!(rendered.contains("description = \"myapp demo\""));
        assert!(!rendered.contains("name = \"myapp\"\n"));
    }

    #[test]
    fn descriptor_without_name_entry_is_returned_unchanged() {
        let descriptor = "spin_manifest_version = \"1\"\n";
        assert_eq!(
            render_preview_descriptor(descriptor, "myapp", "myapp-pr-42"),
            descriptor
        );
    }
}

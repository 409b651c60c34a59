use blacklock::output::HumanOutput;

#[test]
fn human_report_includes_sections() {
    let mut human = HumanOutput::new("blacklock backup create: created backup");
    human.push_summary("backup", "backup-2024-06-01-12-00-00.json");
    human.push_detail("removed 2 old backups");
    human.push_warning("stored settings were invalid, defaults used");
    human.push_next_step("blacklock backup list");

    let rendered = human.to_string();
    assert!(rendered.contains("blacklock backup create: created backup"));
    assert!(rendered.contains("Summary:"));
    assert!(rendered.contains("- backup: backup-2024-06-01-12-00-00.json"));
    assert!(rendered.contains("Details:"));
    assert!(rendered.contains("- removed 2 old backups"));
    assert!(rendered.contains("Warnings:"));
    assert!(rendered.contains("- stored settings were invalid, defaults used"));
    assert!(rendered.contains("Next steps:"));
    assert!(rendered.contains("- blacklock backup list"));
}

#[test]
fn human_report_lists_sections_in_order() {
    let mut human = HumanOutput::new("blacklock log list");
    human.push_next_step("blacklock status");
    human.push_warning("2 entries dropped");
    human.push_detail("first");
    human.push_summary("flagged", "");

    let rendered = human.to_string();
    assert!(rendered.contains("Summary:\n- flagged\n"));
    let details = rendered.find("Details:").expect("details");
    let warnings = rendered.find("Warnings:").expect("warnings");
    let next = rendered.find("Next steps:").expect("next steps");
    assert!(details < warnings && warnings < next);
}

use std::collections::BTreeMap;

/// Parses a sectioned markdown file into label -> body text. A `# Label`
/// heading opens a section; everything until the next heading is its body.
/// Text before the first heading is dropped. Used for both the detective
/// learning texts and the slider narrative texts.
pub fn parse_learning_sections(raw: &str) -> BTreeMap<String, String> {
    let mut sections = BTreeMap::new();
    let mut current_key: Option<String> = None;
    let mut buffer = Vec::<&str>::new();

    for line in raw.lines() {
        if let Some(heading) = line.strip_prefix("# ") {
            if let Some(key) = current_key.take() {
                sections.insert(key, buffer.join("\n").trim().to_string());
            }
            current_key = Some(heading.trim().to_string());
            buffer.clear();
        } else {
            buffer.push(line);
        }
    }
    if let Some(key) = current_key {
        sections.insert(key, buffer.join("\n").trim().to_string());
    }

    sections
}

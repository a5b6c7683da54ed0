use serde_json::Value;

/// Marker appended when the service opens a new answer segment.
pub(crate) const MESSAGE_BLOCK: &str = "[assistant](#message)\n";

/// Substring of the hidden text of an empty web search.
pub(crate) const NO_RESULT_MARKER: &str = "no relevant result";

pub(crate) fn search_query_block(query: &str) -> String {
    format!("[assistant](#search_query)\n{query}\n\n")
}

pub(crate) fn loading_block(text: &str) -> String {
    format!("[assistant](#loading)\n{text}\n\n")
}

pub(crate) fn generative_image_block(keyword: &str) -> String {
    format!("[assistant](#generative_image)\nKeyword: {keyword}\n\n")
}

/// Renders the JSON search-result payload as citation links.
///
/// The payload is an array of groups of `{title, url}` objects. Numbering
/// restarts at 1 for every group.
pub(crate) fn search_results_block(payload: &str) -> Result<String, serde_json::Error> {
    let groups: Value = serde_json::from_str(payload)?;
    let mut links = Vec::new();
    for group in as_items(&groups) {
        for (index, result) in as_items(group).iter().enumerate() {
            let title = result.get("title").and_then(Value::as_str).unwrap_or_default();
            let url = result.get("url").and_then(Value::as_str).unwrap_or_default();
            links.push(format!("[^{}^][{title}]({url})", index + 1));
        }
    }
    Ok(format!(
        "[assistant](#search_results)\n{}\n\n",
        links.join("\n\n")
    ))
}

fn as_items(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or_default()
}

//! Reply scanning helpers

/// Locate the JSON object inside a classifier reply.
///
/// Handles:
/// - ```json code blocks
/// - Plain ``` code blocks
/// - Raw JSON objects, possibly surrounded by prose
pub fn extract_json_object(text: &str) -> Result<&str, String> {
    if let Some(start) = text.find("```json") {
        let json_start = start + 7;
        if let Some(end) = text[json_start..].find("```") {
            return Ok(text[json_start..json_start + end].trim());
        }
    }

    if let Some(start) = text.find("```") {
        let block_start = start + 3;
        let content_start = text[block_start..]
            .find('\n')
            .map(|i| block_start + i + 1)
            .unwrap_or(block_start);
        if let Some(end) = text[content_start..].find("```") {
            return Ok(text[content_start..content_start + end].trim());
        }
    }

    if let Some(start) = text.find('{') {
        // Stop at the end of the first complete object; trailing prose may hold braces
        let mut stream =
            serde_json::Deserializer::from_str(&text[start..]).into_iter::<serde_json::Value>();
        if let Some(Ok(serde_json::Value::Object(_))) = stream.next() {
            return Ok(&text[start..start + stream.byte_offset()]);
        }

        // Malformed: hand back the widest span so the parser reports why
        if let Some(end) = text.rfind('}') {
            if end > start {
                return Ok(&text[start..=end]);
            }
        }
    }

    Err("no JSON object found in response".to_string())
}

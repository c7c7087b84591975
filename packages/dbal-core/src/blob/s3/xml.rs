//! Minimal ListObjectsV2 XML tag extraction
//!
//! A hand-rolled extractor is enough for this crate's needs: pull the text
//! content of a handful of known tags out of a `ListObjectsV2` response.
//! Pulling in a full XML parser for this would be disproportionate to what
//! the S3 list response actually requires.

/// Extract the text content of the first `<tag>...</tag>` occurrence.
pub fn xml_extract(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    Some(xml[start..end].to_string())
}

/// Extract the text content of every `<tag>...</tag>` occurrence, in
/// document order.
pub fn xml_extract_all(xml: &str, tag: &str) -> Vec<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut out = Vec::new();
    let mut cursor = 0;
    while let Some(rel_start) = xml[cursor..].find(&open) {
        let start = cursor + rel_start + open.len();
        let Some(rel_end) = xml[start..].find(&close) else { break };
        let end = start + rel_end;
        out.push(xml[start..end].to_string());
        cursor = end + close.len();
    }
    out
}

/// Extract every top-level `<element_tag>...</element_tag>` block
/// (including its own tags) so each can be scanned independently for its
/// nested fields — used for each `<Contents>` entry in a list response.
pub fn xml_extract_elements(xml: &str, element_tag: &str) -> Vec<String> {
    let open = format!("<{element_tag}>");
    let close = format!("</{element_tag}>");
    let mut out = Vec::new();
    let mut cursor = 0;
    while let Some(rel_start) = xml[cursor..].find(&open) {
        let start = cursor + rel_start;
        let Some(rel_end) = xml[start..].find(&close) else { break };
        let end = start + rel_end + close.len();
        out.push(xml[start..end].to_string());
        cursor = end;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<ListBucketResult>
  <IsTruncated>false</IsTruncated>
  <Contents>
    <Key>a.txt</Key>
    <Size>10</Size>
    <ETag>"abc123"</ETag>
    <LastModified>2024-01-01T00:00:00.000Z</LastModified>
  </Contents>
  <Contents>
    <Key>b.txt</Key>
    <Size>20</Size>
    <ETag>"def456"</ETag>
    <LastModified>2024-01-02T00:00:00.000Z</LastModified>
  </Contents>
</ListBucketResult>"#;

    #[test]
    fn extracts_single_top_level_tag() {
        assert_eq!(xml_extract(SAMPLE, "IsTruncated"), Some("false".to_string()));
    }

    #[test]
    fn extracts_all_contents_elements() {
        let elements = xml_extract_elements(SAMPLE, "Contents");
        assert_eq!(elements.len(), 2);
        assert_eq!(xml_extract(&elements[0], "Key"), Some("a.txt".to_string()));
        assert_eq!(xml_extract(&elements[1], "Key"), Some("b.txt".to_string()));
    }

    #[test]
    fn extracts_all_occurrences_of_a_tag() {
        let keys = xml_extract_all(SAMPLE, "Key");
        assert_eq!(keys, vec!["a.txt".to_string(), "b.txt".to_string()]);
    }
}

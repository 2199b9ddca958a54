//! Metadata extraction from the system table.
//!
//! `get_info` finds every `<Root ` ... `</Root>` span for each configured root
//! element, parses the span with `quick-xml` and converts it to a JSON tree:
//! - attributes become `"@name"` keys
//! - text next to attributes or child elements becomes `"#text"`
//! - a text-only element becomes a string, an empty one `null`
//! - repeated child elements collapse into an array

use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value as JsonValue};

use crate::error::{CatalogError, Result};

/// Parsed metadata grouped by normalized root name.
pub type CatalogInfo = IndexMap<String, Vec<JsonValue>>;

/// Normalize a root element name to the group key used by `get_info`.
///
/// Strips a `typens:` prefix, a leading `DE` and a trailing `Info`:
/// `DEFeatureClassInfo` is grouped as `FeatureClass`, `DETableInfo` as
/// `Table`, `metadata` stays `metadata`.
pub fn normalize_root_name(root: &str) -> &str {
    let name = root.strip_prefix("typens:").unwrap_or(root);
    let name = name.strip_prefix("DE").unwrap_or(name);
    name.strip_suffix("Info").unwrap_or(name)
}

fn find_bytes(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|pos| pos + from)
}

/// Every `<root ` ... `</root>` span in `bytes`, each search resuming after
/// the previous match.
pub fn find_fragments<'a>(bytes: &'a [u8], root: &str) -> Vec<&'a [u8]> {
    let open = format!("<{} ", root);
    let close = format!("</{}>", root);

    let mut spans = Vec::new();
    let mut pos = 0;
    while let Some(start) = find_bytes(bytes, open.as_bytes(), pos) {
        let Some(end) = find_bytes(bytes, close.as_bytes(), start) else {
            break;
        };
        let end = end + close.len();
        spans.push(&bytes[start..end]);
        pos = end;
    }
    spans
}

/// Collect metadata for every configured root element.
///
/// Malformed fragments fail the scan when `strict` is set and are skipped
/// with a warning otherwise.
pub fn collect_info(bytes: &[u8], roots: &[String], strict: bool) -> Result<CatalogInfo> {
    let mut info = CatalogInfo::new();

    for root in roots {
        let group = normalize_root_name(root);
        for fragment in find_fragments(bytes, root) {
            match parse_fragment(fragment) {
                Ok(tree) => info.entry(group.to_string()).or_default().push(tree),
                Err(e) if strict => return Err(e),
                Err(e) => {
                    tracing::warn!(root = %root, error = %e, "skipping malformed metadata fragment");
                }
            }
        }
    }

    tracing::debug!(groups = info.len(), "catalog metadata collected");
    Ok(info)
}

/// An element under construction.
#[derive(Default)]
struct Frame {
    name: String,
    fields: Map<String, JsonValue>,
    has_children: bool,
    text: String,
}

impl Frame {
    fn open(e: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut fields = Map::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|e| CatalogError::parse(format!("bad attribute: {}", e)))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| CatalogError::parse(format!("bad attribute value: {}", e)))?;
            fields.insert(format!("@{}", key), JsonValue::String(value.into_owned()));
        }
        Ok(Self {
            name,
            fields,
            ..Default::default()
        })
    }

    fn add_child(&mut self, name: String, value: JsonValue) {
        self.has_children = true;
        match self.fields.get_mut(&name) {
            Some(JsonValue::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = JsonValue::Array(vec![first, value]);
            }
            None => {
                self.fields.insert(name, value);
            }
        }
    }

    fn close(self) -> (String, JsonValue) {
        let text = self.text.trim();
        let value = if self.fields.is_empty() && !self.has_children {
            if text.is_empty() {
                JsonValue::Null
            } else {
                JsonValue::String(text.to_string())
            }
        } else {
            let mut fields = self.fields;
            if !text.is_empty() {
                fields.insert("#text".to_string(), JsonValue::String(text.to_string()));
            }
            JsonValue::Object(fields)
        };
        (self.name, value)
    }
}

/// Parse one XML fragment into a JSON tree rooted at its element content.
pub fn parse_fragment(fragment: &[u8]) -> Result<JsonValue> {
    let text = std::str::from_utf8(fragment)
        .map_err(|e| CatalogError::parse(format!("fragment is not UTF-8: {}", e)))?;

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<JsonValue> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(Frame::open(e)?),
            Ok(Event::Empty(ref e)) => {
                let (name, value) = Frame::open(e)?.close();
                match stack.last_mut() {
                    Some(parent) => parent.add_child(name, value),
                    None => root = Some(value),
                }
            }
            Ok(Event::Text(ref e)) => {
                let unescaped = e
                    .unescape()
                    .map_err(|e| CatalogError::parse(format!("bad text: {}", e)))?;
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&unescaped);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                let Some(frame) = stack.pop() else {
                    return Err(CatalogError::parse("unbalanced end tag"));
                };
                let (name, value) = frame.close();
                match stack.last_mut() {
                    Some(parent) => parent.add_child(name, value),
                    None => root = Some(value),
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(CatalogError::parse(format!("XML parse error: {}", e))),
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(CatalogError::parse("unclosed element"));
    }
    root.ok_or_else(|| CatalogError::parse("fragment has no root element"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_root_name() {
        assert_eq!(normalize_root_name("DEFeatureClassInfo"), "FeatureClass");
        assert_eq!(normalize_root_name("typens:DEFeatureDataset"), "FeatureDataset");
        assert_eq!(normalize_root_name("DERasterDataset"), "RasterDataset");
        assert_eq!(normalize_root_name("DETableInfo"), "Table");
        assert_eq!(normalize_root_name("DEWorkspace"), "Workspace");
        assert_eq!(normalize_root_name("ESRI_ItemInformation"), "ESRI_ItemInformation");
        assert_eq!(normalize_root_name("typens:metadata"), "metadata");
    }

    #[test]
    fn test_find_fragments_resumes_after_match() {
        let bytes = b"\x00<metadata a=\"1\"><x/></metadata>\x01\x02<metadata b=\"2\"></metadata><metadata>";
        let spans = find_fragments(bytes, "metadata");
        assert_eq!(spans.len(), 2);
        assert!(spans[1].starts_with(b"<metadata b="));
    }

    #[test]
    fn test_parse_fragment_shape() {
        let xml = br#"<DEFeatureClassInfo xsi:type="typens:DEFeatureClassInfo"><CatalogPath>\Zoning\Parcels</CatalogPath><HasOID>true</HasOID><Fields><FieldArray><Field><Name>apn</Name></Field><Field><Name>zone</Name></Field></FieldArray></Fields><Extent/><Note lang="en">a &amp; b</Note></DEFeatureClassInfo>"#;
        let tree = parse_fragment(xml).unwrap();
        assert_eq!(
            tree,
            json!({
                "@xsi:type": "typens:DEFeatureClassInfo",
                "CatalogPath": "\\Zoning\\Parcels",
                "HasOID": "true",
                "Fields": {"FieldArray": {"Field": [{"Name": "apn"}, {"Name": "zone"}]}},
                "Extent": null,
                "Note": {"@lang": "en", "#text": "a & b"}
            })
        );
    }

    #[test]
    fn test_parse_fragment_rejects_malformed() {
        assert!(matches!(
            parse_fragment(b"<metadata a=\"1\"><open></metadata>"),
            Err(CatalogError::Parse(_))
        ));
        assert!(matches!(
            parse_fragment(b"\xff\xfe"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn test_collect_info_lenient_and_strict() {
        let bytes = b"<metadata x=\"1\"><a>1</a></metadata><metadata y=\"2\"><b></metadata>";
        let roots = vec!["metadata".to_string()];

        let info = collect_info(bytes, &roots, false).unwrap();
        assert_eq!(info["metadata"].len(), 1);
        assert_eq!(info["metadata"][0]["a"], "1");

        assert!(matches!(
            collect_info(bytes, &roots, true),
            Err(CatalogError::Parse(_))
        ));
    }
}

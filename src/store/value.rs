//! Firestore REST document encoding.
//!
//! Firestore wraps every field in a typed value object
//! (`{"stringValue": "..."}`, `{"arrayValue": {"values": [...]}}`, ...).
//! Only the shapes a note document uses are produced. Any other value type
//! (references, geo points, bytes) is kept opaque on read so foreign writes
//! do not break the listing.

use crate::models::{ChecklistItem, Note, NoteFields, NotePatch};
use crate::store::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
    #[serde(untagged)]
    Other(serde_json::Value),
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub(crate) struct ArrayValue {
    #[serde(default)]
    pub values: Vec<Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub(crate) struct MapValue {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub(crate) struct Document {
    /// `projects/{p}/databases/(default)/documents/notes/{id}`; empty on write.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

/// One element of a `:runQuery` response stream. A query with no matches
/// still yields one element carrying only `readTime`.
#[derive(Deserialize, Clone, Debug)]
pub(crate) struct RunQueryItem {
    #[serde(default)]
    pub document: Option<Document>,
}

fn string(v: &str) -> Value {
    Value::StringValue(v.to_string())
}

fn encode_item(item: &ChecklistItem) -> Value {
    let mut fields = BTreeMap::new();
    fields.insert("id".to_string(), string(&item.id));
    fields.insert("text".to_string(), string(&item.text));
    fields.insert("completed".to_string(), Value::BooleanValue(item.completed));
    Value::MapValue(MapValue { fields })
}

fn encode_todos(todos: &[ChecklistItem]) -> Value {
    Value::ArrayValue(ArrayValue {
        values: todos.iter().map(encode_item).collect(),
    })
}

pub(crate) fn encode_fields(fields: &NoteFields) -> Document {
    let mut out = BTreeMap::new();
    out.insert("title".to_string(), string(&fields.title));
    out.insert("content".to_string(), string(&fields.content));
    out.insert("todos".to_string(), encode_todos(&fields.todos));
    out.insert("createdAt".to_string(), string(&fields.created_at));
    Document {
        name: String::new(),
        fields: out,
    }
}

pub(crate) fn encode_patch(patch: &NotePatch) -> Document {
    let value = match patch {
        NotePatch::Title(v) | NotePatch::Content(v) => string(v),
        NotePatch::Todos(todos) => encode_todos(todos),
    };
    let mut fields = BTreeMap::new();
    fields.insert(patch.field_path().to_string(), value);
    Document {
        name: String::new(),
        fields,
    }
}

fn as_text(v: Option<&Value>) -> String {
    match v {
        Some(Value::StringValue(s)) | Some(Value::TimestampValue(s)) => s.clone(),
        Some(Value::IntegerValue(s)) => s.clone(),
        Some(Value::DoubleValue(d)) => d.to_string(),
        _ => String::new(),
    }
}

fn decode_item(v: &Value) -> Option<ChecklistItem> {
    let Value::MapValue(map) = v else {
        return None;
    };
    let completed = matches!(map.fields.get("completed"), Some(Value::BooleanValue(true)));
    Some(ChecklistItem {
        id: as_text(map.fields.get("id")),
        text: as_text(map.fields.get("text")),
        completed,
    })
}

/// Last path segment of a document name.
pub(crate) fn document_id(name: &str) -> StoreResult<String> {
    match name.rsplit('/').next() {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(StoreError::parse(format!("document name without id: {name:?}"))),
    }
}

pub(crate) fn decode_note(doc: &Document) -> StoreResult<Note> {
    let id = document_id(&doc.name)?;
    let todos = match doc.fields.get("todos") {
        Some(Value::ArrayValue(arr)) => arr.values.iter().filter_map(decode_item).collect(),
        _ => vec![],
    };

    Ok(Note {
        id,
        title: as_text(doc.fields.get("title")),
        content: as_text(doc.fields.get("content")),
        todos,
        created_at: as_text(doc.fields.get("createdAt")),
    })
}

pub(crate) fn decode_query(items: &[RunQueryItem]) -> StoreResult<Vec<Note>> {
    items
        .iter()
        .filter_map(|item| item.document.as_ref())
        .map(decode_note)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_fields_wire_shape() {
        let fields = NoteFields {
            title: "T".to_string(),
            content: "C".to_string(),
            todos: vec![ChecklistItem {
                id: "1".to_string(),
                text: "buy milk".to_string(),
                completed: false,
            }],
            created_at: "2024-05-01T10:00:00.000Z".to_string(),
        };
        let v = serde_json::to_value(encode_fields(&fields)).expect("should serialize");
        assert!(v.get("name").is_none());
        assert_eq!(v["fields"]["title"]["stringValue"], "T");
        assert_eq!(v["fields"]["createdAt"]["stringValue"], "2024-05-01T10:00:00.000Z");
        let item = &v["fields"]["todos"]["arrayValue"]["values"][0]["mapValue"]["fields"];
        assert_eq!(item["text"]["stringValue"], "buy milk");
        assert_eq!(item["completed"]["booleanValue"], false);
    }

    #[test]
    fn test_encode_patch_writes_only_named_field() {
        let v = serde_json::to_value(encode_patch(&NotePatch::Content("body".to_string())))
            .expect("should serialize");
        let fields = v["fields"].as_object().expect("fields object");
        assert_eq!(fields.len(), 1);
        assert_eq!(v["fields"]["content"]["stringValue"], "body");
    }

    #[test]
    fn test_empty_todos_encode_as_empty_array_value() {
        let v = serde_json::to_value(encode_patch(&NotePatch::Todos(vec![])))
            .expect("should serialize");
        assert_eq!(v["fields"]["todos"]["arrayValue"]["values"], serde_json::json!([]));
    }

    #[test]
    fn test_decode_run_query_response() {
        let json = r#"[
            {
                "document": {
                    "name": "projects/demo/databases/(default)/documents/notes/abc",
                    "fields": {
                        "title": {"stringValue": "Groceries"},
                        "content": {"stringValue": "weekend"},
                        "createdAt": {"stringValue": "2024-05-01T10:00:00.000Z"},
                        "todos": {"arrayValue": {"values": [
                            {"mapValue": {"fields": {
                                "id": {"stringValue": "1714557600000"},
                                "text": {"stringValue": "buy milk"},
                                "completed": {"booleanValue": true}
                            }}}
                        ]}}
                    },
                    "createTime": "2024-05-01T10:00:00.100000Z",
                    "updateTime": "2024-05-01T10:00:00.100000Z"
                },
                "readTime": "2024-05-01T10:00:01.000000Z"
            }
        ]"#;
        let items: Vec<RunQueryItem> = serde_json::from_str(json).expect("should parse");
        let notes = decode_query(&items).expect("should decode");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, "abc");
        assert_eq!(notes[0].title, "Groceries");
        assert_eq!(notes[0].todos[0].text, "buy milk");
        assert!(notes[0].todos[0].completed);
    }

    #[test]
    fn test_decode_empty_query_has_no_documents() {
        let json = r#"[{"readTime": "2024-05-01T10:00:01.000000Z"}]"#;
        let items: Vec<RunQueryItem> = serde_json::from_str(json).expect("should parse");
        assert!(decode_query(&items).expect("should decode").is_empty());
    }

    #[test]
    fn test_decode_tolerates_missing_and_foreign_fields() {
        let json = r#"{
            "name": "projects/demo/databases/(default)/documents/notes/x1",
            "fields": {
                "title": {"nullValue": null},
                "createdAt": {"timestampValue": "2024-05-01T10:00:00Z"},
                "todos": {"arrayValue": {}}
            }
        }"#;
        let doc: Document = serde_json::from_str(json).expect("should parse");
        let note = decode_note(&doc).expect("should decode");
        assert_eq!(note.title, "");
        assert_eq!(note.content, "");
        assert!(note.todos.is_empty());
        assert_eq!(note.created_at, "2024-05-01T10:00:00Z");
    }

    #[test]
    fn test_decode_ignores_unknown_value_types() {
        let json = r#"{
            "name": "projects/demo/databases/(default)/documents/notes/x2",
            "fields": {
                "title": {"stringValue": "Map"},
                "owner": {"referenceValue": "projects/demo/databases/(default)/documents/users/u1"},
                "where": {"geoPointValue": {"latitude": 1.5, "longitude": 2.5}},
                "blob": {"bytesValue": "AAE="},
                "content": {"bytesValue": "AAE="},
                "todos": {"arrayValue": {"values": [
                    {"mapValue": {"fields": {
                        "id": {"stringValue": "1"},
                        "text": {"stringValue": "pin"},
                        "completed": {"booleanValue": false},
                        "place": {"geoPointValue": {"latitude": 0, "longitude": 0}}
                    }}},
                    {"referenceValue": "projects/demo/databases/(default)/documents/x/y"}
                ]}}
            }
        }"#;
        let doc: Document = serde_json::from_str(json).expect("should parse");
        let note = decode_note(&doc).expect("should decode");
        assert_eq!(note.title, "Map");
        assert_eq!(note.content, "");
        assert_eq!(note.todos.len(), 1);
        assert_eq!(note.todos[0].text, "pin");
    }

    #[test]
    fn test_document_id_requires_segment() {
        assert!(document_id("").is_err());
        assert_eq!(document_id("a/b/notes/n9").expect("id"), "n9");
    }
}

//! Integration tests for resolving patch operations against record types.
#![allow(missing_docs)]

use chrono::{DateTime, TimeZone, Utc};
use resdoc::{resolve_patches, unmarshal_patches, PatchOp, Record, ResdocError, Value};
use serde_json::json;
use std::collections::BTreeMap;

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct Code(String);

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Code {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 3 && s.chars().all(|c| c.is_ascii_uppercase()) {
            Ok(Code(s.to_owned()))
        } else {
            Err(format!("{s} is not a three letter code"))
        }
    }
}

resdoc::text_value!(Code);

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct Inner {
    pub a: String,
    pub b: i32,
}

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct Member {
    #[resdoc(primary = "members")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Default, Record)]
struct Patchable {
    #[resdoc(primary = "patchables")]
    pub id: String,
    pub int: i64,
    pub name: String,
    pub flag: bool,
    pub at: DateTime<Utc>,
    #[resdoc(attr = "struct")]
    pub inner: Inner,
    pub maybe: Option<Box<Inner>>,
    pub list: Vec<u16>,
    pub nested_list: Vec<Inner>,
    pub labels: BTreeMap<String, String>,
    pub doc: Value,
    pub code: Code,
    #[resdoc(relation)]
    pub owner: Option<Box<Member>>,
    #[resdoc(relation)]
    pub members: Vec<Member>,
}

fn resolve_one(op: PatchOp) -> Result<PatchOp, ResdocError> {
    resolve_patches::<Patchable>(vec![op]).map(|mut ops| ops.remove(0))
}

// ============================================================================
// Attributes
// ============================================================================

#[test]
fn test_replace_primitives() {
    let op = resolve_one(PatchOp::replace("/int", json!(5))).unwrap();
    assert_eq!(op.value.downcast_ref::<i64>(), Some(&5));

    let op = resolve_one(PatchOp::replace("/name", json!("renamed"))).unwrap();
    assert_eq!(op.value.downcast_ref::<String>().map(String::as_str), Some("renamed"));

    let op = resolve_one(PatchOp::test("/flag", json!(true))).unwrap();
    assert_eq!(op.value.downcast_ref::<bool>(), Some(&true));
}

#[test]
fn test_replace_time() {
    let op = resolve_one(PatchOp::replace("/at", json!("2023-10-01T00:00:00Z"))).unwrap();
    assert_eq!(
        op.value.downcast_ref::<DateTime<Utc>>(),
        Some(&Utc.with_ymd_and_hms(2023, 10, 1, 0, 0, 0).unwrap())
    );

    let err = resolve_one(PatchOp::replace("/at", json!("yesterday"))).unwrap_err();
    assert!(matches!(err, ResdocError::InvalidValue { .. }));
}

#[test]
fn test_type_mismatch_carries_path() {
    let err = resolve_one(PatchOp::replace("/int", json!("five"))).unwrap_err();
    match err {
        ResdocError::TypeMismatch { path, .. } => assert_eq!(path.to_string(), "$.int"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_nested_struct() {
    let op = resolve_one(PatchOp::replace("/struct/a", json!("x"))).unwrap();
    assert_eq!(op.value.downcast_ref::<String>().map(String::as_str), Some("x"));

    let op = resolve_one(PatchOp::replace("/struct", json!({"a": "y", "b": 2}))).unwrap();
    assert_eq!(
        op.value.downcast_ref::<Inner>(),
        Some(&Inner {
            a: "y".into(),
            b: 2
        })
    );

    let err = resolve_one(PatchOp::replace("/struct/c", json!(1))).unwrap_err();
    match err {
        ResdocError::PathNotFound { path } => assert_eq!(path.to_string(), "$.struct.c"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_optional_boxed_struct() {
    let op = resolve_one(PatchOp::replace("/maybe/b", json!(7))).unwrap();
    assert_eq!(op.value.downcast_ref::<i32>(), Some(&7));

    let op = resolve_one(PatchOp::replace("/maybe", json!(null))).unwrap();
    assert_eq!(op.value.downcast_ref::<Option<Box<Inner>>>(), Some(&None));

    let op = resolve_one(PatchOp::replace("/maybe", json!({"a": "z"}))).unwrap();
    let inner = op.value.downcast_ref::<Option<Box<Inner>>>().unwrap();
    assert_eq!(inner.as_ref().map(|i| i.a.as_str()), Some("z"));
}

#[test]
fn test_add_to_slice() {
    let op = resolve_one(PatchOp::add("/list", json!(3))).unwrap();
    assert_eq!(op.value.downcast_ref::<u16>(), Some(&3));

    let op = resolve_one(PatchOp::add("/list/-", json!(4))).unwrap();
    assert_eq!(op.value.downcast_ref::<u16>(), Some(&4));

    let op = resolve_one(PatchOp::add("/nestedList", json!({"a": "q"}))).unwrap();
    assert_eq!(op.value.downcast_ref::<Inner>().map(|i| i.a.as_str()), Some("q"));

    let err = resolve_one(PatchOp::add("/list", json!(70000))).unwrap_err();
    assert!(matches!(err, ResdocError::InvalidValue { .. }));
}

#[test]
fn test_replace_slice_and_elements() {
    let op = resolve_one(PatchOp::replace("/list", json!([1, 2]))).unwrap();
    assert_eq!(op.value.downcast_ref::<Vec<u16>>(), Some(&vec![1, 2]));

    let op = resolve_one(PatchOp::replace("/list/0", json!(9))).unwrap();
    assert_eq!(op.value.downcast_ref::<u16>(), Some(&9));

    let op = resolve_one(PatchOp::replace("/nestedList/1/b", json!(3))).unwrap();
    assert_eq!(op.value.downcast_ref::<i32>(), Some(&3));

    let err = resolve_one(PatchOp::replace("/list/first", json!(1))).unwrap_err();
    assert!(matches!(err, ResdocError::PathNotFound { .. }));
}

#[test]
fn test_add_to_non_slice() {
    let err = resolve_one(PatchOp::add("/int", json!(1))).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid patch operation - target field is not a slice at $.int"
    );

    let err = resolve_one(PatchOp::add("/struct/a", json!("x"))).unwrap_err();
    assert!(matches!(err, ResdocError::NotASlice { .. }));
}

#[test]
fn test_maps_and_dynamic_values() {
    let op = resolve_one(PatchOp::replace("/labels/color", json!("red"))).unwrap();
    assert_eq!(op.value.downcast_ref::<String>().map(String::as_str), Some("red"));

    let op = resolve_one(PatchOp::replace("/labels", json!({"a": "b"}))).unwrap();
    let labels = op.value.downcast_ref::<BTreeMap<String, String>>().unwrap();
    assert_eq!(labels.get("a").map(String::as_str), Some("b"));

    let op = resolve_one(PatchOp::replace("/doc/any/depth", json!([1, {"x": null}]))).unwrap();
    assert_eq!(op.value.downcast_ref::<Value>(), Some(&json!([1, {"x": null}])));
}

#[test]
fn test_text_codec_validation() {
    let op = resolve_one(PatchOp::replace("/code", json!("ABC"))).unwrap();
    assert_eq!(op.value.downcast_ref::<Code>(), Some(&Code("ABC".into())));

    let err = resolve_one(PatchOp::replace("/code", json!("abcd"))).unwrap_err();
    match err {
        ResdocError::InvalidValue { path, message } => {
            assert_eq!(path.to_string(), "$.code");
            assert!(message.contains("three letter code"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ============================================================================
// Relationships
// ============================================================================

#[test]
fn test_replace_to_one_relationship() {
    let op = resolve_one(PatchOp::replace("/owner", json!("9"))).unwrap();
    let owner = op.value.downcast_ref::<Option<Box<Member>>>().unwrap();
    assert_eq!(owner.as_ref().map(|m| m.id.as_str()), Some("9"));
    assert_eq!(op.value.as_json(), &json!({"type": "members", "id": "9"}));

    let op = resolve_one(PatchOp::replace("/owner", json!(12))).unwrap();
    assert_eq!(op.value.as_json(), &json!({"type": "members", "id": "12"}));

    let op = resolve_one(PatchOp::replace("/owner", json!(null))).unwrap();
    assert_eq!(op.value.downcast_ref::<Option<Box<Member>>>(), Some(&None));

    let err = resolve_one(PatchOp::replace("/owner", json!({"id": "9"}))).unwrap_err();
    assert!(matches!(err, ResdocError::TypeMismatch { .. }));

    let err = resolve_one(PatchOp::add("/owner", json!("9"))).unwrap_err();
    assert!(matches!(err, ResdocError::NotASlice { .. }));
}

#[test]
fn test_to_many_relationship() {
    let op = resolve_one(PatchOp::replace("/members", json!(["1", "2"]))).unwrap();
    let members = op.value.downcast_ref::<Vec<Member>>().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[1].id, "2");
    assert_eq!(
        op.value.as_json(),
        &json!([{"type": "members", "id": "1"}, {"type": "members", "id": "2"}])
    );

    let op = resolve_one(PatchOp::add("/members", json!("3"))).unwrap();
    assert_eq!(op.value.downcast_ref::<Member>().map(|m| m.id.as_str()), Some("3"));

    let err = resolve_one(PatchOp::replace("/members", json!("3"))).unwrap_err();
    assert!(matches!(err, ResdocError::SliceValueRequired { .. }));
}

#[test]
fn test_relationship_is_terminal() {
    let err = resolve_one(PatchOp::replace("/owner/name", json!("x"))).unwrap_err();
    assert!(matches!(err, ResdocError::PathNotFound { .. }));
}

// ============================================================================
// Operation validation
// ============================================================================

#[test]
fn test_empty_op_and_path() {
    let err = resolve_one(PatchOp::new("", "/int", json!(1))).unwrap_err();
    assert!(matches!(err, ResdocError::EmptyOp));

    let err = resolve_one(PatchOp::replace("", json!(1))).unwrap_err();
    assert_eq!(err.to_string(), "invalid patch operation - empty path");
}

#[test]
fn test_unknown_field_and_primary() {
    let err = resolve_one(PatchOp::replace("/nope", json!(1))).unwrap_err();
    assert!(matches!(err, ResdocError::PathNotFound { .. }));

    let err = resolve_one(PatchOp::replace("/id", json!("2"))).unwrap_err();
    assert!(matches!(err, ResdocError::PathNotFound { .. }));
}

#[test]
fn test_unmarshal_patch_list() {
    let raw = json!([
        {"op": "replace", "path": "/name", "value": "x"},
        {"op": "remove", "path": "/int"},
        {"op": "add", "path": "/members", "value": "5"}
    ]);
    let ops = unmarshal_patches::<Patchable>(&serde_json::to_vec(&raw).unwrap()).unwrap();
    assert_eq!(ops.len(), 3);
    assert!(ops[0].value.typed().is_some());
    assert_eq!(ops[1].op, "remove");
    assert!(ops[1].value.typed().is_none());
    assert_eq!(ops[1].value.as_json(), &Value::Null);

    assert_eq!(
        serde_json::to_value(&ops).unwrap(),
        json!([
            {"op": "replace", "path": "/name", "value": "x"},
            {"op": "remove", "path": "/int", "value": null},
            {"op": "add", "path": "/members", "value": {"type": "members", "id": "5"}}
        ])
    );
}

#[test]
fn test_unmarshal_patch_list_rejects_garbage() {
    let err = unmarshal_patches::<Patchable>(b"{\"op\": \"replace\"}").unwrap_err();
    assert!(matches!(err, ResdocError::Serialization(_)));
}

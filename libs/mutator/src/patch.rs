use crate::label::SERVICE_LABEL;

use std::collections::BTreeMap;

use json_patch::jsonptr::PointerBuf;
use json_patch::{AddOperation, Patch, PatchOperation, ReplaceOperation};
use serde_json::{Value, json};

fn labels_path() -> PointerBuf {
    PointerBuf::from_tokens(["metadata", "labels"])
}

fn service_label_path() -> PointerBuf {
    PointerBuf::from_tokens(["metadata", "labels", SERVICE_LABEL])
}

/// Build the smallest JSON Patch that sets the `service` label to `value`.
///
/// `labels` is the Pod's current labels map, `None` if the Pod has none. Adding a key under a
/// missing parent is undefined in JSON Patch, so an empty map is added first in that case.
/// Returns `None` when the label already holds `value`.
pub fn service_label_patch(
    labels: Option<&BTreeMap<String, String>>,
    value: &str,
) -> Option<Patch> {
    let operations = match labels {
        None => vec![
            PatchOperation::Add(AddOperation {
                path: labels_path(),
                value: json!({}),
            }),
            PatchOperation::Add(AddOperation {
                path: service_label_path(),
                value: Value::String(value.to_string()),
            }),
        ],
        Some(labels) => match labels.get(SERVICE_LABEL) {
            Some(current) if current == value => return None,
            Some(_) => vec![PatchOperation::Replace(ReplaceOperation {
                path: service_label_path(),
                value: Value::String(value.to_string()),
            })],
            None => vec![PatchOperation::Add(AddOperation {
                path: service_label_path(),
                value: Value::String(value.to_string()),
            })],
        },
    };
    Some(Patch(operations))
}

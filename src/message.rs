//! Decodes the wire-neutral transaction message grammar (`spec.md` §6) into
//! an [`Operation`]. This is not itself a wire adapter — adapters (out of
//! scope here) are expected to translate their own request shape into this
//! tuple grammar and hand it to [`decode`]; tests in this crate use it to
//! simulate what an adapter would send without needing one.

use serde_json::Value as Json;

use crate::backend::ConflictPolicy;
use crate::error::Error;
use crate::model::Id;
use crate::transaction::{Operation, OperationData, OperationOptions};
use crate::value::{DataMap, Value};

/// Decodes one transaction message. `tuple` must have 2, 3, or 4 elements,
/// per `spec.md`'s grammar:
/// - 4: `[action, kind, data, options]`
/// - 3: `[action, kind, data]` (options default) or `[action, kind, id]` when
///   only an id is needed
/// - 2: `[action, kind]` with defaults
///
/// Any other shape — wrong arity, an unrecognized `action`/`kind`, or a
/// `data`/`id` payload that doesn't fit the shape the action requires —
/// fails with [`Error::InvalidOperationMessage`].
pub fn decode(tuple: &[Json]) -> Result<Operation, Error> {
    let (action, kind, payload, options) = match tuple {
        [action, kind] => (action, kind, None, None),
        [action, kind, third] => (action, kind, Some(third), None),
        [action, kind, data, options] => (action, kind, Some(data), Some(options)),
        _ => return Err(Error::InvalidOperationMessage),
    };

    let action = action.as_str().ok_or(Error::InvalidOperationMessage)?;
    let kind = kind.as_str().ok_or(Error::InvalidOperationMessage)?;
    let conflict = options
        .and_then(|o| o.get("conflict"))
        .and_then(Json::as_str)
        .map(|c| match c {
            "ignore" => Ok(ConflictPolicy::Ignore),
            "error" => Ok(ConflictPolicy::Error),
            _ => Err(Error::InvalidOperationMessage),
        })
        .transpose()?
        .unwrap_or_default();

    let data = match action {
        "create" if kind == "node" => decode_create_node(payload)?,
        "create" if kind == "edge" => decode_create_edge(payload)?,
        "update" if kind == "node" => decode_update(payload, true)?,
        "update" if kind == "edge" => decode_update(payload, false)?,
        "delete" if kind == "node" => decode_delete(payload, true)?,
        "delete" if kind == "edge" => decode_delete(payload, false)?,
        "noop" => OperationData::Noop,
        _ => return Err(Error::InvalidOperationMessage),
    };

    Ok(Operation::with_options(data, OperationOptions { conflict }))
}

fn decode_create_node(payload: Option<&Json>) -> Result<OperationData, Error> {
    let obj = payload.and_then(Json::as_object);
    Ok(OperationData::CreateNode {
        id: obj.and_then(|o| o.get("id")).map(json_to_id).transpose()?,
        key: obj.and_then(|o| o.get("key")).and_then(Json::as_str).map(str::to_string),
        data: obj
            .and_then(|o| o.get("data"))
            .map(json_to_data_map)
            .transpose()?
            .unwrap_or_default(),
        schema: obj.and_then(|o| o.get("schema")).and_then(Json::as_str).map(str::to_string),
    })
}

fn decode_create_edge(payload: Option<&Json>) -> Result<OperationData, Error> {
    let obj = payload.and_then(Json::as_object).ok_or(Error::InvalidOperationMessage)?;
    let source = obj.get("source").ok_or(Error::InvalidOperationMessage).and_then(json_to_id)?;
    let target = obj.get("target").ok_or(Error::InvalidOperationMessage).and_then(json_to_id)?;
    Ok(OperationData::CreateEdge {
        id: obj.get("id").map(json_to_id).transpose()?,
        key: obj.get("key").and_then(Json::as_str).map(str::to_string),
        source,
        target,
        weight: obj.get("weight").and_then(Json::as_f64).unwrap_or(0.0),
        data: obj.get("data").map(json_to_data_map).transpose()?.unwrap_or_default(),
    })
}

fn decode_update(payload: Option<&Json>, node: bool) -> Result<OperationData, Error> {
    let payload = payload.ok_or(Error::InvalidOperationMessage)?;
    let (id, patch) = match payload {
        Json::Object(obj) => (
            obj.get("id").ok_or(Error::InvalidOperationMessage).and_then(json_to_id)?,
            obj.get("patch").map(json_to_data_map).transpose()?.unwrap_or_default(),
        ),
        Json::String(_) | Json::Number(_) => (json_to_id(payload)?, DataMap::new()),
        _ => return Err(Error::InvalidOperationMessage),
    };
    Ok(if node {
        OperationData::UpdateNode { id, patch }
    } else {
        OperationData::UpdateEdge { id, patch }
    })
}

fn decode_delete(payload: Option<&Json>, node: bool) -> Result<OperationData, Error> {
    let payload = payload.ok_or(Error::InvalidOperationMessage)?;
    let id = match payload {
        Json::Object(obj) => obj.get("id").ok_or(Error::InvalidOperationMessage).and_then(json_to_id)?,
        Json::String(_) | Json::Number(_) => json_to_id(payload)?,
        _ => return Err(Error::InvalidOperationMessage),
    };
    Ok(if node {
        OperationData::DeleteNode { id }
    } else {
        OperationData::DeleteEdge { id }
    })
}

fn json_to_id(value: &Json) -> Result<Id, Error> {
    match value {
        Json::String(s) => Ok(Id::String(s.clone())),
        Json::Number(n) => n.as_i64().map(Id::Int).ok_or(Error::InvalidOperationMessage),
        _ => Err(Error::InvalidOperationMessage),
    }
}

fn json_to_data_map(value: &Json) -> Result<DataMap, Error> {
    match value {
        Json::Object(obj) => obj.iter().map(|(k, v)| Ok((k.clone(), json_to_value(v)?))).collect(),
        _ => Err(Error::InvalidOperationMessage),
    }
}

fn json_to_value(value: &Json) -> Result<Value, Error> {
    Ok(match value {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().ok_or(Error::InvalidOperationMessage)?)
            }
        }
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::List(items.iter().map(json_to_value).collect::<Result<_, _>>()?),
        Json::Object(obj) => Value::Map(
            obj.iter()
                .map(|(k, v)| Ok((k.clone(), json_to_value(v)?)))
                .collect::<Result<_, Error>>()?,
        ),
    })
}

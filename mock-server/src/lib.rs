use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub object_type: String,
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fault {
    pub object_type: String,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<FaultArg>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaultArg {
    pub name: String,
    pub value: String,
}

impl Fault {
    fn new(code: &str, message: String) -> Self {
        Self {
            object_type: "Fault".to_string(),
            code: code.to_string(),
            message,
            args: Vec::new(),
        }
    }

    fn item_not_found(id: i64) -> Self {
        let mut fault = Self::new("ITEM_NOT_FOUND", format!("Item id \"{id}\" not found"));
        fault.args.push(FaultArg {
            name: "ID".to_string(),
            value: id.to_string(),
        });
        fault
    }
}

/// One call inside a `/multirequest` body.
#[derive(Debug, Deserialize)]
pub struct Call {
    pub service: String,
    pub action: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Default)]
pub struct Store {
    next_id: i64,
    items: BTreeMap<i64, Item>,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/service/{service}/action/{action}", post(single_call))
        .route("/multirequest", post(multi_call))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Single calls answer `{"result": ..}` or `{"error": ..}`.
async fn single_call(
    State(db): State<Db>,
    Path((service, action)): Path<(String, String)>,
    Json(params): Json<Value>,
) -> Json<Value> {
    let mut store = db.write().await;
    match dispatch(&mut store, &service, &action, &params) {
        Ok(result) => Json(json!({ "result": result })),
        Err(fault) => Json(json!({ "error": fault })),
    }
}

/// Batched calls answer a list; a failed call is reported as
/// `{"result": {"error": ..}}`.
async fn multi_call(State(db): State<Db>, Json(calls): Json<Vec<Call>>) -> Json<Vec<Value>> {
    let mut store = db.write().await;
    let responses = calls
        .iter()
        .map(|call| match dispatch(&mut store, &call.service, &call.action, &call.params) {
            Ok(result) => json!({ "result": result }),
            Err(fault) => json!({ "result": { "error": fault } }),
        })
        .collect();
    Json(responses)
}

fn dispatch(store: &mut Store, service: &str, action: &str, params: &Value) -> Result<Value, Fault> {
    tracing::debug!(service, action, "dispatching call");
    match (service, action) {
        ("item", "add") => {
            let name = params
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| missing_param("name"))?;
            store.next_id += 1;
            let item = Item {
                object_type: "Item".to_string(),
                id: store.next_id,
                name: name.to_string(),
            };
            store.items.insert(item.id, item.clone());
            to_value(&item)
        }
        ("item", "get") => {
            let id = item_id(params)?;
            store
                .items
                .get(&id)
                .ok_or_else(|| Fault::item_not_found(id))
                .and_then(to_value)
        }
        ("item", "delete") => {
            let id = item_id(params)?;
            store
                .items
                .remove(&id)
                .map(|_| Value::Null)
                .ok_or_else(|| Fault::item_not_found(id))
        }
        ("item", "list") => {
            let objects: Vec<&Item> = store.items.values().collect();
            let total_count = objects.len();
            Ok(json!({
                "objectType": "ItemListResponse",
                "objects": objects,
                "totalCount": total_count,
            }))
        }
        ("item", "count") => Ok(json!(store.items.len())),
        _ => Err(Fault::new(
            "SERVICE_ACTION_FORBIDDEN",
            format!("The access to service [{service}->{action}] is forbidden"),
        )),
    }
}

fn item_id(params: &Value) -> Result<i64, Fault> {
    params
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| missing_param("id"))
}

fn missing_param(name: &str) -> Fault {
    Fault::new("MISSING_MANDATORY_PARAMETER", format!("Missing parameter \"{name}\""))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, Fault> {
    serde_json::to_value(value).map_err(|err| {
        tracing::error!(%err, "failed to serialize response");
        Fault::new("INTERNAL_ERROR", format!("Failed to serialize response: {err}"))
    })
}

//! Test doubles shared by the unit tests of this crate

use crate::codec::NativeObject;
use crate::registry::{ResourceKind, SchemaRegistry};
use crate::remote::{CancelToken, Created, Remote, RemoteError, RemoteResult};
use crate::schema::{AttributeSpec, ResourceSchema, ValueType};
use crate::value::{AttributeValue, Attributes};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Kind with a required `name` and an optional+computed `ttl`.
pub struct Widget {
    schema: ResourceSchema,
}

impl Widget {
    pub fn new() -> Self {
        Self {
            schema: ResourceSchema::new()
                .attribute(AttributeSpec::required("name", ValueType::String))
                .attribute(AttributeSpec::optional_computed("ttl", ValueType::String))
                .attribute(AttributeSpec::optional_computed(
                    "tags",
                    ValueType::list_of(ValueType::String),
                )),
        }
    }
}

impl ResourceKind for Widget {
    fn name(&self) -> &'static str {
        "widget"
    }

    fn description(&self) -> &'static str {
        "Test widget"
    }

    fn schema(&self) -> &ResourceSchema {
        &self.schema
    }
}

pub fn registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry
        .register(Widget::new())
        .expect("widget schema is valid");
    registry
}

pub fn widget_config(name: &str) -> Attributes {
    Attributes::from([("name".to_string(), AttributeValue::from(name))])
}

/// In-memory remote that fills `ttl` with "24h" and `tags` with `[]`,
/// records every call, and can be told to fail the next call.
#[derive(Default)]
pub struct MockRemote {
    store: Mutex<BTreeMap<String, NativeObject>>,
    calls: Mutex<Vec<String>>,
    fail_next: Mutex<Option<RemoteError>>,
    respond_with: Mutex<Option<NativeObject>>,
    next_id: AtomicUsize,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next call with `error`, without side effects.
    pub fn fail_next(&self, error: RemoteError) {
        *self.fail_next.lock().unwrap() = Some(error);
    }

    /// Return `document` from the next create/update instead of the stored one.
    pub fn respond_with(&self, document: Value) {
        let Value::Object(doc) = document else {
            panic!("response must be an object");
        };
        *self.respond_with.lock().unwrap() = Some(doc);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn stored(&self, id: &str) -> Option<NativeObject> {
        self.store.lock().unwrap().get(id).cloned()
    }

    pub fn insert(&self, id: &str, document: Value) {
        let Value::Object(doc) = document else {
            panic!("document must be an object");
        };
        self.store.lock().unwrap().insert(id.to_string(), doc);
    }

    fn begin(&self, call: String, cancel: &CancelToken) -> RemoteResult<()> {
        self.calls.lock().unwrap().push(call);
        if cancel.is_cancelled() {
            return Err(RemoteError::Cancelled);
        }
        match self.fail_next.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn fill_defaults(document: &NativeObject) -> NativeObject {
        let mut doc = document.clone();
        doc.entry("ttl").or_insert_with(|| json!("24h"));
        doc.entry("tags").or_insert_with(|| json!([]));
        doc
    }

    fn response(&self, stored: NativeObject) -> NativeObject {
        self.respond_with.lock().unwrap().take().unwrap_or(stored)
    }
}

impl Remote for MockRemote {
    fn get(&self, kind: &str, id: &str, cancel: &CancelToken) -> RemoteResult<NativeObject> {
        self.begin(format!("get {kind} {id}"), cancel)?;
        self.stored(id).ok_or(RemoteError::NotFound)
    }

    fn create(
        &self,
        kind: &str,
        document: &NativeObject,
        cancel: &CancelToken,
    ) -> RemoteResult<Created> {
        self.begin(format!("create {kind}"), cancel)?;
        let id = (self.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string();
        let stored = Self::fill_defaults(document);
        self.store.lock().unwrap().insert(id.clone(), stored.clone());
        Ok(Created {
            id,
            document: self.response(stored),
        })
    }

    fn update(
        &self,
        kind: &str,
        id: &str,
        document: &NativeObject,
        cancel: &CancelToken,
    ) -> RemoteResult<NativeObject> {
        self.begin(format!("update {kind} {id}"), cancel)?;
        let mut store = self.store.lock().unwrap();
        if !store.contains_key(id) {
            return Err(RemoteError::NotFound);
        }
        let stored = Self::fill_defaults(document);
        store.insert(id.to_string(), stored.clone());
        drop(store);
        Ok(self.response(stored))
    }

    fn delete(&self, kind: &str, id: &str, cancel: &CancelToken) -> RemoteResult<()> {
        self.begin(format!("delete {kind} {id}"), cancel)?;
        self.store
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or(RemoteError::NotFound)
    }
}

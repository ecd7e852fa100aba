//! Values the control plane fills in when a request leaves them out

use crate::kinds::{ConsulCluster, NomadCluster, StaticIp, TerraformWorkspace, VaultCluster};
use declarative::NativeObject;
use serde_json::{Value, json};

/// Fill unset fields of a `kind` document with the control plane's defaults.
pub fn fill_defaults(kind: &str, doc: &mut NativeObject) {
    match kind {
        VaultCluster::NAME => {
            fill(doc, &["defaultLeaseTTL"], json!("768h"));
            fill(doc, &["maxLeaseTTL"], json!("768h"));
            fill(doc, &["tcpListener", "address"], json!("127.0.0.1:8200"));
            fill(doc, &["tcpListener", "clusterAddress"], json!("127.0.0.1:8201"));
        }
        ConsulCluster::NAME => {
            for field in ["dns", "http", "https", "grpc"] {
                fill(doc, &["addresses", field], json!("127.0.0.1"));
            }
            let ports = [
                ("dns", 8600),
                ("http", 8500),
                ("https", 8501),
                ("grpc", 8502),
                ("serfLan", 8301),
                ("serfWan", 8302),
                ("server", 8300),
            ];
            for (field, port) in ports {
                fill(doc, &["ports", field], json!(port));
            }
        }
        NomadCluster::NAME => {
            fill(doc, &["ports", "http"], json!(4646));
            fill(doc, &["ports", "rpc"], json!(4647));
            fill(doc, &["ports", "serf"], json!(4648));
            fill(doc, &["server", "serverJoin", "retryJoin"], json!([]));
            fill(doc, &["server", "serverJoin", "startJoin"], json!([]));
            fill(doc, &["server", "serverJoin", "retryInterval"], json!("30s"));
        }
        TerraformWorkspace::NAME => {
            fill(doc, &["allowDestroyPlan"], json!(true));
            fill(doc, &["executionMode"], json!("remote"));
            fill(doc, &["fileTriggersEnabled"], json!(true));
            fill(doc, &["speculativeEnabled"], json!(true));
            fill(doc, &["terraformVersion"], json!("0.13.5"));
            fill(doc, &["triggerPrefixes"], json!([]));
            fill(doc, &["workingDirectory"], json!(""));
            fill(doc, &["vcsRepo", "branch"], json!("main"));
        }
        StaticIp::NAME => {
            fill(doc, &["ip"], json!(StaticIp::ADDRESS));
        }
        _ => {}
    }
}

/// Set the field at `path` unless it already holds a value, creating
/// intermediate objects as needed.
fn fill(doc: &mut NativeObject, path: &[&str], value: Value) {
    let Some((field, parents)) = path.split_last() else {
        return;
    };

    let mut target = doc;
    for key in parents {
        let entry = target.entry(*key).or_insert(Value::Null);
        if entry.is_null() {
            *entry = Value::Object(NativeObject::new());
        }
        match entry {
            Value::Object(next) => target = next,
            _ => return,
        }
    }

    match target.get(*field) {
        None | Some(Value::Null) => {
            target.insert((*field).to_string(), value);
        }
        Some(_) => {}
    }
}

//! Desired configuration loaded from `resources.toml`
//!
//! Each resource instance is a table named after its address:
//!
//! ```toml
//! [vault_cluster.primary]
//! name = "primary"
//! region = "us-va-1"
//!
//! [vault_cluster.primary.tcp_listener]
//! address = "0.0.0.0:8200"
//! ```

use anyhow::{Context, Result, bail};
use declarative::{AttributeValue, Attributes, ResourceAddress};
use serde_json::Number;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Desired attributes per resource address
#[derive(Debug, Default)]
pub struct DesiredConfig {
    resources: BTreeMap<ResourceAddress, Attributes>,
}

impl DesiredConfig {
    /// Load the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!(
                "No configuration at {} (create it or pass --config)",
                path.display()
            );
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::debug!(
            "Loaded {} resources from {}",
            config.resources.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(content)?;
        let mut resources = BTreeMap::new();

        for (kind, instances) in table {
            let toml::Value::Table(instances) = instances else {
                bail!("[{kind}] must be a table of named resources");
            };
            for (name, body) in instances {
                let address = format!("{kind}.{name}")
                    .parse::<ResourceAddress>()
                    .with_context(|| format!("Invalid resource name {name:?} in [{kind}]"))?;
                let toml::Value::Table(body) = body else {
                    bail!("[{address}] must be a table");
                };
                let attributes = body
                    .into_iter()
                    .map(|(key, value)| {
                        let path = format!("{address}.{key}");
                        Ok((key, to_attribute(value, &path)?))
                    })
                    .collect::<Result<Attributes>>()?;
                resources.insert(address, attributes);
            }
        }

        Ok(Self { resources })
    }

    pub fn get(&self, address: &ResourceAddress) -> Option<&Attributes> {
        self.resources.get(address)
    }

    pub fn addresses(&self) -> impl Iterator<Item = &ResourceAddress> {
        self.resources.keys()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Convert a TOML value into an attribute value.
fn to_attribute(value: toml::Value, path: &str) -> Result<AttributeValue> {
    Ok(match value {
        toml::Value::String(s) => AttributeValue::string(s),
        toml::Value::Boolean(b) => AttributeValue::bool(b),
        toml::Value::Integer(i) => AttributeValue::number(i),
        toml::Value::Float(f) => match Number::from_f64(f) {
            Some(n) => AttributeValue::number(n),
            None => bail!("{path}: {f} is not a finite number"),
        },
        toml::Value::Datetime(dt) => AttributeValue::string(dt.to_string()),
        toml::Value::Array(items) => AttributeValue::List(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| to_attribute(item, &format!("{path}[{i}]")))
                .collect::<Result<_>>()?,
        ),
        toml::Value::Table(table) => AttributeValue::Object(
            table
                .into_iter()
                .map(|(key, value)| {
                    let child = format!("{path}.{key}");
                    Ok((key, to_attribute(value, &child)?))
                })
                .collect::<Result<_>>()?,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_resources() {
        let config = DesiredConfig::parse(
            r#"
[vault_cluster.primary]
name = "primary"
region = "us-va-1"

[vault_cluster.primary.tcp_listener]
address = "0.0.0.0:8200"

[nomad_cluster.jobs]
name = "jobs"
datacenter = "dc1"
server = { server_join = { retry_join = ["a", "b"], retry_max = 3 } }
"#,
        )
        .unwrap();

        assert_eq!(config.len(), 2);

        let vault = config
            .get(&ResourceAddress::new("vault_cluster", "primary"))
            .unwrap();
        assert_eq!(vault["region"], AttributeValue::from("us-va-1"));
        assert_eq!(
            vault["tcp_listener"].get("address"),
            Some(&AttributeValue::from("0.0.0.0:8200"))
        );

        let nomad = config
            .get(&ResourceAddress::new("nomad_cluster", "jobs"))
            .unwrap();
        let join = nomad["server"].get("server_join").unwrap();
        assert_eq!(
            join.get("retry_join"),
            Some(&AttributeValue::List(vec![
                AttributeValue::from("a"),
                AttributeValue::from("b"),
            ]))
        );
        assert_eq!(join.get("retry_max"), Some(&AttributeValue::number(3_i64)));
    }

    #[test]
    fn test_addresses_are_sorted() {
        let config = DesiredConfig::parse(
            r#"
[vault_cluster.b]
name = "b"

[consul_cluster.a]
name = "a"
"#,
        )
        .unwrap();

        let addresses: Vec<String> = config.addresses().map(ToString::to_string).collect();
        assert_eq!(addresses, vec!["consul_cluster.a", "vault_cluster.b"]);
    }

    #[test]
    fn test_rejects_malformed_layout() {
        assert!(DesiredConfig::parse("vault_cluster = 1").is_err());
        assert!(DesiredConfig::parse("[vault_cluster]\nprimary = 1").is_err());
        assert!(DesiredConfig::parse("[vault_cluster.primary\n").is_err());
    }

    #[test]
    fn test_rejects_unaddressable_names() {
        let err = DesiredConfig::parse("[consul_cluster.\"a.b\"]\nname = \"x\"").unwrap_err();
        assert!(err.to_string().contains("Invalid resource name"));

        assert!(DesiredConfig::parse("[consul_cluster.\"\"]\nname = \"x\"").is_err());
        assert!(DesiredConfig::parse("[\"\".mesh]\nname = \"x\"").is_err());
    }

    #[test]
    fn test_empty_config() {
        assert!(DesiredConfig::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = DesiredConfig::load(&dir.path().join("resources.toml")).unwrap_err();
        assert!(err.to_string().contains("No configuration"));
    }

    #[test]
    fn test_load_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("resources.toml");
        fs::write(&path, "[consul_cluster.mesh]\nname = \"mesh\"\n").unwrap();

        let config = DesiredConfig::load(&path).unwrap();
        assert!(
            config
                .get(&ResourceAddress::new("consul_cluster", "mesh"))
                .is_some()
        );
    }
}

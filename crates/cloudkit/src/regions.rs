//! Regions and the products each one offers

/// Products available in a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Products {
    pub vault: bool,
    pub consul: bool,
    pub nomad: bool,
    pub terraform: bool,
}

/// A region clusters can be placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub id: &'static str,
    pub products: Products,
}

const US: [&str; 2] = ["us-va-1", "us-va-2"];
const EXTENDED: [&str; 6] = ["us-or-1", "us-or-2", "gb-lon-1", "gb-lon-2", "jp-tok-1", "jp-tok-2"];

/// All regions, with product availability for the given caller.
///
/// Authenticated callers see Vault in every region and Nomad and
/// Terraform in the primary ones.
pub fn regions(authenticated: bool) -> Vec<Region> {
    let primary = US.into_iter().map(|id| Region {
        id,
        products: Products {
            vault: true,
            consul: true,
            nomad: authenticated,
            terraform: authenticated,
        },
    });
    let extended = EXTENDED.into_iter().map(|id| Region {
        id,
        products: Products {
            vault: authenticated,
            consul: true,
            nomad: false,
            terraform: false,
        },
    });
    primary.chain(extended).collect()
}

/// Look up a region by id.
pub fn find(id: &str, authenticated: bool) -> Option<Region> {
    regions(authenticated).into_iter().find(|r| r.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vault_availability() {
        assert!(find("us-va-1", false).unwrap().products.vault);
        assert!(!find("us-or-1", false).unwrap().products.vault);
        assert!(find("us-or-1", true).unwrap().products.vault);
        assert!(find("eu-west-1", true).is_none());
    }

    #[test]
    fn test_consul_everywhere() {
        assert!(regions(false).iter().all(|r| r.products.consul));
        assert_eq!(regions(false).len(), 8);
    }
}

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ballistics::Trajectory;
use crate::error::EquipmentError;

/// Fixed charge subsets per trajectory.
///
/// `None` means "discover from the table directory"; `Some(vec![])` means the
/// weapon does not fire that trajectory at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<Vec<u32>>,
}

impl ChargeOverride {
    pub fn get(&self, trajectory: Trajectory) -> Option<&[u32]> {
        match trajectory {
            Trajectory::Low => self.low.as_deref(),
            Trajectory::High => self.high.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub name: String,
    /// File name prefix and table subdirectory. Defaults to `name`.
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub charges_override: ChargeOverride,
}

impl Equipment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: None,
            display_name: None,
            charges_override: ChargeOverride::default(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_override(mut self, trajectory: Trajectory, charges: Vec<u32>) -> Self {
        match trajectory {
            Trajectory::Low => self.charges_override.low = Some(charges),
            Trajectory::High => self.charges_override.high = Some(charges),
        }
        self
    }

    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(&self.name)
    }

    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// Static lookup of weapon configuration, injected into the table store.
#[derive(Debug, Clone, Default)]
pub struct EquipmentRegistry {
    equipment: BTreeMap<String, Equipment>,
}

impl EquipmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The weapons shipped with the application.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for equipment in [
            Equipment::new("M109A6"),
            Equipment::new("M1129")
                .with_override(Trajectory::Low, vec![])
                .with_override(Trajectory::High, vec![0, 1, 2]),
            Equipment::new("M119"),
            Equipment::new("RM-70").with_prefix("RM70"),
            Equipment::new("siala"),
        ] {
            registry.equipment.insert(equipment.name.clone(), equipment);
        }
        registry
    }

    pub fn from_equipment<I>(items: I) -> Result<Self, EquipmentError>
    where
        I: IntoIterator<Item = Equipment>,
    {
        let mut registry = Self::new();
        for equipment in items {
            registry.register(equipment)?;
        }
        Ok(registry)
    }

    /// Loads a JSON array of equipment definitions.
    pub fn from_json_file(path: &Path) -> Result<Self, EquipmentError> {
        let file = std::fs::File::open(path).map_err(|source| EquipmentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = std::io::BufReader::new(file);
        let items: Vec<Equipment> =
            serde_json::from_reader(reader).map_err(|source| EquipmentError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_equipment(items)
    }

    pub fn register(&mut self, equipment: Equipment) -> Result<(), EquipmentError> {
        if self.equipment.contains_key(&equipment.name) {
            return Err(EquipmentError::Duplicate { name: equipment.name });
        }
        self.equipment.insert(equipment.name.clone(), equipment);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Equipment> {
        self.equipment.get(name)
    }

    /// Registered weapon names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.equipment.keys().map(String::as_str)
    }

    pub fn prefix_for<'a>(&'a self, weapon: &'a str) -> &'a str {
        self.get(weapon).map_or(weapon, Equipment::prefix)
    }

    pub fn charges_override(&self, weapon: &str, trajectory: Trajectory) -> Option<&[u32]> {
        self.get(weapon)?.charges_override.get(trajectory)
    }
}

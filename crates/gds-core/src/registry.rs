//! Module registry: logical ECU names to request/response CAN ids
//!
//! Addresses are vehicle specific, so the table is configuration. The
//! built-in default covers the Ford modules this tool was developed against.

use std::collections::{BTreeMap, HashSet};

use thiserror::Error;

use crate::bus::MAX_STANDARD_ID;
use crate::config::ModuleConfig;

/// Request/response addressing for one ECU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleAddress {
    pub name: String,
    /// Tester -> ECU
    pub request_id: u16,
    /// ECU -> tester
    pub response_id: u16,
}

impl ModuleAddress {
    pub fn new(name: impl Into<String>, request_id: u16, response_id: u16) -> Self {
        Self {
            name: name.into(),
            request_id,
            response_id,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown module: {0}")]
    UnknownModule(String),

    #[error("Duplicate module name: {0}")]
    DuplicateName(String),

    #[error("Module {name}: CAN ID 0x{id:X} is not an 11-bit identifier")]
    InvalidId { name: String, id: u16 },

    #[error("Module {0}: request and response IDs must differ")]
    SameRequestResponse(String),

    #[error("CAN ID 0x{id:03X} used by more than one module ({first} and {second})")]
    DuplicateId {
        id: u16,
        first: String,
        second: String,
    },

    #[error("Invalid CAN ID '{0}'")]
    Parse(String),
}

const DEFAULT_MODULES: &[(&str, u16, u16)] = &[
    ("PCM", 0x7E0, 0x7E8),
    ("BEM", 0x726, 0x72E),
    ("IC", 0x720, 0x728),
    ("HIM", 0x733, 0x73B),
    ("ACM", 0x727, 0x72F),
    ("ABS", 0x760, 0x768),
];

const DEFAULT_BROADCASTS: &[(u16, &str)] = &[
    (0x200, "PCM"),
    (0x207, "PCM"),
    (0x230, "PCM"),
    (0x427, "PCM"),
    (0x623, "PCM"),
    (0x640, "PCM"),
    (0x6F6, "PCM IMMO"),
    (0x403, "BEM"),
    (0x6F8, "BEM IMMO"),
    (0x307, "ACM"),
    (0x353, "HIM"),
    (0x437, "IC"),
    (0x500, "IC"),
    (0x553, "IC"),
];

/// Immutable lookup table of diagnostic addresses and broadcast labels
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    modules: Vec<ModuleAddress>,
    broadcasts: BTreeMap<u16, String>,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self {
            modules: DEFAULT_MODULES
                .iter()
                .map(|(name, req, resp)| ModuleAddress::new(*name, *req, *resp))
                .collect(),
            broadcasts: DEFAULT_BROADCASTS
                .iter()
                .map(|(id, label)| (*id, label.to_string()))
                .collect(),
        }
    }
}

impl ModuleRegistry {
    /// Build a registry, rejecting ambiguous or malformed addressing
    pub fn new(
        modules: Vec<ModuleAddress>,
        broadcasts: BTreeMap<u16, String>,
    ) -> Result<Self, RegistryError> {
        let mut names = HashSet::new();
        let mut request_ids: BTreeMap<u16, &str> = BTreeMap::new();
        let mut response_ids: BTreeMap<u16, &str> = BTreeMap::new();

        for module in &modules {
            if !names.insert(module.name.as_str()) {
                return Err(RegistryError::DuplicateName(module.name.clone()));
            }
            for id in [module.request_id, module.response_id] {
                if id > MAX_STANDARD_ID {
                    return Err(RegistryError::InvalidId {
                        name: module.name.clone(),
                        id,
                    });
                }
            }
            if module.request_id == module.response_id {
                return Err(RegistryError::SameRequestResponse(module.name.clone()));
            }
            for (id, seen) in [
                (module.request_id, &mut request_ids),
                (module.response_id, &mut response_ids),
            ] {
                if let Some(first) = seen.insert(id, module.name.as_str()) {
                    return Err(RegistryError::DuplicateId {
                        id,
                        first: first.to_string(),
                        second: module.name.clone(),
                    });
                }
            }
        }

        Ok(Self {
            modules,
            broadcasts,
        })
    }

    /// Build from configuration; an empty module list keeps the defaults
    pub fn from_config(
        modules: &[ModuleConfig],
        broadcasts: &BTreeMap<String, String>,
    ) -> Result<Self, RegistryError> {
        let defaults = Self::default();

        let modules = if modules.is_empty() {
            defaults.modules
        } else {
            modules
                .iter()
                .map(|m| {
                    Ok(ModuleAddress::new(
                        m.name.clone(),
                        parse_can_id(&m.request_id)?,
                        parse_can_id(&m.response_id)?,
                    ))
                })
                .collect::<Result<Vec<_>, RegistryError>>()?
        };

        let broadcasts = if broadcasts.is_empty() {
            defaults.broadcasts
        } else {
            broadcasts
                .iter()
                .map(|(id, label)| Ok((parse_can_id(id)?, label.clone())))
                .collect::<Result<BTreeMap<_, _>, RegistryError>>()?
        };

        Self::new(modules, broadcasts)
    }

    /// Look up a module by name
    pub fn resolve(&self, name: &str) -> Result<&ModuleAddress, RegistryError> {
        self.modules
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| RegistryError::UnknownModule(name.to_string()))
    }

    /// Label for unsolicited broadcast traffic
    pub fn classify_broadcast(&self, id: u16) -> Option<&str> {
        self.broadcasts.get(&id).map(String::as_str)
    }

    /// True if `id` is the request or response id of a registered module
    pub fn is_diagnostic_id(&self, id: u16) -> bool {
        self.modules
            .iter()
            .any(|m| m.request_id == id || m.response_id == id)
    }

    /// Module that owns `id` as its request or response id
    pub fn module_for_id(&self, id: u16) -> Option<&ModuleAddress> {
        self.modules
            .iter()
            .find(|m| m.request_id == id || m.response_id == id)
    }

    pub fn modules(&self) -> &[ModuleAddress] {
        &self.modules
    }
}

/// Parse a CAN ID from string (supports hex with 0x prefix)
pub fn parse_can_id(s: &str) -> Result<u16, RegistryError> {
    let s = s.trim();
    let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (s, 10),
    };

    u16::from_str_radix(digits, radix).map_err(|_| RegistryError::Parse(s.to_string()))
}

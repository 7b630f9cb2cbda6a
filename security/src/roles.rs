// security/src/roles.rs
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde::Deserialize;
use serde_yaml2 as serde_yaml;

use models::medical::Role;

pub const SUPERUSER: &str = "superuser";
pub const PATIENTS_READ: &str = "patients:read";
pub const PATIENTS_WRITE: &str = "patients:write";
pub const DASHBOARD_READ: &str = "dashboard:read";
pub const USERS_MANAGE: &str = "users:manage";

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RoleConfig {
    pub permissions: Vec<String>,
}

/// Role name (`admin`, `doctor`, `nurse`) to the permissions it grants.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RolesConfig {
    pub roles: HashMap<String, RoleConfig>,
}

impl RolesConfig {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read roles file: {}", path.display()))?;
        let config = Self::from_yaml_str(&content)
            .context(format!("Failed to parse roles file: {}", path.display()))?;
        info!("Loaded {} roles from {:?}", config.roles.len(), path);
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: RolesConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// The file at `path` when given, otherwise the built-in table.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_yaml_file(path),
            None => Ok(Self::builtin()),
        }
    }

    /// Admins can do anything; doctors read and write patients; nurses read.
    pub fn builtin() -> Self {
        let role = |perms: &[&str]| RoleConfig {
            permissions: perms.iter().map(|p| p.to_string()).collect(),
        };
        let roles = HashMap::from([
            (Role::Admin.as_str().to_string(), role(&[SUPERUSER])),
            (
                Role::Doctor.as_str().to_string(),
                role(&[PATIENTS_READ, PATIENTS_WRITE, DASHBOARD_READ]),
            ),
            (
                Role::Nurse.as_str().to_string(),
                role(&[PATIENTS_READ, DASHBOARD_READ]),
            ),
        ]);
        RolesConfig { roles }
    }

    pub fn get_role_config(&self, role: Role) -> Option<&RoleConfig> {
        self.roles.get(role.as_str())
    }

    pub fn has_permission(&self, role: Role, permission_name: &str) -> bool {
        self.get_role_config(role).is_some_and(|role_cfg| {
            role_cfg
                .permissions
                .iter()
                .any(|p| p == permission_name || p == SUPERUSER)
        })
    }
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

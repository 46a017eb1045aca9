//! Role → method allow-list catalog (§4.5 gate 5). Grounded directly on
//! `policy::rbac`'s `ROLE_ALLOWED_TOOLS` table and
//! `check_tool_authorized` shape.

/// Built-in roles recognized by the default catalog. A custom
/// `AuthProvider` may return any role string; roles absent from the
/// catalog are simply denied everything.
pub const ROLE_VIEWER: &str = "viewer";
pub const ROLE_OPERATOR: &str = "operator";
pub const ROLE_ADMIN: &str = "admin";

const VIEWER_METHODS: &[&str] = &[
    "get_camera_list",
    "get_camera_status",
    "get_stream_url",
    "get_stream_status",
    "list_recordings",
    "get_storage_info",
    "subscribe_events",
    "unsubscribe_events",
];

const OPERATOR_METHODS: &[&str] = &[
    "get_camera_list",
    "get_camera_status",
    "get_stream_url",
    "get_stream_status",
    "list_recordings",
    "get_storage_info",
    "subscribe_events",
    "unsubscribe_events",
    "take_snapshot",
    "start_recording",
    "stop_recording",
    "discover_external_streams",
];

const ADMIN_METHODS: &[&str] = &[
    "get_camera_list",
    "get_camera_status",
    "get_stream_url",
    "get_stream_status",
    "list_recordings",
    "get_storage_info",
    "subscribe_events",
    "unsubscribe_events",
    "take_snapshot",
    "start_recording",
    "stop_recording",
    "discover_external_streams",
    "set_retention_policy",
    "cleanup_storage",
    "add_external_stream",
    "remove_external_stream",
];

pub struct PermissionCatalog {
    table: Vec<(&'static str, &'static [&'static str])>,
}

impl PermissionCatalog {
    pub fn default_catalog() -> Self {
        Self {
            table: vec![
                (ROLE_VIEWER, VIEWER_METHODS),
                (ROLE_OPERATOR, OPERATOR_METHODS),
                (ROLE_ADMIN, ADMIN_METHODS),
            ],
        }
    }

    pub fn is_allowed(&self, role: Option<&str>, method: &str) -> bool {
        let Some(role) = role else {
            return false;
        };
        self.table
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, methods)| methods.contains(&method))
            .unwrap_or(false)
    }
}

impl Default for PermissionCatalog {
    fn default() -> Self {
        Self::default_catalog()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_cannot_start_recording() {
        let catalog = PermissionCatalog::default_catalog();
        assert!(!catalog.is_allowed(Some(ROLE_VIEWER), "start_recording"));
    }

    #[test]
    fn admin_can_everything_operator_can() {
        let catalog = PermissionCatalog::default_catalog();
        for method in OPERATOR_METHODS {
            assert!(catalog.is_allowed(Some(ROLE_ADMIN), method));
        }
    }

    #[test]
    fn unauthenticated_role_denied() {
        let catalog = PermissionCatalog::default_catalog();
        assert!(!catalog.is_allowed(None, "get_camera_list"));
    }

    #[test]
    fn unknown_role_denied() {
        let catalog = PermissionCatalog::default_catalog();
        assert!(!catalog.is_allowed(Some("guest"), "get_camera_list"));
    }
}

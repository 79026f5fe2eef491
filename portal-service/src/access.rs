//! Role capabilities and navigation.
//!
//! Authentication itself is handled by the backend's auth service; this
//! module only interprets the role it reports.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// No session.
    Anonymous,
    /// Signed in without a staff role.
    Member,
    OfficeStaff,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    BrowsePublic,
    SignIn,
    SignOut,
    ViewAdminDashboard,
    ManageClients,
    EditReadings,
    ViewReports,
    ExportReadings,
}

const PUBLIC: &[Capability] = &[Capability::BrowsePublic, Capability::SignIn];
const MEMBER: &[Capability] = &[Capability::BrowsePublic, Capability::SignOut];
const STAFF: &[Capability] = &[
    Capability::BrowsePublic,
    Capability::SignOut,
    Capability::ViewAdminDashboard,
    Capability::ManageClients,
    Capability::EditReadings,
    Capability::ViewReports,
    Capability::ExportReadings,
];

impl Role {
    /// Interpret the role string stored in the user's auth metadata.
    pub fn from_metadata(role: Option<&str>) -> Self {
        match role.map(str::trim) {
            None | Some("") => Role::Anonymous,
            Some("office_staff") => Role::OfficeStaff,
            Some("admin") => Role::Admin,
            Some(_) => Role::Member,
        }
    }

    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            Role::Anonymous => PUBLIC,
            Role::Member => MEMBER,
            Role::OfficeStaff | Role::Admin => STAFF,
        }
    }

    pub fn can(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub name: &'static str,
    pub path: &'static str,
    pub requires: Capability,
}

pub const NAV_ITEMS: &[NavItem] = &[
    NavItem { name: "Home", path: "/", requires: Capability::BrowsePublic },
    NavItem { name: "Clientes", path: "/clientes", requires: Capability::BrowsePublic },
    NavItem { name: "Dashboard", path: "/admin/dashboard", requires: Capability::ViewAdminDashboard },
    NavItem { name: "Gestión Clientes", path: "/admin/clientes", requires: Capability::ManageClients },
    NavItem { name: "Informes", path: "/admin/informes", requires: Capability::ViewReports },
    NavItem { name: "Login", path: "/login", requires: Capability::SignIn },
    NavItem { name: "Cerrar Sesión", path: "/logout", requires: Capability::SignOut },
];

pub fn nav_items(role: Role) -> Vec<NavItem> {
    NAV_ITEMS.iter().copied().filter(|item| role.can(item.requires)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavBackground {
    Translucent,
    Primary,
    PrimaryDark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavTheme {
    pub background: NavBackground,
    pub elevation: u8,
}

fn is_admin_route(path: &str) -> bool {
    path == "/admin" || path.starts_with("/admin/")
}

/// Navigation bar styling for the current route and role.
pub fn nav_theme(path: &str, role: Role) -> NavTheme {
    if path == "/" {
        return NavTheme {
            background: NavBackground::Translucent,
            elevation: 0,
        };
    }

    let background = if is_admin_route(path) && role.can(Capability::ViewAdminDashboard) {
        NavBackground::PrimaryDark
    } else {
        NavBackground::Primary
    };
    NavTheme {
        background,
        elevation: 4,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteDecision {
    Allow,
    RedirectToLogin,
    RedirectHome,
}

/// Whether `role` may open `path`. Admin routes need a session with a
/// staff role.
pub fn route_decision(path: &str, role: Role) -> RouteDecision {
    if !is_admin_route(path) {
        return RouteDecision::Allow;
    }
    match role {
        Role::Anonymous => RouteDecision::RedirectToLogin,
        r if r.can(Capability::ViewAdminDashboard) => RouteDecision::Allow,
        _ => RouteDecision::RedirectHome,
    }
}

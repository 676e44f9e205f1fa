//! Role dispatch table: the single source of truth for which panels are
//! visible and which loaders run for a resolved identity.

use crate::models::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Panel {
    AuthForms,
    Client,
    Admin,
    SuperAdmin,
}

impl Panel {
    pub const ALL: [Self; 4] = [Self::AuthForms, Self::Client, Self::Admin, Self::SuperAdmin];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthForms => "auth-forms",
            Self::Client => "client-panel",
            Self::Admin => "admin-panel",
            Self::SuperAdmin => "super-admin-panel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoaderKind {
    Public,
    Client,
    Admin,
    SuperAdmin,
}

impl LoaderKind {
    pub const ALL: [Self; 4] = [Self::Public, Self::Client, Self::Admin, Self::SuperAdmin];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Client => "client",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// Panel whose visibility gates this loader; public content is ungated.
    #[must_use]
    pub fn panel(self) -> Option<Panel> {
        match self {
            Self::Public => None,
            Self::Client => Some(Panel::Client),
            Self::Admin => Some(Panel::Admin),
            Self::SuperAdmin => Some(Panel::SuperAdmin),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PanelVisibility {
    pub auth_forms: bool,
    pub client: bool,
    pub admin: bool,
    pub super_admin: bool,
}

impl PanelVisibility {
    #[must_use]
    pub fn is_visible(&self, panel: Panel) -> bool {
        match panel {
            Panel::AuthForms => self.auth_forms,
            Panel::Client => self.client,
            Panel::Admin => self.admin,
            Panel::SuperAdmin => self.super_admin,
        }
    }

    #[must_use]
    pub fn visible(&self) -> Vec<Panel> {
        Panel::ALL
            .into_iter()
            .filter(|panel| self.is_visible(*panel))
            .collect()
    }

    #[must_use]
    pub fn hidden(&self) -> Vec<Panel> {
        Panel::ALL
            .into_iter()
            .filter(|panel| !self.is_visible(*panel))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DispatchPlan {
    pub role: Option<Role>,
    pub panels: PanelVisibility,
    /// Session-gated loaders. The public loader is never listed here; it
    /// runs regardless of session state.
    pub loaders: Vec<LoaderKind>,
}

impl DispatchPlan {
    #[must_use]
    pub fn runs(&self, loader: LoaderKind) -> bool {
        loader == LoaderKind::Public || self.loaders.contains(&loader)
    }
}

#[must_use]
pub fn dispatch(role: Option<Role>) -> DispatchPlan {
    let (panels, loaders) = match role {
        None => (
            PanelVisibility {
                auth_forms: true,
                ..PanelVisibility::default()
            },
            Vec::new(),
        ),
        Some(Role::Client) => (
            PanelVisibility {
                client: true,
                ..PanelVisibility::default()
            },
            vec![LoaderKind::Client],
        ),
        Some(Role::Admin) => (
            PanelVisibility {
                admin: true,
                ..PanelVisibility::default()
            },
            vec![LoaderKind::Admin],
        ),
        Some(Role::SuperAdmin) => (
            PanelVisibility {
                admin: true,
                super_admin: true,
                ..PanelVisibility::default()
            },
            vec![LoaderKind::Admin, LoaderKind::SuperAdmin],
        ),
    };
    DispatchPlan {
        role,
        panels,
        loaders,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLES: [Option<Role>; 4] = [
        None,
        Some(Role::Client),
        Some(Role::Admin),
        Some(Role::SuperAdmin),
    ];

    #[test]
    fn dispatch_is_pure() {
        for role in ROLES {
            assert_eq!(dispatch(role), dispatch(role));
        }
    }

    #[test]
    fn anonymous_sees_auth_forms_only() {
        let plan = dispatch(None);
        assert_eq!(plan.panels.visible(), vec![Panel::AuthForms]);
        assert!(plan.loaders.is_empty());
        assert!(plan.runs(LoaderKind::Public));
    }

    #[test]
    fn client_sees_client_panel() {
        let plan = dispatch(Some(Role::Client));
        assert_eq!(plan.panels.visible(), vec![Panel::Client]);
        assert_eq!(plan.loaders, vec![LoaderKind::Client]);
    }

    #[test]
    fn admin_hides_client_panel() {
        let plan = dispatch(Some(Role::Admin));
        assert_eq!(plan.panels.visible(), vec![Panel::Admin]);
        assert!(!plan.panels.is_visible(Panel::Client));
        assert_eq!(plan.loaders, vec![LoaderKind::Admin]);
    }

    #[test]
    fn super_admin_runs_admin_and_analytics_loaders() {
        let plan = dispatch(Some(Role::SuperAdmin));
        assert_eq!(plan.panels.visible(), vec![Panel::Admin, Panel::SuperAdmin]);
        assert_eq!(
            plan.loaders,
            vec![LoaderKind::Admin, LoaderKind::SuperAdmin]
        );
        assert!(!plan.runs(LoaderKind::Client));
    }

    #[test]
    fn every_gated_loader_maps_to_a_visible_panel() {
        for role in ROLES {
            let plan = dispatch(role);
            for loader in &plan.loaders {
                let panel = loader.panel().expect("gated loader has a panel");
                assert!(plan.panels.is_visible(panel));
            }
        }
    }
}

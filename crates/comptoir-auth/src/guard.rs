//! Route guard: role-based navigation decisions.
//!
//! A client-side guard observing an authenticated session compares the
//! principal's role against a page's required role. A mismatch never
//! lands on an error page — it redirects to the role's own default
//! landing area, which is derivable from the role alone.

use comptoir_core::Role;

use crate::session::SessionState;

/// Default landing areas, one per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandingArea {
    /// Platform-wide console (Superadmin).
    PlatformConsole,
    /// Company management console (Directeur).
    CompanyConsole,
    /// Day-to-day operational app (everyone else).
    OperationalApp,
}

/// The landing area a role is redirected to by default.
pub fn landing_area(role: Role) -> LandingArea {
    match role {
        Role::Superadmin => LandingArea::PlatformConsole,
        Role::Directeur => LandingArea::CompanyConsole,
        Role::Gerant | Role::Vendeur | Role::Magasinier => LandingArea::OperationalApp,
    }
}

/// Outcome of a guard check for one navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    /// Wrong role for this page: go to the principal's own area.
    Redirect(LandingArea),
    /// No authenticated session: go to login.
    RequireLogin,
}

/// Decide a navigation for an observer in `state` holding `role`
/// against a page requiring `required`.
pub fn check_route(state: SessionState, role: Option<Role>, required: Role) -> GuardDecision {
    if state.observed() != SessionState::Authenticated {
        return GuardDecision::RequireLogin;
    }
    match role {
        Some(role) if role == required => GuardDecision::Proceed,
        Some(role) => GuardDecision::Redirect(landing_area(role)),
        None => GuardDecision::RequireLogin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landing_areas_are_role_derived() {
        assert_eq!(landing_area(Role::Superadmin), LandingArea::PlatformConsole);
        assert_eq!(landing_area(Role::Directeur), LandingArea::CompanyConsole);
        assert_eq!(landing_area(Role::Gerant), LandingArea::OperationalApp);
        assert_eq!(landing_area(Role::Vendeur), LandingArea::OperationalApp);
        assert_eq!(landing_area(Role::Magasinier), LandingArea::OperationalApp);
    }

    #[test]
    fn matching_role_proceeds() {
        let decision = check_route(
            SessionState::Authenticated,
            Some(Role::Directeur),
            Role::Directeur,
        );
        assert_eq!(decision, GuardDecision::Proceed);
    }

    #[test]
    fn mismatch_redirects_to_own_area() {
        let decision = check_route(
            SessionState::Authenticated,
            Some(Role::Vendeur),
            Role::Directeur,
        );
        assert_eq!(decision, GuardDecision::Redirect(LandingArea::OperationalApp));
    }

    #[test]
    fn unauthenticated_requires_login() {
        for state in [
            SessionState::Anonymous,
            SessionState::SessionExpired,
            SessionState::TwoFactorRequired,
        ] {
            assert_eq!(
                check_route(state, Some(Role::Vendeur), Role::Vendeur),
                GuardDecision::RequireLogin
            );
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Role of the calling identity, resolved by the authorization collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Zzp,
    Accountant,
    Admin,
    System,
}

/// Identity handed to the core by the collaborator layer. The core never
/// queries identity tables itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: i32,
    pub role: Role,
    pub tenant_assignments: Vec<i32>,
}

impl UserIdentity {
    pub fn system() -> Self {
        Self {
            user_id: 0,
            role: Role::System,
            tenant_assignments: Vec::new(),
        }
    }

    fn may_access(&self, tenant_id: i32) -> bool {
        matches!(self.role, Role::Admin | Role::System)
            || self.tenant_assignments.contains(&tenant_id)
    }
}

/// Per-request context threaded into every service operation.
///
/// Construction enforces the tenant assignment check once, at the boundary;
/// services then trust `tenant_id` and scope every query with it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub tenant_id: i32,
    pub user: UserIdentity,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn new(tenant_id: i32, user: UserIdentity) -> CoreResult<Self> {
        if !user.may_access(tenant_id) {
            return Err(CoreError::UnauthorizedTenant { tenant_id });
        }
        Ok(Self {
            tenant_id,
            user,
            ip_address: None,
            user_agent: None,
        })
    }

    pub fn with_client_info(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    pub fn user_id(&self) -> i32 {
        self.user.user_id
    }

    /// Guard for operations that receive entity rows from the caller:
    /// a row belonging to another tenant is a program error upstream.
    pub fn ensure_tenant(&self, tenant_id: i32) -> CoreResult<()> {
        if tenant_id != self.tenant_id {
            return Err(CoreError::UnauthorizedTenant { tenant_id });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accountant(assignments: Vec<i32>) -> UserIdentity {
        UserIdentity {
            user_id: 12,
            role: Role::Accountant,
            tenant_assignments: assignments,
        }
    }

    #[test]
    fn assigned_accountant_gets_context() {
        let ctx = RequestContext::new(3, accountant(vec![1, 3])).unwrap();
        assert_eq!(ctx.tenant_id, 3);
        assert!(ctx.ensure_tenant(3).is_ok());
    }

    #[test]
    fn unassigned_tenant_is_rejected() {
        let err = RequestContext::new(9, accountant(vec![1, 3])).unwrap_err();
        assert_eq!(err.kind(), "UNAUTHORIZED_TENANT");
    }

    #[test]
    fn cross_tenant_row_is_rejected() {
        let ctx = RequestContext::new(1, accountant(vec![1])).unwrap();
        assert_eq!(ctx.ensure_tenant(2).unwrap_err().kind(), "UNAUTHORIZED_TENANT");
    }

    #[test]
    fn system_identity_reaches_any_tenant() {
        let ctx = RequestContext::new(42, UserIdentity::system()).unwrap();
        assert_eq!(ctx.user_id(), 0);
    }
}

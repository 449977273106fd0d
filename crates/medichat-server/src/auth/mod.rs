//! Caller authentication and role lookup

mod bearer;
mod identity;
mod roles;

pub use bearer::extract_bearer;
pub use identity::{
    CallerIdentity, IdentityError, IdentityResolver, JwtIdentityResolver, RemoteIdentityResolver,
};
pub use roles::{RestRoleStore, RoleSet, RoleStore, RoleStoreError, StaticRoleStore};

/// Who is calling and what they may do. Resolved once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub caller: CallerIdentity,
    pub roles: RoleSet,
}

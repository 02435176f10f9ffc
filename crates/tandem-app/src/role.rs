//! Deciding which peer is the authority.
//!
//! An explicit flag always wins. Without one, the peer whose own addresses
//! include the configured rendezvous address is the authority and the other
//! is the replica. Nothing here detects two peers that both resolve to the
//! same role; such a pair never completes the connection handshake (two
//! listeners) or never finds a listener (two connectors).

use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;

use tandem_physics::Side;

/// A peer's role for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Owns the ball and listens for the peer.
    Authority,
    /// Mirrors the authority's state and connects to it.
    Replica,
}

impl Role {
    /// `true` maps to [`Role::Authority`].
    pub fn from_flag(is_authority: bool) -> Self {
        if is_authority {
            Self::Authority
        } else {
            Self::Replica
        }
    }

    /// The role the other peer must have.
    pub fn peer(self) -> Self {
        match self {
            Self::Authority => Self::Replica,
            Self::Replica => Self::Authority,
        }
    }

    /// The paddle this role controls: the authority plays on the right.
    pub fn side(self) -> Side {
        match self {
            Self::Authority => Side::Right,
            Self::Replica => Side::Left,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authority => f.write_str("authority"),
            Self::Replica => f.write_str("replica"),
        }
    }
}

/// Errors from role resolution.
#[derive(Debug, thiserror::Error)]
pub enum RoleError {
    /// Neither an explicit role nor a rendezvous address was configured.
    #[error("no role given and no rendezvous address to infer one from")]
    Unresolvable,

    /// A configured address did not parse.
    #[error("invalid address {0:?}")]
    InvalidAddress(String),
}

/// The set of addresses that belong to this host.
pub trait LocalAddresses: Send + Sync {
    fn contains(&self, addr: IpAddr) -> bool;
}

impl LocalAddresses for HashSet<IpAddr> {
    fn contains(&self, addr: IpAddr) -> bool {
        HashSet::contains(self, &addr)
    }
}

/// Asks the operating system: an address is local if a socket can bind to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct BindProbe;

impl LocalAddresses for BindProbe {
    fn contains(&self, addr: IpAddr) -> bool {
        tandem_net::is_local_address(addr)
    }
}

/// A way of deciding the local role, fixed at session creation.
pub trait RoleStrategy: Send + Sync {
    fn resolve(&self) -> Result<Role, RoleError>;
}

/// The caller already knows the role.
#[derive(Debug, Clone, Copy)]
pub struct ExplicitRole(pub Role);

impl RoleStrategy for ExplicitRole {
    fn resolve(&self) -> Result<Role, RoleError> {
        Ok(self.0)
    }
}

/// Authority if and only if the rendezvous address is one of ours.
pub struct AddressMembership<L> {
    local: L,
    rendezvous: IpAddr,
}

impl<L: LocalAddresses> AddressMembership<L> {
    pub fn new(local: L, rendezvous: IpAddr) -> Self {
        Self { local, rendezvous }
    }
}

impl<L: LocalAddresses> RoleStrategy for AddressMembership<L> {
    fn resolve(&self) -> Result<Role, RoleError> {
        Ok(Role::from_flag(self.local.contains(self.rendezvous)))
    }
}

/// The strategy for an optional explicit flag: the flag if given, else
/// membership of `rendezvous` in `local`.
pub fn select_strategy<L: LocalAddresses + 'static>(
    local: L,
    explicit: Option<bool>,
    rendezvous: Option<IpAddr>,
) -> Result<Box<dyn RoleStrategy>, RoleError> {
    match (explicit, rendezvous) {
        (Some(is_authority), _) => Ok(Box::new(ExplicitRole(Role::from_flag(is_authority)))),
        (None, Some(rendezvous)) => Ok(Box::new(AddressMembership::new(local, rendezvous))),
        (None, None) => Err(RoleError::Unresolvable),
    }
}

/// Run a strategy and log the outcome.
pub fn resolve_with(strategy: &dyn RoleStrategy) -> Result<Role, RoleError> {
    let role = strategy.resolve()?;
    tracing::info!("resolved role: {role}");
    Ok(role)
}

/// Resolve the role from an optional explicit flag, falling back to address
/// membership of `rendezvous` in `local`.
pub fn resolve_role<L: LocalAddresses + 'static>(
    local: L,
    explicit: Option<bool>,
    rendezvous: Option<IpAddr>,
) -> Result<Role, RoleError> {
    resolve_with(select_strategy(local, explicit, rendezvous)?.as_ref())
}

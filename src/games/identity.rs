use crate::games::types::PlayerIdentity;
use crate::submission::address::Address;

/// Supplies the verified player for the current context.
///
/// Login and wallet flows live outside this crate; the engine only asks
/// whether there is a confirmed address.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self) -> Option<PlayerIdentity>;
}

/// Resolver with a fixed answer, used by the terminal client and tests
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    identity: Option<PlayerIdentity>,
}

impl StaticIdentity {
    pub fn confirmed(address: Address) -> Self {
        Self {
            identity: Some(PlayerIdentity {
                address,
                confirmed: true,
                username: None,
            }),
        }
    }

    pub fn unconfirmed(address: Address) -> Self {
        Self {
            identity: Some(PlayerIdentity {
                address,
                confirmed: false,
                username: None,
            }),
        }
    }

    pub fn anonymous() -> Self {
        Self { identity: None }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        if let Some(identity) = self.identity.as_mut() {
            identity.username = Some(username.into());
        }
        self
    }
}

impl IdentityResolver for StaticIdentity {
    fn resolve(&self) -> Option<PlayerIdentity> {
        self.identity.clone()
    }
}

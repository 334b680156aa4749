//! Caller roles, as supplied by the authentication collaborator

/// Role of the user driving a visit screen
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Manager,
    Admin,
    OfficeManager,
    /// Any role without access to the visit list
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Manager => "MANAGER",
            Role::Admin => "ADMIN",
            Role::OfficeManager => "OFFICE MANAGER",
            Role::Other(name) => name,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = std::convert::Infallible;

    /// Accepts `OFFICE MANAGER`, `OFFICE_MANAGER` and `office-manager` alike
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['_', '-'], " ");
        Ok(match normalized.as_str() {
            "MANAGER" => Role::Manager,
            "ADMIN" => Role::Admin,
            "OFFICE MANAGER" => Role::OfficeManager,
            _ => Role::Other(s.trim().to_string()),
        })
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(role) => role,
            Err(never) => match never {},
        }
    }
}

/// Identity the engine needs from an authenticated caller
#[derive(Debug, Clone)]
pub struct Caller {
    /// Bearer token forwarded to the record API
    pub token: String,
    pub role: Role,
    pub team_id: Option<i64>,
}

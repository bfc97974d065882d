use serde::{Deserialize, Serialize};

use crate::domain::CompanyId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub company_id: CompanyId,
    pub name: String,
    /// Contacts can opt out of automated handling; a turn for such a contact
    /// ends before any side effect.
    pub bot_disabled: bool,
}

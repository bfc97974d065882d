pub mod contact;
pub mod message;
pub mod note;
pub mod queue;
pub mod tag;
pub mod ticket;
pub mod user;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CompanyId(pub i64);

// ── End-of-tournament credits ──

use serde::{Deserialize, Serialize};

use super::person::Person;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executive: Option<Person>,
    pub producers: Vec<Person>,
    pub players: Vec<Person>,
    pub archers_harmed: i64,
}

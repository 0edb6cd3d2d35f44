//! Embedded SQL migrations

pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

/// All embedded migrations, in application order
pub fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_instance_schema",
        sql: include_str!("../../migrations/001_instance_schema.sql"),
    }]
}

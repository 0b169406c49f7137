//! Benchmark utilities and helpers.

use bytes::Bytes;
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use scql_apdu::ScqlRequest;
use scql_common::config::{EngineConfig, Limits};
use scql_common::types::ObjectName;
use scql_engine::Database;

/// Name of the table created by [`populated_database`].
pub const TABLE: &str = "people";

/// Generates a random alphanumeric value.
pub fn random_string(rng: &mut StdRng, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generates random `(name, age)` records.
pub fn generate_people(count: usize) -> Vec<(String, String)> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|_| {
            let len = rng.gen_range(3..=12);
            let name = random_string(&mut rng, len);
            let age = rng.gen_range(18..80).to_string();
            (name, age)
        })
        .collect()
}

/// Returns an engine configuration that holds `rows` rows per table.
pub fn bench_config(rows: usize) -> EngineConfig {
    EngineConfig::with_limits(Limits {
        max_rows: rows.max(1),
        ..Limits::default()
    })
}

/// Creates a database with a `people(name, age)` table of `rows` rows.
pub fn populated_database(rows: usize) -> Database {
    let mut db = Database::new(bench_config(rows)).expect("valid bench config");
    db.create_table(TABLE, ["name", "age"])
        .expect("create bench table");
    for (name, age) in generate_people(rows) {
        db.insert(TABLE.as_bytes(), [name, age])
            .expect("insert bench row");
    }
    db
}

/// Builds the raw APDUs that create and fill the bench table.
pub fn setup_apdus(rows: usize) -> Vec<Bytes> {
    let create = ScqlRequest::CreateTable {
        name: ObjectName::from(TABLE),
        columns: vec![ObjectName::from("name"), ObjectName::from("age")],
    };

    std::iter::once(create)
        .chain(generate_people(rows).into_iter().map(|(name, age)| {
            ScqlRequest::Insert {
                table: ObjectName::from(TABLE),
                values: vec![Bytes::from(name), Bytes::from(age)],
            }
        }))
        .map(|request| request.to_apdu().expect("encodable request").to_bytes())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_people_is_deterministic() {
        assert_eq!(generate_people(10), generate_people(10));
        assert!(generate_people(50)
            .iter()
            .all(|(name, age)| name.len() <= 12 && age.len() == 2));
    }

    #[test]
    fn test_populated_database() {
        let db = populated_database(100);
        let table = db.catalog().find_table(TABLE.as_bytes()).unwrap();
        assert_eq!(db.catalog().table(table).unwrap().row_count(), 100);
    }

    #[test]
    fn test_setup_apdus() {
        assert_eq!(setup_apdus(5).len(), 6);
    }
}

//! Fixtures shared by the integration tests.

use bytes::Bytes;

use scql_apdu::{Command, ResponseApdu, ScqlApplet, ScqlRequest, StatusWord, TransactionOp};
use scql_common::error::{ScqlError, ScqlResult};
use scql_common::types::ObjectName;
use scql_engine::{Database, Filter};

/// Owned column values of one fetched row.
pub type Values = Vec<Vec<u8>>;

/// Converts string literals into object names.
pub fn names(values: &[&str]) -> Vec<ObjectName> {
    values.iter().map(|v| ObjectName::from(*v)).collect()
}

/// Creates a database with table `P(name, age)` holding three people.
pub fn people() -> ScqlResult<Database> {
    let mut db = Database::default();
    db.create_table("P", ["name", "age"])?;
    for (name, age) in [("ann", "30"), ("bob", "25"), ("cat", "41")] {
        db.insert(b"P", [name, age])?;
    }
    Ok(db)
}

/// Fetches rows with `fetch_next` until the end of the snapshot.
pub fn drain(db: &mut Database) -> ScqlResult<Vec<Values>> {
    let mut rows = Vec::new();
    loop {
        match db.fetch_next() {
            Ok(row) => rows.push(row.values()?.into_iter().map(<[u8]>::to_vec).collect()),
            Err(e) if e.is_end_of_table() => return Ok(rows),
            Err(e) => return Err(e),
        }
    }
}

/// Declares a cursor over `object` with the given filters, opens it and
/// drains it.
pub fn select(db: &mut Database, object: &str, filters: Vec<Filter>) -> ScqlResult<Vec<Values>> {
    db.declare_cursor(object.as_bytes(), Vec::<&str>::new(), filters)?;
    match db.open() {
        Ok(()) => drain(db),
        Err(ScqlError::EndOfTable) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Turns string literals into owned rows for comparisons.
pub fn rows(values: &[&[&str]]) -> Vec<Values> {
    values
        .iter()
        .map(|row| row.iter().map(|v| v.as_bytes().to_vec()).collect())
        .collect()
}

/// A card driven through encoded command APDUs.
#[derive(Debug, Default)]
pub struct Card {
    applet: ScqlApplet,
}

impl Card {
    /// Creates a card with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the applet.
    pub fn applet(&self) -> &ScqlApplet {
        &self.applet
    }

    /// Sends raw command bytes.
    pub fn send_raw(&mut self, bytes: &[u8]) -> ResponseApdu {
        self.applet.process(bytes)
    }

    /// Encodes and sends a command.
    pub fn send(&mut self, command: impl Into<Command>) -> ScqlResult<ResponseApdu> {
        let apdu = command.into().to_apdu()?;
        Ok(self.applet.process(&apdu.to_bytes()))
    }

    /// Sends a command and returns only its status word.
    pub fn status(&mut self, command: impl Into<Command>) -> ScqlResult<StatusWord> {
        self.send(command).map(|response| response.status)
    }

    /// Sends a transaction command.
    pub fn transaction(&mut self, op: TransactionOp) -> ScqlResult<StatusWord> {
        self.status(Command::Transaction(op))
    }

    /// Creates a table.
    pub fn create_table(&mut self, name: &str, columns: &[&str]) -> ScqlResult<StatusWord> {
        self.status(ScqlRequest::CreateTable {
            name: ObjectName::from(name),
            columns: names(columns),
        })
    }

    /// Inserts a row.
    pub fn insert(&mut self, table: &str, values: &[&str]) -> ScqlResult<StatusWord> {
        self.status(ScqlRequest::Insert {
            table: ObjectName::from(table),
            values: values
                .iter()
                .map(|v| Bytes::copy_from_slice(v.as_bytes()))
                .collect(),
        })
    }

    /// Declares a cursor.
    pub fn declare(
        &mut self,
        object: &str,
        columns: &[&str],
        filters: Vec<Filter>,
    ) -> ScqlResult<StatusWord> {
        self.status(ScqlRequest::DeclareCursor {
            object: ObjectName::from(object),
            columns: names(columns),
            filters,
        })
    }
}

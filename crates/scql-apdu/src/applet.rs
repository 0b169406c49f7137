//! The card applet.
//!
//! [`ScqlApplet`] is the command loop of the card: it parses a raw command
//! APDU, dispatches it to the [`Database`] it owns and answers with a
//! response APDU. Failures never escape `process`; they become status
//! words.
//!
//! ```text
//!  bytes ──► CommandApdu::parse ──► Command::decode ──► execute ──► Database
//!                                                          │
//!  bytes ◄── ResponseApdu::to_bytes ◄──────── data | status word
//! ```

use bytes::Bytes;
use tracing::debug;

use scql_common::config::EngineConfig;
use scql_common::error::ScqlResult;
use scql_engine::Database;

use crate::command::CommandApdu;
use crate::request::{Command, ScqlRequest, TransactionOp};
use crate::response::ResponseApdu;

/// An SCQL card applet.
///
/// # Example
///
/// ```rust
/// use scql_apdu::{ScqlApplet, StatusWord};
///
/// let mut applet = ScqlApplet::default();
/// // create table T (a)
/// let response = applet.process(&[0x00, 0x10, 0x00, 0x80, 0x05, 0x01, b'T', 0x01, 0x01, b'a']);
/// assert_eq!(response.status, StatusWord::SUCCESS);
///
/// // open without a declared cursor
/// let response = applet.process(&[0x00, 0x10, 0x00, 0x88]);
/// assert_eq!(response.status, StatusWord::CONDITIONS_NOT_SATISFIED);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScqlApplet {
    db: Database,
}

impl ScqlApplet {
    /// Creates an applet over an empty database.
    pub fn new(config: EngineConfig) -> ScqlResult<Self> {
        Ok(Self::from_database(Database::new(config)?))
    }

    /// Creates an applet over an existing database.
    #[must_use]
    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    /// Returns the database.
    #[inline]
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Consumes the applet, returning the database.
    #[must_use]
    pub fn into_database(self) -> Database {
        self.db
    }

    /// Processes one raw command APDU.
    pub fn process(&mut self, bytes: &[u8]) -> ResponseApdu {
        match CommandApdu::parse(bytes) {
            Ok(apdu) => self.process_command(&apdu),
            Err(e) => {
                debug!(error = %e, "malformed command APDU");
                ResponseApdu::from_error(&e)
            }
        }
    }

    /// Processes one parsed command APDU.
    pub fn process_command(&mut self, apdu: &CommandApdu) -> ResponseApdu {
        let result = Command::decode(apdu).and_then(|command| {
            debug!(command = %command, "dispatching");
            self.execute(command)
        });

        match result {
            Ok(data) => ResponseApdu::with_data(data),
            Err(e) => {
                debug!(
                    ins = apdu.ins,
                    p2 = apdu.p2,
                    status = e.status_word(),
                    error = %e,
                    "command failed"
                );
                ResponseApdu::from_error(&e)
            }
        }
    }

    /// Executes a decoded command, returning the response data.
    pub fn execute(&mut self, command: Command) -> ScqlResult<Bytes> {
        match command {
            Command::Select => Ok(Bytes::new()),
            Command::Scql(request) => self.execute_scql(request),
            Command::Transaction(op) => {
                match op {
                    TransactionOp::Begin => self.db.begin_transaction()?,
                    TransactionOp::Commit => self.db.commit_transaction()?,
                    TransactionOp::Abort => self.db.abort_transaction()?,
                }
                Ok(Bytes::new())
            }
        }
    }

    fn execute_scql(&mut self, request: ScqlRequest) -> ScqlResult<Bytes> {
        let db = &mut self.db;
        match request {
            ScqlRequest::CreateTable { name, columns } => {
                db.create_table(name, columns)?;
            }
            ScqlRequest::CreateView {
                name,
                table,
                columns,
                filters,
            } => {
                db.create_view(name, &table, columns, filters)?;
            }
            ScqlRequest::DropTable { name } => db.drop_table(&name)?,
            ScqlRequest::DropView { name } => db.drop_view(&name)?,
            ScqlRequest::DeclareCursor {
                object,
                columns,
                filters,
            } => db.declare_cursor(&object, columns, filters)?,
            ScqlRequest::Open => db.open()?,
            ScqlRequest::Next => db.next()?,
            ScqlRequest::Fetch => return Ok(db.fetch()?.to_bytes()),
            ScqlRequest::FetchNext => return Ok(db.fetch_next()?.to_bytes()),
            ScqlRequest::Insert { table, values } => {
                db.insert(&table, values)?;
            }
            ScqlRequest::Update { column, value } => db.update(&value, &column)?,
            ScqlRequest::Delete => db.delete()?,
        }
        Ok(Bytes::new())
    }
}

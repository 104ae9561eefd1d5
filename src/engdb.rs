use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};

use std::path::Path;
use std::time::Duration;

pub mod activities;
pub mod contributors;
pub mod points;
pub mod profiles;
pub mod reports;
pub mod schema;
pub mod taskruns;

pub type DBResult<T> = rusqlite::Result<T>;

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens the database at `path` and makes sure every table exists.
pub fn connect(path: impl AsRef<Path>) -> DBResult<Connection> {
    let path = path.as_ref();
    log::trace!("[connect] Opening database at {}", path.display());

    let connection = Connection::open(path)?;
    configure(&connection)?;
    let mode: String =
        connection.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    log::trace!("[connect] journal_mode = {mode}");
    initialize_db(&connection)?;

    Ok(connection)
}

/// Opens a private in-memory database, used by tests and dry runs.
pub fn connect_in_memory() -> DBResult<Connection> {
    let connection = Connection::open_in_memory()?;
    configure(&connection)?;
    initialize_db(&connection)?;

    Ok(connection)
}

fn configure(connection: &Connection) -> DBResult<()> {
    connection.busy_timeout(BUSY_TIMEOUT)?;
    connection.pragma_update(None, "foreign_keys", true)?;
    Ok(())
}

pub fn initialize_db(connection: &Connection) -> DBResult<()> {
    for (name, ddl) in schema::TABLES {
        log::debug!("[initialize_db] creating {name} table...");
        connection.execute(ddl, [])?;
    }

    Ok(())
}

/// Opens an IMMEDIATE transaction: the write lock is taken at BEGIN, so a
/// competing writer waits out the busy timeout instead of failing mid-way.
pub fn begin_write(connection: &Connection) -> DBResult<Transaction<'_>> {
    Transaction::new_unchecked(connection, TransactionBehavior::Immediate)
}

/// Maps a unique/foreign-key violation on insert to `Ok(false)` ("nothing new
/// was added"), and passes every other error through.
pub(crate) fn swallow_constraint_violation(err: rusqlite::Error) -> DBResult<bool> {
    match err {
        rusqlite::Error::SqliteFailure(ref failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            log::trace!("[swallow_constraint_violation] Ignoring duplicate row: {err}");
            Ok(false)
        }
        _ => Err(err),
    }
}

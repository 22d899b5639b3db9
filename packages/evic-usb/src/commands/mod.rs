use log::debug;

use crate::{Connection, ConnectionError, Transport};

pub mod dataflash;
pub mod firmware;
pub mod logo;

pub trait Command {
    type Output;

    fn execute<C: Connection + ?Sized>(
        self,
        connection: &mut C,
    ) -> Result<Self::Output, ConnectionError>;
}

/// Opens a connection, executes `command` on it and closes it again.
///
/// The connection is closed whether or not the command succeeds.
pub fn run<T: Transport + ?Sized, C: Command>(
    transport: &T,
    command: C,
) -> Result<C::Output, ConnectionError> {
    let mut connection = transport.open()?;
    debug!("Connection opened");

    let result = command.execute(&mut connection);
    drop(connection);

    result
}

mod protocol;
mod server;

use log::info;
use std::io::{self, BufReader};

pub use protocol::{read_message, write_message, DapMessage, DapMessageContent};
pub use server::{register_variables, DapServer, Flow};

/// Serve DAP over stdin/stdout until the client disconnects or closes the
/// stream.
pub fn run_dap_mode() -> io::Result<()> {
    info!("DAP server starting");

    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());
    let mut server = DapServer::new(io::stdout());
    let mut msg_count = 0u64;

    while let Some(msg) = read_message(&mut reader)? {
        msg_count += 1;
        if server.handle(msg)? == Flow::Exit {
            break;
        }
    }

    info!("DAP server exiting after {} messages", msg_count);
    Ok(())
}

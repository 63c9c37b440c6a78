//! `wthp_display`: the implicit root object, bound at accept time.

use crate::client::Client;
use crate::error::ProtocolErrorCode;
use crate::wire::{Argument, Message};

/// Every interface in this codec reserves its last opcode for the
/// object-scoped error event, so `post_error` can address any object
/// uniformly without per-interface event tables.
pub const ERROR_OPCODE: u16 = 0xffff;

#[derive(Debug, Default)]
pub struct Display;

pub fn handle(
    client: &mut Client,
    object_id: u32,
    opcode: u16,
    args: Vec<Argument>,
) -> Result<(), crate::error::ClientError> {
    match opcode {
        // client_version: unsupported.
        0 => {
            super::post_error(
                client,
                object_id,
                ProtocolErrorCode::Unimplemented,
                "client_version is not implemented",
            );
        }
        // sync(callback)
        1 => {
            let Some(Argument::NewId(cb)) = args.first() else {
                return Err(crate::error::ClientError::Protocol(
                    "sync: missing callback id".into(),
                ));
            };
            client.queue_event(Message::new(*cb, 0, vec![Argument::Uint(0)]));
            client.release_object(*cb);
        }
        // get_registry(registry)
        2 => {
            let Some(Argument::NewId(reg_id)) = args.first() else {
                return Err(crate::error::ClientError::Protocol(
                    "get_registry: missing registry id".into(),
                ));
            };
            client.bind_registry(*reg_id);
        }
        other => {
            log::warn!("display: unknown opcode {other}");
        }
    }
    Ok(())
}

//! `wthp_registry`: the peer-facing directory of globals.

use crate::client::Client;
use crate::error::ProtocolErrorCode;
use crate::wire::{Argument, Message};

use super::{BlobFactory, Compositor, IviAppId, Object, Seat};

#[derive(Debug, Default)]
pub struct Registry;

/// The four globals advertised on `get_registry`, in the fixed, observable
/// order the original implementation sends them.
pub const GLOBALS: &[(&str, u32)] = &[
    ("wthp_compositor", 4),
    ("wthp_ivi_app_id", 1),
    ("wthp_seat", 4),
    ("wthp_blob_factory", 4),
];

/// Emits one `global(name, interface, version)` event per entry in
/// [`GLOBALS`], all advertised under name `1`.
pub fn announce_globals(client: &mut Client, registry_id: u32) {
    for (interface, version) in GLOBALS {
        client.queue_event(Message::new(
            registry_id,
            0,
            vec![
                Argument::Uint(1),
                Argument::String(interface.to_string()),
                Argument::Uint(*version),
            ],
        ));
    }
}

pub fn handle(
    client: &mut Client,
    object_id: u32,
    opcode: u16,
    args: Vec<Argument>,
) -> Result<(), crate::error::ClientError> {
    match opcode {
        0 => client.release_object(object_id), // destroy
        1 => {
            let (Some(Argument::Uint(_name)), Some(Argument::NewId(new_id)), Some(Argument::String(iface)), Some(Argument::Uint(_version))) =
                (args.first(), args.get(1), args.get(2), args.get(3))
            else {
                return Err(crate::error::ClientError::Protocol(
                    "bind: malformed arguments".into(),
                ));
            };
            bind(client, object_id, *new_id, iface);
        }
        other => log::warn!("registry: unknown opcode {other}"),
    }
    Ok(())
}

fn bind(client: &mut Client, registry_id: u32, new_id: u32, interface: &str) {
    match interface {
        "wthp_compositor" => {
            client.objects.insert(new_id, Object::Compositor(Compositor::default()));
        }
        "wthp_blob_factory" => {
            client.objects.insert(new_id, Object::BlobFactory(BlobFactory::default()));
            if let Some(seat_id) = client.latest_seat {
                super::seat::send_updated_caps(client, seat_id);
            }
        }
        "wthp_ivi_app_id" => {
            client.objects.insert(new_id, Object::IviAppId(IviAppId::default()));
        }
        "wthp_seat" => {
            client.objects.insert(new_id, Object::Seat(Seat::default()));
            client.latest_seat = Some(new_id);
            super::seat::send_updated_caps(client, new_id);
        }
        other => {
            log::warn!("bind: unknown interface {other}");
            super::post_error(
                client,
                registry_id,
                ProtocolErrorCode::Unimplemented,
                &format!("unknown interface: {other}"),
            );
            client.objects.remove(&new_id);
        }
    }
}

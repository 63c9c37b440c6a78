//! `wthp_surface`: the local-side window descriptor and its requests.

use crate::client::Client;
use crate::wire::{Argument, Message};

#[derive(Debug)]
pub struct Surface {
    /// 0 until promoted by `ivi_app_id.surface_create`.
    pub ivi_id: u32,
    /// At most one pending `frame` callback id.
    pub frame_callback: Option<u32>,
    pub window: Window,
}

/// The local-side window descriptor handed to the worker at spawn time.
#[derive(Debug, Clone)]
pub struct Window {
    pub ivi_id: u32,
    pub ready: bool,
    /// The client's latest seat at the time this window was created —
    /// the routing target for input upcalls (an explicit pointer, not a
    /// linked-list tail scan).
    pub seat: Option<u32>,
    /// The wire id of the owning surface, carried by upcall events that
    /// name a surface (`enter`, `down`).
    pub surface_id: u32,
}

pub fn handle(
    client: &mut Client,
    object_id: u32,
    opcode: u16,
    args: Vec<Argument>,
) -> Result<(), crate::error::ClientError> {
    match opcode {
        0 => client.release_object(object_id), // destroy
        1 => attach(client, object_id, args)?,
        2 => forward_if_bound(client, object_id, "damage"),
        3 => {
            let Some(Argument::NewId(cb)) = args.first() else {
                return Err(crate::error::ClientError::Protocol(
                    "frame: missing callback id".into(),
                ));
            };
            if let Some(super::Object::Surface(s)) = client.objects.get_mut(&object_id) {
                s.frame_callback = Some(*cb);
            }
        }
        4 | 5 => {} // set_opaque_region / set_input_region: no-op
        6 => forward_if_bound(client, object_id, "commit"),
        7 | 8 | 9 => {} // set_buffer_transform / set_buffer_scale / damage_buffer: no-op
        other => log::trace!("surface: ignoring opcode {other}"),
    }
    Ok(())
}

fn attach(
    client: &mut Client,
    surface_id: u32,
    args: Vec<Argument>,
) -> Result<(), crate::error::ClientError> {
    let Some(Argument::Object(buffer_id)) = args.first() else {
        return Err(crate::error::ClientError::Protocol(
            "attach: missing buffer id".into(),
        ));
    };
    // Resolved via the client's object arena by wire id -- never via an
    // address projection off a stack local.
    if client.objects.get(buffer_id).is_none() {
        return Err(crate::error::ClientError::Protocol(format!(
            "attach: unknown buffer {buffer_id}"
        )));
    }
    let bound = matches!(
        client.objects.get(&surface_id),
        Some(super::Object::Surface(s)) if s.ivi_id != 0
    );
    if bound {
        client.notify_worker(surface_id, "attach");
        client.queue_event(Message::new(*buffer_id, 0, vec![Argument::Uint(0)]));
    }
    Ok(())
}

fn forward_if_bound(client: &mut Client, surface_id: u32, what: &str) {
    let bound = matches!(
        client.objects.get(&surface_id),
        Some(super::Object::Surface(s)) if s.ivi_id != 0
    );
    if bound {
        client.notify_worker(surface_id, what);
    }
}

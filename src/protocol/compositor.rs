//! `wthp_compositor` and `wthp_region`.

use crate::client::Client;
use crate::wire::Argument;

use super::{Object, Surface, Window};

#[derive(Debug, Default)]
pub struct Compositor;

#[derive(Debug, Default)]
pub struct Region;

pub fn handle_compositor(
    client: &mut Client,
    object_id: u32,
    opcode: u16,
    args: Vec<Argument>,
) -> Result<(), crate::error::ClientError> {
    match opcode {
        0 => client.release_object(object_id), // destroy
        1 => {
            let Some(Argument::NewId(surface_id)) = args.first() else {
                return Err(crate::error::ClientError::Protocol(
                    "create_surface: missing id".into(),
                ));
            };
            create_surface(client, *surface_id);
        }
        2 => {
            let Some(Argument::NewId(region_id)) = args.first() else {
                return Err(crate::error::ClientError::Protocol(
                    "create_region: missing id".into(),
                ));
            };
            client.objects.insert(*region_id, Object::Region(Region::default()));
        }
        other => log::warn!("compositor: unknown opcode {other}"),
    }
    Ok(())
}

pub fn handle_region(
    client: &mut Client,
    object_id: u32,
    opcode: u16,
    _args: Vec<Argument>,
) -> Result<(), crate::error::ClientError> {
    match opcode {
        0 => client.release_object(object_id), // destroy
        other => log::trace!("region: ignoring opcode {other}"),
    }
    Ok(())
}

fn create_surface(client: &mut Client, surface_id: u32) {
    let window = Window {
        ivi_id: 0,
        ready: false,
        seat: client.latest_seat,
        surface_id,
    };
    let surface = Surface {
        ivi_id: 0,
        frame_callback: None,
        window,
    };
    client.objects.insert(surface_id, Object::Surface(surface));
}

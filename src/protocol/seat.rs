//! `wthp_seat`, `wthp_pointer`, `wthp_touch`, `wthp_keyboard`.

use crate::client::Client;
use crate::wire::{Argument, Message};

use super::Object;

const CAP_POINTER: u32 = 0x1;
const CAP_TOUCH: u32 = 0x4;

#[derive(Debug, Default)]
pub struct Seat {
    pub pointer: Option<u32>,
    pub touch: Option<u32>,
    pub keyboard: Option<u32>,
}

#[derive(Debug, Default)]
pub struct Pointer;

#[derive(Debug, Default)]
pub struct Touch;

#[derive(Debug, Default)]
pub struct Keyboard;

/// Posts `capabilities(POINTER|TOUCH)` on the given seat. Called at bind
/// time and again whenever a blob_factory is subsequently bound, since the
/// peer must be told that buffer upload has become available.
pub fn send_updated_caps(client: &mut Client, seat_id: u32) {
    client.queue_event(Message::new(
        seat_id,
        0,
        vec![Argument::Uint(CAP_POINTER | CAP_TOUCH)],
    ));
}

pub fn handle_seat(
    client: &mut Client,
    object_id: u32,
    opcode: u16,
    args: Vec<Argument>,
) -> Result<(), crate::error::ClientError> {
    match opcode {
        0 => {
            let Some(Argument::NewId(id)) = args.first() else {
                return Err(crate::error::ClientError::Protocol(
                    "get_pointer: missing id".into(),
                ));
            };
            client.objects.insert(*id, Object::Pointer(Pointer::default()));
            if let Some(Object::Seat(seat)) = client.objects.get_mut(&object_id) {
                seat.pointer = Some(*id); // re-binding overwrites
            }
        }
        1 => {
            // get_keyboard: stub, accepts the id without further action
            // beyond attaching it.
            if let Some(Argument::NewId(id)) = args.first() {
                client.objects.insert(*id, Object::Keyboard(Keyboard::default()));
                if let Some(Object::Seat(seat)) = client.objects.get_mut(&object_id) {
                    seat.keyboard = Some(*id);
                }
            }
        }
        2 => {
            let Some(Argument::NewId(id)) = args.first() else {
                return Err(crate::error::ClientError::Protocol(
                    "get_touch: missing id".into(),
                ));
            };
            client.objects.insert(*id, Object::Touch(Touch::default()));
            if let Some(Object::Seat(seat)) = client.objects.get_mut(&object_id) {
                seat.touch = Some(*id); // re-binding overwrites
            }
        }
        3 => {
            // release: clear the client's latest-seat pointer if it named
            // this seat, so nothing keeps routing upcalls at a dead id.
            if client.latest_seat == Some(object_id) {
                client.latest_seat = None;
            }
            client.release_object(object_id);
        }
        other => log::trace!("seat: ignoring opcode {other}"),
    }
    Ok(())
}

/// Clears `pointer` on whichever seat currently names it, so a released
/// pointer doesn't leave a dangling id behind on its seat.
fn clear_seat_pointer(client: &mut Client, pointer_id: u32) {
    for obj in client.objects.values_mut() {
        if let Object::Seat(seat) = obj {
            if seat.pointer == Some(pointer_id) {
                seat.pointer = None;
            }
        }
    }
}

/// Clears `touch` on whichever seat currently names it, mirroring
/// `clear_seat_pointer`.
fn clear_seat_touch(client: &mut Client, touch_id: u32) {
    for obj in client.objects.values_mut() {
        if let Object::Seat(seat) = obj {
            if seat.touch == Some(touch_id) {
                seat.touch = None;
            }
        }
    }
}

/// Clears `keyboard` on whichever seat currently names it, mirroring
/// `clear_seat_pointer`/`clear_seat_touch`.
fn clear_seat_keyboard(client: &mut Client, keyboard_id: u32) {
    for obj in client.objects.values_mut() {
        if let Object::Seat(seat) = obj {
            if seat.keyboard == Some(keyboard_id) {
                seat.keyboard = None;
            }
        }
    }
}

pub fn handle_pointer(
    client: &mut Client,
    object_id: u32,
    opcode: u16,
    _args: Vec<Argument>,
) -> Result<(), crate::error::ClientError> {
    match opcode {
        0 => {} // set_cursor: no-op
        1 => {
            clear_seat_pointer(client, object_id);
            client.release_object(object_id);
        }
        other => log::trace!("pointer: ignoring opcode {other}"),
    }
    Ok(())
}

pub fn handle_touch(
    client: &mut Client,
    object_id: u32,
    opcode: u16,
    _args: Vec<Argument>,
) -> Result<(), crate::error::ClientError> {
    match opcode {
        0 => {
            clear_seat_touch(client, object_id);
            client.release_object(object_id);
        }
        other => log::trace!("touch: ignoring opcode {other}"),
    }
    Ok(())
}

pub fn handle_keyboard(
    client: &mut Client,
    object_id: u32,
    opcode: u16,
    _args: Vec<Argument>,
) -> Result<(), crate::error::ClientError> {
    match opcode {
        0 => {
            // release: same shape as pointer/touch release, so a bound
            // keyboard doesn't linger in the client's collections past
            // the request that is supposed to drop it.
            clear_seat_keyboard(client, object_id);
            client.release_object(object_id);
        }
        other => log::trace!("keyboard: ignoring opcode {other}"),
    }
    Ok(())
}

//! Input upcall surface: the stable entry points the rendering worker calls
//! to translate host input into protocol events addressed to the client's
//! seat/pointer/touch.
//!
//! The worker itself is represented here only by `worker::run_stub`, a
//! process that never calls back into the core. These functions are the
//! in-process API such a worker would drive; a real, cross-process worker
//! would reach them over whatever IPC channel replaces the
//! fork-shared-socket convenience the original relies on. The routing and
//! event-shape logic below is identical either way, since it only depends
//! on the `Window` handle and the owning client's object arena, never on
//! how the call got here.
//!
//! Every function bails silently (no-op) when the named device is absent or
//! unbound on the seat.

use crate::client::Client;
use crate::wire::{Argument, Message};

use super::{Object, Seat, Window};

const POINTER_ENTER: u16 = 0;
const POINTER_LEAVE: u16 = 1;
const POINTER_MOTION: u16 = 2;
const POINTER_BUTTON: u16 = 3;
const POINTER_AXIS: u16 = 4;

const TOUCH_DOWN: u16 = 0;
const TOUCH_UP: u16 = 1;
const TOUCH_MOTION: u16 = 2;
const TOUCH_FRAME: u16 = 3;
const TOUCH_CANCEL: u16 = 4;

fn seat_of<'a>(client: &'a Client, window: &Window) -> Option<&'a Seat> {
    let seat_id = window.seat?;
    match client.objects.get(&seat_id) {
        Some(Object::Seat(seat)) => Some(seat),
        _ => None,
    }
}

fn pointer_id(client: &Client, window: &Window) -> Option<u32> {
    seat_of(client, window)?.pointer
}

fn touch_id(client: &Client, window: &Window) -> Option<u32> {
    seat_of(client, window)?.touch
}

pub fn pointer_enter(client: &mut Client, window: &Window, serial: u32, sx: i32, sy: i32) {
    let Some(id) = pointer_id(client, window) else { return };
    client.queue_event(Message::new(
        id,
        POINTER_ENTER,
        vec![
            Argument::Uint(serial),
            Argument::Object(window.surface_id),
            Argument::Fixed(sx),
            Argument::Fixed(sy),
        ],
    ));
}

pub fn pointer_leave(client: &mut Client, window: &Window, serial: u32) {
    let Some(id) = pointer_id(client, window) else { return };
    client.queue_event(Message::new(
        id,
        POINTER_LEAVE,
        vec![Argument::Uint(serial), Argument::Object(window.surface_id)],
    ));
}

pub fn pointer_motion(client: &mut Client, window: &Window, time: u32, sx: i32, sy: i32) {
    let Some(id) = pointer_id(client, window) else { return };
    client.queue_event(Message::new(
        id,
        POINTER_MOTION,
        vec![Argument::Uint(time), Argument::Fixed(sx), Argument::Fixed(sy)],
    ));
}

pub fn pointer_button(client: &mut Client, window: &Window, serial: u32, time: u32, button: u32, state: u32) {
    let Some(id) = pointer_id(client, window) else { return };
    client.queue_event(Message::new(
        id,
        POINTER_BUTTON,
        vec![
            Argument::Uint(serial),
            Argument::Uint(time),
            Argument::Uint(button),
            Argument::Uint(state),
        ],
    ));
}

pub fn pointer_axis(client: &mut Client, window: &Window, time: u32, axis: u32, value: i32) {
    let Some(id) = pointer_id(client, window) else { return };
    client.queue_event(Message::new(
        id,
        POINTER_AXIS,
        vec![Argument::Uint(time), Argument::Uint(axis), Argument::Fixed(value)],
    ));
}

pub fn touch_down(client: &mut Client, window: &Window, serial: u32, time: u32, id: i32, x: i32, y: i32) {
    let Some(touch) = touch_id(client, window) else { return };
    client.queue_event(Message::new(
        touch,
        TOUCH_DOWN,
        vec![
            Argument::Uint(serial),
            Argument::Uint(time),
            Argument::Object(window.surface_id),
            Argument::Int(id),
            Argument::Fixed(x),
            Argument::Fixed(y),
        ],
    ));
}

pub fn touch_up(client: &mut Client, window: &Window, serial: u32, time: u32, id: i32) {
    let Some(touch) = touch_id(client, window) else { return };
    client.queue_event(Message::new(
        touch,
        TOUCH_UP,
        vec![Argument::Uint(serial), Argument::Uint(time), Argument::Int(id)],
    ));
}

pub fn touch_motion(client: &mut Client, window: &Window, time: u32, id: i32, x: i32, y: i32) {
    let Some(touch) = touch_id(client, window) else { return };
    client.queue_event(Message::new(
        touch,
        TOUCH_MOTION,
        vec![Argument::Uint(time), Argument::Int(id), Argument::Fixed(x), Argument::Fixed(y)],
    ));
}

pub fn touch_frame(client: &mut Client, window: &Window) {
    let Some(touch) = touch_id(client, window) else { return };
    client.queue_event(Message::new(touch, TOUCH_FRAME, vec![]));
}

pub fn touch_cancel(client: &mut Client, window: &Window) {
    let Some(touch) = touch_id(client, window) else { return };
    client.queue_event(Message::new(touch, TOUCH_CANCEL, vec![]));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::connection::Connection;
    use crate::protocol::{Pointer, Touch};
    use std::net::{TcpListener, TcpStream};

    fn test_client() -> Client {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let _keep_alive = TcpStream::connect(addr).unwrap();
        let (sock, _) = listener.accept().unwrap();
        Client::new(1, Connection::new(sock).unwrap(), 34400, None)
    }

    fn bound_window(client: &mut Client) -> Window {
        client.objects.insert(2, Object::Seat(Seat::default()));
        client.objects.insert(3, Object::Pointer(Pointer::default()));
        client.objects.insert(4, Object::Touch(Touch::default()));
        if let Some(Object::Seat(seat)) = client.objects.get_mut(&2) {
            seat.pointer = Some(3);
            seat.touch = Some(4);
        }
        Window {
            ivi_id: 1,
            ready: true,
            seat: Some(2),
            surface_id: 10,
        }
    }

    #[test]
    fn pointer_enter_posts_to_bound_pointer() {
        let mut client = test_client();
        let window = bound_window(&mut client);
        pointer_enter(&mut client, &window, 42, 0, 0);
        assert!(client.has_pending_writes());
    }

    #[test]
    fn upcall_on_unbound_seat_is_silent_noop() {
        let mut client = test_client();
        let window = Window {
            ivi_id: 1,
            ready: true,
            seat: None,
            surface_id: 10,
        };
        pointer_enter(&mut client, &window, 1, 0, 0);
        touch_down(&mut client, &window, 1, 0, 0, 0, 0);
        assert!(!client.has_pending_writes());
    }

    #[test]
    fn touch_frame_carries_no_arguments() {
        let mut client = test_client();
        let window = bound_window(&mut client);
        touch_frame(&mut client, &window);
        assert!(client.has_pending_writes());
    }
}

//! Object graph and request/event dispatch for every interface the core
//! terminates: display, registry, compositor, region, surface, blob_factory,
//! buffer, ivi_app_id, ivi_surface, seat, pointer, touch, keyboard.
//!
//! Objects live in a single per-client arena keyed by wire id: no intrusive
//! lists, no `container_of`. Each variant is a small data struct; behaviour
//! lives in the `handlers` submodules, which take `&mut Client` plus the
//! decoded request arguments.

mod buffer;
mod compositor;
mod display;
mod ivi;
mod registry;
mod seat;
mod surface;
pub mod upcall;

pub use buffer::{Buffer, BlobFactory};
pub use compositor::{Compositor, Region};
pub use display::Display;
pub use ivi::{IviAppId, IviSurface};
pub use registry::{announce_globals, Registry};
pub use seat::{Keyboard, Pointer, Seat, Touch};
pub use surface::{Surface, Window};

use crate::client::Client;
use crate::wire::{ArgKind, Argument, Message, Signature};

/// A tagged protocol object: whichever interface's state this wire id
/// currently names.
#[derive(Debug)]
pub enum Object {
    Display(Display),
    Registry(Registry),
    Compositor(Compositor),
    Region(Region),
    Surface(Surface),
    BlobFactory(BlobFactory),
    Buffer(Buffer),
    IviAppId(IviAppId),
    IviSurface(IviSurface),
    Seat(Seat),
    Pointer(Pointer),
    Touch(Touch),
    Keyboard(Keyboard),
}

impl Object {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Object::Display(_) => "wthp_display",
            Object::Registry(_) => "wthp_registry",
            Object::Compositor(_) => "wthp_compositor",
            Object::Region(_) => "wthp_region",
            Object::Surface(_) => "wthp_surface",
            Object::BlobFactory(_) => "wthp_blob_factory",
            Object::Buffer(_) => "wthp_buffer",
            Object::IviAppId(_) => "wthp_ivi_app_id",
            Object::IviSurface(_) => "wthp_ivi_surface",
            Object::Seat(_) => "wthp_seat",
            Object::Pointer(_) => "wthp_pointer",
            Object::Touch(_) => "wthp_touch",
            Object::Keyboard(_) => "wthp_keyboard",
        }
    }
}

/// Request signatures, looked up by (interface, opcode) so the wire decoder
/// can size out arguments before a handler ever sees the message.
pub fn signature_for(obj: &Object, opcode: u16) -> Option<Signature> {
    use ArgKind::*;
    Some(match (obj, opcode) {
        (Object::Display(_), 0) => &[], // client_version
        (Object::Display(_), 1) => &[NewId],       // sync(callback)
        (Object::Display(_), 2) => &[NewId],       // get_registry(registry)

        (Object::Registry(_), 0) => &[],           // destroy
        (Object::Registry(_), 1) => &[Uint, NewId, String, Uint], // bind

        (Object::Compositor(_), 0) => &[],         // destroy
        (Object::Compositor(_), 1) => &[NewId],    // create_surface
        (Object::Compositor(_), 2) => &[NewId],    // create_region

        (Object::Region(_), 0) => &[],              // destroy

        (Object::Surface(_), 0) => &[],             // destroy
        (Object::Surface(_), 1) => &[Object, Int, Int], // attach(buffer, x, y)
        (Object::Surface(_), 2) => &[Int, Int, Int, Int], // damage
        (Object::Surface(_), 3) => &[NewId],        // frame(callback)
        (Object::Surface(_), 4) => &[Object],       // set_opaque_region
        (Object::Surface(_), 5) => &[Object],       // set_input_region
        (Object::Surface(_), 6) => &[],             // commit
        (Object::Surface(_), 7) => &[Int],          // set_buffer_transform
        (Object::Surface(_), 8) => &[Int],          // set_buffer_scale
        (Object::Surface(_), 9) => &[Int, Int, Int, Int], // damage_buffer

        (Object::BlobFactory(_), 0) => {
            &[NewId, Uint, Array, Int, Int, Int, Uint] // create_buffer
        }

        (Object::Buffer(_), 0) => &[], // destroy

        (Object::IviAppId(_), 0) => &[String, Object, NewId], // surface_create

        (Object::IviSurface(_), 0) => &[], // destroy

        (Object::Seat(_), 0) => &[NewId], // get_pointer
        (Object::Seat(_), 1) => &[NewId], // get_keyboard
        (Object::Seat(_), 2) => &[NewId], // get_touch
        (Object::Seat(_), 3) => &[],      // release

        (Object::Pointer(_), 0) => &[Object, NewId, Int, Int], // set_cursor
        (Object::Pointer(_), 1) => &[],                        // release

        (Object::Touch(_), 0) => &[], // release

        (Object::Keyboard(_), _) => &[],
    })
}

/// Dispatches one decoded request to its handler. Object lookup and opcode
/// routing happen here; the per-interface logic lives in the submodules.
pub fn dispatch(client: &mut Client, msg: Message) -> Result<(), crate::error::ClientError> {
    let object_id = msg.object_id;
    let Some(obj) = client.objects.get(&object_id) else {
        log::warn!("request for unknown object {object_id}, ignoring");
        return Ok(());
    };
    match obj {
        Object::Display(_) => display::handle(client, object_id, msg.opcode, msg.args),
        Object::Registry(_) => registry::handle(client, object_id, msg.opcode, msg.args),
        Object::Compositor(_) => compositor::handle_compositor(client, object_id, msg.opcode, msg.args),
        Object::Region(_) => compositor::handle_region(client, object_id, msg.opcode, msg.args),
        Object::Surface(_) => surface::handle(client, object_id, msg.opcode, msg.args),
        Object::BlobFactory(_) => buffer::handle_blob_factory(client, object_id, msg.opcode, msg.args),
        Object::Buffer(_) => buffer::handle_buffer(client, object_id, msg.opcode, msg.args),
        Object::IviAppId(_) => ivi::handle_ivi_app_id(client, object_id, msg.opcode, msg.args),
        Object::IviSurface(_) => ivi::handle_ivi_surface(client, object_id, msg.opcode, msg.args),
        Object::Seat(_) => seat::handle_seat(client, object_id, msg.opcode, msg.args),
        Object::Pointer(_) => seat::handle_pointer(client, object_id, msg.opcode, msg.args),
        Object::Touch(_) => seat::handle_touch(client, object_id, msg.opcode, msg.args),
        Object::Keyboard(_) => seat::handle_keyboard(client, object_id, msg.opcode, msg.args),
    }
}

/// Posts an object-scoped protocol error event (opcode reserved as the last
/// opcode of every interface's event set, by convention 0xffff here since
/// this is a reduced codec, not the generated one) and records it in the log.
pub fn post_error(client: &mut Client, object_id: u32, code: crate::error::ProtocolErrorCode, message: &str) {
    log::warn!("protocol error on object {object_id}: {message} (code={})", code as u32);
    let args = vec![
        Argument::Uint(code as u32),
        Argument::String(message.to_string()),
    ];
    client.queue_event(Message::new(object_id, display::ERROR_OPCODE, args));
}

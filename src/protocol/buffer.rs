//! `wthp_blob_factory` and `wthp_buffer`.

use crate::client::Client;
use crate::wire::Argument;

use super::Object;

#[derive(Debug, Default)]
pub struct BlobFactory;

/// An opaque blob: the core never interprets the payload, only forwards it
/// by reference to the worker.
#[derive(Debug)]
pub struct Buffer {
    pub width: i32,
    pub height: i32,
    pub stride: i32,
    pub format: u32,
    pub data: Vec<u8>,
}

pub fn handle_blob_factory(
    client: &mut Client,
    object_id: u32,
    opcode: u16,
    args: Vec<Argument>,
) -> Result<(), crate::error::ClientError> {
    match opcode {
        0 => create_buffer(client, args)?,
        other => log::warn!("blob_factory({object_id}): unknown opcode {other}"),
    }
    Ok(())
}

fn create_buffer(client: &mut Client, args: Vec<Argument>) -> Result<(), crate::error::ClientError> {
    let (
        Some(Argument::NewId(id)),
        Some(Argument::Uint(_sz)),
        Some(Argument::Array(data)),
        Some(Argument::Int(width)),
        Some(Argument::Int(height)),
        Some(Argument::Int(stride)),
        Some(Argument::Uint(format)),
    ) = (
        args.first(),
        args.get(1),
        args.get(2),
        args.get(3),
        args.get(4),
        args.get(5),
        args.get(6),
    )
    else {
        return Err(crate::error::ClientError::Protocol(
            "create_buffer: malformed arguments".into(),
        ));
    };
    let buffer = Buffer {
        width: *width,
        height: *height,
        stride: *stride,
        format: *format,
        data: data.clone(),
    };
    client.objects.insert(*id, Object::Buffer(buffer));
    Ok(())
}

pub fn handle_buffer(
    client: &mut Client,
    object_id: u32,
    opcode: u16,
    _args: Vec<Argument>,
) -> Result<(), crate::error::ClientError> {
    match opcode {
        0 => client.release_object(object_id), // destroy
        other => log::trace!("buffer: ignoring opcode {other}"),
    }
    Ok(())
}

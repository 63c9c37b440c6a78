//! `wthp_ivi_app_id` and `wthp_ivi_surface`: worker lifecycle entry points.

use crate::client::Client;
use crate::wire::Argument;

use super::Object;

#[derive(Debug, Default)]
pub struct IviAppId;

#[derive(Debug)]
pub struct IviSurface {
    pub surface_id: u32,
    pub app_id_obj: u32,
}

pub fn handle_ivi_app_id(
    client: &mut Client,
    object_id: u32,
    opcode: u16,
    args: Vec<Argument>,
) -> Result<(), crate::error::ClientError> {
    match opcode {
        0 => surface_create(client, object_id, args),
        other => {
            log::warn!("ivi_app_id: unknown opcode {other}");
            Ok(())
        }
    }
}

fn surface_create(
    client: &mut Client,
    app_id_obj: u32,
    args: Vec<Argument>,
) -> Result<(), crate::error::ClientError> {
    let (Some(Argument::String(app_id)), Some(Argument::Object(surface_id)), Some(Argument::NewId(ivi_id))) =
        (args.first(), args.get(1), args.get(2))
    else {
        return Err(crate::error::ClientError::Protocol(
            "surface_create: malformed arguments".into(),
        ));
    };
    let surface_id = *surface_id;
    let ivi_id = *ivi_id;

    if !matches!(client.objects.get(&surface_id), Some(Object::Surface(_))) {
        return Err(crate::error::ClientError::Protocol(format!(
            "surface_create: unknown surface {surface_id}"
        )));
    }

    let effective_app_id = client.app_id_override.clone().unwrap_or_else(|| app_id.clone());
    let window = match client.objects.get(&surface_id) {
        Some(Object::Surface(s)) => s.window.clone(),
        _ => unreachable!(),
    };

    // A failed fork is fatal to the server, not just this client
    // (conservative: matches the original's treatment).
    let pid = client
        .spawn_worker(&window, &effective_app_id)
        .map_err(crate::error::ClientError::Fatal)?;

    client.pid = Some(pid);
    client.pid_destroying = false;

    if let Some(Object::Surface(s)) = client.objects.get_mut(&surface_id) {
        s.ivi_id = ivi_id;
    }

    client.objects.insert(
        ivi_id,
        Object::IviSurface(IviSurface {
            surface_id,
            app_id_obj,
        }),
    );
    Ok(())
}

pub fn handle_ivi_surface(
    client: &mut Client,
    object_id: u32,
    opcode: u16,
    _args: Vec<Argument>,
) -> Result<(), crate::error::ClientError> {
    match opcode {
        0 => destroy(client, object_id),
        other => log::warn!("ivi_surface: unknown opcode {other}"),
    }
    Ok(())
}

fn destroy(client: &mut Client, ivi_id: u32) {
    if let Some(Object::IviSurface(_)) = client.objects.get(&ivi_id) {
        client.pid_destroying = true;
        if let Err(e) = client.signal_worker() {
            log::warn!("failed to signal worker for ivi_surface {ivi_id}: {e}");
        }
        client.objects.remove(&ivi_id);
    }
}

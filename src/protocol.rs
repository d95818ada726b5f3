//! Protocol-facing interfaces
//!
//! Wire marshaling and the protocol objects themselves live outside the
//! core. The compositor only needs to create globals, construct surface and
//! region objects for a client, report allocation failures back to that
//! client, and send the two surface events driven by page flips.

use serde::Serialize;

use crate::error::NoMemory;
use crate::output::OutputId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ClientId(pub u32);

/// Client-chosen protocol object id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ObjectId(pub u32);

/// A client buffer attached to a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BufferId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GlobalKind {
    Compositor,
    DataDeviceManager,
    Seat,
    Output(OutputId),
}

/// The display clients connect to.
pub trait ProtocolDisplay {
    fn create_global(&mut self, kind: GlobalKind, version: u32);

    /// Construct the protocol object backing a new surface.
    fn create_surface(
        &mut self,
        client: ClientId,
        id: ObjectId,
    ) -> Result<Box<dyn SurfaceResource>, NoMemory>;

    fn create_region(&mut self, client: ClientId, id: ObjectId) -> Result<(), NoMemory>;
}

/// The connection a request arrived on.
pub trait ClientHandle {
    fn id(&self) -> ClientId;

    /// Post the protocol no-memory error on `resource`.
    fn post_no_memory(&mut self, resource: ObjectId);
}

/// Events the compositor sends on a surface object.
pub trait SurfaceResource {
    fn send_frame_done(&mut self, callback: ObjectId, time: u32);

    fn send_buffer_release(&mut self, buffer: BufferId);
}

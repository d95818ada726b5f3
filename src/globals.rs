//! Protocol globals and the compositor interface requests

use tracing::{debug, info, warn};

use crate::compositor::Compositor;
use crate::protocol::{ClientHandle, ClientId, GlobalKind, ObjectId};
use crate::surface::{Surface, SurfaceId};

/// Highest compositor interface version implemented.
pub const COMPOSITOR_VERSION: u32 = 3;

pub const DATA_DEVICE_MANAGER_VERSION: u32 = 3;

/// A client's binding of the compositor global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositorResource {
    pub client: ClientId,
    pub id: ObjectId,
    pub version: u32,
}

impl Compositor {
    /// Advertise the compositor, data device manager, seat and the outputs
    /// known right now. Outputs added later get no global.
    pub fn add_globals(&mut self) {
        self.display
            .create_global(GlobalKind::Compositor, COMPOSITOR_VERSION);
        self.display
            .create_global(GlobalKind::DataDeviceManager, DATA_DEVICE_MANAGER_VERSION);
        self.seat.add_globals(&mut *self.display);
        for output in &mut self.outputs {
            output.add_globals(&mut *self.display);
        }
        info!("Added globals for {} outputs", self.outputs.len());
    }

    pub fn bind_compositor(&self, client: ClientId, version: u32, id: ObjectId) -> CompositorResource {
        let version = version.min(COMPOSITOR_VERSION);
        debug!("Client {:?} bound compositor v{}", client, version);
        CompositorResource {
            client,
            id,
            version,
        }
    }

    /// Handle `create_surface`. On allocation failure the client gets a
    /// no-memory error on `resource` and `None` is returned.
    pub fn create_surface(
        &mut self,
        client: &mut dyn ClientHandle,
        resource: &CompositorResource,
        id: ObjectId,
    ) -> Option<SurfaceId> {
        let surface_resource = match self.display.create_surface(client.id(), id) {
            Ok(surface_resource) => surface_resource,
            Err(err) => {
                warn!("Could not create surface for {:?}: {}", client.id(), err);
                client.post_no_memory(resource.id);
                return None;
            }
        };

        let surface_id = self.next_surface_id();
        self.surfaces
            .push(Surface::new(surface_id, client.id(), surface_resource));
        debug!("Created {} for {:?}", surface_id, client.id());
        Some(surface_id)
    }

    /// Handle `create_region`. Returns false after posting no-memory.
    pub fn create_region(
        &mut self,
        client: &mut dyn ClientHandle,
        resource: &CompositorResource,
        id: ObjectId,
    ) -> bool {
        match self.display.create_region(client.id(), id) {
            Ok(()) => true,
            Err(err) => {
                warn!("Could not create region for {:?}: {}", client.id(), err);
                client.post_no_memory(resource.id);
                false
            }
        }
    }
}

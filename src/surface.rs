//! Client surfaces and the ordered surface collection

use std::fmt;

use serde::Serialize;
use smithay::utils::{Logical, Point, Rectangle};
use smithay::wayland::compositor::RegionAttributes;

use crate::protocol::{BufferId, ClientId, ObjectId, SurfaceResource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SurfaceId(pub u32);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

pub struct Surface {
    id: SurfaceId,
    client: ClientId,
    geometry: Rectangle<i32, Logical>,
    /// Surface-local. `None` accepts input over the whole surface.
    input_region: Option<RegionAttributes>,
    buffer: Option<BufferId>,
    frame_callbacks: Vec<ObjectId>,
    resource: Box<dyn SurfaceResource>,
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("id", &self.id)
            .field("client", &self.client)
            .field("geometry", &self.geometry)
            .field("input_region", &self.input_region)
            .field("buffer", &self.buffer)
            .field("frame_callbacks", &self.frame_callbacks)
            .finish_non_exhaustive()
    }
}

impl Surface {
    pub fn new(id: SurfaceId, client: ClientId, resource: Box<dyn SurfaceResource>) -> Self {
        Self {
            id,
            client,
            geometry: Rectangle::default(),
            input_region: None,
            buffer: None,
            frame_callbacks: Vec::new(),
            resource,
        }
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn client(&self) -> ClientId {
        self.client
    }

    pub fn geometry(&self) -> Rectangle<i32, Logical> {
        self.geometry
    }

    pub fn set_geometry(&mut self, geometry: Rectangle<i32, Logical>) {
        self.geometry = geometry;
    }

    pub fn input_region(&self) -> Option<&RegionAttributes> {
        self.input_region.as_ref()
    }

    pub fn set_input_region(&mut self, region: Option<RegionAttributes>) {
        self.input_region = region;
    }

    pub fn buffer(&self) -> Option<BufferId> {
        self.buffer
    }

    /// Attach a client buffer. It stays pending until the next page flip releases it.
    pub fn attach(&mut self, buffer: Option<BufferId>) {
        self.buffer = buffer;
    }

    /// Queue a frame callback for the next completed page flip.
    pub fn frame(&mut self, callback: ObjectId) {
        self.frame_callbacks.push(callback);
    }

    pub fn pending_frame_callbacks(&self) -> &[ObjectId] {
        &self.frame_callbacks
    }

    /// Whether `point`, in surface-local coordinates, lies in the input region.
    pub fn accepts_input(&self, point: Point<i32, Logical>) -> bool {
        match &self.input_region {
            Some(region) => region.contains(point),
            None => Rectangle::from_size(self.geometry.size).contains(point),
        }
    }

    pub fn send_frame_callbacks(&mut self, time: u32) {
        for callback in self.frame_callbacks.drain(..) {
            self.resource.send_frame_done(callback, time);
        }
    }

    /// Hand the pending buffer back to the client. Returns false if none was held.
    pub fn release_buffer(&mut self) -> bool {
        match self.buffer.take() {
            Some(buffer) => {
                self.resource.send_buffer_release(buffer);
                true
            }
            None => false,
        }
    }
}

/// Surfaces in stacking order, front first.
#[derive(Debug, Default)]
pub struct SurfaceList {
    surfaces: Vec<Surface>,
}

impl SurfaceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append behind every existing surface.
    pub fn push(&mut self, surface: Surface) {
        self.surfaces.push(surface);
    }

    pub fn remove(&mut self, id: SurfaceId) -> Option<Surface> {
        let index = self.surfaces.iter().position(|s| s.id == id)?;
        Some(self.surfaces.remove(index))
    }

    pub fn get(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: SurfaceId) -> Option<&mut Surface> {
        self.surfaces.iter_mut().find(|s| s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Surface> {
        self.surfaces.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Surface> {
        self.surfaces.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

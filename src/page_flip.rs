//! Page-flip completion
//!
//! A completed flip re-arms the output's scheduling and tells clients their
//! previous frame is on screen: every pending frame callback is answered and
//! every attached buffer is handed back.

use tracing::{trace, warn};

use crate::backend::DrmEvent;
use crate::compositor::Compositor;
use crate::output::OutputId;
use crate::utils::get_time_msec;

impl Compositor {
    pub fn handle_drm_event(&mut self, event: DrmEvent) {
        match event {
            DrmEvent::PageFlip { output } => self.page_flipped(output),
        }
    }

    fn page_flipped(&mut self, id: OutputId) {
        crate::tracy_frame_mark!();

        let Some(output) = self.output_mut(id) else {
            warn!("Page flip for unknown {}", id);
            return;
        };
        output.page_flipped();

        // Callbacks are answered for every surface, not only those on this output.
        let time = get_time_msec();
        let mut released = 0;
        for surface in self.surfaces.iter_mut() {
            surface.send_frame_callbacks(time);
            if surface.release_buffer() {
                released += 1;
            }
        }
        trace!("Page flip on {} at {}, released {} buffers", id, time, released);
    }
}

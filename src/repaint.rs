//! Repaint scheduling
//!
//! A repaint is deferred to an idle callback so that any number of damage
//! reports within one loop iteration cost a single render. An output stays
//! scheduled from the request until its page flip completes; requests in
//! between are absorbed.

use tracing::{trace, warn};

use crate::compositor::Compositor;
use crate::output::OutputId;

impl Compositor {
    /// Queue a repaint of `id`. Returns false if one was already pending.
    pub fn schedule_repaint(&mut self, id: OutputId) -> bool {
        let Some(output) = self.output_mut(id) else {
            warn!("Repaint requested for unknown {}", id);
            return false;
        };
        if output.repaint_scheduled {
            return false;
        }
        output.repaint_scheduled = true;

        trace!("Scheduling repaint of {}", id);
        self.loop_handle
            .insert_idle(move |compositor| compositor.repaint_output(id));
        true
    }

    pub fn schedule_repaint_all(&mut self) {
        let ids: Vec<OutputId> = self.outputs.iter().map(|output| output.id()).collect();
        for id in ids {
            self.schedule_repaint(id);
        }
    }

    /// Idle job: render into the back buffer and queue the flip to it.
    fn repaint_output(&mut self, id: OutputId) {
        crate::tracy_span!("repaint_output");

        // The output may have gone away since the job was queued.
        let Some(index) = self.outputs.iter().position(|output| output.id() == id) else {
            return;
        };

        let result = self
            .renderer
            .repaint_output(&self.outputs[index], &self.surfaces)
            .and_then(|()| self.outputs[index].switch_buffer());

        if let Err(err) = result {
            warn!("Could not repaint {}: {:#}", id, err);
            // No flip is coming, so nothing else would clear the flag.
            self.outputs[index].repaint_scheduled = false;
        }
    }
}

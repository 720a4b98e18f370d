//! Movie host interface
//!
//! Actions that drive the timeline, the network or the player UI have no
//! meaning inside the interpreter itself. They are forwarded to a
//! [`MovieHost`] supplied by the embedder. Every method has a do-nothing
//! default so hosts only implement what they support.

use crate::error::AvmError;
use crate::object::ObjectRef;
use crate::value::AvmValue;

/// HTTP method used to send the target's variables with a URL request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendVarsMethod {
    Get,
    Post,
}

impl SendVarsMethod {
    /// Decode the low two bits of a GetURL2 flag byte
    pub fn from_flags(flags: u8) -> Option<Self> {
        if flags & 1 != 0 {
            Some(SendVarsMethod::Get)
        } else if flags & 2 != 0 {
            Some(SendVarsMethod::Post)
        } else {
            None
        }
    }
}

/// Drag rectangle for StartDrag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragConstraint {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Side effects requested by timeline actions.
///
/// `target` is the movie clip the action applies to (the current default
/// target), when there is one.
#[allow(unused_variables)]
pub trait MovieHost {
    /// GotoFrame / GotoFrame2. `frame` is a 1-based frame number or a label.
    fn goto_frame(&self, target: Option<&ObjectRef>, frame: &AvmValue, scene_bias: u16, play: bool) {}

    fn goto_label(&self, target: Option<&ObjectRef>, label: &str) {}

    fn next_frame(&self, target: Option<&ObjectRef>) {}

    fn prev_frame(&self, target: Option<&ObjectRef>) {}

    fn play(&self, target: Option<&ObjectRef>) {}

    fn stop(&self, target: Option<&ObjectRef>) {}

    fn toggle_quality(&self) {}

    fn stop_sounds(&self) {}

    /// WaitForFrame guard. Hosts that stream content report unloaded frames.
    fn frame_loaded(&self, target: Option<&ObjectRef>, frame: &AvmValue) -> bool {
        true
    }

    /// The Call action: run the actions of another frame
    fn call_frame(&self, target: Option<&ObjectRef>, frame: &AvmValue) -> Result<(), AvmError> {
        Ok(())
    }

    fn get_url(&self, url: &str, window: &str, method: Option<SendVarsMethod>) {}

    fn load_movie(&self, url: &str, target: &AvmValue, method: Option<SendVarsMethod>) {}

    fn load_variables(&self, url: &str, target: &AvmValue, method: Option<SendVarsMethod>) {}

    fn duplicate_clip(&self, source: &AvmValue, name: &str, depth: f64) -> Result<(), AvmError> {
        Ok(())
    }

    fn remove_clip(&self, target: &AvmValue) -> Result<(), AvmError> {
        Ok(())
    }

    fn start_drag(&self, target: &AvmValue, lock_center: bool, constraint: Option<DragConstraint>) {}

    fn stop_drag(&self) {}

    /// The Trace action
    fn trace(&self, message: &str) {
        tracing::info!(target: "asrun::trace", "{}", message);
    }

    /// FSCommand2: forward an arbitrary command to the player
    fn fscommand(&self, args: &[AvmValue]) -> AvmValue {
        AvmValue::Undefined
    }
}

/// A host that ignores every request
pub struct NullHost;

impl MovieHost for NullHost {}

#![no_main]

use libfuzzer_sys::fuzz_target;
use asrun::{
    ActionBlock, DisplayClip, ExecutionContext, GuardConfig, Interpreter, NullHost, ObjectRef,
};
use std::rc::Rc;

fuzz_target!(|data: &[u8]| {
    // First byte picks the format version, the rest is the action stream
    let Some((&version, actions)) = data.split_first() else {
        return;
    };
    if actions.len() > 10_000 {
        return;
    }

    // A short timeout keeps looping inputs cheap
    let config = GuardConfig {
        hang_timeout_ms: 50,
        max_stack_depth: 64,
        ..GuardConfig::default()
    };
    let ctx = ExecutionContext::new(version % 11, Rc::new(NullHost), config);
    let root = DisplayClip::new_root(0, Some(ctx.prototypes().object.clone()));
    ctx.set_root(root.clone());

    let mut interp = Interpreter::new();
    let scope: ObjectRef = root;
    // Errors are expected; panics are not
    let _ = interp.execute_actions(&ctx, ActionBlock::new(actions.to_vec()), scope);
    let _ = interp.flush_pending_scripts(&ctx);
});

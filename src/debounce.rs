//! The one debounce implementation every autosave call site uses.

use gloo_timers::callback::Timeout;
use leptos::*;
use std::cell::RefCell;
use std::rc::Rc;

/// Derive a signal that follows `source` only after it has been stable
/// for `delay_ms`. Each change cancels the pending timeout and arms a
/// new one, so at most one callback is ever outstanding and only the
/// last value of a burst propagates. Teardown of the owning scope
/// drops any pending timeout without firing.
pub fn create_debounced<T: Clone + PartialEq + 'static>(
    source: Signal<T>,
    delay_ms: u32,
) -> ReadSignal<T> {
    let (debounced, set_debounced) = create_signal(source.get_untracked());
    let pending: Rc<RefCell<Option<Timeout>>> = Rc::new(RefCell::new(None));

    let pending_effect = pending.clone();
    create_effect(move |prev: Option<()>| {
        let value = source.get();
        // First run only seeds the subscription; the output already
        // holds the initial value.
        if prev.is_none() {
            return;
        }
        let slot = pending_effect.clone();
        let timeout = Timeout::new(delay_ms, move || {
            slot.borrow_mut().take();
            set_debounced.set(value);
        });
        // Replacing the previous timeout drops it, which cancels it.
        *pending_effect.borrow_mut() = Some(timeout);
    });

    on_cleanup(move || {
        pending.borrow_mut().take();
    });

    debounced
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use gloo_timers::future::TimeoutFuture;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    async fn settles_on_the_last_value_of_a_burst() {
        let runtime = create_runtime();
        let (input, set_input) = create_signal(0u32);
        let debounced = create_debounced(input.into(), 30);

        set_input.set(1);
        TimeoutFuture::new(5).await;
        set_input.set(2);
        TimeoutFuture::new(5).await;
        set_input.set(3);

        // Not yet settled.
        assert_eq!(debounced.get_untracked(), 0);
        TimeoutFuture::new(60).await;
        assert_eq!(debounced.get_untracked(), 3);
        runtime.dispose();
    }

    #[wasm_bindgen_test]
    async fn does_not_fire_before_the_quiet_period() {
        let runtime = create_runtime();
        let (input, set_input) = create_signal(0u32);
        let debounced = create_debounced(input.into(), 50);

        set_input.set(9);
        TimeoutFuture::new(20).await;
        assert_eq!(debounced.get_untracked(), 0);
        TimeoutFuture::new(60).await;
        assert_eq!(debounced.get_untracked(), 9);
        runtime.dispose();
    }
}

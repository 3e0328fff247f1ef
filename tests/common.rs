use std::sync::{Arc, Mutex};

/// Returns a subscriber closure that records each value it receives, and a checker that
/// drains and returns everything recorded so far.
#[allow(unused)]
pub fn change_watcher<T: Clone + Send + Sync + 'static>() -> (Box<dyn Fn(&T) + Send + Sync>, Box<dyn Fn() -> Vec<T> + Send + Sync>) {
    let changes = Arc::new(Mutex::new(Vec::new()));
    let watcher = {
        let changes = changes.clone();
        Box::new(move |value: &T| {
            changes.lock().unwrap().push(value.clone());
        })
    };

    let check = Box::new(move || {
        let changes: Vec<T> = changes.lock().unwrap().drain(..).collect();
        changes
    });

    (watcher, check)
}

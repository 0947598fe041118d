// TabSnooze state managers
// Managers handle stateful operations: the delayed-tab store, wake scheduling, and the wake-moment gateway.

pub mod delayed_tab_store;
pub mod tab_lifecycle;
pub mod wake_scheduler;

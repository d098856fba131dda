//! Retrying reads that suspend.

use crate::error::{Error, Result};

/// Run `read` until it stops suspending.
///
/// Every time `read` fails with [`Error::Suspended`] the pending handle is
/// awaited and the read is retried; a failed fetch is not retried here, the
/// next attempt surfaces the cached error.
///
/// ```rust
/// use statetree::{until_ready, ResolveError, ResolveOptions, Store, Value};
///
/// # futures::executor::block_on(async {
/// let store = Store::new();
/// store.set_resolver(|_: &str, _: &ResolveOptions| async {
///     Ok::<_, ResolveError>(Some(Value::from("Joel")))
/// });
///
/// let name = until_ready(|| store.get_path("/users/1")).await.unwrap();
/// assert_eq!(name.as_str(), Some("Joel"));
/// # });
/// ```
pub async fn until_ready<T>(mut read: impl FnMut() -> Result<T>) -> Result<T> {
    loop {
        match read() {
            Err(Error::Suspended(pending)) => {
                let _ = pending.await;
            }
            other => return other,
        }
    }
}

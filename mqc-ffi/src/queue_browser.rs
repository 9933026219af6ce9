//! Queue browsers.

use std::ffi::c_char;

use crate::error::{Error, MqcStatus, catch};
use crate::ffi::*;

/// Create a browser over `destination`, which must be a queue. `selector`
/// may be null.
/// Caller must free with [`mqc_destroy_queue_browser`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_create_queue_browser(
    session: *const MqcSession,
    destination: *const MqcDestination,
    selector: *const c_char,
    out: *mut *mut MqcQueueBrowser,
) -> MqcStatus {
    catch(|| {
        let session = unsafe { ref_from(session)? };
        let destination = unsafe { ref_from(destination)? };
        if !destination.inner.is_queue() {
            return Err(Error::InvalidDestination(format!(
                "only queues can be browsed, got {}",
                destination.inner
            )));
        }
        let selector = unsafe { c_str_to_option(selector)? };
        if out.is_null() {
            return Err(Error::NullPointer);
        }
        let inner = session
            .inner
            .create_browser(&destination.inner, selector.as_deref())?;
        unsafe { write_out(out, MqcQueueBrowser { inner }) }
    })
}

/// Free a browser.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_destroy_queue_browser(browser: *mut MqcQueueBrowser) -> MqcStatus {
    unsafe { destroy(browser) }
}

/// Close a browser. Later calls on it fail with `ILLEGAL_STATE`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_close_queue_browser(browser: *const MqcQueueBrowser) -> MqcStatus {
    catch(|| {
        unsafe { ref_from(browser)? }.inner.close();
        Ok(())
    })
}

/// Write 1 into `out` while unbrowsed messages remain.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_browser_has_more_messages(
    browser: *const MqcQueueBrowser,
    out: *mut i32,
) -> MqcStatus {
    catch(|| {
        let browser = unsafe { ref_from(browser)? };
        let more = browser.inner.has_more_messages()?;
        unsafe { write_value(out, to_c_bool(more)) }
    })
}

/// Write a copy of the next pending message into `out`, or null once every
/// pending message has been returned.
/// Caller must free a non-null message with
/// [`mqc_destroy_message`](crate::message::mqc_destroy_message).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_browser_get_next_message(
    browser: *const MqcQueueBrowser,
    out: *mut *mut MqcMessage,
) -> MqcStatus {
    catch(|| {
        let browser = unsafe { ref_from(browser)? };
        if out.is_null() {
            return Err(Error::NullPointer);
        }
        match browser.inner.next_message()? {
            Some(message) => unsafe { write_out(out, MqcMessage::new(message)) },
            None => unsafe { write_value(out, std::ptr::null_mut()) },
        }
    })
}

/// Copy the selector into `buffer`, truncated to fit. No selector copies
/// the empty string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_browser_message_selector(
    browser: *const MqcQueueBrowser,
    buffer: *mut c_char,
    size: usize,
) -> MqcStatus {
    catch(|| {
        let browser = unsafe { ref_from(browser)? };
        let selector = browser.inner.message_selector().unwrap_or_default();
        unsafe { copy_to_buffer(selector, buffer, size) }
    })
}

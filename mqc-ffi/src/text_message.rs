//! Text messages.

use std::ffi::c_char;

use mqc::MessageKind;

use crate::error::{MqcStatus, catch};
use crate::ffi::*;

/// Create a text message. `text` may be null for an empty body; it is copied.
/// Caller must free with [`mqc_destroy_message`](crate::message::mqc_destroy_message).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_create_text_message(
    session: *const MqcSession,
    text: *const c_char,
    out: *mut *mut MqcMessage,
) -> MqcStatus {
    catch(|| {
        let session = unsafe { ref_from(session)? };
        let text = unsafe { c_str_or_empty(text)? };
        let inner = session.inner.create_text_message(&text)?;
        unsafe { write_out(out, MqcMessage::new(inner)) }
    })
}

/// Copy the text body into `buffer`, truncated to fit.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_get_message_text(
    message: *mut MqcMessage,
    buffer: *mut c_char,
    size: usize,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { typed(message, MessageKind::Text)? };
        unsafe { copy_to_buffer(message.get_text()?, buffer, size) }
    })
}

/// Replace the text body. Null text is rejected.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mqc_set_message_text(
    message: *mut MqcMessage,
    text: *const c_char,
) -> MqcStatus {
    catch(|| {
        let message = unsafe { typed(message, MessageKind::Text)? };
        let text = unsafe { c_str_to_string(text)? };
        Ok(message.set_text(text)?)
    })
}

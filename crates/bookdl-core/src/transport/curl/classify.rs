//! Classify libcurl errors into transport error kinds.

use crate::transport::TransportError;

/// Maps a curl error onto the transport taxonomy. Aborts requested through
/// the task's abort token are reported by the caller as cancellations, so
/// they are not special-cased here.
pub(crate) fn classify_curl_error(e: &curl::Error) -> TransportError {
    let code = e.code() as i32;
    let description = e.to_string();
    if e.is_operation_timedout()
        || e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
        || e.is_ssl_connect_error()
        || e.is_too_many_redirects()
    {
        return TransportError::network(code, description);
    }
    TransportError::other(code, description)
}
